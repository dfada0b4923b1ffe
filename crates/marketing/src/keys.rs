//! Store keys and index read caps for marketing records.

use cadence_core::{CampaignId, ContentId, PostLogId, ScheduleId};

pub const CAMPAIGN_INDEX: &str = "mm:campaign:index";
pub const SCHEDULE_INDEX: &str = "mm:schedule:index";
pub const POST_INDEX: &str = "mm:post:index";

pub const CAMPAIGN_CAP: usize = 100;
pub const CONTENT_CAP: usize = 300;
pub const SCHEDULE_CAP: usize = 500;
pub const POST_CAP: usize = 200;

pub fn campaign(id: CampaignId) -> String {
    format!("mm:campaign:{id}")
}

pub fn content(id: ContentId) -> String {
    format!("mm:content:{id}")
}

pub fn content_index(campaign: CampaignId) -> String {
    format!("mm:campaign:{campaign}:content")
}

pub fn schedule(id: ScheduleId) -> String {
    format!("mm:schedule:{id}")
}

pub fn post(id: PostLogId) -> String {
    format!("mm:post:{id}")
}
