//! Campaign, content, schedule and post-log records.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use cadence_core::{CampaignId, ContentId, DomainError, ScheduleId};
use cadence_store::{RecordStore, RecordStoreExt, index};

use crate::error::MarketingError;
use crate::keys;
use crate::types::{
    Campaign, CampaignPatch, ContentDraft, ContentItem, ContentPatch, NewCampaign, PostLog,
    ScheduleEntry,
};

/// A schedule entry joined with its content and campaign, if they still exist.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScheduledContent {
    pub schedule: ScheduleEntry,
    pub content: Option<ContentItem>,
    pub campaign: Option<Campaign>,
}

#[derive(Debug, Clone)]
pub struct MarketingStore<S> {
    store: S,
}

impl<S: RecordStore> MarketingStore<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    fn load_ids<T: std::str::FromStr>(&self, key: &str, cap: usize) -> Result<Vec<T>, MarketingError> {
        Ok(index::read(&self.store, key, cap)?
            .into_iter()
            .filter_map(|raw| raw.parse().ok())
            .collect())
    }

    // campaigns

    pub fn create_campaign(&self, input: NewCampaign) -> Result<Campaign, MarketingError> {
        let campaign = Campaign::new(input, Utc::now())?;
        self.store.set_json(&keys::campaign(campaign.id), &campaign)?;
        index::prepend(&self.store, keys::CAMPAIGN_INDEX, &campaign.id.to_string())?;
        debug!(campaign_id = %campaign.id, "campaign created");
        Ok(campaign)
    }

    pub fn get_campaign(&self, id: CampaignId) -> Result<Option<Campaign>, MarketingError> {
        Ok(self.store.get_json(&keys::campaign(id))?)
    }

    /// Newest first, at most [`keys::CAMPAIGN_CAP`].
    pub fn list_campaigns(&self) -> Result<Vec<Campaign>, MarketingError> {
        let mut out = Vec::new();
        for id in self.load_ids(keys::CAMPAIGN_INDEX, keys::CAMPAIGN_CAP)? {
            if let Some(c) = self.get_campaign(id)? {
                out.push(c);
            }
        }
        Ok(out)
    }

    pub fn update_campaign(
        &self,
        id: CampaignId,
        patch: CampaignPatch,
    ) -> Result<Campaign, MarketingError> {
        let mut campaign = self
            .get_campaign(id)?
            .ok_or_else(|| DomainError::not_found(format!("campaign {id}")))?;
        campaign.apply(patch, Utc::now())?;
        self.store.set_json(&keys::campaign(id), &campaign)?;
        Ok(campaign)
    }

    // content

    pub fn create_content(
        &self,
        campaign_id: CampaignId,
        draft: ContentDraft,
    ) -> Result<ContentItem, MarketingError> {
        if self.get_campaign(campaign_id)?.is_none() {
            return Err(DomainError::not_found(format!("campaign {campaign_id}")).into());
        }
        let item = ContentItem::new(campaign_id, draft, Utc::now());
        self.save_content(&item)?;
        index::prepend(
            &self.store,
            &keys::content_index(campaign_id),
            &item.id.to_string(),
        )?;
        debug!(content_id = %item.id, campaign_id = %campaign_id, "content created");
        Ok(item)
    }

    pub fn get_content(&self, id: ContentId) -> Result<Option<ContentItem>, MarketingError> {
        Ok(self.store.get_json(&keys::content(id))?)
    }

    /// Like [`get_content`](Self::get_content) but missing content is an error.
    pub fn require_content(&self, id: ContentId) -> Result<ContentItem, MarketingError> {
        self.get_content(id)?
            .ok_or_else(|| DomainError::not_found(format!("content {id}")).into())
    }

    pub fn save_content(&self, item: &ContentItem) -> Result<(), MarketingError> {
        Ok(self.store.set_json(&keys::content(item.id), item)?)
    }

    /// A campaign's content, newest first, at most [`keys::CONTENT_CAP`].
    pub fn list_content(&self, campaign_id: CampaignId) -> Result<Vec<ContentItem>, MarketingError> {
        let mut out = Vec::new();
        for id in self.load_ids(&keys::content_index(campaign_id), keys::CONTENT_CAP)? {
            if let Some(item) = self.get_content(id)? {
                out.push(item);
            }
        }
        Ok(out)
    }

    pub fn update_content(
        &self,
        id: ContentId,
        patch: ContentPatch,
    ) -> Result<ContentItem, MarketingError> {
        let mut item = self.require_content(id)?;
        item.apply(patch, Utc::now());
        self.save_content(&item)?;
        Ok(item)
    }

    pub fn approve_content(&self, id: ContentId) -> Result<ContentItem, MarketingError> {
        let mut item = self.require_content(id)?;
        item.approve(Utc::now())?;
        self.save_content(&item)?;
        Ok(item)
    }

    pub fn reject_content(&self, id: ContentId, reason: &str) -> Result<ContentItem, MarketingError> {
        let mut item = self.require_content(id)?;
        item.reject(reason, Utc::now())?;
        self.save_content(&item)?;
        Ok(item)
    }

    /// Create a schedule entry for the content and mark it scheduled.
    ///
    /// No approval gate here; see `BulkScheduler::schedule_content`.
    pub fn schedule_content(
        &self,
        id: ContentId,
        at: DateTime<Utc>,
    ) -> Result<(ContentItem, ScheduleEntry), MarketingError> {
        let now = Utc::now();
        let mut item = self.require_content(id)?;
        let entry = ScheduleEntry::new(id, at, now);
        item.mark_scheduled(&entry, now)?;

        self.save_schedule(&entry)?;
        index::prepend(&self.store, keys::SCHEDULE_INDEX, &entry.id.to_string())?;
        self.save_content(&item)?;

        debug!(content_id = %id, schedule_id = %entry.id, scheduled_for = %at, "content scheduled");
        Ok((item, entry))
    }

    // schedules

    pub fn get_schedule(&self, id: ScheduleId) -> Result<Option<ScheduleEntry>, MarketingError> {
        Ok(self.store.get_json(&keys::schedule(id))?)
    }

    pub fn save_schedule(&self, entry: &ScheduleEntry) -> Result<(), MarketingError> {
        Ok(self.store.set_json(&keys::schedule(entry.id), entry)?)
    }

    /// Up to [`keys::SCHEDULE_CAP`] most recent entries, ascending by time.
    pub fn list_schedules(&self) -> Result<Vec<ScheduleEntry>, MarketingError> {
        let mut out = Vec::new();
        for id in self.load_ids(keys::SCHEDULE_INDEX, keys::SCHEDULE_CAP)? {
            if let Some(entry) = self.get_schedule(id)? {
                out.push(entry);
            }
        }
        out.sort_by_key(|e| e.scheduled_for);
        Ok(out)
    }

    /// Pending entries first, then failed, then completed; by time within each.
    pub fn list_schedules_with_content(&self) -> Result<Vec<ScheduledContent>, MarketingError> {
        let mut out = Vec::new();
        for schedule in self.list_schedules()? {
            let content = self.get_content(schedule.content_id)?;
            let campaign = match &content {
                Some(c) => self.get_campaign(c.campaign_id)?,
                None => None,
            };
            out.push(ScheduledContent {
                schedule,
                content,
                campaign,
            });
        }
        out.sort_by_key(|s| (s.schedule.status.rank(), s.schedule.scheduled_for));
        Ok(out)
    }

    // post logs

    pub fn save_post_log(&self, log: &PostLog) -> Result<(), MarketingError> {
        self.store.set_json(&keys::post(log.id), log)?;
        index::prepend(&self.store, keys::POST_INDEX, &log.id.to_string())?;
        Ok(())
    }

    /// Newest first, at most [`keys::POST_CAP`].
    pub fn list_post_logs(&self) -> Result<Vec<PostLog>, MarketingError> {
        let mut out = Vec::new();
        for id in self.load_ids(keys::POST_INDEX, keys::POST_CAP)? {
            if let Some(log) = self.store.get_json(&keys::post(id))? {
                out.push(log);
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ContentStatus, Platform, ScheduleStatus};
    use cadence_store::InMemoryRecordStore;
    use chrono::Duration;

    fn store() -> MarketingStore<std::sync::Arc<InMemoryRecordStore>> {
        MarketingStore::new(InMemoryRecordStore::arc())
    }

    fn campaign(store: &MarketingStore<std::sync::Arc<InMemoryRecordStore>>, name: &str) -> Campaign {
        store
            .create_campaign(NewCampaign {
                name: name.into(),
                product: "Cadence".into(),
                platforms: vec![Platform::Tiktok],
                ..Default::default()
            })
            .unwrap()
    }

    fn draft() -> ContentDraft {
        ContentDraft {
            platform: Platform::Tiktok,
            hooks: vec!["hook".into()],
            script: "script".into(),
            caption: "caption".into(),
            hashtags: vec![],
            video_prompt: String::new(),
        }
    }

    #[test]
    fn campaigns_list_newest_first() {
        let store = store();
        campaign(&store, "first");
        campaign(&store, "second");

        let names: Vec<_> = store.list_campaigns().unwrap().into_iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["second", "first"]);
    }

    #[test]
    fn update_missing_campaign_is_not_found() {
        let err = store()
            .update_campaign(CampaignId::new(), CampaignPatch::default())
            .unwrap_err();
        assert!(matches!(err, MarketingError::Domain(DomainError::NotFound(_))));
    }

    #[test]
    fn content_requires_existing_campaign() {
        let store = store();
        assert!(store.create_content(CampaignId::new(), draft()).is_err());

        let c = campaign(&store, "launch");
        let item = store.create_content(c.id, draft()).unwrap();
        assert_eq!(store.list_content(c.id).unwrap(), vec![item]);
    }

    #[test]
    fn approve_reject_and_patch() {
        let store = store();
        let c = campaign(&store, "launch");
        let item = store.create_content(c.id, draft()).unwrap();

        let item = store.approve_content(item.id).unwrap();
        assert_eq!(item.status, ContentStatus::Approved);

        let item = store.reject_content(item.id, "off brand").unwrap();
        assert_eq!(item.status, ContentStatus::Draft);
        assert_eq!(item.error.as_deref(), Some("off brand"));

        let item = store
            .update_content(
                item.id,
                ContentPatch {
                    caption: Some("new caption".into()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(item.caption, "new caption");
        assert_eq!(item.hooks, vec!["hook"]);
    }

    #[test]
    fn schedules_sort_by_time_and_status() {
        let store = store();
        let c = campaign(&store, "launch");
        let now = Utc::now();

        let late = store.create_content(c.id, draft()).unwrap();
        let early = store.create_content(c.id, draft()).unwrap();
        let (_, late_entry) = store.schedule_content(late.id, now + Duration::hours(2)).unwrap();
        let (_, early_entry) = store.schedule_content(early.id, now + Duration::hours(1)).unwrap();

        let times: Vec<_> = store.list_schedules().unwrap().iter().map(|e| e.id).collect();
        assert_eq!(times, vec![early_entry.id, late_entry.id]);

        let mut done = early_entry.clone();
        done.mark_completed(now).unwrap();
        store.save_schedule(&done).unwrap();

        let joined = store.list_schedules_with_content().unwrap();
        assert_eq!(joined[0].schedule.id, late_entry.id);
        assert_eq!(joined[1].schedule.status, ScheduleStatus::Completed);
        assert_eq!(joined[0].campaign.as_ref().map(|c| c.id), Some(c.id));
        assert_eq!(joined[0].content.as_ref().map(|c| c.id), Some(late.id));
    }

    #[test]
    fn posted_content_cannot_be_rescheduled() {
        let store = store();
        let c = campaign(&store, "launch");
        let item = store.create_content(c.id, draft()).unwrap();
        let (mut item, _) = store.schedule_content(item.id, Utc::now()).unwrap();
        item.mark_posted(None, Utc::now()).unwrap();
        store.save_content(&item).unwrap();

        assert!(store.schedule_content(item.id, Utc::now()).is_err());
    }
}
