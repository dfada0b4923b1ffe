//! Campaign content, bulk scheduling and the schedule dispatcher.
//!
//! ## Design
//!
//! - [`MarketingStore`] keeps campaigns, content items, schedule entries and
//!   post logs in the record store, each with a newest-first index
//! - [`BulkScheduler`] approves, rejects or schedules many items at once;
//!   each id succeeds or fails on its own
//! - [`ScheduleDispatcher::tick`] publishes due entries through a
//!   [`Publisher`], writing one [`PostLog`] per entry
//! - [`ComplianceChecker`] gates approval, scheduling and dry-run publishing

pub mod bulk;
pub mod calendar;
pub mod compliance;
pub mod dispatcher;
pub mod error;
pub mod generator;
pub mod keys;
pub mod publisher;
pub mod store;
pub mod types;

pub use bulk::{
    BulkAction, BulkItemError, BulkReport, BulkRequest, BulkScheduler, FixedJitter, JitterSource,
    RandomJitter, SchedulerConfig,
};
pub use calendar::export_ics;
pub use compliance::{ComplianceChecker, ComplianceReport, RuleBasedCompliance};
pub use dispatcher::{DispatchReport, DispatcherConfig, ScheduleDispatcher};
pub use error::{MarketingError, PublishError};
pub use generator::{
    ContentGenerator, RegenerateMode, Regenerated, TemplateContentGenerator, regenerate_content,
};
pub use publisher::{DryRunPublisher, Publisher};
pub use store::{MarketingStore, ScheduledContent};
pub use types::{
    Campaign, CampaignPatch, ContentDraft, ContentItem, ContentPatch, ContentStatus, NewCampaign,
    Platform, PostLog, PostStatus, ScheduleEntry, ScheduleStatus,
};
