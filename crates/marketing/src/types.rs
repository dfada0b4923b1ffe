//! Campaigns, content items, schedule entries and post logs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use cadence_core::{CampaignId, ContentId, DomainError, DomainResult, PostLogId, ScheduleId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    Tiktok,
    Instagram,
    Youtube,
    X,
    Linkedin,
    Facebook,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Tiktok => "tiktok",
            Platform::Instagram => "instagram",
            Platform::Youtube => "youtube",
            Platform::X => "x",
            Platform::Linkedin => "linkedin",
            Platform::Facebook => "facebook",
        }
    }

    /// Longest caption the platform accepts.
    pub fn caption_limit(&self) -> usize {
        match self {
            Platform::X => 280,
            Platform::Tiktok | Platform::Instagram => 2200,
            Platform::Linkedin => 3000,
            Platform::Youtube => 5000,
            Platform::Facebook => 63_206,
        }
    }
}

impl core::fmt::Display for Platform {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Named grouping for content generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Campaign {
    pub id: CampaignId,
    pub name: String,
    pub product: String,
    pub audience: String,
    pub platforms: Vec<Platform>,
    pub tone: String,
    pub call_to_action: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields supplied when creating a campaign.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NewCampaign {
    pub name: String,
    pub product: String,
    pub audience: String,
    pub platforms: Vec<Platform>,
    pub tone: String,
    pub call_to_action: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CampaignPatch {
    pub name: Option<String>,
    pub product: Option<String>,
    pub audience: Option<String>,
    pub platforms: Option<Vec<Platform>>,
    pub tone: Option<String>,
    pub call_to_action: Option<String>,
}

impl Campaign {
    pub fn new(input: NewCampaign, now: DateTime<Utc>) -> DomainResult<Self> {
        let name = input.name.trim();
        if name.is_empty() {
            return Err(DomainError::validation("campaign name is required"));
        }
        Ok(Self {
            id: CampaignId::new(),
            name: name.to_string(),
            product: input.product,
            audience: input.audience,
            platforms: input.platforms,
            tone: input.tone,
            call_to_action: input.call_to_action,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn apply(&mut self, patch: CampaignPatch, now: DateTime<Utc>) -> DomainResult<()> {
        if let Some(name) = patch.name {
            let name = name.trim();
            if name.is_empty() {
                return Err(DomainError::validation("campaign name cannot be blank"));
            }
            self.name = name.to_string();
        }
        if let Some(v) = patch.product {
            self.product = v;
        }
        if let Some(v) = patch.audience {
            self.audience = v;
        }
        if let Some(v) = patch.platforms {
            self.platforms = v;
        }
        if let Some(v) = patch.tone {
            self.tone = v;
        }
        if let Some(v) = patch.call_to_action {
            self.call_to_action = v;
        }
        self.updated_at = now;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentStatus {
    Draft,
    Approved,
    Scheduled,
    Posted,
    Failed,
}

impl ContentStatus {
    /// Forward transitions plus the explicit return to draft.
    pub fn can_transition_to(&self, next: ContentStatus) -> bool {
        use ContentStatus::*;
        matches!(
            (self, next),
            (_, Draft)
                | (Draft | Approved, Approved)
                | (Draft | Approved, Scheduled)
                | (Scheduled, Posted | Failed)
        )
    }
}

/// Body fields produced by a content generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentDraft {
    pub platform: Platform,
    #[serde(default)]
    pub hooks: Vec<String>,
    #[serde(default)]
    pub script: String,
    #[serde(default)]
    pub caption: String,
    #[serde(default)]
    pub hashtags: Vec<String>,
    #[serde(default)]
    pub video_prompt: String,
}

/// Editable body fields. Status changes go through the dedicated operations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentPatch {
    pub hooks: Option<Vec<String>>,
    pub script: Option<String>,
    pub caption: Option<String>,
    pub hashtags: Option<Vec<String>>,
    pub video_prompt: Option<String>,
}

/// One piece of generated content belonging to a campaign.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentItem {
    pub id: ContentId,
    pub campaign_id: CampaignId,
    pub platform: Platform,
    pub status: ContentStatus,
    pub hooks: Vec<String>,
    pub script: String,
    pub caption: String,
    pub hashtags: Vec<String>,
    pub video_prompt: String,
    /// Set only while scheduled.
    pub scheduled_for: Option<DateTime<Utc>>,
    /// The entry that owns the current schedule; older entries are stale.
    #[serde(default)]
    pub schedule_id: Option<ScheduleId>,
    /// Set after a successful dispatch.
    pub platform_post_id: Option<String>,
    /// Last rejection reason or failure message.
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ContentItem {
    pub fn new(campaign_id: CampaignId, draft: ContentDraft, now: DateTime<Utc>) -> Self {
        Self {
            id: ContentId::new(),
            campaign_id,
            platform: draft.platform,
            status: ContentStatus::Draft,
            hooks: draft.hooks,
            script: draft.script,
            caption: draft.caption,
            hashtags: draft.hashtags,
            video_prompt: draft.video_prompt,
            scheduled_for: None,
            schedule_id: None,
            platform_post_id: None,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn transition(&mut self, next: ContentStatus, now: DateTime<Utc>) -> DomainResult<()> {
        if !self.status.can_transition_to(next) {
            return Err(DomainError::invalid_transition(format!(
                "content {} cannot go from {:?} to {:?}",
                self.id, self.status, next
            )));
        }
        if next != ContentStatus::Scheduled {
            self.scheduled_for = None;
            self.schedule_id = None;
        }
        self.status = next;
        self.updated_at = now;
        Ok(())
    }

    pub fn approve(&mut self, now: DateTime<Utc>) -> DomainResult<()> {
        self.transition(ContentStatus::Approved, now)?;
        self.error = None;
        Ok(())
    }

    /// Back to draft with a reason.
    pub fn reject(&mut self, reason: &str, now: DateTime<Utc>) -> DomainResult<()> {
        self.transition(ContentStatus::Draft, now)?;
        let reason = reason.trim();
        self.error = Some(if reason.is_empty() { "Rejected" } else { reason }.to_string());
        Ok(())
    }

    /// Bind the item to `entry`.
    pub fn mark_scheduled(&mut self, entry: &ScheduleEntry, now: DateTime<Utc>) -> DomainResult<()> {
        self.transition(ContentStatus::Scheduled, now)?;
        self.scheduled_for = Some(entry.scheduled_for);
        self.schedule_id = Some(entry.id);
        Ok(())
    }

    /// Whether `entry` is the one this item is currently scheduled by.
    pub fn is_scheduled_by(&self, entry: &ScheduleEntry) -> bool {
        self.status == ContentStatus::Scheduled && self.schedule_id == Some(entry.id)
    }

    pub fn mark_posted(&mut self, platform_post_id: Option<String>, now: DateTime<Utc>) -> DomainResult<()> {
        self.transition(ContentStatus::Posted, now)?;
        self.platform_post_id = platform_post_id;
        self.error = None;
        Ok(())
    }

    pub fn mark_failed(&mut self, message: impl Into<String>, now: DateTime<Utc>) -> DomainResult<()> {
        self.transition(ContentStatus::Failed, now)?;
        self.error = Some(message.into());
        Ok(())
    }

    pub fn apply(&mut self, patch: ContentPatch, now: DateTime<Utc>) {
        if let Some(v) = patch.hooks {
            self.hooks = v;
        }
        if let Some(v) = patch.script {
            self.script = v;
        }
        if let Some(v) = patch.caption {
            self.caption = v;
        }
        if let Some(v) = patch.hashtags {
            self.hashtags = v;
        }
        if let Some(v) = patch.video_prompt {
            self.video_prompt = v;
        }
        self.updated_at = now;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleStatus {
    Scheduled,
    Completed,
    Failed,
}

impl ScheduleStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ScheduleStatus::Scheduled)
    }

    /// Listing order: pending first, then failed, then completed.
    pub fn rank(&self) -> u8 {
        match self {
            ScheduleStatus::Scheduled => 0,
            ScheduleStatus::Failed => 1,
            ScheduleStatus::Completed => 2,
        }
    }
}

/// Dispatch instruction bound to one content item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    pub id: ScheduleId,
    pub content_id: ContentId,
    pub scheduled_for: DateTime<Utc>,
    pub status: ScheduleStatus,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ScheduleEntry {
    pub fn new(content_id: ContentId, scheduled_for: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        Self {
            id: ScheduleId::new(),
            content_id,
            scheduled_for,
            status: ScheduleStatus::Scheduled,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.status == ScheduleStatus::Scheduled && self.scheduled_for <= now
    }

    fn finish(&mut self, status: ScheduleStatus, now: DateTime<Utc>) -> DomainResult<()> {
        if self.status.is_terminal() {
            return Err(DomainError::invalid_transition(format!(
                "schedule {} is already {:?}",
                self.id, self.status
            )));
        }
        self.status = status;
        self.updated_at = now;
        Ok(())
    }

    pub fn mark_completed(&mut self, now: DateTime<Utc>) -> DomainResult<()> {
        self.finish(ScheduleStatus::Completed, now)
    }

    pub fn mark_failed(&mut self, error: impl Into<String>, now: DateTime<Utc>) -> DomainResult<()> {
        self.finish(ScheduleStatus::Failed, now)?;
        self.error = Some(error.into());
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostStatus {
    Posted,
    Failed,
}

/// Audit record of one dispatch attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostLog {
    pub id: PostLogId,
    pub content_id: ContentId,
    pub schedule_id: Option<ScheduleId>,
    pub platform: Platform,
    pub status: PostStatus,
    pub platform_post_id: Option<String>,
    pub dry_run: bool,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> ContentDraft {
        ContentDraft {
            platform: Platform::Instagram,
            hooks: vec!["Stop scrolling".into()],
            script: "script".into(),
            caption: "caption".into(),
            hashtags: vec!["#launch".into()],
            video_prompt: "prompt".into(),
        }
    }

    #[test]
    fn content_lifecycle() {
        let now = Utc::now();
        let mut item = ContentItem::new(CampaignId::new(), draft(), now);
        assert_eq!(item.status, ContentStatus::Draft);

        item.approve(now).unwrap();
        let entry = ScheduleEntry::new(item.id, now, now);
        item.mark_scheduled(&entry, now).unwrap();
        assert_eq!(item.scheduled_for, Some(now));
        assert!(item.is_scheduled_by(&entry));

        item.mark_posted(Some("p1".into()), now).unwrap();
        assert_eq!(item.status, ContentStatus::Posted);
        assert_eq!(item.scheduled_for, None);
        assert_eq!(item.platform_post_id.as_deref(), Some("p1"));
    }

    #[test]
    fn illegal_transitions_are_refused() {
        let now = Utc::now();
        let mut item = ContentItem::new(CampaignId::new(), draft(), now);

        assert!(item.mark_posted(None, now).is_err());
        item.approve(now).unwrap();
        let entry = ScheduleEntry::new(item.id, now, now);
        item.mark_scheduled(&entry, now).unwrap();
        item.mark_failed("boom", now).unwrap();
        assert!(item.approve(now).is_err());
        assert!(item.mark_scheduled(&entry, now).is_err());
    }

    #[test]
    fn reject_returns_to_draft_from_anywhere() {
        let now = Utc::now();
        let mut item = ContentItem::new(CampaignId::new(), draft(), now);
        item.approve(now).unwrap();
        let entry = ScheduleEntry::new(item.id, now, now);
        item.mark_scheduled(&entry, now).unwrap();

        item.reject("  ", now).unwrap();
        assert_eq!(item.status, ContentStatus::Draft);
        assert_eq!(item.error.as_deref(), Some("Rejected"));
        assert!(item.scheduled_for.is_none());
        assert!(!item.is_scheduled_by(&entry));
    }

    #[test]
    fn schedule_entry_is_immutable_once_finished() {
        let now = Utc::now();
        let mut entry = ScheduleEntry::new(ContentId::new(), now, now);
        assert!(entry.is_due(now));

        entry.mark_completed(now).unwrap();
        assert!(!entry.is_due(now));
        assert!(entry.mark_failed("late", now).is_err());
        assert!(entry.mark_completed(now).is_err());
        assert_eq!(entry.status, ScheduleStatus::Completed);
    }

    #[test]
    fn campaign_requires_a_name() {
        let now = Utc::now();
        assert!(Campaign::new(NewCampaign::default(), now).is_err());

        let mut campaign = Campaign::new(
            NewCampaign {
                name: " Spring launch ".into(),
                ..Default::default()
            },
            now,
        )
        .unwrap();
        assert_eq!(campaign.name, "Spring launch");

        campaign
            .apply(
                CampaignPatch {
                    tone: Some("playful".into()),
                    ..Default::default()
                },
                now,
            )
            .unwrap();
        assert_eq!(campaign.tone, "playful");
        assert_eq!(campaign.name, "Spring launch");
    }
}
