//! Content generation and regeneration.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

use cadence_core::{ContentId, DomainError};
use cadence_store::RecordStore;

use crate::compliance::ComplianceChecker;
use crate::error::MarketingError;
use crate::store::MarketingStore;
use crate::types::{Campaign, ContentDraft, ContentItem, ContentStatus, Platform};

/// Produces content body fields for a campaign on one platform.
pub trait ContentGenerator: Send + Sync {
    fn generate(&self, campaign: &Campaign, platform: Platform) -> ContentDraft;
}

impl<T: ContentGenerator + ?Sized> ContentGenerator for Arc<T> {
    fn generate(&self, campaign: &Campaign, platform: Platform) -> ContentDraft {
        (**self).generate(campaign, platform)
    }
}

/// Deterministic generator filling fixed templates from campaign fields.
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateContentGenerator;

fn or_default<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    let value = value.trim();
    if value.is_empty() { fallback } else { value }
}

fn hashtag(text: &str) -> String {
    let tag: String = text.chars().filter(|c| c.is_alphanumeric()).collect();
    format!("#{}", tag.to_lowercase())
}

impl ContentGenerator for TemplateContentGenerator {
    fn generate(&self, campaign: &Campaign, platform: Platform) -> ContentDraft {
        let product = or_default(&campaign.product, &campaign.name);
        let audience = or_default(&campaign.audience, "busy teams");
        let cta = or_default(&campaign.call_to_action, "Try it today");
        let tone = or_default(&campaign.tone, "friendly");

        let hooks = vec![
            format!("Stop wasting hours: {product} does it for you"),
            format!("{audience}, this one is for you"),
            format!("The {product} trick nobody told you about"),
        ];
        let script = format!(
            "Open on the problem {audience} face every week. Show {product} solving it in \
             three quick cuts. Keep the voice {tone}. Close on: {cta}."
        );
        let mut caption = format!("{product} for {audience}. {cta}.");
        if caption.chars().count() > platform.caption_limit() {
            caption = cadence_core::truncate_chars(&caption, platform.caption_limit());
        }
        let hashtags = vec![hashtag(product), hashtag(platform.as_str()), "#productivity".to_string()];
        let video_prompt = format!(
            "Vertical {platform} video, {tone} tone, showing {product} used by {audience}"
        );

        ContentDraft {
            platform,
            hooks,
            script,
            caption,
            hashtags,
            video_prompt,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegenerateMode {
    /// Replace hooks only
    Hooks,
    /// Replace every body field and clear scheduling
    All,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Regenerated {
    pub content: ContentItem,
    pub compliance_warnings: Vec<String>,
}

/// Regenerate a content item from its campaign and reset it to draft.
pub fn regenerate_content<S, G, C>(
    store: &MarketingStore<S>,
    generator: &G,
    checker: &C,
    id: ContentId,
    mode: RegenerateMode,
) -> Result<Regenerated, MarketingError>
where
    S: RecordStore,
    G: ContentGenerator,
    C: ComplianceChecker,
{
    let mut item = store.require_content(id)?;
    let campaign = store
        .get_campaign(item.campaign_id)?
        .ok_or_else(|| DomainError::not_found(format!("campaign {}", item.campaign_id)))?;

    let draft = generator.generate(&campaign, item.platform);
    item.hooks = draft.hooks;
    if mode == RegenerateMode::All {
        item.script = draft.script;
        item.caption = draft.caption;
        item.hashtags = draft.hashtags;
        item.video_prompt = draft.video_prompt;
        item.platform_post_id = None;
    }
    item.status = ContentStatus::Draft;
    item.scheduled_for = None;
    item.schedule_id = None;
    item.error = None;
    item.updated_at = Utc::now();
    store.save_content(&item)?;

    let report = checker.check(&item);
    info!(content_id = %id, ?mode, ok = report.ok, "content regenerated");

    let mut compliance_warnings = report.violations;
    compliance_warnings.extend(report.warnings);
    Ok(Regenerated {
        content: item,
        compliance_warnings,
    })
}
