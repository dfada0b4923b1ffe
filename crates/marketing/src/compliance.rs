//! Content compliance checks.

use std::sync::Arc;

use serde::Serialize;

use crate::types::ContentItem;

/// Outcome of a compliance check. `ok == false` blocks approval and
/// scheduling unless overridden; warnings never block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ComplianceReport {
    pub ok: bool,
    pub violations: Vec<String>,
    pub warnings: Vec<String>,
}

impl ComplianceReport {
    fn finish(mut self) -> Self {
        self.ok = self.violations.is_empty();
        self
    }

    /// One line summary of the violations.
    pub fn reason(&self) -> String {
        self.violations.join("; ")
    }
}

pub trait ComplianceChecker: Send + Sync {
    fn check(&self, item: &ContentItem) -> ComplianceReport;
}

impl<T: ComplianceChecker + ?Sized> ComplianceChecker for Arc<T> {
    fn check(&self, item: &ContentItem) -> ComplianceReport {
        (**self).check(item)
    }
}

const DEFAULT_BANNED: &[&str] = &[
    "guaranteed results",
    "risk-free",
    "get rich quick",
    "miracle cure",
    "100% guaranteed",
    "no risk",
];

/// Hashtags above this count draw a warning.
const HASHTAG_WARN: usize = 15;

/// Built-in rules: non-empty copy, platform caption limits and banned claims.
#[derive(Debug, Clone)]
pub struct RuleBasedCompliance {
    banned_phrases: Vec<String>,
}

impl Default for RuleBasedCompliance {
    fn default() -> Self {
        Self {
            banned_phrases: DEFAULT_BANNED.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl RuleBasedCompliance {
    pub fn with_banned_phrases<I, P>(mut self, phrases: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<String>,
    {
        self.banned_phrases = phrases
            .into_iter()
            .map(|p| p.into().to_lowercase())
            .collect();
        self
    }
}

impl ComplianceChecker for RuleBasedCompliance {
    fn check(&self, item: &ContentItem) -> ComplianceReport {
        let mut report = ComplianceReport::default();

        if item.caption.trim().is_empty() && item.hooks.iter().all(|h| h.trim().is_empty()) {
            report.violations.push("content has no caption or hooks".to_string());
        }

        let limit = item.platform.caption_limit();
        let caption_len = item.caption.chars().count();
        if caption_len > limit {
            report.violations.push(format!(
                "caption is {caption_len} characters, {} allows {limit}",
                item.platform
            ));
        }

        let hooks = item.hooks.join(" ");
        let text = [item.caption.as_str(), item.script.as_str(), hooks.as_str()]
            .join(" ")
            .to_lowercase();
        for phrase in &self.banned_phrases {
            if text.contains(phrase.as_str()) {
                report.violations.push(format!("banned claim: \"{phrase}\""));
            }
        }

        if item.hashtags.len() > HASHTAG_WARN {
            report
                .warnings
                .push(format!("{} hashtags; consider fewer", item.hashtags.len()));
        }
        if item.script.trim().is_empty() {
            report.warnings.push("script is empty".to_string());
        }

        report.finish()
    }
}
