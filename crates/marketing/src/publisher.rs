//! Publish collaborator boundary and the dry-run publisher.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use cadence_core::PostLogId;

use crate::compliance::ComplianceChecker;
use crate::error::PublishError;
use crate::types::{ContentItem, PostLog, PostStatus};

/// Posts one content item.
///
/// A refused post is a `PostLog` with `status = failed`; `Err` means the
/// collaborator could not be reached.
#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(&self, item: &ContentItem) -> Result<PostLog, PublishError>;
}

#[async_trait]
impl<T: Publisher + ?Sized> Publisher for Arc<T> {
    async fn publish(&self, item: &ContentItem) -> Result<PostLog, PublishError> {
        (**self).publish(item).await
    }
}

/// Simulates posting. Never contacts a platform.
#[derive(Debug, Clone)]
pub struct DryRunPublisher<C> {
    checker: C,
}

impl<C: ComplianceChecker> DryRunPublisher<C> {
    pub fn new(checker: C) -> Self {
        Self { checker }
    }
}

#[async_trait]
impl<C: ComplianceChecker> Publisher for DryRunPublisher<C> {
    async fn publish(&self, item: &ContentItem) -> Result<PostLog, PublishError> {
        let report = self.checker.check(item);

        let (status, platform_post_id, message) = if report.ok {
            let post_id = format!("dryrun_{}", Uuid::now_v7().simple());
            (
                PostStatus::Posted,
                Some(post_id),
                format!("dry run: would post to {}", item.platform),
            )
        } else {
            (
                PostStatus::Failed,
                None,
                format!("compliance: {}", report.reason()),
            )
        };

        info!(content_id = %item.id, platform = %item.platform, ?status, "dry-run publish");
        Ok(PostLog {
            id: PostLogId::new(),
            content_id: item.id,
            schedule_id: None,
            platform: item.platform,
            status,
            platform_post_id,
            dry_run: true,
            message,
            timestamp: Utc::now(),
        })
    }
}
