//! Runtime wiring: one record store shared by every component.

use std::sync::Arc;

use thiserror::Error;

use cadence_marketing::{
    BulkScheduler, ComplianceChecker, ContentGenerator, DispatcherConfig, DryRunPublisher,
    MarketingStore, Publisher, RuleBasedCompliance, ScheduleDispatcher, SchedulerConfig,
    TemplateContentGenerator,
};
use cadence_pipeline::{
    HttpStepRunner, JobStore, Pipeline, PipelineConfig, PipelineExecutor, StepCallError,
    StepRunner,
};
use cadence_runs::{GenerationError, Generator, HttpGenerator, RunProcessor, RunProcessorConfig};
use cadence_store::{InMemoryRecordStore, RecordStore, StoreError};

use crate::config::AppConfig;

pub type SharedStore = Arc<dyn RecordStore>;

#[derive(Debug, Error)]
pub enum ServicesError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error(transparent)]
    Step(#[from] StepCallError),
}

/// External collaborators, swappable in tests.
#[derive(Clone)]
pub struct Collaborators {
    pub store: SharedStore,
    pub generator: Arc<dyn Generator>,
    pub step_runner: Arc<dyn StepRunner>,
    pub publisher: Arc<dyn Publisher>,
    pub checker: Arc<dyn ComplianceChecker>,
    pub content_generator: Arc<dyn ContentGenerator>,
}

impl Collaborators {
    /// Real adapters: Redis (when configured) or in-memory storage, the
    /// HTTP generator and step runner, and the dry-run publisher.
    pub fn from_config(config: &AppConfig) -> Result<Self, ServicesError> {
        let store = build_store(config)?;
        let checker: Arc<dyn ComplianceChecker> = Arc::new(RuleBasedCompliance::default());

        Ok(Self {
            store,
            generator: Arc::new(HttpGenerator::new(config.generation.clone())?),
            step_runner: Arc::new(HttpStepRunner::new(
                &config.pipeline_base_url,
                config.pipeline_step_timeout,
            )?),
            publisher: Arc::new(DryRunPublisher::new(checker.clone())),
            checker,
            content_generator: Arc::new(TemplateContentGenerator),
        })
    }
}

#[cfg(feature = "redis")]
fn build_store(config: &AppConfig) -> Result<SharedStore, ServicesError> {
    match &config.redis_url {
        Some(url) => {
            tracing::info!("using redis record store");
            Ok(Arc::new(cadence_store::RedisRecordStore::new(url, None)?))
        }
        None => Ok(InMemoryRecordStore::arc()),
    }
}

#[cfg(not(feature = "redis"))]
fn build_store(config: &AppConfig) -> Result<SharedStore, ServicesError> {
    if config.redis_url.is_some() {
        tracing::warn!("REDIS_URL set but built without the `redis` feature; using in-memory store");
    }
    Ok(InMemoryRecordStore::arc())
}

pub struct AppServices {
    pub processor: RunProcessor<SharedStore, Arc<dyn Generator>>,
    pub pipeline: PipelineExecutor<Arc<dyn StepRunner>, SharedStore>,
    pub bulk: BulkScheduler<SharedStore, Arc<dyn ComplianceChecker>>,
    pub dispatcher: ScheduleDispatcher<SharedStore, Arc<dyn Publisher>>,
    pub marketing: MarketingStore<SharedStore>,
    pub checker: Arc<dyn ComplianceChecker>,
    pub content_generator: Arc<dyn ContentGenerator>,
}

impl AppServices {
    pub fn new(collab: Collaborators, config: &AppConfig) -> Self {
        let processor = RunProcessor::new(
            collab.store.clone(),
            collab.generator,
            RunProcessorConfig::default()
                .with_name("cron")
                .with_max_per_tick(config.runs_max_per_tick)
                .with_max_attempts(config.runs_max_attempts),
        );

        let pipeline = PipelineExecutor::new(
            collab.step_runner,
            JobStore::new(collab.store.clone()),
            Pipeline::site_launch(),
            PipelineConfig::default()
                .with_step_timeout(config.pipeline_step_timeout)
                .with_dry_run(config.pipeline_dry_run)
                .with_optional_enabled(config.pipeline_optional_steps),
        );

        let bulk = BulkScheduler::new(
            MarketingStore::new(collab.store.clone()),
            collab.checker.clone(),
            SchedulerConfig::default().with_approval_required(config.approval_required),
        );

        let dispatcher = ScheduleDispatcher::new(
            MarketingStore::new(collab.store.clone()),
            collab.publisher,
            DispatcherConfig::default().with_batch_size(config.dispatch_batch_size),
        );

        Self {
            processor,
            pipeline,
            bulk,
            dispatcher,
            marketing: MarketingStore::new(collab.store),
            checker: collab.checker,
            content_generator: collab.content_generator,
        }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, ServicesError> {
        Ok(Self::new(Collaborators::from_config(config)?, config))
    }
}
