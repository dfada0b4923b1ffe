//! Pipeline definitions.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    /// Always runs
    Required,
    /// Skipped when optional steps are disabled
    Optional,
    /// Skipped in dry-run mode
    Publish,
}

/// One named remote step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepSpec {
    pub name: String,
    pub kind: StepKind,
    /// Step to run once when this one reports a missing prerequisite.
    pub remediation: Option<String>,
}

impl StepSpec {
    pub fn required(name: impl Into<String>) -> Self {
        Self::new(name, StepKind::Required)
    }

    pub fn optional(name: impl Into<String>) -> Self {
        Self::new(name, StepKind::Optional)
    }

    pub fn publish(name: impl Into<String>) -> Self {
        Self::new(name, StepKind::Publish)
    }

    fn new(name: impl Into<String>, kind: StepKind) -> Self {
        Self {
            name: name.into(),
            kind,
            remediation: None,
        }
    }

    pub fn with_remediation(mut self, step: impl Into<String>) -> Self {
        self.remediation = Some(step.into());
        self
    }
}

/// Validated, ordered list of steps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pipeline {
    steps: Vec<StepSpec>,
}

impl Pipeline {
    pub fn new(steps: Vec<StepSpec>) -> Result<Self, PipelineError> {
        if steps.is_empty() {
            return Err(PipelineError::Empty);
        }
        let mut seen = HashSet::new();
        for step in &steps {
            if !seen.insert(step.name.as_str()) {
                return Err(PipelineError::DuplicateStep(step.name.clone()));
            }
        }
        Ok(Self { steps })
    }

    /// `audit → seo → conversion → finish (optional) → publish`, where publish
    /// is healed by `seed-spec`.
    pub fn site_launch() -> Self {
        Self {
            steps: vec![
                StepSpec::required("audit"),
                StepSpec::required("seo"),
                StepSpec::required("conversion"),
                StepSpec::optional("finish"),
                StepSpec::publish("publish").with_remediation("seed-spec"),
            ],
        }
    }

    pub fn steps(&self) -> &[StepSpec] {
        &self.steps
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::site_launch()
    }
}
