// ABOUTME: Terminal record of a promotion run, persisted in the history.
// ABOUTME: Every run ends in exactly one record, whatever its outcome.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::context::{PromotionContext, PromotionMode};
use crate::diagnostics::Warning;
use crate::types::{AppName, Environment, ImageRef};

/// Stages of the promotion state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Stage {
    Resolve,
    DeployIdle,
    SmokeTest,
    Cutover,
    DrainOld,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Resolve => "RESOLVE",
            Stage::DeployIdle => "DEPLOY_IDLE",
            Stage::SmokeTest => "SMOKE_TEST",
            Stage::Cutover => "CUTOVER",
            Stage::DrainOld => "DRAIN_OLD",
        };
        f.write_str(name)
    }
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Outcome {
    Succeeded,
    /// Traffic had moved and was restored.
    RolledBack,
    /// Stopped before any routing change was committed.
    Aborted,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Succeeded => f.write_str("SUCCEEDED"),
            Outcome::RolledBack => f.write_str("ROLLED_BACK"),
            Outcome::Aborted => f.write_str("ABORTED"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromotionRecord {
    pub application: AppName,
    /// Live environment before the run; unknown when resolution failed.
    pub from_env: Option<Environment>,
    pub to_env: Option<Environment>,
    pub image: ImageRef,
    /// Image that was live before the run.
    pub previous_image: Option<String>,
    pub mode: PromotionMode,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub outcome: Outcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed_stage: Option<Stage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<Warning>,
}

impl PromotionRecord {
    /// An in-flight record; `finish` or `abort` sets the outcome.
    pub(crate) fn begin(ctx: &PromotionContext) -> Self {
        let now = Utc::now();
        Self {
            application: ctx.application.name.clone(),
            from_env: None,
            to_env: None,
            image: ctx.image.clone(),
            previous_image: None,
            mode: ctx.mode,
            started_at: now,
            finished_at: now,
            outcome: Outcome::Aborted,
            failed_stage: None,
            error: None,
            warnings: Vec::new(),
        }
    }

    pub fn succeeded(&self) -> bool {
        self.outcome == Outcome::Succeeded
    }

    /// One-line human summary.
    pub fn summary(&self) -> String {
        let route = match (self.from_env, self.to_env) {
            (Some(from), Some(to)) => format!("{from} -> {to}"),
            _ => "unresolved".to_string(),
        };
        match (self.outcome, self.failed_stage) {
            (Outcome::Succeeded, _) => format!(
                "{} {} {} ({}): {}",
                self.application, self.mode, self.image, route, self.outcome
            ),
            (_, Some(stage)) => format!(
                "{} {} {} ({}): {} at {}",
                self.application, self.mode, self.image, route, self.outcome, stage
            ),
            (_, None) => format!(
                "{} {} {} ({}): {}",
                self.application, self.mode, self.image, route, self.outcome
            ),
        }
    }
}
