// ABOUTME: Drives one promotion run through every stage to a terminal record.
// ABOUTME: Failures after cutover restore the previous routing before the run ends.

use chrono::Utc;

use crate::context::PromotionContext;
use crate::diagnostics::Diagnostics;
use crate::health::HttpProbe;
use crate::provider::Provider;

use super::error::PromotionError;
use super::machine::{Promotion, StageContext};
use super::record::{Outcome, PromotionRecord, Stage};
use super::state::Resolved;

/// Runs promotions for one context.
pub struct PromotionController<'a, P: ?Sized> {
    stages: StageContext<'a, P>,
}

impl<'a, P> PromotionController<'a, P>
where
    P: Provider + ?Sized,
{
    pub fn new(provider: &'a P, http: &'a dyn HttpProbe, ctx: &'a PromotionContext) -> Self {
        Self {
            stages: StageContext::new(provider, http, ctx),
        }
    }

    /// Run `RESOLVE → DEPLOY_IDLE → SMOKE_TEST → CUTOVER → DRAIN_OLD`.
    ///
    /// Never fails: the returned record carries the outcome, the failed
    /// stage and the error.
    pub async fn run(&self) -> PromotionRecord {
        let mut record = PromotionRecord::begin(self.stages.ctx);
        self.drive(&mut record).await;
        record.finished_at = Utc::now();
        tracing::info!("{}", record.summary());
        record
    }

    async fn drive(&self, record: &mut PromotionRecord) {
        let stages = &self.stages;

        tracing::info!("RESOLVE {}", stages.ctx.application.name);
        let resolved = match Promotion::<Resolved>::resolve(stages).await {
            Ok(p) => p,
            Err(e) => return abort(record, Stage::Resolve, Diagnostics::default(), e),
        };
        record.from_env = Some(resolved.live());
        record.to_env = Some(resolved.idle());
        record.previous_image = resolved.target().live_slot().current_image.clone();

        tracing::info!("DEPLOY_IDLE {} -> {}", stages.ctx.image, resolved.idle());
        let deployed = match resolved.deploy_idle(stages).await {
            Ok(p) => p,
            Err((mut p, e)) => return abort(record, Stage::DeployIdle, p.take_diagnostics(), e),
        };

        tracing::info!("SMOKE_TEST {}", deployed.idle());
        let tested = match deployed.smoke_test(stages).await {
            Ok(p) => p,
            Err((mut p, e)) => return abort(record, Stage::SmokeTest, p.take_diagnostics(), e),
        };

        tracing::info!("CUTOVER {} -> {}", tested.live(), tested.idle());
        let cut_over = match tested.cutover(stages).await {
            Ok(p) => p,
            Err((mut p, e)) => return abort(record, Stage::Cutover, p.take_diagnostics(), e),
        };

        tracing::info!("DRAIN_OLD {}", cut_over.live());
        let mut completed = match cut_over.drain_old(stages).await {
            Ok(p) => p,
            Err((mut p, e)) => {
                let diagnostics = p.take_diagnostics();
                let stage = Some(Stage::DrainOld);
                return match p.rollback(stages).await {
                    Ok(_) => finish(record, Outcome::RolledBack, stage, diagnostics, Some(e)),
                    Err(restore) => {
                        let message =
                            format!("{e}; rollback failed: {restore}");
                        finish_with_message(record, Outcome::Aborted, stage, diagnostics, message)
                    }
                };
            }
        };

        let diagnostics = completed.take_diagnostics();
        let target = completed.finish();
        tracing::info!("DONE {} live={}", target.application, target.live());
        finish(record, Outcome::Succeeded, None, diagnostics, None);
    }
}

fn abort(
    record: &mut PromotionRecord,
    stage: Stage,
    diagnostics: Diagnostics,
    error: PromotionError,
) {
    finish(record, Outcome::Aborted, Some(stage), diagnostics, Some(error));
}

fn finish(
    record: &mut PromotionRecord,
    outcome: Outcome,
    stage: Option<Stage>,
    diagnostics: Diagnostics,
    error: Option<PromotionError>,
) {
    match error {
        Some(e) => finish_with_message(record, outcome, stage, diagnostics, e.to_string()),
        None => {
            record.outcome = outcome;
            record.failed_stage = stage;
            record.warnings = diagnostics.into_warnings();
        }
    }
}

fn finish_with_message(
    record: &mut PromotionRecord,
    outcome: Outcome,
    stage: Option<Stage>,
    diagnostics: Diagnostics,
    message: String,
) {
    if let Some(stage) = stage {
        tracing::error!("{} failed: {}", stage, message);
    }
    record.outcome = outcome;
    record.failed_stage = stage;
    record.error = Some(message);
    record.warnings = diagnostics.into_warnings();
}
