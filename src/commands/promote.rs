// ABOUTME: Promote command implementation.
// ABOUTME: Wraps one promotion run with the run lock, hooks and history.

use std::path::Path;

use bgctl::config::Config;
use bgctl::context::{PromotionContext, PromotionMode, PromotionOptions};
use bgctl::diagnostics::Warning;
use bgctl::error::{Error, Result};
use bgctl::health::HyperProbe;
use bgctl::hooks::{HookContext, HookPoint, HookRunner};
use bgctl::output::{Output, OutputMode};
use bgctl::promotion::{PromotionController, PromotionHistory, PromotionLock, PromotionRecord};
use bgctl::provider::AwsCliProvider;
use bgctl::types::{AppName, ImageRef};

/// Arguments of `bgctl promote`.
pub struct PromoteRequest {
    pub application: AppName,
    pub mode: PromotionMode,
    pub image: Option<String>,
    pub force: bool,
    pub break_lock: bool,
}

/// Run one promotion for an application.
pub async fn promote(
    config: &Config,
    project_dir: &Path,
    request: PromoteRequest,
    mut output: Output,
) -> Result<()> {
    output.start_timer();

    let application = config.application(&request.application)?.clone();
    let state_dir = config.state_dir(project_dir);
    let history = PromotionHistory::new(&state_dir);

    let explicit = match (request.mode, request.image) {
        (_, Some(image)) => Some(
            ImageRef::parse(&image).map_err(|e| Error::InvalidArgument(e.to_string()))?,
        ),
        (PromotionMode::Rollback, None) => None,
        (PromotionMode::Switch, None) => {
            return Err(Error::InvalidArgument(
                "--image is required for a switch promotion".to_string(),
            ));
        }
    };

    output.progress("  → Acquiring promotion lock...");
    let lock = PromotionLock::acquire(&state_dir, &application.name, request.break_lock).await?;

    // Rollback target is read under the lock.
    let image = match explicit {
        Some(image) => image,
        None => match history.rollback_image(&application.name).await {
            Ok(image) => image,
            Err(e) => {
                if let Err(release) = lock.release().await {
                    tracing::warn!("{}", release);
                }
                return Err(e.into());
            }
        },
    };

    output.progress(&format!(
        "Promoting {} ({}) for {}",
        image, request.mode, application.name
    ));

    let hook_runner = HookRunner::new(project_dir);
    let mut hook_context = HookContext {
        application: application.name.clone(),
        image: image.to_string(),
        mode: request.mode,
        from_env: None,
        to_env: None,
        error: None,
    };

    if let Some(result) = hook_runner.run(HookPoint::PrePromote, &hook_context).await
        && !result.success
    {
        if !result.stderr.is_empty() {
            eprintln!("{}", result.stderr);
        }
        if let Err(e) = lock.release().await {
            tracing::warn!("{}", e);
        }
        return Err(Error::HookFailed(HookPoint::PrePromote.filename()));
    }

    let ctx = PromotionContext {
        application,
        image,
        mode: request.mode,
        options: PromotionOptions {
            force: request.force,
            ..PromotionOptions::default()
        },
        settings: config.clone(),
    };
    let provider = AwsCliProvider::from_config(&config.provider);
    let http = HyperProbe;

    output.progress("  → Running RESOLVE → DEPLOY_IDLE → SMOKE_TEST → CUTOVER → DRAIN_OLD...");
    let mut record = PromotionController::new(&provider, &http, &ctx).run().await;

    if let Err(e) = history.append(&record).await {
        record.warnings.push(Warning::history_write(e.to_string()));
    }

    hook_context.from_env = record.from_env;
    hook_context.to_env = record.to_env;
    hook_context.error = record.error.clone();
    let point = if record.succeeded() {
        HookPoint::PostPromote
    } else {
        HookPoint::OnError
    };
    if let Some(result) = hook_runner.run(point, &hook_context).await
        && !result.success
    {
        record.warnings.push(Warning::hook_failure(format!(
            "{} hook exited with {:?}",
            point.filename(),
            result.exit_code
        )));
    }

    if let Err(e) = lock.release().await {
        record
            .warnings
            .push(Warning::lock_release(format!("failed to release lock: {}", e)));
    }

    report(&output, &record);

    if record.succeeded() {
        Ok(())
    } else {
        Err(Error::PromotionFailed(record.outcome))
    }
}

fn report(output: &Output, record: &PromotionRecord) {
    if output.mode() != OutputMode::Json {
        for warning in &record.warnings {
            output.warning(warning);
        }
    }
    let human = match record.error {
        Some(ref error) => format!("{}\n  {}", record.summary(), error),
        None => record.summary(),
    };
    if record.succeeded() && output.mode() == OutputMode::Normal {
        output.success(&human);
    } else {
        output.result(record, &human);
    }
}
