// ABOUTME: Status command implementation.
// ABOUTME: Resolves an application's infrastructure and reports the live environment.

use bgctl::config::Config;
use bgctl::error::Result;
use bgctl::output::Output;
use bgctl::promotion::PromotionError;
use bgctl::provider::{AwsCliProvider, RetryPolicy};
use bgctl::resolve::{DeploymentTarget, EnvironmentSlot, Resolution, Resolver};
use bgctl::types::{AppName, Environment};
use serde::Serialize;

#[derive(Serialize)]
struct StatusReport<'a> {
    application: &'a AppName,
    live: Environment,
    idle: Environment,
    resolution: &'a Resolution,
    environments: Vec<SlotReport<'a>>,
}

#[derive(Serialize)]
struct SlotReport<'a> {
    environment: Environment,
    target_group: &'a str,
    service: Option<&'a str>,
    desired_count: Option<u32>,
    running_count: Option<u32>,
    image: Option<&'a str>,
}

impl<'a> SlotReport<'a> {
    fn new(slot: &'a EnvironmentSlot) -> Self {
        Self {
            environment: slot.environment,
            target_group: &slot.target_group.name,
            service: slot.service.as_ref().map(|s| s.name.as_str()),
            desired_count: slot.service.as_ref().map(|s| s.desired_count),
            running_count: slot.service.as_ref().map(|s| s.running_count),
            image: slot.current_image.as_deref(),
        }
    }

    fn render(&self, live: Environment) -> String {
        let marker = if self.environment == live { "live" } else { "idle" };
        let service = match (self.service, self.desired_count, self.running_count) {
            (Some(name), Some(desired), Some(running)) => {
                format!("{} ({}/{} running)", name, running, desired)
            }
            _ => "no service".to_string(),
        };
        format!(
            "  {:<5} [{}] {} -> {} {}",
            self.environment.to_string(),
            marker,
            self.target_group,
            service,
            self.image.unwrap_or("-")
        )
    }
}

/// Show which environment serves an application.
pub async fn status(config: &Config, application: &AppName, output: Output) -> Result<()> {
    let app = config.application(application)?;
    let provider = AwsCliProvider::from_config(&config.provider);

    let target = Resolver::new(&provider, config, RetryPolicy::default())
        .resolve(app)
        .await
        .map_err(PromotionError::from)?;

    let report = StatusReport {
        application: &target.application,
        live: target.live(),
        idle: target.idle(),
        resolution: &target.resolution,
        environments: Environment::ALL
            .iter()
            .map(|env| SlotReport::new(target.slot(*env)))
            .collect(),
    };

    output.result(&report, &render(&target, &report));
    Ok(())
}

fn render(target: &DeploymentTarget, report: &StatusReport<'_>) -> String {
    let mut lines = vec![format!(
        "{}: {} live, {} idle",
        report.application, report.live, report.idle
    )];
    if let Resolution::Degraded { ref reason } = target.resolution {
        lines.push(format!("  degraded resolution: {}", reason));
    }
    for slot in &report.environments {
        lines.push(slot.render(report.live));
    }
    lines.join("\n")
}
