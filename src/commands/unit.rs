// ABOUTME: Unit command implementation.
// ABOUTME: Replaces an application's supervisor unit on a virtual machine host.

use bgctl::config::Config;
use bgctl::context::PromotionMode;
use bgctl::error::Result;
use bgctl::output::Output;
use bgctl::supervisor::{SystemdSupervisor, UnitSpec, replace_unit};
use bgctl::types::AppName;

/// Stop, rewrite, enable and start the unit for `application`.
pub async fn unit(
    config: &Config,
    application: &AppName,
    mode: PromotionMode,
    mut output: Output,
) -> Result<()> {
    output.start_timer();
    config.application(application)?;

    let spec = UnitSpec::for_application(&config.supervisor, application, mode);
    let supervisor = SystemdSupervisor::from_config(&config.supervisor);

    output.progress(&format!(
        "  → Installing {}",
        supervisor.unit_path(&spec).display()
    ));
    let status = replace_unit(&supervisor, &spec).await?;

    output.success(&format!("{} is {}", spec.name, status));
    Ok(())
}
