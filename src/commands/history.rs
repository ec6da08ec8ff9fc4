// ABOUTME: History command implementation.
// ABOUTME: Lists the recorded promotions of one application, oldest first.

use std::path::Path;

use bgctl::config::Config;
use bgctl::error::Result;
use bgctl::output::Output;
use bgctl::promotion::PromotionHistory;
use bgctl::types::AppName;

pub async fn history(
    config: &Config,
    project_dir: &Path,
    application: &AppName,
    output: Output,
) -> Result<()> {
    config.application(application)?;
    let history = PromotionHistory::new(&config.state_dir(project_dir));
    let records = history.list(application).await?;

    let human = if records.is_empty() {
        format!("No promotions recorded for {}", application)
    } else {
        records
            .iter()
            .map(|record| {
                format!(
                    "{}  {}",
                    record.finished_at.format("%Y-%m-%d %H:%M:%S"),
                    record.summary()
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    };

    output.result(&records, &human);
    Ok(())
}
