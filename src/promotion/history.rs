// ABOUTME: Append-only promotion history, one JSON line per run and application.
// ABOUTME: Rollback targets come from here rather than from registry tags.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tokio::io::AsyncWriteExt;

use crate::types::{AppName, ImageRef};

use super::PromotionError;
use super::record::PromotionRecord;

/// Subdirectory of the state directory holding history files.
const HISTORY_DIR: &str = "history";

/// Promotion records of every application under one state directory.
#[derive(Debug, Clone)]
pub struct PromotionHistory {
    dir: PathBuf,
}

impl PromotionHistory {
    pub fn new(state_dir: &Path) -> Self {
        Self {
            dir: state_dir.join(HISTORY_DIR),
        }
    }

    /// History file of one application.
    pub fn path(&self, application: &AppName) -> PathBuf {
        self.dir.join(format!("{}.jsonl", application))
    }

    pub async fn append(&self, record: &PromotionRecord) -> Result<(), PromotionError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| history_error("create", &self.dir, e))?;

        let mut line = serde_json::to_string(record)
            .map_err(|e| PromotionError::History(format!("failed to serialize record: {}", e)))?;
        line.push('\n');

        let path = self.path(&record.application);
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|e| history_error("open", &path, e))?;
        file.write_all(line.as_bytes())
            .await
            .map_err(|e| history_error("write", &path, e))?;
        file.flush()
            .await
            .map_err(|e| history_error("write", &path, e))?;

        tracing::debug!("Appended {} record to {}", record.outcome, path.display());
        Ok(())
    }

    /// All records of `application`, oldest first. A missing file is an
    /// empty history; an undecodable line is an error.
    pub async fn list(&self, application: &AppName) -> Result<Vec<PromotionRecord>, PromotionError> {
        let path = self.path(application);
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(history_error("read", &path, e)),
        };

        content
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(index, line)| {
                serde_json::from_str(line).map_err(|e| {
                    PromotionError::History(format!(
                        "{} line {}: {}",
                        path.display(),
                        index + 1,
                        e
                    ))
                })
            })
            .collect()
    }

    /// The most recent succeeded promotion.
    pub async fn last_succeeded(
        &self,
        application: &AppName,
    ) -> Result<Option<PromotionRecord>, PromotionError> {
        let records = self.list(application).await?;
        Ok(records.into_iter().rev().find(PromotionRecord::succeeded))
    }

    /// Image that was live before the last succeeded promotion.
    pub async fn rollback_image(&self, application: &AppName) -> Result<ImageRef, PromotionError> {
        let previous = self
            .last_succeeded(application)
            .await?
            .and_then(|record| record.previous_image)
            .ok_or_else(|| PromotionError::NoPreviousPromotion(application.clone()))?;
        ImageRef::parse(&previous).map_err(|e| {
            PromotionError::History(format!("recorded image '{}' is invalid: {}", previous, e))
        })
    }
}

fn history_error(action: &str, path: &Path, err: std::io::Error) -> PromotionError {
    PromotionError::History(format!("failed to {} {}: {}", action, path.display(), err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::PromotionMode;
    use crate::promotion::{Outcome, PromotionErrorKind, Stage};
    use crate::types::Environment;
    use chrono::Utc;

    fn app() -> AppName {
        AppName::new("app_2").unwrap()
    }

    fn record(image: &str, previous: Option<&str>, outcome: Outcome) -> PromotionRecord {
        let now = Utc::now();
        PromotionRecord {
            application: app(),
            from_env: Some(Environment::Blue),
            to_env: Some(Environment::Green),
            image: ImageRef::parse(image).unwrap(),
            previous_image: previous.map(str::to_string),
            mode: PromotionMode::Switch,
            started_at: now,
            finished_at: now,
            outcome,
            failed_stage: (outcome != Outcome::Succeeded).then_some(Stage::SmokeTest),
            error: None,
            warnings: Vec::new(),
        }
    }

    #[tokio::test]
    async fn missing_history_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let history = PromotionHistory::new(dir.path());
        assert!(history.list(&app()).await.unwrap().is_empty());
        assert!(history.last_succeeded(&app()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn appends_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let history = PromotionHistory::new(dir.path());
        history
            .append(&record("app2:V9", Some("app2:V8"), Outcome::Succeeded))
            .await
            .unwrap();
        history
            .append(&record("app2:V10", Some("app2:V9"), Outcome::Aborted))
            .await
            .unwrap();

        let records = history.list(&app()).await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].image.to_string(), "app2:V9");
        assert_eq!(records[1].outcome, Outcome::Aborted);
    }

    #[tokio::test]
    async fn rollback_image_skips_failed_runs() {
        let dir = tempfile::tempdir().unwrap();
        let history = PromotionHistory::new(dir.path());
        history
            .append(&record("app2:V9", Some("app2:V8"), Outcome::Succeeded))
            .await
            .unwrap();
        history
            .append(&record("app2:V10", Some("app2:V9"), Outcome::RolledBack))
            .await
            .unwrap();

        let image = history.rollback_image(&app()).await.unwrap();
        assert_eq!(image.to_string(), "app2:V8");
    }

    #[tokio::test]
    async fn rollback_without_a_succeeded_run_fails() {
        let dir = tempfile::tempdir().unwrap();
        let history = PromotionHistory::new(dir.path());
        history
            .append(&record("app2:V10", None, Outcome::Succeeded))
            .await
            .unwrap();

        let err = history.rollback_image(&app()).await.unwrap_err();
        assert_eq!(err.kind(), PromotionErrorKind::NoPreviousPromotion);
    }

    #[tokio::test]
    async fn undecodable_lines_fail_closed() {
        let dir = tempfile::tempdir().unwrap();
        let history = PromotionHistory::new(dir.path());
        std::fs::create_dir_all(dir.path().join(HISTORY_DIR)).unwrap();
        std::fs::write(history.path(&app()), "{\"application\":\"app_2\"}\n").unwrap();

        let err = history.list(&app()).await.unwrap_err();
        assert_eq!(err.kind(), PromotionErrorKind::History);
        assert!(err.to_string().contains("line 1"));
    }
}
