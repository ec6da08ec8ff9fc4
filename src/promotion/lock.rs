// ABOUTME: Run lock preventing concurrent promotions of the same application.
// ABOUTME: Uses atomic file creation with lock info stored under the state directory.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;

use crate::types::AppName;

use super::PromotionError;

/// Subdirectory of the state directory holding lock files.
const LOCK_DIR: &str = "locks";

/// Age after which a lock is considered abandoned.
const STALE_AFTER: Duration = Duration::from_secs(60 * 60);

/// Information about who holds a promotion lock.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockInfo {
    /// Hostname of the machine that holds the lock.
    pub holder: String,
    /// Process ID of the lock holder.
    pub pid: u32,
    /// When the lock was acquired.
    pub started_at: DateTime<Utc>,
    /// Application being promoted.
    pub application: String,
}

impl LockInfo {
    /// Create new lock info for the current process.
    pub fn new(application: &AppName) -> Self {
        Self {
            holder: gethostname::gethostname().to_string_lossy().into_owned(),
            pid: std::process::id(),
            started_at: Utc::now(),
            application: application.to_string(),
        }
    }

    /// Check if this lock is stale (older than 1 hour).
    pub fn is_stale(&self) -> bool {
        (Utc::now() - self.started_at)
            .to_std()
            .is_ok_and(|age| age >= STALE_AFTER)
    }

    /// Path to the lock file for an application.
    pub fn lock_path(state_dir: &Path, application: &AppName) -> PathBuf {
        state_dir
            .join(LOCK_DIR)
            .join(format!("{}.lock", application))
    }
}

/// A held promotion lock. Call `release` when the run is over.
#[derive(Debug)]
pub struct PromotionLock {
    path: PathBuf,
    application: AppName,
    info: LockInfo,
}

/// Distinguishes temp files of concurrent acquires within one process.
static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

impl PromotionLock {
    /// Acquire the lock for `application`.
    ///
    /// The lock content is written to a temp file and hard-linked into place,
    /// so the lock file is never observed half-written and two runs can never
    /// both succeed. A stale lock (>1 hour) is broken with a warning; a live
    /// or unreadable one only with `force`.
    pub async fn acquire(
        state_dir: &Path,
        application: &AppName,
        force: bool,
    ) -> Result<Self, PromotionError> {
        let path = LockInfo::lock_path(state_dir, application);
        if let Some(dir) = path.parent() {
            tokio::fs::create_dir_all(dir).await.map_err(|e| {
                PromotionError::lock_error(format!(
                    "failed to create lock directory {}: {}",
                    dir.display(),
                    e
                ))
            })?;
        }

        let info = LockInfo::new(application);
        let lock_json = serde_json::to_string(&info)
            .map_err(|e| PromotionError::lock_error(format!("failed to serialize lock: {}", e)))?;

        if Self::try_create(&path, &lock_json).await? {
            return Ok(Self::held(path, application, info));
        }

        match Self::check_existing_lock(&path, force).await? {
            ExistingLock::Breakable => {}
            ExistingLock::Held(existing) => {
                return Err(PromotionError::lock_held(
                    existing.holder,
                    existing.pid,
                    existing.started_at,
                ));
            }
            ExistingLock::Unreadable => {
                return Err(PromotionError::lock_error(format!(
                    "lock {} is held but unreadable; use --yes-break-lock to break it",
                    path.display()
                )));
            }
        }

        tracing::debug!("Removing stale/forced lock at {}", path.display());
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => {
                return Err(PromotionError::lock_error(format!(
                    "failed to break lock {}: {}",
                    path.display(),
                    e
                )));
            }
        }

        if !Self::try_create(&path, &lock_json).await? {
            return Err(PromotionError::lock_error(
                "lock acquired by another process during break".to_string(),
            ));
        }

        Ok(Self::held(path, application, info))
    }

    fn held(path: PathBuf, application: &AppName, info: LockInfo) -> Self {
        tracing::debug!("Acquired promotion lock {}", path.display());
        Self {
            path,
            application: application.clone(),
            info,
        }
    }

    /// Publish `content` at `path`. `Ok(false)` when a lock already exists.
    async fn try_create(path: &Path, content: &str) -> Result<bool, PromotionError> {
        let temp = temp_path(path);
        let written = Self::write_temp(&temp, content).await;
        let linked = match written {
            Ok(()) => tokio::fs::hard_link(&temp, path).await,
            Err(e) => Err(e),
        };
        if let Err(e) = tokio::fs::remove_file(&temp).await
            && e.kind() != ErrorKind::NotFound
        {
            tracing::warn!("failed to remove {}: {}", temp.display(), e);
        }

        match linked {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(false),
            Err(e) => Err(PromotionError::lock_error(format!(
                "failed to create lock {}: {}",
                path.display(),
                e
            ))),
        }
    }

    async fn write_temp(temp: &Path, content: &str) -> std::io::Result<()> {
        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(temp)
            .await?;
        file.write_all(content.as_bytes()).await?;
        file.sync_all().await
    }

    /// Decide whether an existing lock may be broken. Unreadable content
    /// counts as held until the file itself is an hour old.
    async fn check_existing_lock(path: &Path, force: bool) -> Result<ExistingLock, PromotionError> {
        let content = match tokio::fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(ExistingLock::Breakable),
            Err(e) => {
                return Err(PromotionError::lock_error(format!(
                    "failed to read lock info: {}",
                    e
                )));
            }
        };

        match serde_json::from_str::<LockInfo>(&content) {
            Ok(existing_lock) => {
                if force {
                    tracing::warn!(
                        "Breaking lock held by {} (pid {}) since {}",
                        existing_lock.holder,
                        existing_lock.pid,
                        existing_lock.started_at
                    );
                    Ok(ExistingLock::Breakable)
                } else if existing_lock.is_stale() {
                    tracing::warn!(
                        "Auto-breaking stale lock held by {} (pid {}) since {}",
                        existing_lock.holder,
                        existing_lock.pid,
                        existing_lock.started_at
                    );
                    Ok(ExistingLock::Breakable)
                } else {
                    Ok(ExistingLock::Held(existing_lock))
                }
            }
            Err(_) if force => {
                tracing::warn!("Breaking unreadable lock {}", path.display());
                Ok(ExistingLock::Breakable)
            }
            Err(_) if file_is_stale(path).await => {
                tracing::warn!("Auto-breaking stale unreadable lock {}", path.display());
                Ok(ExistingLock::Breakable)
            }
            Err(_) => Ok(ExistingLock::Unreadable),
        }
    }

    pub fn application(&self) -> &AppName {
        &self.application
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Release the lock. A lock file that no longer carries this run's
    /// holder and pid belongs to someone else and is left in place.
    pub async fn release(self) -> Result<(), PromotionError> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
            Err(e) => {
                return Err(PromotionError::lock_error(format!(
                    "failed to read lock {}: {}",
                    self.path.display(),
                    e
                )));
            }
        };
        let ours = serde_json::from_str::<LockInfo>(&content).is_ok_and(|current| {
            current.holder == self.info.holder
                && current.pid == self.info.pid
                && current.started_at == self.info.started_at
        });
        if !ours {
            return Err(PromotionError::lock_error(format!(
                "lock {} was taken over by another run; leaving it in place",
                self.path.display()
            )));
        }

        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(PromotionError::lock_error(format!(
                "failed to remove lock {}: {}",
                self.path.display(),
                e
            ))),
        }
    }
}

enum ExistingLock {
    Breakable,
    Held(LockInfo),
    Unreadable,
}

fn temp_path(path: &Path) -> PathBuf {
    let n = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(format!(".{}.{}.tmp", std::process::id(), n));
    path.with_file_name(name)
}

async fn file_is_stale(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .and_then(|m| m.modified())
        .ok()
        .and_then(|modified| modified.elapsed().ok())
        .is_some_and(|age| age >= STALE_AFTER)
}
