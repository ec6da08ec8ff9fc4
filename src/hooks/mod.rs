// ABOUTME: Hooks system for promotion lifecycle events.
// ABOUTME: Discovers and executes shell scripts at pre-promote, post-promote, and on-error points.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

use crate::context::PromotionMode;
use crate::types::{AppName, Environment};

/// Hook execution points in the promotion lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookPoint {
    /// Before the run starts. Failure aborts the promotion.
    PrePromote,
    /// After a successful promotion. Failure logs warning.
    PostPromote,
    /// On promotion failure. Failure logs warning.
    OnError,
}

impl HookPoint {
    /// Get the hook filename for this point.
    pub fn filename(&self) -> &'static str {
        match self {
            HookPoint::PrePromote => "pre-promote",
            HookPoint::PostPromote => "post-promote",
            HookPoint::OnError => "on-error",
        }
    }

    /// Whether failure at this hook point should abort the promotion.
    pub fn is_fatal(&self) -> bool {
        matches!(self, HookPoint::PrePromote)
    }
}

/// Context passed to hooks via environment variables.
#[derive(Debug, Clone)]
pub struct HookContext {
    pub application: AppName,
    pub image: String,
    pub mode: PromotionMode,
    /// Live environment before the run, once resolved.
    pub from_env: Option<Environment>,
    pub to_env: Option<Environment>,
    /// Failure message, for `on-error`.
    pub error: Option<String>,
}

impl HookContext {
    /// Convert context to environment variables.
    pub fn to_env(&self) -> HashMap<String, String> {
        let mut env = HashMap::new();
        env.insert("BGCTL_APPLICATION".to_string(), self.application.to_string());
        env.insert("BGCTL_IMAGE".to_string(), self.image.clone());
        env.insert("BGCTL_MODE".to_string(), self.mode.to_string());
        if let Some(from) = self.from_env {
            env.insert("BGCTL_FROM_ENV".to_string(), from.to_string());
        }
        if let Some(to) = self.to_env {
            env.insert("BGCTL_TO_ENV".to_string(), to.to_string());
        }
        if let Some(ref error) = self.error {
            env.insert("BGCTL_ERROR".to_string(), error.clone());
        }
        env
    }
}

/// Result of running a hook.
#[derive(Debug)]
pub struct HookResult {
    pub success: bool,
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

/// Discovers and runs hooks from a project directory.
pub struct HookRunner {
    hooks_dir: PathBuf,
}

impl HookRunner {
    /// Create a new hook runner looking for hooks in the given project directory.
    pub fn new(project_dir: &Path) -> Self {
        Self {
            hooks_dir: project_dir.join(".bgctl").join("hooks"),
        }
    }

    /// Check if a hook exists for the given point.
    pub fn hook_exists(&self, point: HookPoint) -> bool {
        self.hook_path(point).is_file()
    }

    /// Get the path to a hook script.
    fn hook_path(&self, point: HookPoint) -> PathBuf {
        self.hooks_dir.join(point.filename())
    }

    /// Run a hook if it exists.
    ///
    /// Returns None if the hook doesn't exist, or Some(HookResult) if it was run.
    pub async fn run(&self, point: HookPoint, context: &HookContext) -> Option<HookResult> {
        let hook_path = self.hook_path(point);

        if !hook_path.is_file() {
            return None;
        }

        tracing::info!("Running {} hook: {}", point.filename(), hook_path.display());

        let env_vars = context.to_env();

        let output = Command::new(&hook_path)
            .envs(&env_vars)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await;

        match output {
            Ok(output) => {
                let result = HookResult {
                    success: output.status.success(),
                    exit_code: output.status.code(),
                    stdout: String::from_utf8_lossy(&output.stdout).to_string(),
                    stderr: String::from_utf8_lossy(&output.stderr).to_string(),
                };

                if result.success {
                    tracing::info!("{} hook completed successfully", point.filename());
                } else {
                    tracing::warn!(
                        "{} hook failed with exit code {:?}",
                        point.filename(),
                        result.exit_code
                    );
                }

                Some(result)
            }
            Err(e) => {
                tracing::error!("Failed to execute {} hook: {}", point.filename(), e);
                Some(HookResult {
                    success: false,
                    exit_code: None,
                    stdout: String::new(),
                    stderr: e.to_string(),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> HookContext {
        HookContext {
            application: AppName::new("app_2").unwrap(),
            image: "registry.local/app2:V10".to_string(),
            mode: PromotionMode::Switch,
            from_env: Some(Environment::Blue),
            to_env: Some(Environment::Green),
            error: None,
        }
    }

    #[test]
    fn hook_point_filenames() {
        assert_eq!(HookPoint::PrePromote.filename(), "pre-promote");
        assert_eq!(HookPoint::PostPromote.filename(), "post-promote");
        assert_eq!(HookPoint::OnError.filename(), "on-error");
    }

    #[test]
    fn pre_promote_is_fatal() {
        assert!(HookPoint::PrePromote.is_fatal());
        assert!(!HookPoint::PostPromote.is_fatal());
        assert!(!HookPoint::OnError.is_fatal());
    }

    #[test]
    fn hook_context_to_env() {
        let env = context().to_env();
        assert_eq!(env.get("BGCTL_APPLICATION"), Some(&"app_2".to_string()));
        assert_eq!(
            env.get("BGCTL_IMAGE"),
            Some(&"registry.local/app2:V10".to_string())
        );
        assert_eq!(env.get("BGCTL_MODE"), Some(&"switch".to_string()));
        assert_eq!(env.get("BGCTL_FROM_ENV"), Some(&"BLUE".to_string()));
        assert_eq!(env.get("BGCTL_TO_ENV"), Some(&"GREEN".to_string()));
        assert!(!env.contains_key("BGCTL_ERROR"));
    }

    #[test]
    fn unresolved_environments_are_omitted() {
        let mut context = context();
        context.from_env = None;
        context.to_env = None;
        context.error = Some("SMOKE_TEST failed".to_string());

        let env = context.to_env();
        assert!(!env.contains_key("BGCTL_FROM_ENV"));
        assert!(!env.contains_key("BGCTL_TO_ENV"));
        assert_eq!(env.get("BGCTL_ERROR"), Some(&"SMOKE_TEST failed".to_string()));
    }

    #[test]
    fn hook_runner_checks_hooks_dir() {
        let runner = HookRunner::new(Path::new("/nonexistent"));
        assert!(!runner.hook_exists(HookPoint::PrePromote));
    }
}
