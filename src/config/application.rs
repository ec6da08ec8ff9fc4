// ABOUTME: Per-application routing identity.
// ABOUTME: Derives rule and test path patterns and health URLs from the path prefix.

use serde::Deserialize;

use crate::types::AppName;

/// One application behind the shared load balancer.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ApplicationConfig {
    pub name: AppName,

    /// Routing prefix such as `/app2`. Empty for the primary application.
    #[serde(default)]
    pub path_prefix: String,

    #[serde(default = "default_health_path")]
    pub health_path: String,

    /// Served by the listener's default action instead of a path rule.
    #[serde(default)]
    pub primary: bool,
}

fn default_health_path() -> String {
    "/health".to_string()
}

impl ApplicationConfig {
    /// Path pattern of the application's production rule (`/app2*`).
    pub fn rule_pattern(&self) -> String {
        format!("{}*", self.path_prefix)
    }

    /// Path pattern of the temporary smoke-test rule (`/app2/test*`).
    pub fn test_pattern(&self, test_suffix: &str) -> String {
        format!("{}{}*", self.path_prefix, test_suffix)
    }

    /// Health URL served through the production route.
    pub fn health_url(&self, host: &str) -> String {
        format!("http://{}{}{}", host, self.path_prefix, self.health_path)
    }

    /// Health URL served through the smoke-test route.
    pub fn test_health_url(&self, host: &str, test_suffix: &str) -> String {
        format!(
            "http://{}{}{}{}",
            host, self.path_prefix, test_suffix, self.health_path
        )
    }

    pub(crate) fn validate(&self) -> Result<(), String> {
        if !self.path_prefix.is_empty() && !self.path_prefix.starts_with('/') {
            return Err(format!(
                "{}: path_prefix must start with '/'",
                self.name
            ));
        }
        if self.path_prefix.ends_with('/') || self.path_prefix.contains('*') {
            return Err(format!(
                "{}: path_prefix must not end with '/' or contain '*'",
                self.name
            ));
        }
        if self.path_prefix.is_empty() && !self.primary {
            return Err(format!(
                "{}: only the primary application may omit path_prefix",
                self.name
            ));
        }
        if !self.health_path.starts_with('/') {
            return Err(format!("{}: health_path must start with '/'", self.name));
        }
        Ok(())
    }
}
