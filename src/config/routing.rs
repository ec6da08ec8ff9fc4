// ABOUTME: Listener rule priority bands and smoke-test route settings.
// ABOUTME: Test rules and application rules live in disjoint priority ranges.

use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RoutingConfig {
    /// First priority tried for application rules.
    #[serde(default = "default_rule_base_priority")]
    pub rule_base_priority: u32,

    /// First priority tried for smoke-test rules.
    #[serde(default = "default_test_base_priority")]
    pub test_base_priority: u32,

    #[serde(default = "default_test_path_suffix")]
    pub test_path_suffix: String,

    /// Wait after creating the test rule before probing through it.
    #[serde(default = "default_propagation_delay", with = "humantime_serde")]
    pub propagation_delay: Duration,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            rule_base_priority: default_rule_base_priority(),
            test_base_priority: default_test_base_priority(),
            test_path_suffix: default_test_path_suffix(),
            propagation_delay: default_propagation_delay(),
        }
    }
}

fn default_rule_base_priority() -> u32 {
    50
}

fn default_test_base_priority() -> u32 {
    10
}

fn default_test_path_suffix() -> String {
    "/test".to_string()
}

fn default_propagation_delay() -> Duration {
    Duration::from_secs(10)
}
