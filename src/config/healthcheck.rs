// ABOUTME: Health probe budgets for the smoke and drain stages.
// ABOUTME: Defaults: smoke 3 x 10s over HTTP, drain 30 x 10s on target health.

use serde::Deserialize;
use std::time::Duration;

use crate::health::ProbeBudget;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HealthConfig {
    /// HTTP probe through the temporary test route.
    #[serde(default = "default_smoke")]
    pub smoke: ProbeBudget,

    /// Target-health probe of the newly live group after cutover.
    #[serde(default = "default_drain")]
    pub drain: ProbeBudget,

    #[serde(default = "default_request_timeout", with = "humantime_serde")]
    pub request_timeout: Duration,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            smoke: default_smoke(),
            drain: default_drain(),
            request_timeout: default_request_timeout(),
        }
    }
}

fn default_smoke() -> ProbeBudget {
    ProbeBudget::new(Duration::from_secs(30), Duration::from_secs(10))
}

fn default_drain() -> ProbeBudget {
    ProbeBudget::new(Duration::from_secs(300), Duration::from_secs(10))
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(5)
}
