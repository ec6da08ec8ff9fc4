// ABOUTME: Bounded polling of an environment's readiness.
// ABOUTME: Produces a HealthVerdict; exhausting the budget is reported, not raised.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::http::HttpProbe;
use crate::provider::{HealthOps, TargetHealthState};
use crate::types::{Environment, TargetGroupId};

/// Which signals must pass for an attempt to count as healthy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeMode {
    /// Provider target-health only (all registered targets healthy).
    Targets,
    /// HTTP health endpoint only.
    Http,
    /// Both signals in the same attempt.
    Combined,
}

/// Time budget and poll interval of one probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeBudget {
    #[serde(with = "humantime_serde")]
    pub budget: Duration,
    #[serde(with = "humantime_serde")]
    pub interval: Duration,
}

impl ProbeBudget {
    pub fn new(budget: Duration, interval: Duration) -> Self {
        Self { budget, interval }
    }

    /// `ceil(budget / interval)`, never less than one.
    pub fn attempts(&self) -> u32 {
        if self.interval.is_zero() {
            return 1;
        }
        let attempts = self.budget.as_nanos().div_ceil(self.interval.as_nanos());
        u32::try_from(attempts).unwrap_or(u32::MAX).max(1)
    }
}

/// What to probe.
#[derive(Debug, Clone)]
pub struct ProbeTarget {
    pub environment: Environment,
    pub target_group: TargetGroupId,
    /// Full health URL; required for the `Http` and `Combined` modes.
    pub health_url: Option<String>,
}

/// Outcome of a probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthVerdict {
    pub environment: Environment,
    pub healthy: bool,
    pub checked_at: DateTime<Utc>,
    pub attempts: u32,
}

/// Polls readiness signals within a bounded budget.
pub struct HealthProber<'a, P: ?Sized> {
    provider: &'a P,
    http: &'a dyn HttpProbe,
    request_timeout: Duration,
}

impl<'a, P> HealthProber<'a, P>
where
    P: HealthOps + ?Sized,
{
    pub fn new(provider: &'a P, http: &'a dyn HttpProbe, request_timeout: Duration) -> Self {
        Self {
            provider,
            http,
            request_timeout,
        }
    }

    /// Poll until healthy or the attempts run out. Sleeps `interval` between
    /// attempts, never after the last one.
    pub async fn probe(
        &self,
        target: &ProbeTarget,
        mode: ProbeMode,
        budget: ProbeBudget,
    ) -> HealthVerdict {
        let max_attempts = budget.attempts();
        let mut attempts = 0;
        let mut healthy = false;

        while attempts < max_attempts {
            attempts += 1;
            healthy = self.check_once(target, mode).await;
            tracing::debug!(
                "{} health attempt {}/{} ({:?}): {}",
                target.environment,
                attempts,
                max_attempts,
                mode,
                if healthy { "healthy" } else { "not healthy" }
            );
            if healthy || attempts == max_attempts {
                break;
            }
            tokio::time::sleep(budget.interval).await;
        }

        if !healthy {
            tracing::warn!(
                "{} environment not healthy after {} attempt(s)",
                target.environment,
                attempts
            );
        }

        HealthVerdict {
            environment: target.environment,
            healthy,
            checked_at: Utc::now(),
            attempts,
        }
    }

    async fn check_once(&self, target: &ProbeTarget, mode: ProbeMode) -> bool {
        match mode {
            ProbeMode::Targets => self.targets_healthy(&target.target_group).await,
            ProbeMode::Http => self.http_healthy(target.health_url.as_deref()).await,
            ProbeMode::Combined => {
                self.targets_healthy(&target.target_group).await
                    && self.http_healthy(target.health_url.as_deref()).await
            }
        }
    }

    async fn targets_healthy(&self, target_group: &TargetGroupId) -> bool {
        match self.provider.describe_target_health(target_group).await {
            Ok(states) => all_healthy(&states),
            Err(e) => {
                tracing::debug!("target health lookup failed: {}", e);
                false
            }
        }
    }

    async fn http_healthy(&self, url: Option<&str>) -> bool {
        let Some(url) = url else {
            tracing::warn!("HTTP health probe requested without a health URL");
            return false;
        };
        match self.http.get(url, self.request_timeout).await {
            Ok(reply) => reply.is_success() && body_reports_healthy(&reply.body),
            Err(e) => {
                tracing::debug!("health request to {} failed: {}", url, e);
                false
            }
        }
    }
}

/// At least one registered target, and every target healthy.
pub(crate) fn all_healthy(states: &[TargetHealthState]) -> bool {
    !states.is_empty() && states.iter().all(|s| *s == TargetHealthState::Healthy)
}

/// The body must be a JSON object with a `status` field; a string status
/// must read `healthy`.
fn body_reports_healthy(body: &str) -> bool {
    let Ok(Value::Object(map)) = serde_json::from_str::<Value>(body) else {
        return false;
    };
    match map.get("status") {
        Some(Value::String(status)) => status == "healthy",
        Some(_) => true,
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::{HttpReply, ProbeError};
    use crate::provider::InMemoryProvider;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct FixedReply {
        status: u16,
        body: &'static str,
        calls: AtomicU32,
    }

    impl FixedReply {
        fn new(status: u16, body: &'static str) -> Self {
            Self {
                status,
                body,
                calls: AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl HttpProbe for FixedReply {
        async fn get(&self, _url: &str, _timeout: Duration) -> Result<HttpReply, ProbeError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(HttpReply {
                status: self.status,
                body: self.body.to_string(),
            })
        }
    }

    fn target(provider: &InMemoryProvider) -> ProbeTarget {
        ProbeTarget {
            environment: Environment::Green,
            target_group: provider.add_target_group("green-tg-app2"),
            health_url: Some("http://alb.local/app2/health".to_string()),
        }
    }

    #[test]
    fn attempts_round_up_with_minimum_one() {
        let b = |budget, interval| {
            ProbeBudget::new(Duration::from_secs(budget), Duration::from_secs(interval)).attempts()
        };
        assert_eq!(b(300, 10), 30);
        assert_eq!(b(30, 10), 3);
        assert_eq!(b(25, 10), 3);
        assert_eq!(b(0, 10), 1);
        assert_eq!(
            ProbeBudget::new(Duration::from_secs(5), Duration::ZERO).attempts(),
            1
        );
    }

    #[tokio::test]
    async fn http_500_exhausts_every_attempt() {
        let provider = InMemoryProvider::new();
        let http = FixedReply::new(500, r#"{"status":"unhealthy"}"#);
        let prober = HealthProber::new(&provider, &http, Duration::from_secs(1));

        let verdict = prober
            .probe(
                &target(&provider),
                ProbeMode::Http,
                ProbeBudget::new(Duration::from_millis(30), Duration::from_millis(1)),
            )
            .await;

        assert!(!verdict.healthy);
        assert_eq!(verdict.attempts, 30);
        assert_eq!(http.calls.load(Ordering::SeqCst), 30);
        assert_eq!(verdict.environment, Environment::Green);
    }

    #[tokio::test]
    async fn stops_at_first_healthy_attempt() {
        let provider = InMemoryProvider::new();
        let http = FixedReply::new(200, r#"{"status":"healthy","version":"V10"}"#);
        let prober = HealthProber::new(&provider, &http, Duration::from_secs(1));

        let verdict = prober
            .probe(
                &target(&provider),
                ProbeMode::Http,
                ProbeBudget::new(Duration::from_secs(30), Duration::from_secs(10)),
            )
            .await;

        assert!(verdict.healthy);
        assert_eq!(verdict.attempts, 1);
    }

    #[tokio::test]
    async fn target_health_requires_every_target_healthy() {
        let provider = InMemoryProvider::new();
        let http = FixedReply::new(200, r#"{"status":"healthy"}"#);
        let prober = HealthProber::new(&provider, &http, Duration::from_secs(1));
        let target = target(&provider);
        let budget = ProbeBudget::new(Duration::from_millis(2), Duration::from_millis(1));

        provider.set_target_health(
            &target.target_group,
            vec![TargetHealthState::Healthy, TargetHealthState::Initial],
        );
        let verdict = prober.probe(&target, ProbeMode::Targets, budget).await;
        assert!(!verdict.healthy);
        assert_eq!(verdict.attempts, 2);

        provider.set_target_health(&target.target_group, vec![TargetHealthState::Healthy]);
        assert!(prober.probe(&target, ProbeMode::Combined, budget).await.healthy);
    }

    #[tokio::test]
    async fn empty_target_group_is_not_healthy() {
        let provider = InMemoryProvider::new();
        let http = FixedReply::new(200, r#"{"status":"healthy"}"#);
        let prober = HealthProber::new(&provider, &http, Duration::from_secs(1));
        let verdict = prober
            .probe(
                &target(&provider),
                ProbeMode::Combined,
                ProbeBudget::new(Duration::from_millis(1), Duration::from_millis(1)),
            )
            .await;
        assert!(!verdict.healthy);
    }

    #[test]
    fn health_body_parsing() {
        assert!(body_reports_healthy(r#"{"status":"healthy"}"#));
        assert!(!body_reports_healthy(r#"{"status":"unhealthy"}"#));
        assert!(!body_reports_healthy(r#"{"version":"V1"}"#));
        assert!(!body_reports_healthy("<html>ok</html>"));
        assert!(!body_reports_healthy(r#"["healthy"]"#));
    }
}
