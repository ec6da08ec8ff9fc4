// ABOUTME: Test support utilities.
// ABOUTME: Seeds an in-memory two-application load balancer and builds promotion contexts.

use std::sync::Once;

use bgctl::config::Config;
use bgctl::context::{PromotionContext, PromotionMode, PromotionOptions};
use bgctl::provider::{InMemoryProvider, RetryPolicy, RuleAction, TargetHealthState};
use bgctl::types::{AppName, ClusterId, ImageRef, ListenerId, RuleId, TargetGroupId};

static TRACING_INIT: Once = Once::new();

/// Initialize tracing for tests. Safe to call multiple times.
#[allow(dead_code)]
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::EnvFilter;
        let filter = EnvFilter::from_default_env().add_directive("bgctl=debug".parse().unwrap());
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init()
            .ok();
    });
}

/// Settings with millisecond health budgets and no propagation delay.
pub const SETTINGS_YAML: &str = r#"
load_balancer: blue-green-alb
cluster: blue-green-cluster
health:
  smoke: { budget: 30ms, interval: 10ms }
  drain: { budget: 30ms, interval: 10ms }
  request_timeout: 1s
routing:
  propagation_delay: 0s
applications:
  - name: app_1
    primary: true
  - name: app_2
    path_prefix: /app2
"#;

#[allow(dead_code)]
pub fn settings() -> Config {
    Config::from_yaml(SETTINGS_YAML).unwrap()
}

#[allow(dead_code)]
pub fn app(name: &str) -> AppName {
    AppName::new(name).unwrap()
}

/// Context for one run, with fast retries.
#[allow(dead_code)]
pub fn context(settings: &Config, application: &str, image: &str) -> PromotionContext {
    PromotionContext {
        application: settings.application(&app(application)).unwrap().clone(),
        image: ImageRef::parse(image).unwrap(),
        mode: PromotionMode::Switch,
        options: PromotionOptions {
            force: false,
            retry: RetryPolicy::immediate(3),
        },
        settings: settings.clone(),
    }
}

/// Seeded infrastructure handles.
#[allow(dead_code)]
pub struct Fleet {
    pub provider: InMemoryProvider,
    pub cluster: ClusterId,
    pub listener: ListenerId,
    /// Legacy groups used by the primary application.
    pub blue_tg: TargetGroupId,
    pub green_tg: TargetGroupId,
    pub blue_tg_app2: TargetGroupId,
    pub green_tg_app2: TargetGroupId,
    pub app2_rule: RuleId,
}

/// Both applications live on BLUE with every target healthy.
///
/// `app_1` is the primary application on the listener default action;
/// `app_2` has a `/app2*` rule at priority 50.
#[allow(dead_code)]
pub fn fleet() -> Fleet {
    let provider = InMemoryProvider::new();
    let cluster = provider.add_cluster("blue-green-cluster");

    let blue_tg = provider.add_target_group("blue-tg");
    let green_tg = provider.add_target_group("green-tg");
    let blue_tg_app2 = provider.add_target_group("blue-tg-app2");
    let green_tg_app2 = provider.add_target_group("green-tg-app2");
    for tg in [&blue_tg, &green_tg, &blue_tg_app2, &green_tg_app2] {
        provider.set_target_health(tg, vec![TargetHealthState::Healthy]);
    }

    let lb = provider.add_load_balancer("blue-green-alb", "alb.local");
    let listener = provider.add_listener(&lb, 80, vec![RuleAction::Forward(blue_tg.clone())]);
    let app2_rule = provider.add_rule(
        &listener,
        50,
        &["/app2*"],
        vec![RuleAction::Forward(blue_tg_app2.clone())],
    );

    provider.add_service(&cluster, "blue-service", "registry.local/app1:V5", 1);
    provider.add_service(&cluster, "green-service", "registry.local/app1:V4", 0);
    provider.add_service(&cluster, "app2-blue-service", "registry.local/app2:V9", 1);
    provider.add_service(&cluster, "app2-green-service", "registry.local/app2:V8", 0);

    Fleet {
        provider,
        cluster,
        listener,
        blue_tg,
        green_tg,
        blue_tg_app2,
        green_tg_app2,
        app2_rule,
    }
}
