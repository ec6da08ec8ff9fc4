// ABOUTME: Integration tests for resolution and traffic routing.
// ABOUTME: Covers resolver idempotence, degraded resolution, restore and test-rule cleanup.

mod support;

use bgctl::config::Config;
use bgctl::provider::memory::{Fault, FaultPoint};
use bgctl::provider::{RetryPolicy, RoutingOps, RuleAction, WeightedTarget};
use bgctl::resolve::{Resolution, Resolver};
use bgctl::routing::TrafficRouter;
use bgctl::types::Environment;
use support::{app, fleet, settings};

fn resolver<'a>(
    fleet: &'a support::Fleet,
    settings: &'a Config,
) -> Resolver<'a, bgctl::provider::InMemoryProvider> {
    Resolver::new(&fleet.provider, settings, RetryPolicy::immediate(3))
}

fn router<'a>(
    fleet: &'a support::Fleet,
    settings: &'a Config,
) -> TrafficRouter<'a, bgctl::provider::InMemoryProvider> {
    TrafficRouter::new(&fleet.provider, &settings.routing, RetryPolicy::immediate(3))
}

mod resolution {
    use super::*;

    #[tokio::test]
    async fn resolving_twice_gives_the_same_target() {
        let fleet = fleet();
        let settings = settings();
        let application = settings.application(&app("app_2")).unwrap();

        let first = resolver(&fleet, &settings).resolve(application).await.unwrap();
        let second = resolver(&fleet, &settings).resolve(application).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first.live(), Environment::Blue);
        assert_eq!(first.resolution, Resolution::Exact);
        assert_eq!(first.blue.target_group.name, "blue-tg-app2");
        assert_eq!(
            first.live_slot().current_image.as_deref(),
            Some("registry.local/app2:V9")
        );
    }

    #[tokio::test]
    async fn primary_application_falls_back_to_shared_names() {
        let fleet = fleet();
        let settings = settings();
        let application = settings.application(&app("app_1")).unwrap();

        let target = resolver(&fleet, &settings).resolve(application).await.unwrap();

        assert_eq!(target.green.target_group.name, "green-tg");
        assert_eq!(
            target.green.service.as_ref().map(|s| s.name.as_str()),
            Some("green-service")
        );
        assert!(target.rule.is_none());
    }

    #[tokio::test]
    async fn tied_weights_degrade_to_blue() {
        let fleet = fleet();
        fleet
            .provider
            .modify_listener_default_actions(
                &fleet.listener,
                &[RuleAction::WeightedForward(vec![
                    WeightedTarget {
                        target_group: fleet.blue_tg.clone(),
                        weight: 1,
                    },
                    WeightedTarget {
                        target_group: fleet.green_tg.clone(),
                        weight: 1,
                    },
                ])],
            )
            .await
            .unwrap();
        let settings = settings();
        let application = settings.application(&app("app_1")).unwrap();

        let target = resolver(&fleet, &settings).resolve(application).await.unwrap();

        assert_eq!(target.live(), Environment::Blue);
        assert!(target.resolution.is_degraded());
    }

    #[tokio::test]
    async fn green_forward_resolves_green_live() {
        let fleet = fleet();
        fleet
            .provider
            .modify_listener_default_actions(
                &fleet.listener,
                &[RuleAction::Forward(fleet.green_tg.clone())],
            )
            .await
            .unwrap();
        let settings = settings();
        let application = settings.application(&app("app_1")).unwrap();

        let target = resolver(&fleet, &settings).resolve(application).await.unwrap();

        assert_eq!(target.live(), Environment::Green);
        assert_eq!(target.idle(), Environment::Blue);
    }
}

mod restore {
    use super::*;

    #[tokio::test]
    async fn restoring_a_rule_change_puts_back_the_exact_rules() {
        let fleet = fleet();
        let settings = settings();
        let application = settings.application(&app("app_2")).unwrap();
        let target = resolver(&fleet, &settings).resolve(application).await.unwrap();
        let before = fleet.provider.rules(&fleet.listener);

        let router = router(&fleet, &settings);
        let change = router
            .route(application, Environment::Green, &target)
            .await
            .unwrap();
        assert_eq!(change.target, Environment::Green);
        assert_ne!(fleet.provider.rules(&fleet.listener), before);

        change.restore(&router).await.unwrap();
        assert_eq!(fleet.provider.rules(&fleet.listener), before);
    }

    #[tokio::test]
    async fn restoring_a_default_action_change_puts_back_the_listener() {
        let fleet = fleet();
        let settings = settings();
        let application = settings.application(&app("app_1")).unwrap();
        let target = resolver(&fleet, &settings).resolve(application).await.unwrap();
        let before = fleet.provider.default_actions(&fleet.listener);

        let router = router(&fleet, &settings);
        let change = router
            .route(application, Environment::Green, &target)
            .await
            .unwrap();
        assert_eq!(
            fleet.provider.default_actions(&fleet.listener),
            vec![RuleAction::weighted_cutover(&fleet.green_tg, &fleet.blue_tg)]
        );

        change.restore(&router).await.unwrap();
        assert_eq!(fleet.provider.default_actions(&fleet.listener), before);
    }

    fn app3_settings() -> Config {
        Config::from_yaml(
            r#"
load_balancer: blue-green-alb
cluster: blue-green-cluster
applications:
  - name: app_1
    primary: true
  - name: app_3
    path_prefix: /app3
"#,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn application_without_a_rule_gets_one_in_its_band() {
        let fleet = fleet();
        let settings = app3_settings();
        let application = settings.application(&app("app_3")).unwrap();
        let target = resolver(&fleet, &settings).resolve(application).await.unwrap();
        assert!(target.resolution.is_degraded());
        let before = fleet.provider.rules(&fleet.listener);

        let router = router(&fleet, &settings);
        let change = router
            .route(application, Environment::Green, &target)
            .await
            .unwrap();
        let created = fleet
            .provider
            .rules(&fleet.listener)
            .into_iter()
            .find(|r| r.matches_pattern("/app3*"))
            .unwrap();
        assert_eq!(created.priority, Some(51));

        change.restore(&router).await.unwrap();
        assert_eq!(fleet.provider.rules(&fleet.listener), before);
    }

    #[tokio::test]
    async fn rule_created_despite_a_timeout_is_adopted_and_undone() {
        let fleet = fleet();
        fleet
            .provider
            .inject_fault(FaultPoint::CreateRule, Fault::Unacknowledged(1));
        let settings = app3_settings();
        let application = settings.application(&app("app_3")).unwrap();
        let target = resolver(&fleet, &settings).resolve(application).await.unwrap();
        let before = fleet.provider.rules(&fleet.listener);

        let router = router(&fleet, &settings);
        let change = router
            .route(application, Environment::Green, &target)
            .await
            .unwrap();
        let created: Vec<_> = fleet
            .provider
            .rules(&fleet.listener)
            .into_iter()
            .filter(|r| r.matches_pattern("/app3*"))
            .collect();
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].priority, Some(51));

        change.restore(&router).await.unwrap();
        assert_eq!(fleet.provider.rules(&fleet.listener), before);
    }
}

mod test_routes {
    use super::*;

    #[tokio::test]
    async fn stale_test_rules_are_replaced() {
        let fleet = fleet();
        fleet.provider.add_rule(
            &fleet.listener,
            10,
            &["/app2/test*"],
            vec![RuleAction::Forward(fleet.blue_tg_app2.clone())],
        );
        let settings = settings();
        let application = settings.application(&app("app_2")).unwrap();
        let target = resolver(&fleet, &settings).resolve(application).await.unwrap();

        let router = router(&fleet, &settings);
        let route = router
            .route_test(application, Environment::Green, &target)
            .await
            .unwrap();

        let test_rules: Vec<_> = fleet
            .provider
            .rules(&fleet.listener)
            .into_iter()
            .filter(|r| r.matches_pattern("/app2/test*"))
            .collect();
        assert_eq!(test_rules.len(), 1);
        assert_eq!(test_rules[0].id, route.rule);
        assert_eq!(route.priority, 10);
        assert_eq!(
            test_rules[0].actions,
            vec![RuleAction::Forward(fleet.green_tg_app2.clone())]
        );
    }

    #[tokio::test]
    async fn with_test_route_removes_the_rule_after_the_probe() {
        let fleet = fleet();
        let settings = settings();
        let application = settings.application(&app("app_2")).unwrap();
        let target = resolver(&fleet, &settings).resolve(application).await.unwrap();
        let before = fleet.provider.rules(&fleet.listener);

        let router = router(&fleet, &settings);
        let seen = router
            .with_test_route(application, Environment::Green, &target, |route| async move {
                route.pattern
            })
            .await
            .unwrap();

        assert_eq!(seen, "/app2/test*");
        assert_eq!(fleet.provider.rules(&fleet.listener), before);
    }
}
