// ABOUTME: Integration tests for history-driven rollback promotions.
// ABOUTME: Rollback promotes the image that was live before the last successful run.

mod support;

use bgctl::context::PromotionMode;
use bgctl::promotion::{Outcome, PromotionController, PromotionErrorKind, PromotionHistory};
use bgctl::provider::RuleAction;
use bgctl::types::Environment;
use support::{app, context, fleet, settings};

#[tokio::test]
async fn rollback_promotes_the_previous_image_back() {
    let fleet = fleet();
    let settings = settings();
    let state = tempfile::tempdir().unwrap();
    let history = PromotionHistory::new(state.path());

    let ctx = context(&settings, "app_2", "registry.local/app2:V10");
    let record = PromotionController::new(&fleet.provider, &fleet.provider, &ctx)
        .run()
        .await;
    assert_eq!(record.outcome, Outcome::Succeeded, "{:?}", record.error);
    history.append(&record).await.unwrap();

    let image = history.rollback_image(&app("app_2")).await.unwrap();
    assert_eq!(image.to_string(), "registry.local/app2:V9");

    let mut ctx = context(&settings, "app_2", "registry.local/app2:V9");
    ctx.mode = PromotionMode::Rollback;
    ctx.image = image;
    let rollback = PromotionController::new(&fleet.provider, &fleet.provider, &ctx)
        .run()
        .await;

    assert_eq!(rollback.outcome, Outcome::Succeeded, "{:?}", rollback.error);
    assert_eq!(rollback.mode, PromotionMode::Rollback);
    assert_eq!(rollback.from_env, Some(Environment::Green));
    assert_eq!(rollback.to_env, Some(Environment::Blue));
    assert_eq!(
        rollback.previous_image.as_deref(),
        Some("registry.local/app2:V10")
    );
    assert_eq!(
        fleet
            .provider
            .rules(&fleet.listener)
            .into_iter()
            .find(|r| r.id == fleet.app2_rule)
            .map(|r| r.actions),
        Some(vec![RuleAction::Forward(fleet.blue_tg_app2.clone())])
    );
    assert_eq!(
        fleet
            .provider
            .service_image(&fleet.cluster, "app2-blue-service")
            .as_deref(),
        Some("registry.local/app2:V9")
    );

    // A second rollback undoes the first.
    history.append(&rollback).await.unwrap();
    let image = history.rollback_image(&app("app_2")).await.unwrap();
    assert_eq!(image.to_string(), "registry.local/app2:V10");
}

#[tokio::test]
async fn failed_runs_are_not_rollback_targets() {
    let fleet = fleet();
    fleet.provider.set_target_health(
        &fleet.green_tg_app2,
        vec![bgctl::provider::TargetHealthState::Unhealthy],
    );
    let settings = settings();
    let state = tempfile::tempdir().unwrap();
    let history = PromotionHistory::new(state.path());

    let ctx = context(&settings, "app_2", "registry.local/app2:V10");
    let record = PromotionController::new(&fleet.provider, &fleet.provider, &ctx)
        .run()
        .await;
    assert_eq!(record.outcome, Outcome::Aborted);
    history.append(&record).await.unwrap();

    assert_eq!(history.list(&app("app_2")).await.unwrap(), vec![record]);
    let err = history.rollback_image(&app("app_2")).await.unwrap_err();
    assert_eq!(err.kind(), PromotionErrorKind::NoPreviousPromotion);
}
