// ABOUTME: Integration tests for hooks system.
// ABOUTME: Tests hook discovery, execution, and environment variable passing.

use bgctl::context::PromotionMode;
use bgctl::hooks::{HookContext, HookPoint, HookRunner};
use bgctl::types::{AppName, Environment};
use std::fs;
use std::os::unix::fs::PermissionsExt;
use tempfile::TempDir;

fn create_hook(dir: &TempDir, name: &str, script: &str) {
    let hooks_dir = dir.path().join(".bgctl").join("hooks");
    fs::create_dir_all(&hooks_dir).unwrap();

    let hook_path = hooks_dir.join(name);
    fs::write(&hook_path, script).unwrap();

    // Make executable
    let mut perms = fs::metadata(&hook_path).unwrap().permissions();
    perms.set_mode(0o755);
    fs::set_permissions(&hook_path, perms).unwrap();
}

fn test_context() -> HookContext {
    HookContext {
        application: AppName::new("app_2").unwrap(),
        image: "registry.local/app2:V10".to_string(),
        mode: PromotionMode::Switch,
        from_env: Some(Environment::Blue),
        to_env: Some(Environment::Green),
        error: None,
    }
}

/// Test: pre-promote hook runs before the promotion.
#[tokio::test]
async fn pre_promote_hook_runs() {
    let temp_dir = TempDir::new().unwrap();
    create_hook(
        &temp_dir,
        "pre-promote",
        "#!/bin/sh\necho 'pre-promote ran'\nexit 0\n",
    );

    let runner = HookRunner::new(temp_dir.path());
    assert!(runner.hook_exists(HookPoint::PrePromote));

    let result = runner
        .run(HookPoint::PrePromote, &test_context())
        .await
        .unwrap();
    assert!(result.success);
    assert!(result.stdout.contains("pre-promote ran"));
}

/// Test: post-promote hook runs after a successful promotion.
#[tokio::test]
async fn post_promote_hook_runs() {
    let temp_dir = TempDir::new().unwrap();
    create_hook(
        &temp_dir,
        "post-promote",
        "#!/bin/sh\necho 'post-promote ran'\nexit 0\n",
    );

    let runner = HookRunner::new(temp_dir.path());
    let result = runner
        .run(HookPoint::PostPromote, &test_context())
        .await
        .unwrap();
    assert!(result.success);
    assert!(result.stdout.contains("post-promote ran"));
}

/// Test: on-error hook sees the failure message.
#[tokio::test]
async fn on_error_hook_receives_the_error() {
    let temp_dir = TempDir::new().unwrap();
    create_hook(
        &temp_dir,
        "on-error",
        "#!/bin/sh\necho \"ERROR=$BGCTL_ERROR\"\nexit 0\n",
    );

    let mut context = test_context();
    context.error = Some("CUTOVER failed".to_string());

    let runner = HookRunner::new(temp_dir.path());
    let result = runner.run(HookPoint::OnError, &context).await.unwrap();
    assert!(result.success);
    assert!(result.stdout.contains("ERROR=CUTOVER failed"));
}

/// Test: Hook failure in pre-promote is detectable.
#[tokio::test]
async fn pre_promote_failure_detected() {
    let temp_dir = TempDir::new().unwrap();
    create_hook(
        &temp_dir,
        "pre-promote",
        "#!/bin/sh\necho 'failing' >&2\nexit 1\n",
    );

    let runner = HookRunner::new(temp_dir.path());
    let result = runner
        .run(HookPoint::PrePromote, &test_context())
        .await
        .unwrap();

    assert!(!result.success);
    assert_eq!(result.exit_code, Some(1));
    assert!(result.stderr.contains("failing"));
    assert!(HookPoint::PrePromote.is_fatal());
}

/// Test: Hook receives correct environment variables.
#[tokio::test]
async fn hook_receives_environment_variables() {
    let temp_dir = TempDir::new().unwrap();
    create_hook(
        &temp_dir,
        "post-promote",
        r#"#!/bin/sh
echo "APPLICATION=$BGCTL_APPLICATION"
echo "IMAGE=$BGCTL_IMAGE"
echo "MODE=$BGCTL_MODE"
echo "FROM=$BGCTL_FROM_ENV"
echo "TO=$BGCTL_TO_ENV"
exit 0
"#,
    );

    let runner = HookRunner::new(temp_dir.path());
    let result = runner
        .run(HookPoint::PostPromote, &test_context())
        .await
        .unwrap();

    assert!(result.success);
    assert!(result.stdout.contains("APPLICATION=app_2"));
    assert!(result.stdout.contains("IMAGE=registry.local/app2:V10"));
    assert!(result.stdout.contains("MODE=switch"));
    assert!(result.stdout.contains("FROM=BLUE"));
    assert!(result.stdout.contains("TO=GREEN"));
}

/// Test: a hook that cannot be executed counts as failed.
#[tokio::test]
async fn non_executable_hook_fails() {
    let temp_dir = TempDir::new().unwrap();
    let hooks_dir = temp_dir.path().join(".bgctl").join("hooks");
    fs::create_dir_all(&hooks_dir).unwrap();
    fs::write(hooks_dir.join("post-promote"), "#!/bin/sh\nexit 0\n").unwrap();

    let runner = HookRunner::new(temp_dir.path());
    let result = runner
        .run(HookPoint::PostPromote, &test_context())
        .await
        .unwrap();
    assert!(!result.success);
    assert_eq!(result.exit_code, None);
}

/// Test: Missing hook returns None.
#[tokio::test]
async fn missing_hook_returns_none() {
    let temp_dir = TempDir::new().unwrap();

    let runner = HookRunner::new(temp_dir.path());
    assert!(!runner.hook_exists(HookPoint::PrePromote));

    let result = runner.run(HookPoint::PrePromote, &test_context()).await;
    assert!(result.is_none());
}
