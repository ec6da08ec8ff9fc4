// ABOUTME: Integration tests for the bgctl CLI commands.
// ABOUTME: Validates --help output, init, argument checks, history and unit commands.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;

const CONFIG: &str = r#"
load_balancer: blue-green-alb
applications:
  - name: app_1
    primary: true
  - name: app_2
    path_prefix: /app2
"#;

const RECORD: &str = r#"{"application":"app_2","from_env":"BLUE","to_env":"GREEN","image":"registry.local/app2:V10","previous_image":"registry.local/app2:V9","mode":"switch","started_at":"2026-10-01T10:00:00Z","finished_at":"2026-10-01T10:05:00Z","outcome":"SUCCEEDED"}"#;

fn bgctl_cmd(dir: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("bgctl"));
    cmd.current_dir(dir).env_remove("BGCTL_STATE_DIR");
    cmd
}

fn project() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("bgctl.yml"), CONFIG).unwrap();
    dir
}

#[test]
fn help_shows_commands() {
    let dir = tempfile::tempdir().unwrap();
    bgctl_cmd(dir.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("promote"))
        .stdout(predicate::str::contains("status"))
        .stdout(predicate::str::contains("history"))
        .stdout(predicate::str::contains("unit"))
        .stdout(predicate::str::contains("init"));
}

#[test]
fn init_creates_config_file() {
    let dir = tempfile::tempdir().unwrap();

    bgctl_cmd(dir.path())
        .args(["init", "--application", "app_2"])
        .assert()
        .success();

    let content = fs::read_to_string(dir.path().join("bgctl.yml")).unwrap();
    assert!(content.contains("applications:"));
    assert!(content.contains("path_prefix: /app2"));
}

#[test]
fn init_refuses_to_overwrite_existing_config() {
    let dir = project();

    bgctl_cmd(dir.path())
        .arg("init")
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn missing_config_is_reported() {
    let dir = tempfile::tempdir().unwrap();

    bgctl_cmd(dir.path())
        .args(["status", "app_2"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("configuration file not found"));
}

#[test]
fn invalid_application_name_is_rejected_by_the_parser() {
    let dir = project();

    bgctl_cmd(dir.path())
        .args(["history", "App Two"])
        .assert()
        .failure()
        .code(2);
}

#[test]
fn promote_unknown_application_fails() {
    let dir = project();

    bgctl_cmd(dir.path())
        .args(["promote", "app_9", "--image", "registry.local/app9:V1"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("unknown application: app_9"));
}

#[test]
fn switch_requires_an_image() {
    let dir = project();

    bgctl_cmd(dir.path())
        .args(["promote", "app_2"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--image is required"));
}

#[test]
fn rollback_without_history_fails() {
    let dir = project();

    bgctl_cmd(dir.path())
        .args(["promote", "app_2", "rollback"])
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "no previous successful promotion of app_2",
        ));
}

#[test]
fn history_lists_recorded_promotions() {
    let dir = project();
    bgctl_cmd(dir.path())
        .args(["history", "app_2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No promotions recorded for app_2"));

    let history_dir = dir.path().join(".bgctl/state/history");
    fs::create_dir_all(&history_dir).unwrap();
    fs::write(history_dir.join("app_2.jsonl"), format!("{RECORD}\n")).unwrap();

    bgctl_cmd(dir.path())
        .args(["history", "app_2"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "2026-10-01 10:05:00  app_2 switch registry.local/app2:V10 (BLUE -> GREEN): SUCCEEDED",
        ));

    let output = bgctl_cmd(dir.path())
        .args(["--json", "history", "app_2"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let records: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(records[0]["outcome"], "SUCCEEDED");
    assert_eq!(records[0]["previous_image"], "registry.local/app2:V9");
}

/// Fake `aws` answering the read-only calls `status` makes. app_2's rule
/// forwards to green, so GREEN is live.
const FAKE_AWS: &str = r#"#!/bin/sh
case "$2" in
  list-clusters)
    echo '{"clusterArns":["arn:aws:ecs:local:cluster/blue-green-cluster"]}' ;;
  describe-target-groups)
    echo "{\"TargetGroups\":[{\"TargetGroupArn\":\"arn:tg/$4\",\"TargetGroupName\":\"$4\"}]}" ;;
  describe-load-balancers)
    echo '{"LoadBalancers":[{"LoadBalancerArn":"arn:lb/alb","LoadBalancerName":"blue-green-alb","DNSName":"alb.local"}]}' ;;
  describe-listeners)
    echo '{"Listeners":[{"ListenerArn":"arn:listener/80","Port":80,"DefaultActions":[{"Type":"forward","TargetGroupArn":"arn:tg/blue-tg"}]}]}' ;;
  describe-rules)
    echo '{"Rules":[{"RuleArn":"arn:rule/50","Priority":"50","Conditions":[{"Field":"path-pattern","Values":["/app2*"]}],"Actions":[{"Type":"forward","TargetGroupArn":"arn:tg/green-tg-app2"}],"IsDefault":false}]}' ;;
  describe-services)
    case "$6" in
      app2-green-service) count=2 ;;
      *) count=0 ;;
    esac
    echo "{\"services\":[{\"serviceArn\":\"arn:svc/$6\",\"serviceName\":\"$6\",\"status\":\"ACTIVE\",\"desiredCount\":$count,\"runningCount\":$count,\"taskDefinition\":\"arn:td/$6\"}]}" ;;
  describe-task-definition)
    case "$4" in
      *green*) tag=V10 ;;
      *) tag=V9 ;;
    esac
    echo "{\"taskDefinition\":{\"taskDefinitionArn\":\"$4\",\"family\":\"app2\",\"containerDefinitions\":[{\"name\":\"web\",\"image\":\"registry.local/app2:$tag\"}]}}" ;;
  *)
    echo "unexpected call: $*" >&2
    exit 2 ;;
esac
"#;

fn write_executable(path: &Path, content: &str) {
    fs::write(path, content).unwrap();
    let mut perms = fs::metadata(path).unwrap().permissions();
    perms.set_mode(0o755);
    fs::set_permissions(path, perms).unwrap();
}

fn project_with_aws(script: &str) -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    let aws = dir.path().join("aws");
    write_executable(&aws, script);
    fs::write(
        dir.path().join("bgctl.yml"),
        format!("{CONFIG}provider:\n  aws_bin: {}\n", aws.display()),
    )
    .unwrap();
    dir
}

#[test]
fn status_reports_the_live_environment() {
    let dir = project_with_aws(FAKE_AWS);

    bgctl_cmd(dir.path())
        .args(["status", "app_2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("app_2: GREEN live, BLUE idle"))
        .stdout(predicate::str::contains(
            "app2-green-service (2/2 running) registry.local/app2:V10",
        ));

    let output = bgctl_cmd(dir.path())
        .args(["--json", "status", "app_2"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["live"], "GREEN");
    assert_eq!(report["resolution"]["kind"], "exact");
    assert_eq!(report["environments"][0]["desired_count"], 0);
}

#[test]
fn status_surfaces_provider_errors() {
    let dir = project_with_aws(
        "#!/bin/sh\necho 'An error occurred (AccessDenied) when calling the operation' >&2\nexit 255\n",
    );

    bgctl_cmd(dir.path())
        .args(["status", "app_2"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("AccessDenied"));
}

#[test]
fn status_rejects_unknown_applications() {
    let dir = project();

    bgctl_cmd(dir.path())
        .args(["status", "app_9"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("unknown application: app_9"));

    bgctl_cmd(dir.path())
        .args(["status", "App Two"])
        .assert()
        .failure()
        .code(2);
}

#[test]
fn rollback_target_is_read_after_taking_the_lock() {
    let dir = project();
    let locks = dir.path().join(".bgctl/state/locks");
    fs::create_dir_all(&locks).unwrap();
    let holder = serde_json::json!({
        "holder": "other-host",
        "pid": 1,
        "started_at": chrono::Utc::now(),
        "application": "app_2",
    });
    fs::write(locks.join("app_2.lock"), holder.to_string()).unwrap();

    // No history exists, so only the lock can be the reported failure.
    bgctl_cmd(dir.path())
        .args(["promote", "app_2", "rollback"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("promotion lock held by other-host"));
}

#[test]
fn failed_rollback_lookup_releases_the_lock() {
    let dir = project();

    bgctl_cmd(dir.path())
        .args(["promote", "app_2", "rollback"])
        .assert()
        .failure();

    assert!(!dir.path().join(".bgctl/state/locks/app_2.lock").exists());
}

#[test]
fn state_dir_can_come_from_the_environment() {
    let dir = project();
    let state = tempfile::tempdir().unwrap();
    let history_dir = state.path().join("history");
    fs::create_dir_all(&history_dir).unwrap();
    fs::write(history_dir.join("app_2.jsonl"), format!("{RECORD}\n")).unwrap();

    bgctl_cmd(dir.path())
        .env("BGCTL_STATE_DIR", state.path())
        .args(["--quiet", "history", "app_2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("SUCCEEDED"));
}

#[test]
fn unit_command_installs_through_systemctl() {
    let dir = tempfile::tempdir().unwrap();
    let units = dir.path().join("units");
    fs::create_dir_all(&units).unwrap();

    let systemctl = dir.path().join("systemctl");
    write_executable(
        &systemctl,
        "#!/bin/sh\n[ \"$1\" = is-active ] && echo active\nexit 0\n",
    );

    let config = dir.path().join("custom.yml");
    fs::write(
        &config,
        format!(
            "{CONFIG}supervisor:\n  unit_dir: {}\n  systemctl: {}\n",
            units.display(),
            systemctl.display()
        ),
    )
    .unwrap();

    bgctl_cmd(dir.path())
        .args(["--config", config.to_str().unwrap(), "unit", "app_2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("flask-app-app_2 is RUNNING"));

    assert!(units.join("flask-app-app_2.service").exists());
}
