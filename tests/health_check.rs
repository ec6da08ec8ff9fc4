// ABOUTME: Integration tests for health check functionality.
// ABOUTME: Tests probe budgets and the hyper client against a local HTTP endpoint.

mod support;

use bgctl::health::{HealthProber, HttpProbe, HyperProbe, ProbeBudget, ProbeMode, ProbeTarget};
use bgctl::provider::TargetHealthState;
use bgctl::types::Environment;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// Serve `status` with `body` to every connection until the test ends.
async fn serve(status: &'static str, body: &'static str) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        loop {
            let Ok((mut stream, _)) = listener.accept().await else {
                return;
            };
            tokio::spawn(async move {
                let mut request = Vec::new();
                let mut buf = [0u8; 1024];
                while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                    match stream.read(&mut buf).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => request.extend_from_slice(&buf[..n]),
                    }
                }
                let response = format!(
                    "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = stream.write_all(response.as_bytes()).await;
                let _ = stream.shutdown().await;
            });
        }
    });
    format!("http://{}/app2/test/health", addr)
}

#[tokio::test]
async fn hyper_probe_reads_status_and_body() {
    let url = serve(
        "200 OK",
        r#"{"status":"healthy","version":"V10","service":"app_2"}"#,
    )
    .await;

    let reply = HyperProbe.get(&url, Duration::from_secs(2)).await.unwrap();

    assert_eq!(reply.status, 200);
    assert!(reply.is_success());
    assert!(reply.body.contains("\"version\":\"V10\""));
}

#[tokio::test]
async fn hyper_probe_reports_connection_failures() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let result = HyperProbe
        .get(&format!("http://{}/health", addr), Duration::from_secs(2))
        .await;
    assert!(result.is_err());
}

#[tokio::test]
async fn http_probe_against_a_healthy_endpoint_passes_first_time() {
    let fleet = support::fleet();
    let url = serve("200 OK", r#"{"status":"healthy"}"#).await;
    let prober = HealthProber::new(&fleet.provider, &HyperProbe, Duration::from_secs(2));
    let target = ProbeTarget {
        environment: Environment::Green,
        target_group: fleet.green_tg_app2.clone(),
        health_url: Some(url),
    };

    let verdict = prober
        .probe(
            &target,
            ProbeMode::Http,
            ProbeBudget::new(Duration::from_millis(50), Duration::from_millis(10)),
        )
        .await;

    assert!(verdict.healthy);
    assert_eq!(verdict.attempts, 1);
}

#[tokio::test]
async fn server_errors_use_the_whole_budget() {
    let fleet = support::fleet();
    let url = serve("500 Internal Server Error", r#"{"status":"unhealthy"}"#).await;
    let prober = HealthProber::new(&fleet.provider, &HyperProbe, Duration::from_secs(2));
    let target = ProbeTarget {
        environment: Environment::Green,
        target_group: fleet.green_tg_app2.clone(),
        health_url: Some(url),
    };

    let verdict = prober
        .probe(
            &target,
            ProbeMode::Http,
            ProbeBudget::new(Duration::from_millis(30), Duration::from_millis(1)),
        )
        .await;

    assert!(!verdict.healthy);
    assert_eq!(verdict.attempts, 30);
    assert_eq!(verdict.environment, Environment::Green);
}

#[tokio::test]
async fn combined_mode_needs_both_signals() {
    let fleet = support::fleet();
    fleet.provider.set_target_health(
        &fleet.green_tg_app2,
        vec![TargetHealthState::Healthy, TargetHealthState::Draining],
    );
    let url = serve("200 OK", r#"{"status":"healthy"}"#).await;
    let prober = HealthProber::new(&fleet.provider, &HyperProbe, Duration::from_secs(2));
    let target = ProbeTarget {
        environment: Environment::Green,
        target_group: fleet.green_tg_app2.clone(),
        health_url: Some(url),
    };
    let budget = ProbeBudget::new(Duration::from_millis(20), Duration::from_millis(10));

    assert!(prober.probe(&target, ProbeMode::Http, budget).await.healthy);
    assert!(!prober.probe(&target, ProbeMode::Combined, budget).await.healthy);
    assert!(!prober.probe(&target, ProbeMode::Targets, budget).await.healthy);
}
