#![allow(clippy::unwrap_used)]
// Poll scheduler behaviour against a mock backend.

use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use serde_json::json;
use tempfile::TempDir;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use damwatch_core::{
    Dashboard, DashboardConfig, FetchFailure, PollPhase, Source, TickOutcome, WaterSeverity,
};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup(configure: impl FnOnce(&mut DashboardConfig)) -> (MockServer, Dashboard, TempDir) {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let mut config = DashboardConfig::new(
        Url::parse(&server.uri()).unwrap(),
        dir.path().join("session.json"),
    );
    config.poll_interval = Duration::from_millis(50);
    configure(&mut config);
    let dashboard = Dashboard::new(config).unwrap();
    (server, dashboard, dir)
}

fn readings_body() -> serde_json::Value {
    json!([
        { "timestamp": "t2", "percent": 55, "distance": 40.5, "vibration": false, "rainfall": 30 },
        { "timestamp": "t1", "percent": 52, "distance": 41.0 }
    ])
}

async fn mount_source(server: &MockServer, route: &str, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

async fn mount_valve_weather_vibration(server: &MockServer) {
    mount_source(
        server,
        "/api/valve",
        json!({ "state": "CLOSED", "reason": "SAFE_LEVEL", "mode": "AUTO", "timestamp": "t2" }),
    )
    .await;
    mount_source(
        server,
        "/api/weather",
        json!({ "locationName": "Reservoir", "temperature": 24.0, "weathercode": 61 }),
    )
    .await;
    mount_source(
        server,
        "/api/vibration/logs",
        json!([{ "timestamp": "v1", "level": "LOW", "nodeId": "node-1" }]),
    )
    .await;
}

async fn mount_healthy(server: &MockServer) {
    mount_source(server, "/api/readings", readings_body()).await;
    mount_valve_weather_vibration(server).await;
}

async fn wait_for_phase(dashboard: &Dashboard, phase: PollPhase) {
    let mut status = dashboard.poll_status();
    tokio::time::timeout(Duration::from_secs(2), status.wait_for(|s| s.phase == phase))
        .await
        .expect("phase not reached")
        .unwrap();
}

// ── Tests ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_poll_once_publishes_reconciled_snapshot() {
    let (server, dashboard, _dir) = setup(|_| {}).await;
    mount_healthy(&server).await;

    assert_eq!(dashboard.poll_once().await, TickOutcome::Published(1));

    let snapshot = dashboard.snapshot();
    let order: Vec<&str> = snapshot.history.iter().map(|r| r.timestamp.as_str()).collect();
    assert_eq!(order, vec!["t1", "t2"]);
    assert_eq!(snapshot.last_vibration.as_ref().unwrap().timestamp, "v1");

    let view = dashboard.view();
    assert_eq!(view.water_level, Some(55.0));
    assert_eq!(view.water_severity, WaterSeverity::Normal);
    assert_eq!(view.rainfall_percent, 30.0);
    assert!(!view.vibration_alert);

    let status = dashboard.poll_status().borrow().clone();
    assert_eq!(status.phase, PollPhase::Idle);
    assert_eq!(status.stale, None);
    assert_eq!(status.last_success_generation, 1);
}

#[tokio::test]
async fn test_failed_source_keeps_previous_snapshot() {
    let (server, dashboard, _dir) = setup(|_| {}).await;
    mount_healthy(&server).await;
    assert_eq!(dashboard.poll_once().await, TickOutcome::Published(1));
    let before = dashboard.snapshot();

    server.reset().await;
    mount_source(&server, "/api/readings", json!([{ "timestamp": "t3", "percent": 90 }])).await;
    mount_source(&server, "/api/valve", json!({ "state": "OPEN" })).await;
    mount_source(&server, "/api/weather", json!({})).await;
    Mock::given(method("GET"))
        .and(path("/api/vibration/logs"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let TickOutcome::Failed(err) = dashboard.poll_once().await else {
        panic!("expected a failed tick");
    };
    assert_eq!(err.sources(), vec![Source::VibrationLog]);

    let after = dashboard.snapshot();
    assert!(Arc::ptr_eq(&before, &after), "snapshot must not change");
    assert_eq!(dashboard.view().water_level, Some(55.0));

    let status = dashboard.poll_status().borrow().clone();
    let stale = status.stale.expect("stale notice raised");
    assert_eq!(stale.failed_sources, vec![Source::VibrationLog]);
    assert_eq!(status.last_success_generation, 1);

    // recovery clears the banner
    server.reset().await;
    mount_healthy(&server).await;
    assert_eq!(dashboard.poll_once().await, TickOutcome::Published(2));
    assert_eq!(dashboard.poll_status().borrow().stale, None);
}

#[tokio::test]
async fn test_repeated_failures_keep_one_banner() {
    let (server, dashboard, _dir) = setup(|_| {}).await;
    mount_valve_weather_vibration(&server).await;
    Mock::given(method("GET"))
        .and(path("/api/readings"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    assert!(matches!(dashboard.poll_once().await, TickOutcome::Failed(_)));
    let first = dashboard.poll_status().borrow().stale.clone().unwrap();
    assert!(matches!(dashboard.poll_once().await, TickOutcome::Failed(_)));
    let second = dashboard.poll_status().borrow().stale.clone().unwrap();

    assert_eq!(first.since, second.since);
    assert!(dashboard.snapshot().is_empty());
}

#[tokio::test]
async fn test_overlapping_tick_is_skipped() {
    let (server, dashboard, _dir) = setup(|_| {}).await;
    mount_valve_weather_vibration(&server).await;
    Mock::given(method("GET"))
        .and(path("/api/readings"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(readings_body())
                .set_delay(Duration::from_millis(400)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let first = tokio::spawn({
        let dashboard = dashboard.clone();
        async move { dashboard.poll_once().await }
    });
    wait_for_phase(&dashboard, PollPhase::Polling).await;

    assert_eq!(dashboard.poll_once().await, TickOutcome::Skipped);
    assert_eq!(first.await.unwrap(), TickOutcome::Published(1));
}

#[tokio::test]
async fn test_slow_source_times_out() {
    let (server, dashboard, _dir) = setup(|c| c.fetch_timeout = Duration::from_millis(150)).await;
    mount_source(&server, "/api/readings", readings_body()).await;
    mount_source(&server, "/api/valve", json!({ "state": "OPEN" })).await;
    mount_source(&server, "/api/vibration/logs", json!([])).await;
    Mock::given(method("GET"))
        .and(path("/api/weather"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({}))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let TickOutcome::Failed(err) = dashboard.poll_once().await else {
        panic!("expected a failed tick");
    };
    assert_eq!(err.failures.len(), 1);
    assert_eq!(err.failures[0].endpoint, Source::Weather);
    assert_eq!(err.failures[0].kind, FetchFailure::Transport);
}

#[tokio::test]
async fn test_background_loop_publishes_and_stops() {
    let (server, dashboard, _dir) = setup(|_| {}).await;
    mount_healthy(&server).await;

    let mut stream = dashboard.subscribe();
    assert!(stream.current().is_empty());

    dashboard.start().await.unwrap();
    let snap = tokio::time::timeout(Duration::from_secs(2), stream.changed())
        .await
        .unwrap()
        .unwrap();
    assert!(snap.generation >= 1);

    dashboard.stop().await;
    let settled = dashboard.snapshot().generation;
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(dashboard.snapshot().generation, settled, "no polls after stop");
}

#[tokio::test]
async fn test_snapshot_stream_yields_current_then_updates() {
    let (server, dashboard, _dir) = setup(|_| {}).await;
    mount_healthy(&server).await;

    let subscription = dashboard.subscribe();
    assert_eq!(dashboard.poll_once().await, TickOutcome::Published(1));
    assert!(subscription.current().is_empty());
    assert_eq!(subscription.latest().generation, 1);

    let mut stream = subscription.into_stream();
    let first = tokio::time::timeout(Duration::from_secs(2), stream.next())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(first.generation, 1);

    assert_eq!(dashboard.poll_once().await, TickOutcome::Published(2));
    let second = tokio::time::timeout(Duration::from_secs(2), stream.next())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(second.generation, 2);
    assert_eq!(second.history.len(), 2);
}

#[tokio::test]
async fn test_stop_discards_in_flight_poll() {
    let (server, dashboard, _dir) = setup(|_| {}).await;
    mount_valve_weather_vibration(&server).await;
    Mock::given(method("GET"))
        .and(path("/api/readings"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(readings_body())
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&server)
        .await;

    dashboard.start().await.unwrap();
    wait_for_phase(&dashboard, PollPhase::Polling).await;
    dashboard.stop().await;

    tokio::time::sleep(Duration::from_millis(700)).await;
    assert!(dashboard.snapshot().is_empty());
    assert_eq!(dashboard.poll_status().borrow().phase, PollPhase::Idle);
    assert_eq!(dashboard.poll_once().await, TickOutcome::Cancelled);
}

#[tokio::test]
async fn test_shutdown_prevents_restart() {
    let (_server, dashboard, _dir) = setup(|_| {}).await;
    dashboard.shutdown().await;
    assert!(dashboard.start().await.is_err());
}
