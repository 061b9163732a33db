use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use telemetry_dashboard::access::push::PushStatus;
use telemetry_dashboard::config::{DashboardConfig, EndpointsConf, PushConf};
use telemetry_dashboard::models::{HistoryEntry, Machine};
use telemetry_dashboard::{DashboardError, TelemetryClient};
use telemetry_devkit::{wait_until, FleetBuilder, TestHarness};

fn config_for(harness: &TestHarness) -> DashboardConfig {
    DashboardConfig {
        endpoints: EndpointsConf::for_base(&harness.base_url()),
        push: PushConf {
            reconnect_initial_ms: 50,
            reconnect_max_ms: 200,
            ..PushConf::default()
        },
        ..DashboardConfig::default()
    }
}

async fn two_machines() -> TestHarness {
    let fleet = FleetBuilder::new()
        .machine("1", "m1", "10.0.0.1")
        .machine("2", "m2", "10.0.0.2")
        .history("1", &[(10.0, 1000), (20.0, 2000)])
        .build();
    TestHarness::with_fleet(fleet).await.unwrap()
}

#[tokio::test]
async fn test_list_machines_is_cache_first() {
    let harness = two_machines().await;
    let client = Arc::new(TelemetryClient::new(&config_for(&harness)));

    let mut first = Box::pin(client.list_machines());
    let list = tokio::time::timeout(Duration::from_secs(5), first.next())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(list, vec![Machine::new("1", "m1", "10.0.0.1"), Machine::new("2", "m2", "10.0.0.2")]);

    // un second abonné part du cache, sans requête réseau
    let mut second = Box::pin(client.list_machines());
    let cached = second.next().await.unwrap();
    assert_eq!(cached.len(), 2);
    assert_eq!(harness.server.graphql_requests().len(), 1);
}

#[tokio::test]
async fn test_refetch_re_emits_on_open_streams() {
    let harness = two_machines().await;
    let client = Arc::new(TelemetryClient::new(&config_for(&harness)));

    let mut watch = Box::pin(client.list_machines());
    assert_eq!(watch.next().await.unwrap().len(), 2);

    harness.server.set_machines(vec![]);
    let fresh = client.refetch_machines().await.unwrap();
    assert!(fresh.is_empty());

    let emitted = tokio::time::timeout(Duration::from_secs(5), watch.next())
        .await
        .unwrap()
        .unwrap();
    assert!(emitted.is_empty());
}

#[tokio::test]
async fn test_missing_data_yields_placeholders() {
    let harness = two_machines().await;
    harness.server.set_null_data(true);
    let client = TelemetryClient::new(&config_for(&harness));

    let machines = client.refetch_machines().await.unwrap();
    assert_eq!(machines, vec![Machine::placeholder()]);

    let history = client.fetch_history("1").await.unwrap();
    assert_eq!(history, vec![HistoryEntry::placeholder()]);
}

#[tokio::test]
async fn test_fetch_history_is_never_cached() {
    let harness = two_machines().await;
    let client = TelemetryClient::new(&config_for(&harness));

    let first = client.fetch_history("1").await.unwrap();
    assert_eq!(first.iter().map(|e| e.cpu_load).collect::<Vec<_>>(), vec![10.0, 20.0]);

    harness.server.set_history("1", vec![]);
    let second = client.fetch_history("1").await.unwrap();
    assert!(second.is_empty());

    let requests = harness.server.graphql_requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0]["variables"]["mid"], "1");
    assert_eq!(requests[0]["operationName"], "GetHistory");
}

#[tokio::test]
async fn test_register_machine_sends_port_and_maps_id() {
    let harness = two_machines().await;
    let client = TelemetryClient::new(&config_for(&harness));

    let created = client.register_machine("db-01", "10.0.0.9", 4000).await.unwrap();
    assert_eq!(created.id, "m-1");
    assert_eq!(created.name, "db-01");
    assert_eq!(created.current_load, 0.0);

    let bodies = harness.server.created_requests();
    assert_eq!(bodies[0]["port"], 4000);
    assert_eq!(bodies[0]["ip"], "10.0.0.9");
}

#[tokio::test]
async fn test_register_rejected_by_server() {
    let harness = two_machines().await;
    let client = TelemetryClient::new(&config_for(&harness));

    let err = client.register_machine("", "10.0.0.9", 4000).await.unwrap_err();
    assert!(matches!(err, DashboardError::Api { status: 400, .. }), "unexpected error: {err}");
    assert_eq!(harness.server.machines().len(), 2);
}

#[tokio::test]
async fn test_live_updates_are_broadcast() {
    let harness = two_machines().await;
    let client = TelemetryClient::new(&config_for(&harness));

    let mut a = Box::pin(client.subscribe_live_updates());
    let mut b = Box::pin(client.subscribe_live_updates());
    harness.wait_for_clients(1).await.unwrap();
    let health = client.push_health();
    wait_until(Duration::from_secs(5), move || async move { health.status() == PushStatus::Connected })
        .await
        .unwrap();

    harness.server.emit_raw(r#"42["other_event",{"x":1}]"#);
    harness.server.emit_update("1", 42.0);

    let got_a = tokio::time::timeout(Duration::from_secs(5), a.next()).await.unwrap().unwrap();
    let got_b = tokio::time::timeout(Duration::from_secs(5), b.next()).await.unwrap().unwrap();
    assert_eq!(got_a.machine_id, "1");
    assert_eq!(got_a.cpu, 42.0);
    assert_eq!(got_a, got_b);
}

#[tokio::test]
async fn test_push_reconnects_after_server_close() {
    let harness = two_machines().await;
    let client = TelemetryClient::new(&config_for(&harness));
    let mut live = Box::pin(client.subscribe_live_updates());

    harness.wait_for_clients(1).await.unwrap();
    harness.server.disconnect_clients();

    let health = client.push_health();
    wait_until(Duration::from_secs(5), move || async move { health.reconnects() >= 1 }).await.unwrap();
    wait_until(Duration::from_secs(5), move || async move { health.status() == PushStatus::Connected })
        .await
        .unwrap();

    harness.server.emit_update("2", 7.5);
    let update = tokio::time::timeout(Duration::from_secs(5), live.next()).await.unwrap().unwrap();
    assert_eq!(update.machine_id, "2");
    assert_eq!(update.cpu, 7.5);
}
