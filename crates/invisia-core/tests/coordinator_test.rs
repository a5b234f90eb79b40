#![allow(clippy::unwrap_used)]
// Integration tests for `Coordinator` using wiremock.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta};
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Match, Mock, MockServer, Request, ResponseTemplate};

use invisia_core::{
    ChargingProfile, Coordinator, CoordinatorConfig, Credentials, Ids, RfidRecord,
};

// ── Helpers ─────────────────────────────────────────────────────────

const BASE: &str = "/api/cockpit/installations/42";
const RFID_PATH: &str = "/api/cockpit/installations/42/rfids/123";

fn config(server: &MockServer, ids: Ids) -> CoordinatorConfig {
    let mut config = CoordinatorConfig::new(
        Credentials::new("driver@example.com", "hunter2", "42"),
        ids,
    );
    config.base_url = server.uri();
    config.timeout = Duration::from_millis(400);
    config.poll_interval = Duration::ZERO;
    config
}

async fn setup(ids: Ids) -> (MockServer, Coordinator) {
    let server = MockServer::start().await;
    let coordinator = Coordinator::new(config(&server, ids)).unwrap();
    (server, coordinator)
}

async fn mount_login(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/api/authentication/token/"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "access": "a1", "refresh": "r1" })),
        )
        .mount(server)
        .await;
}

fn rfid_state(profile: &str) -> Value {
    json!({
        "rfid": { "id": 123, "name": "Family car", "profile": profile },
        "status": { "charging_status": "charging", "a_max": 16 },
        "stats": { "current_power_flow": 3.0, "e_charged": 4.5 }
    })
}

async fn mount_rfid(server: &MockServer, body: Value, expected: u64) {
    Mock::given(method("GET"))
        .and(path(RFID_PATH))
        .and(header("X-Authorization", "Bearer a1"))
        .and(header("X-Installation-Id", "42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .expect(expected)
        .mount(server)
        .await;
}

async fn mount_json(server: &MockServer, at: &str, body: Value) {
    Mock::given(method("GET"))
        .and(path(at))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

/// Matches `start`/`end` query parameters in UTC that lie exactly the
/// given span apart.
struct Window(TimeDelta);

impl Match for Window {
    fn matches(&self, request: &Request) -> bool {
        let param = |key: &str| {
            request
                .url
                .query_pairs()
                .find(|(name, _)| name == key)
                .map(|(_, value)| value.into_owned())
        };
        let (Some(start), Some(end)) = (param("start"), param("end")) else {
            return false;
        };
        if !start.ends_with('Z') || !end.ends_with('Z') {
            return false;
        }
        match (
            DateTime::parse_from_rfc3339(&start),
            DateTime::parse_from_rfc3339(&end),
        ) {
            (Ok(start), Ok(end)) => end - start == self.0,
            _ => false,
        }
    }
}

fn html(status: u16) -> ResponseTemplate {
    ResponseTemplate::new(status)
        .set_body_string("<html><body>Bad Gateway</body></html>")
        .insert_header("content-type", "text/html")
}

// ── Cycle ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_full_cycle_populates_every_section() {
    let ids = Ids::new("123").with_user("7").with_charging_station("9");
    let (server, coordinator) = setup(ids).await;
    mount_login(&server).await;
    mount_rfid(&server, rfid_state("instant"), 1).await;

    mount_json(
        &server,
        &format!("{BASE}/charging_stations/9"),
        json!({
            "status": {
                "charging_status": null,
                "charging_mode": "optimized",
                "ipadresse": "10.0.0.5"
            },
            "stats": { "current_power_flow": 7.4 }
        }),
    )
    .await;
    mount_json(
        &server,
        &format!("{BASE}/objects/charging_stations/stats"),
        json!({ "e_sourced_today": 12 }),
    )
    .await;

    let timers: Vec<Value> = (0..7).map(|i| json!({ "id": i })).collect();
    Mock::given(method("GET"))
        .and(path(format!("{BASE}/timers/")))
        .and(query_param("object_id", "123"))
        .and(query_param("object_type", "rfid"))
        .respond_with(ResponseTemplate::new(200).set_body_json(timers))
        .mount(&server)
        .await;

    let journal: Vec<Value> = (0..12).map(|i| json!({ "seq": i })).collect();
    Mock::given(method("GET"))
        .and(path(format!("{RFID_PATH}/journal")))
        .and(Window(TimeDelta::days(7)))
        .respond_with(ResponseTemplate::new(200).set_body_json(journal))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/statistics/42/rfid/123"))
        .and(query_param("granularity", "total"))
        .and(Window(TimeDelta::hours(24)))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "stats": { "e_charged": "8" } })),
        )
        .expect(1)
        .mount(&server)
        .await;

    mount_json(&server, &format!("{BASE}/objects/permissions"), json!({ "can_write": true })).await;
    mount_json(&server, "/api/users/7/", json!({ "id": 7, "email": "driver@example.com" })).await;
    mount_json(&server, "/api/cockpit/users/7/installations/42", json!({ "role": "owner" })).await;

    let snapshot = coordinator.refresh().await.unwrap();

    assert_eq!(snapshot.rfid.as_ref().unwrap().profile(), Some("instant"));
    assert_eq!(snapshot.timers.len(), 5);
    assert_eq!(snapshot.journal.len(), 10);
    assert_eq!(snapshot.journal[0], json!({ "seq": 0 }));
    assert_eq!(snapshot.journal[9], json!({ "seq": 9 }));
    assert_eq!(snapshot.permissions, Some(json!({ "can_write": true })));
    assert_eq!(snapshot.user_installation, Some(json!({ "role": "owner" })));
    assert!(snapshot.user.is_some());

    let resolved = &snapshot.resolved;
    assert_eq!(resolved.charging_status.as_deref(), Some("charging"));
    assert_eq!(resolved.charging_mode, Some(ChargingProfile::Optimized));
    assert_eq!(resolved.car_plugged_in, Some(true));
    assert_eq!(resolved.current_power_kw, Some(7.4));
    assert_eq!(resolved.energy_charged_kwh, Some(8.0));
    assert_eq!(resolved.energy_sourced_today_kwh, Some(12.0));
    assert_eq!(resolved.a_max, Some(16.0));
    assert_eq!(resolved.ip_address.as_deref(), Some("10.0.0.5"));

    assert!(coordinator.last_update_success());
    assert!(Arc::ptr_eq(&coordinator.snapshot().unwrap(), &snapshot));
}

#[tokio::test]
async fn test_optional_failures_leave_defaults() {
    let ids = Ids::new("123").with_charging_station("9");
    let (server, coordinator) = setup(ids).await;
    mount_login(&server).await;
    mount_rfid(&server, rfid_state("optimized"), 1).await;

    Mock::given(method("GET"))
        .and(path(format!("{BASE}/charging_stations/9")))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "detail": "Not found." })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/statistics/42/rfid/123"))
        .respond_with(html(502))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{BASE}/timers/")))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([{ "id": 1 }]))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;
    mount_json(&server, &format!("{RFID_PATH}/journal"), json!({ "unexpected": "shape" })).await;

    let snapshot = coordinator.refresh().await.unwrap();

    assert_eq!(snapshot.charging_station_detail, None);
    assert_eq!(snapshot.statistics, None);
    assert_eq!(snapshot.charging_station_stats, None);
    assert!(snapshot.timers.is_empty());
    assert!(snapshot.journal.is_empty());
    assert_eq!(snapshot.permissions, None);
    assert_eq!(snapshot.user, None);

    // Inline stats are the only source left.
    assert_eq!(snapshot.resolved.current_power_kw, Some(3.0));
    assert_eq!(snapshot.resolved.charging_mode, Some(ChargingProfile::Optimized));
    assert!(coordinator.last_update_success());
}

#[tokio::test]
async fn test_user_endpoints_skipped_without_user_id() {
    let (server, coordinator) = setup(Ids::new("123")).await;
    mount_login(&server).await;
    mount_rfid(&server, rfid_state("instant"), 1).await;

    Mock::given(method("GET"))
        .and(path("/api/users/7/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(0)
        .mount(&server)
        .await;

    coordinator.refresh().await.unwrap();
}

#[tokio::test]
async fn test_non_mapping_payload_kept_as_rfid() {
    let (server, coordinator) = setup(Ids::new("123")).await;
    mount_login(&server).await;
    mount_rfid(&server, json!(["RFID-123"]), 1).await;

    let snapshot = coordinator.refresh().await.unwrap();

    assert_eq!(snapshot.rfid, Some(RfidRecord::Other(json!(["RFID-123"]))));
    assert_eq!(snapshot.status, None);
    assert_eq!(snapshot.resolved.charging_mode, None);
}

// ── Failure ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_mandatory_timeout_keeps_previous_snapshot() {
    let (server, coordinator) = setup(Ids::new("123")).await;
    mount_login(&server).await;

    Mock::given(method("GET"))
        .and(path(RFID_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(rfid_state("instant")))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(RFID_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(rfid_state("disabled"))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let first = coordinator.refresh().await.unwrap();
    assert!(coordinator.last_update_success());

    let err = coordinator.refresh().await.unwrap_err();
    assert!(err.is_update_failed(), "expected UpdateFailed, got: {err:?}");
    assert!(err.is_timeout(), "expected wrapped timeout, got: {err:?}");

    assert!(!coordinator.last_update_success());
    let visible = coordinator.snapshot().unwrap();
    assert!(Arc::ptr_eq(&visible, &first));
    assert_eq!(visible.rfid.as_ref().unwrap().profile(), Some("instant"));
}

#[tokio::test]
async fn test_mandatory_html_fails_cycle() {
    let (server, coordinator) = setup(Ids::new("123")).await;
    mount_login(&server).await;

    Mock::given(method("GET"))
        .and(path(RFID_PATH))
        .respond_with(html(502))
        .mount(&server)
        .await;

    let err = coordinator.refresh().await.unwrap_err();
    match err {
        invisia_core::CoreError::UpdateFailed { rfid_id, source } => {
            assert_eq!(rfid_id, "123");
            assert!(
                matches!(source, invisia_api::Error::Protocol { status: 502, .. }),
                "expected Protocol error, got: {source:?}"
            );
        }
        other => panic!("expected UpdateFailed, got: {other:?}"),
    }
    assert!(coordinator.snapshot().is_none());
}

#[tokio::test]
async fn test_rejected_login_fails_cycle_as_auth() {
    let (server, coordinator) = setup(Ids::new("123")).await;

    Mock::given(method("POST"))
        .and(path("/api/authentication/token/"))
        .respond_with(
            ResponseTemplate::new(401)
                .set_body_json(json!({ "detail": "No active account found" })),
        )
        .mount(&server)
        .await;

    let err = coordinator.refresh().await.unwrap_err();
    assert!(err.is_update_failed());
    assert!(err.is_auth(), "expected auth failure, got: {err:?}");
}

// ── Command relay ───────────────────────────────────────────────────

async fn mount_patch(server: &MockServer, profile: &str, expected: u64) {
    Mock::given(method("PATCH"))
        .and(path(RFID_PATH))
        .and(header("X-Authorization", "Bearer a1"))
        .and(body_json(json!({ "id": 123, "profile": profile })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 123,
            "profile": profile
        })))
        .expect(expected)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_set_profile_patches_then_refreshes_once() {
    let (server, coordinator) = setup(Ids::new("123")).await;
    mount_login(&server).await;
    mount_patch(&server, "optimized", 1).await;
    mount_rfid(&server, rfid_state("optimized"), 1).await;

    coordinator.set_profile("optimized").await.unwrap();

    let snapshot = coordinator.snapshot().unwrap();
    assert_eq!(snapshot.resolved.charging_mode, Some(ChargingProfile::Optimized));
}

#[tokio::test]
async fn test_set_profile_with_current_value_still_refreshes() {
    let (server, coordinator) = setup(Ids::new("123")).await;
    mount_login(&server).await;
    mount_rfid(&server, rfid_state("instant"), 2).await;
    mount_patch(&server, "instant", 1).await;

    coordinator.refresh().await.unwrap();
    coordinator.set_profile("Instant").await.unwrap();
}

#[tokio::test]
async fn test_unrecognised_profile_is_ignored() {
    let (server, coordinator) = setup(Ids::new("123")).await;
    Mock::given(method("POST"))
        .and(path("/api/authentication/token/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "access": "a1" })))
        .expect(0)
        .mount(&server)
        .await;
    mount_patch(&server, "turbo", 0).await;

    coordinator.set_profile("turbo").await.unwrap();
    assert!(coordinator.snapshot().is_none());
}

#[tokio::test]
async fn test_failed_refresh_after_write_is_not_an_error() {
    let (server, coordinator) = setup(Ids::new("123")).await;
    mount_login(&server).await;
    mount_patch(&server, "disabled", 1).await;
    Mock::given(method("GET"))
        .and(path(RFID_PATH))
        .respond_with(html(503))
        .expect(1)
        .mount(&server)
        .await;

    coordinator
        .set_charging_profile(ChargingProfile::Disabled)
        .await
        .unwrap();
    assert!(!coordinator.last_update_success());
}

#[tokio::test]
async fn test_failed_write_is_returned() {
    let (server, coordinator) = setup(Ids::new("123")).await;
    mount_login(&server).await;
    Mock::given(method("PATCH"))
        .and(path(RFID_PATH))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({ "profile": ["Invalid choice."] })),
        )
        .mount(&server)
        .await;
    mount_rfid(&server, rfid_state("instant"), 0).await;

    let err = coordinator.set_profile("disabled").await.unwrap_err();
    assert!(
        matches!(err, invisia_core::CoreError::Api { status: Some(400), .. }),
        "expected Api error, got: {err:?}"
    );
}

// ── Lifecycle ───────────────────────────────────────────────────────

#[tokio::test]
async fn test_start_polls_until_shutdown() {
    let server = MockServer::start().await;
    let mut config = config(&server, Ids::new("123"));
    config.poll_interval = Duration::from_millis(100);
    let coordinator = Coordinator::new(config).unwrap();

    mount_login(&server).await;
    Mock::given(method("GET"))
        .and(path(RFID_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(rfid_state("instant")))
        .mount(&server)
        .await;

    let mut rx = coordinator.subscribe();
    coordinator.start().await.unwrap();
    assert!(rx.borrow_and_update().is_some());

    // The periodic task publishes again.
    tokio::time::timeout(Duration::from_secs(2), rx.changed())
        .await
        .unwrap()
        .unwrap();

    coordinator.shutdown().await;

    let rfid_gets = |requests: &[wiremock::Request]| {
        requests
            .iter()
            .filter(|r| r.method.as_str() == "GET" && r.url.path() == RFID_PATH)
            .count()
    };
    let after_shutdown = rfid_gets(&server.received_requests().await.unwrap());
    assert!(after_shutdown >= 2);

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(
        rfid_gets(&server.received_requests().await.unwrap()),
        after_shutdown
    );
}

#[tokio::test]
async fn test_device_metadata() {
    let (_server, coordinator) = setup(Ids::new("123").with_charging_station("9")).await;

    assert_eq!(coordinator.unique_id(), "42_123");

    let devices = coordinator.devices();
    assert_eq!(devices.len(), 2);
    assert_eq!(devices[0].identifier, "42_123");
    assert_eq!(devices[0].name, "Invisia RFID 123");
    assert_eq!(devices[1].identifier, "42_cs_9");
    assert_eq!(devices[1].model, "Charging Station");
}
