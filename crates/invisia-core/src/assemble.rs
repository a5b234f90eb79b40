// ── Snapshot assembly ──
//
// One poll cycle: the mandatory RFID fetch, then each optional fetch in
// turn. Only the mandatory fetch can fail the cycle; optional fetches that
// fail leave their section at its default.

use std::future::Future;
use std::time::Instant;

use chrono::{SecondsFormat, TimeDelta, Utc};
use invisia_api::{InvisiaClient, RawResponse};
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::Ids;
use crate::convert::{self, RfidPayload};
use crate::error::CoreError;
use crate::model::{ChargingStationDetail, Snapshot};

/// Most recent timers kept per snapshot.
pub const TIMER_CAP: usize = 5;
/// Most recent journal entries kept per snapshot.
pub const JOURNAL_CAP: usize = 10;
/// Window of journal entries requested each cycle.
pub const JOURNAL_WINDOW: TimeDelta = TimeDelta::days(7);
/// Window of RFID statistics requested each cycle.
pub const STATS_WINDOW: TimeDelta = TimeDelta::hours(24);
/// Granularity of the per-cycle statistics request.
pub const STATS_GRANULARITY: &str = "total";

/// RFC 3339 timestamp in the form the statistics endpoints expect.
pub fn timestamp(at: chrono::DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Run one poll cycle against `client`.
pub async fn assemble(client: &InvisiaClient, ids: &Ids) -> Result<Snapshot, CoreError> {
    let started = Instant::now();

    let payload = client
        .get_rfid(&ids.rfid_id)
        .await
        .map_err(|source| CoreError::UpdateFailed {
            rfid_id: ids.rfid_id.clone(),
            source,
        })?;

    let RfidPayload { rfid, status, stats } = convert::split_rfid_payload(payload);
    let mut snapshot = Snapshot::new(rfid, status, stats);

    if let Some(cs) = ids.charging_station_id.as_deref() {
        snapshot.charging_station_detail = optional(
            "charging_stations/detail",
            client.get_charging_station_detail(cs),
        )
        .await
        .and_then(|v| {
            shaped(
                "charging_stations/detail",
                convert::section::<ChargingStationDetail>(v),
            )
        });
    }

    snapshot.charging_station_stats =
        optional("charging_stations/stats", client.get_charging_station_stats())
            .await
            .and_then(|v| shaped("charging_stations/stats", convert::unwrap_stats(v)));

    snapshot.timers = optional("timers", client.get_rfid_timers(&ids.rfid_id))
        .await
        .and_then(|v| shaped("timers", convert::capped_list(v, TIMER_CAP)))
        .unwrap_or_default();

    let now = Utc::now();
    let end = timestamp(now);

    let journal_start = timestamp(now - JOURNAL_WINDOW);
    snapshot.journal = optional(
        "rfids/journal",
        client.get_rfid_journal(&ids.rfid_id, &journal_start, &end),
    )
    .await
    .and_then(|v| shaped("rfids/journal", convert::capped_list(v, JOURNAL_CAP)))
    .unwrap_or_default();

    let stats_start = timestamp(now - STATS_WINDOW);
    snapshot.statistics = optional(
        "statistics/rfid",
        client.get_rfid_stats(&ids.rfid_id, &stats_start, &end, STATS_GRANULARITY),
    )
    .await
    .and_then(|v| shaped("statistics/rfid", convert::unwrap_stats(v)));

    if let Some(user) = ids.user_id.as_deref() {
        snapshot.permissions = optional("objects/permissions", client.get_permissions(user)).await;
        snapshot.user = optional("users", client.get_user(user)).await;
        snapshot.user_installation =
            optional("users/installations", client.get_user_installation(user)).await;
    }

    snapshot.resolve();
    snapshot.captured_at = Utc::now();

    debug!(
        rfid_id = %ids.rfid_id,
        elapsed_ms = started.elapsed().as_millis(),
        rfid_present = snapshot.rfid.is_some(),
        "poll cycle complete"
    );

    Ok(snapshot)
}

/// Await an optional fetch, turning every failure into `None`.
///
/// Tolerated non-JSON answers are a known backend defect and log at debug;
/// anything else logs at warn.
async fn optional<F>(endpoint: &str, fetch: F) -> Option<Value>
where
    F: Future<Output = Result<RawResponse, invisia_api::Error>>,
{
    match fetch.await {
        Ok(RawResponse::Json(value)) => Some(value),
        Ok(soft) => {
            debug!(
                endpoint,
                status = ?soft.soft_failure_status(),
                response = ?soft,
                "soft failure, leaving section empty"
            );
            None
        }
        Err(e) => {
            warn!(
                endpoint,
                status = ?e.status(),
                transient = e.is_transient(),
                error = %e,
                "fetch failed, leaving section empty"
            );
            None
        }
    }
}

fn shaped<T>(endpoint: &str, parsed: Option<T>) -> Option<T> {
    if parsed.is_none() {
        debug!("{endpoint}: unexpected payload shape, ignoring");
    }
    parsed
}
