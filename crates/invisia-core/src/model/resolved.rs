// ── Field precedence ──
//
// Several sections can report the same value. The rules below pick one
// per field so every consumer renders the same thing.
//
//   charging status   RFID status → station detail status
//   charging mode     station detail status → RFID profile → RFID status
//   car plugged in    RFID status → station detail flag
//   power / energy    station detail stats → station aggregate stats
//                     → statistics endpoint → inline RFID stats
//                     (already kW / kWh, taken as is)
//   a_max, ip, lock   station detail status → RFID status

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::profile::ChargingProfile;
use super::snapshot::{Snapshot, StatsBlock};

/// Charging statuses that imply a car is connected.
const PLUGGED_STATUSES: [&str; 2] = ["carpluggedin", "charging"];

/// Presentation values resolved from a [`Snapshot`].
///
/// Every field is optional; consumers render an unknown state for `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResolvedState {
    pub charging_status: Option<String>,
    pub charging_mode: Option<ChargingProfile>,
    pub car_plugged_in: Option<bool>,
    pub current_power_kw: Option<f64>,
    pub energy_charged_kwh: Option<f64>,
    pub energy_sourced_today_kwh: Option<f64>,
    pub a_max: Option<f64>,
    pub ip_address: Option<String>,
    pub lock: Option<Value>,
}

impl ResolvedState {
    pub fn from_snapshot(snapshot: &Snapshot) -> Self {
        let rfid_status = snapshot.status.as_ref();
        let detail_status = snapshot.detail_status();

        let charging_status = rfid_status
            .and_then(|s| s.charging_status.clone())
            .or_else(|| detail_status.and_then(|s| s.charging_status.clone()));

        let car_plugged_in = match rfid_status.and_then(|s| s.charging_status.as_deref()) {
            Some(status) => Some(PLUGGED_STATUSES.contains(&status.to_lowercase().as_str())),
            None => detail_status.and_then(|s| s.car_plugged_in),
        };

        // First non-empty candidate decides; an unknown value there yields
        // no mode rather than falling through.
        let charging_mode = detail_status
            .and_then(|s| s.charging_mode.as_deref())
            .or_else(|| snapshot.rfid.as_ref().and_then(|r| r.profile()))
            .or_else(|| rfid_status.and_then(|s| s.charging_mode.as_deref()))
            .and_then(ChargingProfile::parse_lenient);

        let stats_chain = [
            snapshot.detail_stats(),
            snapshot.charging_station_stats.as_ref(),
            snapshot.statistics.as_ref(),
            Some(&snapshot.stats),
        ];
        let stat = |pick: fn(&StatsBlock) -> Option<f64>| {
            stats_chain.iter().flatten().find_map(|block| pick(block))
        };

        let status_chain = [detail_status, rfid_status];

        Self {
            charging_status,
            charging_mode,
            car_plugged_in,
            current_power_kw: stat(|s| s.current_power_flow),
            energy_charged_kwh: stat(|s| s.e_charged),
            energy_sourced_today_kwh: stat(|s| s.e_sourced_today),
            a_max: status_chain.iter().flatten().find_map(|s| s.a_max),
            ip_address: status_chain
                .iter()
                .flatten()
                .find_map(|s| s.ipadresse.clone()),
            lock: status_chain.iter().flatten().find_map(|s| s.lock.clone()),
        }
    }
}
