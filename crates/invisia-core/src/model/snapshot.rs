// ── Snapshot sections ──
//
// Each typed section names the fields the precedence rules read and keeps
// everything else in a flattened `extra` map, so nothing the backend sends
// is lost on the way to a consumer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::de;
use super::resolved::ResolvedState;

/// An RFID object as returned by the cockpit API.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RfidInfo {
    #[serde(default, deserialize_with = "de::opt_value", skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    #[serde(default, deserialize_with = "de::opt_string", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "de::opt_string", skip_serializing_if = "Option::is_none")]
    pub profile: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The mandatory `rfid` section.
///
/// The backend sometimes hands back something other than an object here;
/// such payloads are kept verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RfidRecord {
    Object(RfidInfo),
    Other(Value),
}

impl RfidRecord {
    pub fn from_value(value: Value) -> Self {
        if value.is_object() {
            if let Ok(info) = serde_json::from_value::<RfidInfo>(value.clone()) {
                return Self::Object(info);
            }
        }
        Self::Other(value)
    }

    /// The configured charging profile, as the backend spells it.
    pub fn profile(&self) -> Option<&str> {
        match self {
            Self::Object(info) => info.profile.as_deref(),
            Self::Other(_) => None,
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Object(info) => info.name.as_deref(),
            Self::Other(_) => None,
        }
    }
}

/// Live status as reported either inline with the RFID or by a station.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatusBlock {
    #[serde(default, deserialize_with = "de::opt_string", skip_serializing_if = "Option::is_none")]
    pub charging_status: Option<String>,
    #[serde(default, deserialize_with = "de::opt_string", skip_serializing_if = "Option::is_none")]
    pub charging_mode: Option<String>,
    #[serde(default, deserialize_with = "de::opt_bool", skip_serializing_if = "Option::is_none")]
    pub car_plugged_in: Option<bool>,
    /// Maximum charging current in A.
    #[serde(default, deserialize_with = "de::opt_f64", skip_serializing_if = "Option::is_none")]
    pub a_max: Option<f64>,
    #[serde(default, deserialize_with = "de::opt_string", skip_serializing_if = "Option::is_none")]
    pub ipadresse: Option<String>,
    #[serde(default, deserialize_with = "de::opt_value", skip_serializing_if = "Option::is_none")]
    pub lock: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Power and energy figures. Power is in W, energy in Wh.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatsBlock {
    #[serde(default, deserialize_with = "de::opt_f64", skip_serializing_if = "Option::is_none")]
    pub current_power_flow: Option<f64>,
    #[serde(default, deserialize_with = "de::opt_f64", skip_serializing_if = "Option::is_none")]
    pub e_charged: Option<f64>,
    #[serde(default, deserialize_with = "de::opt_f64", skip_serializing_if = "Option::is_none")]
    pub e_sourced_today: Option<f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl StatsBlock {
    pub fn is_empty(&self) -> bool {
        self.current_power_flow.is_none()
            && self.e_charged.is_none()
            && self.e_sourced_today.is_none()
            && self.extra.is_empty()
    }
}

/// Detail object of the paired charging station.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChargingStationDetail {
    #[serde(default, deserialize_with = "lenient_section", skip_serializing_if = "Option::is_none")]
    pub status: Option<StatusBlock>,
    #[serde(default, deserialize_with = "lenient_section", skip_serializing_if = "Option::is_none")]
    pub stats: Option<StatsBlock>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn lenient_section<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: serde::de::DeserializeOwned,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(v @ Value::Object(_)) => serde_json::from_value(v).ok(),
        _ => None,
    })
}

/// The merged result of one poll cycle.
///
/// Immutable once published. Optional sections are `None` (or empty) when
/// their fetch failed or was not configured.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub rfid: Option<RfidRecord>,
    pub status: Option<StatusBlock>,
    /// Inline stats delivered with the RFID object; empty when absent.
    pub stats: StatsBlock,
    pub timers: Vec<Value>,
    pub journal: Vec<Value>,
    pub charging_station_detail: Option<ChargingStationDetail>,
    pub charging_station_stats: Option<StatsBlock>,
    pub statistics: Option<StatsBlock>,
    pub permissions: Option<Value>,
    pub user: Option<Value>,
    pub user_installation: Option<Value>,
    pub resolved: ResolvedState,
    pub captured_at: DateTime<Utc>,
}

impl Snapshot {
    /// A snapshot holding only the mandatory section, with an unresolved
    /// state. Call [`Snapshot::resolve`] once all sections are filled in.
    pub fn new(rfid: Option<RfidRecord>, status: Option<StatusBlock>, stats: StatsBlock) -> Self {
        Self {
            rfid,
            status,
            stats,
            timers: Vec::new(),
            journal: Vec::new(),
            charging_station_detail: None,
            charging_station_stats: None,
            statistics: None,
            permissions: None,
            user: None,
            user_installation: None,
            resolved: ResolvedState::default(),
            captured_at: Utc::now(),
        }
    }

    /// Compute `resolved` from the current sections.
    pub fn resolve(&mut self) {
        self.resolved = ResolvedState::from_snapshot(self);
    }

    pub fn detail_status(&self) -> Option<&StatusBlock> {
        self.charging_station_detail
            .as_ref()
            .and_then(|d| d.status.as_ref())
    }

    pub fn detail_stats(&self) -> Option<&StatsBlock> {
        self.charging_station_detail
            .as_ref()
            .and_then(|d| d.stats.as_ref())
    }
}
