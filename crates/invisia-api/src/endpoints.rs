// Endpoint catalogue
//
// Pure request builders, one per vendor operation. Nothing here touches the
// network; `InvisiaClient::request` executes what these return.
//
// Identifiers are opaque strings and are interpolated verbatim.

use reqwest::Method;
use serde_json::{Value, json};
use url::Url;

use crate::error::Error;

pub(crate) const TOKEN_PATH: &str = "/api/authentication/token/";
pub(crate) const TOKEN_REFRESH_PATH: &str = "/api/authentication/token/refresh/";

/// One call against the vendor backend.
#[derive(Debug, Clone, PartialEq)]
pub struct EndpointRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(&'static str, String)>,
    pub body: Option<Value>,
    /// When set, a non-JSON body is surfaced as [`RawResponse::NonJson`](crate::RawResponse::NonJson)
    /// instead of failing the call.
    pub tolerate_non_json: bool,
}

impl EndpointRequest {
    fn get(path: String) -> Self {
        Self {
            method: Method::GET,
            path,
            query: Vec::new(),
            body: None,
            tolerate_non_json: false,
        }
    }

    fn tolerant(mut self) -> Self {
        self.tolerate_non_json = true;
        self
    }

    fn param(mut self, key: &'static str, value: impl Into<String>) -> Self {
        self.query.push((key, value.into()));
        self
    }
}

/// Resolve a catalogue path against the configured base URL.
///
/// Paths are appended below the base URL's own path, so a base such as
/// `https://proxy.example/invisia` keeps its `/invisia` prefix.
pub(crate) fn url_for(base_url: &Url, path: &str) -> Result<Url, Error> {
    let mut base = base_url.clone();
    if !base.path().ends_with('/') {
        let dir = format!("{}/", base.path());
        base.set_path(&dir);
    }
    Ok(base.join(path.trim_start_matches('/'))?)
}

fn installation(installation_id: &str) -> String {
    format!("/api/cockpit/installations/{installation_id}")
}

/// JSON representation of an RFID id in request bodies.
///
/// The backend expects a number when the id is numeric; anything else is
/// sent as the original string. No arithmetic is performed on the value.
fn rfid_body_id(rfid_id: &str) -> Value {
    match rfid_id.parse::<u64>() {
        Ok(number) if number.to_string() == rfid_id => Value::from(number),
        _ => Value::String(rfid_id.to_owned()),
    }
}

// ── RFID ────────────────────────────────────────────────────────────

/// `GET /api/cockpit/installations/{id}/rfids/{rfid}`
pub fn get_rfid(installation_id: &str, rfid_id: &str) -> EndpointRequest {
    EndpointRequest::get(format!("{}/rfids/{rfid_id}", installation(installation_id)))
}

/// `PATCH /api/cockpit/installations/{id}/rfids/{rfid}` with `{"id", "profile"}`
pub fn patch_rfid_profile(installation_id: &str, rfid_id: &str, profile: &str) -> EndpointRequest {
    EndpointRequest {
        method: Method::PATCH,
        path: format!("{}/rfids/{rfid_id}", installation(installation_id)),
        query: Vec::new(),
        body: Some(json!({ "id": rfid_body_id(rfid_id), "profile": profile })),
        tolerate_non_json: false,
    }
}

/// `GET /api/cockpit/installations/{id}/rfids/{rfid}/journal?start&end`
pub fn get_rfid_journal(
    installation_id: &str,
    rfid_id: &str,
    start: &str,
    end: &str,
) -> EndpointRequest {
    EndpointRequest::get(format!(
        "{}/rfids/{rfid_id}/journal",
        installation(installation_id)
    ))
    .param("start", start)
    .param("end", end)
    .tolerant()
}

/// `GET /api/cockpit/installations/{id}/timers/?object_id&object_type=rfid`
pub fn get_rfid_timers(installation_id: &str, rfid_id: &str) -> EndpointRequest {
    EndpointRequest::get(format!("{}/timers/", installation(installation_id)))
        .param("object_id", rfid_id)
        .param("object_type", "rfid")
        .tolerant()
}

/// `GET /api/statistics/{id}/rfid/{rfid}?start&end&granularity`
pub fn get_rfid_stats(
    installation_id: &str,
    rfid_id: &str,
    start: &str,
    end: &str,
    granularity: &str,
) -> EndpointRequest {
    EndpointRequest::get(format!("/api/statistics/{installation_id}/rfid/{rfid_id}"))
        .param("start", start)
        .param("end", end)
        .param("granularity", granularity)
        .tolerant()
}

/// `GET /api/statistics/{id}/rfid/{rfid}/zev?start&end&granularity`
pub fn get_rfid_stats_zev(
    installation_id: &str,
    rfid_id: &str,
    start: &str,
    end: &str,
    granularity: &str,
) -> EndpointRequest {
    EndpointRequest::get(format!(
        "/api/statistics/{installation_id}/rfid/{rfid_id}/zev"
    ))
    .param("start", start)
    .param("end", end)
    .param("granularity", granularity)
    .tolerant()
}

// ── Charging stations ───────────────────────────────────────────────

/// `GET /api/cockpit/installations/{id}/objects/charging_stations/stats`
pub fn get_charging_station_stats(installation_id: &str) -> EndpointRequest {
    EndpointRequest::get(format!(
        "{}/objects/charging_stations/stats",
        installation(installation_id)
    ))
    .tolerant()
}

/// `GET /api/cockpit/installations/{id}/charging_stations/{cs}`
pub fn get_charging_station_detail(
    installation_id: &str,
    charging_station_id: &str,
) -> EndpointRequest {
    EndpointRequest::get(format!(
        "{}/charging_stations/{charging_station_id}",
        installation(installation_id)
    ))
    .tolerant()
}

/// `GET /api/statistics/{id}/object/charging_stations?start&end&granularity`
pub fn get_charging_station_timeseries(
    installation_id: &str,
    start: &str,
    end: &str,
    granularity: &str,
) -> EndpointRequest {
    EndpointRequest::get(format!(
        "/api/statistics/{installation_id}/object/charging_stations"
    ))
    .param("start", start)
    .param("end", end)
    .param("granularity", granularity)
    .tolerant()
}

/// `GET /api/statistics/{id}/object/charging_stations/zev?start&end&granularity`
pub fn get_charging_station_timeseries_zev(
    installation_id: &str,
    start: &str,
    end: &str,
    granularity: &str,
) -> EndpointRequest {
    EndpointRequest::get(format!(
        "/api/statistics/{installation_id}/object/charging_stations/zev"
    ))
    .param("start", start)
    .param("end", end)
    .param("granularity", granularity)
    .tolerant()
}

// ── Permissions / user ──────────────────────────────────────────────

/// `GET /api/cockpit/installations/{id}/objects/permissions?user_id`
pub fn get_permissions(installation_id: &str, user_id: &str) -> EndpointRequest {
    EndpointRequest::get(format!(
        "{}/objects/permissions",
        installation(installation_id)
    ))
    .param("user_id", user_id)
    .tolerant()
}

/// `GET /api/users/{user}/`
pub fn get_user(user_id: &str) -> EndpointRequest {
    EndpointRequest::get(format!("/api/users/{user_id}/")).tolerant()
}

/// `GET /api/cockpit/users/{user}/installations/{id}`
pub fn get_user_installation(installation_id: &str, user_id: &str) -> EndpointRequest {
    EndpointRequest::get(format!(
        "/api/cockpit/users/{user_id}/installations/{installation_id}"
    ))
    .tolerant()
}
