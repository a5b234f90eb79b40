// ── Payload normalisation ──
//
// Turns the loosely shaped JSON the backend returns into snapshot
// sections. Nothing here fails: a payload that does not have the expected
// shape yields `None` and the caller logs it.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::model::{RfidRecord, StatsBlock, StatusBlock};

/// The mandatory section split out of an RFID state payload.
#[derive(Debug, Default, PartialEq)]
pub struct RfidPayload {
    pub rfid: Option<RfidRecord>,
    pub status: Option<StatusBlock>,
    pub stats: StatsBlock,
}

/// Split the RFID state payload into its mandatory sections.
///
/// The backend returns either `{"rfid": {...}, "status": {...}, "stats":
/// {...}}` or the bare RFID object (recognised by its `profile` key).
/// Anything that is not an object is kept verbatim as the RFID record.
pub fn split_rfid_payload(payload: Value) -> RfidPayload {
    let mut map = match payload {
        Value::Object(map) => map,
        Value::Null => return RfidPayload::default(),
        other => {
            return RfidPayload {
                rfid: Some(RfidRecord::from_value(other)),
                ..RfidPayload::default()
            };
        }
    };

    let status = map.remove("status").and_then(section::<StatusBlock>);
    let stats = map
        .remove("stats")
        .and_then(section::<StatsBlock>)
        .unwrap_or_default();

    let rfid = match map.remove("rfid") {
        Some(Value::Null) => None,
        Some(value) => Some(RfidRecord::from_value(value)),
        None if map.contains_key("profile") => {
            Some(RfidRecord::from_value(Value::Object(map)))
        }
        None => None,
    };

    RfidPayload { rfid, status, stats }
}

/// Parse an object-shaped section. Non-objects yield `None`.
pub fn section<T: DeserializeOwned>(value: Value) -> Option<T> {
    if !value.is_object() {
        return None;
    }
    serde_json::from_value(value).ok()
}

/// Statistics payloads are sometimes wrapped as `{"stats": {...}}`.
pub fn unwrap_stats(value: Value) -> Option<StatsBlock> {
    match value {
        Value::Object(mut map) => match map.remove("stats") {
            Some(inner @ Value::Object(_)) => section(inner),
            Some(other) => {
                map.insert("stats".into(), other);
                section(Value::Object(map))
            }
            None => section(Value::Object(map)),
        },
        _ => None,
    }
}

/// A JSON list truncated to its first `cap` entries, order preserved.
pub fn capped_list(value: Value, cap: usize) -> Option<Vec<Value>> {
    match value {
        Value::Array(mut items) => {
            items.truncate(cap);
            Some(items)
        }
        _ => None,
    }
}
