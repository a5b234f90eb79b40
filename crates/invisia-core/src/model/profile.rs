use serde::{Deserialize, Serialize};

/// Charging policy applied to an RFID.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
    strum::VariantNames,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ChargingProfile {
    Instant,
    Optimized,
    Disabled,
}

impl ChargingProfile {
    /// Parse a backend or user supplied value, ignoring case and
    /// surrounding whitespace. Unknown values yield `None`.
    pub fn parse_lenient(value: &str) -> Option<Self> {
        value.trim().parse().ok()
    }
}
