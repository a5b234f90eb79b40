// ── Runtime coordinator configuration ──
//
// Describes *which* installation to poll and how. Carries credential data
// and timing, never touches disk. The CLI (or any other host) builds a
// `CoordinatorConfig` and hands it in.

use std::path::PathBuf;
use std::time::Duration;

use invisia_api::Credentials;
pub use invisia_api::DEFAULT_BASE_URL;

/// Default interval between two scheduled polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);

/// Configuration-derived identifiers, immutable per coordinator.
///
/// All identifiers are opaque strings even when textually numeric.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ids {
    pub rfid_id: String,
    pub user_id: Option<String>,
    pub charging_station_id: Option<String>,
}

impl Ids {
    pub fn new(rfid_id: impl Into<String>) -> Self {
        Self {
            rfid_id: rfid_id.into(),
            user_id: None,
            charging_station_id: None,
        }
    }

    #[must_use]
    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    #[must_use]
    pub fn with_charging_station(mut self, charging_station_id: impl Into<String>) -> Self {
        self.charging_station_id = Some(charging_station_id.into());
        self
    }
}

/// Configuration for polling a single installation + RFID pairing.
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Backend root (e.g. `https://app.invisia.ch`).
    pub base_url: String,
    pub credentials: Credentials,
    pub ids: Ids,
    /// Extra CA certificate to trust, if any.
    pub ca_cert: Option<PathBuf>,
    /// Upper bound for every single network call.
    pub timeout: Duration,
    /// How often the background task polls. Zero disables the task.
    pub poll_interval: Duration,
}

impl CoordinatorConfig {
    /// Config against the production backend with default timing.
    pub fn new(credentials: Credentials, ids: Ids) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.into(),
            credentials,
            ids,
            ca_cert: None,
            timeout: invisia_api::transport::DEFAULT_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn installation_id(&self) -> &str {
        &self.credentials.installation_id
    }
}
