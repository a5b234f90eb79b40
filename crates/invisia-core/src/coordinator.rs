// ── Coordinator ──
//
// Lifecycle of one installation + RFID pairing: owns the API client (and
// with it the token state), runs poll cycles, publishes snapshots through a
// watch channel, and relays profile changes.

use std::sync::Arc;
use std::time::Duration;

use invisia_api::transport::{TlsMode, TransportConfig};
use invisia_api::InvisiaClient;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

use crate::assemble;
use crate::config::{CoordinatorConfig, Ids};
use crate::error::CoreError;
use crate::model::{ChargingProfile, DeviceInfo, Snapshot};

/// The main entry point for hosts.
///
/// Cheaply cloneable via `Arc<CoordinatorInner>`. Call
/// [`start()`](Self::start) to perform the first refresh and begin
/// polling, [`shutdown()`](Self::shutdown) to stop.
#[derive(Clone)]
pub struct Coordinator {
    inner: Arc<CoordinatorInner>,
}

struct CoordinatorInner {
    config: CoordinatorConfig,
    client: InvisiaClient,
    snapshot: watch::Sender<Option<Arc<Snapshot>>>,
    last_update_success: watch::Sender<bool>,
    /// Held for the duration of a poll cycle so two cycles never overlap.
    poll_lock: Mutex<()>,
    cancel: CancellationToken,
    /// Child token for the current poll task, replaced on every start.
    cancel_child: Mutex<CancellationToken>,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
}

impl Coordinator {
    /// Create a coordinator. Does NOT contact the backend.
    pub fn new(config: CoordinatorConfig) -> Result<Self, CoreError> {
        let base_url: Url = config.base_url.parse().map_err(|e| CoreError::Config {
            message: format!("invalid base URL '{}': {e}", config.base_url),
        })?;

        let transport = TransportConfig {
            tls: config
                .ca_cert
                .clone()
                .map_or(TlsMode::System, TlsMode::CustomCa),
            timeout: config.timeout,
        };
        let client = InvisiaClient::new(base_url, config.credentials.clone(), &transport)?;

        let (snapshot, _) = watch::channel(None);
        let (last_update_success, _) = watch::channel(false);
        let cancel = CancellationToken::new();
        let cancel_child = cancel.child_token();

        Ok(Self {
            inner: Arc::new(CoordinatorInner {
                config,
                client,
                snapshot,
                last_update_success,
                poll_lock: Mutex::new(()),
                cancel,
                cancel_child: Mutex::new(cancel_child),
                task_handles: Mutex::new(Vec::new()),
            }),
        })
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.inner.config
    }

    pub fn ids(&self) -> &Ids {
        &self.inner.config.ids
    }

    /// The underlying API client, for ad-hoc calls outside the cycle.
    pub fn client(&self) -> &InvisiaClient {
        &self.inner.client
    }

    // ── Polling ──────────────────────────────────────────────────

    /// Run one poll cycle and publish the result.
    ///
    /// On failure the previously published snapshot stays visible and
    /// [`last_update_success()`](Self::last_update_success) turns false.
    pub async fn refresh(&self) -> Result<Arc<Snapshot>, CoreError> {
        let _cycle = self.inner.poll_lock.lock().await;

        match assemble::assemble(&self.inner.client, self.ids()).await {
            Ok(snapshot) => {
                let snapshot = Arc::new(snapshot);
                self.inner.snapshot.send_replace(Some(Arc::clone(&snapshot)));
                self.inner.last_update_success.send_replace(true);
                Ok(snapshot)
            }
            Err(e) => {
                self.inner.last_update_success.send_replace(false);
                Err(e)
            }
        }
    }

    /// The refresh a host performs during setup. A failure here means the
    /// integration should not be set up yet.
    pub async fn first_refresh(&self) -> Result<Arc<Snapshot>, CoreError> {
        info!(
            installation_id = %self.inner.config.installation_id(),
            rfid_id = %self.ids().rfid_id,
            "performing first refresh"
        );
        self.refresh().await
    }

    /// First refresh, then spawn the periodic poll task.
    ///
    /// A zero poll interval skips the task. Calling `start` while a poll
    /// task is already running only refreshes.
    pub async fn start(&self) -> Result<Arc<Snapshot>, CoreError> {
        let snapshot = self.first_refresh().await?;

        let interval = self.inner.config.poll_interval;
        if interval.is_zero() {
            return Ok(snapshot);
        }

        let mut handles = self.inner.task_handles.lock().await;
        if !handles.is_empty() {
            debug!("poll task already running");
            return Ok(snapshot);
        }

        let child = self.inner.cancel.child_token();
        *self.inner.cancel_child.lock().await = child.clone();

        let coordinator = self.clone();
        handles.push(tokio::spawn(poll_task(coordinator, interval, child)));
        info!(interval_secs = interval.as_secs(), "polling started");

        Ok(snapshot)
    }

    /// Stop the poll task and wait for it to finish.
    pub async fn shutdown(&self) {
        self.inner.cancel_child.lock().await.cancel();

        let mut handles = self.inner.task_handles.lock().await;
        for handle in handles.drain(..) {
            let _ = handle.await;
        }
        debug!("coordinator shut down");
    }

    // ── Observation ──────────────────────────────────────────────

    /// The last published snapshot, if any cycle has succeeded.
    pub fn snapshot(&self) -> Option<Arc<Snapshot>> {
        self.inner.snapshot.borrow().clone()
    }

    /// Subscribe to snapshot publications.
    pub fn subscribe(&self) -> watch::Receiver<Option<Arc<Snapshot>>> {
        self.inner.snapshot.subscribe()
    }

    /// Whether the most recent cycle succeeded.
    pub fn last_update_success(&self) -> bool {
        *self.inner.last_update_success.borrow()
    }

    /// Unique key of this pairing: `{installation}_{rfid}`.
    pub fn unique_id(&self) -> String {
        format!(
            "{}_{}",
            self.inner.config.installation_id(),
            self.ids().rfid_id
        )
    }

    /// Device grouping metadata: the RFID device, plus the charging
    /// station when one is configured.
    pub fn devices(&self) -> Vec<DeviceInfo> {
        let installation = self.inner.config.installation_id();
        let ids = self.ids();

        let mut devices = vec![DeviceInfo::rfid(installation, &ids.rfid_id)];
        if let Some(cs) = ids.charging_station_id.as_deref() {
            devices.push(DeviceInfo::charging_station(installation, cs));
        }
        devices
    }

    // ── Command relay ────────────────────────────────────────────

    /// Set the charging profile from a free-form value.
    ///
    /// Unrecognised values are ignored.
    pub async fn set_profile(&self, profile: &str) -> Result<(), CoreError> {
        let Some(profile) = ChargingProfile::parse_lenient(profile) else {
            debug!(profile, "ignoring unrecognised charging profile");
            return Ok(());
        };
        self.set_charging_profile(profile).await
    }

    /// Write the charging profile, then force one refresh.
    ///
    /// The write is always sent, even when the profile is unchanged. A
    /// failing refresh afterwards is logged, not returned.
    pub async fn set_charging_profile(&self, profile: ChargingProfile) -> Result<(), CoreError> {
        let rfid_id = &self.ids().rfid_id;
        self.inner
            .client
            .set_rfid_profile(rfid_id, profile.as_ref())
            .await?;
        info!(rfid_id = %rfid_id, %profile, "charging profile set");

        if let Err(e) = self.refresh().await {
            warn!(error = %e, "refresh after profile change failed");
        }
        Ok(())
    }
}

// ── Background task ──────────────────────────────────────────────

async fn poll_task(coordinator: Coordinator, period: Duration, cancel: CancellationToken) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    interval.tick().await; // consume the immediate first tick

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = interval.tick() => {
                if let Err(e) = coordinator.refresh().await {
                    warn!(error = %e, "periodic refresh failed");
                }
            }
        }
    }
}
