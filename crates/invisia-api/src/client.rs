// Invisia cockpit HTTP client
//
// Wraps `reqwest::Client` with bearer/installation headers, the per-request
// bound, response classification, and the single refresh-and-retry on a
// rejected token. Typed endpoint methods sit on top of `request`.

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::auth::{Credentials, INSTALLATION_HEADER, TokenManager};
use crate::endpoints::{self, EndpointRequest};
use crate::error::Error;
use crate::response::{Classified, RawResponse, classify};
use crate::transport::{TransportConfig, bounded};

/// Header carrying the bearer token.
const AUTHORIZATION_HEADER: &str = "X-Authorization";

/// Async client for one installation of the Invisia cockpit API.
///
/// Owns its [`TokenManager`]; every request is sent with a token, logging
/// in lazily on first use.
pub struct InvisiaClient {
    http: reqwest::Client,
    base_url: Url,
    timeout: Duration,
    tokens: TokenManager,
}

impl InvisiaClient {
    /// Build a client from a transport config.
    pub fn new(
        base_url: Url,
        credentials: Credentials,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self::with_client(http, base_url, credentials, transport.timeout))
    }

    /// Wrap a pre-built `reqwest::Client`.
    pub fn with_client(
        http: reqwest::Client,
        base_url: Url,
        credentials: Credentials,
        timeout: Duration,
    ) -> Self {
        let tokens = TokenManager::new(http.clone(), base_url.clone(), credentials, timeout);
        Self {
            http,
            base_url,
            timeout,
            tokens,
        }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn installation_id(&self) -> &str {
        &self.tokens.credentials().installation_id
    }

    /// The token manager shared by every request of this client.
    pub fn tokens(&self) -> &TokenManager {
        &self.tokens
    }

    // ── Request execution ────────────────────────────────────────────

    /// Execute a catalogue request.
    ///
    /// A reply carrying the token-invalid marker triggers exactly one
    /// refresh and one resend; a second rejection is an
    /// [`Error::Authentication`].
    pub async fn request(&self, req: &EndpointRequest) -> Result<RawResponse, Error> {
        let mut refreshed = false;
        loop {
            let token = self.tokens.ensure_token().await?;
            match self.send(req, &token).await? {
                Classified::Response(raw) => return Ok(raw),
                Classified::TokenInvalid if refreshed => {
                    return Err(Error::Authentication {
                        message: format!("token rejected again after refresh ({})", req.path),
                    });
                }
                Classified::TokenInvalid => {
                    debug!(path = %req.path, "token rejected, refreshing once");
                    self.tokens.refresh().await?;
                    refreshed = true;
                }
            }
        }
    }

    /// Execute a request that must yield a JSON body.
    pub async fn request_json(&self, req: &EndpointRequest) -> Result<Value, Error> {
        match self.request(req).await? {
            RawResponse::Json(value) => Ok(value),
            RawResponse::NonJson { status, text } => Err(Error::Protocol {
                status,
                message: "expected JSON".into(),
                body_preview: text,
            }),
            RawResponse::HttpError { status, body } => Err(Error::Api { status, body }),
        }
    }

    async fn send(&self, req: &EndpointRequest, token: &SecretString) -> Result<Classified, Error> {
        let url = endpoints::url_for(&self.base_url, &req.path)?;
        debug!("{} {url} params={:?}", req.method, req.query);

        bounded(self.timeout, async {
            let mut builder = self
                .http
                .request(req.method.clone(), url)
                .header(reqwest::header::ACCEPT, "application/json")
                .header(
                    AUTHORIZATION_HEADER,
                    format!("Bearer {}", token.expose_secret()),
                )
                .header(INSTALLATION_HEADER, self.installation_id());
            if !req.query.is_empty() {
                builder = builder.query(&req.query);
            }
            if let Some(body) = &req.body {
                builder = builder.json(body);
            }

            let resp = builder.send().await?;
            let status = resp.status();
            let text = resp.text().await?;
            classify(status, &text, req.tolerate_non_json)
        })
        .await
    }

    // ── RFID ─────────────────────────────────────────────────────────

    /// Current RFID state (profile, status block, inline stats).
    pub async fn get_rfid(&self, rfid_id: &str) -> Result<Value, Error> {
        self.request_json(&endpoints::get_rfid(self.installation_id(), rfid_id))
            .await
    }

    /// Change the charging profile of an RFID. Returns the updated state.
    pub async fn set_rfid_profile(&self, rfid_id: &str, profile: &str) -> Result<Value, Error> {
        debug!(rfid_id, profile, "setting rfid profile");
        self.request_json(&endpoints::patch_rfid_profile(
            self.installation_id(),
            rfid_id,
            profile,
        ))
        .await
    }

    pub async fn get_rfid_journal(
        &self,
        rfid_id: &str,
        start: &str,
        end: &str,
    ) -> Result<RawResponse, Error> {
        self.request(&endpoints::get_rfid_journal(
            self.installation_id(),
            rfid_id,
            start,
            end,
        ))
        .await
    }

    pub async fn get_rfid_timers(&self, rfid_id: &str) -> Result<RawResponse, Error> {
        self.request(&endpoints::get_rfid_timers(self.installation_id(), rfid_id))
            .await
    }

    pub async fn get_rfid_stats(
        &self,
        rfid_id: &str,
        start: &str,
        end: &str,
        granularity: &str,
    ) -> Result<RawResponse, Error> {
        self.request(&endpoints::get_rfid_stats(
            self.installation_id(),
            rfid_id,
            start,
            end,
            granularity,
        ))
        .await
    }

    pub async fn get_rfid_stats_zev(
        &self,
        rfid_id: &str,
        start: &str,
        end: &str,
        granularity: &str,
    ) -> Result<RawResponse, Error> {
        self.request(&endpoints::get_rfid_stats_zev(
            self.installation_id(),
            rfid_id,
            start,
            end,
            granularity,
        ))
        .await
    }

    // ── Charging stations ────────────────────────────────────────────

    pub async fn get_charging_station_stats(&self) -> Result<RawResponse, Error> {
        self.request(&endpoints::get_charging_station_stats(
            self.installation_id(),
        ))
        .await
    }

    pub async fn get_charging_station_detail(
        &self,
        charging_station_id: &str,
    ) -> Result<RawResponse, Error> {
        self.request(&endpoints::get_charging_station_detail(
            self.installation_id(),
            charging_station_id,
        ))
        .await
    }

    pub async fn get_charging_station_timeseries(
        &self,
        start: &str,
        end: &str,
        granularity: &str,
    ) -> Result<RawResponse, Error> {
        self.request(&endpoints::get_charging_station_timeseries(
            self.installation_id(),
            start,
            end,
            granularity,
        ))
        .await
    }

    pub async fn get_charging_station_timeseries_zev(
        &self,
        start: &str,
        end: &str,
        granularity: &str,
    ) -> Result<RawResponse, Error> {
        self.request(&endpoints::get_charging_station_timeseries_zev(
            self.installation_id(),
            start,
            end,
            granularity,
        ))
        .await
    }

    // ── Permissions / user ───────────────────────────────────────────

    pub async fn get_permissions(&self, user_id: &str) -> Result<RawResponse, Error> {
        self.request(&endpoints::get_permissions(self.installation_id(), user_id))
            .await
    }

    pub async fn get_user(&self, user_id: &str) -> Result<RawResponse, Error> {
        self.request(&endpoints::get_user(user_id)).await
    }

    pub async fn get_user_installation(&self, user_id: &str) -> Result<RawResponse, Error> {
        self.request(&endpoints::get_user_installation(
            self.installation_id(),
            user_id,
        ))
        .await
    }
}
