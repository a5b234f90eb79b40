// Token lifecycle
//
// Owns the access/refresh token pair and the login/refresh state machine.
// Both operations finish their network call first and then overwrite the
// pair inside a single write-lock section, so a concurrent reader sees
// either the previous pair or the new one.

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::RwLock;
use tracing::debug;
use url::Url;

use crate::endpoints::{TOKEN_PATH, TOKEN_REFRESH_PATH, url_for};
use crate::error::Error;
use crate::response::preview;
use crate::transport::bounded;

/// Header carrying the installation identifier on every call.
pub(crate) const INSTALLATION_HEADER: &str = "X-Installation-Id";

/// Login material for one installation.
///
/// Immutable for the lifetime of a client; never persisted by this crate.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub email: String,
    pub password: SecretString,
    /// Opaque identifier, sent verbatim in paths and headers.
    pub installation_id: String,
}

impl Credentials {
    pub fn new(
        email: impl Into<String>,
        password: impl Into<String>,
        installation_id: impl Into<String>,
    ) -> Self {
        Self {
            email: email.into(),
            password: SecretString::from(password.into()),
            installation_id: installation_id.into(),
        }
    }
}

/// Current token pair. An absent access token means the next request
/// must log in first.
#[derive(Debug, Default, Clone)]
pub struct TokenState {
    pub access: Option<SecretString>,
    pub refresh: Option<SecretString>,
}

/// Body shape shared by the token and refresh endpoints.
#[derive(Debug, Deserialize)]
struct TokenPair {
    #[serde(default)]
    access: Option<String>,
    #[serde(default)]
    refresh: Option<String>,
}

/// Login/refresh state machine over a shared [`TokenState`].
pub struct TokenManager {
    http: reqwest::Client,
    base_url: Url,
    credentials: Credentials,
    timeout: Duration,
    state: RwLock<TokenState>,
}

impl TokenManager {
    pub fn new(
        http: reqwest::Client,
        base_url: Url,
        credentials: Credentials,
        timeout: Duration,
    ) -> Self {
        Self {
            http,
            base_url,
            credentials,
            timeout,
            state: RwLock::new(TokenState::default()),
        }
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Post the credentials to the token endpoint and store the returned pair.
    ///
    /// `POST /api/authentication/token/` with `{"email", "password"}`
    pub async fn login(&self) -> Result<(), Error> {
        let url = url_for(&self.base_url, TOKEN_PATH)?;
        debug!("logging in at {url}");

        let body = json!({
            "email": self.credentials.email,
            "password": self.credentials.password.expose_secret(),
        });
        let pair = match self.post_token(url, &body).await {
            Ok(pair) => pair,
            Err(e) => {
                self.clear().await;
                return Err(e);
            }
        };

        let Some(access) = pair.access.filter(|a| !a.is_empty()) else {
            self.clear().await;
            return Err(Error::Authentication {
                message: "login response carried no access token".into(),
            });
        };

        *self.state.write().await = TokenState {
            access: Some(SecretString::from(access)),
            refresh: pair.refresh.map(SecretString::from),
        };
        debug!("login successful");
        Ok(())
    }

    /// Exchange the refresh token for a new access token, falling back to
    /// [`login`](Self::login) when no refresh token is held.
    ///
    /// `POST /api/authentication/token/refresh/` with `{"refresh"}`
    pub async fn refresh(&self) -> Result<(), Error> {
        let refresh = self.state.read().await.refresh.clone();
        let Some(refresh) = refresh else {
            debug!("no refresh token held, logging in again");
            return self.login().await;
        };

        let url = url_for(&self.base_url, TOKEN_REFRESH_PATH)?;
        debug!("refreshing access token at {url}");

        let body = json!({ "refresh": refresh.expose_secret() });
        let pair = match self.post_token(url, &body).await {
            Ok(pair) => pair,
            Err(e) => {
                self.clear().await;
                return Err(e);
            }
        };

        let Some(access) = pair.access.filter(|a| !a.is_empty()) else {
            self.clear().await;
            return Err(Error::Authentication {
                message: "token refresh returned no access token".into(),
            });
        };

        let mut state = self.state.write().await;
        state.access = Some(SecretString::from(access));
        if let Some(rotated) = pair.refresh {
            state.refresh = Some(SecretString::from(rotated));
        }
        debug!("access token refreshed");
        Ok(())
    }

    /// Return the current access token, logging in first if none is held.
    pub async fn ensure_token(&self) -> Result<SecretString, Error> {
        if let Some(token) = self.access_token().await {
            return Ok(token);
        }
        self.login().await?;
        self.state
            .read()
            .await
            .access
            .clone()
            .ok_or_else(|| Error::Authentication {
                message: "no access token after login".into(),
            })
    }

    /// The current access token, without logging in.
    pub async fn access_token(&self) -> Option<SecretString> {
        self.state.read().await.access.clone()
    }

    /// Whether an access token is currently held.
    pub async fn has_access_token(&self) -> bool {
        self.state.read().await.access.is_some()
    }

    /// Drop both tokens; the next request logs in again.
    pub async fn clear(&self) {
        *self.state.write().await = TokenState::default();
    }

    async fn post_token(&self, url: Url, body: &serde_json::Value) -> Result<TokenPair, Error> {
        bounded(self.timeout, async {
            let resp = self
                .http
                .post(url)
                .header(INSTALLATION_HEADER, &self.credentials.installation_id)
                .header(reqwest::header::ACCEPT, "application/json")
                .json(body)
                .send()
                .await?;
            let status = resp.status();
            let text = resp.text().await?;

            serde_json::from_str::<TokenPair>(&text).map_err(|_| Error::Authentication {
                message: format!(
                    "token endpoint returned an unusable body (HTTP {status}): {}",
                    preview(&text)
                ),
            })
        })
        .await
    }
}
