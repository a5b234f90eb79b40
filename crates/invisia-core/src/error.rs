// ── Core error types ──
//
// Errors surfaced to hosts. Transport-level detail from `invisia-api` is
// translated by the `From` impl below; a failed mandatory fetch is wrapped
// in `UpdateFailed` so hosts can mark the integration degraded.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Cycle errors ─────────────────────────────────────────────────
    /// The mandatory RFID fetch failed; no snapshot was produced.
    #[error("Update failed for RFID {rfid_id}: {source}")]
    UpdateFailed {
        rfid_id: String,
        #[source]
        source: invisia_api::Error,
    },

    // ── Connection errors ────────────────────────────────────────────
    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("Cannot reach {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    // ── API errors (wrapped, not exposed raw) ────────────────────────
    #[error("Unexpected response (HTTP {status}): {message}")]
    Protocol { status: u16, message: String },

    #[error("API error: {message}")]
    Api {
        message: String,
        /// HTTP status code (if applicable).
        status: Option<u16>,
    },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl CoreError {
    /// Returns `true` for a failed poll cycle.
    pub fn is_update_failed(&self) -> bool {
        matches!(self, Self::UpdateFailed { .. })
    }

    /// Returns `true` if the failure (or the failure it wraps) is an
    /// authentication problem.
    pub fn is_auth(&self) -> bool {
        match self {
            Self::AuthenticationFailed { .. } => true,
            Self::UpdateFailed { source, .. } => source.is_auth(),
            _ => false,
        }
    }

    /// Returns `true` if the failure (or the failure it wraps) is a timeout.
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::Timeout { .. } => true,
            Self::UpdateFailed { source, .. } => source.is_timeout(),
            _ => false,
        }
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<invisia_api::Error> for CoreError {
    fn from(err: invisia_api::Error) -> Self {
        match err {
            invisia_api::Error::Authentication { message } => {
                CoreError::AuthenticationFailed { message }
            }
            invisia_api::Error::Timeout { timeout_secs } => CoreError::Timeout { timeout_secs },
            invisia_api::Error::Transport(ref e) => {
                if e.is_timeout() {
                    CoreError::Timeout { timeout_secs: 0 }
                } else if e.is_connect() {
                    CoreError::ConnectionFailed {
                        url: e
                            .url()
                            .map_or_else(|| "<unknown>".into(), ToString::to_string),
                        reason: e.to_string(),
                    }
                } else {
                    CoreError::Api {
                        message: e.to_string(),
                        status: e.status().map(|s| s.as_u16()),
                    }
                }
            }
            invisia_api::Error::Protocol {
                status,
                message,
                body_preview,
            } => CoreError::Protocol {
                status,
                message: format!("{message} (body preview: {body_preview:?})"),
            },
            invisia_api::Error::Api { status, body } => CoreError::Api {
                message: body.to_string(),
                status: Some(status),
            },
            invisia_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            invisia_api::Error::Tls(msg) => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("TLS error: {msg}"),
            },
        }
    }
}
