use thiserror::Error;

/// Top-level error type for the `invisia-api` crate.
///
/// Covers every failure mode of a single call against the vendor backend:
/// authentication, protocol (non-JSON where JSON was required), structured
/// API errors, timeouts, and transport. `invisia-core` maps these into
/// cycle-level failures.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// Login or refresh yielded no usable access token, or the backend
    /// kept rejecting the token after the one refresh-and-retry.
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    // ── Protocol ────────────────────────────────────────────────────
    /// The backend answered with something that is not JSON on an
    /// endpoint that requires JSON, or with an unexpected shape.
    #[error("Protocol error (HTTP {status}): {message} (body preview: {body_preview:?})")]
    Protocol {
        status: u16,
        message: String,
        body_preview: String,
    },

    // ── API ─────────────────────────────────────────────────────────
    /// Non-2xx status with a JSON error body.
    #[error("API error (HTTP {status}): {body}")]
    Api {
        status: u16,
        body: serde_json::Value,
    },

    // ── Transport ───────────────────────────────────────────────────
    /// Request exceeded the per-request bound.
    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// TLS setup or certificate error.
    #[error("TLS error: {0}")]
    Tls(String),
}

impl Error {
    /// Returns `true` for failures rooted in the token lifecycle.
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Authentication { .. })
    }

    /// Returns `true` if the call ran into the request bound.
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::Timeout { .. } => true,
            Self::Transport(e) => e.is_timeout(),
            _ => false,
        }
    }

    /// Returns `true` if this is a transient error the next poll may not hit.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::Timeout { .. } => true,
            Self::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// HTTP status attached to the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Protocol { status, .. } | Self::Api { status, .. } => Some(*status),
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_is_transient() {
        let err = Error::Timeout { timeout_secs: 15 };
        assert!(err.is_timeout());
        assert!(err.is_transient());
        assert!(!err.is_auth());
    }

    #[test]
    fn api_error_exposes_status() {
        let err = Error::Api {
            status: 404,
            body: serde_json::json!({"detail": "Not found."}),
        };
        assert_eq!(err.status(), Some(404));
        assert!(!err.is_transient());
    }
}
