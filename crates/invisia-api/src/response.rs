// Response classification
//
// Every reply is sorted into one of three shapes before anyone looks at
// its content. The backend answers most endpoints with JSON, but some
// (statistics, journal) occasionally serve an HTML error page instead.

use reqwest::StatusCode;
use serde_json::Value;

use crate::error::Error;

/// Characters of a non-JSON body kept for diagnostics.
const PREVIEW_CHARS: usize = 200;

/// JSON `code` the backend sets when the bearer token is rejected.
const TOKEN_INVALID_CODE: &str = "token_not_valid";

/// Classified response of a single call.
#[derive(Debug, Clone, PartialEq)]
pub enum RawResponse {
    /// Parsed JSON body of a successful call.
    Json(Value),
    /// Body that is not JSON, returned only for tolerant endpoints.
    NonJson { status: u16, text: String },
    /// Error status with a JSON body that is not a mapping, returned only
    /// for tolerant endpoints.
    HttpError { status: u16, body: Value },
}

impl RawResponse {
    /// Status of a soft failure (`NonJson` / `HttpError`).
    pub fn soft_failure_status(&self) -> Option<u16> {
        match self {
            Self::Json(_) => None,
            Self::NonJson { status, .. } | Self::HttpError { status, .. } => Some(*status),
        }
    }
}

/// Outcome of classifying one reply.
#[derive(Debug)]
pub(crate) enum Classified {
    Response(RawResponse),
    /// The body carried the token-invalid marker; refresh and retry.
    TokenInvalid,
}

/// Truncate text for error messages and soft-failure markers.
pub(crate) fn preview(text: &str) -> String {
    text.chars().take(PREVIEW_CHARS).collect()
}

fn is_token_invalid(value: &Value) -> bool {
    value
        .as_object()
        .and_then(|obj| obj.get("code"))
        .and_then(Value::as_str)
        .is_some_and(|code| code == TOKEN_INVALID_CODE)
}

/// Sort a raw reply into a [`Classified`] outcome or a hard error.
pub(crate) fn classify(
    status: StatusCode,
    text: &str,
    tolerate_non_json: bool,
) -> Result<Classified, Error> {
    let code = status.as_u16();
    let failed = status.is_client_error() || status.is_server_error();

    if text.trim().is_empty() && !failed {
        return Ok(Classified::Response(RawResponse::Json(Value::Null)));
    }

    let value = match serde_json::from_str::<Value>(text) {
        Ok(value) => value,
        Err(e) if tolerate_non_json => {
            tracing::trace!(status = code, error = %e, "tolerating non-JSON body");
            return Ok(Classified::Response(RawResponse::NonJson {
                status: code,
                text: preview(text),
            }));
        }
        Err(e) => {
            return Err(Error::Protocol {
                status: code,
                message: format!("expected JSON: {e}"),
                body_preview: preview(text),
            });
        }
    };

    if is_token_invalid(&value) {
        return Ok(Classified::TokenInvalid);
    }

    if failed {
        if value.is_object() || !tolerate_non_json {
            return Err(Error::Api {
                status: code,
                body: value,
            });
        }
        return Ok(Classified::Response(RawResponse::HttpError {
            status: code,
            body: value,
        }));
    }

    Ok(Classified::Response(RawResponse::Json(value)))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn response(result: Result<Classified, Error>) -> RawResponse {
        match result {
            Ok(Classified::Response(raw)) => raw,
            other => panic!("expected a response, got {other:?}"),
        }
    }

    #[test]
    fn json_body_passes_through() {
        let raw = response(classify(StatusCode::OK, r#"{"rfid":{"profile":"instant"}}"#, false));
        assert_eq!(raw, RawResponse::Json(json!({"rfid": {"profile": "instant"}})));
    }

    #[test]
    fn html_is_tolerated_when_declared() {
        let html = "<html><body>Server Error (500)</body></html>";
        let raw = response(classify(StatusCode::INTERNAL_SERVER_ERROR, html, true));
        assert_eq!(
            raw,
            RawResponse::NonJson {
                status: 500,
                text: html.to_owned()
            }
        );
    }

    #[test]
    fn html_fails_strict_endpoints() {
        let result = classify(StatusCode::OK, "<html></html>", false);
        assert!(matches!(result, Err(Error::Protocol { status: 200, .. })));
    }

    #[test]
    fn preview_is_truncated() {
        let long = "x".repeat(1000);
        match classify(StatusCode::BAD_GATEWAY, &long, false) {
            Err(Error::Protocol { body_preview, .. }) => assert_eq!(body_preview.len(), 200),
            other => panic!("expected protocol error, got {other:?}"),
        }
    }

    #[test]
    fn token_marker_is_detected() {
        let body = r#"{"detail":"Given token not valid for any token type","code":"token_not_valid"}"#;
        assert!(matches!(
            classify(StatusCode::UNAUTHORIZED, body, false),
            Ok(Classified::TokenInvalid)
        ));
    }

    #[test]
    fn mapping_error_body_is_api_error_even_when_tolerant() {
        let result = classify(StatusCode::NOT_FOUND, r#"{"detail":"Not found."}"#, true);
        match result {
            Err(Error::Api { status, body }) => {
                assert_eq!(status, 404);
                assert_eq!(body, json!({"detail": "Not found."}));
            }
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[test]
    fn non_mapping_error_body_is_soft_when_tolerant() {
        let raw = response(classify(StatusCode::BAD_REQUEST, r#"["bad window"]"#, true));
        assert_eq!(
            raw,
            RawResponse::HttpError {
                status: 400,
                body: json!(["bad window"])
            }
        );
        assert_eq!(raw.soft_failure_status(), Some(400));
    }

    #[test]
    fn non_mapping_error_body_fails_strict_endpoints() {
        let result = classify(StatusCode::BAD_REQUEST, r#""nope""#, false);
        assert!(matches!(result, Err(Error::Api { status: 400, .. })));
    }

    #[test]
    fn empty_success_body_is_null() {
        let raw = response(classify(StatusCode::NO_CONTENT, "", false));
        assert_eq!(raw, RawResponse::Json(Value::Null));
    }
}
