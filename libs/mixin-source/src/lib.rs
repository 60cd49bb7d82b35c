mod oauth;

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use chrono::SecondsFormat;
use reqwest::StatusCode;
use serde::Deserialize;
use serde::de::DeserializeOwned;

use ledger_api::{PageRequest, Record, RecordSource, TransportError};

pub use oauth::{DEFAULT_SCOPE, authorize_url, exchange_code};

pub const DEFAULT_API_BASE: &str = "https://api.mixin.one";

// ═══════════════════════════════════════════════════════════════
//  SourceConfig
// ═══════════════════════════════════════════════════════════════

#[derive(Debug, Clone)]
pub struct SourceConfig {
    /// API root without trailing slash, e.g. `https://api.mixin.one`.
    pub base_url: String,
    /// Bearer credential, already obtained.
    pub token: String,
    /// Per-request timeout enforced by the HTTP client.
    pub timeout: Duration,
}

impl SourceConfig {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_API_BASE.to_string(),
            token: token.into(),
            timeout: Duration::from_secs(30),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

// ═══════════════════════════════════════════════════════════════
//  HttpSource
// ═══════════════════════════════════════════════════════════════

/// `RecordSource` backed by the ledger's `GET /snapshots` endpoint.
///
/// Owns its HTTP client and credential; nothing is shared process-wide.
pub struct HttpSource {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl HttpSource {
    pub fn new(config: SourceConfig) -> Result<Self, TransportError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| TransportError::network(format!("build http client: {e}")))?;
        Ok(Self {
            http,
            base_url: config.base_url,
            token: config.token,
        })
    }

    async fn get_snapshots(&self, request: &PageRequest) -> Result<Vec<Record>, TransportError> {
        let url = format!("{}/snapshots", self.base_url);
        let offset = request.after.to_rfc3339_opts(SecondsFormat::Nanos, true);
        let limit = request.limit.to_string();

        let resp = self
            .http
            .get(&url)
            .bearer_auth(&self.token)
            .query(&[
                ("asset", request.asset_id.as_str()),
                ("offset", offset.as_str()),
                ("order", request.order.as_str()),
                ("limit", limit.as_str()),
            ])
            .send()
            .await
            .map_err(|e| TransportError::network(format!("GET {url}: {e}")))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| TransportError::network(format!("read response body: {e}")))?;

        tracing::trace!(%status, bytes = body.len(), offset = %offset, "snapshots response");
        decode_envelope(status, &body)
    }
}

impl RecordSource for HttpSource {
    fn fetch_page(
        &self,
        request: &PageRequest,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Record>, TransportError>> + Send + '_>> {
        let request = request.clone();
        Box::pin(async move { self.get_snapshots(&request).await })
    }
}

// ═══════════════════════════════════════════════════════════════
//  Response envelope
// ═══════════════════════════════════════════════════════════════

/// Every ledger response is `{"data": ...}` or `{"error": {...}}`.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: Option<T>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    code: u32,
    #[serde(default)]
    description: String,
}

fn is_auth_code(code: u32) -> bool {
    code == 401 || code == 403
}

pub(crate) fn decode_envelope<T: DeserializeOwned>(status: StatusCode, body: &str) -> Result<T, TransportError> {
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(TransportError::auth(format!("HTTP {status}: {body}")));
    }
    if !status.is_success() {
        return Err(TransportError::status(format!("HTTP {status}: {body}")));
    }

    let envelope: Envelope<T> = serde_json::from_str(body)
        .map_err(|e| TransportError::decode(format!("parse JSON: {e}")))?;

    if let Some(err) = envelope.error {
        let msg = format!("api error {}: {}", err.code, err.description);
        return Err(if is_auth_code(err.code) {
            TransportError::auth(msg)
        } else {
            TransportError::status(msg)
        });
    }

    envelope
        .data
        .ok_or_else(|| TransportError::decode("response has neither data nor error"))
}

#[cfg(test)]
mod tests {
    use ledger_api::ErrorKind;

    use super::*;

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let cfg = SourceConfig::new("tok").with_base_url("http://localhost:8080/");
        assert_eq!(cfg.base_url, "http://localhost:8080");
    }

    #[test]
    fn http_401_is_auth() {
        let err = decode_envelope::<Vec<Record>>(StatusCode::UNAUTHORIZED, "").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Auth);
    }

    #[test]
    fn api_error_envelope_maps_code() {
        let body = r#"{"error":{"status":202,"code":401,"description":"Unauthorized, maybe invalid token."}}"#;
        let err = decode_envelope::<Vec<Record>>(StatusCode::ACCEPTED, body).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Auth);

        let body = r#"{"error":{"status":202,"code":10002,"description":"Invalid request data."}}"#;
        let err = decode_envelope::<Vec<Record>>(StatusCode::ACCEPTED, body).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Status);
        assert!(err.message().contains("10002"));
    }

    #[test]
    fn garbage_body_is_decode_error() {
        let err = decode_envelope::<Vec<Record>>(StatusCode::OK, "<html>").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Decode);

        let err = decode_envelope::<Vec<Record>>(StatusCode::OK, "{}").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Decode);
    }

    #[test]
    fn server_error_is_status() {
        let err = decode_envelope::<Vec<Record>>(StatusCode::BAD_GATEWAY, "upstream").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Status);
        assert!(err.message().contains("502"));
    }
}
