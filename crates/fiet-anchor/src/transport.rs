//! HTTP transport seam
//!
//! Components describe requests as [`HttpRequest`] values and decide for
//! themselves what a status means; the transport only moves bytes.

use async_trait::async_trait;
use fiet_types::{ErrorKind, FietError, Result, Stage};
use serde::de::DeserializeOwned;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// HTTP method subset anchors use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Get => write!(f, "GET"),
            Self::Post => write!(f, "POST"),
        }
    }
}

/// A request to an anchor endpoint
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub query: Vec<(String, String)>,
    pub bearer: Option<String>,
    pub body: Option<serde_json::Value>,
}

impl HttpRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            url: url.into(),
            query: Vec::new(),
            bearer: None,
            body: None,
        }
    }

    pub fn post(url: impl Into<String>, body: serde_json::Value) -> Self {
        Self {
            method: Method::Post,
            url: url.into(),
            query: Vec::new(),
            bearer: None,
            body: Some(body),
        }
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn bearer(mut self, token: impl Into<String>) -> Self {
        self.bearer = Some(token.into());
        self
    }

    /// Look up a query parameter
    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Status and body of an anchor response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Decode the body, attributing failures to `stage`
    pub fn json<T: DeserializeOwned>(&self, stage: Stage) -> Result<T> {
        serde_json::from_str(&self.body)
            .map_err(|e| FietError::invalid_response(stage, format!("malformed body: {e}")))
    }

    /// Human-readable reason for a failed response
    pub fn error_message(&self) -> String {
        let from_json = serde_json::from_str::<serde_json::Value>(&self.body)
            .ok()
            .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(str::to_string));

        from_json.unwrap_or_else(|| {
            let body = self.body.trim();
            if body.is_empty() {
                format!("HTTP {}", self.status)
            } else {
                body.chars().take(200).collect()
            }
        })
    }

    /// Pass through success, turn anything else into a network error
    pub fn require_success(self, stage: Stage) -> Result<Self> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(FietError::network(
                stage,
                Some(self.status),
                self.error_message(),
            ))
        }
    }
}

/// Failure to obtain any response at all
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("Request to {url} failed: {message}")]
    Request { url: String, message: String },

    #[error("Request to {url} timed out")]
    Timeout { url: String },
}

impl TransportError {
    pub fn at(self, stage: Stage) -> FietError {
        ErrorKind::Network {
            status: None,
            message: self.to_string(),
        }
        .at(stage)
    }
}

/// Trait for HTTP transports
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> std::result::Result<HttpResponse, TransportError>;
}

// ============================================================================
// reqwest Transport
// ============================================================================

/// Production transport backed by reqwest
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                ErrorKind::Config {
                    message: format!("failed to build HTTP client: {e}"),
                }
                .at(Stage::Local)
            })?;
        Ok(Self { client })
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> std::result::Result<HttpResponse, TransportError> {
        let url = request.url.clone();
        let mut builder = match request.method {
            Method::Get => self.client.get(&request.url),
            Method::Post => self.client.post(&request.url),
        };
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(token) = &request.bearer {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        tracing::debug!(method = %request.method, url = %url, "anchor request");

        let map_err = |e: reqwest::Error| {
            if e.is_timeout() {
                TransportError::Timeout { url: url.clone() }
            } else {
                TransportError::Request {
                    url: url.clone(),
                    message: e.to_string(),
                }
            }
        };

        let response = builder.send().await.map_err(map_err)?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(map_err)?;

        Ok(HttpResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_message_prefers_json_error_field() {
        let response = HttpResponse::new(400, r#"{"error": "invalid account"}"#);
        assert_eq!(response.error_message(), "invalid account");

        let response = HttpResponse::new(502, "");
        assert_eq!(response.error_message(), "HTTP 502");

        let response = HttpResponse::new(500, "upstream exploded");
        assert_eq!(response.error_message(), "upstream exploded");
    }

    #[test]
    fn test_require_success_carries_status() {
        let err = HttpResponse::new(403, r#"{"error":"forbidden"}"#)
            .require_success(Stage::Deposit)
            .unwrap_err();
        assert_eq!(err.stage, Stage::Deposit);
        assert_eq!(err.status(), Some(403));

        assert!(HttpResponse::new(204, "").require_success(Stage::Deposit).is_ok());
    }

    #[test]
    fn test_request_builder() {
        let request = HttpRequest::get("https://anchor.example/auth")
            .query("account", "GABC")
            .bearer("token");
        assert_eq!(request.query_value("account"), Some("GABC"));
        assert_eq!(request.query_value("missing"), None);
        assert_eq!(request.bearer.as_deref(), Some("token"));
    }

    #[test]
    fn test_transport_error_is_network_error() {
        let err = TransportError::Timeout {
            url: "https://anchor.example".to_string(),
        }
        .at(Stage::Quote);
        assert_eq!(err.error_code(), "NETWORK_ERROR");
        assert_eq!(err.status(), None);
    }
}
