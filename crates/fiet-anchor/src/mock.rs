//! In-memory collaborators for tests
//!
//! [`MockTransport`] answers from canned routes and records every request;
//! [`StaticFetcher`] serves fixed manifests and counts fetches.

use async_trait::async_trait;
use fiet_types::{AnchorManifest, ErrorKind, Result, Stage};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::manifest::ManifestFetcher;
use crate::transport::{HttpRequest, HttpResponse, HttpTransport, Method, TransportError};

enum Route {
    Respond(HttpResponse),
    Fail,
}

/// Recording transport with canned responses keyed by method and URL
#[derive(Default)]
pub struct MockTransport {
    routes: Mutex<HashMap<(Method, String), Route>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, method: Method, url: &str, status: u16, body: impl Into<String>) {
        self.routes.lock().insert(
            (method, url.to_string()),
            Route::Respond(HttpResponse::new(status, body)),
        );
    }

    pub fn on_get(&self, url: &str, body: serde_json::Value) {
        self.respond(Method::Get, url, 200, body.to_string());
    }

    pub fn on_post(&self, url: &str, body: serde_json::Value) {
        self.respond(Method::Post, url, 200, body.to_string());
    }

    /// Make requests to this route fail before any response
    pub fn fail(&self, method: Method, url: &str) {
        self.routes
            .lock()
            .insert((method, url.to_string()), Route::Fail);
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().clone()
    }

    /// Number of recorded requests to `method url`
    pub fn count(&self, method: Method, url: &str) -> usize {
        self.requests
            .lock()
            .iter()
            .filter(|r| r.method == method && r.url == url)
            .count()
    }

    pub fn count_method(&self, method: Method) -> usize {
        self.requests
            .lock()
            .iter()
            .filter(|r| r.method == method)
            .count()
    }
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn send(&self, request: HttpRequest) -> std::result::Result<HttpResponse, TransportError> {
        let key = (request.method, request.url.clone());
        self.requests.lock().push(request.clone());

        match self.routes.lock().get(&key) {
            Some(Route::Respond(response)) => Ok(response.clone()),
            Some(Route::Fail) => Err(TransportError::Request {
                url: request.url,
                message: "connection refused".to_string(),
            }),
            None => Ok(HttpResponse::new(404, r#"{"error":"no route"}"#)),
        }
    }
}

/// Manifest source returning fixed documents per domain
#[derive(Default)]
pub struct StaticFetcher {
    manifests: Mutex<HashMap<String, AnchorManifest>>,
    fetches: AtomicUsize,
}

impl StaticFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_manifest(self, manifest: AnchorManifest) -> Self {
        self.insert(manifest);
        self
    }

    /// Replace the document served for the manifest's domain
    pub fn insert(&self, manifest: AnchorManifest) {
        self.manifests
            .lock()
            .insert(manifest.domain.clone(), manifest);
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ManifestFetcher for StaticFetcher {
    async fn fetch(&self, domain: &str) -> Result<AnchorManifest> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        self.manifests.lock().get(domain).cloned().ok_or_else(|| {
            ErrorKind::ManifestUnavailable {
                domain: domain.to_string(),
                message: "no manifest published".to_string(),
            }
            .at(Stage::Manifest)
        })
    }
}
