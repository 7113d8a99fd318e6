//! In-process CDN used by the integration tests

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    extract::State,
    http::{StatusCode, Uri},
    response::{IntoResponse, Response},
    Router,
};

#[derive(Default)]
pub struct CdnState {
    files: Mutex<HashMap<String, (StatusCode, String)>>,
    hits: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    delay: Mutex<Duration>,
}

pub struct TestCdn {
    pub addr: SocketAddr,
    state: Arc<CdnState>,
}

impl TestCdn {
    pub async fn start() -> Self {
        let state = Arc::new(CdnState::default());
        let app = Router::new().fallback(serve).with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind test cdn");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self { addr, state }
    }

    /// Absolute URL for a path on this server
    pub fn url(&self, path: &str) -> String {
        format!("http://{}/{}", self.addr, path.trim_start_matches('/'))
    }

    /// Template for `CdnUrls`
    pub fn template(&self) -> String {
        format!("http://{}/cdn/{{id}}/{{version}}", self.addr)
    }

    /// Root of a plugin as laid out by the CDN URL constructor
    pub fn plugin_root(&self, id: &str, version: &str) -> String {
        format!("cdn/{id}/{version}/public/plugins/{id}")
    }

    pub fn put(&self, path: &str, body: impl Into<String>) {
        self.put_status(path, StatusCode::OK, body);
    }

    pub fn put_status(&self, path: &str, status: StatusCode, body: impl Into<String>) {
        self.state.files.lock().expect("files lock").insert(
            format!("/{}", path.trim_start_matches('/')),
            (status, body.into()),
        );
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.state.delay.lock().expect("delay lock") = delay;
    }

    pub fn hits(&self) -> Vec<String> {
        self.state.hits.lock().expect("hits lock").clone()
    }

    pub fn max_in_flight(&self) -> usize {
        self.state.max_in_flight.load(Ordering::SeqCst)
    }
}

async fn serve(State(state): State<Arc<CdnState>>, uri: Uri) -> Response {
    let path = uri.path().to_string();
    state.hits.lock().expect("hits lock").push(path.clone());

    let now = state.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
    state.max_in_flight.fetch_max(now, Ordering::SeqCst);

    let delay = *state.delay.lock().expect("delay lock");
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }

    let file = state.files.lock().expect("files lock").get(&path).cloned();
    state.in_flight.fetch_sub(1, Ordering::SeqCst);

    match file {
        Some((status, body)) => (status, body).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

/// Minimal manifest JSON
pub fn manifest(id: &str, plugin_type: &str, version: &str) -> String {
    serde_json::json!({
        "id": id,
        "type": plugin_type,
        "name": id,
        "info": { "version": version },
    })
    .to_string()
}

/// Manifest JSON with includes `(type, path)` and plugin dependencies `(id, version)`
pub fn manifest_with(
    id: &str,
    version: &str,
    includes: &[(&str, &str)],
    dependencies: &[(&str, &str)],
) -> String {
    let includes: Vec<_> = includes
        .iter()
        .map(|(include_type, path)| {
            serde_json::json!({ "type": include_type, "name": path, "path": path })
        })
        .collect();
    let plugins: Vec<_> = dependencies
        .iter()
        .map(|(dep_id, dep_version)| serde_json::json!({ "id": dep_id, "version": dep_version }))
        .collect();

    serde_json::json!({
        "id": id,
        "type": "app",
        "name": id,
        "info": { "version": version },
        "includes": includes,
        "dependencies": { "plugins": plugins },
    })
    .to_string()
}
