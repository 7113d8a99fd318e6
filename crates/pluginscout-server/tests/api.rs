use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{extract::Path, http::StatusCode, response::IntoResponse, routing::get, Router};
use serde_json::{json, Value};

use pluginscout_core::config::OpenFeatureConfig;
use pluginscout_core::finder::FinderSettings;
use pluginscout_core::flags::FlagService;
use pluginscout_core::registry::PluginList;
use pluginscout_core::{CatalogService, CdnFinder, CdnUrls, Config, FindMetrics};
use pluginscout_server::{build_router, AppState};

async fn serve(app: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    addr
}

/// CDN holding `acme-panel` 1.0.0 plus `acme-app` 1.0.0, which depends on
/// `acme-datasource` 1.0.0
async fn start_cdn() -> SocketAddr {
    async fn manifest(Path((id, version, path)): Path<(String, String, String)>) -> impl IntoResponse {
        let body = match (id.as_str(), path.as_str()) {
            ("acme-panel", "acme-panel/plugin.json") => json!({
                "id": "acme-panel", "type": "panel", "name": "Acme Panel",
                "info": { "version": version },
            }),
            ("acme-app", "acme-app/plugin.json") => json!({
                "id": "acme-app", "type": "app", "name": "Acme App",
                "info": { "version": version },
                "dependencies": { "plugins": [{ "id": "acme-datasource", "version": "1.0.0" }] },
            }),
            ("acme-datasource", "acme-datasource/plugin.json") => json!({
                "id": "acme-datasource", "type": "datasource", "name": "Acme DS",
                "info": { "version": version },
            }),
            _ => return StatusCode::NOT_FOUND.into_response(),
        };
        axum::Json(body).into_response()
    }

    serve(Router::new().route("/cdn/:id/:version/public/plugins/*path", get(manifest))).await
}

async fn start_api(cdn: SocketAddr, toggles: &[(&str, bool)]) -> (String, Arc<FindMetrics>) {
    let finder = CdnFinder::new(
        FinderSettings::concurrent(),
        CdnUrls::new(format!("http://{cdn}/cdn/{{id}}/{{version}}")),
    )
    .expect("finder");
    let list: PluginList = serde_json::from_value(json!({
        "plugins": {
            "acme-panel": { "0.9.0": {}, "1.0.0": {} },
            "acme-app": { "1.0.0": {} },
            "ghost-panel": { "2.0.0": {} },
        }
    }))
    .expect("plugin list");
    let catalog = CatalogService::from_list(list, finder.clone());

    let toggles: BTreeMap<String, bool> =
        toggles.iter().map(|(k, v)| (k.to_string(), *v)).collect();
    let flags = FlagService::from_config(
        &OpenFeatureConfig {
            app_url: "http://app.test".to_string(),
            ..Default::default()
        },
        &toggles,
        reqwest::Client::new(),
    )
    .expect("flags");

    let metrics = Arc::new(FindMetrics::new());
    let state = AppState::new(Arc::new(catalog), finder, flags, metrics.clone());
    let addr = serve(build_router(state)).await;
    (format!("http://{addr}"), metrics)
}

#[tokio::test]
async fn health_reports_ok() {
    let cdn = start_cdn().await;
    let (api, _) = start_api(cdn, &[]).await;

    let body: Value = reqwest::get(format!("{api}/health"))
        .await
        .expect("request")
        .json()
        .await
        .expect("json");
    assert_eq!(body["status"], "ok");
    assert_eq!(body["flag_provider"], "static");
    assert_eq!(body["concurrent_discovery"], true);
}

#[tokio::test]
async fn lists_catalog_and_managed_plugins() {
    let cdn = start_cdn().await;
    let (api, _) = start_api(cdn, &[]).await;

    let plugins: Value = reqwest::get(format!("{api}/api/plugins"))
        .await
        .expect("request")
        .json()
        .await
        .expect("json");
    let plugins = plugins.as_array().expect("array");
    assert_eq!(plugins.len(), 3);
    assert_eq!(plugins[1]["id"], "acme-panel");
    assert_eq!(plugins[1]["version"], "1.0.0");

    let managed: Value = reqwest::get(format!("{api}/api/plugins/managed"))
        .await
        .expect("request")
        .json()
        .await
        .expect("json");
    assert_eq!(
        managed["plugins"],
        json!(["acme-app", "acme-panel", "ghost-panel"])
    );
}

#[tokio::test]
async fn plugin_lookup_maps_registry_errors() {
    let cdn = start_cdn().await;
    let (api, _) = start_api(cdn, &[]).await;

    let found = reqwest::get(format!("{api}/api/plugins/acme-panel"))
        .await
        .expect("request");
    assert_eq!(found.status(), StatusCode::OK);
    let found: Value = found.json().await.expect("json");
    assert_eq!(found["manifest"]["id"], "acme-panel");
    assert!(found["baseUrl"]
        .as_str()
        .expect("base url")
        .ends_with("/cdn/acme-panel/1.0.0/public/plugins/acme-panel"));

    let not_in_catalog = reqwest::get(format!("{api}/api/plugins/unknown"))
        .await
        .expect("request");
    assert_eq!(not_in_catalog.status(), StatusCode::NOT_FOUND);

    let not_on_cdn = reqwest::get(format!("{api}/api/plugins/ghost-panel"))
        .await
        .expect("request");
    assert_eq!(not_on_cdn.status(), StatusCode::NOT_FOUND);
    let body: Value = not_on_cdn.json().await.expect("json");
    assert_eq!(body["code"], "NOT_FOUND");

    let ambiguous = reqwest::get(format!("{api}/api/plugins/acme-app"))
        .await
        .expect("request");
    assert_eq!(ambiguous.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn discover_returns_sorted_bundles_and_records_metrics() {
    let cdn = start_cdn().await;
    let (api, metrics) = start_api(cdn, &[]).await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{api}/api/plugins/discover"))
        .json(&json!({
            "urls": [
                format!("http://{cdn}/cdn/acme-panel/1.0.0/public/plugins/acme-panel"),
                format!("http://{cdn}/cdn/acme-app/1.0.0/public/plugins/acme-app"),
                "ftp://example.com/nope",
            ],
            "concurrent": true,
        }))
        .send()
        .await
        .expect("request");
    assert_eq!(response.status(), StatusCode::OK);

    let bundles: Value = response.json().await.expect("json");
    let ids: Vec<&str> = bundles
        .as_array()
        .expect("array")
        .iter()
        .map(|b| b["primary"]["manifest"]["id"].as_str().expect("id"))
        .collect();
    assert_eq!(ids, ["acme-app", "acme-datasource", "acme-panel"]);
    assert_eq!(metrics.sample_count(), 1);

    let text = reqwest::get(format!("{api}/metrics"))
        .await
        .expect("request")
        .text()
        .await
        .expect("text");
    assert!(text.contains(r#"class="cdn",total="3""#));

    let empty = client
        .post(format!("{api}/api/plugins/discover"))
        .json(&json!({ "urls": [] }))
        .send()
        .await
        .expect("request");
    assert_eq!(empty.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn static_flags_are_evaluated() {
    let cdn = start_cdn().await;
    let (api, _) = start_api(cdn, &[("newNav", true), ("legacy", false)]).await;
    let client = reqwest::Client::new();

    let all: Value = client
        .post(format!("{api}/ofrep/v1/evaluate/flags"))
        .json(&json!({ "context": {} }))
        .send()
        .await
        .expect("request")
        .json()
        .await
        .expect("json");
    assert_eq!(all["flags"]["newNav"]["value"], true);
    assert_eq!(all["flags"]["legacy"]["variationType"], "disabled");

    let one: Value = client
        .post(format!("{api}/ofrep/v1/evaluate/flags/newNav"))
        .send()
        .await
        .expect("request")
        .json()
        .await
        .expect("json");
    assert_eq!(one["value"], true);
    assert_eq!(one["reason"], "STATIC");

    let missing = client
        .post(format!("{api}/ofrep/v1/evaluate/flags/nope"))
        .send()
        .await
        .expect("request");
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn state_from_config_loads_catalog_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let catalog = dir.path().join("plugins.json");
    std::fs::write(
        &catalog,
        json!({ "plugins": { "acme-panel": { "1.0.0": {} } } }).to_string(),
    )
    .expect("write catalog");

    let mut config = Config::default();
    config.catalog.path = catalog;
    let state = AppState::from_config(&config).await.expect("state");
    let plugins = state.registry.available_plugins().await.expect("plugins");
    assert_eq!(plugins.len(), 1);

    config.catalog.path = dir.path().join("missing.json");
    assert!(AppState::from_config(&config).await.is_err());
}
