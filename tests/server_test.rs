//! Server integration tests
//!
//! HTTP endpoints served over a real listener.

mod common;

use common::{context, test_config, FakeJeedom, API_KEY};
use jeedom_exporter::context::ExporterContext;
use jeedom_exporter::inventory::EntityKind;
use jeedom_exporter::metrics::Metric;
use jeedom_exporter::server;
use jeedom_exporter::stats::TimingSample;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Serve `ctx` on an ephemeral port and return its base URL
async fn serve(ctx: Arc<ExporterContext>) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind");
    let addr = listener.local_addr().expect("No local address");
    let app = server::router(ctx);
    tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });
    format!("http://{}", addr)
}

#[tokio::test]
async fn test_metrics_endpoint_returns_prometheus_format() {
    // Given: Some traffic and one published metric
    let fake = FakeJeedom::start().await;
    let ctx = context(test_config(&fake));
    ctx.stats().record_request("cmd::all");
    ctx.stats().record_response("200");
    ctx.stats().record_timing(TimingSample {
        duration: Duration::from_millis(20),
        bytes: 2048,
    });
    ctx.registry.push(
        Metric::new(
            "jeedom_cmd",
            1.0,
            vec![("id".to_string(), "1".to_string())],
            None,
        )
        .with_help("The cmd inventory"),
    );
    let base = serve(ctx).await;

    // When: Scraping
    let response = reqwest::get(format!("{}/metrics", base))
        .await
        .expect("scrape failed");

    // Then: Text format, stats first, then the registry
    assert_eq!(response.status(), 200);
    assert_eq!(
        response.headers()["content-type"],
        "text/plain; version=0.0.4; charset=utf-8"
    );
    let body = response.text().await.expect("no body");
    let stats_at = body
        .find("jeedom_exporter_requests_total{method=\"cmd::all\"} 1")
        .expect("stats missing");
    let cmd_at = body.find("jeedom_cmd{id=\"1\"} 1").expect("cmd missing");
    assert!(stats_at < cmd_at);
    assert!(body.contains("jeedom_exporter_transferred_bytes_total 2048"));
}

#[tokio::test]
async fn test_custom_metrics_path() {
    let fake = FakeJeedom::start().await;
    let mut config = test_config(&fake);
    config.prometheus.metrics = "/scrape".to_string();
    let base = serve(context(config)).await;

    let scrape = reqwest::get(format!("{}/scrape", base)).await.expect("scrape failed");
    let default = reqwest::get(format!("{}/metrics", base)).await.expect("request failed");

    assert_eq!(scrape.status(), 200);
    assert_eq!(default.status(), 404);
}

#[tokio::test]
async fn test_root_links_pages() {
    let fake = FakeJeedom::start().await;
    let base = serve(context(test_config(&fake))).await;

    let body = reqwest::get(&base)
        .await
        .expect("request failed")
        .text()
        .await
        .expect("no body");

    assert!(body.contains("href=\"/metrics\""));
    assert!(body.contains("href=\"/config\""));
    assert!(body.contains("href=\"/inventory\""));
}

#[tokio::test]
async fn test_config_page_redacts_key() {
    // Given: A configuration holding an API key
    let fake = FakeJeedom::start().await;
    let base = serve(context(test_config(&fake))).await;

    // When: Reading the config page
    let body = reqwest::get(format!("{}/config", base))
        .await
        .expect("request failed")
        .text()
        .await
        .expect("no body");

    // Then: The YAML is there, the key is not
    assert!(body.contains("<pre>"));
    assert!(body.contains("prefix: jeedom_"));
    assert!(body.contains("********"));
    assert!(!body.contains(API_KEY));
}

#[tokio::test]
async fn test_inventory_page_escapes_values() {
    // Given: An object whose name holds markup
    let fake = FakeJeedom::start().await;
    let ctx = context(test_config(&fake));
    let mut objects = HashMap::new();
    objects.insert(
        "2".to_string(),
        json!({"id": "2", "name": "<script>alert(1)</script>"})
            .as_object()
            .cloned()
            .unwrap_or_default(),
    );
    ctx.inventory.put_all(EntityKind::JeeObject, objects);
    let base = serve(ctx).await;

    // When: Reading the inventory page
    let body = reqwest::get(format!("{}/inventory", base))
        .await
        .expect("request failed")
        .text()
        .await
        .expect("no body");

    // Then: The bucket is listed and the markup escaped
    assert!(body.contains("<summary>jeeObject (1)</summary>"));
    assert!(body.contains("&lt;script&gt;"));
    assert!(!body.contains("<script>"));
}

#[tokio::test]
async fn test_empty_inventory_page() {
    let fake = FakeJeedom::start().await;
    let base = serve(context(test_config(&fake))).await;

    let body = reqwest::get(format!("{}/inventory", base))
        .await
        .expect("request failed")
        .text()
        .await
        .expect("no body");

    assert!(body.contains("The inventory is empty."));
}
