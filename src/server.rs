//! HTTP Server
//!
//! Axum server exposing the scrape endpoint and a few read-only info pages.
//!
//! # Endpoints
//!
//! - `GET /` - HTML landing page
//! - `GET /config` - effective configuration as YAML, API key redacted
//! - `GET /inventory` - the entity inventory as collapsible HTML
//! - `GET <prometheus.metrics>` - request statistics, then every published
//!   metric, in Prometheus text format
//!
//! # Startup
//!
//! [`start`] spawns the requesters and binds the listener without waiting for
//! any first fetch, so early scrapes may be partial. A scrape only reads the
//! registry and never waits on Jeedom.

use crate::config::Config;
use crate::context::ExporterContext;
use crate::error::ExporterError;
use crate::pollers;
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use serde_json::Value;
use std::fmt::Write;
use std::sync::Arc;
use tracing::{error, info};

const METRICS_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

pub async fn start(config: Config) -> anyhow::Result<()> {
    let addr = format!("{}:{}", config.prometheus.addr, config.prometheus.port);
    let metrics_path = config.prometheus.metrics.clone();
    let ctx = Arc::new(ExporterContext::new(config)?);

    let requesters = pollers::start(ctx.clone());
    info!("{} requesters scheduled", requesters.len());

    let app = router(ctx);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| ExporterError::Server(format!("Failed to bind {}: {}", addr, e)))?;

    info!("Metrics server listening on {}", addr);
    info!("Metrics available at http://{}{}", addr, metrics_path);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Routes over a shared context
pub fn router(ctx: Arc<ExporterContext>) -> Router {
    let metrics_path = ctx.config.prometheus.metrics.clone();
    Router::new()
        .route("/", get(root_handler))
        .route("/config", get(config_handler))
        .route("/inventory", get(inventory_handler))
        .route(&metrics_path, get(metrics_handler))
        .with_state(ctx)
}

async fn root_handler(State(ctx): State<Arc<ExporterContext>>) -> impl IntoResponse {
    Html(format!(
        r#"<html>
<head><title>Jeedom Exporter</title></head>
<body>
<h1>Jeedom Prometheus Exporter</h1>
<p><a href="{}">Metrics</a></p>
<p><a href="/config">Configuration</a></p>
<p><a href="/inventory">Inventory</a></p>
</body>
</html>"#,
        escape_html(&ctx.config.prometheus.metrics)
    ))
}

async fn metrics_handler(State(ctx): State<Arc<ExporterContext>>) -> Response {
    match ctx.render() {
        Ok(metrics) => ([(header::CONTENT_TYPE, METRICS_CONTENT_TYPE)], metrics).into_response(),
        Err(e) => {
            error!("Failed to render metrics: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Error rendering metrics: {}", e),
            )
                .into_response()
        }
    }
}

async fn config_handler(State(ctx): State<Arc<ExporterContext>>) -> Response {
    match ctx.config.to_yaml() {
        Ok(yaml) => page("Configuration", &format!("<pre>{}</pre>", escape_html(&yaml))),
        Err(e) => {
            error!("Failed to render configuration: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Error rendering configuration: {}", e),
            )
                .into_response()
        }
    }
}

async fn inventory_handler(State(ctx): State<Arc<ExporterContext>>) -> Response {
    let mut body = String::new();
    for (kind, records) in ctx.inventory.snapshot() {
        writeln!(
            body,
            "<details><summary>{} ({})</summary>",
            kind,
            records.len()
        )
        .ok();
        for (id, record) in records {
            render_value(&mut body, &id, &Value::Object(record));
        }
        body.push_str("</details>\n");
    }
    if body.is_empty() {
        body.push_str("<p>The inventory is empty.</p>");
    }
    page("Inventory", &body)
}

fn render_value(out: &mut String, name: &str, value: &Value) {
    match value {
        Value::Object(map) => {
            writeln!(out, "<details><summary>{}</summary><ul>", escape_html(name)).ok();
            for (field, nested) in map {
                out.push_str("<li>");
                render_value(out, field, nested);
                out.push_str("</li>\n");
            }
            out.push_str("</ul></details>\n");
        }
        Value::Array(items) => {
            writeln!(
                out,
                "<details><summary>{} [{}]</summary><ul>",
                escape_html(name),
                items.len()
            )
            .ok();
            for (index, item) in items.iter().enumerate() {
                out.push_str("<li>");
                render_value(out, &index.to_string(), item);
                out.push_str("</li>\n");
            }
            out.push_str("</ul></details>\n");
        }
        Value::String(s) => {
            write!(out, "{}: {}", escape_html(name), escape_html(s)).ok();
        }
        scalar => {
            write!(out, "{}: {}", escape_html(name), scalar).ok();
        }
    }
}

fn page(title: &str, body: &str) -> Response {
    Html(format!(
        r#"<html>
<head><title>Jeedom Exporter - {title}</title></head>
<body>
<h1>{title}</h1>
<p><a href="/">Home</a></p>
{body}
</body>
</html>"#
    ))
    .into_response()
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
