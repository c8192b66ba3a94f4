//! Jeedom JSON-RPC API Client
//!
//! Jeedom exposes its API as JSON-RPC 2.0 over HTTP POST on
//! `/core/api/jeeApi.php`. Every request carries the API key inside its
//! `params` object.
//!
//! # Request envelope
//!
//! Each call deep-merges the caller's `{method, params}` into
//! `{"jsonrpc": "2.0", "id": n, "params": {"apikey": key}}`, so caller params
//! sit next to the injected key.
//!
//! # Failure policy
//!
//! The client never retries. A failed call returns an [`ExporterError`] and the
//! requester that issued it simply waits for its next tick. Every call that
//! reaches the network is accounted in [`RequestStats`].
//!
//! # Example
//!
//! ```no_run
//! use jeedom_exporter::config::JeedomConfig;
//! use jeedom_exporter::config::TimingsConfig;
//! use jeedom_exporter::jeedom::JeedomClient;
//! use jeedom_exporter::stats::RequestStats;
//! use secrecy::SecretString;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = JeedomConfig {
//!     url: "http://jeedom.local/core/api/jeeApi.php".to_string(),
//!     key: SecretString::from("your-api-key"),
//!     verify_ssl: true,
//!     timeout_ms: 30_000,
//! };
//!
//! let stats = RequestStats::new(TimingsConfig::default())?;
//! let client = JeedomClient::new(&config, stats)?;
//! let commands = client.call_records("cmd::all", None).await?;
//! # Ok(())
//! # }
//! ```

use crate::config::JeedomConfig;
use crate::error::{transport_code, ExporterError, Result};
use crate::jeedom::types::{JsonRpcResponse, Record};
use crate::stats::{RequestStats, TimingSample};
use secrecy::{ExposeSecret, SecretString};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::debug;

/// Client for the Jeedom JSON-RPC API
///
/// Cheap to share behind an `Arc`; the underlying `reqwest::Client` pools
/// connections and request ids are allocated atomically.
pub struct JeedomClient {
    http: reqwest::Client,
    url: String,
    key: SecretString,
    stats: RequestStats,
    request_id: AtomicU64,
}

impl JeedomClient {
    pub fn new(config: &JeedomConfig, stats: RequestStats) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            // Self-signed certificates are common on home controllers
            .danger_accept_invalid_certs(!config.verify_ssl)
            .build()
            .map_err(|e| ExporterError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            url: config.url.clone(),
            key: config.key.clone(),
            stats,
            request_id: AtomicU64::new(0),
        })
    }

    pub fn stats(&self) -> &RequestStats {
        &self.stats
    }

    fn next_id(&self) -> u64 {
        self.request_id.fetch_add(1, Ordering::SeqCst)
    }

    /// Build the full JSON-RPC body for `method`
    fn envelope(&self, method: &str, params: Option<Value>) -> Value {
        let mut body = json!({
            "jsonrpc": "2.0",
            "id": self.next_id(),
            "params": { "apikey": self.key.expose_secret() }
        });
        let mut caller = json!({ "method": method });
        if let Some(params) = params {
            caller["params"] = params;
        }
        merge_deep(&mut body, caller);
        body
    }

    /// Execute a JSON-RPC method call and return its `result`
    ///
    /// # Errors
    ///
    /// - [`ExporterError::Transport`] - connection, timeout or body failure
    /// - [`ExporterError::HttpStatus`] - non-2xx answer
    /// - [`ExporterError::Json`] - answer is not JSON
    /// - [`ExporterError::JeedomApi`] - answer carries a JSON-RPC error
    /// - [`ExporterError::MalformedResult`] - answer has no `result`
    pub async fn call(&self, method: &str, params: Option<Value>) -> Result<Value> {
        let body = self.envelope(method, params);
        self.stats.record_request(method);
        debug!("Sending request: {}", method);

        let started = Instant::now();
        let response = match self.http.post(&self.url).json(&body).send().await {
            Ok(response) => response,
            Err(e) => return Err(self.transport_failure(method, e)),
        };

        let status = response.status();
        let bytes = match response.bytes().await {
            Ok(bytes) => bytes,
            Err(e) => return Err(self.transport_failure(method, e)),
        };

        self.stats.record_response(status.as_str());
        self.stats.record_timing(TimingSample {
            duration: started.elapsed(),
            bytes: bytes.len(),
        });

        if !status.is_success() {
            return Err(ExporterError::HttpStatus {
                method: method.to_string(),
                status: status.as_u16(),
            });
        }

        debug!("{} response received ({} bytes)", method, bytes.len());
        let response: JsonRpcResponse = serde_json::from_slice(&bytes)?;

        if let Some(error) = response.error {
            return Err(ExporterError::JeedomApi {
                method: method.to_string(),
                code: error.code,
                message: error.message.unwrap_or_else(|| "Unknown error".to_string()),
            });
        }

        match response.result {
            Some(Value::Null) | None => Err(ExporterError::malformed(method, "missing result")),
            Some(result) => Ok(result),
        }
    }

    /// Execute a call whose result must be an array of entity records
    ///
    /// Array items that are not objects are skipped.
    pub async fn call_records(&self, method: &str, params: Option<Value>) -> Result<Vec<Record>> {
        match self.call(method, params).await? {
            Value::Array(items) => Ok(items
                .into_iter()
                .filter_map(|item| match item {
                    Value::Object(record) => Some(record),
                    _ => None,
                })
                .collect()),
            other => Err(ExporterError::malformed(
                method,
                format!("expected an array, got {}", json_kind(&other)),
            )),
        }
    }

    fn transport_failure(&self, method: &str, source: reqwest::Error) -> ExporterError {
        self.stats.record_response(transport_code(&source));
        ExporterError::Transport {
            method: method.to_string(),
            source,
        }
    }
}

/// Deep-merge `source` into `target`: objects merge key by key, anything else
/// in `source` replaces the value in `target`.
pub(crate) fn merge_deep(target: &mut Value, source: Value) {
    match (target, source) {
        (Value::Object(target), Value::Object(source)) => {
            for (key, value) in source {
                let nested = value.is_object() && target.get(&key).is_some_and(Value::is_object);
                if !nested {
                    target.insert(key, value);
                } else if let Some(existing) = target.get_mut(&key) {
                    merge_deep(existing, value);
                }
            }
        }
        (target, source) => *target = source,
    }
}

pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
