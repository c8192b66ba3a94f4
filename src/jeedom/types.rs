//! Jeedom API Type Definitions
//!
//! The Jeedom JSON-RPC API is only loosely typed: field sets vary between
//! core versions and plugins, and numbers often arrive as strings. Entity
//! payloads are therefore kept as [`Record`] maps and interpreted by the
//! pollers and the metric shaper. Only the protocol envelope and the
//! `event::changes` wrapper get dedicated structs.
//!
//! # JSON-RPC Protocol
//!
//! - [`JsonRpcResponse`] - Incoming responses
//! - [`JsonRpcError`] - Error object carried by a failed response
//!
//! # Event changes
//!
//! - [`EventChanges`] - `event::changes` result: new cursor plus change list
//! - [`ChangeEvent`] - One change (`cmd::update`, `eqLogic::update`, ...)

use serde::Deserialize;
use serde_json::Value;

/// One entity as returned by the API, in upstream field order
pub type Record = serde_json::Map<String, Value>;

/// JSON-RPC 2.0 response
#[derive(Debug, Deserialize)]
pub struct JsonRpcResponse {
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<JsonRpcError>,
}

#[derive(Debug, Deserialize)]
pub struct JsonRpcError {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub message: Option<String>,
}

/// `event::changes` result: the new cursor and the decodable changes
#[derive(Debug, Clone)]
pub struct EventChanges {
    pub datetime: f64,
    pub events: Vec<ChangeEvent>,
}

impl EventChanges {
    /// Reads an `event::changes` result.
    ///
    /// `None` when the server datetime is missing. Change entries that do not
    /// decode are skipped so one odd event cannot hold the cursor back.
    pub fn from_result(result: &Value) -> Option<Self> {
        let datetime = result.get("datetime").and_then(as_f64)?;
        let events = match result.get("result") {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|item| serde_json::from_value(item.clone()).ok())
                .collect(),
            _ => Vec::new(),
        };
        Some(Self { datetime, events })
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChangeEvent {
    #[serde(default)]
    pub datetime: Value,
    pub name: String,
    #[serde(default)]
    pub option: Value,
}

impl ChangeEvent {
    /// Option payload as a record; arrays and scalars give an empty one
    pub fn option_record(&self) -> Record {
        match &self.option {
            Value::Object(map) => map.clone(),
            _ => Record::new(),
        }
    }
}

/// Reads a JSON number, or a string holding one, as f64
pub fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        _ => None,
    }
}

/// Renders an id field (string or number) the way the inventory keys it
pub fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Renders a scalar field as a label value; objects, arrays and nulls have none
pub fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) if n.is_f64() => n.as_f64().map(crate::metrics::format_value),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
