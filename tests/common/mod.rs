//! In-process fake Jeedom endpoint
//!
//! An axum router bound to `127.0.0.1:0` that answers JSON-RPC calls from a
//! script. Each rule matches a method (and optionally a subset of params) and
//! replays its answers in order; the last answer repeats.

#![allow(dead_code)]

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::post, Json, Router};
use jeedom_exporter::config::Config;
use jeedom_exporter::context::ExporterContext;
use parking_lot::Mutex;
use secrecy::SecretString;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::Arc;

pub const API_KEY: &str = "test-api-key";
const API_PATH: &str = "/core/api/jeeApi.php";

#[derive(Debug, Clone)]
pub enum Answer {
    Result(Value),
    RpcError(i64, String),
    Status(u16),
    Raw(String),
}

struct Rule {
    method: String,
    params: Option<Value>,
    answers: VecDeque<Answer>,
}

#[derive(Default)]
struct Script {
    rules: Vec<Rule>,
    requests: Vec<Value>,
}

#[derive(Clone)]
pub struct FakeJeedom {
    pub url: String,
    script: Arc<Mutex<Script>>,
}

impl FakeJeedom {
    pub async fn start() -> Self {
        let script = Arc::new(Mutex::new(Script::default()));
        let app = Router::new()
            .route(API_PATH, post(handle))
            .with_state(script.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind fake Jeedom");
        let addr = listener.local_addr().expect("No local address");
        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        Self {
            url: format!("http://{}{}", addr, API_PATH),
            script,
        }
    }

    /// Answer `method` with `result`
    pub fn answer(&self, method: &str, result: Value) -> &Self {
        self.push(method, None, Answer::Result(result))
    }

    /// Answer `method` with `result` when the request params contain `params`
    pub fn answer_when(&self, method: &str, params: Value, result: Value) -> &Self {
        self.push(method, Some(params), Answer::Result(result))
    }

    /// Queue any kind of answer for `method`
    pub fn push(&self, method: &str, params: Option<Value>, answer: Answer) -> &Self {
        let mut script = self.script.lock();
        let existing = script
            .rules
            .iter_mut()
            .find(|rule| rule.method == method && rule.params == params);
        match existing {
            Some(rule) => rule.answers.push_back(answer),
            None => script.rules.push(Rule {
                method: method.to_string(),
                params,
                answers: VecDeque::from([answer]),
            }),
        }
        self
    }

    /// Every request body received so far
    pub fn requests(&self) -> Vec<Value> {
        self.script.lock().requests.clone()
    }

    pub fn requests_for(&self, method: &str) -> Vec<Value> {
        self.requests()
            .into_iter()
            .filter(|request| request["method"] == method)
            .collect()
    }
}

async fn handle(
    State(script): State<Arc<Mutex<Script>>>,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    let mut script = script.lock();
    script.requests.push(body.clone());

    let method = body["method"].as_str().unwrap_or_default().to_string();
    let params = body.get("params").cloned().unwrap_or(Value::Null);

    let answer = script
        .rules
        .iter_mut()
        .find(|rule| {
            rule.method == method && rule.params.as_ref().map_or(true, |p| contains(&params, p))
        })
        .and_then(|rule| {
            if rule.answers.len() > 1 {
                rule.answers.pop_front()
            } else {
                rule.answers.front().cloned()
            }
        });

    let id = body.get("id").cloned().unwrap_or(Value::Null);
    match answer {
        Some(Answer::Result(result)) => {
            Json(json!({"jsonrpc": "2.0", "id": id, "result": result})).into_response()
        }
        Some(Answer::RpcError(code, message)) => Json(json!({
            "jsonrpc": "2.0",
            "id": id,
            "error": {"code": code, "message": message}
        }))
        .into_response(),
        Some(Answer::Status(status)) => StatusCode::from_u16(status)
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
            .into_response(),
        Some(Answer::Raw(text)) => text.into_response(),
        None => Json(json!({
            "jsonrpc": "2.0",
            "id": id,
            "error": {"code": -32601, "message": format!("Method not found: {}", method)}
        }))
        .into_response(),
    }
}

fn contains(params: &Value, expected: &Value) -> bool {
    match expected.as_object() {
        Some(expected) => expected
            .iter()
            .all(|(key, value)| params.get(key) == Some(value)),
        None => params == expected,
    }
}

/// Configuration pointing at `fake`, every requester disabled
pub fn test_config(fake: &FakeJeedom) -> Config {
    let mut config = Config::default();
    config.jeedom.url = fake.url.clone();
    config.jeedom.key = SecretString::from(API_KEY);
    config.jeedom.timeout_ms = 5_000;
    config.requesters.event.changes.enabled = false;
    config
}

pub fn context(config: Config) -> Arc<ExporterContext> {
    Arc::new(ExporterContext::new(config).expect("Failed to build context"))
}
