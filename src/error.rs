use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExporterError {
    #[error("Transport error calling {method}: {source}")]
    Transport {
        method: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("HTTP status {status} calling {method}")]
    HttpStatus { method: String, status: u16 },

    #[error("Jeedom API error calling {method}: {message} (code {code})")]
    JeedomApi {
        method: String,
        code: i64,
        message: String,
    },

    #[error("Malformed result for {method}: {reason}")]
    MalformedResult { method: String, reason: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP server error: {0}")]
    Server(String),
}

impl ExporterError {
    pub fn malformed(method: &str, reason: impl Into<String>) -> Self {
        ExporterError::MalformedResult {
            method: method.to_string(),
            reason: reason.into(),
        }
    }
}

/// Classifies a transport error the way the status counter labels it.
pub(crate) fn transport_code(err: &reqwest::Error) -> &'static str {
    if err.is_timeout() {
        "timeout"
    } else if err.is_connect() {
        "connect"
    } else if err.is_body() || err.is_decode() {
        "body"
    } else if err.is_request() {
        "request"
    } else {
        "transport"
    }
}

pub type Result<T> = std::result::Result<T, ExporterError>;
