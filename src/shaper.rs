//! Record to Metric Shaping
//!
//! Every requester hands its raw records to [`MetricShaper::shape`], which
//! turns a nested JSON object into one flat, sanitized label set and a
//! [`Metric`]:
//!
//! 1. top-level `excludes` fields are skipped
//! 2. nested objects flatten to `parent_child` labels
//! 3. arrays and nulls are dropped, scalars keep their JSON text
//! 4. the `method` label goes last
//!
//! The metric name is `prefix + (name or method) + suffix`, lower-cased with
//! `::` turned into `_`.

use crate::jeedom::types::{scalar_string, Record};
use crate::metrics::{Metric, MetricType};
use serde_json::Value;

/// How one record becomes a metric
#[derive(Debug, Clone, Default)]
pub struct ShapeOptions {
    pub method: Option<String>,
    pub name: Option<String>,
    pub suffix: Option<String>,
    pub excludes: Vec<String>,
    pub keys: Option<Vec<String>>,
    pub value: Option<f64>,
    pub help: Option<String>,
    pub kind: MetricType,
    /// Log the shaped metric at debug level
    pub trace: bool,
}

impl ShapeOptions {
    pub fn new(method: &str) -> Self {
        Self {
            method: Some(method.to_string()),
            ..Self::default()
        }
    }

    pub fn name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    pub fn suffix(mut self, suffix: &str) -> Self {
        self.suffix = Some(suffix.to_string());
        self
    }

    pub fn excludes(mut self, excludes: &[&str]) -> Self {
        self.excludes = excludes.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn keys(mut self, keys: &[&str]) -> Self {
        self.keys = Some(keys.iter().map(|s| s.to_string()).collect());
        self
    }

    pub fn value(mut self, value: f64) -> Self {
        self.value = Some(value);
        self
    }

    pub fn help(mut self, help: &str) -> Self {
        self.help = Some(help.to_string());
        self
    }

    pub fn kind(mut self, kind: MetricType) -> Self {
        self.kind = kind;
        self
    }

    pub fn trace(mut self, trace: bool) -> Self {
        self.trace = trace;
        self
    }
}

#[derive(Debug, Clone)]
pub struct MetricShaper {
    prefix: String,
}

impl MetricShaper {
    pub fn new(prefix: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Full metric name for these options, before sanitizing
    pub fn metric_name(&self, opts: &ShapeOptions) -> String {
        let radical = opts
            .name
            .as_deref()
            .or(opts.method.as_deref())
            .unwrap_or("metric");
        format!(
            "{}{}{}",
            self.prefix,
            radical,
            opts.suffix.as_deref().unwrap_or_default()
        )
    }

    pub fn shape(&self, record: &Record, opts: &ShapeOptions) -> Metric {
        let mut labels = Vec::with_capacity(record.len() + 1);

        for (field, value) in record {
            if opts.excludes.iter().any(|excluded| excluded == field) {
                continue;
            }
            // The method label is set by the caller, not by the record
            if opts.method.is_some() && field == "method" {
                continue;
            }
            flatten_into(field, value, &mut labels);
        }

        if let Some(method) = &opts.method {
            labels.push(("method".to_string(), method.clone()));
        }

        let mut metric = Metric::new(
            &self.metric_name(opts),
            opts.value.unwrap_or(1.0),
            labels,
            opts.keys.as_deref(),
        )
        .with_type(opts.kind);

        if let Some(help) = &opts.help {
            metric = metric.with_help(help.as_str());
        }

        metric
    }
}

fn flatten_into(name: &str, value: &Value, labels: &mut Vec<(String, String)>) {
    match value {
        Value::Object(map) => {
            for (child, nested) in map {
                flatten_into(&format!("{}_{}", name, child), nested, labels);
            }
        }
        Value::Array(_) | Value::Null => {}
        scalar => {
            if let Some(text) = scalar_string(scalar) {
                labels.push((name.to_string(), text));
            }
        }
    }
}
