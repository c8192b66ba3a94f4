//! Published Metrics
//!
//! Jeedom entities do not have a fixed label schema: every record becomes a
//! metric whose labels are the record's own fields. The `prometheus` crate
//! needs label names up front, so entity metrics live in this registry and are
//! rendered by hand in the text exposition format.
//!
//! # Deduplication
//!
//! Each [`Metric`] carries a key built from a subset of its labels (by default
//! all of them). The registry keeps exactly one metric per `(name, key)`: a
//! later publication with the same key replaces the earlier one. That lets
//! `jeedom_cmd` hold one series per command id while a refreshed command is an
//! update, not a new series.
//!
//! # Exposition
//!
//! ```text
//! # HELP jeedom_eqlogic The eqLogic inventory
//! # TYPE jeedom_eqlogic gauge
//! jeedom_eqlogic{id="1",name="Light",eqtype="virtual",method="eqLogic::all"} 1
//! ```

use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::fmt::Write;

/// Prometheus metric type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MetricType {
    Counter,
    #[default]
    Gauge,
}

impl MetricType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricType::Counter => "counter",
            MetricType::Gauge => "gauge",
        }
    }
}

/// One labelled sample, immutable once published
#[derive(Debug, Clone, PartialEq)]
pub struct Metric {
    name: String,
    value: f64,
    labels: Vec<(String, String)>,
    help: Option<String>,
    kind: MetricType,
    key: String,
}

impl Metric {
    /// Build a metric from raw label pairs.
    ///
    /// Label names are sanitized, empty values dropped, and on a name clash
    /// the first label wins. `keys` names the labels identifying the series;
    /// `None` means all of them.
    pub fn new(
        name: &str,
        value: f64,
        labels: impl IntoIterator<Item = (String, String)>,
        keys: Option<&[String]>,
    ) -> Self {
        let mut clean: Vec<(String, String)> = Vec::new();
        for (label, value) in labels {
            if value.is_empty() {
                continue;
            }
            let label = sanitize_label_name(&label);
            if clean.iter().any(|(existing, _)| *existing == label) {
                continue;
            }
            clean.push((label, value));
        }

        let key = dedup_key(&clean, keys);

        Self {
            name: sanitize_metric_name(name),
            value,
            labels: clean,
            help: None,
            kind: MetricType::Gauge,
            key,
        }
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    pub fn with_type(mut self, kind: MetricType) -> Self {
        self.kind = kind;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn labels(&self) -> &[(String, String)] {
        &self.labels
    }

    pub fn label(&self, name: &str) -> Option<&str> {
        self.labels
            .iter()
            .find(|(label, _)| label == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn help(&self) -> Option<&str> {
        self.help.as_deref()
    }

    pub fn metric_type(&self) -> MetricType {
        self.kind
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// The exposition line for this sample, newline included
    pub fn to_line(&self) -> String {
        format!(
            "{}{} {}\n",
            self.name,
            format_labels(&self.labels),
            format_value(self.value)
        )
    }
}

fn dedup_key(labels: &[(String, String)], keys: Option<&[String]>) -> String {
    let mut selected: Vec<&(String, String)> = match keys {
        Some(keys) => {
            let keys: Vec<String> = keys.iter().map(|k| sanitize_label_name(k)).collect();
            labels
                .iter()
                .filter(|(label, _)| keys.contains(label))
                .collect()
        }
        None => labels.iter().collect(),
    };
    selected.sort_by(|a, b| a.0.cmp(&b.0));
    selected
        .iter()
        .map(|(label, value)| format!("{}=\"{}\"", label, value))
        .collect::<Vec<_>>()
        .join("_")
}

/// Latest metric per (name, key)
#[derive(Debug, Default)]
pub struct MetricRegistry {
    metrics: RwLock<BTreeMap<String, BTreeMap<String, Metric>>>,
}

impl MetricRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish a metric, replacing any previous one with the same name and key
    pub fn push(&self, metric: Metric) {
        self.metrics
            .write()
            .entry(metric.name.clone())
            .or_default()
            .insert(metric.key.clone(), metric);
    }

    pub fn get(&self, name: &str, key: &str) -> Option<Metric> {
        self.metrics
            .read()
            .get(name)
            .and_then(|series| series.get(key))
            .cloned()
    }

    /// All series published under `name`
    pub fn series(&self, name: &str) -> Vec<Metric> {
        self.metrics
            .read()
            .get(name)
            .map(|series| series.values().cloned().collect())
            .unwrap_or_default()
    }

    pub fn names(&self) -> Vec<String> {
        self.metrics.read().keys().cloned().collect()
    }

    /// Total number of live series
    pub fn len(&self) -> usize {
        self.metrics.read().values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Render every series in Prometheus text format, names sorted
    ///
    /// `# HELP` and `# TYPE` come once per name, taken from its first series.
    pub fn render(&self) -> String {
        let metrics = self.metrics.read();
        let mut output = String::with_capacity(metrics.len() * 128);

        for (name, series) in metrics.iter() {
            let Some(first) = series.values().next() else {
                continue;
            };
            if let Some(help) = first.help() {
                writeln!(output, "# HELP {} {}", name, escape_help(help)).ok();
            }
            writeln!(output, "# TYPE {} {}", name, first.metric_type().as_str()).ok();

            for metric in series.values() {
                output.push_str(&metric.to_line());
            }
        }

        output
    }
}

/// Lower-case a metric name and map `::` and other invalid characters to `_`
pub fn sanitize_metric_name(name: &str) -> String {
    sanitize(name, true)
}

/// Lower-case a label name and map `::` and other invalid characters to `_`
pub fn sanitize_label_name(name: &str) -> String {
    let result = sanitize(name, false);
    if result.is_empty() {
        return "label".to_string();
    }
    result
}

fn sanitize(name: &str, allow_colon: bool) -> String {
    let name = name.replace("::", "_").to_lowercase();
    let mut result = String::with_capacity(name.len());

    for (i, c) in name.chars().enumerate() {
        let valid = c.is_ascii_lowercase()
            || c == '_'
            || (allow_colon && c == ':')
            || (i > 0 && c.is_ascii_digit());
        if valid {
            result.push(c);
        } else if i == 0 && c.is_ascii_digit() {
            result.push('_');
            result.push(c);
        } else {
            result.push('_');
        }
    }

    result
}

fn escape_label_value(value: &str) -> String {
    let mut result = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => result.push_str("\\\\"),
            '"' => result.push_str("\\\""),
            '\n' => result.push_str("\\n"),
            _ => result.push(c),
        }
    }
    result
}

fn escape_help(help: &str) -> String {
    help.replace('\\', "\\\\").replace('\n', "\\n")
}

/// Format a sample value for Prometheus
pub fn format_value(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value.is_infinite() {
        if value.is_sign_positive() {
            "+Inf".to_string()
        } else {
            "-Inf".to_string()
        }
    } else if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{:.0}", value)
    } else {
        format!("{}", value)
    }
}

fn format_labels(labels: &[(String, String)]) -> String {
    if labels.is_empty() {
        return String::new();
    }

    let parts: Vec<String> = labels
        .iter()
        .map(|(k, v)| format!("{}=\"{}\"", k, escape_label_value(v)))
        .collect();

    format!("{{{}}}", parts.join(","))
}
