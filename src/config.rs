use anyhow::{Context, Result};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize, Serializer};

use crate::error::ExporterError;

/// Default location of the YAML configuration file
pub const DEFAULT_CONFIG_PATH: &str = "/etc/prometheus/jeedom_exporter.yml";

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub prometheus: PrometheusConfig,
    #[serde(default)]
    pub jeedom: JeedomConfig,
    #[serde(default)]
    pub exporter: ExporterConfig,
    #[serde(default)]
    pub requesters: RequestersConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PrometheusConfig {
    #[serde(default = "default_addr")]
    pub addr: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_prefix")]
    pub prefix: String,
    #[serde(default = "default_metrics_path")]
    pub metrics: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct JeedomConfig {
    #[serde(default = "default_url")]
    pub url: String,
    #[serde(default = "default_key", serialize_with = "redact")]
    pub key: SecretString,
    #[serde(default = "default_true")]
    pub verify_ssl: bool,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct ExporterConfig {
    #[serde(default)]
    pub timings: TimingsConfig,
}

/// Bounds of the in-memory request timing ring
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct TimingsConfig {
    #[serde(default = "default_timings_limit")]
    pub limit: usize,
    #[serde(default = "default_timings_remove")]
    pub remove: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct RequestersConfig {
    #[serde(default)]
    pub cmd: RefreshSection,
    #[serde(default, rename = "eqLogic", alias = "eqlogic")]
    pub eq_logic: RefreshSection,
    #[serde(default)]
    pub event: EventSection,
    #[serde(default)]
    pub interaction: RefreshSection,
    #[serde(default, rename = "jeeObject", alias = "jeeobject")]
    pub jee_object: JeeObjectSection,
    #[serde(default)]
    pub plugin: PluginSection,
    #[serde(default)]
    pub scenario: RefreshSection,
    #[serde(default)]
    pub summary: RefreshSection,
    #[serde(default)]
    pub system: RefreshSection,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct RefreshSection {
    #[serde(default)]
    pub refresh: PollerConfig,
}

/// One scheduled requester: whether it runs and how often (milliseconds)
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PollerConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_hourly")]
    pub interval: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct EventSection {
    #[serde(default)]
    pub changes: EventChangesConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct EventChangesConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_event_interval")]
    pub interval: u64,
    /// How far back the first request rewinds, in milliseconds
    #[serde(default = "default_event_since")]
    pub since: u64,
    #[serde(default)]
    pub traces: TracesConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct TracesConfig {
    #[serde(default)]
    pub rpc: bool,
    #[serde(default)]
    pub metrics: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct JeeObjectSection {
    #[serde(default)]
    pub inventory: IntervalConfig,
    #[serde(default)]
    pub refresh: PollerConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct IntervalConfig {
    #[serde(default = "default_hourly")]
    pub interval: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct PluginSection {
    #[serde(default)]
    pub daemon: PluginDaemonSection,
    #[serde(default)]
    pub list: RefreshSection,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct PluginDaemonSection {
    #[serde(default)]
    pub info: RefreshSection,
}

fn default_addr() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    9124
}

fn default_prefix() -> String {
    "jeedom_".to_string()
}

fn default_metrics_path() -> String {
    "/metrics".to_string()
}

fn default_url() -> String {
    "http://127.0.0.1/core/api/jeeApi.php".to_string()
}

fn default_key() -> SecretString {
    SecretString::from(String::new())
}

fn default_true() -> bool {
    true
}

fn default_timeout_ms() -> u64 {
    30_000
}

fn default_timings_limit() -> usize {
    10_000
}

fn default_timings_remove() -> usize {
    100
}

fn default_hourly() -> u64 {
    3_600_000
}

fn default_event_interval() -> u64 {
    60_000
}

fn default_event_since() -> u64 {
    600_000
}

fn redact<S: Serializer>(key: &SecretString, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    if key.expose_secret().is_empty() {
        serializer.serialize_str("")
    } else {
        serializer.serialize_str("********")
    }
}

impl Default for PrometheusConfig {
    fn default() -> Self {
        Self {
            addr: default_addr(),
            port: default_port(),
            prefix: default_prefix(),
            metrics: default_metrics_path(),
        }
    }
}

impl Default for JeedomConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            key: default_key(),
            verify_ssl: true,
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl Default for TimingsConfig {
    fn default() -> Self {
        Self {
            limit: default_timings_limit(),
            remove: default_timings_remove(),
        }
    }
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            interval: default_hourly(),
        }
    }
}

impl Default for IntervalConfig {
    fn default() -> Self {
        Self {
            interval: default_hourly(),
        }
    }
}

impl Default for EventChangesConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval: default_event_interval(),
            since: default_event_since(),
            traces: TracesConfig::default(),
        }
    }
}

impl Config {
    /// Load the configuration from `path`, then apply `JEEDOM_EXPORTER__*`
    /// environment overrides.
    ///
    /// A missing file is only an error when `required` is set, so the
    /// exporter can run on defaults plus command-line options.
    pub fn load(path: &str, required: bool) -> Result<Self> {
        // Load environment variables from .env if present
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(config::File::with_name(path).required(required))
            .add_source(config::Environment::with_prefix("JEEDOM_EXPORTER").separator("__"))
            .build()
            .context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    /// Check the values the pollers and the server rely on.
    pub fn validate(&self) -> crate::error::Result<()> {
        if self.jeedom.key.expose_secret().trim().is_empty() {
            return Err(ExporterError::Config(
                "Jeedom API key is not specified, but is mandatory".to_string(),
            ));
        }
        if !self.prometheus.metrics.starts_with('/') {
            return Err(ExporterError::Config(format!(
                "metrics path must start with '/': {}",
                self.prometheus.metrics
            )));
        }
        if ["/", "/config", "/inventory"].contains(&self.prometheus.metrics.as_str()) {
            return Err(ExporterError::Config(format!(
                "metrics path {} is already served by an info page",
                self.prometheus.metrics
            )));
        }
        if self.exporter.timings.limit == 0 {
            return Err(ExporterError::Config(
                "exporter.timings.limit must be greater than 0".to_string(),
            ));
        }

        let r = &self.requesters;
        let intervals = [
            ("cmd.refresh", r.cmd.refresh.interval),
            ("eqLogic.refresh", r.eq_logic.refresh.interval),
            ("event.changes", r.event.changes.interval),
            ("interaction.refresh", r.interaction.refresh.interval),
            ("jeeObject.inventory", r.jee_object.inventory.interval),
            ("jeeObject.refresh", r.jee_object.refresh.interval),
            ("plugin.daemon.info.refresh", r.plugin.daemon.info.refresh.interval),
            ("plugin.list.refresh", r.plugin.list.refresh.interval),
            ("scenario.refresh", r.scenario.refresh.interval),
            ("summary.refresh", r.summary.refresh.interval),
            ("system.refresh", r.system.refresh.interval),
        ];
        for (name, interval) in intervals {
            if interval == 0 {
                return Err(ExporterError::Config(format!(
                    "requesters.{}.interval must be greater than 0",
                    name
                )));
            }
        }

        Ok(())
    }

    /// Effective configuration as YAML, with the API key redacted.
    pub fn to_yaml(&self) -> anyhow::Result<String> {
        serde_yaml::to_string(self).context("Failed to serialize configuration")
    }
}
