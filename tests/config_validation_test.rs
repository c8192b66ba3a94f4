//! Configuration validation tests
//!
//! Defaults, YAML loading and validation rules.

use jeedom_exporter::config::Config;
use jeedom_exporter::error::ExporterError;
use secrecy::{ExposeSecret, SecretString};
use std::path::PathBuf;

/// Write `yaml` to a per-test file under the temp directory
fn write_config(name: &str, yaml: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!(
        "jeedom_exporter_{}_{}.yml",
        name,
        std::process::id()
    ));
    std::fs::write(&path, yaml).expect("Failed to write config");
    path
}

fn valid_config() -> Config {
    let mut config = Config::default();
    config.jeedom.key = SecretString::from("abc123");
    config
}

#[test]
fn test_defaults() {
    // Given: No configuration at all
    let config = Config::default();

    // Then: The documented defaults apply
    assert_eq!(config.prometheus.addr, "0.0.0.0");
    assert_eq!(config.prometheus.port, 9124);
    assert_eq!(config.prometheus.prefix, "jeedom_");
    assert_eq!(config.prometheus.metrics, "/metrics");
    assert_eq!(config.jeedom.url, "http://127.0.0.1/core/api/jeeApi.php");
    assert!(config.jeedom.verify_ssl);
    assert_eq!(config.jeedom.timeout_ms, 30_000);
    assert_eq!(config.exporter.timings.limit, 10_000);
    assert_eq!(config.exporter.timings.remove, 100);

    let r = &config.requesters;
    assert!(r.event.changes.enabled);
    assert_eq!(r.event.changes.interval, 60_000);
    assert_eq!(r.event.changes.since, 600_000);
    assert!(!r.cmd.refresh.enabled);
    assert_eq!(r.cmd.refresh.interval, 3_600_000);
    assert!(!r.plugin.daemon.info.refresh.enabled);
    assert_eq!(r.jee_object.inventory.interval, 3_600_000);
}

#[test]
fn test_load_yaml_file() {
    // Given: A partial YAML file using Jeedom's camelCase section names
    let path = write_config(
        "load",
        r#"
prometheus:
  port: 9200
jeedom:
  url: https://jeedom.local/core/api/jeeApi.php
  key: abc123
  verify_ssl: false
requesters:
  eqLogic:
    refresh:
      enabled: true
      interval: 300000
  jeeObject:
    refresh:
      enabled: true
  event:
    changes:
      since: 60000
      traces:
        rpc: true
"#,
    );

    // When: Loading it
    let config = Config::load(path.to_str().expect("path"), true).expect("Failed to load");
    std::fs::remove_file(&path).ok();

    // Then: Given values override, the rest keeps defaults
    assert_eq!(config.prometheus.port, 9200);
    assert_eq!(config.prometheus.prefix, "jeedom_");
    assert_eq!(config.jeedom.key.expose_secret(), "abc123");
    assert!(!config.jeedom.verify_ssl);
    assert!(config.requesters.eq_logic.refresh.enabled);
    assert_eq!(config.requesters.eq_logic.refresh.interval, 300_000);
    assert!(config.requesters.jee_object.refresh.enabled);
    assert_eq!(config.requesters.event.changes.since, 60_000);
    assert!(config.requesters.event.changes.enabled);
    assert!(config.requesters.event.changes.traces.rpc);
    assert!(config.validate().is_ok());
}

#[test]
fn test_missing_required_file_fails() {
    let result = Config::load("/nonexistent/jeedom_exporter.yml", true);
    assert!(result.is_err());
}

#[test]
fn test_missing_optional_file_uses_defaults() {
    let config = Config::load("/nonexistent/jeedom_exporter.yml", false).expect("Failed to load");
    assert_eq!(config.prometheus.port, 9124);
}

#[test]
fn test_empty_key_is_rejected() {
    // Given: Defaults, which carry no API key
    let config = Config::default();

    // When: Validating
    let err = config.validate().unwrap_err();

    // Then: The key is named in the error
    assert!(matches!(err, ExporterError::Config(_)));
    assert!(err.to_string().contains("API key"));
}

#[test]
fn test_zero_interval_is_rejected() {
    let mut config = valid_config();
    config.requesters.summary.refresh.interval = 0;

    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("summary.refresh"));
}

#[test]
fn test_zero_timings_limit_is_rejected() {
    let mut config = valid_config();
    config.exporter.timings.limit = 0;
    assert!(config.validate().is_err());
}

#[test]
fn test_metrics_path_rules() {
    let mut config = valid_config();
    config.prometheus.metrics = "metrics".to_string();
    assert!(config.validate().is_err());

    config.prometheus.metrics = "/inventory".to_string();
    assert!(config.validate().is_err());

    config.prometheus.metrics = "/prom".to_string();
    assert!(config.validate().is_ok());
}

#[test]
fn test_yaml_dump_redacts_key() {
    let config = valid_config();
    let yaml = config.to_yaml().expect("Failed to dump");
    assert!(yaml.contains("key: '********'") || yaml.contains("key: \"********\""));
    assert!(!yaml.contains("abc123"));
    assert!(yaml.contains("eqLogic:"));
    assert!(yaml.contains("jeeObject:"));
}
