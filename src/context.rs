//! Shared exporter state
//!
//! Built once at startup and handed by `Arc` to every requester and to the
//! HTTP handlers. Tests build a fresh one each.

use crate::config::Config;
use crate::inventory::Inventory;
use crate::jeedom::{JeedomClient, Record};
use crate::metrics::{Metric, MetricRegistry};
use crate::shaper::{MetricShaper, ShapeOptions};
use crate::stats::RequestStats;
use tracing::debug;

pub struct ExporterContext {
    pub config: Config,
    pub client: JeedomClient,
    pub inventory: Inventory,
    pub registry: MetricRegistry,
    pub shaper: MetricShaper,
}

impl ExporterContext {
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let stats = RequestStats::new(config.exporter.timings.clone())?;
        let client = JeedomClient::new(&config.jeedom, stats)?;
        let shaper = MetricShaper::new(&config.prometheus.prefix);

        Ok(Self {
            config,
            client,
            inventory: Inventory::new(),
            registry: MetricRegistry::new(),
            shaper,
        })
    }

    pub fn stats(&self) -> &RequestStats {
        self.client.stats()
    }

    /// Shape `record` and store the result in the registry
    pub fn publish(&self, record: &Record, opts: &ShapeOptions) -> Metric {
        let metric = self.shaper.shape(record, opts);
        if opts.trace {
            debug!("Publishing {}", metric.to_line().trim_end());
        }
        self.registry.push(metric.clone());
        metric
    }

    /// Full scrape body: request statistics first, then the registry
    pub fn render(&self) -> anyhow::Result<String> {
        let mut output = self.stats().render()?;
        output.push_str(&self.registry.render());
        Ok(output)
    }
}
