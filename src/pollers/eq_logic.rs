//! `eqLogic::all` requester

use super::{millis, store, PollReport, Poller};
use crate::config::Config;
use crate::context::ExporterContext;
use crate::error::Result;
use crate::inventory::EntityKind;
use crate::shaper::ShapeOptions;
use std::time::Duration;

const METHOD: &str = "eqLogic::all";

/// Keeps the equipment inventory, and publishes `jeedom_eqlogic` when its own
/// refresh is enabled
pub struct EqLogicPoller {
    interval: Duration,
    publish: bool,
}

impl EqLogicPoller {
    pub fn new(interval: Duration, publish: bool) -> Self {
        Self { interval, publish }
    }

    pub fn from_config(config: &Config) -> Option<Self> {
        let refresh = &config.requesters.eq_logic.refresh;
        let events = config.requesters.event.changes.enabled;
        (refresh.enabled || events).then(|| Self::new(millis(refresh.interval), refresh.enabled))
    }
}

impl Poller for EqLogicPoller {
    fn name(&self) -> &'static str {
        "eqLogic"
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    async fn poll(&mut self, ctx: &ExporterContext) -> Result<PollReport> {
        let records = ctx.client.call_records(METHOD, None).await?;
        store(ctx, EntityKind::EqLogic, &records);

        if !self.publish {
            return Ok(PollReport {
                records: records.len(),
                metrics: 0,
            });
        }

        let opts = ShapeOptions::new(METHOD)
            .name("eqLogic")
            .excludes(&[
                "configuration",
                "category",
                "display",
                "comment",
                "status",
                "cache",
            ])
            .keys(&["id"])
            .help("The eqLogic inventory");
        for record in &records {
            ctx.publish(record, &opts);
        }

        Ok(PollReport {
            records: records.len(),
            metrics: records.len(),
        })
    }
}
