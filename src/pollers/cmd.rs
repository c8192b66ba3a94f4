//! `cmd::all` requester

use super::{millis, store, PollReport, Poller};
use crate::config::Config;
use crate::context::ExporterContext;
use crate::error::Result;
use crate::inventory::EntityKind;
use crate::shaper::ShapeOptions;
use std::time::Duration;

const METHOD: &str = "cmd::all";

/// Keeps the command inventory, and publishes `jeedom_cmd` when its own
/// refresh is enabled
pub struct CmdPoller {
    interval: Duration,
    publish: bool,
}

impl CmdPoller {
    pub fn new(interval: Duration, publish: bool) -> Self {
        Self { interval, publish }
    }

    pub fn from_config(config: &Config) -> Option<Self> {
        let refresh = &config.requesters.cmd.refresh;
        let events = config.requesters.event.changes.enabled;
        (refresh.enabled || events).then(|| Self::new(millis(refresh.interval), refresh.enabled))
    }

    fn options() -> ShapeOptions {
        ShapeOptions::new(METHOD)
            .name("cmd")
            .excludes(&[
                "alert",
                "configuration",
                "display",
                "template",
                "value",
                "currentValue",
            ])
            .keys(&["id"])
            .help("The cmd inventory")
    }
}

impl Poller for CmdPoller {
    fn name(&self) -> &'static str {
        "cmd"
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    async fn poll(&mut self, ctx: &ExporterContext) -> Result<PollReport> {
        let records = ctx.client.call_records(METHOD, None).await?;
        store(ctx, EntityKind::Cmd, &records);

        let mut report = PollReport {
            records: records.len(),
            metrics: 0,
        };
        if self.publish {
            let opts = Self::options();
            for record in &records {
                ctx.publish(record, &opts);
            }
            report.metrics = records.len();
        }

        Ok(report)
    }
}
