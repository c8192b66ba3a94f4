//! `scenario::all` requester

use super::{millis, PollReport, Poller};
use crate::config::Config;
use crate::context::ExporterContext;
use crate::error::Result;
use crate::shaper::ShapeOptions;
use std::time::Duration;

const METHOD: &str = "scenario::all";

pub struct ScenarioPoller {
    interval: Duration,
}

impl ScenarioPoller {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    pub fn from_config(config: &Config) -> Option<Self> {
        let refresh = &config.requesters.scenario.refresh;
        refresh.enabled.then(|| Self::new(millis(refresh.interval)))
    }
}

impl Poller for ScenarioPoller {
    fn name(&self) -> &'static str {
        "scenario"
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    async fn poll(&mut self, ctx: &ExporterContext) -> Result<PollReport> {
        let records = ctx.client.call_records(METHOD, None).await?;
        let opts = ShapeOptions::new(METHOD)
            .name("scenario")
            .excludes(&[
                "scenarioElement",
                "trigger",
                "display",
                "configuration",
                "lastLaunch",
                "description",
            ])
            .keys(&["id"])
            .help("The scenario/state inventory");
        for record in &records {
            ctx.publish(record, &opts);
        }
        Ok(PollReport {
            records: records.len(),
            metrics: records.len(),
        })
    }
}
