//! Object requesters
//!
//! `jeeObject::full` feeds the inventory used to name equipment in events and
//! always runs. `jeeObject::all` publishes `jeedom_jeeobject` when enabled.

use super::{millis, store, PollReport, Poller};
use crate::config::Config;
use crate::context::ExporterContext;
use crate::error::Result;
use crate::inventory::EntityKind;
use crate::shaper::ShapeOptions;
use std::time::Duration;

pub struct JeeObjectInventoryPoller {
    interval: Duration,
}

impl JeeObjectInventoryPoller {
    pub fn new(config: &Config) -> Self {
        Self {
            interval: millis(config.requesters.jee_object.inventory.interval),
        }
    }
}

impl Poller for JeeObjectInventoryPoller {
    fn name(&self) -> &'static str {
        "jeeObject.inventory"
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    async fn poll(&mut self, ctx: &ExporterContext) -> Result<PollReport> {
        let records = ctx.client.call_records("jeeObject::full", None).await?;
        store(ctx, EntityKind::JeeObject, &records);
        Ok(PollReport {
            records: records.len(),
            metrics: 0,
        })
    }
}

pub struct JeeObjectPoller {
    interval: Duration,
}

impl JeeObjectPoller {
    const METHOD: &'static str = "jeeObject::all";

    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    pub fn from_config(config: &Config) -> Option<Self> {
        let refresh = &config.requesters.jee_object.refresh;
        refresh.enabled.then(|| Self::new(millis(refresh.interval)))
    }
}

impl Poller for JeeObjectPoller {
    fn name(&self) -> &'static str {
        "jeeObject.refresh"
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    async fn poll(&mut self, ctx: &ExporterContext) -> Result<PollReport> {
        let records = ctx.client.call_records(Self::METHOD, None).await?;
        let opts = ShapeOptions::new(Self::METHOD)
            .name("jeeObject")
            .excludes(&["configuration", "display_icon", "display_tagColor"])
            .keys(&["id"])
            .help("The JeeObject inventory");
        for record in &records {
            ctx.publish(record, &opts);
        }
        Ok(PollReport {
            records: records.len(),
            metrics: records.len(),
        })
    }
}
