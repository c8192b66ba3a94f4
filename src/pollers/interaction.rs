//! `interactQuery::all` requester: inventory only

use super::{millis, store, PollReport, Poller};
use crate::config::Config;
use crate::context::ExporterContext;
use crate::error::Result;
use crate::inventory::EntityKind;
use std::time::Duration;

pub struct InteractionPoller {
    interval: Duration,
}

impl InteractionPoller {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    pub fn from_config(config: &Config) -> Option<Self> {
        let refresh = &config.requesters.interaction.refresh;
        refresh.enabled.then(|| Self::new(millis(refresh.interval)))
    }
}

impl Poller for InteractionPoller {
    fn name(&self) -> &'static str {
        "interaction"
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    async fn poll(&mut self, ctx: &ExporterContext) -> Result<PollReport> {
        let records = ctx.client.call_records("interactQuery::all", None).await?;
        store(ctx, EntityKind::Interaction, &records);
        Ok(PollReport {
            records: records.len(),
            metrics: 0,
        })
    }
}
