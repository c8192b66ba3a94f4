//! Requesters
//!
//! One [`Poller`] per Jeedom entity kind. Each runs as its own detached tokio
//! task: `init`, then `poll` immediately, then `poll` once per interval.
//!
//! # Error Handling
//!
//! A failing tick is logged as a warning and the task waits for its next
//! tick. The timer never stops and nothing here ends the process; stale
//! metrics are the only visible effect of an unreachable controller.
//!
//! # Enablement
//!
//! [`start`] reads `requesters.*` from the configuration. The `cmd` and
//! `eqLogic` requesters also run, without publishing, when event changes are
//! enabled, since event correlation reads their inventory buckets. The full
//! object inventory always runs.

use crate::context::ExporterContext;
use crate::error::Result;
use crate::inventory::EntityKind;
use crate::jeedom::types::id_string;
use crate::jeedom::Record;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

pub mod cmd;
pub mod eq_logic;
pub mod event;
pub mod interaction;
pub mod jee_object;
pub mod plugin;
pub mod scenario;
pub mod summary;
pub mod system;

pub use cmd::CmdPoller;
pub use eq_logic::EqLogicPoller;
pub use event::EventPoller;
pub use interaction::InteractionPoller;
pub use jee_object::{JeeObjectInventoryPoller, JeeObjectPoller};
pub use plugin::{PluginDaemonPoller, PluginListPoller};
pub use scenario::ScenarioPoller;
pub use summary::SummaryPoller;
pub use system::SystemPoller;

/// What one successful tick did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PollReport {
    /// Records received from Jeedom
    pub records: usize,
    /// Metrics published to the registry
    pub metrics: usize,
}

/// A scheduled requester for one kind of Jeedom entity
pub trait Poller: Send + 'static {
    fn name(&self) -> &'static str;

    fn interval(&self) -> Duration;

    /// Runs once before the first tick
    fn init(&mut self, _ctx: &ExporterContext) -> impl Future<Output = Result<()>> + Send {
        async { Ok(()) }
    }

    fn poll(&mut self, ctx: &ExporterContext) -> impl Future<Output = Result<PollReport>> + Send;
}

/// A started requester
#[derive(Debug)]
pub struct RunState {
    pub name: &'static str,
    pub interval: Duration,
    pub handle: JoinHandle<()>,
}

/// Spawn `poller` as a detached task
pub fn spawn<P: Poller>(poller: P, ctx: Arc<ExporterContext>) -> RunState {
    let name = poller.name();
    let interval = poller.interval();
    info!("Starting {} requester every {:?}", name, interval);

    let handle = tokio::spawn(run(poller, ctx));
    RunState {
        name,
        interval,
        handle,
    }
}

async fn run<P: Poller>(mut poller: P, ctx: Arc<ExporterContext>) {
    let mut ticker = interval(poller.interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    if let Err(e) = poller.init(&ctx).await {
        warn!("Failed to initialize {} requester: {}", poller.name(), e);
    }

    loop {
        // The first tick completes immediately
        ticker.tick().await;

        match poller.poll(&ctx).await {
            Ok(report) => debug!(
                "{}: {} records, {} metrics",
                poller.name(),
                report.records,
                report.metrics
            ),
            Err(e) => warn!("{} tick failed: {}", poller.name(), e),
        }
    }
}

/// Start every requester the configuration enables
pub fn start(ctx: Arc<ExporterContext>) -> Vec<RunState> {
    let config = &ctx.config;
    let mut started = Vec::new();

    started.push(spawn(JeeObjectInventoryPoller::new(config), ctx.clone()));

    if let Some(poller) = CmdPoller::from_config(config) {
        started.push(spawn(poller, ctx.clone()));
    }
    if let Some(poller) = EqLogicPoller::from_config(config) {
        started.push(spawn(poller, ctx.clone()));
    }
    if let Some(poller) = JeeObjectPoller::from_config(config) {
        started.push(spawn(poller, ctx.clone()));
    }
    if let Some(poller) = PluginListPoller::from_config(config) {
        started.push(spawn(poller, ctx.clone()));
    }
    if let Some(poller) = PluginDaemonPoller::from_config(config) {
        started.push(spawn(poller, ctx.clone()));
    }
    if let Some(poller) = ScenarioPoller::from_config(config) {
        started.push(spawn(poller, ctx.clone()));
    }
    if let Some(poller) = SummaryPoller::from_config(config) {
        started.push(spawn(poller, ctx.clone()));
    }
    if let Some(poller) = SystemPoller::from_config(config) {
        started.push(spawn(poller, ctx.clone()));
    }
    if let Some(poller) = InteractionPoller::from_config(config) {
        started.push(spawn(poller, ctx.clone()));
    }
    if let Some(poller) = EventPoller::from_config(config) {
        started.push(spawn(poller, ctx.clone()));
    }

    info!("Started {} requesters", started.len());
    started
}

pub(crate) fn millis(ms: u64) -> Duration {
    Duration::from_millis(ms)
}

/// Index records by their `id` field; records without one are skipped
pub(crate) fn index_by_id(records: &[Record]) -> HashMap<String, Record> {
    records
        .iter()
        .filter_map(|record| {
            let id = record.get("id").and_then(id_string)?;
            Some((id, record.clone()))
        })
        .collect()
}

/// Replace the `kind` bucket with `records`
pub(crate) fn store(ctx: &ExporterContext, kind: EntityKind, records: &[Record]) {
    ctx.inventory.put_all(kind, index_by_id(records));
}
