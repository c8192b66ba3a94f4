//! Plugin requesters
//!
//! `plugin::listPlugin` does not say which plugins are active, so the list
//! requester asks twice: once for every plugin, once with `activateOnly`.

use super::{index_by_id, millis, PollReport, Poller};
use crate::config::Config;
use crate::context::ExporterContext;
use crate::error::Result;
use crate::inventory::EntityKind;
use crate::jeedom::types::as_f64;
use crate::shaper::ShapeOptions;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, warn};

const LIST_METHOD: &str = "plugin::listPlugin";
const DAEMON_METHOD: &str = "plugin::deamonInfo";

pub struct PluginListPoller {
    interval: Duration,
    publish: bool,
}

impl PluginListPoller {
    pub fn new(interval: Duration, publish: bool) -> Self {
        Self { interval, publish }
    }

    /// Also runs for the daemon requester, which walks this inventory
    pub fn from_config(config: &Config) -> Option<Self> {
        let plugin = &config.requesters.plugin;
        let list = &plugin.list.refresh;
        (list.enabled || plugin.daemon.info.refresh.enabled)
            .then(|| Self::new(millis(list.interval), list.enabled))
    }
}

impl Poller for PluginListPoller {
    fn name(&self) -> &'static str {
        "plugin.list"
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    async fn poll(&mut self, ctx: &ExporterContext) -> Result<PollReport> {
        let records = ctx.client.call_records(LIST_METHOD, None).await?;
        let mut plugins = index_by_id(&records);
        for plugin in plugins.values_mut() {
            plugin.insert("activated".to_string(), json!(0));
        }

        match ctx
            .client
            .call_records(LIST_METHOD, Some(json!({ "activateOnly": 1 })))
            .await
        {
            Ok(active) => {
                for id in index_by_id(&active).into_keys() {
                    if let Some(plugin) = plugins.get_mut(&id) {
                        plugin.insert("activated".to_string(), json!(1));
                    }
                }
            }
            Err(e) => warn!("Failed to list activated plugins: {}", e),
        }

        let count = plugins.len();
        let mut metrics = 0;
        if self.publish {
            let opts = ShapeOptions::new(LIST_METHOD)
                .name("plugin")
                .excludes(&[
                    "description",
                    "filepath",
                    "changelog",
                    "documentation",
                    "changelog_beta",
                    "documentation_beta",
                    "info",
                    "specialAttributes",
                    "whiteListFolders",
                    "functionality",
                ])
                .keys(&["id"])
                .help("The plugins inventory");
            for plugin in plugins.values() {
                ctx.publish(plugin, &opts);
            }
            metrics = count;
        }

        ctx.inventory.put_all(EntityKind::Plugin, plugins);
        Ok(PollReport {
            records: count,
            metrics,
        })
    }
}

/// Asks each daemon-owning plugin for its daemon state; logged only
pub struct PluginDaemonPoller {
    interval: Duration,
}

impl PluginDaemonPoller {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    pub fn from_config(config: &Config) -> Option<Self> {
        let refresh = &config.requesters.plugin.daemon.info.refresh;
        refresh.enabled.then(|| Self::new(millis(refresh.interval)))
    }
}

impl Poller for PluginDaemonPoller {
    fn name(&self) -> &'static str {
        "plugin.daemon.info"
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    async fn poll(&mut self, ctx: &ExporterContext) -> Result<PollReport> {
        let daemons: Vec<String> = ctx
            .inventory
            .snapshot()
            .remove(&EntityKind::Plugin)
            .unwrap_or_default()
            .into_iter()
            .filter(|(_, plugin)| plugin.get("hasOwnDeamon").is_some_and(is_truthy))
            .map(|(id, _)| id)
            .collect();

        for id in &daemons {
            match ctx
                .client
                .call(DAEMON_METHOD, Some(json!({ "logicalId": id })))
                .await
            {
                Ok(info) => debug!("Daemon info for {}: {}", id, info),
                Err(e) => debug!("No daemon info for {}: {}", id, e),
            }
        }

        Ok(PollReport {
            records: daemons.len(),
            metrics: 0,
        })
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        other => as_f64(other).is_some_and(|n| n != 0.0),
    }
}
