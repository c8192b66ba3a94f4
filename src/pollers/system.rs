//! `jeedom::getUsbMapping` requester

use super::{millis, PollReport, Poller};
use crate::config::Config;
use crate::context::ExporterContext;
use crate::error::{ExporterError, Result};
use crate::inventory::EntityKind;
use crate::jeedom::client::json_kind;
use crate::jeedom::Record;
use crate::shaper::ShapeOptions;
use serde_json::Value;
use std::time::Duration;

const METHOD: &str = "jeedom::getUsbMapping";

/// Id of the USB mapping record in the `system` bucket
pub const USB_MAPPINGS: &str = "usbMappings";

pub struct SystemPoller {
    interval: Duration,
}

impl SystemPoller {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    pub fn from_config(config: &Config) -> Option<Self> {
        let refresh = &config.requesters.system.refresh;
        refresh.enabled.then(|| Self::new(millis(refresh.interval)))
    }
}

impl Poller for SystemPoller {
    fn name(&self) -> &'static str {
        "system"
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    async fn poll(&mut self, ctx: &ExporterContext) -> Result<PollReport> {
        let mappings = match ctx.client.call(METHOD, None).await? {
            Value::Object(mappings) => mappings,
            other => {
                return Err(ExporterError::malformed(
                    METHOD,
                    format!("expected an object, got {}", json_kind(&other)),
                ))
            }
        };

        let opts = ShapeOptions::new(METHOD)
            .name("usb_mapping")
            .keys(&["name"])
            .help("The USB mapping inventory");
        for (name, mapping) in &mappings {
            let mut record = Record::new();
            record.insert("name".to_string(), Value::String(name.clone()));
            record.insert("mapping".to_string(), mapping.clone());
            ctx.publish(&record, &opts);
        }

        let count = mappings.len();
        ctx.inventory.put(EntityKind::System, USB_MAPPINGS, mappings);
        Ok(PollReport {
            records: count,
            metrics: count,
        })
    }
}
