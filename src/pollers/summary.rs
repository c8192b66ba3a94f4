//! `summary::global` requester
//!
//! The answer is an object keyed by summary key (`temperature`, `humidity`,
//! ...) rather than an array, so it is indexed by that key.

use super::{millis, PollReport, Poller};
use crate::config::Config;
use crate::context::ExporterContext;
use crate::error::{ExporterError, Result};
use crate::inventory::EntityKind;
use crate::jeedom::client::json_kind;
use crate::jeedom::Record;
use crate::shaper::ShapeOptions;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;

const METHOD: &str = "summary::global";

pub struct SummaryPoller {
    interval: Duration,
}

impl SummaryPoller {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    pub fn from_config(config: &Config) -> Option<Self> {
        let refresh = &config.requesters.summary.refresh;
        refresh.enabled.then(|| Self::new(millis(refresh.interval)))
    }
}

impl Poller for SummaryPoller {
    fn name(&self) -> &'static str {
        "summary"
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    async fn poll(&mut self, ctx: &ExporterContext) -> Result<PollReport> {
        let entries = match ctx.client.call(METHOD, None).await? {
            Value::Object(entries) => entries,
            other => {
                return Err(ExporterError::malformed(
                    METHOD,
                    format!("expected an object, got {}", json_kind(&other)),
                ))
            }
        };

        let mut summaries: HashMap<String, Record> = HashMap::new();
        let mut ordered = Vec::with_capacity(entries.len());
        for (key, entry) in entries {
            let Value::Object(mut record) = entry else {
                continue;
            };
            record
                .entry("key")
                .or_insert_with(|| Value::String(key.clone()));
            summaries.insert(key, record.clone());
            ordered.push(record);
        }

        let opts = ShapeOptions::new(METHOD)
            .name("summary")
            .excludes(&["description", "icon", "value"])
            .keys(&["key"])
            .help("The summary inventory");
        for record in &ordered {
            ctx.publish(record, &opts);
        }

        ctx.inventory.put_all(EntityKind::Summary, summaries);
        Ok(PollReport {
            records: ordered.len(),
            metrics: ordered.len(),
        })
    }
}
