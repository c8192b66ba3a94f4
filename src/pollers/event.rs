//! `event::changes` requester
//!
//! Jeedom keeps a journal of recent changes. The requester holds a cursor (a
//! server timestamp in seconds) and each tick asks for everything newer. The
//! cursor starts at the server's `datetime` minus `since`, then follows the
//! `datetime` of each answer, empty answers included.
//!
//! # Correlation
//!
//! `cmd::update` events only carry a `cmd_id`. The `cmd`, `eqLogic` and
//! `jeeObject` inventories turn it into a subtype and a
//! `[object][equipment][command]` human name. Missing entries are not an
//! error: the event is published with whatever resolved.

use super::{millis, PollReport, Poller};
use crate::config::{Config, EventChangesConfig, TracesConfig};
use crate::context::ExporterContext;
use crate::error::{ExporterError, Result};
use crate::inventory::EntityKind;
use crate::jeedom::types::{as_f64, id_string, scalar_string, ChangeEvent, EventChanges};
use crate::jeedom::Record;
use crate::shaper::ShapeOptions;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

const METHOD: &str = "event::changes";

/// Events known to carry nothing worth publishing
const IGNORED: &[&str] = &[
    "checkThemechange",
    "jeeObject::summary::update",
    "message::refreshMessageNumber",
];

pub struct EventPoller {
    interval: Duration,
    since: Duration,
    traces: TracesConfig,
    cursor: Option<f64>,
}

impl EventPoller {
    pub fn new(changes: &EventChangesConfig) -> Self {
        Self {
            interval: millis(changes.interval),
            since: millis(changes.since),
            traces: changes.traces.clone(),
            cursor: None,
        }
    }

    pub fn from_config(config: &Config) -> Option<Self> {
        let changes = &config.requesters.event.changes;
        changes.enabled.then(|| Self::new(changes))
    }

    /// Server timestamp the next request starts from
    pub fn cursor(&self) -> Option<f64> {
        self.cursor
    }

    async fn seed(&mut self, ctx: &ExporterContext) -> Result<f64> {
        let now = ctx.client.call("datetime", None).await?;
        let now = as_f64(&now)
            .ok_or_else(|| ExporterError::malformed("datetime", "expected a timestamp"))?;
        let cursor = now - self.since.as_secs_f64();
        debug!("Event cursor seeded at {}", cursor);
        self.cursor = Some(cursor);
        Ok(cursor)
    }

    /// Publish one change; true when a metric was published
    fn dispatch(&self, ctx: &ExporterContext, event: &ChangeEvent, stamp: f64) -> bool {
        let mut option = event.option_record();
        option.insert("name".to_string(), Value::String(event.name.clone()));
        let stamp = as_f64(&event.datetime).unwrap_or(stamp);

        match event.name.as_str() {
            "cmd::update" => {
                self.publish_cmd_update(ctx, option);
                true
            }
            "eqLogic::update" => {
                let opts = ShapeOptions::new(METHOD)
                    .suffix("_stamp")
                    .keys(&["eqLogic_id"])
                    .value(stamp)
                    .help("The last update of a logical equipment")
                    .trace(self.traces.metrics);
                ctx.publish(&option, &opts);
                true
            }
            "scenario::update" => {
                let opts = ShapeOptions::new(METHOD)
                    .suffix("_stamp")
                    .excludes(&["lastLaunch"])
                    .keys(&["scenario_id"])
                    .value(stamp)
                    .help("The last update of a scenario")
                    .trace(self.traces.metrics);
                ctx.publish(&option, &opts);
                true
            }
            "notify" => {
                if option.get("category").and_then(Value::as_str) != Some("message") {
                    debug!("Unhandled notify event: {:?}", event.option);
                }
                false
            }
            name if IGNORED.contains(&name) || name.ends_with("::dependancy_end") => false,
            name if name.ends_with("::driverStatus") => {
                let opts = ShapeOptions::new(METHOD)
                    .keys(&["name"])
                    .help("The status of a plugin driver daemon")
                    .trace(self.traces.metrics);
                ctx.publish(&option, &opts);
                true
            }
            name => {
                debug!("Unhandled event {}: {:?}", name, event.option);
                false
            }
        }
    }

    fn publish_cmd_update(&self, ctx: &ExporterContext, mut option: Record) {
        let cmd_id = option.get("cmd_id").and_then(id_string);
        let cmd = cmd_id
            .as_deref()
            .and_then(|id| ctx.inventory.get(EntityKind::Cmd, id));

        let mut cmd_name = None;
        let mut eq_logic_id = None;
        match &cmd {
            Some(cmd) => {
                if let Some(sub_type) = cmd.get("subType") {
                    option.insert("subType".to_string(), sub_type.clone());
                }
                cmd_name = text(cmd, "name");
                eq_logic_id = cmd.get("eqLogic_id").and_then(id_string);
            }
            None => debug!("Command {:?} not found in the inventory", cmd_id),
        }

        let eq_logic = eq_logic_id.and_then(|id| ctx.inventory.get(EntityKind::EqLogic, &id));
        let eq_logic_name = eq_logic.as_ref().and_then(|eq| text(eq, "name"));
        let object = eq_logic
            .as_ref()
            .and_then(|eq| eq.get("object_id").and_then(id_string))
            .and_then(|id| ctx.inventory.get(EntityKind::JeeObject, &id));
        let object_name = object.as_ref().and_then(|object| text(object, "name"));

        if let (Some(object), Some(eq_logic), Some(cmd)) = (object_name, eq_logic_name, cmd_name) {
            option.insert(
                "humanName".to_string(),
                Value::String(format!("[{}][{}][{}]", object, eq_logic, cmd)),
            );
        }

        let is_string = option.get("subType").and_then(Value::as_str) == Some("string");
        let numeric = option.get("value").and_then(as_f64);
        let value = match numeric {
            Some(number) if !is_string => {
                option.shift_remove("value");
                number
            }
            _ => 1.0,
        };

        let opts = ShapeOptions::new(METHOD)
            .excludes(&["display_value", "valueDate", "collectDate"])
            .keys(&["cmd_id"])
            .value(value)
            .help("The last value of the update of a command")
            .trace(self.traces.metrics);
        ctx.publish(&option, &opts);
    }
}

/// Non-empty scalar field as text
fn text(record: &Record, field: &str) -> Option<String> {
    record
        .get(field)
        .and_then(scalar_string)
        .filter(|s| !s.is_empty())
}

impl Poller for EventPoller {
    fn name(&self) -> &'static str {
        "event.changes"
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    async fn init(&mut self, ctx: &ExporterContext) -> Result<()> {
        self.seed(ctx).await.map(|_| ())
    }

    async fn poll(&mut self, ctx: &ExporterContext) -> Result<PollReport> {
        let cursor = match self.cursor {
            Some(cursor) => cursor,
            None => self.seed(ctx).await?,
        };

        let answer = ctx
            .client
            .call(METHOD, Some(json!({ "datetime": cursor })))
            .await?;
        if self.traces.rpc {
            debug!("{} answer: {}", METHOD, answer);
        }

        let changes = EventChanges::from_result(&answer)
            .ok_or_else(|| ExporterError::malformed(METHOD, "missing datetime"))?;
        self.cursor = Some(changes.datetime);

        let metrics = changes
            .events
            .iter()
            .filter(|event| self.dispatch(ctx, event, changes.datetime))
            .count();

        Ok(PollReport {
            records: changes.events.len(),
            metrics,
        })
    }
}
