//! Jeedom Prometheus Exporter
//!
//! Polls the JSON-RPC API of a Jeedom home-automation controller, keeps an
//! in-memory inventory of what it finds, and republishes selected facts as
//! Prometheus metrics.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐    HTTP POST     ┌──────────────────────────┐
//! │   Jeedom    │ ◄──────────────► │         Exporter         │
//! │ jeeApi.php  │   JSON-RPC 2.0   │                          │
//! └─────────────┘                  │  requesters ─► inventory │      HTTP      ┌────────────┐
//!                                  │      │                   │ ◄────────────► │ Prometheus │
//!                                  │      ▼                   │    /metrics    └────────────┘
//!                                  │  shaper ─► registry      │
//!                                  └──────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`jeedom`] - JSON-RPC client and the few typed payloads
//! - [`pollers`] - one scheduled requester per entity kind
//! - [`inventory`] - last known record per entity
//! - [`shaper`] - record to metric conversion
//! - [`metrics`] - deduplicating metric registry and text rendering
//! - [`stats`] - the exporter's own request statistics
//! - [`context`] - state shared by requesters and handlers
//! - [`server`] - HTTP endpoints
//! - [`config`] - configuration management
//! - [`error`] - error types
//!
//! # Quick Start
//!
//! ```no_run
//! use jeedom_exporter::{config::Config, server};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("/etc/prometheus/jeedom_exporter.yml", true)?;
//!     config.validate()?;
//!     server::start(config).await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod context;
pub mod error;
pub mod inventory;
pub mod jeedom;
pub mod metrics;
pub mod pollers;
pub mod server;
pub mod shaper;
pub mod stats;
