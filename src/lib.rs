//! Domoticz Prometheus Exporter
//!
//! A Prometheus metrics exporter for the Domoticz home automation system.
//!
//! # Overview
//!
//! On every scrape the exporter queries the Domoticz HTTP JSON API for each
//! configured device and translates its readings into `domoticz_*` gauges.
//! A webhook endpoint accepts events pushed by Domoticz.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐   HTTP GET json.htm   ┌──────────────┐
//! │  Domoticz   │ ◄──────────────────── │   Exporter   │
//! │     hub     │                       │              │
//! │             │ ────────────────────► │  ┌────────┐  │      HTTP      ┌────────────┐
//! └─────────────┘   POST /domoticz      │  │ Client │  │ ◄────────────► │ Prometheus │
//!                                       │  └────────┘  │   /metrics     └────────────┘
//!                                       │  ┌────────┐  │
//!                                       │  │Metrics │  │
//!                                       │  └────────┘  │
//!                                       └──────────────┘
//! ```
//!
//! # Modules
//!
//! - [`domoticz`] - HTTP client and API type definitions
//! - [`metrics`] - Prometheus metric family table and registry
//! - [`collectors`] - Translation of devices into samples
//! - [`server`] - HTTP server, scrape and push handlers
//! - [`config`] - Configuration management
//! - [`error`] - Error types
//!
//! # Quick Start
//!
//! ```no_run
//! use domoticz_exporter::{config::Config, server};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config/Default.toml")?;
//!     server::start(config).await?;
//!     Ok(())
//! }
//! ```

pub mod collectors;
pub mod config;
pub mod domoticz;
pub mod error;
pub mod metrics;
pub mod server;
