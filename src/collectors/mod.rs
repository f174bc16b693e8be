//! Metrics Collectors
//!
//! This module turns Domoticz API responses into Prometheus samples.
//!
//! # Architecture
//!
//! Collectors follow a consistent pattern:
//! - Accept a `CollectionContext` containing shared state
//! - Query the Domoticz API
//! - Update Prometheus metrics through [`MetricsCollector`]
//! - Return `CollectionResult` (`Success` when every query went through, `Failed` otherwise)
//!
//! # Error Handling
//!
//! Device failures are non-fatal - they are logged and reported as
//! `CollectionStatus::Failed`. Whatever was recorded before (or, depending on
//! the [`ErrorPolicy`](crate::config::ErrorPolicy), after) the failure is still exposed.

use crate::config::ScrapeConfig;
use crate::domoticz::DomoticzClient;
use crate::metrics::MetricsCollector;

/// Shared context passed to all collectors
///
/// This struct uses public fields for ergonomic access patterns.
/// All fields are immutable references, so no invariants can be violated.
#[derive(Clone, Copy)]
pub struct CollectionContext<'a> {
    /// Domoticz API client
    pub client: &'a DomoticzClient,
    /// Metrics collector for updating Prometheus metrics
    pub metrics: &'a MetricsCollector,
    /// Scrape behavior (error policy, fetch concurrency)
    pub config: &'a ScrapeConfig,
    /// Device ids to fetch, in configuration order
    pub device_ids: &'a [String],
}

/// Status of a metrics collection operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionStatus {
    /// Every device was fetched and translated
    Success,
    /// At least one device failed (already logged)
    Failed,
}

/// Result type for collector functions
///
/// - `Ok(CollectionStatus::Success)` = Collection succeeded
/// - `Ok(CollectionStatus::Failed)` = Collection failed but non-fatal (logged)
/// - `Err(_)` = Fatal error (should propagate)
pub type CollectionResult = Result<CollectionStatus, anyhow::Error>;

pub mod device;

pub use device::collect_device_metrics;
