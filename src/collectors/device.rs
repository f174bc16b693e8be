//! Device Metrics Collector
//!
//! Fetches every configured device from Domoticz and records its readings.
//!
//! # Metrics Produced
//! - `domoticz_temperature` - Device temperature, for devices with `TypeImg` `temperature`
//!   - Labels: id, name
//!
//! Other families in [`METRIC_FAMILIES`](crate::metrics::METRIC_FAMILIES) are
//! filled the same way once they gain a `TypeImg` mapping.

use super::{CollectionContext, CollectionResult, CollectionStatus};
use crate::config::ErrorPolicy;
use crate::domoticz::{Device, DomoticzClient};
use crate::error::Result;
use futures_util::stream::{self, StreamExt};
use tracing::{debug, error, info, warn};

/// Collects device metrics from Domoticz
///
/// Devices are fetched in configuration order, at most
/// `max_concurrent_fetches` at a time, and always translated in that same
/// order. A failing device (transport, decode or a result count other than one)
/// is handled according to the configured [`ErrorPolicy`]:
///
/// - `AbortOnFirstError` stops the cycle; no fetch starts after the failing id
///   beyond those already in flight
/// - `SkipAndContinue` logs the failure and moves on
///
/// # Returns
///
/// * `Ok(CollectionStatus::Success)` - Every device was fetched
/// * `Ok(CollectionStatus::Failed)` - At least one device failed (logged)
pub async fn collect_device_metrics(ctx: &CollectionContext<'_>) -> CollectionResult {
    info!("Domoticz scrape starting for {} devices", ctx.device_ids.len());

    let client = ctx.client;
    let mut fetches = stream::iter(ctx.device_ids.iter().cloned())
        .map(move |id| async move {
            let result = fetch_single_device(client, &id).await;
            (id, result)
        })
        .buffered(ctx.config.max_concurrent_fetches.max(1));

    let mut status = CollectionStatus::Success;
    let mut samples = 0;

    while let Some((id, result)) = fetches.next().await {
        match result {
            Ok(device) => {
                let recorded = ctx.metrics.record_device(&device, &id);
                if recorded == 0 {
                    debug!(
                        device_id = %id,
                        type_img = %device.type_img,
                        "No metric family for device '{}'", device.name
                    );
                }
                samples += recorded;
            }
            Err(e) => {
                status = CollectionStatus::Failed;
                match ctx.config.error_policy {
                    ErrorPolicy::AbortOnFirstError => {
                        error!(device_id = %id, "Domoticz error, aborting scrape: {}", e);
                        break;
                    }
                    ErrorPolicy::SkipAndContinue => {
                        warn!(device_id = %id, "Domoticz error, skipping device: {}", e);
                    }
                }
            }
        }
    }

    info!("Domoticz scrape finished with {} samples", samples);
    Ok(status)
}

async fn fetch_single_device(client: &DomoticzClient, id: &str) -> Result<Device> {
    client.fetch_device(id).await?.into_single_device(id)
}
