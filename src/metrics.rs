//! Prometheus Metrics Definitions
//!
//! This module defines all Prometheus metrics exposed by the Domoticz exporter.
//!
//! # Metric Families
//!
//! Device metrics are declared in [`METRIC_FAMILIES`], a table that maps a
//! device's `TypeImg` to the gauge family its reading lands in. Adding a family
//! is a new table row, not new branching in the collector.
//!
//! | Family                 | `TypeImg`     | Reading |
//! |------------------------|---------------|---------|
//! | `domoticz_temperature` | `temperature` | `Temp`  |
//! | `domoticz_weather`     | -             | -       |
//! | `domoticz_light`       | -             | -       |
//! | `domoticz_utility`     | -             | -       |
//!
//! Families without a mapping are still registered and described, so the
//! declared metric surface stays the same across scrapes.
//!
//! All device families are `GaugeVec`s labeled by `id` and `name`. The scalar
//! `domoticz_up` gauge reports whether the last scrape cycle went through.

use crate::domoticz::Device;
use prometheus::core::Collector;
use prometheus::{Encoder, Gauge, GaugeVec, Opts, Registry, TextEncoder};
use std::sync::Arc;

pub const NAMESPACE: &str = "domoticz";

/// Label dimensions shared by every device family
pub const DEVICE_LABELS: [&str; 2] = ["id", "name"];

/// A gauge family exported for devices
pub struct MetricFamily {
    pub name: &'static str,
    pub help: &'static str,
    /// Which devices feed this family, `None` for declared-only families
    pub source: Option<FamilySource>,
}

pub struct FamilySource {
    pub type_img: &'static str,
    pub reading: fn(&Device) -> f64,
}

pub static METRIC_FAMILIES: &[MetricFamily] = &[
    MetricFamily {
        name: "temperature",
        help: "Temperature reported by the device",
        source: Some(FamilySource {
            type_img: "temperature",
            reading: temperature_reading,
        }),
    },
    MetricFamily {
        name: "weather",
        help: "Weather reading reported by the device",
        source: None,
    },
    MetricFamily {
        name: "light",
        help: "Light state reported by the device",
        source: None,
    },
    MetricFamily {
        name: "utility",
        help: "Utility meter reading reported by the device",
        source: None,
    },
];

fn temperature_reading(device: &Device) -> f64 {
    device.temp
}

struct FamilyGauge {
    family: &'static MetricFamily,
    gauge: GaugeVec,
}

/// Metrics collector for Domoticz
#[derive(Clone)]
pub struct MetricsCollector {
    registry: Arc<Registry>,
    families: Arc<Vec<FamilyGauge>>,
    pub up: Arc<Gauge>,
}

impl MetricsCollector {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let mut families = Vec::with_capacity(METRIC_FAMILIES.len());
        for family in METRIC_FAMILIES {
            let gauge = GaugeVec::new(
                Opts::new(family.name, family.help).namespace(NAMESPACE),
                &DEVICE_LABELS,
            )?;
            registry.register(Box::new(gauge.clone()))?;
            families.push(FamilyGauge { family, gauge });
        }

        let up = Gauge::with_opts(
            Opts::new(
                "up",
                "Whether the last scrape of the Domoticz hub completed without errors (1=yes, 0=no)",
            )
            .namespace(NAMESPACE),
        )?;
        registry.register(Box::new(up.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            families: Arc::new(families),
            up: Arc::new(up),
        })
    }

    /// Gauge of the family with the given short name (e.g. `temperature`)
    pub fn family(&self, name: &str) -> Option<&GaugeVec> {
        self.families
            .iter()
            .find(|entry| entry.family.name == name)
            .map(|entry| &entry.gauge)
    }

    /// Records the readings of one device and returns how many samples were set
    ///
    /// The `id` label is the device's `idx`, or `requested_id` when the hub left
    /// it empty. Devices whose `TypeImg` no family maps produce nothing.
    pub fn record_device(&self, device: &Device, requested_id: &str) -> usize {
        let id = if device.idx.is_empty() {
            requested_id
        } else {
            device.idx.as_str()
        };

        let mut recorded = 0;
        for entry in self.families.iter() {
            let Some(source) = &entry.family.source else {
                continue;
            };
            if source.type_img != device.type_img {
                continue;
            }

            entry
                .gauge
                .with_label_values(&[id, device.name.as_str()])
                .set((source.reading)(device));
            recorded += 1;
        }
        recorded
    }

    /// Fully qualified names of every declared metric, populated or not
    pub fn describe(&self) -> Vec<String> {
        self.families
            .iter()
            .flat_map(|entry| entry.gauge.desc())
            .chain(self.up.desc())
            .map(|desc| desc.fq_name.clone())
            .collect()
    }

    /// Drop every device sample (run before a fresh scrape)
    pub fn reset_devices(&self) {
        for entry in self.families.iter() {
            entry.gauge.reset();
        }
    }

    /// Render metrics in Prometheus text format
    pub fn render(&self) -> anyhow::Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}
