pub mod client;
pub mod types;

pub use client::DomoticzClient;
pub use types::{Device, DeviceResponse, MetricEnvelope};
