//! Domoticz API Type Definitions
//!
//! Structs for the JSON documents served by `json.htm?type=devices` and for the
//! payloads the hub pushes to the exporter.
//!
//! # Design Notes
//!
//! - **Completeness**: [`Device`] carries every field the hub reports, even the
//!   bookkeeping ones no metric uses, so responses decode without loss.
//! - **Serde Defaults**: every field has a default. The hub omits fields freely
//!   depending on the device type, and omits `result` entirely when nothing matches.
//! - **Null tolerance**: an explicit `null` decodes like a missing field.
//! - **Lenient numbers**: `SignalLevel` is `"-"` for wired hardware, decoded as `None`.

#![allow(dead_code)] // Allow unused fields in API structs for completeness
use crate::error::{ExporterError, Result};
use serde::{Deserialize, Deserializer};

/// Envelope returned for both the device list and single device queries
#[derive(Debug, Deserialize, Clone, Default)]
pub struct DeviceResponse {
    #[serde(default, deserialize_with = "null_as_default")]
    pub status: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(rename = "ActTime", default, deserialize_with = "null_as_default")]
    pub act_time: i64,
    #[serde(rename = "ServerTime", default, deserialize_with = "null_as_default")]
    pub server_time: String,
    #[serde(rename = "Sunrise", default, deserialize_with = "null_as_default")]
    pub sunrise: String,
    #[serde(rename = "Sunset", default, deserialize_with = "null_as_default")]
    pub sunset: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub result: Vec<Device>,
}

impl DeviceResponse {
    /// Unwraps the only device of a single device query
    ///
    /// Zero or several results are a shape error for `id`.
    pub fn into_single_device(self, id: &str) -> Result<Device> {
        let mut result = self.result;
        match result.len() {
            1 => Ok(result.remove(0)),
            count => Err(ExporterError::UnexpectedResultCount {
                id: id.to_string(),
                count,
            }),
        }
    }
}

/// A sensor or actuator as reported by the hub
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
#[serde(rename_all = "PascalCase", default)]
pub struct Device {
    #[serde(deserialize_with = "null_as_default")]
    pub addj_multi: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub addj_multi2: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub addj_value: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub addj_value2: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub battery_level: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub custom_image: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub data: String,
    #[serde(deserialize_with = "null_as_default")]
    pub dew_point: String,
    #[serde(deserialize_with = "null_as_default")]
    pub favorite: i64,
    #[serde(rename = "HardwareID", deserialize_with = "null_as_default")]
    pub hardware_id: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub hardware_name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub have_timeout: bool,
    #[serde(deserialize_with = "null_as_default")]
    pub humidity: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub humidity_status: String,
    #[serde(rename = "ID", deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub last_update: String,
    #[serde(deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub notifications: String,
    #[serde(rename = "PlanID", deserialize_with = "null_as_default")]
    pub plan_id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub protected: bool,
    #[serde(deserialize_with = "null_as_default")]
    pub show_notifications: bool,
    #[serde(deserialize_with = "deserialize_signal_level")]
    pub signal_level: Option<i64>,
    #[serde(deserialize_with = "null_as_default")]
    pub sub_type: String,
    #[serde(deserialize_with = "null_as_default")]
    pub temp: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub timers: String,
    #[serde(rename = "Type", deserialize_with = "null_as_default")]
    pub device_type: String,
    #[serde(deserialize_with = "null_as_default")]
    pub type_img: String,
    #[serde(deserialize_with = "null_as_default")]
    pub unit: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub used: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub x_offset: String,
    #[serde(deserialize_with = "null_as_default")]
    pub y_offset: String,
    #[serde(rename = "idx", deserialize_with = "null_as_default")]
    pub idx: String,
}

/// Decodes an explicit JSON `null` as the field's default value
fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn deserialize_signal_level<'de, D>(deserializer: D) -> std::result::Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: serde_json::Value = Deserialize::deserialize(deserializer)?;
    match value {
        serde_json::Value::Number(number) => Ok(number
            .as_i64()
            .or_else(|| number.as_f64().map(|level| level as i64))),
        serde_json::Value::String(text) => Ok(text.trim().parse().ok()),
        serde_json::Value::Null => Ok(None),
        _ => Err(serde::de::Error::custom(
            "expected SignalLevel to be a number or a string",
        )),
    }
}

/// Payload pushed by the hub to the webhook endpoint
///
/// The hub's push contract does not fix a field set, so the envelope keeps the
/// whole JSON object. Only objects are accepted.
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
#[serde(transparent)]
pub struct MetricEnvelope {
    pub fields: serde_json::Map<String, serde_json::Value>,
}

impl MetricEnvelope {
    pub fn idx(&self) -> Option<String> {
        self.fields.get("idx").and_then(scalar_to_string)
    }

    pub fn name(&self) -> Option<String> {
        self.fields
            .get("name")
            .or_else(|| self.fields.get("Name"))
            .and_then(scalar_to_string)
    }
}

fn scalar_to_string(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(text) => Some(text.clone()),
        serde_json::Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}
