use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Serialize)]
pub struct Ack {
    pub state: &'static str,
}

impl Ack {
    pub fn success() -> Self {
        Self { state: "success" }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum MeasurementValue {
    Number(f64),
    Text(String),
    // Anything else a device sent; only kept for the log line.
    Raw(serde_json::Value),
}

impl MeasurementValue {
    pub fn is_typed(&self) -> bool {
        matches!(self, MeasurementValue::Number(_) | MeasurementValue::Text(_))
    }
}

impl fmt::Display for MeasurementValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MeasurementValue::Number(value) => write!(f, "{value}"),
            MeasurementValue::Text(value) => f.write_str(value),
            MeasurementValue::Raw(value) => write!(f, "{value}"),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct MeasurementBody {
    pub measurement_type: Option<serde_json::Value>,
    pub value: Option<MeasurementValue>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeasurementReport {
    pub device_id: Option<String>,
    pub timestamp: Option<String>,
    pub measurement_type: Option<String>,
    pub value: Option<MeasurementValue>,
}

impl MeasurementReport {
    pub fn is_complete(&self) -> bool {
        self.device_id.is_some()
            && self.timestamp.is_some()
            && self.measurement_type.is_some()
            && self.value.as_ref().is_some_and(MeasurementValue::is_typed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageUpload {
    pub device_id: String,
    pub timestamp: String,
    pub image_mime: String,
}
