use axum::http::HeaderMap;

use crate::config::MeasurementValidation;
use crate::error::ApiError;
use crate::models::{ImageUpload, MeasurementBody, MeasurementReport};

pub const DEVICE_ID_HEADER: &str = "device-id";
pub const TIMESTAMP_HEADER: &str = "timestamp";
pub const FORM_MIME_HEADER: &str = "form-mime";

/// Trimmed header text; empty or non-visible-ASCII values count as absent.
pub fn header_text(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

pub fn decode_measurement(
    headers: &HeaderMap,
    body: &[u8],
    validation: MeasurementValidation,
) -> Result<MeasurementReport, ApiError> {
    // Garbage bodies decode to an empty report; strictness is decided below.
    let body = match serde_json::from_slice::<serde_json::Value>(body) {
        Ok(value @ serde_json::Value::Object(_)) => {
            serde_json::from_value::<MeasurementBody>(value).unwrap_or_default()
        }
        _ => MeasurementBody::default(),
    };
    let report = MeasurementReport {
        device_id: header_text(headers, DEVICE_ID_HEADER),
        timestamp: header_text(headers, TIMESTAMP_HEADER),
        measurement_type: body.measurement_type.map(|kind| match kind {
            serde_json::Value::String(kind) => kind,
            other => other.to_string(),
        }),
        value: body.value,
    };

    match validation {
        MeasurementValidation::Permissive => Ok(report),
        MeasurementValidation::Strict if report.is_complete() => Ok(report),
        MeasurementValidation::Strict => Err(ApiError::InvalidRequest),
    }
}

pub fn decode_image_headers(headers: &HeaderMap) -> Result<ImageUpload, ApiError> {
    let device_id = header_text(headers, DEVICE_ID_HEADER);
    let timestamp = header_text(headers, TIMESTAMP_HEADER);
    let image_mime = header_text(headers, FORM_MIME_HEADER);
    match (device_id, timestamp, image_mime) {
        (Some(device_id), Some(timestamp), Some(image_mime)) => Ok(ImageUpload {
            device_id,
            timestamp,
            image_mime,
        }),
        _ => Err(ApiError::InvalidRequest),
    }
}
