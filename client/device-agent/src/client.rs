use reqwest::{multipart, Client, Response};
use serde::{Deserialize, Serialize};
use std::{
    path::Path,
    time::{SystemTime, UNIX_EPOCH},
};

use crate::config::AgentConfig;
use crate::error::AgentError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    pub measurement_type: String,
    pub value: serde_json::Value,
}

impl Measurement {
    /// Numeric text is sent as a JSON number, anything else as a string.
    pub fn parse(measurement_type: &str, raw_value: &str) -> Self {
        let value = raw_value
            .trim()
            .parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
            .map(serde_json::Value::Number)
            .unwrap_or_else(|| serde_json::Value::String(raw_value.to_string()));
        Self {
            measurement_type: measurement_type.to_string(),
            value,
        }
    }
}

#[derive(Deserialize)]
struct Ack {
    state: String,
}

#[derive(Clone)]
pub struct GatewayClient {
    http: Client,
    base_url: String,
    device_id: String,
}

impl GatewayClient {
    pub fn new(config: &AgentConfig) -> Result<Self, AgentError> {
        let http = Client::builder().timeout(config.request_timeout).build()?;
        Ok(Self {
            http,
            base_url: config.gateway_url.clone(),
            device_id: config.device_id.clone(),
        })
    }

    pub async fn send_measurement(&self, measurement: &Measurement) -> Result<(), AgentError> {
        let url = format!("{}/api/v1/measurement", self.base_url);
        let response = self
            .http
            .post(url)
            .header("Device-Id", &self.device_id)
            .header("Timestamp", unix_timestamp())
            .json(measurement)
            .send()
            .await?;
        check_ack(response).await?;
        tracing::info!(
            measurement_type = %measurement.measurement_type,
            value = %measurement.value,
            "measurement sent"
        );
        Ok(())
    }

    pub async fn upload_image(&self, path: &Path) -> Result<(), AgentError> {
        let mime =
            image_mime(path).ok_or_else(|| AgentError::UnsupportedImage(path.to_path_buf()))?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image.bin".to_string());
        let bytes = tokio::fs::read(path).await?;
        let size = bytes.len();

        let part = multipart::Part::bytes(bytes)
            .file_name(file_name.clone())
            .mime_str("application/octet-stream")?;
        let form = multipart::Form::new().part("image", part);

        let url = format!("{}/api/v1/image", self.base_url);
        let response = self
            .http
            .post(url)
            .header("Device-Id", &self.device_id)
            .header("Timestamp", unix_timestamp())
            .header("Form-Mime", mime)
            .multipart(form)
            .send()
            .await?;
        check_ack(response).await?;
        tracing::info!(file = %file_name, bytes = size, mime, "image uploaded");
        Ok(())
    }
}

async fn check_ack(response: Response) -> Result<(), AgentError> {
    let status = response.status();
    let body = response.text().await?;
    if status.is_success() && is_success_ack(&body) {
        return Ok(());
    }
    Err(AgentError::Rejected {
        status: status.as_u16(),
        body,
    })
}

pub fn is_success_ack(body: &str) -> bool {
    serde_json::from_str::<Ack>(body)
        .map(|ack| ack.state == "success")
        .unwrap_or(false)
}

pub fn image_mime(path: &Path) -> Option<&'static str> {
    let extension = path.extension()?.to_str()?.to_ascii_lowercase();
    match extension.as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "bmp" => Some("image/bmp"),
        "gif" => Some("image/gif"),
        _ => None,
    }
}

fn unix_timestamp() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or_default()
        .to_string()
}
