use axum::{
    body::Bytes,
    extract::{
        multipart::{MultipartError, MultipartRejection},
        Multipart, State,
    },
    http::{HeaderMap, StatusCode},
    Json,
};

use crate::decode::{decode_image_headers, decode_measurement};
use crate::error::ApiError;
use crate::models::Ack;
use crate::state::AppState;
use crate::storage::StoredImage;

const IMAGE_FIELD: &str = "image";

pub async fn healthz() -> StatusCode {
    StatusCode::OK
}

pub async fn readyz(State(state): State<AppState>) -> StatusCode {
    if state.store.is_ready().await {
        StatusCode::OK
    } else {
        tracing::warn!(dir = %state.store.dir().display(), "upload directory missing");
        StatusCode::SERVICE_UNAVAILABLE
    }
}

pub async fn submit_measurement(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Ack>, ApiError> {
    let report = decode_measurement(&headers, &body, state.measurement_validation)?;

    tracing::info!(
        device_id = report.device_id.as_deref(),
        timestamp = report.timestamp.as_deref(),
        measurement_type = report.measurement_type.as_deref(),
        value = report.value.as_ref().map(tracing::field::display),
        "measurement"
    );

    Ok(Json(Ack::success()))
}

pub async fn submit_image(
    State(state): State<AppState>,
    headers: HeaderMap,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<Ack>, ApiError> {
    // A request that is not multipart carries no file part at all.
    let mut multipart = multipart.map_err(|_| ApiError::MissingFile)?;
    let upload = decode_image_headers(&headers);

    let mut stored: Option<StoredImage> = None;
    while let Some(field) = multipart.next_field().await.map_err(before_file_part)? {
        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }
        // Without a filename the part is a plain form value, not a file.
        let Some(file_name) = field.file_name().map(str::to_string) else {
            continue;
        };
        // Headers are checked only once a file is known to be present, so a
        // missing file wins over missing metadata.
        let upload = upload.as_ref().map_err(|_| ApiError::InvalidRequest)?;
        let image = state.store.write_stream(&file_name, field).await?;
        tracing::debug!(
            device_id = %upload.device_id,
            original = %file_name,
            "image payload stored"
        );
        stored = Some(image);
        // Further parts are left unread.
        break;
    }

    let Some(image) = stored else {
        return Err(ApiError::MissingFile);
    };
    let upload = upload?;

    tracing::info!(
        device_id = %upload.device_id,
        timestamp = %upload.timestamp,
        image_mime = %upload.image_mime,
        file = %image.file_name,
        bytes = image.bytes,
        "image"
    );

    Ok(Json(Ack::success()))
}

// An unreadable stream before any file part still means no file was sent.
// Size limits keep their own status.
fn before_file_part(err: MultipartError) -> ApiError {
    match ApiError::from(err) {
        ApiError::Multipart { status, .. } if status == StatusCode::BAD_REQUEST => {
            ApiError::MissingFile
        }
        other => other,
    }
}
