use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::storage::StorageError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("No files were uploaded.")]
    MissingFile,
    #[error("Invalid request")]
    InvalidRequest,
    #[error("{message}")]
    Multipart { status: StatusCode, message: String },
    #[error("Upload failed")]
    Storage(#[source] StorageError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::MissingFile | ApiError::InvalidRequest => StatusCode::BAD_REQUEST,
            ApiError::Multipart { status, .. } => *status,
            ApiError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        ApiError::Multipart {
            status: err.status(),
            message: err.body_text(),
        }
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        match err {
            // Body-limit and malformed-stream errors surface from the multipart
            // reader mid-write; report them as the reader would.
            StorageError::Source(source) => match source.downcast::<MultipartError>() {
                Ok(multipart) => ApiError::from(*multipart),
                Err(other) => ApiError::Storage(StorageError::Source(other)),
            },
            other => ApiError::Storage(other),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            ApiError::Storage(err) => tracing::error!(error = %err, "image upload failed"),
            ApiError::Multipart { message, .. } => {
                tracing::warn!(status = status.as_u16(), error = %message, "multipart rejected")
            }
            _ => tracing::debug!(status = status.as_u16(), reason = %self, "request rejected"),
        }
        (status, self.to_string()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn plain_text_bodies_match_device_protocol() {
        assert_eq!(ApiError::MissingFile.to_string(), "No files were uploaded.");
        assert_eq!(ApiError::InvalidRequest.to_string(), "Invalid request");
        assert_eq!(ApiError::MissingFile.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn io_failures_become_server_errors() {
        let err = ApiError::from(StorageError::Io(io::Error::new(
            io::ErrorKind::Other,
            "disk full",
        )));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.to_string(), "Upload failed");

        let err = ApiError::from(StorageError::Source("reset".into()));
        assert!(matches!(err, ApiError::Storage(StorageError::Source(_))));
    }
}
