use crate::config::MeasurementValidation;
use crate::storage::UploadStore;

#[derive(Clone)]
pub struct AppState {
    pub store: UploadStore,
    pub measurement_validation: MeasurementValidation,
    pub max_upload_bytes: usize,
}
