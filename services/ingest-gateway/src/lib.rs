//! HTTP ingestion gateway for device measurements and image uploads.

pub mod app;
pub mod config;
pub mod decode;
pub mod error;
pub mod handlers;
pub mod models;
pub mod server;
pub mod state;
pub mod storage;

pub use config::{GatewayConfig, MeasurementValidation, NamingScheme};
pub use server::Gateway;
