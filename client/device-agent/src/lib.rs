//! Store-and-forward client that reports device data to the ingestion gateway.

pub mod client;
pub mod config;
pub mod error;
pub mod spool;

pub use client::{GatewayClient, Measurement};
pub use config::{load_config, AgentConfig};
pub use error::AgentError;
