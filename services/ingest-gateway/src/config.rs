use std::{
    net::{IpAddr, Ipv4Addr, SocketAddr},
    path::PathBuf,
    str::FromStr,
};

use ingest_common::env_or;

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_UPLOAD_DIR: &str = "uploads";
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NamingScheme {
    /// `<millis>-<uuid>-<name>`: no two uploads share a name.
    #[default]
    Unique,
    /// `<millis>-<name>`: same millisecond and name overwrite each other.
    Legacy,
}

impl FromStr for NamingScheme {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "unique" => Ok(Self::Unique),
            "legacy" => Ok(Self::Legacy),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MeasurementValidation {
    /// Everything is acknowledged; devices in the field rely on this.
    #[default]
    Permissive,
    Strict,
}

impl FromStr for MeasurementValidation {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "permissive" => Ok(Self::Permissive),
            "strict" => Ok(Self::Strict),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub bind_addr: IpAddr,
    pub port: u16,
    pub upload_dir: PathBuf,
    pub naming: NamingScheme,
    pub measurement_validation: MeasurementValidation,
    pub max_upload_bytes: usize,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            bind_addr: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
            upload_dir: PathBuf::from(DEFAULT_UPLOAD_DIR),
            naming: NamingScheme::default(),
            measurement_validation: MeasurementValidation::default(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

impl GatewayConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            bind_addr: env_or("BIND_ADDR", defaults.bind_addr),
            port: env_or("PORT", defaults.port),
            upload_dir: env_or("UPLOAD_DIR", defaults.upload_dir),
            naming: env_or("UPLOAD_NAMING", defaults.naming),
            measurement_validation: env_or(
                "MEASUREMENT_VALIDATION",
                defaults.measurement_validation,
            ),
            max_upload_bytes: env_or("MAX_UPLOAD_BYTES", defaults.max_upload_bytes),
        }
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_addr, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enum_settings_parse_case_insensitively() {
        assert_eq!("LEGACY".parse::<NamingScheme>(), Ok(NamingScheme::Legacy));
        assert_eq!(
            "Strict".parse::<MeasurementValidation>(),
            Ok(MeasurementValidation::Strict)
        );
        assert!("sometimes".parse::<MeasurementValidation>().is_err());
    }

    #[test]
    fn defaults_match_device_firmware_expectations() {
        let config = GatewayConfig::default();
        assert_eq!(config.socket_addr().to_string(), "0.0.0.0:8080");
        assert_eq!(config.upload_dir, PathBuf::from("uploads"));
        assert_eq!(config.naming, NamingScheme::Unique);
        assert_eq!(config.measurement_validation, MeasurementValidation::Permissive);
    }
}
