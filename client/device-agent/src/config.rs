use serde::Deserialize;
use std::{env, path::PathBuf, time::Duration};

use crate::error::AgentError;

#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub device_id: String,
    pub gateway_url: String,
    pub spool_dir: PathBuf,
    pub poll_interval: Duration,
    pub request_timeout: Duration,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct FileConfig {
    pub device_id: Option<String>,
    pub gateway_url: Option<String>,
    pub spool_dir: Option<PathBuf>,
    pub poll_interval_secs: Option<u64>,
    pub request_timeout_secs: Option<u64>,
}

pub fn resolve_config_path() -> PathBuf {
    env::var("DEVICE_AGENT_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("device-agent.toml"))
}

pub fn load_config() -> Result<AgentConfig, AgentError> {
    let config_path = resolve_config_path();

    let file_config = if config_path.exists() {
        let content = std::fs::read_to_string(&config_path)
            .map_err(|err| AgentError::Config(format!("read {}: {err}", config_path.display())))?;
        toml::from_str::<FileConfig>(&content)
            .map_err(|err| AgentError::Config(format!("parse {}: {err}", config_path.display())))?
    } else {
        FileConfig::default()
    };

    Ok(merge(file_config, |key| env::var(key).ok()))
}

/// Combines file settings with overrides from `lookup`; overrides win.
pub fn merge(file: FileConfig, lookup: impl Fn(&str) -> Option<String>) -> AgentConfig {
    let secs = |key: &str, file_value: Option<u64>, default: u64| {
        lookup(key)
            .and_then(|value| value.trim().parse::<u64>().ok())
            .or(file_value)
            .filter(|secs| *secs > 0)
            .unwrap_or(default)
    };

    let device_id = lookup("DEVICE_ID")
        .or(file.device_id)
        .unwrap_or_else(|| "1".to_string());
    let gateway_url = lookup("GATEWAY_URL")
        .or(file.gateway_url)
        .unwrap_or_else(|| "http://localhost:8080".to_string());
    let spool_dir = lookup("SPOOL_DIR")
        .map(PathBuf::from)
        .or(file.spool_dir)
        .unwrap_or_else(|| PathBuf::from("spool"));

    AgentConfig {
        device_id,
        gateway_url: gateway_url.trim_end_matches('/').to_string(),
        spool_dir,
        poll_interval: Duration::from_secs(secs(
            "POLL_INTERVAL_SECS",
            file.poll_interval_secs,
            30,
        )),
        request_timeout: Duration::from_secs(secs(
            "REQUEST_TIMEOUT_SECS",
            file.request_timeout_secs,
            30,
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults_without_file_or_env() {
        let config = merge(FileConfig::default(), |_| None);
        assert_eq!(config.device_id, "1");
        assert_eq!(config.gateway_url, "http://localhost:8080");
        assert_eq!(config.spool_dir, PathBuf::from("spool"));
        assert_eq!(config.poll_interval, Duration::from_secs(30));
    }

    #[test]
    fn env_overrides_file() {
        let file: FileConfig = toml::from_str(
            r#"
            device_id = "file-device"
            gateway_url = "http://gateway:8080/"
            poll_interval_secs = 5
            "#,
        )
        .unwrap();
        let env: HashMap<&str, &str> = [("DEVICE_ID", "env-device"), ("POLL_INTERVAL_SECS", "x")]
            .into_iter()
            .collect();

        let config = merge(file, |key| env.get(key).map(|value| value.to_string()));

        assert_eq!(config.device_id, "env-device");
        assert_eq!(config.gateway_url, "http://gateway:8080");
        // Unparseable override falls through to the file value.
        assert_eq!(config.poll_interval, Duration::from_secs(5));
    }
}
