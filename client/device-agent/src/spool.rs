use std::path::{Path, PathBuf};
use tokio::fs;

use crate::client::{image_mime, GatewayClient, Measurement};
use crate::error::AgentError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpoolItem {
    Measurement(PathBuf),
    Image(PathBuf),
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DrainReport {
    pub sent: usize,
    pub failed: usize,
    pub quarantined: usize,
}

// Name order is capture order for timestamped files.
pub async fn scan(dir: &Path) -> Result<Vec<SpoolItem>, AgentError> {
    let mut entries = fs::read_dir(dir).await?;
    let mut items = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        if !entry.file_type().await?.is_file() {
            continue;
        }
        let path = entry.path();
        let is_json = path
            .extension()
            .and_then(|extension| extension.to_str())
            .is_some_and(|extension| extension.eq_ignore_ascii_case("json"));
        if is_json {
            items.push(SpoolItem::Measurement(path));
        } else if image_mime(&path).is_some() {
            items.push(SpoolItem::Image(path));
        }
    }
    items.sort_by(|a, b| a.path().cmp(b.path()));
    Ok(items)
}

impl SpoolItem {
    pub fn path(&self) -> &Path {
        match self {
            SpoolItem::Measurement(path) | SpoolItem::Image(path) => path,
        }
    }
}

pub async fn drain(client: &GatewayClient, dir: &Path) -> Result<DrainReport, AgentError> {
    let mut report = DrainReport::default();
    for item in scan(dir).await? {
        let result = match &item {
            SpoolItem::Measurement(path) => match read_measurement(path).await {
                Ok(measurement) => client.send_measurement(&measurement).await,
                Err(err) => Err(err),
            },
            SpoolItem::Image(path) => client.upload_image(path).await,
        };

        match result {
            Ok(()) => {
                report.sent += 1;
                remove_sent(item.path()).await;
            }
            Err(err @ AgentError::Spool { .. }) => {
                tracing::warn!(error = %err, "quarantining spool file");
                let mut bad = item.path().as_os_str().to_owned();
                bad.push(".bad");
                fs::rename(item.path(), PathBuf::from(bad)).await?;
                report.quarantined += 1;
            }
            Err(err) => {
                tracing::warn!(
                    error = %err,
                    path = %item.path().display(),
                    "spool item not delivered"
                );
                report.failed += 1;
            }
        }
    }
    Ok(report)
}

// A leftover file is resent on the next pass.
async fn remove_sent(path: &Path) -> bool {
    match fs::remove_file(path).await {
        Ok(()) => true,
        Err(err) => {
            tracing::warn!(error = %err, path = %path.display(), "sent spool item not removed");
            false
        }
    }
}

async fn read_measurement(path: &Path) -> Result<Measurement, AgentError> {
    let content = fs::read(path).await?;
    serde_json::from_slice(&content).map_err(|source| AgentError::Spool {
        path: path.to_path_buf(),
        source,
    })
}
