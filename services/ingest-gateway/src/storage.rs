use axum::body::Bytes;
use futures_util::{Stream, StreamExt};
use std::{
    io,
    path::{Path, PathBuf},
    time::{SystemTime, UNIX_EPOCH},
};
use tokio::{fs, io::AsyncWriteExt};
use uuid::Uuid;

use crate::config::NamingScheme;

const FALLBACK_FILE_NAME: &str = "upload.bin";
const MAX_NAME_BYTES: usize = 100;
const MAX_EXTENSION_BYTES: usize = 16;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("upload directory {path} unavailable: {source}")]
    Directory { path: PathBuf, source: io::Error },
    #[error("write failed: {0}")]
    Io(#[from] io::Error),
    #[error("payload stream interrupted: {0}")]
    Source(Box<dyn std::error::Error + Send + Sync>),
}

#[derive(Debug, Clone)]
pub struct StoredImage {
    pub file_name: String,
    pub path: PathBuf,
    pub bytes: u64,
}

#[derive(Debug, Clone)]
pub struct UploadStore {
    dir: PathBuf,
    naming: NamingScheme,
}

impl UploadStore {
    pub fn open(dir: impl Into<PathBuf>, naming: NamingScheme) -> Result<Self, StorageError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|source| StorageError::Directory {
            path: dir.clone(),
            source,
        })?;
        Ok(Self { dir, naming })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub async fn is_ready(&self) -> bool {
        fs::metadata(&self.dir)
            .await
            .map(|metadata| metadata.is_dir())
            .unwrap_or(false)
    }

    pub async fn write_stream<S, E>(
        &self,
        original_name: &str,
        chunks: S,
    ) -> Result<StoredImage, StorageError>
    where
        S: Stream<Item = Result<Bytes, E>>,
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let file_name = stored_file_name(self.naming, unix_millis(), original_name);
        self.write_as(file_name, chunks).await
    }

    async fn write_as<S, E>(
        &self,
        file_name: String,
        chunks: S,
    ) -> Result<StoredImage, StorageError>
    where
        S: Stream<Item = Result<Bytes, E>>,
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let path = self.dir.join(&file_name);
        // Concurrent writers of the same legacy name each get their own temp file;
        // only the final rename collides.
        let part_path = self.dir.join(format!(".{}.part", Uuid::new_v4().simple()));
        let part = PartialFile::new(part_path);

        let mut file = fs::File::create(&part.path).await?;
        let mut chunks = std::pin::pin!(chunks);
        let mut bytes = 0u64;
        while let Some(chunk) = chunks.next().await {
            let chunk = chunk.map_err(|err| StorageError::Source(err.into()))?;
            file.write_all(&chunk).await?;
            bytes += chunk.len() as u64;
        }
        file.flush().await?;
        drop(file);

        fs::rename(&part.path, &path).await?;
        part.disarm();

        Ok(StoredImage {
            file_name,
            path,
            bytes,
        })
    }
}

struct PartialFile {
    path: PathBuf,
    armed: bool,
}

impl PartialFile {
    fn new(path: PathBuf) -> Self {
        Self { path, armed: true }
    }

    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for PartialFile {
    fn drop(&mut self) {
        if self.armed {
            if let Err(err) = std::fs::remove_file(&self.path) {
                if err.kind() != io::ErrorKind::NotFound {
                    tracing::warn!(error = %err, path = %self.path.display(), "partial upload not removed");
                }
            }
        }
    }
}

pub fn stored_file_name(naming: NamingScheme, millis: u128, original_name: &str) -> String {
    let name = sanitize_file_name(original_name);
    match naming {
        NamingScheme::Unique => format!("{millis}-{}-{name}", Uuid::new_v4().simple()),
        NamingScheme::Legacy => format!("{millis}-{name}"),
    }
}

pub fn sanitize_file_name(original_name: &str) -> String {
    let base = original_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        FALLBACK_FILE_NAME.to_string()
    } else {
        truncate_file_name(cleaned)
    }
}

// Input is ASCII after sanitizing, so byte offsets are char boundaries.
fn truncate_file_name(name: &str) -> String {
    if name.len() <= MAX_NAME_BYTES {
        return name.to_string();
    }
    match name.rfind('.') {
        Some(dot) if name.len() - dot <= MAX_EXTENSION_BYTES => {
            let extension = &name[dot..];
            let stem = &name[..MAX_NAME_BYTES - extension.len()];
            format!("{stem}{extension}")
        }
        _ => name[..MAX_NAME_BYTES].to_string(),
    }
}

fn unix_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis())
        .unwrap_or_default()
}
