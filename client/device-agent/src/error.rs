use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("config: {0}")]
    Config(String),
    #[error("http: {0}")]
    Http(#[from] reqwest::Error),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("spool file {path} is not a measurement: {source}")]
    Spool {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("gateway answered {status}: {body}")]
    Rejected { status: u16, body: String },
    #[error("no image type known for {0}")]
    UnsupportedImage(PathBuf),
}
