use std::path::PathBuf;

/// Failures of the one-shot registry download. None of them leave a file behind.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("server refused access to {url}: HTTP {status}")]
    Status { url: String, status: u16 },
    #[error("response is not valid UTF-8: {0}")]
    Decode(#[from] std::string::FromUtf8Error),
    #[error("failed to re-encode CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("invalid fetch configuration: {0}")]
    Config(String),
    #[error("failed to write {path}: {source}", path = path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl FetchError {
    /// HTTP status for refusals, None for everything else
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}
