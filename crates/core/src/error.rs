use std::path::PathBuf;

use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Failure taxonomy shared by every gensave flow.
#[derive(Debug, Error)]
pub enum Error {
    /// No generation id, no media within the attempt budget, unknown record.
    #[error("not found: {0}")]
    NotFound(String),
    #[error("permission denied for {}", .0.display())]
    PermissionDenied(PathBuf),
    /// Unsupported index shape, unparseable index or sidecar.
    #[error("format error: {0}")]
    Format(String),
    /// Fetch failure or non-success HTTP status.
    #[error("network error: {0}")]
    Network(String),
    #[error("cancelled by user")]
    AbortedByUser,
    #[error("storage error: {0}")]
    Storage(String),
    #[error("io error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Short machine-friendly label, used for status lines and API payloads.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::PermissionDenied(_) => "permission_denied",
            Self::Format(_) => "format",
            Self::Network(_) => "network",
            Self::AbortedByUser => "aborted",
            Self::Storage(_) => "storage",
            Self::Io { .. } => "io",
        }
    }
}
