use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TraceError {
    #[error("trace file not found: {}", path.display())]
    TraceFileNotFound { path: PathBuf },

    #[error("root invocation not found: {root_id}")]
    RootNotFound { root_id: String },

    #[error("no matching root invocations found")]
    NoMatchingRoots,

    #[error("cannot determine home directory")]
    HomeDirectoryNotFound,

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("i/o error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, TraceError>;
