pub mod cli;
pub mod compactor;
pub mod config;
pub mod network;
pub mod storage;

use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config file {0:?} not found")]
    ConfigNotFound(PathBuf),

    #[error("config file {path:?} is not valid JSON: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("interface query failed: {0}")]
    Discovery(#[source] std::io::Error),

    #[error("corrupt entry in {path:?} at line {line}: {source}")]
    CorruptEntry {
        path: PathBuf,
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}

impl Error {
    // Missing config means "nothing to do", not a failure.
    pub fn is_benign(&self) -> bool {
        matches!(self, Error::ConfigNotFound(_))
    }
}
