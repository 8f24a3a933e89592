use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },

    #[error("unsupported config format: .{0}")]
    UnsupportedFormat(String),

    #[error("config file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("invalid key {key:?} in {section}")]
    InvalidKey { section: &'static str, key: String },
}

impl Error {
    #[must_use]
    pub fn parse(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        Self::Parse {
            path: path.into(),
            message: message.to_string(),
        }
    }

    #[must_use]
    pub fn invalid_key(section: &'static str, key: impl Into<String>) -> Self {
        Self::InvalidKey {
            section,
            key: key.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
