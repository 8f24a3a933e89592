use herald_common::FromMessage;

/// Crate-wide result type for model and contract operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Typed errors for building and parsing model values.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Input payload or parameter is invalid.
    #[error("invalid input: {message}")]
    InvalidInput { message: String },

    /// An access level name did not match any known rank.
    #[error("unknown access level: {name}")]
    UnknownAccessLevel { name: String },
}

impl Error {
    #[must_use]
    pub fn invalid_input(message: impl std::fmt::Display) -> Self {
        Self::InvalidInput {
            message: message.to_string(),
        }
    }

    #[must_use]
    pub fn unknown_access_level(name: impl Into<String>) -> Self {
        Self::UnknownAccessLevel { name: name.into() }
    }
}

impl FromMessage for Error {
    fn from_message(message: String) -> Self {
        Self::invalid_input(message)
    }
}

herald_common::impl_context!();
