use herald_channels::ResponseKind;

use crate::dispatcher::IntentKind;

pub type Result<T> = std::result::Result<T, DispatchError>;

/// A response that cannot be turned into a delivery.
///
/// These indicate wiring mistakes, not transport trouble: the registries are
/// built at startup and every known variant is expected to be covered.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("no delivery mapping registered for {kind} responses")]
    MissingMapper { kind: ResponseKind },

    #[error("file response without files")]
    EmptyFileResponse,

    #[error("no executor registered for intent {intent}")]
    MissingExecutor { intent: IntentKind },
}

impl DispatchError {
    #[must_use]
    pub fn missing_mapper(kind: ResponseKind) -> Self {
        Self::MissingMapper { kind }
    }

    #[must_use]
    pub fn missing_executor(intent: IntentKind) -> Self {
        Self::MissingExecutor { intent }
    }
}
