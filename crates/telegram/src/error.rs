use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Telegram(#[from] teloxide::RequestError),

    #[error(transparent)]
    Reqwest(#[from] reqwest::Error),

    /// The Bot API answered `ok: false`.
    #[error("telegram api error {code}: {description}")]
    Api {
        code: u16,
        description: String,
        /// Seconds to wait before retrying, when rate limited.
        retry_after: Option<u64>,
    },

    /// The response body is not a Bot API envelope.
    #[error("malformed telegram response: {0}")]
    MalformedResponse(#[source] serde_json::Error),

    /// An update could not be decoded into the inbound raw shape.
    #[error("malformed update {update_id}: {source}")]
    MalformedUpdate {
        update_id: i64,
        #[source]
        source: serde_json::Error,
    },
}

impl Error {
    #[must_use]
    pub fn malformed_update(update_id: i64, source: serde_json::Error) -> Self {
        Self::MalformedUpdate { update_id, source }
    }

    /// Another client is polling with the same token.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Api { code: 409, .. })
    }

    pub fn retry_after(&self) -> Option<u64> {
        match self {
            Self::Api { retry_after, .. } => *retry_after,
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
