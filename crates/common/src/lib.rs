//! Shared identifiers and the `impl_context!` helper used across all herald
//! crates.

pub mod error;
pub mod ids;

pub use {
    error::FromMessage,
    ids::{ChatId, MessageId, UserId},
};
