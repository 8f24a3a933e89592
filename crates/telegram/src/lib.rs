//! Telegram transport for herald.
//!
//! [`TelegramTransport`] executes wire methods through teloxide and classifies
//! failures; [`start_polling`] decodes `getUpdates` batches into raw updates
//! and feeds them into a pipeline.

pub mod bot;
pub mod config;
pub mod error;
pub mod transport;

pub use {
    bot::{DecodedUpdate, Polling, decode_updates, start_polling},
    config::TelegramConfig,
    error::{Error, Result},
    transport::{TelegramTransport, classify},
};
