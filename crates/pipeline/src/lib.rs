//! The request pipeline between a chat transport and command handlers.
//!
//! An inbound update is normalized into a [`Request`](herald_channels::Request),
//! the sender is ranked, a pending command marker or the message text selects
//! at most one command handler, and every registered analyzer runs alongside
//! it. All resulting responses go through the [`ResponseDispatcher`] to a
//! [`DeliveryExecutor`] that owns the transport call and its fallbacks.

pub mod access;
pub mod analyzers;
pub mod commands;
pub mod delivery;
pub mod dispatcher;
pub mod error;
pub mod normalize;
pub mod pipeline;
pub mod waiting;

#[cfg(test)]
pub(crate) mod test_support;

pub use {
    access::AccessResolver,
    analyzers::{Analyzer, AnalyzerFanOut, AnalyzerTasks},
    commands::{CommandContext, CommandHandler, CommandProperties, CommandRegistry, CommandResolver},
    delivery::{DeliveryContext, DeliveryExecutor, DeliveryService, split_text},
    dispatcher::{DeliveryIntent, IntentKind, ResponseDispatcher},
    error::{DispatchError, Result},
    normalize::{normalize, normalize_event},
    pipeline::{Outcome, Pipeline, PipelineBuilder},
    waiting::CommandWaiting,
};
