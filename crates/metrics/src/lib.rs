//! Counters and error reporting for the herald pipeline.
//!
//! Every stage reports through the [`StatsSink`] trait. [`BotStats`] is the
//! in-process implementation: atomic counters, a bounded list of recent error
//! reports, and mirroring into the `metrics` facade so an installed recorder
//! (Prometheus or otherwise) sees the same numbers.
//!
//! ```rust,ignore
//! use herald_metrics::{BotStats, StatsSink};
//!
//! let stats = BotStats::new();
//! stats.increment_received();
//! stats.increment_errors("chat=42 user=7", None, "unexpected general error");
//! ```

mod definitions;
mod stats;

pub use {
    definitions::*,
    stats::{BotStats, ErrorReport, StatsSink, StatsSnapshot},
};

// Re-export metrics macros for convenience
pub use metrics::{counter, gauge, histogram};
