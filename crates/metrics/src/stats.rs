use std::{
    collections::{BTreeMap, VecDeque},
    sync::{
        Mutex,
        atomic::{AtomicU64, Ordering},
    },
};

use {
    chrono::{DateTime, Utc},
    serde::{Deserialize, Serialize},
    tracing::{error, warn},
};

use crate::definitions::stats as names;

/// Number of error reports retained by [`BotStats`].
const RECENT_ERRORS_CAPACITY: usize = 50;

/// Receives counters and structured error reports from every pipeline stage.
///
/// Implementations must be cheap and non-blocking: they are called from
/// delivery executors and analyzer tasks running concurrently.
pub trait StatsSink: Send + Sync {
    /// A transport event normalized into a request.
    fn increment_received(&self);

    /// Report a failure.
    ///
    /// `context` describes what was being processed (request or response
    /// summary), `error` is the underlying cause when there is one.
    fn increment_errors(&self, context: &str, error: Option<&anyhow::Error>, message: &str);

    /// A command handler ran to completion.
    fn increment_commands_processed(&self);
}

/// One reported failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorReport {
    pub at: DateTime<Utc>,
    pub context: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Persistable counter values, keyed by counter name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub taken_at: Option<DateTime<Utc>>,
    pub counters: BTreeMap<String, u64>,
}

/// In-process [`StatsSink`] backed by atomic counters.
#[derive(Default)]
pub struct BotStats {
    received: AtomicU64,
    errors: AtomicU64,
    commands_processed: AtomicU64,
    recent_errors: Mutex<VecDeque<ErrorReport>>,
}

impl BotStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// The persisted counters, in a fixed order.
    ///
    /// Snapshot and restore iterate this list; adding a counter means adding
    /// a field and an entry here.
    pub fn counters(&self) -> [(&'static str, &AtomicU64); 3] {
        [
            ("received", &self.received),
            ("errors", &self.errors),
            ("commands_processed", &self.commands_processed),
        ]
    }

    pub fn received(&self) -> u64 {
        self.received.load(Ordering::Relaxed)
    }

    pub fn errors(&self) -> u64 {
        self.errors.load(Ordering::Relaxed)
    }

    pub fn commands_processed(&self) -> u64 {
        self.commands_processed.load(Ordering::Relaxed)
    }

    /// Most recent error reports, oldest first.
    pub fn recent_errors(&self) -> Vec<ErrorReport> {
        let recent = self.recent_errors.lock().unwrap_or_else(|e| e.into_inner());
        recent.iter().cloned().collect()
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            taken_at: Some(Utc::now()),
            counters: self
                .counters()
                .into_iter()
                .map(|(name, value)| (name.to_string(), value.load(Ordering::Relaxed)))
                .collect(),
        }
    }

    /// Load counter values from a snapshot. Unknown names are ignored and
    /// counters missing from the snapshot keep their current value.
    pub fn restore(&self, snapshot: &StatsSnapshot) {
        for (name, counter) in self.counters() {
            if let Some(value) = snapshot.counters.get(name) {
                counter.store(*value, Ordering::Relaxed);
            }
        }
        for name in snapshot.counters.keys() {
            if !self.counters().iter().any(|(known, _)| known == name) {
                warn!(counter = %name, "ignoring unknown counter in stats snapshot");
            }
        }
    }
}

impl StatsSink for BotStats {
    fn increment_received(&self) {
        self.received.fetch_add(1, Ordering::Relaxed);
        metrics::counter!(names::RECEIVED_TOTAL).increment(1);
    }

    fn increment_errors(&self, context: &str, error: Option<&anyhow::Error>, message: &str) {
        self.errors.fetch_add(1, Ordering::Relaxed);
        metrics::counter!(names::ERRORS_TOTAL).increment(1);

        match error {
            Some(e) => error!(context, error = %format!("{e:#}"), "{message}"),
            None => error!(context, "{message}"),
        }

        let report = ErrorReport {
            at: Utc::now(),
            context: context.to_string(),
            message: message.to_string(),
            error: error.map(|e| format!("{e:#}")),
        };
        let mut recent = self.recent_errors.lock().unwrap_or_else(|e| e.into_inner());
        if recent.len() == RECENT_ERRORS_CAPACITY {
            recent.pop_front();
        }
        recent.push_back(report);
    }

    fn increment_commands_processed(&self) {
        self.commands_processed.fetch_add(1, Ordering::Relaxed);
        metrics::counter!(names::COMMANDS_TOTAL).increment(1);
    }
}
