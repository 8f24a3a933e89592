//! Metric name and label definitions.
//!
//! Centralizing these keeps the names consistent between the stages that
//! record them and the dashboards that read them.

/// Inbound traffic
pub mod inbound {
    /// Raw updates that normalized into a request
    pub const REQUESTS_TOTAL: &str = "herald_requests_total";
    /// Raw updates that produced no request (ignored)
    pub const IGNORED_TOTAL: &str = "herald_inbound_ignored_total";
    /// Requests dropped because the sender is banned
    pub const BANNED_TOTAL: &str = "herald_inbound_banned_total";
    /// Requests denied by a command's required access level
    pub const ACCESS_DENIED_TOTAL: &str = "herald_access_denied_total";
}

/// Command handling
pub mod commands {
    /// Commands processed by a handler
    pub const PROCESSED_TOTAL: &str = "herald_commands_processed_total";
    /// Handler execution duration in seconds
    pub const DURATION_SECONDS: &str = "herald_command_duration_seconds";
    /// Requests routed through a command-waiting marker
    pub const RESUMED_TOTAL: &str = "herald_commands_resumed_total";
}

/// Analyzer fan-out
pub mod analyzers {
    /// Analyzer invocations
    pub const RUNS_TOTAL: &str = "herald_analyzer_runs_total";
    /// Analyzers skipped because no command properties were registered
    pub const SKIPPED_TOTAL: &str = "herald_analyzer_skipped_total";
    /// Analyzers that failed or panicked
    pub const FAILURES_TOTAL: &str = "herald_analyzer_failures_total";
}

/// Response delivery
pub mod delivery {
    /// Delivery attempts by intent
    pub const ATTEMPTS_TOTAL: &str = "herald_delivery_attempts_total";
    /// Fallback stages entered, labelled by intent and stage
    pub const FALLBACKS_TOTAL: &str = "herald_delivery_fallbacks_total";
    /// Failures suppressed because they are known no-ops
    pub const IGNORED_FAILURES_TOTAL: &str = "herald_delivery_ignored_failures_total";
    /// Text chunks sent after splitting
    pub const TEXT_CHUNKS_TOTAL: &str = "herald_delivery_text_chunks_total";
}

/// Stats sink mirrors
pub mod stats {
    /// Received requests
    pub const RECEIVED_TOTAL: &str = "herald_stats_received_total";
    /// Reported errors
    pub const ERRORS_TOTAL: &str = "herald_stats_errors_total";
    /// Processed commands
    pub const COMMANDS_TOTAL: &str = "herald_stats_commands_total";
}

pub mod labels {
    pub const INTENT: &str = "intent";
    pub const STAGE: &str = "stage";
    pub const COMMAND: &str = "command";
    pub const ANALYZER: &str = "analyzer";
    pub const CONTENT_TYPE: &str = "content_type";
    pub const KIND: &str = "kind";
}
