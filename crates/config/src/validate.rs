//! Semantic checks on a parsed configuration.

use std::collections::HashMap;

use herald_channels::AccessLevel;

use crate::schema::HeraldConfig;

/// Severity level for a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
            Self::Info => write!(f, "info"),
        }
    }
}

/// A single validation diagnostic.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Category: "missing", "range", "unknown-handler", "duplicate", "invalid-key", "ignored"
    pub category: &'static str,
    /// Dotted path, e.g. "delivery.max_text_len"
    pub path: String,
    pub message: String,
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} [{}] {}: {}", self.severity, self.category, self.path, self.message)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub diagnostics: Vec<Diagnostic>,
}

impl ValidationResult {
    /// Returns `true` if any diagnostic is an error.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    /// Count diagnostics by severity.
    #[must_use]
    pub fn count(&self, severity: Severity) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }

    fn push(
        &mut self,
        severity: Severity,
        category: &'static str,
        path: impl Into<String>,
        message: impl Into<String>,
    ) {
        self.diagnostics.push(Diagnostic {
            severity,
            category,
            path: path.into(),
            message: message.into(),
        });
    }
}

/// Longest text the Bot API accepts in one message.
const TELEGRAM_TEXT_LIMIT: usize = 4096;

/// Check `config` against the handlers the binary actually provides.
pub fn validate(config: &HeraldConfig, known_handlers: &[&str]) -> ValidationResult {
    let mut result = ValidationResult::default();

    if !config.telegram.has_token() {
        result.push(
            Severity::Error,
            "missing",
            "telegram.token",
            "bot token is empty",
        );
    }
    if config.telegram.poll_timeout_secs == 0 {
        result.push(
            Severity::Warning,
            "range",
            "telegram.poll_timeout_secs",
            "zero disables long polling and busy-loops getUpdates",
        );
    }

    match config.delivery.max_text_len {
        0 => result.push(
            Severity::Error,
            "range",
            "delivery.max_text_len",
            "must be greater than zero",
        ),
        len if len > TELEGRAM_TEXT_LIMIT => result.push(
            Severity::Warning,
            "range",
            "delivery.max_text_len",
            format!("{len} exceeds the Telegram limit of {TELEGRAM_TEXT_LIMIT}; long texts will be rejected"),
        ),
        _ => {},
    }

    if config.access.default_level == AccessLevel::Banned {
        result.push(
            Severity::Warning,
            "range",
            "access.default_level",
            "every unknown user is banned",
        );
    }
    if let Err(e) = config.access.user_levels() {
        result.push(Severity::Error, "invalid-key", "access.users", e.to_string());
    }
    if let Err(e) = config.access.chat_levels() {
        result.push(Severity::Error, "invalid-key", "access.chats", e.to_string());
    }
    if let Err(e) = config.localization.chat_languages() {
        result.push(
            Severity::Error,
            "invalid-key",
            "localization.chat_languages",
            e.to_string(),
        );
    }
    if !config.localization.bundles.is_empty()
        && !config
            .localization
            .bundles
            .contains_key(&config.localization.default_language)
    {
        result.push(
            Severity::Info,
            "missing",
            "localization.bundles",
            format!(
                "no bundle for default language {:?}; unknown keys stay untranslated",
                config.localization.default_language
            ),
        );
    }

    validate_commands(config, known_handlers, &mut result);
    result
}

fn validate_commands(config: &HeraldConfig, known_handlers: &[&str], result: &mut ValidationResult) {
    // name or alias (lowercased) → index of the command that claimed it
    let mut claimed: HashMap<String, usize> = HashMap::new();

    for (idx, command) in config.commands.iter().enumerate() {
        let path = format!("commands[{idx}]");
        if command.name.trim().is_empty() {
            result.push(Severity::Error, "missing", format!("{path}.name"), "command name is empty");
            continue;
        }

        if command.is_analyzer() {
            if command.handler.is_some() || !command.aliases.is_empty() {
                result.push(
                    Severity::Warning,
                    "ignored",
                    path.clone(),
                    "analyzer entries take no handler or aliases",
                );
            }
        } else if !known_handlers.contains(&command.handler_ref()) {
            let handler = command.handler_ref();
            result.push(
                Severity::Error,
                "unknown-handler",
                format!("{path}.handler"),
                format!("no handler named {handler:?}"),
            );
        }

        for token in std::iter::once(&command.name).chain(&command.aliases) {
            if let Some(first) = claimed.insert(token.to_lowercase(), idx)
                && first != idx
            {
                result.push(
                    Severity::Error,
                    "duplicate",
                    path.clone(),
                    format!("{token:?} is already used by commands[{first}]"),
                );
            }
        }
    }
}
