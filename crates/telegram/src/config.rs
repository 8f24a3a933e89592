use {
    secrecy::{ExposeSecret, Secret},
    serde::{Deserialize, Serialize},
    url::Url,
};

/// Connection settings for the Telegram bot.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    /// Bot token from @BotFather.
    #[serde(serialize_with = "serialize_secret")]
    pub token: Secret<String>,

    /// Alternative Bot API server (e.g. a self-hosted `telegram-bot-api`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_url: Option<Url>,

    /// Long-polling timeout passed to `getUpdates`.
    pub poll_timeout_secs: u32,

    /// Handle used to match `/command@handle`. Resolved via `getMe` when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bot_handle: Option<String>,
}

impl TelegramConfig {
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Secret::new(token.into()),
            ..Default::default()
        }
    }

    pub fn has_token(&self) -> bool {
        !self.token.expose_secret().trim().is_empty()
    }
}

impl std::fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramConfig")
            .field("token", &"[REDACTED]")
            .field("api_url", &self.api_url)
            .field("poll_timeout_secs", &self.poll_timeout_secs)
            .field("bot_handle", &self.bot_handle)
            .finish()
    }
}

fn serialize_secret<S: serde::Serializer>(
    secret: &Secret<String>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(secret.expose_secret())
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            token: Secret::new(String::new()),
            api_url: None,
            poll_timeout_secs: 30,
            bot_handle: None,
        }
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let cfg = TelegramConfig::default();
        assert_eq!(cfg.poll_timeout_secs, 30);
        assert!(!cfg.has_token());
        assert!(cfg.bot_handle.is_none());
    }

    #[test]
    fn deserialize_from_json() {
        let json = r#"{
            "token": "123:ABC",
            "api_url": "http://localhost:8081/",
            "bot_handle": "herald_bot"
        }"#;
        let cfg: TelegramConfig = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.token.expose_secret(), "123:ABC");
        assert_eq!(cfg.api_url.unwrap().port(), Some(8081));
        assert_eq!(cfg.bot_handle.as_deref(), Some("herald_bot"));
        assert_eq!(cfg.poll_timeout_secs, 30);
    }

    #[test]
    fn debug_redacts_token() {
        let cfg = TelegramConfig::with_token("123:SECRET");
        let debug = format!("{cfg:?}");
        assert!(!debug.contains("SECRET"));
        assert!(debug.contains("[REDACTED]"));
    }
}
