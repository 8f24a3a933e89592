//! Config schema: transport, delivery, access, localization and command overrides.

use std::collections::HashMap;

use {
    herald_channels::{AccessLevel, FormattingStyle, ResponseSettings},
    herald_common::{ChatId, UserId},
    herald_telegram::TelegramConfig,
    serde::{Deserialize, Serialize},
};

use crate::error::{Error, Result};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HeraldConfig {
    pub telegram: TelegramConfig,
    pub delivery: DeliveryConfig,
    pub access: AccessConfig,
    pub localization: LocalizationConfig,
    /// Command properties added or overridden on top of the built-ins.
    pub commands: Vec<CommandConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeliveryConfig {
    /// Longest text sent in one message; longer texts are split.
    pub max_text_len: usize,
    pub default_formatting: FormattingStyle,
    pub web_page_preview: bool,
    pub notification: bool,
}

impl DeliveryConfig {
    pub fn response_settings(&self) -> ResponseSettings {
        ResponseSettings {
            formatting: self.default_formatting,
            web_page_preview: self.web_page_preview,
            notification: self.notification,
        }
    }
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            max_text_len: 4096,
            default_formatting: FormattingStyle::Html,
            web_page_preview: false,
            notification: true,
        }
    }
}

/// Static ranks loaded into the in-memory access store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AccessConfig {
    /// Rank of users without any entry.
    pub default_level: AccessLevel,
    /// User id → rank in every chat.
    pub users: HashMap<String, AccessLevel>,
    /// `"chat_id:user_id"` → rank in that chat only.
    pub chats: HashMap<String, AccessLevel>,
    pub banned: Vec<i64>,
}

impl AccessConfig {
    pub fn user_levels(&self) -> Result<Vec<(UserId, AccessLevel)>> {
        self.users
            .iter()
            .map(|(key, level)| {
                let user = key
                    .trim()
                    .parse::<UserId>()
                    .map_err(|_| Error::invalid_key("access.users", key))?;
                Ok((user, *level))
            })
            .collect()
    }

    pub fn chat_levels(&self) -> Result<Vec<(ChatId, UserId, AccessLevel)>> {
        self.chats
            .iter()
            .map(|(key, level)| {
                let (chat, user) =
                    parse_chat_user(key).ok_or_else(|| Error::invalid_key("access.chats", key))?;
                Ok((chat, user, *level))
            })
            .collect()
    }
}

fn parse_chat_user(key: &str) -> Option<(ChatId, UserId)> {
    let (chat, user) = key.split_once(':')?;
    Some((chat.trim().parse().ok()?, user.trim().parse().ok()?))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalizationConfig {
    pub default_language: String,
    /// Chat id → language code.
    pub chat_languages: HashMap<String, String>,
    /// Language code → key → text.
    pub bundles: HashMap<String, HashMap<String, String>>,
}

impl LocalizationConfig {
    pub fn chat_languages(&self) -> Result<Vec<(ChatId, String)>> {
        self.chat_languages
            .iter()
            .map(|(key, lang)| {
                let chat = key
                    .trim()
                    .parse::<ChatId>()
                    .map_err(|_| Error::invalid_key("localization.chat_languages", key))?;
                Ok((chat, lang.clone()))
            })
            .collect()
    }
}

impl Default for LocalizationConfig {
    fn default() -> Self {
        Self {
            default_language: "en".into(),
            chat_languages: HashMap::new(),
            bundles: HashMap::new(),
        }
    }
}

/// What a `[[commands]]` entry configures.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandKind {
    /// A command run from message text through a handler.
    #[default]
    Command,
    /// Only the access level of the analyzer with this name.
    Analyzer,
}

/// Properties of one command, or of the analyzer of the same name when
/// `kind = "analyzer"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandConfig {
    pub name: String,
    #[serde(default)]
    pub kind: CommandKind,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub required_level: AccessLevel,
    /// Handler reference; the command name when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handler: Option<String>,
}

impl CommandConfig {
    pub fn handler_ref(&self) -> &str {
        self.handler.as_deref().unwrap_or(&self.name)
    }

    pub fn is_analyzer(&self) -> bool {
        self.kind == CommandKind::Analyzer
    }
}
