use {
    chrono::{DateTime, Utc},
    herald_common::{ChatId, MessageId, UserId},
    serde::{Deserialize, Serialize},
    std::fmt,
};

/// Where a request came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestSource {
    ChatPlatform,
    Email,
}

/// One inbound event in canonical form. Built once, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub message: Message,
    pub source: RequestSource,
}

impl Request {
    pub fn new(message: Message, source: RequestSource) -> Self {
        Self { message, source }
    }

    pub fn chat_id(&self) -> ChatId {
        self.message.chat.id
    }

    pub fn user_id(&self) -> UserId {
        self.message.user.id
    }

    /// Short description used as error-report context.
    pub fn describe(&self) -> String {
        format!(
            "chat={} user={} message={} kind={} content={}",
            self.message.chat.id,
            self.message.user.id,
            self.message.message_id,
            self.message.kind,
            self.message.content_type,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatKind {
    Private,
    Group,
    Supergroup,
    Channel,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chat {
    pub id: ChatId,
    pub kind: ChatKind,
    pub title: Option<String>,
    pub username: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub is_bot: bool,
    pub first_name: String,
    pub last_name: Option<String>,
    pub username: Option<String>,
    pub language_code: Option<String>,
}

impl User {
    /// "First Last", falling back to the username.
    pub fn display_name(&self) -> String {
        let last = self.last_name.as_deref().unwrap_or("");
        let name = format!("{} {last}", self.first_name).trim().to_string();
        if name.is_empty() {
            self.username.clone().unwrap_or_else(|| self.id.to_string())
        } else {
            name
        }
    }
}

/// How the message reached us.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    Common,
    Edit,
    Callback,
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Common => "common",
            Self::Edit => "edit",
            Self::Callback => "callback",
        })
    }
}

/// The single content type assigned to a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    Text,
    Sticker,
    Photo,
    Animation,
    Audio,
    File,
    Video,
    VideoNote,
    Voice,
    Reaction,
    Unknown,
}

impl ContentType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Sticker => "sticker",
            Self::Photo => "photo",
            Self::Animation => "animation",
            Self::Audio => "audio",
            Self::File => "file",
            Self::Video => "video",
            Self::VideoNote => "video_note",
            Self::Voice => "voice",
            Self::Reaction => "reaction",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A file attached to an inbound message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub mime_type: Option<String>,
    pub file_unique_id: String,
    pub file_id: String,
    pub name: Option<String>,
    pub size: u64,
    /// Seconds; only set for time-based media.
    pub duration: Option<u32>,
}

/// Reaction change on a message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reactions {
    pub old_emojis: Vec<String>,
    pub new_emojis: Vec<String>,
    pub old_custom_emoji_ids: Vec<String>,
    pub new_custom_emoji_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub chat: Chat,
    pub user: User,
    pub message_id: MessageId,
    /// The replied-to message. Never carries a reply of its own.
    pub reply_to_message: Option<Box<Message>>,
    pub text: Option<String>,
    pub date_time: DateTime<Utc>,
    pub edit_date_time: Option<DateTime<Utc>>,
    pub kind: MessageKind,
    pub content_type: ContentType,
    pub attachments: Vec<Attachment>,
    pub reactions: Option<Reactions>,
}

impl Message {
    pub fn has_text(&self) -> bool {
        self.text.as_deref().is_some_and(|t| !t.is_empty())
    }

    pub fn has_attachment(&self) -> bool {
        !self.attachments.is_empty()
    }

    pub fn is_callback(&self) -> bool {
        self.kind == MessageKind::Callback
    }

    pub fn text_or_empty(&self) -> &str {
        self.text.as_deref().unwrap_or("")
    }

    /// The attachment best representing the message (largest photo size is
    /// last in the list).
    pub fn main_attachment(&self) -> Option<&Attachment> {
        self.attachments.last()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(first: &str, last: Option<&str>, username: Option<&str>) -> User {
        User {
            id: UserId(7),
            is_bot: false,
            first_name: first.into(),
            last_name: last.map(Into::into),
            username: username.map(Into::into),
            language_code: None,
        }
    }

    #[test]
    fn display_name_prefers_full_name() {
        assert_eq!(user("Ada", Some("Lovelace"), Some("ada")).display_name(), "Ada Lovelace");
        assert_eq!(user("Ada", None, None).display_name(), "Ada");
        assert_eq!(user("", None, Some("ada")).display_name(), "ada");
        assert_eq!(user("", None, None).display_name(), "7");
    }
}
