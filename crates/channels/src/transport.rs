use {
    async_trait::async_trait,
    herald_common::{ChatId, MessageId},
    std::{fmt, time::Duration},
};

use crate::response::{FileKind, FileSource, FormattingStyle, ResponseSettings};

/// Per-call options shared by the send operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SendOptions {
    pub formatting: FormattingStyle,
    pub web_page_preview: bool,
    pub notification: bool,
    pub reply_to: Option<MessageId>,
}

impl SendOptions {
    pub fn from_settings(settings: ResponseSettings, reply_to: Option<MessageId>) -> Self {
        Self {
            formatting: settings.formatting,
            web_page_preview: settings.web_page_preview,
            notification: settings.notification,
            reply_to,
        }
    }

    /// Same options with markup disabled.
    #[must_use]
    pub fn plain(self) -> Self {
        Self {
            formatting: FormattingStyle::Plain,
            ..self
        }
    }
}

impl Default for SendOptions {
    fn default() -> Self {
        Self::from_settings(ResponseSettings::default(), None)
    }
}

/// One file in a single-file send or a media group.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaItem {
    pub kind: FileKind,
    pub source: FileSource,
    pub caption: Option<String>,
    pub spoiler: bool,
}

/// A concrete transport operation.
#[derive(Debug, Clone, PartialEq)]
pub enum WireMethod {
    SendMessage {
        chat_id: ChatId,
        text: String,
        options: SendOptions,
    },
    EditMessageText {
        chat_id: ChatId,
        message_id: MessageId,
        text: String,
        options: SendOptions,
    },
    DeleteMessage {
        chat_id: ChatId,
        message_id: MessageId,
    },
    SendFile {
        chat_id: ChatId,
        media: MediaItem,
        options: SendOptions,
    },
    SendMediaGroup {
        chat_id: ChatId,
        items: Vec<MediaItem>,
        options: SendOptions,
    },
    SendLocation {
        chat_id: ChatId,
        latitude: f64,
        longitude: f64,
        options: SendOptions,
    },
}

impl WireMethod {
    pub fn name(&self) -> &'static str {
        match self {
            Self::SendMessage { .. } => "sendMessage",
            Self::EditMessageText { .. } => "editMessageText",
            Self::DeleteMessage { .. } => "deleteMessage",
            Self::SendFile { media, .. } => match media.kind {
                FileKind::Photo => "sendPhoto",
                FileKind::Video => "sendVideo",
                FileKind::Voice => "sendVoice",
                FileKind::Audio => "sendAudio",
                FileKind::Animation => "sendAnimation",
                FileKind::VideoNote => "sendVideoNote",
                FileKind::Sticker => "sendSticker",
                FileKind::Document => "sendDocument",
            },
            Self::SendMediaGroup { .. } => "sendMediaGroup",
            Self::SendLocation { .. } => "sendLocation",
        }
    }

    pub fn chat_id(&self) -> ChatId {
        match self {
            Self::SendMessage { chat_id, .. }
            | Self::EditMessageText { chat_id, .. }
            | Self::DeleteMessage { chat_id, .. }
            | Self::SendFile { chat_id, .. }
            | Self::SendMediaGroup { chat_id, .. }
            | Self::SendLocation { chat_id, .. } => *chat_id,
        }
    }
}

impl fmt::Display for WireMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} chat={}", self.name(), self.chat_id())
    }
}

/// Classified transport failure.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The markup in the text could not be parsed.
    #[error("markup rejected: {0}")]
    MarkupRejected(String),

    /// Edit produced content identical to the current message.
    #[error("message is not modified")]
    MessageNotModified,

    #[error("message to delete not found")]
    MessageToDeleteNotFound,

    /// Rate limit still in force after the transport's own retries.
    #[error("rate limited, retry after {0:?}")]
    RateLimited(Duration),

    #[error("api error: {0}")]
    Api(String),

    #[error("network error: {0}")]
    Network(String),

    /// The request could not be built (bad file path, unsupported media).
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl TransportError {
    pub fn is_markup_rejection(&self) -> bool {
        matches!(self, Self::MarkupRejected(_))
    }

    /// Outcomes of edit/delete that mean "already in the desired state".
    pub fn is_benign(&self) -> bool {
        matches!(self, Self::MessageNotModified | Self::MessageToDeleteNotFound)
    }
}

/// A chat transport able to perform wire operations.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, method: WireMethod) -> Result<(), TransportError>;

    /// The bot's own handle (without `@`), used to strip command suffixes.
    fn bot_handle(&self) -> Option<String>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_method_name_follows_kind() {
        let method = WireMethod::SendFile {
            chat_id: ChatId(1),
            media: MediaItem {
                kind: FileKind::Voice,
                source: FileSource::RemoteId("v".into()),
                caption: None,
                spoiler: false,
            },
            options: SendOptions::default(),
        };
        assert_eq!(method.name(), "sendVoice");
        assert_eq!(method.to_string(), "sendVoice chat=1");
    }

    #[test]
    fn plain_keeps_other_options() {
        let options = SendOptions {
            formatting: FormattingStyle::Markdown,
            web_page_preview: true,
            notification: false,
            reply_to: Some(MessageId(3)),
        }
        .plain();
        assert_eq!(options.formatting, FormattingStyle::Plain);
        assert!(options.web_page_preview);
        assert!(!options.notification);
        assert_eq!(options.reply_to, Some(MessageId(3)));
    }

    #[test]
    fn benign_errors() {
        assert!(TransportError::MessageNotModified.is_benign());
        assert!(TransportError::MessageToDeleteNotFound.is_benign());
        assert!(!TransportError::Api("chat not found".into()).is_benign());
        assert!(TransportError::MarkupRejected("bad tag".into()).is_markup_rejection());
    }
}
