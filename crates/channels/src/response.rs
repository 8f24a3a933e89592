//! Responses handlers and analyzers may produce.
//!
//! The set of variants is closed; delivery picks a wire operation for each
//! one through the dispatcher registry rather than by inspecting types.

use {
    bytes::Bytes,
    herald_common::{ChatId, MessageId},
    serde::{Deserialize, Serialize},
    std::{fmt, path::PathBuf},
    url::Url,
};

use crate::error::{Context, Result};

/// Markup flavour of outgoing text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormattingStyle {
    #[default]
    Html,
    Markdown,
    /// No markup; text is sent verbatim.
    Plain,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResponseSettings {
    pub formatting: FormattingStyle,
    pub web_page_preview: bool,
    pub notification: bool,
}

impl Default for ResponseSettings {
    fn default() -> Self {
        Self {
            formatting: FormattingStyle::Html,
            web_page_preview: false,
            notification: true,
        }
    }
}

impl ResponseSettings {
    #[must_use]
    pub fn plain() -> Self {
        Self {
            formatting: FormattingStyle::Plain,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn silent(mut self) -> Self {
        self.notification = false;
        self
    }

    #[must_use]
    pub fn with_preview(mut self) -> Self {
        self.web_page_preview = true;
        self
    }
}

/// Discriminant of [`Response`], used as the dispatcher registry key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseKind {
    Text,
    Edit,
    Delete,
    File,
    Location,
}

impl fmt::Display for ResponseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Text => "text",
            Self::Edit => "edit",
            Self::Delete => "delete",
            Self::File => "file",
            Self::Location => "location",
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    Text(TextResponse),
    Edit(EditResponse),
    Delete(DeleteResponse),
    File(FileResponse),
    Location(LocationResponse),
}

impl Response {
    pub fn kind(&self) -> ResponseKind {
        match self {
            Self::Text(_) => ResponseKind::Text,
            Self::Edit(_) => ResponseKind::Edit,
            Self::Delete(_) => ResponseKind::Delete,
            Self::File(_) => ResponseKind::File,
            Self::Location(_) => ResponseKind::Location,
        }
    }

    pub fn chat_id(&self) -> ChatId {
        match self {
            Self::Text(r) => r.chat_id,
            Self::Edit(r) => r.chat_id,
            Self::Delete(r) => r.chat_id,
            Self::File(r) => r.chat_id,
            Self::Location(r) => r.chat_id,
        }
    }

    /// Short description used as error-report context.
    pub fn describe(&self) -> String {
        match self {
            Self::File(r) => format!("response={} chat={} files={}", self.kind(), r.chat_id, r.files.len()),
            _ => format!("response={} chat={}", self.kind(), self.chat_id()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextResponse {
    pub chat_id: ChatId,
    pub text: String,
    pub reply_to: Option<MessageId>,
    pub settings: Option<ResponseSettings>,
}

impl TextResponse {
    pub fn new(chat_id: ChatId, text: impl Into<String>) -> Self {
        Self {
            chat_id,
            text: text.into(),
            reply_to: None,
            settings: None,
        }
    }

    #[must_use]
    pub fn reply_to(mut self, message_id: MessageId) -> Self {
        self.reply_to = Some(message_id);
        self
    }

    #[must_use]
    pub fn settings(mut self, settings: ResponseSettings) -> Self {
        self.settings = Some(settings);
        self
    }
}

impl From<TextResponse> for Response {
    fn from(value: TextResponse) -> Self {
        Self::Text(value)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EditResponse {
    pub chat_id: ChatId,
    pub message_id: MessageId,
    pub text: String,
    pub settings: Option<ResponseSettings>,
}

impl From<EditResponse> for Response {
    fn from(value: EditResponse) -> Self {
        Self::Edit(value)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeleteResponse {
    pub chat_id: ChatId,
    pub message_id: MessageId,
}

impl From<DeleteResponse> for Response {
    fn from(value: DeleteResponse) -> Self {
        Self::Delete(value)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LocationResponse {
    pub chat_id: ChatId,
    pub latitude: f64,
    pub longitude: f64,
    pub reply_to: Option<MessageId>,
    pub settings: Option<ResponseSettings>,
}

impl From<LocationResponse> for Response {
    fn from(value: LocationResponse) -> Self {
        Self::Location(value)
    }
}

/// Kind of an outgoing file; selects the single-file send operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileKind {
    Photo,
    Video,
    Voice,
    Audio,
    Animation,
    VideoNote,
    Sticker,
    Document,
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Photo => "photo",
            Self::Video => "video",
            Self::Voice => "voice",
            Self::Audio => "audio",
            Self::Animation => "animation",
            Self::VideoNote => "video_note",
            Self::Sticker => "sticker",
            Self::Document => "document",
        })
    }
}

/// Where the bytes of an outgoing file come from.
#[derive(Clone, PartialEq)]
pub enum FileSource {
    /// Identifier of a file already stored by the transport.
    RemoteId(String),
    Url(Url),
    Path(PathBuf),
    Bytes { data: Bytes, file_name: String },
}

impl FileSource {
    pub fn url(raw: &str) -> Result<Self> {
        Url::parse(raw)
            .map(Self::Url)
            .with_context(|| format!("invalid file url {raw:?}"))
    }

    /// Human-readable reference, used when a file can only be described in text.
    pub fn reference(&self) -> String {
        match self {
            Self::RemoteId(id) => id.clone(),
            Self::Url(url) => url.to_string(),
            Self::Path(path) => path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string()),
            Self::Bytes { file_name, .. } => file_name.clone(),
        }
    }
}

impl fmt::Debug for FileSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RemoteId(id) => f.debug_tuple("RemoteId").field(id).finish(),
            Self::Url(url) => f.debug_tuple("Url").field(&url.as_str()).finish(),
            Self::Path(path) => f.debug_tuple("Path").field(path).finish(),
            Self::Bytes { data, file_name } => f
                .debug_struct("Bytes")
                .field("file_name", file_name)
                .field("len", &data.len())
                .finish(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSettings {
    pub spoiler: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OutgoingFile {
    pub source: FileSource,
    pub kind: FileKind,
    /// Display name; doubles as the per-item caption in media groups.
    pub name: Option<String>,
    pub settings: FileSettings,
}

impl OutgoingFile {
    pub fn new(kind: FileKind, source: FileSource) -> Self {
        Self {
            source,
            kind,
            name: None,
            settings: FileSettings::default(),
        }
    }

    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn spoiler(mut self) -> Self {
        self.settings.spoiler = true;
        self
    }

    /// Display name if set, otherwise the source reference.
    pub fn label(&self) -> String {
        self.name.clone().unwrap_or_else(|| self.source.reference())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FileResponse {
    pub chat_id: ChatId,
    /// Ordered; expected to be non-empty.
    pub files: Vec<OutgoingFile>,
    /// Caption for a single file, or for the first item of a media group.
    pub text: Option<String>,
    pub reply_to: Option<MessageId>,
    pub settings: Option<ResponseSettings>,
}

impl FileResponse {
    pub fn new(chat_id: ChatId, files: Vec<OutgoingFile>) -> Self {
        Self {
            chat_id,
            files,
            text: None,
            reply_to: None,
            settings: None,
        }
    }

    pub fn single(chat_id: ChatId, file: OutgoingFile) -> Self {
        Self::new(chat_id, vec![file])
    }

    #[must_use]
    pub fn caption(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    #[must_use]
    pub fn reply_to(mut self, message_id: MessageId) -> Self {
        self.reply_to = Some(message_id);
        self
    }
}

impl From<FileResponse> for Response {
    fn from(value: FileResponse) -> Self {
        Self::File(value)
    }
}
