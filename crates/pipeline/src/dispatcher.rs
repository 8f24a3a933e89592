//! Response → delivery intent registry.

use {
    herald_channels::{FileKind, Response, ResponseKind},
    herald_metrics::StatsSink,
    std::{collections::HashMap, fmt, sync::Arc},
    tracing::warn,
};

use crate::error::{DispatchError, Result};

/// Name of a concrete delivery operation. Executors are registered under it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IntentKind(&'static str);

impl IntentKind {
    pub const DELETE: Self = Self("delete");
    pub const EDIT_TEXT: Self = Self("edit_text");
    pub const SEND_AUDIO: Self = Self("send_audio");
    pub const SEND_DOCUMENT: Self = Self("send_document");
    pub const SEND_LOCATION: Self = Self("send_location");
    pub const SEND_MEDIA_GROUP: Self = Self("send_media_group");
    pub const SEND_PHOTO: Self = Self("send_photo");
    pub const SEND_TEXT: Self = Self("send_text");
    pub const SEND_VIDEO: Self = Self("send_video");
    pub const SEND_VOICE: Self = Self("send_voice");

    pub const fn new(name: &'static str) -> Self {
        Self(name)
    }

    pub const fn as_str(self) -> &'static str {
        self.0
    }
}

impl fmt::Display for IntentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// A response bound to the operation that will deliver it.
#[derive(Debug, Clone, PartialEq)]
pub struct DeliveryIntent {
    pub kind: IntentKind,
    pub response: Response,
}

/// Two-level registry: response kind → intent, and for single-file
/// responses, file kind → intent.
pub struct ResponseDispatcher {
    by_response: HashMap<ResponseKind, IntentKind>,
    by_file: HashMap<FileKind, IntentKind>,
    media_group: IntentKind,
    default_file: IntentKind,
    stats: Arc<dyn StatsSink>,
}

impl ResponseDispatcher {
    /// A dispatcher with no response mappings.
    pub fn empty(stats: Arc<dyn StatsSink>) -> Self {
        Self {
            by_response: HashMap::new(),
            by_file: HashMap::new(),
            media_group: IntentKind::SEND_MEDIA_GROUP,
            default_file: IntentKind::SEND_DOCUMENT,
            stats,
        }
    }

    /// The stock mappings for every response kind and the common file kinds.
    pub fn with_defaults(stats: Arc<dyn StatsSink>) -> Self {
        let mut dispatcher = Self::empty(stats);
        dispatcher
            .register(ResponseKind::Text, IntentKind::SEND_TEXT)
            .register(ResponseKind::Edit, IntentKind::EDIT_TEXT)
            .register(ResponseKind::Delete, IntentKind::DELETE)
            .register(ResponseKind::Location, IntentKind::SEND_LOCATION)
            .register_file(FileKind::Photo, IntentKind::SEND_PHOTO)
            .register_file(FileKind::Video, IntentKind::SEND_VIDEO)
            .register_file(FileKind::Voice, IntentKind::SEND_VOICE)
            .register_file(FileKind::Audio, IntentKind::SEND_AUDIO)
            .register_file(FileKind::Document, IntentKind::SEND_DOCUMENT);
        dispatcher
    }

    /// Map a non-file response kind. File responses always go through the
    /// file table.
    pub fn register(&mut self, kind: ResponseKind, intent: IntentKind) -> &mut Self {
        self.by_response.insert(kind, intent);
        self
    }

    pub fn register_file(&mut self, kind: FileKind, intent: IntentKind) -> &mut Self {
        self.by_file.insert(kind, intent);
        self
    }

    /// Choose the delivery intent for `response`.
    ///
    /// Wiring errors are reported to stats before being returned.
    pub fn dispatch(&self, response: Response) -> Result<DeliveryIntent> {
        let kind = match &response {
            Response::File(file) => match file.files.as_slice() {
                [] => return Err(self.fail(&response, DispatchError::EmptyFileResponse)),
                [single] => self.file_intent(single.kind, &response),
                _ => self.media_group,
            },
            other => match self.by_response.get(&other.kind()) {
                Some(intent) => *intent,
                None => {
                    let err = DispatchError::missing_mapper(other.kind());
                    return Err(self.fail(&response, err));
                },
            },
        };
        Ok(DeliveryIntent { kind, response })
    }

    fn file_intent(&self, kind: FileKind, response: &Response) -> IntentKind {
        if let Some(intent) = self.by_file.get(&kind) {
            return *intent;
        }
        let context = response.describe();
        warn!(%kind, fallback = %self.default_file, "no delivery mapping for file kind");
        self.stats.increment_errors(
            &context,
            None,
            &format!("no delivery mapping for {kind} files, sending as {}", self.default_file),
        );
        self.default_file
    }

    fn fail(&self, response: &Response, err: DispatchError) -> DispatchError {
        let report = anyhow::Error::msg(err.to_string());
        self.stats
            .increment_errors(&response.describe(), Some(&report), "cannot dispatch response");
        err
    }
}
