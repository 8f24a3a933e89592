//! [`Transport`] over the Telegram Bot API.

use {
    async_trait::async_trait,
    herald_channels::{
        FileKind, FileSource, FormattingStyle, MediaItem, SendOptions, Transport, TransportError,
        WireMethod,
    },
    herald_common::{ChatId, MessageId},
    secrecy::ExposeSecret,
    std::{future::Future, sync::OnceLock, time::Duration},
    teloxide::{
        ApiError, RequestError,
        prelude::*,
        types::{
            ChatId as TgChatId, FileId, InputFile, InputMedia, InputMediaAudio, InputMediaDocument,
            InputMediaPhoto, InputMediaVideo, LinkPreviewOptions, MessageId as TgMessageId,
            ParseMode, ReplyParameters,
        },
    },
    tracing::{debug, info, warn},
};

use crate::{config::TelegramConfig, error::Result};

const TELEGRAM_RETRY_AFTER_MAX_RETRIES: usize = 4;

/// Extra time on top of the long-poll timeout before the HTTP client gives up.
const CLIENT_TIMEOUT_MARGIN_SECS: u64 = 15;

/// Applies notification and reply options shared by every send call.
macro_rules! with_delivery_options {
    ($req:expr, $options:expr) => {{
        let mut req = $req;
        if !$options.notification {
            req = req.disable_notification(true);
        }
        if let Some(rp) = reply_parameters($options.reply_to) {
            req = req.reply_parameters(rp);
        }
        req
    }};
}

/// Adds caption and parse mode to a media request.
macro_rules! with_caption {
    ($req:expr, $caption:expr, $options:expr) => {{
        let mut req = $req;
        if let Some(caption) = $caption {
            req = req.caption(caption);
            if let Some(mode) = parse_mode($options.formatting) {
                req = req.parse_mode(mode);
            }
        }
        req
    }};
}

pub struct TelegramTransport {
    bot: Bot,
    handle: OnceLock<String>,
}

impl TelegramTransport {
    pub fn new(bot: Bot) -> Self {
        Self {
            bot,
            handle: OnceLock::new(),
        }
    }

    /// Build a bot whose HTTP timeout outlasts the long-polling timeout.
    pub fn from_config(config: &TelegramConfig) -> Result<Self> {
        let client = teloxide::net::default_reqwest_settings()
            .timeout(Duration::from_secs(
                u64::from(config.poll_timeout_secs) + CLIENT_TIMEOUT_MARGIN_SECS,
            ))
            .build()?;
        let mut bot = Bot::with_client(config.token.expose_secret(), client);
        if let Some(url) = &config.api_url {
            bot = bot.set_api_url(url.clone());
        }
        let transport = Self::new(bot);
        if let Some(handle) = &config.bot_handle {
            transport.set_handle(handle);
        }
        Ok(transport)
    }

    pub fn bot(&self) -> &Bot {
        &self.bot
    }

    /// Resolve the bot's own handle via `getMe` unless one is already set.
    pub async fn identify(&self) -> Result<Option<String>> {
        if let Some(handle) = self.handle.get() {
            return Ok(Some(handle.clone()));
        }
        let me = self.bot.get_me().await?;
        let handle = me.username.clone();
        if let Some(handle) = &handle {
            self.set_handle(handle);
        }
        info!(handle = ?handle, id = me.id.0, "telegram bot identified");
        Ok(handle)
    }

    fn set_handle(&self, handle: &str) {
        let handle = handle.trim_start_matches('@');
        if self.handle.set(handle.to_string()).is_err() {
            debug!(handle, "bot handle already resolved");
        }
    }

    async fn send(&self, method: WireMethod) -> std::result::Result<(), RequestError> {
        let bot = &self.bot;
        let operation = method.name();
        match method {
            WireMethod::SendMessage {
                chat_id,
                text,
                options,
            } => {
                let chat_id = tg_chat(chat_id);
                run_with_retry(operation, || {
                    let mut req = bot
                        .send_message(chat_id, text.clone())
                        .link_preview_options(link_preview(options.web_page_preview));
                    if let Some(mode) = parse_mode(options.formatting) {
                        req = req.parse_mode(mode);
                    }
                    let req = with_delivery_options!(req, options);
                    async move { req.await }
                })
                .await?;
            },
            WireMethod::EditMessageText {
                chat_id,
                message_id,
                text,
                options,
            } => {
                let (chat_id, message_id) = (tg_chat(chat_id), tg_message(message_id));
                run_with_retry(operation, || {
                    let mut req = bot
                        .edit_message_text(chat_id, message_id, text.clone())
                        .link_preview_options(link_preview(options.web_page_preview));
                    if let Some(mode) = parse_mode(options.formatting) {
                        req = req.parse_mode(mode);
                    }
                    async move { req.await }
                })
                .await?;
            },
            WireMethod::DeleteMessage {
                chat_id,
                message_id,
            } => {
                let (chat_id, message_id) = (tg_chat(chat_id), tg_message(message_id));
                run_with_retry(operation, || {
                    let req = bot.delete_message(chat_id, message_id);
                    async move { req.await }
                })
                .await?;
            },
            WireMethod::SendFile {
                chat_id,
                media,
                options,
            } => {
                let chat_id = tg_chat(chat_id);
                run_with_retry(operation, || self.send_file(chat_id, &media, options)).await?;
            },
            WireMethod::SendMediaGroup {
                chat_id,
                items,
                options,
            } => {
                let chat_id = tg_chat(chat_id);
                run_with_retry(operation, || {
                    let media = items.iter().map(|item| input_media(item, options)).collect::<Vec<_>>();
                    let req = with_delivery_options!(bot.send_media_group(chat_id, media), options);
                    async move { req.await }
                })
                .await?;
            },
            WireMethod::SendLocation {
                chat_id,
                latitude,
                longitude,
                options,
            } => {
                let chat_id = tg_chat(chat_id);
                run_with_retry(operation, || {
                    let req = with_delivery_options!(
                        bot.send_location(chat_id, latitude, longitude),
                        options
                    );
                    async move { req.await }
                })
                .await?;
            },
        }
        Ok(())
    }

    async fn send_file(
        &self,
        chat_id: TgChatId,
        media: &MediaItem,
        options: SendOptions,
    ) -> std::result::Result<(), RequestError> {
        let bot = &self.bot;
        let input = input_file(&media.source);
        let caption = media.caption.clone();
        match media.kind {
            FileKind::Photo => {
                let mut req = with_caption!(bot.send_photo(chat_id, input), caption, options);
                if media.spoiler {
                    req = req.has_spoiler(true);
                }
                with_delivery_options!(req, options).await?;
            },
            FileKind::Video => {
                let mut req = with_caption!(bot.send_video(chat_id, input), caption, options);
                if media.spoiler {
                    req = req.has_spoiler(true);
                }
                with_delivery_options!(req, options).await?;
            },
            FileKind::Animation => {
                let mut req = with_caption!(bot.send_animation(chat_id, input), caption, options);
                if media.spoiler {
                    req = req.has_spoiler(true);
                }
                with_delivery_options!(req, options).await?;
            },
            FileKind::Audio => {
                let req = with_caption!(bot.send_audio(chat_id, input), caption, options);
                with_delivery_options!(req, options).await?;
            },
            FileKind::Voice => {
                let req = with_caption!(bot.send_voice(chat_id, input), caption, options);
                with_delivery_options!(req, options).await?;
            },
            FileKind::Document => {
                let req = with_caption!(bot.send_document(chat_id, input), caption, options);
                with_delivery_options!(req, options).await?;
            },
            // Neither accepts a caption.
            FileKind::VideoNote => {
                with_delivery_options!(bot.send_video_note(chat_id, input), options).await?;
            },
            FileKind::Sticker => {
                with_delivery_options!(bot.send_sticker(chat_id, input), options).await?;
            },
        }
        Ok(())
    }
}

#[async_trait]
impl Transport for TelegramTransport {
    async fn execute(&self, method: WireMethod) -> std::result::Result<(), TransportError> {
        let label = method.to_string();
        self.send(method).await.map_err(|e| {
            let classified = classify(e);
            debug!(method = %label, error = %classified, "telegram call failed");
            classified
        })
    }

    fn bot_handle(&self) -> Option<String> {
        self.handle.get().cloned()
    }
}

/// Retry `request` while Telegram answers with `RetryAfter`, sleeping for the
/// requested duration each time.
async fn run_with_retry<T, F, Fut>(
    operation: &'static str,
    mut request: F,
) -> std::result::Result<T, RequestError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<T, RequestError>>,
{
    let mut retries = 0usize;

    loop {
        match request().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                let Some(wait) = retry_after_duration(&err) else {
                    return Err(err);
                };

                if retries >= TELEGRAM_RETRY_AFTER_MAX_RETRIES {
                    warn!(
                        operation,
                        retries,
                        max_retries = TELEGRAM_RETRY_AFTER_MAX_RETRIES,
                        retry_after_secs = wait.as_secs(),
                        "telegram rate limit persisted after retries"
                    );
                    return Err(err);
                }

                retries += 1;
                warn!(
                    operation,
                    retries,
                    max_retries = TELEGRAM_RETRY_AFTER_MAX_RETRIES,
                    retry_after_secs = wait.as_secs(),
                    "telegram rate limited, waiting before retry"
                );
                tokio::time::sleep(wait).await;
            },
        }
    }
}

/// Map a teloxide failure onto the transport-neutral error kinds.
pub fn classify(error: RequestError) -> TransportError {
    match error {
        RequestError::Api(ApiError::CantParseEntities(reason)) => TransportError::MarkupRejected(reason),
        RequestError::Api(ApiError::MessageNotModified) => TransportError::MessageNotModified,
        RequestError::Api(ApiError::MessageToDeleteNotFound) => TransportError::MessageToDeleteNotFound,
        RequestError::Api(
            api @ (ApiError::ChatNotFound | ApiError::MessageTextIsEmpty | ApiError::WrongFileId),
        ) => TransportError::InvalidRequest(api.to_string()),
        RequestError::Api(api) => TransportError::Api(api.to_string()),
        RequestError::RetryAfter(wait) => TransportError::RateLimited(wait.duration()),
        err @ (RequestError::Network(_) | RequestError::Io(_)) => TransportError::Network(err.to_string()),
        other => TransportError::Api(other.to_string()),
    }
}

fn retry_after_duration(error: &RequestError) -> Option<Duration> {
    match error {
        RequestError::RetryAfter(wait) => Some(wait.duration()),
        _ => None,
    }
}

fn tg_chat(chat_id: ChatId) -> TgChatId {
    TgChatId(chat_id.0)
}

fn tg_message(message_id: MessageId) -> TgMessageId {
    TgMessageId(message_id.0)
}

fn parse_mode(style: FormattingStyle) -> Option<ParseMode> {
    match style {
        FormattingStyle::Html => Some(ParseMode::Html),
        FormattingStyle::Markdown => Some(ParseMode::MarkdownV2),
        FormattingStyle::Plain => None,
    }
}

fn reply_parameters(reply_to: Option<MessageId>) -> Option<ReplyParameters> {
    reply_to.map(|id| ReplyParameters::new(tg_message(id)).allow_sending_without_reply())
}

fn link_preview(enabled: bool) -> LinkPreviewOptions {
    LinkPreviewOptions {
        is_disabled: !enabled,
        url: None,
        prefer_small_media: false,
        prefer_large_media: false,
        show_above_text: false,
    }
}

fn input_file(source: &FileSource) -> InputFile {
    match source {
        FileSource::RemoteId(id) => InputFile::file_id(FileId(id.clone())),
        FileSource::Url(url) => InputFile::url(url.clone()),
        FileSource::Path(path) => InputFile::file(path.clone()),
        FileSource::Bytes { data, file_name } => {
            InputFile::memory(data.to_vec()).file_name(file_name.clone())
        },
    }
}

/// Albums only carry photos, videos, audio and documents; anything else
/// travels as a document.
fn input_media(item: &MediaItem, options: SendOptions) -> InputMedia {
    let input = input_file(&item.source);
    let mode = item.caption.as_ref().and_then(|_| parse_mode(options.formatting));
    match item.kind {
        FileKind::Photo => {
            let mut media = InputMediaPhoto::new(input);
            media.caption = item.caption.clone();
            media.parse_mode = mode;
            media.has_spoiler = item.spoiler;
            InputMedia::Photo(media)
        },
        FileKind::Video => {
            let mut media = InputMediaVideo::new(input);
            media.caption = item.caption.clone();
            media.parse_mode = mode;
            media.has_spoiler = item.spoiler;
            InputMedia::Video(media)
        },
        FileKind::Audio => {
            let mut media = InputMediaAudio::new(input);
            media.caption = item.caption.clone();
            media.parse_mode = mode;
            InputMedia::Audio(media)
        },
        FileKind::Document
        | FileKind::Animation
        | FileKind::Voice
        | FileKind::VideoNote
        | FileKind::Sticker => {
            let mut media = InputMediaDocument::new(input);
            media.caption = item.caption.clone();
            media.parse_mode = mode;
            InputMedia::Document(media)
        },
    }
}
