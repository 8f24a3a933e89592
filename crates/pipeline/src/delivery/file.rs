use {
    async_trait::async_trait,
    herald_channels::{FileKind, MediaItem, Request, Response, SendOptions, WireMethod},
};

use {
    super::{DeliveryContext, DeliveryExecutor, report_context},
    crate::dispatcher::DeliveryIntent,
};

/// Sends the single file of a file response as `kind`.
pub struct SendFileExecutor {
    kind: FileKind,
    /// On failure, send a text message naming the file instead.
    text_fallback: bool,
}

impl SendFileExecutor {
    pub fn new(kind: FileKind) -> Self {
        Self {
            kind,
            text_fallback: false,
        }
    }

    pub fn photo() -> Self {
        Self {
            kind: FileKind::Photo,
            text_fallback: true,
        }
    }
}

#[async_trait]
impl DeliveryExecutor for SendFileExecutor {
    async fn deliver(&self, ctx: &DeliveryContext, intent: DeliveryIntent, request: Option<&Request>) {
        let describe = intent.response.describe();
        let response = match intent.response {
            Response::File(response) => response,
            other => return ctx.report_mismatch(intent.kind, &other),
        };
        let context = report_context(request, &describe);
        let Some(file) = response.files.into_iter().next() else {
            ctx.stats.increment_errors(&context, None, "file response without files");
            return;
        };

        let lang = ctx.language(response.chat_id).await;
        let caption = response
            .text
            .as_deref()
            .map(|text| ctx.localizer.substitute(text, &lang));
        let options = SendOptions::from_settings(ctx.settings(response.settings), response.reply_to);
        let method = WireMethod::SendFile {
            chat_id: response.chat_id,
            media: MediaItem {
                kind: self.kind,
                source: file.source.clone(),
                caption: caption.clone(),
                spoiler: file.settings.spoiler,
            },
            options,
        };

        let err = match ctx.execute(intent.kind, method).await {
            Ok(()) => return,
            Err(e) => e,
        };
        if !self.text_fallback {
            ctx.report(&context, err, &format!("failed to send {}", self.kind));
            return;
        }

        ctx.enter_fallback(intent.kind, "text", &err);
        let reference = ctx.localizer.substitute(&file.source.reference(), &lang);
        let text = match caption {
            Some(caption) => format!("{reference}\n{caption}"),
            None => reference,
        };
        let fallback = WireMethod::SendMessage {
            chat_id: response.chat_id,
            text,
            options: options.plain(),
        };
        if let Err(e) = ctx.execute(intent.kind, fallback).await {
            ctx.report(&context, e, "failed to send photo and its text fallback");
        }
    }
}
