use {
    async_trait::async_trait,
    herald_channels::{FormattingStyle, Request, Response, SendOptions, TransportError, WireMethod},
    herald_metrics::{counter, delivery as delivery_metrics},
    tracing::debug,
};

use {
    super::{DeliveryContext, DeliveryExecutor, report_context, split_text},
    crate::dispatcher::{DeliveryIntent, IntentKind},
};

/// Sends text, split into as many messages as the length limit requires.
pub struct SendTextExecutor;

#[async_trait]
impl DeliveryExecutor for SendTextExecutor {
    async fn deliver(&self, ctx: &DeliveryContext, intent: DeliveryIntent, request: Option<&Request>) {
        let response = match intent.response {
            Response::Text(response) => response,
            other => return ctx.report_mismatch(intent.kind, &other),
        };
        let context = report_context(request, &format!("response=text chat={}", response.chat_id));
        let options = SendOptions::from_settings(ctx.settings(response.settings), response.reply_to);
        let text = ctx.localize(response.chat_id, &response.text).await;

        let chunks = split_text(&text, ctx.max_text_len);
        if chunks.is_empty() {
            debug!(chat = %response.chat_id, "empty text response, nothing to send");
            return;
        }
        if chunks.len() > 1 {
            debug!(chat = %response.chat_id, chunks = chunks.len(), "splitting long text");
        }
        counter!(delivery_metrics::TEXT_CHUNKS_TOTAL).increment(chunks.len() as u64);

        for chunk in chunks {
            let method = WireMethod::SendMessage {
                chat_id: response.chat_id,
                text: chunk.to_string(),
                options,
            };
            if let Err(e) = execute_with_plain_retry(ctx, intent.kind, method).await {
                ctx.report(&context, e, "failed to send text message");
            }
        }
    }
}

/// Run `method`; if the transport rejects its markup, retry once as plain text.
pub(crate) async fn execute_with_plain_retry(
    ctx: &DeliveryContext,
    intent: IntentKind,
    method: WireMethod,
) -> Result<(), TransportError> {
    let plain = without_markup(&method);
    match ctx.execute(intent, method).await {
        Err(e) if e.is_markup_rejection() => match plain {
            Some(plain) => {
                ctx.enter_fallback(intent, "plain_text", &e);
                ctx.execute(intent, plain).await
            },
            None => Err(e),
        },
        other => other,
    }
}

/// The same text operation with formatting disabled, if it had any.
fn without_markup(method: &WireMethod) -> Option<WireMethod> {
    let mut plain = method.clone();
    let options = match &mut plain {
        WireMethod::SendMessage { options, .. } | WireMethod::EditMessageText { options, .. } => options,
        _ => return None,
    };
    if options.formatting == FormattingStyle::Plain {
        return None;
    }
    *options = options.plain();
    Some(plain)
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::test_support::{RecordingTransport, delivery_service, sent_texts},
        herald_channels::{ResponseSettings, TextResponse},
        herald_common::{ChatId, MessageId},
        std::sync::Arc,
    };

    #[tokio::test]
    async fn long_text_is_sent_in_order() {
        let transport = Arc::new(RecordingTransport::default());
        let (stats, service) = delivery_service(Arc::clone(&transport));
        let text = format!("{}{}", "a".repeat(4096), "b".repeat(904));

        service
            .deliver(TextResponse::new(ChatId(1), text.clone()).into(), None)
            .await
            .unwrap();

        let sent = sent_texts(&transport);
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].chars().count(), 4096);
        assert_eq!(sent.concat(), text);
        assert_eq!(stats.errors(), 0);
    }

    #[tokio::test]
    async fn chunks_share_settings() {
        let transport = Arc::new(RecordingTransport::default());
        let (_, service) = delivery_service(Arc::clone(&transport));
        let response = TextResponse::new(ChatId(1), "x".repeat(5000))
            .reply_to(MessageId(9))
            .settings(ResponseSettings::default().silent());
        service.deliver(response.into(), None).await.unwrap();

        let calls = transport.calls();
        assert_eq!(calls.len(), 2);
        for call in &calls {
            let WireMethod::SendMessage { options, .. } = call else {
                panic!("unexpected call {call:?}");
            };
            assert!(!options.notification);
            assert_eq!(options.reply_to, Some(MessageId(9)));
        }
    }

    #[tokio::test]
    async fn markup_rejection_retries_once_as_plain() {
        let transport = Arc::new(RecordingTransport::default());
        transport.fail_next("sendMessage", TransportError::MarkupRejected("unclosed <b>".into()));
        let (stats, service) = delivery_service(Arc::clone(&transport));

        service
            .deliver(TextResponse::new(ChatId(1), "<b>bold").into(), None)
            .await
            .unwrap();

        let calls = transport.calls();
        assert_eq!(calls.len(), 2);
        let WireMethod::SendMessage { options, .. } = &calls[1] else {
            panic!("unexpected call");
        };
        assert_eq!(options.formatting, FormattingStyle::Plain);
        assert_eq!(stats.errors(), 0);
    }

    #[tokio::test]
    async fn second_failure_is_reported_once() {
        let transport = Arc::new(RecordingTransport::default());
        transport.fail_next("sendMessage", TransportError::MarkupRejected("bad".into()));
        transport.fail_next("sendMessage", TransportError::Network("reset".into()));
        let (stats, service) = delivery_service(Arc::clone(&transport));

        service
            .deliver(TextResponse::new(ChatId(1), "<i>x").into(), None)
            .await
            .unwrap();

        assert_eq!(transport.calls().len(), 2);
        assert_eq!(stats.errors(), 1);
    }

    #[tokio::test]
    async fn other_failures_are_not_retried() {
        let transport = Arc::new(RecordingTransport::default());
        transport.fail_next("sendMessage", TransportError::Api("chat not found".into()));
        let (stats, service) = delivery_service(Arc::clone(&transport));

        service
            .deliver(TextResponse::new(ChatId(1), "hi").into(), None)
            .await
            .unwrap();

        assert_eq!(transport.calls().len(), 1);
        assert_eq!(stats.errors(), 1);
    }

    #[tokio::test]
    async fn text_is_localized_before_sending() {
        let transport = Arc::new(RecordingTransport::default());
        let (_, service) = delivery_service(Arc::clone(&transport));
        service
            .deliver(TextResponse::new(ChatId(1), "{{greeting}}, Ada").into(), None)
            .await
            .unwrap();
        assert_eq!(sent_texts(&transport), vec!["Hello, Ada".to_string()]);
    }
}
