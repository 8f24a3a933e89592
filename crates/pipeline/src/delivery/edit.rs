use {
    async_trait::async_trait,
    herald_channels::{Request, Response, SendOptions, TransportError, WireMethod},
    herald_metrics::{counter, delivery as delivery_metrics, labels},
    tracing::debug,
};

use {
    super::{DeliveryContext, DeliveryExecutor, report_context, text::execute_with_plain_retry},
    crate::dispatcher::{DeliveryIntent, IntentKind},
};

pub struct EditTextExecutor;

#[async_trait]
impl DeliveryExecutor for EditTextExecutor {
    async fn deliver(&self, ctx: &DeliveryContext, intent: DeliveryIntent, request: Option<&Request>) {
        let response = match intent.response {
            Response::Edit(response) => response,
            other => return ctx.report_mismatch(intent.kind, &other),
        };
        let text = ctx.localize(response.chat_id, &response.text).await;
        let method = WireMethod::EditMessageText {
            chat_id: response.chat_id,
            message_id: response.message_id,
            text,
            options: SendOptions::from_settings(ctx.settings(response.settings), None),
        };
        if let Err(e) = execute_with_plain_retry(ctx, intent.kind, method).await {
            let context = report_context(
                request,
                &format!("response=edit chat={} message={}", response.chat_id, response.message_id),
            );
            finish(ctx, intent.kind, &context, e, "failed to edit message");
        }
    }
}

pub struct DeleteExecutor;

#[async_trait]
impl DeliveryExecutor for DeleteExecutor {
    async fn deliver(&self, ctx: &DeliveryContext, intent: DeliveryIntent, request: Option<&Request>) {
        let response = match intent.response {
            Response::Delete(response) => response,
            other => return ctx.report_mismatch(intent.kind, &other),
        };
        let method = WireMethod::DeleteMessage {
            chat_id: response.chat_id,
            message_id: response.message_id,
        };
        if let Err(e) = ctx.execute(intent.kind, method).await {
            let context = report_context(
                request,
                &format!("response=delete chat={} message={}", response.chat_id, response.message_id),
            );
            finish(ctx, intent.kind, &context, e, "failed to delete message");
        }
    }
}

/// Benign outcomes are logged and dropped; anything else is reported.
fn finish(ctx: &DeliveryContext, intent: IntentKind, context: &str, err: TransportError, message: &str) {
    if err.is_benign() {
        debug!(%intent, context, error = %err, "ignoring no-op failure");
        counter!(delivery_metrics::IGNORED_FAILURES_TOTAL, labels::INTENT => intent.as_str()).increment(1);
        return;
    }
    ctx.report(context, err, message);
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::test_support::{RecordingTransport, delivery_service},
        herald_channels::{DeleteResponse, EditResponse},
        herald_common::{ChatId, MessageId},
        std::sync::Arc,
    };

    fn edit() -> Response {
        EditResponse {
            chat_id: ChatId(1),
            message_id: MessageId(5),
            text: "updated".into(),
            settings: None,
        }
        .into()
    }

    fn delete() -> Response {
        DeleteResponse {
            chat_id: ChatId(1),
            message_id: MessageId(5),
        }
        .into()
    }

    #[tokio::test]
    async fn not_modified_edit_is_not_counted() {
        let transport = Arc::new(RecordingTransport::default());
        transport.fail_next("editMessageText", TransportError::MessageNotModified);
        let (stats, service) = delivery_service(Arc::clone(&transport));

        service.deliver(edit(), None).await.unwrap();
        assert_eq!(transport.calls().len(), 1);
        assert_eq!(stats.errors(), 0);
    }

    #[tokio::test]
    async fn failed_edit_is_reported() {
        let transport = Arc::new(RecordingTransport::default());
        transport.fail_next("editMessageText", TransportError::Api("message can't be edited".into()));
        let (stats, service) = delivery_service(Arc::clone(&transport));

        service.deliver(edit(), None).await.unwrap();
        assert_eq!(stats.errors(), 1);
        assert_eq!(stats.recent_errors()[0].context, "response=edit chat=1 message=5");
    }

    #[tokio::test]
    async fn already_deleted_is_not_counted() {
        let transport = Arc::new(RecordingTransport::default());
        transport.fail_next("deleteMessage", TransportError::MessageToDeleteNotFound);
        let (stats, service) = delivery_service(Arc::clone(&transport));

        service.deliver(delete(), None).await.unwrap();
        assert_eq!(stats.errors(), 0);
    }

    #[tokio::test]
    async fn failed_delete_is_reported() {
        let transport = Arc::new(RecordingTransport::default());
        transport.fail_next("deleteMessage", TransportError::Network("timeout".into()));
        let (stats, service) = delivery_service(Arc::clone(&transport));

        service.deliver(delete(), None).await.unwrap();
        assert_eq!(stats.errors(), 1);
    }
}
