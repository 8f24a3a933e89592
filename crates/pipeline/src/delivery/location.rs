use {
    async_trait::async_trait,
    herald_channels::{Request, Response, SendOptions, WireMethod},
};

use {
    super::{DeliveryContext, DeliveryExecutor, report_context},
    crate::dispatcher::DeliveryIntent,
};

/// Sends a map point. No fallback.
pub struct SendLocationExecutor;

#[async_trait]
impl DeliveryExecutor for SendLocationExecutor {
    async fn deliver(&self, ctx: &DeliveryContext, intent: DeliveryIntent, request: Option<&Request>) {
        let response = match intent.response {
            Response::Location(response) => response,
            other => return ctx.report_mismatch(intent.kind, &other),
        };
        let method = WireMethod::SendLocation {
            chat_id: response.chat_id,
            latitude: response.latitude,
            longitude: response.longitude,
            options: SendOptions::from_settings(ctx.settings(response.settings), response.reply_to),
        };
        if let Err(e) = ctx.execute(intent.kind, method).await {
            let context = report_context(request, &format!("response=location chat={}", response.chat_id));
            ctx.report(&context, e, "failed to send location");
        }
    }
}
