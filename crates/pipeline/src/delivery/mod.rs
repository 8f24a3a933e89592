//! Delivery executors: one per [`IntentKind`], each owning its transport
//! calls and fallback chain.
//!
//! Executors never return errors. Every failure is either absorbed by a
//! fallback stage, logged as a known no-op, or reported to the stats sink
//! with the request and response context.

mod edit;
mod file;
mod location;
mod media_group;
mod text;

use {
    async_trait::async_trait,
    herald_channels::{
        FileKind, Localizer, Request, Response, ResponseSettings, Transport, TransportError,
        WireMethod,
    },
    herald_common::ChatId,
    herald_metrics::{StatsSink, counter, delivery as delivery_metrics, labels},
    std::{collections::HashMap, sync::Arc},
    tracing::{error, warn},
};

pub use {
    edit::{DeleteExecutor, EditTextExecutor},
    file::SendFileExecutor,
    location::SendLocationExecutor,
    media_group::SendMediaGroupExecutor,
    text::SendTextExecutor,
};

use crate::{
    dispatcher::{DeliveryIntent, IntentKind, ResponseDispatcher},
    error::{DispatchError, Result},
};

/// Longest text a single message may carry by default.
pub const DEFAULT_MAX_TEXT_LEN: usize = 4096;

/// Shared collaborators for every executor.
#[derive(Clone)]
pub struct DeliveryContext {
    pub transport: Arc<dyn Transport>,
    pub localizer: Arc<dyn Localizer>,
    pub stats: Arc<dyn StatsSink>,
    /// Maximum characters per text message.
    pub max_text_len: usize,
    /// Settings applied to responses that carry none.
    pub default_settings: ResponseSettings,
}

impl DeliveryContext {
    pub fn new(
        transport: Arc<dyn Transport>,
        localizer: Arc<dyn Localizer>,
        stats: Arc<dyn StatsSink>,
    ) -> Self {
        Self {
            transport,
            localizer,
            stats,
            max_text_len: DEFAULT_MAX_TEXT_LEN,
            default_settings: ResponseSettings::default(),
        }
    }

    #[must_use]
    pub fn with_max_text_len(mut self, max_text_len: usize) -> Self {
        self.max_text_len = max_text_len;
        self
    }

    #[must_use]
    pub fn with_default_settings(mut self, settings: ResponseSettings) -> Self {
        self.default_settings = settings;
        self
    }

    pub fn settings(&self, settings: Option<ResponseSettings>) -> ResponseSettings {
        settings.unwrap_or(self.default_settings)
    }

    /// Substitute localized strings for the chat's language.
    pub async fn localize(&self, chat: ChatId, text: &str) -> String {
        let lang = self.language(chat).await;
        self.localizer.substitute(text, &lang)
    }

    /// Resolve once, then [`Localizer::substitute`] each text of a
    /// multi-part delivery.
    pub async fn language(&self, chat: ChatId) -> String {
        self.localizer.resolve_language(chat).await
    }

    pub(crate) async fn execute(
        &self,
        intent: IntentKind,
        method: WireMethod,
    ) -> std::result::Result<(), TransportError> {
        counter!(delivery_metrics::ATTEMPTS_TOTAL, labels::INTENT => intent.as_str()).increment(1);
        self.transport.execute(method).await
    }

    pub(crate) fn enter_fallback(&self, intent: IntentKind, stage: &'static str, err: &TransportError) {
        warn!(%intent, stage, error = %err, "delivery failed, falling back");
        counter!(
            delivery_metrics::FALLBACKS_TOTAL,
            labels::INTENT => intent.as_str(),
            labels::STAGE => stage
        )
        .increment(1);
    }

    pub(crate) fn report(&self, context: &str, err: TransportError, message: &str) {
        let err = anyhow::Error::new(err);
        self.stats.increment_errors(context, Some(&err), message);
    }

    /// The response variant does not fit the intent it was dispatched to.
    pub(crate) fn report_mismatch(&self, intent: IntentKind, response: &Response) {
        self.stats.increment_errors(
            &response.describe(),
            None,
            &format!("response cannot be delivered as {intent}"),
        );
    }
}

/// Report context naming the request (when known) and the response.
pub(crate) fn report_context(request: Option<&Request>, response: &str) -> String {
    match request {
        Some(request) => format!("{} {response}", request.describe()),
        None => response.to_string(),
    }
}

/// Performs one kind of delivery.
#[async_trait]
pub trait DeliveryExecutor: Send + Sync {
    async fn deliver(&self, ctx: &DeliveryContext, intent: DeliveryIntent, request: Option<&Request>);
}

/// Dispatcher plus executors: the single entry point for sending responses.
pub struct DeliveryService {
    dispatcher: ResponseDispatcher,
    executors: HashMap<IntentKind, Arc<dyn DeliveryExecutor>>,
    ctx: DeliveryContext,
}

impl DeliveryService {
    pub fn new(dispatcher: ResponseDispatcher, ctx: DeliveryContext) -> Self {
        Self {
            dispatcher,
            executors: HashMap::new(),
            ctx,
        }
    }

    /// Stock dispatcher mappings with an executor for each of them.
    pub fn with_defaults(ctx: DeliveryContext) -> Self {
        let dispatcher = ResponseDispatcher::with_defaults(Arc::clone(&ctx.stats));
        let mut service = Self::new(dispatcher, ctx);
        service
            .register(IntentKind::SEND_TEXT, Arc::new(SendTextExecutor))
            .register(IntentKind::EDIT_TEXT, Arc::new(EditTextExecutor))
            .register(IntentKind::DELETE, Arc::new(DeleteExecutor))
            .register(IntentKind::SEND_PHOTO, Arc::new(SendFileExecutor::photo()))
            .register(
                IntentKind::SEND_VIDEO,
                Arc::new(SendFileExecutor::new(FileKind::Video)),
            )
            .register(
                IntentKind::SEND_VOICE,
                Arc::new(SendFileExecutor::new(FileKind::Voice)),
            )
            .register(
                IntentKind::SEND_AUDIO,
                Arc::new(SendFileExecutor::new(FileKind::Audio)),
            )
            .register(
                IntentKind::SEND_DOCUMENT,
                Arc::new(SendFileExecutor::new(FileKind::Document)),
            )
            .register(IntentKind::SEND_MEDIA_GROUP, Arc::new(SendMediaGroupExecutor))
            .register(IntentKind::SEND_LOCATION, Arc::new(SendLocationExecutor));
        service
    }

    pub fn register(&mut self, intent: IntentKind, executor: Arc<dyn DeliveryExecutor>) -> &mut Self {
        self.executors.insert(intent, executor);
        self
    }

    pub fn dispatcher_mut(&mut self) -> &mut ResponseDispatcher {
        &mut self.dispatcher
    }

    pub fn context(&self) -> &DeliveryContext {
        &self.ctx
    }

    /// Dispatch and deliver one response. Only wiring errors are returned;
    /// they have already been reported.
    pub async fn deliver(&self, response: Response, request: Option<&Request>) -> Result<()> {
        let intent = self.dispatcher.dispatch(response)?;
        let Some(executor) = self.executors.get(&intent.kind) else {
            let err = DispatchError::missing_executor(intent.kind);
            let report = anyhow::Error::msg(err.to_string());
            self.ctx.stats.increment_errors(
                &report_context(request, &intent.response.describe()),
                Some(&report),
                "cannot deliver response",
            );
            return Err(err);
        };
        executor.deliver(&self.ctx, intent, request).await;
        Ok(())
    }

    /// Deliver responses in order, logging and skipping the undeliverable.
    pub async fn deliver_all(&self, responses: Vec<Response>, request: Option<&Request>) {
        for response in responses {
            if let Err(e) = self.deliver(response, request).await {
                error!(error = %e, "response dropped");
            }
        }
    }
}

/// Split `text` into chunks of at most `limit` characters.
///
/// Chunks are cut on character boundaries only; concatenating them yields
/// `text` again. Empty text yields no chunks.
pub fn split_text(text: &str, limit: usize) -> Vec<&str> {
    if text.is_empty() {
        return Vec::new();
    }
    if limit == 0 {
        return vec![text];
    }
    let mut chunks = Vec::new();
    let mut rest = text;
    while !rest.is_empty() {
        let end = rest
            .char_indices()
            .nth(limit)
            .map_or(rest.len(), |(idx, _)| idx);
        let (chunk, tail) = rest.split_at(end);
        chunks.push(chunk);
        rest = tail;
    }
    chunks
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::test_support::RecordingTransport,
        herald_channels::{BundleLocalizer, TextResponse},
        herald_metrics::BotStats,
        rstest::rstest,
    };

    #[test]
    fn five_thousand_chars_split_in_two() {
        let text = "x".repeat(5000);
        let chunks = split_text(&text, 4096);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].chars().count(), 4096);
        assert_eq!(chunks[1].chars().count(), 904);
        assert_eq!(chunks.concat(), text);
    }

    #[rstest]
    #[case("", 10, 0)]
    #[case("short", 10, 1)]
    #[case("exactly10!", 10, 1)]
    #[case("exactly10!!", 10, 2)]
    #[case("abc", 0, 1)]
    fn chunk_counts(#[case] text: &str, #[case] limit: usize, #[case] expected: usize) {
        let chunks = split_text(text, limit);
        assert_eq!(chunks.len(), expected);
        assert_eq!(chunks.concat(), text);
    }

    #[test]
    fn split_respects_multibyte_characters() {
        let text = "привет👍".repeat(3);
        let chunks = split_text(&text, 5);
        assert!(chunks.iter().all(|c| c.chars().count() <= 5));
        assert_eq!(chunks.concat(), text);
    }

    #[tokio::test]
    async fn missing_executor_is_reported() {
        let transport = Arc::new(RecordingTransport::default());
        let stats = Arc::new(BotStats::new());
        let ctx = DeliveryContext::new(
            transport.clone(),
            Arc::new(BundleLocalizer::new("en")),
            stats.clone(),
        );
        let service = DeliveryService::new(ResponseDispatcher::with_defaults(stats.clone()), ctx);

        let err = service
            .deliver(TextResponse::new(ChatId(1), "hi").into(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::MissingExecutor { .. }));
        assert_eq!(stats.errors(), 1);
        assert!(transport.calls().is_empty());
    }
}
