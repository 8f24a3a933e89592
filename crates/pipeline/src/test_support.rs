#![allow(clippy::unwrap_used, clippy::expect_used)]

use {
    async_trait::async_trait,
    chrono::Utc,
    herald_channels::{
        BundleLocalizer, Chat, ChatKind, ContentType, Message, MessageKind, Request, RequestSource,
        Transport, TransportError, User, WireMethod,
    },
    herald_common::{ChatId, MessageId, UserId},
    herald_metrics::BotStats,
    std::{
        collections::{HashMap, VecDeque},
        sync::{Arc, Mutex},
    },
};

use crate::delivery::{DeliveryContext, DeliveryService};

/// Transport that records every call and fails on demand.
#[derive(Default)]
pub struct RecordingTransport {
    calls: Mutex<Vec<WireMethod>>,
    failures: Mutex<HashMap<&'static str, VecDeque<TransportError>>>,
}

impl RecordingTransport {
    /// Fail the next call of `method` (Bot API name, e.g. `sendPhoto`).
    /// Queued failures are consumed in order.
    pub fn fail_next(&self, method: &'static str, err: TransportError) {
        self.failures
            .lock()
            .unwrap()
            .entry(method)
            .or_default()
            .push_back(err);
    }

    pub fn calls(&self) -> Vec<WireMethod> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn execute(&self, method: WireMethod) -> Result<(), TransportError> {
        let name = method.name();
        self.calls.lock().unwrap().push(method);
        match self
            .failures
            .lock()
            .unwrap()
            .get_mut(name)
            .and_then(VecDeque::pop_front)
        {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn bot_handle(&self) -> Option<String> {
        Some("herald_bot".into())
    }
}

/// Texts of every `sendMessage` call, in order.
pub fn sent_texts(transport: &RecordingTransport) -> Vec<String> {
    transport
        .calls()
        .into_iter()
        .filter_map(|call| match call {
            WireMethod::SendMessage { text, .. } => Some(text),
            _ => None,
        })
        .collect()
}

pub fn localizer() -> BundleLocalizer {
    BundleLocalizer::new("en").with_bundle(
        "en",
        HashMap::from([("greeting".to_string(), "Hello".to_string())]),
    )
}

/// Stock delivery over `transport` with fresh stats.
pub fn delivery_service(transport: Arc<RecordingTransport>) -> (Arc<BotStats>, DeliveryService) {
    let stats = Arc::new(BotStats::new());
    let ctx = DeliveryContext::new(transport, Arc::new(localizer()), stats.clone());
    (stats, DeliveryService::with_defaults(ctx))
}

pub fn text_request(chat: i64, user: i64, text: &str) -> Request {
    Request::new(
        Message {
            chat: Chat {
                id: ChatId(chat),
                kind: ChatKind::Group,
                title: None,
                username: None,
            },
            user: User {
                id: UserId(user),
                is_bot: false,
                first_name: "Ada".into(),
                last_name: None,
                username: Some("ada".into()),
                language_code: Some("en".into()),
            },
            message_id: MessageId(100),
            reply_to_message: None,
            text: Some(text.into()),
            date_time: Utc::now(),
            edit_date_time: None,
            kind: MessageKind::Common,
            content_type: ContentType::Text,
            attachments: Vec::new(),
            reactions: None,
        },
        RequestSource::ChatPlatform,
    )
}
