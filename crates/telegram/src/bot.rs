use std::{sync::Arc, time::Duration};

use {
    herald_channels::RawUpdate,
    herald_pipeline::{Outcome, Pipeline},
    serde::Deserialize,
    serde_json::{Value, json},
    teloxide::prelude::*,
    tokio::task::JoinHandle,
    tokio_util::sync::CancellationToken,
    tracing::{debug, info, warn},
};

use crate::{
    error::{Error, Result},
    transport::TelegramTransport,
};

const POLL_ERROR_BACKOFF: Duration = Duration::from_secs(5);

/// Update types the pipeline normalizes.
const ALLOWED_UPDATES: [&str; 4] = [
    "message",
    "edited_message",
    "callback_query",
    "message_reaction",
];

/// A running polling loop.
pub struct Polling {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl Polling {
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Stop fetching updates and wait for the loop to exit.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        if let Err(e) = self.task.await {
            warn!(error = %e, "telegram polling task ended abnormally");
        }
    }
}

/// One entry of a `getUpdates` batch.
#[derive(Debug)]
pub struct DecodedUpdate {
    pub update_id: i64,
    pub update: Result<RawUpdate>,
}

/// Bot API response envelope.
#[derive(Debug, Deserialize)]
struct Envelope {
    ok: bool,
    #[serde(default)]
    result: Vec<Value>,
    #[serde(default)]
    error_code: u16,
    #[serde(default)]
    description: String,
    #[serde(default)]
    parameters: Option<ResponseParameters>,
}

#[derive(Debug, Deserialize)]
struct ResponseParameters {
    #[serde(default)]
    retry_after: Option<u64>,
}

/// Start long polling and hand every update to `pipeline` in its own task.
pub async fn start_polling(
    transport: Arc<TelegramTransport>,
    pipeline: Arc<Pipeline>,
    poll_timeout_secs: u32,
) -> Result<Polling> {
    let handle = transport.identify().await?;

    // Long polling does not work while a webhook is set.
    transport.bot().delete_webhook().send().await?;
    info!(handle = ?handle, "telegram bot connected (webhook cleared)");

    let cancel = CancellationToken::new();
    let task = tokio::spawn(poll_loop(transport, pipeline, poll_timeout_secs, cancel.clone()));
    Ok(Polling { cancel, task })
}

async fn poll_loop(
    transport: Arc<TelegramTransport>,
    pipeline: Arc<Pipeline>,
    poll_timeout_secs: u32,
    cancel: CancellationToken,
) {
    info!(poll_timeout_secs, "starting telegram polling loop");
    let bot = transport.bot().clone();
    let mut offset: i64 = 0;

    loop {
        let result = tokio::select! {
            () = cancel.cancelled() => break,
            result = fetch_updates(&bot, offset, poll_timeout_secs) => result,
        };

        match result {
            Ok(updates) => {
                debug!(count = updates.len(), "got telegram updates");
                for DecodedUpdate { update_id, update } in updates {
                    offset = offset.max(update_id + 1);
                    match update {
                        Ok(raw) => dispatch(Arc::clone(&pipeline), raw),
                        Err(e) => warn!(error = %e, "skipping telegram update"),
                    }
                }
            },
            Err(e) if e.is_conflict() => {
                warn!("telegram polling stopped: another instance is already running with this token");
                cancel.cancel();
                break;
            },
            Err(e) => {
                let backoff = e.retry_after().map_or(POLL_ERROR_BACKOFF, Duration::from_secs);
                warn!(error = %e, backoff_secs = backoff.as_secs(), "telegram getUpdates failed");
                tokio::select! {
                    () = cancel.cancelled() => break,
                    () = tokio::time::sleep(backoff) => {},
                }
            },
        }
    }
    info!("telegram polling stopped");
}

fn dispatch(pipeline: Arc<Pipeline>, update: RawUpdate) {
    tokio::spawn(async move {
        if let Outcome::Processed { analyzers, .. } = pipeline.handle(update).await {
            analyzers.join().await;
        }
    });
}

/// Call `getUpdates` and keep the Bot API JSON, which decodes straight into
/// [`RawUpdate`].
async fn fetch_updates(bot: &Bot, offset: i64, poll_timeout_secs: u32) -> Result<Vec<DecodedUpdate>> {
    // The request URL carries the token; keep it out of errors.
    let response = bot
        .client()
        .post(method_url(&bot.api_url(), bot.token(), "getUpdates"))
        .json(&get_updates_params(offset, poll_timeout_secs))
        .send()
        .await
        .map_err(|e| Error::Reqwest(e.without_url()))?;
    let body = response
        .bytes()
        .await
        .map_err(|e| Error::Reqwest(e.without_url()))?;
    decode_updates(&body)
}

fn method_url(api_url: &url::Url, token: &str, method: &str) -> String {
    format!("{}/bot{token}/{method}", api_url.as_str().trim_end_matches('/'))
}

fn get_updates_params(offset: i64, poll_timeout_secs: u32) -> Value {
    json!({
        "offset": offset,
        "timeout": poll_timeout_secs,
        "allowed_updates": ALLOWED_UPDATES,
    })
}

/// Decode a `getUpdates` response body. Each update keeps its id even when
/// its payload does not decode, so the offset can move past it.
pub fn decode_updates(body: &[u8]) -> Result<Vec<DecodedUpdate>> {
    let envelope: Envelope = serde_json::from_slice(body).map_err(Error::MalformedResponse)?;
    if !envelope.ok {
        return Err(Error::Api {
            code: envelope.error_code,
            description: envelope.description,
            retry_after: envelope.parameters.and_then(|p| p.retry_after),
        });
    }

    Ok(envelope
        .result
        .into_iter()
        .filter_map(|value| {
            let Some(update_id) = value.get("update_id").and_then(Value::as_i64) else {
                warn!("skipping telegram update without update_id");
                return None;
            };
            let update = serde_json::from_value(value)
                .map_err(|e| Error::malformed_update(update_id, e));
            Some(DecodedUpdate { update_id, update })
        })
        .collect())
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        herald_channels::{ContentType, MessageKind, Request},
        herald_common::{MessageId, UserId},
        herald_pipeline::normalize,
    };

    fn chat() -> Value {
        json!({ "id": -100_123, "type": "supergroup", "title": "herald dev" })
    }

    fn ada() -> Value {
        json!({ "id": 42, "is_bot": false, "first_name": "Ada", "username": "ada" })
    }

    fn batch(updates: Value) -> Vec<u8> {
        serde_json::to_vec(&json!({ "ok": true, "result": updates })).unwrap()
    }

    fn single(update: Value) -> Request {
        let decoded = decode_updates(&batch(json!([update]))).unwrap();
        assert_eq!(decoded.len(), 1);
        let raw = decoded.into_iter().next().unwrap().update.unwrap();
        normalize(raw).unwrap()
    }

    #[test]
    fn text_message_with_reply() {
        let request = single(json!({
            "update_id": 10,
            "message": {
                "message_id": 77,
                "date": 1_700_000_000,
                "chat": chat(),
                "from": ada(),
                "text": "/weather@herald_bot Oslo",
                "reply_to_message": {
                    "message_id": 70,
                    "date": 1_699_999_000,
                    "chat": chat(),
                    "from": { "id": 7, "is_bot": false, "first_name": "Grace" },
                    "text": "where?",
                    "reply_to_message": {
                        "message_id": 60, "date": 1_699_998_000, "chat": chat(), "text": "root"
                    }
                }
            }
        }));

        let m = &request.message;
        assert_eq!(m.kind, MessageKind::Common);
        assert_eq!(m.content_type, ContentType::Text);
        assert_eq!(m.text.as_deref(), Some("/weather@herald_bot Oslo"));
        assert_eq!(m.user.id, UserId(42));
        assert_eq!(m.user.username.as_deref(), Some("ada"));
        let reply = m.reply_to_message.as_deref().unwrap();
        assert_eq!(reply.message_id, MessageId(70));
        assert!(reply.reply_to_message.is_none());
    }

    #[test]
    fn edited_photo_uses_caption() {
        let request = single(json!({
            "update_id": 11,
            "edited_message": {
                "message_id": 78,
                "date": 1_700_000_000,
                "edit_date": 1_700_000_060,
                "chat": chat(),
                "from": ada(),
                "caption": "sunset, take two",
                "photo": [
                    { "file_id": "small", "file_unique_id": "s", "file_size": 900, "width": 90, "height": 60 },
                    { "file_id": "large", "file_unique_id": "l", "file_size": 90_000, "width": 1280, "height": 853 }
                ]
            }
        }));

        let m = &request.message;
        assert_eq!(m.kind, MessageKind::Edit);
        assert_eq!(m.content_type, ContentType::Photo);
        assert_eq!(m.text.as_deref(), Some("sunset, take two"));
        assert_eq!(m.main_attachment().unwrap().file_id, "large");
        assert_eq!(m.edit_date_time.map(|d| d.timestamp()), Some(1_700_000_060));
    }

    #[test]
    fn callback_takes_data_and_pressed_message() {
        let request = single(json!({
            "update_id": 12,
            "callback_query": {
                "id": "4382bfdwdsb323b2d9",
                "from": ada(),
                "chat_instance": "-5029741",
                "data": "vote:yes",
                "message": {
                    "message_id": 79,
                    "date": 1_700_000_000,
                    "chat": chat(),
                    "from": { "id": 999, "is_bot": true, "first_name": "herald", "username": "herald_bot" },
                    "text": "Ship it?",
                    "reply_markup": { "inline_keyboard": [[{ "text": "yes", "callback_data": "vote:yes" }]] }
                }
            }
        }));

        let m = &request.message;
        assert_eq!(m.kind, MessageKind::Callback);
        assert_eq!(m.text.as_deref(), Some("vote:yes"));
        assert_eq!(m.user.id, UserId(42));
        assert_eq!(m.reply_to_message.as_deref().unwrap().text.as_deref(), Some("Ship it?"));
    }

    #[test]
    fn reaction_lists_old_and_new_emojis() {
        let request = single(json!({
            "update_id": 13,
            "message_reaction": {
                "chat": chat(),
                "message_id": 79,
                "user": ada(),
                "date": 1_700_000_100,
                "old_reaction": [],
                "new_reaction": [
                    { "type": "emoji", "emoji": "👍" },
                    { "type": "custom_emoji", "custom_emoji_id": "5368324170671202286" }
                ]
            }
        }));

        let m = &request.message;
        assert_eq!(m.content_type, ContentType::Reaction);
        assert!(!m.has_text());
        let reactions = m.reactions.as_ref().unwrap();
        assert_eq!(reactions.new_emojis, vec!["👍".to_string()]);
        assert_eq!(reactions.new_custom_emoji_ids, vec!["5368324170671202286".to_string()]);
        assert!(reactions.old_emojis.is_empty());
    }

    #[test]
    fn undecodable_update_keeps_its_id() {
        let body = batch(json!([
            { "update_id": 20, "message": { "message_id": 1, "date": 0 } },
            { "update_id": 21, "message": { "message_id": 2, "date": 0, "chat": chat(), "from": ada(), "text": "hi" } },
            { "message": {} }
        ]));

        let decoded = decode_updates(&body).unwrap();
        assert_eq!(decoded.len(), 2);
        assert_eq!(decoded[0].update_id, 20);
        assert!(matches!(decoded[0].update, Err(Error::MalformedUpdate { update_id: 20, .. })));
        assert_eq!(decoded[1].update_id, 21);
        assert!(decoded[1].update.is_ok());
    }

    #[test]
    fn api_errors_are_classified() {
        let conflict = br#"{"ok":false,"error_code":409,"description":"Conflict: terminated by other getUpdates request"}"#;
        let err = decode_updates(conflict).unwrap_err();
        assert!(err.is_conflict());
        assert_eq!(err.retry_after(), None);

        let limited = br#"{"ok":false,"error_code":429,"description":"Too Many Requests: retry after 3","parameters":{"retry_after":3}}"#;
        let err = decode_updates(limited).unwrap_err();
        assert!(!err.is_conflict());
        assert_eq!(err.retry_after(), Some(3));

        assert!(matches!(decode_updates(b"<html>"), Err(Error::MalformedResponse(_))));
    }

    #[test]
    fn poll_requests_every_normalized_update_type() {
        let params = get_updates_params(31, 30);
        assert_eq!(params["offset"], 31);
        assert_eq!(params["timeout"], 30);
        assert_eq!(
            params["allowed_updates"],
            json!(["message", "edited_message", "callback_query", "message_reaction"])
        );
    }

    #[test]
    fn method_url_joins_without_double_slash() {
        let base = url::Url::parse("https://api.telegram.org").unwrap();
        assert_eq!(
            method_url(&base, "123:ABC", "getUpdates"),
            "https://api.telegram.org/bot123:ABC/getUpdates"
        );
        let local = url::Url::parse("http://localhost:8081/").unwrap();
        assert_eq!(method_url(&local, "t", "getMe"), "http://localhost:8081/bott/getMe");
    }
}
