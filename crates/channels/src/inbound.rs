//! Raw update shapes as delivered by a chat transport.
//!
//! These mirror the Bot API JSON closely enough to be deserialized straight
//! from a `getUpdates` payload. Fields the pipeline never reads are left out;
//! unknown fields are ignored.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawUpdate {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<RawMessage>,
    #[serde(default)]
    pub edited_message: Option<RawMessage>,
    #[serde(default)]
    pub callback_query: Option<RawCallbackQuery>,
    #[serde(default)]
    pub message_reaction: Option<RawReactionUpdate>,
}

/// The one payload an update is treated as.
#[derive(Debug, Clone)]
pub enum InboundEvent {
    Reaction(RawReactionUpdate),
    Message(RawMessage),
    Edited(RawMessage),
    Callback(RawCallbackQuery),
}

impl InboundEvent {
    pub fn shape(&self) -> &'static str {
        match self {
            Self::Reaction(_) => "reaction",
            Self::Message(_) => "message",
            Self::Edited(_) => "edited_message",
            Self::Callback(_) => "callback_query",
        }
    }
}

impl RawUpdate {
    /// Pick the payload to process: reaction, then new message, then edited
    /// message, then callback. `None` when the update carries none of them.
    pub fn into_event(self) -> Option<InboundEvent> {
        if let Some(reaction) = self.message_reaction {
            return Some(InboundEvent::Reaction(reaction));
        }
        if let Some(message) = self.message {
            return Some(InboundEvent::Message(message));
        }
        if let Some(edited) = self.edited_message {
            return Some(InboundEvent::Edited(edited));
        }
        self.callback_query.map(InboundEvent::Callback)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawChat {
    pub id: i64,
    #[serde(rename = "type", default = "default_chat_type")]
    pub chat_type: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
}

fn default_chat_type() -> String {
    "private".into()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawUser {
    pub id: i64,
    #[serde(default)]
    pub is_bot: bool,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub language_code: Option<String>,
}

/// Any file-like media object (photo size, sticker, audio, document, ...).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawFile {
    pub file_id: String,
    pub file_unique_id: String,
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub file_size: Option<u64>,
    #[serde(default)]
    pub duration: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawMessage {
    pub message_id: i32,
    /// Unix seconds.
    pub date: i64,
    #[serde(default)]
    pub edit_date: Option<i64>,
    pub chat: RawChat,
    #[serde(default)]
    pub from: Option<RawUser>,
    #[serde(default)]
    pub reply_to_message: Option<Box<RawMessage>>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub caption: Option<String>,
    #[serde(default)]
    pub sticker: Option<RawFile>,
    /// Every available size, smallest first.
    #[serde(default)]
    pub photo: Vec<RawFile>,
    #[serde(default)]
    pub animation: Option<RawFile>,
    #[serde(default)]
    pub audio: Option<RawFile>,
    #[serde(default)]
    pub document: Option<RawFile>,
    #[serde(default)]
    pub video: Option<RawFile>,
    #[serde(default)]
    pub video_note: Option<RawFile>,
    #[serde(default)]
    pub voice: Option<RawFile>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawCallbackQuery {
    pub id: String,
    pub from: RawUser,
    /// The message carrying the pressed button, when still accessible.
    #[serde(default)]
    pub message: Option<Box<RawMessage>>,
    #[serde(default)]
    pub data: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawReactionUpdate {
    pub chat: RawChat,
    pub message_id: i32,
    #[serde(default)]
    pub user: Option<RawUser>,
    pub date: i64,
    #[serde(default)]
    pub old_reaction: Vec<ReactionType>,
    #[serde(default)]
    pub new_reaction: Vec<ReactionType>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReactionType {
    Emoji { emoji: String },
    CustomEmoji { custom_emoji_id: String },
    #[serde(other)]
    Other,
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, serde_json::json};

    fn chat() -> serde_json::Value {
        json!({ "id": -100, "type": "supergroup", "title": "dev" })
    }

    fn user() -> serde_json::Value {
        json!({ "id": 42, "is_bot": false, "first_name": "Ada" })
    }

    #[test]
    fn reaction_wins_over_message() {
        let update: RawUpdate = serde_json::from_value(json!({
            "update_id": 1,
            "message": { "message_id": 1, "date": 0, "chat": chat(), "text": "hi" },
            "message_reaction": {
                "chat": chat(), "message_id": 1, "date": 0,
                "old_reaction": [], "new_reaction": [{ "type": "emoji", "emoji": "👍" }]
            }
        }))
        .unwrap();
        assert!(matches!(update.into_event(), Some(InboundEvent::Reaction(_))));
    }

    #[test]
    fn message_wins_over_edit_and_callback() {
        let update: RawUpdate = serde_json::from_value(json!({
            "update_id": 2,
            "message": { "message_id": 1, "date": 0, "chat": chat(), "text": "new" },
            "edited_message": { "message_id": 1, "date": 0, "chat": chat(), "text": "old" },
            "callback_query": { "id": "cb", "from": user(), "data": "x" }
        }))
        .unwrap();
        let event = update.into_event().unwrap();
        assert_eq!(event.shape(), "message");
    }

    #[test]
    fn edit_wins_over_callback() {
        let update: RawUpdate = serde_json::from_value(json!({
            "update_id": 3,
            "edited_message": { "message_id": 1, "date": 0, "chat": chat(), "text": "old" },
            "callback_query": { "id": "cb", "from": user(), "data": "x" }
        }))
        .unwrap();
        assert_eq!(update.into_event().unwrap().shape(), "edited_message");
    }

    #[test]
    fn empty_update_has_no_event() {
        let update: RawUpdate = serde_json::from_value(json!({ "update_id": 4 })).unwrap();
        assert!(update.into_event().is_none());
    }

    #[test]
    fn unknown_reaction_types_are_tolerated() {
        let reaction: RawReactionUpdate = serde_json::from_value(json!({
            "chat": chat(), "message_id": 9, "date": 0,
            "new_reaction": [
                { "type": "custom_emoji", "custom_emoji_id": "5368" },
                { "type": "paid" }
            ]
        }))
        .unwrap();
        assert_eq!(reaction.new_reaction, vec![
            ReactionType::CustomEmoji {
                custom_emoji_id: "5368".into()
            },
            ReactionType::Other,
        ]);
        assert!(reaction.old_reaction.is_empty());
    }
}
