//! Raw transport update → canonical [`Request`].

use {
    chrono::{DateTime, Utc},
    herald_channels::{
        Attachment, Chat, ChatKind, ContentType, InboundEvent, Message, MessageKind, Reactions,
        RawUpdate, Request, RequestSource, User,
        inbound::{RawCallbackQuery, RawChat, RawFile, RawMessage, RawReactionUpdate, RawUser, ReactionType},
    },
    herald_common::{ChatId, MessageId, UserId},
    tracing::debug,
};

/// Normalize one update. `None` means there is nothing to process.
pub fn normalize(update: RawUpdate) -> Option<Request> {
    let update_id = update.update_id;
    let Some(event) = update.into_event() else {
        debug!(update_id, "update carries no message-equivalent payload");
        return None;
    };
    normalize_event(event)
}

pub fn normalize_event(event: InboundEvent) -> Option<Request> {
    let shape = event.shape();
    let message = match event {
        InboundEvent::Reaction(reaction) => from_reaction(reaction),
        InboundEvent::Message(message) => from_message(message, MessageKind::Common, true),
        InboundEvent::Edited(message) => from_message(message, MessageKind::Edit, true),
        InboundEvent::Callback(query) => from_callback(query),
    };
    if message.is_none() {
        debug!(shape, "update has no sender or chat, ignoring");
    }
    message.map(|m| Request::new(m, RequestSource::ChatPlatform))
}

fn from_message(raw: RawMessage, kind: MessageKind, with_reply: bool) -> Option<Message> {
    let user = convert_user(raw.from.as_ref()?);
    let (content_type, attachments) = classify_content(&raw);
    let reply_to_message = if with_reply {
        raw.reply_to_message
            .and_then(|reply| from_message(*reply, MessageKind::Common, false))
            .map(Box::new)
    } else {
        None
    };

    Some(Message {
        chat: convert_chat(&raw.chat),
        user,
        message_id: MessageId(raw.message_id),
        reply_to_message,
        text: raw.text.or(raw.caption),
        date_time: timestamp(raw.date),
        edit_date_time: raw.edit_date.map(timestamp),
        kind,
        content_type,
        attachments,
        reactions: None,
    })
}

/// A button press. The pressed message becomes the reply target and the
/// callback data becomes the text.
fn from_callback(query: RawCallbackQuery) -> Option<Message> {
    let pressed = query.message?;
    let chat = convert_chat(&pressed.chat);
    let message_id = MessageId(pressed.message_id);
    let reply_to_message = from_message(*pressed, MessageKind::Common, false).map(Box::new);
    let content_type = if query.data.is_some() {
        ContentType::Text
    } else {
        ContentType::Unknown
    };

    Some(Message {
        chat,
        user: convert_user(&query.from),
        message_id,
        reply_to_message,
        text: query.data,
        date_time: Utc::now(),
        edit_date_time: None,
        kind: MessageKind::Callback,
        content_type,
        attachments: Vec::new(),
        reactions: None,
    })
}

fn from_reaction(raw: RawReactionUpdate) -> Option<Message> {
    let user = convert_user(raw.user.as_ref()?);
    let (old_emojis, old_custom_emoji_ids) = split_reactions(raw.old_reaction);
    let (new_emojis, new_custom_emoji_ids) = split_reactions(raw.new_reaction);

    Some(Message {
        chat: convert_chat(&raw.chat),
        user,
        message_id: MessageId(raw.message_id),
        reply_to_message: None,
        text: None,
        date_time: timestamp(raw.date),
        edit_date_time: None,
        kind: MessageKind::Common,
        content_type: ContentType::Reaction,
        attachments: Vec::new(),
        reactions: Some(Reactions {
            old_emojis,
            new_emojis,
            old_custom_emoji_ids,
            new_custom_emoji_ids,
        }),
    })
}

fn split_reactions(reactions: Vec<ReactionType>) -> (Vec<String>, Vec<String>) {
    let mut emojis = Vec::new();
    let mut custom = Vec::new();
    for reaction in reactions {
        match reaction {
            ReactionType::Emoji { emoji } => emojis.push(emoji),
            ReactionType::CustomEmoji { custom_emoji_id } => custom.push(custom_emoji_id),
            ReactionType::Other => {},
        }
    }
    (emojis, custom)
}

/// Content type by fixed priority: text, sticker, photo, animation, audio,
/// document, video, video note, voice.
fn classify_content(raw: &RawMessage) -> (ContentType, Vec<Attachment>) {
    if raw.text.is_some() {
        return (ContentType::Text, Vec::new());
    }
    if let Some(sticker) = &raw.sticker {
        return (ContentType::Sticker, vec![attachment(sticker, false)]);
    }
    if !raw.photo.is_empty() {
        let mut sizes: Vec<Attachment> = raw.photo.iter().map(|p| attachment(p, false)).collect();
        sizes.sort_by_key(|a| a.size);
        return (ContentType::Photo, sizes);
    }

    let media = [
        (ContentType::Animation, &raw.animation, true),
        (ContentType::Audio, &raw.audio, true),
        (ContentType::File, &raw.document, false),
        (ContentType::Video, &raw.video, true),
        (ContentType::VideoNote, &raw.video_note, true),
        (ContentType::Voice, &raw.voice, true),
    ];
    for (content_type, file, has_duration) in media {
        if let Some(file) = file {
            return (content_type, vec![attachment(file, has_duration)]);
        }
    }
    (ContentType::Unknown, Vec::new())
}

fn attachment(file: &RawFile, has_duration: bool) -> Attachment {
    Attachment {
        mime_type: file.mime_type.clone(),
        file_unique_id: file.file_unique_id.clone(),
        file_id: file.file_id.clone(),
        name: file.file_name.clone(),
        size: file.file_size.unwrap_or(0),
        duration: if has_duration { file.duration } else { None },
    }
}

fn convert_chat(chat: &RawChat) -> Chat {
    let kind = match chat.chat_type.as_str() {
        "group" => ChatKind::Group,
        "supergroup" => ChatKind::Supergroup,
        "channel" => ChatKind::Channel,
        _ => ChatKind::Private,
    };
    Chat {
        id: ChatId(chat.id),
        kind,
        title: chat.title.clone(),
        username: chat.username.clone(),
    }
}

fn convert_user(user: &RawUser) -> User {
    User {
        id: UserId(user.id),
        is_bot: user.is_bot,
        first_name: user.first_name.clone(),
        last_name: user.last_name.clone(),
        username: user.username.clone(),
        language_code: user.language_code.clone(),
    }
}

fn timestamp(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap_or_default()
}
