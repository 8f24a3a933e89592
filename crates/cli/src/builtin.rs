//! Commands every herald bot answers out of the box.

use std::{collections::HashMap, sync::Arc};

use {
    async_trait::async_trait,
    herald_channels::{Response, TextResponse},
    herald_pipeline::{CommandContext, CommandHandler, CommandProperties},
};

/// Handler references provided by this binary.
pub const HANDLERS: &[&str] = &["help", "ping"];

/// English texts for the built-in commands. Config bundles may override them.
pub fn default_bundle() -> HashMap<String, String> {
    HashMap::from([
        ("help.title".to_string(), "Available commands:".to_string()),
        ("help.aliases".to_string(), "also".to_string()),
        ("ping.reply".to_string(), "pong".to_string()),
    ])
}

/// Lists the commands the sender may use.
pub struct HelpHandler {
    commands: Vec<Arc<CommandProperties>>,
}

impl HelpHandler {
    pub fn new(commands: Vec<Arc<CommandProperties>>) -> Self {
        Self { commands }
    }
}

#[async_trait]
impl CommandHandler for HelpHandler {
    async fn handle(&self, ctx: &CommandContext) -> anyhow::Result<Vec<Response>> {
        let mut lines = vec!["<b>{{help.title}}</b>".to_string()];
        for command in self
            .commands
            .iter()
            .filter(|c| ctx.level.permits(c.required_level))
        {
            let mut line = format!("/{}", command.name);
            if !command.aliases.is_empty() {
                line.push_str(&format!(" ({{{{help.aliases}}}} {})", command.aliases.join(", ")));
            }
            lines.push(line);
        }
        let request = &ctx.request;
        Ok(vec![
            TextResponse::new(request.chat_id(), lines.join("\n"))
                .reply_to(request.message.message_id)
                .into(),
        ])
    }
}

pub struct PingHandler;

#[async_trait]
impl CommandHandler for PingHandler {
    async fn handle(&self, ctx: &CommandContext) -> anyhow::Result<Vec<Response>> {
        let request = &ctx.request;
        Ok(vec![
            TextResponse::new(request.chat_id(), "{{ping.reply}}")
                .reply_to(request.message.message_id)
                .into(),
        ])
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        herald_channels::{AccessLevel, InMemoryWaitingStore, RawUpdate, Request},
        herald_common::MessageId,
        herald_pipeline::{CommandWaiting, normalize},
        serde_json::json,
    };

    fn request(text: &str) -> Arc<Request> {
        let update: RawUpdate = serde_json::from_value(json!({
            "update_id": 1,
            "message": {
                "message_id": 12,
                "date": 1_700_000_000,
                "chat": { "id": 3, "type": "private" },
                "from": { "id": 3, "is_bot": false, "first_name": "Ada" },
                "text": text
            }
        }))
        .unwrap();
        Arc::new(normalize(update).unwrap())
    }

    fn context(text: &str, command: CommandProperties, level: AccessLevel) -> CommandContext {
        CommandContext::new(
            request(text),
            Arc::new(command),
            level,
            false,
            CommandWaiting::new(Arc::new(InMemoryWaitingStore::new())),
        )
    }

    fn text_of(responses: &[Response]) -> &TextResponse {
        match &responses[0] {
            Response::Text(text) => text,
            other => panic!("unexpected response {other:?}"),
        }
    }

    #[tokio::test]
    async fn help_lists_only_permitted_commands() {
        let help = HelpHandler::new(vec![
            Arc::new(CommandProperties::new("help", "help", AccessLevel::Newcomer).alias("start")),
            Arc::new(CommandProperties::new("ping", "ping", AccessLevel::Newcomer)),
            Arc::new(CommandProperties::new("purge", "purge", AccessLevel::Moderator)),
        ]);
        let ctx = context("/help", CommandProperties::new("help", "help", AccessLevel::Newcomer), AccessLevel::Familiar);

        let responses = help.handle(&ctx).await.unwrap();
        let text = text_of(&responses);
        assert_eq!(
            text.text,
            "<b>{{help.title}}</b>\n/help ({{help.aliases}} start)\n/ping"
        );
        assert_eq!(text.reply_to, Some(MessageId(12)));
    }

    #[tokio::test]
    async fn ping_replies_to_the_sender() {
        let ctx = context("/ping", CommandProperties::new("ping", "ping", AccessLevel::Newcomer), AccessLevel::Newcomer);
        let responses = PingHandler.handle(&ctx).await.unwrap();
        let text = text_of(&responses);
        assert_eq!(text.text, "{{ping.reply}}");
        assert_eq!(text.reply_to, Some(MessageId(12)));
    }
}
