//! Command metadata, lookup and the handler seam.

use {
    async_trait::async_trait,
    herald_channels::{AccessLevel, Request, Response},
    serde::{Deserialize, Serialize},
    std::{collections::HashMap, sync::Arc},
    tracing::{debug, warn},
};

use crate::waiting::CommandWaiting;

/// Metadata describing one command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandProperties {
    pub name: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    /// Reference to the registered handler implementing the command.
    pub handler: String,
    #[serde(default)]
    pub required_level: AccessLevel,
    /// Gates the analyzer of this name only; never resolved from message text.
    #[serde(default)]
    pub analyzer_only: bool,
}

impl CommandProperties {
    pub fn new(name: impl Into<String>, handler: impl Into<String>, required_level: AccessLevel) -> Self {
        Self {
            name: name.into(),
            aliases: Vec::new(),
            handler: handler.into(),
            required_level,
            analyzer_only: false,
        }
    }

    /// Access gate for the analyzer called `name`.
    pub fn analyzer(name: impl Into<String>, required_level: AccessLevel) -> Self {
        let name = name.into();
        Self {
            handler: name.clone(),
            analyzer_only: true,
            ..Self::new(name, String::new(), required_level)
        }
    }

    #[must_use]
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }
}

/// Looks up command metadata.
pub trait CommandResolver: Send + Sync {
    /// Match the leading command token of `text`. A `@handle` suffix is
    /// accepted only when it names this bot.
    fn resolve(&self, text: &str, bot_handle: Option<&str>) -> Option<Arc<CommandProperties>>;

    /// Exact lookup by name or alias, bypassing text parsing.
    fn by_name(&self, name: &str) -> Option<Arc<CommandProperties>>;
}

/// What a handler gets to work with.
pub struct CommandContext {
    pub request: Arc<Request>,
    pub command: Arc<CommandProperties>,
    /// The sender's rank in this chat.
    pub level: AccessLevel,
    /// Whether this call was routed by a command-waiting marker.
    pub resumed: bool,
    argument: String,
    waiting: CommandWaiting,
}

impl CommandContext {
    pub fn new(
        request: Arc<Request>,
        command: Arc<CommandProperties>,
        level: AccessLevel,
        resumed: bool,
        waiting: CommandWaiting,
    ) -> Self {
        let text = request.message.text_or_empty();
        let argument = if resumed {
            text.trim().to_string()
        } else {
            split_command(text).1.to_string()
        };
        Self {
            request,
            command,
            level,
            resumed,
            argument,
            waiting,
        }
    }

    /// Text after the command token, or the whole text when resumed.
    pub fn argument(&self) -> &str {
        &self.argument
    }

    /// Send the sender's next message in this chat to this command.
    pub async fn await_next_message(&self) -> anyhow::Result<()> {
        self.waiting
            .mark(
                self.request.chat_id(),
                self.request.user_id(),
                &self.command.name,
            )
            .await
    }
}

/// Implementation of a command.
#[async_trait]
pub trait CommandHandler: Send + Sync {
    async fn handle(&self, ctx: &CommandContext) -> anyhow::Result<Vec<Response>>;
}

/// Startup-built registry of command metadata and handlers.
#[derive(Default)]
pub struct CommandRegistry {
    commands: Vec<Arc<CommandProperties>>,
    index: HashMap<String, Arc<CommandProperties>>,
    handlers: HashMap<String, Arc<dyn CommandHandler>>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register metadata. Replaces an earlier command with the same name.
    pub fn register(&mut self, properties: CommandProperties) -> &mut Self {
        let properties = Arc::new(properties);
        let name = properties.name.to_lowercase();
        if let Some(pos) = self
            .commands
            .iter()
            .position(|c| c.name.to_lowercase() == name)
        {
            warn!(command = %properties.name, "replacing command properties");
            let old = self.commands.remove(pos);
            self.index.retain(|_, c| !Arc::ptr_eq(c, &old));
        }
        for key in std::iter::once(&properties.name).chain(&properties.aliases) {
            self.index.insert(key.to_lowercase(), Arc::clone(&properties));
        }
        self.commands.push(properties);
        self
    }

    /// Register a handler under a reference name used by [`CommandProperties::handler`].
    pub fn register_handler(
        &mut self,
        reference: impl Into<String>,
        handler: Arc<dyn CommandHandler>,
    ) -> &mut Self {
        self.handlers.insert(reference.into(), handler);
        self
    }

    pub fn handler(&self, reference: &str) -> Option<Arc<dyn CommandHandler>> {
        self.handlers.get(reference).cloned()
    }

    pub fn has_handler(&self, reference: &str) -> bool {
        self.handlers.contains_key(reference)
    }

    pub fn commands(&self) -> &[Arc<CommandProperties>] {
        &self.commands
    }

    /// Commands a user of `level` may run, in registration order.
    pub fn visible_to(&self, level: AccessLevel) -> Vec<Arc<CommandProperties>> {
        self.commands
            .iter()
            .filter(|c| !c.analyzer_only && level.permits(c.required_level))
            .cloned()
            .collect()
    }
}

impl CommandResolver for CommandRegistry {
    fn resolve(&self, text: &str, bot_handle: Option<&str>) -> Option<Arc<CommandProperties>> {
        let name = command_name(split_command(text).0, bot_handle)?;
        self.by_name(&name).filter(|c| !c.analyzer_only)
    }

    fn by_name(&self, name: &str) -> Option<Arc<CommandProperties>> {
        self.index.get(&name.to_lowercase()).cloned()
    }
}

/// Split text into its first token and the trimmed remainder.
fn split_command(text: &str) -> (&str, &str) {
    let text = text.trim_start();
    match text.split_once(char::is_whitespace) {
        Some((head, rest)) => (head, rest.trim()),
        None => (text, ""),
    }
}

/// Command name from a token like `/ping@herald_bot`. `None` when the token
/// is empty or addressed to a different bot.
fn command_name(token: &str, bot_handle: Option<&str>) -> Option<String> {
    let token = token.strip_prefix('/').unwrap_or(token);
    let name = match token.split_once('@') {
        Some((name, addressee)) => {
            let ours = bot_handle
                .map(|h| h.trim_start_matches('@'))
                .is_some_and(|h| h.eq_ignore_ascii_case(addressee));
            if !ours {
                debug!(addressee, "command addressed to another bot");
                return None;
            }
            name
        },
        None => token,
    };
    (!name.is_empty()).then(|| name.to_lowercase())
}
