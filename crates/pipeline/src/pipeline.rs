use {
    herald_channels::{
        AccessLevel, AccessStore, BundleLocalizer, CommandWaitingStore, InMemoryAccessStore,
        InMemoryWaitingStore, Localizer, RawUpdate, Request, ResponseSettings, Transport,
    },
    herald_metrics::{StatsSink, commands as command_metrics, counter, histogram, inbound, labels},
    std::{sync::Arc, time::Instant},
    tracing::{debug, info, warn},
};

use crate::{
    access::AccessResolver,
    analyzers::{Analyzer, AnalyzerFanOut, AnalyzerTasks},
    commands::{CommandContext, CommandProperties, CommandRegistry, CommandResolver},
    delivery::{DEFAULT_MAX_TEXT_LEN, DeliveryContext, DeliveryService},
    normalize::normalize,
    waiting::CommandWaiting,
};

/// What happened to one inbound update.
#[derive(Debug)]
pub enum Outcome {
    /// No message-equivalent payload.
    Ignored,
    /// Sender is banned; nothing ran.
    Banned,
    Processed {
        /// The command whose handler was selected, if any.
        command: Option<String>,
        analyzers: AnalyzerTasks,
    },
}

pub struct Pipeline {
    access: AccessResolver,
    commands: Arc<CommandRegistry>,
    waiting: CommandWaiting,
    analyzers: AnalyzerFanOut,
    delivery: Arc<DeliveryService>,
    stats: Arc<dyn StatsSink>,
    transport: Arc<dyn Transport>,
}

impl Pipeline {
    pub fn builder(transport: Arc<dyn Transport>, stats: Arc<dyn StatsSink>) -> PipelineBuilder {
        PipelineBuilder::new(transport, stats)
    }

    pub fn commands(&self) -> &CommandRegistry {
        &self.commands
    }

    pub fn delivery(&self) -> &DeliveryService {
        &self.delivery
    }

    /// Process one raw update end to end. Never fails: every error is
    /// reported to stats and contained here.
    pub async fn handle(&self, update: RawUpdate) -> Outcome {
        match normalize(update) {
            Some(request) => self.handle_request(request).await,
            None => {
                counter!(inbound::IGNORED_TOTAL).increment(1);
                Outcome::Ignored
            },
        }
    }

    pub async fn handle_request(&self, request: Request) -> Outcome {
        self.stats.increment_received();
        counter!(
            inbound::REQUESTS_TOTAL,
            labels::KIND => request.message.kind.to_string(),
            labels::CONTENT_TYPE => request.message.content_type.as_str()
        )
        .increment(1);

        let (chat, user) = (request.chat_id(), request.user_id());
        let level = self.access.rank(user, chat).await;
        if level.is_banned() {
            warn!(
                %chat,
                %user,
                name = %request.message.user.display_name(),
                username = ?request.message.user.username,
                content = %request.message.content_type,
                "dropping request from banned user"
            );
            counter!(inbound::BANNED_TOTAL).increment(1);
            return Outcome::Banned;
        }

        let request = Arc::new(request);
        let (command, resumed) = self.select_command(&request).await;
        let analyzers = self.analyzers.analyze_async(Arc::clone(&request), level);

        let command_name = match command {
            Some(command) => {
                let name = command.name.clone();
                self.run_command(&request, command, level, resumed).await;
                Some(name)
            },
            None => None,
        };
        Outcome::Processed {
            command: command_name,
            analyzers,
        }
    }

    /// A pending marker wins over the text; the marker is consumed either way.
    async fn select_command(&self, request: &Request) -> (Option<Arc<CommandProperties>>, bool) {
        let (chat, user) = (request.chat_id(), request.user_id());
        if let Some(pending) = self.waiting.consume(chat, user).await {
            counter!(command_metrics::RESUMED_TOTAL, labels::COMMAND => pending.clone()).increment(1);
            let command = self.commands.by_name(&pending).filter(|c| !c.analyzer_only);
            if command.is_none() {
                warn!(%chat, %user, command = %pending, "waiting marker names an unknown command");
            }
            return (command, true);
        }

        if !request.message.has_text() {
            return (None, false);
        }
        let handle = self.transport.bot_handle();
        let command = self
            .commands
            .resolve(request.message.text_or_empty(), handle.as_deref());
        (command, false)
    }

    async fn run_command(
        &self,
        request: &Arc<Request>,
        command: Arc<CommandProperties>,
        level: AccessLevel,
        resumed: bool,
    ) {
        if !AccessResolver::allowed(level, command.required_level) {
            debug!(
                command = %command.name,
                %level,
                required = %command.required_level,
                "command not allowed for user"
            );
            counter!(inbound::ACCESS_DENIED_TOTAL, labels::COMMAND => command.name.clone()).increment(1);
            return;
        }
        let Some(handler) = self.commands.handler(&command.handler) else {
            self.stats.increment_errors(
                &request.describe(),
                None,
                &format!("no handler registered as {} for command {}", command.handler, command.name),
            );
            return;
        };

        let name = command.name.clone();
        let ctx = CommandContext::new(
            Arc::clone(request),
            command,
            level,
            resumed,
            self.waiting.clone(),
        );
        let start = Instant::now();
        let result = handler.handle(&ctx).await;
        histogram!(command_metrics::DURATION_SECONDS, labels::COMMAND => name.clone())
            .record(start.elapsed().as_secs_f64());

        match result {
            Ok(responses) => {
                debug!(command = %name, responses = responses.len(), resumed, "command handled");
                counter!(command_metrics::PROCESSED_TOTAL, labels::COMMAND => name).increment(1);
                self.stats.increment_commands_processed();
                self.delivery.deliver_all(responses, Some(request.as_ref())).await;
            },
            Err(e) => {
                let e = e.context(format!("command {name} failed"));
                self.stats
                    .increment_errors(&request.describe(), Some(&e), "command handler failed");
            },
        }
    }
}

/// Wires a [`Pipeline`] from its collaborators. Stores and localization
/// default to in-memory implementations.
pub struct PipelineBuilder {
    transport: Arc<dyn Transport>,
    stats: Arc<dyn StatsSink>,
    access_store: Arc<dyn AccessStore>,
    waiting_store: Arc<dyn CommandWaitingStore>,
    localizer: Arc<dyn Localizer>,
    commands: CommandRegistry,
    analyzers: Vec<Arc<dyn Analyzer>>,
    max_text_len: usize,
    default_settings: ResponseSettings,
}

impl PipelineBuilder {
    pub fn new(transport: Arc<dyn Transport>, stats: Arc<dyn StatsSink>) -> Self {
        Self {
            transport,
            stats,
            access_store: Arc::new(InMemoryAccessStore::default()),
            waiting_store: Arc::new(InMemoryWaitingStore::new()),
            localizer: Arc::new(BundleLocalizer::new("en")),
            commands: CommandRegistry::new(),
            analyzers: Vec::new(),
            max_text_len: DEFAULT_MAX_TEXT_LEN,
            default_settings: ResponseSettings::default(),
        }
    }

    #[must_use]
    pub fn access_store(mut self, store: Arc<dyn AccessStore>) -> Self {
        self.access_store = store;
        self
    }

    #[must_use]
    pub fn waiting_store(mut self, store: Arc<dyn CommandWaitingStore>) -> Self {
        self.waiting_store = store;
        self
    }

    #[must_use]
    pub fn localizer(mut self, localizer: Arc<dyn Localizer>) -> Self {
        self.localizer = localizer;
        self
    }

    #[must_use]
    pub fn commands(mut self, commands: CommandRegistry) -> Self {
        self.commands = commands;
        self
    }

    #[must_use]
    pub fn analyzer(mut self, analyzer: Arc<dyn Analyzer>) -> Self {
        self.analyzers.push(analyzer);
        self
    }

    #[must_use]
    pub fn max_text_len(mut self, max_text_len: usize) -> Self {
        self.max_text_len = max_text_len;
        self
    }

    #[must_use]
    pub fn default_settings(mut self, settings: ResponseSettings) -> Self {
        self.default_settings = settings;
        self
    }

    pub fn build(self) -> Pipeline {
        let ctx = DeliveryContext::new(
            Arc::clone(&self.transport),
            self.localizer,
            Arc::clone(&self.stats),
        )
        .with_max_text_len(self.max_text_len)
        .with_default_settings(self.default_settings);
        let delivery = Arc::new(DeliveryService::with_defaults(ctx));
        let commands = Arc::new(self.commands);

        let mut analyzers = AnalyzerFanOut::new(
            Arc::clone(&commands) as Arc<dyn CommandResolver>,
            Arc::clone(&delivery),
            Arc::clone(&self.stats),
        );
        for analyzer in self.analyzers {
            analyzers.register(analyzer);
        }
        info!(
            commands = commands.commands().len(),
            analyzers = analyzers.len(),
            max_text_len = self.max_text_len,
            "pipeline ready"
        );

        Pipeline {
            access: AccessResolver::new(self.access_store),
            commands,
            waiting: CommandWaiting::new(self.waiting_store),
            analyzers,
            delivery,
            stats: self.stats,
            transport: self.transport,
        }
    }
}
