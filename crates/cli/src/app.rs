//! Builds the pipeline from a loaded configuration.

use std::sync::Arc;

use {
    anyhow::Context,
    herald_channels::{AccessLevel, BundleLocalizer, InMemoryAccessStore, Transport},
    herald_common::UserId,
    herald_config::{AccessConfig, HeraldConfig, LocalizationConfig},
    herald_metrics::StatsSink,
    herald_pipeline::{CommandProperties, CommandRegistry, Pipeline},
    tracing::debug,
};

use crate::builtin::{self, HelpHandler, PingHandler};

/// Built-in commands plus the ones declared in config. A config entry with a
/// built-in's name replaces it; `kind = "analyzer"` entries only gate the
/// analyzer of that name.
pub fn command_registry(config: &HeraldConfig) -> CommandRegistry {
    let mut registry = CommandRegistry::new();
    registry
        .register(CommandProperties::new("help", "help", AccessLevel::Newcomer).alias("start"))
        .register(CommandProperties::new("ping", "ping", AccessLevel::Newcomer));

    for command in &config.commands {
        if command.is_analyzer() {
            debug!(analyzer = %command.name, level = %command.required_level, "analyzer gate from config");
            registry.register(CommandProperties::analyzer(&command.name, command.required_level));
            continue;
        }
        let properties = command.aliases.iter().fold(
            CommandProperties::new(&command.name, command.handler_ref(), command.required_level),
            |properties, alias| properties.alias(alias),
        );
        debug!(command = %properties.name, handler = %properties.handler, "command from config");
        registry.register(properties);
    }

    let help = HelpHandler::new(registry.visible_to(AccessLevel::Admin));
    registry
        .register_handler("help", Arc::new(help))
        .register_handler("ping", Arc::new(PingHandler));
    registry
}

pub fn access_store(config: &AccessConfig) -> anyhow::Result<InMemoryAccessStore> {
    let store = InMemoryAccessStore::new(config.default_level);
    for (user, level) in config.user_levels()? {
        store.set_level(user, level);
    }
    for (chat, user, level) in config.chat_levels()? {
        store.set_chat_level(chat, user, level);
    }
    for user in &config.banned {
        store.ban(UserId(*user));
    }
    Ok(store)
}

pub fn localizer(config: &LocalizationConfig) -> anyhow::Result<BundleLocalizer> {
    let mut localizer = BundleLocalizer::new(&config.default_language);

    let mut english = builtin::default_bundle();
    if let Some(overrides) = config.bundles.get("en") {
        english.extend(overrides.clone());
    }
    localizer = localizer.with_bundle("en", english);
    for (lang, entries) in config.bundles.iter().filter(|(lang, _)| lang.as_str() != "en") {
        localizer = localizer.with_bundle(lang, entries.clone());
    }

    for (chat, lang) in config.chat_languages()? {
        localizer = localizer.with_chat_language(chat, lang);
    }
    Ok(localizer)
}

pub fn build_pipeline(
    config: &HeraldConfig,
    transport: Arc<dyn Transport>,
    stats: Arc<dyn StatsSink>,
) -> anyhow::Result<Pipeline> {
    let access = access_store(&config.access).context("invalid access section")?;
    let localizer = localizer(&config.localization).context("invalid localization section")?;

    Ok(Pipeline::builder(transport, stats)
        .access_store(Arc::new(access))
        .localizer(Arc::new(localizer))
        .commands(command_registry(config))
        .max_text_len(config.delivery.max_text_len)
        .default_settings(config.delivery.response_settings())
        .build())
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        herald_channels::{AccessStore, Localizer},
        herald_common::ChatId,
        herald_config::{CommandConfig, CommandKind},
        herald_pipeline::CommandResolver,
    };

    #[test]
    fn config_commands_extend_and_replace_builtins() {
        let mut config = HeraldConfig::default();
        config.commands.push(CommandConfig {
            name: "ping".into(),
            kind: CommandKind::Command,
            aliases: vec!["p".into()],
            required_level: AccessLevel::Trusted,
            handler: None,
        });
        config.commands.push(CommandConfig {
            name: "weather".into(),
            kind: CommandKind::Command,
            aliases: vec![],
            required_level: AccessLevel::Newcomer,
            handler: Some("forecast".into()),
        });

        let registry = command_registry(&config);
        assert_eq!(registry.commands().len(), 3);
        let ping = registry.resolve("/p", None).unwrap();
        assert_eq!(ping.name, "ping");
        assert_eq!(ping.required_level, AccessLevel::Trusted);
        assert!(registry.has_handler("ping"));
        assert!(!registry.has_handler("forecast"));
        assert_eq!(registry.visible_to(AccessLevel::Newcomer).len(), 2);
    }

    #[test]
    fn analyzer_entries_gate_without_becoming_commands() {
        let mut config = HeraldConfig::default();
        config.commands.push(CommandConfig {
            name: "spam_guard".into(),
            kind: CommandKind::Analyzer,
            aliases: vec![],
            required_level: AccessLevel::Familiar,
            handler: None,
        });

        let registry = command_registry(&config);
        assert!(herald_config::validate(&config, builtin::HANDLERS)
            .diagnostics
            .iter()
            .all(|d| d.category != "unknown-handler"));
        assert_eq!(
            registry.by_name("spam_guard").unwrap().required_level,
            AccessLevel::Familiar
        );
        assert!(registry.resolve("/spam_guard", None).is_none());
        assert_eq!(registry.visible_to(AccessLevel::Admin).len(), 2);
    }

    #[tokio::test]
    async fn access_store_applies_every_section() {
        let mut config = AccessConfig::default();
        config.users.insert("7".into(), AccessLevel::Admin);
        config.chats.insert("-100:8".into(), AccessLevel::Moderator);
        config.banned.push(9);

        let store = access_store(&config).unwrap();
        assert_eq!(store.rank(UserId(7), ChatId(1)).await.unwrap(), AccessLevel::Admin);
        assert_eq!(store.rank(UserId(8), ChatId(-100)).await.unwrap(), AccessLevel::Moderator);
        assert_eq!(store.rank(UserId(8), ChatId(1)).await.unwrap(), AccessLevel::Newcomer);
        assert_eq!(store.rank(UserId(9), ChatId(1)).await.unwrap(), AccessLevel::Banned);
    }

    #[tokio::test]
    async fn localizer_merges_builtin_texts() {
        let mut config = LocalizationConfig::default();
        config.bundles.insert(
            "en".into(),
            [("ping.reply".to_string(), "pong!".to_string())].into(),
        );
        config.bundles.insert(
            "de".into(),
            [("ping.reply".to_string(), "Pong auf Deutsch".to_string())].into(),
        );
        config.chat_languages.insert("5".into(), "de".into());

        let localizer = localizer(&config).unwrap();
        assert_eq!(localizer.substitute("{{ping.reply}}", "en"), "pong!");
        assert_eq!(localizer.substitute("{{help.title}}", "en"), "Available commands:");
        assert_eq!(localizer.resolve_language(ChatId(5)).await, "de");
        assert_eq!(localizer.substitute("{{ping.reply}}", "de"), "Pong auf Deutsch");
    }
}
