mod app;
mod builtin;
mod config_commands;
mod stats_file;

use std::{path::PathBuf, sync::Arc};

use {
    anyhow::Context,
    clap::{Parser, Subcommand},
    herald_config::{Severity, validate},
    herald_metrics::BotStats,
    herald_telegram::{TelegramTransport, start_polling},
    tracing::{debug, error, info, warn},
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

#[derive(Parser)]
#[command(name = "herald", about = "Herald: chat bot request pipeline", version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Config file (overrides discovery of ./herald.toml and ~/.config/herald/).
    #[arg(long, global = true, env = "HERALD_CONFIG")]
    config: Option<PathBuf>,

    /// Where counters are persisted between runs.
    #[arg(long, global = true, env = "HERALD_STATS_FILE")]
    stats_file: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the bot (default when no subcommand is provided).
    Run,
    /// Configuration management.
    Config {
        #[command(subcommand)]
        action: config_commands::ConfigAction,
    },
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry
            .with(fmt::layer().json().with_target(true).with_thread_ids(false))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true),
            )
            .init();
    }
}

async fn run_bot(cli: &Cli) -> anyhow::Result<()> {
    let (mut config, path) = herald_config::discover_and_load(cli.config.as_deref())?;
    herald_config::apply_env_overrides(&mut config);
    info!(path = ?path, "configuration loaded");

    let result = validate(&config, builtin::HANDLERS);
    for d in &result.diagnostics {
        match d.severity {
            Severity::Error => error!(path = %d.path, category = d.category, "{}", d.message),
            Severity::Warning => warn!(path = %d.path, category = d.category, "{}", d.message),
            Severity::Info => debug!(path = %d.path, category = d.category, "{}", d.message),
        }
    }
    if result.has_errors() {
        anyhow::bail!("configuration is invalid; run `herald config check` for details");
    }

    let stats = Arc::new(BotStats::new());
    if let Some(path) = &cli.stats_file {
        stats_file::restore(&stats, path)?;
    }

    let transport = Arc::new(
        TelegramTransport::from_config(&config.telegram).context("failed to build telegram client")?,
    );
    let pipeline = Arc::new(app::build_pipeline(&config, transport.clone(), stats.clone())?);
    let polling = start_polling(transport, pipeline, config.telegram.poll_timeout_secs)
        .await
        .context("failed to connect to telegram")?;
    let stopped = polling.cancel_token();

    tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            signal.context("failed to listen for ctrl-c")?;
            info!("shutdown requested");
        },
        () = stopped.cancelled() => warn!("polling stopped"),
    }
    polling.shutdown().await;

    if let Some(path) = &cli.stats_file {
        stats_file::save(&stats, path)?;
    }
    info!(
        received = stats.received(),
        commands = stats.commands_processed(),
        errors = stats.errors(),
        "herald stopped"
    );
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let mut cli = Cli::parse();
    init_telemetry(&cli);

    info!(version = env!("CARGO_PKG_VERSION"), "herald starting");

    match cli.command.take() {
        None | Some(Commands::Run) => run_bot(&cli).await,
        Some(Commands::Config { action }) => {
            config_commands::handle_config(action, cli.config.as_deref())
        },
    }
}
