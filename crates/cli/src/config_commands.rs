use std::path::Path;

use {
    anyhow::Result,
    clap::Subcommand,
    herald_channels::AccessLevel,
    herald_config::{HeraldConfig, Severity, validate},
};

use crate::{app, builtin};

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Validate the configuration file and report errors/warnings.
    Check {
        /// Show informational diagnostics in addition to errors and warnings.
        #[arg(long)]
        verbose: bool,
    },
    /// Print the effective configuration with secrets redacted.
    Show,
    /// List the commands a user of the given rank can use.
    Commands {
        #[arg(long, default_value = "newcomer")]
        level: AccessLevel,
    },
}

pub fn handle_config(action: ConfigAction, explicit: Option<&Path>) -> Result<()> {
    let (mut config, path) = herald_config::discover_and_load(explicit)?;
    herald_config::apply_env_overrides(&mut config);

    match action {
        ConfigAction::Check { verbose } => check(&config, path.as_deref(), verbose),
        ConfigAction::Show => {
            println!("{config:#?}");
            Ok(())
        },
        ConfigAction::Commands { level } => {
            list_commands(&config, level);
            Ok(())
        },
    }
}

/// ANSI color codes.
const RED: &str = "\x1b[31m";
const YELLOW: &str = "\x1b[33m";
const CYAN: &str = "\x1b[36m";
const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

fn check(config: &HeraldConfig, path: Option<&Path>, verbose: bool) -> Result<()> {
    match path {
        Some(path) => eprintln!("Checking {}\n", path.display()),
        None => eprintln!("No config file found; checking defaults.\n"),
    }

    let result = validate(config, builtin::HANDLERS);
    let mut shown = 0;
    for d in &result.diagnostics {
        if d.severity == Severity::Info && !verbose {
            continue;
        }

        let color = match d.severity {
            Severity::Error => RED,
            Severity::Warning => YELLOW,
            Severity::Info => CYAN,
        };
        eprintln!("  {BOLD}{color}{}{RESET} {}: {}", d.severity, d.path, d.message);
        shown += 1;
    }

    let errors = result.count(Severity::Error);
    let warnings = result.count(Severity::Warning);

    if shown > 0 {
        eprintln!();
    }

    if errors == 0 && warnings == 0 {
        eprintln!("No issues found.");
    } else {
        eprintln!("{errors} error(s), {warnings} warning(s)");
    }

    if errors > 0 {
        anyhow::bail!("configuration has {errors} error(s)");
    }
    Ok(())
}

fn list_commands(config: &HeraldConfig, level: AccessLevel) {
    let registry = app::command_registry(config);
    for command in registry.visible_to(level) {
        let handler = if registry.has_handler(&command.handler) {
            String::new()
        } else {
            format!("  {YELLOW}(no handler {}){RESET}", command.handler)
        };
        let aliases = if command.aliases.is_empty() {
            String::new()
        } else {
            format!(" [{}]", command.aliases.join(", "))
        };
        println!("/{}{aliases}  requires {}{handler}", command.name, command.required_level);
    }
}
