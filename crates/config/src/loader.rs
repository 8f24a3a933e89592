use std::path::{Path, PathBuf};

use {
    secrecy::Secret,
    tracing::{debug, info},
};

use crate::{
    env_subst::substitute_env,
    error::{Error, Result},
    schema::HeraldConfig,
};

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &["herald.toml", "herald.yaml", "herald.yml", "herald.json"];

/// Environment variable overriding `telegram.token`.
pub const TOKEN_ENV: &str = "HERALD_TELEGRAM_TOKEN";

/// Load config from the given path (any supported format).
pub fn load_config(path: &Path) -> Result<HeraldConfig> {
    let raw = std::fs::read_to_string(path).map_err(|source| Error::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config(&substitute_env(&raw), path)
}

/// Load the config named on the command line, or discover one.
///
/// Search order when `explicit` is `None`:
/// 1. `./herald.{toml,yaml,yml,json}`
/// 2. `~/.config/herald/herald.{toml,yaml,yml,json}`
///
/// Falls back to defaults when nothing is found. An explicit path that does
/// not exist is an error.
pub fn discover_and_load(explicit: Option<&Path>) -> Result<(HeraldConfig, Option<PathBuf>)> {
    let path = match explicit {
        Some(path) if !path.exists() => return Err(Error::NotFound(path.to_path_buf())),
        Some(path) => Some(path.to_path_buf()),
        None => find_config_file(),
    };
    let Some(path) = path else {
        debug!("no config file found, using defaults");
        return Ok((HeraldConfig::default(), None));
    };
    info!(path = %path.display(), "loading config");
    let config = load_config(&path)?;
    Ok((config, Some(path)))
}

/// Override file values with environment variables.
pub fn apply_env_overrides(config: &mut HeraldConfig) {
    apply_env_overrides_with(config, |name| std::env::var(name).ok());
}

pub fn apply_env_overrides_with(config: &mut HeraldConfig, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(token) = lookup(TOKEN_ENV).filter(|t| !t.trim().is_empty()) {
        debug!(var = TOKEN_ENV, "telegram token taken from environment");
        config.telegram.token = Secret::new(token);
    }
}

/// Find the first config file in standard locations.
pub fn find_config_file() -> Option<PathBuf> {
    find_config_in(Path::new(".")).or_else(|| config_dir().and_then(|dir| find_config_in(&dir)))
}

/// First config file name present in `dir`.
pub fn find_config_in(dir: &Path) -> Option<PathBuf> {
    CONFIG_FILENAMES
        .iter()
        .map(|name| dir.join(name))
        .find(|path| path.exists())
}

/// The user-global config directory (`~/.config/herald/`).
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "herald").map(|d| d.config_dir().to_path_buf())
}

fn parse_config(raw: &str, path: &Path) -> Result<HeraldConfig> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match ext {
        "toml" => toml::from_str(raw).map_err(|e| Error::parse(path, e)),
        "yaml" | "yml" => serde_yaml::from_str(raw).map_err(|e| Error::parse(path, e)),
        "json" => serde_json::from_str(raw).map_err(|e| Error::parse(path, e)),
        other => Err(Error::UnsupportedFormat(other.to_string())),
    }
}
