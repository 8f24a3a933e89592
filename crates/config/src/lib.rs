//! Configuration loading, env substitution and validation.
//!
//! Config files: `herald.toml`, `herald.yaml`, `herald.yml` or `herald.json`,
//! searched in `./` then `~/.config/herald/`.
//!
//! `${ENV_VAR}` placeholders are substituted in the raw file before parsing.

pub mod env_subst;
pub mod error;
pub mod loader;
pub mod schema;
pub mod validate;

pub use {
    error::{Error, Result},
    loader::{
        TOKEN_ENV, apply_env_overrides, config_dir, discover_and_load, find_config_file,
        load_config,
    },
    schema::{
        AccessConfig, CommandConfig, CommandKind, DeliveryConfig, HeraldConfig,
        LocalizationConfig,
    },
    validate::{Diagnostic, Severity, ValidationResult, validate},
};
