//! Configuration loading and env substitution.
//!
//! Config files: `palaver.toml`, `palaver.yaml`, `palaver.yml`, or
//! `palaver.json`, searched in `./` then the user config directory.
//!
//! `${ENV_VAR}` and `${ENV_VAR:-default}` are substituted in the raw file
//! before parsing.

pub mod env_subst;
pub mod error;
pub mod loader;
pub mod schema;

pub use {
    error::{Error, Result},
    loader::{config_dir, discover_and_load, find_config_file, load_config, to_toml_string},
    schema::{BotSettings, ConversationConfig, MetricsConfig, PalaverConfig},
};
