use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::{
    Error, Result, env_subst::substitute_env, error::Context as _, schema::PalaverConfig,
};

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &[
    "palaver.toml",
    "palaver.yaml",
    "palaver.yml",
    "palaver.json",
];

/// Load config from `path`, picking the format from its extension.
pub fn load_config(path: &Path) -> Result<PalaverConfig> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    parse_config(&substitute_env(&raw), path)
}

/// Discover and load config from standard locations.
///
/// Search order:
/// 1. `./palaver.{toml,yaml,yml,json}` (project-local)
/// 2. `<user config dir>/palaver/palaver.{toml,yaml,yml,json}`
///
/// Falls back to `PalaverConfig::default()` when nothing is found or the
/// file fails to load.
pub fn discover_and_load() -> PalaverConfig {
    let Some(path) = find_config_file() else {
        debug!("no config file found, using defaults");
        return PalaverConfig::default();
    };

    debug!(path = %path.display(), "loading config");
    load_config(&path).unwrap_or_else(|e| {
        warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
        PalaverConfig::default()
    })
}

/// First existing config file in the standard locations.
pub fn find_config_file() -> Option<PathBuf> {
    let local = CONFIG_FILENAMES.iter().map(PathBuf::from);
    let global = config_dir()
        .into_iter()
        .flat_map(|dir| CONFIG_FILENAMES.iter().map(move |name| dir.join(name)));
    local.chain(global).find(|p| p.exists())
}

/// The user-global config directory (e.g. `~/.config/palaver/`).
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "palaver").map(|d| d.config_dir().to_path_buf())
}

/// Render `config` as pretty TOML.
pub fn to_toml_string(config: &PalaverConfig) -> Result<String> {
    Ok(toml::to_string_pretty(config)?)
}

fn parse_config(raw: &str, path: &Path) -> Result<PalaverConfig> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match ext {
        "toml" => Ok(toml::from_str(raw)?),
        "yaml" | "yml" => Ok(serde_yaml::from_str(raw)?),
        "json" => Ok(serde_json::from_str(raw)?),
        _ => Err(Error::UnsupportedFormat {
            ext: ext.to_string(),
        }),
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use std::time::Duration;

    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("palaver.toml", "[conversation]\nttl_secs = 30\nsweep_interval_secs = 5\n")]
    #[case("palaver.yaml", "conversation:\n  ttl_secs: 30\n  sweep_interval_secs: 5\n")]
    #[case(
        "palaver.json",
        r#"{"conversation": {"ttl_secs": 30, "sweep_interval_secs": 5}}"#
    )]
    fn loads_each_format(#[case] name: &str, #[case] contents: &str) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(name);
        std::fs::write(&path, contents).unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.conversation.ttl(), Duration::from_secs(30));
        assert_eq!(config.conversation.sweep_interval(), Duration::from_secs(5));
    }

    #[test]
    fn unknown_extension_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("palaver.ini");
        std::fs::write(&path, "ttl=1").unwrap();

        let err = load_config(&path).unwrap_err();
        assert!(matches!(err, Error::UnsupportedFormat { ref ext } if ext == "ini"));
    }

    #[test]
    fn missing_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");

        let err = load_config(&path).unwrap_err();
        assert!(matches!(err, Error::Message(_)));
        assert!(err.to_string().contains("absent.toml"));
    }

    #[test]
    fn malformed_toml_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("palaver.toml");
        std::fs::write(&path, "[conversation\n").unwrap();

        assert!(matches!(load_config(&path), Err(Error::Toml(_))));
    }

    #[test]
    fn toml_output_round_trips_through_loader() {
        let mut config = PalaverConfig::default();
        config.conversation.ttl_secs = 42;
        config.bot.plugin_config_dir = Some(PathBuf::from("/srv/palaver/plugins"));

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("palaver.toml");
        std::fs::write(&path, to_toml_string(&config).unwrap()).unwrap();

        assert_eq!(load_config(&path).unwrap(), config);
    }
}
