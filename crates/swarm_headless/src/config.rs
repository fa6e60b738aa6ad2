//! Agent config loading for the driver.
//!
//! A RON file supplies the base config (missing fields take defaults) and
//! `--option key=value` arguments are applied on top, in order.

use std::path::Path;

use swarm_core::config::AgentConfig;
use tracing::debug;

use crate::error::{HeadlessError, Result};

/// Subsystems raised to debug by `--verbose`.
pub const SUBSYSTEMS: [&str; 6] = ["production", "economy", "combat", "placement", "pools", "scouting"];

/// Overrides that log every subsystem at debug level.
#[must_use]
pub fn verbose_options() -> Vec<String> {
    SUBSYSTEMS.iter().map(|s| format!("verbosity.{s}=debug")).collect()
}

/// Split a `key=value` argument.
pub fn parse_option(arg: &str) -> Result<(&str, &str)> {
    match arg.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => Ok((key.trim(), value.trim())),
        _ => Err(HeadlessError::MalformedOption(arg.to_string())),
    }
}

/// Read a RON config file.
pub fn read_config(path: &Path) -> Result<AgentConfig> {
    let text = std::fs::read_to_string(path)?;
    ron::from_str(&text).map_err(|source| HeadlessError::Ron {
        path: path.to_path_buf(),
        source,
    })
}

/// Build the agent config from an optional file plus overrides.
pub fn load_config<S: AsRef<str>>(path: Option<&Path>, options: &[S]) -> Result<AgentConfig> {
    let mut config = match path {
        Some(path) => {
            debug!(path = %path.display(), "loading agent config");
            read_config(path)?
        }
        None => AgentConfig::default(),
    };
    for arg in options {
        let (key, value) = parse_option(arg.as_ref())?;
        config.apply_option(key, value)?;
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use swarm_core::combat::CombatStrategy;

    #[test]
    fn test_parse_option() {
        assert_eq!(parse_option("seed=7").unwrap(), ("seed", "7"));
        assert_eq!(parse_option(" combat = rush ").unwrap(), ("combat", "rush"));
        assert_eq!(parse_option("verbosity.combat=").unwrap(), ("verbosity.combat", ""));
        assert!(matches!(
            parse_option("seed"),
            Err(HeadlessError::MalformedOption(_))
        ));
        assert!(parse_option("=rush").is_err());
    }

    #[test]
    fn test_options_without_file() {
        let config = load_config(None, &["combat_strategy=harass", "seed=3"]).unwrap();
        assert_eq!(config.combat_strategy, CombatStrategy::Harass);
        assert_eq!(config.seed, 3);
    }

    #[test]
    fn test_verbose_overrides_apply_after_user_options() {
        let mut options = vec!["verbosity.combat=trace".to_string()];
        options.extend(verbose_options());
        let config = load_config(None, &options).unwrap();
        assert_eq!(config.verbosity.combat, "debug");
        assert_eq!(config.verbosity.scouting, "debug");
        assert!(config.verbosity.log_filter().contains("swarm_core::production=debug"));
    }

    #[test]
    fn test_unknown_strategy_is_agent_error() {
        let err = load_config(None, &["combat_strategy=turtle"]).unwrap_err();
        assert!(err.is_fatal());
        assert!(matches!(err, HeadlessError::Agent(_)));
    }
}
