//! Simulation configuration, loadable from `ripple.toml`.

use serde::{Deserialize, Serialize};
use std::io;
use std::path::Path;

/// Tunable simulation parameters.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// How many propagation iterations may run before the design is
    /// declared oscillating.
    pub iteration_budget: u32,
    /// When set, gate delays gain a small random component so
    /// symmetric feedback loops settle instead of oscillating in
    /// lockstep.
    pub jitter: bool,
    /// Seed for the jitter generator. Two runs with the same seed and
    /// the same pokes behave identically.
    pub jitter_seed: u64,
}

impl Default for SimConfig {
    fn default() -> Self {
        SimConfig {
            iteration_budget: 1000,
            jitter: false,
            jitter_seed: 0,
        }
    }
}

/// Errors raised while loading a configuration file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read configuration: {0}")]
    IoError(#[from] io::Error),

    /// The file is not valid TOML or has the wrong shape.
    #[error("failed to parse configuration: {0}")]
    ParseError(String),

    /// A field holds an unusable value.
    #[error("invalid configuration: {0}")]
    InvalidValue(String),
}

#[derive(Default, Serialize, Deserialize)]
#[serde(default)]
struct ConfigFile {
    simulation: SimConfig,
}

/// Loads `<project_dir>/ripple.toml` and validates it.
pub fn load_config(project_dir: &Path) -> Result<SimConfig, ConfigError> {
    let content = std::fs::read_to_string(project_dir.join("ripple.toml"))?;
    load_config_from_str(&content)
}

/// Parses and validates a configuration from a string.
///
/// Useful for testing without filesystem dependencies.
pub fn load_config_from_str(content: &str) -> Result<SimConfig, ConfigError> {
    let file: ConfigFile =
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    validate_config(&file.simulation)?;
    Ok(file.simulation)
}

fn validate_config(config: &SimConfig) -> Result<(), ConfigError> {
    if config.iteration_budget == 0 {
        return Err(ConfigError::InvalidValue(
            "simulation.iteration_budget must be at least 1".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = SimConfig::default();
        assert_eq!(config.iteration_budget, 1000);
        assert!(!config.jitter);
    }

    #[test]
    fn parse_empty_gives_defaults() {
        let config = load_config_from_str("").unwrap();
        assert_eq!(config, SimConfig::default());
    }

    #[test]
    fn parse_full_config() {
        let toml = r#"
[simulation]
iteration_budget = 500
jitter = true
jitter_seed = 42
"#;
        let config = load_config_from_str(toml).unwrap();
        assert_eq!(config.iteration_budget, 500);
        assert!(config.jitter);
        assert_eq!(config.jitter_seed, 42);
    }

    #[test]
    fn zero_budget_errors() {
        let toml = r#"
[simulation]
iteration_budget = 0
"#;
        let err = load_config_from_str(toml).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(_)));
    }

    #[test]
    fn invalid_toml_errors() {
        let err = load_config_from_str("this is not valid toml {{{}}}").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn io_error_from_nonexistent_dir() {
        let err = load_config(Path::new("/nonexistent/dir")).unwrap_err();
        assert!(matches!(err, ConfigError::IoError(_)));
    }
}
