//! Optional TOML configuration file for the command-line adapter.

use std::{
    fs,
    path::{Path, PathBuf},
};

use geocache_core::GameConfig;
use serde::Deserialize;
use thiserror::Error;

/// Settings read from the configuration file.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct CliConfig {
    /// Save file used when `--save` is not given.
    pub save: Option<PathBuf>,
    /// Gameplay parameters.
    pub game: GameConfig,
}

/// Errors raised while reading the configuration file.
#[derive(Debug, Error)]
pub(crate) enum ConfigError {
    /// The file could not be read.
    #[error("could not read config file {}: {source}", path.display())]
    Read {
        /// File that was requested.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
    /// The file is not valid TOML for [`CliConfig`].
    #[error("could not parse config file {}: {source}", path.display())]
    Parse {
        /// File that was requested.
        path: PathBuf,
        /// Underlying parse failure.
        #[source]
        source: toml::de::Error,
    },
    /// A parameter is outside its meaningful range.
    #[error("invalid configuration: {0}")]
    Invalid(&'static str),
}

impl CliConfig {
    /// Reads and validates the configuration stored at `path`.
    pub(crate) fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_owned(),
            source,
        })?;
        let config: Self = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_owned(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let game = &self.game;
        if !(game.grid.cell_size.is_finite() && game.grid.cell_size > 0.0) {
            return Err(ConfigError::Invalid("grid.cell_size must be positive"));
        }
        if !game.grid.origin.is_finite() {
            return Err(ConfigError::Invalid("grid.origin must be finite"));
        }
        if !(0.0..=1.0).contains(&game.spawn_probability) {
            return Err(ConfigError::Invalid(
                "spawn_probability must lie between 0 and 1",
            ));
        }
        if !game.token_values.iter().any(|value| *value > 0) {
            return Err(ConfigError::Invalid(
                "token_values must contain a positive value",
            ));
        }
        if game.win_value == 0 {
            return Err(ConfigError::Invalid("win_value must be positive"));
        }
        Ok(())
    }
}
