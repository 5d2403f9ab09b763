use std::path::{Path, PathBuf};

use spark_common::ConfigError;
use tracing::{info, warn};

use super::template::default_config_toml;
use crate::schema::SparkConfig;
use crate::toml_writer::write_atomic;
use crate::validation;

/// Resolve the config file: the explicit `--config` path if given,
/// otherwise `<config_dir>/spark/config.toml`.
pub fn config_path(explicit: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }
    let config_dir = dirs::config_dir()
        .ok_or_else(|| ConfigError::ParseError("could not determine config directory".into()))?;
    Ok(config_dir.join("spark").join("config.toml"))
}

/// Read and parse the config at `path`.
///
/// Fields missing from the file take their defaults. A file that parses
/// but fails validation is still returned, with a warning, so the caller
/// can repair it through interactive setup.
pub fn load_from_path(path: &Path) -> Result<SparkConfig, ConfigError> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }
        Err(e) => {
            return Err(ConfigError::ParseError(format!(
                "failed to read {}: {e}",
                path.display()
            )));
        }
    };

    let config: SparkConfig = toml::from_str(&content).map_err(|e| {
        ConfigError::ParseError(format!("failed to parse {}: {e}", path.display()))
    })?;

    if let Err(e) = validation::validate(&config) {
        warn!("{}: {e}", path.display());
    }
    info!("loaded config from {}", path.display());
    Ok(config)
}

/// Load the config at `path`. On first run, when no file exists yet, the
/// commented template is written there and the defaults are returned.
pub fn load_or_create(path: &Path) -> Result<SparkConfig, ConfigError> {
    match load_from_path(path) {
        Err(ConfigError::FileNotFound(_)) => {
            write_atomic(path, &default_config_toml())?;
            info!("created default config at {}", path.display());
            Ok(SparkConfig::default())
        }
        other => other,
    }
}
