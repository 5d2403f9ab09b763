//! Write SparkConfig to TOML on disk.
//!
//! Every write goes to a sibling `.tmp` file first and is renamed into
//! place, so an interrupted setup never leaves a truncated config behind.

use std::path::Path;

use spark_common::ConfigError;
use tracing::{debug, warn};

use crate::schema::SparkConfig;

/// Serialize `config` and write it to `path`, creating parent directories.
pub fn save_config_to_path(config: &SparkConfig, path: &Path) -> Result<(), ConfigError> {
    let toml_str = toml::to_string_pretty(config)
        .map_err(|e| ConfigError::ParseError(format!("failed to serialize config to TOML: {e}")))?;
    write_atomic(path, &toml_str)?;
    debug!(path = %path.display(), "config saved");
    Ok(())
}

/// Replace the file at `path` with `contents`.
pub(crate) fn write_atomic(path: &Path, contents: &str) -> Result<(), ConfigError> {
    let write_err = |p: &Path, e: std::io::Error| {
        ConfigError::ParseError(format!("failed to write {}: {e}", p.display()))
    };

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| write_err(parent, e))?;
    }

    let tmp_path = path.with_extension("toml.tmp");
    std::fs::write(&tmp_path, contents).map_err(|e| write_err(&tmp_path, e))?;

    if let Err(e) = std::fs::rename(&tmp_path, path) {
        // Rename can fail across filesystems or on Windows when the target
        // is open; a direct write is still better than no config.
        warn!(error = %e, "rename of {} failed, writing in place", tmp_path.display());
        std::fs::write(path, contents).map_err(|e| write_err(path, e))?;
        let _ = std::fs::remove_file(&tmp_path);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use spark_common::ModelVersion;
    use tempfile::TempDir;

    fn sample_config() -> SparkConfig {
        let mut config = SparkConfig::default();
        config.credentials.app_id = "5d1ce7a1".into();
        config.credentials.api_key = "key".into();
        config.credentials.api_secret = "secret".into();
        config.model.version = ModelVersion::V3_5;
        config.model.temperature = 0.3;
        config.session.system_prompt = Some("Be brief.".into());
        config
    }

    #[test]
    fn saved_config_loads_back() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");

        let config = sample_config();
        save_config_to_path(&config, &path).unwrap();
        let parsed = crate::load_from_path(&path).unwrap();

        assert_eq!(parsed.credentials, config.credentials);
        assert_eq!(parsed.model.version, ModelVersion::V3_5);
        assert_eq!(parsed.model.temperature, 0.3);
        assert_eq!(parsed.session.system_prompt.as_deref(), Some("Be brief."));
        assert!(parsed.session.history_file.is_none());
    }

    #[test]
    fn save_creates_parent_dirs_and_leaves_no_tmp_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("deep").join("config.toml");

        save_config_to_path(&sample_config(), &path).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("version = \"3.5\""));
        assert!(!path.with_extension("toml.tmp").exists());
    }

    #[test]
    fn save_overwrites_existing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[model]\ntop_k = 1\n").unwrap();

        save_config_to_path(&sample_config(), &path).unwrap();

        let parsed = crate::load_from_path(&path).unwrap();
        assert_eq!(parsed.model.top_k, 4);
        assert_eq!(parsed.credentials.app_id, "5d1ce7a1");
    }
}
