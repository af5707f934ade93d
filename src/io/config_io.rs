use std::fs;
use std::path::{Path, PathBuf};

use crate::model::config::Config;

use super::store::DATA_DIR;

/// Error type for config loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not read {path}: {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not parse config.toml: {0}")]
    ParseError(#[from] toml::de::Error),
}

pub fn config_path(root: &Path) -> PathBuf {
    root.join(DATA_DIR).join("config.toml")
}

/// Read `.tasktree/config.toml` under `root`. A missing file yields the
/// defaults.
pub fn read_config(root: &Path) -> Result<Config, ConfigError> {
    let path = config_path(root);
    if !path.exists() {
        tracing::debug!(path = %path.display(), "no config file, using defaults");
        return Ok(Config::default());
    }
    let text = fs::read_to_string(&path).map_err(|e| ConfigError::ReadError {
        path: path.clone(),
        source: e,
    })?;
    Ok(toml::from_str(&text)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_config_is_default() {
        let tmp = TempDir::new().unwrap();
        assert_eq!(read_config(tmp.path()).unwrap(), Config::default());
    }

    #[test]
    fn test_reads_overrides() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join(DATA_DIR)).unwrap();
        fs::write(
            config_path(tmp.path()),
            "[paste]\ncopy_suffix = \" - copy\"\n\n[ids]\nprefix = \"task-\"\n",
        )
        .unwrap();
        let config = read_config(tmp.path()).unwrap();
        assert_eq!(config.paste.copy_suffix, " - copy");
        assert_eq!(config.ids.prefix, "task-");
        assert!(config.view.show_completed);
    }

    #[test]
    fn test_malformed_config_is_an_error() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join(DATA_DIR)).unwrap();
        fs::write(config_path(tmp.path()), "[paste\ncopy_suffix = 1").unwrap();
        assert!(matches!(read_config(tmp.path()), Err(ConfigError::ParseError(_))));
    }
}
