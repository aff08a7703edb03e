//! Reading configuration from disk

use std::path::{Path, PathBuf};

use super::{Config, ConfigError};

/// Validate a file name and resolve it to an absolute path.
///
/// The name is trimmed, relative names are resolved against the current
/// directory, and the resulting path must exist.
pub fn file_path(name: &str) -> Result<PathBuf, ConfigError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::EmptyPath);
    }

    let path = Path::new(trimmed);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map_err(|source| ConfigError::Inaccessible {
                path: trimmed.to_string(),
                source,
            })?
            .join(path)
    };

    std::fs::metadata(&absolute).map_err(|source| ConfigError::Inaccessible {
        path: absolute.display().to_string(),
        source,
    })?;

    Ok(absolute)
}

/// Load a JSON configuration file
pub fn load_config(name: &str) -> Result<Config, ConfigError> {
    let path = file_path(name)?;

    let data = std::fs::read(&path).map_err(|source| ConfigError::Inaccessible {
        path: path.display().to_string(),
        source,
    })?;

    let mut config: Config = serde_json::from_slice(&data)?;
    config.path = path;

    tracing::debug!(path = %config.path.display(), files = config.file_count(), "Config loaded");
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    #[test]
    fn test_empty_name() {
        assert!(matches!(file_path(""), Err(ConfigError::EmptyPath)));
        assert!(matches!(file_path("   "), Err(ConfigError::EmptyPath)));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            file_path("definitely_not_here.json"),
            Err(ConfigError::Inaccessible { .. })
        ));
    }

    #[test]
    fn test_existing_absolute_path() {
        let file = NamedTempFile::new().unwrap();
        let name = format!("  {}  ", file.path().display());
        assert_eq!(file_path(&name).unwrap(), file.path());
    }

    #[test]
    fn test_load_config() {
        let dir = TempDir::new().unwrap();
        let log = dir.path().join("error.log");
        std::fs::write(&log, b"").unwrap();

        let mut file = NamedTempFile::new_in(dir.path()).unwrap();
        write!(
            file,
            r#"{{"storage": "file",
                "settings": {{"data_dir": "{}", "replay_existing": true}},
                "observed": [{{"name": "nginx", "files": [{{"file": "{}", "delay": 5}}]}}]}}"#,
            dir.path().join("state").display(),
            log.display()
        )
        .unwrap();

        let config = load_config(&file.path().display().to_string()).unwrap();
        assert_eq!(config.path, file.path());
        assert_eq!(config.storage, "file");
        assert!(config.settings.replay_existing);
        assert_eq!(config.settings.max_read_bytes, 8 * 1024 * 1024);
        assert_eq!(config.observed[0].files[0].delay, 5);
    }

    #[test]
    fn test_load_malformed_config() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{{\"observed\": [").unwrap();

        assert!(matches!(
            load_config(&file.path().display().to_string()),
            Err(ConfigError::Parse(_))
        ));
    }
}
