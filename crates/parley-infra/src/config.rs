//! Configuration loader for Parley.
//!
//! Reads `config.toml` from the data directory (`~/.parley/` in production)
//! and deserializes it into [`ChatConfig`]. Falls back to defaults when the
//! file is missing or malformed. An explicitly requested file (`--config`)
//! must exist and parse.

use std::path::{Path, PathBuf};

use parley_types::config::ChatConfig;
use parley_types::error::ConfigError;

/// Resolve the data directory.
///
/// `PARLEY_DATA_DIR` wins; otherwise `~/.parley`; otherwise `./.parley`.
pub fn resolve_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("PARLEY_DATA_DIR") {
        return PathBuf::from(dir);
    }

    if let Some(home) = dirs::home_dir() {
        return home.join(".parley");
    }

    PathBuf::from(".parley")
}

/// Load `{data_dir}/config.toml`, falling back to [`ChatConfig::default()`].
pub async fn load_config(data_dir: &Path) -> ChatConfig {
    let config_path = data_dir.join("config.toml");

    let content = match tokio::fs::read_to_string(&config_path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config.toml found at {}, using defaults", config_path.display());
            return ChatConfig::default();
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", config_path.display());
            return ChatConfig::default();
        }
    };

    match toml::from_str::<ChatConfig>(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!(
                "Failed to parse {}: {err}, using defaults",
                config_path.display()
            );
            ChatConfig::default()
        }
    }
}

/// Load a config file the user named explicitly.
pub async fn load_config_file(path: &Path) -> Result<ChatConfig, ConfigError> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;

    toml::from_str(&content).map_err(|err| ConfigError::Parse {
        path: path.display().to_string(),
        message: err.to_string(),
    })
}

/// Resolve a model file path: absolute paths pass through, relative paths
/// are taken relative to the data directory.
pub fn resolve_model_path(data_dir: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        data_dir.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn load_config_missing_file_returns_default() {
        let tmp = TempDir::new().unwrap();
        let config = load_config(tmp.path()).await;
        assert_eq!(config.conversation.max_history, 6);
        assert_eq!(config.generation.max_new_tokens, 50);
    }

    #[tokio::test]
    async fn load_config_valid_toml_returns_parsed() {
        let tmp = TempDir::new().unwrap();
        tokio::fs::write(
            tmp.path().join("config.toml"),
            r#"
[model]
name = "tiny"
tokenizer_path = "tiny/tokenizer.json"

[generation]
temperature = 0.2
do_sample = false
"#,
        )
        .await
        .unwrap();

        let config = load_config(tmp.path()).await;
        assert_eq!(config.model.name, "tiny");
        assert_eq!(config.model.tokenizer_path, PathBuf::from("tiny/tokenizer.json"));
        assert!((config.generation.temperature - 0.2).abs() < f64::EPSILON);
        assert!(!config.generation.do_sample);
        assert_eq!(config.conversation.max_history, 6);
    }

    #[tokio::test]
    async fn load_config_invalid_toml_returns_default() {
        let tmp = TempDir::new().unwrap();
        tokio::fs::write(tmp.path().join("config.toml"), "this is not { valid toml !!!")
            .await
            .unwrap();

        let config = load_config(tmp.path()).await;
        assert_eq!(config.model.name, "tinyllama-1.1b-chat");
    }

    #[tokio::test]
    async fn load_config_file_reports_missing_file() {
        let tmp = TempDir::new().unwrap();
        let err = load_config_file(&tmp.path().join("nope.toml")).await.unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[tokio::test]
    async fn load_config_file_reports_parse_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("bad.toml");
        tokio::fs::write(&path, "[conversation]\nmax_history = \"six\"\n")
            .await
            .unwrap();

        let err = load_config_file(&path).await.unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("bad.toml"));
    }

    #[test]
    fn resolve_model_path_handles_relative_and_absolute() {
        let data_dir = Path::new("/data/parley");
        assert_eq!(
            resolve_model_path(data_dir, Path::new("models/model.gguf")),
            PathBuf::from("/data/parley/models/model.gguf")
        );
        assert_eq!(
            resolve_model_path(data_dir, Path::new("/opt/model.gguf")),
            PathBuf::from("/opt/model.gguf")
        );
    }
}
