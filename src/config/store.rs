//! Configuration persistence: a JSON file on disk and an in-memory fake.
//!
//! The on-disk record holds the generation parameters plus the API token
//! under the `HF_API_TOKEN` key. A file that cannot be parsed or holds
//! out-of-range values is rewritten with defaults, keeping the token when it
//! can still be read.

use std::cell::RefCell;
use std::env;
use std::io::Write as _;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::error::ConfigError;

use super::{GenerationConfig, TOKEN_ENV_VAR, mask_token};

/// Environment variable that overrides the config file location.
pub const CONFIG_PATH_ENV_VAR: &str = "GITAI_CONFIG";

const APP_DIR: &str = "gitai";
const CONFIG_FILE: &str = "config.json";

/// Where the active token came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    Environment,
    Stored,
}

/// An API token together with its origin.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    pub value: String,
    pub source: CredentialSource,
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("value", &mask_token(&self.value))
            .field("source", &self.source)
            .finish()
    }
}

/// Read/write access to the generation parameters and API token.
pub trait ConfigStore {
    fn load(&self) -> Result<GenerationConfig, ConfigError>;

    fn save(&self, config: &GenerationConfig) -> Result<(), ConfigError>;

    /// The token to authenticate with, if any.
    fn credential(&self) -> Result<Option<Credential>, ConfigError>;

    fn set_token(&self, token: &str) -> Result<(), ConfigError>;

    /// Remove the stored token. Returns whether one was present.
    fn delete_token(&self) -> Result<bool, ConfigError>;

    /// Restore default parameters. The stored token survives unless `include_token`.
    fn reset(&self, include_token: bool) -> Result<(), ConfigError>;

    /// Human-readable dump of the active configuration with the token masked.
    fn describe(&self) -> Result<String, ConfigError> {
        let config = self.load()?;
        let max_retries = config
            .max_retries
            .map(|n| n.to_string())
            .unwrap_or_else(|| "unlimited".to_string());
        let token = match self.credential()? {
            Some(Credential {
                value,
                source: CredentialSource::Environment,
            }) => format!("{} (from {})", mask_token(&value), TOKEN_ENV_VAR),
            Some(Credential {
                value,
                source: CredentialSource::Stored,
            }) => format!("{} (stored)", mask_token(&value)),
            None => "not set".to_string(),
        };

        Ok(format!(
            "model:          {}\n\
             provider:       {}\n\
             temperature:    {}\n\
             max_tokens:     {}\n\
             max_length:     {}\n\
             max_retries:    {}\n\
             token:          {}\n\
             system_prompt:  {}\n",
            config.model,
            config.provider,
            config.temperature,
            config.max_tokens,
            config.max_length,
            max_retries,
            token,
            config.system_prompt,
        ))
    }
}

/// Everything persisted in the config file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
struct StoredConfig {
    #[serde(flatten)]
    generation: GenerationConfig,
    #[serde(rename = "HF_API_TOKEN", skip_serializing_if = "Option::is_none")]
    token: Option<String>,
}

/// Read the token from the environment, ignoring empty values.
fn env_token() -> Option<String> {
    env::var(TOKEN_ENV_VAR)
        .ok()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

/// Trimmed token, rejecting blank input.
fn checked_token(token: &str) -> Result<&str, ConfigError> {
    let token = token.trim();
    if token.is_empty() {
        return Err(ConfigError::InvalidValue {
            field: "token",
            reason: "must not be empty".to_string(),
        });
    }
    Ok(token)
}

/// Config stored as JSON in the platform configuration directory.
#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `$GITAI_CONFIG` if set, otherwise `<config dir>/gitai/config.json`.
    pub fn default_location() -> Result<Self, ConfigError> {
        if let Ok(path) = env::var(CONFIG_PATH_ENV_VAR)
            && !path.is_empty()
        {
            return Ok(Self::new(path));
        }

        let base = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(Self::new(base.join(APP_DIR).join(CONFIG_FILE)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_stored(&self) -> Result<StoredConfig, ConfigError> {
        if !self.path.exists() {
            return Ok(StoredConfig::default());
        }

        let bytes = std::fs::read(&self.path).map_err(|source| ConfigError::ReadFailed {
            path: self.path.display().to_string(),
            source,
        })?;

        let content = match String::from_utf8(bytes) {
            Ok(content) => content,
            Err(e) => return Ok(self.recover(None, &e.to_string())),
        };

        let problem = match serde_json::from_str::<StoredConfig>(&content) {
            Ok(stored) => match stored.generation.validate() {
                Ok(()) => return Ok(stored),
                Err(e) => e.to_string(),
            },
            Err(e) => e.to_string(),
        };

        Ok(self.recover(Some(&content), &problem))
    }

    /// Replace a corrupt file with defaults, carrying over any readable token.
    fn recover(&self, content: Option<&str>, problem: &str) -> StoredConfig {
        let token = content
            .and_then(|c| serde_json::from_str::<serde_json::Value>(c).ok())
            .and_then(|v| v.get(TOKEN_ENV_VAR)?.as_str().map(str::to_string))
            .filter(|t| !t.trim().is_empty());

        warn!(
            "Config file {} is invalid ({}); restoring defaults{}",
            self.path.display(),
            problem,
            if token.is_some() { " and keeping the stored token" } else { "" }
        );

        let stored = StoredConfig {
            generation: GenerationConfig::default(),
            token,
        };
        if let Err(e) = self.write_stored(&stored) {
            warn!("Could not rewrite config file: {e}");
        }
        stored
    }

    fn write_stored(&self, stored: &StoredConfig) -> Result<(), ConfigError> {
        let write_err = |source: std::io::Error| ConfigError::WriteFailed {
            path: self.path.display().to_string(),
            source,
        };

        let dir = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(dir).map_err(write_err)?;

        let json = serde_json::to_string_pretty(stored).map_err(ConfigError::SerializeFailed)?;

        let mut tmp = NamedTempFile::new_in(dir).map_err(write_err)?;
        tmp.write_all(json.as_bytes()).map_err(write_err)?;
        tmp.write_all(b"\n").map_err(write_err)?;
        restrict_permissions(tmp.path()).map_err(write_err)?;
        tmp.persist(&self.path).map_err(|e| write_err(e.error))?;

        debug!("Wrote config to {}", self.path.display());
        Ok(())
    }
}

/// Owner read/write only.
#[cfg(unix)]
fn restrict_permissions(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

impl ConfigStore for FileConfigStore {
    fn load(&self) -> Result<GenerationConfig, ConfigError> {
        Ok(self.read_stored()?.generation)
    }

    fn save(&self, config: &GenerationConfig) -> Result<(), ConfigError> {
        config.validate()?;
        let mut stored = self.read_stored()?;
        stored.generation = config.clone();
        self.write_stored(&stored)
    }

    fn credential(&self) -> Result<Option<Credential>, ConfigError> {
        if let Some(value) = env_token() {
            return Ok(Some(Credential {
                value,
                source: CredentialSource::Environment,
            }));
        }

        Ok(self
            .read_stored()?
            .token
            .filter(|t| !t.is_empty())
            .map(|value| Credential {
                value,
                source: CredentialSource::Stored,
            }))
    }

    fn set_token(&self, token: &str) -> Result<(), ConfigError> {
        let token = checked_token(token)?;
        let mut stored = self.read_stored()?;
        stored.token = Some(token.to_string());
        self.write_stored(&stored)
    }

    fn delete_token(&self) -> Result<bool, ConfigError> {
        let mut stored = self.read_stored()?;
        let had_token = stored.token.take().is_some();
        if had_token {
            self.write_stored(&stored)?;
        }
        Ok(had_token)
    }

    fn reset(&self, include_token: bool) -> Result<(), ConfigError> {
        let token = if include_token {
            None
        } else {
            self.read_stored()?.token
        };
        self.write_stored(&StoredConfig {
            generation: GenerationConfig::default(),
            token,
        })
    }
}

/// Config held in memory. Ignores the environment.
#[derive(Debug, Default)]
pub struct MemoryConfigStore {
    inner: RefCell<StoredConfig>,
}

impl MemoryConfigStore {
    pub fn new(config: GenerationConfig, token: Option<&str>) -> Self {
        Self {
            inner: RefCell::new(StoredConfig {
                generation: config,
                token: token.map(str::to_string),
            }),
        }
    }
}

impl ConfigStore for MemoryConfigStore {
    fn load(&self) -> Result<GenerationConfig, ConfigError> {
        Ok(self.inner.borrow().generation.clone())
    }

    fn save(&self, config: &GenerationConfig) -> Result<(), ConfigError> {
        config.validate()?;
        self.inner.borrow_mut().generation = config.clone();
        Ok(())
    }

    fn credential(&self) -> Result<Option<Credential>, ConfigError> {
        Ok(self
            .inner
            .borrow()
            .token
            .clone()
            .filter(|t| !t.is_empty())
            .map(|value| Credential {
                value,
                source: CredentialSource::Stored,
            }))
    }

    fn set_token(&self, token: &str) -> Result<(), ConfigError> {
        let token = checked_token(token)?;
        self.inner.borrow_mut().token = Some(token.to_string());
        Ok(())
    }

    fn delete_token(&self) -> Result<bool, ConfigError> {
        Ok(self.inner.borrow_mut().token.take().is_some())
    }

    fn reset(&self, include_token: bool) -> Result<(), ConfigError> {
        let mut inner = self.inner.borrow_mut();
        inner.generation = GenerationConfig::default();
        if include_token {
            inner.token = None;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Provider;
    use serial_test::serial;

    fn store_in(dir: &tempfile::TempDir) -> FileConfigStore {
        FileConfigStore::new(dir.path().join("gitai").join("config.json"))
    }

    #[test]
    #[serial]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        assert_eq!(store.load().unwrap(), GenerationConfig::default());
        temp_env::with_var_unset(TOKEN_ENV_VAR, || {
            assert!(store.credential().unwrap().is_none());
        });
        assert!(!store.path().exists());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        let config = GenerationConfig {
            model: "Qwen/Qwen2.5-Coder-7B-Instruct".to_string(),
            provider: Provider::Nebius,
            temperature: 0.1,
            max_retries: Some(5),
            ..Default::default()
        };
        store.save(&config).unwrap();
        assert_eq!(store.load().unwrap(), config);
    }

    #[test]
    fn test_save_rejects_invalid_config() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        let config = GenerationConfig {
            max_length: 0,
            ..Default::default()
        };
        assert!(matches!(
            store.save(&config),
            Err(ConfigError::InvalidValue { field: "max_length", .. })
        ));
        assert!(!store.path().exists());
    }

    #[test]
    #[serial]
    fn test_token_lifecycle() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        temp_env::with_var_unset(TOKEN_ENV_VAR, || {
            store.set_token("  hf_secret_token_value  ").unwrap();
            let cred = store.credential().unwrap().unwrap();
            assert_eq!(cred.value, "hf_secret_token_value");
            assert_eq!(cred.source, CredentialSource::Stored);

            assert!(store.delete_token().unwrap());
            assert!(store.credential().unwrap().is_none());
            assert!(!store.delete_token().unwrap());
        });
    }

    #[test]
    fn test_set_empty_token_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        assert!(store.set_token("   ").is_err());
    }

    #[test]
    #[serial]
    fn test_env_token_takes_precedence() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        store.set_token("hf_stored_token_value").unwrap();

        temp_env::with_var(TOKEN_ENV_VAR, Some("hf_env_token_value"), || {
            let cred = store.credential().unwrap().unwrap();
            assert_eq!(cred.value, "hf_env_token_value");
            assert_eq!(cred.source, CredentialSource::Environment);
        });

        temp_env::with_var(TOKEN_ENV_VAR, Some(""), || {
            let cred = store.credential().unwrap().unwrap();
            assert_eq!(cred.source, CredentialSource::Stored);
        });
    }

    #[test]
    #[serial]
    fn test_reset_preserves_token_by_default() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        store.set_token("hf_keep_me_please").unwrap();
        store
            .save(&GenerationConfig {
                temperature: 0.9,
                ..Default::default()
            })
            .unwrap();

        store.reset(false).unwrap();

        assert_eq!(store.load().unwrap(), GenerationConfig::default());
        temp_env::with_var_unset(TOKEN_ENV_VAR, || {
            assert_eq!(
                store.credential().unwrap().unwrap().value,
                "hf_keep_me_please"
            );
        });

        store.reset(true).unwrap();
        temp_env::with_var_unset(TOKEN_ENV_VAR, || {
            assert!(store.credential().unwrap().is_none());
        });
    }

    #[test]
    #[serial]
    fn test_corrupt_file_recovers_and_keeps_token() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        std::fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        std::fs::write(
            store.path(),
            r#"{"HF_API_TOKEN": "hf_survivor_token", "temperature": "very hot"}"#,
        )
        .unwrap();

        assert_eq!(store.load().unwrap(), GenerationConfig::default());
        temp_env::with_var_unset(TOKEN_ENV_VAR, || {
            assert_eq!(
                store.credential().unwrap().unwrap().value,
                "hf_survivor_token"
            );
        });

        // The file itself was rewritten into a parseable form
        let content = std::fs::read_to_string(store.path()).unwrap();
        let reparsed: StoredConfig = serde_json::from_str(&content).unwrap();
        assert_eq!(reparsed.token.as_deref(), Some("hf_survivor_token"));
    }

    #[test]
    fn test_unparseable_file_recovers_without_token() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        std::fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        std::fs::write(store.path(), "{ this is not json").unwrap();

        assert_eq!(store.load().unwrap(), GenerationConfig::default());
        let content = std::fs::read_to_string(store.path()).unwrap();
        assert!(serde_json::from_str::<StoredConfig>(&content).is_ok());
    }

    #[test]
    fn test_non_utf8_file_recovers_without_token() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        std::fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        std::fs::write(store.path(), b"{\"HF_API_TOKEN\": \"hf_x\xff\xfe\"}").unwrap();

        assert_eq!(store.load().unwrap(), GenerationConfig::default());
        assert!(store.read_stored().unwrap().token.is_none());

        let content = std::fs::read_to_string(store.path()).unwrap();
        assert!(serde_json::from_str::<StoredConfig>(&content).is_ok());
    }

    #[test]
    fn test_out_of_range_values_are_treated_as_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        std::fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        std::fs::write(store.path(), r#"{"temperature": 7.5}"#).unwrap();

        assert_eq!(store.load().unwrap().temperature, 0.5);
    }

    #[test]
    fn test_reads_legacy_token_only_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        std::fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        std::fs::write(store.path(), r#"{"HF_API_TOKEN": "hf_legacy_token"}"#).unwrap();

        assert_eq!(store.load().unwrap(), GenerationConfig::default());
        assert_eq!(
            store.read_stored().unwrap().token.as_deref(),
            Some("hf_legacy_token")
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        store.set_token("hf_private_token").unwrap();
        let mode = std::fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    #[serial]
    fn test_default_location_honours_env_override() {
        temp_env::with_var(CONFIG_PATH_ENV_VAR, Some("/tmp/gitai-test/config.json"), || {
            let store = FileConfigStore::default_location().unwrap();
            assert_eq!(store.path(), Path::new("/tmp/gitai-test/config.json"));
        });
    }

    #[test]
    #[serial]
    fn test_describe_masks_token() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        store.set_token("hf_abcdefghijklmnopqrstuvwxyz").unwrap();

        temp_env::with_var_unset(TOKEN_ENV_VAR, || {
            let dump = store.describe().unwrap();
            assert!(dump.contains("hf_abc...wxyz (stored)"));
            assert!(!dump.contains("hf_abcdefghijklmnopqrstuvwxyz"));
            assert!(dump.contains("max_retries:    unlimited"));
        });
    }

    #[test]
    fn test_memory_store_reset() {
        let store = MemoryConfigStore::new(
            GenerationConfig {
                max_length: 50,
                ..Default::default()
            },
            Some("hf_mem"),
        );
        store.reset(false).unwrap();
        assert_eq!(store.load().unwrap().max_length, crate::config::DEFAULT_MAX_LENGTH);
        assert!(store.credential().unwrap().is_some());
        store.reset(true).unwrap();
        assert!(store.credential().unwrap().is_none());
    }

    #[test]
    fn test_memory_store_rejects_blank_token() {
        let store = MemoryConfigStore::default();
        assert!(matches!(
            store.set_token("   "),
            Err(ConfigError::InvalidValue { field: "token", .. })
        ));
        assert!(store.credential().unwrap().is_none());

        store.set_token("  hf_mem_token ").unwrap();
        assert_eq!(store.credential().unwrap().unwrap().value, "hf_mem_token");
    }

    #[test]
    fn test_memory_store_ignores_empty_stored_token() {
        let store = MemoryConfigStore::new(GenerationConfig::default(), Some(""));
        assert!(store.credential().unwrap().is_none());
    }

    #[test]
    fn test_describe_lists_every_field() {
        let store = MemoryConfigStore::new(
            GenerationConfig {
                max_retries: Some(3),
                ..Default::default()
            },
            None,
        );
        let dump = store.describe().unwrap();
        let keys: Vec<&str> = dump
            .lines()
            .map(|l| l.split(':').next().unwrap_or_default())
            .collect();
        assert_eq!(
            keys,
            vec![
                "model",
                "provider",
                "temperature",
                "max_tokens",
                "max_length",
                "max_retries",
                "token",
                "system_prompt"
            ]
        );
        assert!(dump.contains("max_retries:    3\n"));
        assert!(dump.contains("token:          not set\n"));
    }
}
