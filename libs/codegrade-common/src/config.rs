// Application configuration and the language table

use crate::error::{EngineError, EngineResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use thiserror::Error;

pub const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1:6379";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
pub const DEFAULT_LANGUAGES_PATH: &str = "config/languages.json";
pub const DEFAULT_EXECUTION_TIMEOUT_SECS: u64 = 20;

/// Language table used when no languages.json is present
const BUILTIN_LANGUAGES: &[(&str, u32)] = &[
    ("python", 71),
    ("javascript", 63),
    ("cpp", 54),
    ("c", 50),
    ("java", 62),
];

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageEntry {
    pub name: String,
    pub language_id: u32,
}

#[derive(Debug, Serialize, Deserialize)]
struct LanguagesFile {
    languages: Vec<LanguageEntry>,
}

/// Immutable mapping from language name to execution-service identifier.
/// Names are matched exactly; unknown names fail closed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageTable {
    ids: BTreeMap<String, u32>,
}

impl LanguageTable {
    pub fn builtin() -> Self {
        let ids = BUILTIN_LANGUAGES
            .iter()
            .map(|(name, id)| (name.to_string(), *id))
            .collect();
        Self { ids }
    }

    pub fn from_entries(entries: Vec<LanguageEntry>) -> Result<Self, ConfigError> {
        if entries.is_empty() {
            return Err(ConfigError::Invalid("no languages configured".to_string()));
        }

        let mut ids = BTreeMap::new();
        for entry in entries {
            if entry.name.trim().is_empty() {
                return Err(ConfigError::Invalid("language name cannot be empty".to_string()));
            }
            if ids.insert(entry.name.clone(), entry.language_id).is_some() {
                return Err(ConfigError::Invalid(format!(
                    "language '{}' is configured twice",
                    entry.name
                )));
            }
        }

        Ok(Self { ids })
    }

    /// Load the table from a languages.json file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;

        let file: LanguagesFile = serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })?;

        Self::from_entries(file.languages)
    }

    /// Load from `path`, falling back to the built-in table when the file does not exist
    pub fn load_or_builtin<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            tracing::warn!(
                path = %path.as_ref().display(),
                "Language config not found, using built-in table"
            );
            Ok(Self::builtin())
        }
    }

    /// Resolve a language name to its execution-service identifier
    pub fn resolve(&self, language: &str) -> EngineResult<u32> {
        self.ids
            .get(language)
            .copied()
            .ok_or_else(|| EngineError::UnsupportedLanguage(language.to_string()))
    }

    pub fn names(&self) -> Vec<String> {
        self.ids.keys().cloned().collect()
    }

    pub fn entries(&self) -> Vec<LanguageEntry> {
        self.ids
            .iter()
            .map(|(name, id)| LanguageEntry {
                name: name.clone(),
                language_id: *id,
            })
            .collect()
    }

    /// Serialize in languages.json layout
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&LanguagesFile {
            languages: self.entries(),
        })
    }
}

/// Execution service connection settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JudgeConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub api_host: Option<String>,
    pub timeout_secs: u64,
}

/// Process configuration read from the environment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub redis_url: String,
    pub bind_addr: String,
    pub languages_path: String,
    pub judge: Option<JudgeConfig>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let timeout_secs = match var("JUDGE0_TIMEOUT_SECS") {
            Some(raw) => raw.trim().parse::<u64>().map_err(|_| {
                ConfigError::Invalid(format!("JUDGE0_TIMEOUT_SECS must be an integer, got '{}'", raw))
            })?,
            None => DEFAULT_EXECUTION_TIMEOUT_SECS,
        };
        if timeout_secs == 0 {
            return Err(ConfigError::Invalid("JUDGE0_TIMEOUT_SECS must be positive".to_string()));
        }

        let judge = var("JUDGE0_URL").map(|base_url| JudgeConfig {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: var("JUDGE0_API_KEY"),
            api_host: var("JUDGE0_API_HOST"),
            timeout_secs,
        });

        Ok(Self {
            redis_url: var("REDIS_URL").unwrap_or_else(|| DEFAULT_REDIS_URL.to_string()),
            bind_addr: var("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
            languages_path: var("LANGUAGES_PATH").unwrap_or_else(|| DEFAULT_LANGUAGES_PATH.to_string()),
            judge,
        })
    }

    /// Execution service settings, required by anything that runs code
    pub fn require_judge(&self) -> Result<&JudgeConfig, ConfigError> {
        self.judge
            .as_ref()
            .ok_or_else(|| ConfigError::MissingEnvVar("JUDGE0_URL".to_string()))
    }
}
