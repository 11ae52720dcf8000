//! Configuration for the language model, vector index, open-data API and server
//!
//! Loads configuration from config.yml file

use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::warn;

use crate::error::{Error, Result};
use crate::pipeline::relevance::RelevanceFailurePolicy;

/// Default constants (fallback if config.yml not found)
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";
pub const DEFAULT_MAX_TOKENS: u32 = 1024;
pub const DEFAULT_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_QDRANT_URL: &str = "http://localhost:6334";
pub const DEFAULT_COLLECTION: &str = "documents";
pub const DEFAULT_DATASETS_BASE_URL: &str = "https://data.gov.sg";
pub const DEFAULT_SERVER_ADDR: &str = "127.0.0.1:3000";
pub const DEFAULT_INTERPRETER_URL: &str = "http://localhost:49999";

/// YAML config structures
#[derive(Debug, Default, Deserialize)]
struct YamlConfig {
    openai: Option<OpenAIConfig>,
    qdrant: Option<QdrantConfig>,
    datasets: Option<DatasetsConfig>,
    server: Option<ServerConfig>,
    relevance: Option<RelevanceConfig>,
    interpreter: Option<InterpreterConfig>,
}

#[derive(Debug, Default, Deserialize)]
struct OpenAIConfig {
    api_key: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
    max_tokens: Option<u32>,
    temperature: Option<f32>,
    embedding_model: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct QdrantConfig {
    url: Option<String>,
    api_key: Option<String>,
    collection: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct DatasetsConfig {
    base_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerConfig {
    addr: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RelevanceConfig {
    failure_policy: Option<RelevanceFailurePolicy>,
}

#[derive(Debug, Default, Deserialize)]
struct InterpreterConfig {
    enabled: Option<bool>,
    url: Option<String>,
    api_key: Option<String>,
}

/// Main configuration struct
#[derive(Debug, Clone)]
pub struct Config {
    pub openai_api_key: String,
    pub openai_base_url: String,
    pub openai_model: String,
    pub openai_max_tokens: u32,
    pub openai_temperature: f32,
    pub embedding_model: String,
    pub qdrant_url: String,
    pub qdrant_api_key: Option<String>,
    pub qdrant_collection: String,
    pub datasets_base_url: String,
    pub server_addr: String,
    pub relevance_failure_policy: RelevanceFailurePolicy,
    pub interpreter_enabled: bool,
    pub interpreter_url: String,
    pub interpreter_api_key: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    /// Load configuration from config.yml or use defaults
    /// Environment variables take precedence over config.yml values
    pub fn new() -> Self {
        Self::load_first(&["config.yml", "../config.yml"])
    }

    /// Load the first candidate file that exists. Defaults are used when none
    /// exists, or with a warning when the one found cannot be loaded.
    fn load_first<P: AsRef<Path>>(candidates: &[P]) -> Self {
        for candidate in candidates {
            let path = candidate.as_ref();
            if !path.exists() {
                continue;
            }
            match Self::load_from_file(path) {
                Ok(config) => return config,
                Err(e) => {
                    warn!(
                        path = %path.display(),
                        error = %e,
                        "Config file is invalid, using defaults"
                    );
                    break;
                }
            }
        }
        Self::load_dotenv();
        Self::from_yaml(YamlConfig::default())
    }

    /// Resolve a value: prefer env var if config value looks like ${VAR}
    fn resolve_env_string(value: Option<String>, env_key: &str) -> Option<String> {
        if let Some(ref v) = value {
            if v.starts_with("${") && v.ends_with('}') {
                let var_name = &v[2..v.len() - 1];
                return std::env::var(var_name)
                    .ok()
                    .or_else(|| std::env::var(env_key).ok())
                    .filter(|s| !s.is_empty());
            }
        }
        if let Ok(env_val) = std::env::var(env_key) {
            if !env_val.is_empty() {
                return Some(env_val);
            }
        }
        value.filter(|s| !s.is_empty())
    }

    /// Resolve a boolean flag from config or env var
    fn resolve_env_bool(value: Option<bool>, env_key: &str) -> bool {
        if let Some(v) = value {
            return v;
        }
        std::env::var(env_key)
            .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes" | "on"))
            .unwrap_or(false)
    }

    /// Load .env file into environment variables using dotenvy
    fn load_dotenv() {
        if dotenvy::dotenv().is_err() {
            let _ = dotenvy::from_filename("../.env");
        }
    }

    /// Load configuration from a specific file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::load_dotenv();

        let content = fs::read_to_string(path.as_ref())
            .map_err(|e| Error::Config(format!("Failed to read config file: {}", e)))?;

        let yaml: YamlConfig = serde_yaml::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse config file: {}", e)))?;

        Ok(Self::from_yaml(yaml))
    }

    fn from_yaml(yaml: YamlConfig) -> Self {
        let openai = yaml.openai.unwrap_or_default();
        let qdrant = yaml.qdrant.unwrap_or_default();
        let datasets = yaml.datasets.unwrap_or_default();
        let server = yaml.server.unwrap_or_default();
        let relevance = yaml.relevance.unwrap_or_default();
        let interpreter = yaml.interpreter.unwrap_or_default();

        Self {
            openai_api_key: Self::resolve_env_string(openai.api_key, "OPENAI_API_KEY")
                .unwrap_or_default(),
            openai_base_url: Self::resolve_env_string(openai.base_url, "OPENAI_BASE_URL")
                .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string()),
            openai_model: Self::resolve_env_string(openai.model, "OPENAI_MODEL")
                .unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string()),
            openai_max_tokens: openai.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            openai_temperature: openai.temperature.unwrap_or(DEFAULT_TEMPERATURE),
            embedding_model: openai
                .embedding_model
                .unwrap_or_else(|| DEFAULT_EMBEDDING_MODEL.to_string()),
            qdrant_url: Self::resolve_env_string(qdrant.url, "QDRANT_URL")
                .unwrap_or_else(|| DEFAULT_QDRANT_URL.to_string()),
            qdrant_api_key: Self::resolve_env_string(qdrant.api_key, "QDRANT_API_KEY"),
            qdrant_collection: Self::resolve_env_string(qdrant.collection, "QDRANT_COLLECTION")
                .unwrap_or_else(|| DEFAULT_COLLECTION.to_string()),
            datasets_base_url: Self::resolve_env_string(datasets.base_url, "DATASETS_BASE_URL")
                .unwrap_or_else(|| DEFAULT_DATASETS_BASE_URL.to_string()),
            server_addr: Self::resolve_env_string(server.addr, "DATASET_CHAT_ADDR")
                .unwrap_or_else(|| DEFAULT_SERVER_ADDR.to_string()),
            relevance_failure_policy: relevance.failure_policy.unwrap_or_default(),
            interpreter_enabled: Self::resolve_env_bool(
                interpreter.enabled,
                "INTERPRETER_ENABLED",
            ),
            interpreter_url: Self::resolve_env_string(interpreter.url, "INTERPRETER_URL")
                .unwrap_or_else(|| DEFAULT_INTERPRETER_URL.to_string()),
            interpreter_api_key: Self::resolve_env_string(
                interpreter.api_key,
                "INTERPRETER_API_KEY",
            ),
        }
    }

    /// Fail early when the language model cannot be reached at all.
    pub fn require_openai_key(&self) -> Result<&str> {
        if self.openai_api_key.trim().is_empty() {
            return Err(Error::Config(
                "OPENAI_API_KEY is not set (openai.api_key in config.yml)".to_string(),
            ));
        }
        Ok(&self.openai_api_key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{LazyLock, Mutex};

    static ENV_LOCK: LazyLock<Mutex<()>> = LazyLock::new(|| Mutex::new(()));

    struct EnvGuard {
        key: String,
        original: Option<String>,
    }

    impl EnvGuard {
        fn set(key: &str, value: &str) -> Self {
            let original = std::env::var(key).ok();
            std::env::set_var(key, value);
            Self {
                key: key.to_string(),
                original,
            }
        }

        fn unset(key: &str) -> Self {
            let original = std::env::var(key).ok();
            std::env::remove_var(key);
            Self {
                key: key.to_string(),
                original,
            }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            match &self.original {
                Some(value) => std::env::set_var(&self.key, value),
                None => std::env::remove_var(&self.key),
            }
        }
    }

    fn write_config(yaml: &str) -> tempfile::NamedTempFile {
        let file = tempfile::Builder::new()
            .suffix(".yml")
            .tempfile()
            .expect("temp config");
        std::fs::write(file.path(), yaml).expect("write config");
        file
    }

    #[test]
    fn test_load_from_yaml() {
        let _lock = ENV_LOCK.lock().unwrap();
        let _guards = [
            EnvGuard::unset("OPENAI_MODEL"),
            EnvGuard::unset("QDRANT_COLLECTION"),
            EnvGuard::unset("DATASETS_BASE_URL"),
        ];
        let file = write_config(
            r#"
openai:
  model: "gpt-4o"
  max_tokens: 512
  temperature: 0.1
qdrant:
  url: "http://qdrant:6334"
  collection: "datasets"
datasets:
  base_url: "http://localhost:8080"
relevance:
  failure_policy: treat_as_irrelevant
interpreter:
  enabled: true
"#,
        );

        let config = Config::load_from_file(file.path()).unwrap();

        assert_eq!(config.openai_model, "gpt-4o");
        assert_eq!(config.openai_max_tokens, 512);
        assert!((config.openai_temperature - 0.1).abs() < f32::EPSILON);
        assert_eq!(config.qdrant_collection, "datasets");
        assert_eq!(config.datasets_base_url, "http://localhost:8080");
        assert_eq!(
            config.relevance_failure_policy,
            RelevanceFailurePolicy::TreatAsIrrelevant
        );
        assert!(config.interpreter_enabled);
    }

    #[test]
    fn empty_yaml_uses_defaults() {
        let _lock = ENV_LOCK.lock().unwrap();
        let _guards = [
            EnvGuard::unset("OPENAI_MODEL"),
            EnvGuard::unset("OPENAI_BASE_URL"),
            EnvGuard::unset("QDRANT_COLLECTION"),
            EnvGuard::unset("DATASETS_BASE_URL"),
            EnvGuard::unset("DATASET_CHAT_ADDR"),
            EnvGuard::unset("INTERPRETER_ENABLED"),
        ];
        let file = write_config("{}\n");

        let config = Config::load_from_file(file.path()).unwrap();

        assert_eq!(config.openai_model, DEFAULT_OPENAI_MODEL);
        assert_eq!(config.openai_base_url, DEFAULT_OPENAI_BASE_URL);
        assert_eq!(config.qdrant_collection, DEFAULT_COLLECTION);
        assert_eq!(config.datasets_base_url, DEFAULT_DATASETS_BASE_URL);
        assert_eq!(config.server_addr, DEFAULT_SERVER_ADDR);
        assert_eq!(config.relevance_failure_policy, RelevanceFailurePolicy::Abort);
        assert!(!config.interpreter_enabled);
    }

    #[test]
    fn env_placeholders_are_resolved_from_environment() {
        let _lock = ENV_LOCK.lock().unwrap();
        let file = write_config(
            r#"
openai:
  api_key: "${CHAT_TEST_OPENAI_KEY}"
qdrant:
  url: "${CHAT_TEST_QDRANT_URL}"
"#,
        );

        let _guards = [
            EnvGuard::set("CHAT_TEST_OPENAI_KEY", "sk-from-env"),
            EnvGuard::set("CHAT_TEST_QDRANT_URL", "http://vector:6334"),
            EnvGuard::unset("QDRANT_URL"),
        ];

        let config = Config::load_from_file(file.path()).unwrap();

        assert_eq!(config.openai_api_key, "sk-from-env");
        assert_eq!(config.qdrant_url, "http://vector:6334");
    }

    #[test]
    fn explicit_env_overrides_yaml_strings() {
        let _lock = ENV_LOCK.lock().unwrap();
        let file = write_config(
            r#"
openai:
  model: "from_yaml"
"#,
        );

        let _guards = [EnvGuard::set("OPENAI_MODEL", "from_env")];

        let config = Config::load_from_file(file.path()).unwrap();
        assert_eq!(config.openai_model, "from_env");
    }

    #[test]
    fn require_openai_key_rejects_blank_key() {
        let _lock = ENV_LOCK.lock().unwrap();
        let _guards = [EnvGuard::unset("OPENAI_API_KEY")];
        let file = write_config("openai:\n  api_key: \"  \"\n");

        let config = Config::load_from_file(file.path()).unwrap();
        let err = config.require_openai_key().unwrap_err();
        assert!(err.to_string().contains("OPENAI_API_KEY"));
    }

    #[test]
    fn load_from_file_fails_on_missing_file() {
        let result = Config::load_from_file("/nonexistent/path/config.yml");
        assert!(result.is_err());
    }

    #[test]
    fn load_from_file_fails_on_invalid_yaml() {
        let file = write_config("openai: [unclosed");
        let err = Config::load_from_file(file.path()).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }

    #[test]
    fn invalid_config_is_not_skipped_for_the_next_candidate() {
        let _lock = ENV_LOCK.lock().unwrap();
        let broken = write_config("relevance:\n  failure_policy: sometimes\n");
        let valid = write_config("relevance:\n  failure_policy: treat_as_irrelevant\n");

        let config = Config::load_first(&[broken.path(), valid.path()]);

        assert_eq!(config.relevance_failure_policy, RelevanceFailurePolicy::Abort);
    }

    #[test]
    fn missing_candidates_are_skipped() {
        let _lock = ENV_LOCK.lock().unwrap();
        let valid = write_config("relevance:\n  failure_policy: treat_as_irrelevant\n");
        let missing = Path::new("/nonexistent/path/config.yml");

        let config = Config::load_first(&[missing, valid.path()]);

        assert_eq!(
            config.relevance_failure_policy,
            RelevanceFailurePolicy::TreatAsIrrelevant
        );
    }

    #[test]
    fn rejects_unknown_failure_policy() {
        let file = write_config("relevance:\n  failure_policy: sometimes\n");
        assert!(Config::load_from_file(file.path()).is_err());
    }
}
