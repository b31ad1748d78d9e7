use std::env;
use std::fs;
use std::path::PathBuf;

use secrecy::SecretString;
use serde::Deserialize;
use thiserror::Error;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub llm: LlmConfig,
    pub engine: EngineConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct LlmConfig {
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub timeout_secs: u64,
    pub api_key: Option<SecretString>,
}

/// Per-workflow iteration ceilings. Each cap bounds how many planner passes
/// a single request may consume before the engine forces a response.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EngineConfig {
    pub create_max_iterations: u32,
    pub update_max_iterations: u32,
    pub info_max_iterations: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self { create_max_iterations: 8, update_max_iterations: 8, info_max_iterations: 5 }
    }
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub llm_base_url: Option<String>,
    pub llm_model: Option<String>,
    pub llm_api_key: Option<String>,
    pub log_level: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    #[serde(default)]
    llm: FileLlm,
    #[serde(default)]
    engine: FileEngine,
    #[serde(default)]
    logging: FileLogging,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileLlm {
    base_url: Option<String>,
    model: Option<String>,
    temperature: Option<f32>,
    timeout_secs: Option<u64>,
    api_key: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileEngine {
    create_max_iterations: Option<u32>,
    update_max_iterations: Option<u32>,
    info_max_iterations: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileLogging {
    level: Option<String>,
    format: Option<LogFormat>,
}

const DEFAULT_CONFIG_PATH: &str = "specwatch.toml";
const DEFAULT_LLM_BASE_URL: &str = "http://localhost:11434";
const DEFAULT_LLM_MODEL: &str = "llama3.1:70b";
const DEFAULT_LLM_TEMPERATURE: f32 = 0.2;
const DEFAULT_LLM_TIMEOUT_SECS: u64 = 120;

impl AppConfig {
    /// Loads configuration in precedence order: programmatic overrides,
    /// then `SPECWATCH_*` environment variables, then the TOML file, then
    /// built-in defaults.
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let path = options.config_path.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
        let file = match fs::read_to_string(&path) {
            Ok(raw) => toml::from_str::<FileConfig>(&raw)
                .map_err(|source| ConfigError::ParseFile { path: path.clone(), source })?,
            Err(source) if source.kind() == std::io::ErrorKind::NotFound => {
                if options.require_file {
                    return Err(ConfigError::MissingConfigFile(path));
                }
                FileConfig::default()
            }
            Err(source) => return Err(ConfigError::ReadFile { path, source }),
        };

        let overrides = options.overrides;
        let llm = LlmConfig {
            base_url: overrides
                .llm_base_url
                .or_else(|| env_string("SPECWATCH_LLM_BASE_URL"))
                .or(file.llm.base_url)
                .unwrap_or_else(|| DEFAULT_LLM_BASE_URL.to_string()),
            model: overrides
                .llm_model
                .or_else(|| env_string("SPECWATCH_LLM_MODEL"))
                .or(file.llm.model)
                .unwrap_or_else(|| DEFAULT_LLM_MODEL.to_string()),
            temperature: file.llm.temperature.unwrap_or(DEFAULT_LLM_TEMPERATURE),
            timeout_secs: env_parsed("SPECWATCH_LLM_TIMEOUT_SECS")?
                .or(file.llm.timeout_secs)
                .unwrap_or(DEFAULT_LLM_TIMEOUT_SECS),
            api_key: overrides
                .llm_api_key
                .or_else(|| env_string("SPECWATCH_LLM_API_KEY"))
                .or(file.llm.api_key)
                .map(SecretString::from),
        };

        let defaults = EngineConfig::default();
        let engine = EngineConfig {
            create_max_iterations: env_parsed("SPECWATCH_CREATE_MAX_ITERATIONS")?
                .or(file.engine.create_max_iterations)
                .unwrap_or(defaults.create_max_iterations),
            update_max_iterations: env_parsed("SPECWATCH_UPDATE_MAX_ITERATIONS")?
                .or(file.engine.update_max_iterations)
                .unwrap_or(defaults.update_max_iterations),
            info_max_iterations: env_parsed("SPECWATCH_INFO_MAX_ITERATIONS")?
                .or(file.engine.info_max_iterations)
                .unwrap_or(defaults.info_max_iterations),
        };

        let logging = LoggingConfig {
            level: overrides
                .log_level
                .or_else(|| env_string("SPECWATCH_LOG_LEVEL"))
                .or(file.logging.level)
                .unwrap_or_else(|| "info".to_string()),
            format: file.logging.format.unwrap_or(LogFormat::Compact),
        };

        let config = Self { llm, engine, logging };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.llm.base_url.trim().is_empty() {
            return Err(ConfigError::Validation("llm.base_url must not be empty".to_string()));
        }
        if self.llm.model.trim().is_empty() {
            return Err(ConfigError::Validation("llm.model must not be empty".to_string()));
        }
        if self.llm.timeout_secs == 0 {
            return Err(ConfigError::Validation("llm.timeout_secs must be positive".to_string()));
        }
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(ConfigError::Validation(
                "llm.temperature must be between 0.0 and 2.0".to_string(),
            ));
        }
        for (name, cap) in [
            ("engine.create_max_iterations", self.engine.create_max_iterations),
            ("engine.update_max_iterations", self.engine.update_max_iterations),
            ("engine.info_max_iterations", self.engine.info_max_iterations),
        ] {
            if cap == 0 {
                return Err(ConfigError::Validation(format!("{name} must be at least 1")));
            }
        }
        Ok(())
    }
}

fn env_string(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.is_empty())
}

fn env_parsed<T: std::str::FromStr>(key: &str) -> Result<Option<T>, ConfigError> {
    match env_string(key) {
        None => Ok(None),
        Some(value) => value
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidEnvOverride { key: key.to_string(), value }),
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(contents.as_bytes()).expect("write config");
        file
    }

    #[test]
    fn defaults_apply_without_a_config_file() {
        let config = AppConfig::load(LoadOptions {
            config_path: Some("does-not-exist.toml".into()),
            ..LoadOptions::default()
        })
        .expect("defaults");

        assert_eq!(config.llm.base_url, "http://localhost:11434");
        assert_eq!(config.engine.create_max_iterations, 8);
        assert_eq!(config.engine.info_max_iterations, 5);
        assert_eq!(config.logging.format, LogFormat::Compact);
    }

    #[test]
    fn missing_file_is_an_error_when_required() {
        let result = AppConfig::load(LoadOptions {
            config_path: Some("does-not-exist.toml".into()),
            require_file: true,
            ..LoadOptions::default()
        });
        assert!(matches!(result, Err(ConfigError::MissingConfigFile(_))));
    }

    #[test]
    fn file_values_and_overrides_compose() {
        let file = write_config(
            r#"
[llm]
model = "llama3.1:8b"
temperature = 0.1

[engine]
info_max_iterations = 3

[logging]
level = "debug"
format = "json"
"#,
        );

        let config = AppConfig::load(LoadOptions {
            config_path: Some(file.path().to_path_buf()),
            overrides: ConfigOverrides {
                llm_model: Some("llama3.1:70b".to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        })
        .expect("config");

        // The programmatic override beats the file value.
        assert_eq!(config.llm.model, "llama3.1:70b");
        assert_eq!(config.llm.temperature, 0.1);
        assert_eq!(config.engine.info_max_iterations, 3);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn zero_iteration_cap_fails_validation() {
        let file = write_config("[engine]\ncreate_max_iterations = 0\n");
        let result = AppConfig::load(LoadOptions {
            config_path: Some(file.path().to_path_buf()),
            ..LoadOptions::default()
        });
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        let file = write_config("[llm\nmodel = ");
        let result = AppConfig::load(LoadOptions {
            config_path: Some(file.path().to_path_buf()),
            ..LoadOptions::default()
        });
        assert!(matches!(result, Err(ConfigError::ParseFile { .. })));
    }
}
