//! Configuration loading and management.
//!
//! Configuration is loaded from multiple sources with the following precedence
//! (highest to lowest):
//!
//! 1. Command-line arguments
//! 2. Environment variables
//! 3. `.sql-generator.toml` in current directory
//! 4. `~/.config/sql-generator/config.toml`
//! 5. Default values
//!
//! # Configuration File Format
//!
//! ```toml
//! [llm]
//! provider = "openai"          # openai, anthropic, ollama
//! model = "gpt-3.5-turbo"
//! api_key = "sk-..."           # or use LLM_API_KEY env var
//! ollama_url = "http://localhost:11434"
//! timeout_secs = 120
//!
//! [retry]
//! max_retries = 3
//! initial_delay_ms = 1000
//! max_delay_ms = 30000
//! backoff_factor = 2.0
//!
//! [warehouse]
//! host = "cluster.example.redshift.amazonaws.com"
//! port = 5439
//! database = "dev"
//! user = "admin"
//! schema = "public"
//!
//! [prompt]
//! timestamp_column = "created_at"
//!
//! [logging]
//! level = "warn"
//! ```
//!
//! # Environment Variables
//!
//! | Variable | Description |
//! |----------|-------------|
//! | `LLM_API_KEY` | API key for OpenAI/Anthropic (`OPENAI_API_KEY` is a fallback) |
//! | `LLM_PROVIDER` | Provider name |
//! | `LLM_MODEL` | Model identifier |
//! | `OLLAMA_URL` | Ollama base URL |
//! | `REDSHIFT_HOST` | Warehouse host |
//! | `REDSHIFT_PORT` | Warehouse port |
//! | `REDSHIFT_DB` | Database name |
//! | `REDSHIFT_USER` | Database user |
//! | `REDSHIFT_PASSWORD` | Database password |

use std::{
    env, fs,
    path::{Path, PathBuf}
};

use serde::Deserialize;

use crate::{
    error::{AppResult, config_error},
    prompt::DEFAULT_TIMESTAMP_COLUMN,
    warehouse::DEFAULT_SCHEMA
};

/// Default Redshift port.
pub const DEFAULT_REDSHIFT_PORT: u16 = 5439;

/// Application configuration
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub llm:       LlmConfig,
    #[serde(default)]
    pub retry:     RetryConfig,
    #[serde(default)]
    pub warehouse: WarehouseConfig,
    #[serde(default)]
    pub prompt:    PromptConfig,
    #[serde(default)]
    pub logging:   LoggingConfig
}

/// LLM provider configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub provider:      Option<String>,
    pub api_key:       Option<String>,
    pub model:         Option<String>,
    pub ollama_url:    String,
    pub openai_url:    String,
    pub anthropic_url: String,
    pub timeout_secs:  u64
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider:      None,
            api_key:       None,
            model:         None,
            ollama_url:    String::from("http://localhost:11434"),
            openai_url:    String::from("https://api.openai.com/v1"),
            anthropic_url: String::from("https://api.anthropic.com/v1"),
            timeout_secs:  120
        }
    }
}

/// Retry configuration for blocking LLM requests
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_retries:      u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms:     u64,
    pub backoff_factor:   f64
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries:      3,
            initial_delay_ms: 1000,
            max_delay_ms:     30000,
            backoff_factor:   2.0
        }
    }
}

/// Warehouse connection settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WarehouseConfig {
    pub host:     Option<String>,
    pub port:     u16,
    pub database: Option<String>,
    pub user:     Option<String>,
    pub password: Option<String>,
    /// Schema for unqualified table names
    pub schema:   String
}

impl Default for WarehouseConfig {
    fn default() -> Self {
        Self {
            host:     None,
            port:     DEFAULT_REDSHIFT_PORT,
            database: None,
            user:     None,
            password: None,
            schema:   String::from(DEFAULT_SCHEMA)
        }
    }
}

/// Prompt rendering settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PromptConfig {
    pub timestamp_column: String
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            timestamp_column: String::from(DEFAULT_TIMESTAMP_COLUMN)
        }
    }
}

/// Logging settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset
    pub level: String
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: String::from("warn")
        }
    }
}

impl Config {
    /// Load configuration from file and environment
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables
    /// 2. Config file in current directory (.sql-generator.toml)
    /// 3. Config file in home directory (~/.config/sql-generator/config.toml)
    /// 4. Default values
    pub fn load() -> AppResult<Self> {
        let mut config = Self::default();

        if let Some(home) = env::var_os("HOME") {
            let home_config = PathBuf::from(home)
                .join(".config")
                .join("sql-generator")
                .join("config.toml");
            if home_config.exists() {
                config = Self::from_file(&home_config)?;
            }
        }

        let local_config = PathBuf::from(".sql-generator.toml");
        if local_config.exists() {
            config = Self::from_file(&local_config)?;
        }

        config.apply_env(|key| env::var(key).ok())?;
        Ok(config)
    }

    /// Parse a TOML configuration file
    pub fn from_file(path: &Path) -> AppResult<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| config_error(format!("Failed to read config file: {}", e)))?;
        Self::from_toml(&content)
    }

    /// Parse TOML configuration text
    pub fn from_toml(content: &str) -> AppResult<Self> {
        toml::from_str(content).map_err(|e| config_error(format!("Invalid config file: {}", e)))
    }

    /// Override values from environment-style lookups
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> AppResult<()> {
        if let Some(api_key) = lookup("LLM_API_KEY").or_else(|| lookup("OPENAI_API_KEY")) {
            self.llm.api_key = Some(api_key);
        }
        if let Some(provider) = lookup("LLM_PROVIDER") {
            self.llm.provider = Some(provider);
        }
        if let Some(model) = lookup("LLM_MODEL") {
            self.llm.model = Some(model);
        }
        if let Some(url) = lookup("OLLAMA_URL") {
            self.llm.ollama_url = url;
        }
        if let Some(host) = lookup("REDSHIFT_HOST") {
            self.warehouse.host = Some(host);
        }
        if let Some(port) = lookup("REDSHIFT_PORT") {
            self.warehouse.port = port
                .parse()
                .map_err(|_| config_error(format!("Invalid REDSHIFT_PORT '{}'", port)))?;
        }
        if let Some(database) = lookup("REDSHIFT_DB") {
            self.warehouse.database = Some(database);
        }
        if let Some(user) = lookup("REDSHIFT_USER") {
            self.warehouse.user = Some(user);
        }
        if let Some(password) = lookup("REDSHIFT_PASSWORD") {
            self.warehouse.password = Some(password);
        }
        Ok(())
    }
}
