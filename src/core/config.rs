//! Configuration management for Tandem
//!
//! Supports environment variables, config files, and runtime overrides.
//!
//! Config file location: ~/.config/tandem/config.toml

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::PathBuf;

use crate::core::error::{Result, TandemError};

/// Main configuration for Tandem
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Remote assistants service configuration
    pub service: ServiceConfig,
    /// Agent configuration
    pub agent: AgentConfig,
    /// Persistence configuration
    #[serde(default)]
    pub store: StoreConfig,
}

/// Assistants service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// API base URL (default: https://api.openai.com/v1)
    pub base_url: String,
    /// Model new agents are created with
    pub model: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

/// Agent behavior configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Name of the agent this process drives
    /// Default: alice
    pub name: String,
    /// Path to a file holding the agent's instructions
    pub instructions_path: Option<PathBuf>,
    /// Delay between successive run status polls, in milliseconds
    /// Default: 500
    pub poll_interval_ms: u64,
    /// Capacity of the bounded event channel between loop and sink
    /// Default: 32
    pub event_buffer: usize,
}

/// Key-value store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Override for the store file path
    /// Default: <data dir>/tandem/store.json
    pub path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service: ServiceConfig::default(),
            agent: AgentConfig::default(),
            store: StoreConfig::default(),
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: env::var("TANDEM_BASE_URL")
                .unwrap_or_else(|_| "https://api.openai.com/v1".to_string()),
            model: env::var("TANDEM_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string()),
            timeout_secs: 120,
        }
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: env::var("TANDEM_AGENT_NAME").unwrap_or_else(|_| "alice".to_string()),
            instructions_path: None,
            poll_interval_ms: 500,
            event_buffer: 32,
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self { path: None }
    }
}

impl Config {
    /// Get the config directory path
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("tandem")
    }

    /// Get the config file path
    pub fn config_file() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Load configuration from file, environment, and defaults
    /// Priority: CLI args > env vars > config file > defaults
    pub fn load() -> Self {
        // Try to load .env file if it exists
        let _ = dotenvy::dotenv();

        // Try to load from config file
        if let Ok(config) = Self::load_from_file() {
            return config;
        }

        // Fall back to defaults (which respect env vars)
        Self::default()
    }

    /// Load configuration from file only
    pub fn load_from_file() -> Result<Self> {
        let config_path = Self::config_file();

        if !config_path.exists() {
            return Err(TandemError::config("Config file not found"));
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|e| TandemError::config(format!("Failed to read config: {}", e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| TandemError::config(format!("Failed to parse config: {}", e)))?;

        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        let config_dir = Self::config_dir();
        let config_path = Self::config_file();

        if !config_dir.exists() {
            fs::create_dir_all(&config_dir)
                .map_err(|e| TandemError::config(format!("Failed to create config dir: {}", e)))?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| TandemError::config(format!("Failed to serialize config: {}", e)))?;

        fs::write(&config_path, content)
            .map_err(|e| TandemError::config(format!("Failed to write config: {}", e)))?;

        Ok(())
    }

    /// Resolve the store file path, honoring the config override
    pub fn store_path(&self) -> PathBuf {
        self.store.path.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("tandem")
                .join("store.json")
        })
    }

    /// Read the agent instructions, falling back to a minimal default
    pub fn instructions(&self) -> Result<String> {
        match &self.agent.instructions_path {
            Some(path) => fs::read_to_string(path)
                .map_err(|e| TandemError::config(format!("Failed to read instructions: {}", e))),
            None => Ok(format!(
                "You are {}, a helpful assistant.",
                self.agent.name
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.service.model, "gpt-4o-mini");
        assert_eq!(config.agent.poll_interval_ms, 500);
        assert_eq!(config.agent.event_buffer, 32);
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("base_url"));
        assert!(toml_str.contains("poll_interval_ms"));
    }

    #[test]
    fn test_config_dir() {
        let dir = Config::config_dir();
        assert!(dir.to_string_lossy().contains("tandem"));
    }

    #[test]
    fn test_default_instructions_mention_name() {
        let config = Config::default();
        let instructions = config.instructions().unwrap();
        assert!(instructions.contains(&config.agent.name));
    }
}
