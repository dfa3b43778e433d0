use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::Error;
use crate::memory::session::DEFAULT_MAX_SESSIONS;

const RELAY_DIR: &str = ".relay";

/// Streams REPL and one-shot output when set; `--stream` forces it per run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct StreamConfig {
    pub enabled: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct MemoryConfig {
    /// Pairs kept per conversation. `None` keeps everything.
    pub max_turns: Option<usize>,
    /// Idle history is dropped on first access after this many seconds.
    pub ttl_seconds: Option<u64>,
    /// Live sessions before the least recently used one is evicted.
    pub max_sessions: Option<usize>,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            max_turns: None,
            ttl_seconds: None,
            max_sessions: Some(DEFAULT_MAX_SESSIONS),
        }
    }
}

impl MemoryConfig {
    pub fn ttl(&self) -> Option<Duration> {
        self.ttl_seconds.map(Duration::from_secs)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum CacheBackendKind {
    #[default]
    File,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    pub backend: CacheBackendKind,
    pub dir: PathBuf,
    pub ttl_seconds: Option<u64>,
    pub max_entries: Option<usize>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            backend: CacheBackendKind::File,
            dir: get_relay_dir().join("cache"),
            ttl_seconds: Some(24 * 60 * 60),
            max_entries: None,
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Option<Duration> {
        self.ttl_seconds.map(Duration::from_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub vendor: String,
    pub api_key: String,
    pub base_url: Option<String>,
    pub model: String,
    pub embedding_vendor: String,
    pub embedding_model: String,
    pub system_prompt: Option<String>,
    pub memory: MemoryConfig,
    pub cache: CacheConfig,
    pub stream: StreamConfig,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            vendor: "openai".to_string(),
            api_key: String::new(),
            base_url: None,
            model: "gpt-4o".to_string(),
            embedding_vendor: "openai".to_string(),
            embedding_model: "text-embedding-3-small".to_string(),
            system_prompt: None,
            memory: MemoryConfig {
                max_turns: Some(20),
                ttl_seconds: None,
                ..MemoryConfig::default()
            },
            cache: CacheConfig::default(),
            stream: StreamConfig::default(),
        }
    }
}

impl Config {
    pub fn load_or_init() -> Result<Self> {
        if config_exists() {
            load_config()
        } else {
            Ok(Config::default())
        }
    }

    /// Checks the fields every resolution needs, before any provider is built.
    pub fn validate(&self) -> crate::Result<()> {
        let required = [
            ("vendor", &self.vendor),
            ("model", &self.model),
            ("embedding_vendor", &self.embedding_vendor),
            ("embedding_model", &self.embedding_model),
        ];

        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(Error::config(format!("'{}' must not be empty", field)));
            }
        }

        if self.memory.max_sessions == Some(0) {
            return Err(Error::config("'memory.max_sessions' must be at least 1"));
        }

        Ok(())
    }
}

pub fn get_relay_dir() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home).join(RELAY_DIR)
}

pub fn get_config_path() -> PathBuf {
    get_relay_dir().join("config.toml")
}

pub fn ensure_relay_dir() -> Result<PathBuf> {
    let relay_dir = get_relay_dir();

    if !relay_dir.exists() {
        std::fs::create_dir_all(&relay_dir).with_context(|| {
            format!("Failed to create relay directory at {}", relay_dir.display())
        })?;
    }

    Ok(relay_dir)
}

pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).context("Failed to parse config")?;
    config.validate()?;
    Ok(config)
}

pub fn load_config() -> Result<Config> {
    let config_path = get_config_path();

    let content = std::fs::read_to_string(&config_path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            anyhow::anyhow!("Config file not found. Run 'relay onboard' to set up your configuration.")
        } else {
            anyhow::anyhow!("Failed to read config from {}: {}", config_path.display(), e)
        }
    })?;

    parse_config(&content).with_context(|| format!("Invalid config at {}", config_path.display()))
}

pub fn save_config(config: &Config) -> Result<()> {
    ensure_relay_dir()?;

    let config_path = get_config_path();
    let content =
        toml::to_string_pretty(config).with_context(|| "Failed to serialize config to TOML")?;

    std::fs::write(&config_path, content)
        .with_context(|| format!("Failed to write config to {}", config_path.display()))?;

    Ok(())
}

pub fn config_exists() -> bool {
    get_config_path().exists()
}
