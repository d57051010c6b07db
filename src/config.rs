//! Configuration management for the UFO Sighting Bot
//!
//! Loads settings from environment variables (.env file)

use std::env;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Discord bot token
    pub discord_token: String,
    /// Gemini API key; `/alien` is disabled when absent
    pub gemini_api_key: Option<String>,
    /// Optional guild ID for development (faster command sync)
    pub guild_id: Option<u64>,
    /// Bootstrap admin user ID
    pub owner_id: Option<u64>,
    /// Directory holding the persisted JSON documents
    pub data_dir: PathBuf,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let discord_token = env::var("DISCORD_TOKEN")
            .map_err(|_| ConfigError::MissingEnvVar("DISCORD_TOKEN".to_string()))?;

        let gemini_api_key = env::var("GEMINI_API_KEY").ok().filter(|s| !s.is_empty());

        let guild_id = parse_optional_id("GUILD_ID")?;
        let owner_id = parse_optional_id("OWNER_ID")?;

        let data_dir = env::var("DATA_DIR")
            .unwrap_or_else(|_| "data".to_string())
            .into();

        Ok(Self {
            discord_token,
            gemini_api_key,
            guild_id,
            owner_id,
            data_dir,
        })
    }
}

fn parse_optional_id(name: &str) -> Result<Option<u64>, ConfigError> {
    env::var(name)
        .ok()
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<u64>()
                .map_err(|_| ConfigError::InvalidValue(name.to_string(), s))
        })
        .transpose()
}
