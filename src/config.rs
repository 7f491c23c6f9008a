//! Configuration management

use anyhow::{Context, Result};
use std::path::PathBuf;

/// Bot configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Telegram bot token
    pub bot_token: String,

    /// User IDs allowed to talk to the bot (empty list denies everyone)
    pub allowed_users: Vec<i64>,

    /// Base URL of the Sophon monitoring API
    pub monitor_base_url: String,

    /// Path of the persisted operator state file
    pub operator_state_path: PathBuf,

    /// Name of the local node container to inspect
    pub container_name: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let bot_token = std::env::var("TELEGRAM_BOT_TOKEN")
            .context("TELEGRAM_BOT_TOKEN must be set")?;

        let allowed_users: Vec<i64> = std::env::var("TELEGRAM_ALLOWED_USERS")
            .unwrap_or_default()
            .split(',')
            .filter_map(|s| s.trim().parse().ok())
            .collect();

        let monitor_base_url = std::env::var("MONITOR_BASE_URL")
            .unwrap_or_else(|_| "https://monitor.sophon.xyz".to_string());

        let operator_state_path = std::env::var("OPERATOR_STATE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("operator.json"));

        let container_name = std::env::var("CONTAINER_NAME")
            .unwrap_or_else(|_| "sophon-light-node".to_string());

        Ok(Self {
            bot_token,
            allowed_users,
            monitor_base_url,
            operator_state_path,
            container_name,
        })
    }
}
