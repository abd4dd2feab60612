//! # Configuration
//!
//! Manages the loading and parsing of the application's configuration file (`config.yaml`).
//! Defines the structs for the Telegram service, the vote target, chat extras and price feed settings.

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::domain::paths;

/// Main application configuration structure.
/// Matches the layout of `data/config.yaml`.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub services: ServicesConfig,
    pub vote: VoteConfig,
    #[serde(default)]
    pub chats: ChatsConfig,
    #[serde(default)]
    pub rates: RatesConfig,
    #[serde(default)]
    pub system: SystemConfig,
}

/// Configuration for various connected services.
#[derive(Debug, Deserialize, Clone)]
pub struct ServicesConfig {
    pub telegram: TelegramConfig,
}

/// Specific configuration for the Telegram service.
#[derive(Debug, Deserialize, Clone)]
pub struct TelegramConfig {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default = "default_token_env")]
    pub token_env: String,
}

impl TelegramConfig {
    /// Token from the config file, or from the configured environment variable.
    pub fn resolve_token(&self) -> Result<String> {
        if let Some(token) = self.token.as_ref().filter(|t| !t.is_empty()) {
            return Ok(token.clone());
        }
        match std::env::var(&self.token_env) {
            Ok(token) if !token.is_empty() => Ok(token),
            _ => bail!(
                "No bot token: set services.telegram.token or the {} environment variable",
                self.token_env
            ),
        }
    }
}

fn default_token_env() -> String {
    "TELEGRAM_BOT_TOKEN".to_string()
}

/// The group the vote runs in and its timing.
#[derive(Debug, Deserialize, Clone)]
pub struct VoteConfig {
    pub chat_id: i64,
    /// Snapshot file; empty disables persistence.
    #[serde(default = "default_save_file")]
    pub save_file: String,
    #[serde(default = "default_duration_minutes")]
    pub duration_minutes: i64,
    #[serde(default = "default_create_timeout_minutes")]
    pub create_timeout_minutes: i64,
}

impl VoteConfig {
    pub fn duration(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.duration_minutes)
    }

    pub fn create_timeout(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.create_timeout_minutes)
    }
}

/// Upper bound for vote and wizard spans: one year.
const MAX_SPAN_MINUTES: i64 = 366 * 24 * 60;

fn default_save_file() -> String {
    paths::snapshot_path(paths::DATA_DIR)
}
fn default_duration_minutes() -> i64 {
    24 * 60
}
fn default_create_timeout_minutes() -> i64 {
    5
}

/// Extras for the chats the bot lives in.
#[derive(Debug, Default, Deserialize, Clone)]
pub struct ChatsConfig {
    /// Chat whose admins are advertised in the help text of the vote chat.
    #[serde(default)]
    pub flood_chat_id: Option<i64>,
    /// Welcome text per chat id, posted when members join.
    #[serde(default)]
    pub motd: HashMap<i64, String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RatesConfig {
    #[serde(default = "default_refresh_seconds")]
    pub refresh_seconds: u64,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
}

impl Default for RatesConfig {
    fn default() -> Self {
        Self {
            refresh_seconds: default_refresh_seconds(),
            request_timeout_seconds: default_request_timeout(),
        }
    }
}

fn default_refresh_seconds() -> u64 {
    60
}
fn default_request_timeout() -> u64 {
    10
}

/// System-level settings for the bot.
#[derive(Debug, Deserialize, Clone)]
pub struct SystemConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    #[serde(default = "default_tick_interval")]
    pub tick_interval_ms: u64,
    #[serde(default = "default_log_file")]
    pub log_file: String,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            tick_interval_ms: default_tick_interval(),
            log_file: default_log_file(),
        }
    }
}

fn default_data_dir() -> String {
    paths::DATA_DIR.to_string()
}
fn default_tick_interval() -> u64 {
    1000
}
fn default_log_file() -> String {
    paths::LOG_FILE.to_string()
}

impl AppConfig {
    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: AppConfig =
            serde_yaml::from_str(content).context("Failed to parse config.yaml")?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::from_yaml(&content)
    }

    fn validate(&self) -> Result<()> {
        if !(1..=MAX_SPAN_MINUTES).contains(&self.vote.duration_minutes) {
            bail!("vote.duration_minutes must be between 1 and {MAX_SPAN_MINUTES}");
        }
        if !(1..=MAX_SPAN_MINUTES).contains(&self.vote.create_timeout_minutes) {
            bail!("vote.create_timeout_minutes must be between 1 and {MAX_SPAN_MINUTES}");
        }
        if self.system.tick_interval_ms == 0 {
            bail!("system.tick_interval_ms must be positive");
        }
        Ok(())
    }

    /// Snapshot file path, or `None` when persistence is disabled.
    pub fn snapshot_path(&self) -> Option<PathBuf> {
        let file = self.vote.save_file.trim();
        (!file.is_empty()).then(|| PathBuf::from(file))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = "
services:
  telegram:
    token: \"123:abc\"
vote:
  chat_id: -1001046873330
";

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = AppConfig::from_yaml(MINIMAL).unwrap();
        assert_eq!(config.vote.chat_id, -1001046873330);
        assert_eq!(config.vote.duration(), chrono::Duration::hours(24));
        assert_eq!(config.vote.create_timeout(), chrono::Duration::minutes(5));
        assert_eq!(config.snapshot_path(), Some(PathBuf::from("data/vote.json")));
        assert_eq!(config.rates.refresh_seconds, 60);
        assert_eq!(config.system.tick_interval_ms, 1000);
        assert!(config.chats.motd.is_empty());
        assert_eq!(config.services.telegram.resolve_token().unwrap(), "123:abc");
    }

    #[test]
    fn test_full_config() {
        let yaml = "
services:
  telegram:
    token_env: MY_BOT_TOKEN
vote:
  chat_id: -100
  save_file: \"\"
  duration_minutes: 60
  create_timeout_minutes: 2
chats:
  flood_chat_id: -200
  motd:
    -100: \"Welcome to the main chat\"
    -200: \"Welcome to the flood\"
rates:
  refresh_seconds: 30
system:
  data_dir: /tmp/ballot
  tick_interval_ms: 250
";
        let config = AppConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.snapshot_path(), None);
        assert_eq!(config.vote.duration(), chrono::Duration::hours(1));
        assert_eq!(config.chats.flood_chat_id, Some(-200));
        assert_eq!(
            config.chats.motd.get(&-100).map(String::as_str),
            Some("Welcome to the main chat")
        );
        assert_eq!(config.rates.refresh_seconds, 30);
        assert_eq!(config.rates.request_timeout_seconds, 10);
        assert_eq!(config.system.data_dir, "/tmp/ballot");
        assert_eq!(config.services.telegram.token_env, "MY_BOT_TOKEN");
    }

    #[test]
    fn test_rejects_missing_chat_id() {
        let yaml = "
services:
  telegram:
    token: x
vote: {}
";
        assert!(AppConfig::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_rejects_non_positive_duration() {
        let yaml = format!("{MINIMAL}  duration_minutes: 0\n");
        assert!(AppConfig::from_yaml(&yaml).is_err());
    }

    #[test]
    fn test_rejects_spans_longer_than_a_year() {
        let yaml = format!("{MINIMAL}  duration_minutes: 200000000000\n");
        assert!(AppConfig::from_yaml(&yaml).is_err());
        let yaml = format!("{MINIMAL}  create_timeout_minutes: 600000\n");
        assert!(AppConfig::from_yaml(&yaml).is_err());
        let yaml = format!("{MINIMAL}  duration_minutes: 527040\n");
        assert!(AppConfig::from_yaml(&yaml).is_ok());
    }

    #[test]
    fn test_missing_token_is_an_error() {
        let config = TelegramConfig {
            token: None,
            token_env: "BALLOTBOT_TEST_TOKEN_THAT_IS_NEVER_SET".to_string(),
        };
        assert!(config.resolve_token().is_err());
    }
}
