use super::ConfigError;
use super::validator::{ensure_non_empty, validate_webhook_url};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub discord: DiscordConfig,
    #[serde(default)]
    pub bridge: BridgeConfig,
    #[serde(default)]
    pub web: WebConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct DiscordConfig {
    #[serde(default)]
    pub bot_token: String,
    #[serde(default)]
    pub use_privileged_intents: bool,
    #[serde(default)]
    pub announce_channel_id: Option<u64>,
    #[serde(default)]
    pub webhook_url: Option<String>,
    #[serde(default)]
    pub notify_via: NotifyVia,
}

/// Where event announcements are sent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotifyVia {
    #[default]
    Bot,
    Webhook,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BridgeConfig {
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    #[serde(default = "default_store_timeout_ms")]
    pub store_timeout_ms: u64,
    #[serde(default = "default_upsert_attempts")]
    pub upsert_attempts: u32,
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            queue_capacity: default_queue_capacity(),
            store_timeout_ms: default_store_timeout_ms(),
            upsert_attempts: default_upsert_attempts(),
            retry_backoff_ms: default_retry_backoff_ms(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WebConfig {
    #[serde(default = "default_web_enabled")]
    pub enabled: bool,
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            enabled: default_web_enabled(),
            bind_address: default_bind_address(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(alias = "console", default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Compact,
    Json,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub max_connections: Option<u32>,
    #[serde(default)]
    pub min_connections: Option<u32>,
}

impl DatabaseConfig {
    pub fn db_type(&self) -> DbType {
        let url = self.connection_string();
        if url.starts_with("memory://") {
            DbType::Memory
        } else if url.starts_with("sqlite://") {
            DbType::Sqlite
        } else {
            DbType::Postgres
        }
    }

    pub fn connection_string(&self) -> String {
        if let Some(ref url) = self.url {
            url.clone()
        } else if let Some(ref file) = self.filename {
            format!("sqlite://{}", file)
        } else {
            String::new()
        }
    }

    pub fn sqlite_path(&self) -> Option<String> {
        if let DbType::Sqlite = self.db_type() {
            let url = self.connection_string();
            Some(url.strip_prefix("sqlite://").unwrap_or(&url).to_string())
        } else {
            None
        }
    }

    pub fn max_connections(&self) -> Option<u32> {
        match self.db_type() {
            DbType::Postgres => self.max_connections,
            DbType::Sqlite | DbType::Memory => Some(1),
        }
    }

    pub fn min_connections(&self) -> Option<u32> {
        match self.db_type() {
            DbType::Postgres => self.min_connections,
            DbType::Sqlite | DbType::Memory => Some(1),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbType {
    Postgres,
    Sqlite,
    Memory,
}

impl Config {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config = Self::from_yaml(&content)?;
        config.apply_env_overrides();
        Ok(config)
    }

    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// `require_discord` is false when the gateway is disabled from the
    /// command line, in which case the bot token may be left empty.
    pub fn validate(&self, require_discord: bool) -> Result<(), ConfigError> {
        if require_discord {
            ensure_non_empty("discord.bot_token", &self.discord.bot_token)?;
        }

        ensure_non_empty(
            "database connection string",
            &self.database.connection_string(),
        )?;

        if self.web.port == 0 {
            return Err(ConfigError::InvalidConfig(
                "web.port must be between 1 and 65535".to_string(),
            ));
        }

        if self.bridge.queue_capacity == 0 {
            return Err(ConfigError::InvalidConfig(
                "bridge.queue_capacity must be greater than zero".to_string(),
            ));
        }

        if self.bridge.upsert_attempts == 0 {
            return Err(ConfigError::InvalidConfig(
                "bridge.upsert_attempts must be at least 1".to_string(),
            ));
        }

        if self.discord.notify_via == NotifyVia::Webhook {
            let url = self.discord.webhook_url.as_deref().ok_or_else(|| {
                ConfigError::InvalidConfig(
                    "discord.webhook_url is required when notify_via is webhook".to_string(),
                )
            })?;
            validate_webhook_url(url)?;

            // webhook-authored messages only expose their content with the
            // privileged MESSAGE_CONTENT intent
            if require_discord && !self.discord.use_privileged_intents {
                return Err(ConfigError::InvalidConfig(
                    "discord.use_privileged_intents must be true when notify_via is webhook"
                        .to_string(),
                ));
            }
        }

        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(value) = std::env::var("FC_DISCORD_BOT_TOKEN") {
            self.discord.bot_token = value;
        }
        if let Ok(value) = std::env::var("FC_DISCORD_WEBHOOK_URL") {
            self.discord.webhook_url = Some(value);
        }
        if let Ok(value) = std::env::var("DATABASE_URL") {
            self.database.url = Some(value);
        }
    }
}

fn default_queue_capacity() -> usize {
    256
}

fn default_store_timeout_ms() -> u64 {
    5000
}

fn default_upsert_attempts() -> u32 {
    3
}

fn default_retry_backoff_ms() -> u64 {
    250
}

fn default_web_enabled() -> bool {
    true
}

fn default_port() -> u16 {
    8080
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}
