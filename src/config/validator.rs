use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid config: {0}")]
    InvalidConfig(String),
}

pub(crate) fn ensure_non_empty(field: &str, value: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::InvalidConfig(format!("{field} cannot be empty")));
    }
    Ok(())
}

pub(crate) fn validate_webhook_url(raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw)
        .map_err(|e| ConfigError::InvalidConfig(format!("discord.webhook_url: {e}")))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(ConfigError::InvalidConfig(format!(
            "discord.webhook_url must use http or https, got {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whitespace_only_is_empty() {
        assert!(ensure_non_empty("discord.bot_token", "  ").is_err());
        assert!(ensure_non_empty("discord.bot_token", "abc").is_ok());
    }

    #[test]
    fn webhook_url_requires_http_scheme() {
        assert!(validate_webhook_url("https://discord.com/api/webhooks/1/x").is_ok());
        assert!(validate_webhook_url("ftp://discord.com/").is_err());
        assert!(validate_webhook_url("not a url").is_err());
    }
}
