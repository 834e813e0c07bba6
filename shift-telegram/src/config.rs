//! Telegram connection config: token and optional Bot API server.
//! Loaded from BOT_TOKEN and TELEGRAM_API_URL (or TELOXIDE_API_URL).

use anyhow::Result;
use std::env;

#[derive(Debug, Clone)]
pub struct TelegramConfig {
    pub bot_token: String,
    pub telegram_api_url: Option<String>,
}

impl TelegramConfig {
    /// Loads from the environment; `token` overrides BOT_TOKEN when given.
    pub fn load(token: Option<String>) -> Result<Self> {
        let bot_token = match token {
            Some(token) => token,
            None => env::var("BOT_TOKEN").map_err(|_| anyhow::anyhow!("BOT_TOKEN not set"))?,
        };
        let telegram_api_url = env::var("TELEGRAM_API_URL")
            .or_else(|_| env::var("TELOXIDE_API_URL"))
            .ok();
        Ok(Self {
            bot_token,
            telegram_api_url,
        })
    }

    pub fn with_token(bot_token: String) -> Self {
        Self {
            bot_token,
            telegram_api_url: None,
        }
    }

    /// Parsed API server URL, if one is configured.
    pub fn api_url(&self) -> Result<Option<reqwest::Url>> {
        match &self.telegram_api_url {
            Some(url_str) => reqwest::Url::parse(url_str).map(Some).map_err(|e| {
                anyhow::anyhow!(
                    "TELEGRAM_API_URL (or TELOXIDE_API_URL) is set but not a valid URL: {} ({})",
                    url_str,
                    e
                )
            }),
            None => Ok(None),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.bot_token.trim().is_empty() {
            anyhow::bail!("BOT_TOKEN is empty");
        }
        self.api_url()?;
        Ok(())
    }

    /// teloxide client for this config.
    pub fn build_bot(&self) -> Result<teloxide::Bot> {
        let bot = teloxide::Bot::new(self.bot_token.clone());
        Ok(match self.api_url()? {
            Some(url) => bot.set_api_url(url),
            None => bot,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_with_token() {
        let config = TelegramConfig::with_token("test_token".to_string());
        assert_eq!(config.bot_token, "test_token");
        assert!(config.telegram_api_url.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_api_url_rejected() {
        let mut config = TelegramConfig::with_token("t".to_string());
        config.telegram_api_url = Some("not a url".to_string());
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("not a valid URL"));
    }

    #[test]
    fn test_empty_token_rejected() {
        assert!(TelegramConfig::with_token("  ".to_string()).validate().is_err());
    }

    #[test]
    #[serial]
    fn test_load_from_env() {
        env::set_var("BOT_TOKEN", "env_token");
        env::remove_var("TELEGRAM_API_URL");
        env::set_var("TELOXIDE_API_URL", "http://localhost:8081");

        let config = TelegramConfig::load(None).unwrap();
        assert_eq!(config.bot_token, "env_token");
        assert_eq!(
            config.api_url().unwrap().unwrap().as_str(),
            "http://localhost:8081/"
        );

        let config = TelegramConfig::load(Some("cli_token".to_string())).unwrap();
        assert_eq!(config.bot_token, "cli_token");

        env::remove_var("TELOXIDE_API_URL");
        env::remove_var("BOT_TOKEN");
        assert!(TelegramConfig::load(None).is_err());
    }
}
