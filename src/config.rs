use std::path::Path;
use std::time::Duration;

use error_stack::{Report, ResultExt};
use serde::Deserialize;

use crate::error::ConfigError;
use crate::exchange::binance::BINANCE_BASE_URL;
use crate::model::NewAlert;
use crate::notifier::telegram::TELEGRAM_API_BASE;

pub const BOT_TOKEN_ENV: &str = "TELEGRAM_BOT_TOKEN";
pub const CHAT_ID_ENV: &str = "TELEGRAM_CHAT_ID";

fn default_log_level() -> String {
    "info".into()
}

fn default_log_format() -> String {
    "text".into()
}

fn default_poll_interval_secs() -> u64 {
    10
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_binance_base_url() -> String {
    BINANCE_BASE_URL.into()
}

fn default_telegram_api_base() -> String {
    TELEGRAM_API_BASE.into()
}

#[derive(Debug, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub exchange: ExchangeConfig,
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub alerts: Vec<NewAlert>,
}

#[derive(Debug, Deserialize)]
pub struct GeneralConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Accepted values: `"text"` | `"json"`
    #[serde(default = "default_log_format")]
    pub log_format: String,
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
            poll_interval_secs: default_poll_interval_secs(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl GeneralConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Debug, Deserialize)]
pub struct ExchangeConfig {
    #[serde(default = "default_binance_base_url")]
    pub base_url: String,
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            base_url: default_binance_base_url(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct TelegramConfig {
    #[serde(default)]
    pub bot_token: Option<String>,
    #[serde(default)]
    pub chat_id: Option<String>,
    #[serde(default = "default_telegram_api_base")]
    pub api_base: String,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: None,
            chat_id: None,
            api_base: default_telegram_api_base(),
        }
    }
}

/// Telegram credentials after merging the config file with the environment.
#[derive(Debug, Clone)]
pub struct TelegramSecrets {
    pub bot_token: String,
    pub chat_id: String,
}

/// Load and validate an `AppConfig` from a TOML file at `path`.
///
/// A missing file yields the defaults; secrets may still come from the
/// environment.
pub fn load(path: &Path) -> Result<AppConfig, Report<ConfigError>> {
    let config = if path.exists() {
        let content = std::fs::read_to_string(path)
            .change_context(ConfigError::ReadFile)
            .attach_with(|| format!("path: {}", path.display()))?;
        parse(&content)?
    } else {
        AppConfig::default()
    };

    validate(&config)?;

    Ok(config)
}

fn parse(content: &str) -> Result<AppConfig, Report<ConfigError>> {
    toml::from_str(content).change_context(ConfigError::Parse {
        reason: "invalid TOML syntax or schema mismatch".into(),
    })
}

impl AppConfig {
    /// Resolve the Telegram secrets, with environment variables taking
    /// precedence over the file. Either one missing is fatal.
    pub fn telegram_secrets(&self) -> Result<TelegramSecrets, Report<ConfigError>> {
        self.telegram_secrets_with(|key| std::env::var(key).ok())
    }

    fn telegram_secrets_with(
        &self,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<TelegramSecrets, Report<ConfigError>> {
        let resolve = |env_key: &str, file_value: &Option<String>| {
            env(env_key)
                .or_else(|| file_value.clone())
                .map(|v| v.trim().to_owned())
                .filter(|v| !v.is_empty())
                .ok_or_else(|| {
                    Report::new(ConfigError::MissingSecret {
                        name: env_key.to_owned(),
                    })
                    .attach(format!(
                        "set {env_key} or the matching key in the [telegram] section"
                    ))
                })
        };

        Ok(TelegramSecrets {
            bot_token: resolve(BOT_TOKEN_ENV, &self.telegram.bot_token)?,
            chat_id: resolve(CHAT_ID_ENV, &self.telegram.chat_id)?,
        })
    }
}

const VALID_LOG_FORMATS: &[&str] = &["text", "json"];

fn validate(config: &AppConfig) -> Result<(), Report<ConfigError>> {
    validate_general(config)?;
    validate_alerts(config)?;
    Ok(())
}

fn validate_general(config: &AppConfig) -> Result<(), Report<ConfigError>> {
    let general = &config.general;
    if !VALID_LOG_FORMATS.contains(&general.log_format.as_str()) {
        return Err(Report::new(ConfigError::Validation {
            field: format!("general.log_format \"{}\" is not valid", general.log_format),
        }));
    }
    if general.poll_interval_secs == 0 {
        return Err(Report::new(ConfigError::Validation {
            field: "general.poll_interval_secs must be greater than zero".into(),
        }));
    }
    if general.request_timeout_secs == 0 {
        return Err(Report::new(ConfigError::Validation {
            field: "general.request_timeout_secs must be greater than zero".into(),
        }));
    }
    Ok(())
}

fn validate_alerts(config: &AppConfig) -> Result<(), Report<ConfigError>> {
    for (i, alert) in config.alerts.iter().enumerate() {
        alert
            .validate()
            .change_context_lazy(|| ConfigError::Validation {
                field: format!("alerts[{i}] (symbol \"{}\")", alert.symbol),
            })?;
    }
    Ok(())
}
