//! Process configuration.
//!
//! Everything is environment-driven with sensible defaults; `.env` files
//! are honored via dotenvy at startup.

use chrono_tz::Tz;

use crate::{Error, Result};

/// Default SQLite database URL.
const DEFAULT_DATABASE_URL: &str = "sqlite:playcue.db?mode=rwc";

/// Default directory for log files.
const DEFAULT_LOG_DIR: &str = "logs";

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// SQLite database URL.
    pub database_url: String,
    /// Default IANA zone applied to actions created without one.
    pub default_timezone: Tz,
    /// Directory for rotated log files.
    pub log_dir: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            default_timezone: chrono_tz::UTC,
            log_dir: DEFAULT_LOG_DIR.to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables, falling back to
    /// defaults.
    ///
    /// Supported env vars:
    /// - `DATABASE_URL` (e.g. "sqlite:playcue.db?mode=rwc")
    /// - `PLAYCUE_TIMEZONE` (IANA zone name, e.g. "Europe/Madrid")
    /// - `PLAYCUE_LOG_DIR` (e.g. "logs")
    pub fn from_env_or_default() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(database_url) = std::env::var("DATABASE_URL")
            && !database_url.trim().is_empty()
        {
            config.database_url = database_url;
        }

        if let Ok(zone) = std::env::var("PLAYCUE_TIMEZONE")
            && !zone.trim().is_empty()
        {
            config.default_timezone = zone
                .parse()
                .map_err(|_| Error::config(format!("Unknown timezone '{}'", zone)))?;
        }

        if let Ok(log_dir) = std::env::var("PLAYCUE_LOG_DIR")
            && !log_dir.trim().is_empty()
        {
            config.log_dir = log_dir;
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.database_url, "sqlite:playcue.db?mode=rwc");
        assert_eq!(config.default_timezone, chrono_tz::UTC);
        assert_eq!(config.log_dir, "logs");
    }
}
