use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Context};
use chrono::NaiveTime;

use crate::stats::AveragePolicy;

pub const DEFAULT_DATABASE_URL: &str = "sqlite://withlilybot.db";
pub const DEFAULT_DATA_DIR: &str = "data";
pub const DEFAULT_REMINDER_TIME: &str = "08:00";
pub const DEFAULT_TICK_SECS: u64 = 60;
pub const DEFAULT_LANGUAGE: &str = "ru";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Sqlite,
    Json,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bot_token: String,
    pub storage_backend: StorageBackend,
    pub database_url: String,
    pub data_dir: PathBuf,
    pub reminder_time: NaiveTime,
    pub reminder_tick: Duration,
    pub average_policy: AveragePolicy,
    pub default_language: String,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from any key lookup (the environment in production)
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let bot_token = get("BOT_TOKEN")
            .or_else(|| get("TELEGRAM_BOT_TOKEN"))
            .ok_or_else(|| anyhow!("BOT_TOKEN must be set"))?;

        let storage_backend = match get("STORAGE_BACKEND").as_deref().map(str::trim) {
            None | Some("sqlite") => StorageBackend::Sqlite,
            Some("json") => StorageBackend::Json,
            Some(other) => return Err(anyhow!("unknown STORAGE_BACKEND '{other}', expected sqlite or json")),
        };

        let reminder_time = get("REMINDER_TIME").unwrap_or_else(|| DEFAULT_REMINDER_TIME.into());
        let reminder_time = NaiveTime::parse_from_str(reminder_time.trim(), "%H:%M")
            .with_context(|| format!("REMINDER_TIME '{reminder_time}' is not HH:MM"))?;

        let reminder_tick = match get("REMINDER_TICK_SECS") {
            Some(v) => v
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .ok_or_else(|| anyhow!("REMINDER_TICK_SECS '{v}' is not a positive integer"))?,
            None => DEFAULT_TICK_SECS,
        };

        let average_policy = match get("STATS_AVERAGE") {
            Some(v) => v.parse::<AveragePolicy>().map_err(|e| anyhow!(e))?,
            None => AveragePolicy::default(),
        };

        Ok(Self {
            bot_token,
            storage_backend,
            database_url: get("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.into()),
            data_dir: get("DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR)),
            reminder_time,
            reminder_tick: Duration::from_secs(reminder_tick),
            average_policy,
            default_language: get("DEFAULT_LANGUAGE").unwrap_or_else(|| DEFAULT_LANGUAGE.into()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> anyhow::Result<AppConfig> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[("BOT_TOKEN", "123:abc")]).unwrap();
        assert_eq!(config.bot_token, "123:abc");
        assert_eq!(config.storage_backend, StorageBackend::Sqlite);
        assert_eq!(config.database_url, DEFAULT_DATABASE_URL);
        assert_eq!(config.reminder_time, NaiveTime::from_hms_opt(8, 0, 0).unwrap());
        assert_eq!(config.reminder_tick, Duration::from_secs(60));
        assert_eq!(config.average_policy, AveragePolicy::PerRow);
        assert_eq!(config.default_language, "ru");
    }

    #[test]
    fn test_token_is_required() {
        assert!(config_from(&[]).is_err());
        assert!(config_from(&[("BOT_TOKEN", "  ")]).is_err());
        assert!(config_from(&[("TELEGRAM_BOT_TOKEN", "t")]).is_ok());
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("BOT_TOKEN", "t"),
            ("STORAGE_BACKEND", "json"),
            ("DATA_DIR", "/var/lib/withlily"),
            ("REMINDER_TIME", "07:45"),
            ("REMINDER_TICK_SECS", "15"),
            ("STATS_AVERAGE", "days"),
        ])
        .unwrap();
        assert_eq!(config.storage_backend, StorageBackend::Json);
        assert_eq!(config.data_dir, PathBuf::from("/var/lib/withlily"));
        assert_eq!(config.reminder_time, NaiveTime::from_hms_opt(7, 45, 0).unwrap());
        assert_eq!(config.reminder_tick, Duration::from_secs(15));
        assert_eq!(config.average_policy, AveragePolicy::PerDay);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert!(config_from(&[("BOT_TOKEN", "t"), ("STORAGE_BACKEND", "redis")]).is_err());
        assert!(config_from(&[("BOT_TOKEN", "t"), ("REMINDER_TIME", "8am")]).is_err());
        assert!(config_from(&[("BOT_TOKEN", "t"), ("REMINDER_TICK_SECS", "0")]).is_err());
        assert!(config_from(&[("BOT_TOKEN", "t"), ("STATS_AVERAGE", "median")]).is_err());
    }
}
