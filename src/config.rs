use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};

pub const DEFAULT_API_URL: &str = "https://api.hnb.hr/tecajn-eur/v3";

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub api_url: String,
    pub bind_address: String,
    pub port: u16,
    pub default_currency: String,
    pub lookback_days: u32,
    /// `None` when requests should never time out.
    pub request_timeout: Option<Duration>,
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let timeout_secs: u64 = parse_or(&lookup, "REQUEST_TIMEOUT_SECS", 10)?;
        let default_currency = lookup("DEFAULT_CURRENCY")
            .unwrap_or_else(|| "USD".to_string())
            .to_uppercase();
        let lookback_days = parse_or(&lookup, "LOOKBACK_DAYS", 4)?;
        if !(1..=crate::view::MAX_LOOKBACK_DAYS).contains(&lookback_days) {
            anyhow::bail!("LOOKBACK_DAYS must be between 1 and {}", crate::view::MAX_LOOKBACK_DAYS);
        }

        Ok(Settings {
            api_url: lookup("HNB_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            bind_address: lookup("BIND_ADDRESS").unwrap_or_else(|| "127.0.0.1".to_string()),
            port: parse_or(&lookup, "PORT", 8080)?,
            default_currency,
            lookback_days,
            request_timeout: (timeout_secs > 0).then(|| Duration::from_secs(timeout_secs)),
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(value) => value
            .trim()
            .parse()
            .with_context(|| format!("Can't parse {key}={value:?}")),
        None => Ok(default),
    }
}
