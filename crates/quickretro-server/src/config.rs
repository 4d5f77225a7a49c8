use std::time::Duration;

use axum::http::HeaderValue;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{var}: invalid value {value:?}: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: &'static str,
    },
}

fn invalid(var: &'static str, value: &str, reason: &'static str) -> ConfigError {
    ConfigError::Invalid {
        var,
        value: value.to_string(),
        reason,
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// `None` runs on the in-memory store and bridge.
    pub redis_url: Option<String>,
    pub board_ttl: Duration,
    pub max_message_size: usize,
    pub typing_enabled: bool,
    /// Empty means any origin.
    pub allowed_origins: Vec<HeaderValue>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_string());

        let host = var("QUICKRETRO_HOST", "0.0.0.0");

        let port_raw = var("QUICKRETRO_PORT", "8080");
        let port = port_raw
            .parse()
            .map_err(|_| invalid("QUICKRETRO_PORT", &port_raw, "expected a port number"))?;

        let redis_url = get("QUICKRETRO_REDIS_URL").filter(|url| !url.is_empty());
        if let Some(url) = &redis_url {
            if !url.starts_with("redis://") && !url.starts_with("rediss://") {
                return Err(invalid("QUICKRETRO_REDIS_URL", url, "expected a redis:// or rediss:// URL"));
            }
        }

        let ttl_raw = var("QUICKRETRO_AUTO_DELETE", "2d");
        let board_ttl = parse_duration(&ttl_raw)
            .ok_or_else(|| invalid("QUICKRETRO_AUTO_DELETE", &ttl_raw, "expected a number followed by s, m, h or d"))?;

        let size_raw = var("QUICKRETRO_MAX_MESSAGE_SIZE", "1024");
        let max_message_size = size_raw
            .parse()
            .ok()
            .filter(|n: &usize| *n > 0)
            .ok_or_else(|| invalid("QUICKRETRO_MAX_MESSAGE_SIZE", &size_raw, "expected a positive byte count"))?;

        let typing_raw = var("QUICKRETRO_TYPING_ENABLED", "true");
        let typing_enabled = typing_raw
            .parse()
            .map_err(|_| invalid("QUICKRETRO_TYPING_ENABLED", &typing_raw, "expected true or false"))?;

        let mut allowed_origins = Vec::new();
        if let Some(list) = get("QUICKRETRO_ALLOWED_ORIGINS") {
            for origin in list.split(',').map(str::trim).filter(|o| !o.is_empty()) {
                let value = HeaderValue::from_str(origin)
                    .map_err(|_| invalid("QUICKRETRO_ALLOWED_ORIGINS", origin, "not a valid origin"))?;
                allowed_origins.push(value);
            }
        }

        Ok(Self {
            host,
            port,
            redis_url,
            board_ttl,
            max_message_size,
            typing_enabled,
            allowed_origins,
        })
    }
}

/// Parse `<integer><unit>` where unit is one of `s`, `m`, `h`, `d`.
pub fn parse_duration(raw: &str) -> Option<Duration> {
    let raw = raw.trim();
    let unit = raw.chars().last()?;
    let amount: u64 = raw[..raw.len() - unit.len_utf8()].parse().ok()?;
    let secs = match unit {
        's' => amount,
        'm' => amount.checked_mul(60)?,
        'h' => amount.checked_mul(3600)?,
        'd' => amount.checked_mul(86_400)?,
        _ => return None,
    };
    (secs > 0).then(|| Duration::from_secs(secs))
}
