use std::time::Duration;

pub const DEFAULT_API_BASE_URL: &str = "http://127.0.0.1:8000";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 90;
const DEFAULT_HEALTH_INTERVAL_SECS: u64 = 15;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub api_base_url: String,
    pub request_timeout: Duration,
    pub health_interval: Duration,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{name} must be a positive number of seconds, got {value:?}")]
    InvalidSeconds { name: &'static str, value: String },
    #[error("QUIZ_API_BASE_URL must start with http:// or https://, got {0:?}")]
    InvalidBaseUrl(String),
}

impl Config {
    /// Reads the settings from the environment (after `.env` was loaded).
    /// The bot token is read by teloxide itself from `TELOXIDE_TOKEN`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let api_base_url = lookup("QUIZ_API_BASE_URL")
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty())
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());
        if !(api_base_url.starts_with("http://") || api_base_url.starts_with("https://")) {
            return Err(ConfigError::InvalidBaseUrl(api_base_url));
        }

        let seconds = |name: &'static str, default: u64| -> Result<Duration, ConfigError> {
            match lookup(name) {
                None => Ok(Duration::from_secs(default)),
                Some(value) => match value.trim().parse::<u64>() {
                    Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
                    _ => Err(ConfigError::InvalidSeconds { name, value }),
                },
            }
        };

        Ok(Self {
            api_base_url,
            request_timeout: seconds("QUIZ_REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS)?,
            health_interval: seconds("QUIZ_HEALTH_INTERVAL_SECS", DEFAULT_HEALTH_INTERVAL_SECS)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = config(&[]).unwrap();
        assert_eq!(config.api_base_url, DEFAULT_API_BASE_URL);
        assert_eq!(config.request_timeout, Duration::from_secs(90));
        assert_eq!(config.health_interval, Duration::from_secs(15));
    }

    #[test]
    fn overrides_are_read() {
        let config = config(&[
            ("QUIZ_API_BASE_URL", "https://quiz.example.com/"),
            ("QUIZ_REQUEST_TIMEOUT_SECS", "30"),
            ("QUIZ_HEALTH_INTERVAL_SECS", "5"),
        ])
        .unwrap();
        assert_eq!(config.api_base_url, "https://quiz.example.com/");
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(config.health_interval, Duration::from_secs(5));
    }

    #[test]
    fn bad_values_are_rejected() {
        assert!(matches!(
            config(&[("QUIZ_API_BASE_URL", "localhost:8000")]),
            Err(ConfigError::InvalidBaseUrl(_))
        ));
        assert!(matches!(
            config(&[("QUIZ_HEALTH_INTERVAL_SECS", "0")]),
            Err(ConfigError::InvalidSeconds { .. })
        ));
        assert!(matches!(
            config(&[("QUIZ_REQUEST_TIMEOUT_SECS", "soon")]),
            Err(ConfigError::InvalidSeconds { .. })
        ));
    }
}
