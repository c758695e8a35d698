use std::env;
use std::str::FromStr;

use thiserror::Error;

use crate::remote::DEFAULT_SAMPLE_ROWS;

pub const DEFAULT_MODEL: &str = "gpt-4-turbo";
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {var}: '{value}'")]
    Invalid { var: &'static str, value: String },
}

/// Settings for the chat-completion endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// `None` when no API key is set: free-form questions then fail with a
    /// readable message instead of a network error.
    pub openai: Option<OpenAiConfig>,
    pub sample_rows: usize,
}

impl Config {
    /// Read the process environment, loading `.env` first if present.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|var| env::var(var).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |var: &str| lookup(var).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let openai = match get("OPENAI_API_KEY") {
            Some(api_key) => Some(OpenAiConfig {
                api_key,
                model: get("OPENAI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
                base_url: get("OPENAI_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
                max_tokens: parsed(&get, "OPENAI_MAX_TOKENS", 1000)?,
                temperature: parsed(&get, "OPENAI_TEMPERATURE", 0.2)?,
                timeout_secs: parsed(&get, "OPENAI_TIMEOUT_SECS", 120)?,
            }),
            None => {
                log::warn!("OPENAI_API_KEY not set; free-form questions are disabled");
                None
            }
        };

        Ok(Self {
            openai,
            sample_rows: parsed(&get, "NFE_SAMPLE_ROWS", DEFAULT_SAMPLE_ROWS)?,
        })
    }
}

fn parsed<T: FromStr>(
    get: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match get(var) {
        None => Ok(default),
        Some(value) => value.parse().map_err(|_| ConfigError::Invalid { var, value }),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |var| map.get(var).cloned()
    }

    #[test]
    fn defaults_without_key() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.openai, None);
        assert_eq!(config.sample_rows, 1000);
    }

    #[test]
    fn key_enables_openai_with_defaults() {
        let config = Config::from_lookup(lookup(&[("OPENAI_API_KEY", "sk-1")])).unwrap();
        let openai = config.openai.unwrap();
        assert_eq!(openai.api_key, "sk-1");
        assert_eq!(openai.model, "gpt-4-turbo");
        assert_eq!(openai.base_url, "https://api.openai.com/v1");
        assert_eq!(openai.max_tokens, 1000);
        assert_eq!(openai.temperature, 0.2);
        assert_eq!(openai.timeout_secs, 120);
    }

    #[test]
    fn overrides_and_blank_key() {
        let config = Config::from_lookup(lookup(&[
            ("OPENAI_API_KEY", "  "),
            ("NFE_SAMPLE_ROWS", "250"),
        ]))
        .unwrap();
        assert_eq!(config.openai, None);
        assert_eq!(config.sample_rows, 250);

        let config = Config::from_lookup(lookup(&[
            ("OPENAI_API_KEY", "sk-1"),
            ("OPENAI_MODEL", "gpt-4o-mini"),
            ("OPENAI_TEMPERATURE", "0"),
        ]))
        .unwrap();
        let openai = config.openai.unwrap();
        assert_eq!(openai.model, "gpt-4o-mini");
        assert_eq!(openai.temperature, 0.0);
    }

    #[test]
    fn rejects_unparseable_numbers() {
        let err = Config::from_lookup(lookup(&[("NFE_SAMPLE_ROWS", "muitas")])).unwrap_err();
        assert_eq!(
            err,
            ConfigError::Invalid {
                var: "NFE_SAMPLE_ROWS",
                value: "muitas".into()
            }
        );
    }
}
