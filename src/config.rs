//! Runtime configuration
//!
//! Built once at process start from the environment (after `.env` is loaded)
//! and passed by reference into the model client and the capability providers.

use crate::error::RouterError;
use crate::Result;
use std::env;
use std::time::Duration;

const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";
const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash";
const DEFAULT_YAHOO_FINANCE_BASE_URL: &str = "https://query1.finance.yahoo.com";
const DEFAULT_POLYGON_BASE_URL: &str = "https://api.polygon.io";
const DEFAULT_SERPER_BASE_URL: &str = "https://google.serper.dev";
const DEFAULT_WEATHER_BASE_URL: &str = "http://api.weatherapi.com";

#[derive(Debug, Clone)]
pub struct ModelConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub yahoo_finance_base_url: String,
    pub polygon_base_url: String,
    pub polygon_api_key: Option<String>,
    pub serper_base_url: String,
    pub serper_api_key: Option<String>,
    pub weather_base_url: String,
    pub weather_api_key: Option<String>,
    /// Upper bound for a single tool call, enforced by the execution engine.
    pub tool_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub model: ModelConfig,
    pub providers: ProviderConfig,
    pub port: u16,
}

impl Config {
    /// Read configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self> {
        let model = ModelConfig {
            api_key: env::var("GEMINI_API_KEY").unwrap_or_default(),
            model: var_or("GEMINI_MODEL", DEFAULT_GEMINI_MODEL),
            base_url: trimmed_url(var_or("GEMINI_BASE_URL", DEFAULT_GEMINI_BASE_URL)),
            timeout: Duration::from_secs(parse_var("MODEL_TIMEOUT_SECS", 60)?),
        };

        let providers = ProviderConfig {
            yahoo_finance_base_url: trimmed_url(var_or(
                "YAHOO_FINANCE_BASE_URL",
                DEFAULT_YAHOO_FINANCE_BASE_URL,
            )),
            polygon_base_url: trimmed_url(var_or("POLYGON_BASE_URL", DEFAULT_POLYGON_BASE_URL)),
            polygon_api_key: optional_var("POLYGON_API_KEY"),
            serper_base_url: trimmed_url(var_or("SERPER_BASE_URL", DEFAULT_SERPER_BASE_URL)),
            serper_api_key: optional_var("SERPER_API_KEY"),
            weather_base_url: trimmed_url(var_or("WEATHER_BASE_URL", DEFAULT_WEATHER_BASE_URL)),
            weather_api_key: optional_var("WEATHER_API_KEY"),
            tool_timeout: Duration::from_secs(parse_var("TOOL_TIMEOUT_SECS", 30)?),
        };

        let port = match env::var("PORT").or_else(|_| env::var("API_PORT")) {
            Ok(raw) => raw
                .trim()
                .parse()
                .map_err(|_| RouterError::Config(format!("invalid port: {}", raw)))?,
            Err(_) => 8080,
        };

        Ok(Self {
            model,
            providers,
            port,
        })
    }

    /// Fail early when the model cannot be reached at all.
    pub fn validate(&self) -> Result<()> {
        if self.model.api_key.trim().is_empty() {
            return Err(RouterError::Config(
                "GEMINI_API_KEY not configured".to_string(),
            ));
        }
        if self.model.timeout.is_zero() || self.providers.tool_timeout.is_zero() {
            return Err(RouterError::Config(
                "timeouts must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

impl ProviderConfig {
    /// Provider endpoints pointing at one base URL, used by tests against a mock server.
    pub fn with_base_url(base_url: &str) -> Self {
        let base_url = trimmed_url(base_url.to_string());
        Self {
            yahoo_finance_base_url: base_url.clone(),
            polygon_base_url: base_url.clone(),
            polygon_api_key: Some("test-polygon-key".to_string()),
            serper_base_url: base_url.clone(),
            serper_api_key: Some("test-serper-key".to_string()),
            weather_base_url: base_url,
            weather_api_key: Some("test-weather-key".to_string()),
            tool_timeout: Duration::from_secs(5),
        }
    }
}

fn var_or(name: &str, default: &str) -> String {
    env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn optional_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parse_var(name: &str, default: u64) -> Result<u64> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| RouterError::Config(format!("{} must be a number of seconds", name))),
        Err(_) => Ok(default),
    }
}

fn trimmed_url(url: String) -> String {
    url.trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_config(api_key: &str) -> Config {
        Config {
            model: ModelConfig {
                api_key: api_key.to_string(),
                model: DEFAULT_GEMINI_MODEL.to_string(),
                base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
                timeout: Duration::from_secs(60),
            },
            providers: ProviderConfig::with_base_url("http://localhost:9999/"),
            port: 8080,
        }
    }

    #[test]
    fn test_validate_requires_api_key() {
        let err = sample_config("  ").validate().unwrap_err();
        assert!(matches!(err, RouterError::Config(_)));
        assert!(sample_config("key").validate().is_ok());
    }

    #[test]
    fn test_with_base_url_trims_trailing_slash() {
        let providers = ProviderConfig::with_base_url("http://localhost:9999/");
        assert_eq!(providers.weather_base_url, "http://localhost:9999");
        assert_eq!(providers.serper_base_url, "http://localhost:9999");
    }
}
