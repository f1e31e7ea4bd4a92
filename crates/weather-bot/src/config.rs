//! Weather bot configuration: webhook settings plus the OpenWeatherMap key.
//!
//! Loaded from a JSON file (default `./weather_bot.json`); both tokens can be
//! supplied through the environment instead.

use anyhow::{Context, Result};
use lib::config::HookConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherBotConfig {
    /// Webhook and credential settings passed through to the framework.
    #[serde(default)]
    pub telegram: HookConfig,

    #[serde(default)]
    pub openweather: OpenWeatherConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenWeatherConfig {
    /// API key from api.openweathermap.org. Overridden by OPENWEATHER_API_KEY env when set.
    #[serde(default)]
    pub api_key: Option<String>,
}

/// Resolve the OpenWeatherMap key: env OPENWEATHER_API_KEY overrides config.
pub fn resolve_openweather_key(config: &WeatherBotConfig) -> Option<String> {
    std::env::var("OPENWEATHER_API_KEY")
        .ok()
        .and_then(|s| {
            let t = s.trim();
            if t.is_empty() {
                None
            } else {
                Some(t.to_string())
            }
        })
        .or_else(|| {
            config
                .openweather
                .api_key
                .as_ref()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        })
}

/// Resolve config path from env or default.
pub fn default_config_path() -> PathBuf {
    std::env::var("WEATHER_BOT_CONFIG_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("weather_bot.json"))
}

/// Load config from the default path (or WEATHER_BOT_CONFIG_PATH). Missing file => defaults.
pub fn load_config(path: Option<PathBuf>) -> Result<(WeatherBotConfig, PathBuf)> {
    let path = path.unwrap_or_else(default_config_path);
    let config = if !path.exists() {
        log::debug!("config file not found, using defaults: {}", path.display());
        WeatherBotConfig::default()
    } else {
        let s = std::fs::read_to_string(&path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        serde_json::from_str(&s)
            .with_context(|| format!("parsing config from {}", path.display()))?
    };
    Ok((config, path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_nested_sections() {
        let config: WeatherBotConfig = serde_json::from_str(
            r#"{"telegram":{"hostname":"127.0.0.1","port":8443,"token":"t","url":"https://x.example/hook"},"openweather":{"apiKey":"k"}}"#,
        )
        .expect("parse config");
        assert_eq!(config.telegram.port, Some(8443));
        assert_eq!(config.openweather.api_key.as_deref(), Some("k"));
    }

    #[test]
    fn missing_sections_default() {
        let config: WeatherBotConfig = serde_json::from_str("{}").expect("parse empty config");
        assert_eq!(config.telegram.token, None);
        assert_eq!(config.openweather.api_key, None);
    }
}
