//! Configuration types and loading.
//!
//! Config is loaded from a JSON file (e.g. `~/.hookbill/config.json`) and environment.
//! The token is required for any outbound call; hostname, port, and callback URL are
//! required only when the process should run the webhook server.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Webhook and credential settings for one bot.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HookConfig {
    /// Listen host for the webhook server (e.g. "127.0.0.1").
    #[serde(default)]
    pub hostname: Option<String>,

    /// Listen port for the webhook server.
    #[serde(default)]
    pub port: Option<u16>,

    /// Bot token from BotFather. Overridden by TELEGRAM_BOT_TOKEN env when set.
    #[serde(default)]
    pub token: Option<String>,

    /// Public callback URL Telegram POSTs updates to. May be replaced later
    /// by a re-registration.
    #[serde(default)]
    pub url: Option<String>,

    /// Free-form deployment label (e.g. "production"); logged at startup.
    #[serde(default)]
    pub environment: Option<String>,
}

impl HookConfig {
    /// Listen address, present only when hostname, port, and callback URL are
    /// all configured. Absent means API-client-only mode.
    pub fn listen_target(&self) -> Option<(String, u16)> {
        match (&self.hostname, self.port, &self.url) {
            (Some(host), Some(port), Some(url)) if !host.is_empty() && !url.is_empty() => {
                Some((host.clone(), port))
            }
            _ => None,
        }
    }
}

/// Resolve the bot token: env TELEGRAM_BOT_TOKEN overrides config.
pub fn resolve_bot_token(config: &HookConfig) -> Option<String> {
    std::env::var("TELEGRAM_BOT_TOKEN")
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
                .token
                .as_ref()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        })
}

/// Resolve config path from env or default.
pub fn default_config_path() -> PathBuf {
    std::env::var("HOOKBILL_CONFIG_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            dirs::home_dir()
                .map(|h| h.join(".hookbill").join("config.json"))
                .unwrap_or_else(|| PathBuf::from("config.json"))
        })
}

/// Load config from the default path (or HOOKBILL_CONFIG_PATH). Missing file => default config.
/// Returns the config and the path that was used.
pub fn load_config(path: Option<PathBuf>) -> Result<(HookConfig, PathBuf)> {
    let path = path.unwrap_or_else(default_config_path);
    let config = if !path.exists() {
        log::debug!("config file not found, using defaults: {}", path.display());
        HookConfig::default()
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
    fn listen_target_requires_hostname_port_and_url() {
        let mut config = HookConfig::default();
        assert_eq!(config.listen_target(), None);

        config.hostname = Some("127.0.0.1".to_string());
        config.port = Some(8443);
        assert_eq!(config.listen_target(), None);

        config.url = Some("https://bot.example.com/hook".to_string());
        assert_eq!(config.listen_target(), Some(("127.0.0.1".to_string(), 8443)));
    }

    #[test]
    fn listen_target_rejects_empty_strings() {
        let config = HookConfig {
            hostname: Some(String::new()),
            port: Some(8443),
            url: Some("https://bot.example.com/hook".to_string()),
            ..HookConfig::default()
        };
        assert_eq!(config.listen_target(), None);
    }

    #[test]
    fn parses_camel_case_fields_and_defaults_the_rest() {
        let config: HookConfig =
            serde_json::from_str(r#"{"hostname":"0.0.0.0","port":80,"token":"t"}"#)
                .expect("parse config");
        assert_eq!(config.hostname.as_deref(), Some("0.0.0.0"));
        assert_eq!(config.port, Some(80));
        assert_eq!(config.token.as_deref(), Some("t"));
        assert_eq!(config.url, None);
        assert_eq!(config.environment, None);
    }

    #[test]
    fn load_config_missing_file_yields_defaults() {
        let path = std::env::temp_dir().join(format!(
            "hookbill-config-test-{}/config.json",
            std::process::id()
        ));
        let (config, used) = load_config(Some(path.clone())).expect("load defaults");
        assert_eq!(used, path);
        assert_eq!(config.token, None);
    }
}
