//! Bot wiring: webhook lifecycle, cached identity, update counting.
//!
//! Construction runs the registration sequence (delete, set, fetch info,
//! fetch identity) best-effort: failures are logged and leave the matching
//! cache empty instead of aborting, so a bot with a bad credential or an
//! unreachable API still constructs and can be inspected.

use crate::api::{ApiResponse, BotApi, BotIdentity, WebhookInfo};
use crate::config::{self, HookConfig};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::sync::RwLock;

/// A connected bot: API client, cached registration state, and the running
/// update counter. Shared behind an `Arc` between the dispatch server and
/// application handlers.
pub struct Bot {
    api: BotApi,
    config: RwLock<HookConfig>,
    bot_info: Option<BotIdentity>,
    webhook_info: RwLock<Option<WebhookInfo>>,
    update_count: AtomicU64,
    serving: AtomicBool,
}

impl Bot {
    /// Connect with the token resolved from config/environment and the
    /// default API endpoint.
    pub async fn connect(config: HookConfig) -> Self {
        let token = config::resolve_bot_token(&config).unwrap_or_else(|| {
            log::warn!("no bot token configured; outbound calls will fail");
            String::new()
        });
        Self::connect_with_api(config, BotApi::new(token)).await
    }

    /// Connect through a caller-supplied client (tests, custom endpoints).
    ///
    /// Runs, in order: deleteWebhook, setWebhook, getWebhookInfo, getMe.
    /// Each step is logged by the transport; a failed step leaves its cache
    /// empty and the sequence continues. When no callback URL is configured
    /// the registration is set to an empty URL, which the platform treats as
    /// removal — the result is a pure API client.
    pub async fn connect_with_api(config: HookConfig, api: BotApi) -> Self {
        // No live webhook may survive into the new registration.
        api.delete_webhook().await;
        let url = config.url.clone().unwrap_or_default();
        api.set_webhook(&url).await;
        let webhook_info = fetch_webhook_info(&api).await;
        let bot_info = fetch_bot_info(&api).await;
        Self {
            api,
            config: RwLock::new(config),
            bot_info,
            webhook_info: RwLock::new(webhook_info),
            update_count: AtomicU64::new(0),
            serving: AtomicBool::new(false),
        }
    }

    /// The transport client, for application-level calls.
    pub fn api(&self) -> &BotApi {
        &self.api
    }

    /// Cached bot identity. `None` when the startup getMe call failed.
    pub fn bot_info(&self) -> Option<&BotIdentity> {
        self.bot_info.as_ref()
    }

    /// Cached registration state, as of the last (re-)registration.
    pub async fn webhook_info(&self) -> Option<WebhookInfo> {
        self.webhook_info.read().await.clone()
    }

    /// Snapshot of the current configuration.
    pub async fn hook_config(&self) -> HookConfig {
        self.config.read().await.clone()
    }

    /// Point the registration at a new callback URL. The cached config and
    /// webhook info are refreshed only when the API accepts the change.
    pub async fn register_webhook(&self, url: &str) -> ApiResponse {
        let res = self.api.set_webhook(url).await;
        if res.is_success() {
            self.config.write().await.url = Some(url.to_string());
            *self.webhook_info.write().await = fetch_webhook_info(&self.api).await;
        }
        res
    }

    /// Updates received since construction (valid or rejected).
    pub fn update_count(&self) -> u64 {
        self.update_count.load(Ordering::SeqCst)
    }

    /// Count one inbound request; returns the new total.
    pub(crate) fn record_update(&self) -> u64 {
        self.update_count.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// True once the dispatch server has bound its listener. One-way.
    pub fn serving(&self) -> bool {
        self.serving.load(Ordering::SeqCst)
    }

    pub(crate) fn mark_serving(&self) {
        self.serving.store(true, Ordering::SeqCst);
    }

    /// Listen address from the current config; `None` means API-client-only
    /// mode (no server).
    pub async fn listen_target(&self) -> Option<(String, u16)> {
        self.config.read().await.listen_target()
    }
}

async fn fetch_webhook_info(api: &BotApi) -> Option<WebhookInfo> {
    let res = api.get_webhook_info().await;
    if !res.is_success() {
        return None;
    }
    res.result_as::<WebhookInfo>()
}

async fn fetch_bot_info(api: &BotApi) -> Option<BotIdentity> {
    let res = api.get_me().await;
    if !res.is_success() {
        return None;
    }
    res.result_as::<BotIdentity>()
}
