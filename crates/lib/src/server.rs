//! Update dispatch server: one POST route that hands each decoded update to
//! the injected handler.
//!
//! The route counts every inbound request before decoding, rejects bodies
//! that are not JSON with 400, and always answers accepted updates with 200 —
//! handler failures are logged, never surfaced to the platform. Replies to
//! users happen through separate outbound calls, not through the webhook
//! response.

use crate::bot::Bot;
use anyhow::{Context, Result};
use async_trait::async_trait;
use axum::{body::Bytes, extract::State, http::StatusCode, routing::post, Router};
use serde_json::Value;
use std::sync::Arc;

/// The single application capability: interpret one update.
///
/// The dispatcher hands over the decoded document unmodified; schema
/// interpretation (message vs. callback query vs. anything else) is entirely
/// the implementation's business.
#[async_trait]
pub trait UpdateHandler: Send + Sync {
    /// One-time hook, run after the bot caches are populated and before the
    /// server starts accepting updates.
    async fn on_init(&self, _bot: &Bot) {}

    /// Called once per decoded update.
    async fn handle_update(&self, bot: &Bot, update: Value) -> Result<(), String>;
}

/// Shared state for the webhook route.
#[derive(Clone)]
pub struct ServerState {
    pub bot: Arc<Bot>,
    pub handler: Arc<dyn UpdateHandler>,
}

/// Serve the webhook route until shutdown.
///
/// Runs the handler's init hook first. When the configuration has no
/// hostname/port/callback URL the bot degrades to an API client: the init
/// hook still runs, no listener is bound, and this returns immediately.
pub async fn run_server(bot: Arc<Bot>, handler: Arc<dyn UpdateHandler>) -> Result<()> {
    run_server_with_routes(bot, handler, Router::new()).await
}

/// Like [`run_server`], with extra application routes (e.g. a dashboard
/// page) merged into the same listener.
pub async fn run_server_with_routes(
    bot: Arc<Bot>,
    handler: Arc<dyn UpdateHandler>,
    extra_routes: Router,
) -> Result<()> {
    handler.on_init(bot.as_ref()).await;

    let Some((host, port)) = bot.listen_target().await else {
        log::info!("no hostname/port/url configured; running as API client only");
        return Ok(());
    };

    if let Some(environment) = bot.hook_config().await.environment {
        log::info!("environment: {}", environment);
    }

    let state = ServerState {
        bot: bot.clone(),
        handler,
    };
    let app = Router::new()
        .route("/", post(receive_update))
        .with_state(state)
        .merge(extra_routes);

    let bind_addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("binding to {}", bind_addr))?;
    bot.mark_serving();
    log::info!("webhook server listening on {}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(bot))
        .await
        .context("webhook server exited")?;
    log::info!("webhook server stopped");
    Ok(())
}

/// POST / — one inbound update. Counted before decode so the counter tracks
/// requests received, not requests successfully processed.
async fn receive_update(State(state): State<ServerState>, body: Bytes) -> StatusCode {
    let received = state.bot.record_update();
    let update: Value = match serde_json::from_slice(&body) {
        Ok(update) => update,
        Err(e) => {
            log::warn!("rejecting update {}: body is not valid JSON: {}", received, e);
            return StatusCode::BAD_REQUEST;
        }
    };
    log::debug!("update {} received", received);
    if let Err(e) = state.handler.handle_update(state.bot.as_ref(), update).await {
        log::warn!("update handler failed: {}", e);
    }
    StatusCode::OK
}

/// Completes when the process should shut down (SIGINT or SIGTERM), then
/// removes the webhook registration so the platform stops POSTing at a dead
/// listener.
async fn shutdown_signal(bot: Arc<Bot>) {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    log::info!("shutdown signal received, removing webhook registration");

    let res = bot.api().delete_webhook().await;
    if !res.is_success() {
        log::debug!("deleteWebhook on shutdown did not succeed: {:?}", res.status);
    }
}
