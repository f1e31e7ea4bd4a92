//! Weather bot: a Hookbill example that answers weather commands and serves
//! a forecast dashboard next to the webhook route.

mod commands;
mod config;
mod dashboard;
mod handler;
mod weather;

use handler::WeatherHandler;
use lib::bot::Bot;
use std::path::PathBuf;
use std::sync::Arc;
use weather::OpenWeatherClient;

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run().await {
        log::error!("weather bot failed: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let (config, path) = config::load_config(config_path)?;
    log::info!("loaded configuration from {}", path.display());

    let key = config::resolve_openweather_key(&config).unwrap_or_else(|| {
        log::warn!("no OpenWeatherMap API key configured; weather lookups will fail");
        String::new()
    });
    let weather = OpenWeatherClient::new(key, None);
    let public_url = config.telegram.url.clone();

    let bot = Arc::new(Bot::connect(config.telegram).await);
    if let Some(identity) = bot.bot_info() {
        log::info!(
            "serving as @{}",
            identity.username.as_deref().unwrap_or(&identity.first_name)
        );
    } else {
        log::warn!("bot identity could not be fetched; check the token");
    }

    let handler = Arc::new(WeatherHandler::new(weather.clone(), public_url.clone()));
    let dash = dashboard::routes(dashboard::DashState {
        weather,
        public_url,
    });
    lib::server::run_server_with_routes(bot, handler, dash).await
}
