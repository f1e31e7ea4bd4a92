use clap::{Parser, Subcommand};
use lib::api::{ApiResponse, BotApi};
use lib::bot::Bot;
use lib::server::UpdateHandler;
use serde_json::{json, Value};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "hookbill")]
#[command(about = "Hookbill CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show version
    Version,

    /// Print the bot's identity (getMe).
    Me {
        /// Config file path (default: HOOKBILL_CONFIG_PATH or ~/.hookbill/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,
    },

    /// Manage the webhook registration.
    Webhook {
        /// Config file path (default: HOOKBILL_CONFIG_PATH or ~/.hookbill/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,

        #[command(subcommand)]
        action: WebhookAction,
    },

    /// Send a text message to a chat.
    Send {
        /// Config file path (default: HOOKBILL_CONFIG_PATH or ~/.hookbill/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,

        /// Target chat id
        #[arg(long)]
        chat_id: i64,

        /// Message text
        text: String,
    },

    /// Run the webhook server with an echo handler (replies with the text it
    /// receives). Useful for checking a deployment end to end.
    Echo {
        /// Config file path (default: HOOKBILL_CONFIG_PATH or ~/.hookbill/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,

        /// Listen port (overrides the configured one)
        #[arg(long, short)]
        port: Option<u16>,
    },
}

#[derive(Subcommand)]
enum WebhookAction {
    /// Register a new callback URL
    Set { url: String },
    /// Remove the current registration
    Delete,
    /// Show the current registration state
    Info,
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Version) => {
            println!("hookbill {}", env!("CARGO_PKG_VERSION"));
        }
        Some(Commands::Me { config }) => {
            if let Err(e) = run_me(config).await {
                log::error!("me failed: {}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Webhook { config, action }) => {
            if let Err(e) = run_webhook(config, action).await {
                log::error!("webhook failed: {}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Send {
            config,
            chat_id,
            text,
        }) => {
            if let Err(e) = run_send(config, chat_id, text).await {
                log::error!("send failed: {}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Echo { config, port }) => {
            if let Err(e) = run_echo(config, port).await {
                log::error!("echo failed: {}", e);
                std::process::exit(1);
            }
        }
        None => {
            println!("Run with --help for usage");
        }
    }
}

/// Build an API client from the config file without touching the webhook
/// registration (unlike `Bot::connect`, which re-registers).
fn load_api(config_path: Option<std::path::PathBuf>) -> anyhow::Result<BotApi> {
    let (config, path) = lib::config::load_config(config_path)?;
    let token = lib::config::resolve_bot_token(&config)
        .ok_or_else(|| anyhow::anyhow!("no bot token in {} or TELEGRAM_BOT_TOKEN", path.display()))?;
    Ok(BotApi::new(token))
}

/// Print the call outcome; non-200 becomes a nonzero exit through the caller.
fn report(res: &ApiResponse) -> anyhow::Result<()> {
    if res.is_success() {
        match res.result() {
            Some(result) => println!("{}", serde_json::to_string_pretty(result)?),
            None => println!("{}", res.text),
        }
        Ok(())
    } else {
        match res.status {
            Some(status) => anyhow::bail!("status {}: {}", status, res.text),
            None => anyhow::bail!("request failed: {}", res.text),
        }
    }
}

async fn run_me(config_path: Option<std::path::PathBuf>) -> anyhow::Result<()> {
    let api = load_api(config_path)?;
    report(&api.get_me().await)
}

async fn run_webhook(
    config_path: Option<std::path::PathBuf>,
    action: WebhookAction,
) -> anyhow::Result<()> {
    let api = load_api(config_path)?;
    let res = match action {
        WebhookAction::Set { url } => api.set_webhook(&url).await,
        WebhookAction::Delete => api.delete_webhook().await,
        WebhookAction::Info => api.get_webhook_info().await,
    };
    report(&res)
}

async fn run_send(
    config_path: Option<std::path::PathBuf>,
    chat_id: i64,
    text: String,
) -> anyhow::Result<()> {
    let api = load_api(config_path)?;
    report(&api.send_message(json!({"chat_id": chat_id, "text": text})).await)
}

/// Replies to every text message with the same text.
struct EchoHandler;

#[async_trait::async_trait]
impl UpdateHandler for EchoHandler {
    async fn handle_update(&self, bot: &Bot, update: Value) -> Result<(), String> {
        let Some(message) = update.get("message") else {
            return Ok(());
        };
        let chat_id = message
            .pointer("/chat/id")
            .and_then(Value::as_i64)
            .ok_or_else(|| "message has no chat id".to_string())?;
        let Some(text) = message.get("text").and_then(Value::as_str) else {
            return Ok(());
        };
        bot.api()
            .send_message(json!({"chat_id": chat_id, "text": text}))
            .await;
        Ok(())
    }
}

async fn run_echo(
    config_path: Option<std::path::PathBuf>,
    port: Option<u16>,
) -> anyhow::Result<()> {
    let (mut config, path) = lib::config::load_config(config_path)?;
    if let Some(p) = port {
        config.port = Some(p);
    }
    log::info!("loaded configuration from {}", path.display());
    let bot = Arc::new(Bot::connect(config).await);
    if let Some(identity) = bot.bot_info() {
        println!(
            "echoing as @{}",
            identity.username.as_deref().unwrap_or(&identity.first_name)
        );
    }
    lib::server::run_server(bot, Arc::new(EchoHandler)).await
}
