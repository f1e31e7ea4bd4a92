//! Integration test: run the dispatch server against a stub Bot API, POST
//! updates at the webhook route, and check counting + handler invocation.
//! Does not require network access beyond loopback.

use async_trait::async_trait;
use axum::{http::Uri, Json, Router};
use lib::api::BotApi;
use lib::bot::Bot;
use lib::config::HookConfig;
use lib::server::{self, UpdateHandler};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn free_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind free port");
    listener.local_addr().expect("local_addr").port()
}

/// Stub Bot API answering 200 to everything, so lifecycle calls succeed.
async fn spawn_telegram_stub() -> String {
    async fn stub(uri: Uri) -> Json<Value> {
        let method = uri.path().rsplit('/').next().unwrap_or_default();
        let result = match method {
            "getMe" => json!({"id": 99, "is_bot": true, "first_name": "Hookbill", "username": "hookbill_test_bot"}),
            "getWebhookInfo" => {
                json!({"url": "https://bot.example.com/hook", "has_custom_certificate": false, "pending_update_count": 0})
            }
            _ => json!(true),
        };
        Json(json!({"ok": true, "result": result}))
    }
    let app = Router::new().fallback(stub);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind stub");
    let addr = listener.local_addr().expect("local_addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    format!("http://{}", addr)
}

async fn connect_serving_bot(api_base: String, port: u16) -> Arc<Bot> {
    let config = HookConfig {
        hostname: Some("127.0.0.1".to_string()),
        port: Some(port),
        token: Some("testtoken".to_string()),
        url: Some("https://bot.example.com/hook".to_string()),
        environment: None,
    };
    let api = BotApi::with_base_url("testtoken", api_base);
    Arc::new(Bot::connect_with_api(config, api).await)
}

/// GET until the listener answers (405 on the POST-only route) so readiness
/// polling never touches the update counter.
async fn wait_until_serving(client: &reqwest::Client, url: &str) {
    for _ in 0..100 {
        if client.get(url).send().await.is_ok() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    panic!("webhook server did not come up at {}", url);
}

#[derive(Default)]
struct RecordingHandler {
    seen: Mutex<Vec<Value>>,
}

#[async_trait]
impl UpdateHandler for RecordingHandler {
    async fn handle_update(&self, _bot: &Bot, update: Value) -> Result<(), String> {
        self.seen.lock().expect("seen lock").push(update);
        Ok(())
    }
}

struct ExplodingHandler;

#[async_trait]
impl UpdateHandler for ExplodingHandler {
    async fn handle_update(&self, _bot: &Bot, _update: Value) -> Result<(), String> {
        Err("handler exploded".to_string())
    }
}

#[tokio::test]
async fn dispatches_updates_and_counts_every_request() {
    let api_base = spawn_telegram_stub().await;
    let port = free_port();
    let bot = connect_serving_bot(api_base, port).await;
    let handler = Arc::new(RecordingHandler::default());

    let server_bot = bot.clone();
    let server_handler = handler.clone();
    let server_task = tokio::spawn(async move {
        let _ = server::run_server(server_bot, server_handler).await;
    });

    let url = format!("http://127.0.0.1:{}/", port);
    let client = reqwest::Client::new();
    wait_until_serving(&client, &url).await;
    assert!(bot.serving());
    assert_eq!(bot.update_count(), 0);

    let doc = json!({"message":{"text":"/start","chat":{"id":1},"from":{"first_name":"A"}}});
    let res = client.post(&url).json(&doc).send().await.expect("post update");
    assert_eq!(res.status().as_u16(), 200);
    assert_eq!(bot.update_count(), 1);
    {
        let seen = handler.seen.lock().expect("seen lock");
        assert_eq!(seen.len(), 1, "handler must run exactly once");
        assert_eq!(seen[0], doc);
    }

    // Malformed body: rejected with 400, still counted, handler untouched.
    let res = client
        .post(&url)
        .header("content-type", "application/json")
        .body("not json at all")
        .send()
        .await
        .expect("post garbage");
    assert_eq!(res.status().as_u16(), 400);
    assert_eq!(bot.update_count(), 2);
    assert_eq!(handler.seen.lock().expect("seen lock").len(), 1);

    server_task.abort();
}

#[tokio::test]
async fn handler_failure_still_counts_and_acknowledges() {
    let api_base = spawn_telegram_stub().await;
    let port = free_port();
    let bot = connect_serving_bot(api_base, port).await;

    let server_bot = bot.clone();
    let server_task = tokio::spawn(async move {
        let _ = server::run_server(server_bot, Arc::new(ExplodingHandler)).await;
    });

    let url = format!("http://127.0.0.1:{}/", port);
    let client = reqwest::Client::new();
    wait_until_serving(&client, &url).await;

    let doc = json!({"message":{"text":"/boom","chat":{"id":2},"from":{"first_name":"B"}}});
    let res = client.post(&url).json(&doc).send().await.expect("post update");
    // The platform never sees handler failures.
    assert_eq!(res.status().as_u16(), 200);
    assert_eq!(bot.update_count(), 1);

    server_task.abort();
}
