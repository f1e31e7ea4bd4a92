//! Integration test: transport client success/failure classification against
//! a stub Bot API. Every outcome must come back as a value, never a panic.

use axum::http::{StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use lib::api::{BotApi, BotIdentity};
use serde_json::json;

async fn telegram_stub(uri: Uri) -> Response {
    let method = uri.path().rsplit('/').next().unwrap_or_default();
    match method {
        "getMe" => Json(json!({
            "ok": true,
            "result": {"id": 99, "is_bot": true, "first_name": "Hookbill", "username": "hookbill_test_bot"}
        }))
        .into_response(),
        "sendMessage" => Json(json!({
            "ok": true,
            "result": {"message_id": 7, "chat": {"id": 1, "type": "private"}, "text": "hi"}
        }))
        .into_response(),
        _ => (
            StatusCode::NOT_FOUND,
            Json(json!({"ok": false, "error_code": 404, "description": "method not found"})),
        )
            .into_response(),
    }
}

async fn spawn_stub() -> String {
    let app = Router::new().fallback(telegram_stub);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind stub");
    let addr = listener.local_addr().expect("local_addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    format!("http://{}", addr)
}

#[tokio::test]
async fn success_carries_the_decoded_body() {
    let api = BotApi::with_base_url("testtoken", spawn_stub().await);
    let res = api.get_me().await;
    assert!(res.is_success());
    assert_eq!(res.status, Some(200));
    let identity: BotIdentity = res.result_as().expect("typed result");
    assert_eq!(identity.username.as_deref(), Some("hookbill_test_bot"));

    let sent = api.send_message(json!({"chat_id": 1, "text": "hi"})).await;
    assert!(sent.is_success());
    assert_eq!(
        sent.result().and_then(|r| r.get("message_id")).and_then(|v| v.as_i64()),
        Some(7)
    );
}

#[tokio::test]
async fn failure_carries_status_and_raw_body() {
    let api = BotApi::with_base_url("testtoken", spawn_stub().await);
    let res = api.leave_chat(json!({"chat_id": 1})).await;
    assert!(!res.is_success());
    assert_eq!(res.status, Some(404));
    assert!(res.text.contains("method not found"));
    // The body still decodes so callers can inspect error_code/description.
    assert_eq!(
        res.body
            .as_ref()
            .and_then(|b| b.get("error_code"))
            .and_then(|v| v.as_i64()),
        Some(404)
    );
}

#[tokio::test]
async fn wire_failure_is_a_failure_result_not_a_panic() {
    // Nothing listens on port 1.
    let api = BotApi::with_base_url("testtoken", "http://127.0.0.1:1");
    let res = api.get_me().await;
    assert!(!res.is_success());
    assert_eq!(res.status, None);
    assert!(res.body.is_none());
    assert!(!res.text.is_empty());
}
