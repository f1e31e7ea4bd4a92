//! Bot API client: one generic request/response operation reused by every
//! method wrapper.
//!
//! Outbound calls are attempted exactly once, classified by HTTP status
//! (200 = success, everything else = failure), logged, and returned as a
//! plain [`ApiResponse`] value. Failure is reported through the returned
//! status marker, never through an error — callers inspect the response.

use serde_json::Value;

const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

/// Resolve the Bot API base URL (for tests or custom endpoints).
pub fn telegram_api_base() -> String {
    std::env::var("TELEGRAM_API_BASE").unwrap_or_else(|_| TELEGRAM_API_BASE.to_string())
}

/// How a call's parameters travel: most methods take form fields, a few with
/// nested structures (reply markup, media arrays, permission objects) take a
/// JSON body, and read-only lookups go as GET query parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Form,
    Json,
    Query,
}

/// A file part for an attachment-bearing call (thumbnail, chat photo).
/// When one is present, every remaining field moves to the URL query string;
/// attachment parts never share a body with field data.
#[derive(Debug, Clone)]
pub struct InputFile {
    /// Multipart part name (e.g. "thumb", "photo").
    pub field: String,
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl InputFile {
    pub fn new(field: impl Into<String>, file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            field: field.into(),
            file_name: file_name.into(),
            bytes,
        }
    }

    /// Thumbnail part, the common attachment across the media send methods.
    pub fn thumbnail(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self::new("thumb", file_name, bytes)
    }
}

/// Outcome of one outbound call. `status` is `None` when the request never
/// completed (connect error, DNS failure); otherwise it is the HTTP status.
/// Both the raw text and the decoded body are kept so callers can
/// disambiguate object results from plain string/boolean results.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: Option<u16>,
    pub text: String,
    pub body: Option<Value>,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        self.status == Some(200)
    }

    /// The `result` field of the decoded response body, when present.
    pub fn result(&self) -> Option<&Value> {
        self.body.as_ref().and_then(|b| b.get("result"))
    }

    /// Decode the `result` field into a concrete type. `None` on failure
    /// responses or shape mismatches.
    pub fn result_as<T: serde::de::DeserializeOwned>(&self) -> Option<T> {
        self.result()
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }
}

/// Client for the Bot API. URL shape: `<base>/bot<token>/<method>`.
#[derive(Clone)]
pub struct BotApi {
    base_url: String,
    token: String,
    client: reqwest::Client,
}

impl BotApi {
    pub fn new(token: impl Into<String>) -> Self {
        Self::with_base_url(token, telegram_api_base())
    }

    /// Client against a custom base URL (tests, proxies).
    pub fn with_base_url(token: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
            client: reqwest::Client::new(),
        }
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.base_url, self.token, method)
    }

    /// Build the outbound request without sending it. Exposed so request
    /// shape (query vs. body) can be inspected.
    pub fn build_request(
        &self,
        method: &str,
        params: &Value,
        encoding: Encoding,
    ) -> Result<reqwest::Request, reqwest::Error> {
        let url = self.method_url(method);
        match encoding {
            Encoding::Form => self.client.post(&url).form(&form_fields(params)).build(),
            Encoding::Json => self.client.post(&url).json(params).build(),
            Encoding::Query => self.client.get(&url).query(&form_fields(params)).build(),
        }
    }

    /// Build an attachment-bearing request: multipart body holds only the
    /// file parts, all remaining fields travel as query parameters.
    pub fn build_attachment_request(
        &self,
        method: &str,
        params: &Value,
        files: Vec<InputFile>,
    ) -> Result<reqwest::Request, reqwest::Error> {
        let mut form = reqwest::multipart::Form::new();
        for f in files {
            form = form.part(
                f.field,
                reqwest::multipart::Part::bytes(f.bytes).file_name(f.file_name),
            );
        }
        self.client
            .post(self.method_url(method))
            .query(&form_fields(params))
            .multipart(form)
            .build()
    }

    /// The generic call every wrapper goes through.
    pub async fn call(&self, method: &str, params: Value, encoding: Encoding) -> ApiResponse {
        match self.build_request(method, &params, encoding) {
            Ok(req) => self.execute(method, req).await,
            Err(e) => {
                log::warn!("{}: building request failed: {}", method, e);
                ApiResponse {
                    status: None,
                    text: e.to_string(),
                    body: None,
                }
            }
        }
    }

    /// Generic call for attachment-bearing methods.
    pub async fn call_with_attachment(
        &self,
        method: &str,
        params: Value,
        files: Vec<InputFile>,
    ) -> ApiResponse {
        match self.build_attachment_request(method, &params, files) {
            Ok(req) => self.execute(method, req).await,
            Err(e) => {
                log::warn!("{}: building request failed: {}", method, e);
                ApiResponse {
                    status: None,
                    text: e.to_string(),
                    body: None,
                }
            }
        }
    }

    async fn execute(&self, method: &str, req: reqwest::Request) -> ApiResponse {
        let res = match self.client.execute(req).await {
            Ok(res) => res,
            Err(e) => {
                log::warn!("{}: request failed before a response arrived: {}", method, e);
                return ApiResponse {
                    status: None,
                    text: e.to_string(),
                    body: None,
                };
            }
        };
        let status = res.status().as_u16();
        let text = res.text().await.unwrap_or_default();
        let body = serde_json::from_str(&text).ok();
        if status == 200 {
            log::info!("{}: ok", method);
        } else {
            log::warn!("{}: failed with status {}: {}", method, status, text);
        }
        ApiResponse {
            status: Some(status),
            text,
            body,
        }
    }

    /// Media send with an optional thumbnail. A thumbnail switches the call
    /// to the attachment shape (fields in the query string).
    async fn send_media(
        &self,
        method: &'static str,
        params: Value,
        thumb: Option<InputFile>,
    ) -> ApiResponse {
        match thumb {
            Some(file) => self.call_with_attachment(method, params, vec![file]).await,
            None => self.call(method, params, Encoding::Form).await,
        }
    }

    // -- identity, updates, webhook management ------------------------------

    pub async fn get_me(&self) -> ApiResponse {
        self.call("getMe", Value::Null, Encoding::Query).await
    }

    /// getUpdates (long-poll alternative to the webhook). `update_data` may
    /// carry offset/limit/timeout/allowed_updates.
    pub async fn get_updates(&self, update_data: Option<Value>) -> ApiResponse {
        self.call(
            "getUpdates",
            update_data.unwrap_or(Value::Null),
            Encoding::Query,
        )
        .await
    }

    pub async fn set_webhook(&self, url: &str) -> ApiResponse {
        self.call(
            "setWebhook",
            serde_json::json!({ "url": url }),
            Encoding::Form,
        )
        .await
    }

    /// Idempotent: succeeds even when no webhook was registered.
    pub async fn delete_webhook(&self) -> ApiResponse {
        self.call("deleteWebhook", Value::Null, Encoding::Form).await
    }

    pub async fn get_webhook_info(&self) -> ApiResponse {
        self.call("getWebhookInfo", Value::Null, Encoding::Query)
            .await
    }

    // -- messages -----------------------------------------------------------

    /// sendMessage. JSON body when reply_markup is present (nested markup
    /// does not survive form encoding), plain form fields otherwise.
    pub async fn send_message(&self, message_data: Value) -> ApiResponse {
        let encoding = if message_data.get("reply_markup").is_some() {
            Encoding::Json
        } else {
            Encoding::Form
        };
        self.call("sendMessage", message_data, encoding).await
    }

    pub async fn forward_message(&self, message_data: Value) -> ApiResponse {
        self.call("forwardMessage", message_data, Encoding::Form)
            .await
    }

    pub async fn send_photo(&self, photo_data: Value) -> ApiResponse {
        self.call("sendPhoto", photo_data, Encoding::Form).await
    }

    pub async fn send_audio(&self, audio_data: Value, thumb: Option<InputFile>) -> ApiResponse {
        self.send_media("sendAudio", audio_data, thumb).await
    }

    pub async fn send_document(
        &self,
        document_data: Value,
        thumb: Option<InputFile>,
    ) -> ApiResponse {
        self.send_media("sendDocument", document_data, thumb).await
    }

    pub async fn send_video(&self, video_data: Value, thumb: Option<InputFile>) -> ApiResponse {
        self.send_media("sendVideo", video_data, thumb).await
    }

    pub async fn send_animation(
        &self,
        animation_data: Value,
        thumb: Option<InputFile>,
    ) -> ApiResponse {
        self.send_media("sendAnimation", animation_data, thumb).await
    }

    pub async fn send_voice(&self, voice_data: Value) -> ApiResponse {
        self.call("sendVoice", voice_data, Encoding::Form).await
    }

    pub async fn send_video_note(
        &self,
        video_note_data: Value,
        thumb: Option<InputFile>,
    ) -> ApiResponse {
        self.send_media("sendVideoNote", video_note_data, thumb)
            .await
    }

    /// sendMediaGroup: the media array only survives as JSON.
    pub async fn send_media_group(&self, media_group_data: Value) -> ApiResponse {
        self.call("sendMediaGroup", media_group_data, Encoding::Json)
            .await
    }

    pub async fn send_location(&self, location_data: Value) -> ApiResponse {
        self.call("sendLocation", location_data, Encoding::Form)
            .await
    }

    pub async fn edit_message_live_location(&self, location_data: Value) -> ApiResponse {
        self.call("editMessageLiveLocation", location_data, Encoding::Form)
            .await
    }

    pub async fn stop_message_live_location(&self, location_data: Value) -> ApiResponse {
        self.call("stopMessageLiveLocation", location_data, Encoding::Form)
            .await
    }

    pub async fn send_venue(&self, venue_data: Value) -> ApiResponse {
        self.call("sendVenue", venue_data, Encoding::Form).await
    }

    pub async fn send_contact(&self, contact_data: Value) -> ApiResponse {
        self.call("sendContact", contact_data, Encoding::Form).await
    }

    pub async fn send_poll(&self, poll_data: Value) -> ApiResponse {
        self.call("sendPoll", poll_data, Encoding::Json).await
    }

    pub async fn send_dice(&self, dice_data: Value) -> ApiResponse {
        self.call("sendDice", dice_data, Encoding::Form).await
    }

    pub async fn send_chat_action(&self, action_data: Value) -> ApiResponse {
        self.call("sendChatAction", action_data, Encoding::Form)
            .await
    }

    // -- files and profiles -------------------------------------------------

    pub async fn get_user_profile_photos(&self, profile_data: Value) -> ApiResponse {
        self.call("getUserProfilePhotos", profile_data, Encoding::Query)
            .await
    }

    pub async fn get_file(&self, file_data: Value) -> ApiResponse {
        self.call("getFile", file_data, Encoding::Query).await
    }

    // -- chat administration ------------------------------------------------

    pub async fn kick_chat_member(&self, user_data: Value) -> ApiResponse {
        self.call("kickChatMember", user_data, Encoding::Form).await
    }

    pub async fn unban_chat_member(&self, user_data: Value) -> ApiResponse {
        self.call("unbanChatMember", user_data, Encoding::Form)
            .await
    }

    /// restrictChatMember carries a nested ChatPermissions object.
    pub async fn restrict_chat_member(&self, user_data: Value) -> ApiResponse {
        self.call("restrictChatMember", user_data, Encoding::Json)
            .await
    }

    pub async fn promote_chat_member(&self, user_data: Value) -> ApiResponse {
        self.call("promoteChatMember", user_data, Encoding::Form)
            .await
    }

    pub async fn set_chat_administrator_custom_title(&self, user_data: Value) -> ApiResponse {
        self.call("setChatAdministratorCustomTitle", user_data, Encoding::Form)
            .await
    }

    pub async fn set_chat_permissions(&self, permissions_data: Value) -> ApiResponse {
        self.call("setChatPermissions", permissions_data, Encoding::Json)
            .await
    }

    pub async fn export_chat_invite_link(&self, chat_data: Value) -> ApiResponse {
        self.call("exportChatInviteLink", chat_data, Encoding::Query)
            .await
    }

    /// setChatPhoto: the photo is the attachment, chat_id moves to the query
    /// string.
    pub async fn set_chat_photo(&self, chat_data: Value, photo: InputFile) -> ApiResponse {
        self.call_with_attachment("setChatPhoto", chat_data, vec![photo])
            .await
    }

    pub async fn delete_chat_photo(&self, chat_data: Value) -> ApiResponse {
        self.call("deleteChatPhoto", chat_data, Encoding::Form)
            .await
    }

    pub async fn set_chat_title(&self, chat_data: Value) -> ApiResponse {
        self.call("setChatTitle", chat_data, Encoding::Form).await
    }

    pub async fn set_chat_description(&self, chat_data: Value) -> ApiResponse {
        self.call("setChatDescription", chat_data, Encoding::Form)
            .await
    }

    pub async fn pin_chat_message(&self, chat_data: Value) -> ApiResponse {
        self.call("pinChatMessage", chat_data, Encoding::Form).await
    }

    pub async fn unpin_chat_message(&self, chat_data: Value) -> ApiResponse {
        self.call("unpinChatMessage", chat_data, Encoding::Form)
            .await
    }

    pub async fn leave_chat(&self, chat_data: Value) -> ApiResponse {
        self.call("leaveChat", chat_data, Encoding::Form).await
    }

    pub async fn get_chat(&self, chat_data: Value) -> ApiResponse {
        self.call("getChat", chat_data, Encoding::Query).await
    }

    pub async fn get_chat_administrators(&self, chat_data: Value) -> ApiResponse {
        self.call("getChatAdministrators", chat_data, Encoding::Query)
            .await
    }

    pub async fn get_chat_members_count(&self, chat_data: Value) -> ApiResponse {
        self.call("getChatMembersCount", chat_data, Encoding::Query)
            .await
    }

    pub async fn get_chat_member(&self, chat_data: Value) -> ApiResponse {
        self.call("getChatMember", chat_data, Encoding::Query).await
    }

    pub async fn set_chat_sticker_set(&self, sticker_data: Value) -> ApiResponse {
        self.call("setChatStickerSet", sticker_data, Encoding::Form)
            .await
    }

    pub async fn delete_chat_sticker_set(&self, chat_data: Value) -> ApiResponse {
        self.call("deleteChatStickerSet", chat_data, Encoding::Form)
            .await
    }

    // -- callback queries and command registration --------------------------

    pub async fn answer_callback_query(&self, callback_data: Value) -> ApiResponse {
        self.call("answerCallbackQuery", callback_data, Encoding::Form)
            .await
    }

    /// setMyCommands: the commands array only survives as JSON.
    pub async fn set_my_commands(&self, commands: Value) -> ApiResponse {
        self.call("setMyCommands", commands, Encoding::Json).await
    }

    pub async fn get_my_commands(&self) -> ApiResponse {
        self.call("getMyCommands", Value::Null, Encoding::Query)
            .await
    }
}

/// Flatten a JSON object into wire fields. Strings go through verbatim,
/// everything else via its JSON rendering; nulls are treated as absent
/// optionals and skipped.
fn form_fields(params: &Value) -> Vec<(String, String)> {
    match params {
        Value::Object(map) => map
            .iter()
            .filter(|(_, v)| !v.is_null())
            .map(|(k, v)| {
                let rendered = match v {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                (k.clone(), rendered)
            })
            .collect(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn api() -> BotApi {
        BotApi::with_base_url("testtoken", "http://127.0.0.1:1")
    }

    fn query_has(req: &reqwest::Request, key: &str, value: &str) -> bool {
        req.url().query_pairs().any(|(k, v)| k == key && v == value)
    }

    #[test]
    fn form_fields_renders_scalars_and_skips_nulls() {
        let fields = form_fields(&json!({
            "chat_id": 5,
            "text": "hello",
            "silent": true,
            "parse_mode": null,
        }));
        assert!(fields.contains(&("chat_id".to_string(), "5".to_string())));
        assert!(fields.contains(&("text".to_string(), "hello".to_string())));
        assert!(fields.contains(&("silent".to_string(), "true".to_string())));
        assert!(!fields.iter().any(|(k, _)| k == "parse_mode"));
    }

    #[test]
    fn form_request_carries_fields_in_the_body() {
        let req = api()
            .build_request(
                "sendDocument",
                &json!({"chat_id": 5, "document": "file-id", "caption": "report"}),
                Encoding::Form,
            )
            .expect("build form request");
        assert_eq!(req.method(), &reqwest::Method::POST);
        assert_eq!(req.url().query(), None);
        let body = req
            .body()
            .and_then(|b| b.as_bytes())
            .map(|b| String::from_utf8_lossy(b).to_string())
            .expect("form body");
        assert!(body.contains("chat_id=5"));
        assert!(body.contains("caption=report"));
    }

    #[test]
    fn attachment_moves_every_field_to_the_query_string() {
        for method in ["sendDocument", "sendAudio", "sendVideo"] {
            let req = api()
                .build_attachment_request(
                    method,
                    &json!({"chat_id": 5, "caption": "report"}),
                    vec![InputFile::thumbnail("thumb.jpg", vec![0xff, 0xd8])],
                )
                .expect("build attachment request");
            assert!(query_has(&req, "chat_id", "5"), "{method} missing chat_id");
            assert!(query_has(&req, "caption", "report"));
            let content_type = req
                .headers()
                .get(reqwest::header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default();
            assert!(
                content_type.starts_with("multipart/form-data"),
                "{method} body is not multipart"
            );
            // Streaming multipart body: field data must not be readable there.
            assert!(req.body().and_then(|b| b.as_bytes()).is_none());
        }
    }

    #[test]
    fn query_encoding_builds_a_get_request() {
        let req = api()
            .build_request("getChat", &json!({"chat_id": -100123}), Encoding::Query)
            .expect("build query request");
        assert_eq!(req.method(), &reqwest::Method::GET);
        assert!(query_has(&req, "chat_id", "-100123"));
        assert!(req.body().is_none());
    }

    #[test]
    fn json_encoding_preserves_nested_structures() {
        let req = api()
            .build_request(
                "sendMessage",
                &json!({"chat_id": 5, "reply_markup": {"keyboard": [["a"], ["b"]]}}),
                Encoding::Json,
            )
            .expect("build json request");
        let body = req
            .body()
            .and_then(|b| b.as_bytes())
            .map(|b| String::from_utf8_lossy(b).to_string())
            .expect("json body");
        assert!(body.contains(r#""keyboard":[["a"],["b"]]"#));
    }

    #[test]
    fn url_concatenates_base_token_and_method() {
        let req = api()
            .build_request("getMe", &Value::Null, Encoding::Query)
            .expect("build request");
        assert_eq!(req.url().path(), "/bottesttoken/getMe");
    }
}
