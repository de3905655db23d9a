//! Minimal Telegram Bot API client.

use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::config::HttpConfig;
use crate::http::{build_client, RetryPolicy};
use crate::{FeedbotError, Result};

/// Bot account returned by `getMe`.
#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: i64,
    #[serde(default)]
    pub username: Option<String>,
}

/// Chat returned by `getChat`.
#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
}

impl Chat {
    /// Human-readable name for logs.
    pub fn display_name(&self) -> String {
        match (&self.username, &self.title) {
            (Some(username), _) => format!("@{}", username),
            (None, Some(title)) => title.clone(),
            (None, None) => self.id.to_string(),
        }
    }
}

/// A sent message.
#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub message_id: i64,
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Debug, Serialize)]
struct GetChatRequest<'a> {
    chat_id: &'a str,
}

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    chat_id: i64,
    text: &'a str,
    parse_mode: &'static str,
    disable_web_page_preview: bool,
}

const PARSE_MODE_HTML: &str = "HTML";

/// Bot API bound to one token.
pub struct BotApi {
    client: Client,
    retry: RetryPolicy,
    base_url: String,
}

impl BotApi {
    pub fn new(http: &HttpConfig, api_url: &str, token: &str) -> Result<Self> {
        Ok(Self {
            client: build_client(http, "telegram")?,
            retry: RetryPolicy::new("telegram", http),
            base_url: format!("{}/bot{}", api_url.trim_end_matches('/'), token),
        })
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/{}", self.base_url, method)
    }

    /// The bot's own account.
    pub async fn get_me(&self, cancel: &CancellationToken) -> Result<User> {
        let url = self.method_url("getMe");
        self.call(cancel, "getMe", || self.client.get(&url)).await
    }

    /// Resolve a channel by `@username` or numeric ID.
    pub async fn get_chat(&self, cancel: &CancellationToken, chat_id: &str) -> Result<Chat> {
        let url = self.method_url("getChat");
        let body = GetChatRequest { chat_id };
        self.call(cancel, "getChat", || self.client.post(&url).json(&body))
            .await
    }

    /// Send an HTML text message without link previews.
    pub async fn send_message(
        &self,
        cancel: &CancellationToken,
        chat_id: i64,
        text: &str,
    ) -> Result<Message> {
        let url = self.method_url("sendMessage");
        let body = SendMessageRequest {
            chat_id,
            text,
            parse_mode: PARSE_MODE_HTML,
            disable_web_page_preview: true,
        };
        self.call(cancel, "sendMessage", || self.client.post(&url).json(&body))
            .await
    }

    /// Upload a photo with an HTML caption.
    pub async fn send_photo(
        &self,
        cancel: &CancellationToken,
        chat_id: i64,
        photo: &[u8],
        caption: &str,
    ) -> Result<Message> {
        let url = self.method_url("sendPhoto");
        self.call(cancel, "sendPhoto", || {
            let form = Form::new()
                .text("chat_id", chat_id.to_string())
                .text("caption", caption.to_string())
                .text("parse_mode", PARSE_MODE_HTML)
                .part("photo", Part::bytes(photo.to_vec()).file_name("photo"));
            self.client.post(&url).multipart(form)
        })
        .await
    }

    async fn call<T, F>(&self, cancel: &CancellationToken, method: &str, request: F) -> Result<T>
    where
        T: DeserializeOwned,
        F: FnMut() -> RequestBuilder,
    {
        let response = self
            .retry
            .send(cancel, request)
            .await
            .map_err(|e| match e {
                FeedbotError::Http(msg) => FeedbotError::Telegram(format!("{}: {}", method, msg)),
                other => other,
            })?;

        let status = response.status();
        let envelope: ApiResponse<T> = response.json().await.map_err(|e| {
            FeedbotError::Telegram(format!("{}: unexpected response ({}): {}", method, status, e))
        })?;

        if !envelope.ok {
            return Err(FeedbotError::Telegram(format!(
                "{}: {}",
                method,
                envelope.description.unwrap_or_else(|| status.to_string())
            )));
        }

        envelope
            .result
            .ok_or_else(|| FeedbotError::Telegram(format!("{}: missing result", method)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::MockServer;

    const TOKEN: &str = "123:abc";

    fn api(server: &MockServer) -> BotApi {
        let http = HttpConfig {
            max_retries: 1,
            retry_min_wait_ms: 1,
            retry_max_wait_ms: 2,
            ..Default::default()
        };
        BotApi::new(&http, &server.base_url(), TOKEN).unwrap()
    }

    #[tokio::test]
    async fn test_get_me() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(httpmock::Method::GET).path("/bot123:abc/getMe");
                then.status(200)
                    .body(r#"{"ok":true,"result":{"id":42,"is_bot":true,"username":"feed_bot"}}"#);
            })
            .await;

        let me = api(&server).get_me(&CancellationToken::new()).await.unwrap();

        assert_eq!(me.id, 42);
        assert_eq!(me.username.as_deref(), Some("feed_bot"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_get_chat() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(httpmock::Method::POST)
                    .path("/bot123:abc/getChat")
                    .body_contains(r#""chat_id":"@news""#);
                then.status(200).body(
                    r#"{"ok":true,"result":{"id":-1001,"type":"channel","title":"News","username":"news"}}"#,
                );
            })
            .await;

        let chat = api(&server)
            .get_chat(&CancellationToken::new(), "@news")
            .await
            .unwrap();

        assert_eq!(chat.id, -1001);
        assert_eq!(chat.display_name(), "@news");
    }

    #[tokio::test]
    async fn test_send_message() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(httpmock::Method::POST)
                    .path("/bot123:abc/sendMessage")
                    .body_contains(r#""chat_id":-1001"#)
                    .body_contains(r#""parse_mode":"HTML""#)
                    .body_contains(r#""disable_web_page_preview":true"#);
                then.status(200)
                    .body(r#"{"ok":true,"result":{"message_id":7}}"#);
            })
            .await;

        let message = api(&server)
            .send_message(&CancellationToken::new(), -1001, "<b>hi</b>")
            .await
            .unwrap();

        assert_eq!(message.message_id, 7);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_send_photo() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(httpmock::Method::POST)
                    .path("/bot123:abc/sendPhoto")
                    .body_contains("name=\"caption\"")
                    .body_contains("IMAGE-BYTES");
                then.status(200)
                    .body(r#"{"ok":true,"result":{"message_id":8}}"#);
            })
            .await;

        let message = api(&server)
            .send_photo(&CancellationToken::new(), -1001, b"IMAGE-BYTES", "caption")
            .await
            .unwrap();

        assert_eq!(message.message_id, 8);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_api_error_description() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(httpmock::Method::POST).path("/bot123:abc/getChat");
                then.status(400).body(
                    r#"{"ok":false,"error_code":400,"description":"Bad Request: chat not found"}"#,
                );
            })
            .await;

        let result = api(&server)
            .get_chat(&CancellationToken::new(), "@missing")
            .await;

        match result {
            Err(FeedbotError::Telegram(msg)) => {
                assert_eq!(msg, "getChat: Bad Request: chat not found")
            }
            other => panic!("expected telegram error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_server_error_gives_up() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(httpmock::Method::GET).path("/bot123:abc/getMe");
                then.status(502);
            })
            .await;

        let result = api(&server).get_me(&CancellationToken::new()).await;

        assert!(matches!(result, Err(FeedbotError::Telegram(_))));
        assert_eq!(mock.hits_async().await, 2);
    }
}
