//! Telegram delivery.
//!
//! [`TelegramConsumer`] posts every article it receives into a channel.
//! Articles with a lead image are sent as a photo with a caption; the rest
//! as plain HTML messages.

mod client;
mod message;

pub use client::{BotApi, Chat, Message, User};
pub use message::{
    format_message_text, trim_long_text, unicode_length, ELLIPSIS, MAX_MEDIA_CAPTION_LENGTH,
    MAX_TEXT_LENGTH,
};

use async_trait::async_trait;
use reqwest::Client;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::article::Article;
use crate::config::{HttpConfig, TelegramConfig};
use crate::http::{build_client, ensure_success, RetryPolicy};
use crate::pipeline::{check_cancelled, Consumer};
use crate::Result;

/// Consumer publishing articles into a Telegram channel.
///
/// The bot and channel are resolved on the first article and cached.
pub struct TelegramConsumer {
    api: BotApi,
    channel: String,
    chat: Option<Chat>,
    images: Client,
    retry: RetryPolicy,
}

impl TelegramConsumer {
    pub fn new(config: &TelegramConfig, http: &HttpConfig) -> Result<Self> {
        Ok(Self {
            api: BotApi::new(http, &config.api_url, &config.token)?,
            channel: config.channel.clone(),
            chat: None,
            images: build_client(http, "telegram")?,
            retry: RetryPolicy::new("telegram", http),
        })
    }

    /// Resolve the bot and the destination channel once.
    async fn connect(&mut self, cancel: &CancellationToken) -> Result<Chat> {
        if let Some(chat) = &self.chat {
            return Ok(chat.clone());
        }

        let me = self.api.get_me(cancel).await.inspect_err(|e| {
            error!("Unable to connect to telegram: {}", e);
        })?;
        info!(
            "Connected to telegram as @{}",
            me.username.as_deref().unwrap_or("<unknown>")
        );

        let chat = self.api.get_chat(cancel, &self.channel).await.inspect_err(|e| {
            error!("Unable to select chat {}: {}", self.channel, e);
        })?;
        info!(
            "Will post messages to telegram channel {} (id {})",
            chat.display_name(),
            chat.id
        );

        self.chat = Some(chat.clone());
        Ok(chat)
    }

    async fn download_image(&self, cancel: &CancellationToken, url: &str) -> Result<Vec<u8>> {
        let response = self.retry.send(cancel, || self.images.get(url)).await?;
        let response = ensure_success(response, url)?;
        Ok(response.bytes().await?.to_vec())
    }

    async fn send(&self, cancel: &CancellationToken, chat: &Chat, article: &Article) -> Result<Message> {
        match &article.image_url {
            Some(image_url) => {
                let photo = self.download_image(cancel, image_url).await?;
                let caption = format_message_text(
                    &article.title,
                    &article.description,
                    &article.link_url,
                    MAX_MEDIA_CAPTION_LENGTH,
                );
                self.api.send_photo(cancel, chat.id, &photo, &caption).await
            }
            None => {
                let text = format_message_text(
                    &article.title,
                    &article.description,
                    &article.link_url,
                    MAX_TEXT_LENGTH,
                );
                self.api.send_message(cancel, chat.id, &text).await
            }
        }
    }
}

#[async_trait]
impl Consumer for TelegramConsumer {
    async fn on(&mut self, cancel: &CancellationToken, article: Article) -> Result<()> {
        check_cancelled(cancel)?;
        let chat = self.connect(cancel).await?;

        let message = self.send(cancel, &chat, &article).await.inspect_err(|e| {
            error!(
                "Unable to send article {} ({:?}) to telegram: {}",
                article.id, article.title, e
            );
        })?;

        info!(
            "Posted telegram message {} to {}: {:?} ({})",
            message.message_id,
            chat.display_name(),
            article.title,
            article.id
        );
        Ok(())
    }
}
