//! Feed fetching and parsing.

use chrono::{DateTime, Utc};
use feed_rs::model::Entry;
use feed_rs::parser;
use reqwest::Client;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::article::Article;
use crate::config::HttpConfig;
use crate::html::{extract_image_url, normalize_html};
use crate::http::{build_client, RetryPolicy};
use crate::{FeedbotError, Result};

/// Downloads a feed and turns its entries into articles.
pub struct RssFetcher {
    client: Client,
    retry: RetryPolicy,
    max_feed_size: u64,
}

impl RssFetcher {
    /// Create a fetcher using the shared HTTP settings.
    pub fn new(http: &HttpConfig, max_feed_size: u64) -> Result<Self> {
        Ok(Self {
            client: build_client(http, "rss")?,
            retry: RetryPolicy::new("rss", http),
            max_feed_size,
        })
    }

    /// Fetch `url` and parse it into articles, in document order.
    pub async fn fetch(&self, cancel: &CancellationToken, url: &str) -> Result<Vec<Article>> {
        let response = self
            .retry
            .send(cancel, || self.client.get(url))
            .await
            .map_err(|e| match e {
                FeedbotError::Http(msg) => FeedbotError::Feed(format!("failed to fetch feed: {}", msg)),
                other => other,
            })?;

        if !response.status().is_success() {
            return Err(FeedbotError::Feed(format!("HTTP error: {}", response.status())));
        }

        if let Some(content_length) = response.content_length() {
            if content_length > self.max_feed_size {
                return Err(FeedbotError::Feed(format!(
                    "feed too large: {} bytes (max {} bytes)",
                    content_length, self.max_feed_size
                )));
            }
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| FeedbotError::Feed(format!("failed to read response: {}", e)))?;

        if bytes.len() as u64 > self.max_feed_size {
            return Err(FeedbotError::Feed(format!(
                "feed too large: {} bytes (max {} bytes)",
                bytes.len(),
                self.max_feed_size
            )));
        }

        let articles = parse_articles(&bytes, Utc::now())?;
        debug!("Fetched {} article(s) from {}", articles.len(), url);
        Ok(articles)
    }
}

/// Parse feed bytes (RSS, Atom or JSON Feed) into articles.
///
/// Entries without any timestamp get `fetched_at`.
pub fn parse_articles(bytes: &[u8], fetched_at: DateTime<Utc>) -> Result<Vec<Article>> {
    let feed = parser::parse(bytes)
        .map_err(|e| FeedbotError::Feed(format!("failed to parse feed: {}", e)))?;

    feed.entries
        .into_iter()
        .map(|entry| parse_entry(entry, fetched_at))
        .collect()
}

fn parse_entry(entry: Entry, fetched_at: DateTime<Utc>) -> Result<Article> {
    let raw_description = entry
        .summary
        .map(|t| t.content)
        .or(entry.content.and_then(|c| c.body))
        .unwrap_or_default();

    let mut article = Article::new(entry.id)
        .with_title(entry.title.map(|t| t.content).unwrap_or_default())
        .with_published_at(entry.published.or(entry.updated).unwrap_or(fetched_at));

    if let Some(link) = entry.links.first() {
        article = article.with_link(&link.href);
    }

    article.description = normalize_html(&raw_description)?;
    article.image_url = extract_image_url(&raw_description)?;
    article.author = entry
        .authors
        .first()
        .map(|a| a.name.clone())
        .unwrap_or_default();

    for category in &entry.categories {
        article.add_tag(&category.term);
    }

    Ok(article)
}
