//! Root feed reading articles from an RSS/Atom URL.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::article::Article;
use crate::pipeline::{check_cancelled, Consumer, Feed};
use crate::rss::fetcher::RssFetcher;
use crate::Result;

/// A [`Feed`] backed by a remote RSS/Atom document.
///
/// Every read fetches the document again and pushes its entries oldest
/// first.
pub struct RssFeed {
    url: String,
    fetcher: RssFetcher,
}

impl RssFeed {
    pub fn new(url: impl Into<String>, fetcher: RssFetcher) -> Self {
        Self {
            url: url.into(),
            fetcher,
        }
    }
}

/// Stable sort by publication time, oldest first.
pub fn sort_by_time(articles: &mut [Article]) {
    articles.sort_by_key(|article| article.published_at);
}

#[async_trait]
impl Feed for RssFeed {
    async fn read(&self, cancel: &CancellationToken, consumer: &mut dyn Consumer) -> Result<()> {
        check_cancelled(cancel)?;
        let mut articles = self.fetcher.fetch(cancel, &self.url).await?;
        sort_by_time(&mut articles);

        for article in articles {
            check_cancelled(cancel)?;
            debug!("Feed item {} ({})", article.id, article.title);
            consumer.on(cancel, article).await?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use httpmock::MockServer;

    use super::*;
    use crate::config::HttpConfig;
    use crate::pipeline::{CollectingConsumer, ConsumerFn};
    use crate::FeedbotError;

    const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Test</title>
    <item>
      <title>Newest</title>
      <guid>c</guid>
      <link>https://example.com/c</link>
      <pubDate>Wed, 03 Jan 2024 10:00:00 GMT</pubDate>
    </item>
    <item>
      <title>Oldest</title>
      <guid>a</guid>
      <link>https://example.com/a</link>
      <pubDate>Mon, 01 Jan 2024 10:00:00 GMT</pubDate>
    </item>
    <item>
      <title>Middle</title>
      <guid>b</guid>
      <link>https://example.com/b</link>
      <pubDate>Tue, 02 Jan 2024 10:00:00 GMT</pubDate>
    </item>
  </channel>
</rss>"#;

    fn fast_http() -> HttpConfig {
        HttpConfig {
            max_retries: 1,
            retry_min_wait_ms: 1,
            retry_max_wait_ms: 2,
            ..Default::default()
        }
    }

    async fn feed_server() -> MockServer {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(httpmock::Method::GET).path("/rss");
                then.status(200)
                    .header("content-type", "application/rss+xml")
                    .body(FEED);
            })
            .await;
        server
    }

    #[test]
    fn test_sort_by_time() {
        let mut articles = vec![
            Article::new("2").with_published_at(Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap()),
            Article::new("1").with_published_at(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()),
            Article::new("3").with_published_at(Utc.with_ymd_and_hms(2024, 1, 3, 0, 0, 0).unwrap()),
        ];
        sort_by_time(&mut articles);
        let ids: Vec<&str> = articles.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2", "3"]);
    }

    #[tokio::test]
    async fn test_read_sorts_oldest_first() {
        let server = feed_server().await;
        let feed = RssFeed::new(
            server.url("/rss"),
            RssFetcher::new(&fast_http(), 1024 * 1024).unwrap(),
        );

        let mut consumer = CollectingConsumer::new();
        feed.read(&CancellationToken::new(), &mut consumer)
            .await
            .unwrap();

        let ids: Vec<&str> = consumer.items().iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_read_stops_on_consumer_error() {
        let server = feed_server().await;
        let feed = RssFeed::new(
            server.url("/rss"),
            RssFetcher::new(&fast_http(), 1024 * 1024).unwrap(),
        );

        let mut seen = Vec::new();
        let mut consumer = ConsumerFn(|article: Article| -> Result<()> {
            seen.push(article.id);
            Err(FeedbotError::Telegram("down".to_string()))
        });
        let result = feed.read(&CancellationToken::new(), &mut consumer).await;
        drop(consumer);

        assert!(matches!(result, Err(FeedbotError::Telegram(_))));
        assert_eq!(seen, vec!["a"]);
    }

    #[tokio::test]
    async fn test_read_not_found() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(httpmock::Method::GET).path("/rss");
                then.status(404);
            })
            .await;
        let feed = RssFeed::new(
            server.url("/rss"),
            RssFetcher::new(&fast_http(), 1024 * 1024).unwrap(),
        );

        let mut consumer = CollectingConsumer::new();
        let result = feed.read(&CancellationToken::new(), &mut consumer).await;

        assert!(matches!(result, Err(FeedbotError::Feed(_))));
        assert_eq!(mock.hits_async().await, 1);
    }

    #[tokio::test]
    async fn test_read_rejects_oversized_feed() {
        let server = feed_server().await;
        let feed = RssFeed::new(server.url("/rss"), RssFetcher::new(&fast_http(), 16).unwrap());

        let mut consumer = CollectingConsumer::new();
        let result = feed.read(&CancellationToken::new(), &mut consumer).await;

        match result {
            Err(FeedbotError::Feed(msg)) => assert!(msg.contains("feed too large")),
            other => panic!("expected feed error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_read_cancelled() {
        let server = feed_server().await;
        let feed = RssFeed::new(
            server.url("/rss"),
            RssFetcher::new(&fast_http(), 1024 * 1024).unwrap(),
        );
        let cancel = CancellationToken::new();
        cancel.cancel();

        let mut consumer = CollectingConsumer::new();
        let result = feed.read(&cancel, &mut consumer).await;

        assert!(matches!(result, Err(FeedbotError::Cancelled)));
        assert!(consumer.items().is_empty());
    }
}
