//! In-memory feed and consumer.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use super::{check_cancelled, Consumer, Feed};
use crate::article::Article;
use crate::Result;

/// A feed backed by a fixed list of articles.
#[derive(Debug, Clone, Default)]
pub struct MemoryFeed {
    articles: Vec<Article>,
}

impl MemoryFeed {
    pub fn new(articles: Vec<Article>) -> Self {
        Self { articles }
    }
}

#[async_trait]
impl Feed for MemoryFeed {
    async fn read(&self, cancel: &CancellationToken, consumer: &mut dyn Consumer) -> Result<()> {
        for article in &self.articles {
            check_cancelled(cancel)?;
            consumer.on(cancel, article.clone()).await?;
        }
        Ok(())
    }
}

/// A consumer that keeps every article it receives.
#[derive(Debug, Clone, Default)]
pub struct CollectingConsumer {
    items: Vec<Article>,
}

impl CollectingConsumer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Articles received so far.
    pub fn items(&self) -> &[Article] {
        &self.items
    }

    pub fn into_items(self) -> Vec<Article> {
        self.items
    }
}

#[async_trait]
impl Consumer for CollectingConsumer {
    async fn on(&mut self, _cancel: &CancellationToken, article: Article) -> Result<()> {
        self.items.push(article);
        Ok(())
    }
}
