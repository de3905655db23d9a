//! Fan-out consumer.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use super::Consumer;
use crate::article::Article;
use crate::Result;

/// Delivers each article to several consumers in order.
///
/// The first failing consumer stops the fan-out for that article; the
/// consumers after it are not called. Consumers before it have already
/// received the article.
pub struct Tee<'a> {
    consumers: Vec<Box<dyn Consumer + 'a>>,
}

impl<'a> Tee<'a> {
    pub fn new(consumers: Vec<Box<dyn Consumer + 'a>>) -> Self {
        Self { consumers }
    }

    /// Append another consumer.
    pub fn push(&mut self, consumer: Box<dyn Consumer + 'a>) {
        self.consumers.push(consumer);
    }

    pub fn len(&self) -> usize {
        self.consumers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.consumers.is_empty()
    }
}

#[async_trait]
impl<'a> Consumer for Tee<'a> {
    async fn on(&mut self, cancel: &CancellationToken, article: Article) -> Result<()> {
        for consumer in self.consumers.iter_mut() {
            consumer.on(cancel, article.clone()).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::*;
    use super::super::{CollectingConsumer, ConsumerFn, Feed, MemoryFeed};
    use super::*;
    use crate::FeedbotError;

    #[tokio::test]
    async fn test_tee() {
        let input = articles(&["1", "2", "3"]);
        let mut c1 = CollectingConsumer::new();
        let mut c2 = CollectingConsumer::new();
        let mut c3 = CollectingConsumer::new();

        {
            let mut tee = Tee::new(vec![Box::new(&mut c1), Box::new(&mut c2), Box::new(&mut c3)]);
            MemoryFeed::new(input.clone())
                .read(&CancellationToken::new(), &mut tee)
                .await
                .unwrap();
        }

        assert_eq!(c1.items(), input.as_slice());
        assert_eq!(c2.items(), input.as_slice());
        assert_eq!(c3.items(), input.as_slice());
    }

    #[tokio::test]
    async fn test_tee_stops_at_first_failure() {
        let mut first = CollectingConsumer::new();
        let mut last = CollectingConsumer::new();

        let result = {
            let failing = ConsumerFn(|_: Article| -> Result<()> {
                Err(FeedbotError::Telegram("down".to_string()))
            });
            let mut tee = Tee::new(vec![
                Box::new(&mut first),
                Box::new(failing),
                Box::new(&mut last),
            ]);
            MemoryFeed::new(articles(&["1", "2"]))
                .read(&CancellationToken::new(), &mut tee)
                .await
        };

        assert!(matches!(result, Err(FeedbotError::Telegram(_))));
        assert_eq!(first.items(), articles(&["1"]).as_slice());
        assert!(last.items().is_empty());
    }

    #[test]
    fn test_tee_len() {
        let mut tee = Tee::new(Vec::new());
        assert!(tee.is_empty());
        tee.push(Box::new(CollectingConsumer::new()));
        assert_eq!(tee.len(), 1);
    }
}
