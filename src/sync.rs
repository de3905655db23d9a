//! Periodic feed synchronization.
//!
//! A [`Syncer`] drives the assembled pipeline once per tick, and again
//! whenever an external trigger arrives. Only one run is in flight at a
//! time.

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::article::Article;
use crate::carbon_copy::CarbonCopy;
use crate::config::Config;
use crate::opengraph::{enrich, Enricher};
use crate::pipeline::{Consumer, Feed, Tee};
use crate::rss::{RssFeed, RssFetcher};
use crate::storage::{use_store, Store};
use crate::telegram::TelegramConsumer;
use crate::Result;

/// Runs a feed into a consumer on a schedule.
pub struct Syncer {
    feed: Box<dyn Feed>,
    consumer: Box<dyn Consumer>,
    interval: Duration,
}

impl Syncer {
    pub fn new(feed: Box<dyn Feed>, consumer: Box<dyn Consumer>, interval: Duration) -> Self {
        Self {
            feed,
            consumer,
            interval,
        }
    }

    /// Assemble the full pipeline described by `config`.
    ///
    /// RSS feed, then OpenGraph enrichment, then the dedup store, delivered
    /// to Telegram and, when configured, to a carbon copy directory.
    pub async fn from_config(config: &Config) -> Result<Self> {
        let fetcher = RssFetcher::new(&config.http, config.feed.max_feed_size)?;
        let feed = RssFeed::new(config.feed.url.clone(), fetcher);
        let feed = enrich(feed, Enricher::new(&config.http)?);
        let store = Store::open(&config.storage.path).await?;
        let feed = use_store(feed, store);

        let telegram = TelegramConsumer::new(&config.telegram, &config.http)?;
        let consumer: Box<dyn Consumer> = match &config.carbon_copy.dir {
            Some(dir) => {
                let mut tee = Tee::new(vec![Box::new(telegram) as Box<dyn Consumer>]);
                tee.push(Box::new(CarbonCopy::new(dir, &config.http)?));
                Box::new(tee)
            }
            None => Box::new(telegram),
        };

        Ok(Self::new(Box::new(feed), consumer, config.feed.interval()))
    }

    /// Read the feed once. Returns the number of delivered articles.
    pub async fn run_once(&mut self, cancel: &CancellationToken) -> Result<usize> {
        let mut counter = Counter {
            inner: &mut *self.consumer,
            count: 0,
        };
        let result = self.feed.read(cancel, &mut counter).await;
        let count = counter.count;

        if count > 0 {
            info!("Sync completed: {} new article(s)", count);
        } else {
            debug!("Sync completed: no new articles");
        }

        result.map(|()| count)
    }

    /// Sync immediately, then on every tick or trigger until `cancel` fires.
    ///
    /// A failed run is logged and retried on the next tick.
    pub async fn run(&mut self, cancel: &CancellationToken, mut trigger: mpsc::Receiver<()>) {
        info!(
            "Syncer started (interval: {} seconds)",
            self.interval.as_secs()
        );

        let mut timer = interval(self.interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = timer.tick() => {}
                Some(()) = trigger.recv() => {
                    info!("Sync triggered");
                }
            }

            match self.run_once(cancel).await {
                Ok(_) => {}
                Err(e) if e.is_cancelled() => break,
                Err(e) => error!("Sync failed: {}", e),
            }
        }

        info!("Syncer stopped");
    }
}

/// Consumer counting articles the downstream accepted.
struct Counter<'a> {
    inner: &'a mut dyn Consumer,
    count: usize,
}

#[async_trait]
impl Consumer for Counter<'_> {
    async fn on(&mut self, cancel: &CancellationToken, article: Article) -> Result<()> {
        debug!("New article from feed: {} ({:?})", article.id, article.title);
        self.inner.on(cancel, article).await?;
        self.count += 1;
        Ok(())
    }
}
