//! Concurrency tests for the dedup store.
//!
//! Two stores opened on the same file must never both deliver an article.

use std::sync::{Arc, Mutex};

use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

use feedbot::pipeline::{ConsumerFn, MemoryFeed};
use feedbot::{use_store, Article, Feed, Result, Store};

fn articles(count: usize) -> Vec<Article> {
    (0..count).map(|i| Article::new(format!("id-{}", i))).collect()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_two_stores_deliver_each_article_once() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("shared.db");

    let first = Store::open(&path).await.unwrap();
    let second = Store::open(&path).await.unwrap();

    let delivered = Arc::new(Mutex::new(Vec::new()));

    let run = |store: Store| {
        let delivered = delivered.clone();
        async move {
            let feed = use_store(MemoryFeed::new(articles(20)), store);
            let mut consumer = ConsumerFn(move |article: Article| -> Result<()> {
                delivered.lock().unwrap().push(article.id);
                Ok(())
            });
            feed.read(&CancellationToken::new(), &mut consumer).await
        }
    };

    let (a, b) = tokio::join!(
        tokio::spawn(run(first.clone())),
        tokio::spawn(run(second.clone()))
    );
    a.unwrap().unwrap();
    b.unwrap().unwrap();

    let mut ids = delivered.lock().unwrap().clone();
    assert_eq!(ids.len(), 20);
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 20);
    assert_eq!(first.count().await.unwrap(), 20);
}
