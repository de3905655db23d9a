//! Filtering combinator.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use super::wrap::{wrap, Middleware, Next, Wrap};
use super::Feed;
use crate::article::Article;
use crate::Result;

/// Decides whether an article continues down the pipeline.
#[async_trait]
pub trait Predicate: Send + Sync {
    async fn keep(&self, cancel: &CancellationToken, article: &Article) -> Result<bool>;
}

/// Adapter turning a plain function into a [`Predicate`].
pub struct PredicateFn<F>(pub F);

#[async_trait]
impl<F> Predicate for PredicateFn<F>
where
    F: Fn(&Article) -> Result<bool> + Send + Sync,
{
    async fn keep(&self, _cancel: &CancellationToken, article: &Article) -> Result<bool> {
        (self.0)(article)
    }
}

/// Middleware forwarding only the articles accepted by a predicate.
pub struct Filter<P> {
    predicate: P,
}

impl<P: Predicate> Filter<P> {
    pub fn new(predicate: P) -> Self {
        Self { predicate }
    }
}

#[async_trait]
impl<P: Predicate> Middleware for Filter<P> {
    async fn handle(
        &self,
        cancel: &CancellationToken,
        article: Article,
        next: Next<'_>,
    ) -> Result<()> {
        if self.predicate.keep(cancel, &article).await? {
            next.run(article).await
        } else {
            Ok(())
        }
    }
}

/// Drop the articles of `feed` that `predicate` rejects.
pub fn filter<F: Feed, P: Predicate>(feed: F, predicate: P) -> Wrap<F, Filter<P>> {
    wrap(feed, Filter::new(predicate))
}
