//! Middleware wrapping a feed.

use async_trait::async_trait;
use futures::future::BoxFuture;
use tokio_util::sync::CancellationToken;

use super::{Consumer, Feed};
use crate::article::Article;
use crate::Result;

/// Continuation forwarding an article to the downstream consumer.
///
/// `run` consumes the continuation, so a middleware can forward an item at
/// most once.
pub struct Next<'a> {
    cancel: &'a CancellationToken,
    consumer: &'a mut dyn Consumer,
}

impl<'a> Next<'a> {
    pub fn new(cancel: &'a CancellationToken, consumer: &'a mut dyn Consumer) -> Self {
        Self { cancel, consumer }
    }

    /// Forward `article` downstream and return the consumer's result.
    pub async fn run(self, article: Article) -> Result<()> {
        self.consumer.on(self.cancel, article).await
    }
}

/// Interception layer around a feed.
///
/// The middleware decides whether to call `next`, and may do work before
/// and after it.
#[async_trait]
pub trait Middleware: Send + Sync {
    async fn handle(
        &self,
        cancel: &CancellationToken,
        article: Article,
        next: Next<'_>,
    ) -> Result<()>;
}

/// Adapter turning a function into a [`Middleware`].
///
/// The function returns a boxed future so it may hold on to `next`:
///
/// ```ignore
/// MiddlewareFn::new(|article, next| Box::pin(async move { next.run(article).await }))
/// ```
pub struct MiddlewareFn<F>(F);

impl<F> MiddlewareFn<F>
where
    F: for<'a> Fn(Article, Next<'a>) -> BoxFuture<'a, Result<()>> + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

#[async_trait]
impl<F> Middleware for MiddlewareFn<F>
where
    F: for<'a> Fn(Article, Next<'a>) -> BoxFuture<'a, Result<()>> + Send + Sync,
{
    async fn handle(
        &self,
        _cancel: &CancellationToken,
        article: Article,
        next: Next<'_>,
    ) -> Result<()> {
        (self.0)(article, next).await
    }
}

/// A feed with a middleware applied to each of its items.
pub struct Wrap<F, M> {
    feed: F,
    middleware: M,
}

/// Wrap `feed` with `middleware`.
pub fn wrap<F: Feed, M: Middleware>(feed: F, middleware: M) -> Wrap<F, M> {
    Wrap { feed, middleware }
}

#[async_trait]
impl<F: Feed, M: Middleware> Feed for Wrap<F, M> {
    async fn read(&self, cancel: &CancellationToken, consumer: &mut dyn Consumer) -> Result<()> {
        let mut stage = Stage {
            middleware: &self.middleware,
            downstream: consumer,
        };
        self.feed.read(cancel, &mut stage).await
    }
}

struct Stage<'s, M> {
    middleware: &'s M,
    downstream: &'s mut dyn Consumer,
}

#[async_trait]
impl<'s, M: Middleware> Consumer for Stage<'s, M> {
    async fn on(&mut self, cancel: &CancellationToken, article: Article) -> Result<()> {
        let next = Next::new(cancel, &mut *self.downstream);
        self.middleware.handle(cancel, article, next).await
    }
}
