//! Transforming combinator.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use super::wrap::{wrap, Middleware, Next, Wrap};
use super::Feed;
use crate::article::Article;
use crate::Result;

/// Mutates an article in place before it is forwarded.
#[async_trait]
pub trait Transformation: Send + Sync {
    async fn apply(&self, cancel: &CancellationToken, article: &mut Article) -> Result<()>;
}

/// Adapter turning a plain function into a [`Transformation`].
pub struct TransformFn<F>(pub F);

#[async_trait]
impl<F> Transformation for TransformFn<F>
where
    F: Fn(&mut Article) -> Result<()> + Send + Sync,
{
    async fn apply(&self, _cancel: &CancellationToken, article: &mut Article) -> Result<()> {
        (self.0)(article)
    }
}

/// Middleware applying a transformation to every article.
pub struct Transform<T> {
    transformation: T,
}

impl<T: Transformation> Transform<T> {
    pub fn new(transformation: T) -> Self {
        Self { transformation }
    }
}

#[async_trait]
impl<T: Transformation> Middleware for Transform<T> {
    async fn handle(
        &self,
        cancel: &CancellationToken,
        mut article: Article,
        next: Next<'_>,
    ) -> Result<()> {
        self.transformation.apply(cancel, &mut article).await?;
        next.run(article).await
    }
}

/// Apply `transformation` to every article of `feed`.
pub fn transform<F: Feed, T: Transformation>(feed: F, transformation: T) -> Wrap<F, Transform<T>> {
    wrap(feed, Transform::new(transformation))
}
