//! Push-based article pipeline.
//!
//! A [`Feed`] drives its source once per [`Feed::read`] call and pushes every
//! article into a [`Consumer`], in source order, stopping at the first error.
//! Feeds are composed by wrapping them in middleware ([`wrap`], [`filter`],
//! [`transform`]); consumers are fanned out with [`Tee`].
//!
//! No combinator buffers or reorders items. Every error is propagated
//! verbatim to the caller of `read`.

mod filter;
mod memory;
mod tee;
mod transform;
mod wrap;

pub use filter::{filter, Filter, Predicate, PredicateFn};
pub use memory::{CollectingConsumer, MemoryFeed};
pub use tee::Tee;
pub use transform::{transform, Transform, TransformFn, Transformation};
pub use wrap::{wrap, Middleware, MiddlewareFn, Next, Wrap};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::article::Article;
use crate::Result;

/// A source of articles.
///
/// A feed keeps no cursor between reads; each call to `read` is an
/// independent pass over the source.
#[async_trait]
pub trait Feed: Send + Sync {
    /// Push every available article into `consumer`.
    async fn read(&self, cancel: &CancellationToken, consumer: &mut dyn Consumer) -> Result<()>;
}

/// A sink receiving one article at a time.
#[async_trait]
pub trait Consumer: Send {
    /// Handle a single article. An error aborts the current read.
    async fn on(&mut self, cancel: &CancellationToken, article: Article) -> Result<()>;
}

#[async_trait]
impl<F: Feed + ?Sized> Feed for Box<F> {
    async fn read(&self, cancel: &CancellationToken, consumer: &mut dyn Consumer) -> Result<()> {
        (**self).read(cancel, consumer).await
    }
}

#[async_trait]
impl<F: Feed + ?Sized> Feed for std::sync::Arc<F> {
    async fn read(&self, cancel: &CancellationToken, consumer: &mut dyn Consumer) -> Result<()> {
        (**self).read(cancel, consumer).await
    }
}

#[async_trait]
impl<C: Consumer + ?Sized> Consumer for Box<C> {
    async fn on(&mut self, cancel: &CancellationToken, article: Article) -> Result<()> {
        (**self).on(cancel, article).await
    }
}

#[async_trait]
impl<C: Consumer + ?Sized> Consumer for &mut C {
    async fn on(&mut self, cancel: &CancellationToken, article: Article) -> Result<()> {
        (**self).on(cancel, article).await
    }
}

/// Adapter turning a plain function into a [`Consumer`].
pub struct ConsumerFn<F>(pub F);

#[async_trait]
impl<F> Consumer for ConsumerFn<F>
where
    F: FnMut(Article) -> Result<()> + Send,
{
    async fn on(&mut self, _cancel: &CancellationToken, article: Article) -> Result<()> {
        (self.0)(article)
    }
}

/// Return `Cancelled` if the token has fired.
pub fn check_cancelled(cancel: &CancellationToken) -> Result<()> {
    if cancel.is_cancelled() {
        return Err(crate::FeedbotError::Cancelled);
    }
    Ok(())
}
