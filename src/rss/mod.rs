//! RSS feed source.
//!
//! Fetches an RSS/Atom document over HTTP, converts entries into
//! [`Article`](crate::article::Article)s and pushes them oldest first.

pub mod feed;
pub mod fetcher;

pub use feed::{sort_by_time, RssFeed};
pub use fetcher::{parse_articles, RssFetcher};
