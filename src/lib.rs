//! feedbot - RSS to Telegram relay
//!
//! Polls an RSS feed, enriches each article with OpenGraph metadata,
//! skips articles already delivered and posts the rest to a Telegram
//! channel. The stages are composed with the push-based combinators in
//! [`pipeline`].

pub mod article;
pub mod carbon_copy;
pub mod config;
pub mod error;
pub mod html;
pub mod http;
pub mod logging;
pub mod opengraph;
pub mod pipeline;
pub mod rss;
pub mod storage;
pub mod sync;
pub mod telegram;

pub use article::Article;
pub use config::Config;
pub use error::{FeedbotError, Result};
pub use pipeline::{Consumer, Feed};
pub use storage::{use_store, Store};
pub use sync::Syncer;
