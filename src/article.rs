//! Article record flowing through the pipeline.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single feed item.
///
/// `id` is the only field used for identity. Two articles with the same
/// `id` are the same item regardless of their other fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    /// Feed-native GUID.
    pub id: String,
    /// Title, possibly overridden by enrichment.
    pub title: String,
    /// Publication time.
    pub published_at: DateTime<Utc>,
    /// Normalized description text.
    pub description: String,
    /// Link to the article with the query string removed.
    pub link_url: String,
    /// Lead image, if any.
    pub image_url: Option<String>,
    /// Author name, empty when unknown.
    pub author: String,
    /// Lowercase, deduplicated tags.
    pub tags: BTreeSet<String>,
}

impl Article {
    /// Create an article with the given ID and empty fields.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    /// Set the title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Set the publication time.
    pub fn with_published_at(mut self, published_at: DateTime<Utc>) -> Self {
        self.published_at = published_at;
        self
    }

    /// Set the link, removing its query string.
    pub fn with_link(mut self, link: &str) -> Self {
        self.link_url = strip_query(link);
        self
    }

    /// Add a tag. Tags are stored lowercase; duplicates collapse.
    pub fn add_tag(&mut self, tag: &str) {
        let tag = tag.trim().to_lowercase();
        if !tag.is_empty() {
            self.tags.insert(tag);
        }
    }

    /// Key used by the dedup store.
    pub fn store_key(&self) -> String {
        self.id.to_lowercase()
    }
}

/// Remove the query string from a URL, keeping everything else.
///
/// Strings that don't parse as absolute URLs are cut at the first `?`,
/// preserving any fragment.
pub fn strip_query(link: &str) -> String {
    match url::Url::parse(link) {
        Ok(mut parsed) => {
            parsed.set_query(None);
            parsed.to_string()
        }
        Err(_) => match link.split_once('?') {
            Some((head, rest)) => match rest.split_once('#') {
                Some((_, fragment)) => format!("{}#{}", head, fragment),
                None => head.to_string(),
            },
            None => link.to_string(),
        },
    }
}
