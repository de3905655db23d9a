//! OpenGraph enrichment.
//!
//! Downloads the page an article links to and overlays its `og:title` and
//! `og:image` tags onto the article. Enrichment is best-effort: any failure
//! is logged and the article passes through unchanged.

use std::collections::VecDeque;

use async_trait::async_trait;
use reqwest::Client;
use scraper::{ElementRef, Html};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::article::Article;
use crate::config::HttpConfig;
use crate::http::{build_client, ensure_success, RetryPolicy};
use crate::pipeline::{transform, Feed, Transform, Transformation, Wrap};
use crate::{FeedbotError, Result};

const TITLE_PROPERTY: &str = "og:title";
const IMAGE_PROPERTY: &str = "og:image";

/// Metadata found in a page's `<head>`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageTags {
    pub title: Option<String>,
    pub image_url: Option<String>,
}

impl PageTags {
    /// Overlay the found tags onto `article`.
    pub fn apply(&self, article: &mut Article) {
        if let Some(title) = &self.title {
            article.title = title.clone();
        }
        if let Some(image_url) = &self.image_url {
            article.image_url = Some(image_url.clone());
        }
    }
}

/// Extract OpenGraph tags from an HTML page.
///
/// Only direct `<meta>` children of `<head>` are considered. The first
/// occurrence of each property wins.
pub fn parse_tags(page: &str) -> PageTags {
    let document = Html::parse_document(page);
    let mut tags = PageTags::default();

    let Some(head) = find_element(document.root_element(), "html")
        .and_then(|html| find_element(html, "head"))
    else {
        return tags;
    };

    for meta in head
        .children()
        .filter_map(ElementRef::wrap)
        .filter(|e| e.value().name() == "meta")
    {
        let Some(property) = meta.value().attr("property") else {
            continue;
        };
        let content = meta.value().attr("content").unwrap_or_default();

        let slot = match property {
            TITLE_PROPERTY => &mut tags.title,
            IMAGE_PROPERTY => &mut tags.image_url,
            _ => continue,
        };
        if slot.is_none() {
            *slot = Some(content.to_string());
        }
    }

    tags
}

/// Breadth-first search for an element named `name`, including `root`.
fn find_element<'a>(root: ElementRef<'a>, name: &str) -> Option<ElementRef<'a>> {
    let mut queue = VecDeque::from([root]);

    while let Some(element) = queue.pop_front() {
        if element.value().name() == name {
            return Some(element);
        }
        queue.extend(element.children().filter_map(ElementRef::wrap));
    }

    None
}

/// Transformation fetching OpenGraph tags for each article.
pub struct Enricher {
    client: Client,
    retry: RetryPolicy,
}

impl Enricher {
    pub fn new(http: &HttpConfig) -> Result<Self> {
        Ok(Self {
            client: build_client(http, "opengraph")?,
            retry: RetryPolicy::new("opengraph", http),
        })
    }

    /// Download `url` and parse its tags.
    pub async fn load_tags(&self, cancel: &CancellationToken, url: &str) -> Result<PageTags> {
        if url.is_empty() {
            return Err(FeedbotError::Http("article has no link".to_string()));
        }

        let response = self.retry.send(cancel, || self.client.get(url)).await?;
        let response = ensure_success(response, url)?;
        let body = response.text().await?;

        Ok(parse_tags(&body))
    }
}

#[async_trait]
impl Transformation for Enricher {
    async fn apply(&self, cancel: &CancellationToken, article: &mut Article) -> Result<()> {
        match self.load_tags(cancel, &article.link_url).await {
            Ok(tags) => {
                debug!("OpenGraph tags for {}: {:?}", article.link_url, tags);
                tags.apply(article);
                Ok(())
            }
            Err(FeedbotError::Cancelled) => Err(FeedbotError::Cancelled),
            Err(e) => {
                warn!("Unable to load web page {:?}: {}", article.link_url, e);
                Ok(())
            }
        }
    }
}

/// Enrich every article of `feed` with OpenGraph tags.
pub fn enrich<F: Feed>(feed: F, enricher: Enricher) -> Wrap<F, Transform<Enricher>> {
    transform(feed, enricher)
}
