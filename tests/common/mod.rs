//! Test helpers for end-to-end tests.
//!
//! Builds feed documents, web pages and configurations pointing at a mock
//! HTTP server.

#![allow(dead_code)]

use std::path::Path;

use feedbot::config::{Config, HttpConfig};

/// A feed item served by the mock feed.
pub struct TestItem {
    pub guid: String,
    pub title: String,
    pub link: String,
    pub description: String,
    pub pub_date: String,
}

impl TestItem {
    pub fn new(guid: &str, title: &str, link: &str, pub_date: &str) -> Self {
        Self {
            guid: guid.to_string(),
            title: title.to_string(),
            link: link.to_string(),
            description: String::new(),
            pub_date: pub_date.to_string(),
        }
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }
}

/// Render an RSS 2.0 document.
pub fn rss_document(items: &[TestItem]) -> String {
    let mut body = String::from(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Test feed</title>
    <link>https://example.com/</link>
    <description>Test</description>
"#,
    );

    for item in items {
        body.push_str(&format!(
            r#"    <item>
      <title>{}</title>
      <guid>{}</guid>
      <link>{}</link>
      <description><![CDATA[{}]]></description>
      <pubDate>{}</pubDate>
    </item>
"#,
            item.title, item.guid, item.link, item.description, item.pub_date
        ));
    }

    body.push_str("  </channel>\n</rss>\n");
    body
}

/// Render a web page carrying OpenGraph tags.
pub fn og_page(title: Option<&str>, image: Option<&str>) -> String {
    let mut head = String::from("<title>Page</title>\n");
    if let Some(title) = title {
        head.push_str(&format!(
            "<meta property=\"og:title\" content=\"{}\" />\n",
            title
        ));
    }
    if let Some(image) = image {
        head.push_str(&format!(
            "<meta property=\"og:image\" content=\"{}\" />\n",
            image
        ));
    }
    format!(
        "<html>\n<head>\n{}</head>\n<body><p>Body</p></body>\n</html>\n",
        head
    )
}

/// HTTP settings with short retry waits.
pub fn fast_http() -> HttpConfig {
    HttpConfig {
        max_retries: 1,
        retry_min_wait_ms: 1,
        retry_max_wait_ms: 2,
        ..Default::default()
    }
}

/// A configuration using `base_url` for both the feed and the Bot API.
pub fn test_config(base_url: &str, store_path: &Path) -> Config {
    let mut config = Config::default();
    config.feed.url = format!("{}/rss", base_url);
    config.telegram.token = "123:abc".to_string();
    config.telegram.channel = "@news".to_string();
    config.telegram.api_url = base_url.to_string();
    config.storage.path = store_path.to_string_lossy().into_owned();
    config.http = fast_http();
    config
}
