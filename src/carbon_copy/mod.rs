//! Local carbon copies of delivered articles.
//!
//! [`CarbonCopy`] downloads the page each article links to and saves it
//! under a directory, one HTML file per article.

mod filename;

pub use filename::extract_file_name;

use std::path::PathBuf;

use async_trait::async_trait;
use reqwest::Client;
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::article::Article;
use crate::config::HttpConfig;
use crate::http::{build_client, ensure_success, RetryPolicy};
use crate::pipeline::{check_cancelled, Consumer};
use crate::Result;

/// Consumer saving each article's web page to `dir`.
pub struct CarbonCopy {
    dir: PathBuf,
    client: Client,
    retry: RetryPolicy,
}

impl CarbonCopy {
    pub fn new(dir: impl Into<PathBuf>, http: &HttpConfig) -> Result<Self> {
        let dir = dir.into();
        info!("Will store local copies of feed items in {:?}", dir);
        Ok(Self {
            dir,
            client: build_client(http, "carbon-copy")?,
            retry: RetryPolicy::new("carbon-copy", http),
        })
    }

    async fn save(&self, cancel: &CancellationToken, article: &Article) -> Result<PathBuf> {
        let path = self.dir.join(extract_file_name(article));
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let response = self
            .retry
            .send(cancel, || self.client.get(&article.link_url))
            .await?;
        let response = ensure_success(response, &article.link_url)?;
        let body = response.bytes().await?;

        let mut file = tokio::fs::File::create(&path).await?;
        file.write_all(&body).await?;
        file.flush().await?;

        Ok(path)
    }
}

#[async_trait]
impl Consumer for CarbonCopy {
    async fn on(&mut self, cancel: &CancellationToken, article: Article) -> Result<()> {
        check_cancelled(cancel)?;

        let path = self.save(cancel, &article).await.inspect_err(|e| {
            error!("Unable to store local copy of {}: {}", article.id, e);
        })?;

        info!("Feed item {} has been stored locally as {:?}", article.id, path);
        Ok(())
    }
}
