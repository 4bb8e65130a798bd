// Icon asset fetcher - HTTP(S) URLs via reqwest, anything else from disk
use anyhow::Context;
use async_trait::async_trait;
use bytes::Bytes;

use crate::application::ports::ImageFetcher;
use crate::error::IconError;

#[derive(Debug, Clone, Default)]
pub struct AssetFetcher {
    client: reqwest::Client,
}

impl AssetFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    async fn fetch_http(&self, url: &str) -> anyhow::Result<Bytes> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to send request")?;

        if !response.status().is_success() {
            anyhow::bail!("asset request failed with status {}", response.status());
        }

        response.bytes().await.context("Failed to read asset body")
    }
}

#[async_trait]
impl ImageFetcher for AssetFetcher {
    async fn fetch(&self, url: &str) -> Result<Bytes, IconError> {
        let fetched = if url.starts_with("http://") || url.starts_with("https://") {
            self.fetch_http(url).await
        } else {
            let path = url.strip_prefix("file://").unwrap_or(url);
            tokio::fs::read(path)
                .await
                .map(Bytes::from)
                .with_context(|| format!("Failed to read {}", path))
        };

        fetched.map_err(|e| IconError::Fetch {
            url: url.to_string(),
            reason: format!("{:#}", e),
        })
    }
}
