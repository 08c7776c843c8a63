use async_trait::async_trait;
use bytes::Bytes;
use tracing::debug;

use crate::{LoadError, LoadResult, LoaderConfig};

/// Raw byte retrieval - implemented by every transport the loader can use
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetch the full body at `url`.
    ///
    /// Non-success statuses and transport failures are both `LoadError::Fetch`.
    async fn fetch(&self, url: &str) -> LoadResult<Bytes>;
}

/// HTTP GET over a shared `reqwest` client.
///
/// The client is built without content-decoding, so a gzip body arrives
/// exactly as the server stored it.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Build a fetcher honouring the config's request timeout
    pub fn from_config(config: &LoaderConfig) -> LoadResult<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }

        let client = builder.build().map_err(LoadError::transport)?;
        Ok(Self { client })
    }

    /// Wrap an existing client
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> LoadResult<Bytes> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(LoadError::transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(LoadError::fetch_status(
                status.as_u16(),
                status.canonical_reason().unwrap_or("Unknown status"),
            ));
        }

        let body = response.bytes().await.map_err(LoadError::transport)?;
        debug!("Fetched {} bytes from {}", body.len(), url);
        Ok(body)
    }
}
