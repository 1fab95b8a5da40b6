use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use crate::pipeline::{PipelineError, PipelineResult};

/// Fetches raw media bytes from a resolved download URL.
#[async_trait]
pub trait MediaDownloader: Send + Sync {
    async fn download(&self, url: &str) -> PipelineResult<Vec<u8>>;
}

/// Plain HTTP GET against the media CDN.
pub struct HttpDownloader {
    client: Client,
}

impl HttpDownloader {
    pub fn new(timeout: Duration, user_agent: &str) -> PipelineResult<Self> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()
            .map_err(|err| PipelineError::Internal(format!("http client: {err}")))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl MediaDownloader for HttpDownloader {
    async fn download(&self, url: &str) -> PipelineResult<Vec<u8>> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|err| PipelineError::DownloadFailed(format!("request: {err}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PipelineError::DownloadFailed(format!(
                "status {}",
                status
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|err| PipelineError::DownloadFailed(format!("body: {err}")))?;

        tracing::debug!(bytes = bytes.len(), "Downloaded media");
        Ok(bytes.to_vec())
    }
}
