//! # Transcription Worker Client
//!
//! Uploads media bytes to the speech-to-text worker as `multipart/form-data`
//! (field `file`) and reads back `{"caption": "..."}`.
//!
//! ## Contract:
//! - **One attempt**: no retries here; a failed call is one failure.
//! - **Hard bound**: the whole exchange (upload, wait, body) must finish
//!   inside `timeout`, or the call is dropped and fails with
//!   `TranscriptionTimeout`.
//! - Anything else that goes wrong once the worker is reachable is
//!   `TranscriptionFailed`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{multipart, Client};
use serde::Deserialize;
use tokio::time::timeout;

use crate::pipeline::{PipelineError, PipelineResult};

/// Default upper bound on a single transcription call.
pub const DEFAULT_TRANSCRIPTION_TIMEOUT: Duration = Duration::from_secs(120);

/// Speech-to-text capability used by the caption pipeline.
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(
        &self,
        bytes: Vec<u8>,
        filename: &str,
        content_type: &str,
    ) -> PipelineResult<String>;
}

#[derive(Debug, Deserialize)]
struct WorkerResponse {
    caption: String,
}

/// HTTP client for the transcription worker's `POST /transcribe`.
pub struct WorkerClient {
    client: Client,
    endpoint: String,
    timeout: Duration,
}

impl WorkerClient {
    pub fn new(base_url: &str, timeout: Duration) -> PipelineResult<Self> {
        let client = Client::builder()
            .build()
            .map_err(|err| PipelineError::Internal(format!("http client: {err}")))?;
        Ok(Self {
            client,
            endpoint: format!("{}/transcribe", base_url.trim_end_matches('/')),
            timeout,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn submit(
        &self,
        bytes: Vec<u8>,
        filename: &str,
        content_type: &str,
    ) -> PipelineResult<String> {
        let part = multipart::Part::bytes(bytes)
            .file_name(filename.to_string())
            .mime_str(content_type)
            .map_err(|err| PipelineError::Internal(format!("mime: {err}")))?;
        let form = multipart::Form::new().part("file", part);

        let response = self
            .client
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .await
            .map_err(|err| PipelineError::TranscriptionFailed(format!("request: {err}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(PipelineError::TranscriptionFailed(format!(
                "status {}: {}",
                status, body
            )));
        }

        let parsed: WorkerResponse = response
            .json()
            .await
            .map_err(|err| PipelineError::TranscriptionFailed(format!("body: {err}")))?;
        Ok(parsed.caption)
    }
}

#[async_trait]
impl Transcriber for WorkerClient {
    async fn transcribe(
        &self,
        bytes: Vec<u8>,
        filename: &str,
        content_type: &str,
    ) -> PipelineResult<String> {
        tracing::debug!(
            endpoint = %self.endpoint,
            filename = %filename,
            bytes = bytes.len(),
            "Sending media to transcription worker"
        );

        match timeout(self.timeout, self.submit(bytes, filename, content_type)).await {
            Ok(result) => result,
            Err(_) => Err(PipelineError::TranscriptionTimeout(self.timeout)),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::{spawn_worker, WorkerBehavior};
    use super::*;
    use std::time::Instant;

    #[tokio::test]
    async fn test_returns_caption() {
        let base = spawn_worker(WorkerBehavior::Respond {
            status: 200,
            body: r#"{"caption":"hello world","cached":false}"#.to_string(),
        })
        .await;
        let client = WorkerClient::new(&base, Duration::from_secs(5)).unwrap();

        let caption = client
            .transcribe(vec![1, 2, 3], "clip.mp3", "audio/mpeg")
            .await
            .unwrap();
        assert_eq!(caption, "hello world");
    }

    #[tokio::test]
    async fn test_non_success_status_is_failure() {
        let base = spawn_worker(WorkerBehavior::Respond {
            status: 500,
            body: r#"{"detail":"Transcription failed"}"#.to_string(),
        })
        .await;
        let client = WorkerClient::new(&base, Duration::from_secs(5)).unwrap();

        let result = client.transcribe(vec![0; 16], "clip.mp4", "video/mp4").await;
        assert!(matches!(result, Err(PipelineError::TranscriptionFailed(_))));
    }

    #[tokio::test]
    async fn test_malformed_body_is_failure() {
        let base = spawn_worker(WorkerBehavior::Respond {
            status: 200,
            body: r#"{"text":"wrong field"}"#.to_string(),
        })
        .await;
        let client = WorkerClient::new(&base, Duration::from_secs(5)).unwrap();

        let result = client.transcribe(vec![0; 16], "clip.mp4", "video/mp4").await;
        assert!(matches!(result, Err(PipelineError::TranscriptionFailed(_))));
    }

    #[tokio::test]
    async fn test_unresponsive_worker_times_out_within_bound() {
        let base = spawn_worker(WorkerBehavior::Hang).await;
        let bound = Duration::from_millis(300);
        let client = WorkerClient::new(&base, bound).unwrap();

        let started = Instant::now();
        let result = client.transcribe(vec![0; 16], "clip.mp4", "video/mp4").await;
        let elapsed = started.elapsed();

        assert!(matches!(result, Err(PipelineError::TranscriptionTimeout(d)) if d == bound));
        assert!(elapsed >= bound);
        assert!(elapsed < bound + Duration::from_secs(2), "took {:?}", elapsed);
    }

    #[test]
    fn test_endpoint_joins_base_url() {
        let client = WorkerClient::new("http://localhost:8000/", DEFAULT_TRANSCRIPTION_TIMEOUT).unwrap();
        assert_eq!(client.endpoint(), "http://localhost:8000/transcribe");
    }
}
