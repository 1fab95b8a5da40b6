//! tikwm.com API provider.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::media::{CandidateUrls, MediaMetadata};
use crate::pipeline::{PipelineError, PipelineResult};

use super::MetadataProvider;

pub struct TikwmProvider {
    client: Client,
    api_url: String,
}

impl TikwmProvider {
    pub fn new(api_url: String, timeout: Duration) -> PipelineResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| PipelineError::Internal(format!("http client: {err}")))?;
        Ok(Self { client, api_url })
    }
}

#[derive(Debug, Deserialize)]
struct TikwmResponse {
    code: i64,
    #[serde(default)]
    msg: String,
    data: Option<TikwmVideo>,
}

#[derive(Debug, Deserialize)]
struct TikwmVideo {
    id: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    duration: f64,
    #[serde(default)]
    cover: String,
    origin_cover: Option<String>,
    play: Option<String>,
    hdplay: Option<String>,
    wmplay: Option<String>,
    music: Option<String>,
    author: TikwmAuthor,
}

#[derive(Debug, Deserialize)]
struct TikwmAuthor {
    #[serde(default)]
    unique_id: String,
    #[serde(default)]
    nickname: String,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

impl TikwmResponse {
    fn into_metadata(self) -> PipelineResult<MediaMetadata> {
        if self.code != 0 {
            let msg = if self.msg.is_empty() {
                format!("provider returned code {}", self.code)
            } else {
                self.msg
            };
            return Err(PipelineError::ExtractionFailed(msg));
        }

        let video = self.data.ok_or_else(|| {
            PipelineError::ExtractionFailed("provider response has no data".to_string())
        })?;

        let author_name = if video.author.nickname.is_empty() {
            video.author.unique_id.clone()
        } else {
            video.author.nickname
        };

        Ok(MediaMetadata {
            id: video.id,
            title: video.title,
            author_name,
            author_handle: non_empty(Some(video.author.unique_id)),
            duration_seconds: video.duration,
            thumbnail_url: video.cover,
            origin_cover: non_empty(video.origin_cover),
            description: None,
            candidate_urls: CandidateUrls {
                standard: non_empty(video.play),
                high_def: non_empty(video.hdplay),
                watermarked: non_empty(video.wmplay),
            },
            audio_url: non_empty(video.music),
        })
    }
}

#[async_trait]
impl MetadataProvider for TikwmProvider {
    fn id(&self) -> &str {
        "api"
    }

    async fn extract(&self, url: &str) -> PipelineResult<MediaMetadata> {
        let response = self
            .client
            .get(&self.api_url)
            .query(&[("url", url), ("hd", "1")])
            .send()
            .await
            .map_err(|err| PipelineError::ExtractionFailed(format!("request: {err}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PipelineError::ExtractionFailed(format!("status {}", status)));
        }

        let body = response
            .bytes()
            .await
            .map_err(|err| PipelineError::ExtractionFailed(format!("body: {err}")))?;
        let parsed: TikwmResponse = serde_json::from_slice(&body)?;
        parsed.into_metadata()
    }
}
