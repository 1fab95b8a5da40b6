//! `yt-dlp` provider: runs the executable with `-J` and maps its JSON dump.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command;
use tokio::time::timeout;

use crate::media::{CandidateUrls, MediaMetadata};
use crate::pipeline::{PipelineError, PipelineResult};

use super::MetadataProvider;

const HD_MIN_HEIGHT: u32 = 720;

pub struct YtDlpProvider {
    executable: String,
    timeout: Duration,
}

impl YtDlpProvider {
    pub fn new(executable: String, timeout: Duration) -> Self {
        Self {
            executable,
            timeout,
        }
    }
}

#[derive(Debug, Deserialize)]
struct YtDlpDump {
    id: String,
    #[serde(default)]
    title: String,
    uploader: Option<String>,
    uploader_id: Option<String>,
    #[serde(default)]
    duration: Option<f64>,
    thumbnail: Option<String>,
    description: Option<String>,
    #[serde(default)]
    formats: Vec<YtDlpFormat>,
}

#[derive(Debug, Clone, Deserialize)]
struct YtDlpFormat {
    #[serde(default)]
    format_id: String,
    format_note: Option<String>,
    url: Option<String>,
    vcodec: Option<String>,
    acodec: Option<String>,
    height: Option<u32>,
    tbr: Option<f64>,
    abr: Option<f64>,
}

impl YtDlpFormat {
    fn has_url(&self) -> bool {
        self.url.as_deref().is_some_and(|url| !url.is_empty())
    }

    fn has_video(&self) -> bool {
        self.vcodec.as_deref() != Some("none")
    }

    fn has_audio(&self) -> bool {
        self.acodec.as_deref().is_some_and(|codec| codec != "none")
    }

    fn is_watermarked(&self) -> bool {
        self.format_id == "download"
            || self
                .format_note
                .as_deref()
                .is_some_and(|note| note.to_ascii_lowercase().contains("watermark"))
    }

    fn quality(&self) -> (u32, u64) {
        (self.height.unwrap_or(0), self.tbr.unwrap_or(0.0) as u64)
    }
}

fn best_by<'a, F>(formats: impl Iterator<Item = &'a YtDlpFormat>, key: F) -> Option<&'a YtDlpFormat>
where
    F: Fn(&YtDlpFormat) -> (u32, u64),
{
    formats.max_by_key(|format| key(*format))
}

impl YtDlpDump {
    fn into_metadata(self) -> MediaMetadata {
        let usable: Vec<&YtDlpFormat> = self.formats.iter().filter(|f| f.has_url()).collect();
        let clean_video = || {
            usable
                .iter()
                .copied()
                .filter(|f| f.has_video() && !f.is_watermarked())
        };

        let watermarked = best_by(
            usable.iter().copied().filter(|f| f.has_video() && f.is_watermarked()),
            YtDlpFormat::quality,
        );
        let high_def = best_by(
            clean_video().filter(|f| f.height.unwrap_or(0) >= HD_MIN_HEIGHT),
            YtDlpFormat::quality,
        );
        let standard = best_by(
            clean_video().filter(|f| f.height.unwrap_or(0) < HD_MIN_HEIGHT),
            YtDlpFormat::quality,
        )
        .or_else(|| best_by(clean_video(), YtDlpFormat::quality));
        let audio = best_by(
            usable.iter().copied().filter(|f| !f.has_video() && f.has_audio()),
            |f| (0, f.abr.unwrap_or(0.0) as u64),
        );

        let url_of = |format: Option<&YtDlpFormat>| format.and_then(|f| f.url.clone());

        MediaMetadata {
            id: self.id,
            title: self.title,
            author_name: self
                .uploader
                .clone()
                .or_else(|| self.uploader_id.clone())
                .unwrap_or_default(),
            author_handle: self.uploader_id,
            duration_seconds: self.duration.unwrap_or(0.0),
            thumbnail_url: self.thumbnail.unwrap_or_default(),
            origin_cover: None,
            description: self.description.filter(|d| !d.is_empty()),
            candidate_urls: CandidateUrls {
                standard: url_of(standard),
                high_def: url_of(high_def),
                watermarked: url_of(watermarked),
            },
            audio_url: url_of(audio),
        }
    }
}

#[async_trait]
impl MetadataProvider for YtDlpProvider {
    fn id(&self) -> &str {
        "yt-dlp"
    }

    async fn extract(&self, url: &str) -> PipelineResult<MediaMetadata> {
        let mut command = Command::new(&self.executable);
        command
            .args(["-J", "--no-warnings", "--no-playlist", url])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = match timeout(self.timeout, command.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(err)) => {
                return Err(PipelineError::ExtractionFailed(format!(
                    "failed to run {}: {}",
                    self.executable, err
                )))
            }
            Err(_) => {
                return Err(PipelineError::ExtractionFailed(format!(
                    "{} timed out after {:?}",
                    self.executable, self.timeout
                )))
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            tracing::warn!(status = %output.status, "yt-dlp returned non-zero status: {stderr}");
            return Err(PipelineError::ExtractionFailed(format!(
                "yt-dlp exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        let dump: YtDlpDump = serde_json::from_slice(&output.stdout)?;
        Ok(dump.into_metadata())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DUMP: &str = r#"{
        "id": "7301",
        "title": "a clip",
        "uploader": "User Name",
        "uploader_id": "user",
        "duration": 12.5,
        "thumbnail": "https://cdn/thumb.jpg",
        "description": "caption text",
        "formats": [
            {"format_id": "download", "format_note": "watermarked", "url": "https://cdn/wm.mp4", "vcodec": "h264", "acodec": "aac", "height": 1024},
            {"format_id": "h264_540p", "url": "https://cdn/540.mp4", "vcodec": "h264", "acodec": "aac", "height": 1024, "tbr": 900},
            {"format_id": "bytevc1_720p", "url": "https://cdn/720.mp4", "vcodec": "h265", "acodec": "aac", "height": 1280, "tbr": 1200},
            {"format_id": "h264_360p", "url": "https://cdn/360.mp4", "vcodec": "h264", "acodec": "aac", "height": 640, "tbr": 500},
            {"format_id": "audio", "url": "https://cdn/audio.m4a", "vcodec": "none", "acodec": "aac", "abr": 128},
            {"format_id": "broken", "vcodec": "h264", "height": 2000}
        ]
    }"#;

    #[test]
    fn test_maps_formats_to_candidates() {
        let dump: YtDlpDump = serde_json::from_str(DUMP).unwrap();
        let metadata = dump.into_metadata();

        assert_eq!(metadata.author_name, "User Name");
        assert_eq!(metadata.author_handle.as_deref(), Some("user"));
        assert_eq!(metadata.duration_seconds, 12.5);
        assert_eq!(metadata.description.as_deref(), Some("caption text"));
        assert_eq!(metadata.candidate_urls.watermarked.as_deref(), Some("https://cdn/wm.mp4"));
        assert_eq!(metadata.candidate_urls.high_def.as_deref(), Some("https://cdn/720.mp4"));
        assert_eq!(metadata.candidate_urls.standard.as_deref(), Some("https://cdn/360.mp4"));
        assert_eq!(metadata.audio_url.as_deref(), Some("https://cdn/audio.m4a"));
    }

    #[test]
    fn test_standard_falls_back_to_best_clean_format() {
        let dump: YtDlpDump = serde_json::from_str(
            r#"{"id": "1", "formats": [
                {"format_id": "hd", "url": "https://cdn/hd.mp4", "vcodec": "h264", "height": 1080}
            ]}"#,
        )
        .unwrap();
        let metadata = dump.into_metadata();
        assert_eq!(metadata.candidate_urls.standard.as_deref(), Some("https://cdn/hd.mp4"));
        assert_eq!(metadata.audio_url, None);
        assert_eq!(metadata.duration_seconds, 0.0);
    }

    #[tokio::test]
    async fn test_missing_executable_is_extraction_failure() {
        let provider = YtDlpProvider::new(
            "/nonexistent/yt-dlp-binary".to_string(),
            Duration::from_secs(5),
        );
        let result = provider.extract("https://www.tiktok.com/@user/video/1").await;
        assert!(matches!(result, Err(PipelineError::ExtractionFailed(_))));
    }
}
