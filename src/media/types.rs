//! # Media Types
//!
//! Provider-agnostic records shared by the resolver, the cache, and the
//! caption pipeline. Both extraction providers normalize into
//! [`MediaMetadata`], so nothing downstream knows which one answered.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::pipeline::PipelineError;

/// Accepted source URLs: TikTok web, mobile and short-link hosts.
static TIKTOK_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^https?://(?:www\.|m\.|vm\.|vt\.)?tiktok\.com/\S+$")
        .expect("static TikTok URL pattern is valid")
});

/// One inbound caption or download request, validated at construction.
///
/// ## Invariant:
/// A `MediaRequest` only exists once `url` matched the accepted host
/// pattern, so holding one means no network call can be made for a
/// malformed URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaRequest {
    url: String,
    pub audio_only: bool,
    pub debug: bool,
    pub high_quality: bool,
}

impl MediaRequest {
    /// Validate `url` and build the request.
    ///
    /// The URL is kept exactly as received (no trimming, no normalization),
    /// because the cache key is derived from the raw text.
    pub fn new(
        url: Option<&str>,
        audio_only: bool,
        debug: bool,
        high_quality: bool,
    ) -> Result<Self, PipelineError> {
        let url = match url {
            Some(url) if !url.is_empty() => url,
            _ => return Err(PipelineError::InvalidUrl("URL is required".to_string())),
        };

        if !is_supported_url(url) {
            return Err(PipelineError::InvalidUrl(format!(
                "'{}' is not a valid TikTok video URL",
                url
            )));
        }

        Ok(Self {
            url: url.to_string(),
            audio_only,
            debug,
            high_quality,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn kind(&self) -> MediaKind {
        MediaKind::from_audio_only(self.audio_only)
    }
}

/// Returns true when `url` matches the accepted TikTok host pattern.
pub fn is_supported_url(url: &str) -> bool {
    TIKTOK_URL.is_match(url)
}

/// Audio-only or full video processing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Audio,
    Video,
}

impl MediaKind {
    pub fn from_audio_only(audio_only: bool) -> Self {
        if audio_only {
            MediaKind::Audio
        } else {
            MediaKind::Video
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            MediaKind::Audio => "mp3",
            MediaKind::Video => "mp4",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            MediaKind::Audio => "audio/mpeg",
            MediaKind::Video => "video/mp4",
        }
    }

    /// Value reported as `metadata.processingType`.
    pub fn processing_type(&self) -> &'static str {
        match self {
            MediaKind::Audio => "audio-only",
            MediaKind::Video => "video",
        }
    }
}

/// Quality variants offered by the extraction provider.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateUrls {
    pub standard: Option<String>,
    pub high_def: Option<String>,
    pub watermarked: Option<String>,
}

impl CandidateUrls {
    /// Pick a video URL. `prefer_high_def` selects the
    /// high-definition -> standard -> watermarked order; otherwise standard
    /// comes first.
    pub fn select(&self, prefer_high_def: bool) -> Option<&str> {
        let order = if prefer_high_def {
            [&self.high_def, &self.standard, &self.watermarked]
        } else {
            [&self.standard, &self.high_def, &self.watermarked]
        };
        order
            .into_iter()
            .flatten()
            .map(String::as_str)
            .find(|url| !url.is_empty())
    }
}

/// Normalized metadata for one video.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaMetadata {
    pub id: String,
    pub title: String,
    pub author_name: String,
    pub author_handle: Option<String>,
    pub duration_seconds: f64,
    pub thumbnail_url: String,
    pub origin_cover: Option<String>,
    pub description: Option<String>,
    pub candidate_urls: CandidateUrls,
    pub audio_url: Option<String>,
}

impl MediaMetadata {
    /// The URL to fetch for `kind`, or `None` when the provider offered no
    /// usable candidate.
    pub fn download_url(&self, kind: MediaKind, prefer_high_def: bool) -> Option<&str> {
        match kind {
            MediaKind::Audio => self.audio_url.as_deref().filter(|url| !url.is_empty()),
            MediaKind::Video => self.candidate_urls.select(prefer_high_def),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_tiktok_hosts() {
        for url in [
            "https://www.tiktok.com/@user/video/123",
            "https://tiktok.com/@user/video/123",
            "http://m.tiktok.com/v/123.html",
            "https://vm.tiktok.com/ZMabc123/",
            "https://vt.tiktok.com/ZSabc/",
        ] {
            assert!(is_supported_url(url), "{} should be accepted", url);
        }
    }

    #[test]
    fn test_rejects_other_input() {
        for url in [
            "not-a-url",
            "",
            "https://www.youtube.com/watch?v=abc",
            "https://tiktok.com.evil.io/@user/video/1",
            "ftp://www.tiktok.com/@user/video/1",
            "https://www.tiktok.com/",
        ] {
            assert!(!is_supported_url(url), "{} should be rejected", url);
        }
    }

    #[test]
    fn test_missing_url_is_invalid() {
        assert!(matches!(
            MediaRequest::new(None, false, false, false),
            Err(PipelineError::InvalidUrl(_))
        ));
        assert!(matches!(
            MediaRequest::new(Some(""), false, false, false),
            Err(PipelineError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_extension_follows_mode() {
        let url = "https://www.tiktok.com/@user/video/123";
        let audio = MediaRequest::new(Some(url), true, false, false).unwrap();
        let video = MediaRequest::new(Some(url), false, false, false).unwrap();
        assert_eq!(audio.kind().extension(), "mp3");
        assert_eq!(video.kind().extension(), "mp4");
    }

    #[test]
    fn test_candidate_priority() {
        let all = CandidateUrls {
            standard: Some("sd".into()),
            high_def: Some("hd".into()),
            watermarked: Some("wm".into()),
        };
        assert_eq!(all.select(true), Some("hd"));
        assert_eq!(all.select(false), Some("sd"));

        let watermarked_only = CandidateUrls {
            watermarked: Some("wm".into()),
            ..Default::default()
        };
        assert_eq!(watermarked_only.select(true), Some("wm"));

        let empty_hd = CandidateUrls {
            high_def: Some(String::new()),
            standard: Some("sd".into()),
            ..Default::default()
        };
        assert_eq!(empty_hd.select(true), Some("sd"));
        assert_eq!(CandidateUrls::default().select(true), None);
    }

    #[test]
    fn test_audio_mode_uses_audio_track_only() {
        let metadata = MediaMetadata {
            candidate_urls: CandidateUrls {
                standard: Some("sd".into()),
                ..Default::default()
            },
            ..Default::default()
        };
        assert_eq!(metadata.download_url(MediaKind::Audio, true), None);
        assert_eq!(metadata.download_url(MediaKind::Video, true), Some("sd"));
    }
}
