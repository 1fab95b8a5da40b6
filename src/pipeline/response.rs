//! Wire shapes for caption results.
//!
//! A caption request ends in exactly one [`CaptionOutcome`]: a
//! [`CaptionResponse`] on success, or a [`CaptionFailure`] carrying the
//! error kind and, when the caller asked for it, the timing breadcrumbs
//! collected before the failure.

use serde::Serialize;

use crate::media::{MediaKind, MediaMetadata};

use super::timing::{Breakdown, PerformanceReport, Phase, PhaseTiming, TimingReport};
use super::PipelineError;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptionResponse {
    pub url: String,
    pub caption: String,
    pub metadata: ResponseMetadata,
    pub download_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug: Option<DebugReport>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseMetadata {
    pub title: String,
    pub author: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_id: Option<String>,
    pub duration: f64,
    pub processing_type: &'static str,
    pub file_size: String,
    pub thumbnail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin_cover: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub cached: bool,
}

impl ResponseMetadata {
    pub fn new(metadata: &MediaMetadata, kind: MediaKind, size: usize, cached: bool) -> Self {
        Self {
            title: metadata.title.clone(),
            author: metadata.author_name.clone(),
            author_id: metadata.author_handle.clone(),
            duration: metadata.duration_seconds,
            processing_type: kind.processing_type(),
            file_size: format_size(size),
            thumbnail: metadata.thumbnail_url.clone(),
            origin_cover: metadata.origin_cover.clone(),
            description: metadata.description.clone(),
            cached,
        }
    }
}

/// Human-readable byte size, e.g. `"1.50 MB"`.
pub fn format_size(bytes: usize) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;
    let bytes = bytes as f64;
    if bytes >= MB {
        format!("{:.2} MB", bytes / MB)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes / KB)
    } else {
        format!("{} B", bytes)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DebugReport {
    pub timing: TimingReport,
    pub performance: PerformanceReport,
    pub breakdown: Breakdown,
}

impl DebugReport {
    pub fn new(timing: &PhaseTiming, cached: bool, size: usize, duration: f64) -> Self {
        Self {
            timing: timing.timing_report(),
            performance: timing.performance_report(size, cached, duration),
            breakdown: timing.breakdown(),
        }
    }
}

/// Partial timing attached to a failed request in debug mode.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FailureDebug {
    pub timing: TimingReport,
    pub failed_at: Phase,
}

impl FailureDebug {
    pub fn new(timing: &PhaseTiming) -> Self {
        Self {
            timing: timing.timing_report(),
            failed_at: timing.failed_phase(),
        }
    }
}

#[derive(Debug)]
pub struct CaptionFailure {
    pub error: PipelineError,
    pub debug: Option<FailureDebug>,
}

#[derive(Debug)]
pub enum CaptionOutcome {
    Success(Box<CaptionResponse>),
    Failure(CaptionFailure),
}
