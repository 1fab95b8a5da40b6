//! # Caption Pipeline
//!
//! Sequences one validated request through the three timed phases:
//!
//! ```text
//! RESOLVING_METADATA -> FETCHING_MEDIA -> DISPATCHING_TRANSCRIPTION -> SUCCEEDED
//!          \________________\____________________\___________> FAILED(stage, reason)
//! ```
//!
//! Validation happens before this point: the pipeline only accepts a
//! [`MediaRequest`], which cannot be built from a malformed URL.
//!
//! ## Failure model:
//! - Every stage fails fast and aborts the rest of the pipeline.
//! - Nothing is retried here.
//! - Timing marks stay at `None` for phases that were never reached, so the
//!   failed stage can be read back from the timing alone.

use std::sync::Arc;

use tracing::{error, info, Instrument};
use uuid::Uuid;

use crate::media::{FetchedMedia, MediaRequest, MediaResolver};
use crate::transcription::Transcriber;

use super::response::{
    CaptionFailure, CaptionOutcome, CaptionResponse, DebugReport, FailureDebug, ResponseMetadata,
};
use super::timing::{Phase, PhaseTiming};
use super::{PipelineError, PipelineResult};

pub struct CaptionPipeline {
    resolver: MediaResolver,
    transcriber: Arc<dyn Transcriber>,
}

impl CaptionPipeline {
    pub fn new(resolver: MediaResolver, transcriber: Arc<dyn Transcriber>) -> Self {
        Self {
            resolver,
            transcriber,
        }
    }

    pub fn resolver(&self) -> &MediaResolver {
        &self.resolver
    }

    /// Run the full caption pipeline for one request.
    pub async fn caption(&self, request: &MediaRequest) -> CaptionOutcome {
        let span = tracing::info_span!(
            "caption",
            request_id = %Uuid::new_v4(),
            url = %request.url(),
            audio_only = request.audio_only,
            debug = request.debug,
        );

        async {
            let mut timing = PhaseTiming::start();
            match self.run(request, &mut timing).await {
                Ok(response) => {
                    debug_assert!(timing.is_monotonic());
                    info!(total_ms = %timing.total().as_millis(), "Caption completed");
                    CaptionOutcome::Success(Box::new(response))
                }
                Err(err) => {
                    timing.fail();
                    let stage = timing.failed_phase();
                    error!(
                        stage = %stage.as_str(),
                        elapsed_ms = %timing.total().as_millis(),
                        error = %err,
                        "Caption failed"
                    );
                    CaptionOutcome::Failure(CaptionFailure {
                        error: err,
                        debug: request.debug.then(|| FailureDebug::new(&timing)),
                    })
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn run(
        &self,
        request: &MediaRequest,
        timing: &mut PhaseTiming,
    ) -> PipelineResult<CaptionResponse> {
        let kind = request.kind();

        timing.begin(Phase::Metadata);
        let metadata = self.resolver.resolve(request.url()).await?;
        timing.finish(Phase::Metadata);
        info!(
            phase = "metadata",
            duration_ms = %timing.duration(Phase::Metadata).as_millis(),
            title = %metadata.title,
            "Phase completed"
        );

        timing.begin(Phase::Download);
        let FetchedMedia {
            bytes,
            cached,
            download_url,
        } = self
            .resolver
            .fetch_bytes(request.url(), &metadata, kind, true)
            .await?;
        timing.finish(Phase::Download);
        let size = bytes.len();
        info!(
            phase = "download",
            duration_ms = %timing.duration(Phase::Download).as_millis(),
            bytes = size,
            cached = cached,
            "Phase completed"
        );

        let filename = if metadata.id.is_empty() {
            format!("media.{}", kind.extension())
        } else {
            format!("tiktok_{}.{}", metadata.id, kind.extension())
        };

        timing.begin(Phase::Transcription);
        let caption = self
            .transcriber
            .transcribe(bytes, &filename, kind.content_type())
            .await?;
        timing.finish(Phase::Transcription);
        info!(
            phase = "transcription",
            duration_ms = %timing.duration(Phase::Transcription).as_millis(),
            chars = caption.len(),
            "Phase completed"
        );

        let debug = request
            .debug
            .then(|| DebugReport::new(timing, cached, size, metadata.duration_seconds));

        Ok(CaptionResponse {
            url: request.url().to_string(),
            caption,
            metadata: ResponseMetadata::new(&metadata, kind, size, cached),
            download_url,
            debug,
        })
    }

    /// Resolve the media URL a `/download` request should redirect to.
    pub async fn download_url(&self, request: &MediaRequest) -> PipelineResult<String> {
        let kind = request.kind();
        let metadata = self.resolver.resolve(request.url()).await?;
        metadata
            .download_url(kind, request.high_quality)
            .map(str::to_string)
            .ok_or(PipelineError::NoDownloadUrl)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use async_trait::async_trait;
    use tempfile::TempDir;

    use crate::media::resolver::test_support::{MockDownloader, MockProvider};
    use crate::media::{MediaCache, MediaResolver};
    use crate::pipeline::{PipelineError, PipelineResult};
    use crate::transcription::Transcriber;

    use super::CaptionPipeline;

    pub struct MockTranscriber {
        pub calls: AtomicUsize,
        pub result: Result<String, String>,
    }

    impl MockTranscriber {
        pub fn returning(caption: &str) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                result: Ok(caption.to_string()),
            }
        }

        pub fn failing(message: &str) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                result: Err(message.to_string()),
            }
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Transcriber for MockTranscriber {
        async fn transcribe(
            &self,
            _bytes: Vec<u8>,
            _filename: &str,
            _content_type: &str,
        ) -> PipelineResult<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.result.clone().map_err(PipelineError::TranscriptionFailed)
        }
    }

    pub struct Harness {
        pub pipeline: Arc<CaptionPipeline>,
        pub provider: Arc<MockProvider>,
        pub downloader: Arc<MockDownloader>,
        pub _temp: TempDir,
    }

    pub fn harness(
        provider: MockProvider,
        downloader: MockDownloader,
        transcriber: Arc<dyn Transcriber>,
    ) -> Harness {
        let temp = TempDir::new().unwrap();
        let provider = Arc::new(provider);
        let downloader = Arc::new(downloader);
        let resolver = MediaResolver::new(
            provider.clone(),
            downloader.clone(),
            MediaCache::new(temp.path().join("cache")),
        );
        Harness {
            pipeline: Arc::new(CaptionPipeline::new(resolver, transcriber)),
            provider,
            downloader,
            _temp: temp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::{harness, MockTranscriber};
    use super::*;
    use crate::media::resolver::test_support::{sample_metadata, MockDownloader, MockProvider};

    const URL: &str = "https://www.tiktok.com/@user/video/123";

    fn request(audio_only: bool, debug: bool) -> MediaRequest {
        MediaRequest::new(Some(URL), audio_only, debug, false).unwrap()
    }

    #[tokio::test]
    async fn test_success_assembles_response() {
        let transcriber = Arc::new(MockTranscriber::returning("hello world"));
        let h = harness(
            MockProvider::returning(sample_metadata()),
            MockDownloader::returning(b"audio-bytes"),
            transcriber.clone(),
        );

        let outcome = h.pipeline.caption(&request(true, false)).await;

        let CaptionOutcome::Success(response) = outcome else {
            panic!("expected success");
        };
        assert_eq!(response.caption, "hello world");
        assert_eq!(response.metadata.processing_type, "audio-only");
        assert_eq!(response.metadata.duration, 30.0);
        assert!(!response.metadata.cached);
        assert_eq!(response.download_url.as_deref(), Some("https://cdn.example/audio.mp3"));
        assert!(response.debug.is_none());
        assert_eq!(transcriber.calls(), 1);
    }

    #[tokio::test]
    async fn test_metadata_is_refetched_but_bytes_are_cached() {
        let h = harness(
            MockProvider::returning(sample_metadata()),
            MockDownloader::returning(b"video"),
            Arc::new(MockTranscriber::returning("text")),
        );

        h.pipeline.caption(&request(false, false)).await;
        let outcome = h.pipeline.caption(&request(false, false)).await;

        let CaptionOutcome::Success(response) = outcome else {
            panic!("expected success");
        };
        assert!(response.metadata.cached);
        assert_eq!(h.provider.calls(), 2);
        assert_eq!(h.downloader.calls(), 1);
    }

    #[tokio::test]
    async fn test_extraction_failure_stops_pipeline() {
        let transcriber = Arc::new(MockTranscriber::returning("unused"));
        let h = harness(
            MockProvider::failing("provider down"),
            MockDownloader::returning(b""),
            transcriber.clone(),
        );

        let outcome = h.pipeline.caption(&request(false, true)).await;

        let CaptionOutcome::Failure(failure) = outcome else {
            panic!("expected failure");
        };
        assert!(matches!(failure.error, PipelineError::ExtractionFailed(_)));
        assert_eq!(failure.debug.unwrap().failed_at, Phase::Metadata);
        assert_eq!(h.downloader.calls(), 0);
        assert_eq!(transcriber.calls(), 0);
    }

    #[tokio::test]
    async fn test_download_failure_reports_download_stage() {
        let transcriber = Arc::new(MockTranscriber::returning("unused"));
        let h = harness(
            MockProvider::returning(sample_metadata()),
            MockDownloader::failing("status 404 Not Found"),
            transcriber.clone(),
        );

        let outcome = h.pipeline.caption(&request(false, true)).await;

        let CaptionOutcome::Failure(failure) = outcome else {
            panic!("expected failure");
        };
        assert!(matches!(failure.error, PipelineError::DownloadFailed(_)));
        assert_eq!(failure.debug.unwrap().failed_at, Phase::Download);
        assert_eq!(transcriber.calls(), 0);
    }

    #[tokio::test]
    async fn test_transcription_failure_without_debug_has_no_breadcrumbs() {
        let h = harness(
            MockProvider::returning(sample_metadata()),
            MockDownloader::returning(b"video"),
            Arc::new(MockTranscriber::failing("status 500")),
        );

        let outcome = h.pipeline.caption(&request(false, false)).await;

        let CaptionOutcome::Failure(failure) = outcome else {
            panic!("expected failure");
        };
        assert!(matches!(failure.error, PipelineError::TranscriptionFailed(_)));
        assert!(failure.debug.is_none());
    }

    #[tokio::test]
    async fn test_debug_report_is_attached() {
        let h = harness(
            MockProvider::returning(sample_metadata()),
            MockDownloader::returning(b"video"),
            Arc::new(MockTranscriber::returning("text")),
        );

        let outcome = h.pipeline.caption(&request(false, true)).await;

        let CaptionOutcome::Success(response) = outcome else {
            panic!("expected success");
        };
        let debug = response.debug.expect("debug block");
        assert!(debug.timing.total.ends_with("ms"));
        assert!(!debug.performance.cached);
    }

    #[tokio::test]
    async fn test_download_url_honors_quality_flag() {
        let h = harness(
            MockProvider::returning(sample_metadata()),
            MockDownloader::returning(b""),
            Arc::new(MockTranscriber::returning("unused")),
        );

        let hq = MediaRequest::new(Some(URL), false, false, true).unwrap();
        let sd = MediaRequest::new(Some(URL), false, false, false).unwrap();

        assert_eq!(h.pipeline.download_url(&hq).await.unwrap(), "https://cdn.example/hd.mp4");
        assert_eq!(h.pipeline.download_url(&sd).await.unwrap(), "https://cdn.example/sd.mp4");
        assert_eq!(h.downloader.calls(), 0);
    }
}
