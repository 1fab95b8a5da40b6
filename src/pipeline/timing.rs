//! # Phase Timing
//!
//! Monotonic timestamps for the three timed phases of a caption request,
//! plus the derived figures reported in the `debug` block.
//!
//! ## Invariants:
//! - `start <= metadata_start <= metadata_end <= download_start <= ...
//!   <= transcribe_end` for every populated field, because each mark reads
//!   `Instant::now()` and marks happen in pipeline order.
//! - An unreached phase keeps `None`; durations of unset phases are zero.
//! - Every ratio is guarded: a zero divisor yields `"n/a"` or `0.00%`,
//!   never a division by zero.

use std::time::{Duration, Instant};

use serde::Serialize;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Pipeline phase, named the way error breadcrumbs report it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Metadata,
    Download,
    Transcription,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Metadata => "metadata",
            Phase::Download => "download",
            Phase::Transcription => "transcription",
        }
    }
}

#[derive(Debug, Clone)]
pub struct PhaseTiming {
    pub start: Instant,
    pub metadata_start: Option<Instant>,
    pub metadata_end: Option<Instant>,
    pub download_start: Option<Instant>,
    pub download_end: Option<Instant>,
    pub transcribe_start: Option<Instant>,
    pub transcribe_end: Option<Instant>,
}

impl Default for PhaseTiming {
    fn default() -> Self {
        Self::start()
    }
}

fn span(from: Option<Instant>, to: Option<Instant>) -> Duration {
    match (from, to) {
        (Some(from), Some(to)) => to.saturating_duration_since(from),
        _ => Duration::ZERO,
    }
}

fn format_ms(duration: Duration) -> String {
    format!("{}ms", duration.as_millis())
}

fn percent(part: Duration, total: Duration) -> String {
    if total.is_zero() {
        return "0.00%".to_string();
    }
    format!("{:.2}%", part.as_secs_f64() / total.as_secs_f64() * 100.0)
}

impl PhaseTiming {
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
            metadata_start: None,
            metadata_end: None,
            download_start: None,
            download_end: None,
            transcribe_start: None,
            transcribe_end: None,
        }
    }

    pub fn begin(&mut self, phase: Phase) {
        let now = Some(Instant::now());
        match phase {
            Phase::Metadata => self.metadata_start = now,
            Phase::Download => self.download_start = now,
            Phase::Transcription => self.transcribe_start = now,
        }
    }

    pub fn finish(&mut self, phase: Phase) {
        let now = Some(Instant::now());
        match phase {
            Phase::Metadata => self.metadata_end = now,
            Phase::Download => self.download_end = now,
            Phase::Transcription => self.transcribe_end = now,
        }
    }

    /// Close whichever phase was running when the pipeline failed, so the
    /// breadcrumbs include the time spent in the failed stage.
    pub fn fail(&mut self) {
        let now = Some(Instant::now());
        match self.failed_phase() {
            Phase::Metadata if self.metadata_start.is_some() => {
                self.metadata_end = self.metadata_end.or(now)
            }
            Phase::Metadata => {}
            Phase::Download => self.download_end = self.download_end.or(now),
            Phase::Transcription => self.transcribe_end = self.transcribe_end.or(now),
        }
    }

    pub fn duration(&self, phase: Phase) -> Duration {
        match phase {
            Phase::Metadata => span(self.metadata_start, self.metadata_end),
            Phase::Download => span(self.download_start, self.download_end),
            Phase::Transcription => span(self.transcribe_start, self.transcribe_end),
        }
    }

    /// Time from `start` to the latest populated timestamp.
    pub fn total(&self) -> Duration {
        let last = [
            self.transcribe_end,
            self.transcribe_start,
            self.download_end,
            self.download_start,
            self.metadata_end,
            self.metadata_start,
        ]
        .into_iter()
        .flatten()
        .next();
        span(Some(self.start), last)
    }

    /// The phase a failed request stopped in, inferred from which marks are
    /// populated.
    pub fn failed_phase(&self) -> Phase {
        if self.transcribe_start.is_some() {
            Phase::Transcription
        } else if self.download_start.is_some() {
            Phase::Download
        } else {
            Phase::Metadata
        }
    }

    /// True when every populated timestamp follows the one before it.
    pub fn is_monotonic(&self) -> bool {
        let marks = [
            Some(self.start),
            self.metadata_start,
            self.metadata_end,
            self.download_start,
            self.download_end,
            self.transcribe_start,
            self.transcribe_end,
        ];
        let populated: Vec<Instant> = marks.into_iter().flatten().collect();
        populated.windows(2).all(|pair| pair[0] <= pair[1])
    }

    pub fn timing_report(&self) -> TimingReport {
        TimingReport {
            total: format_ms(self.total()),
            metadata: format_ms(self.duration(Phase::Metadata)),
            download: format_ms(self.duration(Phase::Download)),
            transcription: format_ms(self.duration(Phase::Transcription)),
        }
    }

    /// Throughput figures. `media_duration_seconds` is the clip length,
    /// used to express transcription speed relative to realtime.
    pub fn performance_report(
        &self,
        bytes: usize,
        cached: bool,
        media_duration_seconds: f64,
    ) -> PerformanceReport {
        let download = self.duration(Phase::Download);
        let transcription = self.duration(Phase::Transcription);

        let download_speed = if cached || download.is_zero() {
            "n/a".to_string()
        } else {
            format!(
                "{:.2} MB/s",
                bytes as f64 / BYTES_PER_MB / download.as_secs_f64()
            )
        };

        let transcription_speed = if transcription.is_zero() || media_duration_seconds <= 0.0 {
            "n/a".to_string()
        } else {
            format!(
                "{:.2}x realtime",
                media_duration_seconds / transcription.as_secs_f64()
            )
        };

        PerformanceReport {
            download_speed,
            transcription_speed,
            file_size_mb: format!("{:.2}", bytes as f64 / BYTES_PER_MB),
            cached,
        }
    }

    /// Share of the total spent in each phase; `other` takes the remainder
    /// so the four entries add up to 100% whenever the total is non-zero.
    pub fn breakdown(&self) -> Breakdown {
        let total = self.total();
        let metadata = self.duration(Phase::Metadata);
        let download = self.duration(Phase::Download);
        let transcription = self.duration(Phase::Transcription);
        let other = total.saturating_sub(metadata + download + transcription);

        Breakdown {
            metadata: percent(metadata, total),
            download: percent(download, total),
            transcription: percent(transcription, total),
            other: percent(other, total),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TimingReport {
    pub total: String,
    pub metadata: String,
    pub download: String,
    pub transcription: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceReport {
    pub download_speed: String,
    pub transcription_speed: String,
    pub file_size_mb: String,
    pub cached: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct Breakdown {
    pub metadata: String,
    pub download: String,
    pub transcription: String,
    pub other: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_percent(value: &str) -> f64 {
        value.trim_end_matches('%').parse().unwrap()
    }

    fn completed(step: Duration) -> PhaseTiming {
        let start = Instant::now();
        PhaseTiming {
            start,
            metadata_start: Some(start),
            metadata_end: Some(start + step),
            download_start: Some(start + step),
            download_end: Some(start + step * 3),
            transcribe_start: Some(start + step * 3),
            transcribe_end: Some(start + step * 6),
        }
    }

    #[test]
    fn test_marks_are_monotonic() {
        let mut timing = PhaseTiming::start();
        for phase in [Phase::Metadata, Phase::Download, Phase::Transcription] {
            timing.begin(phase);
            timing.finish(phase);
        }
        assert!(timing.is_monotonic());
        assert!(timing.total() >= timing.duration(Phase::Transcription));
    }

    #[test]
    fn test_durations_and_breakdown() {
        let timing = completed(Duration::from_millis(100));
        assert_eq!(timing.duration(Phase::Metadata), Duration::from_millis(100));
        assert_eq!(timing.duration(Phase::Download), Duration::from_millis(200));
        assert_eq!(timing.duration(Phase::Transcription), Duration::from_millis(300));
        assert_eq!(timing.timing_report().total, "600ms");

        let breakdown = timing.breakdown();
        let sum = parse_percent(&breakdown.metadata)
            + parse_percent(&breakdown.download)
            + parse_percent(&breakdown.transcription)
            + parse_percent(&breakdown.other);
        assert!((sum - 100.0).abs() < 0.1, "sum was {}", sum);
        assert_eq!(breakdown.transcription, "50.00%");
    }

    #[test]
    fn test_zero_durations_do_not_divide_by_zero() {
        let start = Instant::now();
        let timing = PhaseTiming {
            start,
            metadata_start: Some(start),
            metadata_end: Some(start),
            download_start: Some(start),
            download_end: Some(start),
            transcribe_start: Some(start),
            transcribe_end: Some(start),
        };

        let breakdown = timing.breakdown();
        assert_eq!(breakdown.metadata, "0.00%");
        assert_eq!(breakdown.other, "0.00%");

        let performance = timing.performance_report(1024, false, 30.0);
        assert_eq!(performance.download_speed, "n/a");
        assert_eq!(performance.transcription_speed, "n/a");
    }

    #[test]
    fn test_performance_figures() {
        let timing = completed(Duration::from_millis(500));
        // download takes 1s, transcription 1.5s
        let performance = timing.performance_report(2 * 1024 * 1024, false, 30.0);
        assert_eq!(performance.download_speed, "2.00 MB/s");
        assert_eq!(performance.transcription_speed, "20.00x realtime");
        assert_eq!(performance.file_size_mb, "2.00");

        let cached = timing.performance_report(2 * 1024 * 1024, true, 0.0);
        assert_eq!(cached.download_speed, "n/a");
        assert_eq!(cached.transcription_speed, "n/a");
    }

    #[test]
    fn test_failed_phase_from_partial_marks() {
        let mut timing = PhaseTiming::start();
        assert_eq!(timing.failed_phase(), Phase::Metadata);

        timing.begin(Phase::Metadata);
        assert_eq!(timing.failed_phase(), Phase::Metadata);
        timing.finish(Phase::Metadata);
        timing.begin(Phase::Download);
        assert_eq!(timing.failed_phase(), Phase::Download);
        timing.finish(Phase::Download);
        timing.begin(Phase::Transcription);
        assert_eq!(timing.failed_phase(), Phase::Transcription);

        assert!(timing.is_monotonic());
        assert_eq!(timing.duration(Phase::Transcription), Duration::ZERO);
    }

    #[test]
    fn test_fail_closes_the_running_phase() {
        let start = Instant::now() - Duration::from_millis(900);
        let mut timing = PhaseTiming {
            start,
            metadata_start: Some(start),
            metadata_end: Some(start + Duration::from_millis(50)),
            download_start: Some(start + Duration::from_millis(50)),
            download_end: Some(start + Duration::from_millis(100)),
            transcribe_start: Some(start + Duration::from_millis(100)),
            transcribe_end: None,
        };

        timing.fail();

        assert_eq!(timing.failed_phase(), Phase::Transcription);
        assert!(timing.duration(Phase::Transcription) >= Duration::from_millis(800));
        assert!(timing.total() >= Duration::from_millis(900));
        assert_eq!(timing.duration(Phase::Download), Duration::from_millis(50));
        assert!(timing.is_monotonic());
    }

    #[test]
    fn test_fail_before_any_phase_leaves_marks_empty() {
        let mut timing = PhaseTiming::start();
        timing.fail();
        assert!(timing.metadata_end.is_none());
        assert_eq!(timing.total(), Duration::ZERO);
    }
}
