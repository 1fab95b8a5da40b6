//! # Application State Management
//!
//! Shared state handed to every request handler through `web::Data`.
//!
//! ## Arc<RwLock<T>> Pattern
//! - **Arc**: every worker thread of the HTTP server holds a reference
//! - **RwLock**: many readers (health checks) or one writer (metrics updates)
//!
//! Configuration and the caption pipeline are fixed after startup, so they
//! are shared through a plain `Arc` and never locked.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Instant;

use crate::config::AppConfig;
use crate::pipeline::CaptionPipeline;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,

    /// Updated by the metrics middleware on every request.
    pub metrics: Arc<RwLock<AppMetrics>>,

    /// Built once at startup; handlers only borrow it.
    pub pipeline: Arc<CaptionPipeline>,

    pub start_time: Instant,
}

/// Performance metrics collected across all HTTP requests.
///
/// ## Why these metrics matter:
/// - **request_count**: Total requests processed (for load monitoring)
/// - **error_count**: Total 4xx/5xx responses (for reliability monitoring)
/// - **active_captions**: Caption pipelines currently running
/// - **endpoint_metrics**: Per-endpoint statistics, keyed like `"POST /caption"`
#[derive(Debug, Default, Clone)]
pub struct AppMetrics {
    pub request_count: u64,
    pub error_count: u64,
    pub active_captions: u32,
    pub endpoint_metrics: HashMap<String, EndpointMetric>,
}

#[derive(Debug, Default, Clone)]
pub struct EndpointMetric {
    pub request_count: u64,
    pub total_duration_ms: u64,
    pub error_count: u64,
}

impl AppState {
    pub fn new(config: AppConfig, pipeline: Arc<CaptionPipeline>) -> Self {
        Self {
            config: Arc::new(config),
            metrics: Arc::new(RwLock::new(AppMetrics::default())),
            pipeline,
            start_time: Instant::now(),
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    // A panicking handler must not take metrics down with it, so poisoned
    // locks are recovered rather than propagated.
    fn metrics_read(&self) -> RwLockReadGuard<'_, AppMetrics> {
        self.metrics.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn metrics_write(&self) -> RwLockWriteGuard<'_, AppMetrics> {
        self.metrics.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn increment_request_count(&self) {
        self.metrics_write().request_count += 1;
    }

    pub fn increment_error_count(&self) {
        self.metrics_write().error_count += 1;
    }

    /// Record detailed metrics for a specific endpoint.
    ///
    /// ## Parameters:
    /// - **endpoint**: method plus matched route, e.g. `"POST /caption"`
    /// - **duration_ms**: how long the request took to process
    /// - **is_error**: whether the response was a 4xx or 5xx
    pub fn record_endpoint_request(&self, endpoint: &str, duration_ms: u64, is_error: bool) {
        let mut metrics = self.metrics_write();
        let endpoint_metric = metrics
            .endpoint_metrics
            .entry(endpoint.to_string())
            .or_default();

        endpoint_metric.request_count += 1;
        endpoint_metric.total_duration_ms += duration_ms;
        if is_error {
            endpoint_metric.error_count += 1;
        }
    }

    /// Mark a caption pipeline as running until the returned guard is dropped.
    ///
    /// The guard also covers the case where the client disconnects and actix
    /// drops the handler future mid-pipeline.
    pub fn track_caption(&self) -> CaptionGuard {
        self.metrics_write().active_captions += 1;
        CaptionGuard {
            metrics: self.metrics.clone(),
        }
    }

    pub fn get_metrics_snapshot(&self) -> AppMetrics {
        self.metrics_read().clone()
    }

    pub fn get_uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

/// Decrements `active_captions` on drop.
pub struct CaptionGuard {
    metrics: Arc<RwLock<AppMetrics>>,
}

impl Drop for CaptionGuard {
    fn drop(&mut self) {
        let mut metrics = self.metrics.write().unwrap_or_else(PoisonError::into_inner);
        metrics.active_captions = metrics.active_captions.saturating_sub(1);
    }
}

impl AppMetrics {
    pub fn error_rate(&self) -> f64 {
        if self.request_count > 0 {
            self.error_count as f64 / self.request_count as f64
        } else {
            0.0
        }
    }
}

impl EndpointMetric {
    /// Average = Total Duration ÷ Number of Requests, or 0 before any request.
    pub fn average_duration_ms(&self) -> f64 {
        if self.request_count > 0 {
            self.total_duration_ms as f64 / self.request_count as f64
        } else {
            0.0
        }
    }

    /// Error Rate = Number of Errors ÷ Total Requests (0.0 to 1.0).
    pub fn error_rate(&self) -> f64 {
        if self.request_count > 0 {
            self.error_count as f64 / self.request_count as f64
        } else {
            0.0
        }
    }
}
