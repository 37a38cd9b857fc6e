//! # Application State Management
//!
//! Shared state accessed by every HTTP request handler.
//!
//! ## Sharing Pattern:
//! - Mutable data (config, metrics) sits behind `Arc<RwLock<T>>`: many
//!   concurrent readers, one writer, no data races.
//! - The feature extractor and the detection engine are loaded once at
//!   startup and are read-only afterwards, so they are shared behind a
//!   plain `Arc` with no lock at all.

use crate::config::AppConfig;
use crate::detection::DetectionEngine;
use crate::features::MfccExtractor;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Instant;

/// The main application state shared across all HTTP request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration (can be partially updated at runtime)
    pub config: Arc<RwLock<AppConfig>>,

    /// Performance metrics (updated by middleware on every request)
    pub metrics: Arc<RwLock<AppMetrics>>,

    /// MFCC extraction pipeline, built once at startup
    pub extractor: Arc<MfccExtractor>,

    /// Both pre-trained classifiers, loaded once at startup
    pub engine: Arc<DetectionEngine>,

    /// When the server started (never changes)
    pub start_time: Instant,
}

/// Performance metrics collected across all HTTP requests.
#[derive(Debug, Default)]
pub struct AppMetrics {
    /// Total number of HTTP requests processed since server start
    pub request_count: u64,

    /// Total number of errors encountered since server start
    pub error_count: u64,

    /// Number of detection requests currently being processed
    pub active_detections: u32,

    /// Number of detection requests that completed with a verdict
    pub detections_completed: u64,

    /// Detailed metrics for each API endpoint, keyed "METHOD /path"
    pub endpoint_metrics: HashMap<String, EndpointMetric>,
}

/// Detailed performance metrics for a specific API endpoint.
#[derive(Debug, Default, Clone)]
pub struct EndpointMetric {
    pub request_count: u64,
    pub total_duration_ms: u64,
    pub error_count: u64,
}

impl AppState {
    /// Create the shared state from startup-validated components.
    pub fn new(config: AppConfig, extractor: MfccExtractor, engine: DetectionEngine) -> Self {
        Self {
            config: Arc::new(RwLock::new(config)),
            metrics: Arc::new(RwLock::new(AppMetrics::default())),
            extractor: Arc::new(extractor),
            engine: Arc::new(engine),
            start_time: Instant::now(),
        }
    }

    /// Get a copy of the current configuration.
    ///
    /// Cloning releases the read lock immediately so other requests are
    /// never blocked on response serialization.
    pub fn get_config(&self) -> AppConfig {
        self.config.read().unwrap().clone()
    }

    /// Replace the configuration after validating it.
    pub fn update_config(&self, new_config: AppConfig) -> Result<(), String> {
        match new_config.validate() {
            Ok(_) => {
                *self.config.write().unwrap() = new_config;
                Ok(())
            }
            Err(e) => Err(e.to_string()),
        }
    }

    /// Increment the total request counter (called by middleware).
    pub fn increment_request_count(&self) {
        let mut metrics = self.metrics.write().unwrap();
        metrics.request_count += 1;
    }

    /// Increment the total error counter (called when any request fails).
    pub fn increment_error_count(&self) {
        let mut metrics = self.metrics.write().unwrap();
        metrics.error_count += 1;
    }

    /// Record detailed metrics for a specific endpoint.
    pub fn record_endpoint_request(&self, endpoint: &str, duration_ms: u64, is_error: bool) {
        let mut metrics = self.metrics.write().unwrap();

        let endpoint_metric = metrics.endpoint_metrics.entry(endpoint.to_string()).or_default();
        endpoint_metric.request_count += 1;
        endpoint_metric.total_duration_ms += duration_ms;

        if is_error {
            endpoint_metric.error_count += 1;
        }
    }

    /// Mark a detection request as started.
    pub fn detection_started(&self) {
        let mut metrics = self.metrics.write().unwrap();
        metrics.active_detections += 1;
    }

    /// Mark a detection request as finished.
    ///
    /// Guards against underflow so a double-finish cannot wrap the counter.
    pub fn detection_finished(&self, completed: bool) {
        let mut metrics = self.metrics.write().unwrap();
        if metrics.active_detections > 0 {
            metrics.active_detections -= 1;
        }
        if completed {
            metrics.detections_completed += 1;
        }
    }

    /// Get a snapshot of current metrics (used for the /metrics endpoint).
    ///
    /// Clones under a read lock so the data stays consistent without
    /// holding the lock during HTTP response generation.
    pub fn get_metrics_snapshot(&self) -> AppMetrics {
        let metrics = self.metrics.read().unwrap();
        AppMetrics {
            request_count: metrics.request_count,
            error_count: metrics.error_count,
            active_detections: metrics.active_detections,
            detections_completed: metrics.detections_completed,
            endpoint_metrics: metrics.endpoint_metrics.clone(),
        }
    }

    /// Get server uptime in seconds.
    pub fn get_uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

impl EndpointMetric {
    /// Average response time for this endpoint in milliseconds.
    pub fn average_duration_ms(&self) -> f64 {
        if self.request_count > 0 {
            self.total_duration_ms as f64 / self.request_count as f64
        } else {
            0.0
        }
    }

    /// Error rate for this endpoint as a fraction (0.0 to 1.0).
    pub fn error_rate(&self) -> f64 {
        if self.request_count > 0 {
            self.error_count as f64 / self.request_count as f64
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::engine::test_support::toy_engine;

    fn test_state() -> AppState {
        AppState::new(AppConfig::default(), MfccExtractor::new(), toy_engine())
    }

    #[test]
    fn test_metrics_accumulate() {
        let state = test_state();
        state.increment_request_count();
        state.increment_request_count();
        state.increment_error_count();
        state.record_endpoint_request("POST /api/v1/detect", 120, false);
        state.record_endpoint_request("POST /api/v1/detect", 80, true);

        let snapshot = state.get_metrics_snapshot();
        assert_eq!(snapshot.request_count, 2);
        assert_eq!(snapshot.error_count, 1);

        let detect = &snapshot.endpoint_metrics["POST /api/v1/detect"];
        assert_eq!(detect.request_count, 2);
        assert_eq!(detect.error_count, 1);
        assert!((detect.average_duration_ms() - 100.0).abs() < f64::EPSILON);
        assert!((detect.error_rate() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_detection_counter_never_underflows() {
        let state = test_state();
        state.detection_started();
        state.detection_finished(true);
        state.detection_finished(true); // double finish must not wrap

        let snapshot = state.get_metrics_snapshot();
        assert_eq!(snapshot.active_detections, 0);
        assert_eq!(snapshot.detections_completed, 2);
    }

    #[test]
    fn test_update_config_validates() {
        let state = test_state();
        let mut bad = state.get_config();
        bad.server.port = 0;
        assert!(state.update_config(bad).is_err());
        // Original config untouched
        assert_eq!(state.get_config().server.port, 8080);
    }
}
