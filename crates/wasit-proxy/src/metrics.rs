//! Prometheus metrics for the proxy
//!
//! Counters and histograms are recorded through an injected
//! `ProxyMetrics` handle rather than ambient globals, keeping the engine
//! and aggregator testable without an installed recorder. Recording is
//! best-effort and never fails the observed operation.

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Metric names
///
/// Names and labels are part of the monitoring contract.
pub mod names {
    /// Count of processed operations, labeled by `action`
    pub const REQUESTS_TOTAL: &str = "requests_total";

    /// Time spent in backend calls, labeled by `action` and `backend`
    pub const BACKEND_DURATION_SECONDS: &str = "backend_duration_seconds";
}

/// Histogram buckets for backend call durations
const DURATION_BUCKETS: &[f64] = &[
    0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0,
];

/// Proxy operations counted by `requests_total`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Connect,
    Disconnect,
    Bind,
    Search,
    Whoami,
    Add,
    Delete,
    Modify,
    ModifyDn,
    Extended,
    ModifyPassword,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Connect => "connect",
            Self::Disconnect => "disconnect",
            Self::Bind => "bind",
            Self::Search => "search",
            Self::Whoami => "whoami",
            Self::Add => "add",
            Self::Delete => "delete",
            Self::Modify => "modify",
            Self::ModifyDn => "modify_dn",
            Self::Extended => "extended",
            Self::ModifyPassword => "modify_password",
        }
    }
}

/// Backend-calling operations timed by `backend_duration_seconds`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendAction {
    Auth,
    Search,
}

impl BackendAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Auth => "auth",
            Self::Search => "search",
        }
    }
}

/// Metrics recorder handle
#[derive(Clone)]
pub struct ProxyMetrics {
    handle: Option<PrometheusHandle>,
}

impl ProxyMetrics {
    /// Install the process-wide Prometheus recorder
    ///
    /// Call once at startup, before serving begins.
    pub fn new() -> Self {
        let handle = PrometheusBuilder::new()
            .set_buckets_for_metric(
                Matcher::Full(names::BACKEND_DURATION_SECONDS.to_string()),
                DURATION_BUCKETS,
            )
            .expect("invalid duration buckets")
            .install_recorder()
            .expect("Failed to install Prometheus recorder");

        Self {
            handle: Some(handle),
        }
    }

    /// Handle that records against whatever recorder the embedding process
    /// installed, or nothing at all
    ///
    /// Used when metrics are disabled by configuration, and in tests.
    pub fn disabled() -> Self {
        Self { handle: None }
    }

    /// Metrics output in Prometheus text format
    ///
    /// Empty when this handle did not install the recorder.
    pub fn render(&self) -> String {
        self.handle.as_ref().map(|h| h.render()).unwrap_or_default()
    }

    /// Count one processed operation
    pub fn record_request(&self, action: Action) {
        counter!(names::REQUESTS_TOTAL, "action" => action.as_str()).increment(1);
    }

    /// Record the duration of one backend call
    pub fn record_backend_duration(&self, action: BackendAction, backend: &str, duration: Duration) {
        histogram!(
            names::BACKEND_DURATION_SECONDS,
            "action" => action.as_str(),
            "backend" => backend.to_string()
        )
        .record(duration.as_secs_f64());
    }
}

impl Default for ProxyMetrics {
    fn default() -> Self {
        Self::new()
    }
}
