//! Multi-backend search aggregation
//!
//! Fans the filter out to every registered backend and concatenates the
//! converted results in registry order.

use crate::metrics::{BackendAction, ProxyMetrics};
use std::time::Instant;
use wasit_backend::BackendRegistry;
use wasit_core::types::SearchResult;
use wasit_core::Result;

/// Query every backend with the filter and collect the results
///
/// The first backend error aborts the whole search; results gathered so
/// far are discarded. Every backend call is timed against the backend's
/// name, whether it succeeds or not.
pub(crate) async fn aggregate(
    registry: &BackendRegistry,
    metrics: &ProxyMetrics,
    filter: &str,
) -> Result<Vec<SearchResult>> {
    let mut results = Vec::new();

    for backend in registry.iter() {
        let start = Instant::now();
        let outcome = backend.get_users(filter).await;
        metrics.record_backend_duration(BackendAction::Search, backend.name(), start.elapsed());

        let users = outcome?;
        results.extend(users.into_iter().map(SearchResult::from));
    }

    Ok(results)
}
