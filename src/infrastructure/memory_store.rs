// In-memory store used by tests: latency, failure injection and query accounting
use crate::application::telemetry_repository::TelemetryStore;
use crate::domain::error::StoreError;
use crate::domain::plan::Plan;
use crate::domain::telemetry::Sample;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

#[derive(Debug, Default)]
pub struct MemoryStore {
    series: HashMap<String, Vec<Sample>>,
    latency: HashMap<String, Duration>,
    failing: HashSet<String>,
    max_concurrency: Option<usize>,
    permits: Option<Arc<Semaphore>>,
    queries: AtomicUsize,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_series(mut self, sensor_id: &str, samples: Vec<Sample>) -> Self {
        self.series.insert(sensor_id.to_string(), samples);
        self
    }

    pub fn with_latency(mut self, sensor_id: &str, latency: Duration) -> Self {
        self.latency.insert(sensor_id.to_string(), latency);
        self
    }

    pub fn failing(mut self, sensor_id: &str) -> Self {
        self.failing.insert(sensor_id.to_string());
        self
    }

    pub fn with_max_concurrency(mut self, limit: usize) -> Self {
        self.max_concurrency = Some(limit);
        self.permits = Some(Arc::new(Semaphore::new(limit)));
        self
    }

    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }
}

/// Decrements the in-flight counter even when the fetch is cancelled
struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl TelemetryStore for MemoryStore {
    async fn fetch_range(&self, plan: &Plan) -> Result<Vec<Sample>, StoreError> {
        // Shared by every caller, like a real connection pool
        let _permit = match &self.permits {
            Some(permits) => Some(
                permits
                    .acquire()
                    .await
                    .map_err(|_| StoreError::Unavailable("connection pool closed".to_string()))?,
            ),
            None => None,
        };
        self.queries.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        let _guard = InFlight(&self.in_flight);

        if let Some(latency) = self.latency.get(&plan.sensor_id) {
            tokio::time::sleep(*latency).await;
        }
        if self.failing.contains(&plan.sensor_id) {
            return Err(StoreError::Unavailable(format!(
                "no route to shard holding {}",
                plan.sensor_id
            )));
        }

        let primary = self.series.get(&plan.sensor_id).cloned().unwrap_or_default();
        let control = plan
            .control
            .as_ref()
            .and_then(|join| self.series.get(&join.sensor_id));

        Ok(plan.reduce(primary, control.map(|rows| rows.as_slice())))
    }

    fn max_concurrency(&self) -> Option<usize> {
        self.max_concurrency
    }
}
