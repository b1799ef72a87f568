// Batch executor - Runs fetch plans against the store
use crate::application::telemetry_repository::TelemetryStore;
use crate::domain::error::ChartError;
use crate::domain::plan::Plan;
use crate::domain::telemetry::Sample;
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::{Duration, Instant};

pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionStrategy {
    /// One plan at a time, in request order
    Sequential,
    /// Fan out up to `max_in_flight` plans (all of them when unset), still capped by the store
    Concurrent { max_in_flight: Option<usize> },
}

impl Default for ExecutionStrategy {
    fn default() -> Self {
        ExecutionStrategy::Concurrent { max_in_flight: None }
    }
}

#[derive(Clone)]
pub struct BatchExecutor {
    store: Arc<dyn TelemetryStore>,
    strategy: ExecutionStrategy,
    query_timeout: Duration,
}

impl BatchExecutor {
    pub fn new(store: Arc<dyn TelemetryStore>) -> Self {
        Self {
            store,
            strategy: ExecutionStrategy::default(),
            query_timeout: DEFAULT_QUERY_TIMEOUT,
        }
    }

    pub fn with_strategy(mut self, strategy: ExecutionStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_query_timeout(mut self, query_timeout: Duration) -> Self {
        self.query_timeout = query_timeout;
        self
    }

    /// Execute every plan and return their samples in plan order.
    ///
    /// Completion order does not matter: each result lands in its plan's slot. The first
    /// plan to fail (store error or timeout) fails the whole batch and drops the fetches
    /// still in flight. An empty vector for a plan means it matched no rows.
    pub async fn execute(&self, plans: &[Plan]) -> Result<Vec<Vec<Sample>>, ChartError> {
        if plans.is_empty() {
            return Ok(Vec::new());
        }

        let limit = self.concurrency_limit(plans.len());
        tracing::debug!("Executing {} plans with up to {} in flight", plans.len(), limit);

        let mut pending = stream::iter(plans.iter().cloned().enumerate())
            .map(|(slot, plan)| {
                let store = Arc::clone(&self.store);
                let query_timeout = self.query_timeout;
                async move { (slot, run_plan(store, plan, query_timeout).await) }
            })
            .buffer_unordered(limit);

        let mut results = vec![Vec::new(); plans.len()];
        while let Some((slot, outcome)) = pending.next().await {
            results[slot] = outcome?;
        }
        Ok(results)
    }

    fn concurrency_limit(&self, plan_count: usize) -> usize {
        let requested = match self.strategy {
            ExecutionStrategy::Sequential => 1,
            ExecutionStrategy::Concurrent { max_in_flight } => {
                max_in_flight.unwrap_or(plan_count).min(plan_count)
            }
        };
        let capped = match self.store.max_concurrency() {
            Some(pool) => requested.min(pool),
            None => requested,
        };
        capped.max(1)
    }
}

async fn run_plan(
    store: Arc<dyn TelemetryStore>,
    plan: Plan,
    query_timeout: Duration,
) -> Result<Vec<Sample>, ChartError> {
    let started = Instant::now();

    match tokio::time::timeout(query_timeout, store.fetch_range(&plan)).await {
        Ok(Ok(samples)) => {
            tracing::debug!(
                "Series {} ({}): {} rows in {:?}",
                plan.series_index,
                plan.sensor_id,
                samples.len(),
                started.elapsed()
            );
            Ok(samples)
        }
        Ok(Err(source)) => {
            tracing::warn!(
                "Series {} ({}) failed: {}",
                plan.series_index,
                plan.sensor_id,
                source
            );
            Err(ChartError::StoreUnavailable {
                series_index: plan.series_index,
                sensor_id: plan.sensor_id,
                source,
            })
        }
        Err(_) => {
            tracing::warn!(
                "Series {} ({}) timed out after {:?}",
                plan.series_index,
                plan.sensor_id,
                query_timeout
            );
            Err(ChartError::QueryTimeout {
                series_index: plan.series_index,
                sensor_id: plan.sensor_id,
                timeout_ms: u64::try_from(query_timeout.as_millis()).unwrap_or(u64::MAX),
            })
        }
    }
}
