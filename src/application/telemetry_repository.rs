// Collaborator traits for time-series data and sensor metadata
use crate::domain::error::StoreError;
use crate::domain::plan::Plan;
use crate::domain::telemetry::{Sample, SensorMetadata};
use async_trait::async_trait;

#[async_trait]
pub trait TelemetryStore: Send + Sync {
    /// Run one plan as a single bulk range query.
    ///
    /// The returned samples are the plan's finished output: inside the window, gated by the
    /// control sensor when one is set, bucketed and averaged when the plan is bucketed, and
    /// ordered by timestamp. An empty vector means the range holds no rows.
    async fn fetch_range(&self, plan: &Plan) -> Result<Vec<Sample>, StoreError>;

    /// Upper bound on concurrent queries, usually the connection pool size
    fn max_concurrency(&self) -> Option<usize> {
        None
    }
}

#[async_trait]
pub trait SensorCatalog: Send + Sync {
    /// Look up a sensor's presentation metadata; `None` when the id is unknown
    async fn resolve(&self, sensor_id: &str) -> Result<Option<SensorMetadata>, StoreError>;
}
