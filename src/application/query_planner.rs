// Query planner - One fetch plan per requested series
use crate::application::telemetry_repository::SensorCatalog;
use crate::domain::error::ChartError;
use crate::domain::plan::Plan;
use crate::domain::telemetry::{SensorMetadata, SeriesRequest};
use crate::domain::time_window::TimeWindow;
use std::sync::Arc;

/// A series request together with its resolved sensor and fetch plan
#[derive(Debug, Clone)]
pub struct PlannedSeries {
    pub request: SeriesRequest,
    pub sensor: SensorMetadata,
    pub plan: Plan,
}

#[derive(Clone)]
pub struct QueryPlanner {
    catalog: Arc<dyn SensorCatalog>,
}

impl QueryPlanner {
    pub fn new(catalog: Arc<dyn SensorCatalog>) -> Self {
        Self { catalog }
    }

    /// Plan every series against the shared window, keeping request order.
    ///
    /// Any unknown sensor (primary or control) fails the whole call.
    pub async fn plan(
        &self,
        window: TimeWindow,
        requests: Vec<SeriesRequest>,
    ) -> Result<Vec<PlannedSeries>, ChartError> {
        let mut planned = Vec::with_capacity(requests.len());

        for (index, request) in requests.into_iter().enumerate() {
            let sensor = self.resolve(index, &request.sensor_id).await?;

            let mut plan = Plan::new(index, request.sensor_id.clone(), window)
                .with_granularity(request.granularity);
            if let Some(control_id) = &request.control_sensor_id {
                self.resolve(index, control_id).await?;
                plan = plan.with_control(control_id.clone());
            }

            tracing::debug!(
                "Planned series {}: sensor={}, granularity={}, control={:?}",
                index,
                plan.sensor_id,
                plan.granularity,
                plan.control.as_ref().map(|c| c.sensor_id.as_str())
            );

            planned.push(PlannedSeries {
                request,
                sensor,
                plan,
            });
        }

        Ok(planned)
    }

    async fn resolve(&self, series_index: usize, sensor_id: &str) -> Result<SensorMetadata, ChartError> {
        match self.catalog.resolve(sensor_id).await {
            Ok(Some(metadata)) => Ok(metadata),
            Ok(None) => Err(ChartError::UnknownSensor {
                series_index,
                sensor_id: sensor_id.to_string(),
            }),
            Err(source) => Err(ChartError::StoreUnavailable {
                series_index,
                sensor_id: sensor_id.to_string(),
                source,
            }),
        }
    }
}
