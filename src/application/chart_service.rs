// Chart service - Use case for building a chart payload from series requests
use crate::application::batch_executor::BatchExecutor;
use crate::application::query_planner::QueryPlanner;
use crate::application::series_assembler::assemble;
use crate::domain::error::ChartError;
use crate::domain::plan::Plan;
use crate::domain::telemetry::{ChartPayload, ChartRequest};
use crate::domain::time_window::TimeWindow;
use std::time::Instant;

/// Who is asking. Authorization has already happened upstream; this is carried for logging.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    pub principal: Option<String>,
}

impl RequestContext {
    pub fn for_principal(principal: impl Into<String>) -> Self {
        Self {
            principal: Some(principal.into()),
        }
    }
}

/// Holds no per-call state, so one instance can serve concurrent callers
#[derive(Clone)]
pub struct ChartService {
    planner: QueryPlanner,
    executor: BatchExecutor,
}

impl ChartService {
    pub fn new(planner: QueryPlanner, executor: BatchExecutor) -> Self {
        Self { planner, executor }
    }

    pub async fn build_chart(
        &self,
        context: &RequestContext,
        request: ChartRequest,
    ) -> Result<ChartPayload, ChartError> {
        let started = Instant::now();
        let window = TimeWindow::from_dates(&request.start_date, &request.end_date)?;
        let requested = request.series.len();

        let planned = self.planner.plan(window, request.series).await?;
        let plans: Vec<Plan> = planned.iter().map(|p| p.plan.clone()).collect();
        let fetched = self.executor.execute(&plans).await?;

        let clamped = planned
            .into_iter()
            .zip(fetched)
            .map(|(series, samples)| {
                let samples = series.request.clamp.apply_all(samples);
                (series, samples)
            })
            .collect();
        let payload = assemble(request.kind, clamped);

        tracing::info!(
            "Built chart for {}: {} of {} series, {} labels, window {} .. {} in {:?}",
            context.principal.as_deref().unwrap_or("anonymous"),
            payload.series.len(),
            requested,
            payload.labels.len(),
            window.start,
            window.end,
            started.elapsed()
        );

        Ok(payload)
    }
}
