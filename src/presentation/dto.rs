// Wire types for the chart endpoint
use crate::domain::clamp::ValueClamp;
use crate::domain::error::ChartError;
use crate::domain::granularity::Granularity;
use crate::domain::telemetry::{ChartKind, ChartRequest, SeriesRequest};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartQuery {
    pub start_date: String,
    pub end_date: String,
    #[serde(default)]
    pub chart_type: Option<ChartKind>,
    pub series: Vec<SeriesQuery>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesQuery {
    pub sensor_id: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub color: String,
    /// Kept as text so unknown values surface as `UnsupportedGranularity`
    #[serde(default)]
    pub granularity: Option<String>,
    #[serde(default)]
    pub control_sensor_id: Option<String>,
    #[serde(default)]
    pub min_clamp: Option<f64>,
    #[serde(default)]
    pub max_clamp: Option<f64>,
    #[serde(default)]
    pub axis_min: Option<f64>,
    #[serde(default)]
    pub axis_max: Option<f64>,
    #[serde(default)]
    pub unit_prefix: Option<String>,
    #[serde(default)]
    pub unit_suffix: Option<String>,
}

impl TryFrom<SeriesQuery> for SeriesRequest {
    type Error = ChartError;

    fn try_from(query: SeriesQuery) -> Result<Self, Self::Error> {
        let granularity = match query.granularity.as_deref() {
            Some(g) => g.parse()?,
            None => Granularity::None,
        };
        // An empty control id means "no gating"
        let control_sensor_id = query.control_sensor_id.filter(|id| !id.trim().is_empty());

        Ok(SeriesRequest {
            sensor_id: query.sensor_id,
            label: query.label,
            color: query.color,
            granularity,
            control_sensor_id,
            clamp: ValueClamp::new(query.min_clamp, query.max_clamp),
            axis_min: query.axis_min,
            axis_max: query.axis_max,
            unit_prefix: query.unit_prefix,
            unit_suffix: query.unit_suffix,
        })
    }
}

impl TryFrom<ChartQuery> for ChartRequest {
    type Error = ChartError;

    fn try_from(query: ChartQuery) -> Result<Self, Self::Error> {
        let series = query
            .series
            .into_iter()
            .map(SeriesRequest::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ChartRequest {
            start_date: query.start_date,
            end_date: query.end_date,
            kind: query.chart_type.unwrap_or_default(),
            series,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub error: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub series: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sensor_id: Option<String>,
    pub retryable: bool,
}

impl From<&ChartError> for ErrorBody {
    fn from(err: &ChartError) -> Self {
        let failed = err.failed_series();
        Self {
            error: err.kind(),
            message: err.to_string(),
            series: failed.map(|(index, _)| index),
            sensor_id: failed.map(|(_, id)| id.to_string()),
            retryable: err.is_retryable(),
        }
    }
}
