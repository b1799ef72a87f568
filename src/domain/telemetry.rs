// Chart request and payload domain models
use super::clamp::ValueClamp;
use super::granularity::Granularity;
use serde::{Deserialize, Serialize};

/// Placeholder the chart front-end substitutes with the axis value
pub const VALUE_PLACEHOLDER: &str = "{value}";

/// Decimal places the front-end shows on value axes
pub const AXIS_DECIMALS: u32 = 2;

/// One measurement, serialized as `[time_ms, value]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(into = "(i64, f64)")]
pub struct Sample {
    pub time_ms: i64,
    pub value: f64,
}

impl Sample {
    pub fn new(time_ms: i64, value: f64) -> Self {
        Self { time_ms, value }
    }
}

impl From<Sample> for (i64, f64) {
    fn from(sample: Sample) -> Self {
        (sample.time_ms, sample.value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SensorMetadata {
    pub name: String,
    pub unit: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    #[default]
    Line,
    Bar,
    Area,
    Scatter,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SeriesRequest {
    pub sensor_id: String,
    pub label: String,
    pub color: String,
    pub granularity: Granularity,
    pub control_sensor_id: Option<String>,
    pub clamp: ValueClamp,
    pub axis_min: Option<f64>,
    pub axis_max: Option<f64>,
    pub unit_prefix: Option<String>,
    pub unit_suffix: Option<String>,
}

impl SeriesRequest {
    pub fn new(sensor_id: impl Into<String>, label: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            sensor_id: sensor_id.into(),
            label: label.into(),
            color: color.into(),
            granularity: Granularity::None,
            control_sensor_id: None,
            clamp: ValueClamp::default(),
            axis_min: None,
            axis_max: None,
            unit_prefix: None,
            unit_suffix: None,
        }
    }
}

/// A whole chart request: the raw date boundaries plus one entry per series
#[derive(Debug, Clone, PartialEq)]
pub struct ChartRequest {
    pub start_date: String,
    pub end_date: String,
    pub kind: ChartKind,
    pub series: Vec<SeriesRequest>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AxisSettings {
    pub min: f64,
    pub max: f64,
    pub label_format: String,
    pub decimals_in_float: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesResult {
    pub sensor_id: String,
    pub label: String,
    pub color: String,
    pub y_axis: usize,
    #[serde(rename = "data")]
    pub points: Vec<Sample>,
    pub axis: AxisSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartPayload {
    #[serde(rename = "type")]
    pub kind: ChartKind,
    pub labels: Vec<i64>,
    pub series: Vec<SeriesResult>,
}
