// Series assembler - Builds the chart payload from fetched series
use crate::application::query_planner::PlannedSeries;
use crate::domain::telemetry::{
    AXIS_DECIMALS, AxisSettings, ChartKind, ChartPayload, Sample, SeriesResult, VALUE_PLACEHOLDER,
};

/// Assemble fetched series into one payload, in the order given.
///
/// Series without samples are left out. The first series that is kept supplies the
/// shared x-axis labels, since every series of a chart is drawn on the same time axis.
pub fn assemble(kind: ChartKind, fetched: Vec<(PlannedSeries, Vec<Sample>)>) -> ChartPayload {
    let mut labels: Option<Vec<i64>> = None;
    let mut series = Vec::with_capacity(fetched.len());

    for (planned, samples) in fetched {
        if samples.is_empty() {
            tracing::debug!(
                "Skipping series {} ({}) - no data in range",
                planned.plan.series_index,
                planned.plan.sensor_id
            );
            continue;
        }

        if labels.is_none() {
            labels = Some(samples.iter().map(|s| s.time_ms).collect());
        }
        let position = series.len();
        series.push(assemble_series(position, &planned, samples));
    }

    ChartPayload {
        kind,
        labels: labels.unwrap_or_default(),
        series,
    }
}

fn assemble_series(y_axis: usize, planned: &PlannedSeries, points: Vec<Sample>) -> SeriesResult {
    let request = &planned.request;

    let (observed_min, observed_max) = points.iter().fold(
        (f64::INFINITY, f64::NEG_INFINITY),
        |(min, max), s| (min.min(s.value), max.max(s.value)),
    );

    let label = if request.label.trim().is_empty() {
        planned.sensor.name.clone()
    } else {
        request.label.clone()
    };
    let suffix = request
        .unit_suffix
        .as_deref()
        .or(planned.sensor.unit.as_deref());

    SeriesResult {
        sensor_id: request.sensor_id.clone(),
        label,
        color: request.color.clone(),
        y_axis,
        points,
        axis: AxisSettings {
            min: request.axis_min.unwrap_or(observed_min),
            max: request.axis_max.unwrap_or(observed_max),
            label_format: label_format(request.unit_prefix.as_deref(), suffix),
            decimals_in_float: AXIS_DECIMALS,
        },
    }
}

/// `prefix {value} suffix`, leaving out blank parts
pub fn label_format(prefix: Option<&str>, suffix: Option<&str>) -> String {
    [prefix, Some(VALUE_PLACEHOLDER), suffix]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
