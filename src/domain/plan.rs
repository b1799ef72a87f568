// Fetch plans: a side-effect free description of one series query
use super::granularity::Granularity;
use super::telemetry::Sample;
use super::time_window::TimeWindow;
use std::collections::{BTreeMap, HashSet};

/// Control value that lets a primary sample through the gate
pub const CONTROL_ON: f64 = 1.0;

/// Inner join against a boolean control sensor on identical timestamps
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlJoin {
    pub sensor_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateFn {
    Mean,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Plan {
    /// Position of the originating series in the request
    pub series_index: usize,
    pub sensor_id: String,
    pub window: TimeWindow,
    pub granularity: Granularity,
    pub control: Option<ControlJoin>,
}

impl Plan {
    pub fn new(series_index: usize, sensor_id: impl Into<String>, window: TimeWindow) -> Self {
        Self {
            series_index,
            sensor_id: sensor_id.into(),
            window,
            granularity: Granularity::None,
            control: None,
        }
    }

    pub fn with_granularity(mut self, granularity: Granularity) -> Self {
        self.granularity = granularity;
        self
    }

    pub fn with_control(mut self, sensor_id: impl Into<String>) -> Self {
        self.control = Some(ControlJoin {
            sensor_id: sensor_id.into(),
        });
        self
    }

    /// Per-bucket aggregation, present whenever the plan is bucketed
    pub fn aggregation(&self) -> Option<AggregateFn> {
        self.granularity.is_bucketed().then_some(AggregateFn::Mean)
    }

    /// Turn raw rows into the plan's output series.
    ///
    /// Rows outside the window are dropped, the control gate is applied when the plan has
    /// one, and bucketed plans are reduced to one mean per bucket keyed by bucket start.
    /// The result is ordered by timestamp. Stores that cannot push the whole plan down
    /// fetch raw rows and finish the work here.
    pub fn reduce(&self, primary: Vec<Sample>, control: Option<&[Sample]>) -> Vec<Sample> {
        let gate: Option<HashSet<i64>> = match (&self.control, control) {
            (Some(_), Some(rows)) => Some(
                rows.iter()
                    .filter(|s| s.value == CONTROL_ON && self.window.contains_ms(s.time_ms))
                    .map(|s| s.time_ms)
                    .collect(),
            ),
            // A gated plan with no control rows lets nothing through
            (Some(_), None) => Some(HashSet::new()),
            (None, _) => None,
        };

        let mut rows: Vec<Sample> = primary
            .into_iter()
            .filter(|s| self.window.contains_ms(s.time_ms))
            .filter(|s| gate.as_ref().is_none_or(|g| g.contains(&s.time_ms)))
            .collect();

        match self.aggregation() {
            None => {
                rows.sort_by_key(|s| s.time_ms);
                rows
            }
            Some(AggregateFn::Mean) => bucket_means(self.granularity, rows),
        }
    }
}

fn bucket_means(granularity: Granularity, rows: Vec<Sample>) -> Vec<Sample> {
    let mut buckets: BTreeMap<i64, (f64, usize)> = BTreeMap::new();
    for row in rows {
        let entry = buckets
            .entry(granularity.bucket_start_ms(row.time_ms))
            .or_insert((0.0, 0));
        entry.0 += row.value;
        entry.1 += 1;
    }

    buckets
        .into_iter()
        .map(|(start, (sum, count))| Sample::new(start, sum / count as f64))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;

    fn ms(rfc3339: &str) -> i64 {
        DateTime::parse_from_rfc3339(rfc3339).unwrap().timestamp_millis()
    }

    fn window() -> TimeWindow {
        TimeWindow::from_dates("2024-01-01", "2024-01-31").unwrap()
    }

    #[test]
    fn test_raw_plan_sorts_and_filters_window() {
        let plan = Plan::new(0, "TT-1", TimeWindow::from_dates("2024-01-02", "2024-01-02").unwrap());
        let rows = vec![
            Sample::new(ms("2024-01-02T12:00:00Z"), 2.0),
            Sample::new(ms("2024-01-01T23:59:59Z"), 9.0),
            Sample::new(ms("2024-01-02T01:00:00Z"), 1.0),
            Sample::new(ms("2024-01-03T00:00:00Z"), 9.0),
        ];
        let out = plan.reduce(rows, None);
        assert_eq!(
            out,
            vec![
                Sample::new(ms("2024-01-02T01:00:00Z"), 1.0),
                Sample::new(ms("2024-01-02T12:00:00Z"), 2.0),
            ]
        );
        assert!(plan.aggregation().is_none());
    }

    #[test]
    fn test_control_gate_keeps_only_matching_true_timestamps() {
        let plan = Plan::new(0, "FT-1", window()).with_control("RUN-1");
        let t1 = ms("2024-01-05T10:00:00Z");
        let t2 = ms("2024-01-05T10:01:00Z");
        let t3 = ms("2024-01-05T10:02:00Z");
        let primary = vec![Sample::new(t1, 3.0), Sample::new(t2, 4.0), Sample::new(t3, 5.0)];
        let control = vec![
            Sample::new(t1, 1.0),
            Sample::new(t2, 0.0),
            // Slightly off timestamps never match
            Sample::new(t3 + 1, 1.0),
        ];

        let out = plan.reduce(primary, Some(&control));
        assert_eq!(out, vec![Sample::new(t1, 3.0)]);
    }

    #[test]
    fn test_gated_plan_without_control_rows_is_empty() {
        let plan = Plan::new(0, "FT-1", window()).with_control("RUN-1");
        let primary = vec![Sample::new(ms("2024-01-05T10:00:00Z"), 3.0)];
        assert!(plan.reduce(primary, None).is_empty());
    }

    #[test]
    fn test_weekly_mean_over_two_weeks() {
        let plan = Plan::new(0, "TT-1", window()).with_granularity(Granularity::Week);
        // Sunday 2024-01-07 starts the second week
        let rows = vec![
            Sample::new(ms("2024-01-02T08:00:00Z"), 1.0),
            Sample::new(ms("2024-01-06T23:59:59Z"), 3.0),
            Sample::new(ms("2024-01-07T00:00:00Z"), 10.0),
            Sample::new(ms("2024-01-09T12:00:00Z"), 20.0),
            Sample::new(ms("2024-01-13T06:00:00Z"), 30.0),
        ];

        let out = plan.reduce(rows, None);
        assert_eq!(
            out,
            vec![
                Sample::new(ms("2023-12-31T00:00:00Z"), 2.0),
                Sample::new(ms("2024-01-07T00:00:00Z"), 20.0),
            ]
        );
        assert_eq!(plan.aggregation(), Some(AggregateFn::Mean));
    }

    #[test]
    fn test_gate_applies_before_bucketing() {
        let plan = Plan::new(0, "TT-1", window())
            .with_granularity(Granularity::Hour)
            .with_control("RUN-1");
        let a = ms("2024-01-03T05:10:00Z");
        let b = ms("2024-01-03T05:20:00Z");
        let c = ms("2024-01-03T05:30:00Z");
        let primary = vec![Sample::new(a, 10.0), Sample::new(b, 100.0), Sample::new(c, 20.0)];
        let control = vec![Sample::new(a, 1.0), Sample::new(c, 1.0)];

        let out = plan.reduce(primary, Some(&control));
        assert_eq!(out, vec![Sample::new(ms("2024-01-03T05:00:00Z"), 15.0)]);
    }

    #[test]
    fn test_buckets_strictly_increase() {
        let plan = Plan::new(0, "TT-1", window()).with_granularity(Granularity::Day);
        let rows: Vec<Sample> = (0..200)
            .rev()
            .map(|i| Sample::new(ms("2024-01-01T00:00:00Z") + i * 3_600_000, i as f64))
            .collect();

        let out = plan.reduce(rows, None);
        assert!(out.windows(2).all(|w| w[0].time_ms < w[1].time_ms));
        assert_eq!(out.len(), 9);
    }
}
