// Hard value limits applied to fetched samples
use super::telemetry::Sample;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ValueClamp {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl ValueClamp {
    pub fn new(min: Option<f64>, max: Option<f64>) -> Self {
        Self { min, max }
    }

    pub fn is_noop(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }

    /// The minimum check wins when a value is at or beyond both limits
    pub fn apply(&self, value: f64) -> f64 {
        match (self.min, self.max) {
            (Some(min), _) if value <= min => min,
            (_, Some(max)) if value >= max => max,
            _ => value,
        }
    }

    pub fn apply_all(&self, samples: Vec<Sample>) -> Vec<Sample> {
        if self.is_noop() {
            return samples;
        }
        samples
            .into_iter()
            .map(|s| Sample::new(s.time_ms, self.apply(s.value)))
            .collect()
    }
}
