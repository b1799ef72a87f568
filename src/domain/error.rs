// Error taxonomy for chart requests and store adapters
use thiserror::Error;

/// Failure reported by a time-series store adapter
#[derive(Debug, Error)]
pub enum StoreError {
    /// Connection or server-side failure; retrying later may succeed
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// The store rejected the query or answered with something we could not decode
    #[error("store protocol error: {0}")]
    Protocol(String),
}

/// Everything that can abort a chart request.
///
/// Input errors are reported immediately and are never retryable. Store errors carry
/// the series that caused them so the caller can narrow the request.
#[derive(Debug, Error)]
pub enum ChartError {
    #[error("invalid range: {0}")]
    InvalidRange(String),

    #[error("unsupported granularity '{0}'")]
    UnsupportedGranularity(String),

    #[error("unknown sensor '{sensor_id}' referenced by series {series_index}")]
    UnknownSensor {
        series_index: usize,
        sensor_id: String,
    },

    #[error("store unavailable while fetching series {series_index} ({sensor_id})")]
    StoreUnavailable {
        series_index: usize,
        sensor_id: String,
        #[source]
        source: StoreError,
    },

    #[error("query for series {series_index} ({sensor_id}) timed out after {timeout_ms} ms")]
    QueryTimeout {
        series_index: usize,
        sensor_id: String,
        timeout_ms: u64,
    },
}

impl ChartError {
    pub fn kind(&self) -> &'static str {
        match self {
            ChartError::InvalidRange(_) => "invalid_range",
            ChartError::UnsupportedGranularity(_) => "unsupported_granularity",
            ChartError::UnknownSensor { .. } => "unknown_sensor",
            ChartError::StoreUnavailable { .. } => "store_unavailable",
            ChartError::QueryTimeout { .. } => "query_timeout",
        }
    }

    /// Whether the caller may retry the same request unchanged
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ChartError::StoreUnavailable {
                source: StoreError::Unavailable(_),
                ..
            }
        )
    }

    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            ChartError::InvalidRange(_)
                | ChartError::UnsupportedGranularity(_)
                | ChartError::UnknownSensor { .. }
        )
    }

    /// Series index and sensor id of the plan that failed, if any
    pub fn failed_series(&self) -> Option<(usize, &str)> {
        match self {
            ChartError::UnknownSensor {
                series_index,
                sensor_id,
            }
            | ChartError::StoreUnavailable {
                series_index,
                sensor_id,
                ..
            }
            | ChartError::QueryTimeout {
                series_index,
                sensor_id,
                ..
            } => Some((*series_index, sensor_id.as_str())),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_only_for_transient_store_failures() {
        let transient = ChartError::StoreUnavailable {
            series_index: 1,
            sensor_id: "TT-101".to_string(),
            source: StoreError::Unavailable("connection refused".to_string()),
        };
        let rejected = ChartError::StoreUnavailable {
            series_index: 1,
            sensor_id: "TT-101".to_string(),
            source: StoreError::Protocol("bad request".to_string()),
        };
        assert!(transient.is_retryable());
        assert!(!rejected.is_retryable());
        assert!(!ChartError::InvalidRange("x".to_string()).is_retryable());
    }

    #[test]
    fn test_timeout_names_the_series() {
        let err = ChartError::QueryTimeout {
            series_index: 2,
            sensor_id: "PT-7".to_string(),
            timeout_ms: 500,
        };
        assert_eq!(err.failed_series(), Some((2, "PT-7")));
        assert_eq!(
            err.to_string(),
            "query for series 2 (PT-7) timed out after 500 ms"
        );
        assert!(!err.is_input_error());
    }
}
