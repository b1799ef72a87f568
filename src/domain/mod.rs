// Domain layer - Chart models, time windows, bucketing and plans
pub mod clamp;
pub mod error;
pub mod granularity;
pub mod plan;
pub mod telemetry;
pub mod time_window;
