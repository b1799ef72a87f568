// Application layer - Chart use case and its pipeline stages
pub mod batch_executor;
pub mod chart_service;
pub mod query_planner;
pub mod series_assembler;
pub mod telemetry_repository;
