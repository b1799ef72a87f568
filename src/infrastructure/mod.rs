// Infrastructure layer - External dependencies and adapters
pub mod config;
pub mod http_response;
pub mod influx_repository;
#[cfg(test)]
pub mod memory_store;
pub mod sensor_catalog;
