use crate::application::batch_executor::ExecutionStrategy;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct InfluxConfig {
    pub influx: InfluxSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct InfluxSettings {
    pub host: String,
    pub token: String,
    pub database: String,
    pub retention_policy: String,
    #[serde(default = "default_measurement")]
    pub measurement: String,
    #[serde(default = "default_sensor_tag")]
    pub sensor_tag: String,
    #[serde(default = "default_value_field")]
    pub value_field: String,
    /// Connection pool size, also the cap on concurrent plan queries
    #[serde(default)]
    pub max_connections: Option<usize>,
}

fn default_measurement() -> String {
    "sensor_history".to_string()
}

fn default_sensor_tag() -> String {
    "sensor".to_string()
}

fn default_value_field() -> String {
    "value".to_string()
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ServiceConfig {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub engine: EngineSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "0.0.0.0:8080".to_string()
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StrategyName {
    Sequential,
    #[default]
    Concurrent,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EngineSettings {
    #[serde(default = "default_query_timeout_ms")]
    pub query_timeout_ms: u64,
    #[serde(default)]
    pub strategy: StrategyName,
    #[serde(default)]
    pub max_in_flight: Option<usize>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            query_timeout_ms: default_query_timeout_ms(),
            strategy: StrategyName::default(),
            max_in_flight: None,
        }
    }
}

fn default_query_timeout_ms() -> u64 {
    30_000
}

impl EngineSettings {
    pub fn query_timeout(&self) -> Duration {
        Duration::from_millis(self.query_timeout_ms)
    }

    pub fn execution_strategy(&self) -> ExecutionStrategy {
        match self.strategy {
            StrategyName::Sequential => ExecutionStrategy::Sequential,
            StrategyName::Concurrent => ExecutionStrategy::Concurrent {
                max_in_flight: self.max_in_flight,
            },
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct SensorsConfig {
    #[serde(default)]
    pub sensors: Vec<SensorConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SensorConfig {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub unit: Option<String>,
}

pub fn load_influx_config() -> anyhow::Result<InfluxConfig> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("config/influx"))
        .add_source(config::Environment::with_prefix("CHARTS").separator("__"))
        .build()?;

    Ok(settings.try_deserialize()?)
}

pub fn load_service_config() -> anyhow::Result<ServiceConfig> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("config/engine").required(false))
        .add_source(
            config::Environment::with_prefix("CHARTS")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    Ok(settings.try_deserialize()?)
}

pub fn load_sensors_config() -> anyhow::Result<SensorsConfig> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("config/sensors"))
        .build()?;

    Ok(settings.try_deserialize()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::{Config, File, FileFormat};

    fn parse<T: serde::de::DeserializeOwned>(toml: &str) -> T {
        Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn test_engine_defaults() {
        let config: ServiceConfig = parse("");
        assert_eq!(config.server.bind, "0.0.0.0:8080");
        assert_eq!(config.engine.query_timeout(), Duration::from_secs(30));
        assert_eq!(
            config.engine.execution_strategy(),
            ExecutionStrategy::Concurrent { max_in_flight: None }
        );
    }

    #[test]
    fn test_engine_overrides() {
        let config: ServiceConfig = parse(
            r#"
            [server]
            bind = "127.0.0.1:9000"

            [engine]
            query_timeout_ms = 2500
            strategy = "concurrent"
            max_in_flight = 4
            "#,
        );
        assert_eq!(config.server.bind, "127.0.0.1:9000");
        assert_eq!(config.engine.query_timeout(), Duration::from_millis(2500));
        assert_eq!(
            config.engine.execution_strategy(),
            ExecutionStrategy::Concurrent { max_in_flight: Some(4) }
        );

        let sequential: ServiceConfig = parse("[engine]\nstrategy = \"sequential\"");
        assert_eq!(sequential.engine.execution_strategy(), ExecutionStrategy::Sequential);
    }

    #[test]
    fn test_influx_defaults() {
        let config: InfluxConfig = parse(
            r#"
            [influx]
            host = "http://influx:8086/"
            token = "secret"
            database = "plant"
            retention_policy = "autogen"
            "#,
        );
        assert_eq!(config.influx.measurement, "sensor_history");
        assert_eq!(config.influx.sensor_tag, "sensor");
        assert_eq!(config.influx.value_field, "value");
        assert_eq!(config.influx.max_connections, None);
    }

    #[test]
    fn test_sensor_list() {
        let config: SensorsConfig = parse(
            r#"
            [[sensors]]
            id = "TT-101"
            name = "Boiler temperature"
            unit = "°C"

            [[sensors]]
            id = "RUN-1"
            name = "Pump running"
            "#,
        );
        assert_eq!(config.sensors.len(), 2);
        assert_eq!(config.sensors[0].unit.as_deref(), Some("°C"));
        assert!(config.sensors[1].unit.is_none());
    }
}
