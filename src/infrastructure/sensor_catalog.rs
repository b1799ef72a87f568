// Sensor catalog backed by presentation configuration
use crate::application::telemetry_repository::SensorCatalog;
use crate::domain::error::StoreError;
use crate::domain::telemetry::SensorMetadata;
use crate::infrastructure::config::SensorsConfig;
use async_trait::async_trait;
use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct ConfiguredSensorCatalog {
    sensors: HashMap<String, SensorMetadata>,
}

impl ConfiguredSensorCatalog {
    pub fn new(config: SensorsConfig) -> Self {
        let sensors = config
            .sensors
            .into_iter()
            .map(|s| {
                (
                    s.id,
                    SensorMetadata {
                        name: s.name,
                        unit: s.unit,
                    },
                )
            })
            .collect();
        Self { sensors }
    }

    #[cfg(test)]
    pub fn from_entries<'a>(
        entries: impl IntoIterator<Item = (&'a str, &'a str, Option<&'a str>)>,
    ) -> Self {
        let sensors = entries
            .into_iter()
            .map(|(id, name, unit)| {
                (
                    id.to_string(),
                    SensorMetadata {
                        name: name.to_string(),
                        unit: unit.map(str::to_string),
                    },
                )
            })
            .collect();
        Self { sensors }
    }

    pub fn len(&self) -> usize {
        self.sensors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sensors.is_empty()
    }
}

#[async_trait]
impl SensorCatalog for ConfiguredSensorCatalog {
    async fn resolve(&self, sensor_id: &str) -> Result<Option<SensorMetadata>, StoreError> {
        Ok(self.sensors.get(sensor_id).cloned())
    }
}
