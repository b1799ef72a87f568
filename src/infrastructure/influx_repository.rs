// InfluxDB repository implementation
use crate::application::telemetry_repository::TelemetryStore;
use crate::domain::error::StoreError;
use crate::domain::granularity::Granularity;
use crate::domain::plan::Plan;
use crate::domain::telemetry::Sample;
use crate::infrastructure::config::InfluxSettings;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Semaphore;

#[derive(Debug, Clone)]
pub struct InfluxRepository {
    client: reqwest::Client,
    host: String,
    token: String,
    database: String,
    retention_policy: String,
    measurement: String,
    sensor_tag: String,
    value_field: String,
    max_connections: Option<usize>,
    /// One permit per pooled connection, shared by every concurrent caller
    permits: Option<Arc<Semaphore>>,
}

#[derive(Debug, Deserialize)]
struct InfluxQLResponse {
    #[serde(default)]
    results: Vec<InfluxQLResult>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct InfluxQLResult {
    #[serde(default)]
    series: Option<Vec<InfluxQLSeries>>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    partial: bool,
}

#[derive(Debug, Deserialize)]
struct InfluxQLSeries {
    columns: Vec<String>,
    #[serde(default)]
    values: Vec<Vec<Value>>,
    #[serde(default)]
    tags: Option<HashMap<String, String>>,
    /// Set when the server truncated the series (`max-row-limit`)
    #[serde(default)]
    partial: bool,
}

/// An InfluxQL statement plus its bound parameters.
///
/// Request values (sensor ids, window bounds) only ever travel as parameters; the statement
/// text holds nothing but configured identifiers.
#[derive(Debug, Clone, PartialEq)]
struct Statement {
    text: String,
    params: Map<String, Value>,
    /// Server computes the bucket means, rows come back finished
    pushed_down: bool,
}

impl InfluxRepository {
    pub fn new(settings: InfluxSettings) -> anyhow::Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(max) = settings.max_connections {
            builder = builder.pool_max_idle_per_host(max);
        }

        Ok(Self {
            client: builder.build()?,
            host: settings.host.trim_end_matches('/').to_string(),
            token: settings.token,
            database: settings.database,
            retention_policy: settings.retention_policy,
            measurement: settings.measurement,
            sensor_tag: settings.sensor_tag,
            value_field: settings.value_field,
            max_connections: settings.max_connections,
            permits: settings
                .max_connections
                .map(|max| Arc::new(Semaphore::new(max.max(1)))),
        })
    }

    fn build_statement(&self, plan: &Plan) -> Statement {
        let measurement = quote_ident(&self.measurement);
        let tag = quote_ident(&self.sensor_tag);
        let field = quote_ident(&self.value_field);

        let mut params = Map::new();
        params.insert("sensor".to_string(), Value::from(plan.sensor_id.clone()));
        params.insert("start".to_string(), Value::from(plan.window.start.to_rfc3339()));
        params.insert("end".to_string(), Value::from(plan.window.end.to_rfc3339()));

        if let (None, Some(interval)) = (&plan.control, server_interval(plan.granularity)) {
            let text = format!(
                "SELECT mean({field}) AS \"value\" FROM {measurement} \
                 WHERE {tag} = $sensor AND time >= $start AND time <= $end \
                 GROUP BY time({interval}) fill(none)"
            );
            return Statement {
                text,
                params,
                pushed_down: true,
            };
        }

        // Primary and control rows share one query, split again by tag
        let sensor_filter = match &plan.control {
            Some(join) => {
                params.insert("control".to_string(), Value::from(join.sensor_id.clone()));
                format!("({tag} = $sensor OR {tag} = $control)")
            }
            None => format!("{tag} = $sensor"),
        };
        let text = format!(
            "SELECT {field} AS \"value\" FROM {measurement} \
             WHERE {sensor_filter} AND time >= $start AND time <= $end GROUP BY {tag}"
        );

        Statement {
            text,
            params,
            pushed_down: false,
        }
    }

    fn build_query_url(&self, statement: &Statement) -> Result<String, StoreError> {
        let params = serde_json::to_string(&statement.params)
            .map_err(|e| StoreError::Protocol(format!("Failed to encode parameters: {}", e)))?;
        Ok(format!(
            "{}/query?db={}&rp={}&epoch=ms&q={}&params={}",
            self.host,
            urlencoding::encode(&self.database),
            urlencoding::encode(&self.retention_policy),
            urlencoding::encode(&statement.text),
            urlencoding::encode(&params)
        ))
    }

    async fn execute_query(&self, statement: &Statement) -> Result<InfluxQLResponse, StoreError> {
        let url = self.build_query_url(statement)?;

        let response = self
            .client
            .get(&url)
            .header("Authorization", format!("Token {}", self.token))
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| StoreError::Unavailable(format!("Failed to send request to InfluxDB: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = format!("InfluxDB query failed with status {}: {}", status, body);
            return Err(if status.is_server_error() {
                StoreError::Unavailable(message)
            } else {
                StoreError::Protocol(message)
            });
        }

        let data = response
            .json::<InfluxQLResponse>()
            .await
            .map_err(|e| StoreError::Protocol(format!("Failed to parse InfluxDB response: {}", e)))?;

        check_errors(&data)?;
        Ok(data)
    }

    /// Split response rows into (primary, control) by the sensor tag
    fn split_rows(&self, response: InfluxQLResponse, plan: &Plan) -> (Vec<Sample>, Vec<Sample>) {
        let mut primary = Vec::new();
        let mut control = Vec::new();
        let control_id = plan.control.as_ref().map(|c| c.sensor_id.as_str());

        let series = response
            .results
            .into_iter()
            .flat_map(|r| r.series.unwrap_or_default());
        for s in series {
            let sensor = s
                .tags
                .as_ref()
                .and_then(|tags| tags.get(&self.sensor_tag))
                .map(String::as_str);
            let rows = parse_rows(&s);

            match sensor {
                // Only trust the tag when the ids differ; a self-gated plan wants both
                Some(id) if Some(id) == control_id && id != plan.sensor_id => control.extend(rows),
                Some(id) if Some(id) == control_id => {
                    control.extend(rows.iter().copied());
                    primary.extend(rows);
                }
                _ => primary.extend(rows),
            }
        }

        (primary, control)
    }
}

#[async_trait]
impl TelemetryStore for InfluxRepository {
    async fn fetch_range(&self, plan: &Plan) -> Result<Vec<Sample>, StoreError> {
        let statement = self.build_statement(plan);
        tracing::debug!(
            "Executing InfluxQL for series {} (pushed down: {}): {}",
            plan.series_index,
            statement.pushed_down,
            statement.text
        );

        let permit = match &self.permits {
            Some(permits) => Some(permits.acquire().await.map_err(|_| {
                StoreError::Unavailable("InfluxDB connection pool closed".to_string())
            })?),
            None => None,
        };
        let response = self.execute_query(&statement).await?;
        drop(permit);

        let pushed_down = statement.pushed_down;
        let (mut primary, control) = self.split_rows(response, plan);

        if pushed_down {
            primary.sort_by_key(|s| s.time_ms);
            return Ok(primary);
        }

        let control = plan.control.as_ref().map(|_| control.as_slice());
        Ok(plan.reduce(primary, control))
    }

    fn max_concurrency(&self) -> Option<usize> {
        self.max_connections
    }
}

/// Bucket interval InfluxQL can compute itself. Months have no fixed width, so they are
/// bucketed in-process. The 3d offset moves epoch-aligned weeks (Thursday) to Sunday.
fn server_interval(granularity: Granularity) -> Option<&'static str> {
    match granularity {
        Granularity::Hour => Some("1h"),
        Granularity::Day => Some("1d"),
        Granularity::Week => Some("1w, 3d"),
        Granularity::None | Granularity::Month => None,
    }
}

fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('\\', "\\\\").replace('"', "\\\""))
}

fn check_errors(data: &InfluxQLResponse) -> Result<(), StoreError> {
    if let Some(error) = &data.error {
        return Err(StoreError::Protocol(format!("InfluxDB query error: {}", error)));
    }
    if let Some(error) = data.results.iter().find_map(|r| r.error.as_ref()) {
        return Err(StoreError::Protocol(format!("InfluxDB query error: {}", error)));
    }
    let truncated = data
        .results
        .iter()
        .any(|r| r.partial || r.series.iter().flatten().any(|s| s.partial));
    if truncated {
        return Err(StoreError::Protocol(
            "InfluxDB returned a partial result; raise max-row-limit or narrow the range".to_string(),
        ));
    }
    Ok(())
}

fn parse_rows(series: &InfluxQLSeries) -> Vec<Sample> {
    let time_idx = series.columns.iter().position(|c| c == "time").unwrap_or(0);
    let value_idx = series.columns.iter().position(|c| c == "value").unwrap_or(1);

    series
        .values
        .iter()
        .filter_map(|row| {
            let time = row.get(time_idx).and_then(parse_time)?;
            let value = row.get(value_idx).and_then(parse_value)?;
            Some(Sample::new(time, value))
        })
        .collect()
}

fn parse_time(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => chrono::DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|t| t.timestamp_millis()),
        _ => None,
    }
}

/// Control sensors are often stored as booleans
fn parse_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}
