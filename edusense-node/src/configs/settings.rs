use std::env;

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

use crate::configs::normalize_path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Logger {
    pub level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub room: String,
    pub device: String,
    /// Force every sensor onto its simulator
    pub simulate: bool,
}

/// Grove port names, e.g. `D5` or `A0`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ports {
    pub dht: String,
    pub light: String,
    pub sound: String,
    pub gas: String,
    pub ultrasonic: String,
    pub servo_pwm: String,
    pub adc_address: u16,
}

/// Job intervals in seconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sampling {
    pub temperature_humidity_s: u64,
    pub light_s: u64,
    pub sound_s: u64,
    pub gas_s: u64,
    pub radar_s: u64,
    pub flush_s: u64,
    pub sound_window: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Radar {
    pub sectors: usize,
    pub object_threshold_m: f64,
    pub angle_step_deg: u16,
    pub settle_ms: u64,
    pub reads_per_angle: usize,
    pub max_distance_m: f64,
    pub servo_min_duty: f64,
    pub servo_max_duty: f64,
    pub servo_frequency: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Database {
    pub url: String,
    pub clean_start: bool,
    pub retention_days: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InfluxVersion {
    #[serde(rename = "1")]
    V1,
    #[serde(rename = "2")]
    V2,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InfluxTags {
    pub room: Option<String>,
    pub device: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InfluxV1 {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub database: String,
    pub ssl: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InfluxV2 {
    pub url: Option<String>,
    pub token: Option<String>,
    pub org: Option<String>,
    pub bucket: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Influx {
    pub version: InfluxVersion,
    pub measurement_env: String,
    pub measurement_radar: String,
    pub batch_size: usize,
    pub flush_interval_s: u64,
    pub retry_attempts: u32,
    pub retry_base_delay_ms: u64,
    pub timeout_ms: u64,
    #[serde(default)]
    pub tags: InfluxTags,
    pub v1: Option<InfluxV1>,
    pub v2: Option<InfluxV2>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub logger: Logger,
    pub node: Node,
    pub ports: Ports,
    pub sampling: Sampling,
    pub radar: Radar,
    pub database: Database,
    pub influx: Influx,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or("development".into());

        let mut settings: Settings = Config::builder()
            .add_source(File::with_name("configs/default"))
            .add_source(File::with_name(&format!("configs/{run_mode}")).required(false))
            .add_source(
                Environment::with_prefix("EDUSENSE")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        settings.database.url = Self::normalize_database_url(&settings.database.url)?;

        Ok(settings)
    }

    // `sqlite://~/data/metrics.db` is resolved against the project root
    fn normalize_database_url(url: &str) -> Result<String, ConfigError> {
        let Some(path) = url.strip_prefix("sqlite://") else {
            return Ok(url.to_string());
        };
        if path.starts_with(":memory:") || !path.starts_with("~/") {
            return Ok(url.to_string());
        }

        let normalized = normalize_path(path)
            .map_err(|e| ConfigError::Message(e.to_string()))?
            .to_string_lossy()
            .to_string();

        Ok(format!("sqlite://{normalized}"))
    }
}
