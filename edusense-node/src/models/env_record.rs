use serde::{Deserialize, Serialize};

use super::Table;

#[derive(Clone, Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct EnvRecord {
    pub id: i64,
    /// RFC 3339 UTC timestamp
    pub ts: String,
    /// Temperature in Celsius
    pub temperature_c: Option<f64>,
    /// Relative humidity %
    pub humidity_pct: Option<f64>,
    pub light_adc: Option<f64>,
    pub sound_adc: Option<f64>,
    pub sound_digital: Option<bool>,
    pub gas_adc: Option<f64>,
    pub room: Option<String>,
    pub device: Option<String>,
}

#[derive(Clone)]
pub struct EnvRecordTable;

impl Table for EnvRecordTable {
    fn name(&self) -> &'static str {
        "env_samples"
    }

    fn create(&self) -> String {
        String::from(
            r#"
            CREATE TABLE IF NOT EXISTS env_samples (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                ts TEXT NOT NULL,
                temperature_c REAL,
                humidity_pct REAL,
                light_adc REAL,
                sound_adc REAL,
                sound_digital INTEGER,
                gas_adc REAL,
                room TEXT,
                device TEXT
            );
            "#,
        )
    }

    fn dispose(&self) -> String {
        String::from("DROP TABLE IF EXISTS env_samples;")
    }

    fn dependencies(&self) -> Vec<&'static str> {
        vec![]
    }
}
