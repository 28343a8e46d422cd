use serde::{Deserialize, Serialize};

use super::Table;

#[derive(Clone, Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct RadarRecord {
    pub id: i64,
    pub ts: String,
    /// JSON object holding every `sector_*` field of the sweep
    pub sector_payload: String,
    pub min_distance_m: Option<f64>,
    pub objects_count: Option<i64>,
    pub room: Option<String>,
    pub device: Option<String>,
}

#[derive(Clone)]
pub struct RadarRecordTable;

impl Table for RadarRecordTable {
    fn name(&self) -> &'static str {
        "radar_samples"
    }

    fn create(&self) -> String {
        String::from(
            r#"
            CREATE TABLE IF NOT EXISTS radar_samples (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                ts TEXT NOT NULL,
                sector_payload TEXT NOT NULL,
                min_distance_m REAL,
                objects_count INTEGER,
                room TEXT,
                device TEXT
            );
            "#,
        )
    }

    fn dispose(&self) -> String {
        String::from("DROP TABLE IF EXISTS radar_samples;")
    }

    fn dependencies(&self) -> Vec<&'static str> {
        vec![]
    }
}
