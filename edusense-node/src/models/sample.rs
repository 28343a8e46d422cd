use std::fmt;
use std::str::FromStr;

use edusense_analyser::OccupancyMetrics;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use time::format_description::well_known::Rfc3339;
use time::{OffsetDateTime, UtcOffset};

use crate::errors::StorageError;

/// A reading as a field name to scalar mapping, plus the metadata keys.
pub type Sample = Map<String, Value>;

/// Metadata keys attached by the caller, never sent as fields.
pub const RESERVED_KEYS: [&str; 3] = ["timestamp", "room", "device"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Env,
    Radar,
}

impl Category {
    pub const ALL: [Category; 2] = [Category::Env, Category::Radar];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Env => "env",
            Category::Radar => "radar",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "env" => Ok(Category::Env),
            "radar" => Ok(Category::Radar),
            other => Err(StorageError::UnknownCategory(other.to_string())),
        }
    }
}

/// RFC 3339 in UTC with second precision, e.g. `2024-03-01T08:15:00Z`.
pub fn format_timestamp(time: OffsetDateTime) -> String {
    let time = time.to_offset(UtcOffset::UTC);
    let time = time.replace_nanosecond(0).unwrap_or(time);

    time.format(&Rfc3339)
        .unwrap_or_else(|_| time.unix_timestamp().to_string())
}

pub fn parse_timestamp(value: &str) -> Option<OffsetDateTime> {
    OffsetDateTime::parse(value, &Rfc3339).ok()
}

/// Tag a reading with the node's room, device and the given time.
pub fn build_sample(room: &str, device: &str, fields: Sample, now: OffsetDateTime) -> Sample {
    let mut sample = fields;
    sample.insert("room".into(), Value::from(room));
    sample.insert("device".into(), Value::from(device));
    sample.insert("timestamp".into(), Value::from(format_timestamp(now)));
    sample
}

/// Every non-null value whose key is not a metadata key.
pub fn wire_fields(sample: &Sample) -> Sample {
    sample
        .iter()
        .filter(|(key, value)| !RESERVED_KEYS.contains(&key.as_str()) && !value.is_null())
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

pub fn occupancy_sample(metrics: &OccupancyMetrics) -> Sample {
    let mut sample = Sample::new();
    for (index, pct) in metrics.sectors_pct.iter().enumerate() {
        sample.insert(OccupancyMetrics::sector_key(index), Value::from(*pct));
    }
    sample.insert("objects_count".into(), Value::from(metrics.objects_count));
    sample.insert(
        "min_distance_m".into(),
        metrics.min_distance_m.map(Value::from).unwrap_or(Value::Null),
    );
    sample
}
