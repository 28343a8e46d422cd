use std::fmt::Write;

use serde_json::Value;

use super::Point;

fn escape_measurement(value: &str) -> String {
    value.replace(',', "\\,").replace(' ', "\\ ")
}

fn escape_key(value: &str) -> String {
    value
        .replace(',', "\\,")
        .replace('=', "\\=")
        .replace(' ', "\\ ")
}

fn encode_field_value(value: &Value) -> Option<String> {
    match value {
        Value::Bool(flag) => Some(flag.to_string()),
        Value::Number(number) => {
            if let Some(integer) = number.as_i64() {
                Some(format!("{integer}i"))
            } else if let Some(unsigned) = number.as_u64() {
                // beyond i64, only the unsigned type can hold it
                Some(format!("{unsigned}u"))
            } else {
                number.as_f64().filter(|v| v.is_finite()).map(|v| v.to_string())
            }
        }
        Value::String(text) => Some(format!(
            "\"{}\"",
            text.replace('\\', "\\\\").replace('"', "\\\"")
        )),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

fn encode_point(point: &Point) -> Option<String> {
    let fields: Vec<String> = point
        .fields
        .iter()
        .filter_map(|(key, value)| {
            encode_field_value(value).map(|encoded| format!("{}={}", escape_key(key), encoded))
        })
        .collect();

    // a point without fields is rejected by the backend
    if fields.is_empty() {
        return None;
    }

    let mut line = escape_measurement(&point.measurement);
    for (key, value) in point.tags.iter().filter(|(_, value)| !value.is_empty()) {
        let _ = write!(line, ",{}={}", escape_key(key), escape_key(value));
    }
    line.push(' ');
    line.push_str(&fields.join(","));
    if let Some(time) = point.time {
        let _ = write!(line, " {}", time.unix_timestamp_nanos());
    }

    Some(line)
}

/// InfluxDB line protocol body, nanosecond precision.
pub fn encode_points(points: &[Point]) -> String {
    points
        .iter()
        .filter_map(encode_point)
        .collect::<Vec<_>>()
        .join("\n")
}
