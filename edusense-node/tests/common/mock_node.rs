#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::json;
use time::macros::datetime;

use edusense_node::configs::settings::{
    Database, Influx, InfluxTags, InfluxV1, InfluxVersion, Logger, Node, Ports, Radar, Sampling, Settings,
};
use edusense_node::configs::{SchemaManager, Storage};
use edusense_node::errors::TransportError;
use edusense_node::models::{build_sample, Sample};
use edusense_node::repositories::PendingRepository;
use edusense_node::services::transport::{Point, TransportWriter};
use edusense_node::services::{BufferedPublisher, PublisherConfig, RetryPolicy};

const ALWAYS: usize = usize::MAX;

enum Script {
    /// Fail this many writes, then succeed.
    FailFirst(usize),
    /// Succeed this many writes, then fail.
    FailAfter(usize),
}

/// Transport double that fails writes on a script and records the delivered ones.
pub struct ScriptedTransport {
    script: Mutex<Script>,
    status: StatusCode,
    attempts: AtomicUsize,
    delivered: Mutex<Vec<(String, Vec<Point>)>>,
}

impl ScriptedTransport {
    fn new(script: Script, status: StatusCode) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script),
            status,
            attempts: AtomicUsize::new(0),
            delivered: Mutex::new(Vec::new()),
        })
    }

    pub fn failing(times: usize) -> Arc<Self> {
        Self::new(Script::FailFirst(times), StatusCode::SERVICE_UNAVAILABLE)
    }

    pub fn healthy() -> Arc<Self> {
        Self::failing(0)
    }

    pub fn always_failing() -> Arc<Self> {
        Self::failing(ALWAYS)
    }

    pub fn failing_after(successes: usize) -> Arc<Self> {
        Self::new(Script::FailAfter(successes), StatusCode::SERVICE_UNAVAILABLE)
    }

    /// Every write is answered with `status`.
    pub fn rejecting(status: StatusCode) -> Arc<Self> {
        Self::new(Script::FailFirst(ALWAYS), status)
    }

    pub fn recover(&self) {
        *self.script.lock().unwrap() = Script::FailFirst(0);
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Successful batches in the order they were written.
    pub fn delivered(&self) -> Vec<(String, Vec<Point>)> {
        self.delivered.lock().unwrap().clone()
    }

    pub fn delivered_points(&self, measurement: &str) -> Vec<Point> {
        self.delivered()
            .into_iter()
            .filter(|(name, _)| name == measurement)
            .flat_map(|(_, points)| points)
            .collect()
    }

    fn next_fails(&self) -> bool {
        match &mut *self.script.lock().unwrap() {
            Script::FailFirst(0) => false,
            Script::FailFirst(left) => {
                if *left != ALWAYS {
                    *left -= 1;
                }
                true
            }
            Script::FailAfter(0) => true,
            Script::FailAfter(left) => {
                *left -= 1;
                false
            }
        }
    }
}

#[async_trait]
impl TransportWriter for ScriptedTransport {
    async fn write(&self, measurement: &str, points: &[Point]) -> Result<(), TransportError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);

        if self.next_fails() {
            return Err(TransportError::Rejected {
                status: self.status,
                body: String::from("influxdb refused the write"),
            });
        }

        self.delivered
            .lock()
            .unwrap()
            .push((measurement.to_string(), points.to_vec()));
        Ok(())
    }
}

pub struct MockNode {
    pub storage: Arc<Storage>,
    pub queue: Arc<PendingRepository>,
}

impl MockNode {
    pub async fn new() -> Self {
        let storage = Arc::new(
            Storage::new(test_database(), SchemaManager::default())
                .await
                .unwrap(),
        );
        let queue = Arc::new(PendingRepository::new(storage.clone()));

        Self { storage, queue }
    }

    pub fn publisher(&self, batch_size: usize, transport: Arc<dyn TransportWriter>) -> BufferedPublisher {
        let config = PublisherConfig {
            measurement_env: String::from("env_sensors"),
            measurement_radar: String::from("radar"),
            batch_size,
            flush_interval: Duration::from_secs(15),
            room: Some(String::from("lab-1")),
            device: Some(String::from("node-test")),
            retry: RetryPolicy {
                attempts: 3,
                base_delay: Duration::ZERO,
            },
        };

        BufferedPublisher::new(config, self.queue.clone(), transport).unwrap()
    }
}

pub fn env_sample(temperature: f64) -> Sample {
    let fields = json!({ "temperature_c": temperature, "humidity_pct": 45.0 })
        .as_object()
        .cloned()
        .unwrap();

    build_sample("lab-1", "node-test", fields, datetime!(2024-03-01 08:15:00 UTC))
}

pub fn radar_sample(objects: u32) -> Sample {
    let fields = json!({ "sector_0_pct": 50.0, "objects_count": objects, "min_distance_m": 0.8 })
        .as_object()
        .cloned()
        .unwrap();

    build_sample("lab-1", "node-test", fields, datetime!(2024-03-01 08:15:05 UTC))
}

pub fn temperature(point: &Point) -> f64 {
    point.fields["temperature_c"].as_f64().unwrap()
}

fn test_database() -> Database {
    Database {
        url: String::from("sqlite::memory:"),
        clean_start: true,
        retention_days: 7,
    }
}

pub fn test_settings() -> Settings {
    Settings {
        logger: Logger {
            level: String::from("debug"),
        },
        node: Node {
            room: String::from("lab-1"),
            device: String::from("node-test"),
            simulate: true,
        },
        ports: Ports {
            dht: String::from("D5"),
            light: String::from("A0"),
            sound: String::from("A2"),
            gas: String::from("A4"),
            ultrasonic: String::from("D16"),
            servo_pwm: String::from("D12"),
            adc_address: 4,
        },
        sampling: Sampling {
            temperature_humidity_s: 10,
            light_s: 5,
            sound_s: 1,
            gas_s: 5,
            radar_s: 5,
            flush_s: 15,
            sound_window: 5,
        },
        radar: Radar {
            sectors: 6,
            object_threshold_m: 1.2,
            angle_step_deg: 30,
            settle_ms: 0,
            reads_per_angle: 1,
            max_distance_m: 4.0,
            servo_min_duty: 2.5,
            servo_max_duty: 12.5,
            servo_frequency: 50,
        },
        database: test_database(),
        influx: Influx {
            version: InfluxVersion::V1,
            measurement_env: String::from("env_sensors"),
            measurement_radar: String::from("radar"),
            batch_size: 10,
            flush_interval_s: 15,
            retry_attempts: 3,
            retry_base_delay_ms: 0,
            timeout_ms: 1000,
            tags: InfluxTags::default(),
            v1: Some(InfluxV1 {
                host: String::from("127.0.0.1"),
                port: 8086,
                username: None,
                password: None,
                database: String::from("iot_classroom"),
                ssl: false,
            }),
            v2: None,
        },
    }
}
