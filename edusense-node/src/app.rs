use std::sync::Arc;
use std::time::Duration;

use edusense_analyser::SectorAggregator;
use time::OffsetDateTime;
use tokio::sync::Mutex;

use crate::configs::{SchemaManager, Settings, Storage};
use crate::errors::NodeError;
use crate::models::{build_sample, occupancy_sample, Sample};
use crate::repositories::{PendingRepository, SampleRecordRepository};
use crate::services::radar::{ServoCalibration, SimulatedRangeFinder, SimulatedServo};
use crate::services::sensors::{resolve_analog, resolve_digital, RadarSimulator, Sensor, SensorKind};
use crate::services::transport::{self, TransportWriter};
use crate::services::{BufferedPublisher, PublisherConfig, RadarScanner, ScanConfig, Scheduler};

/// Everything the periodic jobs share.
pub struct App {
    settings: Arc<Settings>,
    storage: Arc<Storage>,
    publisher: BufferedPublisher,
    archive: SampleRecordRepository,
    aggregator: SectorAggregator,
    scanner: Mutex<RadarScanner>,
}

pub async fn create_app(settings: &Arc<Settings>) -> Result<App, NodeError> {
    let storage = Arc::new(Storage::new(settings.database.clone(), SchemaManager::default()).await?);
    let transport = transport::connect(&settings.influx);

    App::new(settings.clone(), storage, transport)
}

impl App {
    pub fn new(
        settings: Arc<Settings>,
        storage: Arc<Storage>,
        transport: Arc<dyn TransportWriter>,
    ) -> Result<Self, NodeError> {
        let queue = Arc::new(PendingRepository::new(storage.clone()));
        let publisher = BufferedPublisher::new(
            PublisherConfig::from_settings(&settings.influx, &settings.node),
            queue,
            transport,
        )?;
        let aggregator = SectorAggregator::new(settings.radar.sectors, settings.radar.object_threshold_m)?;
        let scanner = Mutex::new(build_scanner(&settings)?);

        Ok(Self {
            archive: SampleRecordRepository::new(storage.clone()),
            settings,
            storage,
            publisher,
            aggregator,
            scanner,
        })
    }

    pub fn publisher(&self) -> &BufferedPublisher {
        &self.publisher
    }

    pub fn archive(&self) -> &SampleRecordRepository {
        &self.archive
    }

    fn tag(&self, fields: Sample) -> Sample {
        build_sample(
            &self.settings.node.room,
            &self.settings.node.device,
            fields,
            OffsetDateTime::now_utc(),
        )
    }

    /// Archive one environmental reading and queue it for publishing.
    pub async fn record_env(&self, fields: Sample) {
        let sample = self.tag(fields);

        if let Err(e) = self.archive.insert_env(&sample).await {
            tracing::error!("failed to archive env sample: {}", e);
        }
        self.publisher.enqueue_env(sample).await;
    }

    /// Sweep once, aggregate per sector and queue the result.
    pub async fn scan_radar(&self) {
        let readings = self.scanner.lock().await.sweep().await;
        let metrics = self.aggregator.process(&readings);
        tracing::debug!(
            "radar sweep: {} objects, sectors {:?}",
            metrics.objects_count,
            metrics.sectors_pct
        );

        let sample = self.tag(occupancy_sample(&metrics));
        if let Err(e) = self.archive.insert_radar(&sample).await {
            tracing::error!("failed to archive radar sample: {}", e);
        }
        self.publisher.enqueue_radar(sample).await;
    }

    /// Publish buffered samples, then drop archive rows past retention.
    pub async fn flush(&self) {
        self.publisher.flush().await;

        let retention_days = self.settings.database.retention_days;
        match self.archive.purge_old(retention_days, OffsetDateTime::now_utc()).await {
            Ok(0) => {}
            Ok(purged) => tracing::info!("purged {} archived samples older than {} days", purged, retention_days),
            Err(e) => tracing::error!("failed to purge archived samples: {}", e),
        }
    }

    /// Register the sensor, radar and flush jobs.
    pub fn schedule(self: &Arc<Self>, sensors: Vec<Sensor>) -> Result<Scheduler, NodeError> {
        let sampling = &self.settings.sampling;
        let mut scheduler = Scheduler::new();

        for sensor in sensors {
            let (name, seconds) = match sensor.kind() {
                SensorKind::TemperatureHumidity => ("temp_hum", sampling.temperature_humidity_s),
                SensorKind::Light => ("light", sampling.light_s),
                SensorKind::Sound => ("sound", sampling.sound_s),
                SensorKind::Gas => ("gas", sampling.gas_s),
            };

            let app = self.clone();
            let sensor = Arc::new(Mutex::new(sensor));
            scheduler.add_interval_job(name, Duration::from_secs(seconds), move || {
                let app = app.clone();
                let sensor = sensor.clone();
                async move {
                    let reading = sensor.lock().await.read();
                    if let Some(fields) = reading {
                        app.record_env(fields).await;
                    }
                }
            })?;
        }

        let app = self.clone();
        scheduler.add_interval_job("radar", Duration::from_secs(sampling.radar_s), move || {
            let app = app.clone();
            async move { app.scan_radar().await }
        })?;

        let app = self.clone();
        scheduler.add_interval_job("flush", Duration::from_secs(sampling.flush_s), move || {
            let app = app.clone();
            async move { app.flush().await }
        })?;

        Ok(scheduler)
    }

    /// Park the servo and close the database.
    pub async fn stop(&self) {
        self.scanner.lock().await.shutdown();
        self.storage.close().await;
    }
}

/// Environmental sensors on their configured ports.
pub fn build_sensors(settings: &Settings) -> Result<Vec<Sensor>, NodeError> {
    let ports = &settings.ports;
    let simulate = settings.node.simulate;

    let sensors = vec![
        Sensor::new(SensorKind::TemperatureHumidity, resolve_digital(&ports.dht)?, None, simulate, None),
        Sensor::new(SensorKind::Light, resolve_analog(&ports.light)?, None, simulate, None),
        Sensor::new(SensorKind::Sound, resolve_analog(&ports.sound)?, None, simulate, None)
            .with_smoothing(settings.sampling.sound_window),
        Sensor::new(SensorKind::Gas, resolve_analog(&ports.gas)?, None, simulate, None),
    ];

    for sensor in &sensors {
        tracing::info!(
            "{} sensor on channel {}{}",
            sensor.kind().name(),
            sensor.channel(),
            if sensor.is_simulated() { " (simulated)" } else { "" }
        );
    }

    Ok(sensors)
}

fn build_scanner(settings: &Settings) -> Result<RadarScanner, NodeError> {
    let radar = &settings.radar;
    let ultrasonic = resolve_digital(&settings.ports.ultrasonic)?;
    let servo_pwm = resolve_digital(&settings.ports.servo_pwm)?;

    if !settings.node.simulate {
        tracing::warn!(
            "no radar driver for ultrasonic D{} / servo D{}, falling back to simulation",
            ultrasonic,
            servo_pwm
        );
    }

    let calibration = ServoCalibration {
        min_duty: radar.servo_min_duty,
        max_duty: radar.servo_max_duty,
        frequency: radar.servo_frequency,
    };

    Ok(RadarScanner::new(
        Box::new(SimulatedServo::new(calibration)),
        Box::new(SimulatedRangeFinder::new(RadarSimulator::new(radar.sectors, None))),
        ScanConfig::from_settings(radar)?,
    ))
}
