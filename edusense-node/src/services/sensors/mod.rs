mod simulate;

use edusense_analyser::MovingAverage;
use serde_json::Value;

use crate::errors::SensorError;
use crate::models::Sample;

pub use simulate::{EnvSimulator, RadarSimulator, SOUND_DIGITAL_THRESHOLD};

/// Hardware access for one sensor, implemented by the board drivers.
pub trait Probe: Send {
    fn read(&mut self) -> Result<Sample, SensorError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorKind {
    TemperatureHumidity,
    Light,
    Sound,
    Gas,
}

impl SensorKind {
    pub fn name(&self) -> &'static str {
        match self {
            SensorKind::TemperatureHumidity => "dht",
            SensorKind::Light => "light",
            SensorKind::Sound => "sound",
            SensorKind::Gas => "gas",
        }
    }

    /// Fields every reading of this kind must carry.
    pub fn fields(&self) -> &'static [&'static str] {
        match self {
            SensorKind::TemperatureHumidity => &["temperature_c", "humidity_pct"],
            SensorKind::Light => &["light_adc"],
            SensorKind::Sound => &["sound_adc", "sound_digital"],
            SensorKind::Gas => &["gas_adc"],
        }
    }
}

/// Where readings come from, fixed when the sensor is built.
pub enum SensorBackend {
    Hardware(Box<dyn Probe>),
    Simulated(EnvSimulator),
}

pub struct Sensor {
    kind: SensorKind,
    channel: u8,
    backend: SensorBackend,
    smoothing: Option<MovingAverage>,
}

impl Sensor {
    /// Falls back to simulation when `simulate` is set or no driver is given.
    pub fn new(
        kind: SensorKind,
        channel: u8,
        hardware: Option<Box<dyn Probe>>,
        simulate: bool,
        seed: Option<u64>,
    ) -> Self {
        let backend = match hardware {
            Some(probe) if !simulate => SensorBackend::Hardware(probe),
            Some(_) => SensorBackend::Simulated(EnvSimulator::new(seed)),
            None => {
                if !simulate {
                    tracing::warn!("{} sensor has no hardware driver, falling back to simulation", kind.name());
                }
                SensorBackend::Simulated(EnvSimulator::new(seed))
            }
        };

        Self {
            kind,
            channel,
            backend,
            smoothing: None,
        }
    }

    /// Average the analog sound level over the last `window` reads.
    pub fn with_smoothing(mut self, window: usize) -> Self {
        self.smoothing = Some(MovingAverage::new(window));
        self
    }

    pub fn kind(&self) -> SensorKind {
        self.kind
    }

    pub fn channel(&self) -> u8 {
        self.channel
    }

    pub fn is_simulated(&self) -> bool {
        matches!(self.backend, SensorBackend::Simulated(_))
    }

    /// Latest reading, `None` when the sensor failed (already logged).
    pub fn read(&mut self) -> Option<Sample> {
        let reading = match &mut self.backend {
            SensorBackend::Hardware(probe) => probe.read().and_then(|sample| self.kind.validate(sample)),
            SensorBackend::Simulated(simulator) => Ok(self.kind.simulate(simulator)),
        };

        match reading {
            Ok(sample) => Some(self.smooth(sample)),
            Err(e) => {
                tracing::error!("{} read failed on channel {}: {}", self.kind.name(), self.channel, e);
                None
            }
        }
    }

    fn smooth(&mut self, mut sample: Sample) -> Sample {
        let Some(average) = self.smoothing.as_mut() else {
            return sample;
        };

        if let Some(raw) = sample.get("sound_adc").and_then(Value::as_f64) {
            let smoothed = average.update(raw) as i64;
            sample.insert("sound_adc".into(), Value::from(smoothed));
        }
        sample
    }
}

impl SensorKind {
    fn simulate(&self, simulator: &mut EnvSimulator) -> Sample {
        let mut sample = Sample::new();
        match self {
            SensorKind::TemperatureHumidity => {
                let (temperature, humidity) = simulator.temperature_humidity();
                sample.insert("temperature_c".into(), Value::from(temperature));
                sample.insert("humidity_pct".into(), Value::from(humidity));
            }
            SensorKind::Light => {
                sample.insert("light_adc".into(), Value::from(simulator.light()));
            }
            SensorKind::Sound => {
                let (analog, digital) = simulator.sound();
                sample.insert("sound_adc".into(), Value::from(analog));
                sample.insert("sound_digital".into(), Value::from(digital));
            }
            SensorKind::Gas => {
                sample.insert("gas_adc".into(), Value::from(simulator.gas()));
            }
        }
        sample
    }

    fn validate(&self, sample: Sample) -> Result<Sample, SensorError> {
        for field in self.fields() {
            let valid = matches!(sample.get(*field), Some(Value::Number(_) | Value::Bool(_)));
            if !valid {
                return Err(SensorError::InvalidReading {
                    sensor: self.name(),
                    reason: format!("missing or non-numeric `{field}`"),
                });
            }
        }

        Ok(sample)
    }
}

fn parse_port(port: &str, prefix: char) -> Result<u8, SensorError> {
    let normalized = port.trim().to_ascii_uppercase();
    let number = normalized.strip_prefix(prefix).unwrap_or(&normalized);

    number
        .parse()
        .map_err(|_| SensorError::InvalidPort(port.to_string()))
}

/// `D5` -> 5
pub fn resolve_digital(port: &str) -> Result<u8, SensorError> {
    parse_port(port, 'D')
}

/// `A0` -> 0
pub fn resolve_analog(port: &str) -> Result<u8, SensorError> {
    parse_port(port, 'A')
}
