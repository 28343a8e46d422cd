use std::time::Duration;

use edusense_analyser::{median, RadarSample};

use crate::configs::settings::Radar;
use crate::errors::NodeError;
use crate::services::sensors::RadarSimulator;

const MAX_ANGLE: u16 = 180;

/// Positions the ranger. Angles are degrees in 0..=180.
pub trait Servo: Send {
    fn set_angle(&mut self, angle: u16);

    /// Release the servo on shutdown.
    fn park(&mut self) {}
}

/// Ultrasonic distance in meters, `None` on timeout or invalid echo.
pub trait RangeFinder: Send {
    fn read_distance(&mut self, angle: u16) -> Option<f64>;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ServoCalibration {
    /// Duty cycle % at 0 degrees
    pub min_duty: f64,
    /// Duty cycle % at 180 degrees
    pub max_duty: f64,
    /// PWM frequency in Hz
    pub frequency: u32,
}

impl Default for ServoCalibration {
    fn default() -> Self {
        Self {
            min_duty: 2.5,
            max_duty: 12.5,
            frequency: 50,
        }
    }
}

impl ServoCalibration {
    pub fn angle_to_duty(&self, angle: f64) -> f64 {
        let angle = angle.clamp(0.0, MAX_ANGLE as f64);
        self.min_duty + (angle / MAX_ANGLE as f64) * (self.max_duty - self.min_duty)
    }
}

/// Servo stand-in that only tracks the duty cycle it would drive.
pub struct SimulatedServo {
    calibration: ServoCalibration,
    duty: Option<f64>,
}

impl SimulatedServo {
    pub fn new(calibration: ServoCalibration) -> Self {
        Self {
            calibration,
            duty: None,
        }
    }

    pub fn duty(&self) -> Option<f64> {
        self.duty
    }
}

impl Servo for SimulatedServo {
    fn set_angle(&mut self, angle: u16) {
        self.duty = Some(self.calibration.angle_to_duty(angle as f64));
    }

    fn park(&mut self) {
        self.duty = None;
    }
}

pub struct SimulatedRangeFinder {
    simulator: RadarSimulator,
}

impl SimulatedRangeFinder {
    pub fn new(simulator: RadarSimulator) -> Self {
        Self { simulator }
    }
}

impl RangeFinder for SimulatedRangeFinder {
    fn read_distance(&mut self, angle: u16) -> Option<f64> {
        Some(self.simulator.distance_at(angle))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// 0 -> 180 -> 0
    Forward,
    /// 180 -> 0 -> 180
    Reverse,
}

/// Where the servo rests between sweeps.
///
/// A round trip ends on the side it started from, so `direction` only
/// differs from `Forward` when the scanner is seeded with a state resting
/// on the 180 degree side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepState {
    pub current_angle: u16,
    pub direction: Direction,
}

impl Default for SweepState {
    fn default() -> Self {
        Self {
            current_angle: 0,
            direction: Direction::Forward,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScanConfig {
    pub angle_step: u16,
    pub settle: Duration,
    pub reads_per_angle: usize,
    pub read_gap: Duration,
    pub max_distance_m: f64,
}

impl ScanConfig {
    pub fn from_settings(radar: &Radar) -> Result<Self, NodeError> {
        if radar.angle_step_deg == 0 || radar.angle_step_deg > MAX_ANGLE {
            return Err(NodeError::InvalidSetting(format!(
                "angle_step_deg must be within 1..=180, got {}",
                radar.angle_step_deg
            )));
        }
        if radar.reads_per_angle == 0 {
            return Err(NodeError::InvalidSetting("reads_per_angle must be positive".into()));
        }

        Ok(Self {
            angle_step: radar.angle_step_deg,
            settle: Duration::from_millis(radar.settle_ms),
            reads_per_angle: radar.reads_per_angle,
            read_gap: Duration::from_millis(5),
            max_distance_m: radar.max_distance_m,
        })
    }
}

/// Sweeps the ranger with the servo and records one median distance per angle.
pub struct RadarScanner {
    servo: Box<dyn Servo>,
    ranger: Box<dyn RangeFinder>,
    config: ScanConfig,
    state: SweepState,
}

impl RadarScanner {
    pub fn new(servo: Box<dyn Servo>, ranger: Box<dyn RangeFinder>, config: ScanConfig) -> Self {
        Self {
            servo,
            ranger,
            config,
            state: SweepState::default(),
        }
    }

    /// Start from a known servo position instead of 0 degrees.
    pub fn with_state(mut self, state: SweepState) -> Self {
        self.state = state;
        self
    }

    pub fn state(&self) -> SweepState {
        self.state
    }

    /// Angles of one round trip starting from the side `state` rests on.
    pub fn angles(step: u16, state: SweepState) -> Vec<u16> {
        let step = step.max(1);
        let forward: Vec<u16> = (0..=MAX_ANGLE).step_by(step as usize).collect();
        let backward: Vec<u16> = match MAX_ANGLE.checked_sub(step) {
            Some(start) => (0..=start).rev().step_by(step as usize).collect(),
            None => Vec::new(),
        };

        let trip = forward.into_iter().chain(backward);
        match state.direction {
            Direction::Forward => trip.collect(),
            Direction::Reverse => trip.map(|angle| MAX_ANGLE - angle).collect(),
        }
    }

    pub async fn sweep(&mut self) -> Vec<RadarSample> {
        let angles = Self::angles(self.config.angle_step, self.state);
        let mut samples = Vec::with_capacity(angles.len());

        for angle in angles {
            self.servo.set_angle(angle);
            self.state.current_angle = angle;
            tokio::time::sleep(self.config.settle).await;

            let distance = self.read_angle(angle).await;
            samples.push(RadarSample::new(angle, distance));
        }

        self.state.direction = if self.state.current_angle <= MAX_ANGLE / 2 {
            Direction::Forward
        } else {
            Direction::Reverse
        };

        samples
    }

    async fn read_angle(&mut self, angle: u16) -> Option<f64> {
        let mut readings = Vec::with_capacity(self.config.reads_per_angle);
        for _ in 0..self.config.reads_per_angle {
            if let Some(distance) = self.ranger.read_distance(angle) {
                readings.push(distance.min(self.config.max_distance_m));
            }
            tokio::time::sleep(self.config.read_gap).await;
        }

        median(&readings)
    }

    pub fn shutdown(&mut self) {
        self.servo.park();
    }
}
