use std::collections::HashMap;
use std::time::Instant;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};

use edusense_analyser::occupancy::SWEEP_RANGE_DEG;

/// Analog level above which the sound sensor's digital output trips.
pub const SOUND_DIGITAL_THRESHOLD: i64 = 550;

const ADC_MAX: f64 = 1023.0;

fn rng_from(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Pseudo realistic classroom climate driven by slow sine waves plus noise.
pub struct EnvSimulator {
    start: Instant,
    rng: StdRng,
}

impl EnvSimulator {
    pub fn new(seed: Option<u64>) -> Self {
        Self {
            start: Instant::now(),
            rng: rng_from(seed),
        }
    }

    // minutes since the simulator started
    fn phase(&self) -> f64 {
        self.start.elapsed().as_secs_f64() / 60.0
    }

    /// (°C, %RH)
    pub fn temperature_humidity(&mut self) -> (f64, f64) {
        let phase = self.phase();
        let temperature = 24.0 + 3.0 * (phase / 20.0).sin() + self.rng.random_range(-0.5..0.5);
        let humidity = 55.0 + 8.0 * (phase / 25.0).cos() + self.rng.random_range(-1.0..1.0);

        (round2(temperature), round2(humidity).clamp(30.0, 90.0))
    }

    pub fn light(&mut self) -> i64 {
        let base = 600.0 + 200.0 * (self.phase() / 10.0).sin();
        let noise = self.rng.random_range(-50.0..50.0);

        (base + noise).clamp(0.0, ADC_MAX) as i64
    }

    pub fn gas(&mut self) -> i64 {
        let base = 350.0 + 150.0 * (self.phase() / 15.0).sin();
        let noise = self.rng.random_range(-60.0..60.0);

        (base + noise).clamp(0.0, ADC_MAX) as i64
    }

    /// (analog level, digital trip)
    pub fn sound(&mut self) -> (i64, bool) {
        let peak = if self.rng.random::<f64>() > 0.8 { 150.0 } else { 30.0 };
        let analog = match Normal::new(400.0 + peak, 40.0) {
            Ok(normal) => normal.sample(&mut self.rng),
            Err(_) => 400.0 + peak,
        };
        let analog = (analog as i64).min(ADC_MAX as i64);

        (analog, analog > SOUND_DIGITAL_THRESHOLD)
    }
}

/// Ultrasonic ranges around virtual obstacles placed in fixed sectors.
pub struct RadarSimulator {
    sectors: usize,
    obstacles: HashMap<usize, (f64, f64)>,
    rng: StdRng,
}

impl RadarSimulator {
    pub fn new(sectors: usize, seed: Option<u64>) -> Self {
        // obstacles in sectors 1 and 4 by default
        let obstacles = HashMap::from([(1, (0.5, 1.0)), (4, (0.7, 1.3))]);

        Self {
            sectors: sectors.max(1),
            obstacles,
            rng: rng_from(seed),
        }
    }

    pub fn with_obstacles(mut self, obstacles: HashMap<usize, (f64, f64)>) -> Self {
        self.obstacles = obstacles;
        self
    }

    fn sector_for_angle(&self, angle: f64) -> usize {
        let width = SWEEP_RANGE_DEG / self.sectors as f64;
        ((angle / width) as usize).min(self.sectors - 1)
    }

    /// Distance in meters seen at `angle`, never below 5 cm.
    pub fn distance_at(&mut self, angle: u16) -> f64 {
        let sector = self.sector_for_angle(angle.min(180) as f64);
        let (min, max) = self.obstacles.get(&sector).copied().unwrap_or((1.5, 3.5));
        let distance = self.rng.random_range(min..max) + self.rng.random_range(-0.05..0.05);

        distance.max(0.05)
    }
}
