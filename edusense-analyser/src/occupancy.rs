/// Full sweep range of the servo in degrees.
pub const SWEEP_RANGE_DEG: f64 = 180.0;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum OccupancyError {
    #[error("Sector count must be positive")]
    InvalidSectors,

    #[error("Object threshold must be a finite distance, got {0}")]
    InvalidThreshold(f64),
}

/// One ultrasonic reading taken at a servo angle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RadarSample {
    /// Servo angle in degrees, 0..=180
    pub angle: u16,
    /// Distance in meters, `None` when the ranger timed out or read out of range
    pub distance: Option<f64>,
}

impl RadarSample {
    pub fn new(angle: u16, distance: Option<f64>) -> Self {
        Self { angle, distance }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OccupancyMetrics {
    /// Occupied share of each sector in percent, indexed by sector
    pub sectors_pct: Vec<f64>,
    pub objects_count: u32,
    pub min_distance_m: Option<f64>,
}

impl OccupancyMetrics {
    /// Field name under which sector `index` is published.
    pub fn sector_key(index: usize) -> String {
        format!("sector_{index}_pct")
    }
}

/// Aggregates one sweep into per-sector occupancy.
///
/// The 0..=180 degree range is split into `sectors` equal bins. A reading is
/// "occupied" when its distance is present and at most the object threshold.
#[derive(Debug, Clone)]
pub struct SectorAggregator {
    sectors: usize,
    object_threshold_m: f64,
    sector_width: f64,
}

impl SectorAggregator {
    pub fn new(sectors: usize, object_threshold_m: f64) -> Result<Self, OccupancyError> {
        if sectors == 0 {
            return Err(OccupancyError::InvalidSectors);
        }
        if !object_threshold_m.is_finite() {
            return Err(OccupancyError::InvalidThreshold(object_threshold_m));
        }

        Ok(Self {
            sectors,
            object_threshold_m,
            sector_width: SWEEP_RANGE_DEG / sectors as f64,
        })
    }

    pub fn sectors(&self) -> usize {
        self.sectors
    }

    pub fn object_threshold_m(&self) -> f64 {
        self.object_threshold_m
    }

    pub fn sector_index(&self, angle: u16) -> usize {
        let index = (angle as f64 / self.sector_width).floor() as usize;
        index.min(self.sectors - 1)
    }

    /// Samples must be in scan order: the object count depends on it.
    pub fn process(&self, samples: &[RadarSample]) -> OccupancyMetrics {
        OccupancyMetrics {
            sectors_pct: self.sector_percentages(samples),
            objects_count: self.objects_count(samples),
            min_distance_m: Self::min_distance(samples),
        }
    }

    fn is_occupied(&self, sample: &RadarSample) -> bool {
        sample
            .distance
            .is_some_and(|distance| distance <= self.object_threshold_m)
    }

    /// (totals, hits) per sector.
    fn sector_counts(&self, samples: &[RadarSample]) -> (Vec<u32>, Vec<u32>) {
        let mut totals = vec![0u32; self.sectors];
        let mut hits = vec![0u32; self.sectors];

        for sample in samples {
            let sector = self.sector_index(sample.angle);
            totals[sector] += 1;
            if self.is_occupied(sample) {
                hits[sector] += 1;
            }
        }

        (totals, hits)
    }

    fn sector_percentages(&self, samples: &[RadarSample]) -> Vec<f64> {
        let (totals, hits) = self.sector_counts(samples);

        totals
            .iter()
            .zip(hits.iter())
            .map(|(&total, &hit)| {
                if total == 0 {
                    0.0
                } else {
                    round_to(hit as f64 / total as f64 * 100.0, 2)
                }
            })
            .collect()
    }

    // Rising edges of the occupied signal. An obstacle seen on both legs of a
    // bidirectional sweep is counted twice.
    fn objects_count(&self, samples: &[RadarSample]) -> u32 {
        let mut count = 0;
        let mut active = false;

        for sample in samples {
            let occupied = self.is_occupied(sample);
            if occupied && !active {
                count += 1;
            }
            active = occupied;
        }

        count
    }

    fn min_distance(samples: &[RadarSample]) -> Option<f64> {
        samples
            .iter()
            .filter_map(|sample| sample.distance)
            .reduce(f64::min)
            .map(|distance| round_to(distance, 3))
    }
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sweep(points: &[(u16, Option<f64>)]) -> Vec<RadarSample> {
        points
            .iter()
            .map(|&(angle, distance)| RadarSample::new(angle, distance))
            .collect()
    }

    #[test]
    fn test_rejects_zero_sectors() {
        assert_eq!(
            SectorAggregator::new(0, 1.5).unwrap_err(),
            OccupancyError::InvalidSectors
        );
        assert!(SectorAggregator::new(6, f64::NAN).is_err());
    }

    #[test]
    fn test_sector_index_stays_in_range() {
        for sectors in 1..=12 {
            let aggregator = SectorAggregator::new(sectors, 1.0).unwrap();
            for angle in 0..=180 {
                assert!(aggregator.sector_index(angle) < sectors);
            }
            assert_eq!(aggregator.sector_index(180), sectors - 1);
            assert_eq!(aggregator.sector_index(0), 0);
        }
    }

    #[test]
    fn test_sector_index_boundaries() {
        let aggregator = SectorAggregator::new(6, 1.5).unwrap();
        assert_eq!(aggregator.sector_index(29), 0);
        assert_eq!(aggregator.sector_index(30), 1);
        assert_eq!(aggregator.sector_index(179), 5);
    }

    #[test]
    fn test_classroom_scenario() {
        let aggregator = SectorAggregator::new(6, 1.5).unwrap();
        let samples = sweep(&[
            (0, Some(1.0)),
            (10, Some(2.0)),
            (35, Some(1.0)),
            (70, Some(1.0)),
            (80, Some(2.5)),
            (100, Some(1.2)),
            (120, Some(0.8)),
            (150, Some(2.5)),
        ]);

        let metrics = aggregator.process(&samples);

        assert_eq!(metrics.sectors_pct, vec![50.0, 100.0, 50.0, 100.0, 100.0, 0.0]);
        assert_eq!(metrics.objects_count, 3);
        assert_eq!(metrics.min_distance_m, Some(0.8));
    }

    #[test]
    fn test_empty_sector_reports_zero() {
        let aggregator = SectorAggregator::new(4, 1.0).unwrap();
        let metrics = aggregator.process(&sweep(&[(10, Some(0.5))]));

        assert_eq!(metrics.sectors_pct, vec![100.0, 0.0, 0.0, 0.0]);
        assert!(metrics.sectors_pct.iter().all(|pct| !pct.is_nan()));

        let metrics = aggregator.process(&[]);
        assert_eq!(metrics.sectors_pct, vec![0.0; 4]);
        assert_eq!(metrics.objects_count, 0);
        assert_eq!(metrics.min_distance_m, None);
    }

    #[test]
    fn test_percentages_are_rounded() {
        let aggregator = SectorAggregator::new(1, 1.0).unwrap();
        let metrics = aggregator.process(&sweep(&[(0, Some(0.5)), (5, Some(2.0)), (10, Some(3.0))]));

        assert_eq!(metrics.sectors_pct, vec![33.33]);
    }

    #[test]
    fn test_objects_count_contiguous_runs() {
        let aggregator = SectorAggregator::new(6, 1.0).unwrap();
        // occupied flags: F T T F T F F T
        let samples = sweep(&[
            (0, Some(2.0)),
            (5, Some(0.5)),
            (10, Some(0.6)),
            (15, None),
            (20, Some(0.9)),
            (25, Some(1.1)),
            (30, Some(3.0)),
            (35, Some(1.0)),
        ]);

        assert_eq!(aggregator.process(&samples).objects_count, 3);
    }

    #[test]
    fn test_objects_count_on_both_legs() {
        // A single obstacle at 90 degrees seen on the way out and on the way
        // back is reported as two objects.
        let aggregator = SectorAggregator::new(6, 1.0).unwrap();
        let samples = sweep(&[
            (80, Some(2.0)),
            (90, Some(0.5)),
            (100, Some(2.0)),
            (90, Some(0.5)),
            (80, Some(2.0)),
        ]);

        assert_eq!(aggregator.process(&samples).objects_count, 2);
    }

    #[test]
    fn test_min_distance() {
        let aggregator = SectorAggregator::new(3, 1.0).unwrap();

        let metrics = aggregator.process(&sweep(&[(0, None), (90, None)]));
        assert_eq!(metrics.min_distance_m, None);

        let metrics = aggregator.process(&sweep(&[(0, None), (90, Some(2.34567)), (120, Some(3.1))]));
        assert_eq!(metrics.min_distance_m, Some(2.346));
    }

    #[test]
    fn test_missing_distance_counts_toward_total() {
        let aggregator = SectorAggregator::new(2, 1.0).unwrap();
        let metrics = aggregator.process(&sweep(&[(0, None), (10, Some(0.2))]));

        assert_eq!(metrics.sectors_pct[0], 50.0);
    }

    #[test]
    fn test_every_sample_lands_in_one_sector() {
        let samples: Vec<RadarSample> = (0..=180)
            .step_by(7)
            .chain((0..=180).rev().step_by(11))
            .map(|angle| RadarSample::new(angle, if angle % 3 == 0 { None } else { Some(1.0) }))
            .collect();

        for sectors in [1, 4, 6, 9] {
            let aggregator = SectorAggregator::new(sectors, 1.5).unwrap();
            let (totals, hits) = aggregator.sector_counts(&samples);

            assert_eq!(totals.iter().sum::<u32>() as usize, samples.len());
            assert!(totals.iter().zip(hits.iter()).all(|(total, hit)| hit <= total));
        }
    }
}
