pub mod average;
pub mod occupancy;

pub use average::{median, MovingAverage};
pub use occupancy::{OccupancyError, OccupancyMetrics, RadarSample, SectorAggregator};
