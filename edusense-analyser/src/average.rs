use std::collections::VecDeque;

/// Sliding window mean over the last `capacity` inputs.
pub struct MovingAverage {
    buffer: VecDeque<f64>,
    total: f64,
    capacity: usize,
}

impl MovingAverage {
    pub fn new(size: usize) -> Self {
        let capacity = size.max(1);

        Self {
            buffer: VecDeque::with_capacity(capacity),
            total: 0.0,
            capacity,
        }
    }

    pub fn update(&mut self, input: f64) -> f64 {
        if self.buffer.len() == self.capacity {
            if let Some(oldest) = self.buffer.pop_front() {
                self.total -= oldest;
            }
        }
        self.buffer.push_back(input);
        self.total += input;

        self.total / self.buffer.len() as f64
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}

/// Median of the finite values, `None` when there are none.
pub fn median(values: &[f64]) -> Option<f64> {
    let mut data: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if data.is_empty() {
        return None;
    }
    data.sort_by(f64::total_cmp);

    let mid = data.len() / 2;
    Some(if data.len() % 2 == 0 {
        (data[mid - 1] + data[mid]) / 2.0
    } else {
        data[mid]
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_moving_average_window() {
        let mut average = MovingAverage::new(3);

        assert_eq!(average.update(30.0), 30.0);
        assert_eq!(average.update(60.0), 45.0);
        assert_eq!(average.update(90.0), 60.0);
        // 30 falls out of the window
        assert_eq!(average.update(120.0), 90.0);
        assert_eq!(average.len(), 3);
    }

    #[test]
    fn test_moving_average_zero_size() {
        let mut average = MovingAverage::new(0);

        assert_eq!(average.update(5.0), 5.0);
        assert_eq!(average.update(7.0), 7.0);
    }

    #[test]
    fn test_median() {
        assert_eq!(median(&[]), None);
        assert_eq!(median(&[f64::NAN]), None);
        assert_eq!(median(&[3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(median(&[4.0, 1.0, 2.0, 3.0]), Some(2.5));
    }
}
