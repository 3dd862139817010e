//! Frame rate reporting.

use std::time::Instant;

/// Counts ticks and logs the frame rate every `interval` ticks.
#[derive(Debug, Clone)]
pub struct FpsCounter {
    interval: u64,
    ticks: u64,
    window_start: Instant,
}

impl FpsCounter {
    /// Counter starting now. An interval of zero is treated as one.
    pub fn new(interval: u64) -> Self {
        Self::starting_at(interval, Instant::now())
    }

    pub fn starting_at(interval: u64, start: Instant) -> Self {
        Self {
            interval: interval.max(1),
            ticks: 0,
            window_start: start,
        }
    }

    /// Count one tick.
    ///
    /// Returns the frame rate over the last window when the window closes.
    pub fn tick(&mut self) -> Option<f64> {
        self.tick_at(Instant::now())
    }

    pub fn tick_at(&mut self, now: Instant) -> Option<f64> {
        self.ticks += 1;
        if self.ticks < self.interval {
            return None;
        }

        let elapsed = now.saturating_duration_since(self.window_start).as_secs_f64();
        let fps = if elapsed > 0.0 {
            self.ticks as f64 / elapsed
        } else {
            0.0
        };

        log::info!("FPS: {fps:.1}");

        self.ticks = 0;
        self.window_start = now;
        Some(fps)
    }

    pub fn interval(&self) -> u64 {
        self.interval
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_reports_once_per_interval() {
        let start = Instant::now();
        let mut counter = FpsCounter::starting_at(4, start);

        for i in 1..4 {
            assert_eq!(counter.tick_at(start + Duration::from_millis(i * 100)), None);
        }
        let fps = counter.tick_at(start + Duration::from_secs(2)).unwrap();
        assert!((fps - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_window_restarts_after_report() {
        let start = Instant::now();
        let mut counter = FpsCounter::starting_at(2, start);

        counter.tick_at(start);
        counter.tick_at(start + Duration::from_secs(1));

        let second = start + Duration::from_secs(1);
        assert_eq!(counter.tick_at(second + Duration::from_millis(10)), None);
        let fps = counter.tick_at(second + Duration::from_millis(500)).unwrap();
        assert!((fps - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_elapsed_reports_zero() {
        let start = Instant::now();
        let mut counter = FpsCounter::starting_at(1, start);
        assert_eq!(counter.tick_at(start), Some(0.0));
    }

    #[test]
    fn test_zero_interval_is_one() {
        let counter = FpsCounter::new(0);
        assert_eq!(counter.interval(), 1);
    }
}
