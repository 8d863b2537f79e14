use std::time::Duration;

/// Backoff schedule for status polling: a short ramp, then a steady interval.
///
/// The sequence is infinite and every new value restarts from the beginning.
#[derive(Debug, Clone, Default)]
pub struct PollIntervals {
    position: usize,
}

impl PollIntervals {
    const RAMP_MS: [u64; 7] = [500, 1_000, 1_000, 2_000, 2_000, 2_000, 5_000];

    pub fn new() -> Self {
        Self::default()
    }

    /// Interval at a given position of the sequence.
    pub fn at(position: usize) -> Duration {
        let index = position.min(Self::RAMP_MS.len() - 1);
        Duration::from_millis(Self::RAMP_MS[index])
    }

    /// The interval repeated once the ramp is exhausted.
    pub fn steady() -> Duration {
        Self::at(usize::MAX)
    }
}

impl Iterator for PollIntervals {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        let interval = Self::at(self.position);
        self.position = self.position.saturating_add(1);
        Some(interval)
    }
}
