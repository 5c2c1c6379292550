//! Save clock. Hands out save timestamps that strictly increase.

use crate::types::Timestamp;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ClockSource {
    Wall,
    Fixed,
}

#[derive(Debug, Clone)]
pub struct SaveClock {
    source: ClockSource,
    last:   Timestamp,
}

impl SaveClock {
    /// Wall-clock milliseconds.
    pub fn wall() -> Self {
        Self { source: ClockSource::Wall, last: 0 }
    }

    /// A clock that starts at `start` and advances one millisecond per read.
    /// Used by tests that need reproducible timestamps.
    pub fn fixed(start: Timestamp) -> Self {
        Self { source: ClockSource::Fixed, last: start - 1 }
    }

    pub fn now(&self) -> Timestamp {
        match self.source {
            ClockSource::Wall  => chrono::Utc::now().timestamp_millis(),
            ClockSource::Fixed => self.last + 1,
        }
    }

    /// Timestamp for the next save. Always greater than every timestamp
    /// previously handed out or observed.
    pub fn next_timestamp(&mut self) -> Timestamp {
        let candidate = self.now();
        self.last = candidate.max(self.last + 1);
        self.last
    }

    /// Raise the floor after loading data stamped `ts`.
    pub fn observe(&mut self, ts: Timestamp) {
        if ts > self.last {
            self.last = ts;
        }
    }
}

impl Default for SaveClock {
    fn default() -> Self { Self::wall() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_clock_advances_by_one() {
        let mut clock = SaveClock::fixed(1_000);
        assert_eq!(clock.next_timestamp(), 1_000);
        assert_eq!(clock.next_timestamp(), 1_001);
    }

    #[test]
    fn observed_timestamp_raises_floor() {
        let mut clock = SaveClock::fixed(1_000);
        clock.observe(5_000);
        assert_eq!(clock.next_timestamp(), 5_001);
        clock.observe(10);
        assert_eq!(clock.next_timestamp(), 5_002);
    }

    #[test]
    fn wall_clock_never_repeats() {
        let mut clock = SaveClock::wall();
        let a = clock.next_timestamp();
        let b = clock.next_timestamp();
        assert!(b > a);
    }
}
