//! Fixed-capacity ring buffer of attitude samples.
//!
//! The characterizer uses it to recover the orientation held a couple of
//! cycles before the impact transient corrupted the attitude estimate.

use crate::geometry::Quat;
use std::fmt;

/// Retained attitude samples.
pub const HISTORY_CAPACITY: usize = 5;

/// Requested lookback beyond the retained window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LookbackError {
    pub offset: usize,
    pub capacity: usize,
}

impl fmt::Display for LookbackError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "attitude lookback offset {} out of range (capacity {})",
            self.offset, self.capacity
        )
    }
}

impl std::error::Error for LookbackError {}

/// Circular log of the most recent [`HISTORY_CAPACITY`] attitude samples.
///
/// Slots start at the identity quaternion, so every in-range lookback is
/// total even before the buffer has wrapped once.
#[derive(Debug, Clone)]
pub struct AttitudeHistory {
    samples: [Quat; HISTORY_CAPACITY],
    /// Oldest retained sample; also the next slot to overwrite.
    oldest: usize,
}

impl Default for AttitudeHistory {
    fn default() -> Self {
        Self::new()
    }
}

impl AttitudeHistory {
    pub fn new() -> Self {
        Self {
            samples: [Quat::identity(); HISTORY_CAPACITY],
            oldest: 0,
        }
    }

    pub const fn capacity(&self) -> usize {
        HISTORY_CAPACITY
    }

    /// Record a sample, overwriting the oldest retained one. O(1).
    pub fn push(&mut self, sample: Quat) {
        self.samples[self.oldest] = sample;
        self.oldest = (self.oldest + 1) % HISTORY_CAPACITY;
    }

    /// Sample at `offset` from the oldest retained sample.
    ///
    /// `offset` 0 is the oldest, `capacity - 1` the newest.
    pub fn lookback(&self, offset: usize) -> Result<Quat, LookbackError> {
        if offset >= HISTORY_CAPACITY {
            return Err(LookbackError {
                offset,
                capacity: HISTORY_CAPACITY,
            });
        }
        Ok(self.samples[(self.oldest + offset) % HISTORY_CAPACITY])
    }

    /// Sample pushed `cycles_before_newest` pushes before the newest one.
    pub fn lookback_from_newest(&self, cycles_before_newest: usize) -> Result<Quat, LookbackError> {
        if cycles_before_newest >= HISTORY_CAPACITY {
            return Err(LookbackError {
                offset: cycles_before_newest,
                capacity: HISTORY_CAPACITY,
            });
        }
        self.lookback(HISTORY_CAPACITY - 1 - cycles_before_newest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(i: usize) -> Quat {
        Quat::from_euler_angles(i as f32 * 0.01, 0.0, 0.0)
    }

    #[test]
    fn test_lookback_before_wrap() {
        let mut h = AttitudeHistory::new();
        h.push(sample(1));
        h.push(sample(2));
        // Unwritten slots read back as identity.
        assert_eq!(h.lookback(0).unwrap(), Quat::identity());
        assert_eq!(h.lookback(4).unwrap(), sample(2));
    }

    #[test]
    fn test_oldest_overwrite() {
        let mut h = AttitudeHistory::new();
        for i in 1..=7 {
            h.push(sample(i));
        }
        // 7 pushes into capacity 5: samples 3..=7 retained.
        assert_eq!(h.lookback(0).unwrap(), sample(3));
        assert_eq!(h.lookback(2).unwrap(), sample(5));
        assert_eq!(h.lookback(4).unwrap(), sample(7));
    }

    #[test]
    fn test_lookback_out_of_range() {
        let h = AttitudeHistory::new();
        let err = h.lookback(HISTORY_CAPACITY).unwrap_err();
        assert_eq!(err.offset, HISTORY_CAPACITY);
        assert!(h.lookback(100).is_err());
    }

    #[test]
    fn test_lookback_from_newest() {
        let mut h = AttitudeHistory::new();
        for i in 1..=5 {
            h.push(sample(i));
        }
        assert_eq!(h.lookback_from_newest(0).unwrap(), sample(5));
        assert_eq!(h.lookback_from_newest(2).unwrap(), sample(3));
        assert!(h.lookback_from_newest(5).is_err());
    }
}
