//! Wall-impact detection.
//!
//! A hysteretic classifier over the horizontal world-frame magnitude of the
//! body accelerometer: detection trips when the magnitude exceeds 1 g, and
//! cannot re-trip until the spike has decayed back below 1 g.

use crate::geometry::{horizontal, Quat, Scalar, Vec3, GRAVITY_MSS};

#[derive(Debug, Clone, Copy)]
pub struct DetectorConfig {
    /// Horizontal world-frame magnitude that trips detection (m/s²).
    pub trigger_accel_mss: Scalar,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            trigger_accel_mss: GRAVITY_MSS,
        }
    }
}

/// Latched detection flags, published every cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DetectionState {
    pub in_recovery: bool,
    /// The triggering spike has decayed back below the threshold.
    pub spike_settled: bool,
}

impl Default for DetectionState {
    fn default() -> Self {
        Self {
            in_recovery: false,
            spike_settled: true,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct DetectorInput {
    /// Body-frame accelerometer reading, m/s².
    pub accel_body_mss: Vec3,
    pub attitude: Quat,
    pub armed: bool,
    /// Reset flag from the recovery stage machine.
    pub recovery_is_reset: bool,
}

#[derive(Debug, Clone)]
pub struct ImpactDetector {
    config: DetectorConfig,
    state: DetectionState,
}

impl ImpactDetector {
    pub fn new(config: DetectorConfig) -> Self {
        Self {
            config,
            state: DetectionState::default(),
        }
    }

    pub fn state(&self) -> DetectionState {
        self.state
    }

    /// One detection cycle. Holds the last state while disarmed.
    pub fn update(&mut self, input: &DetectorInput) -> DetectionState {
        if input.armed {
            let accel_world = input.attitude.transform_vector(&input.accel_body_mss);
            let horiz_mag = horizontal(&accel_world).norm();

            // Settle before trigger, so a dip and a fresh spike observed on
            // later cycles re-trip detection.
            if !self.state.spike_settled && horiz_mag <= self.config.trigger_accel_mss {
                self.state.spike_settled = true;
            }
            if !self.state.in_recovery && self.state.spike_settled {
                if horiz_mag > self.config.trigger_accel_mss {
                    self.state.in_recovery = true;
                    self.state.spike_settled = false;
                }
            } else if self.state.in_recovery && input.recovery_is_reset {
                self.state.in_recovery = false;
            }
        }
        self.state
    }
}
