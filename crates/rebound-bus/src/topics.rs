//! Published snapshot types.
//!
//! Every topic is written by exactly one task and read by any number of
//! others; a snapshot always carries the monotonic publish time.

use rebound_core::geometry::{Quat, Scalar, Vec3};
use rebound_core::{Characterization, RecoveryStage};

/// Body-frame accelerometer reading, m/s².
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorAccel {
    pub timestamp_us: u64,
    pub accel_mss: Vec3,
}

impl Default for SensorAccel {
    fn default() -> Self {
        Self {
            timestamp_us: 0,
            accel_mss: Vec3::zeros(),
        }
    }
}

/// Body-frame angular rate, rad/s.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorGyro {
    pub timestamp_us: u64,
    pub rate_rad_s: Vec3,
}

impl Default for SensorGyro {
    fn default() -> Self {
        Self {
            timestamp_us: 0,
            rate_rad_s: Vec3::zeros(),
        }
    }
}

/// Estimated attitude and body rates from the external estimator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AttitudeState {
    pub timestamp_us: u64,
    pub q: Quat,
    pub roll_rate: Scalar,
    pub pitch_rate: Scalar,
}

impl Default for AttitudeState {
    fn default() -> Self {
        Self {
            timestamp_us: 0,
            q: Quat::identity(),
            roll_rate: 0.0,
            pitch_rate: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ArmedState {
    pub timestamp_us: u64,
    pub armed: bool,
}

/// Output of the detection task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ImpactDetection {
    pub timestamp_us: u64,
    pub in_recovery: bool,
}

/// Output of the characterization task.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImpactCharacterization {
    pub timestamp_us: u64,
    pub state: Characterization,
}

impl Default for ImpactCharacterization {
    fn default() -> Self {
        Self {
            timestamp_us: 0,
            state: Characterization::default(),
        }
    }
}

/// Output of the recovery-stage task. The stage travels as a raw integer;
/// [`RecoveryStageState::stage`] decodes it defensively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RecoveryStageState {
    pub timestamp_us: u64,
    pub stage_raw: u8,
    pub recovery_is_reset: bool,
}

impl RecoveryStageState {
    pub fn stage(&self) -> RecoveryStage {
        RecoveryStage::from_raw(self.stage_raw)
    }
}
