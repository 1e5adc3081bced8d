//! Recovery stage sequencing.
//!
//! Stage 1: point away from the wall based on the impact characterization.
//! Stage 2: settle into hover.
//! Stage 0: normal flight.

use tracing::warn;

use crate::geometry::{tilt_error_xy, Quat, Scalar, Vec3};

// ---------------------------------------------------------------------------
// Stages
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RecoveryStage {
    Idle = 0,
    OrientCorrect = 1,
    Stabilize = 2,
}

impl RecoveryStage {
    pub fn label(self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::OrientCorrect => "OrientCorrect",
            Self::Stabilize => "Stabilize",
        }
    }

    /// Decode a wire value. Unknown values are logged and forced to Idle.
    pub fn from_raw(raw: u8) -> Self {
        match raw {
            0 => Self::Idle,
            1 => Self::OrientCorrect,
            2 => Self::Stabilize,
            other => {
                warn!(stage = other, "unknown recovery stage, forcing Idle");
                Self::Idle
            }
        }
    }
}

/// Gate for the OrientCorrect debounce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StagePolicy {
    /// Attitude-error and rate thresholds alone.
    #[default]
    AttitudeOnly,
    /// Additionally require the body Z axis to project onto the wall
    /// normal with sign opposite the characterized inclination, i.e. the
    /// vehicle is already pointing away from the wall.
    WallAligned,
}

// ---------------------------------------------------------------------------
// Config & State
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
pub struct StageConfig {
    /// Per-axis tilt-error bound for leaving OrientCorrect (rad).
    pub attitude_error_switch_rad: Scalar,
    /// Roll/pitch bound for leaving Stabilize (rad).
    pub roll_pitch_switch_rad: Scalar,
    /// Body-rate bound for both transitions (rad/s).
    pub rates_switch_rad_s: Scalar,
    /// Consecutive passing cycles required to leave OrientCorrect.
    pub debounce_cycles: u32,
    pub policy: StagePolicy,
}

impl Default for StageConfig {
    fn default() -> Self {
        Self {
            attitude_error_switch_rad: 0.17,
            roll_pitch_switch_rad: 0.2,
            rates_switch_rad_s: 1.0,
            debounce_cycles: 3,
            policy: StagePolicy::default(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct StageInput {
    pub attitude: Quat,
    pub roll_rate: Scalar,
    pub pitch_rate: Scalar,
    pub in_recovery: bool,
    pub accel_ref_is_computed: bool,
    /// Wall normal from the characterization snapshot.
    pub wall_normal: Vec3,
    /// Characterized inclination input, degrees, positive toward the wall.
    pub inclination_deg: Scalar,
}

/// Published stage snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageState {
    pub stage: RecoveryStage,
    pub recovery_is_reset: bool,
}

impl Default for StageState {
    fn default() -> Self {
        Self {
            stage: RecoveryStage::Idle,
            recovery_is_reset: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Machine
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct RecoveryStageMachine {
    config: StageConfig,
    state: StageState,
    debounce_counter: u32,
}

impl RecoveryStageMachine {
    pub fn new(config: StageConfig) -> Self {
        Self {
            config,
            state: StageState::default(),
            debounce_counter: 0,
        }
    }

    pub fn state(&self) -> StageState {
        self.state
    }

    /// One sequencing cycle.
    ///
    /// Active only while the acceleration reference is latched and the
    /// reset flag is clear; the reset flag itself clears once the upstream
    /// components are observed fully unwound.
    pub fn update(&mut self, input: &StageInput) -> StageState {
        if input.accel_ref_is_computed && !self.state.recovery_is_reset {
            match self.state.stage {
                RecoveryStage::OrientCorrect => {
                    let (ex, ey) = tilt_error_xy(&input.attitude);
                    let mut pass = ex.abs() < self.config.attitude_error_switch_rad
                        && ey.abs() < self.config.attitude_error_switch_rad
                        && input.roll_rate.abs() < self.config.rates_switch_rad_s
                        && input.pitch_rate.abs() < self.config.rates_switch_rad_s;
                    if self.config.policy == StagePolicy::WallAligned {
                        pass = pass && Self::points_away(input);
                    }
                    if pass {
                        self.debounce_counter += 1;
                    } else {
                        self.debounce_counter = 0;
                    }
                    if self.debounce_counter >= self.config.debounce_cycles {
                        self.debounce_counter = 0;
                        self.state.stage = RecoveryStage::Stabilize;
                    }
                }
                RecoveryStage::Stabilize => {
                    let (roll, pitch, _yaw) = input.attitude.euler_angles();
                    let settled = roll.abs() < self.config.roll_pitch_switch_rad
                        && pitch.abs() < self.config.roll_pitch_switch_rad
                        && input.roll_rate.abs() < self.config.rates_switch_rad_s
                        && input.pitch_rate.abs() < self.config.rates_switch_rad_s;
                    if settled {
                        self.state.recovery_is_reset = true;
                        self.state.stage = RecoveryStage::Idle;
                        self.debounce_counter = 0;
                    }
                }
                // Entered on the first active cycle.
                RecoveryStage::Idle => {
                    self.state.stage = RecoveryStage::OrientCorrect;
                }
            }
        }

        // Rearm only once the detector and characterizer have both unwound.
        if !input.accel_ref_is_computed && !input.in_recovery && self.state.recovery_is_reset {
            self.state.recovery_is_reset = false;
        }

        self.state
    }

    /// Body Z projected onto the wall normal, sign checked against the
    /// characterized inclination: toward-inclined impacts must end up with
    /// the body Z tipped away from the wall, and vice versa.
    fn points_away(input: &StageInput) -> bool {
        let body_z_world = input.attitude.transform_vector(&nalgebra::Vector3::z());
        let dot = input.wall_normal.dot(&body_z_world);
        if input.inclination_deg > 0.0 {
            dot < 0.0
        } else {
            dot > 0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Vector3;

    fn active_input(tilt_rad: Scalar, rate: Scalar) -> StageInput {
        StageInput {
            attitude: Quat::from_euler_angles(0.0, tilt_rad, 0.0),
            roll_rate: 0.0,
            pitch_rate: rate,
            in_recovery: true,
            accel_ref_is_computed: true,
            wall_normal: Vector3::new(-1.0, 0.0, 0.0),
            inclination_deg: 7.0,
        }
    }

    #[test]
    fn test_idle_until_reference_computed() {
        let mut sm = RecoveryStageMachine::new(StageConfig::default());
        let mut input = active_input(0.0, 0.0);
        input.accel_ref_is_computed = false;
        assert_eq!(sm.update(&input).stage, RecoveryStage::Idle);
    }

    #[test]
    fn test_full_sequence_with_debounce() {
        let mut sm = RecoveryStageMachine::new(StageConfig::default());

        // First active cycle enters OrientCorrect.
        let calm = active_input(0.05, 0.1);
        assert_eq!(sm.update(&calm).stage, RecoveryStage::OrientCorrect);

        // Two passing cycles, then a rate blip: counter must restart.
        sm.update(&calm);
        sm.update(&calm);
        let blip = active_input(0.05, 2.0);
        assert_eq!(sm.update(&blip).stage, RecoveryStage::OrientCorrect);

        // Three consecutive passing cycles switch to Stabilize.
        sm.update(&calm);
        sm.update(&calm);
        assert_eq!(sm.update(&calm).stage, RecoveryStage::Stabilize);

        // Hover condition met on a single cycle: reset and back to Idle.
        let out = sm.update(&calm);
        assert_eq!(out.stage, RecoveryStage::Idle);
        assert!(out.recovery_is_reset);
    }

    #[test]
    fn test_large_tilt_blocks_orient_correct_exit() {
        let mut sm = RecoveryStageMachine::new(StageConfig::default());
        let tilted = active_input(0.6, 0.0);
        sm.update(&tilted);
        for _ in 0..10 {
            assert_eq!(sm.update(&tilted).stage, RecoveryStage::OrientCorrect);
        }
    }

    #[test]
    fn test_reset_clears_only_when_upstream_unwound() {
        let mut sm = RecoveryStageMachine::new(StageConfig::default());
        let calm = active_input(0.0, 0.0);
        for _ in 0..5 {
            sm.update(&calm);
        }
        assert!(sm.state().recovery_is_reset);

        // Characterizer unlatched but detector still in recovery: hold.
        let mut unwinding = calm;
        unwinding.accel_ref_is_computed = false;
        assert!(sm.update(&unwinding).recovery_is_reset);

        unwinding.in_recovery = false;
        let out = sm.update(&unwinding);
        assert!(!out.recovery_is_reset);
        assert_eq!(out.stage, RecoveryStage::Idle);
    }

    #[test]
    fn test_wall_aligned_policy_gates_debounce() {
        let config = StageConfig {
            policy: StagePolicy::WallAligned,
            ..StageConfig::default()
        };
        let mut sm = RecoveryStageMachine::new(config);

        // Toward-inclined impact, wall at +x. Nose-down pitch keeps the
        // body Z tipped toward the wall: never passes, however calm.
        let mut toward_wall = active_input(-0.05, 0.0);
        sm.update(&toward_wall);
        for _ in 0..10 {
            assert_eq!(sm.update(&toward_wall).stage, RecoveryStage::OrientCorrect);
        }

        // Nose-up pitch points away: debounce proceeds.
        toward_wall.attitude = Quat::from_euler_angles(0.0, 0.05, 0.0);
        sm.update(&toward_wall);
        sm.update(&toward_wall);
        assert_eq!(sm.update(&toward_wall).stage, RecoveryStage::Stabilize);
    }

    #[test]
    fn test_unknown_stage_decodes_to_idle() {
        assert_eq!(RecoveryStage::from_raw(0), RecoveryStage::Idle);
        assert_eq!(RecoveryStage::from_raw(2), RecoveryStage::Stabilize);
        assert_eq!(RecoveryStage::from_raw(7), RecoveryStage::Idle);
    }
}
