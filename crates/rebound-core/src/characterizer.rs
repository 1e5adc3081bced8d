//! Impact characterization.
//!
//! Consumes the detection flag, the attitude history and raw inertial data
//! to derive the wall normal, four fuzzy inputs on independent settle
//! delays, and finally a one-shot recovery acceleration reference that
//! stays latched until the stage machine signals reset.

use std::f32::consts::FRAC_PI_2;

use nalgebra::Matrix3;
use tracing::warn;

use crate::fuzzy::FuzzyModel;
use crate::geometry::{
    body_neg_z, clamped_acos, horizontal, rotation_matrix, sign, world_gravity_dir, world_up_dir,
    Quat, Scalar, Vec3, GRAVITY_MSS, VECTOR_EPS,
};
use crate::history::AttitudeHistory;

pub const NUM_FUZZY_INPUTS: usize = 4;

#[derive(Debug, Clone, Copy)]
pub struct CharacterizerConfig {
    /// Cycles after detection before each fuzzy input may be computed.
    pub input_settle_delay: [u32; NUM_FUZZY_INPUTS],
    /// How many cycles before the newest retained attitude sample the
    /// pre-impact pose is taken.
    pub pre_impact_cycles: usize,
    /// Scale from response intensity to acceleration reference magnitude,
    /// in g.
    pub response_gain: Scalar,
}

impl Default for CharacterizerConfig {
    fn default() -> Self {
        Self {
            input_settle_delay: [2, 0, 2, 3],
            pre_impact_cycles: 2,
            response_gain: 0.75,
        }
    }
}

/// Published characterization snapshot. Populated incrementally after a
/// detection, frozen once `accel_ref_is_computed`, zeroed on reset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Characterization {
    /// Unit vector in the world horizontal plane pointing away from the
    /// struck surface.
    pub wall_normal: Vec3,
    pub fuzzy_input: [Scalar; NUM_FUZZY_INPUTS],
    pub fuzzy_output: Scalar,
    /// Recovery acceleration reference for the attitude controller, m/s².
    pub accel_reference: Vec3,
    pub accel_ref_is_computed: bool,
}

impl Default for Characterization {
    fn default() -> Self {
        Self {
            wall_normal: Vec3::zeros(),
            fuzzy_input: [0.0; NUM_FUZZY_INPUTS],
            fuzzy_output: 0.0,
            accel_reference: Vec3::zeros(),
            accel_ref_is_computed: false,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CharacterizerInput {
    /// Body-frame accelerometer reading, m/s².
    pub accel_body_mss: Vec3,
    /// Body-frame angular rate, rad/s.
    pub gyro_rad_s: Vec3,
    pub attitude: Quat,
    pub in_recovery: bool,
    pub recovery_is_reset: bool,
}

#[derive(Debug, Clone)]
pub struct ImpactCharacterizer {
    config: CharacterizerConfig,
    model: FuzzyModel,
    history: AttitudeHistory,
    out: Characterization,
    input_computed: [bool; NUM_FUZZY_INPUTS],
    wall_normal_set: bool,
    rotation_pre_impact: Matrix3<Scalar>,
    cycles_since_detection: u32,
}

impl ImpactCharacterizer {
    pub fn new(config: CharacterizerConfig, model: FuzzyModel) -> Self {
        assert_eq!(
            model.num_inputs(),
            NUM_FUZZY_INPUTS,
            "characterizer model must take {NUM_FUZZY_INPUTS} inputs"
        );
        Self {
            config,
            model,
            history: AttitudeHistory::new(),
            out: Characterization::default(),
            input_computed: [false; NUM_FUZZY_INPUTS],
            wall_normal_set: false,
            rotation_pre_impact: Matrix3::identity(),
            cycles_since_detection: 0,
        }
    }

    pub fn characterization(&self) -> Characterization {
        self.out
    }

    /// One characterization cycle.
    ///
    /// The attitude history is fed every cycle regardless of detection
    /// state; everything else only runs between detection and latch.
    pub fn update(&mut self, input: &CharacterizerInput) -> Characterization {
        if input.in_recovery && !self.out.accel_ref_is_computed {
            if self.cycles_since_detection == 0 {
                self.latch_pre_impact_pose();
            }
            if !self.wall_normal_set {
                self.try_latch_wall_normal(input);
            }

            for index in 0..NUM_FUZZY_INPUTS {
                if !self.input_computed[index]
                    && self.config.input_settle_delay[index] <= self.cycles_since_detection
                {
                    if let Some(value) = self.compute_input(index, input) {
                        self.out.fuzzy_input[index] = value;
                        self.input_computed[index] = true;
                    }
                }
            }

            if self.input_computed.iter().all(|&done| done) {
                self.out.fuzzy_output = self.model.infer(&self.out.fuzzy_input);
                let mut reference = self.out.wall_normal
                    * (-self.config.response_gain * GRAVITY_MSS * self.out.fuzzy_output);
                if self.out.fuzzy_output < 0.0 {
                    // Only positive "push away" responses are honored.
                    reference = Vec3::zeros();
                }
                self.out.accel_reference = reference;
                self.out.accel_ref_is_computed = true;
            }

            self.cycles_since_detection += 1;
        }

        if self.out.accel_ref_is_computed && input.recovery_is_reset {
            self.reset();
        }

        self.history.push(input.attitude);
        self.out
    }

    /// Pose held `pre_impact_cycles` before the newest retained sample,
    /// i.e. just before the impact transient reached the estimator.
    fn latch_pre_impact_pose(&mut self) {
        let quat = match self
            .history
            .lookback_from_newest(self.config.pre_impact_cycles)
        {
            Ok(q) => q,
            Err(err) => {
                warn!("{err}, falling back to neutral attitude");
                Quat::identity()
            }
        };
        self.rotation_pre_impact = rotation_matrix(&quat);
    }

    /// Wall normal: world-frame accelerometer reading (in g) plus gravity,
    /// projected to the horizontal plane and normalized. Retried on later
    /// cycles while the horizontal projection is degenerate.
    fn try_latch_wall_normal(&mut self, input: &CharacterizerInput) {
        let rotation = rotation_matrix(&input.attitude);
        let accel_g = input.accel_body_mss / GRAVITY_MSS;
        let inertial_accel = rotation * accel_g + world_gravity_dir();
        let horiz = Vec3::new(inertial_accel.x, inertial_accel.y, 0.0);
        if horiz.norm() < VECTOR_EPS {
            return;
        }
        self.out.wall_normal = horiz.normalize();
        self.wall_normal_set = true;
    }

    /// Compute one fuzzy input. `None` skips the input for this cycle, to
    /// be retried on the next one.
    fn compute_input(&self, index: usize, input: &CharacterizerInput) -> Option<Scalar> {
        match index {
            0 => Some(horizontal(&input.accel_body_mss).norm() / GRAVITY_MSS),
            1 => self.inclination_deg(),
            2 => self.flip_gamma_deg(input),
            3 => Some(horizontal(&input.gyro_rad_s).norm()),
            _ => None,
        }
    }

    /// Signed angle between the pre-impact body up direction, projected
    /// onto the vertical plane through the wall normal, and world up.
    /// Positive means inclined toward the wall.
    fn inclination_deg(&self) -> Option<Scalar> {
        if !self.wall_normal_set {
            return None;
        }
        let wall_normal = self.out.wall_normal;
        let wall_tangent = world_gravity_dir().cross(&wall_normal);
        let pre_impact_up = self.rotation_pre_impact * body_neg_z();
        let projection = pre_impact_up - wall_tangent * pre_impact_up.dot(&wall_tangent);
        let length = projection.norm();
        if length < VECTOR_EPS {
            return None;
        }

        let inclination = clamped_acos(projection.dot(&world_up_dir()) / length);
        let angle_with_normal =
            clamped_acos(projection.dot(&wall_normal) / (length * wall_normal.norm()));
        let side = sign(angle_with_normal - FRAC_PI_2);
        Some(side * inclination.to_degrees())
    }

    /// Angle between the horizontal flip direction (world angular velocity
    /// crossed with world up) and the wall normal, in [0°, 180°].
    fn flip_gamma_deg(&self, input: &CharacterizerInput) -> Option<Scalar> {
        if !self.wall_normal_set {
            return None;
        }
        let rotation = rotation_matrix(&input.attitude);
        let ang_vel_world = rotation * input.gyro_rad_s;
        let flip_dir = ang_vel_world.cross(&world_up_dir());
        let flip_horiz = horizontal(&flip_dir);
        let wall_horiz = horizontal(&self.out.wall_normal);
        let denom = flip_horiz.norm() * wall_horiz.norm();
        if denom < VECTOR_EPS {
            return None;
        }
        Some(clamped_acos(flip_horiz.dot(&wall_horiz) / denom).to_degrees())
    }

    fn reset(&mut self) {
        self.cycles_since_detection = 0;
        self.input_computed = [false; NUM_FUZZY_INPUTS];
        self.wall_normal_set = false;
        self.rotation_pre_impact = Matrix3::identity();
        self.out = Characterization::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::impact_response_model;
    use nalgebra::Vector3;

    fn characterizer() -> ImpactCharacterizer {
        ImpactCharacterizer::new(CharacterizerConfig::default(), impact_response_model())
    }

    fn hover_input() -> CharacterizerInput {
        CharacterizerInput {
            accel_body_mss: Vector3::new(0.0, 0.0, -GRAVITY_MSS),
            gyro_rad_s: Vec3::zeros(),
            attitude: Quat::identity(),
            in_recovery: false,
            recovery_is_reset: false,
        }
    }

    /// Spike pushing the vehicle toward -x: the wall sits at +x.
    fn impact_input(peak_g: Scalar) -> CharacterizerInput {
        CharacterizerInput {
            accel_body_mss: Vector3::new(-peak_g * GRAVITY_MSS, 0.0, -GRAVITY_MSS),
            gyro_rad_s: Vector3::new(0.0, -2.0, 0.0),
            attitude: Quat::identity(),
            in_recovery: true,
            recovery_is_reset: false,
        }
    }

    #[test]
    fn test_idle_cycles_only_feed_history() {
        let mut ch = characterizer();
        for _ in 0..10 {
            let out = ch.update(&hover_input());
            assert!(!out.accel_ref_is_computed);
            assert_eq!(out.wall_normal, Vec3::zeros());
        }
    }

    #[test]
    fn test_wall_normal_on_detection_cycle() {
        let mut ch = characterizer();
        for _ in 0..5 {
            ch.update(&hover_input());
        }
        let out = ch.update(&impact_input(1.5));
        assert!((out.wall_normal - Vector3::new(-1.0, 0.0, 0.0)).norm() < 1e-5);
        assert!(!out.accel_ref_is_computed, "inputs still settling");
    }

    #[test]
    fn test_reference_latches_after_longest_delay() {
        let mut ch = characterizer();
        for _ in 0..5 {
            ch.update(&hover_input());
        }
        // Detection cycle plus the cycles covered by delays {2, 0, 2, 3}.
        ch.update(&impact_input(1.5));
        let mut settled = impact_input(0.3);
        for cycle in 1..=2 {
            let out = ch.update(&settled);
            assert!(!out.accel_ref_is_computed, "cycle {cycle} too early");
        }
        let out = ch.update(&settled);
        assert!(out.accel_ref_is_computed);
        // Accel input was taken after the spike settled.
        assert!((out.fuzzy_input[0] - 0.3).abs() < 1e-5);
        // Flip toward the wall: gamma at 180°.
        assert!((out.fuzzy_input[2] - 180.0).abs() < 0.1);
        // Positive response pushes along -wall_normal.
        assert!(out.fuzzy_output > 0.0);
        assert!(out.accel_reference.x > 0.0);

        // Latched: further cycles must not move anything.
        settled.gyro_rad_s = Vector3::new(3.0, 3.0, 0.0);
        let frozen = ch.update(&settled);
        assert_eq!(frozen, out);
    }

    #[test]
    fn test_reset_zeroes_everything() {
        let mut ch = characterizer();
        ch.update(&impact_input(1.5));
        let mut input = impact_input(0.3);
        for _ in 0..4 {
            ch.update(&input);
        }
        assert!(ch.characterization().accel_ref_is_computed);

        input.recovery_is_reset = true;
        let out = ch.update(&input);
        assert_eq!(out, Characterization::default());
    }

    #[test]
    fn test_negative_response_zeroes_reference() {
        // Pre-impact pose strongly inclined away from the wall at +x:
        // nose-up pitch tips the body up-vector toward -x.
        let mut ch = characterizer();
        let away = CharacterizerInput {
            attitude: Quat::from_euler_angles(0.0, 0.5, 0.0),
            ..hover_input()
        };
        for _ in 0..5 {
            ch.update(&away);
        }
        let mut input = impact_input(1.5);
        input.attitude = away.attitude;
        // Flip away from the wall.
        input.gyro_rad_s = Vector3::new(0.0, 2.0, 0.0);
        ch.update(&input);
        input.accel_body_mss = Vector3::new(-0.3 * GRAVITY_MSS, 0.0, -GRAVITY_MSS);
        for _ in 0..3 {
            ch.update(&input);
        }
        let out = ch.characterization();
        assert!(out.accel_ref_is_computed);
        assert!(out.fuzzy_input[1] < -8.0, "inclined away: {}", out.fuzzy_input[1]);
        assert!(out.fuzzy_output < 0.0, "got {}", out.fuzzy_output);
        assert_eq!(out.accel_reference, Vec3::zeros());
    }

    #[test]
    fn test_degenerate_horizontal_accel_retries() {
        let mut ch = characterizer();
        // Detection asserted but the accel snapshot is purely vertical:
        // no wall normal can be derived yet.
        let mut input = hover_input();
        input.in_recovery = true;
        let out = ch.update(&input);
        assert_eq!(out.wall_normal, Vec3::zeros());
        assert!(!out.accel_ref_is_computed);

        // A later cycle with horizontal content latches it.
        input.accel_body_mss = Vector3::new(-GRAVITY_MSS, 0.0, -GRAVITY_MSS);
        let out = ch.update(&input);
        assert!((out.wall_normal - Vector3::new(-1.0, 0.0, 0.0)).norm() < 1e-5);
    }
}
