//! Deterministic wall-impact scenario truth traces.
//!
//! The trace is piecewise kinematic, not a physics integration: a cruise
//! phase toward the wall, a single-cycle reaction spike, then a tilted,
//! rotating vehicle whose recovery controller exponentially settles it
//! into hover pointing away from the wall. That is exactly the signal
//! shape the decision pipeline keys on.

use nalgebra::Vector3;
use rebound_core::geometry::{Quat, Scalar, Vec3, GRAVITY_MSS};

// ---------------------------------------------------------------------------
// Parameters
// ---------------------------------------------------------------------------
#[derive(Debug, Clone, Copy)]
pub struct ScenarioParams {
    pub cycle_hz: Scalar,
    pub duration_s: Scalar,
    /// Moment the vehicle strikes the wall.
    pub impact_time_s: Scalar,
    /// Horizontal acceleration toward the wall while cruising (g).
    pub cruise_accel_g: Scalar,
    /// Reaction spike magnitude on the impact cycle (g).
    pub peak_accel_g: Scalar,
    /// Residual horizontal acceleration after the spike (g).
    pub settled_accel_g: Scalar,
    /// Direction of travel (and of the wall) in the world horizontal plane.
    pub wall_azimuth_rad: Scalar,
    /// Pitch held while cruising; negative is nose-down toward the wall.
    pub pre_impact_pitch_rad: Scalar,
    /// Nose-up tilt right after the bounce, decaying to hover.
    pub post_impact_tilt_rad: Scalar,
    /// Body pitch-rate magnitude right after the bounce, decaying with the
    /// same time constant.
    pub post_impact_rate_rad_s: Scalar,
    pub tilt_decay_tau_s: Scalar,
    pub armed: bool,
}

impl Default for ScenarioParams {
    fn default() -> Self {
        Self {
            cycle_hz: 100.0,
            duration_s: 2.0,
            impact_time_s: 0.5,
            cruise_accel_g: 0.2,
            peak_accel_g: 1.5,
            settled_accel_g: 0.3,
            wall_azimuth_rad: 0.0,
            pre_impact_pitch_rad: -0.12,
            post_impact_tilt_rad: 0.35,
            post_impact_rate_rad_s: 2.5,
            tilt_decay_tau_s: 0.15,
            armed: true,
        }
    }
}

impl ScenarioParams {
    pub fn cycle_count(&self) -> usize {
        (self.duration_s * self.cycle_hz) as usize
    }

    pub fn impact_cycle(&self) -> usize {
        (self.impact_time_s * self.cycle_hz).round() as usize
    }

    /// Unit direction of travel in the world horizontal plane.
    pub fn wall_direction(&self) -> Vec3 {
        Vector3::new(
            self.wall_azimuth_rad.cos(),
            self.wall_azimuth_rad.sin(),
            0.0,
        )
    }

    /// Wall normal the characterizer should estimate: away from the
    /// surface, opposite the direction of travel.
    pub fn expected_wall_normal(&self) -> Vec3 {
        -self.wall_direction()
    }
}

// ---------------------------------------------------------------------------
// Trace
// ---------------------------------------------------------------------------
#[derive(Debug, Clone)]
pub struct ScenarioTrace {
    pub time: Vec<Scalar>,
    pub accel_body: Vec<Vec3>,
    pub gyro_body: Vec<Vec3>,
    pub attitude: Vec<Quat>,
    pub roll_rate: Vec<Scalar>,
    pub pitch_rate: Vec<Scalar>,
    pub armed: Vec<bool>,
}

impl ScenarioTrace {
    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    /// Append another trace, shifting its time axis to continue this one.
    pub fn extend(&mut self, other: &ScenarioTrace) {
        let offset = match (self.time.last(), other.time.get(1)) {
            (Some(&last), Some(&step)) => last + step,
            (Some(&last), None) => last,
            (None, _) => 0.0,
        };
        self.time.extend(other.time.iter().map(|t| t + offset));
        self.accel_body.extend_from_slice(&other.accel_body);
        self.gyro_body.extend_from_slice(&other.gyro_body);
        self.attitude.extend_from_slice(&other.attitude);
        self.roll_rate.extend_from_slice(&other.roll_rate);
        self.pitch_rate.extend_from_slice(&other.pitch_rate);
        self.armed.extend_from_slice(&other.armed);
    }
}

// ---------------------------------------------------------------------------
// Generation
// ---------------------------------------------------------------------------
pub fn generate_trace(p: &ScenarioParams) -> ScenarioTrace {
    let n = p.cycle_count();
    let impact = p.impact_cycle();
    let wall_dir = p.wall_direction();
    let decay_per_cycle = (-1.0 / (p.tilt_decay_tau_s * p.cycle_hz)).exp();

    let mut trace = ScenarioTrace {
        time: Vec::with_capacity(n),
        accel_body: Vec::with_capacity(n),
        gyro_body: Vec::with_capacity(n),
        attitude: Vec::with_capacity(n),
        roll_rate: Vec::with_capacity(n),
        pitch_rate: Vec::with_capacity(n),
        armed: Vec::with_capacity(n),
    };

    let cruise_attitude =
        Quat::from_euler_angles(0.0, p.pre_impact_pitch_rad, p.wall_azimuth_rad);

    for i in 0..n {
        let t = i as Scalar / p.cycle_hz;

        let (attitude, accel_world, gyro_body, pitch_rate) = if i < impact {
            // Cruising toward the wall.
            let accel = wall_dir * (p.cruise_accel_g * GRAVITY_MSS)
                + Vector3::new(0.0, 0.0, -GRAVITY_MSS);
            (cruise_attitude, accel, Vec3::zeros(), 0.0)
        } else if i == impact {
            // Single-cycle reaction spike pushing away from the wall.
            let accel = -wall_dir * (p.peak_accel_g * GRAVITY_MSS)
                + Vector3::new(0.0, 0.0, -GRAVITY_MSS);
            (cruise_attitude, accel, Vec3::zeros(), 0.0)
        } else {
            // Bounced: nose-up tilt away from the wall, body rotating
            // toward it, both settling exponentially into hover.
            let k = (i - impact) as i32;
            let decay = decay_per_cycle.powi(k);
            let tilt = p.post_impact_tilt_rad * decay;
            let rate = p.post_impact_rate_rad_s * decay;
            let attitude = Quat::from_euler_angles(0.0, tilt, p.wall_azimuth_rad);
            let accel = -wall_dir * (p.settled_accel_g * GRAVITY_MSS)
                + Vector3::new(0.0, 0.0, -GRAVITY_MSS);
            (attitude, accel, Vector3::new(0.0, -rate, 0.0), -rate)
        };

        trace.time.push(t);
        trace
            .accel_body
            .push(attitude.inverse_transform_vector(&accel_world));
        trace.gyro_body.push(gyro_body);
        trace.attitude.push(attitude);
        trace.roll_rate.push(0.0);
        trace.pitch_rate.push(pitch_rate);
        trace.armed.push(p.armed);
    }

    trace
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trace_shape() {
        let p = ScenarioParams::default();
        let trace = generate_trace(&p);
        assert_eq!(trace.len(), 200);
        assert_eq!(p.impact_cycle(), 50);
        assert!(trace.armed.iter().all(|&a| a));
    }

    #[test]
    fn test_spike_is_single_cycle() {
        let p = ScenarioParams::default();
        let trace = generate_trace(&p);
        let impact = p.impact_cycle();
        let horiz = |i: usize| {
            let world = trace.attitude[i].transform_vector(&trace.accel_body[i]);
            (world.x * world.x + world.y * world.y).sqrt()
        };
        assert!(horiz(impact - 1) < GRAVITY_MSS);
        assert!(horiz(impact) > GRAVITY_MSS);
        assert!(horiz(impact + 1) < GRAVITY_MSS);
    }

    #[test]
    fn test_post_impact_settles() {
        let p = ScenarioParams::default();
        let trace = generate_trace(&p);
        let last = trace.len() - 1;
        let (_, pitch, _) = trace.attitude[last].euler_angles();
        assert!(pitch.abs() < 0.01);
        assert!(trace.pitch_rate[last].abs() < 0.01);
    }

    #[test]
    fn test_extend_continues_time() {
        let p = ScenarioParams::default();
        let mut trace = generate_trace(&p);
        let n = trace.len();
        trace.extend(&generate_trace(&p));
        assert_eq!(trace.len(), 2 * n);
        assert!(trace.time[n] > trace.time[n - 1]);
    }
}
