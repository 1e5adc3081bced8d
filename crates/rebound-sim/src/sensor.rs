//! Gaussian measurement noise over a truth trace.

use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};

use crate::scenario::ScenarioTrace;
use nalgebra::Vector3;
use rebound_core::geometry::Scalar;

pub struct NoiseConfig {
    pub noise_scale: Scalar,
    pub accel_noise_std: Scalar, // m/s^2
    pub gyro_noise_std: Scalar,  // rad/s
    pub seed: u64,
}

impl Default for NoiseConfig {
    fn default() -> Self {
        Self {
            noise_scale: 1.0,
            accel_noise_std: 0.05,
            gyro_noise_std: 0.002,
            seed: 42,
        }
    }
}

/// Copy of the trace with seeded noise on the inertial channels. The
/// attitude channel stays clean: it models the external estimator output,
/// not a raw sensor.
pub fn inject_noise(trace: &ScenarioTrace, cfg: &NoiseConfig) -> ScenarioTrace {
    let mut rng = StdRng::seed_from_u64(cfg.seed);
    let d_accel = Normal::new(0.0, (cfg.noise_scale * cfg.accel_noise_std) as f64).unwrap();
    let d_gyro = Normal::new(0.0, (cfg.noise_scale * cfg.gyro_noise_std) as f64).unwrap();

    let mut noisy = trace.clone();
    for accel in noisy.accel_body.iter_mut() {
        *accel += Vector3::new(
            d_accel.sample(&mut rng) as Scalar,
            d_accel.sample(&mut rng) as Scalar,
            d_accel.sample(&mut rng) as Scalar,
        );
    }
    for gyro in noisy.gyro_body.iter_mut() {
        *gyro += Vector3::new(
            d_gyro.sample(&mut rng) as Scalar,
            d_gyro.sample(&mut rng) as Scalar,
            d_gyro.sample(&mut rng) as Scalar,
        );
    }
    noisy
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::{generate_trace, ScenarioParams};

    #[test]
    fn test_same_seed_is_deterministic() {
        let trace = generate_trace(&ScenarioParams::default());
        let cfg = NoiseConfig::default();
        let a = inject_noise(&trace, &cfg);
        let b = inject_noise(&trace, &cfg);
        assert_eq!(a.accel_body, b.accel_body);
        assert_eq!(a.gyro_body, b.gyro_body);
    }

    #[test]
    fn test_different_seeds_differ() {
        let trace = generate_trace(&ScenarioParams::default());
        let a = inject_noise(&trace, &NoiseConfig::default());
        let b = inject_noise(
            &trace,
            &NoiseConfig {
                seed: 7,
                ..NoiseConfig::default()
            },
        );
        assert_ne!(a.accel_body, b.accel_body);
    }

    #[test]
    fn test_zero_scale_is_identity() {
        let trace = generate_trace(&ScenarioParams::default());
        let clean = inject_noise(
            &trace,
            &NoiseConfig {
                noise_scale: 0.0,
                ..NoiseConfig::default()
            },
        );
        assert_eq!(clean.accel_body, trace.accel_body);
        assert_eq!(clean.gyro_body, trace.gyro_body);
    }
}
