use nalgebra::{Matrix3, UnitQuaternion, Vector2, Vector3};

// ---------------------------------------------------------------------------
// Frames & Aliases
// ---------------------------------------------------------------------------
pub type Scalar = f32;
pub type Vec3 = Vector3<Scalar>;
pub type Vec2 = Vector2<Scalar>;
pub type Quat = UnitQuaternion<Scalar>;

pub const GRAVITY_MSS: Scalar = 9.81;

/// Vector lengths below this are treated as degenerate.
pub const VECTOR_EPS: Scalar = 1e-6;

/// World frame is NED: gravity points along +Z.
pub fn world_gravity_dir() -> Vec3 {
    Vector3::new(0.0, 0.0, 1.0)
}

/// World up, i.e. negated gravity direction.
pub fn world_up_dir() -> Vec3 {
    Vector3::new(0.0, 0.0, -1.0)
}

/// Body frame is FRD: -Z is the thrust direction.
pub fn body_neg_z() -> Vec3 {
    Vector3::new(0.0, 0.0, -1.0)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

pub fn rotation_matrix(q: &Quat) -> Matrix3<Scalar> {
    q.to_rotation_matrix().into_inner()
}

/// Horizontal (x, y) components of a world- or body-frame vector.
pub fn horizontal(v: &Vec3) -> Vec2 {
    Vector2::new(v.x, v.y)
}

/// Sign convention of the original characterization math: zero maps to +1.
pub fn sign(x: Scalar) -> Scalar {
    if x < 0.0 {
        -1.0
    } else {
        1.0
    }
}

/// Arc-cosine with the argument clamped to [-1, 1].
///
/// Rounding in upstream dot products can push arguments slightly out of
/// domain; clamping keeps the angle defined instead of returning NaN.
pub fn clamped_acos(x: Scalar) -> Scalar {
    x.clamp(-1.0, 1.0).acos()
}

/// Tilt-error components of an attitude.
///
/// Returns the x/y vector part of the quaternion rotating the world-frame
/// body-Z axis onto world vertical. Zero when level, independent of yaw.
/// An exactly inverted attitude has no unique correcting rotation; the
/// error is reported as a half-turn about x.
pub fn tilt_error_xy(q: &Quat) -> (Scalar, Scalar) {
    let body_z_world = q.transform_vector(&Vector3::z());
    match UnitQuaternion::rotation_between(&body_z_world, &Vector3::z()) {
        Some(err) => {
            let v = err.into_inner().imag();
            (v.x, v.y)
        }
        None => (1.0, 0.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamped_acos_out_of_domain() {
        assert_eq!(clamped_acos(1.0001), 0.0);
        assert!((clamped_acos(-1.0001) - std::f32::consts::PI).abs() < 1e-6);
    }

    #[test]
    fn test_sign_zero_is_positive() {
        assert_eq!(sign(0.0), 1.0);
        assert_eq!(sign(-0.001), -1.0);
        assert_eq!(sign(3.0), 1.0);
    }

    #[test]
    fn test_tilt_error_level() {
        let (ex, ey) = tilt_error_xy(&Quat::identity());
        assert!(ex.abs() < 1e-6 && ey.abs() < 1e-6);
    }

    #[test]
    fn test_tilt_error_pitch() {
        // Pure pitch tilts about y: error magnitude is sin(theta/2) on y.
        let theta = 0.4_f32;
        let q = Quat::from_euler_angles(0.0, theta, 0.0);
        let (ex, ey) = tilt_error_xy(&q);
        assert!(ex.abs() < 1e-5);
        assert!((ey.abs() - (theta / 2.0).sin()).abs() < 1e-4);
    }

    #[test]
    fn test_tilt_error_inverted_is_saturated() {
        let q = Quat::from_euler_angles(std::f32::consts::PI, 0.0, 0.0);
        let (ex, ey) = tilt_error_xy(&q);
        assert!((ex * ex + ey * ey).sqrt() > 0.9);
    }
}
