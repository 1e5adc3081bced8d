//! Impact-response rule base.
//!
//! Four inputs describe the impact: horizontal accelerometer magnitude (g),
//! signed pre-impact inclination (deg), flip direction angle gamma (deg) and
//! horizontal gyro magnitude (rad/s). The single output is the response
//! intensity in [-1, 1]: positive pushes the vehicle away from the wall.

use crate::fuzzy::{Antecedent, FuzzyModel, MembershipSet};

/// Crisp inputs expected by [`impact_response_model`], in order.
pub const INPUT_ACCEL_HORIZ: usize = 0;
pub const INPUT_INCLINATION: usize = 1;
pub const INPUT_FLIP_GAMMA: usize = 2;
pub const INPUT_GYRO_HORIZ: usize = 3;

/// Build the impact-response model. Two rule sets: one over accelerometer
/// magnitude against inclination, one over rotation rate against flip
/// direction.
pub fn impact_response_model() -> FuzzyModel {
    let mut b = FuzzyModel::builder("response_intensity", -1.0, 1.0, 0.01);

    let accel = b.add_input("accel_horiz_mag_g");
    let acc_very_low = b.input_set(accel, MembershipSet::new(0.0, 0.0, 0.0, 2.0));
    let acc_low = b.input_set(accel, MembershipSet::new(0.0, 2.0, 2.0, 4.0));
    let acc_medium = b.input_set(accel, MembershipSet::new(2.0, 4.0, 4.0, 6.0));
    let acc_high = b.input_set(accel, MembershipSet::new(4.0, 6.0, 10.0, 10.0));

    let inclination = b.add_input("inclination_deg");
    let inclined_away_big = b.input_set(inclination, MembershipSet::new(-90.0, -60.0, -15.0, -8.0));
    let inclined_level = b.input_set(inclination, MembershipSet::new(-2.0, 0.0, 0.0, 2.0));
    let inclined_toward_big = b.input_set(inclination, MembershipSet::new(8.0, 15.0, 60.0, 90.0));
    let inclined_away_small =
        b.input_set(inclination, MembershipSet::new(-9.5, -5.5, -5.5, -1.5));
    let inclined_toward_small = b.input_set(inclination, MembershipSet::new(1.5, 5.5, 5.5, 9.5));

    let gamma = b.add_input("flip_gamma_deg");
    let flip_away = b.input_set(gamma, MembershipSet::new(0.0, 0.0, 50.0, 90.0));
    let _flip_sideway = b.input_set(gamma, MembershipSet::new(70.0, 90.0, 90.0, 110.0));
    let flip_toward = b.input_set(gamma, MembershipSet::new(90.0, 130.0, 180.0, 180.0));

    let gyro = b.add_input("gyro_horiz_mag");
    let gyro_low = b.input_set(gyro, MembershipSet::new(0.0, 0.0, 0.5, 1.5));
    let gyro_medium = b.input_set(gyro, MembershipSet::new(1.0, 1.5, 3.0, 3.5));
    let gyro_high = b.input_set(gyro, MembershipSet::new(3.0, 4.5, 15.0, 15.0));

    let toward_big = b.output_set(MembershipSet::new(0.6, 0.9, 1.0, 1.0));
    let toward_small = b.output_set(MembershipSet::new(0.1, 0.4, 0.6, 0.9));
    let level = b.output_set(MembershipSet::new(-0.4, -0.1, 0.1, 0.4));
    let away_small = b.output_set(MembershipSet::new(-0.9, -0.6, -0.4, -0.1));
    let away_big = b.output_set(MembershipSet::new(-1.0, -1.0, -0.9, -0.6));

    let inclined_toward = Antecedent::or(inclined_toward_small, inclined_toward_big);
    let inclined_away = Antecedent::or(inclined_away_small, inclined_away_big);

    // Rule set 1: accelerometer magnitude against inclination.
    b.rule(1, Antecedent::or(acc_very_low, inclined_level), level);
    b.rule(
        2,
        Antecedent::or(
            Antecedent::and(acc_low, inclined_toward.clone()),
            Antecedent::and(acc_medium, inclined_toward_small),
        ),
        toward_small,
    );
    b.rule(
        3,
        Antecedent::or(
            Antecedent::and(acc_low, inclined_away.clone()),
            Antecedent::and(acc_medium, inclined_away_small),
        ),
        away_small,
    );
    b.rule(
        4,
        Antecedent::or(
            Antecedent::and(acc_high, inclined_toward),
            Antecedent::and(acc_medium, inclined_toward_big),
        ),
        toward_big,
    );
    b.rule(
        5,
        Antecedent::or(
            Antecedent::and(acc_high, inclined_away),
            Antecedent::and(acc_medium, inclined_away_big),
        ),
        away_big,
    );

    // Rule set 2: rotation rate against flip direction.
    b.rule(6, gyro_low, level);
    b.rule(7, Antecedent::and(gyro_medium, flip_toward), toward_small);
    b.rule(8, Antecedent::and(gyro_medium, flip_away), away_small);
    b.rule(9, Antecedent::and(gyro_high, flip_toward), toward_big);
    b.rule(10, Antecedent::and(gyro_high, flip_away), away_big);

    b.build().expect("impact rule base is well-formed")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_shape() {
        let model = impact_response_model();
        assert_eq!(model.num_inputs(), 4);
        assert_eq!(model.input_names()[INPUT_INCLINATION], "inclination_deg");
        assert_eq!(model.output_name(), "response_intensity");
    }

    #[test]
    fn test_calm_inputs_give_level_response() {
        let model = impact_response_model();
        // Very low accel, level inclination, no rotation: only the `level`
        // consequent fires, centered on zero.
        let out = model.infer(&[0.0, 0.0, 0.0, 0.0]);
        assert!(out.abs() < 1e-3, "got {out}");
    }

    #[test]
    fn test_hard_toward_impact_pushes_strongly() {
        let model = impact_response_model();
        // High accel, strongly inclined toward the wall, fast flip toward.
        let out = model.infer(&[7.0, 30.0, 180.0, 6.0]);
        assert!(out > 0.6, "got {out}");
    }

    #[test]
    fn test_hard_away_impact_is_negative() {
        let model = impact_response_model();
        let out = model.infer(&[7.0, -30.0, 0.0, 6.0]);
        assert!(out < -0.6, "got {out}");
    }

    #[test]
    fn test_mild_toward_impact_is_moderate() {
        let model = impact_response_model();
        // Low accel, slightly toward, moderate flip toward.
        let out = model.infer(&[2.0, 5.5, 170.0, 2.0]);
        assert!(out > 0.1 && out < 0.9, "got {out}");
    }
}
