//! Synchronous per-cycle pipeline runs.
//!
//! Steps the three components over a scenario trace in detector →
//! characterizer → stage-machine order, each consuming the snapshots
//! published earlier in the same cycle, exactly as the eventually
//! consistent bus settles. Used by the CLI and the end-to-end tests.

use rebound_core::{
    Characterization, CharacterizerInput, DetectorInput, ImpactCharacterizer, ImpactDetector,
    PipelineConfig, RecoveryStage, RecoveryStageMachine, StageInput,
};

use crate::scenario::ScenarioTrace;
use rebound_core::geometry::Scalar;

/// Per-cycle record of every published snapshot.
#[derive(Debug, Clone)]
pub struct PipelineResult {
    pub time: Vec<Scalar>,
    pub in_recovery: Vec<bool>,
    pub stage: Vec<RecoveryStage>,
    pub recovery_is_reset: Vec<bool>,
    pub characterization: Vec<Characterization>,
}

impl PipelineResult {
    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    /// Cycles on which `in_recovery` rose.
    pub fn detection_cycles(&self) -> Vec<usize> {
        rising_edges(&self.in_recovery)
    }

    /// Cycles on which the reset flag rose.
    pub fn reset_cycles(&self) -> Vec<usize> {
        rising_edges(&self.recovery_is_reset)
    }

    /// First cycle with a latched acceleration reference.
    pub fn first_computed_cycle(&self) -> Option<usize> {
        self.characterization
            .iter()
            .position(|c| c.accel_ref_is_computed)
    }

    pub fn first_cycle_in_stage(&self, stage: RecoveryStage) -> Option<usize> {
        self.stage.iter().position(|&s| s == stage)
    }
}

fn rising_edges(flags: &[bool]) -> Vec<usize> {
    let mut edges = Vec::new();
    let mut previous = false;
    for (i, &flag) in flags.iter().enumerate() {
        if flag && !previous {
            edges.push(i);
        }
        previous = flag;
    }
    edges
}

/// Run the decision pipeline over a trace.
pub fn run_pipeline(trace: &ScenarioTrace, config: &PipelineConfig) -> PipelineResult {
    let mut detector = ImpactDetector::new(config.detector);
    let mut characterizer = ImpactCharacterizer::new(
        config.characterizer,
        rebound_core::impact_response_model(),
    );
    let mut machine = RecoveryStageMachine::new(config.stage);

    let n = trace.len();
    let mut result = PipelineResult {
        time: Vec::with_capacity(n),
        in_recovery: Vec::with_capacity(n),
        stage: Vec::with_capacity(n),
        recovery_is_reset: Vec::with_capacity(n),
        characterization: Vec::with_capacity(n),
    };

    for i in 0..n {
        let reset = machine.state().recovery_is_reset;

        let detection = detector.update(&DetectorInput {
            accel_body_mss: trace.accel_body[i],
            attitude: trace.attitude[i],
            armed: trace.armed[i],
            recovery_is_reset: reset,
        });

        let characterization = characterizer.update(&CharacterizerInput {
            accel_body_mss: trace.accel_body[i],
            gyro_rad_s: trace.gyro_body[i],
            attitude: trace.attitude[i],
            in_recovery: detection.in_recovery,
            recovery_is_reset: reset,
        });

        let stage = machine.update(&StageInput {
            attitude: trace.attitude[i],
            roll_rate: trace.roll_rate[i],
            pitch_rate: trace.pitch_rate[i],
            in_recovery: detection.in_recovery,
            accel_ref_is_computed: characterization.accel_ref_is_computed,
            wall_normal: characterization.wall_normal,
            inclination_deg: characterization.fuzzy_input[1],
        });

        result.time.push(trace.time[i]);
        result.in_recovery.push(detection.in_recovery);
        result.stage.push(stage.stage);
        result.recovery_is_reset.push(stage.recovery_is_reset);
        result.characterization.push(characterization);
    }

    result
}
