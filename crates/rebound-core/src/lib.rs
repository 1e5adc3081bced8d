//! # Rebound Core
//!
//! Decision logic for multirotor wall-impact recovery:
//! - Impact detector: hysteretic classifier over horizontal world-frame
//!   acceleration magnitude
//! - Impact characterizer: attitude-history lookback, wall-normal
//!   derivation and fuzzy inference producing a one-shot recovery
//!   acceleration reference
//! - Recovery stage machine: sequences orientation correction and
//!   stabilization, and issues the pipeline reset
//!
//! Components communicate only through their published state snapshots;
//! the async plumbing lives in `rebound-bus` and the synchronous test
//! harness in `rebound-sim`.

pub mod characterizer;
pub mod detector;
pub mod fuzzy;
pub mod geometry;
pub mod history;
pub mod rules;
pub mod stage;

// Re-export core types
pub use characterizer::{
    Characterization, CharacterizerConfig, CharacterizerInput, ImpactCharacterizer,
    NUM_FUZZY_INPUTS,
};
pub use detector::{DetectionState, DetectorConfig, DetectorInput, ImpactDetector};
pub use fuzzy::{Antecedent, FuzzyModel, MembershipSet, ModelError};
pub use geometry::{Quat, Scalar, Vec3, GRAVITY_MSS};
pub use history::{AttitudeHistory, LookbackError, HISTORY_CAPACITY};
pub use rules::impact_response_model;
pub use stage::{
    RecoveryStage, RecoveryStageMachine, StageConfig, StageInput, StagePolicy, StageState,
};

/// Configuration of the whole decision pipeline.
#[derive(Debug, Clone, Copy, Default)]
pub struct PipelineConfig {
    pub detector: DetectorConfig,
    pub characterizer: CharacterizerConfig,
    pub stage: StageConfig,
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
