//! # Rebound Bus
//!
//! Snapshot topics and component tasks for the wall-impact recovery
//! pipeline. Topics are single-writer, multi-reader, last-value channels;
//! each pipeline component runs as an independent task woken by new data
//! on its primary feed or a bounded timeout, whichever comes first.

pub mod bus;
pub mod lifecycle;
pub mod tasks;
pub mod topics;

pub use bus::{Bus, Topic};
pub use lifecycle::{Pipeline, TaskControl};
pub use tasks::POLL_TIMEOUT;
pub use topics::{
    ArmedState, AttitudeState, ImpactCharacterization, ImpactDetection, RecoveryStageState,
    SensorAccel, SensorGyro,
};
