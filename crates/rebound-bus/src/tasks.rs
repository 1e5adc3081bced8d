//! Component tasks.
//!
//! Each task polls its primary feed with a bounded timeout, reads the
//! secondary feeds as latest values, steps its core component once per new
//! sample and publishes its snapshot. A timeout with no new data is a
//! no-op continuation; a stalled producer simply freezes the consumer's
//! inputs at the last value.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::watch;
use tokio::time::sleep;
use tracing::info;

use crate::bus::Bus;
use crate::topics::{ImpactCharacterization, ImpactDetection, RecoveryStageState};
use rebound_core::{
    CharacterizerConfig, CharacterizerInput, DetectorConfig, DetectorInput, ImpactCharacterizer,
    ImpactDetector, RecoveryStageMachine, StageConfig, StageInput,
};

/// Bounded wait on the primary feed, as in the original 100 ms poll.
pub const POLL_TIMEOUT: Duration = Duration::from_millis(100);

fn micros_since(epoch: Instant) -> u64 {
    epoch.elapsed().as_micros() as u64
}

fn should_exit(shutdown: &watch::Receiver<bool>) -> bool {
    *shutdown.borrow()
}

pub async fn detection_task(
    bus: Arc<Bus>,
    config: DetectorConfig,
    epoch: Instant,
    mut shutdown: watch::Receiver<bool>,
) {
    info!("impact_detection starting");
    let mut detector = ImpactDetector::new(config);
    let mut accel_rx = bus.sensor_accel.subscribe();

    loop {
        tokio::select! {
            changed = accel_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let accel = *accel_rx.borrow_and_update();
                let attitude = bus.attitude.latest();
                let armed = bus.armed.latest();
                let recovery_stage = bus.recovery_stage.latest();

                let state = detector.update(&DetectorInput {
                    accel_body_mss: accel.accel_mss,
                    attitude: attitude.q,
                    armed: armed.armed,
                    recovery_is_reset: recovery_stage.recovery_is_reset,
                });
                bus.detection.publish(ImpactDetection {
                    timestamp_us: micros_since(epoch),
                    in_recovery: state.in_recovery,
                });
            }
            _ = sleep(POLL_TIMEOUT) => {}
            _ = shutdown.changed() => {
                if should_exit(&shutdown) {
                    break;
                }
            }
        }
    }
    info!("impact_detection exiting");
}

pub async fn characterization_task(
    bus: Arc<Bus>,
    config: CharacterizerConfig,
    epoch: Instant,
    mut shutdown: watch::Receiver<bool>,
) {
    info!("impact_characterization starting");
    let mut characterizer =
        ImpactCharacterizer::new(config, rebound_core::impact_response_model());
    let mut accel_rx = bus.sensor_accel.subscribe();

    loop {
        tokio::select! {
            changed = accel_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let accel = *accel_rx.borrow_and_update();
                let gyro = bus.sensor_gyro.latest();
                let attitude = bus.attitude.latest();
                let detection = bus.detection.latest();
                let recovery_stage = bus.recovery_stage.latest();

                let state = characterizer.update(&CharacterizerInput {
                    accel_body_mss: accel.accel_mss,
                    gyro_rad_s: gyro.rate_rad_s,
                    attitude: attitude.q,
                    in_recovery: detection.in_recovery,
                    recovery_is_reset: recovery_stage.recovery_is_reset,
                });
                bus.characterization.publish(ImpactCharacterization {
                    timestamp_us: micros_since(epoch),
                    state,
                });
            }
            _ = sleep(POLL_TIMEOUT) => {}
            _ = shutdown.changed() => {
                if should_exit(&shutdown) {
                    break;
                }
            }
        }
    }
    info!("impact_characterization exiting");
}

pub async fn recovery_stage_task(
    bus: Arc<Bus>,
    config: StageConfig,
    epoch: Instant,
    mut shutdown: watch::Receiver<bool>,
) {
    info!("recovery_stage starting");
    let mut machine = RecoveryStageMachine::new(config);
    let mut accel_rx = bus.sensor_accel.subscribe();

    loop {
        tokio::select! {
            changed = accel_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                accel_rx.borrow_and_update();
                let attitude = bus.attitude.latest();
                let detection = bus.detection.latest();
                let characterization = bus.characterization.latest();

                let state = machine.update(&StageInput {
                    attitude: attitude.q,
                    roll_rate: attitude.roll_rate,
                    pitch_rate: attitude.pitch_rate,
                    in_recovery: detection.in_recovery,
                    accel_ref_is_computed: characterization.state.accel_ref_is_computed,
                    wall_normal: characterization.state.wall_normal,
                    inclination_deg: characterization.state.fuzzy_input[1],
                });
                bus.recovery_stage.publish(RecoveryStageState {
                    timestamp_us: micros_since(epoch),
                    stage_raw: state.stage as u8,
                    recovery_is_reset: state.recovery_is_reset,
                });
            }
            _ = sleep(POLL_TIMEOUT) => {}
            _ = shutdown.changed() => {
                if should_exit(&shutdown) {
                    break;
                }
            }
        }
    }
    info!("recovery_stage exiting");
}
