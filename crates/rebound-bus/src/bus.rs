//! Last-value snapshot topics.
//!
//! Each topic is a thin wrapper over a `tokio::sync::watch` channel:
//! publishing replaces the stored snapshot atomically, subscribers either
//! wait for a change or read the latest value. Single-writer discipline is
//! by convention: every topic has exactly one publishing task.

use tokio::sync::watch;

use crate::topics::{
    ArmedState, AttitudeState, ImpactCharacterization, ImpactDetection, RecoveryStageState,
    SensorAccel, SensorGyro,
};

pub struct Topic<T> {
    tx: watch::Sender<T>,
}

impl<T: Clone + Default> Default for Topic<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: Clone> Topic<T> {
    pub fn new(initial: T) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx }
    }

    /// Replace the stored snapshot and wake waiting subscribers.
    pub fn publish(&self, value: T) {
        self.tx.send_replace(value);
    }

    /// Receiver that can await changes; the current snapshot counts as seen.
    pub fn subscribe(&self) -> watch::Receiver<T> {
        self.tx.subscribe()
    }

    /// Copy of the latest snapshot.
    pub fn latest(&self) -> T {
        self.tx.borrow().clone()
    }
}

/// All topics of the pipeline.
#[derive(Default)]
pub struct Bus {
    pub sensor_accel: Topic<SensorAccel>,
    pub sensor_gyro: Topic<SensorGyro>,
    pub attitude: Topic<AttitudeState>,
    pub armed: Topic<ArmedState>,
    pub detection: Topic<ImpactDetection>,
    pub characterization: Topic<ImpactCharacterization>,
    pub recovery_stage: Topic<RecoveryStageState>,
}

impl Bus {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Vector3;

    #[test]
    fn test_latest_tracks_publishes() {
        let bus = Bus::new();
        assert!(!bus.detection.latest().in_recovery);
        bus.detection.publish(ImpactDetection {
            timestamp_us: 42,
            in_recovery: true,
        });
        assert!(bus.detection.latest().in_recovery);
        assert_eq!(bus.detection.latest().timestamp_us, 42);
    }

    #[tokio::test]
    async fn test_subscriber_wakes_on_publish() {
        let bus = Bus::new();
        let mut rx = bus.sensor_accel.subscribe();

        bus.sensor_accel.publish(SensorAccel {
            timestamp_us: 1,
            accel_mss: Vector3::new(1.0, 2.0, 3.0),
        });
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow_and_update().accel_mss.x, 1.0);
    }
}
