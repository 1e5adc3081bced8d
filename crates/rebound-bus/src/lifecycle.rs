//! Component lifecycle.
//!
//! Each component task is owned by a [`TaskControl`] handle carrying its
//! cooperative shutdown flag; the [`Pipeline`] supervisor bundles the three
//! handles and exposes idempotent start/stop/status.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::info;

use crate::bus::Bus;
use crate::tasks;
use rebound_core::PipelineConfig;

/// Owned control handle for one component task.
pub struct TaskControl {
    name: &'static str,
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl TaskControl {
    /// Spawn a task with a fresh shutdown flag.
    pub fn spawn<F, Fut>(name: &'static str, task: F) -> Self
    where
        F: FnOnce(watch::Receiver<bool>) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (shutdown, rx) = watch::channel(false);
        let handle = tokio::spawn(task(rx));
        Self {
            name,
            shutdown,
            handle,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }

    /// Signal shutdown without waiting.
    pub fn request_stop(&self) {
        let _ = self.shutdown.send(true);
    }

    /// Signal shutdown and wait for the task to exit.
    pub async fn stop(self) {
        self.request_stop();
        let _ = self.handle.await;
    }
}

/// Supervisor owning the three component tasks.
pub struct Pipeline {
    bus: Arc<Bus>,
    config: PipelineConfig,
    epoch: Instant,
    controls: Vec<TaskControl>,
}

impl Pipeline {
    pub fn new(bus: Arc<Bus>, config: PipelineConfig) -> Self {
        Self {
            bus,
            config,
            epoch: Instant::now(),
            controls: Vec::new(),
        }
    }

    /// Spawn the component tasks. Starting a running pipeline is not an
    /// error; it logs and returns.
    pub fn start(&mut self) {
        if self.is_running() {
            info!("pipeline already running");
            return;
        }
        self.controls.clear();

        let (bus, config, epoch) = (self.bus.clone(), self.config, self.epoch);
        self.controls.push(TaskControl::spawn("impact_detection", {
            let bus = bus.clone();
            move |shutdown| tasks::detection_task(bus, config.detector, epoch, shutdown)
        }));
        self.controls
            .push(TaskControl::spawn("impact_characterization", {
                let bus = bus.clone();
                move |shutdown| {
                    tasks::characterization_task(bus, config.characterizer, epoch, shutdown)
                }
            }));
        self.controls.push(TaskControl::spawn("recovery_stage", {
            let bus = bus.clone();
            move |shutdown| tasks::recovery_stage_task(bus, config.stage, epoch, shutdown)
        }));
    }

    pub fn is_running(&self) -> bool {
        self.controls.iter().any(TaskControl::is_running)
    }

    /// Name and liveness of each component task.
    pub fn status(&self) -> Vec<(&'static str, bool)> {
        self.controls
            .iter()
            .map(|c| (c.name(), c.is_running()))
            .collect()
    }

    /// Stop all component tasks and wait for them to exit. Idempotent.
    pub async fn stop(&mut self) {
        for control in self.controls.drain(..) {
            control.stop().await;
        }
    }
}
