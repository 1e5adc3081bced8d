//! Rebound - multirotor wall-impact recovery decision pipeline.

use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rebound_bus::{ArmedState, AttitudeState, Bus, Pipeline, SensorAccel, SensorGyro};
use rebound_core::{PipelineConfig, RecoveryStage, StageConfig, StagePolicy};
use rebound_sim::{generate_trace, inject_noise, NoiseConfig, ScenarioParams};

#[derive(Parser)]
#[command(name = "rebound")]
#[command(about = "Multirotor wall-impact recovery decision pipeline")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the live pipeline over a generated scenario feed
    Run {
        /// Feed rate, cycles per second
        #[arg(long, default_value_t = 100.0)]
        rate_hz: f32,

        /// Scenario length in seconds
        #[arg(long, default_value_t = 2.0)]
        duration: f32,

        /// Impact severity in g
        #[arg(long, default_value_t = 1.5)]
        peak_accel_g: f32,

        /// Gate the orientation debounce on pointing away from the wall
        #[arg(long)]
        wall_aligned: bool,
    },
    /// Batch scenario runs (pass remaining arguments to rebound-cli)
    Sim {
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Run {
            rate_hz,
            duration,
            peak_accel_g,
            wall_aligned,
        }) => run_live(rate_hz, duration, peak_accel_g, wall_aligned),
        Some(Commands::Sim { args }) => run_sim(&args),
        None => run_live(100.0, 2.0, 1.5, false),
    }
}

fn run_sim(args: &[String]) -> anyhow::Result<()> {
    let mut full_args = vec!["rebound-cli"];
    full_args.extend(args.iter().map(String::as_str));

    match rebound_cli::run_cli_main(&full_args) {
        Ok(()) => Ok(()),
        Err(e) => {
            eprintln!("CLI error: {}", e);
            std::process::exit(1);
        }
    }
}

fn run_live(
    rate_hz: f32,
    duration: f32,
    peak_accel_g: f32,
    wall_aligned: bool,
) -> anyhow::Result<()> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        let params = ScenarioParams {
            cycle_hz: rate_hz,
            duration_s: duration,
            peak_accel_g,
            ..ScenarioParams::default()
        };
        let trace = inject_noise(&generate_trace(&params), &NoiseConfig::default());

        let config = PipelineConfig {
            stage: StageConfig {
                policy: if wall_aligned {
                    StagePolicy::WallAligned
                } else {
                    StagePolicy::AttitudeOnly
                },
                ..StageConfig::default()
            },
            ..PipelineConfig::default()
        };

        let bus = Arc::new(Bus::new());
        let mut pipeline = Pipeline::new(bus.clone(), config);
        pipeline.start();

        let monitor = tokio::spawn(monitor_task(bus.clone()));

        // Let the component tasks reach their subscriptions before the
        // first sample lands.
        tokio::time::sleep(Duration::from_millis(20)).await;

        // Feed the scenario onto the bus at the requested rate.
        let cycle = Duration::from_secs_f32(1.0 / rate_hz);
        bus.armed.publish(ArmedState {
            timestamp_us: 0,
            armed: true,
        });
        for i in 0..trace.len() {
            let timestamp_us = (trace.time[i] * 1_000_000.0) as u64;
            bus.attitude.publish(AttitudeState {
                timestamp_us,
                q: trace.attitude[i],
                roll_rate: trace.roll_rate[i],
                pitch_rate: trace.pitch_rate[i],
            });
            bus.sensor_gyro.publish(SensorGyro {
                timestamp_us,
                rate_rad_s: trace.gyro_body[i],
            });
            bus.sensor_accel.publish(SensorAccel {
                timestamp_us,
                accel_mss: trace.accel_body[i],
            });
            tokio::time::sleep(cycle).await;
        }

        // Let the last cycle drain, then shut down.
        tokio::time::sleep(Duration::from_millis(50)).await;
        for (name, running) in pipeline.status() {
            tracing::info!(task = name, running, "final status");
        }
        pipeline.stop().await;
        monitor.abort();
        Ok(())
    })
}

/// Log pipeline transitions as they are published.
async fn monitor_task(bus: Arc<Bus>) {
    let mut detection_rx = bus.detection.subscribe();
    let mut characterization_rx = bus.characterization.subscribe();
    let mut stage_rx = bus.recovery_stage.subscribe();

    let mut in_recovery = false;
    let mut computed = false;
    let mut stage = RecoveryStage::Idle;
    let mut reset = false;

    loop {
        tokio::select! {
            changed = detection_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = *detection_rx.borrow_and_update();
                if snapshot.in_recovery != in_recovery {
                    in_recovery = snapshot.in_recovery;
                    tracing::info!(t_us = snapshot.timestamp_us, in_recovery, "impact detection");
                }
            }
            changed = characterization_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = *characterization_rx.borrow_and_update();
                if snapshot.state.accel_ref_is_computed != computed {
                    computed = snapshot.state.accel_ref_is_computed;
                    if computed {
                        let n = snapshot.state.wall_normal;
                        tracing::info!(
                            t_us = snapshot.timestamp_us,
                            wall_normal = format!("[{:.2}, {:.2}, {:.2}]", n.x, n.y, n.z),
                            response = snapshot.state.fuzzy_output,
                            "acceleration reference latched"
                        );
                    } else {
                        tracing::info!(t_us = snapshot.timestamp_us, "characterization reset");
                    }
                }
            }
            changed = stage_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = *stage_rx.borrow_and_update();
                if snapshot.stage() != stage {
                    stage = snapshot.stage();
                    tracing::info!(t_us = snapshot.timestamp_us, stage = stage.label(), "recovery stage");
                }
                if snapshot.recovery_is_reset != reset {
                    reset = snapshot.recovery_is_reset;
                    tracing::info!(t_us = snapshot.timestamp_us, reset, "recovery reset flag");
                }
            }
        }
    }
}
