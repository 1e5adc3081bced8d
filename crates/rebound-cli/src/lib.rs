//! Rebound CLI - batch runs of the recovery decision pipeline.

use anyhow::Result;
use clap::{Parser, ValueEnum};
use serde::Serialize;
use std::path::PathBuf;

use rebound_core::{
    CharacterizerConfig, DetectorConfig, PipelineConfig, RecoveryStage, StageConfig, StagePolicy,
    GRAVITY_MSS,
};
use rebound_sim::{
    generate_trace, inject_noise, run_pipeline, NoiseConfig, PipelineResult, ScenarioParams,
    ScenarioTrace,
};

/// Public function that can be called from the main binary
pub fn run_cli_main(args: &[&str]) -> Result<()> {
    let args = Args::parse_from(args);
    main_inner(args)
}

#[derive(Parser, Debug)]
#[command(name = "rebound-cli")]
#[command(about = "Wall-impact recovery scenario runner")]
#[command(version)]
pub struct Args {
    /// Output directory
    #[arg(short, long, default_value = "output")]
    output_dir: PathBuf,

    /// Summary file format
    #[arg(short, long, value_enum, default_value = "json")]
    format: SummaryFormat,

    // ── Scenario parameters ───────────────────────────────────
    #[arg(long, default_value_t = 100.0)]
    cycle_hz: f32,

    #[arg(long, default_value_t = 2.0)]
    duration: f32,

    #[arg(long, default_value_t = 0.5)]
    impact_time: f32,

    #[arg(long, default_value_t = 0.2)]
    cruise_accel_g: f32,

    #[arg(long, default_value_t = 1.5)]
    peak_accel_g: f32,

    #[arg(long, default_value_t = 0.3)]
    settled_accel_g: f32,

    #[arg(long, default_value_t = 0.0)]
    wall_azimuth_deg: f32,

    #[arg(long, default_value_t = -6.9)]
    pre_impact_pitch_deg: f32,

    #[arg(long, default_value_t = 20.0)]
    post_impact_tilt_deg: f32,

    #[arg(long, default_value_t = 2.5)]
    post_impact_rate: f32, // rad/s

    #[arg(long, default_value_t = 0.15)]
    tilt_decay_tau: f32,

    #[arg(long)]
    disarmed: bool,

    // ── Sensor options ────────────────────────────────────────
    #[arg(long)]
    no_noise: bool,

    #[arg(long, default_value_t = 42)]
    seed: u64,

    #[arg(long, default_value_t = 1.0)]
    noise_scale: f32,

    // ── Pipeline tunables ─────────────────────────────────────
    #[arg(long, default_value_t = 1.0)]
    trigger_accel_g: f32,

    #[arg(long, default_value_t = 0.17)]
    attitude_error_switch: f32, // rad

    #[arg(long, default_value_t = 0.2)]
    rp_switch: f32, // rad

    #[arg(long, default_value_t = 1.0)]
    rates_switch: f32, // rad/s

    #[arg(long, default_value_t = 3)]
    debounce_cycles: u32,

    /// Gate the orientation debounce on pointing away from the wall
    #[arg(long)]
    wall_aligned: bool,

    /// Settle delays for the four fuzzy inputs, cycles
    #[arg(long, value_delimiter = ' ')]
    settle_delay: Option<Vec<u32>>,

    #[arg(long, default_value_t = 2)]
    pre_impact_cycles: usize,

    #[arg(long, default_value_t = 0.75)]
    response_gain: f32,

    // ── Sweep options ─────────────────────────────────────────
    /// Sweep the impact severity instead of a single run
    #[arg(long)]
    sweep: bool,

    #[arg(long, default_value_t = 5)]
    sweep_steps: usize,

    #[arg(long, default_value_t = 1.1)]
    sweep_min_g: f32,

    #[arg(long, default_value_t = 3.0)]
    sweep_max_g: f32,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SummaryFormat {
    Csv,
    Json,
}

fn main_inner(args: Args) -> Result<()> {
    println!("Rebound Impact-Recovery Simulator");
    println!("=================================\n");

    if args.sweep {
        run_sweep(&args)?;
    } else {
        run_single(&args)?;
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Single Run
// ---------------------------------------------------------------------------
fn run_single(args: &Args) -> Result<()> {
    println!("Running single scenario...");

    let params = build_scenario_params(args);
    let config = build_pipeline_config(args);
    let trace = build_trace(args, &params);
    let result = run_pipeline(&trace, &config);

    let summary = Summary::from_result(&params, &result);
    print_run_stats(&summary);

    std::fs::create_dir_all(&args.output_dir)?;
    write_trace_csv(args, &trace, &result)?;
    write_summary(args, &summary)?;

    Ok(())
}

// ---------------------------------------------------------------------------
// Sweep Run
// ---------------------------------------------------------------------------
fn run_sweep(args: &Args) -> Result<()> {
    println!(
        "Sweeping impact severity over [{:.2}, {:.2}] g...",
        args.sweep_min_g, args.sweep_max_g
    );

    let steps = args.sweep_steps.max(2);
    let config = build_pipeline_config(args);
    let mut rows = Vec::new();

    for i in 0..steps {
        let peak =
            args.sweep_min_g + (args.sweep_max_g - args.sweep_min_g) * (i as f32 / (steps - 1) as f32);
        let params = ScenarioParams {
            peak_accel_g: peak,
            ..build_scenario_params(args)
        };
        let trace = build_trace(args, &params);
        let result = run_pipeline(&trace, &config);
        let summary = Summary::from_result(&params, &result);

        println!(
            "Run {}/{} | Peak: {:.2} g -> response {:.3}, reset at cycle {:?}",
            i + 1,
            steps,
            peak,
            summary.fuzzy_output,
            summary.reset_cycle
        );
        rows.push((peak, summary));
    }

    std::fs::create_dir_all(&args.output_dir)?;
    let path = args.output_dir.join("sweep_summary.csv");
    let mut wtr = csv::Writer::from_path(&path)?;
    wtr.write_record([
        "peak_accel_g",
        "detection_cycle",
        "computed_cycle",
        "fuzzy_output",
        "accel_ref_norm",
        "reset_cycle",
    ])?;
    for (peak, summary) in rows {
        wtr.write_record(&[
            format!("{:.3}", peak),
            format_cycle(summary.detection_cycle),
            format_cycle(summary.computed_cycle),
            format!("{:.4}", summary.fuzzy_output),
            format!("{:.4}", summary.accel_ref_norm),
            format_cycle(summary.reset_cycle),
        ])?;
    }
    wtr.flush()?;

    println!("\nSweep complete. Summary at {:?}", path);
    Ok(())
}

fn format_cycle(cycle: Option<usize>) -> String {
    cycle.map_or_else(|| "-".to_string(), |c| c.to_string())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn build_scenario_params(args: &Args) -> ScenarioParams {
    ScenarioParams {
        cycle_hz: args.cycle_hz,
        duration_s: args.duration,
        impact_time_s: args.impact_time,
        cruise_accel_g: args.cruise_accel_g,
        peak_accel_g: args.peak_accel_g,
        settled_accel_g: args.settled_accel_g,
        wall_azimuth_rad: args.wall_azimuth_deg.to_radians(),
        pre_impact_pitch_rad: args.pre_impact_pitch_deg.to_radians(),
        post_impact_tilt_rad: args.post_impact_tilt_deg.to_radians(),
        post_impact_rate_rad_s: args.post_impact_rate,
        tilt_decay_tau_s: args.tilt_decay_tau,
        armed: !args.disarmed,
    }
}

fn build_pipeline_config(args: &Args) -> PipelineConfig {
    let mut characterizer = CharacterizerConfig {
        pre_impact_cycles: args.pre_impact_cycles,
        response_gain: args.response_gain,
        ..CharacterizerConfig::default()
    };
    if let Some(delays) = &args.settle_delay {
        for (slot, &delay) in characterizer.input_settle_delay.iter_mut().zip(delays) {
            *slot = delay;
        }
    }

    PipelineConfig {
        detector: DetectorConfig {
            trigger_accel_mss: args.trigger_accel_g * GRAVITY_MSS,
        },
        characterizer,
        stage: StageConfig {
            attitude_error_switch_rad: args.attitude_error_switch,
            roll_pitch_switch_rad: args.rp_switch,
            rates_switch_rad_s: args.rates_switch,
            debounce_cycles: args.debounce_cycles,
            policy: if args.wall_aligned {
                StagePolicy::WallAligned
            } else {
                StagePolicy::AttitudeOnly
            },
        },
    }
}

fn build_trace(args: &Args, params: &ScenarioParams) -> ScenarioTrace {
    let trace = generate_trace(params);
    if args.no_noise {
        trace
    } else {
        inject_noise(
            &trace,
            &NoiseConfig {
                noise_scale: args.noise_scale,
                seed: args.seed,
                ..NoiseConfig::default()
            },
        )
    }
}

// ---------------------------------------------------------------------------
// Summary & Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
struct Summary {
    cycles: usize,
    impact_cycle: usize,
    detection_cycle: Option<usize>,
    computed_cycle: Option<usize>,
    wall_normal: [f32; 3],
    fuzzy_input: [f32; 4],
    fuzzy_output: f32,
    accel_ref_norm: f32,
    orient_correct_cycle: Option<usize>,
    stabilize_cycle: Option<usize>,
    reset_cycle: Option<usize>,
}

impl Summary {
    fn from_result(params: &ScenarioParams, result: &PipelineResult) -> Self {
        let latched = result
            .first_computed_cycle()
            .map(|c| result.characterization[c]);
        Self {
            cycles: result.len(),
            impact_cycle: params.impact_cycle(),
            detection_cycle: result.detection_cycles().first().copied(),
            computed_cycle: result.first_computed_cycle(),
            wall_normal: latched.map_or([0.0; 3], |c| c.wall_normal.into()),
            fuzzy_input: latched.map_or([0.0; 4], |c| c.fuzzy_input),
            fuzzy_output: latched.map_or(0.0, |c| c.fuzzy_output),
            accel_ref_norm: latched.map_or(0.0, |c| c.accel_reference.norm()),
            orient_correct_cycle: result.first_cycle_in_stage(RecoveryStage::OrientCorrect),
            stabilize_cycle: result.first_cycle_in_stage(RecoveryStage::Stabilize),
            reset_cycle: result.reset_cycles().first().copied(),
        }
    }
}

fn print_run_stats(summary: &Summary) {
    println!("\nScenario Stats:");
    println!("  Cycles:          {}", summary.cycles);
    println!("  Impact cycle:    {}", summary.impact_cycle);
    println!("  Detected:        {}", format_cycle(summary.detection_cycle));
    println!("  Ref computed:    {}", format_cycle(summary.computed_cycle));
    println!(
        "  Wall normal:     [{:.3}, {:.3}, {:.3}]",
        summary.wall_normal[0], summary.wall_normal[1], summary.wall_normal[2]
    );
    println!("  Fuzzy output:    {:.4}", summary.fuzzy_output);
    println!("  Accel ref norm:  {:.3} m/s^2", summary.accel_ref_norm);
    println!(
        "  Orient correct:  {}",
        format_cycle(summary.orient_correct_cycle)
    );
    println!("  Stabilize:       {}", format_cycle(summary.stabilize_cycle));
    println!("  Reset:           {}", format_cycle(summary.reset_cycle));
    println!("-----------------------------");
}

fn write_trace_csv(args: &Args, trace: &ScenarioTrace, result: &PipelineResult) -> Result<()> {
    let path = args.output_dir.join("pipeline_trace.csv");
    let mut wtr = csv::Writer::from_path(&path)?;

    wtr.write_record([
        "time",
        "accel_x",
        "accel_y",
        "accel_z",
        "gyro_x",
        "gyro_y",
        "gyro_z",
        "in_recovery",
        "stage",
        "recovery_is_reset",
        "wall_normal_x",
        "wall_normal_y",
        "wall_normal_z",
        "fuzzy_in_0",
        "fuzzy_in_1",
        "fuzzy_in_2",
        "fuzzy_in_3",
        "fuzzy_output",
        "accel_ref_x",
        "accel_ref_y",
        "accel_ref_z",
    ])?;

    for i in 0..result.len() {
        let accel = trace.accel_body[i];
        let gyro = trace.gyro_body[i];
        let characterization = &result.characterization[i];
        wtr.write_record(&[
            format!("{:.4}", result.time[i]),
            format!("{:.4}", accel.x),
            format!("{:.4}", accel.y),
            format!("{:.4}", accel.z),
            format!("{:.4}", gyro.x),
            format!("{:.4}", gyro.y),
            format!("{:.4}", gyro.z),
            format!("{}", result.in_recovery[i] as u8),
            format!("{}", result.stage[i] as u8),
            format!("{}", result.recovery_is_reset[i] as u8),
            format!("{:.4}", characterization.wall_normal.x),
            format!("{:.4}", characterization.wall_normal.y),
            format!("{:.4}", characterization.wall_normal.z),
            format!("{:.4}", characterization.fuzzy_input[0]),
            format!("{:.4}", characterization.fuzzy_input[1]),
            format!("{:.4}", characterization.fuzzy_input[2]),
            format!("{:.4}", characterization.fuzzy_input[3]),
            format!("{:.4}", characterization.fuzzy_output),
            format!("{:.4}", characterization.accel_reference.x),
            format!("{:.4}", characterization.accel_reference.y),
            format!("{:.4}", characterization.accel_reference.z),
        ])?;
    }

    wtr.flush()?;
    println!("Trace written to {:?}", path);
    Ok(())
}

fn write_summary(args: &Args, summary: &Summary) -> Result<()> {
    match args.format {
        SummaryFormat::Json => {
            let path = args.output_dir.join("summary.json");
            std::fs::write(&path, serde_json::to_string_pretty(summary)?)?;
            println!("Summary written to {:?}", path);
        }
        SummaryFormat::Csv => {
            let path = args.output_dir.join("summary.csv");
            let mut wtr = csv::Writer::from_path(&path)?;
            wtr.write_record([
                "cycles",
                "impact_cycle",
                "detection_cycle",
                "computed_cycle",
                "fuzzy_output",
                "accel_ref_norm",
                "reset_cycle",
            ])?;
            wtr.write_record(&[
                summary.cycles.to_string(),
                summary.impact_cycle.to_string(),
                format_cycle(summary.detection_cycle),
                format_cycle(summary.computed_cycle),
                format!("{:.4}", summary.fuzzy_output),
                format!("{:.4}", summary.accel_ref_norm),
                format_cycle(summary.reset_cycle),
            ])?;
            wtr.flush()?;
            println!("Summary written to {:?}", path);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_args_parse() {
        let args = Args::try_parse_from(["rebound-cli"]).unwrap();
        assert_eq!(args.cycle_hz, 100.0);
        assert!(!args.sweep);
        assert!(args.settle_delay.is_none());
    }

    #[test]
    fn test_degree_args_convert_to_radians() {
        let args =
            Args::try_parse_from(["rebound-cli", "--wall-azimuth-deg", "90"]).unwrap();
        let params = build_scenario_params(&args);
        assert!((params.wall_azimuth_rad - std::f32::consts::FRAC_PI_2).abs() < 1e-6);
    }

    #[test]
    fn test_settle_delay_override() {
        let args = Args::try_parse_from([
            "rebound-cli",
            "--settle-delay",
            "1 1 1 1",
        ])
        .unwrap();
        let config = build_pipeline_config(&args);
        assert_eq!(config.characterizer.input_settle_delay, [1, 1, 1, 1]);
    }

    #[test]
    fn test_single_run_writes_outputs() {
        let dir = std::env::temp_dir().join("rebound-cli-test-single");
        let _ = std::fs::remove_dir_all(&dir);
        let args = Args::try_parse_from([
            "rebound-cli",
            "--output-dir",
            dir.to_str().unwrap(),
            "--no-noise",
        ])
        .unwrap();
        main_inner(args).unwrap();
        assert!(dir.join("pipeline_trace.csv").exists());
        assert!(dir.join("summary.json").exists());
        let _ = std::fs::remove_dir_all(&dir);
    }
}
