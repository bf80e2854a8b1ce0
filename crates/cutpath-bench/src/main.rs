//! cutpath-bench: CLI tool for planner option experimentation and diagnostics.
//!
//! Loads stroked outlines from a JSON file (an array of
//! [`Outline`](cutpath_planner::Outline) values, coordinates in mm), plans
//! a toolpath with configurable options and prints per-stage diagnostics.
//! Useful for:
//!
//! - Comparing inside-first and greedy ordering against native order
//! - Checking which registration marks are detected in a document
//! - Measuring per-stage durations on large inputs
//!
//! Set `RUST_LOG=cutpath_planner=debug` to see stage logging.
//!
//! # Usage
//!
//! ```text
//! cargo run --release --bin cutpath-bench -- [OPTIONS] <OUTLINES_JSON>
//! ```

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::{Duration, Instant};

use clap::{Parser, ValueEnum};
use cutpath_planner::diagnostics::{Clock, PlanDiagnostics, plan_with_diagnostics};
use cutpath_planner::{Outline, PlanConfig, PlotMode, Point, RegmarkMode, RegmarkSpecification};
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;

/// Toolpath planning experimentation and diagnostics.
///
/// Plans a toolpath for the given outlines and prints detailed per-stage
/// timing and count diagnostics.
#[derive(Parser)]
#[command(name = "cutpath-bench", version)]
struct Cli {
    /// Path to a JSON array of outlines.
    outlines_path: PathBuf,

    /// Device tool. Guessed from `--layer` names when omitted, else cut.
    #[arg(long, value_enum)]
    mode: Option<Mode>,

    /// Name of a layer in the source document, used to guess `--mode`.
    /// May be given multiple times.
    #[arg(long = "layer")]
    layers: Vec<String>,

    /// Plan nested shapes before their enclosures (cut mode default).
    #[arg(long, conflicts_with = "no_inside_first")]
    inside_first: bool,

    /// Plan shapes without regard to nesting (plot mode default).
    #[arg(long)]
    no_inside_first: bool,

    /// Keep input order instead of reordering to reduce travel.
    #[arg(long)]
    native_order: bool,

    /// Only plan outlines stroked in this colour (`r,g,b,a` in 0-1).
    /// May be given multiple times.
    #[arg(long = "colour", value_parser = parse_rgba)]
    colours: Vec<cutpath_planner::Rgba>,

    /// Registration mark detection.
    #[arg(long, value_enum, default_value_t = Regmarks::Auto)]
    regmarks: Regmarks,

    /// Use registration marks at a known position instead of searching.
    #[arg(long, num_args = 4, value_names = ["X", "Y", "WIDTH", "HEIGHT"])]
    manual_regmarks: Option<Vec<f64>>,

    /// Only accept registration mark boxes of this size in mm (default 5).
    #[arg(long, conflicts_with = "any_box_size")]
    required_box_size: Option<f64>,

    /// Accept registration mark boxes of any size.
    #[arg(long)]
    any_box_size: bool,

    /// Only accept registration mark brackets with arms this long (mm).
    #[arg(long)]
    required_line_length: Option<f64>,

    /// Only accept registration marks stroked this thick (mm).
    #[arg(long)]
    required_line_thickness: Option<f64>,

    /// Keep registration mark geometry in the toolpath.
    #[arg(long)]
    include_regmarks: bool,

    /// Over-cut distance in mm (defaults to 1mm when cutting, 0 when plotting).
    #[arg(long)]
    over_cut: Option<f64>,

    /// Initial tool position as `x,y` in mm.
    #[arg(long, value_parser = parse_point, default_value = "0,0")]
    start: Point,

    /// Write the planned toolpath as JSON to this file.
    #[arg(long)]
    output: Option<PathBuf>,

    /// Number of runs for averaging.
    #[arg(
        long,
        default_value_t = 1,
        value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..)
    )]
    runs: usize,

    /// Output diagnostics as JSON instead of human-readable report.
    #[arg(long)]
    json: bool,

    /// Full planner config as a JSON string.
    ///
    /// When provided, all other planner option flags are ignored.
    /// The JSON must be a valid `PlanConfig` serialization.
    #[arg(long)]
    config_json: Option<String>,
}

/// Device tool selection.
#[derive(Clone, Copy, ValueEnum)]
enum Mode {
    /// Blade cutting.
    Cut,
    /// Pen plotting.
    Plot,
}

/// Registration mark detection selection.
#[derive(Clone, Copy, ValueEnum)]
enum Regmarks {
    /// Use registration marks when found.
    Auto,
    /// Fail when no registration marks are found.
    Required,
    /// Never look for registration marks.
    Off,
}

fn parse_floats<const N: usize>(s: &str) -> Result<[f64; N], String> {
    let values = s
        .split(',')
        .map(|v| v.trim().parse::<f64>().map_err(|e| format!("{v:?}: {e}")))
        .collect::<Result<Vec<_>, _>>()?;
    values
        .try_into()
        .map_err(|v: Vec<f64>| format!("expected {N} comma-separated numbers, got {}", v.len()))
}

fn parse_point(s: &str) -> Result<Point, String> {
    let [x, y] = parse_floats(s)?;
    Ok(Point::new(x, y))
}

fn parse_rgba(s: &str) -> Result<cutpath_planner::Rgba, String> {
    let [r, g, b, a] = parse_floats(s)?;
    Ok(cutpath_planner::Rgba::new(r, g, b, a))
}

/// Build a [`PlanConfig`] from CLI arguments.
///
/// If `--config-json` is provided, the JSON is parsed directly and all
/// individual option flags are ignored.
fn config_from_cli(cli: &Cli) -> Result<PlanConfig, String> {
    if let Some(ref json) = cli.config_json {
        return serde_json::from_str(json).map_err(|e| format!("Error parsing --config-json: {e}"));
    }

    let regmarks = match (&cli.manual_regmarks, cli.regmarks) {
        (Some(values), _) => match values.as_slice() {
            &[x, y, width, height] => {
                RegmarkMode::Manual(RegmarkSpecification::manual(x, y, width, height))
            }
            _ => return Err("--manual-regmarks takes X Y WIDTH HEIGHT".to_string()),
        },
        (None, Regmarks::Auto) => RegmarkMode::Auto,
        (None, Regmarks::Required) => RegmarkMode::Required,
        (None, Regmarks::Off) => RegmarkMode::Disabled,
    };

    let inside_first = if cli.no_inside_first {
        Some(false)
    } else if cli.inside_first {
        Some(true)
    } else {
        None
    };

    let mode = match cli.mode {
        Some(Mode::Cut) => PlotMode::Cut,
        Some(Mode::Plot) => PlotMode::Plot,
        None => {
            let guessed = PlotMode::guess(&cli.layers);
            debug!(?guessed, layers = cli.layers.len(), "guessed mode from layer names");
            guessed.unwrap_or_default()
        }
    };

    let required_box_size = if cli.any_box_size {
        None
    } else {
        cli.required_box_size.or(Some(PlanConfig::DEFAULT_REQUIRED_BOX_SIZE))
    };

    Ok(PlanConfig {
        mode,
        inside_first,
        fast_order: !cli.native_order,
        colours: (!cli.colours.is_empty()).then(|| cli.colours.clone()),
        regmarks,
        required_box_size,
        required_line_length: cli.required_line_length,
        required_line_thickness: cli.required_line_thickness,
        include_regmarks: cli.include_regmarks,
        over_cut: cli.over_cut,
        start_position: cli.start,
    })
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = match config_from_cli(&cli) {
        Ok(c) => c,
        Err(msg) => {
            eprintln!("{msg}");
            return ExitCode::FAILURE;
        }
    };

    let outlines: Vec<Outline> = match std::fs::read_to_string(&cli.outlines_path)
        .map_err(|e| e.to_string())
        .and_then(|s| serde_json::from_str(&s).map_err(|e| e.to_string()))
    {
        Ok(outlines) => outlines,
        Err(e) => {
            eprintln!("Error reading {}: {e}", cli.outlines_path.display());
            return ExitCode::FAILURE;
        }
    };

    eprintln!(
        "Outlines: {} ({} outlines)",
        cli.outlines_path.display(),
        outlines.len(),
    );
    eprintln!("Config: {config:#?}");
    eprintln!("Runs: {}", cli.runs);
    eprintln!();

    let mut all_diagnostics = Vec::with_capacity(cli.runs);

    for run in 0..cli.runs {
        if cli.runs > 1 {
            eprintln!("--- Run {}/{} ---", run + 1, cli.runs);
        }

        match plan_with_diagnostics(&outlines, &config, &StdClock) {
            Ok((toolpath, diagnostics)) => {
                if cli.json {
                    match serde_json::to_string_pretty(&diagnostics) {
                        Ok(json) => println!("{json}"),
                        Err(e) => {
                            eprintln!("Error serializing diagnostics: {e}");
                            return ExitCode::FAILURE;
                        }
                    }
                } else {
                    println!("{}", diagnostics.report());
                }

                // Write the toolpath on the first run only.
                if run == 0
                    && let Some(ref output_path) = cli.output
                {
                    let written = serde_json::to_string_pretty(&toolpath)
                        .map_err(|e| e.to_string())
                        .and_then(|json| {
                            std::fs::write(output_path, &json)
                                .map(|()| json.len())
                                .map_err(|e| e.to_string())
                        });
                    match written {
                        Ok(bytes) => {
                            debug!(path = %output_path.display(), bytes, "wrote toolpath");
                            eprintln!(
                                "Toolpath written to {} ({bytes} bytes)",
                                output_path.display(),
                            );
                        }
                        Err(e) => {
                            eprintln!("Error writing toolpath to {}: {e}", output_path.display());
                        }
                    }
                }

                all_diagnostics.push(diagnostics);
            }
            Err(e) => {
                error!(error = %e, "planning failed");
                eprintln!("Planner error: {e}");
                return ExitCode::FAILURE;
            }
        }

        if cli.runs > 1 {
            eprintln!();
        }
    }

    if cli.runs > 1 {
        print_multi_run_summary(&all_diagnostics);
    }

    ExitCode::SUCCESS
}

/// [`Clock`] implementation backed by [`std::time::Instant`].
struct StdClock;

impl Clock for StdClock {
    type Instant = Instant;

    fn now(&self) -> Instant {
        Instant::now()
    }

    fn elapsed(&self, since: &Instant) -> Duration {
        since.elapsed()
    }
}

/// Print aggregated statistics across multiple runs.
#[allow(clippy::cast_precision_loss)]
fn print_multi_run_summary(all_diagnostics: &[PlanDiagnostics]) {
    println!();
    println!(
        "Summary ({} runs)\n{}",
        all_diagnostics.len(),
        "=".repeat(60),
    );

    let Some(first) = all_diagnostics.first() else {
        println!("Warning: no diagnostics to summarize");
        return;
    };

    let durations: Vec<f64> = all_diagnostics
        .iter()
        .map(|d| d.total_duration.as_secs_f64() * 1000.0)
        .collect();

    let min = durations.iter().copied().reduce(f64::min).unwrap_or(0.0);
    let max = durations.iter().copied().reduce(f64::max).unwrap_or(0.0);
    let mean = durations.iter().sum::<f64>() / durations.len() as f64;

    println!("Total duration: min={min:.3}ms  mean={mean:.3}ms  max={max:.3}ms");

    println!();
    println!("{:<16} {:>12}", "Stage", "Mean (ms)");
    println!("{}", "-".repeat(32));

    for (i, (name, _)) in first.stages().iter().enumerate() {
        let stage_mean = all_diagnostics
            .iter()
            .map(|d| d.stages()[i].1.duration.as_secs_f64() * 1000.0)
            .sum::<f64>()
            / all_diagnostics.len() as f64;
        println!("{name:<16} {stage_mean:>10.3}ms");
    }
}
