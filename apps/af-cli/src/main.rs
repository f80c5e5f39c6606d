use af_app::{
    AnalysisSession, AppResult, RunOptions, RunProgressEvent, RunRequest, load_analysis,
    run_service,
};
use af_results::{FlutterRecord, RunOutcome};
use clap::{Parser, Subcommand};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

#[derive(Parser)]
#[command(name = "af-cli")]
#[command(about = "Flutter search for beam strips in supersonic flow", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate an analysis file
    Validate {
        /// Path to the analysis YAML or JSON file
        analysis_path: PathBuf,
    },
    /// Print the in-vacuo structural modes
    Modes {
        /// Path to the analysis YAML or JSON file
        analysis_path: PathBuf,
        /// Number of modes (defaults to the analysis modal count)
        #[arg(short, long)]
        count: Option<usize>,
    },
    /// Find the flutter velocity
    Run {
        /// Path to the analysis YAML or JSON file
        analysis_path: PathBuf,
        /// Skip cache and force re-run
        #[arg(long)]
        no_cache: bool,
        /// Parameters to differentiate (replaces the file's list)
        #[arg(long, num_args = 1..)]
        sensitivity: Option<Vec<String>>,
        /// Wall-clock budget in seconds
        #[arg(long)]
        budget: Option<f64>,
    },
    /// List cached runs of an analysis
    Runs {
        /// Path to the analysis YAML or JSON file
        analysis_path: PathBuf,
    },
    /// Show details of a cached run
    ShowRun {
        /// Path to the analysis YAML or JSON file
        analysis_path: PathBuf,
        /// Run ID to display
        run_id: String,
        /// Also print the sorted root listing
        #[arg(long)]
        roots: bool,
        /// Also print the flutter mode shape
        #[arg(long)]
        mode: bool,
    },
}

fn main() -> AppResult<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { analysis_path } => cmd_validate(&analysis_path),
        Commands::Modes {
            analysis_path,
            count,
        } => cmd_modes(&analysis_path, count),
        Commands::Run {
            analysis_path,
            no_cache,
            sensitivity,
            budget,
        } => cmd_run(&analysis_path, !no_cache, sensitivity, budget),
        Commands::Runs { analysis_path } => cmd_runs(&analysis_path),
        Commands::ShowRun {
            analysis_path,
            run_id,
            roots,
            mode,
        } => cmd_show_run(&analysis_path, &run_id, roots, mode),
    }
}

fn cmd_validate(analysis_path: &Path) -> AppResult<()> {
    println!("Validating analysis: {}", analysis_path.display());
    let analysis = load_analysis(analysis_path)?;
    println!("✓ Analysis '{}' is valid", analysis.name);
    Ok(())
}

fn cmd_modes(analysis_path: &Path, count: Option<usize>) -> AppResult<()> {
    let analysis = load_analysis(analysis_path)?;
    let count = count.unwrap_or(analysis.modal.modes);
    let session = AnalysisSession::new(analysis)?;

    println!("{:>5} {:>16} {:>14}", "mode", "omega [rad/s]", "f [Hz]");
    for mode in session.modes(count)? {
        println!(
            "{:>5} {:>16.6} {:>14.6}",
            mode.index, mode.omega_rad_s, mode.frequency_hz
        );
    }
    Ok(())
}

fn cmd_run(
    analysis_path: &Path,
    use_cache: bool,
    sensitivity: Option<Vec<String>>,
    budget: Option<f64>,
) -> AppResult<()> {
    println!("Running flutter search: {}", analysis_path.display());

    let request = RunRequest {
        analysis_path,
        options: RunOptions {
            use_cache,
            wall_clock_budget_s: budget,
            sensitivity,
            ..RunOptions::default()
        },
    };

    let mut last_emit = Instant::now();
    let mut last_stage = None;
    let response = run_service::ensure_run_with_progress(
        &request,
        Some(&mut |event| {
            let emit_now =
                last_stage != Some(event.stage) || last_emit.elapsed().as_millis() >= 100;
            if emit_now {
                render_cli_progress(&event);
                last_stage = Some(event.stage);
                last_emit = Instant::now();
            }
        }),
    )?;
    clear_progress_line();

    if response.loaded_from_cache {
        println!("✓ Loaded from cache: {}", response.run_id);
    } else {
        println!("✓ Search completed: {}", response.run_id);
    }
    print_outcome(&response.manifest.outcome, response.flutter.as_ref());
    println!("  Total: {:.3}s", response.total_time_s);
    Ok(())
}

fn cmd_runs(analysis_path: &Path) -> AppResult<()> {
    let runs = run_service::list_runs(analysis_path)?;

    if runs.is_empty() {
        println!("No cached runs found");
    } else {
        println!("Cached runs:");
        for manifest in runs {
            println!(
                "  {} - {} ({})",
                manifest.run_id,
                manifest.timestamp,
                outcome_label(&manifest.outcome)
            );
        }
    }
    Ok(())
}

fn cmd_show_run(analysis_path: &Path, run_id: &str, roots: bool, mode: bool) -> AppResult<()> {
    let artifacts = run_service::load_run(analysis_path, run_id)?;
    let manifest = &artifacts.manifest;

    println!("Run ID: {}", manifest.run_id);
    println!("Analysis: {}", manifest.analysis_name);
    println!("Timestamp: {}", manifest.timestamp);
    println!("Solver version: {}", manifest.solver_version);
    println!("Elapsed: {:.3}s", manifest.elapsed_s);
    println!("Evaluated roots: {}", artifacts.roots.len());
    print_outcome(&manifest.outcome, artifacts.flutter.as_ref());

    if mode && let Some(shape) = &artifacts.flutter_mode {
        println!("\nFlutter mode at {:.6} m/s:", shape.velocity_mps);
        println!(
            "{:>6} {:>14} {:>14} {:>12} {:>10}",
            "dof", "real", "imag", "magnitude", "phase deg"
        );
        for dof in 0..shape.len() {
            println!(
                "{:>6} {:>14.6e} {:>14.6e} {:>12.6} {:>10.2}",
                dof,
                shape.re[dof],
                shape.im[dof],
                shape.magnitude(dof).unwrap_or_default(),
                shape.phase(dof).unwrap_or_default().to_degrees()
            );
        }
    }

    if roots {
        println!("\n{:>18} {:>18} {:>18}", "velocity", "growth rate", "frequency");
        print!("{}", artifacts.sorted_roots);
    }
    Ok(())
}

fn outcome_label(outcome: &RunOutcome) -> String {
    match outcome {
        RunOutcome::Converged => "converged".to_string(),
        RunOutcome::NotConverged => "not converged".to_string(),
        RunOutcome::NoCrossingFound {
            samples,
            failed_samples,
        } => format!("no crossing, {samples} samples, {failed_samples} failed"),
    }
}

fn print_outcome(outcome: &RunOutcome, flutter: Option<&FlutterRecord>) {
    println!("\nOutcome: {}", outcome_label(outcome));
    let Some(f) = flutter else {
        return;
    };
    println!("  Flutter velocity: {:.6} m/s", f.velocity_mps);
    println!(
        "  Frequency:        {:.6} rad/s ({:.6} Hz)",
        f.frequency_rad_s, f.frequency_hz
    );
    println!("  Growth rate:      {:.3e}", f.growth_rate);
    println!("  Tracked mode:     {}", f.mode);
    println!(
        "  Bracket:          [{:.6}, {:.6}] m/s after {} iterations",
        f.bracket_mps.0, f.bracket_mps.1, f.iterations
    );
    if !f.sensitivities.is_empty() {
        println!("\nSensitivities:");
        for s in &f.sensitivities {
            println!(
                "  dV*/d{:<8} = {:>14.6e}   (slope {:.3e}, {})",
                s.param, s.dv_dp, s.growth_slope, s.slope_source
            );
        }
    }
}

fn clear_progress_line() {
    print!("\r{}\r", " ".repeat(120));
    let _ = io::stdout().flush();
}

fn render_cli_progress(event: &RunProgressEvent) {
    let mut line = match (&event.sweep, &event.refine) {
        (Some(s), _) => {
            let width = 28usize;
            let fraction = (s.sample + 1) as f64 / s.total.max(1) as f64;
            let filled = ((fraction * width as f64).round() as usize).min(width);
            format!(
                "\r[{}{}] {}  V={:.1} m/s  max σ={}",
                "#".repeat(filled),
                "-".repeat(width.saturating_sub(filled)),
                event.stage.label(),
                s.velocity_mps,
                s.max_growth_rate
                    .map_or_else(|| "failed".to_string(), |g| format!("{g:.3e}")),
            )
        }
        (None, Some(r)) => format!(
            "\r{} iter={}  V={:.6} m/s  σ={:.3e}  bracket=[{:.6}, {:.6}]",
            event.stage.label(),
            r.iteration,
            r.velocity_mps,
            r.growth_rate,
            r.bracket_mps.0,
            r.bracket_mps.1
        ),
        (None, None) => {
            let spinner = ['|', '/', '-', '\\'];
            let spin_idx = ((event.elapsed_wall_s * 10.0) as usize) % spinner.len();
            format!("\r{} {}", spinner[spin_idx], event.stage.label())
        }
    };
    line.push_str(&format!("  elapsed={:.2}s", event.elapsed_wall_s));
    if let Some(msg) = &event.message {
        line.push_str(&format!("  {}", msg));
    }
    print!("{}", line);
    let _ = io::stdout().flush();
}
