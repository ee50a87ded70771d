// gridsynth CLI.
//
// Commands:
// - solve: run the fallback chain on one task file and print predictions
// - bench: run every task file in a directory and print a summary

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use gridsynth::bench::arc::solve_task;
use gridsynth::bench::runner::run_benchmark;
use gridsynth::core::SolverConfig;
use gridsynth::perception::grid::{grid_to_string, load_arc_task};

#[derive(Parser)]
#[command(name = "gridsynth")]
#[command(version)]
#[command(about = "Grid-transformation puzzle solver")]
struct Cli {
    /// Solver configuration (JSON); defaults are used for missing fields
    #[arg(long, env = "GRIDSYNTH_CONFIG")]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Solve a single task file
    Solve {
        /// Task JSON with train and test sections
        task: PathBuf,

        /// Print the result as JSON instead of grids
        #[arg(long)]
        json: bool,
    },
    /// Run all task files in a directory
    Bench {
        /// Directory of task JSON files
        dir: PathBuf,

        /// Only run the first N tasks (file-name order)
        #[arg(long)]
        max_tasks: Option<usize>,

        /// Print a line per task
        #[arg(long)]
        detail: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    let config = match &cli.config {
        Some(path) => SolverConfig::from_json_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => SolverConfig::default(),
    };

    match cli.command {
        Commands::Solve { task, json } => {
            let task = load_arc_task(&task)?;
            let result = solve_task(&task, &config)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                println!("task {} | method={} size={} checked={}",
                    result.task_id, result.method, result.program_size, result.checked);
                for (i, grid) in result.predictions.iter().enumerate() {
                    println!("\n--- test {} ---", i);
                    println!("{}", grid_to_string(grid));
                }
                if result.total > 0 {
                    println!("\nsolved: {} ({}/{})", result.solved, result.correct, result.total);
                }
            }
        }
        Commands::Bench { dir, max_tasks, detail } => {
            let dir = dir.to_str().context("task directory is not valid UTF-8")?;
            let report = run_benchmark(dir, max_tasks, &config)?;
            if detail {
                report.print_detail();
            } else {
                report.print_summary();
            }
        }
    }
    Ok(())
}
