// Benchmark runner over a directory of task files.
// Loads every *.json task, runs the fallback chain, and reports per-task
// results and how many tasks each stage solved.

use std::path::Path;
use std::time::Instant;

use anyhow::Context;
use tracing::{info, warn};

use crate::core::config::SolverConfig;
use crate::perception::grid::load_arc_task;
use super::arc::{solve_task, ArcResult, SolveMethod};

#[derive(Debug)]
pub struct BenchmarkReport {
    pub total_tasks: usize,
    pub solved: usize,
    pub skipped: usize,
    pub score: f64,
    pub elapsed_ms: u64,
    pub by_method: Vec<(SolveMethod, usize)>,
    pub per_task: Vec<TaskReport>,
}

#[derive(Debug, Clone)]
pub struct TaskReport {
    pub task_id: String,
    pub solved: bool,
    pub correct: usize,
    pub total: usize,
    pub method: SolveMethod,
    pub program_size: usize,
    pub checked: usize,
    pub elapsed_ms: u64,
}

/// Run the solver on every task file in `data_dir`, in file-name order.
/// Files that fail to load or validate are skipped with a warning.
pub fn run_benchmark(data_dir: &str, max_tasks: Option<usize>, config: &SolverConfig) -> anyhow::Result<BenchmarkReport> {
    config.validate()?;
    let dir = Path::new(data_dir);
    let mut entries: Vec<_> = std::fs::read_dir(dir)
        .with_context(|| format!("cannot read task directory {}", dir.display()))?
        .filter_map(|e| e.ok())
        .filter(|e| e.path().extension().map(|ext| ext == "json").unwrap_or(false))
        .collect();
    entries.sort_by_key(|e| e.file_name());

    if let Some(max) = max_tasks {
        entries.truncate(max);
    }

    let total_start = Instant::now();
    let mut per_task = Vec::new();
    let mut skipped = 0usize;
    let mut method_counts: rustc_hash::FxHashMap<SolveMethod, usize> = Default::default();

    for entry in &entries {
        let path = entry.path();
        let task = match load_arc_task(&path) {
            Ok(t) => t,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "skipping task");
                skipped += 1;
                continue;
            }
        };

        let start = Instant::now();
        let result: ArcResult = match solve_task(&task, config) {
            Ok(r) => r,
            Err(e) => {
                warn!(task = %task.id, error = %e, "task rejected");
                skipped += 1;
                continue;
            }
        };
        let elapsed = start.elapsed().as_millis() as u64;

        if result.solved {
            *method_counts.entry(result.method).or_default() += 1;
        }
        info!(task = %result.task_id, solved = result.solved, method = %result.method, elapsed_ms = elapsed, "task done");

        per_task.push(TaskReport {
            task_id: result.task_id,
            solved: result.solved,
            correct: result.correct,
            total: result.total,
            method: result.method,
            program_size: result.program_size,
            checked: result.checked,
            elapsed_ms: elapsed,
        });
    }

    let total_elapsed = total_start.elapsed().as_millis() as u64;
    let solved = per_task.iter().filter(|t| t.solved).count();

    let mut by_method: Vec<(SolveMethod, usize)> = method_counts.into_iter().collect();
    by_method.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.as_str().cmp(b.0.as_str())));

    Ok(BenchmarkReport {
        total_tasks: per_task.len(),
        solved,
        skipped,
        score: if per_task.is_empty() { 0.0 } else { solved as f64 / per_task.len() as f64 },
        elapsed_ms: total_elapsed,
        by_method,
        per_task,
    })
}

impl BenchmarkReport {
    pub fn print_summary(&self) {
        println!("=== Grid puzzle benchmark ===");
        println!("Tasks: {} | Solved: {} | Skipped: {} | Score: {:.1}%",
            self.total_tasks, self.solved, self.skipped, self.score * 100.0);
        println!("Time: {}ms", self.elapsed_ms);
        println!("\nBy method:");
        for (method, count) in &self.by_method {
            println!("  {}: {} ({:.1}%)", method, count,
                *count as f64 / self.solved.max(1) as f64 * 100.0);
        }
    }

    pub fn print_detail(&self) {
        self.print_summary();
        println!("\nPer-task detail:");
        for t in &self.per_task {
            let status = if t.solved { "OK" } else { "--" };
            println!("  [{}] {} | {}/{} | method={} size={} checked={} time={}ms",
                status, t.task_id, t.correct, t.total, t.method, t.program_size, t.checked, t.elapsed_ms);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(name: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("gridsynth-{}-{}", name, std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn runs_directory_and_skips_bad_files() {
        let dir = scratch_dir("runner");
        std::fs::write(dir.join("a.json"), r#"{
            "train": [{"input": [[1, 2]], "output": [[2, 1]]}],
            "test": [{"input": [[5, 6]], "output": [[6, 5]]}]
        }"#).unwrap();
        std::fs::write(dir.join("b.json"), "not json").unwrap();
        std::fs::write(dir.join("notes.txt"), "ignored").unwrap();

        let report = run_benchmark(dir.to_str().unwrap(), None, &SolverConfig::default()).unwrap();
        assert_eq!(report.total_tasks, 1);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.solved, 1);
        assert_eq!(report.by_method, vec![(SolveMethod::Rule, 1)]);
        assert_eq!((report.per_task[0].correct, report.per_task[0].total), (1, 1));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn missing_directory_is_an_error() {
        assert!(run_benchmark("/nonexistent/gridsynth", None, &SolverConfig::default()).is_err());
    }
}
