pub mod arc;
pub mod runner;

pub use arc::{benchmark_arc, evaluate_task, solve, solve_task, SolveMethod, Solution};
pub use runner::run_benchmark;
