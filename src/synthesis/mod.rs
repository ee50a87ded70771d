pub mod beam;
pub mod dsl;
pub mod heuristics;
pub mod program;
pub mod rules;
pub mod score;

pub use beam::{synthesize, synthesize_with_budget, SearchBudget, SynthesisResult};
pub use dsl::{apply_named, Prim, PrimParams, TransformationSet};
pub use heuristics::{diagnose, heuristic_solution, Pattern, PatternInfo};
pub use program::Program;
pub use rules::{match_single_rule, Rule, RuleMatch};
