// Beam-search program synthesis.
//
// Each depth step extends every program in the beam by every library
// primitive, scores the children against the whole training set, and keeps
// the best `beam_width`. Ordering is (score, length, library index of the
// last primitive); the sort is stable so remaining ties keep parent order.

use std::cmp::Ordering;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{debug, trace};

use crate::core::config::SolverConfig;
use crate::core::error::{Result, SolverError};
use crate::core::types::validate_training_set;
use super::dsl::{TrainingPair, TransformationSet};
use super::program::Program;
use super::score::score_program;

/// Optional limits, checked between depth steps only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchBudget {
    pub max_evaluations: Option<usize>,
    pub time_limit: Option<Duration>,
}

impl SearchBudget {
    pub fn unlimited() -> Self {
        Self::default()
    }

    pub fn from_config(config: &SolverConfig) -> Self {
        Self { max_evaluations: config.max_evaluations, time_limit: config.time_limit() }
    }

    fn exhausted(&self, evaluations: usize, started: Instant) -> bool {
        self.max_evaluations.is_some_and(|max| evaluations >= max)
            || self.time_limit.is_some_and(|limit| started.elapsed() >= limit)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SynthesisResult {
    pub program: Program,
    pub score: u64,
    pub evaluations: usize,
    pub depth_reached: usize,
    /// Tracked best score after each completed depth step.
    pub best_history: Vec<u64>,
}

impl SynthesisResult {
    pub fn is_exact(&self) -> bool {
        self.score == 0
    }
}

#[derive(Debug, Clone)]
struct Candidate {
    program: Program,
    score: u64,
    last_idx: usize,
}

fn rank(a: &Candidate, b: &Candidate) -> Ordering {
    a.score.cmp(&b.score)
        .then(a.program.len().cmp(&b.program.len()))
        .then(a.last_idx.cmp(&b.last_idx))
}

pub fn synthesize(
    pairs: &[TrainingPair],
    library: &TransformationSet,
    max_depth: usize,
    beam_width: usize,
) -> Result<SynthesisResult> {
    synthesize_with_budget(pairs, library, max_depth, beam_width, SearchBudget::unlimited())
}

/// Best program of length <= `max_depth`. A nonzero score in the result
/// means no exact program was found; that is not an error.
pub fn synthesize_with_budget(
    pairs: &[TrainingPair],
    library: &TransformationSet,
    max_depth: usize,
    beam_width: usize,
    budget: SearchBudget,
) -> Result<SynthesisResult> {
    validate_training_set(pairs)?;
    if beam_width == 0 {
        return Err(SolverError::InvalidConfig("beam_width must be at least 1".into()));
    }

    let started = Instant::now();
    let empty = Program::identity();
    let mut best = Candidate { score: score_program(&empty, pairs), program: empty, last_idx: 0 };
    let mut evaluations = 1usize;
    let mut depth_reached = 0usize;
    let mut best_history = Vec::with_capacity(max_depth);
    let mut beam = vec![best.program.clone()];

    for depth in 1..=max_depth {
        if best.score == 0 {
            break;
        }
        if budget.exhausted(evaluations, started) {
            debug!(depth, evaluations, best_score = best.score, "search budget exhausted");
            break;
        }

        let mut pool: Vec<Candidate> = Vec::with_capacity(beam.len() * library.len());
        for parent in &beam {
            for (idx, prim) in library.iter().enumerate() {
                let program = parent.then(prim.clone());
                let score = score_program(&program, pairs);
                evaluations += 1;
                pool.push(Candidate { program, score, last_idx: idx });
            }
        }
        if pool.is_empty() {
            break;
        }

        pool.sort_by(rank);
        if pool[0].score < best.score {
            best = pool[0].clone();
        }
        depth_reached = depth;
        best_history.push(best.score);
        trace!(depth, leader = %pool[0].program, leader_score = pool[0].score, "beam step");
        debug!(depth, best_score = best.score, pool = pool.len(), "depth complete");

        if best.score == 0 {
            debug!(depth, program = %best.program, "exact program found");
            break;
        }
        pool.truncate(beam_width);
        beam = pool.into_iter().map(|c| c.program).collect();
    }

    Ok(SynthesisResult {
        program: best.program,
        score: best.score,
        evaluations,
        depth_reached,
        best_history,
    })
}
