// Mismatch scoring against a training set.
//
// Convention for candidates that cannot be compared cell by cell:
// - output outside the valid grid space (ragged, empty, > 30x30, color > 9)
//   costs INVALID_PENALTY, one more than any valid answer can cost
// - output of the wrong shape costs max(input cells, expected cells)
// A wrong shape is at least as bad as any same-shape answer for that pair.

use crate::core::types::{cell_count, grid_dimensions, is_valid_grid, MAX_CELLS};
use super::dsl::{Grid, TrainingPair};
use super::program::Program;

pub const INVALID_PENALTY: u64 = MAX_CELLS as u64 + 1;

pub fn pair_mismatch(candidate: &Grid, input: &Grid, expected: &Grid) -> u64 {
    if !is_valid_grid(candidate) {
        return INVALID_PENALTY;
    }
    if grid_dimensions(candidate) != grid_dimensions(expected) {
        return cell_count(input).max(cell_count(expected)) as u64;
    }
    candidate.iter().zip(expected.iter())
        .flat_map(|(cr, er)| cr.iter().zip(er.iter()))
        .filter(|(c, e)| c != e)
        .count() as u64
}

pub fn score_program(program: &Program, pairs: &[TrainingPair]) -> u64 {
    pairs.iter()
        .map(|(input, expected)| pair_mismatch(&program.apply(input), input, expected))
        .sum()
}

pub fn matches_all(program: &Program, pairs: &[TrainingPair]) -> bool {
    pairs.iter().all(|(input, expected)| program.apply(input) == *expected)
}
