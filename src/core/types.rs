use std::fmt;

use serde::{Deserialize, Serialize};

use super::error::{Result, SolverError};

/// Row-major grid of color indices.
pub type Grid = Vec<Vec<u8>>;

/// One demonstration of the unknown rule: (input, expected output).
pub type TrainingPair = (Grid, Grid);

pub const MAX_DIM: usize = 30;
pub const NUM_COLORS: usize = 10;
pub const MAX_CELLS: usize = MAX_DIM * MAX_DIM;

pub fn grid_dimensions(grid: &Grid) -> (usize, usize) {
    if grid.is_empty() { (0, 0) } else { (grid.len(), grid[0].len()) }
}

pub fn cell_count(grid: &Grid) -> usize {
    grid.iter().map(|row| row.len()).sum()
}

/// Checks shape bounds, raggedness and color range. Used on every grid that
/// enters the engine from outside.
pub fn validate_grid(grid: &Grid) -> Result<()> {
    let (rows, cols) = grid_dimensions(grid);
    if rows == 0 || cols == 0 {
        return Err(SolverError::InvalidGrid("grid has no cells".into()));
    }
    if rows > MAX_DIM || cols > MAX_DIM {
        return Err(SolverError::InvalidGrid(format!(
            "{}x{} exceeds {}x{}", rows, cols, MAX_DIM, MAX_DIM
        )));
    }
    for (r, row) in grid.iter().enumerate() {
        if row.len() != cols {
            return Err(SolverError::InvalidGrid(format!(
                "row {} has {} cells, expected {}", r, row.len(), cols
            )));
        }
        if let Some(&bad) = row.iter().find(|&&c| c as usize >= NUM_COLORS) {
            return Err(SolverError::InvalidGrid(format!("color {} in row {} out of range", bad, r)));
        }
    }
    Ok(())
}

pub fn is_valid_grid(grid: &Grid) -> bool {
    validate_grid(grid).is_ok()
}

pub fn validate_training_set(pairs: &[TrainingPair]) -> Result<()> {
    if pairs.is_empty() {
        return Err(SolverError::EmptyTrainingSet);
    }
    for (i, (input, output)) in pairs.iter().enumerate() {
        validate_grid(input)
            .map_err(|e| SolverError::InvalidGrid(format!("pair {} input: {}", i, e)))?;
        validate_grid(output)
            .map_err(|e| SolverError::InvalidGrid(format!("pair {} output: {}", i, e)))?;
    }
    Ok(())
}

/// Total color-to-color table. Colors never observed map to themselves.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColorMap(pub [u8; NUM_COLORS]);

impl Default for ColorMap {
    fn default() -> Self {
        Self::identity()
    }
}

impl ColorMap {
    pub fn identity() -> Self {
        let mut table = [0u8; NUM_COLORS];
        for (i, slot) in table.iter_mut().enumerate() {
            *slot = i as u8;
        }
        Self(table)
    }

    pub fn from_pairs(entries: &[(u8, u8)]) -> Self {
        let mut map = Self::identity();
        for &(from, to) in entries {
            map.set(from, to);
        }
        map
    }

    pub fn get(&self, color: u8) -> u8 {
        self.0.get(color as usize).copied().unwrap_or(color)
    }

    pub fn set(&mut self, from: u8, to: u8) {
        if let Some(slot) = self.0.get_mut(from as usize) {
            *slot = to;
        }
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::identity()
    }

    pub fn apply(&self, grid: &Grid) -> Grid {
        grid.iter().map(|row| row.iter().map(|&c| self.get(c)).collect()).collect()
    }

    /// Entries that differ from identity, in color order.
    pub fn changes(&self) -> Vec<(u8, u8)> {
        self.0.iter().enumerate()
            .filter(|&(from, &to)| from as u8 != to)
            .map(|(from, &to)| (from as u8, to))
            .collect()
    }

    /// Learn one mapping that explains every pair cell by cell.
    /// `None` if shapes differ or an input color maps to two different outputs.
    pub fn infer(pairs: &[TrainingPair]) -> Option<ColorMap> {
        let mut table: [Option<u8>; NUM_COLORS] = [None; NUM_COLORS];
        for (input, output) in pairs {
            if grid_dimensions(input) != grid_dimensions(output) {
                return None;
            }
            for (in_row, out_row) in input.iter().zip(output.iter()) {
                if in_row.len() != out_row.len() {
                    return None;
                }
                for (&from, &to) in in_row.iter().zip(out_row.iter()) {
                    let slot = table.get_mut(from as usize)?;
                    match slot {
                        Some(existing) if *existing != to => return None,
                        Some(_) => {}
                        None => *slot = Some(to),
                    }
                }
            }
        }
        let mut map = ColorMap::identity();
        for (from, to) in table.iter().enumerate() {
            if let Some(to) = to {
                map.set(from as u8, *to);
            }
        }
        Some(map)
    }
}

impl fmt::Debug for ColorMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ColorMap{:?}", self.changes())
    }
}

impl fmt::Display for ColorMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let changes = self.changes();
        if changes.is_empty() {
            return write!(f, "{{}}");
        }
        write!(f, "{{")?;
        for (i, (from, to)) in changes.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}->{}", from, to)?;
        }
        write!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_grid_accepted() {
        assert!(validate_grid(&vec![vec![0, 9], vec![3, 4]]).is_ok());
    }

    #[test]
    fn empty_and_ragged_rejected() {
        assert!(matches!(validate_grid(&vec![]), Err(SolverError::InvalidGrid(_))));
        assert!(matches!(validate_grid(&vec![vec![]]), Err(SolverError::InvalidGrid(_))));
        assert!(matches!(validate_grid(&vec![vec![1, 2], vec![3]]), Err(SolverError::InvalidGrid(_))));
    }

    #[test]
    fn out_of_range_color_rejected() {
        assert!(!is_valid_grid(&vec![vec![10]]));
    }

    #[test]
    fn oversized_grid_rejected() {
        assert!(!is_valid_grid(&vec![vec![0; 31]]));
        assert!(is_valid_grid(&vec![vec![0; 30]; 30]));
    }

    #[test]
    fn empty_training_set_rejected() {
        assert_eq!(validate_training_set(&[]), Err(SolverError::EmptyTrainingSet));
    }

    #[test]
    fn infer_consistent_map() {
        let pairs = vec![
            (vec![vec![1, 2], vec![0, 1]], vec![vec![3, 4], vec![0, 3]]),
            (vec![vec![2, 2]], vec![vec![4, 4]]),
        ];
        let map = ColorMap::infer(&pairs).unwrap();
        assert_eq!(map.changes(), vec![(1, 3), (2, 4)]);
        assert_eq!(map.apply(&pairs[0].0), pairs[0].1);
    }

    #[test]
    fn infer_conflicting_map() {
        let pairs = vec![(vec![vec![1, 1]], vec![vec![2, 3]])];
        assert!(ColorMap::infer(&pairs).is_none());
    }

    #[test]
    fn infer_rejects_shape_change() {
        let pairs = vec![(vec![vec![1, 1]], vec![vec![1], vec![1]])];
        assert!(ColorMap::infer(&pairs).is_none());
    }

    #[test]
    fn display_lists_changes() {
        let map = ColorMap::from_pairs(&[(1, 2), (5, 0)]);
        assert_eq!(map.to_string(), "{1->2, 5->0}");
        assert_eq!(ColorMap::identity().to_string(), "{}");
    }
}
