use std::fmt;

use serde::{Deserialize, Serialize};

use super::dsl::{Grid, Prim};

/// Ordered composition of primitives. Applying folds left to right; the
/// empty program is the identity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Program {
    pub steps: Vec<Prim>,
}

impl Program {
    pub fn new(steps: Vec<Prim>) -> Self {
        Self { steps }
    }

    pub fn identity() -> Self {
        Self::default()
    }

    pub fn single(prim: Prim) -> Self {
        Self { steps: vec![prim] }
    }

    pub fn apply(&self, grid: &Grid) -> Grid {
        self.steps.iter().fold(grid.clone(), |acc, step| step.apply(&acc))
    }

    /// A new program with `prim` appended; `self` is untouched.
    pub fn then(&self, prim: Prim) -> Self {
        let mut steps = Vec::with_capacity(self.steps.len() + 1);
        steps.extend(self.steps.iter().cloned());
        steps.push(prim);
        Self { steps }
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn last(&self) -> Option<&Prim> {
        self.steps.last()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.steps.iter().map(|p| p.name()).collect()
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.steps.is_empty() {
            return write!(f, "identity");
        }
        for (i, step) in self.steps.iter().enumerate() {
            if i > 0 {
                write!(f, " -> ")?;
            }
            write!(f, "{}", step)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_program_is_identity() {
        let g = vec![vec![1, 2], vec![3, 4]];
        assert_eq!(Program::identity().apply(&g), g);
        assert_eq!(Program::identity().to_string(), "identity");
    }

    #[test]
    fn steps_fold_left_to_right() {
        let g = vec![vec![1, 2], vec![3, 4]];
        let p = Program::new(vec![Prim::FlipH, Prim::Rotate90]);
        assert_eq!(p.apply(&g), Prim::Rotate90.apply(&Prim::FlipH.apply(&g)));
        assert_eq!(p.to_string(), "flip_horizontal -> rotate_90");
    }

    #[test]
    fn then_leaves_parent_alone() {
        let parent = Program::single(Prim::FlipV);
        let child = parent.then(Prim::Scale(2));
        assert_eq!(parent.len(), 1);
        assert_eq!(child.names(), vec!["flip_vertical", "scale"]);
        assert_eq!(child.last(), Some(&Prim::Scale(2)));
    }

    #[test]
    fn programs_round_trip_through_json() {
        let p = Program::new(vec![Prim::Tile(2, 3), Prim::IncrementColor]);
        let json = serde_json::to_string(&p).unwrap();
        let back: Program = serde_json::from_str(&json).unwrap();
        assert_eq!(back, p);
    }
}
