// Single-step rule matching: a cheap exact check run before beam search.
//
// Candidates are tried in a fixed priority order (copy, rotation, mirror,
// inferred color mapping, shape change) and the first one that reproduces
// every training pair is reported.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::error::Result;
use crate::core::types::{grid_dimensions, validate_training_set};
use super::dsl::{ColorMap, Prim, TrainingPair};
use super::program::Program;
use super::score::matches_all;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MirrorAxis {
    /// Columns reversed (`flip_horizontal`).
    Horizontal,
    /// Rows reversed (`flip_vertical`).
    Vertical,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum Rule {
    Copy,
    /// Clockwise degrees: 90, 180 or 270.
    Rotation { angle: u16 },
    Mirror { axis: MirrorAxis },
    ColorMapping { map: ColorMap },
    ShapeChange { prim: Prim },
}

impl Rule {
    pub fn name(&self) -> &'static str {
        match self {
            Rule::Copy => "copy",
            Rule::Rotation { .. } => "rotation",
            Rule::Mirror { .. } => "mirror",
            Rule::ColorMapping { .. } => "color_mapping",
            Rule::ShapeChange { .. } => "shape_change",
        }
    }

    pub fn program(&self) -> Program {
        match self {
            Rule::Copy => Program::identity(),
            Rule::Rotation { angle: 180 } => Program::single(Prim::Rotate180),
            Rule::Rotation { angle: 270 } => Program::single(Prim::Rotate270),
            Rule::Rotation { .. } => Program::single(Prim::Rotate90),
            Rule::Mirror { axis: MirrorAxis::Horizontal } => Program::single(Prim::FlipH),
            Rule::Mirror { axis: MirrorAxis::Vertical } => Program::single(Prim::FlipV),
            Rule::ColorMapping { map } => Program::single(Prim::MapColors(*map)),
            Rule::ShapeChange { prim } => Program::single(prim.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleMatch {
    pub rule: Rule,
    pub confidence: f64,
}

/// Candidate rules in priority order.
fn candidates(pairs: &[TrainingPair]) -> Vec<Rule> {
    let mut rules = vec![
        Rule::Copy,
        Rule::Rotation { angle: 90 },
        Rule::Rotation { angle: 180 },
        Rule::Rotation { angle: 270 },
        Rule::Mirror { axis: MirrorAxis::Horizontal },
        Rule::Mirror { axis: MirrorAxis::Vertical },
    ];
    if let Some(map) = ColorMap::infer(pairs).filter(|m| !m.is_identity()) {
        rules.push(Rule::ColorMapping { map });
    }
    rules.extend(shape_change_candidates(pairs).into_iter().map(|prim| Rule::ShapeChange { prim }));
    rules
}

/// Size-changing primitives suggested by the first pair's dimensions.
fn shape_change_candidates(pairs: &[TrainingPair]) -> Vec<Prim> {
    let Some((input, output)) = pairs.first() else { return Vec::new() };
    let (ih, iw) = grid_dimensions(input);
    let (oh, ow) = grid_dimensions(output);
    if (ih, iw) == (oh, ow) || ih == 0 || iw == 0 {
        return Vec::new();
    }

    let mut prims = Vec::new();
    if oh % ih == 0 && ow % iw == 0 && oh >= ih && ow >= iw {
        let (rf, cf) = (oh / ih, ow / iw);
        if rf == cf {
            prims.push(Prim::Scale(rf));
        }
        prims.push(Prim::Tile(rf, cf));
        if rf == 3 && cf == 3 {
            prims.push(Prim::TileFlip);
        }
    }
    if oh <= ih && ow <= iw {
        prims.push(Prim::CropToContent);
        prims.push(Prim::Compress);
    }
    prims
}

/// First rule that reproduces every pair, or `None`. Reported matches are
/// exact, so confidence is always 1.0.
pub fn match_single_rule(pairs: &[TrainingPair]) -> Result<Option<RuleMatch>> {
    validate_training_set(pairs)?;
    let found = candidates(pairs).into_iter().find(|rule| matches_all(&rule.program(), pairs));
    if let Some(rule) = &found {
        debug!(rule = rule.name(), program = %rule.program(), "single-step rule matched");
    }
    Ok(found.map(|rule| RuleMatch { rule, confidence: 1.0 }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::SolverError;

    #[test]
    fn copy_wins_over_rotation() {
        // Symmetric under a half turn, so rotation would also fit.
        let g = vec![vec![1, 2], vec![2, 1]];
        let m = match_single_rule(&[(g.clone(), g)]).unwrap().unwrap();
        assert_eq!(m.rule, Rule::Copy);
        assert_eq!(m.confidence, 1.0);
    }

    #[test]
    fn rotation_reports_angle() {
        let input = vec![vec![1, 2], vec![3, 4]];
        let output = Prim::Rotate270.apply(&input);
        let m = match_single_rule(&[(input, output)]).unwrap().unwrap();
        assert_eq!(m.rule, Rule::Rotation { angle: 270 });
    }

    #[test]
    fn mirror_detected() {
        let pairs = vec![
            (vec![vec![1, 2, 3]], vec![vec![3, 2, 1]]),
            (vec![vec![4, 0], vec![5, 6]], vec![vec![0, 4], vec![6, 5]]),
        ];
        let m = match_single_rule(&pairs).unwrap().unwrap();
        assert_eq!(m.rule, Rule::Mirror { axis: MirrorAxis::Horizontal });
    }

    #[test]
    fn color_mapping_inferred_across_pairs() {
        let pairs = vec![
            (vec![vec![1, 0], vec![0, 1]], vec![vec![5, 0], vec![0, 5]]),
            (vec![vec![2, 1]], vec![vec![7, 5]]),
        ];
        let m = match_single_rule(&pairs).unwrap().unwrap();
        assert_eq!(m.rule.name(), "color_mapping");
        assert_eq!(m.rule.program().apply(&vec![vec![2, 1, 0]]), vec![vec![7, 5, 0]]);
    }

    #[test]
    fn shape_change_tile() {
        let input = vec![vec![1, 2], vec![3, 4]];
        let output = Prim::Tile(2, 3).apply(&input);
        let m = match_single_rule(&[(input, output)]).unwrap().unwrap();
        assert_eq!(m.rule, Rule::ShapeChange { prim: Prim::Tile(2, 3) });
    }

    #[test]
    fn shape_change_crop() {
        let input = vec![vec![0, 0, 0], vec![0, 7, 7], vec![0, 0, 0]];
        let m = match_single_rule(&[(input, vec![vec![7, 7]])]).unwrap().unwrap();
        assert_eq!(m.rule, Rule::ShapeChange { prim: Prim::CropToContent });
    }

    #[test]
    fn partial_fit_is_not_reported() {
        let pairs = vec![
            (vec![vec![1, 2]], vec![vec![2, 1]]),
            (vec![vec![1, 2]], vec![vec![1, 2]]),
        ];
        assert!(match_single_rule(&pairs).unwrap().is_none());
    }

    #[test]
    fn empty_set_rejected() {
        assert_eq!(match_single_rule(&[]).unwrap_err(), SolverError::EmptyTrainingSet);
    }

    #[test]
    fn rule_serializes_with_tag() {
        let json = serde_json::to_value(Rule::Rotation { angle: 90 }).unwrap();
        assert_eq!(json["rule"], "rotation");
        assert_eq!(json["angle"], 90);
    }
}
