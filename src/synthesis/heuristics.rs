// Heuristic diagnostics for grid puzzles.
//
// Compare one input/output pair and report soft pattern signals: growth,
// repetition, per-color movement, value progression, color transform,
// symmetry gained, exact rotation and area change. Each check is independent;
// a pair may yield any number of signals.
//
// The signals are used two ways:
// - to move the primitives they suggest to the front of a library
// - to build a best-effort answer when search finds no exact program
//   (only signals every training pair agrees on are used)

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::error::Result;
use crate::core::types::{grid_dimensions, is_valid_grid, validate_grid, validate_training_set};
use super::dsl::{is_symmetric_h, is_symmetric_v, unique_colors, ColorMap, Grid, Prim,
    TrainingPair, TransformationSet};
use super::program::Program;
use super::score::score_program;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorShift {
    pub color: u8,
    pub dr: f64,
    pub dc: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Pattern {
    GridGrowth { row_factor: f64, col_factor: f64 },
    PatternRepeat { color: u8, spacing: usize },
    ObjectMovement { shifts: Vec<ColorShift> },
    ValueProgression { diff: u8 },
    /// Non-zero input colors only.
    ColorTransform { mapping: Vec<(u8, u8)> },
    Symmetry { horizontal: bool, vertical: bool },
    /// Clockwise degrees.
    Rotation { angle: u16 },
    ShapeChange { area_ratio: f64 },
}

impl Pattern {
    pub fn tag(&self) -> &'static str {
        match self {
            Pattern::GridGrowth { .. } => "grid_growth",
            Pattern::PatternRepeat { .. } => "pattern_repeat",
            Pattern::ObjectMovement { .. } => "object_movement",
            Pattern::ValueProgression { .. } => "value_progression",
            Pattern::ColorTransform { .. } => "color_transform",
            Pattern::Symmetry { .. } => "symmetry",
            Pattern::Rotation { .. } => "rotation",
            Pattern::ShapeChange { .. } => "shape_change",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternInfo {
    pub pattern: Pattern,
    pub confidence: f64,
}

impl PatternInfo {
    fn new(pattern: Pattern, confidence: f64) -> Self {
        Self { pattern, confidence }
    }
}

/// All signals found between `input` and `output`. Rotation is checked first
/// since it is exact. Malformed grids are rejected with `InvalidGrid`.
pub fn diagnose(input: &Grid, output: &Grid) -> Result<Vec<PatternInfo>> {
    validate_grid(input)?;
    validate_grid(output)?;
    let checks: [fn(&Grid, &Grid) -> Option<PatternInfo>; 8] = [
        check_rotation,
        check_grid_growth,
        check_color_transform,
        check_symmetry,
        check_object_movement,
        check_pattern_repeat,
        check_value_progression,
        check_shape_change,
    ];
    Ok(checks.iter().filter_map(|check| check(input, output)).collect())
}

fn check_rotation(input: &Grid, output: &Grid) -> Option<PatternInfo> {
    [(Prim::Rotate90, 90u16), (Prim::Rotate180, 180), (Prim::Rotate270, 270)]
        .into_iter()
        .find(|(prim, _)| prim.apply(input) == *output)
        .map(|(_, angle)| PatternInfo::new(Pattern::Rotation { angle }, 1.0))
}

fn check_grid_growth(input: &Grid, output: &Grid) -> Option<PatternInfo> {
    let (ih, iw) = grid_dimensions(input);
    let (oh, ow) = grid_dimensions(output);
    if (ih, iw) == (oh, ow) || ih == 0 || iw == 0 { return None; }
    let row_factor = oh as f64 / ih as f64;
    let col_factor = ow as f64 / iw as f64;
    if (row_factor - col_factor).abs() < 0.1 {
        Some(PatternInfo::new(Pattern::GridGrowth { row_factor, col_factor }, 0.9))
    } else {
        None
    }
}

fn check_color_transform(input: &Grid, output: &Grid) -> Option<PatternInfo> {
    if grid_dimensions(input) != grid_dimensions(output) { return None; }
    let mut table: [Option<u8>; 256] = [None; 256];
    for (in_row, out_row) in input.iter().zip(output.iter()) {
        for (&from, &to) in in_row.iter().zip(out_row.iter()) {
            if from == 0 { continue; }
            match table[from as usize] {
                Some(existing) if existing != to => return None,
                Some(_) => {}
                None => table[from as usize] = Some(to),
            }
        }
    }
    let mapping: Vec<(u8, u8)> = table.iter().enumerate()
        .filter_map(|(from, to)| to.map(|to| (from as u8, to)))
        .collect();
    if mapping.is_empty() { return None; }
    Some(PatternInfo::new(Pattern::ColorTransform { mapping }, 0.9))
}

fn check_symmetry(input: &Grid, output: &Grid) -> Option<PatternInfo> {
    let h_in = is_symmetric_h(input);
    let h_out = is_symmetric_h(output);
    let v_in = is_symmetric_v(input);
    let v_out = is_symmetric_v(output);
    if (!h_in && h_out) || (!v_in && v_out) {
        Some(PatternInfo::new(Pattern::Symmetry { horizontal: h_out, vertical: v_out }, 0.8))
    } else {
        None
    }
}

fn centroid(grid: &Grid, color: u8) -> Option<(f64, f64)> {
    let mut n = 0usize;
    let (mut sr, mut sc) = (0usize, 0usize);
    for (r, row) in grid.iter().enumerate() {
        for (c, &v) in row.iter().enumerate() {
            if v == color {
                n += 1;
                sr += r;
                sc += c;
            }
        }
    }
    if n == 0 { None } else { Some((sr as f64 / n as f64, sc as f64 / n as f64)) }
}

fn check_object_movement(input: &Grid, output: &Grid) -> Option<PatternInfo> {
    let shifts: Vec<ColorShift> = unique_colors(input).into_iter()
        .filter(|&color| color != 0)
        .filter_map(|color| {
            let (ir, ic) = centroid(input, color)?;
            let (or, oc) = centroid(output, color)?;
            Some(ColorShift { color, dr: or - ir, dc: oc - ic })
        })
        .collect();
    if shifts.is_empty() { return None; }
    Some(PatternInfo::new(Pattern::ObjectMovement { shifts }, 0.7))
}

fn row_positions(grid: &Grid, color: u8) -> Vec<usize> {
    grid.iter().enumerate()
        .flat_map(|(r, row)| row.iter().filter(move |&&v| v == color).map(move |_| r))
        .collect()
}

fn spacings(positions: &[usize]) -> Vec<usize> {
    positions.windows(2).map(|w| w[1] - w[0]).collect()
}

fn all_equal(values: &[usize]) -> bool {
    values.windows(2).all(|w| w[0] == w[1])
}

fn check_pattern_repeat(input: &Grid, output: &Grid) -> Option<PatternInfo> {
    for color in unique_colors(input).into_iter().filter(|&c| c != 0) {
        let in_pos = row_positions(input, color);
        let out_pos = row_positions(output, color);
        if in_pos.is_empty() || out_pos.len() < 2 { continue; }
        let in_spacing = spacings(&in_pos);
        let out_spacing = spacings(&out_pos);
        if all_equal(&out_spacing) && !all_equal(&in_spacing) {
            return Some(PatternInfo::new(
                Pattern::PatternRepeat { color, spacing: out_spacing[0] }, 0.8));
        }
    }
    None
}

fn check_value_progression(input: &Grid, output: &Grid) -> Option<PatternInfo> {
    let in_vals: Vec<u8> = unique_colors(input).into_iter().filter(|&c| c != 0).collect();
    let out_vals: Vec<u8> = unique_colors(output).into_iter().filter(|&c| c != 0).collect();
    if in_vals.len() < 2 || out_vals.len() < 2 { return None; }
    let diffs: Vec<usize> = out_vals.windows(2).map(|w| (w[1] - w[0]) as usize).collect();
    if all_equal(&diffs) {
        Some(PatternInfo::new(Pattern::ValueProgression { diff: diffs[0] as u8 }, 0.6))
    } else {
        None
    }
}

fn area(grid: &Grid, color: u8) -> usize {
    grid.iter().flat_map(|row| row.iter()).filter(|&&v| v == color).count()
}

fn check_shape_change(input: &Grid, output: &Grid) -> Option<PatternInfo> {
    // (output area, input area) per color present in both
    let areas: Vec<(usize, usize)> = unique_colors(input).into_iter()
        .filter(|&c| c != 0)
        .map(|c| (area(output, c), area(input, c)))
        .filter(|&(out_a, _)| out_a > 0)
        .collect();
    let &(first_out, first_in) = areas.first()?;
    let consistent = areas.iter().all(|&(o, i)| o * first_in == first_out * i);
    if consistent {
        let area_ratio = first_out as f64 / first_in as f64;
        Some(PatternInfo::new(Pattern::ShapeChange { area_ratio }, 0.7))
    } else {
        None
    }
}

/// Primitives a signal points at, most specific first.
fn suggested_prims(pattern: &Pattern) -> Vec<Prim> {
    match pattern {
        Pattern::Rotation { angle: 90 } => vec![Prim::Rotate90],
        Pattern::Rotation { angle: 180 } => vec![Prim::Rotate180],
        Pattern::Rotation { .. } => vec![Prim::Rotate270],
        Pattern::GridGrowth { row_factor, .. } if *row_factor > 1.0 => {
            let n = row_factor.round() as usize;
            let mut prims = vec![Prim::Scale(n), Prim::Tile(n, n)];
            if n == 3 { prims.push(Prim::TileFlip); }
            prims
        }
        Pattern::GridGrowth { .. } => vec![Prim::CropToContent, Prim::Compress],
        Pattern::ColorTransform { mapping } => {
            vec![Prim::MapColors(ColorMap::from_pairs(mapping)), Prim::InvertColor]
        }
        Pattern::Symmetry { horizontal, vertical } => {
            let mut prims = vec![Prim::Symmetrize];
            if *horizontal { prims.push(Prim::FlipH); }
            if *vertical { prims.push(Prim::FlipV); }
            prims
        }
        Pattern::ObjectMovement { shifts } => {
            if shifts.iter().all(|s| s.dr.abs() < 1e-9 && s.dc > 0.0) {
                vec![Prim::ShiftRight]
            } else {
                vec![Prim::FlipH, Prim::FlipV, Prim::Transpose]
            }
        }
        Pattern::PatternRepeat { .. } => vec![Prim::PatternComplete, Prim::Tile(1, 2), Prim::Tile(2, 1)],
        Pattern::ValueProgression { .. } => vec![Prim::IncrementColor, Prim::DecrementColor],
        Pattern::ShapeChange { area_ratio } if *area_ratio < 1.0 => vec![Prim::ExtractBorder],
        Pattern::ShapeChange { .. } => vec![Prim::FillHoles, Prim::Symmetrize],
    }
}

/// Reorder `library` so primitives suggested by `patterns` come first, in
/// descending confidence. Everything else keeps its relative order.
pub fn prioritize(library: &TransformationSet, patterns: &[PatternInfo]) -> TransformationSet {
    let mut ranked: Vec<&PatternInfo> = patterns.iter().collect();
    ranked.sort_by(|a, b| b.confidence.partial_cmp(&a.confidence).unwrap_or(std::cmp::Ordering::Equal));

    let mut front: Vec<Prim> = Vec::new();
    for info in ranked {
        for prim in suggested_prims(&info.pattern) {
            if library.position(&prim).is_some() && !front.contains(&prim) {
                front.push(prim);
            }
        }
    }
    let rest: Vec<Prim> = library.iter().filter(|p| !front.contains(p)).cloned().collect();
    front.extend(rest);
    TransformationSet::new(front)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeuristicSolution {
    pub program: Program,
    pub score: u64,
    pub output: Grid,
}

/// Signals every pair reports, turned into candidate programs.
fn consensus_programs(per_pair: &[Vec<PatternInfo>]) -> Vec<Program> {
    let mut programs = Vec::new();

    let angles: Vec<Option<u16>> = per_pair.iter().map(|infos| infos.iter().find_map(|i| match i.pattern {
        Pattern::Rotation { angle } => Some(angle),
        _ => None,
    })).collect();
    if let Some(Some(first)) = angles.first() {
        if angles.iter().all(|a| *a == Some(*first)) {
            programs.push(Program::new(suggested_prims(&Pattern::Rotation { angle: *first })));
        }
    }

    let mappings: Vec<Option<&Vec<(u8, u8)>>> = per_pair.iter().map(|infos| infos.iter().find_map(|i| match &i.pattern {
        Pattern::ColorTransform { mapping } => Some(mapping),
        _ => None,
    })).collect();
    if mappings.iter().all(|m| m.is_some()) {
        let mut merged: Vec<(u8, u8)> = Vec::new();
        let mut consistent = true;
        for &(from, to) in mappings.iter().flatten().flat_map(|m| m.iter()) {
            match merged.iter().find(|(f, _)| *f == from) {
                Some(&(_, existing)) if existing != to => { consistent = false; break; }
                Some(_) => {}
                None => merged.push((from, to)),
            }
        }
        if consistent && !merged.is_empty() {
            programs.push(Program::single(Prim::MapColors(ColorMap::from_pairs(&merged))));
        }
    }

    let growth: Vec<Option<(f64, f64)>> = per_pair.iter().map(|infos| infos.iter().find_map(|i| match i.pattern {
        Pattern::GridGrowth { row_factor, col_factor } => Some((row_factor, col_factor)),
        _ => None,
    })).collect();
    if let Some(Some((rf, cf))) = growth.first() {
        let integral = rf.fract() == 0.0 && cf.fract() == 0.0 && *rf >= 2.0 && rf == cf;
        if integral && growth.iter().all(|g| *g == Some((*rf, *cf))) {
            let n = *rf as usize;
            programs.push(Program::single(Prim::Scale(n)));
            programs.push(Program::single(Prim::Tile(n, n)));
        }
    }

    let symmetric = per_pair.iter().all(|infos| infos.iter().any(|i| matches!(i.pattern, Pattern::Symmetry { .. })));
    if symmetric && !per_pair.is_empty() {
        programs.push(Program::single(Prim::Symmetrize));
    }

    programs
}

/// Best-effort answer for `test_input` built from signals all training pairs
/// agree on. `None` when no such signal exists or the result is not a valid
/// grid; the caller then falls back to the unchanged input. Malformed pairs
/// or test input also give `None`.
pub fn heuristic_solution(pairs: &[TrainingPair], test_input: &Grid) -> Option<HeuristicSolution> {
    validate_training_set(pairs).ok()?;
    validate_grid(test_input).ok()?;
    let per_pair: Vec<Vec<PatternInfo>> = pairs.iter()
        .map(|(i, o)| diagnose(i, o))
        .collect::<Result<_>>()
        .ok()?;

    let mut best: Option<(Program, u64)> = None;
    for program in consensus_programs(&per_pair) {
        let score = score_program(&program, pairs);
        if best.as_ref().map_or(true, |(_, s)| score < *s) {
            best = Some((program, score));
        }
    }

    let (program, score) = best?;
    let output = program.apply(test_input);
    if !is_valid_grid(&output) {
        debug!(program = %program, "heuristic candidate produced an invalid grid");
        return None;
    }
    debug!(program = %program, score, "heuristic fallback candidate");
    Some(HeuristicSolution { program, score, output })
}
