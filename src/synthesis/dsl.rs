use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::config::SolverConfig;
use crate::core::error::{Result, SolverError};
use crate::core::types::validate_grid;
pub use crate::core::types::{ColorMap, Grid, TrainingPair, MAX_DIM};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Prim {
    Rotate90,
    Rotate180,
    Rotate270,
    FlipH,
    FlipV,
    Transpose,
    IncrementColor,
    DecrementColor,
    InvertColor,
    MapColors(ColorMap),
    Tile(usize, usize),
    Scale(usize),
    CropToContent,
    Compress,
    FillHoles,
    ExtractBorder,
    Symmetrize,
    ShiftRight,
    PatternComplete,
    TileFlip,
}

/// Parameters for building a primitive by name. Unused fields are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PrimParams {
    pub rows: Option<usize>,
    pub cols: Option<usize>,
    pub factor: Option<usize>,
    pub color_map: Option<ColorMap>,
}

impl PrimParams {
    pub fn tile(rows: usize, cols: usize) -> Self {
        Self { rows: Some(rows), cols: Some(cols), ..Self::default() }
    }

    pub fn factor(factor: usize) -> Self {
        Self { factor: Some(factor), ..Self::default() }
    }

    pub fn color_map(map: ColorMap) -> Self {
        Self { color_map: Some(map), ..Self::default() }
    }
}

pub const PRIM_NAMES: &[&str] = &[
    "rotate_90", "rotate_180", "rotate_270", "flip_horizontal", "flip_vertical", "transpose",
    "increment_color", "decrement_color", "invert_color", "map_colors",
    "tile", "scale", "crop_to_content", "compress", "fill_holes", "extract_border",
    "symmetrize", "shift_right", "pattern_complete", "tile_flip",
];

impl Prim {
    pub fn apply(&self, grid: &Grid) -> Grid {
        match self {
            Prim::Rotate90 => rotate_cw(grid),
            Prim::Rotate180 => rotate_180(grid),
            Prim::Rotate270 => rotate_ccw(grid),
            Prim::FlipH => flip_h(grid),
            Prim::FlipV => flip_v(grid),
            Prim::Transpose => transpose(grid),
            Prim::IncrementColor => map_cells(grid, |c| (c + 1) % 10),
            Prim::DecrementColor => map_cells(grid, |c| (c + 9) % 10),
            Prim::InvertColor => map_cells(grid, |c| if c == 0 || c > 9 { c } else { 9 - c }),
            Prim::MapColors(map) => map.apply(grid),
            Prim::Tile(r, c) => tile(grid, *r, *c),
            Prim::Scale(s) => scale(grid, *s),
            Prim::CropToContent => crop_to_content(grid),
            Prim::Compress => compress(grid),
            Prim::FillHoles => fill_holes(grid),
            Prim::ExtractBorder => extract_border(grid),
            Prim::Symmetrize => symmetrize(grid),
            Prim::ShiftRight => shift_right(grid),
            Prim::PatternComplete => pattern_complete(grid),
            Prim::TileFlip => tile_flip(grid),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Prim::Rotate90 => "rotate_90",
            Prim::Rotate180 => "rotate_180",
            Prim::Rotate270 => "rotate_270",
            Prim::FlipH => "flip_horizontal",
            Prim::FlipV => "flip_vertical",
            Prim::Transpose => "transpose",
            Prim::IncrementColor => "increment_color",
            Prim::DecrementColor => "decrement_color",
            Prim::InvertColor => "invert_color",
            Prim::MapColors(_) => "map_colors",
            Prim::Tile(..) => "tile",
            Prim::Scale(_) => "scale",
            Prim::CropToContent => "crop_to_content",
            Prim::Compress => "compress",
            Prim::FillHoles => "fill_holes",
            Prim::ExtractBorder => "extract_border",
            Prim::Symmetrize => "symmetrize",
            Prim::ShiftRight => "shift_right",
            Prim::PatternComplete => "pattern_complete",
            Prim::TileFlip => "tile_flip",
        }
    }

    /// Look up a primitive by name, binding its parameters.
    /// Missing tile/scale parameters default to 2; counts are clamped to 1..=30.
    pub fn build(name: &str, params: &PrimParams) -> Result<Prim> {
        let count = |v: Option<usize>| v.unwrap_or(2).clamp(1, MAX_DIM);
        let prim = match name {
            "rotate_90" => Prim::Rotate90,
            "rotate_180" => Prim::Rotate180,
            "rotate_270" => Prim::Rotate270,
            "flip_horizontal" => Prim::FlipH,
            "flip_vertical" => Prim::FlipV,
            "transpose" => Prim::Transpose,
            "increment_color" => Prim::IncrementColor,
            "decrement_color" => Prim::DecrementColor,
            "invert_color" => Prim::InvertColor,
            "map_colors" => Prim::MapColors(params.color_map.unwrap_or_default()),
            "tile" => Prim::Tile(count(params.rows), count(params.cols)),
            "scale" => Prim::Scale(count(params.factor)),
            "crop_to_content" => Prim::CropToContent,
            "compress" => Prim::Compress,
            "fill_holes" => Prim::FillHoles,
            "extract_border" => Prim::ExtractBorder,
            "symmetrize" => Prim::Symmetrize,
            "shift_right" => Prim::ShiftRight,
            "pattern_complete" => Prim::PatternComplete,
            "tile_flip" => Prim::TileFlip,
            other => return Err(SolverError::UnknownTransformation(other.to_string())),
        };
        Ok(prim)
    }

    pub fn from_name(name: &str) -> Result<Prim> {
        Prim::build(name, &PrimParams::default())
    }

}

impl fmt::Display for Prim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Prim::MapColors(map) => write!(f, "map_colors{}", map),
            Prim::Tile(r, c) => write!(f, "tile({}x{})", r, c),
            Prim::Scale(s) => write!(f, "scale({})", s),
            other => write!(f, "{}", other.name()),
        }
    }
}

/// Name-based entry point: build the primitive and run it once.
pub fn apply_named(name: &str, grid: &Grid, params: &PrimParams) -> Result<Grid> {
    validate_grid(grid)?;
    Ok(Prim::build(name, params)?.apply(grid))
}

/// Ordered primitive catalogue for one search. The order is the
/// synthesizer's tie-break order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransformationSet {
    prims: Vec<Prim>,
}

impl TransformationSet {
    pub fn new(prims: Vec<Prim>) -> Self {
        let mut set = Self::default();
        for p in prims {
            set.push(p);
        }
        set
    }

    pub fn standard() -> Self {
        Self::new(vec![
            Prim::Rotate90, Prim::Rotate180, Prim::Rotate270,
            Prim::FlipH, Prim::FlipV, Prim::Transpose,
            Prim::IncrementColor, Prim::DecrementColor, Prim::InvertColor,
            Prim::Tile(1, 2), Prim::Tile(2, 1), Prim::Tile(2, 2), Prim::Tile(3, 3),
            Prim::Scale(2), Prim::Scale(3),
            Prim::CropToContent, Prim::Compress, Prim::FillHoles, Prim::ExtractBorder,
            Prim::Symmetrize, Prim::ShiftRight, Prim::PatternComplete, Prim::TileFlip,
        ])
    }

    pub fn geometric() -> Self {
        Self::new(vec![Prim::Rotate90, Prim::Rotate180, Prim::Rotate270, Prim::FlipH, Prim::FlipV])
    }

    pub fn from_names(names: &[&str]) -> Result<Self> {
        let prims = names.iter().map(|n| Prim::from_name(n)).collect::<Result<Vec<_>>>()?;
        Ok(Self::new(prims))
    }

    /// Standard catalogue plus whatever the task's own pairs pin down.
    pub fn for_task(pairs: &[TrainingPair], config: &SolverConfig) -> Self {
        let mut set = Self::standard();
        if config.inferred_color_maps {
            if let Some(map) = ColorMap::infer(pairs).filter(|m| !m.is_identity()) {
                set.push(Prim::MapColors(map));
            }
        }
        set
    }

    /// Appends unless already present.
    pub fn push(&mut self, prim: Prim) {
        if !self.prims.contains(&prim) {
            self.prims.push(prim);
        }
    }

    pub fn len(&self) -> usize { self.prims.len() }
    pub fn is_empty(&self) -> bool { self.prims.is_empty() }
    pub fn iter(&self) -> impl Iterator<Item = &Prim> { self.prims.iter() }
    pub fn get(&self, idx: usize) -> Option<&Prim> { self.prims.get(idx) }

    pub fn position(&self, prim: &Prim) -> Option<usize> {
        self.prims.iter().position(|p| p == prim)
    }
}

// --- Grid analysis helpers ---

pub fn unique_colors(grid: &Grid) -> Vec<u8> {
    let mut seen = [false; 256];
    let mut result = Vec::new();
    for row in grid {
        for &c in row {
            if !seen[c as usize] {
                seen[c as usize] = true;
                result.push(c);
            }
        }
    }
    result.sort_unstable();
    result
}

pub fn is_symmetric_h(grid: &Grid) -> bool {
    grid.iter().all(|row| {
        let n = row.len();
        (0..n / 2).all(|i| row[i] == row[n - 1 - i])
    })
}

pub fn is_symmetric_v(grid: &Grid) -> bool {
    let n = grid.len();
    (0..n / 2).all(|i| grid[i] == grid[n - 1 - i])
}

/// Smallest column period P (P <= width / 2) such that every full P-wide
/// slice after the first equals the first. A trailing partial slice is not
/// checked.
pub fn horizontal_period(grid: &Grid) -> Option<usize> {
    if grid.is_empty() { return None; }
    let cols = grid[0].len();
    (1..=cols / 2).find(|&period| {
        grid.iter().all(|row| {
            (period..cols)
                .step_by(period)
                .take_while(|&start| start + period <= cols)
                .all(|start| row[start..start + period] == row[..period])
        })
    })
}

// --- Primitive implementations ---

fn map_cells(g: &Grid, f: impl Fn(u8) -> u8) -> Grid {
    g.iter().map(|row| row.iter().map(|&c| f(c)).collect()).collect()
}

fn rotate_cw(g: &Grid) -> Grid {
    if g.is_empty() { return g.clone(); }
    let rows = g.len();
    let cols = g[0].len();
    (0..cols).map(|c| (0..rows).rev().map(|r| g[r][c]).collect()).collect()
}

fn rotate_ccw(g: &Grid) -> Grid {
    if g.is_empty() { return g.clone(); }
    let rows = g.len();
    let cols = g[0].len();
    (0..cols).rev().map(|c| (0..rows).map(|r| g[r][c]).collect()).collect()
}

fn rotate_180(g: &Grid) -> Grid {
    g.iter().rev().map(|row| row.iter().rev().cloned().collect()).collect()
}

fn flip_h(g: &Grid) -> Grid {
    g.iter().map(|row| row.iter().rev().cloned().collect()).collect()
}

fn flip_v(g: &Grid) -> Grid {
    g.iter().rev().cloned().collect()
}

fn transpose(g: &Grid) -> Grid {
    if g.is_empty() { return g.clone(); }
    let cols = g[0].len();
    (0..cols).map(|c| g.iter().map(|row| row[c]).collect()).collect()
}

fn tile(g: &Grid, rows: usize, cols: usize) -> Grid {
    let mut result = Vec::with_capacity(g.len() * rows);
    for _ in 0..rows {
        for row in g {
            let mut new_row = Vec::with_capacity(row.len() * cols);
            for _ in 0..cols { new_row.extend(row.iter()); }
            result.push(new_row);
        }
    }
    result
}

fn scale(g: &Grid, s: usize) -> Grid {
    let mut result = Vec::new();
    for row in g {
        let scaled_row: Vec<u8> = row.iter().flat_map(|&c| std::iter::repeat(c).take(s)).collect();
        for _ in 0..s {
            result.push(scaled_row.clone());
        }
    }
    result
}

fn crop(g: &Grid, r: usize, c: usize, h: usize, w: usize) -> Grid {
    g.iter().skip(r).take(h).map(|row| row.iter().skip(c).take(w).cloned().collect()).collect()
}

fn crop_to_content(g: &Grid) -> Grid {
    if g.is_empty() { return vec![vec![0]]; }
    let rows = g.len();
    let cols = g[0].len();
    let mut min_r = rows;
    let mut max_r = 0;
    let mut min_c = cols;
    let mut max_c = 0;
    for r in 0..rows {
        for c in 0..g[r].len() {
            if g[r][c] != 0 {
                min_r = min_r.min(r);
                max_r = max_r.max(r);
                min_c = min_c.min(c);
                max_c = max_c.max(c);
            }
        }
    }
    if min_r > max_r { return vec![vec![0]]; }
    crop(g, min_r, min_c, max_r - min_r + 1, max_c - min_c + 1)
}

fn compress(g: &Grid) -> Grid {
    if g.is_empty() { return vec![vec![0]]; }
    let cols = g[0].len();
    let keep_cols: Vec<usize> = (0..cols)
        .filter(|&c| g.iter().any(|row| row.get(c).is_some_and(|&v| v != 0)))
        .collect();
    let result: Grid = g.iter()
        .filter(|row| row.iter().any(|&v| v != 0))
        .map(|row| keep_cols.iter().map(|&c| row[c]).collect())
        .collect();
    if result.is_empty() { vec![vec![0]] } else { result }
}

fn fill_holes(g: &Grid) -> Grid {
    if g.len() < 3 || g[0].len() < 3 { return g.clone(); }
    let rows = g.len();
    let cols = g[0].len();
    let mut result = g.clone();
    for r in 1..rows - 1 {
        for c in 1..cols - 1 {
            if g[r][c] != 0 { continue; }
            let neighbors = [g[r - 1][c], g[r + 1][c], g[r][c - 1], g[r][c + 1]];
            let mut counts = [0u8; 256];
            for &n in neighbors.iter().filter(|&&n| n != 0) {
                counts[n as usize] += 1;
            }
            if let Some(color) = (1..256).find(|&color| counts[color] >= 3) {
                result[r][c] = color as u8;
            }
        }
    }
    result
}

fn extract_border(g: &Grid) -> Grid {
    if g.is_empty() { return g.clone(); }
    let rows = g.len();
    let cols = g[0].len();
    let mut result = vec![vec![0u8; cols]; rows];
    for r in 0..rows {
        for c in 0..cols {
            if g[r][c] == 0 { continue; }
            let on_border = [(0i32, 1i32), (0, -1), (1, 0), (-1, 0)].iter().any(|&(dr, dc)| {
                let nr = r as i32 + dr;
                let nc = c as i32 + dc;
                nr < 0 || nr >= rows as i32 || nc < 0 || nc >= cols as i32
                    || g[nr as usize][nc as usize] == 0
            });
            if on_border { result[r][c] = g[r][c]; }
        }
    }
    result
}

fn symmetrize(g: &Grid) -> Grid {
    g.iter().map(|row| {
        let n = row.len();
        let mut new_row = row.clone();
        for i in 0..n / 2 {
            let m = row[i].max(row[n - 1 - i]);
            new_row[i] = m;
            new_row[n - 1 - i] = m;
        }
        new_row
    }).collect()
}

fn shift_right(g: &Grid) -> Grid {
    g.iter().map(|row| {
        let n = row.len();
        (0..n).map(|c| row[(c + n - 1) % n]).collect()
    }).collect()
}

fn pattern_complete(g: &Grid) -> Grid {
    match horizontal_period(g) {
        Some(period) => g.iter().map(|row| (0..row.len()).map(|c| row[c % period]).collect()).collect(),
        None => g.clone(),
    }
}

fn tile_flip(g: &Grid) -> Grid {
    let plain = tile(g, 1, 3);
    let flipped = tile(&rotate_180(g), 1, 3);
    let mut result = plain.clone();
    result.extend(flipped);
    result.extend(plain);
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Grid {
        vec![vec![1, 2, 3], vec![4, 5, 6]]
    }

    #[test]
    fn rotate_90_is_clockwise() {
        let g = vec![vec![1, 2], vec![3, 4]];
        assert_eq!(Prim::Rotate90.apply(&g), vec![vec![3, 1], vec![4, 2]]);
        assert_eq!(Prim::Rotate270.apply(&g), vec![vec![2, 4], vec![1, 3]]);
        assert_eq!(Prim::Rotate180.apply(&g), vec![vec![4, 3], vec![2, 1]]);
    }

    #[test]
    fn four_quarter_turns_restore() {
        let g = sample();
        let mut out = g.clone();
        for _ in 0..4 { out = Prim::Rotate90.apply(&out); }
        assert_eq!(out, g);
    }

    #[test]
    fn flips_mirror_expected_axis() {
        let g = sample();
        assert_eq!(Prim::FlipH.apply(&g), vec![vec![3, 2, 1], vec![6, 5, 4]]);
        assert_eq!(Prim::FlipV.apply(&g), vec![vec![4, 5, 6], vec![1, 2, 3]]);
    }

    #[test]
    fn color_arithmetic_wraps() {
        let g = vec![vec![0, 9, 4]];
        assert_eq!(Prim::IncrementColor.apply(&g), vec![vec![1, 0, 5]]);
        assert_eq!(Prim::DecrementColor.apply(&g), vec![vec![9, 8, 3]]);
        assert_eq!(Prim::InvertColor.apply(&g), vec![vec![0, 0, 5]]);
    }

    #[test]
    fn map_colors_uses_table() {
        let prim = Prim::MapColors(ColorMap::from_pairs(&[(1, 7), (2, 0)]));
        assert_eq!(prim.apply(&vec![vec![1, 2, 3]]), vec![vec![7, 0, 3]]);
    }

    #[test]
    fn tile_repeats_blocks() {
        let g = vec![vec![1, 2]];
        assert_eq!(Prim::Tile(2, 2).apply(&g), vec![vec![1, 2, 1, 2], vec![1, 2, 1, 2]]);
    }

    #[test]
    fn scale_expands_cells() {
        let g = vec![vec![1, 2]];
        assert_eq!(Prim::Scale(2).apply(&g), vec![vec![1, 1, 2, 2], vec![1, 1, 2, 2]]);
    }

    #[test]
    fn crop_finds_bounding_box() {
        let g = vec![vec![0, 0, 0], vec![0, 3, 0], vec![0, 0, 4]];
        assert_eq!(Prim::CropToContent.apply(&g), vec![vec![3, 0], vec![0, 4]]);
    }

    #[test]
    fn crop_of_blank_grid_is_single_zero() {
        assert_eq!(Prim::CropToContent.apply(&vec![vec![0; 4]; 3]), vec![vec![0]]);
        assert_eq!(Prim::Compress.apply(&vec![vec![0; 4]; 3]), vec![vec![0]]);
    }

    #[test]
    fn compress_drops_blank_lines() {
        let g = vec![vec![1, 0, 2], vec![0, 0, 0], vec![3, 0, 4]];
        assert_eq!(Prim::Compress.apply(&g), vec![vec![1, 2], vec![3, 4]]);
    }

    #[test]
    fn fill_holes_needs_three_matching_neighbors() {
        let g = vec![vec![0, 2, 0], vec![2, 0, 2], vec![0, 2, 0]];
        assert_eq!(Prim::FillHoles.apply(&g)[1][1], 2);

        let mixed = vec![vec![0, 2, 0], vec![3, 0, 2], vec![0, 3, 0]];
        assert_eq!(Prim::FillHoles.apply(&mixed)[1][1], 0);

        let three = vec![vec![0, 5, 0], vec![5, 0, 5], vec![0, 0, 0]];
        assert_eq!(Prim::FillHoles.apply(&three)[1][1], 5);
    }

    #[test]
    fn extract_border_clears_interior() {
        let g = vec![vec![1; 3]; 3];
        let out = Prim::ExtractBorder.apply(&g);
        assert_eq!(out, vec![vec![1, 1, 1], vec![1, 0, 1], vec![1, 1, 1]]);
    }

    #[test]
    fn symmetrize_takes_max() {
        assert_eq!(Prim::Symmetrize.apply(&vec![vec![1, 0, 3]]), vec![vec![3, 0, 3]]);
    }

    #[test]
    fn shift_right_wraps() {
        assert_eq!(Prim::ShiftRight.apply(&vec![vec![1, 2, 3]]), vec![vec![3, 1, 2]]);
    }

    #[test]
    fn pattern_complete_repeats_smallest_period() {
        let g = vec![vec![1, 2, 1, 2, 0]];
        assert_eq!(horizontal_period(&g), Some(2));
        assert_eq!(Prim::PatternComplete.apply(&g), vec![vec![1, 2, 1, 2, 1]]);
    }

    #[test]
    fn pattern_complete_without_period_is_noop() {
        let g = vec![vec![1, 2, 3, 4]];
        assert_eq!(horizontal_period(&g), None);
        assert_eq!(Prim::PatternComplete.apply(&g), g);
    }

    #[test]
    fn tile_flip_rotates_middle_band() {
        let g = vec![vec![1, 2], vec![3, 4]];
        let out = Prim::TileFlip.apply(&g);
        assert_eq!(out.len(), 6);
        assert_eq!(out[0], vec![1, 2, 1, 2, 1, 2]);
        assert_eq!(out[2], vec![4, 3, 4, 3, 4, 3]);
        assert_eq!(out[3], vec![2, 1, 2, 1, 2, 1]);
        assert_eq!(out[5], vec![3, 4, 3, 4, 3, 4]);
    }

    #[test]
    fn build_by_name() {
        assert_eq!(Prim::from_name("rotate_90").unwrap(), Prim::Rotate90);
        assert_eq!(Prim::build("tile", &PrimParams::tile(3, 1)).unwrap(), Prim::Tile(3, 1));
        assert_eq!(Prim::build("scale", &PrimParams::default()).unwrap(), Prim::Scale(2));
        for name in PRIM_NAMES {
            assert_eq!(Prim::from_name(name).unwrap().name(), *name);
        }
    }

    #[test]
    fn unknown_name_fails() {
        let err = apply_named("melt", &sample(), &PrimParams::default()).unwrap_err();
        assert_eq!(err, SolverError::UnknownTransformation("melt".into()));
    }

    #[test]
    fn named_tile_uses_params() {
        let out = apply_named("tile", &vec![vec![1, 2]], &PrimParams::tile(2, 3)).unwrap();
        assert_eq!(out, vec![vec![1, 2, 1, 2, 1, 2]; 2]);
    }

    #[test]
    fn named_scale_uses_factor() {
        let out = apply_named("scale", &vec![vec![4]], &PrimParams::factor(3)).unwrap();
        assert_eq!(out, vec![vec![4, 4, 4]; 3]);
    }

    #[test]
    fn named_map_colors_uses_table() {
        let map = ColorMap::from_pairs(&[(1, 5), (2, 0)]);
        let out = apply_named("map_colors", &vec![vec![1, 2, 3]], &PrimParams::color_map(map)).unwrap();
        assert_eq!(out, vec![vec![5, 0, 3]]);
    }

    #[test]
    fn named_apply_rejects_malformed_grids() {
        let ragged = vec![vec![1, 2], vec![3]];
        assert!(matches!(
            apply_named("rotate_90", &ragged, &PrimParams::default()),
            Err(SolverError::InvalidGrid(_))
        ));
        assert!(matches!(
            apply_named("flip_vertical", &vec![vec![12]], &PrimParams::default()),
            Err(SolverError::InvalidGrid(_))
        ));
        assert!(matches!(
            apply_named("transpose", &vec![], &PrimParams::default()),
            Err(SolverError::InvalidGrid(_))
        ));
    }

    #[test]
    fn set_deduplicates_and_keeps_order() {
        let mut set = TransformationSet::geometric();
        let before = set.len();
        set.push(Prim::Rotate90);
        assert_eq!(set.len(), before);
        assert_eq!(set.position(&Prim::FlipH), Some(3));
    }

    #[test]
    fn task_set_includes_inferred_map() {
        let pairs = vec![(vec![vec![1, 2]], vec![vec![2, 2]])];
        let set = TransformationSet::for_task(&pairs, &SolverConfig::default());
        assert!(set.iter().any(|p| matches!(p, Prim::MapColors(_))));
        assert_eq!(set.len(), TransformationSet::standard().len() + 1);
    }

    #[test]
    fn display_includes_params() {
        assert_eq!(Prim::Tile(2, 3).to_string(), "tile(2x3)");
        assert_eq!(Prim::FlipV.to_string(), "flip_vertical");
    }
}
