//! Turning per-row runs into a paint-ordered [`StrokeMap`].
//!
//! *Slotted* mode keeps every run as its own stroke, grouped by color in
//! discovery order. *Layered* mode paints colors from most to least
//! frequent and lets each color's strokes extend over neighbouring runs of
//! less frequent colors: those colors are painted later and overwrite the
//! excess, so fewer, longer strokes reproduce the same picture.

use crate::extractor::Extraction;
use crate::settings::DrawMode;
use crate::strokes::{Color, ColorLayer, ScanRow, Stroke, StrokeMap};
use rayon::prelude::*;
use std::collections::HashMap;

/// Colors by descending coverage; ties keep encounter order.
pub fn rank_colors(frequency: &[(Color, u64)]) -> Vec<Color> {
    let mut ranked: Vec<(Color, u64)> = frequency.to_vec();
    ranked.sort_by(|a, b| b.1.cmp(&a.1));
    ranked.into_iter().map(|(c, _)| c).collect()
}

pub fn build_stroke_map(extraction: &Extraction, mode: DrawMode) -> StrokeMap {
    let map = match mode {
        DrawMode::Slotted => slot(&extraction.rows),
        DrawMode::Layered => layer(&extraction.rows, &extraction.frequency),
    };
    tracing::debug!(
        ?mode,
        runs = extraction.run_count(),
        strokes = map.total_strokes(),
        colors = map.len(),
        "stroke map built"
    );
    map
}

/// Group raw runs by color, keeping discovery order for colors and
/// row-major order for strokes.
pub fn slot(rows: &[ScanRow]) -> StrokeMap {
    let mut layers: Vec<ColorLayer> = Vec::new();
    let mut index: HashMap<Color, usize> = HashMap::new();
    for run in rows.iter().flatten() {
        let i = *index.entry(run.color).or_insert_with(|| {
            layers.push(ColorLayer {
                color: run.color,
                strokes: Vec::new(),
            });
            layers.len() - 1
        });
        layers[i].strokes.push(run.stroke);
    }
    StrokeMap::from(layers)
}

/// Frequency-ranked occlusion merging.
pub fn layer(rows: &[ScanRow], frequency: &[(Color, u64)]) -> StrokeMap {
    let ranked = rank_colors(frequency);
    let ranks: HashMap<Color, usize> = ranked.iter().enumerate().map(|(r, c)| (*c, r)).collect();

    // Each color's pass only reads the rows; collect keeps rank order.
    let layers: Vec<ColorLayer> = ranked
        .par_iter()
        .enumerate()
        .map(|(rank, &color)| ColorLayer {
            color,
            strokes: rows
                .iter()
                .flat_map(|row| merge_row(row, color, rank, &ranks))
                .collect(),
        })
        .collect();

    StrokeMap::from(layers)
}

/// Strokes `color` (at `rank`) paints on one row.
///
/// A span grows across contiguous runs whose rank is `>= rank` and is
/// emitted only if it contains at least one run of `color` itself. A run
/// of a more frequent color, a gap left by a dropped run, or the end of the
/// row closes the span.
fn merge_row(row: &ScanRow, color: Color, rank: usize, ranks: &HashMap<Color, usize>) -> Vec<Stroke> {
    let mut out = Vec::new();
    let mut span: Option<Stroke> = None;
    let mut exposed = false;

    for run in row {
        let run_rank = ranks.get(&run.color).copied().unwrap_or(usize::MAX);
        let contiguous = span.is_none_or(|s| run.stroke.start.x == s.end.x + 1);

        if run_rank < rank || !contiguous {
            if let Some(s) = span.take().filter(|_| exposed) {
                out.push(s);
            }
            exposed = false;
        }
        if run_rank >= rank {
            span = Some(match span {
                Some(s) => Stroke::new(s.start, run.stroke.end),
                None => run.stroke,
            });
            exposed |= run.color == color;
        }
    }
    if let Some(s) = span.filter(|_| exposed) {
        out.push(s);
    }
    out
}
