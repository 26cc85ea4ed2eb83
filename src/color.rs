//! Mapping sampled pixels to paint colors.

use crate::error::{Result, StrokeError};
use crate::strokes::Color;
use rgb::RGB8;
use std::collections::HashMap;

#[inline]
pub fn dist_sq(a: &Color, b: &Color) -> i32 {
    let dr = a.r as i32 - b.r as i32;
    let dg = a.g as i32 - b.g as i32;
    let db = a.b as i32 - b.b as i32;
    dr * dr + dg * dg + db * db
}

#[derive(Debug, Clone)]
enum Strategy {
    /// Nearest fixed palette color.
    Palette(Vec<Color>),
    /// Per-channel rounding to multiples of `interval`.
    Quantize { interval: f64 },
}

/// Resolves raw pixels to paint colors, memoizing every lookup for the
/// lifetime of the resolver (one compile).
#[derive(Debug, Clone)]
pub struct ColorResolver {
    strategy: Strategy,
    memo: HashMap<Color, Color>,
}

impl ColorResolver {
    /// Nearest-color resolution against a fixed palette.
    ///
    /// Ties resolve to the first minimum in `colors` order.
    pub fn palette(colors: impl IntoIterator<Item = Color>) -> Result<Self> {
        let colors: Vec<Color> = colors.into_iter().collect();
        if colors.is_empty() {
            return Err(StrokeError::NoPalette);
        }
        Ok(Self {
            strategy: Strategy::Palette(colors),
            memo: HashMap::new(),
        })
    }

    /// Free-form resolution: `interval = max((1 - precision) * 255, 1)`.
    pub fn quantized(precision: f64) -> Self {
        let interval = ((1.0 - precision.clamp(0.0, 1.0)) * 255.0).max(1.0);
        Self {
            strategy: Strategy::Quantize { interval },
            memo: HashMap::new(),
        }
    }

    pub fn resolve(&mut self, pixel: Color) -> Color {
        if let Some(&hit) = self.memo.get(&pixel) {
            return hit;
        }
        let resolved = match &self.strategy {
            Strategy::Palette(colors) => nearest(colors, &pixel),
            Strategy::Quantize { interval } => quantize(&pixel, *interval),
        };
        self.memo.insert(pixel, resolved);
        resolved
    }

    /// Distinct raw values resolved so far.
    pub fn memoized(&self) -> usize {
        self.memo.len()
    }
}

fn nearest(colors: &[Color], pixel: &Color) -> Color {
    // `min_by_key` keeps the last minimum, so fold to keep the first one.
    colors
        .iter()
        .fold(None::<(i32, Color)>, |best, c| {
            let d = dist_sq(c, pixel);
            match best {
                Some((bd, _)) if bd <= d => best,
                _ => Some((d, *c)),
            }
        })
        .map(|(_, c)| c)
        .unwrap_or(*pixel)
}

fn quantize(pixel: &Color, interval: f64) -> Color {
    let q = |channel: u8| -> u8 {
        let v = (f64::from(channel) / interval).round() * interval;
        v.round().clamp(0.0, 255.0) as u8
    };
    RGB8::new(q(pixel.r), q(pixel.g), q(pixel.b))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn basic_palette() -> Vec<Color> {
        vec![
            RGB8::new(0, 0, 0),
            RGB8::new(255, 255, 255),
            RGB8::new(255, 0, 0),
            RGB8::new(0, 255, 0),
            RGB8::new(0, 0, 255),
        ]
    }

    #[test]
    fn test_palette_picks_nearest() {
        let mut resolver = ColorResolver::palette(basic_palette()).unwrap();
        assert_eq!(resolver.resolve(RGB8::new(240, 20, 10)), RGB8::new(255, 0, 0));
        assert_eq!(resolver.resolve(RGB8::new(30, 30, 30)), RGB8::new(0, 0, 0));
        assert_eq!(resolver.resolve(RGB8::new(200, 210, 220)), RGB8::new(255, 255, 255));
    }

    #[test]
    fn test_palette_exact_match_is_identity() {
        let mut resolver = ColorResolver::palette(basic_palette()).unwrap();
        for c in basic_palette() {
            assert_eq!(resolver.resolve(c), c);
        }
    }

    #[test]
    fn test_palette_tie_keeps_first_minimum() {
        let a = RGB8::new(0, 0, 0);
        let b = RGB8::new(2, 0, 0);
        let mut resolver = ColorResolver::palette(vec![a, b]).unwrap();
        assert_eq!(resolver.resolve(RGB8::new(1, 0, 0)), a);
        let mut reversed = ColorResolver::palette(vec![b, a]).unwrap();
        assert_eq!(reversed.resolve(RGB8::new(1, 0, 0)), b);
    }

    #[test]
    fn test_empty_palette_is_a_config_error() {
        assert!(matches!(
            ColorResolver::palette(Vec::new()),
            Err(StrokeError::NoPalette)
        ));
    }

    #[test]
    fn test_full_precision_is_lossless() {
        let mut resolver = ColorResolver::quantized(1.0);
        let c = RGB8::new(13, 200, 77);
        assert_eq!(resolver.resolve(c), c);
    }

    #[test]
    fn test_low_precision_collapses_buckets() {
        let mut resolver = ColorResolver::quantized(0.0);
        assert_eq!(resolver.resolve(RGB8::new(100, 130, 255)), RGB8::new(0, 255, 255));
        assert_eq!(resolver.resolve(RGB8::new(127, 128, 1)), RGB8::new(0, 255, 0));
    }

    #[test]
    fn test_quantize_rounds_to_interval_and_clamps() {
        // interval ~150: 240 rounds up to 2 * 150, which is clamped to 255.
        let mut resolver = ColorResolver::quantized(0.4118);
        assert_eq!(resolver.resolve(RGB8::new(50, 100, 240)), RGB8::new(0, 150, 255));
    }

    #[test]
    fn test_resolution_is_memoized() {
        let mut resolver = ColorResolver::quantized(0.5);
        let c = RGB8::new(10, 20, 30);
        let first = resolver.resolve(c);
        let second = resolver.resolve(c);
        assert_eq!(first, second);
        assert_eq!(resolver.memoized(), 1);
    }
}
