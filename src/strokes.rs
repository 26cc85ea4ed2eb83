//! Core value types shared by the compiler, the cache and the player.

use rgb::RGB8;
use serde::{Deserialize, Serialize};

/// A resolved paint color. Used both as a value and as a map key.
pub type Color = RGB8;

/// Designated background color skipped by `DrawFlags::IGNORE_BACKGROUND`.
pub const BACKGROUND: Color = RGB8 { r: 255, g: 255, b: 255 };

/// Integer screen coordinate. Serialized as `[x, y]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "(i32, i32)", into = "(i32, i32)")]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Point) -> f64 {
        let dx = f64::from(self.x - other.x);
        let dy = f64::from(self.y - other.y);
        (dx * dx + dy * dy).sqrt()
    }
}

impl From<(i32, i32)> for Point {
    fn from((x, y): (i32, i32)) -> Self {
        Self { x, y }
    }
}

impl From<Point> for (i32, i32) {
    fn from(p: Point) -> Self {
        (p.x, p.y)
    }
}

/// A single brush drag. Serialized as `[[x1, y1], [x2, y2]]`.
///
/// Strokes produced by the compiler are always horizontal (`start.y == end.y`)
/// with `start.x <= end.x`; both endpoints are inclusive screen pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "[Point; 2]", into = "[Point; 2]")]
pub struct Stroke {
    pub start: Point,
    pub end: Point,
}

impl Stroke {
    pub const fn new(start: Point, end: Point) -> Self {
        Self { start, end }
    }

    pub const fn horizontal(y: i32, x_start: i32, x_end: i32) -> Self {
        Self {
            start: Point::new(x_start, y),
            end: Point::new(x_end, y),
        }
    }

    pub fn is_horizontal(&self) -> bool {
        self.start.y == self.end.y
    }

    /// Number of screen pixels covered along the row.
    pub fn width(&self) -> i32 {
        (self.end.x - self.start.x).abs() + 1
    }

    pub fn length(&self) -> f64 {
        self.start.distance(&self.end)
    }
}

impl From<[Point; 2]> for Stroke {
    fn from([start, end]: [Point; 2]) -> Self {
        Self { start, end }
    }
}

impl From<Stroke> for [Point; 2] {
    fn from(s: Stroke) -> Self {
        [s.start, s.end]
    }
}

/// Target canvas rectangle on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CanvasRect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl CanvasRect {
    pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn center(&self) -> Point {
        Point::new(
            self.x + (self.width / 2) as i32,
            self.y + (self.height / 2) as i32,
        )
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// One resolved-color run inside a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Run {
    pub color: Color,
    pub stroke: Stroke,
}

/// Runs of one row, left to right, non-overlapping.
pub type ScanRow = Vec<Run>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorLayer {
    pub color: Color,
    pub strokes: Vec<Stroke>,
}

/// Ordered color → strokes mapping. Layer order is paint order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StrokeMap {
    layers: Vec<ColorLayer>,
}

impl StrokeMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a layer. Colors must be unique; a repeated color is merged
    /// into its existing layer so key order stays first-insertion order.
    pub fn push_layer(&mut self, color: Color, strokes: Vec<Stroke>) {
        match self.layers.iter_mut().find(|l| l.color == color) {
            Some(layer) => layer.strokes.extend(strokes),
            None => self.layers.push(ColorLayer { color, strokes }),
        }
    }

    pub fn layers(&self) -> &[ColorLayer] {
        &self.layers
    }

    pub fn iter(&self) -> impl Iterator<Item = &ColorLayer> {
        self.layers.iter()
    }

    pub fn colors(&self) -> impl Iterator<Item = Color> + '_ {
        self.layers.iter().map(|l| l.color)
    }

    pub fn get(&self, color: Color) -> Option<&[Stroke]> {
        self.layers
            .iter()
            .find(|l| l.color == color)
            .map(|l| l.strokes.as_slice())
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn total_strokes(&self) -> usize {
        self.layers.iter().map(|l| l.strokes.len()).sum()
    }

    /// Strokes in paint order, each paired with its color.
    pub fn strokes_in_order(&self) -> impl Iterator<Item = (Color, &Stroke)> {
        self.layers
            .iter()
            .flat_map(|l| l.strokes.iter().map(move |s| (l.color, s)))
    }
}

impl From<Vec<ColorLayer>> for StrokeMap {
    fn from(layers: Vec<ColorLayer>) -> Self {
        let mut map = StrokeMap::new();
        for layer in layers {
            map.push_layer(layer.color, layer.strokes);
        }
        map
    }
}
