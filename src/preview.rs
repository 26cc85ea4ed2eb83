//! Offline renderings of a stroke map, for checking a compilation before
//! handing it to the player.

use crate::error::Result;
use crate::strokes::{BACKGROUND, CanvasRect, Color, StrokeMap};
use image::{Rgb, RgbImage};
use std::path::Path;
use svg::Document;
use svg::node::element::{Line, Rectangle};

fn hex(color: Color) -> String {
    format!("#{:02x}{:02x}{:02x}", color.r, color.g, color.b)
}

/// One `<line>` per stroke in paint order, in canvas-local coordinates,
/// `pixel_step` wide so adjacent rows touch.
pub fn to_svg(map: &StrokeMap, canvas: &CanvasRect, pixel_step: u32) -> Document {
    let step = pixel_step.max(1);
    let half = step as f64 / 2.0;
    let mut document = Document::new()
        .set("width", canvas.width)
        .set("height", canvas.height)
        .set("viewBox", (0, 0, canvas.width, canvas.height))
        .add(
            Rectangle::new()
                .set("width", canvas.width)
                .set("height", canvas.height)
                .set("fill", hex(BACKGROUND)),
        );

    for (color, stroke) in map.strokes_in_order() {
        let y = f64::from(stroke.start.y - canvas.y) + half;
        let line = Line::new()
            .set("x1", stroke.start.x - canvas.x)
            .set("y1", y)
            .set("x2", stroke.end.x - canvas.x + 1)
            .set("y2", y)
            .set("stroke", hex(color))
            .set("stroke-width", step);
        document = document.add(line);
    }
    document
}

pub fn save_svg(map: &StrokeMap, canvas: &CanvasRect, pixel_step: u32, path: &Path) -> Result<()> {
    svg::save(path, &to_svg(map, canvas, pixel_step))?;
    Ok(())
}

/// Paint every stroke as a `pixel_step`-tall band onto a white canvas, in
/// order. Later strokes overwrite earlier ones.
pub fn rasterize(map: &StrokeMap, canvas: &CanvasRect, pixel_step: u32) -> RgbImage {
    let step = pixel_step.max(1) as i32;
    let (w, h) = (canvas.width as i32, canvas.height as i32);
    let background = Rgb([BACKGROUND.r, BACKGROUND.g, BACKGROUND.b]);
    let mut img = RgbImage::from_pixel(canvas.width, canvas.height, background);

    for (color, stroke) in map.strokes_in_order() {
        let paint = Rgb([color.r, color.g, color.b]);
        let (x1, x2) = (
            stroke.start.x.min(stroke.end.x) - canvas.x,
            stroke.start.x.max(stroke.end.x) - canvas.x,
        );
        let top = stroke.start.y - canvas.y;
        for y in top.max(0)..(top + step).min(h) {
            for x in x1.max(0)..=x2.min(w - 1) {
                img.put_pixel(x as u32, y as u32, paint);
            }
        }
    }
    img
}

pub fn save_png(map: &StrokeMap, canvas: &CanvasRect, pixel_step: u32, path: &Path) -> Result<()> {
    rasterize(map, canvas, pixel_step).save(path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strokes::Stroke;
    use rgb::RGB8;

    const RED: RGB8 = RGB8::new(255, 0, 0);
    const BLUE: RGB8 = RGB8::new(0, 0, 255);

    fn overlapping() -> StrokeMap {
        let mut map = StrokeMap::new();
        map.push_layer(RED, vec![Stroke::horizontal(10, 10, 19)]);
        map.push_layer(BLUE, vec![Stroke::horizontal(10, 15, 17)]);
        map
    }

    #[test]
    fn test_rasterize_paints_in_order() {
        let canvas = CanvasRect::new(10, 10, 10, 4);
        let img = rasterize(&overlapping(), &canvas, 2);

        assert_eq!(img.dimensions(), (10, 4));
        assert_eq!(img.get_pixel(0, 0), &Rgb([255, 0, 0]));
        assert_eq!(img.get_pixel(4, 1), &Rgb([255, 0, 0]));
        assert_eq!(img.get_pixel(5, 0), &Rgb([0, 0, 255]));
        assert_eq!(img.get_pixel(7, 1), &Rgb([0, 0, 255]));
        assert_eq!(img.get_pixel(8, 1), &Rgb([255, 0, 0]));
        assert_eq!(img.get_pixel(0, 2), &Rgb([255, 255, 255]));
    }

    #[test]
    fn test_rasterize_clips_to_canvas() {
        let mut map = StrokeMap::new();
        map.push_layer(RED, vec![Stroke::horizontal(-3, -5, 100)]);
        let img = rasterize(&map, &CanvasRect::new(0, 0, 8, 8), 5);
        assert_eq!(img.get_pixel(7, 1), &Rgb([255, 0, 0]));
        assert_eq!(img.get_pixel(0, 2), &Rgb([255, 255, 255]));
    }

    #[test]
    fn test_svg_has_one_line_per_stroke() {
        let canvas = CanvasRect::new(10, 10, 10, 4);
        let text = to_svg(&overlapping(), &canvas, 2).to_string();

        assert_eq!(text.matches("<line").count(), 2);
        assert!(text.contains("#ff0000"));
        assert!(text.contains("#0000ff"));
        assert!(text.find("#ff0000") < text.find("#0000ff"));
        assert!(text.contains("viewBox=\"0 0 10 4\""));
    }

    #[test]
    fn test_save_png_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("preview.png");
        save_png(&overlapping(), &CanvasRect::new(10, 10, 10, 4), 2, &path).unwrap();
        let back = image::open(&path).unwrap().to_rgb8();
        assert_eq!(back.get_pixel(6, 0), &Rgb([0, 0, 255]));
    }
}
