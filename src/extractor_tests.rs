#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::color::ColorResolver;
    use crate::image_processor::ImageData;
    use rgb::{RGB8, RGBA8};

    const RED: RGB8 = RGB8::new(255, 0, 0);
    const GREEN: RGB8 = RGB8::new(0, 255, 0);
    const BLACK: RGB8 = RGB8::new(0, 0, 0);
    const WHITE: RGB8 = RGB8::new(255, 255, 255);

    fn image_from_rows(rows: &[&[RGB8]]) -> ImageData {
        let height = rows.len() as u32;
        let width = rows[0].len() as u32;
        let pixels = rows
            .iter()
            .flat_map(|r| r.iter().map(|c| RGBA8::new(c.r, c.g, c.b, 255)))
            .collect();
        ImageData::new(width, height, pixels)
    }

    fn palette_resolver() -> ColorResolver {
        ColorResolver::palette(vec![BLACK, WHITE, RED, GREEN]).unwrap()
    }

    #[test]
    fn test_two_pixels_give_two_disjoint_strokes() {
        let image = image_from_rows(&[&[RED, GREEN]]);
        let mut resolver = palette_resolver();
        let extraction = ScanlineStrokeExtractor::new(&mut resolver).extract(
            &image,
            &CanvasRect::new(0, 0, 20, 10),
            10,
        );

        assert_eq!(extraction.rows.len(), 1);
        let row = &extraction.rows[0];
        assert_eq!(row.len(), 2);
        assert_eq!(row[0].color, RED);
        assert_eq!(row[0].stroke, Stroke::horizontal(0, 0, 9));
        assert_eq!(row[1].color, GREEN);
        assert_eq!(row[1].stroke, Stroke::horizontal(0, 10, 19));
        assert_eq!(row[0].stroke.width(), 10);
        assert_eq!(row[1].stroke.width(), 10);
        assert_eq!(extraction.frequency, vec![(RED, 1), (GREEN, 1)]);
    }

    #[test]
    fn test_identical_columns_merge_into_one_run() {
        let image = image_from_rows(&[&[RED, RED, RED, GREEN, GREEN, RED]]);
        let mut resolver = palette_resolver();
        let extraction = ScanlineStrokeExtractor::new(&mut resolver).extract(
            &image,
            &CanvasRect::new(0, 0, 60, 10),
            10,
        );

        let row = &extraction.rows[0];
        let colors: Vec<RGB8> = row.iter().map(|r| r.color).collect();
        assert_eq!(colors, vec![RED, GREEN, RED]);
        assert_eq!(row[0].stroke, Stroke::horizontal(0, 0, 29));
        assert_eq!(row[1].stroke, Stroke::horizontal(0, 30, 49));
        assert_eq!(row[2].stroke, Stroke::horizontal(0, 50, 59));
        assert_eq!(extraction.frequency, vec![(RED, 4), (GREEN, 2)]);
    }

    #[test]
    fn test_runs_merge_on_resolved_not_raw_color() {
        let near_red = RGB8::new(250, 10, 5);
        let image = image_from_rows(&[&[RED, near_red, RED]]);
        let mut resolver = palette_resolver();
        let extraction = ScanlineStrokeExtractor::new(&mut resolver).extract(
            &image,
            &CanvasRect::new(0, 0, 30, 10),
            10,
        );
        assert_eq!(extraction.rows[0].len(), 1);
        assert_eq!(extraction.rows[0][0].stroke, Stroke::horizontal(0, 0, 29));
    }

    #[test]
    fn test_column_image_gives_one_stroke_per_row() {
        let image = image_from_rows(&[&[BLACK], &[BLACK]]);
        let mut resolver = palette_resolver();
        let extraction = ScanlineStrokeExtractor::new(&mut resolver).extract(
            &image,
            &CanvasRect::new(0, 0, 10, 20),
            10,
        );
        assert_eq!(extraction.rows.len(), 2);
        assert_eq!(extraction.rows[0][0].stroke, Stroke::horizontal(0, 0, 9));
        assert_eq!(extraction.rows[1][0].stroke, Stroke::horizontal(10, 0, 9));
        assert_eq!(extraction.frequency, vec![(BLACK, 2)]);
    }

    #[test]
    fn test_background_is_dropped_when_ignored() {
        let image = image_from_rows(&[&[WHITE, RED, WHITE], &[WHITE, WHITE, WHITE]]);
        let mut resolver = palette_resolver();
        let extraction = ScanlineStrokeExtractor::new(&mut resolver)
            .ignore_background(true)
            .extract(&image, &CanvasRect::new(0, 0, 30, 20), 10);

        assert!(
            extraction
                .rows
                .iter()
                .flatten()
                .all(|run| run.color != WHITE)
        );
        assert_eq!(extraction.rows[0].len(), 1);
        assert!(extraction.rows[1].is_empty());
        assert_eq!(extraction.frequency, vec![(RED, 1)]);
    }

    #[test]
    fn test_background_is_kept_by_default() {
        let image = image_from_rows(&[&[WHITE, RED]]);
        let mut resolver = palette_resolver();
        let extraction = ScanlineStrokeExtractor::new(&mut resolver).extract(
            &image,
            &CanvasRect::new(0, 0, 20, 10),
            10,
        );
        assert_eq!(extraction.frequency, vec![(WHITE, 1), (RED, 1)]);
    }

    #[test]
    fn test_grid_is_centred_in_canvas() {
        // 2:1 image in a 100x100 canvas -> 100x50 fit, 10 x 5 cells of 10.
        let image = image_from_rows(&[&[RED, RED]]);
        let grid = Grid::for_canvas(&image, &CanvasRect::new(7, 3, 100, 100), 10);
        assert_eq!((grid.cols, grid.rows), (10, 5));
        assert_eq!(grid.origin, Point::new(7, 3 + 25));
    }

    #[test]
    fn test_grid_leftover_margin_is_split() {
        let image = image_from_rows(&[&[RED, RED], &[RED, RED]]);
        let grid = Grid::for_canvas(&image, &CanvasRect::new(0, 0, 25, 25), 10);
        assert_eq!((grid.cols, grid.rows), (2, 2));
        assert_eq!(grid.origin, Point::new(2, 2));
        assert_eq!(grid.span(1, 0, 1), Stroke::horizontal(12, 2, 21));
    }

    #[test]
    fn test_progress_reaches_one_hundred() {
        let image = image_from_rows(&[&[RED, GREEN], &[GREEN, RED]]);
        let mut resolver = palette_resolver();
        let progress = Progress::new();
        ScanlineStrokeExtractor::new(&mut resolver)
            .with_progress(progress.clone())
            .extract(&image, &CanvasRect::new(0, 0, 40, 40), 10);
        assert!((progress.percent() - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_every_run_is_horizontal() {
        let image = image_from_rows(&[&[RED, GREEN, BLACK], &[BLACK, BLACK, RED], &[GREEN, RED, RED]]);
        let mut resolver = palette_resolver();
        let extraction = ScanlineStrokeExtractor::new(&mut resolver).extract(
            &image,
            &CanvasRect::new(5, 5, 90, 90),
            3,
        );
        assert!(extraction.run_count() > 0);
        assert!(extraction.rows.iter().flatten().all(|r| r.stroke.is_horizontal()));
    }
}
