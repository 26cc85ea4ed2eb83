use crate::color::ColorResolver;
use crate::image_processor::{ImageData, downsample_nearest, fit_size};
use crate::strokes::{BACKGROUND, CanvasRect, Color, Point, Run, ScanRow, Stroke};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Placement of the downsampled image on the canvas. One cell is one
/// `step × step` block of canvas pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Grid {
    pub origin: Point,
    pub cols: u32,
    pub rows: u32,
    pub step: u32,
}

impl Grid {
    /// Fit the image into the canvas, snap to whole cells and centre the
    /// result with the leftover margin split evenly.
    pub fn for_canvas(image: &ImageData, canvas: &CanvasRect, step: u32) -> Grid {
        let step = step.max(1);
        let (fw, fh) = fit_size(image, (canvas.width, canvas.height));
        let cols = fw / step;
        let rows = fh / step;
        let origin = Point::new(
            canvas.x + ((canvas.width - cols * step) / 2) as i32,
            canvas.y + ((canvas.height - rows * step) / 2) as i32,
        );
        Grid {
            origin,
            cols,
            rows,
            step,
        }
    }

    pub fn cells(&self) -> u64 {
        u64::from(self.cols) * u64::from(self.rows)
    }

    /// Screen stroke covering cells `first..=last` of `row`.
    pub fn span(&self, row: u32, first: u32, last: u32) -> Stroke {
        let step = self.step as i32;
        Stroke::horizontal(
            self.origin.y + row as i32 * step,
            self.origin.x + first as i32 * step,
            self.origin.x + (last as i32 + 1) * step - 1,
        )
    }
}

/// Shared, monotonically increasing progress counter.
#[derive(Debug, Clone, Default)]
pub struct Progress {
    processed: Arc<AtomicU64>,
    total: Arc<AtomicU64>,
}

impl Progress {
    pub fn new() -> Self {
        Self::default()
    }

    fn start(&self, total: u64) {
        self.processed.store(0, Ordering::SeqCst);
        self.total.store(total, Ordering::SeqCst);
    }

    fn advance(&self, n: u64) {
        self.processed.fetch_add(n, Ordering::SeqCst);
    }

    /// `processed / total * 100`; 100 once an empty job is done.
    pub fn percent(&self) -> f64 {
        let total = self.total.load(Ordering::SeqCst);
        if total == 0 {
            return 100.0;
        }
        self.processed.load(Ordering::SeqCst) as f64 / total as f64 * 100.0
    }
}

#[derive(Debug, Clone)]
pub struct Extraction {
    pub grid: Grid,
    pub rows: Vec<ScanRow>,
    /// Cells covered per color, in first-encounter order.
    pub frequency: Vec<(Color, u64)>,
}

impl Extraction {
    pub fn run_count(&self) -> usize {
        self.rows.iter().map(Vec::len).sum()
    }
}

pub struct ScanlineStrokeExtractor<'a> {
    resolver: &'a mut ColorResolver,
    ignore_background: bool,
    progress: Progress,
}

impl<'a> ScanlineStrokeExtractor<'a> {
    pub fn new(resolver: &'a mut ColorResolver) -> Self {
        Self {
            resolver,
            ignore_background: false,
            progress: Progress::new(),
        }
    }

    pub fn ignore_background(mut self, ignore: bool) -> Self {
        self.ignore_background = ignore;
        self
    }

    pub fn with_progress(mut self, progress: Progress) -> Self {
        self.progress = progress;
        self
    }

    pub fn extract(&mut self, image: &ImageData, canvas: &CanvasRect, pixel_step: u32) -> Extraction {
        let grid = Grid::for_canvas(image, canvas, pixel_step);
        let small = downsample_nearest(image, grid.cols, grid.rows);
        self.progress.start(grid.cells());

        let mut rows = Vec::with_capacity(grid.rows as usize);
        let mut frequency: Vec<(Color, u64)> = Vec::new();
        let mut slots: HashMap<Color, usize> = HashMap::new();

        for y in 0..grid.rows {
            let mut row = ScanRow::new();
            let mut run_start = 0u32;
            let mut current: Option<Color> = None;

            for x in 0..grid.cols {
                let color = self.resolver.resolve(small.rgb_at(x, y));
                if let Some(prev) = current.filter(|&prev| prev != color) {
                    self.emit(&grid, y, run_start, x - 1, prev, &mut row, &mut frequency, &mut slots);
                    run_start = x;
                }
                current = Some(color);
            }
            if let Some(prev) = current {
                self.emit(&grid, y, run_start, grid.cols - 1, prev, &mut row, &mut frequency, &mut slots);
            }

            rows.push(row);
            self.progress.advance(u64::from(grid.cols));
        }

        tracing::debug!(
            cols = grid.cols,
            rows = grid.rows,
            colors = frequency.len(),
            distinct_pixels = self.resolver.memoized(),
            "scanline extraction finished"
        );

        Extraction {
            grid,
            rows,
            frequency,
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn emit(
        &self,
        grid: &Grid,
        row_index: u32,
        first: u32,
        last: u32,
        color: Color,
        row: &mut ScanRow,
        frequency: &mut Vec<(Color, u64)>,
        slots: &mut HashMap<Color, usize>,
    ) {
        if self.ignore_background && color == BACKGROUND {
            return;
        }
        let slot = *slots.entry(color).or_insert_with(|| {
            frequency.push((color, 0));
            frequency.len() - 1
        });
        frequency[slot].1 += u64::from(last - first + 1);
        row.push(Run {
            color,
            stroke: grid.span(row_index, first, last),
        });
    }
}
