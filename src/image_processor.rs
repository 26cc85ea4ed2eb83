use crate::error::Result;
use crate::strokes::{CanvasRect, Color};
use rgb::{RGB8, RGBA8};

#[derive(Debug, Clone)]
pub struct ImageData {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<RGBA8>,
}

impl ImageData {
    pub fn new(width: u32, height: u32, pixels: Vec<RGBA8>) -> Self {
        debug_assert_eq!(pixels.len(), (width * height) as usize);
        Self {
            width,
            height,
            pixels,
        }
    }

    /// RGB of the pixel at `(x, y)`; alpha is ignored.
    pub fn rgb_at(&self, x: u32, y: u32) -> Color {
        let p = self.pixels[(y * self.width + x) as usize];
        RGB8::new(p.r, p.g, p.b)
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

fn from_dynamic(img: image::DynamicImage) -> ImageData {
    let rgba = img.to_rgba8();

    let pixels: Vec<RGBA8> = rgba
        .pixels()
        .map(|p| RGBA8::new(p[0], p[1], p[2], p[3]))
        .collect();

    ImageData {
        width: rgba.width(),
        height: rgba.height(),
        pixels,
    }
}

pub fn load_image(path: &std::path::Path) -> Result<ImageData> {
    Ok(from_dynamic(image::open(path)?))
}

pub fn load_image_bytes(bytes: &[u8]) -> Result<ImageData> {
    Ok(from_dynamic(image::load_from_memory(bytes)?))
}

/// Largest size with the image's aspect ratio that fits in `available`.
pub fn fit_size(image: &ImageData, available: (u32, u32)) -> (u32, u32) {
    if image.is_empty() {
        return (0, 0);
    }
    let (aw, ah) = (f64::from(available.0), f64::from(available.1));
    let aspect = f64::from(image.width) / f64::from(image.height);
    let width = (aspect * ah).min(aw);
    let height = (aw / aspect).min(ah);
    (width as u32, height as u32)
}

/// Nearest-neighbour resample, sampling each output cell at its centre.
pub fn downsample_nearest(image: &ImageData, width: u32, height: u32) -> ImageData {
    if image.is_empty() || width == 0 || height == 0 {
        return ImageData::new(0, 0, Vec::new());
    }
    let mut pixels = Vec::with_capacity((width * height) as usize);
    for y in 0..height {
        let sy = ((2 * u64::from(y) + 1) * u64::from(image.height) / (2 * u64::from(height))) as u32;
        for x in 0..width {
            let sx =
                ((2 * u64::from(x) + 1) * u64::from(image.width) / (2 * u64::from(width))) as u32;
            pixels.push(image.pixels[(sy.min(image.height - 1) * image.width
                + sx.min(image.width - 1)) as usize]);
        }
    }
    ImageData::new(width, height, pixels)
}

/// Half-open pixel rectangle `[x1, x2) × [y1, y2)` inside an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageRegion {
    pub x1: u32,
    pub y1: u32,
    pub x2: u32,
    pub y2: u32,
}

impl ImageRegion {
    pub fn width(&self) -> u32 {
        self.x2.saturating_sub(self.x1)
    }

    pub fn height(&self) -> u32 {
        self.y2.saturating_sub(self.y1)
    }
}

pub fn crop(image: &ImageData, region: ImageRegion) -> ImageData {
    let x2 = region.x2.min(image.width);
    let y2 = region.y2.min(image.height);
    let clamped = ImageRegion {
        x1: region.x1.min(x2),
        y1: region.y1.min(y2),
        x2,
        y2,
    };
    let (width, height) = (clamped.width(), clamped.height());
    let mut pixels = Vec::with_capacity((width * height) as usize);
    for y in clamped.y1..clamped.y2 {
        let row = (y * image.width) as usize;
        pixels.extend_from_slice(&image.pixels[row + clamped.x1 as usize..row + x2 as usize]);
    }
    ImageData::new(width, height, pixels)
}

/// Map a selection on the canvas back to the image pixels stretched under
/// it, clamped to the image bounds.
pub fn canvas_to_image_region(
    canvas: &CanvasRect,
    selection: &CanvasRect,
    image_size: (u32, u32),
) -> ImageRegion {
    let (iw, ih) = image_size;
    let scale_x = f64::from(iw) / f64::from(canvas.width.max(1));
    let scale_y = f64::from(ih) / f64::from(canvas.height.max(1));
    let map = |offset: i32, scale: f64, limit: u32| -> u32 {
        ((f64::from(offset) * scale) as i64).clamp(0, i64::from(limit)) as u32
    };
    let left = selection.x - canvas.x;
    let top = selection.y - canvas.y;
    ImageRegion {
        x1: map(left, scale_x, iw),
        y1: map(top, scale_y, ih),
        x2: map(left + selection.width as i32, scale_x, iw),
        y2: map(top + selection.height as i32, scale_y, ih),
    }
}
