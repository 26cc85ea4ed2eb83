//! img2strokes - compile raster images into brush strokes and play them back
//!
//! This library turns a picture into the strokes a drawing surface with a
//! single primitive ("select a color, drag from A to B") needs to reproduce
//! it, then replays them through a pluggable input target.
//!
//! ## Features
//!
//! - **Palette or quantized** color resolution, memoized per compile
//! - **Scanline** run extraction on a canvas-fitted grid
//! - **Layered** stroke merging that exploits painter's-algorithm occlusion
//! - **Content-addressed cache** of compiled stroke maps
//! - **Resumable playback** with pause, cancel, progress and ETA
//!
//! ## Example
//!
//! ```rust,no_run
//! use img2strokes::{AppConfig, CompileOptions, ExecutionController, LogTarget, Pipeline};
//! use std::path::Path;
//!
//! let config = AppConfig::from_path(Path::new("img2strokes.json"))?;
//! let pipeline = Pipeline::new(config.tools.clone());
//! let bytes = std::fs::read("input.png")?;
//! let compiled = pipeline.compile(&bytes, &CompileOptions::from(&config))?;
//!
//! let mut controller =
//!     ExecutionController::new(config.settings, config.playback, config.tools);
//! controller.run(&compiled.strokes, &mut LogTarget::default())?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod cache;
pub mod color;
pub mod error;
pub mod executor;
pub mod extractor;
pub mod image_processor;
pub mod input;
pub mod layering;
pub mod preview;
pub mod settings;
pub mod strokes;

pub use cache::{CacheKey, StrokeCache};
pub use color::ColorResolver;
pub use error::{Result, StrokeError};
pub use executor::{
    DrawState, Eta, ExecutionController, PlaybackHandle, PlaybackState, ProgressReport, RunOutcome,
};
pub use extractor::{Extraction, Progress, ScanlineStrokeExtractor};
pub use image_processor::{ImageData, load_image, load_image_bytes};
pub use input::{InputTarget, LogTarget, RecordingTarget};
pub use layering::build_stroke_map;
pub use settings::{
    AppConfig, DrawFlags, DrawMode, PausePolicy, PlaybackSettings, Settings, ToolConfig,
};
pub use strokes::{CanvasRect, Color, Point, Stroke, StrokeMap};

use image_processor::{canvas_to_image_region, crop};

/// Per-compile knobs. Everything here participates in the cache key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompileOptions {
    pub settings: Settings,
    pub flags: DrawFlags,
    pub mode: DrawMode,
}

impl From<&AppConfig> for CompileOptions {
    fn from(config: &AppConfig) -> Self {
        Self {
            settings: config.settings.clone(),
            flags: config.flags,
            mode: config.mode,
        }
    }
}

/// Result of [`Pipeline::compile`].
#[derive(Debug, Clone)]
pub struct Compiled {
    pub strokes: StrokeMap,
    pub from_cache: bool,
    pub key: CacheKey,
}

/// Image → stroke map, with an optional cache in front.
#[derive(Debug, Clone)]
pub struct Pipeline {
    tools: ToolConfig,
    cache: Option<StrokeCache>,
    progress: Progress,
}

impl Pipeline {
    pub fn new(tools: ToolConfig) -> Self {
        Self {
            tools,
            cache: None,
            progress: Progress::new(),
        }
    }

    pub fn with_cache(mut self, cache: StrokeCache) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn tools(&self) -> &ToolConfig {
        &self.tools
    }

    pub fn cache(&self) -> Option<&StrokeCache> {
        self.cache.as_ref()
    }

    /// Shared extraction progress; clone it before compiling on another
    /// thread to poll the percentage.
    pub fn progress(&self) -> Progress {
        self.progress.clone()
    }

    /// Compile encoded image bytes, consulting the cache first.
    ///
    /// Configuration errors are raised before the cache is touched. Cache
    /// failures are logged and never fail the compile.
    #[tracing::instrument(skip_all, fields(bytes = image_bytes.len(), mode = ?options.mode))]
    pub fn compile(&self, image_bytes: &[u8], options: &CompileOptions) -> Result<Compiled> {
        options.settings.validate()?;
        let canvas = self.tools.canvas()?;
        let resolver = self.resolver(options)?;
        let key = StrokeCache::key(
            image_bytes,
            &options.settings,
            options.flags,
            options.mode,
            &canvas,
        );

        if let Some(strokes) = self
            .cache
            .as_ref()
            .and_then(|cache| cache.load(&key, &options.settings, &canvas))
        {
            return Ok(Compiled {
                strokes,
                from_cache: true,
                key,
            });
        }

        let image = load_image_bytes(image_bytes)?;
        let strokes = self.extract(&image, &canvas, resolver, options);
        tracing::info!(
            %key,
            colors = strokes.len(),
            strokes = strokes.total_strokes(),
            "compiled"
        );

        if let Some(cache) = &self.cache {
            if let Err(err) = cache.store(
                &key,
                &strokes,
                &options.settings,
                options.flags,
                options.mode,
                &canvas,
            ) {
                tracing::warn!(%key, error = %err, "failed to write cache entry");
            }
        }

        Ok(Compiled {
            strokes,
            from_cache: false,
            key,
        })
    }

    /// Compile already decoded pixels onto the configured canvas. No cache.
    #[tracing::instrument(skip_all, fields(width = image.width, height = image.height))]
    pub fn compile_image(&self, image: &ImageData, options: &CompileOptions) -> Result<StrokeMap> {
        options.settings.validate()?;
        let canvas = self.tools.canvas()?;
        let resolver = self.resolver(options)?;
        Ok(self.extract(image, &canvas, resolver, options))
    }

    /// Redraw only `selection`: the image area stretched under it on the
    /// canvas is cropped and compiled into the selection rectangle.
    #[tracing::instrument(skip_all, fields(selection = ?selection))]
    pub fn compile_region(
        &self,
        image: &ImageData,
        selection: &CanvasRect,
        options: &CompileOptions,
    ) -> Result<StrokeMap> {
        options.settings.validate()?;
        let canvas = self.tools.canvas()?;
        let resolver = self.resolver(options)?;
        let region = canvas_to_image_region(&canvas, selection, (image.width, image.height));
        let cropped = crop(image, region);
        tracing::debug!(?region, "cropped selection");
        Ok(self.extract(&cropped, selection, resolver, options))
    }

    fn resolver(&self, options: &CompileOptions) -> Result<ColorResolver> {
        if options.flags.contains(DrawFlags::CUSTOM_COLORS) {
            Ok(ColorResolver::quantized(options.settings.precision))
        } else {
            ColorResolver::palette(self.tools.palette()?.colors())
        }
    }

    fn extract(
        &self,
        image: &ImageData,
        canvas: &CanvasRect,
        mut resolver: ColorResolver,
        options: &CompileOptions,
    ) -> StrokeMap {
        let mut extractor = ScanlineStrokeExtractor::new(&mut resolver)
            .ignore_background(options.flags.contains(DrawFlags::IGNORE_BACKGROUND))
            .with_progress(self.progress.clone());
        let extraction = extractor.extract(image, canvas, options.settings.pixel_step);
        build_stroke_map(&extraction, options.mode)
    }
}
