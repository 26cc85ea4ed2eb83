//! Typed configuration: compile settings, flags, mode and the screen tools
//! located by the (external) setup step.

use crate::error::{Result, StrokeError};
use crate::strokes::{CanvasRect, Color, Point};
use serde::{Deserialize, Serialize};
use std::fs;
use std::ops::BitOr;
use std::path::Path;
use std::time::Duration;

/// Smallest usable downsample block.
pub const MIN_PIXEL_STEP: u32 = 3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Duration of each stroke, in seconds.
    pub delay: f64,
    /// Downsample block size in canvas pixels.
    pub pixel_step: u32,
    /// Custom color quantization fidelity in `[0, 1]`.
    pub precision: f64,
    /// Extra settle time, in seconds, when consecutive strokes are far apart.
    pub jump_delay: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            delay: 0.05,
            pixel_step: 5,
            precision: 0.75,
            jump_delay: 0.5,
        }
    }
}

impl Settings {
    pub fn validate(&self) -> Result<()> {
        if self.pixel_step < MIN_PIXEL_STEP {
            return Err(StrokeError::invalid_settings(format!(
                "pixel_step must be at least {MIN_PIXEL_STEP}, got {}",
                self.pixel_step
            )));
        }
        if !(0.0..=1.0).contains(&self.precision) {
            return Err(StrokeError::invalid_settings(format!(
                "precision must be within [0, 1], got {}",
                self.precision
            )));
        }
        for (name, value) in [("delay", self.delay), ("jump_delay", self.jump_delay)] {
            if !value.is_finite() || value < 0.0 {
                return Err(StrokeError::invalid_settings(format!(
                    "{name} must be a non-negative number of seconds, got {value}"
                )));
            }
        }
        Ok(())
    }

    /// Zero for values `validate` would reject.
    pub fn stroke_delay(&self) -> Duration {
        Duration::try_from_secs_f64(self.delay).unwrap_or_default()
    }

    pub fn jump_delay(&self) -> Duration {
        Duration::try_from_secs_f64(self.jump_delay).unwrap_or_default()
    }
}

/// Feature flag bitmask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DrawFlags(u8);

impl DrawFlags {
    pub const NONE: DrawFlags = DrawFlags(0);
    pub const IGNORE_BACKGROUND: DrawFlags = DrawFlags(1);
    pub const CUSTOM_COLORS: DrawFlags = DrawFlags(2);

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn contains(self, other: DrawFlags) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn set(&mut self, other: DrawFlags, enabled: bool) {
        if enabled {
            self.0 |= other.0;
        } else {
            self.0 &= !other.0;
        }
    }
}

impl BitOr for DrawFlags {
    type Output = DrawFlags;

    fn bitor(self, rhs: DrawFlags) -> DrawFlags {
        DrawFlags(self.0 | rhs.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DrawMode {
    /// Raw per-row runs grouped by color in discovery order.
    Slotted,
    /// Frequency-ranked occlusion merging.
    #[default]
    Layered,
}

/// A selectable palette color and where to click it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Swatch {
    pub color: Color,
    pub position: Point,
}

/// Fixed palette, in the order the setup step found the swatches.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Palette {
    swatches: Vec<Swatch>,
}

impl Palette {
    pub fn new(swatches: Vec<Swatch>) -> Self {
        Self { swatches }
    }

    pub fn swatches(&self) -> &[Swatch] {
        &self.swatches
    }

    pub fn colors(&self) -> impl Iterator<Item = Color> + '_ {
        self.swatches.iter().map(|s| s.color)
    }

    pub fn position_of(&self, color: Color) -> Option<Point> {
        self.swatches
            .iter()
            .find(|s| s.color == color)
            .map(|s| s.position)
    }

    pub fn is_empty(&self) -> bool {
        self.swatches.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Modifier {
    Ctrl,
    Alt,
    Shift,
}

/// Optional "new layer" button clicked before each color switch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewLayerButton {
    pub enabled: bool,
    pub position: Point,
    #[serde(default)]
    pub modifiers: Vec<Modifier>,
}

/// Screen regions located by the setup step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolConfig {
    pub palette: Option<Palette>,
    pub canvas: Option<CanvasRect>,
    pub custom_colors: Option<CanvasRect>,
    pub new_layer: Option<NewLayerButton>,
}

impl ToolConfig {
    pub fn canvas(&self) -> Result<CanvasRect> {
        self.canvas.ok_or(StrokeError::NoCanvas)
    }

    pub fn palette(&self) -> Result<&Palette> {
        self.palette
            .as_ref()
            .filter(|p| !p.is_empty())
            .ok_or(StrokeError::NoPalette)
    }

    pub fn custom_colors(&self) -> Result<CanvasRect> {
        self.custom_colors.ok_or(StrokeError::NoCustomColors)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PausePolicy {
    /// Wait in place until resumed or cancelled.
    #[default]
    Block,
    /// Return `RunOutcome::Paused` and let a later call resume.
    Yield,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackSettings {
    /// Consecutive strokes farther apart than this get the jump delay.
    pub jump_threshold: f64,
    /// Seconds budgeted per color switch in the ETA.
    pub color_switch_overhead: f64,
    pub pause_policy: PausePolicy,
    /// Strokes drawn by a test draw.
    pub test_strokes: usize,
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            jump_threshold: 5.0,
            color_switch_overhead: 0.5,
            pause_policy: PausePolicy::Block,
            test_strokes: 20,
        }
    }
}

/// Everything persisted between sessions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub tools: ToolConfig,
    pub settings: Settings,
    pub flags: DrawFlags,
    pub mode: DrawMode,
    pub playback: PlaybackSettings,
}

impl AppConfig {
    pub fn from_path(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| {
            StrokeError::corrupt_config(format!("cannot read {}: {e}", path.display()))
        })?;
        let config: AppConfig = serde_json::from_str(&text).map_err(|e| {
            StrokeError::corrupt_config(format!("cannot parse {}: {e}", path.display()))
        })?;
        config.settings.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let text = serde_json::to_string_pretty(self)?;
        fs::write(path, text)?;
        Ok(())
    }
}
