use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use img2strokes::{AppConfig, CanvasRect, DrawFlags, DrawMode};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "img2strokes")]
#[command(about = "Compile images into brush strokes and play them back")]
#[command(version)]
pub struct Cli {
    /// Configuration file (JSON); defaults are used when it does not exist
    #[arg(short, long, global = true, default_value = "img2strokes.json")]
    pub config: PathBuf,

    /// Directory holding compiled stroke maps
    #[arg(long, global = true, default_value = "cache")]
    pub cache_dir: PathBuf,

    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Compile an image and report colors, strokes and estimated time.
    Compile(CompileArgs),
    /// Compile (or load from cache) and replay through a dry-run target.
    Play(PlayArgs),
    /// Cache maintenance.
    #[command(subcommand)]
    Cache(CacheCommand),
}

#[derive(Subcommand, Debug)]
pub enum CacheCommand {
    /// Remove the whole cache directory.
    Clear,
    /// Delete expired or unreadable entries.
    Purge,
}

#[derive(Args, Debug)]
pub struct SourceArgs {
    /// Input image file
    pub input: PathBuf,

    /// Do not read or write the stroke cache
    #[arg(long)]
    pub no_cache: bool,

    #[command(flatten)]
    pub overrides: Overrides,
}

#[derive(Args, Debug)]
pub struct CompileArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Write a preview of the strokes (.svg, anything else is rendered as PNG)
    #[arg(short, long)]
    pub preview: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct PlayArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Stop after this many strokes
    #[arg(long)]
    pub max_strokes: Option<usize>,

    /// Test draw: stop after the configured number of test strokes
    #[arg(short, long, conflicts_with = "max_strokes")]
    pub test: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ModeArg {
    Slotted,
    Layered,
}

impl From<ModeArg> for DrawMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Slotted => DrawMode::Slotted,
            ModeArg::Layered => DrawMode::Layered,
        }
    }
}

/// Command-line values that take precedence over the config file.
#[derive(Args, Debug, Default)]
pub struct Overrides {
    /// Canvas rectangle on screen as x,y,width,height
    #[arg(long, value_parser = parse_rect)]
    pub canvas: Option<CanvasRect>,

    /// Grid cell size in screen pixels (>= 3)
    #[arg(short = 's', long)]
    pub pixel_step: Option<u32>,

    /// Quantization precision for custom colors (0.0-1.0)
    #[arg(long)]
    pub precision: Option<f64>,

    /// Seconds per stroke
    #[arg(long)]
    pub delay: Option<f64>,

    /// Settle time before a long cursor jump, in seconds
    #[arg(long)]
    pub jump_delay: Option<f64>,

    #[arg(short, long, value_enum)]
    pub mode: Option<ModeArg>,

    /// Skip white runs
    #[arg(long)]
    pub ignore_background: bool,

    /// Quantize freely instead of snapping to the palette
    #[arg(long)]
    pub custom_colors: bool,
}

impl Overrides {
    pub fn apply(&self, config: &mut AppConfig) {
        if let Some(canvas) = self.canvas {
            config.tools.canvas = Some(canvas);
        }
        if let Some(step) = self.pixel_step {
            config.settings.pixel_step = step;
        }
        if let Some(precision) = self.precision {
            config.settings.precision = precision;
        }
        if let Some(delay) = self.delay {
            config.settings.delay = delay;
        }
        if let Some(jump_delay) = self.jump_delay {
            config.settings.jump_delay = jump_delay;
        }
        if let Some(mode) = self.mode {
            config.mode = mode.into();
        }
        if self.ignore_background {
            config.flags.set(DrawFlags::IGNORE_BACKGROUND, true);
        }
        if self.custom_colors {
            config.flags.set(DrawFlags::CUSTOM_COLORS, true);
        }
    }
}

fn parse_rect(text: &str) -> Result<CanvasRect, String> {
    let parts: Vec<&str> = text.split(',').map(str::trim).collect();
    let [x, y, w, h] = parts[..] else {
        return Err(format!("expected x,y,width,height, got `{text}`"));
    };
    let coord = |s: &str| s.parse::<i32>().map_err(|e| format!("`{s}`: {e}"));
    let size = |s: &str| s.parse::<u32>().map_err(|e| format!("`{s}`: {e}"));
    Ok(CanvasRect::new(coord(x)?, coord(y)?, size(w)?, size(h)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rect() {
        assert_eq!(parse_rect("10, 20,300,200"), Ok(CanvasRect::new(10, 20, 300, 200)));
        assert!(parse_rect("10,20,300").is_err());
        assert!(parse_rect("10,20,-3,4").is_err());
    }

    #[test]
    fn test_overrides_take_precedence() {
        let cli = Cli::parse_from([
            "img2strokes",
            "compile",
            "in.png",
            "--canvas",
            "0,0,50,40",
            "-s",
            "7",
            "--mode",
            "slotted",
            "--ignore-background",
        ]);
        let Command::Compile(args) = cli.cmd else {
            panic!("expected compile");
        };
        let mut config = AppConfig::default();
        args.source.overrides.apply(&mut config);

        assert_eq!(config.tools.canvas, Some(CanvasRect::new(0, 0, 50, 40)));
        assert_eq!(config.settings.pixel_step, 7);
        assert_eq!(config.mode, DrawMode::Slotted);
        assert!(config.flags.contains(DrawFlags::IGNORE_BACKGROUND));
        assert!(!config.flags.contains(DrawFlags::CUSTOM_COLORS));
        assert_eq!(config.settings.delay, AppConfig::default().settings.delay);
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::parse_from(["img2strokes", "cache", "purge", "-vv", "--cache-dir", "/tmp/c"]);
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.cache_dir, PathBuf::from("/tmp/c"));
        assert!(matches!(cli.cmd, Command::Cache(CacheCommand::Purge)));
    }
}
