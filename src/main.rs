mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{CacheCommand, Cli, Command, CompileArgs, PlayArgs, SourceArgs};
use img2strokes::{
    AppConfig, CompileOptions, Compiled, ExecutionController, LogTarget, Pipeline, StrokeCache,
    preview,
};
use std::path::Path;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{Layer, filter, fmt};

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    match cli.cmd {
        Command::Compile(args) => cmd_compile(&cli.config, &cli.cache_dir, args),
        Command::Play(args) => cmd_play(&cli.config, &cli.cache_dir, args),
        Command::Cache(cmd) => cmd_cache(&cli.cache_dir, cmd),
    }
}

fn init_logging(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => filter::LevelFilter::ERROR,
        (false, 0) => filter::LevelFilter::WARN,
        (false, 1) => filter::LevelFilter::INFO,
        (false, 2) => filter::LevelFilter::DEBUG,
        _ => filter::LevelFilter::TRACE,
    };
    let subscriber = tracing_subscriber::Registry::default().with(
        fmt::Layer::new()
            .with_target(false)
            .with_writer(std::io::stderr)
            .with_filter(level)
            .with_filter(filter::filter_fn(|metadata| {
                metadata.target().starts_with("img2strokes")
            })),
    );

    if let Err(err) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("logging disabled: {err}");
    }
}

fn load_config(path: &Path, source: &SourceArgs) -> Result<AppConfig> {
    let mut config = if path.exists() {
        AppConfig::from_path(path)
            .with_context(|| format!("load config '{}'", path.display()))?
    } else {
        tracing::debug!(path = %path.display(), "no config file, using defaults");
        AppConfig::default()
    };
    source.overrides.apply(&mut config);
    Ok(config)
}

fn compile(config_path: &Path, cache_dir: &Path, source: &SourceArgs) -> Result<(AppConfig, Compiled)> {
    let config = load_config(config_path, source)?;
    let bytes = std::fs::read(&source.input)
        .with_context(|| format!("read image '{}'", source.input.display()))?;

    let mut pipeline = Pipeline::new(config.tools.clone());
    if !source.no_cache {
        pipeline = pipeline.with_cache(StrokeCache::new(cache_dir));
    }
    let compiled = pipeline
        .compile(&bytes, &CompileOptions::from(&config))
        .with_context(|| format!("compile '{}'", source.input.display()))?;
    Ok((config, compiled))
}

fn controller_for(config: &AppConfig) -> ExecutionController {
    ExecutionController::new(
        config.settings.clone(),
        config.playback.clone(),
        config.tools.clone(),
    )
}

fn cmd_compile(config_path: &Path, cache_dir: &Path, args: CompileArgs) -> Result<()> {
    let (config, compiled) = compile(config_path, cache_dir, &args.source)?;
    let strokes = &compiled.strokes;

    println!(
        "{}: {} colors, {} strokes{}",
        args.source.input.display(),
        strokes.len(),
        strokes.total_strokes(),
        if compiled.from_cache { " (cached)" } else { "" }
    );
    println!("Estimated drawing time: {}", controller_for(&config).estimate(strokes));

    if let Some(out) = &args.preview {
        let canvas = config.tools.canvas()?;
        let step = config.settings.pixel_step;
        let is_svg = out
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("svg"));
        let written = if is_svg {
            preview::save_svg(strokes, &canvas, step, out)
        } else {
            preview::save_png(strokes, &canvas, step, out)
        };
        written.with_context(|| format!("write preview '{}'", out.display()))?;
        println!("Preview written to {}", out.display());
    }
    Ok(())
}

fn cmd_play(config_path: &Path, cache_dir: &Path, args: PlayArgs) -> Result<()> {
    let (config, compiled) = compile(config_path, cache_dir, &args.source)?;
    let limit = args
        .max_strokes
        .or(args.test.then_some(config.playback.test_strokes));

    let mut controller = controller_for(&config);
    let mut target = LogTarget::default();
    let outcome = match limit {
        Some(max) => controller.test_draw(&compiled.strokes, &mut target, max),
        None => controller.run(&compiled.strokes, &mut target),
    }
    .context("playback")?;

    let progress = controller.handle().progress();
    println!(
        "{outcome:?}: {}/{} strokes, {} input actions in {:.1}s",
        progress.completed,
        progress.total,
        target.actions,
        progress.elapsed.as_secs_f64()
    );
    Ok(())
}

fn cmd_cache(cache_dir: &Path, cmd: CacheCommand) -> Result<()> {
    let cache = StrokeCache::new(cache_dir);
    match cmd {
        CacheCommand::Clear => {
            cache
                .clear()
                .with_context(|| format!("clear cache '{}'", cache_dir.display()))?;
            println!("Cleared {}", cache_dir.display());
        }
        CacheCommand::Purge => {
            let removed = cache
                .purge_stale()
                .with_context(|| format!("purge cache '{}'", cache_dir.display()))?;
            println!("Removed {removed} stale entries");
        }
    }
    Ok(())
}
