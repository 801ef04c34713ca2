//! Binary entrypoint for reel.
//!
//! Delegates all logic to the library crate; no local modules here.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use tracing::{Level, info};
use tracing_subscriber::{EnvFilter, fmt};

use reel::catalog::Catalog;
use reel::config::{Configuration, LaunchOptions, Settings};
use reel::tasks::files::trash_for;
use reel::tasks::loader::ImageLoader;
use reel::tasks::viewer::run_windowed;

/// Keyboard-driven slideshow viewer
#[derive(Debug, Parser)]
#[command(name = "reel", version, about = "Keyboard-driven slideshow image viewer")]
struct Cli {
    /// Image files or directories (default: current directory)
    #[arg(value_name = "PATHS")]
    paths: Vec<PathBuf>,

    /// Only show images whose path matches this case-insensitive pattern
    #[arg(long, value_name = "PATTERN")]
    regex: Option<String>,

    /// Descend into subdirectories
    #[arg(short = 'r', long)]
    recurse: bool,

    /// Start in shuffle mode
    #[arg(short = 'R', long)]
    random: bool,

    /// Start fullscreen
    #[arg(short = 'f', long)]
    fullscreen: bool,

    /// Fit images to the window
    #[arg(short = 'z', long)]
    zoomed: bool,

    /// Start advancing automatically instead of paused
    #[arg(short = 'a', long)]
    auto: bool,

    /// Seconds each image stays up
    #[arg(short = 'd', long, value_name = "SECONDS")]
    delay: Option<f64>,

    /// Window geometry as WxH+X+Y
    #[arg(short = 'g', long, value_name = "WxH+X+Y")]
    geometry: Option<String>,

    /// Path to YAML config file
    #[arg(short = 'c', long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Reload when images under the roots change
    #[arg(short = 'w', long)]
    watch: bool,

    /// Increase log verbosity (repeatable)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    verbose: u8,
}

fn init_tracing(verbosity: u8) -> Result<()> {
    // map -v to log level
    let level = match verbosity {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let filter = EnvFilter::from_default_env()
        .add_directive(format!("reel={level}").parse()?)
        .add_directive("wgpu=warn".parse()?)
        .add_directive("winit=warn".parse()?);
    fmt().with_env_filter(filter).with_target(true).init();
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose)?;

    let cfg = match &cli.config {
        Some(path) => Configuration::from_yaml_file(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => Configuration::default(),
    }
    .validated()
    .context("validating configuration")?;

    let launch = LaunchOptions {
        paths: cli.paths,
        regex: cli.regex,
        recurse: cli.recurse,
        random: cli.random,
        fullscreen: cli.fullscreen,
        zoomed: cli.zoomed,
        auto: cli.auto,
        delay_secs: cli.delay,
        geometry: cli.geometry,
        watch: cli.watch,
    };
    let settings = Settings::resolve(cfg, launch)?;

    let build = Catalog::build(&settings.scan);
    if build.catalog.is_empty() {
        info!(skipped = build.skipped, "no images found; nothing to show");
        return Ok(());
    }
    info!(count = build.catalog.len(), skipped = build.skipped, "scanned images");

    run_windowed(
        &settings,
        build,
        ImageLoader,
        trash_for(settings.delete_mode),
    )
}
