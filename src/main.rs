mod app;
mod input;
mod render;

use anyhow::{Context, Result};
use clap::Parser;
use pocketpet::config::{load_settings, project_paths};
use std::{fs::OpenOptions, path::PathBuf, sync::Mutex};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "pocketpet")]
#[command(about = "A virtual pet that lives in your terminal")]
struct Cli {
    /// Simulated seconds per real second
    #[arg(long)]
    speed: Option<f32>,

    /// Frame cap
    #[arg(long)]
    fps: Option<u32>,

    /// Seed for random reward events
    #[arg(long)]
    seed: Option<u64>,

    /// Store save data, settings and the log here instead of the user data dir
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Forget the current pet and start over
    #[arg(long, default_value_t = false)]
    reset: bool,

    /// Force monochrome
    #[arg(long, default_value_t = false)]
    no_color: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let paths = project_paths(cli.data_dir.as_deref())?;
    init_logging(&paths.log_path)?;

    let mut settings = load_settings(&paths.settings_path);
    if let Some(speed) = cli.speed {
        settings.speed = speed;
    }
    if let Some(fps) = cli.fps {
        settings.fps_cap = fps;
    }
    if let Some(seed) = cli.seed {
        settings.seed = seed;
    }
    if cli.no_color {
        settings.enable_color = false;
    }

    app::run(settings, paths, cli.reset)
}

/// The terminal belongs to the renderer, so logs go to a file.
fn init_logging(path: &std::path::Path) -> Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("opening log file {}", path.display()))?;
    let filter = EnvFilter::try_from_env("POCKETPET_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(false)
        .init();
    Ok(())
}
