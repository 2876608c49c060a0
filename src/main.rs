//! Rockfall — local multiplayer rock-dodging survival game in the terminal.

mod app;
mod game;
mod grid;
mod input;
mod player;
mod theme;
mod ui;

use anyhow::{Context, Result};
use app::App;
use clap::{Parser, ValueEnum};
use log::warn;
use std::path::{Path, PathBuf};

fn main() -> Result<()> {
    let args = Args::parse();
    if let Some(path) = args.log_file.as_deref() {
        init_logging(path)?;
    }
    let theme = theme::Theme::load(args.theme.as_deref(), args.palette).unwrap_or_else(|e| {
        warn!("theme not loaded, using defaults: {e}");
        let mut t = theme::Theme::default();
        t.apply_palette(args.palette);
        t
    });
    let mut app = App::new(args, theme)?;
    app.run()?;
    Ok(())
}

/// The terminal is owned by the game, so logs only go to a file.
fn init_logging(path: &Path) -> Result<()> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("failed to create log file {}", path.display()))?;
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Pipe(Box::new(file)))
        .try_init()
        .context("failed to initialise logger")?;
    Ok(())
}

/// Local multiplayer survival on a 10x10 grid.
#[derive(Debug, Parser)]
#[command(
    name = "rockfall",
    version,
    about = "Dodge rocks on a 10x10 grid with up to three players on one keyboard.",
    long_about = "Rockfall is a local multiplayer survival game in the terminal.\n\n\
        Rocks enter from the top row and the left column and travel down or right one \
        cell per tick (200 ms). A rock landing on a player eliminates them. The round ends \
        when everyone is out.\n\n\
        CONTROLS:\n  Player 1   W A S D     Player 2   Arrow keys     Player 3   I J K L\n  \
        P          Pause       R          Restart        Q / Esc    Quit\n\n\
        Hold a direction to keep moving. Terminals that support the kitty keyboard protocol \
        report key releases; elsewhere each press or key repeat moves once."
)]
pub struct Args {
    /// Number of players (1-3).
    #[arg(short, long, default_value = "3", value_parser = clap::value_parser!(u8).range(1..=3))]
    pub players: u8,

    /// Seed for rock spawns and player placement; same seed, same rocks.
    #[arg(short, long, value_name = "N")]
    pub seed: Option<u64>,

    /// Path to theme file (btop-style theme[key]=\"value\").
    #[arg(short, long, value_name = "FILE")]
    pub theme: Option<PathBuf>,

    /// Player colour palette: normal, high-contrast, or colorblind.
    #[arg(long, default_value = "normal")]
    pub palette: Palette,

    /// Target render frames per second.
    #[arg(long, default_value = "60.0", value_name = "RATE")]
    pub frame_rate: f64,

    /// Disable the game over fade.
    #[arg(long)]
    pub no_animation: bool,

    /// Write logs to this file (filter with RUST_LOG, default info).
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Palette {
    #[default]
    Normal,

    #[value(alias = "highcontrast", alias = "contrast")]
    HighContrast,

    #[value(alias = "colourblind")]
    Colorblind,
}
