mod analysis;
mod app;
mod color;
mod config;
mod context;
mod data;
mod remote;
mod router;
mod state;
mod terminal;
mod ui;

use std::path::PathBuf;

use anyhow::{anyhow, Result};
use clap::Parser;
use eframe::egui;

use app::NfeAnalystApp;
use config::Config;
use context::AnalystContext;
use state::AppState;

#[derive(Parser)]
#[command(name = "nfe-analyst", version)]
#[command(about = "Load NF-e invoice tables and ask questions about them")]
struct Cli {
    /// Run the text menu instead of opening a window
    #[arg(long)]
    terminal: bool,

    /// CSV, ZIP, JSON or Parquet files to load at startup
    files: Vec<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = Config::from_env()?;
    let mut analyst = AnalystContext::from_config(&config)?;

    if cli.terminal {
        for path in &cli.files {
            if let Err(e) = analyst.ingest(path) {
                log::error!("Failed to load {}: {e:#}", path.display());
            }
        }
        terminal::run(&mut analyst)?;
        return Ok(());
    }

    let mut state = AppState::new(analyst);
    for path in &cli.files {
        state.open_path(path);
    }

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1400.0, 850.0])
            .with_min_inner_size([800.0, 500.0])
            .with_drag_and_drop(true),
        ..Default::default()
    };

    eframe::run_native(
        "Sistema Especialista em NF-e",
        options,
        Box::new(|_cc| Ok(Box::new(NfeAnalystApp::new(state)))),
    )
    .map_err(|e| anyhow!("{e}"))
}
