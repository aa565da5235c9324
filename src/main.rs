mod app;
mod config;
mod engine;
mod error;
mod graph;
mod util;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use eframe::egui::vec2;
use env_logger::Env;
use log::info;

use crate::app::{GraphLensApp, LaunchOptions};
use crate::config::EngineConfig;
use crate::engine::{GraphEngine, TickOutcome};
use crate::graph::{DatasetSource, load_dataset};

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Graph dataset as JSON (`{"nodes": [...], "edges": [...]}`); the demo graph when omitted.
    dataset: Option<PathBuf>,
    /// Engine tuning as JSON; missing keys keep their defaults.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Initial filter query.
    #[arg(long, default_value = "")]
    filter: String,
    /// Render a PNG snapshot to this path and exit without opening a window.
    #[arg(long, value_name = "PATH")]
    export: Option<PathBuf>,
    /// Upper bound on layout ticks before a headless export.
    #[arg(long, default_value_t = 300)]
    settle_ticks: usize,
    /// Directory that the in-app export button writes to.
    #[arg(long, default_value = ".")]
    export_dir: PathBuf,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    let source = args
        .dataset
        .clone()
        .map_or(DatasetSource::Demo, DatasetSource::File);

    if let Some(output) = &args.export {
        return export_headless(&source, config, &args.filter, args.settle_ticks, output);
    }

    let options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default().with_inner_size([1280.0, 860.0]),
        ..Default::default()
    };
    let launch = LaunchOptions {
        source,
        config,
        filter: args.filter,
        export_dir: args.export_dir,
    };

    eframe::run_native(
        "graph-lens",
        options,
        Box::new(move |cc| Ok(Box::new(GraphLensApp::new(cc, launch)))),
    )
    .map_err(|error| anyhow!(error.to_string()))
}

fn export_headless(
    source: &DatasetSource,
    config: EngineConfig,
    filter: &str,
    settle_ticks: usize,
    output: &Path,
) -> Result<()> {
    let dataset = load_dataset(source)?;
    let viewport = vec2(config.export.min_width as f32, config.export.min_height as f32);
    let mut engine = GraphEngine::new(config, viewport);
    engine.set_dataset(dataset)?;
    engine.set_filter(filter);

    let handle = engine.tick_handle();
    let mut ticks = 0;
    while ticks < settle_ticks && engine.tick(handle) == TickOutcome::Advanced {
        ticks += 1;
    }
    info!(
        "layout ran {ticks} ticks, simulation {}",
        engine.simulation_state().label()
    );

    let snapshot = engine.export_snapshot()?;
    fs::write(output, &snapshot.png)
        .with_context(|| format!("failed to write {}", output.display()))?;
    info!(
        "wrote {}x{} snapshot to {}",
        snapshot.width,
        snapshot.height,
        output.display()
    );
    Ok(())
}
