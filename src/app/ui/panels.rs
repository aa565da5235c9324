use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use eframe::egui::{self, Align, Color32, Context, Layout, RichText, TextEdit};
use log::{error, info, warn};

use crate::engine::{GraphEngine, SimulationState, Snapshot};
use crate::error::GraphError;
use crate::graph::{DatasetSource, GraphDataset};

use super::super::{LaunchOptions, Status, ViewModel};

const INTERACTION_TIP: &str =
    "Drag a node to move it; hold Shift while releasing to pin it. Right-click a pinned node to release it.";

impl ViewModel {
    pub(in crate::app) fn new(options: &LaunchOptions, dataset: GraphDataset) -> Result<Self, GraphError> {
        let config = options.config.clone();
        let viewport = egui::vec2(config.export.min_width as f32, config.export.min_height as f32);
        let mut engine = GraphEngine::new(config, viewport);
        engine.set_filter(&options.filter);
        let dangling = engine.set_dataset(dataset)?;

        let status = (!dangling.is_empty()).then(|| {
            Status::Info(format!("Dropped {} edge(s) pointing at unknown nodes", dangling.len()))
        });

        Ok(Self {
            tick_handle: engine.tick_handle(),
            engine,
            filter_text: options.filter.clone(),
            export_dir: options.export_dir.clone(),
            status,
            fit_pending: true,
        })
    }

    /// Swaps in a reloaded dataset. A rejected dataset leaves the current
    /// graph on screen and reports the reason in the top bar.
    pub(in crate::app) fn replace_dataset(&mut self, dataset: GraphDataset) {
        match self.engine.set_dataset(dataset) {
            Ok(dangling) => {
                self.tick_handle = self.engine.tick_handle();
                self.status = Some(Status::Info(if dangling.is_empty() {
                    "Dataset reloaded".to_owned()
                } else {
                    format!(
                        "Dataset reloaded; dropped {} edge(s) pointing at unknown nodes",
                        dangling.len()
                    )
                }));
            }
            Err(error) if error.is_malformed_dataset() => {
                self.status = Some(Status::Error(format!(
                    "Reload rejected, keeping the previous graph: {error}"
                )));
            }
            Err(error) => {
                self.status = Some(Status::Error(format!("Reload failed: {error}")));
            }
        }
    }

    fn export_png(&mut self) {
        match self.write_snapshot() {
            Ok(path) => {
                info!("saved snapshot to {}", path.display());
                self.status = Some(Status::Info(format!("Saved {}", path.display())));
            }
            Err(export_error) => {
                error!("export failed: {export_error:#}");
                self.status = Some(Status::Error(format!("Export failed: {export_error:#}")));
            }
        }
    }

    fn write_snapshot(&self) -> Result<PathBuf> {
        let snapshot = self.engine.export_snapshot()?;
        save_snapshot(&snapshot, &self.export_dir)
    }

    fn visible_graph_text(&self) -> String {
        let scene = self.engine.scene();
        let graph = self.engine.graph();
        let mut text = format!(
            "nodes {}/{}  edges {}/{}",
            scene.node_count(),
            graph.node_count(),
            scene.edge_count(),
            graph.edge_count()
        );
        if scene.edge_label_count() > 0 {
            text.push_str(&format!("  edge labels {}", scene.edge_label_count()));
        }
        text
    }

    fn simulation_text(&self) -> String {
        let simulation = self.engine.simulation();
        match simulation.state() {
            SimulationState::Running if simulation.alpha_target() > 0.0 => {
                format!("running (alpha {:.3}, held warm)", simulation.alpha())
            }
            SimulationState::Running => format!("running (alpha {:.3})", simulation.alpha()),
            state => state.label().to_owned(),
        }
    }

    fn draw_toolbar(&mut self, ui: &mut egui::Ui, reload_requested: &mut bool, is_reloading: bool) {
        if ui.button("Zoom in").clicked() {
            self.engine.zoom_in();
        }
        if ui.button("Zoom out").clicked() {
            self.engine.zoom_out();
        }
        if ui.button("Fit").clicked()
            && let Err(fit_error) = self.engine.fit_to_view()
        {
            warn!("fit to view: {fit_error}");
            self.status = Some(Status::Info(match fit_error {
                GraphError::DegenerateLayout => "Nothing to fit yet".to_owned(),
                other => other.to_string(),
            }));
        }
        if ui.button("Reset view").clicked() {
            self.engine.reset_view();
        }

        ui.separator();

        let paused = self.engine.simulation_state() == SimulationState::Paused;
        if ui.button(if paused { "Resume" } else { "Pause" }).clicked() {
            self.engine.toggle_running();
            self.tick_handle = self.engine.tick_handle();
        }
        if ui.button("Clear pins").clicked() {
            let released = self.engine.clear_pins();
            self.status = Some(Status::Info(format!("Released {released} pinned node(s)")));
        }
        if ui.button("Export PNG").clicked() {
            self.export_png();
        }
        let reload_button = ui.add_enabled(!is_reloading, egui::Button::new("Reload"));
        if reload_button.clicked() {
            *reload_requested = true;
        }

        ui.separator();

        let filter = ui.add(
            TextEdit::singleline(&mut self.filter_text)
                .hint_text("Filter by label, type or id")
                .desired_width(220.0),
        );
        if filter.changed() {
            self.engine.set_filter(&self.filter_text);
        }
    }

    pub(in crate::app) fn show(
        &mut self,
        ctx: &Context,
        source: &DatasetSource,
        reload_requested: &mut bool,
        is_reloading: bool,
    ) {
        egui::TopBottomPanel::top("top_bar")
            .resizable(false)
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.heading("graph-lens");
                    ui.separator();
                    ui.label(source.describe());
                    ui.separator();
                    self.draw_toolbar(ui, reload_requested, is_reloading);
                    ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                        ui.label(self.visible_graph_text());
                        ui.separator();
                        ui.label(self.simulation_text());
                    });
                });

                if let Some(status) = &self.status {
                    let text = match status {
                        Status::Info(message) => RichText::new(message),
                        Status::Error(message) => {
                            RichText::new(message).color(Color32::from_rgb(0xdc, 0x26, 0x26))
                        }
                    };
                    ui.label(text);
                }
            });

        egui::TopBottomPanel::bottom("hints")
            .resizable(false)
            .show(ctx, |ui| {
                ui.small(INTERACTION_TIP);
            });

        egui::CentralPanel::default()
            .frame(egui::Frame::NONE)
            .show(ctx, |ui| {
                if is_reloading {
                    ctx.request_repaint();
                }
                self.draw_graph(ui);
            });
    }
}

fn save_snapshot(snapshot: &Snapshot, dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;
    let path = dir.join(&snapshot.file_name);
    fs::write(&path, &snapshot.png).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(path)
}
