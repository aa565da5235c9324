use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;

use eframe::egui::{self, Context};
use log::{error, warn};

use crate::config::EngineConfig;
use crate::engine::{GraphEngine, TickHandle};
use crate::graph::{DatasetSource, GraphDataset, load_dataset};

mod graph;
mod render_utils;
mod ui;

/// Startup options handed over from the command line.
pub struct LaunchOptions {
    pub source: DatasetSource,
    pub config: EngineConfig,
    pub filter: String,
    pub export_dir: PathBuf,
}

type LoadResult = Result<GraphDataset, String>;

pub struct GraphLensApp {
    options: LaunchOptions,
    state: AppState,
    reload_rx: Option<Receiver<LoadResult>>,
}

enum AppState {
    Loading { rx: Receiver<LoadResult> },
    Ready(Box<ViewModel>),
    Error(String),
}

struct ViewModel {
    engine: GraphEngine,
    tick_handle: TickHandle,
    filter_text: String,
    export_dir: PathBuf,
    status: Option<Status>,
    fit_pending: bool,
}

enum Status {
    Info(String),
    Error(String),
}

impl GraphLensApp {
    pub fn new(cc: &eframe::CreationContext<'_>, options: LaunchOptions) -> Self {
        cc.egui_ctx.set_visuals(egui::Visuals::light());
        let state = Self::start_load(options.source.clone());
        Self {
            options,
            state,
            reload_rx: None,
        }
    }

    fn spawn_load(source: DatasetSource) -> Receiver<LoadResult> {
        let (tx, rx) = mpsc::channel();

        thread::spawn(move || {
            let result = load_dataset(&source).map_err(|error| format!("{error:#}"));
            let _ = tx.send(result);
        });

        rx
    }

    fn start_load(source: DatasetSource) -> AppState {
        AppState::Loading {
            rx: Self::spawn_load(source),
        }
    }

    fn first_view(&self, dataset: GraphDataset) -> AppState {
        match ViewModel::new(&self.options, dataset) {
            Ok(model) => AppState::Ready(Box::new(model)),
            Err(error) => {
                error!("{error}");
                AppState::Error(error.to_string())
            }
        }
    }
}

impl eframe::App for GraphLensApp {
    fn update(&mut self, ctx: &Context, _frame: &mut eframe::Frame) {
        let mut transition = None;
        let mut retry = false;

        match &mut self.state {
            AppState::Loading { rx } => {
                match rx.try_recv() {
                    Ok(result) => transition = Some(result),
                    Err(TryRecvError::Empty) => ctx.request_repaint(),
                    Err(TryRecvError::Disconnected) => {
                        transition = Some(Err("Background load worker disconnected".to_owned()));
                    }
                }

                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.vertical_centered(|ui| {
                        ui.add_space(120.0);
                        ui.heading(format!("Loading {}...", self.options.source.describe()));
                        ui.add_space(8.0);
                        ui.spinner();
                    });
                });
            }
            AppState::Error(message) => {
                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.heading("Failed to load graph dataset");
                    ui.add_space(6.0);
                    ui.label(message.as_str());
                    ui.add_space(10.0);
                    retry = ui.button("Retry").clicked();
                });
            }
            AppState::Ready(model) => {
                let mut reload_requested = false;
                let is_reloading = self.reload_rx.is_some();
                model.show(
                    ctx,
                    &self.options.source,
                    &mut reload_requested,
                    is_reloading,
                );

                if reload_requested && self.reload_rx.is_none() {
                    self.reload_rx = Some(Self::spawn_load(self.options.source.clone()));
                }

                if let Some(rx) = self.reload_rx.take() {
                    match rx.try_recv() {
                        Ok(Ok(dataset)) => model.replace_dataset(dataset),
                        Ok(Err(message)) => {
                            warn!("reload failed: {message}");
                            model.status = Some(Status::Error(message));
                        }
                        Err(TryRecvError::Empty) => {
                            self.reload_rx = Some(rx);
                            ctx.request_repaint();
                        }
                        Err(TryRecvError::Disconnected) => {
                            model.status = Some(Status::Error(
                                "Background load worker disconnected".to_owned(),
                            ));
                        }
                    }
                }
            }
        }

        if retry {
            self.state = Self::start_load(self.options.source.clone());
        }

        if let Some(result) = transition {
            self.state = match result {
                Ok(dataset) => self.first_view(dataset),
                Err(message) => {
                    error!("{message}");
                    AppState::Error(message)
                }
            };
        }
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        if let AppState::Ready(model) = &mut self.state {
            model.engine.detach();
        }
    }
}
