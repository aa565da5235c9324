use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub simulation: SimulationConfig,
    pub view: ViewConfig,
    pub style: StyleConfig,
    pub export: ExportConfig,
}

impl EngineConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("invalid engine config in {}", path.display()))
    }
}

#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub link_distance: f32,
    pub link_strength: f32,
    pub charge_strength: f32,
    pub charge_distance_min: f32,
    pub center_strength: f32,
    pub collision_radius: f32,
    pub collision_strength: f32,
    pub velocity_decay: f32,
    pub alpha_decay: f32,
    pub alpha_min: f32,
    pub drag_alpha_target: f32,
    pub resume_alpha: f32,
    pub pin_reheat_alpha: f32,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            link_distance: 90.0,
            link_strength: 0.15,
            charge_strength: -120.0,
            charge_distance_min: 1.0,
            center_strength: 1.0,
            collision_radius: 24.0,
            collision_strength: 1.0,
            velocity_decay: 0.6,
            alpha_decay: 0.03,
            alpha_min: 0.001,
            drag_alpha_target: 0.2,
            resume_alpha: 0.7,
            pin_reheat_alpha: 0.3,
        }
    }
}

#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(default)]
pub struct ViewConfig {
    pub min_scale: f32,
    pub max_scale: f32,
    pub zoom_in_factor: f32,
    pub zoom_out_factor: f32,
    pub fit_fill: f32,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            min_scale: 0.3,
            max_scale: 3.0,
            zoom_in_factor: 1.2,
            zoom_out_factor: 0.8,
            fit_fill: 0.85,
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct StyleConfig {
    pub node_radius: f32,
    pub hover_radius: f32,
    pub node_stroke_width: f32,
    pub edge_width: f32,
    pub arrow_size: f32,
    pub label_size: f32,
    pub label_offset: f32,
    pub edge_label_size: f32,
    pub show_edge_labels: bool,
    /// Seconds for the hover radius to ease in or out.
    pub hover_transition_secs: f32,
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            node_radius: 14.0,
            hover_radius: 16.0,
            node_stroke_width: 2.0,
            edge_width: 1.5,
            arrow_size: 6.0,
            label_size: 12.0,
            label_offset: 18.0,
            edge_label_size: 10.0,
            show_edge_labels: false,
            hover_transition_secs: 0.25,
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub min_width: u32,
    pub min_height: u32,
    pub padding: f32,
    pub background: String,
    pub file_name: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            min_width: 800,
            min_height: 600,
            padding: 32.0,
            background: "#ffffff".to_owned(),
            file_name: "graph.png".to_owned(),
        }
    }
}
