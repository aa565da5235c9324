use eframe::egui::{Vec2, vec2};

const INITIAL_RADIUS: f32 = 10.0;

pub fn contains_ignore_case(text: &str, lowered_query: &str) -> bool {
    text.to_lowercase().contains(lowered_query)
}

/// Seed position for the `index`-th node, laid out on a sunflower spiral so
/// insertion order alone decides the starting layout.
pub fn phyllotaxis(index: usize, center: Vec2) -> Vec2 {
    let radius = INITIAL_RADIUS * (0.5 + index as f32).sqrt();
    let angle = index as f32 * std::f32::consts::PI * (3.0 - 5.0_f32.sqrt());
    center + vec2(angle.cos(), angle.sin()) * radius
}

/// Deterministic unit direction for separating two coincident points.
pub fn separation_direction(a: usize, b: usize) -> Vec2 {
    let angle = ((a as f32) * 0.618_034 + (b as f32) * 0.414_214 + 0.11) * std::f32::consts::TAU;
    vec2(angle.cos(), angle.sin())
}
