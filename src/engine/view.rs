use eframe::egui::{Pos2, Vec2, pos2};
use log::{debug, warn};

use super::GraphEngine;
use crate::error::{GraphError, Result};

/// World to viewport mapping: `screen = translate + world * scale`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewTransform {
    pub translate: Vec2,
    pub scale: f32,
}

impl Default for ViewTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl ViewTransform {
    pub const IDENTITY: Self = Self {
        translate: Vec2::ZERO,
        scale: 1.0,
    };

    pub fn world_to_screen(self, world: Vec2) -> Pos2 {
        (self.translate + world * self.scale).to_pos2()
    }

    pub fn screen_to_world(self, screen: Pos2) -> Vec2 {
        (screen.to_vec2() - self.translate) / self.scale
    }

    /// Rescales around `anchor` so the world point under it stays put.
    fn zoom_around(&mut self, anchor: Pos2, factor: f32, min_scale: f32, max_scale: f32) {
        let world = self.screen_to_world(anchor);
        self.scale = (self.scale * factor).clamp(min_scale, max_scale);
        self.translate = anchor.to_vec2() - world * self.scale;
    }
}

impl GraphEngine {
    pub fn view(&self) -> ViewTransform {
        self.view
    }

    /// Toolbar zoom, anchored at the viewport center.
    pub fn zoom_by(&mut self, factor: f32) {
        self.zoom_at(pos2(self.viewport.x * 0.5, self.viewport.y * 0.5), factor);
    }

    /// Wheel or pinch zoom, anchored at the pointer.
    pub fn zoom_at(&mut self, screen: Pos2, factor: f32) {
        if self.detached || !factor.is_finite() || factor <= 0.0 {
            return;
        }
        let view = self.config.view;
        self.view
            .zoom_around(screen, factor, view.min_scale, view.max_scale);
    }

    pub fn zoom_in(&mut self) {
        self.zoom_by(self.config.view.zoom_in_factor);
    }

    pub fn zoom_out(&mut self) {
        self.zoom_by(self.config.view.zoom_out_factor);
    }

    pub fn pan_by(&mut self, delta: Vec2) {
        if self.detached || !delta.is_finite() {
            return;
        }
        self.view.translate += delta;
    }

    pub fn reset_view(&mut self) {
        if self.detached {
            return;
        }
        self.view = ViewTransform::IDENTITY;
    }

    pub fn resize(&mut self, viewport: Vec2) {
        if self.detached || !viewport.is_finite() || viewport.min_elem() <= 0.0 {
            return;
        }
        self.viewport = viewport;
    }

    /// Centers the visible drawing and scales it to fill most of the viewport.
    /// A drawing without area leaves the view untouched.
    pub fn fit_to_view(&mut self) -> Result<()> {
        if self.detached {
            return Err(GraphError::Detached);
        }

        let bounds = self
            .draw_list(false)
            .bounds()
            .filter(|bounds| bounds.width() > 0.0 && bounds.height() > 0.0);
        let Some(bounds) = bounds else {
            warn!("fit to view skipped: layout has no area");
            return Err(GraphError::DegenerateLayout);
        };

        let view = self.config.view;
        let fill = (bounds.width() / self.viewport.x).max(bounds.height() / self.viewport.y);
        let scale = (view.fit_fill / fill).clamp(view.min_scale, view.max_scale);
        self.view = ViewTransform {
            translate: self.viewport * 0.5 - bounds.center().to_vec2() * scale,
            scale,
        };
        debug!("fit to view at scale {scale:.3}");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use eframe::egui::vec2;

    use super::*;
    use crate::config::EngineConfig;
    use crate::graph::{GraphDataset, Node};

    fn engine_with(nodes: Vec<Node>) -> GraphEngine {
        let mut engine = GraphEngine::new(EngineConfig::default(), vec2(900.0, 600.0));
        engine
            .set_dataset(GraphDataset {
                nodes,
                edges: Vec::new(),
            })
            .unwrap();
        engine
    }

    #[test]
    fn transform_round_trips_points() {
        let view = ViewTransform {
            translate: vec2(40.0, -12.0),
            scale: 2.5,
        };
        let world = vec2(13.0, 7.0);

        let screen = view.world_to_screen(world);
        assert_eq!(screen, pos2(72.5, 5.5));
        assert!((view.screen_to_world(screen) - world).length() < 1e-5);
    }

    #[test]
    fn repeated_zoom_multiplies_and_clamps() {
        let mut engine = engine_with(vec![Node::new(1, "A")]);

        engine.zoom_by(1.2);
        engine.zoom_by(1.2);
        assert!((engine.view().scale - 1.44).abs() < 1e-5);

        for _ in 0..20 {
            engine.zoom_in();
        }
        assert_eq!(engine.view().scale, 3.0);

        for _ in 0..40 {
            engine.zoom_out();
        }
        assert_eq!(engine.view().scale, 0.3);
    }

    #[test]
    fn zoom_keeps_anchor_fixed_and_never_moves_nodes() {
        let mut engine = engine_with(vec![Node::new(1, "A"), Node::new(2, "B")]);
        let before = engine.node_position(1);
        let anchor = pos2(120.0, 80.0);
        let world = engine.view().screen_to_world(anchor);

        engine.zoom_at(anchor, 1.7);
        engine.pan_by(vec2(5.0, 5.0));
        engine.pan_by(vec2(-5.0, -5.0));

        assert!((engine.view().world_to_screen(world) - anchor).length() < 1e-3);
        assert_eq!(engine.node_position(1), before);
    }

    #[test]
    fn fit_centers_content_and_reset_restores_identity() {
        let mut engine = engine_with(vec![
            Node::new(1, "A").pinned_at(0.0, 0.0),
            Node::new(2, "B").pinned_at(400.0, 200.0),
        ]);

        engine.fit_to_view().unwrap();
        let view = engine.view();
        let bounds = engine.draw_list(false).bounds().unwrap();
        let center = view.world_to_screen(bounds.center().to_vec2());
        assert!((center - pos2(450.0, 300.0)).length() < 1e-2);
        assert!(bounds.width() * view.scale <= 900.0 * 0.85 + 1e-2);

        engine.reset_view();
        assert_eq!(engine.view(), ViewTransform::IDENTITY);
    }

    #[test]
    fn fit_on_empty_graph_is_degenerate() {
        let mut engine = engine_with(Vec::new());
        engine.zoom_by(2.0);

        assert!(matches!(
            engine.fit_to_view(),
            Err(GraphError::DegenerateLayout)
        ));
        assert_eq!(engine.view().scale, 2.0);
    }

    #[test]
    fn fit_scale_respects_zoom_range() {
        let mut engine = engine_with(vec![
            Node::new(1, "A").pinned_at(0.0, 0.0),
            Node::new(2, "B").pinned_at(10_000.0, 0.0),
        ]);

        engine.fit_to_view().unwrap();
        assert_eq!(engine.view().scale, 0.3);
    }
}
