use eframe::egui::{self, Align2, FontId, Sense, Shape, Stroke, Ui};
use log::{debug, warn};

use crate::engine::{Primitive, TickOutcome};
use crate::error::GraphError;

use super::super::ViewModel;
use super::super::render_utils::{circle_visible, draw_background, edge_visible, world_to_canvas};

impl ViewModel {
    fn advance_simulation(&mut self, ui: &Ui) {
        match self.engine.tick(self.tick_handle) {
            TickOutcome::Advanced => ui.ctx().request_repaint(),
            TickOutcome::Stale => {
                debug!("tick handle retired, taking over the current loop");
                self.tick_handle = self.engine.tick_handle();
                ui.ctx().request_repaint();
            }
            TickOutcome::Idle | TickOutcome::Paused => {}
        }

        let dt = ui.input(|input| input.stable_dt).clamp(1.0 / 240.0, 1.0 / 20.0);
        if self.engine.animate(dt) || self.engine.is_dragging() {
            ui.ctx().request_repaint();
        }
    }

    pub(in crate::app) fn draw_graph(&mut self, ui: &mut Ui) {
        let (rect, response) = ui.allocate_exact_size(ui.available_size(), Sense::click_and_drag());
        self.engine.resize(rect.size());

        if self.fit_pending && self.engine.simulation().alpha() < 0.3 {
            self.fit_pending = false;
            match self.engine.fit_to_view() {
                Ok(()) => {}
                Err(GraphError::DegenerateLayout) => debug!("initial fit skipped, nothing visible yet"),
                Err(fit_error) => warn!("initial fit to view failed: {fit_error}"),
            }
        }

        self.handle_graph_zoom(ui, rect, &response);
        self.handle_graph_drag(ui, rect, &response);
        self.handle_graph_hover(ui, rect, &response);
        self.advance_simulation(ui);

        let view = self.engine.view();
        let painter = ui.painter_at(rect);
        draw_background(&painter, rect, view);

        if self.engine.visible().is_empty() {
            let message = if self.engine.graph().is_empty() {
                "The dataset has no nodes."
            } else {
                "No nodes match the current filter."
            };
            painter.text(
                rect.center(),
                Align2::CENTER_CENTER,
                message,
                FontId::proportional(14.0),
                ui.visuals().weak_text_color(),
            );
            return;
        }

        let scale = view.scale;
        for primitive in self.engine.draw_list(true).iter() {
            match primitive {
                Primitive::Line {
                    from,
                    to,
                    stroke,
                    arrow,
                } => {
                    let start = world_to_canvas(rect, view, *from);
                    let end = world_to_canvas(rect, view, *to);
                    if !edge_visible(rect, start, end, 2.5) {
                        continue;
                    }
                    painter.line_segment([start, end], Stroke::new(stroke.width * scale, stroke.color));

                    if let Some(arrow) = arrow {
                        let points = arrow
                            .points(*from)
                            .map(|point| world_to_canvas(rect, view, point));
                        painter.add(Shape::convex_polygon(points.to_vec(), arrow.color, Stroke::NONE));
                    }
                }
                Primitive::Circle {
                    center,
                    radius,
                    fill,
                    stroke,
                } => {
                    let position = world_to_canvas(rect, view, *center);
                    let radius = radius * scale;
                    if !circle_visible(rect, position, radius) {
                        continue;
                    }
                    painter.circle_filled(position, radius, *fill);
                    painter.circle_stroke(
                        position,
                        radius,
                        Stroke::new(stroke.width * scale, stroke.color),
                    );
                }
                Primitive::Text {
                    anchor,
                    text,
                    size,
                    color,
                } => {
                    let position = world_to_canvas(rect, view, *anchor);
                    if !rect.expand(200.0).contains(position) {
                        continue;
                    }
                    painter.text(
                        position,
                        Align2::CENTER_BOTTOM,
                        text,
                        FontId::proportional((size * scale).max(1.0)),
                        *color,
                    );
                }
            }
        }

        if let Some(hovered) = self.engine.scene().hovered()
            && let Some(index) = self.engine.graph().index_of(hovered)
        {
            let node = &self.engine.graph().nodes[index];
            let pin = match self.engine.pin_state(index) {
                Some(state) if state.is_permanent() => "  |  pinned",
                _ => "",
            };
            let kind = if node.kind.is_empty() { "untyped" } else { node.kind.as_str() };
            let at = self
                .engine
                .node_position(index)
                .map(|position| format!("  |  at ({:.0}, {:.0})", position.x, position.y))
                .unwrap_or_default();
            painter.text(
                rect.left_top() + egui::vec2(10.0, 10.0),
                Align2::LEFT_TOP,
                format!("{}  |  {kind}  |  id {}{at}{pin}", node.label, node.id),
                FontId::proportional(13.0),
                ui.visuals().strong_text_color(),
            );
        }
    }
}
