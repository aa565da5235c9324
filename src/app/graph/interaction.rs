use eframe::egui::{self, PointerButton, Rect, Ui};
use log::debug;

use super::super::ViewModel;
use super::super::render_utils::canvas_local;

impl ViewModel {
    pub(in crate::app) fn handle_graph_zoom(&mut self, ui: &Ui, rect: Rect, response: &egui::Response) {
        if !response.hovered() {
            return;
        }

        let (scroll, pinch, pointer) = ui.input(|input| {
            (
                input.raw_scroll_delta.y,
                input.zoom_delta(),
                input.pointer.hover_pos(),
            )
        });
        let anchor = canvas_local(rect, pointer.unwrap_or_else(|| rect.center()));

        // Ctrl+scroll shows up in both; the pinch delta wins.
        if (pinch - 1.0).abs() > f32::EPSILON {
            self.engine.zoom_at(anchor, pinch);
        } else if scroll.abs() > f32::EPSILON {
            let factor = (1.0 + (scroll * 0.0018)).clamp(0.85, 1.15);
            self.engine.zoom_at(anchor, factor);
        }
    }

    /// Primary drag on a node moves it; on empty canvas it pans, as does a
    /// middle drag anywhere.
    pub(in crate::app) fn handle_graph_drag(&mut self, ui: &Ui, rect: Rect, response: &egui::Response) {
        if response.drag_started_by(PointerButton::Primary) {
            let origin = ui.input(|input| input.pointer.press_origin());
            if let Some(origin) = origin {
                self.engine.drag_start(canvas_local(rect, origin));
            }
        }

        if response.dragged_by(PointerButton::Primary) {
            if self.engine.is_dragging() {
                if let Some(pointer) = response.interact_pointer_pos() {
                    self.engine.drag_move(canvas_local(rect, pointer));
                }
            } else {
                self.engine.pan_by(response.drag_delta());
            }
        }

        if response.dragged_by(PointerButton::Middle) {
            self.engine.pan_by(response.drag_delta());
        }

        if response.drag_stopped() && self.engine.is_dragging() {
            let shift_held = ui.input(|input| input.modifiers.shift);
            self.engine.drag_end(shift_held);
        }

        if response.secondary_clicked()
            && let Some(pointer) = response.interact_pointer_pos()
            && self.engine.unpin_at(canvas_local(rect, pointer))
        {
            debug!("node unpinned from canvas");
        }
    }

    pub(in crate::app) fn handle_graph_hover(&mut self, ui: &Ui, rect: Rect, response: &egui::Response) {
        let pointer = if response.hovered() {
            ui.input(|input| input.pointer.hover_pos())
                .map(|pointer| canvas_local(rect, pointer))
        } else {
            None
        };
        self.engine.hover_at(pointer);

        let cursor = if self.engine.is_dragging() {
            Some(egui::CursorIcon::Grabbing)
        } else if pointer.and_then(|pointer| self.engine.node_at(pointer)).is_some() {
            Some(egui::CursorIcon::Grab)
        } else {
            None
        };
        if let Some(cursor) = cursor {
            ui.output_mut(|output| {
                output.cursor_icon = cursor;
            });
        }
    }
}
