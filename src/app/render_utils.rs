use eframe::egui::{Color32, Painter, Pos2, Rect, Stroke, Vec2};

use crate::engine::ViewTransform;

const BACKGROUND: Color32 = Color32::from_rgb(0xf8, 0xfa, 0xfc);
const GRID_LINE: Color32 = Color32::from_rgba_premultiplied(15, 23, 42, 12);

pub(super) fn draw_background(painter: &Painter, rect: Rect, view: ViewTransform) {
    painter.rect_filled(rect, 0.0, BACKGROUND);

    let step = (48.0 * view.scale.clamp(0.6, 1.8)).max(20.0);
    let origin = rect.min + view.translate;
    let stroke = Stroke::new(1.0, GRID_LINE);

    let mut x = rect.left() + (origin.x - rect.left()).rem_euclid(step);
    while x < rect.right() {
        painter.line_segment([Pos2::new(x, rect.top()), Pos2::new(x, rect.bottom())], stroke);
        x += step;
    }

    let mut y = rect.top() + (origin.y - rect.top()).rem_euclid(step);
    while y < rect.bottom() {
        painter.line_segment([Pos2::new(rect.left(), y), Pos2::new(rect.right(), y)], stroke);
        y += step;
    }
}

/// Maps a world point into the canvas `rect`.
pub(super) fn world_to_canvas(rect: Rect, view: ViewTransform, world: Vec2) -> Pos2 {
    rect.min + view.world_to_screen(world).to_vec2()
}

/// Maps an absolute pointer position into viewport coordinates of the canvas.
pub(super) fn canvas_local(rect: Rect, pointer: Pos2) -> Pos2 {
    (pointer - rect.min).to_pos2()
}

pub(super) fn circle_visible(rect: Rect, position: Pos2, radius: f32) -> bool {
    !(position.x + radius < rect.left()
        || position.x - radius > rect.right()
        || position.y + radius < rect.top()
        || position.y - radius > rect.bottom())
}

pub(super) fn edge_visible(rect: Rect, start: Pos2, end: Pos2, padding: f32) -> bool {
    let min_x = start.x.min(end.x) - padding;
    let max_x = start.x.max(end.x) + padding;
    let min_y = start.y.min(end.y) - padding;
    let max_y = start.y.max(end.y) + padding;

    if max_x < rect.left() || min_x > rect.right() || max_y < rect.top() || min_y > rect.bottom() {
        return false;
    }

    if rect.contains(start) || rect.contains(end) {
        return true;
    }

    let top_left = rect.left_top();
    let top_right = rect.right_top();
    let bottom_left = rect.left_bottom();
    let bottom_right = rect.right_bottom();

    segments_intersect(start, end, top_left, top_right)
        || segments_intersect(start, end, top_right, bottom_right)
        || segments_intersect(start, end, bottom_right, bottom_left)
        || segments_intersect(start, end, bottom_left, top_left)
}

fn segments_intersect(a1: Pos2, a2: Pos2, b1: Pos2, b2: Pos2) -> bool {
    fn cross(o: Pos2, a: Pos2, b: Pos2) -> f32 {
        let oa = a - o;
        let ob = b - o;
        (oa.x * ob.y) - (oa.y * ob.x)
    }

    let c1 = cross(a1, a2, b1);
    let c2 = cross(a1, a2, b2);
    let c3 = cross(b1, b2, a1);
    let c4 = cross(b1, b2, a2);

    (c1 <= 0.0 && c2 >= 0.0 || c1 >= 0.0 && c2 <= 0.0)
        && (c3 <= 0.0 && c4 >= 0.0 || c3 >= 0.0 && c4 <= 0.0)
}

#[cfg(test)]
mod tests {
    use eframe::egui::{pos2, vec2};

    use super::*;

    fn canvas() -> Rect {
        Rect::from_min_size(pos2(100.0, 50.0), vec2(400.0, 300.0))
    }

    #[test]
    fn canvas_mapping_round_trips() {
        let view = ViewTransform {
            translate: vec2(10.0, 20.0),
            scale: 2.0,
        };
        let world = vec2(5.0, 5.0);

        let absolute = world_to_canvas(canvas(), view, world);
        assert_eq!(absolute, pos2(120.0, 80.0));
        assert_eq!(view.screen_to_world(canvas_local(canvas(), absolute)), world);
    }

    #[test]
    fn edge_crossing_canvas_is_visible() {
        let rect = canvas();
        assert!(edge_visible(rect, pos2(0.0, 200.0), pos2(900.0, 200.0), 1.0));
        assert!(!edge_visible(rect, pos2(0.0, 0.0), pos2(50.0, 20.0), 1.0));
        assert!(circle_visible(rect, pos2(95.0, 60.0), 10.0));
        assert!(!circle_visible(rect, pos2(80.0, 60.0), 10.0));
    }
}
