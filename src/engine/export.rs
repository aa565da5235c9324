use std::fmt::Write as _;

use eframe::egui::{Color32, Rect, Stroke, Vec2, vec2};
use log::info;

use super::GraphEngine;
use super::scene::{Arrow, DrawList, Primitive};
use super::view::ViewTransform;
use crate::config::ExportConfig;
use crate::error::{ExportError, GraphError, Result};

/// A rendered PNG of the scene, ready to be saved under `file_name`.
#[derive(Clone, Debug)]
pub struct Snapshot {
    pub file_name: String,
    pub width: u32,
    pub height: u32,
    pub png: Vec<u8>,
}

impl GraphEngine {
    /// Rasterizes the scene as it is right now, under the current pan and
    /// zoom. Works mid-animation; hover growth is not included.
    pub fn export_snapshot(&self) -> Result<Snapshot> {
        if self.detached {
            return Err(GraphError::Detached);
        }

        let list = self.draw_list(false);
        let snapshot = render_snapshot(&list, self.view, &self.config.export)?;
        info!(
            "exported {}x{} snapshot ({} bytes)",
            snapshot.width,
            snapshot.height,
            snapshot.png.len()
        );
        Ok(snapshot)
    }
}

pub(super) fn render_snapshot(
    list: &DrawList,
    view: ViewTransform,
    config: &ExportConfig,
) -> std::result::Result<Snapshot, ExportError> {
    let screen = project(list, view);
    let canvas = CanvasGeometry::fit(screen.bounds(), config);
    let svg = scene_svg(&screen, canvas, &config.background);
    let png = svg_to_png(&svg, canvas.width, canvas.height)?;

    Ok(Snapshot {
        file_name: config.file_name.clone(),
        width: canvas.width,
        height: canvas.height,
        png,
    })
}

fn project(list: &DrawList, view: ViewTransform) -> DrawList {
    let point = |world: Vec2| view.world_to_screen(world).to_vec2();
    let stroke = |stroke: Stroke| Stroke::new(stroke.width * view.scale, stroke.color);

    let primitives = list
        .iter()
        .map(|primitive| match primitive {
            Primitive::Line {
                from,
                to,
                stroke: line,
                arrow,
            } => Primitive::Line {
                from: point(*from),
                to: point(*to),
                stroke: stroke(*line),
                arrow: arrow.map(|arrow| Arrow {
                    tip: point(arrow.tip),
                    size: arrow.size * view.scale,
                    color: arrow.color,
                }),
            },
            Primitive::Circle {
                center,
                radius,
                fill,
                stroke: outline,
            } => Primitive::Circle {
                center: point(*center),
                radius: radius * view.scale,
                fill: *fill,
                stroke: stroke(*outline),
            },
            Primitive::Text {
                anchor,
                text,
                size,
                color,
            } => Primitive::Text {
                anchor: point(*anchor),
                text: text.clone(),
                size: size * view.scale,
                color: *color,
            },
        })
        .collect();

    DrawList { primitives }
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct CanvasGeometry {
    width: u32,
    height: u32,
    /// Added to every screen coordinate. Zero keeps the on-screen placement.
    offset: Vec2,
}

impl CanvasGeometry {
    fn fit(bounds: Option<Rect>, config: &ExportConfig) -> Self {
        let Some(bounds) = bounds.filter(|bounds| bounds.is_finite()) else {
            return Self {
                width: config.min_width,
                height: config.min_height,
                offset: Vec2::ZERO,
            };
        };

        let padding = config.padding.max(0.0);
        let width = ((bounds.width() + padding * 2.0).ceil() as u32).max(config.min_width);
        let height = ((bounds.height() + padding * 2.0).ceil() as u32).max(config.min_height);

        // Keep the panned screen placement unless that would push content
        // into the padding; then shift it just far enough back in.
        let lowest = vec2(padding, padding) - bounds.min.to_vec2();
        let highest = vec2(width as f32 - padding, height as f32 - padding) - bounds.max.to_vec2();
        Self {
            width,
            height,
            offset: vec2(
                0.0_f32.clamp(lowest.x, highest.x.max(lowest.x)),
                0.0_f32.clamp(lowest.y, highest.y.max(lowest.y)),
            ),
        }
    }
}

fn hex(color: Color32) -> String {
    format!("#{:02x}{:02x}{:02x}", color.r(), color.g(), color.b())
}

fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

fn scene_svg(list: &DrawList, canvas: CanvasGeometry, background: &str) -> String {
    let CanvasGeometry {
        width,
        height,
        offset,
    } = canvas;
    let mut svg = String::new();

    let _ = writeln!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{width}" height="{height}" viewBox="0 0 {width} {height}">"#
    );
    let _ = writeln!(
        svg,
        r#"<rect x="0" y="0" width="{width}" height="{height}" fill="{}"/>"#,
        escape_xml(background)
    );
    let _ = writeln!(
        svg,
        r#"<g transform="translate({:.2} {:.2})">"#,
        offset.x, offset.y
    );

    for primitive in list.iter() {
        match primitive {
            Primitive::Line {
                from,
                to,
                stroke,
                arrow,
            } => {
                let _ = writeln!(
                    svg,
                    r#"<line x1="{:.2}" y1="{:.2}" x2="{:.2}" y2="{:.2}" stroke="{}" stroke-width="{:.2}"/>"#,
                    from.x,
                    from.y,
                    to.x,
                    to.y,
                    hex(stroke.color),
                    stroke.width
                );
                if let Some(arrow) = arrow {
                    let [tip, left, right] = arrow.points(*from);
                    let _ = writeln!(
                        svg,
                        r#"<path d="M{:.2},{:.2}L{:.2},{:.2}L{:.2},{:.2}Z" fill="{}"/>"#,
                        tip.x,
                        tip.y,
                        left.x,
                        left.y,
                        right.x,
                        right.y,
                        hex(arrow.color)
                    );
                }
            }
            Primitive::Circle {
                center,
                radius,
                fill,
                stroke,
            } => {
                let _ = writeln!(
                    svg,
                    r#"<circle cx="{:.2}" cy="{:.2}" r="{:.2}" fill="{}" stroke="{}" stroke-width="{:.2}"/>"#,
                    center.x,
                    center.y,
                    radius,
                    hex(*fill),
                    hex(stroke.color),
                    stroke.width
                );
            }
            Primitive::Text {
                anchor,
                text,
                size,
                color,
            } => {
                let _ = writeln!(
                    svg,
                    r#"<text x="{:.2}" y="{:.2}" font-family="sans-serif" font-size="{:.2}" font-weight="500" text-anchor="middle" fill="{}">{}</text>"#,
                    anchor.x,
                    anchor.y,
                    size,
                    hex(*color),
                    escape_xml(text)
                );
            }
        }
    }

    svg.push_str("</g>\n</svg>\n");
    svg
}

fn svg_to_png(svg: &str, width: u32, height: u32) -> std::result::Result<Vec<u8>, ExportError> {
    let mut opt = usvg::Options::default();
    opt.fontdb_mut().load_system_fonts();

    let tree = usvg::Tree::from_str(svg, &opt).map_err(|_| ExportError::SvgParse)?;
    let mut pixmap =
        tiny_skia::Pixmap::new(width, height).ok_or(ExportError::PixmapAlloc { width, height })?;

    resvg::render(&tree, tiny_skia::Transform::identity(), &mut pixmap.as_mut());
    pixmap.encode_png().map_err(|_| ExportError::PngEncode)
}

#[cfg(test)]
mod tests {
    use eframe::egui::pos2;

    use super::*;
    use crate::config::EngineConfig;
    use crate::graph::{Edge, GraphDataset, Node};

    const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];

    fn png_size(png: &[u8]) -> (u32, u32) {
        let field = |at: usize| u32::from_be_bytes([png[at], png[at + 1], png[at + 2], png[at + 3]]);
        (field(16), field(20))
    }

    fn engine(dataset: GraphDataset) -> GraphEngine {
        let mut engine = GraphEngine::new(EngineConfig::default(), vec2(900.0, 600.0));
        engine.set_dataset(dataset).unwrap();
        engine
    }

    #[test]
    fn single_node_export_meets_minimum_canvas() {
        let engine = engine(GraphDataset {
            nodes: vec![Node::new(1, "Solo")],
            edges: Vec::new(),
        });

        let snapshot = engine.export_snapshot().unwrap();
        assert_eq!(snapshot.file_name, "graph.png");
        assert_eq!(&snapshot.png[..8], &PNG_SIGNATURE);
        assert_eq!((snapshot.width, snapshot.height), (800, 600));
        assert_eq!(png_size(&snapshot.png), (800, 600));
    }

    #[test]
    fn large_layouts_grow_the_canvas_by_the_padding() {
        let engine = engine(GraphDataset {
            nodes: vec![
                Node::new(1, "West").pinned_at(0.0, 0.0),
                Node::new(2, "East").pinned_at(1500.0, 0.0),
            ],
            edges: vec![Edge::new(1, 2, "spans")],
        });

        let snapshot = engine.export_snapshot().unwrap();
        let content = engine.draw_list(false).bounds().unwrap();
        assert_eq!(snapshot.width, (content.width() + 64.0).ceil() as u32);
        assert_eq!(snapshot.height, 600);
        assert_eq!(png_size(&snapshot.png), (snapshot.width, snapshot.height));
    }

    #[test]
    fn export_mid_motion_leaves_simulation_alone() {
        let mut engine = engine(GraphDataset {
            nodes: vec![Node::new(1, "A"), Node::new(2, "B"), Node::new(3, "C")],
            edges: vec![Edge::new(1, 2, "x"), Edge::new(2, 3, "y")],
        });
        let handle = engine.tick_handle();
        for _ in 0..5 {
            engine.tick(handle);
        }

        let alpha = engine.simulation().alpha();
        let positions = (0..3).map(|index| engine.node_position(index)).collect::<Vec<_>>();
        assert!(engine.export_snapshot().is_ok());
        assert_eq!(engine.simulation().alpha(), alpha);
        assert_eq!(
            positions,
            (0..3).map(|index| engine.node_position(index)).collect::<Vec<_>>()
        );
    }

    #[test]
    fn empty_scene_exports_blank_floor_canvas() {
        let engine = engine(GraphDataset::default());
        let snapshot = engine.export_snapshot().unwrap();
        assert_eq!(png_size(&snapshot.png), (800, 600));
    }

    #[test]
    fn zoom_scales_exported_content() {
        let mut engine = engine(GraphDataset {
            nodes: vec![
                Node::new(1, "West").pinned_at(0.0, 0.0),
                Node::new(2, "East").pinned_at(1000.0, 0.0),
            ],
            edges: Vec::new(),
        });
        let base = engine.export_snapshot().unwrap().width;
        engine.zoom_by(2.0);
        let zoomed = engine.export_snapshot().unwrap().width;
        assert!(zoomed > base + 900);
    }

    #[test]
    fn labels_are_escaped_in_svg() {
        let list = DrawList {
            primitives: vec![Primitive::Text {
                anchor: vec2(10.0, 10.0),
                text: "Acme <R&D>".to_owned(),
                size: 12.0,
                color: Color32::BLACK,
            }],
        };
        let canvas = CanvasGeometry::fit(list.bounds(), &ExportConfig::default());
        let svg = scene_svg(&list, canvas, "#ffffff");

        assert!(svg.contains("Acme &lt;R&amp;D&gt;"));
        assert!(usvg::Tree::from_str(&svg, &usvg::Options::default()).is_ok());
    }

    #[test]
    fn canvas_shifts_content_only_out_of_the_padding() {
        let bounds = Rect::from_min_max(pos2(-100.0, 40.0), pos2(900.0, 140.0));
        let canvas = CanvasGeometry::fit(Some(bounds), &ExportConfig::default());

        assert_eq!(canvas.width, 1064);
        assert_eq!(canvas.height, 600);
        assert_eq!(canvas.offset, vec2(132.0, 0.0));

        let below = Rect::from_min_max(pos2(100.0, 500.0), pos2(200.0, 590.0));
        let canvas = CanvasGeometry::fit(Some(below), &ExportConfig::default());
        assert_eq!(canvas.offset, vec2(0.0, -22.0));
    }

    #[test]
    fn pan_moves_content_within_the_export() {
        let mut engine = engine(GraphDataset {
            nodes: vec![Node::new(1, "Solo")],
            edges: Vec::new(),
        });
        let placed = |engine: &GraphEngine| {
            let screen = project(&engine.draw_list(false), engine.view());
            let bounds = screen.bounds().unwrap();
            bounds.min.to_vec2() + CanvasGeometry::fit(Some(bounds), &ExportConfig::default()).offset
        };

        let before = placed(&engine);
        engine.pan_by(vec2(60.0, -40.0));
        let after = placed(&engine);

        assert!((after - before - vec2(60.0, -40.0)).length() < 1e-3);
        assert!(engine.export_snapshot().is_ok());
    }

    #[test]
    fn detached_engine_refuses_export() {
        let mut engine = engine(GraphDataset::default());
        engine.detach();
        assert!(matches!(engine.export_snapshot(), Err(GraphError::Detached)));
    }
}
