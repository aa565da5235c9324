use std::collections::HashSet;
use std::hash::Hash;

use eframe::egui::{Color32, Rect, Stroke, Vec2, pos2, vec2};
use indexmap::IndexMap;

use super::physics::SimNode;
use crate::config::StyleConfig;
use crate::graph::{Graph, NodeId, NodeIndex, Subgraph};

const EDGE_COLOR: Color32 = Color32::from_rgb(0xcb, 0xd5, 0xe1);
const ARROW_COLOR: Color32 = Color32::from_rgb(0x94, 0xa3, 0xb8);
const NODE_STROKE: Color32 = Color32::WHITE;
const LABEL_COLOR: Color32 = Color32::from_rgb(0x33, 0x41, 0x55);
const EDGE_LABEL_COLOR: Color32 = Color32::from_rgb(0x64, 0x74, 0x8b);
const EDGE_LABEL_LIFT: f32 = 4.0;

/// Rough glyph advance relative to the font size, used for text extents.
const GLYPH_WIDTH: f32 = 0.6;

pub fn color_for_type(kind: &str) -> Color32 {
    match kind {
        "Person" => Color32::from_rgb(0x25, 0x63, 0xeb),
        "Company" => Color32::from_rgb(0x16, 0xa3, 0x4a),
        "Tool" => Color32::from_rgb(0x93, 0x33, 0xea),
        "Location" => Color32::from_rgb(0xdc, 0x26, 0x26),
        "Project" => Color32::from_rgb(0xca, 0x8a, 0x04),
        _ => Color32::from_rgb(0x64, 0x74, 0x8b),
    }
}

/// Identity of a drawn edge. Two edges between the same nodes stay distinct
/// as long as their labels differ.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct EdgeKey {
    pub source: NodeId,
    pub target: NodeId,
    pub label: String,
}

#[derive(Clone, Debug)]
pub struct EdgeShape {
    pub source: NodeIndex,
    pub target: NodeIndex,
    pub label: String,
}

#[derive(Clone, Debug)]
pub struct NodeShape {
    pub index: NodeIndex,
    pub fill: Color32,
    /// 0 at rest, 1 fully hovered.
    pub hover_mix: f32,
}

#[derive(Clone, Debug)]
pub struct LabelShape {
    pub index: NodeIndex,
    pub text: String,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SyncCounts {
    pub created: usize,
    pub updated: usize,
    pub removed: usize,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub edges: SyncCounts,
    pub edge_labels: SyncCounts,
    pub nodes: SyncCounts,
    pub node_labels: SyncCounts,
}

/// Retained drawing state, keyed by stable identities so that per-shape
/// state such as hover survives filter changes and dataset reloads.
/// Shapes hold arena indices; positions are read from the simulation arena
/// whenever a [`DrawList`] is built.
#[derive(Default)]
pub struct Scene {
    edges: IndexMap<EdgeKey, EdgeShape>,
    edge_labels: IndexMap<EdgeKey, EdgeShape>,
    nodes: IndexMap<NodeId, NodeShape>,
    node_labels: IndexMap<NodeId, LabelShape>,
    hovered: Option<NodeId>,
}

fn sync_map<K, V>(
    map: &mut IndexMap<K, V>,
    entries: impl IntoIterator<Item = (K, V)>,
    mut update: impl FnMut(&mut V, V),
) -> SyncCounts
where
    K: Hash + Eq + Clone,
{
    let mut counts = SyncCounts::default();
    let mut seen = HashSet::new();

    for (key, value) in entries {
        if !seen.insert(key.clone()) {
            continue;
        }
        match map.get_mut(&key) {
            Some(existing) => {
                update(existing, value);
                counts.updated += 1;
            }
            None => {
                map.insert(key, value);
                counts.created += 1;
            }
        }
    }

    let before = map.len();
    map.retain(|key, _| seen.contains(key));
    counts.removed = before - map.len();
    counts
}

impl Scene {
    pub fn reconcile(&mut self, graph: &Graph, visible: &Subgraph, style: &StyleConfig) -> SyncReport {
        let edge_entries = || {
            visible.edges.iter().filter_map(|edge| {
                let source = graph.nodes.get(edge.source)?;
                let target = graph.nodes.get(edge.target)?;
                Some((
                    EdgeKey {
                        source: source.id.clone(),
                        target: target.id.clone(),
                        label: edge.label.clone(),
                    },
                    EdgeShape {
                        source: edge.source,
                        target: edge.target,
                        label: edge.label.clone(),
                    },
                ))
            })
        };

        let edges = sync_map(&mut self.edges, edge_entries(), |shape, fresh| *shape = fresh);
        let edge_labels = if style.show_edge_labels {
            sync_map(&mut self.edge_labels, edge_entries(), |shape, fresh| *shape = fresh)
        } else {
            sync_map(&mut self.edge_labels, std::iter::empty(), |_, _| {})
        };

        let visible_nodes = || {
            visible
                .nodes
                .iter()
                .filter_map(|&index| graph.nodes.get(index).map(|node| (index, node)))
        };
        let nodes = sync_map(
            &mut self.nodes,
            visible_nodes().map(|(index, node)| {
                (
                    node.id.clone(),
                    NodeShape {
                        index,
                        fill: color_for_type(&node.kind),
                        hover_mix: 0.0,
                    },
                )
            }),
            |shape, fresh| {
                shape.index = fresh.index;
                shape.fill = fresh.fill;
            },
        );
        let node_labels = sync_map(
            &mut self.node_labels,
            visible_nodes().map(|(index, node)| {
                (
                    node.id.clone(),
                    LabelShape {
                        index,
                        text: node.label.clone(),
                    },
                )
            }),
            |shape, fresh| *shape = fresh,
        );

        if let Some(hovered) = &self.hovered
            && !self.nodes.contains_key(hovered)
        {
            self.hovered = None;
        }

        SyncReport {
            edges,
            edge_labels,
            nodes,
            node_labels,
        }
    }

    #[cfg(test)]
    pub fn node_shape(&self, id: &NodeId) -> Option<&NodeShape> {
        self.nodes.get(id)
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_label_count(&self) -> usize {
        self.edge_labels.len()
    }

    pub fn hovered(&self) -> Option<&NodeId> {
        self.hovered.as_ref()
    }

    /// Returns `true` when the hovered node changed.
    pub fn set_hovered(&mut self, id: Option<NodeId>) -> bool {
        let id = id.filter(|id| self.nodes.contains_key(id));
        if self.hovered == id {
            return false;
        }
        self.hovered = id;
        true
    }

    /// Eases hover state toward its target. Returns `true` while any node is
    /// still mid-transition.
    pub fn animate(&mut self, dt: f32, transition_secs: f32) -> bool {
        let step = if transition_secs > 0.0 {
            dt / transition_secs
        } else {
            1.0
        };

        let mut animating = false;
        for (id, shape) in &mut self.nodes {
            let target = if self.hovered.as_ref() == Some(id) {
                1.0
            } else {
                0.0
            };
            if shape.hover_mix < target {
                shape.hover_mix = (shape.hover_mix + step).min(target);
            } else if shape.hover_mix > target {
                shape.hover_mix = (shape.hover_mix - step).max(target);
            }
            animating |= shape.hover_mix != target;
        }
        animating
    }

    /// World-space drawing for the current positions. Hover growth is an
    /// on-screen affordance and is left out unless `include_hover` is set.
    pub fn draw_list(&self, positions: &[SimNode], style: &StyleConfig, include_hover: bool) -> DrawList {
        let position = |index: NodeIndex| positions.get(index).map(|node| node.world_pos);
        let radius_of = |shape: &NodeShape| {
            if include_hover {
                style.node_radius + (style.hover_radius - style.node_radius) * shape.hover_mix
            } else {
                style.node_radius
            }
        };
        let mut primitives = Vec::with_capacity(
            self.edges.len() + self.edge_labels.len() + self.nodes.len() + self.node_labels.len(),
        );

        for (key, edge) in &self.edges {
            let (Some(from), Some(to)) = (position(edge.source), position(edge.target)) else {
                continue;
            };
            let target_radius = self
                .nodes
                .get(&key.target)
                .map_or(style.node_radius, &radius_of);
            let direction = (to - from).normalized();
            let arrow = (direction.is_finite() && direction != Vec2::ZERO).then(|| Arrow {
                tip: to - direction * (target_radius + style.node_stroke_width),
                size: style.arrow_size,
                color: ARROW_COLOR,
            });
            primitives.push(Primitive::Line {
                from,
                to,
                stroke: Stroke::new(style.edge_width, EDGE_COLOR),
                arrow,
            });
        }

        for edge in self.edge_labels.values() {
            let (Some(from), Some(to)) = (position(edge.source), position(edge.target)) else {
                continue;
            };
            primitives.push(Primitive::Text {
                anchor: (from + to) * 0.5 - vec2(0.0, EDGE_LABEL_LIFT),
                text: edge.label.clone(),
                size: style.edge_label_size,
                color: EDGE_LABEL_COLOR,
            });
        }

        for shape in self.nodes.values() {
            let Some(center) = position(shape.index) else {
                continue;
            };
            primitives.push(Primitive::Circle {
                center,
                radius: radius_of(shape),
                fill: shape.fill,
                stroke: Stroke::new(style.node_stroke_width, NODE_STROKE),
            });
        }

        for label in self.node_labels.values() {
            let Some(center) = position(label.index) else {
                continue;
            };
            if label.text.is_empty() {
                continue;
            }
            primitives.push(Primitive::Text {
                anchor: center - vec2(0.0, style.label_offset),
                text: label.text.clone(),
                size: style.label_size,
                color: LABEL_COLOR,
            });
        }

        DrawList { primitives }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Arrow {
    pub tip: Vec2,
    pub size: f32,
    pub color: Color32,
}

impl Arrow {
    /// Triangle corners: tip, then the two base corners.
    pub fn points(self, from: Vec2) -> [Vec2; 3] {
        let direction = (self.tip - from).normalized();
        let normal = vec2(-direction.y, direction.x);
        let base = self.tip - direction * self.size;
        [
            self.tip,
            base + normal * (self.size * 0.5),
            base - normal * (self.size * 0.5),
        ]
    }
}

/// One world-space drawing command. Text is horizontally centered with its
/// baseline at `anchor`.
#[derive(Clone, Debug, PartialEq)]
pub enum Primitive {
    Line {
        from: Vec2,
        to: Vec2,
        stroke: Stroke,
        arrow: Option<Arrow>,
    },
    Circle {
        center: Vec2,
        radius: f32,
        fill: Color32,
        stroke: Stroke,
    },
    Text {
        anchor: Vec2,
        text: String,
        size: f32,
        color: Color32,
    },
}

impl Primitive {
    pub fn bounds(&self) -> Rect {
        match self {
            Self::Line { from, to, stroke, .. } => {
                Rect::from_two_pos(from.to_pos2(), to.to_pos2()).expand(stroke.width * 0.5)
            }
            Self::Circle {
                center,
                radius,
                stroke,
                ..
            } => Rect::from_center_size(
                center.to_pos2(),
                Vec2::splat((radius + stroke.width * 0.5) * 2.0),
            ),
            Self::Text {
                anchor, text, size, ..
            } => {
                let half_width = text.chars().count() as f32 * size * GLYPH_WIDTH * 0.5;
                Rect::from_min_max(
                    pos2(anchor.x - half_width, anchor.y - size * 0.8),
                    pos2(anchor.x + half_width, anchor.y + size * 0.2),
                )
            }
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct DrawList {
    pub primitives: Vec<Primitive>,
}

impl DrawList {
    pub fn iter(&self) -> impl Iterator<Item = &Primitive> {
        self.primitives.iter()
    }

    /// Union of every primitive's extent, or `None` for an empty list.
    pub fn bounds(&self) -> Option<Rect> {
        self.primitives
            .iter()
            .map(Primitive::bounds)
            .reduce(|total, bounds| total.union(bounds))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Edge, GraphDataset, Node, filter, normalize};

    fn graph() -> Graph {
        normalize(GraphDataset {
            nodes: vec![
                Node::new(1, "Alice").with_kind("Person"),
                Node::new(2, "Bob").with_kind("Person"),
                Node::new(3, "Acme").with_kind("Company"),
            ],
            edges: vec![
                Edge::new(1, 2, "knows"),
                Edge::new(1, 2, "likes"),
                Edge::new(2, 3, "works at"),
            ],
        })
        .unwrap()
        .graph
    }

    fn arena(count: usize) -> Vec<SimNode> {
        (0..count)
            .map(|index| SimNode::new(vec2(index as f32 * 100.0, 0.0), None))
            .collect()
    }

    #[test]
    fn first_sync_creates_everything() {
        let graph = graph();
        let mut scene = Scene::default();

        let report = scene.reconcile(&graph, &Subgraph::full(&graph), &StyleConfig::default());
        assert_eq!(report.nodes.created, 3);
        assert_eq!(report.node_labels.created, 3);
        assert_eq!(report.edges.created, 3);
        assert_eq!(report.edge_labels, SyncCounts::default());
        assert_eq!(scene.edge_count(), 3);
    }

    #[test]
    fn filtering_removes_and_restores_by_key() {
        let graph = graph();
        let style = StyleConfig::default();
        let mut scene = Scene::default();
        scene.reconcile(&graph, &Subgraph::full(&graph), &style);

        let narrowed = scene.reconcile(&graph, &filter(&graph, "person"), &style);
        assert_eq!(
            narrowed.nodes,
            SyncCounts {
                created: 0,
                updated: 2,
                removed: 1
            }
        );
        assert_eq!(narrowed.edges.removed, 1);
        assert_eq!(narrowed.edges.updated, 2);

        let restored = scene.reconcile(&graph, &Subgraph::full(&graph), &style);
        assert_eq!(restored.nodes.created, 1);
        assert_eq!(restored.nodes.updated, 2);
        assert_eq!(restored.nodes.removed, 0);
    }

    #[test]
    fn hover_state_survives_reconcile() {
        let graph = graph();
        let style = StyleConfig::default();
        let mut scene = Scene::default();
        scene.reconcile(&graph, &Subgraph::full(&graph), &style);

        assert!(scene.set_hovered(Some(NodeId::Int(1))));
        assert!(!scene.animate(1.0, 0.25));
        scene.reconcile(&graph, &filter(&graph, "alice"), &style);

        assert_eq!(scene.hovered(), Some(&NodeId::Int(1)));
        assert_eq!(scene.node_shape(&NodeId::Int(1)).unwrap().hover_mix, 1.0);

        scene.reconcile(&graph, &filter(&graph, "acme"), &style);
        assert_eq!(scene.hovered(), None);
    }

    #[test]
    fn hover_grows_radius_only_when_requested() {
        let graph = graph();
        let style = StyleConfig::default();
        let mut scene = Scene::default();
        scene.reconcile(&graph, &Subgraph::full(&graph), &style);
        scene.set_hovered(Some(NodeId::Int(2)));
        assert!(scene.animate(0.1, 0.25));
        scene.animate(1.0, 0.25);

        let radii = |list: &DrawList| {
            list.iter()
                .filter_map(|primitive| match primitive {
                    Primitive::Circle { radius, .. } => Some(*radius),
                    _ => None,
                })
                .collect::<Vec<_>>()
        };
        let positions = arena(3);
        assert_eq!(radii(&scene.draw_list(&positions, &style, true)), [14.0, 16.0, 14.0]);
        assert_eq!(radii(&scene.draw_list(&positions, &style, false)), [14.0, 14.0, 14.0]);
    }

    #[test]
    fn draw_list_reads_live_positions() {
        let graph = graph();
        let style = StyleConfig::default();
        let mut scene = Scene::default();
        scene.reconcile(&graph, &Subgraph::full(&graph), &style);

        let mut positions = arena(3);
        positions[2].world_pos = vec2(50.0, 500.0);
        let list = scene.draw_list(&positions, &style, false);

        assert!(list.iter().any(|primitive| matches!(
            primitive,
            Primitive::Circle { center, fill, .. }
                if *center == vec2(50.0, 500.0) && *fill == color_for_type("Company")
        )));
        assert!(list.iter().any(|primitive| matches!(
            primitive,
            Primitive::Text { text, anchor, .. } if text == "Acme" && *anchor == vec2(50.0, 482.0)
        )));
        let bounds = list.bounds().unwrap();
        assert!(bounds.contains(pos2(50.0, 500.0)));
        assert!(bounds.contains(pos2(0.0, 0.0)));
    }

    #[test]
    fn edge_labels_follow_style_toggle() {
        let graph = graph();
        let mut style = StyleConfig::default();
        style.show_edge_labels = true;
        let mut scene = Scene::default();

        let report = scene.reconcile(&graph, &Subgraph::full(&graph), &style);
        assert_eq!(report.edge_labels.created, 3);

        style.show_edge_labels = false;
        let report = scene.reconcile(&graph, &Subgraph::full(&graph), &style);
        assert_eq!(report.edge_labels.removed, 3);
        assert_eq!(scene.edge_label_count(), 0);
    }

    #[test]
    fn arrow_stops_at_target_border() {
        let arrow = Arrow {
            tip: vec2(84.0, 0.0),
            size: 6.0,
            color: ARROW_COLOR,
        };
        let [tip, left, right] = arrow.points(Vec2::ZERO);
        assert_eq!(tip, vec2(84.0, 0.0));
        assert_eq!(left, vec2(78.0, 3.0));
        assert_eq!(right, vec2(78.0, -3.0));
    }
}
