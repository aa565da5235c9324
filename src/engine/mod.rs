mod export;
mod interaction;
mod physics;
mod scene;
mod view;

use eframe::egui::{Pos2, Vec2};
use log::{debug, info, warn};

use crate::config::EngineConfig;
use crate::error::{GraphError, Result};
use crate::graph::{DanglingEdge, Graph, GraphDataset, NodeIndex, Subgraph, filter, normalize};
use crate::util::phyllotaxis;

pub use export::Snapshot;
pub use interaction::PinState;
pub use physics::{SimNode, Simulation, SimulationState};
pub use scene::{DrawList, Primitive, Scene, SyncReport};
pub use view::ViewTransform;

use interaction::DragSession;

/// Proof of ownership of the tick stream. Only the handle from the latest
/// generation may advance the layout.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TickHandle {
    generation: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickOutcome {
    Advanced,
    /// Cold or settled; nothing moved.
    Idle,
    Paused,
    /// The handle belongs to a loop that has since been replaced.
    Stale,
}

/// The visualization engine: dataset, layout arena, filter, view and scene.
///
/// Every call runs to completion on the caller's thread; the host drives
/// [`GraphEngine::tick`] once per frame and feeds pointer input in between,
/// so input applied before a tick is visible in the forces of that tick.
pub struct GraphEngine {
    config: EngineConfig,
    graph: Graph,
    /// Parallel to `graph.nodes`.
    nodes: Vec<SimNode>,
    visible: Subgraph,
    query: String,
    simulation: Simulation,
    scene: Scene,
    view: ViewTransform,
    viewport: Vec2,
    drag: Option<DragSession>,
    generation: u64,
    detached: bool,
}

impl GraphEngine {
    pub fn new(config: EngineConfig, viewport: Vec2) -> Self {
        let viewport = if viewport.is_finite() && viewport.min_elem() > 0.0 {
            viewport
        } else {
            Vec2::new(config.export.min_width as f32, config.export.min_height as f32)
        };

        Self {
            config,
            graph: Graph::default(),
            nodes: Vec::new(),
            visible: Subgraph::default(),
            query: String::new(),
            simulation: Simulation::new(),
            scene: Scene::default(),
            view: ViewTransform::IDENTITY,
            viewport,
            drag: None,
            generation: 0,
            detached: false,
        }
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn visible(&self) -> &Subgraph {
        &self.visible
    }

    pub fn simulation(&self) -> &Simulation {
        &self.simulation
    }

    pub fn simulation_state(&self) -> SimulationState {
        self.simulation.state()
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn node_position(&self, index: NodeIndex) -> Option<Vec2> {
        self.nodes.get(index).map(|node| node.world_pos)
    }

    fn center(&self) -> Vec2 {
        self.viewport * 0.5
    }

    /// Replaces the whole graph. A dataset that fails validation is rejected
    /// and the current graph stays on screen. Otherwise every layout and pin
    /// state is discarded and the layout restarts from its seed positions.
    pub fn set_dataset(&mut self, dataset: GraphDataset) -> Result<Vec<DanglingEdge>> {
        if self.detached {
            return Err(GraphError::Detached);
        }

        let normalized = match normalize(dataset) {
            Ok(normalized) => normalized,
            Err(error) => {
                warn!("rejected dataset, keeping the previous graph: {error}");
                return Err(error);
            }
        };

        self.drag = None;
        let center = self.center();
        self.graph = normalized.graph;
        self.nodes = self
            .graph
            .nodes
            .iter()
            .enumerate()
            .map(|(index, node)| {
                let anchor = node.pinned_position.map(|[x, y]| Vec2::new(x, y));
                SimNode::new(phyllotaxis(index, center), anchor)
            })
            .collect();

        self.visible = filter(&self.graph, &self.query);
        self.generation += 1;
        self.simulation.reset(1.0);
        self.sync_scene();

        info!(
            "loaded graph with {} nodes and {} edges ({} dangling dropped), {} visible",
            self.graph.node_count(),
            self.graph.edge_count(),
            normalized.dangling.len(),
            self.visible.nodes.len()
        );
        Ok(normalized.dangling)
    }

    /// Recomputes the visible subgraph. Pins and positions of nodes that stay
    /// visible are untouched; the layout restarts unless the user paused it.
    pub fn set_filter(&mut self, query: &str) -> SyncReport {
        if self.detached || self.query == query {
            return SyncReport::default();
        }

        self.query = query.to_owned();
        self.visible = filter(&self.graph, &self.query);
        self.cancel_hidden_drag();
        self.simulation.restart(1.0);
        let report = self.sync_scene();

        info!(
            "filter {:?} shows {} of {} nodes and {} of {} edges",
            self.query.trim(),
            self.visible.nodes.len(),
            self.graph.node_count(),
            self.visible.edges.len(),
            self.graph.edge_count()
        );
        report
    }

    fn sync_scene(&mut self) -> SyncReport {
        self.scene
            .reconcile(&self.graph, &self.visible, &self.config.style)
    }

    pub fn tick_handle(&self) -> TickHandle {
        TickHandle {
            generation: self.generation,
        }
    }

    pub fn tick(&mut self, handle: TickHandle) -> TickOutcome {
        if self.detached || handle.generation != self.generation {
            return TickOutcome::Stale;
        }

        match self.simulation.state() {
            SimulationState::Paused => return TickOutcome::Paused,
            SimulationState::Cold | SimulationState::Settled => return TickOutcome::Idle,
            SimulationState::Running => {}
        }

        let center = self.center();
        self.simulation
            .step(&mut self.nodes, &self.visible, center, &self.config.simulation);
        self.sync_scene();
        TickOutcome::Advanced
    }

    /// Freezes the layout and retires the current tick handle. Returns `false`
    /// when already paused.
    pub fn pause(&mut self) -> bool {
        if self.detached || !self.simulation.pause() {
            return false;
        }
        self.generation += 1;
        info!("simulation paused");
        true
    }

    pub fn resume(&mut self) -> bool {
        if self.detached || !self.simulation.resume(self.config.simulation.resume_alpha) {
            return false;
        }
        info!("simulation resumed");
        true
    }

    pub fn toggle_running(&mut self) -> bool {
        if self.simulation.state() == SimulationState::Paused {
            self.resume()
        } else {
            self.pause()
        }
    }

    /// Points the hover affordance at the node under `screen`, if any.
    pub fn hover_at(&mut self, screen: Option<Pos2>) -> bool {
        if self.detached {
            return false;
        }
        let id = screen
            .and_then(|screen| self.node_at(screen))
            .map(|index| self.graph.nodes[index].id.clone());
        self.scene.set_hovered(id)
    }

    pub fn animate(&mut self, dt: f32) -> bool {
        !self.detached
            && self
                .scene
                .animate(dt, self.config.style.hover_transition_secs)
    }

    pub fn draw_list(&self, include_hover: bool) -> DrawList {
        self.scene
            .draw_list(&self.nodes, &self.config.style, include_hover)
    }

    /// Tears the engine down. Every later call is a no-op or fails with
    /// [`GraphError::Detached`].
    pub fn detach(&mut self) {
        if self.detached {
            return;
        }
        self.drag = None;
        self.generation += 1;
        self.detached = true;
        debug!("graph engine detached");
    }
}

#[cfg(test)]
mod tests {
    use eframe::egui::{pos2, vec2};

    use super::*;
    use crate::graph::{Edge, Node, NodeId, demo_dataset};

    fn engine() -> GraphEngine {
        let mut engine = GraphEngine::new(EngineConfig::default(), vec2(900.0, 600.0));
        engine.set_dataset(demo_dataset()).unwrap();
        engine
    }

    fn positions(engine: &GraphEngine) -> Vec<Vec2> {
        (0..engine.graph().node_count())
            .filter_map(|index| engine.node_position(index))
            .collect()
    }

    fn run(engine: &mut GraphEngine, ticks: usize) {
        let handle = engine.tick_handle();
        for _ in 0..ticks {
            engine.tick(handle);
        }
    }

    #[test]
    fn demo_graph_settles_with_vienna_fixed() {
        let mut engine = engine();
        run(&mut engine, 400);

        assert_eq!(engine.simulation_state(), SimulationState::Settled);
        assert_eq!(engine.node_position(4), Some(vec2(100.0, 50.0)));
        assert!(positions(&engine).iter().all(|position| position.is_finite()));
        assert_eq!(engine.tick(engine.tick_handle()), TickOutcome::Idle);
    }

    #[test]
    fn replacing_the_dataset_retires_old_handles() {
        let mut engine = engine();
        let old = engine.tick_handle();
        engine.set_dataset(demo_dataset()).unwrap();

        let before = positions(&engine);
        assert_eq!(engine.tick(old), TickOutcome::Stale);
        assert_eq!(before, positions(&engine));
        assert_eq!(engine.tick(engine.tick_handle()), TickOutcome::Advanced);
    }

    #[test]
    fn malformed_dataset_keeps_previous_graph() {
        let mut engine = engine();
        let handle = engine.tick_handle();

        let error = engine
            .set_dataset(GraphDataset {
                nodes: vec![Node::new(1, "A"), Node::new(1, "A again")],
                edges: Vec::new(),
            })
            .unwrap_err();

        assert!(error.is_malformed_dataset());
        assert_eq!(engine.graph().node_count(), 5);
        assert_eq!(engine.scene().node_count(), 5);
        assert_eq!(engine.tick(handle), TickOutcome::Advanced);
    }

    #[test]
    fn dangling_edges_are_reported_not_fatal() {
        let mut engine = engine();
        let dangling = engine
            .set_dataset(GraphDataset {
                nodes: vec![Node::new(1, "A"), Node::new(2, "B")],
                edges: vec![Edge::new(1, 2, "knows"), Edge::new(1, 99, "ghost")],
            })
            .unwrap();

        assert_eq!(dangling.len(), 1);
        assert_eq!(dangling[0].missing, NodeId::Int(99));
        assert_eq!(engine.graph().edge_count(), 1);
        assert_eq!(engine.scene().edge_count(), 1);
    }

    #[test]
    fn pause_and_resume_do_not_jump() {
        let mut engine = engine();
        run(&mut engine, 10);

        assert!(engine.pause());
        assert!(!engine.pause());
        let frozen = positions(&engine);
        assert_eq!(engine.tick(engine.tick_handle()), TickOutcome::Paused);
        assert_eq!(frozen, positions(&engine));

        assert!(engine.resume());
        assert!(!engine.resume());
        assert_eq!(frozen, positions(&engine));
        assert_eq!(engine.simulation().alpha(), 0.7);

        assert_eq!(engine.tick(engine.tick_handle()), TickOutcome::Advanced);
        assert_ne!(frozen, positions(&engine));
    }

    #[test]
    fn pause_retires_the_running_loop() {
        let mut engine = engine();
        let handle = engine.tick_handle();
        engine.pause();
        engine.resume();
        assert_eq!(engine.tick(handle), TickOutcome::Stale);
    }

    #[test]
    fn filter_change_keeps_pins_of_visible_nodes() {
        let mut engine = engine();
        run(&mut engine, 30);
        let alice = engine.view().world_to_screen(engine.node_position(0).unwrap());
        engine.drag_start(alice);
        engine.drag_move(pos2(300.0, 200.0));
        engine.drag_end(true);

        let report = engine.set_filter("person");
        assert_eq!(report.nodes.removed, 3);
        assert_eq!(engine.visible().nodes, vec![0, 1]);
        assert!(engine.pin_state(0).is_some_and(PinState::is_permanent));

        engine.set_filter("");
        assert!(engine.pin_state(0).is_some_and(PinState::is_permanent));
        assert_eq!(engine.node_position(0), Some(vec2(300.0, 200.0)));
    }

    #[test]
    fn filter_while_paused_stays_paused() {
        let mut engine = engine();
        engine.pause();
        engine.set_filter("acme");

        assert_eq!(engine.simulation_state(), SimulationState::Paused);
        assert_eq!(engine.simulation().alpha(), 1.0);
        assert_eq!(engine.visible().nodes.len(), 1);
    }

    #[test]
    fn dataset_reload_restarts_from_seed_positions() {
        let mut engine = engine();
        let seeded = positions(&engine);
        run(&mut engine, 50);
        let bob = engine.node_position(1).unwrap();
        assert!(engine.drag_start(engine.view().world_to_screen(bob)).is_some());
        engine.drag_move(pos2(120.0, 80.0));
        engine.drag_end(true);
        assert_ne!(positions(&engine), seeded);

        engine.set_dataset(demo_dataset()).unwrap();

        assert_eq!(positions(&engine), seeded);
        assert!((0..engine.graph().node_count()).all(|index| {
            engine
                .pin_state(index)
                .is_some_and(|pin| pin == PinState::Free)
        }));
        assert_eq!(engine.simulation_state(), SimulationState::Running);
        assert_eq!(engine.simulation().alpha(), 1.0);
    }

    #[test]
    fn detached_engine_ignores_everything() {
        let mut engine = engine();
        let handle = engine.tick_handle();
        engine.detach();

        assert_eq!(engine.tick(handle), TickOutcome::Stale);
        assert!(matches!(
            engine.set_dataset(demo_dataset()),
            Err(GraphError::Detached)
        ));
        assert!(matches!(engine.fit_to_view(), Err(GraphError::Detached)));
        assert!(!engine.pause());
        assert_eq!(engine.set_filter("alice"), SyncReport::default());
        engine.zoom_by(2.0);
        assert_eq!(engine.view(), ViewTransform::IDENTITY);
        assert_eq!(engine.drag_start(pos2(450.0, 300.0)), None);
    }
}
