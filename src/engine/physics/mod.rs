mod forces;

use eframe::egui::Vec2;
use log::debug;

use super::interaction::PinState;
use crate::config::SimulationConfig;
use crate::graph::Subgraph;
use forces::{ChargeParams, CollisionParams, accumulate_charge, accumulate_collisions, apply_links};

/// Mutable layout state for one dataset node. The engine keeps these in an
/// arena indexed like [`crate::graph::Graph::nodes`]; the solver and the scene
/// both address nodes by that index.
#[derive(Clone, Debug)]
pub struct SimNode {
    pub world_pos: Vec2,
    pub velocity: Vec2,
    /// Position fixed by the dataset.
    pub anchor: Option<Vec2>,
    pub pin: PinState,
}

impl SimNode {
    pub fn new(world_pos: Vec2, anchor: Option<Vec2>) -> Self {
        Self {
            world_pos: anchor.unwrap_or(world_pos),
            velocity: Vec2::ZERO,
            anchor,
            pin: PinState::Free,
        }
    }

    pub fn fixed_position(&self) -> Option<Vec2> {
        self.pin.position().or(self.anchor)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SimulationState {
    Cold,
    Running,
    Settled,
    Paused,
}

impl SimulationState {
    pub fn label(self) -> &'static str {
        match self {
            Self::Cold => "idle",
            Self::Running => "running",
            Self::Settled => "settled",
            Self::Paused => "paused",
        }
    }
}

#[derive(Default)]
struct PhysicsScratch {
    positions: Vec<Vec2>,
    impulses: Vec<Vec2>,
    degree: Vec<u32>,
}

pub struct Simulation {
    alpha: f32,
    alpha_target: f32,
    state: SimulationState,
    scratch: PhysicsScratch,
}

impl Default for Simulation {
    fn default() -> Self {
        Self::new()
    }
}

impl Simulation {
    pub fn new() -> Self {
        Self {
            alpha: 0.0,
            alpha_target: 0.0,
            state: SimulationState::Cold,
            scratch: PhysicsScratch::default(),
        }
    }

    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    pub fn alpha_target(&self) -> f32 {
        self.alpha_target
    }

    pub fn state(&self) -> SimulationState {
        self.state
    }

    /// Full restart used when the dataset is replaced; clears a pause too.
    pub fn reset(&mut self, alpha: f32) {
        self.alpha = alpha;
        self.alpha_target = 0.0;
        self.state = SimulationState::Running;
    }

    /// Sets the temperature and starts ticking unless the user paused.
    pub fn restart(&mut self, alpha: f32) {
        self.alpha = alpha;
        self.wake();
    }

    /// Raises the temperature to at least `alpha` without cooling a hotter layout.
    pub fn reheat(&mut self, alpha: f32) {
        self.alpha = self.alpha.max(alpha);
        self.wake();
    }

    pub fn set_alpha_target(&mut self, target: f32) {
        self.alpha_target = target;
        if target > 0.0 {
            self.wake();
        }
    }

    fn wake(&mut self) {
        if matches!(self.state, SimulationState::Cold | SimulationState::Settled) {
            self.state = SimulationState::Running;
        }
    }

    /// Returns `false` when already paused.
    pub fn pause(&mut self) -> bool {
        if self.state == SimulationState::Paused {
            return false;
        }
        self.state = SimulationState::Paused;
        true
    }

    /// Returns `false` unless the simulation was paused.
    pub fn resume(&mut self, alpha: f32) -> bool {
        if self.state != SimulationState::Paused {
            return false;
        }
        self.alpha = alpha;
        self.state = SimulationState::Running;
        true
    }

    /// Advances the layout by one tick. Returns `false` without touching any
    /// node when the simulation is not running.
    pub fn step(
        &mut self,
        nodes: &mut [SimNode],
        visible: &Subgraph,
        center: Vec2,
        config: &SimulationConfig,
    ) -> bool {
        if self.state != SimulationState::Running {
            return false;
        }

        self.alpha += (self.alpha_target - self.alpha) * config.alpha_decay;
        let alpha = self.alpha;

        if !visible.nodes.is_empty() {
            apply_links(
                nodes,
                &visible.edges,
                &mut self.scratch.degree,
                config.link_distance,
                config.link_strength,
                alpha,
            );
            self.apply_charge(nodes, visible, config, alpha);
            apply_centering(nodes, visible, center, config.center_strength);
            self.apply_collision(nodes, visible, config);
            integrate(nodes, visible, center, config.velocity_decay);
        }

        if self.alpha < config.alpha_min {
            self.state = SimulationState::Settled;
            debug!("layout settled at alpha {:.4}", self.alpha);
        }
        true
    }

    fn apply_charge(
        &mut self,
        nodes: &mut [SimNode],
        visible: &Subgraph,
        config: &SimulationConfig,
        alpha: f32,
    ) {
        let scratch = &mut self.scratch;
        scratch.positions.clear();
        scratch
            .positions
            .extend(visible.nodes.iter().map(|&index| nodes[index].world_pos));
        scratch.impulses.clear();
        scratch.impulses.resize(visible.nodes.len(), Vec2::ZERO);

        accumulate_charge(
            &scratch.positions,
            ChargeParams {
                strength: config.charge_strength,
                alpha,
                distance_min_sq: config.charge_distance_min * config.charge_distance_min,
            },
            &mut scratch.impulses,
        );

        for (local, &index) in visible.nodes.iter().enumerate() {
            nodes[index].velocity += scratch.impulses[local];
        }
    }

    fn apply_collision(&mut self, nodes: &mut [SimNode], visible: &Subgraph, config: &SimulationConfig) {
        if config.collision_radius <= 0.0 || config.collision_strength <= 0.0 {
            return;
        }

        let scratch = &mut self.scratch;
        scratch.positions.clear();
        scratch.positions.extend(
            visible
                .nodes
                .iter()
                .map(|&index| nodes[index].world_pos + nodes[index].velocity),
        );
        scratch.impulses.clear();
        scratch.impulses.resize(visible.nodes.len(), Vec2::ZERO);

        accumulate_collisions(
            &scratch.positions,
            CollisionParams {
                radius: config.collision_radius,
                strength: config.collision_strength,
            },
            &mut scratch.impulses,
        );

        for (local, &index) in visible.nodes.iter().enumerate() {
            nodes[index].velocity += scratch.impulses[local];
        }
    }
}

/// Shifts free nodes so the centroid of the visible layout drifts toward `center`.
fn apply_centering(nodes: &mut [SimNode], visible: &Subgraph, center: Vec2, strength: f32) {
    let count = visible.nodes.len() as f32;
    let centroid = visible
        .nodes
        .iter()
        .fold(Vec2::ZERO, |sum, &index| sum + nodes[index].world_pos)
        / count;
    let shift = (center - centroid) * strength;

    for &index in &visible.nodes {
        if nodes[index].fixed_position().is_none() {
            nodes[index].world_pos += shift;
        }
    }
}

fn integrate(nodes: &mut [SimNode], visible: &Subgraph, center: Vec2, velocity_decay: f32) {
    for &index in &visible.nodes {
        let node = &mut nodes[index];
        if let Some(fixed) = node.fixed_position() {
            node.world_pos = fixed;
            node.velocity = Vec2::ZERO;
            continue;
        }

        node.velocity *= velocity_decay;
        node.world_pos += node.velocity;
        if !node.world_pos.is_finite() || !node.velocity.is_finite() {
            node.world_pos = center;
            node.velocity = Vec2::ZERO;
        }
    }
}
