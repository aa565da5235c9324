use eframe::egui::Vec2;

use super::SimNode;
use crate::graph::ResolvedEdge;
use crate::util::separation_direction;

const JIGGLE: f32 = 1e-6;

fn nudge_if_coincident(delta: Vec2, a: usize, b: usize) -> Vec2 {
    if delta == Vec2::ZERO {
        separation_direction(a, b) * JIGGLE
    } else {
        delta
    }
}

/// Soft springs pulling linked nodes toward `distance`, split between the
/// endpoints in proportion to the other endpoint's degree.
pub(super) fn apply_links(
    nodes: &mut [SimNode],
    edges: &[ResolvedEdge],
    degree: &mut Vec<u32>,
    distance: f32,
    strength: f32,
    alpha: f32,
) {
    degree.clear();
    degree.resize(nodes.len(), 0);
    for edge in edges {
        if edge.source < nodes.len() && edge.target < nodes.len() && edge.source != edge.target {
            degree[edge.source] += 1;
            degree[edge.target] += 1;
        }
    }

    for edge in edges {
        let (source, target) = (edge.source, edge.target);
        if source >= nodes.len() || target >= nodes.len() || source == target {
            continue;
        }

        let delta = (nodes[target].world_pos + nodes[target].velocity)
            - (nodes[source].world_pos + nodes[source].velocity);
        let delta = nudge_if_coincident(delta, source, target);
        let length = delta.length();
        let correction = delta * ((length - distance) / length * alpha * strength);

        let source_degree = degree[source] as f32;
        let bias = source_degree / (source_degree + degree[target] as f32);

        nodes[target].velocity -= correction * bias;
        nodes[source].velocity += correction * (1.0 - bias);
    }
}

#[derive(Clone, Copy)]
pub(super) struct ChargeParams {
    pub(super) strength: f32,
    pub(super) alpha: f32,
    pub(super) distance_min_sq: f32,
}

impl ChargeParams {
    fn impulse(self, delta: Vec2) -> Vec2 {
        let mut distance_sq = delta.length_sq();
        if distance_sq < self.distance_min_sq {
            distance_sq = (self.distance_min_sq * distance_sq).sqrt();
        }
        delta * (self.strength * self.alpha / distance_sq)
    }
}

/// Many-body repulsion over every pair of `positions`. Each pair is visited
/// once and both ends receive equal and opposite impulses.
pub(super) fn accumulate_charge(positions: &[Vec2], params: ChargeParams, impulses: &mut [Vec2]) {
    for (from, &origin) in positions.iter().enumerate() {
        for (offset, &other) in positions[from + 1..].iter().enumerate() {
            let to = from + 1 + offset;
            let delta = nudge_if_coincident(other - origin, from, to);
            let impulse = params.impulse(delta);
            impulses[from] += impulse;
            impulses[to] -= impulse;
        }
    }
}

#[derive(Clone, Copy)]
pub(super) struct CollisionParams {
    pub(super) radius: f32,
    pub(super) strength: f32,
}

/// Pushes apart every pair of points closer than two radii. `positions` are
/// the positions the nodes would reach this tick, so overlap is resolved
/// before it becomes visible.
pub(super) fn accumulate_collisions(positions: &[Vec2], params: CollisionParams, impulses: &mut [Vec2]) {
    let min_distance = params.radius * 2.0;
    for (from, &origin) in positions.iter().enumerate() {
        for (offset, &other) in positions[from + 1..].iter().enumerate() {
            let to = from + 1 + offset;
            let delta = origin - other;
            if delta.length_sq() >= min_distance * min_distance {
                continue;
            }

            let delta = nudge_if_coincident(delta, from, to);
            let distance = delta.length();
            let push = delta * ((min_distance - distance) / distance * params.strength);
            impulses[from] += push * 0.5;
            impulses[to] -= push * 0.5;
        }
    }
}

#[cfg(test)]
mod tests {
    use eframe::egui::vec2;

    use super::*;

    const CHARGE: ChargeParams = ChargeParams {
        strength: -120.0,
        alpha: 1.0,
        distance_min_sq: 1.0,
    };

    const COLLISION: CollisionParams = CollisionParams {
        radius: 24.0,
        strength: 1.0,
    };

    #[test]
    fn charge_pushes_neighbours_apart() {
        let positions = vec![vec2(0.0, 0.0), vec2(10.0, 0.0)];
        let mut impulses = vec![Vec2::ZERO; 2];

        accumulate_charge(&positions, CHARGE, &mut impulses);

        assert!(impulses[0].x < 0.0);
        assert!(impulses[1].x > 0.0);
        assert_eq!(impulses[0].y, 0.0);
        assert!((impulses[0].x - -12.0).abs() < 1e-4);
    }

    #[test]
    fn charge_impulses_cancel_out() {
        let positions = (0..25)
            .map(|index| vec2((index % 5) as f32 * 30.0, (index / 5) as f32 * 17.0))
            .collect::<Vec<_>>();
        let mut impulses = vec![Vec2::ZERO; positions.len()];

        accumulate_charge(&positions, CHARGE, &mut impulses);

        let total = impulses.iter().fold(Vec2::ZERO, |sum, impulse| sum + *impulse);
        assert!(total.length() < 1e-3, "net impulse {total:?}");
        // Corner nodes are pushed outward, away from the grid.
        assert!(impulses[0].x < 0.0 && impulses[0].y < 0.0);
        assert!(impulses[24].x > 0.0 && impulses[24].y > 0.0);
    }

    #[test]
    fn coincident_charge_stays_finite() {
        let positions = vec![vec2(4.0, 4.0); 3];
        let mut impulses = vec![Vec2::ZERO; 3];

        accumulate_charge(&positions, CHARGE, &mut impulses);

        assert!(impulses.iter().all(|impulse| impulse.is_finite()));
        assert!(impulses.iter().any(|impulse| *impulse != Vec2::ZERO));
    }

    #[test]
    fn collisions_only_touch_overlapping_pairs() {
        let positions = vec![vec2(0.0, 0.0), vec2(10.0, 0.0), vec2(500.0, 0.0)];
        let mut impulses = vec![Vec2::ZERO; positions.len()];

        accumulate_collisions(&positions, COLLISION, &mut impulses);

        assert!(impulses[0].x < 0.0);
        assert!(impulses[1].x > 0.0);
        assert_eq!(impulses[2], Vec2::ZERO);
        assert!((impulses[0] + impulses[1]).length() < 1e-4);
    }

    #[test]
    fn coincident_collision_still_separates() {
        let positions = vec![vec2(3.0, 3.0), vec2(3.0, 3.0)];
        let mut impulses = vec![Vec2::ZERO; 2];

        accumulate_collisions(&positions, COLLISION, &mut impulses);

        assert!(impulses.iter().all(|impulse| impulse.is_finite()));
        assert!(impulses[0].length() > 1.0);
    }
}
