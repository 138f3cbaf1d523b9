//! Collision-free placement of new nodes around an anchor point.
//!
//! Nodes share a fixed footprint (`node_width` x `node_height`) plus a
//! spacing margin. Search runs a bounded spiral, then a bounded lattice, and
//! finally a column to the right of everything already placed, which always
//! succeeds.

use std::f32::consts::TAU;

use tracing::debug;

use crate::config::PlacementConfig;
use crate::ir::Position;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlacementStrategy {
    Spiral { ring: usize },
    Grid,
    Terminal,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub position: Position,
    pub strategy: PlacementStrategy,
}

/// Axis-aligned footprint test: overlap iff both gaps are under footprint + margin.
pub fn overlaps(a: Position, b: Position, config: &PlacementConfig) -> bool {
    (a.x - b.x).abs() < config.node_width + config.margin
        && (a.y - b.y).abs() < config.node_height + config.margin
}

fn is_free(candidate: Position, occupied: &[Position], config: &PlacementConfig) -> bool {
    occupied
        .iter()
        .all(|other| !overlaps(candidate, *other, config))
}

/// Preferred point for a batch of new nodes: one column right of the rightmost
/// node, vertically centred on the existing nodes.
pub fn compute_anchor(existing: &[Position], config: &PlacementConfig) -> Position {
    if existing.is_empty() {
        return Position::new(config.default_x, config.default_y);
    }
    let mut max_x = f32::MIN;
    let mut min_y = f32::MAX;
    let mut max_y = f32::MIN;
    for pos in existing {
        max_x = max_x.max(pos.x);
        min_y = min_y.min(pos.y);
        max_y = max_y.max(pos.y);
    }
    Position::new(max_x + config.column_offset(), (min_y + max_y) / 2.0)
}

pub fn place_node(
    anchor: Position,
    occupied: &[Position],
    batch_index: usize,
    config: &PlacementConfig,
) -> Placement {
    if let Some((position, ring)) = spiral_search(anchor, occupied, config) {
        return Placement {
            position,
            strategy: PlacementStrategy::Spiral { ring },
        };
    }
    if let Some(position) = grid_search(anchor, occupied, config) {
        debug!(x = position.x, y = position.y, "spiral exhausted, placed on grid");
        return Placement {
            position,
            strategy: PlacementStrategy::Grid,
        };
    }
    let position = terminal_position(anchor, occupied, batch_index, config);
    debug!(
        x = position.x,
        y = position.y,
        batch_index,
        "grid exhausted, placed in terminal column"
    );
    Placement {
        position,
        strategy: PlacementStrategy::Terminal,
    }
}

fn spiral_search(
    anchor: Position,
    occupied: &[Position],
    config: &PlacementConfig,
) -> Option<(Position, usize)> {
    for ring in 0..config.spiral_rings.max(1) {
        let radius = ring as f32 * config.ring_step;
        let samples = if ring == 0 {
            1
        } else {
            config.points_per_ring.max(1) * ring
        };
        for i in 0..samples {
            let angle = TAU * i as f32 / samples as f32;
            let candidate = snap(Position::new(
                anchor.x + radius * angle.cos(),
                anchor.y + radius * angle.sin(),
            ));
            if is_free(candidate, occupied, config) {
                return Some((candidate, ring));
            }
        }
    }
    None
}

/// Walks lattice points ring by ring (Chebyshev distance from the anchor),
/// row-major within a ring.
fn grid_search(
    anchor: Position,
    occupied: &[Position],
    config: &PlacementConfig,
) -> Option<Position> {
    let extent = config.grid_half_extent as i64;
    for distance in 0..=extent {
        for row in -distance..=distance {
            for col in -distance..=distance {
                if row.abs().max(col.abs()) != distance {
                    continue;
                }
                let candidate = snap(Position::new(
                    anchor.x + col as f32 * config.grid_step,
                    anchor.y + row as f32 * config.grid_step,
                ));
                if is_free(candidate, occupied, config) {
                    return Some(candidate);
                }
            }
        }
    }
    None
}

/// Column right of every occupied node. Monotonic in x, so it cannot overlap
/// anything already placed.
fn terminal_position(
    anchor: Position,
    occupied: &[Position],
    batch_index: usize,
    config: &PlacementConfig,
) -> Position {
    let rightmost = occupied.iter().map(|pos| pos.x).fold(f32::MIN, f32::max);
    let x = if occupied.is_empty() {
        anchor.x
    } else {
        rightmost + config.column_offset()
    };
    let y = anchor.y + batch_index as f32 * (config.node_height + config.margin);
    snap(Position::new(x, y))
}

fn snap(pos: Position) -> Position {
    Position::new(pos.x.round(), pos.y.round())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> PlacementConfig {
        PlacementConfig::default()
    }

    #[test]
    fn overlap_uses_strict_inequality() {
        let cfg = config();
        let a = Position::new(0.0, 0.0);
        let touching = Position::new(cfg.node_width + cfg.margin, 0.0);
        let inside = Position::new(cfg.node_width + cfg.margin - 1.0, 10.0);
        assert!(!overlaps(a, touching, &cfg));
        assert!(overlaps(a, inside, &cfg));
    }

    #[test]
    fn anchor_defaults_without_nodes() {
        let cfg = config();
        assert_eq!(
            compute_anchor(&[], &cfg),
            Position::new(cfg.default_x, cfg.default_y)
        );
    }

    #[test]
    fn anchor_sits_right_of_rightmost_and_vertically_centred() {
        let cfg = config();
        let existing = [Position::new(100.0, 100.0), Position::new(300.0, 300.0)];
        let anchor = compute_anchor(&existing, &cfg);
        assert_eq!(anchor, Position::new(300.0 + cfg.column_offset(), 200.0));
    }

    #[test]
    fn free_anchor_is_used_directly() {
        let cfg = config();
        let placement = place_node(Position::new(500.0, 100.0), &[], 0, &cfg);
        assert_eq!(placement.position, Position::new(500.0, 100.0));
        assert_eq!(placement.strategy, PlacementStrategy::Spiral { ring: 0 });
    }

    #[test]
    fn crowded_anchor_moves_outward_without_overlap() {
        let cfg = config();
        let anchor = Position::new(0.0, 0.0);
        let mut occupied = Vec::new();
        for i in 0..12 {
            let placement = place_node(anchor, &occupied, i, &cfg);
            assert!(is_free(placement.position, &occupied, &cfg));
            occupied.push(placement.position);
        }
    }

    #[test]
    fn falls_through_to_grid_then_terminal() {
        let mut cfg = config();
        cfg.spiral_rings = 1;
        let anchor = Position::new(0.0, 0.0);
        let blocked = vec![anchor];
        let placement = place_node(anchor, &blocked, 0, &cfg);
        assert_eq!(placement.strategy, PlacementStrategy::Grid);

        cfg.grid_half_extent = 0;
        let placement = place_node(anchor, &blocked, 3, &cfg);
        assert_eq!(placement.strategy, PlacementStrategy::Terminal);
        assert_eq!(placement.position.x, cfg.column_offset());
        assert_eq!(
            placement.position.y,
            3.0 * (cfg.node_height + cfg.margin)
        );
        assert!(is_free(placement.position, &blocked, &cfg));
    }
}
