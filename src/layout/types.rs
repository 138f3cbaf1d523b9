use std::collections::BTreeMap;

use crate::ir::{Direction, Position};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min_x: f32,
    pub min_y: f32,
    pub max_x: f32,
    pub max_y: f32,
}

impl Bounds {
    pub fn width(&self) -> f32 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f32 {
        self.max_y - self.min_y
    }

    pub fn center(&self) -> Position {
        Position::new(
            (self.min_x + self.max_x) / 2.0,
            (self.min_y + self.max_y) / 2.0,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LayoutResult {
    pub direction: Direction,
    /// Top-left corner per node id.
    pub positions: BTreeMap<String, Position>,
    /// Layer per connected node. Isolated nodes have no entry.
    pub ranks: BTreeMap<String, usize>,
    /// Nodes without incident edges, in id order, laid out after the last layer.
    pub overflow: Vec<String>,
    pub width: f32,
    pub height: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FitResult {
    pub positions: BTreeMap<String, Position>,
    pub zoom: f32,
}
