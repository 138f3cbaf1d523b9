mod ranking;
pub(crate) mod types;
pub use types::*;
use ranking::*;

use crate::config::LayoutConfig;
use crate::ir::{Direction, Graph, Position};
use std::collections::BTreeMap;

/// Layered layout of the whole graph. Edges are read, never changed.
///
/// Output depends only on node ids and edge structure: old positions, labels
/// and categories are ignored, so repeated calls on the same structure agree.
pub fn compute_layout(graph: &Graph, direction: Direction, config: &LayoutConfig) -> LayoutResult {
    let node_ids: Vec<String> = graph.nodes.keys().cloned().collect();
    let edges: Vec<(String, String)> = graph
        .edges
        .values()
        .filter(|edge| graph.contains_node(&edge.source) && graph.contains_node(&edge.target))
        .map(|edge| (edge.source.clone(), edge.target.clone()))
        .collect();

    let rank_graph = RankGraph::new(&node_ids, &edges);
    let Ranking { ranks, overflow } = compute_ranks(&rank_graph);
    let layer_count = ranks.iter().flatten().max().map_or(0, |max| max + 1);
    let mut layers: Vec<Vec<usize>> = vec![Vec::new(); layer_count];
    for (node, rank) in ranks.iter().enumerate() {
        if let Some(rank) = rank {
            layers[*rank].push(node);
        }
    }
    order_layers(&mut layers, &rank_graph, config.order_passes);
    layers.extend(overflow.chunks(config.overflow_wrap.max(1)).map(<[usize]>::to_vec));

    let rows: Vec<Vec<&str>> = layers
        .iter()
        .map(|layer| layer.iter().map(|&node| node_ids[node].as_str()).collect())
        .collect();
    let positions = assign_positions(&rows, direction, config);
    let bounds = bounds_of(&positions, config.node_width, config.node_height);
    LayoutResult {
        direction,
        positions,
        ranks: ranks
            .iter()
            .enumerate()
            .filter_map(|(node, rank)| rank.map(|rank| (node_ids[node].clone(), rank)))
            .collect(),
        overflow: overflow.iter().map(|&node| node_ids[node].clone()).collect(),
        width: bounds.map(|b| b.width()).unwrap_or(0.0),
        height: bounds.map(|b| b.height()).unwrap_or(0.0),
    }
}

/// Copy of `graph` with every node moved to its layout position.
pub fn tidy_graph(graph: &Graph, direction: Direction, config: &LayoutConfig) -> Graph {
    let layout = compute_layout(graph, direction, config);
    let mut tidied = graph.clone();
    for (id, position) in layout.positions {
        if let Some(node) = tidied.nodes.get_mut(&id) {
            node.position = position;
        }
    }
    tidied
}

/// Translates a layout so its bounding box is centred in `viewport`, and
/// returns the zoom that fits it inside the padded viewport (never above 1).
pub fn center_and_fit(
    layout: &LayoutResult,
    viewport: Viewport,
    padding: f32,
    config: &LayoutConfig,
) -> FitResult {
    let Some(bounds) = bounds_of(&layout.positions, config.node_width, config.node_height) else {
        return FitResult {
            positions: BTreeMap::new(),
            zoom: 1.0,
        };
    };
    let target = Position::new(viewport.width / 2.0, viewport.height / 2.0);
    let center = bounds.center();
    let (dx, dy) = (target.x - center.x, target.y - center.y);
    let positions = layout
        .positions
        .iter()
        .map(|(id, pos)| (id.clone(), Position::new(pos.x + dx, pos.y + dy)))
        .collect();

    let avail_w = (viewport.width - 2.0 * padding).max(1.0);
    let avail_h = (viewport.height - 2.0 * padding).max(1.0);
    let zoom = (avail_w / bounds.width().max(1.0))
        .min(avail_h / bounds.height().max(1.0))
        .min(1.0);
    FitResult { positions, zoom }
}

/// Bounding box of node footprints placed at top-left `positions`.
pub fn bounds_of(
    positions: &BTreeMap<String, Position>,
    node_width: f32,
    node_height: f32,
) -> Option<Bounds> {
    let mut iter = positions.values();
    let first = iter.next()?;
    let mut bounds = Bounds {
        min_x: first.x,
        min_y: first.y,
        max_x: first.x + node_width,
        max_y: first.y + node_height,
    };
    for pos in iter {
        bounds.min_x = bounds.min_x.min(pos.x);
        bounds.min_y = bounds.min_y.min(pos.y);
        bounds.max_x = bounds.max_x.max(pos.x + node_width);
        bounds.max_y = bounds.max_y.max(pos.y + node_height);
    }
    Some(bounds)
}

/// Ranks run along the main axis, nodes inside a rank along the cross axis,
/// each rank centred on the cross axis. The result is shifted so the top-left
/// of the bounding box sits at the origin.
fn assign_positions(
    rows: &[Vec<&str>],
    direction: Direction,
    config: &LayoutConfig,
) -> BTreeMap<String, Position> {
    let horizontal = direction.is_horizontal();
    let (main_extent, cross_extent) = if horizontal {
        (config.node_width, config.node_height)
    } else {
        (config.node_height, config.node_width)
    };
    let main_step = main_extent + config.rank_spacing;
    let cross_step = cross_extent + config.node_spacing;

    let mut positions = BTreeMap::new();
    for (rank, bucket) in rows.iter().enumerate() {
        let main = rank as f32 * main_step;
        let main = if direction.is_reversed() { -main } else { main };
        let span = bucket.len().saturating_sub(1) as f32 * cross_step;
        for (idx, node_id) in bucket.iter().enumerate() {
            let cross = idx as f32 * cross_step - span / 2.0;
            let (cx, cy) = if horizontal { (main, cross) } else { (cross, main) };
            positions.insert(
                node_id.to_string(),
                Position::new(cx - config.node_width / 2.0, cy - config.node_height / 2.0),
            );
        }
    }

    if let Some(bounds) = bounds_of(&positions, config.node_width, config.node_height) {
        for pos in positions.values_mut() {
            pos.x -= bounds.min_x;
            pos.y -= bounds.min_y;
        }
    }
    positions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Edge, Node};

    fn graph(nodes: &[&str], edges: &[(&str, &str)]) -> Graph {
        let mut graph = Graph::new();
        for id in nodes {
            graph.insert_node(Node::new(*id, *id, "concept", Position::default()));
        }
        for (idx, (from, to)) in edges.iter().enumerate() {
            graph.insert_edge(Edge::new(format!("e{idx}"), *from, *to, ""));
        }
        graph
    }

    fn no_overlap(layout: &LayoutResult, config: &LayoutConfig) -> bool {
        let positions: Vec<&Position> = layout.positions.values().collect();
        for i in 0..positions.len() {
            for j in (i + 1)..positions.len() {
                let (a, b) = (positions[i], positions[j]);
                if (a.x - b.x).abs() < config.node_width && (a.y - b.y).abs() < config.node_height {
                    return false;
                }
            }
        }
        true
    }

    #[test]
    fn top_bottom_places_targets_below_sources() {
        let config = LayoutConfig::default();
        let g = graph(&["a", "b", "c"], &[("a", "b"), ("a", "c")]);
        let layout = compute_layout(&g, Direction::TopBottom, &config);
        let a = layout.positions["a"];
        let b = layout.positions["b"];
        let c = layout.positions["c"];
        assert!(b.y > a.y);
        assert_eq!(b.y, c.y);
        assert!(no_overlap(&layout, &config));
    }

    #[test]
    fn left_right_and_reversed_directions() {
        let config = LayoutConfig::default();
        let g = graph(&["a", "b"], &[("a", "b")]);
        let lr = compute_layout(&g, Direction::LeftRight, &config);
        assert!(lr.positions["b"].x > lr.positions["a"].x);
        let bt = compute_layout(&g, Direction::BottomTop, &config);
        assert!(bt.positions["b"].y < bt.positions["a"].y);
        let rl = compute_layout(&g, Direction::RightLeft, &config);
        assert!(rl.positions["b"].x < rl.positions["a"].x);
    }

    #[test]
    fn cycle_members_are_ranked_and_only_isolated_nodes_overflow() {
        let config = LayoutConfig::default();
        let g = graph(&["a", "b", "c", "solo"], &[("a", "b"), ("b", "c"), ("c", "b")]);
        let layout = compute_layout(&g, Direction::TopBottom, &config);
        assert_eq!(layout.overflow, vec!["solo"]);
        assert_eq!(layout.ranks["a"], 0);
        assert_eq!(layout.ranks["b"], 1);
        assert_eq!(layout.ranks["c"], 2);
        assert_eq!(layout.positions.len(), 4);
        assert!(layout.positions["solo"].y > layout.positions["c"].y);
        assert!(no_overlap(&layout, &config));
    }

    #[test]
    fn chain_below_a_mutual_pair_keeps_flowing_down() {
        let config = LayoutConfig::default();
        let g = graph(
            &["a", "b", "c", "d", "e", "f"],
            &[("a", "b"), ("b", "a"), ("b", "c"), ("c", "d"), ("d", "e"), ("e", "f")],
        );
        let layout = compute_layout(&g, Direction::TopBottom, &config);
        assert!(layout.overflow.is_empty());
        let y = |id: &str| layout.positions[id].y;
        assert!(y("b") < y("c"));
        assert!(y("c") < y("d"));
        assert!(y("d") < y("e"));
        assert!(y("e") < y("f"));
        for (from, to) in [("b", "c"), ("c", "d"), ("d", "e"), ("e", "f")] {
            assert!(layout.ranks[from] < layout.ranks[to], "{from} -> {to}");
        }
        assert!(no_overlap(&layout, &config));
    }

    #[test]
    fn tidy_graph_moves_nodes_to_layout_positions() {
        let config = LayoutConfig::default();
        let g = graph(&["a", "b"], &[("a", "b")]);
        let layout = compute_layout(&g, Direction::LeftRight, &config);
        let tidied = tidy_graph(&g, Direction::LeftRight, &config);
        assert_eq!(tidied.edges, g.edges);
        for (id, position) in &layout.positions {
            assert_eq!(tidied.nodes[id].position, *position);
        }
    }

    #[test]
    fn overflow_wraps_into_rows() {
        let mut config = LayoutConfig::default();
        config.overflow_wrap = 2;
        let g = graph(&["a", "b", "c"], &[]);
        let layout = compute_layout(&g, Direction::TopBottom, &config);
        assert_eq!(layout.positions["a"].y, layout.positions["b"].y);
        assert!(layout.positions["c"].y > layout.positions["a"].y);
    }

    #[test]
    fn layout_is_deterministic_and_ignores_old_positions() {
        let config = LayoutConfig::default();
        let mut g = graph(
            &["a", "b", "c", "d", "e"],
            &[("a", "b"), ("a", "c"), ("b", "d"), ("c", "d"), ("d", "e")],
        );
        let first = compute_layout(&g, Direction::TopBottom, &config);
        g.nodes.get_mut("c").unwrap().position = Position::new(999.0, -5.0);
        let second = compute_layout(&g, Direction::TopBottom, &config);
        assert_eq!(first, second);
    }

    #[test]
    fn fit_centres_bounding_box() {
        let config = LayoutConfig::default();
        let g = graph(&["a", "b"], &[("a", "b")]);
        let layout = compute_layout(&g, Direction::TopBottom, &config);
        let fit = center_and_fit(
            &layout,
            Viewport {
                width: 1000.0,
                height: 800.0,
            },
            20.0,
            &config,
        );
        let bounds = bounds_of(&fit.positions, config.node_width, config.node_height).unwrap();
        assert_eq!(bounds.center(), Position::new(500.0, 400.0));
        assert_eq!(fit.zoom, 1.0);

        let tiny = center_and_fit(
            &layout,
            Viewport {
                width: 100.0,
                height: 100.0,
            },
            0.0,
            &config,
        );
        assert!(tiny.zoom < 1.0);
    }

    #[test]
    fn empty_graph_yields_empty_layout() {
        let layout = compute_layout(&Graph::new(), Direction::TopBottom, &LayoutConfig::default());
        assert!(layout.positions.is_empty());
        assert_eq!(layout.width, 0.0);
    }
}
