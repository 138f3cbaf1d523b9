//! Property-based invariant tests for merge, history and layout.
//!
//! 1. Merged nodes never overlap any other node.
//! 2. No edge references a missing node after a merge.
//! 3. Canonical duplicates of existing labels are never added.
//! 4. Undoing every mutation restores the starting graph; redo replays it.
//! 5. Layout is deterministic and overlap-free for arbitrary edge sets.
//! 6. Edges outside a cycle always point to a later layer; only isolated
//!    nodes overflow.

use std::collections::BTreeSet;
use std::time::Instant;

use concept_map_engine::config::{Config, LayoutConfig, PlacementConfig};
use concept_map_engine::document::{CandidateEdge, CandidateNode};
use concept_map_engine::ids::SequentialIds;
use concept_map_engine::merge::canonical_label;
use concept_map_engine::placement::overlaps;
use concept_map_engine::{
    Direction, Edge, Graph, GraphStore, Node, Position, Suggestion, compute_layout,
};
use proptest::prelude::*;

// ── Helpers ─────────────────────────────────────────────────────────────

fn graph_strategy() -> impl Strategy<Value = Graph> {
    prop::collection::vec((-600.0f32..1200.0, -600.0f32..1200.0), 0..12).prop_map(|points| {
        let mut graph = Graph::new();
        for (i, (x, y)) in points.into_iter().enumerate() {
            graph.insert_node(Node::new(
                format!("n{i}"),
                format!("Existing {i}"),
                "concept",
                Position::new(x.round(), y.round()),
            ));
        }
        graph
    })
}

fn endpoint_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        (0usize..8).prop_map(|i| format!("t{i}")),
        (0usize..12).prop_map(|i| format!("n{i}")),
        Just("ghost".to_string()),
    ]
}

fn suggestion_strategy() -> impl Strategy<Value = Suggestion> {
    let nodes = prop::collection::vec((any::<bool>(), 0usize..14), 0..8);
    let edges = prop::collection::vec((endpoint_strategy(), endpoint_strategy()), 0..12);
    (nodes, edges).prop_map(|(nodes, edges)| Suggestion {
        new_nodes: nodes
            .into_iter()
            .enumerate()
            .map(|(i, (with_id, label))| {
                let temp_id = format!("t{i}");
                // Labels below 12 collide with existing ones, modulo case.
                let label = if label < 12 {
                    format!("  EXISTING {label} ")
                } else {
                    format!("Fresh {i}-{label}")
                };
                CandidateNode::new(with_id.then_some(temp_id.as_str()), &label, "concept")
            })
            .collect(),
        new_edges: edges
            .into_iter()
            .map(|(source, target)| CandidateEdge::new(&source, &target, ""))
            .collect(),
    })
}

fn edges_strategy() -> impl Strategy<Value = (usize, Vec<(usize, usize)>)> {
    (1usize..16).prop_flat_map(|n| (Just(n), prop::collection::vec((0..n, 0..n), 0..24)))
}

fn edge_graph(n: usize, pairs: &[(usize, usize)]) -> Graph {
    let mut graph = Graph::new();
    for i in 0..n {
        graph.insert_node(Node::new(format!("v{i:02}"), "", "concept", Position::default()));
    }
    for (idx, (a, b)) in pairs.iter().enumerate() {
        graph.insert_edge(Edge::new(format!("e{idx}"), format!("v{a:02}"), format!("v{b:02}"), ""));
    }
    graph
}

fn reaches(n: usize, pairs: &[(usize, usize)], from: usize, to: usize) -> bool {
    let mut seen = vec![false; n];
    let mut stack = vec![from];
    seen[from] = true;
    while let Some(node) = stack.pop() {
        if node == to {
            return true;
        }
        for &(a, b) in pairs {
            if a == node && !seen[b] {
                seen[b] = true;
                stack.push(b);
            }
        }
    }
    false
}

fn store_for(graph: Graph) -> GraphStore {
    GraphStore::new("prop", &Config::default())
        .with_ids(SequentialIds::new())
        .with_graph(graph)
}

// ═════════════════════════════════════════════════════════════════════════
// 1-3. Merge invariants
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn merge_keeps_graph_consistent(graph in graph_strategy(), suggestion in suggestion_strategy()) {
        let before_ids: Vec<String> = graph.nodes.keys().cloned().collect();
        let existing_labels: Vec<String> =
            graph.nodes.values().map(|n| canonical_label(&n.label)).collect();
        let mut store = store_for(graph);
        let report = store.merge(&suggestion, Instant::now()).unwrap();
        let after = store.graph();
        let cfg = PlacementConfig::default();

        prop_assert!(after.dangling_edges().is_empty());
        prop_assert_eq!(after.nodes.len(), before_ids.len() + report.nodes_added);

        for id in &report.added_node_ids {
            let added = &after.nodes[id];
            prop_assert!(!existing_labels.contains(&canonical_label(&added.label)));
            for other in after.nodes.values().filter(|n| &n.id != id) {
                prop_assert!(
                    !overlaps(added.position, other.position, &cfg),
                    "{} {:?} overlaps {} {:?}",
                    id, added.position, other.id, other.position
                );
            }
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 4. Undo/redo round trip
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn undo_redo_round_trip(ops in prop::collection::vec(0u8..5, 1..160)) {
        let mut store = store_for(Graph::new());
        let start = store.snapshot();
        let mut applied = 0usize;
        for (step, op) in ops.iter().enumerate() {
            let ids: Vec<String> = store.graph().nodes.keys().cloned().collect();
            let changed = match op {
                0 | 1 => {
                    store.add_node(&format!("N{step}"), "concept");
                    true
                }
                2 if ids.len() >= 2 => {
                    store.add_edge(&ids[0], &ids[ids.len() - 1], "");
                    true
                }
                3 if !ids.is_empty() => store.update_node(&ids[0], &format!("R{step}"), None),
                4 if !ids.is_empty() => store.delete_node(&ids[ids.len() - 1]),
                _ => false,
            };
            if changed {
                applied += 1;
            }
        }
        let end = store.snapshot();
        for _ in 0..applied {
            prop_assert!(store.undo());
        }
        prop_assert_eq!(store.snapshot(), start);
        prop_assert!(!store.undo());
        for _ in 0..applied {
            prop_assert!(store.redo());
        }
        prop_assert_eq!(store.snapshot(), end);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 5. Layout determinism and spacing
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn layout_deterministic_and_spaced((n, pairs) in edges_strategy()) {
        let graph = edge_graph(n, &pairs);
        let config = LayoutConfig::default();
        let first = compute_layout(&graph, Direction::TopBottom, &config);
        let second = compute_layout(&graph, Direction::TopBottom, &config);
        prop_assert_eq!(&first, &second);
        prop_assert_eq!(first.positions.len(), n);

        let points: Vec<&Position> = first.positions.values().collect();
        for i in 0..points.len() {
            for j in (i + 1)..points.len() {
                let (a, b) = (points[i], points[j]);
                prop_assert!(
                    (a.x - b.x).abs() >= config.node_width || (a.y - b.y).abs() >= config.node_height
                );
            }
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 6. Rank order across cycles
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn acyclic_edges_point_to_later_layers((n, pairs) in edges_strategy()) {
        let graph = edge_graph(n, &pairs);
        let config = LayoutConfig::default();
        let layout = compute_layout(&graph, Direction::TopBottom, &config);

        let connected: BTreeSet<String> = pairs
            .iter()
            .flat_map(|(a, b)| [format!("v{a:02}"), format!("v{b:02}")])
            .collect();
        let isolated: Vec<String> = (0..n)
            .map(|i| format!("v{i:02}"))
            .filter(|id| !connected.contains(id))
            .collect();
        prop_assert_eq!(&layout.overflow, &isolated);
        for id in &connected {
            prop_assert!(layout.ranks.contains_key(id), "{} has no layer", id);
        }

        for &(a, b) in &pairs {
            if a == b || reaches(n, &pairs, b, a) {
                continue;
            }
            let (from, to) = (format!("v{a:02}"), format!("v{b:02}"));
            prop_assert!(
                layout.ranks[&from] < layout.ranks[&to],
                "{} (rank {}) -> {} (rank {})",
                from, layout.ranks[&from], to, layout.ranks[&to]
            );
            prop_assert!(layout.positions[&from].y < layout.positions[&to].y);
        }
    }
}
