use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

/// Index-based adjacency over the nodes handed to the layout. Index order is
/// the tie-break order for every deterministic choice below.
pub(super) struct RankGraph {
    pub outgoing: Vec<Vec<usize>>,
    pub incoming: Vec<Vec<usize>>,
    /// Node has at least one incident edge, self-loops included.
    pub connected: Vec<bool>,
}

impl RankGraph {
    /// Edges naming unknown ids are skipped. Self-loops only mark the node
    /// as connected.
    pub fn new(node_ids: &[String], edges: &[(String, String)]) -> Self {
        let index: HashMap<&str, usize> = node_ids
            .iter()
            .enumerate()
            .map(|(idx, id)| (id.as_str(), idx))
            .collect();
        let n = node_ids.len();
        let mut graph = Self {
            outgoing: vec![Vec::new(); n],
            incoming: vec![Vec::new(); n],
            connected: vec![false; n],
        };
        for (from, to) in edges {
            let (Some(&from), Some(&to)) = (index.get(from.as_str()), index.get(to.as_str())) else {
                continue;
            };
            graph.connected[from] = true;
            graph.connected[to] = true;
            if from != to {
                graph.outgoing[from].push(to);
                graph.incoming[to].push(from);
            }
        }
        graph
    }

    pub fn len(&self) -> usize {
        self.outgoing.len()
    }

    /// Strongly connected component id per node (Kosaraju, iterative).
    fn components(&self) -> Vec<usize> {
        let n = self.len();
        let mut visited = vec![false; n];
        let mut finished = Vec::with_capacity(n);
        for start in 0..n {
            if visited[start] {
                continue;
            }
            visited[start] = true;
            let mut stack = vec![(start, 0usize)];
            while let Some(top) = stack.last_mut() {
                let (node, child) = *top;
                if let Some(&next) = self.outgoing[node].get(child) {
                    top.1 += 1;
                    if !visited[next] {
                        visited[next] = true;
                        stack.push((next, 0));
                    }
                } else {
                    finished.push(node);
                    stack.pop();
                }
            }
        }

        let mut component = vec![usize::MAX; n];
        let mut next_id = 0;
        for &root in finished.iter().rev() {
            if component[root] != usize::MAX {
                continue;
            }
            component[root] = next_id;
            let mut stack = vec![root];
            while let Some(node) = stack.pop() {
                for &pred in &self.incoming[node] {
                    if component[pred] == usize::MAX {
                        component[pred] = next_id;
                        stack.push(pred);
                    }
                }
            }
            next_id += 1;
        }
        component
    }
}

pub(super) struct Ranking {
    /// `None` for nodes without incident edges.
    pub ranks: Vec<Option<usize>>,
    /// Isolated nodes, in index order.
    pub overflow: Vec<usize>,
}

/// Longest-path layering over Kahn's algorithm with a min-heap on node index.
///
/// When the heap drains with nodes left, every remaining node sits on or
/// behind a cycle. The lowest-index node whose pending predecessors all lie in
/// its own strongly connected component is released, and those pending edges
/// become back-edges. Edges between different components therefore always
/// point from a lower rank to a higher one.
pub(super) fn compute_ranks(graph: &RankGraph) -> Ranking {
    let n = graph.len();
    let component = graph.components();
    let mut indeg: Vec<usize> = graph.incoming.iter().map(Vec::len).collect();
    let mut rank = vec![0usize; n];
    let mut processed = vec![false; n];
    let mut remaining = graph.connected.iter().filter(|c| **c).count();

    let mut ready: BinaryHeap<Reverse<usize>> = (0..n)
        .filter(|&node| graph.connected[node] && indeg[node] == 0)
        .map(Reverse)
        .collect();

    loop {
        while let Some(Reverse(node)) = ready.pop() {
            if processed[node] {
                continue;
            }
            processed[node] = true;
            remaining -= 1;
            for &next in &graph.outgoing[node] {
                if processed[next] {
                    continue;
                }
                rank[next] = rank[next].max(rank[node] + 1);
                indeg[next] = indeg[next].saturating_sub(1);
                if indeg[next] == 0 {
                    ready.push(Reverse(next));
                }
            }
        }
        if remaining == 0 {
            break;
        }
        let release = (0..n).find(|&node| {
            graph.connected[node]
                && !processed[node]
                && graph.incoming[node]
                    .iter()
                    .all(|&pred| processed[pred] || component[pred] == component[node])
        });
        let Some(node) = release else {
            break;
        };
        indeg[node] = 0;
        ready.push(Reverse(node));
    }

    let ranks = (0..n)
        .map(|node| processed[node].then_some(rank[node]))
        .collect();
    let overflow = (0..n).filter(|&node| !graph.connected[node]).collect();
    Ranking { ranks, overflow }
}

/// Reorders every layer with alternating median sweeps to reduce crossings.
/// Ties keep the current slot, then fall back to node index.
pub(super) fn order_layers(layers: &mut [Vec<usize>], graph: &RankGraph, passes: usize) {
    if layers.len() <= 1 {
        return;
    }
    let mut slot = vec![0usize; graph.len()];
    refresh_slots(layers, &mut slot);

    for _ in 0..passes.max(1) {
        for layer in 1..layers.len() {
            if layers[layer].len() > 1 {
                sort_layer(&mut layers[layer], &graph.incoming, &slot);
                refresh_slots(layers, &mut slot);
            }
        }
        for layer in (0..layers.len() - 1).rev() {
            if layers[layer].len() > 1 {
                sort_layer(&mut layers[layer], &graph.outgoing, &slot);
                refresh_slots(layers, &mut slot);
            }
        }
    }
}

fn refresh_slots(layers: &[Vec<usize>], slot: &mut [usize]) {
    for layer in layers {
        for (idx, &node) in layer.iter().enumerate() {
            slot[node] = idx;
        }
    }
}

fn sort_layer(layer: &mut [usize], neighbors: &[Vec<usize>], slot: &[usize]) {
    let mut keyed: Vec<(f32, usize, usize)> = layer
        .iter()
        .map(|&node| (median_slot(node, neighbors, slot), slot[node], node))
        .collect();
    keyed.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)).then(a.2.cmp(&b.2)));
    for (dst, (_, _, node)) in layer.iter_mut().zip(keyed) {
        *dst = node;
    }
}

fn median_slot(node: usize, neighbors: &[Vec<usize>], slot: &[usize]) -> f32 {
    let mut values: Vec<usize> = neighbors[node].iter().map(|&other| slot[other]).collect();
    if values.is_empty() {
        return slot[node] as f32;
    }
    values.sort_unstable();
    let mid = values.len() / 2;
    if values.len() % 2 == 1 {
        values[mid] as f32
    } else {
        (values[mid - 1] + values[mid]) as f32 * 0.5
    }
}
