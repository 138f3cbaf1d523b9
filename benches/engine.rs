use concept_map_engine::config::{Config, LayoutConfig, PlacementConfig};
use concept_map_engine::document::{CandidateEdge, CandidateNode};
use concept_map_engine::ids::SequentialIds;
use concept_map_engine::ir::{Direction, Edge, Graph, Node, Position};
use concept_map_engine::layout::compute_layout;
use concept_map_engine::merge::plan_merge;
use concept_map_engine::render::render_svg;
use concept_map_engine::store::GraphStore;
use concept_map_engine::theme::Theme;
use concept_map_engine::Suggestion;
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use std::time::Instant;

fn dense_graph(nodes: usize, extra_edges: usize) -> Graph {
    let mut graph = Graph::new();
    for i in 0..nodes {
        graph.insert_node(Node::new(
            format!("n{i:04}"),
            format!("Node {i}"),
            "concept",
            Position::new((i % 10) as f32 * 220.0, (i / 10) as f32 * 90.0),
        ));
    }
    for i in 0..nodes.saturating_sub(1) {
        graph.insert_edge(Edge::new(format!("c{i}"), format!("n{i:04}"), format!("n{:04}", i + 1), ""));
    }
    let mut count = 0usize;
    'outer: for i in 0..nodes {
        for j in (i + 2)..nodes {
            if count >= extra_edges {
                break 'outer;
            }
            graph.insert_edge(Edge::new(format!("x{count}"), format!("n{i:04}"), format!("n{j:04}"), ""));
            count += 1;
        }
    }
    graph
}

fn suggestion(size: usize) -> Suggestion {
    Suggestion {
        new_nodes: (0..size)
            .map(|i| CandidateNode::new(Some(format!("t{i}").as_str()), &format!("Idea {i}"), "concept"))
            .collect(),
        new_edges: (1..size)
            .map(|i| CandidateEdge::new(&format!("t{}", i / 2), &format!("t{i}"), "relates"))
            .collect(),
    }
}

fn bench_layout(c: &mut Criterion) {
    let mut group = c.benchmark_group("layout");
    let config = LayoutConfig::default();
    for (nodes, extra_edges) in [(20usize, 20usize), (80, 160), (200, 600)] {
        let graph = dense_graph(nodes, extra_edges);
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{nodes}n_{extra_edges}e")),
            &graph,
            |b, graph| {
                b.iter(|| {
                    let layout = compute_layout(black_box(graph), Direction::TopBottom, &config);
                    black_box(layout.positions.len());
                });
            },
        );
    }
    group.finish();
}

fn bench_merge_plan(c: &mut Criterion) {
    let mut group = c.benchmark_group("merge_plan");
    let config = PlacementConfig::default();
    for (existing, batch) in [(10usize, 5usize), (60, 15), (200, 40)] {
        let graph = dense_graph(existing, 0);
        let payload = suggestion(batch);
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{existing}+{batch}")),
            &(graph, payload),
            |b, (graph, payload)| {
                b.iter(|| {
                    let mut ids = SequentialIds::new();
                    let plan = plan_merge(black_box(graph), black_box(payload), &mut ids, &config)
                        .expect("valid suggestion");
                    black_box(plan.nodes.len());
                });
            },
        );
    }
    group.finish();
}

fn bench_undo_redo(c: &mut Criterion) {
    let mut group = c.benchmark_group("history");
    let config = Config::default();
    group.bench_function("undo_redo_50", |b| {
        b.iter(|| {
            let mut store = GraphStore::new("bench", &config)
                .with_ids(SequentialIds::new())
                .with_graph(dense_graph(40, 40));
            for i in 0..50 {
                store.add_node(&format!("Extra {i}"), "concept");
            }
            while store.undo() {}
            while store.redo() {}
            black_box(store.graph().nodes.len());
        });
    });
    group.bench_function("merge_commit", |b| {
        let payload = suggestion(12);
        b.iter(|| {
            let mut store = GraphStore::new("bench", &config)
                .with_ids(SequentialIds::new())
                .with_graph(dense_graph(40, 40));
            let report = store.merge(black_box(&payload), Instant::now()).expect("valid suggestion");
            black_box(report.nodes_added);
        });
    });
    group.finish();
}

fn bench_render(c: &mut Criterion) {
    let mut group = c.benchmark_group("render");
    let config = Config::default();
    let theme = Theme::modern();
    for nodes in [20usize, 80] {
        let graph = dense_graph(nodes, nodes);
        group.bench_with_input(BenchmarkId::from_parameter(nodes), &graph, |b, graph| {
            b.iter(|| {
                let svg = render_svg(black_box(graph), &theme, &config.layout, &config.render);
                black_box(svg.len());
            });
        });
    }
    group.finish();
}

criterion_group!(
    name = benches;
    config = Criterion::default();
    targets = bench_layout, bench_merge_plan, bench_undo_redo, bench_render
);
criterion_main!(benches);
