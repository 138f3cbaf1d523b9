use crate::config::{LayoutConfig, RenderConfig};
use crate::ir::{Graph, Position};
use crate::theme::Theme;
use anyhow::Result;
use std::path::Path;

/// Read-only view of a node for a renderer: geometry plus resolved style.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderNode {
    pub id: String,
    pub label: String,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub fill: String,
    pub stroke: String,
    pub highlighted: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderEdge {
    pub id: String,
    pub label: String,
    pub points: Vec<(f32, f32)>,
    pub stroke: String,
    pub highlighted: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderScene {
    pub nodes: Vec<RenderNode>,
    pub edges: Vec<RenderEdge>,
    pub width: f32,
    pub height: f32,
}

/// Resolves styles and edge geometry. Edges with a missing endpoint are skipped.
pub fn build_scene(graph: &Graph, theme: &Theme, config: &LayoutConfig) -> RenderScene {
    let (w, h) = (config.node_width, config.node_height);
    let nodes: Vec<RenderNode> = graph
        .nodes
        .values()
        .map(|node| {
            let style = theme.style_for(&node.category);
            RenderNode {
                id: node.id.clone(),
                label: node.label.clone(),
                x: node.position.x,
                y: node.position.y,
                width: w,
                height: h,
                fill: style.fill.clone(),
                stroke: if node.highlighted {
                    theme.highlight_color.clone()
                } else {
                    style.border.clone()
                },
                highlighted: node.highlighted,
            }
        })
        .collect();

    let edges = graph
        .edges
        .values()
        .filter_map(|edge| {
            let from = graph.nodes.get(&edge.source)?;
            let to = graph.nodes.get(&edge.target)?;
            let start = border_point(from.position, to.position, w, h);
            let end = border_point(to.position, from.position, w, h);
            Some(RenderEdge {
                id: edge.id.clone(),
                label: edge.label.clone(),
                points: vec![start, end],
                stroke: if edge.highlighted {
                    theme.highlight_color.clone()
                } else {
                    theme.line_color.clone()
                },
                highlighted: edge.highlighted,
            })
        })
        .collect();

    let (width, height) = nodes.iter().fold((0.0f32, 0.0f32), |(mw, mh), node| {
        (mw.max(node.x + node.width), mh.max(node.y + node.height))
    });
    RenderScene {
        nodes,
        edges,
        width,
        height,
    }
}

/// Point where the segment between two box centres leaves the `from` box.
fn border_point(from: Position, to: Position, w: f32, h: f32) -> (f32, f32) {
    let (cx, cy) = (from.x + w / 2.0, from.y + h / 2.0);
    let (tx, ty) = (to.x + w / 2.0, to.y + h / 2.0);
    let (dx, dy) = (tx - cx, ty - cy);
    if dx == 0.0 && dy == 0.0 {
        return (cx, cy);
    }
    let scale_x = if dx != 0.0 { (w / 2.0) / dx.abs() } else { f32::INFINITY };
    let scale_y = if dy != 0.0 { (h / 2.0) / dy.abs() } else { f32::INFINITY };
    let scale = scale_x.min(scale_y).min(1.0);
    (cx + dx * scale, cy + dy * scale)
}

pub fn render_svg(graph: &Graph, theme: &Theme, layout: &LayoutConfig, render: &RenderConfig) -> String {
    let scene = build_scene(graph, theme, layout);
    let pad = render.padding;
    let min_x = scene.nodes.iter().map(|n| n.x).fold(f32::INFINITY, f32::min);
    let min_y = scene.nodes.iter().map(|n| n.y).fold(f32::INFINITY, f32::min);
    let (min_x, min_y) = if scene.nodes.is_empty() { (0.0, 0.0) } else { (min_x, min_y) };
    let width = (scene.width - min_x + pad * 2.0).max(200.0);
    let height = (scene.height - min_y + pad * 2.0).max(200.0);
    let (vx, vy) = (min_x - pad, min_y - pad);

    let mut svg = String::new();
    svg.push_str(&format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{width:.2}\" height=\"{height:.2}\" viewBox=\"{vx:.2} {vy:.2} {width:.2} {height:.2}\">",
    ));
    svg.push_str(&format!(
        "<rect x=\"{vx:.2}\" y=\"{vy:.2}\" width=\"100%\" height=\"100%\" fill=\"{}\"/>",
        render.background
    ));

    svg.push_str("<defs>");
    svg.push_str(&format!(
        "<marker id=\"arrow\" viewBox=\"0 0 10 10\" refX=\"10\" refY=\"5\" markerWidth=\"6\" markerHeight=\"6\" orient=\"auto-start-reverse\"><path d=\"M 0 0 L 10 5 L 0 10 z\" fill=\"{}\"/></marker>",
        theme.line_color
    ));
    svg.push_str("</defs>");

    let label_positions = compute_edge_label_positions(&scene.edges, theme);
    for (edge, label_pos) in scene.edges.iter().zip(&label_positions) {
        let width = if edge.highlighted { 2.4 } else { 1.4 };
        svg.push_str(&format!(
            "<path d=\"{}\" fill=\"none\" stroke=\"{}\" stroke-width=\"{width}\" marker-end=\"url(#arrow)\"/>",
            points_to_path(&edge.points),
            edge.stroke
        ));
        if let Some(rect) = label_pos {
            svg.push_str(&format!(
                "<rect x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{:.2}\" rx=\"6\" ry=\"6\" fill=\"{}\"/>",
                rect.0, rect.1, rect.2, rect.3, theme.edge_label_background
            ));
            svg.push_str(&text_svg(
                rect.0 + rect.2 / 2.0,
                rect.1 + rect.3 / 2.0,
                &edge.label,
                theme,
            ));
        }
    }

    for node in &scene.nodes {
        let stroke_width = if node.highlighted { 2.6 } else { 1.4 };
        svg.push_str(&format!(
            "<rect x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{:.2}\" rx=\"10\" ry=\"10\" fill=\"{}\" stroke=\"{}\" stroke-width=\"{stroke_width}\"/>",
            node.x, node.y, node.width, node.height, node.fill, node.stroke
        ));
        svg.push_str(&text_svg(
            node.x + node.width / 2.0,
            node.y + node.height / 2.0,
            &node.label,
            theme,
        ));
    }

    svg.push_str("</svg>");
    svg
}

fn points_to_path(points: &[(f32, f32)]) -> String {
    let Some(first) = points.first() else {
        return String::new();
    };
    let mut d = format!("M {:.2} {:.2}", first.0, first.1);
    for point in points.iter().skip(1) {
        d.push_str(&format!(" L {:.2} {:.2}", point.0, point.1));
    }
    d
}

fn text_svg(x: f32, y: f32, text: &str, theme: &Theme) -> String {
    let baseline = y + theme.font_size * 0.35;
    format!(
        "<text x=\"{x:.2}\" y=\"{baseline:.2}\" text-anchor=\"middle\" font-family=\"{}\" font-size=\"{}\" fill=\"{}\">{}</text>",
        escape_xml(&theme.font_family),
        theme.font_size,
        theme.text_color,
        escape_xml(text)
    )
}

type Rect = (f32, f32, f32, f32);

/// Label boxes at edge midpoints, nudged down until they stop colliding with
/// earlier labels. Empty labels get no box.
fn compute_edge_label_positions(edges: &[RenderEdge], theme: &Theme) -> Vec<Option<Rect>> {
    let mut occupied: Vec<Rect> = Vec::new();
    let mut positions = Vec::with_capacity(edges.len());

    for edge in edges {
        if edge.label.trim().is_empty() {
            positions.push(None);
            continue;
        }
        let text_w = edge.label.chars().count() as f32 * theme.font_size * 0.6;
        let text_h = theme.font_size * 1.2;
        let (mid_x, mid_y) = edge_midpoint(edge);
        let rect_at = |y: f32| (mid_x - text_w / 2.0 - 6.0, y - text_h / 2.0 - 4.0, text_w + 12.0, text_h + 8.0);

        let mut offset = 0.0;
        let mut placed = None;
        for _ in 0..6 {
            let rect = rect_at(mid_y + offset);
            if !collides(&rect, &occupied) {
                placed = Some(rect);
                break;
            }
            offset += text_h + 6.0;
        }
        let rect = placed.unwrap_or_else(|| rect_at(mid_y));
        occupied.push(rect);
        positions.push(Some(rect));
    }

    positions
}

fn edge_midpoint(edge: &RenderEdge) -> (f32, f32) {
    match (edge.points.first(), edge.points.last()) {
        (Some(a), Some(b)) => ((a.0 + b.0) / 2.0, (a.1 + b.1) / 2.0),
        _ => (0.0, 0.0),
    }
}

fn collides(rect: &Rect, occupied: &[Rect]) -> bool {
    occupied.iter().any(|(x, y, w, h)| {
        rect.0 < x + w && rect.0 + rect.2 > *x && rect.1 < y + h && rect.1 + rect.3 > *y
    })
}

pub fn write_output_svg(svg: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, svg)?;
        }
        None => {
            print!("{}", svg);
        }
    }
    Ok(())
}

fn escape_xml(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
