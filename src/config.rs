use crate::ir::Direction;
use crate::theme::{CategoryStyle, Theme};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlacementConfig {
    pub node_width: f32,
    pub node_height: f32,
    pub margin: f32,
    pub spiral_rings: usize,
    pub ring_step: f32,
    pub points_per_ring: usize,
    pub grid_half_extent: usize,
    pub grid_step: f32,
    pub anchor_offset: f32,
    pub default_x: f32,
    pub default_y: f32,
}

impl Default for PlacementConfig {
    fn default() -> Self {
        Self {
            node_width: 172.0,
            node_height: 48.0,
            margin: 24.0,
            spiral_rings: 8,
            ring_step: 96.0,
            points_per_ring: 6,
            grid_half_extent: 8,
            grid_step: 64.0,
            anchor_offset: 260.0,
            default_x: 250.0,
            default_y: 250.0,
        }
    }
}

impl PlacementConfig {
    /// Horizontal step used by the anchor and the terminal fallback. Never
    /// smaller than one footprint plus margin, so a new column cannot overlap
    /// the rightmost node.
    pub fn column_offset(&self) -> f32 {
        self.anchor_offset.max(self.node_width + self.margin)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutConfig {
    pub node_width: f32,
    pub node_height: f32,
    pub node_spacing: f32,
    pub rank_spacing: f32,
    pub order_passes: usize,
    pub overflow_wrap: usize,
    pub direction: Direction,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            node_width: 172.0,
            node_height: 48.0,
            node_spacing: 40.0,
            rank_spacing: 80.0,
            order_passes: 4,
            overflow_wrap: 8,
            direction: Direction::TopBottom,
        }
    }
}

/// Undo depth. `None` keeps every checkpoint; a cap drops the oldest first.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HistoryConfig {
    pub max_depth: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HighlightConfig {
    pub duration_ms: u64,
}

impl Default for HighlightConfig {
    fn default() -> Self {
        Self { duration_ms: 3000 }
    }
}

impl HighlightConfig {
    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.duration_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagnosticsConfig {
    pub max_roots: usize,
    pub max_edges_per_node: usize,
    pub min_nodes: usize,
    pub max_nodes: usize,
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            max_roots: 3,
            max_edges_per_node: 6,
            min_nodes: 5,
            max_nodes: 40,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    pub width: f32,
    pub height: f32,
    pub padding: f32,
    pub background: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 1200.0,
            height: 800.0,
            padding: 40.0,
            background: "#FFFFFF".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub theme: Theme,
    pub placement: PlacementConfig,
    pub layout: LayoutConfig,
    pub history: HistoryConfig,
    pub highlight: HighlightConfig,
    pub diagnostics: DiagnosticsConfig,
    pub render: RenderConfig,
}

impl Default for Config {
    fn default() -> Self {
        let theme = Theme::modern();
        let render = RenderConfig {
            background: theme.background.clone(),
            ..Default::default()
        };
        Self {
            theme,
            placement: PlacementConfig::default(),
            layout: LayoutConfig::default(),
            history: HistoryConfig::default(),
            highlight: HighlightConfig::default(),
            diagnostics: DiagnosticsConfig::default(),
            render,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct PlacementConfigFile {
    node_width: Option<f32>,
    node_height: Option<f32>,
    margin: Option<f32>,
    spiral_rings: Option<usize>,
    ring_step: Option<f32>,
    points_per_ring: Option<usize>,
    grid_half_extent: Option<usize>,
    grid_step: Option<f32>,
    anchor_offset: Option<f32>,
    default_x: Option<f32>,
    default_y: Option<f32>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct LayoutConfigFile {
    node_width: Option<f32>,
    node_height: Option<f32>,
    node_spacing: Option<f32>,
    rank_spacing: Option<f32>,
    order_passes: Option<usize>,
    overflow_wrap: Option<usize>,
    direction: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct DiagnosticsConfigFile {
    max_roots: Option<usize>,
    max_edges_per_node: Option<usize>,
    min_nodes: Option<usize>,
    max_nodes: Option<usize>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    theme: Option<String>,
    category_styles: Option<BTreeMap<String, CategoryStyle>>,
    placement: Option<PlacementConfigFile>,
    layout: Option<LayoutConfigFile>,
    history_depth: Option<usize>,
    highlight_ms: Option<u64>,
    diagnostics: Option<DiagnosticsConfigFile>,
    width: Option<f32>,
    height: Option<f32>,
    padding: Option<f32>,
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let Some(path) = path else {
        return Ok(Config::default());
    };
    let contents = std::fs::read_to_string(path)?;
    parse_config(&contents)
}

pub fn parse_config(contents: &str) -> anyhow::Result<Config> {
    let mut config = Config::default();
    let parsed: ConfigFile = serde_json::from_str(contents)?;

    if let Some(theme_name) = parsed.theme.as_deref() {
        if theme_name == "classic" || theme_name == "default" {
            config.theme = Theme::classic();
        } else if theme_name == "modern" {
            config.theme = Theme::modern();
        }
        config.render.background = config.theme.background.clone();
    }
    if let Some(styles) = parsed.category_styles {
        for (category, style) in styles {
            config.theme.categories.insert(category.to_lowercase(), style);
        }
    }

    if let Some(file) = parsed.placement {
        let placement = &mut config.placement;
        if let Some(v) = file.node_width {
            placement.node_width = v;
        }
        if let Some(v) = file.node_height {
            placement.node_height = v;
        }
        if let Some(v) = file.margin {
            placement.margin = v;
        }
        if let Some(v) = file.spiral_rings {
            placement.spiral_rings = v;
        }
        if let Some(v) = file.ring_step {
            placement.ring_step = v;
        }
        if let Some(v) = file.points_per_ring {
            placement.points_per_ring = v.max(1);
        }
        if let Some(v) = file.grid_half_extent {
            placement.grid_half_extent = v;
        }
        if let Some(v) = file.grid_step {
            placement.grid_step = v;
        }
        if let Some(v) = file.anchor_offset {
            placement.anchor_offset = v;
        }
        if let Some(v) = file.default_x {
            placement.default_x = v;
        }
        if let Some(v) = file.default_y {
            placement.default_y = v;
        }
    }

    if let Some(file) = parsed.layout {
        let layout = &mut config.layout;
        if let Some(v) = file.node_width {
            layout.node_width = v;
        }
        if let Some(v) = file.node_height {
            layout.node_height = v;
        }
        if let Some(v) = file.node_spacing {
            layout.node_spacing = v;
        }
        if let Some(v) = file.rank_spacing {
            layout.rank_spacing = v;
        }
        if let Some(v) = file.order_passes {
            layout.order_passes = v;
        }
        if let Some(v) = file.overflow_wrap {
            layout.overflow_wrap = v.max(1);
        }
        if let Some(token) = file.direction.as_deref() {
            layout.direction = Direction::from_token(token)
                .ok_or_else(|| anyhow::anyhow!("unknown layout direction `{token}`"))?;
        }
    }

    if let Some(v) = parsed.history_depth {
        config.history.max_depth = Some(v.max(1));
    }
    if let Some(v) = parsed.highlight_ms {
        config.highlight.duration_ms = v;
    }

    if let Some(file) = parsed.diagnostics {
        let diagnostics = &mut config.diagnostics;
        if let Some(v) = file.max_roots {
            diagnostics.max_roots = v;
        }
        if let Some(v) = file.max_edges_per_node {
            diagnostics.max_edges_per_node = v;
        }
        if let Some(v) = file.min_nodes {
            diagnostics.min_nodes = v;
        }
        if let Some(v) = file.max_nodes {
            diagnostics.max_nodes = v;
        }
    }

    if let Some(v) = parsed.width {
        config.render.width = v;
    }
    if let Some(v) = parsed.height {
        config.render.height = v;
    }
    if let Some(v) = parsed.padding {
        config.render.padding = v;
    }

    Ok(config)
}
