use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const MODERN_CATEGORY_COLORS: [(&str, &str, &str); 6] = [
    ("concept", "#EEF2FF", "#6366F1"),
    ("process", "#ECFDF5", "#10B981"),
    ("example", "#FFFBEB", "#F59E0B"),
    ("definition", "#F0F9FF", "#0EA5E9"),
    ("property", "#FDF2F8", "#EC4899"),
    ("question", "#FEF2F2", "#EF4444"),
];

const CLASSIC_CATEGORY_COLORS: [(&str, &str, &str); 6] = [
    ("concept", "#ECECFF", "#9370DB"),
    ("process", "#E8F5E9", "#4CAF50"),
    ("example", "#FFFFDE", "#AAAA33"),
    ("definition", "#E3F2FD", "#2196F3"),
    ("property", "#FCE4EC", "#E91E63"),
    ("question", "#FFEBEE", "#F44336"),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryStyle {
    pub fill: String,
    pub border: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Theme {
    pub font_family: String,
    pub font_size: f32,
    pub text_color: String,
    pub line_color: String,
    pub highlight_color: String,
    pub edge_label_background: String,
    pub background: String,
    pub default_style: CategoryStyle,
    /// Keyed by lowercase category name.
    pub categories: BTreeMap<String, CategoryStyle>,
}

impl Theme {
    pub fn classic() -> Self {
        Self {
            font_family: "\"trebuchet ms\", verdana, arial, sans-serif".to_string(),
            font_size: 14.0,
            text_color: "#333333".to_string(),
            line_color: "#333333".to_string(),
            highlight_color: "#FF9800".to_string(),
            edge_label_background: "#E8E8E8".to_string(),
            background: "#FFFFFF".to_string(),
            default_style: CategoryStyle {
                fill: "#F5F5F5".to_string(),
                border: "#9E9E9E".to_string(),
            },
            categories: palette(&CLASSIC_CATEGORY_COLORS),
        }
    }

    pub fn modern() -> Self {
        Self {
            font_family: "Inter, Segoe UI, system-ui, -apple-system, sans-serif".to_string(),
            font_size: 13.0,
            text_color: "#1C2430".to_string(),
            line_color: "#7A8AA6".to_string(),
            highlight_color: "#F97316".to_string(),
            edge_label_background: "#FFFFFF".to_string(),
            background: "#FFFFFF".to_string(),
            default_style: CategoryStyle {
                fill: "#F8FAFF".to_string(),
                border: "#C7D2E5".to_string(),
            },
            categories: palette(&MODERN_CATEGORY_COLORS),
        }
    }

    /// Style for an open-vocabulary category. Unknown categories fall back to
    /// the default style.
    pub fn style_for(&self, category: &str) -> &CategoryStyle {
        let key = category.trim().to_lowercase();
        self.categories.get(&key).unwrap_or(&self.default_style)
    }
}

fn palette(colors: &[(&str, &str, &str)]) -> BTreeMap<String, CategoryStyle> {
    colors
        .iter()
        .map(|(name, fill, border)| {
            (
                name.to_string(),
                CategoryStyle {
                    fill: fill.to_string(),
                    border: border.to_string(),
                },
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_is_case_insensitive_with_fallback() {
        let theme = Theme::modern();
        assert_eq!(theme.style_for(" Process ").border, "#10B981");
        assert_eq!(theme.style_for("unheard-of"), &theme.default_style);
    }
}
