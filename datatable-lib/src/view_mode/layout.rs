use serde::Deserialize;
use serde::Serialize;

use super::ViewMode;

/// A column as offered to the view modes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewColumn {
    pub field: String,
    pub label: String,
    /// Modes that show this column. `None` shows it everywhere.
    #[serde(default)]
    pub modes: Option<Vec<ViewMode>>,
}

impl ViewColumn {
    pub fn new(field: impl Into<String>) -> Self {
        let field = field.into();
        Self {
            label: field.clone(),
            field,
            modes: None,
        }
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Restricts the column to `modes`.
    pub fn only_in(mut self, modes: &[ViewMode]) -> Self {
        self.modes = Some(modes.to_vec());
        self
    }

    pub fn visible_in(&self, mode: ViewMode) -> bool {
        self.modes.as_ref().is_none_or(|modes| modes.contains(&mode))
    }
}

/// How the host should lay out rows in a mode.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutDescriptor {
    pub mode: ViewMode,
    /// Items side by side; always 1 for table, list and timeline.
    pub columns_per_row: usize,
    /// Gap between items in pixels.
    pub spacing: u32,
    /// Item width / height for cards and tiles.
    pub aspect_ratio: Option<f32>,
    /// CSS `grid-template-columns` value.
    pub grid_template: String,
    /// Columns shown in this mode, in input order.
    pub columns: Vec<ViewColumn>,
}
