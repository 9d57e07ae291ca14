//! Responsive choice between table, card, list, grid and timeline views.
//!
//! [`ViewModeManager`] maps a viewport width to a [`ViewMode`] through the
//! configured breakpoints and describes how rows should be laid out in it.
//! It holds no rows itself.

mod config;
mod layout;

pub use config::*;
pub use layout::*;

use std::fmt;

use chrono::DateTime;
use chrono::Utc;
use log::debug;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::filter::parse_date;
use crate::filter::resolve_path;

/// Presentation of a row set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    #[default]
    Table,
    Card,
    List,
    Grid,
    Timeline,
}

impl ViewMode {
    pub const ALL: [ViewMode; 5] = [
        ViewMode::Table,
        ViewMode::Card,
        ViewMode::List,
        ViewMode::Grid,
        ViewMode::Timeline,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ViewMode::Table => "table",
            ViewMode::Card => "card",
            ViewMode::List => "list",
            ViewMode::Grid => "grid",
            ViewMode::Timeline => "timeline",
        }
    }
}

impl fmt::Display for ViewMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Picks and describes the view mode for a table.
///
/// # Example
///
/// ```
/// use datatable_lib::view_mode::{ViewMode, ViewModeConfig, ViewModeManager};
///
/// let mut views = ViewModeManager::new(ViewModeConfig::default());
/// assert_eq!(views.resolve_mode(500), ViewMode::List);
/// assert_eq!(views.resolve_mode(1280), ViewMode::Table);
///
/// views.update_viewport(800);
/// assert_eq!(views.mode(), ViewMode::Card);
/// ```
#[derive(Debug, Clone)]
pub struct ViewModeManager {
    config: ViewModeConfig,
    mode: ViewMode,
}

impl ViewModeManager {
    /// Starts in the default mode, or the first available one if the default
    /// is not available.
    pub fn new(config: ViewModeConfig) -> Self {
        let mode = if config.is_available(config.default_mode) {
            config.default_mode
        } else {
            config.available_modes.first().copied().unwrap_or_default()
        };
        Self { config, mode }
    }

    pub fn config(&self) -> &ViewModeConfig {
        &self.config
    }

    pub fn mode(&self) -> ViewMode {
        self.mode
    }

    /// Switches to `mode` if it is available. Returns whether it was.
    pub fn set_mode(&mut self, mode: ViewMode) -> bool {
        if !self.config.is_available(mode) {
            return false;
        }
        self.mode = mode;
        true
    }

    /// Mode for a viewport `width`.
    ///
    /// Breakpoints are checked in ascending order with `width < threshold`,
    /// except the highest, which matches `width >= threshold`. A width that
    /// matches none of them, or a matched mode that is unavailable, keeps
    /// the current mode. Without auto-switching the current mode is kept.
    pub fn resolve_mode(&self, width: u32) -> ViewMode {
        if !self.config.auto_switch {
            return self.mode;
        }

        let mut breakpoints = self.config.breakpoints.clone();
        breakpoints.sort_by_key(|bp| bp.width);

        let matched = match breakpoints.split_last() {
            Some((top, lower)) => lower
                .iter()
                .find(|bp| width < bp.width)
                .or_else(|| (width >= top.width).then_some(top)),
            None => None,
        };

        matched
            .map(|bp| bp.mode)
            .filter(|mode| self.config.is_available(*mode))
            .unwrap_or(self.mode)
    }

    /// Applies [`resolve_mode`](Self::resolve_mode), returning the new mode
    /// if it changed.
    pub fn update_viewport(&mut self, width: u32) -> Option<ViewMode> {
        let next = self.resolve_mode(width);
        if next == self.mode {
            return None;
        }
        debug!("view mode {} -> {} at width {}", self.mode, next, width);
        self.mode = next;
        Some(next)
    }

    fn items_per_row(&self, width: u32, min_item: u32) -> usize {
        let spacing = self.config.spacing;
        let fit = width.saturating_add(spacing) / min_item.saturating_add(spacing).max(1);
        (fit as usize).clamp(1, self.config.max_columns.max(1))
    }

    /// Layout of the current mode at `width`.
    pub fn layout(&self, width: u32, columns: &[ViewColumn]) -> LayoutDescriptor {
        let mode = self.mode;
        let visible: Vec<ViewColumn> = columns.iter().filter(|c| c.visible_in(mode)).cloned().collect();

        let (columns_per_row, aspect_ratio, grid_template) = match mode {
            ViewMode::Card | ViewMode::Grid => {
                let min_item = if mode == ViewMode::Card {
                    self.config.card_min_width
                } else {
                    self.config.grid_min_width
                };
                let n = self.items_per_row(width, min_item);
                (
                    n,
                    Some(self.config.aspect_ratio),
                    format!("repeat({}, minmax({}px, 1fr))", n, min_item),
                )
            }
            ViewMode::Table => (1, None, format!("repeat({}, minmax(0, 1fr))", visible.len().max(1))),
            ViewMode::List | ViewMode::Timeline => (1, None, "1fr".to_string()),
        };

        LayoutDescriptor {
            mode,
            columns_per_row,
            spacing: self.config.spacing,
            aspect_ratio,
            grid_template,
            columns: visible,
        }
    }

    /// Groups rows into display rows for the current mode.
    ///
    /// Cards and tiles are chunked by [`LayoutDescriptor::columns_per_row`];
    /// the timeline is ordered by the configured date field with undated
    /// rows last; table and list rows keep their order, one per display row.
    pub fn arrange(&self, mut rows: Vec<Value>, width: u32) -> Vec<Vec<Value>> {
        match self.mode {
            ViewMode::Card | ViewMode::Grid => {
                let per_row = self.layout(width, &[]).columns_per_row;
                rows.chunks(per_row).map(<[Value]>::to_vec).collect()
            }
            ViewMode::Timeline => {
                if let Some(field) = &self.config.timeline_field {
                    let date = |row: &Value| -> Option<DateTime<Utc>> { resolve_path(row, field).and_then(parse_date) };
                    rows.sort_by_key(|row| {
                        let when = date(row);
                        (when.is_none(), when)
                    });
                }
                rows.into_iter().map(|row| vec![row]).collect()
            }
            ViewMode::Table | ViewMode::List => rows.into_iter().map(|row| vec![row]).collect(),
        }
    }
}

impl Default for ViewModeManager {
    fn default() -> Self {
        Self::new(ViewModeConfig::default())
    }
}
