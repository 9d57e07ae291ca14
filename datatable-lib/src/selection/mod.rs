//! Row and cell selection state for a table view.
//!
//! [`SelectionManager`] tracks selected rows and cells under one of five
//! [`SelectionMode`]s and reacts to clicks and key presses. Every mutation
//! returns a [`SelectionDelta`] with the IDs added and removed.
//!
//! Ranges are computed over the row order (or cell grid) the caller passes
//! in at interaction time, not over any later re-sorted order.

mod cell;
mod event;
mod mode;
mod set;

pub use cell::*;
pub use event::*;
pub use mode::SelectionMode;
pub use set::IdSelection;
pub use set::SelectionDelta;

use log::error;
use serde::Deserialize;
use serde::Serialize;

/// Persisted form of a selection.
///
/// Missing fields default to empty, and a missing mode to `multi`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SelectionSnapshot {
    pub mode: SelectionMode,
    pub selected_rows: Vec<String>,
    pub selected_cells: Vec<String>,
    pub last_selected_row: Option<String>,
    pub last_selected_cell: Option<String>,
    pub anchor_cell: Option<String>,
}

/// Counts for host UI affordances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionSummary {
    pub mode: SelectionMode,
    pub row_count: usize,
    pub cell_count: usize,
    pub has_selection: bool,
}

/// Tracks selected rows and cells for one table view.
///
/// Row operations only apply in `single`/`multi` mode and cell operations
/// only in `cell`/`range` mode; elsewhere they return an empty delta. In
/// `single` mode at most one row is selected, and in `none` mode nothing is.
///
/// # Example
///
/// ```
/// use datatable_lib::selection::{Modifiers, SelectionManager, SelectionMode};
///
/// let ids: Vec<String> = (1..=5).map(|i| i.to_string()).collect();
/// let mut selection = SelectionManager::new(SelectionMode::Multi);
///
/// selection.select_row("4", Modifiers::NONE, None);
/// selection.select_row("2", Modifiers::SHIFT, Some(&ids));
/// assert_eq!(selection.selected_rows(), vec!["2", "3", "4"]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionManager {
    mode: SelectionMode,
    /// The snapshot only carries the last row, so a restore re-anchors
    /// Shift ranges on it.
    rows: IdSelection,
    cells: IdSelection,
    /// Origin of rectangular selection in `range` mode.
    anchor_cell: Option<String>,
}

impl SelectionManager {
    pub fn new(mode: SelectionMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    pub fn mode(&self) -> SelectionMode {
        self.mode
    }

    /// Switches mode, first clearing every row and cell.
    pub fn set_mode(&mut self, mode: SelectionMode) -> SelectionDelta {
        let delta = self.clear_all();
        self.mode = mode;
        delta
    }

    // === Rows ===

    /// Handles a click on a row.
    ///
    /// - `single`: always selects exactly `id`.
    /// - `multi`: Shift selects the inclusive range from the last selected row
    ///   to `id` by position in `all_ids` (Ctrl+Shift adds the range instead
    ///   of replacing); Ctrl/Cmd toggles `id`; a plain click selects only `id`.
    ///
    /// A Shift click without a previous row or without `all_ids` acts as a
    /// plain click.
    pub fn select_row(&mut self, id: &str, modifiers: Modifiers, all_ids: Option<&[String]>) -> SelectionDelta {
        match self.mode {
            SelectionMode::Single => self.rows.select(id),
            SelectionMode::Multi => match all_ids {
                Some(all_ids) if modifiers.shift && self.rows.anchor().is_some() => {
                    self.rows.range_select(id, all_ids, modifiers.command())
                }
                _ if modifiers.command() => self.rows.toggle(id),
                _ => self.rows.select(id),
            },
            _ => SelectionDelta::default(),
        }
    }

    /// Toggles one row. In `single` mode selecting a row deselects the other.
    pub fn toggle_row(&mut self, id: &str) -> SelectionDelta {
        match self.mode {
            SelectionMode::Single if !self.rows.is_selected(id) => self.rows.select(id),
            SelectionMode::Single | SelectionMode::Multi => self.rows.toggle(id),
            _ => SelectionDelta::default(),
        }
    }

    /// Selects every listed row. Only in `multi` mode.
    pub fn select_all(&mut self, ids: &[String]) -> SelectionDelta {
        if self.mode != SelectionMode::Multi {
            return SelectionDelta::default();
        }
        self.rows.select_all(ids.iter().cloned())
    }

    /// Deselects one row.
    pub fn deselect_row(&mut self, id: &str) -> SelectionDelta {
        self.rows.remove(id)
    }

    pub fn clear_rows(&mut self) -> SelectionDelta {
        self.rows.clear()
    }

    pub fn is_row_selected(&self, id: &str) -> bool {
        self.rows.is_selected(id)
    }

    /// Selected row ids, sorted.
    pub fn selected_rows(&self) -> Vec<String> {
        self.rows.selected()
    }

    /// The row last clicked, including the target of a Shift click.
    pub fn last_selected_row(&self) -> Option<&str> {
        self.rows.last()
    }

    // === Cells ===

    /// Handles a click on a cell.
    ///
    /// - Ctrl/Cmd toggles the cell.
    /// - In `range` mode, Shift replaces the selection with the rectangle
    ///   between the anchor cell and `cell` within `grid`.
    /// - Otherwise the click selects only `cell`.
    ///
    /// Non-Shift clicks in `range` mode move the anchor cell.
    pub fn select_cell(&mut self, cell: &str, modifiers: Modifiers, grid: Option<&[Vec<String>]>) -> SelectionDelta {
        if !self.mode.selects_cells() {
            return SelectionDelta::default();
        }

        if self.mode == SelectionMode::Range && modifiers.shift {
            let corners = self.anchor_cell.as_deref().zip(grid).and_then(|(anchor, grid)| {
                let from = locate(grid, anchor)?;
                let to = locate(grid, cell)?;
                Some(rectangle(grid, from, to))
            });
            if let Some(block) = corners {
                self.cells.set_last(Some(cell.to_string()));
                return self.cells.replace_with(block);
            }
        }

        if self.mode == SelectionMode::Range {
            self.anchor_cell = Some(cell.to_string());
        }
        if modifiers.command() {
            self.cells.toggle(cell)
        } else {
            self.cells.select(cell)
        }
    }

    /// Toggles one cell.
    pub fn toggle_cell(&mut self, cell: &str) -> SelectionDelta {
        if !self.mode.selects_cells() {
            return SelectionDelta::default();
        }
        self.cells.toggle(cell)
    }

    /// Selects every cell in `grid`.
    pub fn select_all_cells(&mut self, grid: &[Vec<String>]) -> SelectionDelta {
        if !self.mode.selects_cells() {
            return SelectionDelta::default();
        }
        self.cells.select_all(grid.iter().flatten().cloned())
    }

    pub fn clear_cells(&mut self) -> SelectionDelta {
        self.anchor_cell = None;
        self.cells.clear()
    }

    pub fn is_cell_selected(&self, cell: &str) -> bool {
        self.cells.is_selected(cell)
    }

    /// Selected cell ids, sorted.
    pub fn selected_cells(&self) -> Vec<String> {
        self.cells.selected()
    }

    pub fn last_selected_cell(&self) -> Option<&str> {
        self.cells.last()
    }

    pub fn anchor_cell(&self) -> Option<&str> {
        self.anchor_cell.as_deref()
    }

    // === Both ===

    /// Clears rows, cells and anchors.
    pub fn clear_all(&mut self) -> SelectionDelta {
        self.clear_rows().merge(self.clear_cells())
    }

    pub fn has_selection(&self) -> bool {
        !self.rows.is_empty() || !self.cells.is_empty()
    }

    /// Handles a key press.
    ///
    /// Escape clears everything in any mode. Ctrl/Cmd+A selects all rows in
    /// `multi` mode or all cells in `cell`/`range` mode. Navigation keys are
    /// reported back; moving focus is up to the host.
    pub fn handle_key(&mut self, event: KeyEvent, context: KeyContext<'_>) -> KeyOutcome {
        if event.key == Key::Escape {
            return KeyOutcome::Cleared(self.clear_all());
        }

        if event.is_select_all() {
            return match self.mode {
                SelectionMode::Multi => KeyOutcome::SelectedAll(self.select_all(context.row_ids)),
                SelectionMode::Cell | SelectionMode::Range => {
                    KeyOutcome::SelectedAll(self.select_all_cells(context.grid))
                }
                SelectionMode::None | SelectionMode::Single => KeyOutcome::Ignored,
            };
        }

        match event.key.navigation() {
            Some(nav) if self.mode != SelectionMode::None => KeyOutcome::Navigate(nav),
            _ => KeyOutcome::Ignored,
        }
    }

    pub fn summary(&self) -> SelectionSummary {
        SelectionSummary {
            mode: self.mode,
            row_count: self.rows.len(),
            cell_count: self.cells.len(),
            has_selection: self.has_selection(),
        }
    }

    // === Persistence ===

    pub fn snapshot(&self) -> SelectionSnapshot {
        SelectionSnapshot {
            mode: self.mode,
            selected_rows: self.rows.selected(),
            selected_cells: self.cells.selected(),
            last_selected_row: self.rows.last().map(str::to_string),
            last_selected_cell: self.cells.last().map(str::to_string),
            anchor_cell: self.anchor_cell.clone(),
        }
    }

    /// Replaces the state with `snapshot`, dropping whatever its mode does
    /// not allow.
    pub fn restore(&mut self, snapshot: SelectionSnapshot) {
        let SelectionSnapshot {
            mode,
            mut selected_rows,
            selected_cells,
            last_selected_row,
            last_selected_cell,
            anchor_cell,
        } = snapshot;

        *self = Self::new(mode);

        if mode == SelectionMode::Single && selected_rows.len() > 1 {
            let keep = last_selected_row
                .clone()
                .filter(|last| selected_rows.contains(last))
                .or_else(|| selected_rows.iter().min().cloned());
            selected_rows = keep.into_iter().collect();
        }
        if mode.selects_rows() {
            self.rows.select_all(selected_rows);
            self.rows.set_anchor(last_selected_row.clone());
            self.rows.set_last(last_selected_row);
        }
        if mode.selects_cells() {
            self.cells.select_all(selected_cells);
            // Range mode pivots cell rectangles on the anchor cell.
            let cell_anchor = match mode {
                SelectionMode::Range => anchor_cell.clone(),
                _ => last_selected_cell.clone(),
            };
            self.cells.set_anchor(cell_anchor);
            self.cells.set_last(last_selected_cell);
            if mode == SelectionMode::Range {
                self.anchor_cell = anchor_cell;
            }
        }
    }

    /// JSON form of [`snapshot`](Self::snapshot).
    pub fn serialize(&self) -> String {
        // Only strings and a unit enum; serialization cannot fail.
        serde_json::to_string(&self.snapshot()).unwrap_or_default()
    }

    /// Restores from [`serialize`](Self::serialize) output.
    ///
    /// Malformed input is logged and resets to an empty `multi` selection.
    /// Returns `false` in that case.
    pub fn deserialize(&mut self, json: &str) -> bool {
        match serde_json::from_str::<SelectionSnapshot>(json) {
            Ok(snapshot) => {
                self.restore(snapshot);
                true
            }
            Err(e) => {
                error!("discarding corrupt selection snapshot: {}", e);
                *self = Self::default();
                false
            }
        }
    }
}
