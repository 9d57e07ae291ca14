use std::fmt;

use serde::Deserialize;
use serde::Serialize;

/// What a selection manager lets the user select.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionMode {
    /// Nothing is selectable
    None,
    /// At most one row
    Single,
    /// Any number of rows (Ctrl+click, Shift+range)
    #[default]
    Multi,
    /// Individual cells
    Cell,
    /// Cells, with Shift+click selecting a rectangle from an anchor
    Range,
}

impl SelectionMode {
    /// Returns `true` if rows can be selected in this mode.
    pub fn selects_rows(&self) -> bool {
        matches!(self, SelectionMode::Single | SelectionMode::Multi)
    }

    /// Returns `true` if cells can be selected in this mode.
    pub fn selects_cells(&self) -> bool {
        matches!(self, SelectionMode::Cell | SelectionMode::Range)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SelectionMode::None => "none",
            SelectionMode::Single => "single",
            SelectionMode::Multi => "multi",
            SelectionMode::Cell => "cell",
            SelectionMode::Range => "range",
        }
    }
}

impl fmt::Display for SelectionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
