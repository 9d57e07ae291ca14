use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// A cell address, written `"row:col"`.
///
/// Row ids may themselves contain `:`; the column is everything after the
/// last one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellId {
    pub row: String,
    pub col: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid cell id '{0}', expected 'row:col'")]
pub struct InvalidCellId(pub String);

impl CellId {
    pub fn new(row: impl Into<String>, col: impl Into<String>) -> Self {
        Self {
            row: row.into(),
            col: col.into(),
        }
    }

    /// The `"row:col"` key.
    pub fn key(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for CellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.row, self.col)
    }
}

impl FromStr for CellId {
    type Err = InvalidCellId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.rsplit_once(':') {
            Some((row, col)) if !row.is_empty() && !col.is_empty() => Ok(Self::new(row, col)),
            _ => Err(InvalidCellId(s.to_string())),
        }
    }
}

/// Builds the cell grid for `row_ids` x `columns`.
pub fn cell_grid(row_ids: &[String], columns: &[String]) -> Vec<Vec<String>> {
    row_ids
        .iter()
        .map(|row| columns.iter().map(|col| CellId::new(row.as_str(), col.as_str()).key()).collect())
        .collect()
}

/// Position of `cell` in `grid` as `(row, col)`.
pub(crate) fn locate(grid: &[Vec<String>], cell: &str) -> Option<(usize, usize)> {
    grid.iter()
        .enumerate()
        .find_map(|(r, row)| row.iter().position(|c| c == cell).map(|c| (r, c)))
}

/// Cells in the rectangle spanned by two grid positions, inclusive.
pub(crate) fn rectangle(grid: &[Vec<String>], a: (usize, usize), b: (usize, usize)) -> Vec<String> {
    let (top, bottom) = (a.0.min(b.0), a.0.max(b.0));
    let (left, right) = (a.1.min(b.1), a.1.max(b.1));

    grid[top..=bottom]
        .iter()
        .flat_map(|row| row.iter().skip(left).take(right + 1 - left))
        .cloned()
        .collect()
}
