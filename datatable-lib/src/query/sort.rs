//! Sort ordering for query results.

use serde::Deserialize;
use serde::Serialize;

/// One sort key. A query holds an ordered list; earlier keys win.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SortSpec {
    /// Field to sort by. Dot paths address nested fields.
    pub field: String,
    /// Sort descending instead of ascending.
    #[serde(default)]
    pub desc: bool,
}

impl SortSpec {
    /// Ascending order on a field.
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            desc: false,
        }
    }

    /// Descending order on a field.
    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            desc: true,
        }
    }

    /// Direction as used in `sort=field:dir` parameters.
    pub fn direction(&self) -> &'static str {
        if self.desc { "desc" } else { "asc" }
    }
}
