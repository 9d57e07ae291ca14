//! ID-based selection sets.

use std::collections::HashSet;

use serde::Deserialize;
use serde::Serialize;

/// IDs added and removed by one selection change, each sorted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionDelta {
    pub added: Vec<String>,
    pub removed: Vec<String>,
}

impl SelectionDelta {
    fn new(mut added: Vec<String>, mut removed: Vec<String>) -> Self {
        added.sort();
        removed.sort();
        Self { added, removed }
    }

    /// Returns `true` if nothing changed.
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }

    /// Combines two deltas applied in sequence.
    pub fn merge(mut self, other: SelectionDelta) -> Self {
        self.added.extend(other.added);
        self.removed.extend(other.removed);
        Self::new(self.added, self.removed)
    }
}

/// A set of selected string IDs plus the range anchor and the ID last
/// acted on.
///
/// String IDs keep the selection stable when rows are re-sorted or
/// re-fetched. The anchor is the origin for range selection and only moves
/// on plain clicks and toggles; `last` follows every click.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdSelection {
    selected: HashSet<String>,
    anchor: Option<String>,
    last: Option<String>,
}

impl IdSelection {
    /// Create a new empty selection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Selected IDs, sorted.
    pub fn selected(&self) -> Vec<String> {
        let mut ids: Vec<_> = self.selected.iter().cloned().collect();
        ids.sort();
        ids
    }

    pub fn is_selected(&self, id: &str) -> bool {
        self.selected.contains(id)
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    /// Origin of the next range selection.
    pub fn anchor(&self) -> Option<&str> {
        self.anchor.as_deref()
    }

    /// The ID last clicked, toggled or range-selected to.
    pub fn last(&self) -> Option<&str> {
        self.last.as_deref()
    }

    pub(crate) fn set_anchor(&mut self, anchor: Option<String>) {
        self.anchor = anchor;
    }

    pub(crate) fn set_last(&mut self, last: Option<String>) {
        self.last = last;
    }

    /// Clear all selection, the anchor and the last ID.
    pub fn clear(&mut self) -> SelectionDelta {
        let removed: Vec<_> = self.selected.drain().collect();
        self.anchor = None;
        self.last = None;
        SelectionDelta::new(vec![], removed)
    }

    /// Select a single ID, clearing the others.
    pub fn select(&mut self, id: &str) -> SelectionDelta {
        self.mark(id);
        self.replace_with([id.to_string()])
    }

    /// Toggle one ID.
    pub fn toggle(&mut self, id: &str) -> SelectionDelta {
        self.mark(id);
        if self.selected.remove(id) {
            SelectionDelta::new(vec![], vec![id.to_string()])
        } else {
            self.selected.insert(id.to_string());
            SelectionDelta::new(vec![id.to_string()], vec![])
        }
    }

    fn mark(&mut self, id: &str) {
        self.anchor = Some(id.to_string());
        self.last = Some(id.to_string());
    }

    /// Makes `ids` the whole selection. The anchor is unchanged.
    pub fn replace_with(&mut self, ids: impl IntoIterator<Item = String>) -> SelectionDelta {
        let next: HashSet<String> = ids.into_iter().collect();
        let removed: Vec<_> = self.selected.difference(&next).cloned().collect();
        let added: Vec<_> = next.difference(&self.selected).cloned().collect();
        self.selected = next;
        SelectionDelta::new(added, removed)
    }

    /// Range select from the anchor to `target_id`, inclusive, by position
    /// in `all_ids_ordered`.
    ///
    /// Without `extend` the range replaces the selection. The anchor stays
    /// where it was so successive range selections span from the same
    /// origin, while `target_id` becomes the last ID. Falls back to [`select`](Self::select) when either end is not
    /// in the list.
    pub fn range_select(&mut self, target_id: &str, all_ids_ordered: &[String], extend: bool) -> SelectionDelta {
        let anchor_id = self.anchor.clone().unwrap_or_else(|| target_id.to_string());

        let anchor_pos = all_ids_ordered.iter().position(|id| *id == anchor_id);
        let target_pos = all_ids_ordered.iter().position(|id| id == target_id);

        let (start, end) = match (anchor_pos, target_pos) {
            (Some(a), Some(t)) => (a.min(t), a.max(t)),
            _ => return self.select(target_id),
        };

        self.last = Some(target_id.to_string());
        let range = all_ids_ordered[start..=end].iter().cloned();
        if extend {
            self.select_all(range)
        } else {
            self.replace_with(range)
        }
    }

    /// Adds every ID.
    pub fn select_all(&mut self, ids: impl IntoIterator<Item = String>) -> SelectionDelta {
        let added: Vec<_> = ids
            .into_iter()
            .filter(|id| self.selected.insert(id.clone()))
            .collect();
        SelectionDelta::new(added, vec![])
    }

    /// Removes one ID without touching the anchor.
    pub fn remove(&mut self, id: &str) -> SelectionDelta {
        if self.selected.remove(id) {
            SelectionDelta::new(vec![], vec![id.to_string()])
        } else {
            SelectionDelta::default()
        }
    }
}
