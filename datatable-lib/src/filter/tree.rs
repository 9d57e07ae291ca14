//! Nested AND/OR filter trees.

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use super::FilterOperator;

/// How a group combines its children.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Combinator {
    /// All children must pass. An empty AND group passes.
    #[default]
    And,
    /// Any child must pass. An empty OR group fails.
    Or,
}

/// A filter tree node: a leaf predicate or a group of nodes.
///
/// On the wire a node is a single object. A node with a non-empty
/// `children` array is a group; its `field`, `operator` and `value` are
/// ignored. Any other node is a leaf and must carry `field` and `operator`.
///
/// # Example
///
/// ```
/// use datatable_lib::filter::{AdvancedFilter, FilterOperator};
///
/// let tree = AdvancedFilter::or([
///     AdvancedFilter::leaf("dynasty", FilterOperator::Eq, "Song"),
///     AdvancedFilter::and([
///         AdvancedFilter::leaf("born", FilterOperator::Gte, 960),
///         AdvancedFilter::leaf("born", FilterOperator::Lt, 1127),
///     ]),
/// ]);
/// assert_eq!(tree.depth(), 3);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawFilter", into = "RawFilter")]
pub enum AdvancedFilter {
    Leaf {
        id: String,
        field: String,
        operator: String,
        value: Value,
    },
    Group {
        id: String,
        combinator: Combinator,
        children: Vec<AdvancedFilter>,
    },
}

impl AdvancedFilter {
    /// Creates a leaf with a built-in operator.
    pub fn leaf(field: impl Into<String>, operator: FilterOperator, value: impl Into<Value>) -> Self {
        Self::custom_leaf(field, operator.as_str(), value)
    }

    /// Creates a leaf with any operator name, including registered ones.
    pub fn custom_leaf(field: impl Into<String>, operator: impl Into<String>, value: impl Into<Value>) -> Self {
        AdvancedFilter::Leaf {
            id: new_id(),
            field: field.into(),
            operator: operator.into(),
            value: value.into(),
        }
    }

    /// Creates a group.
    pub fn group(combinator: Combinator, children: impl IntoIterator<Item = AdvancedFilter>) -> Self {
        AdvancedFilter::Group {
            id: new_id(),
            combinator,
            children: children.into_iter().collect(),
        }
    }

    /// Creates an AND group.
    pub fn and(children: impl IntoIterator<Item = AdvancedFilter>) -> Self {
        Self::group(Combinator::And, children)
    }

    /// Creates an OR group.
    pub fn or(children: impl IntoIterator<Item = AdvancedFilter>) -> Self {
        Self::group(Combinator::Or, children)
    }

    /// Node id.
    pub fn id(&self) -> &str {
        match self {
            AdvancedFilter::Leaf { id, .. } | AdvancedFilter::Group { id, .. } => id,
        }
    }

    /// Returns `true` for group nodes.
    pub fn is_group(&self) -> bool {
        matches!(self, AdvancedFilter::Group { .. })
    }

    /// Number of levels in the tree. A leaf has depth 1.
    pub fn depth(&self) -> usize {
        match self {
            AdvancedFilter::Leaf { .. } => 1,
            AdvancedFilter::Group { children, .. } => {
                1 + children.iter().map(AdvancedFilter::depth).max().unwrap_or(0)
            }
        }
    }

    /// Visits every leaf as `(field, operator, value)`.
    pub fn leaves(&self) -> Vec<(&str, &str, &Value)> {
        let mut out = Vec::new();
        self.collect_leaves(&mut out);
        out
    }

    fn collect_leaves<'a>(&'a self, out: &mut Vec<(&'a str, &'a str, &'a Value)>) {
        match self {
            AdvancedFilter::Leaf {
                field,
                operator,
                value,
                ..
            } => out.push((field, operator, value)),
            AdvancedFilter::Group { children, .. } => {
                for child in children {
                    child.collect_leaves(out);
                }
            }
        }
    }
}

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// Loose wire shape of a node.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
struct RawFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    field: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    operator: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    value: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    combinator: Option<Combinator>,
    #[serde(skip_serializing_if = "Option::is_none")]
    children: Option<Vec<AdvancedFilter>>,
}

impl TryFrom<RawFilter> for AdvancedFilter {
    type Error = String;

    fn try_from(raw: RawFilter) -> Result<Self, Self::Error> {
        let id = raw.id.unwrap_or_else(new_id);
        let combinator = raw.combinator.unwrap_or_default();

        match (raw.children, raw.field, raw.operator) {
            (Some(children), _, _) if !children.is_empty() => Ok(AdvancedFilter::Group {
                id,
                combinator,
                children,
            }),
            (_, Some(field), Some(operator)) => Ok(AdvancedFilter::Leaf {
                id,
                field,
                operator,
                value: raw.value.unwrap_or(Value::Null),
            }),
            (Some(children), _, _) => Ok(AdvancedFilter::Group {
                id,
                combinator,
                children,
            }),
            _ => Err("filter leaf requires 'field' and 'operator'".to_string()),
        }
    }
}

impl From<AdvancedFilter> for RawFilter {
    fn from(filter: AdvancedFilter) -> Self {
        match filter {
            AdvancedFilter::Leaf {
                id,
                field,
                operator,
                value,
            } => RawFilter {
                id: Some(id),
                field: Some(field),
                operator: Some(operator),
                value: Some(value),
                ..Default::default()
            },
            AdvancedFilter::Group {
                id,
                combinator,
                children,
            } => RawFilter {
                id: Some(id),
                combinator: Some(combinator),
                children: Some(children),
                ..Default::default()
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_children_win_over_leaf_fields() {
        let node: AdvancedFilter = serde_json::from_value(json!({
            "id": "g1",
            "field": "ignored",
            "operator": "eq",
            "value": 1,
            "combinator": "or",
            "children": [{ "id": "l1", "field": "a", "operator": "gt", "value": 2 }]
        }))
        .unwrap();

        match node {
            AdvancedFilter::Group {
                id,
                combinator,
                children,
            } => {
                assert_eq!(id, "g1");
                assert_eq!(combinator, Combinator::Or);
                assert_eq!(children.len(), 1);
                assert!(!children[0].is_group());
            }
            AdvancedFilter::Leaf { .. } => panic!("expected group"),
        }
    }

    #[test]
    fn test_empty_children_with_field_is_leaf() {
        let node: AdvancedFilter = serde_json::from_value(json!({
            "field": "a", "operator": "isNull", "children": []
        }))
        .unwrap();
        assert!(!node.is_group());
        assert!(!node.id().is_empty());
    }

    #[test]
    fn test_empty_group() {
        let node: AdvancedFilter = serde_json::from_value(json!({ "combinator": "or", "children": [] })).unwrap();
        assert_eq!(node.depth(), 1);
        assert!(node.is_group());
    }

    #[test]
    fn test_leaf_without_operator_rejected() {
        let result = serde_json::from_value::<AdvancedFilter>(json!({ "field": "a", "value": 1 }));
        assert!(result.is_err());
    }

    #[test]
    fn test_serialize_round_trip() {
        let tree = AdvancedFilter::and([
            AdvancedFilter::leaf("a", FilterOperator::Eq, 1),
            AdvancedFilter::or([AdvancedFilter::leaf("b", FilterOperator::IsNull, Value::Null)]),
        ]);
        let text = serde_json::to_string(&tree).unwrap();
        let back: AdvancedFilter = serde_json::from_str(&text).unwrap();
        assert_eq!(back, tree);
        assert_eq!(back.leaves().len(), 2);
    }
}
