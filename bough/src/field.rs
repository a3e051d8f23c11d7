//! Mapping of conceptual node fields onto record properties.
//!
//! A tree never inspects its records directly. It asks for one of the
//! logical [`Field`]s and the record answers through the tree's
//! [`FieldMapping`]. Typed records can ignore the mapping entirely; JSON
//! records use it as a key lookup, so a misconfigured key simply reads as
//! `None`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::id::NodeId;

/// Logical fields a tree reads from (and writes to) its records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    /// Node identity.
    Id,
    /// Text shown for the node.
    Display,
    /// Child records.
    Children,
    /// Whether children exist before they are loaded.
    HasChildren,
    /// Whether the node starts expanded.
    IsExpanded,
}

impl Field {
    /// The logical name, used as the default record key.
    pub fn name(self) -> &'static str {
        match self {
            Field::Id => "id",
            Field::Display => "display",
            Field::Children => "children",
            Field::HasChildren => "hasChildren",
            Field::IsExpanded => "isExpanded",
        }
    }
}

/// Per-tree mapping from logical fields to record keys.
///
/// Every key defaults to the logical name of its field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FieldMapping {
    pub id: String,
    pub display: String,
    pub children: String,
    pub has_children: String,
    pub is_expanded: String,
}

impl Default for FieldMapping {
    fn default() -> Self {
        Self {
            id: Field::Id.name().to_string(),
            display: Field::Display.name().to_string(),
            children: Field::Children.name().to_string(),
            has_children: Field::HasChildren.name().to_string(),
            is_expanded: Field::IsExpanded.name().to_string(),
        }
    }
}

impl FieldMapping {
    /// Record key configured for `field`.
    pub fn key(&self, field: Field) -> &str {
        match field {
            Field::Id => &self.id,
            Field::Display => &self.display,
            Field::Children => &self.children,
            Field::HasChildren => &self.has_children,
            Field::IsExpanded => &self.is_expanded,
        }
    }

    /// Map `field` onto a different record key.
    pub fn with(mut self, field: Field, key: impl Into<String>) -> Self {
        let key = key.into();
        match field {
            Field::Id => self.id = key,
            Field::Display => self.display = key,
            Field::Children => self.children = key,
            Field::HasChildren => self.has_children = key,
            Field::IsExpanded => self.is_expanded = key,
        }
        self
    }
}

/// A value read from or written to a record field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue<R> {
    Id(NodeId),
    Text(String),
    Flag(bool),
    Records(Vec<R>),
}

/// A data record that can back a tree node.
///
/// Implementors only need [`get_field`](TreeRecord::get_field) and
/// [`set_field`](TreeRecord::set_field); the typed helpers are derived
/// from them.
///
/// # Example
///
/// ```ignore
/// #[derive(Clone)]
/// struct Folder {
///     id: Option<NodeId>,
///     name: String,
///     children: Option<Vec<Folder>>,
/// }
///
/// impl TreeRecord for Folder {
///     fn get_field(&self, _: &FieldMapping, field: Field) -> Option<FieldValue<Self>> {
///         match field {
///             Field::Id => self.id.clone().map(FieldValue::Id),
///             Field::Display => Some(FieldValue::Text(self.name.clone())),
///             Field::Children => self.children.clone().map(FieldValue::Records),
///             _ => None,
///         }
///     }
///
///     fn set_field(&mut self, _: &FieldMapping, field: Field, value: FieldValue<Self>) {
///         match (field, value) {
///             (Field::Id, FieldValue::Id(id)) => self.id = Some(id),
///             (Field::Children, FieldValue::Records(r)) => self.children = Some(r),
///             _ => {}
///         }
///     }
/// }
/// ```
pub trait TreeRecord: Clone + Send + Sync + 'static {
    /// Read `field` through `fields`.
    fn get_field(&self, fields: &FieldMapping, field: Field) -> Option<FieldValue<Self>>;

    /// Write `field` through `fields`.
    fn set_field(&mut self, fields: &FieldMapping, field: Field, value: FieldValue<Self>);

    fn id(&self, fields: &FieldMapping) -> Option<NodeId> {
        match self.get_field(fields, Field::Id)? {
            FieldValue::Id(id) => Some(id),
            FieldValue::Text(text) => Some(NodeId::from(text)),
            _ => None,
        }
    }

    fn set_id(&mut self, fields: &FieldMapping, id: NodeId) {
        self.set_field(fields, Field::Id, FieldValue::Id(id));
    }

    fn display(&self, fields: &FieldMapping) -> Option<String> {
        match self.get_field(fields, Field::Display)? {
            FieldValue::Text(text) => Some(text),
            FieldValue::Id(id) => Some(id.to_string()),
            _ => None,
        }
    }

    /// Child records, or `None` when they have not been loaded.
    fn children(&self, fields: &FieldMapping) -> Option<Vec<Self>> {
        match self.get_field(fields, Field::Children)? {
            FieldValue::Records(records) => Some(records),
            _ => None,
        }
    }

    fn set_children(&mut self, fields: &FieldMapping, children: Vec<Self>) {
        self.set_field(fields, Field::Children, FieldValue::Records(children));
    }

    fn has_children_flag(&self, fields: &FieldMapping) -> bool {
        matches!(
            self.get_field(fields, Field::HasChildren),
            Some(FieldValue::Flag(true))
        )
    }

    fn is_expanded_flag(&self, fields: &FieldMapping) -> bool {
        matches!(
            self.get_field(fields, Field::IsExpanded),
            Some(FieldValue::Flag(true))
        )
    }
}

/// JSON truthiness: `null`, `false`, `0`, `""` are false.
fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

impl TreeRecord for Value {
    fn get_field(&self, fields: &FieldMapping, field: Field) -> Option<FieldValue<Self>> {
        let value = self.get(fields.key(field))?;
        match field {
            Field::Id => match value {
                Value::String(s) => Some(FieldValue::Id(NodeId::new(s.as_str()))),
                Value::Number(n) => Some(FieldValue::Id(NodeId::new(n.to_string()))),
                _ => None,
            },
            Field::Display => match value {
                Value::Null => None,
                Value::String(s) => Some(FieldValue::Text(s.clone())),
                other => Some(FieldValue::Text(other.to_string())),
            },
            Field::Children => match value {
                Value::Array(items) => Some(FieldValue::Records(items.clone())),
                _ => None,
            },
            Field::HasChildren | Field::IsExpanded => Some(FieldValue::Flag(truthy(value))),
        }
    }

    fn set_field(&mut self, fields: &FieldMapping, field: Field, value: FieldValue<Self>) {
        let Value::Object(map) = self else {
            return;
        };
        let value = match value {
            FieldValue::Id(id) => Value::String(id.to_string()),
            FieldValue::Text(text) => Value::String(text),
            FieldValue::Flag(flag) => Value::Bool(flag),
            FieldValue::Records(records) => Value::Array(records),
        };
        map.insert(fields.key(field).to_string(), value);
    }
}
