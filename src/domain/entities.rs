//! Domain entities: core data structures

use std::fmt;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

/// Opaque category identifier.
///
/// Admin APIs send ids as strings (`"64f0..."`) or integers (`3`); both
/// are kept as their string form so `3` and `"3"` name the same category.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CategoryId(String);

impl CategoryId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CategoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CategoryId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for CategoryId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<i64> for CategoryId {
    fn from(n: i64) -> Self {
        Self(n.to_string())
    }
}

impl Serialize for CategoryId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

struct CategoryIdVisitor;

impl<'de> Visitor<'de> for CategoryIdVisitor {
    type Value = CategoryId;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a string or integer category id")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        Ok(CategoryId::new(v))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<Self::Value, E> {
        Ok(CategoryId(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
        Ok(CategoryId(v.to_string()))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
        Ok(CategoryId(v.to_string()))
    }
}

impl<'de> Deserialize<'de> for CategoryId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(CategoryIdVisitor)
    }
}

/// One catalog category as received from the admin API.
///
/// Fields the hierarchy does not interpret (`slug`, `status`, `featured`,
/// `productCount`, ...) are kept in `payload` and written back unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryRecord {
    #[serde(alias = "_id")]
    pub id: CategoryId,
    pub name: String,
    /// `None` marks a root category; `""` is read as `None`
    #[serde(default, deserialize_with = "empty_parent_as_root")]
    pub parent: Option<CategoryId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_order: Option<i64>,
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

fn empty_parent_as_root<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<CategoryId>, D::Error> {
    let parent = Option::<CategoryId>::deserialize(deserializer)?;
    Ok(parent.filter(|id| !id.as_str().is_empty()))
}

impl CategoryRecord {
    pub fn new(id: impl Into<CategoryId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            parent: None,
            display_order: None,
            payload: Map::new(),
        }
    }

    pub fn with_parent(mut self, parent: impl Into<CategoryId>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn with_display_order(mut self, order: i64) -> Self {
        self.display_order = Some(order);
        self
    }

    /// Sibling sort key; a missing display order sorts as 0.
    pub fn sort_key(&self) -> i64 {
        self.display_order.unwrap_or(0)
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}

impl fmt::Display for CategoryRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.id)
    }
}

/// Tree node: a category with its sorted children.
///
/// `children` is omitted from JSON for leaves, so consumers can test for
/// the key's presence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryNode {
    #[serde(flatten)]
    pub record: CategoryRecord,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<CategoryNode>,
}

impl CategoryNode {
    pub fn leaf(record: CategoryRecord) -> Self {
        Self {
            record,
            children: Vec::new(),
        }
    }

    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    pub fn id(&self) -> &CategoryId {
        &self.record.id
    }

    pub fn name(&self) -> &str {
        &self.record.name
    }
}

// Deep chains would otherwise drop one nesting level per stack frame.
impl Drop for CategoryNode {
    fn drop(&mut self) {
        let mut pending = std::mem::take(&mut self.children);
        while let Some(mut node) = pending.pop() {
            pending.append(&mut node.children);
        }
    }
}

/// Flattened node: one row of a list/table view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlatCategory {
    #[serde(flatten)]
    pub record: CategoryRecord,
    /// 0 for roots
    pub level: usize,
    /// Name of the immediate parent, empty for roots
    pub parent_name: String,
    /// Breadcrumb from the root down to this category
    pub path: String,
    pub child_count: usize,
}

impl FlatCategory {
    pub fn id(&self) -> &CategoryId {
        &self.record.id
    }

    pub fn name(&self) -> &str {
        &self.record.name
    }
}
