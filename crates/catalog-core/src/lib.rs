//! Schemata Catalog Core
//!
//! Column-tree types and in-place patching for container schemas in the
//! Schemata data catalog.
//!
//! A container (an object-store bucket, a prefix, a file set) exposes its
//! schema as a tree of columns, where struct-like fields nest child columns.
//! Pages that let a user edit the tags or the description of a nested field
//! hand the tree to [`ColumnTreePatcher`], which finds the column by its
//! fully-qualified name and patches it in place.
//!
//! # Example
//!
//! ```
//! use schemata_catalog_core::{update_column_tags, ColumnNode, LabelType, TagOption};
//!
//! let mut columns = vec![ColumnNode::new("address", "bucket.address")
//!     .with_children(vec![ColumnNode::new("zip", "bucket.address.zip")])];
//!
//! let patched = update_column_tags(
//!     Some(columns.as_mut_slice()),
//!     "bucket.address.zip",
//!     &[TagOption::classification("PII.Sensitive")],
//! );
//!
//! assert!(patched);
//! let zip = &columns[0].children[0];
//! assert_eq!(zip.tags[0].tag_fqn, "PII.Sensitive");
//! assert_eq!(zip.tags[0].label_type, LabelType::Manual);
//! ```

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

pub mod column_tree;
pub mod config;
pub mod fields;
pub mod validation;

pub use column_tree::{
    find_column, reconcile_tags, update_column_description, update_column_tags,
    ColumnTreePatcher, PatchOutcome,
};
pub use config::{DuplicatePolicy, PatcherConfig, PatcherConfigBuilder};
pub use fields::{container_fields, TabSpecificField, CONTAINER_FIELDS};

/// Reads a `null` value as the type's default.
///
/// The catalog emits `"children": null` for leaf columns in some versions.
fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// ============================================================================
// Column Tree Types
// ============================================================================

/// One column or nested field in a container schema
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnNode {
    /// Local name of the column (display only, never used for lookup)
    #[serde(default)]
    pub name: String,
    /// Unique identifier of the column across the whole tree
    #[serde(default)]
    pub fully_qualified_name: String,
    /// Column data type as reported by the source (e.g. "STRUCT", "INT")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_type: Option<String>,
    /// Human-readable description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Tags applied to the column; always written, `[]` when absent on input
    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: Vec<TagLabel>,
    /// Nested columns (empty for leaves); omitted on write when empty
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub children: Vec<ColumnNode>,
    /// Fields this crate does not interpret, kept for round-tripping
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ColumnNode {
    /// Create a leaf column with no tags and no description.
    pub fn new(name: impl Into<String>, fully_qualified_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fully_qualified_name: fully_qualified_name.into(),
            ..Default::default()
        }
    }

    /// Set the nested columns.
    pub fn with_children(mut self, children: Vec<ColumnNode>) -> Self {
        self.children = children;
        self
    }

    /// Set the applied tags.
    pub fn with_tags(mut self, tags: Vec<TagLabel>) -> Self {
        self.tags = tags;
        self
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the data type.
    pub fn with_data_type(mut self, data_type: impl Into<String>) -> Self {
        self.data_type = Some(data_type.into());
        self
    }

    /// Returns true if the column has no nested columns.
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Returns true if a tag with this FQN is applied to the column.
    pub fn has_tag(&self, tag_fqn: &str) -> bool {
        self.tags.iter().any(|tag| tag.tag_fqn == tag_fqn)
    }
}

// ============================================================================
// Tag Types
// ============================================================================

/// How a tag came to be applied
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LabelType {
    /// Applied by a user
    #[default]
    Manual,
    /// Inherited through lineage
    Propagated,
    /// Applied by an automated classifier
    Automated,
    /// Derived from a glossary term's related tags
    Derived,
}

impl std::fmt::Display for LabelType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LabelType::Manual => write!(f, "Manual"),
            LabelType::Propagated => write!(f, "Propagated"),
            LabelType::Automated => write!(f, "Automated"),
            LabelType::Derived => write!(f, "Derived"),
        }
    }
}

impl std::str::FromStr for LabelType {
    type Err = CatalogError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "manual" => Ok(LabelType::Manual),
            "propagated" => Ok(LabelType::Propagated),
            "automated" => Ok(LabelType::Automated),
            "derived" => Ok(LabelType::Derived),
            _ => Err(CatalogError::ValidationError(format!(
                "Unknown label type: {}",
                s
            ))),
        }
    }
}

/// Review state of an applied tag
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TagState {
    /// Proposed, awaiting review
    Suggested,
    /// Accepted
    #[default]
    Confirmed,
}

impl std::fmt::Display for TagState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TagState::Suggested => write!(f, "Suggested"),
            TagState::Confirmed => write!(f, "Confirmed"),
        }
    }
}

impl std::str::FromStr for TagState {
    type Err = CatalogError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "suggested" => Ok(TagState::Suggested),
            "confirmed" => Ok(TagState::Confirmed),
            _ => Err(CatalogError::ValidationError(format!(
                "Unknown tag state: {}",
                s
            ))),
        }
    }
}

/// Where a tag definition lives
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TagSource {
    /// A tag from a classification (e.g. `PII.Sensitive`)
    #[default]
    Classification,
    /// A glossary term (e.g. `Business.Revenue`)
    Glossary,
}

impl std::fmt::Display for TagSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TagSource::Classification => write!(f, "Classification"),
            TagSource::Glossary => write!(f, "Glossary"),
        }
    }
}

impl std::str::FromStr for TagSource {
    type Err = CatalogError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "classification" => Ok(TagSource::Classification),
            "glossary" => Ok(TagSource::Glossary),
            _ => Err(CatalogError::ValidationError(format!(
                "Unknown tag source: {}",
                s
            ))),
        }
    }
}

/// A tag applied to a column or entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagLabel {
    /// Fully-qualified name of the tag definition
    #[serde(rename = "tagFQN")]
    pub tag_fqn: String,
    #[serde(default)]
    pub label_type: LabelType,
    #[serde(default)]
    pub state: TagState,
    #[serde(default)]
    pub source: TagSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
    /// Fields this crate does not interpret, kept for round-tripping
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TagLabel {
    /// Create a confirmed, user-applied tag.
    pub fn manual(tag_fqn: impl Into<String>, source: TagSource) -> Self {
        Self {
            tag_fqn: tag_fqn.into(),
            label_type: LabelType::Manual,
            state: TagState::Confirmed,
            source,
            description: None,
            href: None,
            extra: Map::new(),
        }
    }

    /// Override the label type.
    pub fn with_label_type(mut self, label_type: LabelType) -> Self {
        self.label_type = label_type;
        self
    }

    /// Override the state.
    pub fn with_state(mut self, state: TagState) -> Self {
        self.state = state;
        self
    }
}

impl From<&TagOption> for TagLabel {
    fn from(option: &TagOption) -> Self {
        TagLabel::manual(option.fqn.clone(), option.source)
    }
}

/// A tag the caller wants present on a column after a patch
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TagOption {
    pub fqn: String,
    #[serde(default)]
    pub source: TagSource,
}

impl TagOption {
    pub fn new(fqn: impl Into<String>, source: TagSource) -> Self {
        Self {
            fqn: fqn.into(),
            source,
        }
    }

    /// Shorthand for a classification tag.
    pub fn classification(fqn: impl Into<String>) -> Self {
        Self::new(fqn, TagSource::Classification)
    }

    /// Shorthand for a glossary term.
    pub fn glossary(fqn: impl Into<String>) -> Self {
        Self::new(fqn, TagSource::Glossary)
    }
}

/// Parses `Fqn` or `Fqn=Source`.
///
/// The source defaults to [`TagSource::Classification`]. The split happens on
/// the last `=`, so quoted FQN segments may not contain one.
impl std::str::FromStr for TagOption {
    type Err = CatalogError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let (fqn, source) = match s.rsplit_once('=') {
            Some((fqn, source)) => (fqn.trim(), source.trim().parse()?),
            None => (s.trim(), TagSource::default()),
        };

        if fqn.is_empty() {
            return Err(CatalogError::ValidationError(format!(
                "Tag option has an empty FQN: '{}'",
                s
            )));
        }

        Ok(TagOption::new(fqn, source))
    }
}

// ============================================================================
// Container Entity
// ============================================================================

/// Schema of a container's contents
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerDataModel {
    #[serde(default)]
    pub is_partitioned: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub columns: Vec<ColumnNode>,
    /// Fields this crate does not interpret, kept for round-tripping
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A storage container entity as fetched from the catalog
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Container {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub fully_qualified_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: Vec<TagLabel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_model: Option<ContainerDataModel>,
    /// Fields this crate does not interpret, kept for round-tripping
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Container {
    /// Parse a container document from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialize the container as pretty-printed JSON.
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Top-level columns, if the container has a data model.
    pub fn columns(&self) -> Option<&[ColumnNode]> {
        self.data_model.as_ref().map(|model| model.columns.as_slice())
    }

    /// Mutable top-level columns, if the container has a data model.
    pub fn columns_mut(&mut self) -> Option<&mut [ColumnNode]> {
        self.data_model
            .as_mut()
            .map(|model| model.columns.as_mut_slice())
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Errors that can occur when validating or patching column trees
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Duplicate fully-qualified name in column tree: {0}")]
    DuplicateFqn(String),

    #[error("Column at {path} has no fully-qualified name")]
    MissingFqn { path: String },

    #[error("Column tree is deeper than the limit of {limit} levels")]
    DepthLimitExceeded { limit: usize },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CatalogError {
    /// Returns true if the error was caused by the shape of the input tree
    /// or patch payload rather than by the environment.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            CatalogError::ValidationError(_)
                | CatalogError::DuplicateFqn(_)
                | CatalogError::MissingFqn { .. }
                | CatalogError::DepthLimitExceeded { .. }
        )
    }
}

/// Result type for catalog operations
pub type Result<T> = std::result::Result<T, CatalogError>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_enum_display_and_parse() {
        assert_eq!(LabelType::Manual.to_string(), "Manual");
        assert_eq!(TagState::Confirmed.to_string(), "Confirmed");
        assert_eq!(TagSource::Glossary.to_string(), "Glossary");

        assert_eq!("AUTOMATED".parse::<LabelType>().unwrap(), LabelType::Automated);
        assert_eq!("suggested".parse::<TagState>().unwrap(), TagState::Suggested);
        assert_eq!("glossary".parse::<TagSource>().unwrap(), TagSource::Glossary);
        assert!("inferred".parse::<LabelType>().is_err());
        assert!("pending".parse::<TagState>().is_err());
        assert!("lineage".parse::<TagSource>().is_err());
    }

    #[test]
    fn test_tag_option_parse() {
        let plain: TagOption = "PII.Sensitive".parse().unwrap();
        assert_eq!(plain, TagOption::classification("PII.Sensitive"));

        let glossary: TagOption = "Business.Revenue=glossary".parse().unwrap();
        assert_eq!(glossary, TagOption::glossary("Business.Revenue"));

        assert!("=glossary".parse::<TagOption>().is_err());
        assert!("Tier.Tier1=lineage".parse::<TagOption>().is_err());
    }

    #[test]
    fn test_tag_label_wire_format() {
        let label = TagLabel::manual("PII.Sensitive", TagSource::Classification);
        let value = serde_json::to_value(&label).unwrap();

        assert_eq!(
            value,
            json!({
                "tagFQN": "PII.Sensitive",
                "labelType": "Manual",
                "state": "Confirmed",
                "source": "Classification"
            })
        );
    }

    #[test]
    fn test_column_null_children() {
        let column: ColumnNode = serde_json::from_value(json!({
            "name": "id",
            "fullyQualifiedName": "bucket.id",
            "dataType": "INT",
            "tags": null,
            "children": null
        }))
        .unwrap();

        assert!(column.is_leaf());
        assert!(column.tags.is_empty());
        assert_eq!(column.data_type.as_deref(), Some("INT"));
    }

    #[test]
    fn test_container_preserves_unknown_fields() {
        let doc = json!({
            "id": "6f2a1c9e-0000-4000-8000-000000000001",
            "name": "transactions",
            "fullyQualifiedName": "s3.transactions",
            "tags": [],
            "dataModel": {
                "isPartitioned": true,
                "columns": [{
                    "name": "amount",
                    "fullyQualifiedName": "s3.transactions.amount",
                    "dataType": "DECIMAL",
                    "ordinalPosition": 3,
                    "tags": [{
                        "tagFQN": "Tier.Tier1",
                        "labelType": "Automated",
                        "state": "Suggested",
                        "source": "Classification",
                        "style": {"color": "#ff0000"}
                    }]
                }]
            },
            "version": 0.3
        });

        let container: Container = serde_json::from_value(doc.clone()).unwrap();
        assert_eq!(container.columns().map(|c| c.len()), Some(1));
        assert_eq!(container.extra.get("version"), Some(&json!(0.3)));

        let round_trip = serde_json::to_value(&container).unwrap();
        assert_eq!(round_trip, doc);
    }

    #[test]
    fn test_column_write_back_normalization() {
        let column: ColumnNode = serde_json::from_value(json!({
            "name": "x",
            "fullyQualifiedName": "t.x",
            "children": []
        }))
        .unwrap();

        assert_eq!(
            serde_json::to_value(&column).unwrap(),
            json!({"name": "x", "fullyQualifiedName": "t.x", "tags": []})
        );
    }

    #[test]
    fn test_container_without_data_model() {
        let mut container = Container::from_json(r#"{"name": "raw"}"#).unwrap();
        assert!(container.columns().is_none());
        assert!(container.columns_mut().is_none());
    }

    #[test]
    fn test_is_input_error() {
        assert!(CatalogError::DuplicateFqn("a.b".to_string()).is_input_error());
        assert!(CatalogError::DepthLimitExceeded { limit: 4 }.is_input_error());
        assert!(!CatalogError::Config("bad".to_string()).is_input_error());
    }
}
