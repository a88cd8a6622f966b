//! Field selection for container fetches.
//!
//! The catalog only returns tags, owners and the column data model when the
//! request names them in its `fields` query parameter. A container fetched
//! without [`container_fields`] arrives with empty column tags, and any tag
//! patch applied to it would silently drop the tags the server still has.

use crate::CatalogError;

/// Optional entity fields that must be requested explicitly
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TabSpecificField {
    Tags,
    Owner,
    Followers,
    DataModel,
    Domain,
}

impl TabSpecificField {
    /// Returns the field name as the API expects it.
    pub fn as_str(&self) -> &'static str {
        match self {
            TabSpecificField::Tags => "tags",
            TabSpecificField::Owner => "owner",
            TabSpecificField::Followers => "followers",
            TabSpecificField::DataModel => "dataModel",
            TabSpecificField::Domain => "domain",
        }
    }
}

impl std::fmt::Display for TabSpecificField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for TabSpecificField {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "tags" => Ok(TabSpecificField::Tags),
            "owner" => Ok(TabSpecificField::Owner),
            "followers" => Ok(TabSpecificField::Followers),
            "datamodel" => Ok(TabSpecificField::DataModel),
            "domain" => Ok(TabSpecificField::Domain),
            _ => Err(CatalogError::ValidationError(format!(
                "Unknown entity field: {}",
                s
            ))),
        }
    }
}

/// Fields a container page requests so that columns arrive with their tags.
pub const CONTAINER_FIELDS: [TabSpecificField; 5] = [
    TabSpecificField::Tags,
    TabSpecificField::Owner,
    TabSpecificField::Followers,
    TabSpecificField::DataModel,
    TabSpecificField::Domain,
];

/// Comma-joined [`CONTAINER_FIELDS`], ready for a `fields=` query parameter.
pub fn container_fields() -> String {
    CONTAINER_FIELDS
        .iter()
        .map(TabSpecificField::as_str)
        .collect::<Vec<_>>()
        .join(",")
}
