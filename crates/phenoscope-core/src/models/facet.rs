use serde::{Deserialize, Serialize};

/// Declaration of one filterable facet dimension.
///
/// The declaration order of these in the dataset profile fixes the clause
/// order of compiled queries and the panel order of the facet sidebar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacetFieldDef {
    /// Facet identifier, also used as the aggregation key (e.g. "family").
    pub name: String,

    /// Backing index field, when it differs from the facet name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,

    /// Number of buckets requested from the backend for this facet.
    pub bucket_size: u32,
}

impl FacetFieldDef {
    pub fn new(name: impl Into<String>, bucket_size: u32) -> Self {
        Self {
            name: name.into(),
            field: None,
            bucket_size,
        }
    }

    /// The index field the aggregation runs on.
    pub fn backing_field(&self) -> &str {
        self.field.as_deref().unwrap_or(&self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backing_field_defaults_to_name() {
        let def = FacetFieldDef::new("family", 50);
        assert_eq!(def.backing_field(), "family");

        let def = FacetFieldDef {
            field: Some("family.keyword".to_string()),
            ..FacetFieldDef::new("family", 50)
        };
        assert_eq!(def.backing_field(), "family.keyword");
    }
}
