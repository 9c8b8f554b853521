//! The identity representation threaded through a rule pipeline.

use serde::Serialize;
use serde_json::{Map, Value};

/// Subject produced by an authenticator and enriched by later steps.
///
/// Serialized field names are the ones visible to expressions
/// (`Subject.ID`, `Subject.Attributes`).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Subject {
    #[serde(rename = "ID")]
    pub id: String,

    #[serde(rename = "Attributes")]
    pub attributes: Map<String, Value>,
}

impl Subject {
    /// Create a subject without attributes.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            attributes: Map::new(),
        }
    }

    /// Look up an attribute by name.
    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }
}
