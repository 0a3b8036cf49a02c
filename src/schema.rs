//! Registered schema documents

use std::collections::BTreeSet;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::checksum::Checksum;
use crate::error::{Result, SchemaError};
use crate::refs;

/// Key holding embedded definitions in a raw schema
pub const DEFINITIONS_KEY: &str = "definitions";

/// A single named schema, flattened out of its source document
///
/// `source` is the canonical serialization of the body with `definitions`
/// removed; symbolic references are kept exactly as written.
#[derive(Debug, Clone, Serialize)]
pub struct SchemaDocument {
    name: String,
    #[serde(skip)]
    source: Vec<u8>,
    required_references: BTreeSet<String>,
    checksum: Checksum,
}

impl SchemaDocument {
    /// Build a document from a body that no longer carries `definitions`
    pub(crate) fn new(name: impl Into<String>, body: Map<String, Value>) -> Result<Self> {
        let name = name.into();
        let source = serde_json::to_vec(&Value::Object(body))
            .map_err(|e| SchemaError::invalid_format(&name, e.to_string()))?;
        let required_references = refs::find_references(&source);
        let checksum = Checksum::from_bytes(&source);
        Ok(Self {
            name,
            source,
            required_references,
            checksum,
        })
    }

    /// Registered name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Canonical body bytes
    pub fn source(&self) -> &[u8] {
        &self.source
    }

    /// Names this schema references symbolically
    pub fn required_references(&self) -> &BTreeSet<String> {
        &self.required_references
    }

    pub fn checksum(&self) -> &Checksum {
        &self.checksum
    }

    /// Parse the canonical body back into a JSON value
    pub fn body(&self) -> Result<Value> {
        Ok(serde_json::from_slice(&self.source)?)
    }
}
