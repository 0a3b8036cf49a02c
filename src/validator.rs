//! Validator facade
//!
//! Name-keyed instance validation over one compilation pass.

use std::collections::HashMap;
use std::fmt;

use fuzzy_matcher::skim::SkimMatcherV2;
use fuzzy_matcher::FuzzyMatcher;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::engine::CompiledSchema;
use crate::error::{Result, SchemaError};

const MAX_SUGGESTIONS: usize = 3;

/// Outcome of validating one instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<Violation>,
}

/// A single finding reported by the schema engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    /// JSON pointer into the instance, e.g. `/a`
    pub instance_path: String,
    /// JSON pointer into the schema
    pub schema_path: String,
    pub message: String,
}

impl ValidationResult {
    pub fn valid() -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
        }
    }

    pub fn invalid(errors: Vec<Violation>) -> Self {
        Self {
            valid: false,
            errors,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    pub fn errors(&self) -> &[Violation] {
        &self.errors
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.instance_path.is_empty() {
            write!(f, "{}", self.message)
        } else {
            write!(f, "{}: {}", self.instance_path, self.message)
        }
    }
}

/// Compiled schemas, keyed by registered name
///
/// Produced by [`SchemaRegistry::compile`](crate::SchemaRegistry::compile).
/// Immutable, so concurrent `validate` calls are safe.
pub struct Validator {
    schemas: HashMap<String, Box<dyn CompiledSchema>>,
}

impl Validator {
    pub(crate) fn new(schemas: HashMap<String, Box<dyn CompiledSchema>>) -> Self {
        Self { schemas }
    }

    /// Validate raw JSON bytes against the schema registered as `name`
    pub fn validate(&self, name: &str, instance: &[u8]) -> Result<ValidationResult> {
        let schema = self.lookup(name)?;
        let instance: Value = serde_json::from_slice(instance)?;
        Ok(schema.validate(&instance))
    }

    /// Validate an already-parsed instance
    pub fn validate_value(&self, name: &str, instance: &Value) -> Result<ValidationResult> {
        Ok(self.lookup(name)?.validate(instance))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.schemas.contains_key(name)
    }

    /// All compiled names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.schemas.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    fn lookup(&self, name: &str) -> Result<&dyn CompiledSchema> {
        match self.schemas.get(name) {
            Some(schema) => Ok(schema.as_ref()),
            None => {
                debug!(schema = %name, "validation requested for unknown schema");
                Err(SchemaError::NotFound {
                    name: name.to_string(),
                    suggestions: self.suggest(name),
                })
            }
        }
    }

    fn suggest(&self, query: &str) -> Vec<String> {
        let matcher = SkimMatcherV2::default();
        let mut scored: Vec<(i64, &str)> = self
            .schemas
            .keys()
            .filter_map(|name| matcher.fuzzy_match(name, query).map(|score| (score, name.as_str())))
            .collect();

        // Sort by score descending, then by name for stable output
        scored.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(b.1)));

        scored
            .into_iter()
            .take(MAX_SUGGESTIONS)
            .map(|(_, name)| name.to_string())
            .collect()
    }
}

impl fmt::Debug for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Validator")
            .field("schemas", &self.names())
            .finish()
    }
}
