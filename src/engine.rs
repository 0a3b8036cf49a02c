//! Schema engine capability
//!
//! Keyword evaluation is delegated to an engine behind three narrow traits:
//! an engine hands out loaders, a loader collects the named documents a schema
//! depends on and compiles one schema against them, and the compiled schema
//! validates instances. The default engine wraps the `jsonschema` crate.
//!
//! Every named document is addressed by a synthetic locator
//! (`registry://schemas/<name>`). Locators never leave the compiler.

use std::sync::{Arc, OnceLock};

use jsonschema::{Draft, JSONSchema, SchemaResolver, SchemaResolverError};
use serde_json::Value;
use thiserror::Error;
use url::Url;

use crate::config::{DraftVersion, EngineConfig};
use crate::validator::{ValidationResult, Violation};

const LOCATOR_BASE: &str = "registry://schemas/";

/// Failure reported by a schema engine
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct EngineError(pub String);

/// A source of fresh loaders
pub trait SchemaEngine {
    type Loader: SchemaLoader;

    /// Start an empty loader for one compilation target
    fn loader(&self) -> Self::Loader;
}

/// Collects the closure of one target, then compiles the target
pub trait SchemaLoader {
    /// Make `schema` resolvable under `locator`
    fn add_schema(&mut self, locator: &str, schema: Value) -> Result<(), EngineError>;

    /// Compile the target; it is also resolvable under its own `locator`
    fn compile(self, locator: &str, schema: Value) -> Result<Box<dyn CompiledSchema>, EngineError>;
}

/// An immutable compiled schema, shareable across threads
pub trait CompiledSchema: Send + Sync {
    fn validate(&self, instance: &Value) -> ValidationResult;
}

fn locator_base() -> &'static Url {
    static BASE: OnceLock<Url> = OnceLock::new();
    BASE.get_or_init(|| Url::parse(LOCATOR_BASE).expect("locator base is a valid URL"))
}

/// Synthetic locator for a registered name
///
/// The name is percent-encoded as a single path segment, so the result can be
/// written into a JSON string without escaping.
pub fn locator(name: &str) -> String {
    let mut url = locator_base().clone();
    if let Ok(mut segments) = url.path_segments_mut() {
        segments.pop_if_empty().push(name);
    }
    url.into()
}

/// Engine backed by the `jsonschema` crate
#[derive(Debug, Clone, Default)]
pub struct JsonSchemaEngine {
    config: EngineConfig,
}

impl JsonSchemaEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }
}

impl SchemaEngine for JsonSchemaEngine {
    type Loader = JsonSchemaLoader;

    fn loader(&self) -> JsonSchemaLoader {
        let mut options = JSONSchema::options();
        options.should_validate_formats(self.config.validate_formats);
        if let Some(draft) = self.config.draft {
            options.with_draft(match draft {
                DraftVersion::Draft4 => Draft::Draft4,
                DraftVersion::Draft6 => Draft::Draft6,
                DraftVersion::Draft7 => Draft::Draft7,
            });
        }
        if !self.config.allow_remote_refs {
            options.with_resolver(RegisteredOnly);
        }
        JsonSchemaLoader { options }
    }
}

/// Loader that stores closure members as engine documents
pub struct JsonSchemaLoader {
    options: jsonschema::CompilationOptions,
}

impl SchemaLoader for JsonSchemaLoader {
    fn add_schema(&mut self, locator: &str, schema: Value) -> Result<(), EngineError> {
        self.options.with_document(locator.to_string(), schema);
        Ok(())
    }

    fn compile(mut self, locator: &str, schema: Value) -> Result<Box<dyn CompiledSchema>, EngineError> {
        self.options.with_document(locator.to_string(), schema.clone());
        let compiled = self
            .options
            .compile(&schema)
            .map_err(|e| EngineError(e.to_string()))?;
        Ok(Box::new(JsonSchemaValidator(compiled)))
    }
}

struct JsonSchemaValidator(JSONSchema);

impl CompiledSchema for JsonSchemaValidator {
    fn validate(&self, instance: &Value) -> ValidationResult {
        match self.0.validate(instance) {
            Ok(()) => ValidationResult::valid(),
            Err(errors) => ValidationResult::invalid(
                errors
                    .map(|e| Violation {
                        instance_path: e.instance_path.to_string(),
                        schema_path: e.schema_path.to_string(),
                        message: e.to_string(),
                    })
                    .collect(),
            ),
        }
    }
}

/// Resolver that refuses anything the loader did not register
struct RegisteredOnly;

impl SchemaResolver for RegisteredOnly {
    fn resolve(
        &self,
        _root_schema: &Value,
        url: &Url,
        original_reference: &str,
    ) -> Result<Arc<Value>, SchemaResolverError> {
        Err(anyhow::anyhow!(
            "reference '{}' ({}) is not a registered schema and remote references are disabled",
            original_reference,
            url
        ))
    }
}
