//! Schema Registry
//!
//! Holds named schema documents until they are compiled. Embedded
//! `definitions` are flattened into their own entries named by appending the
//! definition key to the parent name, so `Date` with `definitions.Year`
//! registers `Date` and `DateYear`. Entries are never replaced or removed.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use serde_json::{Map, Value};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::compiler;
use crate::config::RegistryConfig;
use crate::engine::{JsonSchemaEngine, SchemaEngine};
use crate::error::{MissingReference, Result, SchemaError};
use crate::graph::DependencyGraph;
use crate::schema::{SchemaDocument, DEFINITIONS_KEY};
use crate::validator::Validator;

/// Registry of named schemas, built up before compilation
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    config: RegistryConfig,
    schemas: BTreeMap<String, SchemaDocument>,
}

impl SchemaRegistry {
    /// Create an empty registry with default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty registry with the given configuration
    pub fn with_config(config: RegistryConfig) -> Self {
        Self {
            config,
            schemas: BTreeMap::new(),
        }
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Register every eligible file directly inside `dir`
    ///
    /// Sub-directories are not descended into. Each file is registered as
    /// `prefix` + its file stem. Files are added in name order and the first
    /// failure stops the walk; files added before it stay registered.
    pub fn add_dir(&mut self, prefix: &str, dir: impl AsRef<Path>) -> Result<usize> {
        let dir = dir.as_ref();
        let mut added = 0;

        for entry in WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = entry.map_err(|e| SchemaError::io(dir, e.into()))?;
            let path = entry.path();
            if !entry.file_type().is_file() {
                continue;
            }
            if !self.is_eligible(path) {
                warn!(path = %path.display(), "skipping non-schema file");
                continue;
            }
            self.add_file(prefix, path)?;
            added += 1;
        }

        info!(dir = %dir.display(), files = added, "loaded schema directory");
        Ok(added)
    }

    /// Register one file as `prefix` + its file stem
    pub fn add_file(&mut self, prefix: &str, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if !self.is_eligible(path) {
            return Err(SchemaError::invalid_format(
                path.display().to_string(),
                format!("file must have a .{} extension", self.config.registry.extension),
            ));
        }
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| {
                SchemaError::invalid_format(path.display().to_string(), "file name is not valid UTF-8")
            })?;

        let contents = fs::read(path).map_err(|e| SchemaError::io(path, e))?;
        self.add_schema(&format!("{}{}", prefix, stem), &contents)
    }

    /// Register a raw JSON schema document under `name`
    pub fn add_schema(&mut self, name: &str, source: &[u8]) -> Result<()> {
        let value: Value = serde_json::from_slice(source).map_err(|e| {
            SchemaError::invalid_format(name, format!("schema is not valid JSON: {}", e))
        })?;
        self.add_value(name, value)
    }

    /// Register an already-parsed schema under `name`
    ///
    /// Either every entry flattened out of the document is registered, or none.
    pub fn add_value(&mut self, name: &str, schema: Value) -> Result<()> {
        let Value::Object(body) = schema else {
            return Err(SchemaError::invalid_format(name, "schema must be a JSON object"));
        };

        let mut staged = Vec::new();
        self.flatten(name, body, 0, &mut staged)?;

        let mut seen = BTreeSet::new();
        for doc in &staged {
            if self.schemas.contains_key(doc.name()) || !seen.insert(doc.name()) {
                return Err(SchemaError::AlreadyExists {
                    name: doc.name().to_string(),
                });
            }
        }

        for doc in staged {
            debug!(
                schema = %doc.name(),
                references = doc.required_references().len(),
                "registered schema"
            );
            self.schemas.insert(doc.name().to_string(), doc);
        }
        Ok(())
    }

    /// Canonical bytes of every registered schema, symbolic references untouched
    pub fn get_schemas(&self) -> BTreeMap<String, Vec<u8>> {
        self.schemas
            .iter()
            .map(|(name, doc)| (name.clone(), doc.source().to_vec()))
            .collect()
    }

    pub fn get(&self, name: &str) -> Option<&SchemaDocument> {
        self.schemas.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.schemas.contains_key(name)
    }

    /// Registered names, sorted
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.schemas.keys().map(String::as_str)
    }

    pub fn documents(&self) -> impl Iterator<Item = &SchemaDocument> {
        self.schemas.values()
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    pub fn dependency_graph(&self) -> DependencyGraph {
        DependencyGraph::build(self.schemas.values())
    }

    /// Check that every symbolic reference names a registered schema
    ///
    /// Reports every unresolved `(missing, from)` pair, not just the first.
    pub fn check_references(&self) -> Result<()> {
        let mut missing: Vec<MissingReference> = self
            .schemas
            .values()
            .flat_map(|doc| {
                doc.required_references()
                    .iter()
                    .filter(move |reference| !self.schemas.contains_key(reference.as_str()))
                    .map(move |reference| MissingReference {
                        missing: reference.clone(),
                        from: doc.name().to_string(),
                    })
            })
            .collect();

        if missing.is_empty() {
            return Ok(());
        }
        missing.sort();
        Err(SchemaError::MissingReferences { missing })
    }

    /// Compile every registered schema with the configured `jsonschema` engine
    pub fn compile(&self) -> Result<Validator> {
        self.compile_with(&JsonSchemaEngine::new(self.config.engine.clone()))
    }

    /// Compile every registered schema with `engine`
    ///
    /// All-or-nothing: on error no validator is produced and the registry is
    /// unchanged, so missing schemas can be added and compilation retried.
    pub fn compile_with<E: SchemaEngine>(&self, engine: &E) -> Result<Validator> {
        self.check_references()?;

        for cycle in self.dependency_graph().cycles() {
            debug!(members = ?cycle, "reference cycle");
        }

        let compiled = compiler::compile_all(&self.schemas, engine)?;
        Ok(Validator::new(compiled))
    }

    fn is_eligible(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext == self.config.registry.extension)
            .unwrap_or(false)
    }

    /// Hoist `definitions` out of `body`, depth first, into `staged`
    fn flatten(
        &self,
        name: &str,
        mut body: Map<String, Value>,
        depth: usize,
        staged: &mut Vec<SchemaDocument>,
    ) -> Result<()> {
        if let Some(definitions) = body.remove(DEFINITIONS_KEY) {
            let Value::Object(definitions) = definitions else {
                return Err(SchemaError::invalid_format(
                    name,
                    "expected 'definitions' to be an object",
                ));
            };
            if depth >= self.config.registry.max_definition_depth {
                return Err(SchemaError::invalid_format(
                    name,
                    format!(
                        "definitions nested deeper than {} levels",
                        self.config.registry.max_definition_depth
                    ),
                ));
            }

            for (key, definition) in definitions {
                let definition_name = format!("{}{}", name, key);
                let Value::Object(definition) = definition else {
                    return Err(SchemaError::invalid_format(
                        definition_name,
                        format!("expected definition for '{}' to be an object", key),
                    ));
                };
                self.flatten(&definition_name, definition, depth + 1, staged)?;
            }
        }

        staged.push(SchemaDocument::new(name, body)?);
        Ok(())
    }
}
