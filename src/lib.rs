//! Named Schema Registry
//!
//! Registers many independently written JSON Schema documents under symbolic
//! names, lets them reference each other by name, and compiles them into a
//! validator that checks instances against any registered schema.
//!
//! ## Features
//!
//! - **Symbolic References**: `{"$ref": "{Address}"}` names a registered schema
//! - **Flattened Definitions**: `definitions` become entries named `Parent` + `Key`
//! - **Completeness Checking**: every unresolved reference is reported at once
//! - **Cycle-Safe Compilation**: mutually recursive schemas compile and validate
//! - **Pluggable Engine**: keyword evaluation sits behind [`SchemaEngine`]
//!
//! ## Flow
//!
//! ```text
//! bytes ──add_schema──▶ SchemaRegistry ──compile──▶ Validator ──validate──▶ ValidationResult
//!                            │                 │
//!                  flatten definitions   check references,
//!                  record references     compile closures
//! ```
//!
//! ## Example
//!
//! ```
//! use named_schemas::SchemaRegistry;
//!
//! let mut registry = SchemaRegistry::new();
//! registry.add_schema("Name", br#"{"type":"string"}"#)?;
//! registry.add_schema("Person", br#"{"properties":{"name":{"$ref":"{Name}"}}}"#)?;
//!
//! let validator = registry.compile()?;
//! assert!(validator.validate("Person", br#"{"name":"Ada"}"#)?.is_valid());
//! assert!(!validator.validate("Person", br#"{"name":42}"#)?.is_valid());
//! # Ok::<(), named_schemas::SchemaError>(())
//! ```

pub mod checksum;
mod compiler;
pub mod config;
pub mod engine;
pub mod error;
pub mod export;
pub mod graph;
pub mod refs;
pub mod registry;
pub mod schema;
pub mod validator;

pub use checksum::Checksum;
pub use config::{DraftVersion, EngineConfig, ExportConfig, OutputFormat, RegistryConfig};
pub use engine::{CompiledSchema, EngineError, JsonSchemaEngine, SchemaEngine, SchemaLoader};
pub use error::{MissingReference, Result, SchemaError};
pub use export::{export_schemas, ExportManifest};
pub use graph::DependencyGraph;
pub use refs::{find_references, rewrite_references};
pub use registry::SchemaRegistry;
pub use schema::SchemaDocument;
pub use validator::{ValidationResult, Validator, Violation};
