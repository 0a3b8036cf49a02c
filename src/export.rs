//! Schema export
//!
//! Writes the registry snapshot to a directory for external consumers such as
//! code generators. Each entry becomes `<name>.json` with symbolic references
//! left as written; nothing is rewritten to engine locators.

use std::fs;
use std::path::{Component, Path};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::checksum::Checksum;
use crate::config::{ExportConfig, OutputFormat};
use crate::error::{Result, SchemaError};
use crate::registry::SchemaRegistry;

pub const MANIFEST_FILE: &str = "manifest.json";
pub const CHECKSUMS_FILE: &str = "checksums.sha256";

/// Manifest describing one export
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportManifest {
    pub generated_at: DateTime<Utc>,
    pub schemas: Vec<ManifestEntry>,
}

/// A single exported schema
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub name: String,
    pub file: String,
    pub checksum: Checksum,
    pub references: Vec<String>,
}

/// Write every registered schema into `output_dir`
pub fn export_schemas(
    registry: &SchemaRegistry,
    output_dir: impl AsRef<Path>,
    config: &ExportConfig,
) -> Result<ExportManifest> {
    let output = output_dir.as_ref();
    let files = registry
        .documents()
        .map(|doc| file_name(doc.name()))
        .collect::<Result<Vec<_>>>()?;
    fs::create_dir_all(output).map_err(|e| SchemaError::io(output, e))?;

    let mut entries = Vec::with_capacity(registry.len());
    for (doc, file) in registry.documents().zip(files) {
        let content = match config.output_format {
            OutputFormat::Compact => doc.source().to_vec(),
            OutputFormat::Pretty => {
                let body: Value = doc.body()?;
                serde_json::to_vec_pretty(&body)?
            }
        };
        write(&output.join(&file), &content)?;

        entries.push(ManifestEntry {
            name: doc.name().to_string(),
            file,
            checksum: doc.checksum().clone(),
            references: doc.required_references().iter().cloned().collect(),
        });
    }

    // Checksums cover the canonical bytes, independent of output format
    if config.include_checksums {
        let checksums: String = entries
            .iter()
            .map(|entry| format!("{}  {}\n", entry.checksum, entry.file))
            .collect();
        write(&output.join(CHECKSUMS_FILE), checksums.as_bytes())?;
    }

    let manifest = ExportManifest {
        generated_at: Utc::now(),
        schemas: entries,
    };
    if config.include_manifest {
        write(&output.join(MANIFEST_FILE), &serde_json::to_vec_pretty(&manifest)?)?;
    }

    info!(dir = %output.display(), schemas = manifest.schemas.len(), "exported schemas");
    Ok(manifest)
}

/// `<name>.json`, provided it stays a single file inside the output directory
fn file_name(name: &str) -> Result<String> {
    let file = format!("{}.json", name);
    let mut components = Path::new(&file).components();
    let single = matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    );
    if !single || name.contains(['/', '\\']) {
        return Err(SchemaError::invalid_format(
            name,
            "name cannot be used as an export file name",
        ));
    }
    Ok(file)
}

fn write(path: &Path, content: &[u8]) -> Result<()> {
    fs::write(path, content).map_err(|e| SchemaError::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    fn registry() -> SchemaRegistry {
        let mut registry = SchemaRegistry::new();
        registry
            .add_value(
                "Date",
                json!({ "type": "object", "definitions": { "Year": { "type": "integer" } } }),
            )
            .unwrap();
        registry
            .add_value("Main", json!({ "properties": { "d": { "$ref": "{Date}" } } }))
            .unwrap();
        registry
    }

    #[test]
    fn test_export_writes_every_schema() {
        let dir = tempdir().unwrap();
        let manifest = export_schemas(&registry(), dir.path(), &ExportConfig::default()).unwrap();

        let names: Vec<_> = manifest.schemas.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["Date", "DateYear", "Main"]);

        let main: Value =
            serde_json::from_slice(&fs::read(dir.path().join("Main.json")).unwrap()).unwrap();
        assert_eq!(main["properties"]["d"]["$ref"], json!("{Date}"));
        assert!(dir.path().join(MANIFEST_FILE).exists());

        let checksums = fs::read_to_string(dir.path().join(CHECKSUMS_FILE)).unwrap();
        assert_eq!(checksums.lines().count(), 3);
        assert!(checksums.contains("  DateYear.json"));
    }

    #[test]
    fn test_compact_export_matches_canonical_bytes() {
        let dir = tempdir().unwrap();
        let registry = registry();
        let config = ExportConfig {
            output_format: OutputFormat::Compact,
            include_checksums: false,
            include_manifest: false,
        };
        let manifest = export_schemas(&registry, dir.path(), &config).unwrap();

        let written = fs::read(dir.path().join("Main.json")).unwrap();
        assert_eq!(written, registry.get_schemas()["Main"]);
        assert!(manifest.schemas[2].checksum.verify(&written));
        assert!(!dir.path().join(MANIFEST_FILE).exists());
        assert!(!dir.path().join(CHECKSUMS_FILE).exists());
    }

    #[test]
    fn test_names_that_leave_output_dir_are_rejected() {
        let base = tempdir().unwrap();
        let output = base.path().join("out");
        let mut registry = SchemaRegistry::new();
        registry
            .add_value("", json!({ "definitions": { "../escaped": {} } }))
            .unwrap();

        let err = export_schemas(&registry, &output, &ExportConfig::default()).unwrap_err();
        assert!(matches!(err, SchemaError::InvalidFormat { ref name, .. } if name == "../escaped"));
        assert!(!base.path().join("escaped.json").exists());
        assert!(!output.exists());
    }

    #[test]
    fn test_nested_path_names_are_rejected() {
        let dir = tempdir().unwrap();
        let mut registry = SchemaRegistry::new();
        registry
            .add_value("Api", json!({ "definitions": { "/v1": {} } }))
            .unwrap();

        let err = export_schemas(&registry, dir.path(), &ExportConfig::default()).unwrap_err();
        assert!(matches!(err, SchemaError::InvalidFormat { ref name, .. } if name == "Api/v1"));
    }

    #[test]
    fn test_unusual_but_flat_names_export() {
        let dir = tempdir().unwrap();
        let mut registry = SchemaRegistry::new();
        registry.add_value("with space..", json!({ "type": "null" })).unwrap();

        export_schemas(&registry, dir.path(), &ExportConfig::default()).unwrap();
        assert!(dir.path().join("with space...json").exists());
    }
}
