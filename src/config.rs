//! Configuration management for the schema registry
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (schemas.toml)
//! - Environment variables (NAMED_SCHEMAS__*)
//!
//! ## Example config file (schemas.toml):
//! ```toml
//! [registry]
//! extension = "json"
//! max_definition_depth = 32
//!
//! [engine]
//! draft = "draft7"
//! validate_formats = true
//! allow_remote_refs = false
//!
//! [export]
//! output_format = "pretty"
//! include_checksums = true
//! include_manifest = true
//! ```

use config_crate::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SchemaError};

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Registration settings
    #[serde(default)]
    pub registry: RegistrySettings,

    /// Schema engine settings
    #[serde(default)]
    pub engine: EngineConfig,

    /// Export settings
    #[serde(default)]
    pub export: ExportConfig,
}

/// Registration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrySettings {
    /// File extension (without the dot) picked up by `add_file`/`add_dir`
    #[serde(default = "default_extension")]
    pub extension: String,

    /// Deepest `definitions` nesting accepted in one document
    #[serde(default = "default_max_definition_depth")]
    pub max_definition_depth: usize,
}

/// JSON Schema draft used when a schema declares none
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DraftVersion {
    Draft4,
    Draft6,
    Draft7,
}

/// Schema engine settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Force a draft instead of detecting it from `$schema`
    #[serde(default)]
    pub draft: Option<DraftVersion>,

    /// Check `format` keywords
    #[serde(default = "default_true")]
    pub validate_formats: bool,

    /// Let the engine fetch plain `$ref` targets over the network or filesystem
    #[serde(default)]
    pub allow_remote_refs: bool,
}

/// Export configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Output format (pretty or compact)
    #[serde(default)]
    pub output_format: OutputFormat,

    /// Write a checksums.sha256 file
    #[serde(default = "default_true")]
    pub include_checksums: bool,

    /// Write a manifest.json file
    #[serde(default = "default_true")]
    pub include_manifest: bool,
}

/// Output format for JSON
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Pretty,
    Compact,
}

// Default value functions
fn default_extension() -> String {
    "json".to_string()
}

fn default_max_definition_depth() -> usize {
    32
}

fn default_true() -> bool {
    true
}

impl Default for RegistrySettings {
    fn default() -> Self {
        Self {
            extension: default_extension(),
            max_definition_depth: default_max_definition_depth(),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            draft: None,
            validate_formats: true,
            allow_remote_refs: false,
        }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            output_format: OutputFormat::Pretty,
            include_checksums: true,
            include_manifest: true,
        }
    }
}

impl RegistryConfig {
    /// Load configuration, layering `config_path` over the default locations
    pub fn load_from(config_path: Option<&str>) -> Result<Self> {
        let mut builder = Config::builder();

        let config_locations = ["schemas.toml", ".schemas.toml", "config/schemas.toml"];

        for location in config_locations {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        // Load from XDG config directory
        if let Some(config_dir) = directories::ProjectDirs::from("dev", "familiar", "named-schemas") {
            let xdg_config = config_dir.config_dir().join("schemas.toml");
            if xdg_config.exists() {
                builder = builder.add_source(File::from(xdg_config).required(false));
            }
        }

        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // Load from environment variables (NAMED_SCHEMAS__*)
        builder = builder.add_source(
            Environment::with_prefix("NAMED_SCHEMAS")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        Ok(config.try_deserialize()?)
    }

    /// Save configuration to a file
    pub fn save(&self, path: &str) -> Result<()> {
        let content = toml::to_string_pretty(self).map_err(|e| {
            SchemaError::io(path, std::io::Error::new(std::io::ErrorKind::InvalidData, e))
        })?;
        std::fs::write(path, content).map_err(|e| SchemaError::io(path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RegistryConfig::default();
        assert_eq!(config.registry.extension, "json");
        assert_eq!(config.registry.max_definition_depth, 32);
        assert!(config.engine.validate_formats);
        assert!(!config.engine.allow_remote_refs);
        assert_eq!(config.engine.draft, None);
    }

    #[test]
    fn test_serialize_config() {
        let config = RegistryConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[registry]"));
        assert!(toml_str.contains("[engine]"));
        assert!(toml_str.contains("[export]"));
    }

    #[test]
    fn test_load_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(
            &path,
            "[registry]\nmax_definition_depth = 4\n\n[engine]\ndraft = \"draft4\"\n",
        )
        .unwrap();

        let config = RegistryConfig::load_from(path.to_str()).unwrap();
        assert_eq!(config.registry.max_definition_depth, 4);
        assert_eq!(config.registry.extension, "json");
        assert_eq!(config.engine.draft, Some(DraftVersion::Draft4));
    }

    #[test]
    fn test_missing_explicit_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");

        let err = RegistryConfig::load_from(path.to_str()).unwrap_err();
        assert!(matches!(err, SchemaError::Config(_)));
    }

    #[test]
    fn test_saved_config_loads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("saved.toml");
        let mut config = RegistryConfig::default();
        config.registry.extension = "schema".to_string();
        config.save(path.to_str().unwrap()).unwrap();

        let loaded = RegistryConfig::load_from(path.to_str()).unwrap();
        assert_eq!(loaded.registry.extension, "schema");
    }
}
