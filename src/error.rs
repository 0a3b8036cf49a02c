//! Error types for the schema registry

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Result type for schema operations
pub type Result<T> = std::result::Result<T, SchemaError>;

/// Schema registry errors
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("IO error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid schema format for '{name}': {reason}")]
    InvalidFormat { name: String, reason: String },

    #[error("Schema already exists: {name}")]
    AlreadyExists { name: String },

    #[error("missing required references: {}", join_missing(.missing))]
    MissingReferences { missing: Vec<MissingReference> },

    #[error("Failed to compile schema '{name}': {message}")]
    Compilation { name: String, message: String },

    #[error("Schema not found: {name}{}", did_you_mean(.suggestions))]
    NotFound {
        name: String,
        suggestions: Vec<String>,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config_crate::ConfigError),
}

impl SchemaError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SchemaError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn invalid_format(name: impl Into<String>, reason: impl Into<String>) -> Self {
        SchemaError::InvalidFormat {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

/// A symbolic reference that names no registered schema
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MissingReference {
    /// The referenced name that is not registered
    pub missing: String,
    /// The schema holding the reference
    pub from: String,
}

impl fmt::Display for MissingReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (from {})", self.missing, self.from)
    }
}

fn join_missing(missing: &[MissingReference]) -> String {
    missing
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

fn did_you_mean(suggestions: &[String]) -> String {
    if suggestions.is_empty() {
        String::new()
    } else {
        format!(" (did you mean: {}?)", suggestions.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_references_lists_every_pair() {
        let err = SchemaError::MissingReferences {
            missing: vec![
                MissingReference { missing: "B".into(), from: "A".into() },
                MissingReference { missing: "C".into(), from: "A".into() },
            ],
        };
        assert_eq!(
            err.to_string(),
            "missing required references: B (from A), C (from A)"
        );
    }

    #[test]
    fn test_not_found_suggestions() {
        let err = SchemaError::NotFound {
            name: "Usr".into(),
            suggestions: vec!["User".into()],
        };
        assert_eq!(err.to_string(), "Schema not found: Usr (did you mean: User?)");

        let err = SchemaError::NotFound { name: "X".into(), suggestions: vec![] };
        assert_eq!(err.to_string(), "Schema not found: X");
    }
}
