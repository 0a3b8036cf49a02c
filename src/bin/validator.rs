//! Schema Validator CLI
//!
//! Loads schema directories, checks references, and validates instances.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use named_schemas::{export_schemas, RegistryConfig, SchemaRegistry};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "schema-validator")]
#[command(about = "Validate JSON documents against named schemas")]
struct Cli {
    /// Config file to load (optional)
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

/// Where schemas are loaded from
#[derive(clap::Args)]
struct Source {
    /// Schema directory (repeatable, not recursive)
    #[arg(short, long = "dir", required = true)]
    dirs: Vec<PathBuf>,

    /// Prefix for every name loaded from the directories
    #[arg(short, long, default_value = "")]
    prefix: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Check that every reference resolves and every schema compiles
    Check {
        #[command(flatten)]
        source: Source,
    },

    /// List registered schemas and their references
    List {
        #[command(flatten)]
        source: Source,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Validate instance files against a schema
    Validate {
        #[command(flatten)]
        source: Source,

        /// Schema name
        #[arg(short, long)]
        schema: String,

        /// Instance files
        #[arg(required = true)]
        instances: Vec<PathBuf>,

        /// Output results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Export the registered schemas to a directory
    Export {
        #[command(flatten)]
        source: Source,

        /// Output directory
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Show the effective configuration, or write the defaults
    Config {
        /// Write default configuration to this path
        #[arg(long)]
        init: Option<String>,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(2);
        }
    }
}

fn load(config: &RegistryConfig, source: &Source) -> anyhow::Result<SchemaRegistry> {
    let mut registry = SchemaRegistry::with_config(config.clone());
    for dir in &source.dirs {
        registry
            .add_dir(&source.prefix, dir)
            .with_context(|| format!("failed to load schemas from {}", dir.display()))?;
    }
    Ok(registry)
}

/// Returns whether everything checked out
fn run(cli: Cli) -> anyhow::Result<bool> {
    let config = RegistryConfig::load_from(cli.config.as_deref())?;

    match cli.command {
        Commands::Check { source } => {
            let registry = load(&config, &source)?;
            println!("🔍 Checking {} schema(s)...", registry.len());

            let cycles = registry.dependency_graph().cycles();
            for cycle in &cycles {
                println!("  ↻ cycle: {}", cycle.join(" → "));
            }

            let validator = registry.compile()?;
            println!("✅ {} schema(s) compiled", validator.len());
            Ok(true)
        }

        Commands::List { source, json } => {
            let registry = load(&config, &source)?;
            if json {
                let documents: Vec<_> = registry.documents().collect();
                println!("{}", serde_json::to_string_pretty(&documents)?);
            } else {
                for doc in registry.documents() {
                    let references: Vec<&str> =
                        doc.required_references().iter().map(String::as_str).collect();
                    if references.is_empty() {
                        println!("{}", doc.name());
                    } else {
                        println!("{} → {}", doc.name(), references.join(", "));
                    }
                }
            }
            Ok(true)
        }

        Commands::Validate {
            source,
            schema,
            instances,
            json,
        } => {
            let validator = load(&config, &source)?.compile()?;
            let mut all_valid = true;
            let mut report = serde_json::Map::new();

            for path in &instances {
                let bytes = std::fs::read(path)
                    .with_context(|| format!("failed to read {}", path.display()))?;
                let result = validator.validate(&schema, &bytes)?;
                all_valid &= result.is_valid();

                if json {
                    report.insert(path.display().to_string(), serde_json::to_value(&result)?);
                } else if result.is_valid() {
                    println!("✅ {} - valid", path.display());
                } else {
                    println!("❌ {} - INVALID", path.display());
                    for violation in result.errors() {
                        println!("   └─ {}", violation);
                    }
                }
            }

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            }
            Ok(all_valid)
        }

        Commands::Export { source, output } => {
            let registry = load(&config, &source)?;
            let manifest = export_schemas(&registry, &output, &config.export)?;
            println!("✅ Exported {} schema(s) to {:?}", manifest.schemas.len(), output);
            Ok(true)
        }

        Commands::Config { init } => {
            match init {
                Some(path) => {
                    RegistryConfig::default().save(&path)?;
                    println!("✅ Wrote default configuration to {}", path);
                }
                None => println!("{}", toml::to_string_pretty(&config)?),
            }
            Ok(true)
        }
    }
}
