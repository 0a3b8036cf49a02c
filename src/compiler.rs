//! Dependency closure compiler
//!
//! Every registered schema is compiled against its own loader holding exactly
//! the schemas it reaches through symbolic references. References may form
//! cycles; the closure walk marks each name `InProgress` before descending and
//! skips names already marked, so every member is registered once and the walk
//! terminates. Resolving the back-edges is left to the engine, which looks
//! documents up by locator when validating.

use std::collections::{BTreeMap, HashMap};

use serde_json::Value;
use tracing::{debug, info};

use crate::engine::{locator, CompiledSchema, SchemaEngine, SchemaLoader};
use crate::error::{Result, SchemaError};
use crate::refs;
use crate::schema::SchemaDocument;

/// Visit mark for one name during a closure walk; absent means unvisited
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VisitState {
    InProgress,
    Done,
}

/// Compile every document; the first engine failure aborts the whole pass
///
/// All symbolic references must already be known to resolve.
pub(crate) fn compile_all<E: SchemaEngine>(
    schemas: &BTreeMap<String, SchemaDocument>,
    engine: &E,
) -> Result<HashMap<String, Box<dyn CompiledSchema>>> {
    info!(schemas = schemas.len(), "compiling registry");

    let mut compiled = HashMap::with_capacity(schemas.len());
    for (name, doc) in schemas {
        compiled.insert(name.clone(), compile_target(schemas, engine, doc)?);
    }
    Ok(compiled)
}

fn compile_target<E: SchemaEngine>(
    schemas: &BTreeMap<String, SchemaDocument>,
    engine: &E,
    target: &SchemaDocument,
) -> Result<Box<dyn CompiledSchema>> {
    let mut loader = engine.loader();
    let mut status: HashMap<&str, VisitState> = HashMap::new();
    status.insert(target.name(), VisitState::InProgress);

    for dependency in target.required_references() {
        register_closure(schemas, &mut loader, &mut status, dependency)?;
    }

    let body = resolved_body(target)?;
    let compiled = loader
        .compile(&locator(target.name()), body)
        .map_err(|e| SchemaError::Compilation {
            name: target.name().to_string(),
            message: e.to_string(),
        })?;

    debug!(
        schema = %target.name(),
        closure = status.len() - 1,
        "compiled schema"
    );
    Ok(compiled)
}

/// Register `name` after everything it references
fn register_closure<'a, L: SchemaLoader>(
    schemas: &'a BTreeMap<String, SchemaDocument>,
    loader: &mut L,
    status: &mut HashMap<&'a str, VisitState>,
    name: &'a str,
) -> Result<()> {
    // InProgress here is a back-edge; Done was registered by an earlier branch
    if status.contains_key(name) {
        return Ok(());
    }
    let doc = schemas.get(name).ok_or_else(|| SchemaError::NotFound {
        name: name.to_string(),
        suggestions: Vec::new(),
    })?;
    status.insert(doc.name(), VisitState::InProgress);

    for dependency in doc.required_references() {
        register_closure(schemas, loader, status, dependency)?;
    }

    loader
        .add_schema(&locator(doc.name()), resolved_body(doc)?)
        .map_err(|e| SchemaError::Compilation {
            name: doc.name().to_string(),
            message: e.to_string(),
        })?;
    status.insert(doc.name(), VisitState::Done);
    Ok(())
}

/// The document body with symbolic references pointed at locators
fn resolved_body(doc: &SchemaDocument) -> Result<Value> {
    let rewritten = refs::rewrite_references(doc.source(), locator);
    serde_json::from_slice(&rewritten).map_err(|e| SchemaError::Compilation {
        name: doc.name().to_string(),
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validator::ValidationResult;
    use serde_json::json;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Records every loader call as (target index, event)
    #[derive(Default)]
    struct Recording {
        events: Rc<RefCell<Vec<(usize, String)>>>,
        loaders: Rc<RefCell<usize>>,
    }

    struct RecordingLoader {
        id: usize,
        events: Rc<RefCell<Vec<(usize, String)>>>,
    }

    struct Accepts;

    impl CompiledSchema for Accepts {
        fn validate(&self, _instance: &Value) -> ValidationResult {
            ValidationResult::valid()
        }
    }

    impl SchemaEngine for Recording {
        type Loader = RecordingLoader;

        fn loader(&self) -> RecordingLoader {
            let mut count = self.loaders.borrow_mut();
            *count += 1;
            RecordingLoader {
                id: *count,
                events: Rc::clone(&self.events),
            }
        }
    }

    impl SchemaLoader for RecordingLoader {
        fn add_schema(&mut self, locator: &str, _schema: Value) -> std::result::Result<(), crate::engine::EngineError> {
            self.events.borrow_mut().push((self.id, format!("add {}", locator)));
            Ok(())
        }

        fn compile(self, locator: &str, schema: Value) -> std::result::Result<Box<dyn CompiledSchema>, crate::engine::EngineError> {
            if schema.get("fail").is_some() {
                return Err(crate::engine::EngineError("rejected".to_string()));
            }
            self.events.borrow_mut().push((self.id, format!("compile {}", locator)));
            Ok(Box::new(Accepts))
        }
    }

    fn registry(entries: Vec<(&str, Value)>) -> BTreeMap<String, SchemaDocument> {
        entries
            .into_iter()
            .map(|(name, body)| {
                let map = body.as_object().cloned().unwrap();
                (name.to_string(), SchemaDocument::new(name, map).unwrap())
            })
            .collect()
    }

    fn events_for(recording: &Recording, id: usize) -> Vec<String> {
        recording
            .events
            .borrow()
            .iter()
            .filter(|(loader, _)| *loader == id)
            .map(|(_, event)| event.clone())
            .collect()
    }

    #[test]
    fn test_dependencies_registered_before_dependents() {
        let schemas = registry(vec![
            ("A", json!({ "properties": { "b": { "$ref": "{B}" } } })),
            ("B", json!({ "properties": { "c": { "$ref": "{C}" } } })),
            ("C", json!({ "type": "string" })),
        ]);
        let recording = Recording::default();
        let compiled = compile_all(&schemas, &recording).unwrap();
        assert_eq!(compiled.len(), 3);

        // Targets are compiled in name order with one loader each
        assert_eq!(
            events_for(&recording, 1),
            vec![
                "add registry://schemas/C",
                "add registry://schemas/B",
                "compile registry://schemas/A",
            ]
        );
        assert_eq!(
            events_for(&recording, 2),
            vec!["add registry://schemas/C", "compile registry://schemas/B"]
        );
        assert_eq!(events_for(&recording, 3), vec!["compile registry://schemas/C"]);
    }

    #[test]
    fn test_cycles_register_each_member_once() {
        let schemas = registry(vec![
            ("A", json!({ "properties": { "b": { "$ref": "{B}" }, "self": { "$ref": "{A}" } } })),
            ("B", json!({ "properties": { "a": { "$ref": "{A}" }, "c": { "$ref": "{C}" } } })),
            ("C", json!({ "items": { "$ref": "{B}" } })),
        ]);
        let recording = Recording::default();
        compile_all(&schemas, &recording).unwrap();

        assert_eq!(
            events_for(&recording, 1),
            vec![
                "add registry://schemas/C",
                "add registry://schemas/B",
                "compile registry://schemas/A",
            ]
        );
        assert_eq!(
            events_for(&recording, 3),
            vec![
                "add registry://schemas/A",
                "add registry://schemas/B",
                "compile registry://schemas/C",
            ]
        );
    }

    #[test]
    fn test_shared_dependency_registered_once() {
        let schemas = registry(vec![
            ("Root", json!({ "properties": { "l": { "$ref": "{Left}" }, "r": { "$ref": "{Right}" } } })),
            ("Left", json!({ "$ref": "{Leaf}" })),
            ("Right", json!({ "$ref": "{Leaf}" })),
            ("Leaf", json!({ "type": "integer" })),
        ]);
        let recording = Recording::default();
        compile_all(&schemas, &recording).unwrap();

        // Name order: Leaf, Left, Right, Root
        assert_eq!(
            events_for(&recording, 4),
            vec![
                "add registry://schemas/Leaf",
                "add registry://schemas/Left",
                "add registry://schemas/Right",
                "compile registry://schemas/Root",
            ]
        );
    }

    #[test]
    fn test_engine_failure_names_schema() {
        let schemas = registry(vec![
            ("Good", json!({ "type": "string" })),
            ("Broken", json!({ "fail": true })),
        ]);
        let Err(err) = compile_all(&schemas, &Recording::default()) else {
            panic!("Expected compilation to fail");
        };
        match err {
            SchemaError::Compilation { name, message } => {
                assert_eq!(name, "Broken");
                assert_eq!(message, "rejected");
            }
            other => panic!("Expected Compilation, got {:?}", other),
        }
    }

    #[test]
    fn test_rewrites_symbolic_references_to_locators() {
        let schemas = registry(vec![("A", json!({ "items": { "$ref": "{B}" }, "x": { "$ref": "#/items" } }))]);
        let body = resolved_body(&schemas["A"]).unwrap();
        assert_eq!(body["items"]["$ref"], json!("registry://schemas/B"));
        assert_eq!(body["x"]["$ref"], json!("#/items"));
    }
}
