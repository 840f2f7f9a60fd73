//! Body schema validation.
//!
//! The dispatch core only sees the [`SchemaValidator`] capability. The default
//! engine compiles Swagger 2.0 schemas with the `jsonschema` crate.

use std::sync::Arc;

use dashmap::DashMap;
use jsonschema::Validator;
use serde_json::{json, Map, Value};

use crate::validation::outcome::Violation;

/// Checks a parsed body against a schema node of the contract.
pub trait SchemaValidator: Send + Sync {
    /// `root` is the whole contract document, used to resolve `$ref`s.
    /// Returns every violation found; empty means the value conforms.
    fn validate(&self, schema: &Value, root: &Value, value: &Value) -> Vec<Violation>;
}

/// Draft 4 JSON Schema engine (the dialect Swagger 2.0 builds on).
///
/// Compiled validators are cached by schema text, and so are compile
/// failures. One engine serves one contract document, so the shared
/// definitions never change under a key.
#[derive(Default)]
pub struct JsonSchemaEngine {
    compiled: DashMap<String, Result<Arc<Validator>, String>>,
}

impl JsonSchemaEngine {
    pub fn new() -> Self {
        Self::default()
    }

    fn compiled(&self, schema: &Value, root: &Value) -> Result<Arc<Validator>, String> {
        let key = schema.to_string();
        if let Some(entry) = self.compiled.get(&key) {
            return entry.value().clone();
        }

        let wrapped = with_definitions(schema, root);
        let result = jsonschema::draft4::new(&wrapped)
            .map(Arc::new)
            .map_err(|e| e.to_string());
        if let Err(e) = &result {
            // Logged once per schema; later hits come from the cache.
            tracing::warn!(error = %e, "Failed to compile response schema");
        }

        self.compiled.entry(key).or_insert(result).value().clone()
    }

    /// Number of cached schemas, failed ones included.
    pub fn cached(&self) -> usize {
        self.compiled.len()
    }
}

impl SchemaValidator for JsonSchemaEngine {
    fn validate(&self, schema: &Value, root: &Value, value: &Value) -> Vec<Violation> {
        let validator = match self.compiled(schema, root) {
            Ok(validator) => validator,
            Err(e) => return vec![Violation::body("", format!("failed to compile schema: {}", e))],
        };

        validator
            .iter_errors(value)
            .map(|e| Violation::body(&e.instance_path.to_string(), e.to_string()))
            .collect()
    }
}

/// Put the schema under a root that also carries the document's definitions,
/// so `#/definitions/...` pointers resolve, and normalise Swagger extensions.
fn with_definitions(schema: &Value, root: &Value) -> Value {
    let mut wrapped = Map::new();
    wrapped.insert("allOf".to_string(), json!([schema]));
    if let Some(definitions) = root.get("definitions") {
        wrapped.insert("definitions".to_string(), definitions.clone());
    }

    let mut wrapped = Value::Object(wrapped);
    normalize_nullable(&mut wrapped);
    wrapped
}

/// Rewrite `x-nullable: true` schemas as `anyOf [schema, {type: null}]`.
fn normalize_nullable(schema: &mut Value) {
    match schema {
        Value::Object(map) => {
            for child in map.values_mut() {
                normalize_nullable(child);
            }

            let nullable = map
                .remove("x-nullable")
                .and_then(|v| v.as_bool())
                .unwrap_or(false);
            if nullable {
                let inner = Value::Object(std::mem::take(map));
                map.insert("anyOf".to_string(), json!([inner, { "type": "null" }]));
            }
        }
        Value::Array(items) => items.iter_mut().for_each(normalize_nullable),
        _ => {}
    }
}
