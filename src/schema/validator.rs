use std::fmt;

use jsonschema::Draft;
use serde_json::{json, Value};
use thiserror::Error;

use crate::parser::{component_schema_name, Document, SchemaId};

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("the selected schema is empty")]
    NilSchema,

    #[error("unable to resolve schema {0:?}")]
    UnresolvableSchema(String),

    #[error("schema could not be compiled: {0}")]
    InvalidSchema(String),

    #[error("{0}")]
    Violations(Violations),
}

pub type Result<T> = std::result::Result<T, ValidationError>;

/// A single constraint violation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// JSON Pointer to the offending value in the instance
    pub instance_path: String,

    pub message: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.instance_path.is_empty() {
            write!(f, "  (root): {}", self.message)
        } else {
            write!(f, "  {}: {}", self.instance_path, self.message)
        }
    }
}

/// Every violation found in one validation pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violations(Vec<Violation>);

impl Violations {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Violation> {
        self.0.iter()
    }
}

impl fmt::Display for Violations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, violation) in self.0.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", violation)?;
        }
        Ok(())
    }
}

/// Turn a schema handle into a concrete schema body.
///
/// Inline values are used as they are; a bare `#/components/schemas/<name>`
/// pointer is looked up in the document and must land on an inline value.
pub fn resolve_schema(doc: &Document, id: SchemaId) -> Result<&Value> {
    let schema = doc.schema(id);
    if let Some(value) = &schema.value {
        return Ok(value);
    }
    let reference = schema.reference.as_deref().ok_or(ValidationError::NilSchema)?;

    component_schema_name(reference)
        .and_then(|name| doc.schema_id(&name))
        .and_then(|target| doc.schema(target).value.as_ref())
        .ok_or_else(|| ValidationError::UnresolvableSchema(reference.to_string()))
}

/// Validate `instance` against the selected schema, collecting every violation
pub fn validate_instance(doc: &Document, id: SchemaId, instance: &Value) -> Result<()> {
    let schema = resolve_schema(doc, id)?;
    let root = root_schema(doc, schema);

    let validator = jsonschema::options()
        .with_draft(draft_for(&doc.version))
        .should_validate_formats(true)
        .build(&root)
        .map_err(|err| ValidationError::InvalidSchema(err.to_string()))?;

    let violations: Vec<Violation> = validator
        .iter_errors(instance)
        .map(|err| Violation {
            instance_path: err.instance_path.to_string(),
            message: err.to_string(),
        })
        .collect();

    tracing::debug!(count = violations.len(), "validation finished");
    if violations.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::Violations(Violations(violations)))
    }
}

/// OpenAPI 3.1 schemas are JSON Schema 2020-12; 3.0 schemas are a Draft 4 dialect
fn draft_for(version: &str) -> Draft {
    if version.starts_with("3.1") {
        Draft::Draft202012
    } else {
        Draft::Draft4
    }
}

/// The schema to compile: the selected body with `components.schemas` attached,
/// so pointers nested inside it resolve against the document
fn root_schema(doc: &Document, schema: &Value) -> Value {
    let mut root = schema.clone();
    let mut components = doc.component_schemas_value();
    if !doc.version.starts_with("3.1") {
        rewrite_nullable(&mut root);
        rewrite_nullable(&mut components);
    }
    if let Value::Object(map) = &mut root {
        map.insert(
            "components".to_string(),
            json!({ "schemas": components }),
        );
    }
    root
}

/// `nullable: true` (OpenAPI 3.0) becomes a `null` member of the type and of any enum.
/// Without a single `type`, the schema is wrapped as `anyOf: [null, schema]`.
fn rewrite_nullable(value: &mut Value) {
    let wrapped = match value {
        Value::Object(map) => {
            for child in map.values_mut() {
                rewrite_nullable(child);
            }
            if map.get("nullable") != Some(&Value::Bool(true)) {
                return;
            }
            match map.get("type").and_then(Value::as_str).map(str::to_string) {
                Some(ty) => {
                    map.insert("type".to_string(), json!([ty, "null"]));
                    if let Some(Value::Array(values)) = map.get_mut("enum") {
                        if !values.contains(&Value::Null) {
                            values.push(Value::Null);
                        }
                    }
                    None
                }
                None => {
                    map.remove("nullable");
                    let inner = Value::Object(std::mem::take(map));
                    Some(json!({ "anyOf": [{ "type": "null" }, inner] }))
                }
            }
        }
        Value::Array(items) => {
            for item in items {
                rewrite_nullable(item);
            }
            None
        }
        _ => None,
    };
    if let Some(wrapped) = wrapped {
        *value = wrapped;
    }
}
