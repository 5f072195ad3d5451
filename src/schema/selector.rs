use std::collections::HashSet;

use crate::parser::{Document, HttpMethod, Operation, SchemaId};
use thiserror::Error;

/// The only request body media type considered when picking a schema
pub const JSON_MEDIA_TYPE: &str = "application/json";

/// Conventional component names tried, in this order, when nothing else decides
pub const PREFERRED_SCHEMA_NAMES: [&str; 2] = ["instancedescriptor", "body"];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SelectionError {
    #[error("schema {0:?} not found in components.schemas")]
    SchemaNotFound(String),

    #[error("no application/json requestBody for {method} {path}")]
    NoRequestBodySchema { method: String, path: String },

    #[error("unable to determine which schema to use")]
    AmbiguousOrMissingSchema,
}

pub type Result<T> = std::result::Result<T, SelectionError>;

/// Resolve the user's selectors to exactly one schema of the document.
///
/// An explicit schema name wins, then an explicit path and method. Without
/// either, a request body schema shared by every JSON operation is used, then a
/// component with a conventional name, then any component with a body.
/// Empty strings count as absent.
pub fn select_schema(
    doc: &Document,
    schema_name: Option<&str>,
    path: Option<&str>,
    method: Option<&str>,
) -> Result<SchemaId> {
    let schema_name = schema_name.filter(|name| !name.is_empty());
    let path = path.filter(|path| !path.is_empty());
    let method = method.filter(|method| !method.is_empty());

    if let Some(name) = schema_name {
        return find_by_name(doc, name)
            .ok_or_else(|| SelectionError::SchemaNotFound(name.to_string()));
    }

    match (path, method) {
        (None, None) => {}
        (path, method) => {
            let path = path.unwrap_or_default();
            let method = method.unwrap_or_default();
            return find_by_endpoint(doc, path, method).ok_or_else(|| {
                SelectionError::NoRequestBodySchema {
                    method: method.to_uppercase(),
                    path: path.to_string(),
                }
            });
        }
    }

    unique_request_body_schema(doc)
        .or_else(|| fallback_schema(doc))
        .ok_or(SelectionError::AmbiguousOrMissingSchema)
}

/// Exact key first, then the first key equal ignoring case
fn find_by_name(doc: &Document, name: &str) -> Option<SchemaId> {
    doc.schema_id(name).or_else(|| {
        let wanted = name.to_lowercase();
        doc.schemas()
            .find(|(candidate, _)| candidate.to_lowercase() == wanted)
            .map(|(_, id)| id)
    })
}

/// The JSON request body schema of one operation. The path must match a
/// declared path exactly; templates are not expanded.
fn find_by_endpoint(doc: &Document, path: &str, method: &str) -> Option<SchemaId> {
    let method = HttpMethod::parse(method)?;
    let operation = doc.path_item(path)?.operation(method)?;
    json_body_schema(operation)
}

fn json_body_schema(operation: &Operation) -> Option<SchemaId> {
    operation
        .request_body
        .as_ref()?
        .content
        .get(JSON_MEDIA_TYPE)
        .map(|media| media.schema)
}

/// The JSON request body schema, if every operation that declares one uses the same schema object
fn unique_request_body_schema(doc: &Document) -> Option<SchemaId> {
    let mut found = HashSet::new();
    let mut picked = None;

    for (_, item) in doc.paths() {
        for (_, operation) in item.operations() {
            let schema = match json_body_schema(operation) {
                Some(schema) if !doc.schema(schema).is_nil() => schema,
                _ => continue,
            };
            if found.insert(schema) {
                picked = Some(schema);
            }
        }
    }

    if found.len() == 1 {
        picked
    } else {
        None
    }
}

// TODO: report "several request body schemas" separately from "none found" once the error can carry the candidates
fn fallback_schema(doc: &Document) -> Option<SchemaId> {
    PREFERRED_SCHEMA_NAMES
        .iter()
        .find_map(|preferred| {
            doc.schemas()
                .find(|(name, id)| {
                    name.to_lowercase() == *preferred && doc.schema(*id).value.is_some()
                })
                .map(|(_, id)| id)
        })
        .or_else(|| {
            doc.schemas()
                .find(|(_, id)| doc.schema(*id).value.is_some())
                .map(|(_, id)| id)
        })
}
