// This file contains the implementation of the parser module, responsible for reading the data file and the OpenAPI document.

pub mod spec;

pub use spec::{
    component_schema_name,
    parse_openapi_file,
    parse_openapi_string,
    Document,
    HttpMethod,
    MediaType,
    Operation,
    ParserError,
    PathItem,
    RequestBody,
    Result,
    SchemaId,
    SchemaRef,
    SpecFormat,
};

use serde_json::Value;
use std::fs;
use std::path::Path;

/// Read a file and parse it as an arbitrary JSON document
pub fn load_json<P: AsRef<Path>>(path: P) -> Result<Value> {
    let contents = fs::read_to_string(path)?;
    let value: Value = serde_json::from_str(&contents)?;
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    #[test]
    fn test_load_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"name": "x", "tags": [1, 2]}}"#).unwrap();

        let value = load_json(file.path()).unwrap();
        assert_eq!(value, json!({"name": "x", "tags": [1, 2]}));
    }

    #[test]
    fn test_load_json_rejects_garbage() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{not json").unwrap();

        assert!(matches!(load_json(file.path()), Err(ParserError::JsonError(_))));
    }

    #[test]
    fn test_load_json_missing_file() {
        let result = load_json("definitely/not/here.json");
        assert!(matches!(result, Err(ParserError::IoError(_))));
    }
}
