// src/parser/spec.rs

use indexmap::IndexMap;
use openapi::{OpenAPI, ReferenceOr};
use serde_json::{Error as JsonError, Value};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Prefix of an internal pointer into `components.schemas`
pub const COMPONENT_SCHEMA_PREFIX: &str = "#/components/schemas/";

/// Prefix of an internal pointer into `components.requestBodies`
pub const COMPONENT_REQUEST_BODY_PREFIX: &str = "#/components/requestBodies/";

#[derive(Debug, Error)]
pub enum ParserError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("invalid JSON: {0}")]
    JsonError(#[from] JsonError),

    #[error("invalid YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Unsupported OpenAPI version: {0}")]
    UnsupportedVersion(String),

    #[error("Invalid OpenAPI specification: {0}")]
    InvalidSpec(String),
}

pub type Result<T> = std::result::Result<T, ParserError>;

/// Source syntax of a specification file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecFormat {
    Json,
    Yaml,
}

impl SpecFormat {
    /// `.json` files are read as JSON, everything else goes through the YAML reader
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => SpecFormat::Json,
            _ => SpecFormat::Yaml,
        }
    }
}

/// The HTTP verbs an OpenAPI path item can hold an operation for.
///
/// Variant order is the canonical listing order used in diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Options,
    Head,
    Trace,
}

impl HttpMethod {
    pub const ALL: [HttpMethod; 8] = [
        HttpMethod::Get,
        HttpMethod::Post,
        HttpMethod::Put,
        HttpMethod::Patch,
        HttpMethod::Delete,
        HttpMethod::Options,
        HttpMethod::Head,
        HttpMethod::Trace,
    ];

    /// Case-insensitive lookup; any verb outside the eight known ones yields `None`
    pub fn parse(method: &str) -> Option<Self> {
        match method.to_ascii_uppercase().as_str() {
            "GET" => Some(HttpMethod::Get),
            "POST" => Some(HttpMethod::Post),
            "PUT" => Some(HttpMethod::Put),
            "PATCH" => Some(HttpMethod::Patch),
            "DELETE" => Some(HttpMethod::Delete),
            "OPTIONS" => Some(HttpMethod::Options),
            "HEAD" => Some(HttpMethod::Head),
            "TRACE" => Some(HttpMethod::Trace),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Options => "OPTIONS",
            HttpMethod::Head => "HEAD",
            HttpMethod::Trace => "TRACE",
        }
    }

    fn operation_of(self, item: &openapi::PathItem) -> Option<&openapi::Operation> {
        match self {
            HttpMethod::Get => item.get.as_ref(),
            HttpMethod::Post => item.post.as_ref(),
            HttpMethod::Put => item.put.as_ref(),
            HttpMethod::Patch => item.patch.as_ref(),
            HttpMethod::Delete => item.delete.as_ref(),
            HttpMethod::Options => item.options.as_ref(),
            HttpMethod::Head => item.head.as_ref(),
            HttpMethod::Trace => item.trace.as_ref(),
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Handle to a schema reference held in the document arena.
///
/// Two handles are equal exactly when they name the same schema object, which
/// is how repeated uses of one component are told apart from look-alike copies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SchemaId(usize);

/// A schema as it appears at one place in the document: an inline value,
/// a named pointer, or both once the pointer has been resolved.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchemaRef {
    /// The `$ref` string, if the schema was written as a pointer
    pub reference: Option<String>,

    /// The schema body, if known
    pub value: Option<Value>,
}

impl SchemaRef {
    fn inline(value: Value) -> Self {
        SchemaRef {
            reference: None,
            value: Some(value),
        }
    }

    fn pointer(reference: &str) -> Self {
        SchemaRef {
            reference: Some(reference.to_string()),
            value: None,
        }
    }

    /// A media type entry declared without any schema
    pub fn is_nil(&self) -> bool {
        self.reference.is_none() && self.value.is_none()
    }
}

#[derive(Debug, Clone)]
pub struct MediaType {
    /// Always present; an entry declared without a schema points at a nil node
    pub schema: SchemaId,
}

#[derive(Debug, Clone, Default)]
pub struct RequestBody {
    /// Media types keyed by their content-type string, in declaration order
    pub content: IndexMap<String, MediaType>,
}

#[derive(Debug, Clone, Default)]
pub struct Operation {
    pub request_body: Option<RequestBody>,
}

#[derive(Debug, Clone, Default)]
pub struct PathItem {
    operations: BTreeMap<HttpMethod, Operation>,
}

impl PathItem {
    pub fn operation(&self, method: HttpMethod) -> Option<&Operation> {
        self.operations.get(&method)
    }

    /// Declared operations in canonical verb order
    pub fn operations(&self) -> impl Iterator<Item = (HttpMethod, &Operation)> {
        self.operations.iter().map(|(method, op)| (*method, op))
    }

    pub fn methods(&self) -> Vec<HttpMethod> {
        self.operations.keys().copied().collect()
    }
}

/// A parsed and structurally checked OpenAPI 3.x document.
///
/// Schema references are owned by an arena and handed out as [`SchemaId`]s.
/// Component schemas and paths keep the order they were declared in.
#[derive(Debug, Clone)]
pub struct Document {
    /// The `openapi` version string
    pub version: String,
    arena: Vec<SchemaRef>,
    schemas: IndexMap<String, SchemaId>,
    paths: IndexMap<String, PathItem>,
}

impl Document {
    pub fn schema(&self, id: SchemaId) -> &SchemaRef {
        &self.arena[id.0]
    }

    /// Exact lookup in `components.schemas`
    pub fn schema_id(&self, name: &str) -> Option<SchemaId> {
        self.schemas.get(name).copied()
    }

    /// Component schemas in declaration order
    pub fn schemas(&self) -> impl Iterator<Item = (&str, SchemaId)> {
        self.schemas.iter().map(|(name, id)| (name.as_str(), *id))
    }

    /// Name of the component schema that is this exact schema object, if any
    pub fn schema_name_of(&self, id: SchemaId) -> Option<&str> {
        self.schemas()
            .find(|(_, candidate)| *candidate == id)
            .map(|(name, _)| name)
    }

    pub fn path_item(&self, path: &str) -> Option<&PathItem> {
        self.paths.get(path)
    }

    /// Paths in declaration order
    pub fn paths(&self) -> impl Iterator<Item = (&str, &PathItem)> {
        self.paths.iter().map(|(path, item)| (path.as_str(), item))
    }

    /// `components.schemas` as a JSON object, for resolving `$ref`s nested in schema bodies.
    /// Components without a known body are left out.
    pub fn component_schemas_value(&self) -> Value {
        let map = self
            .schemas
            .iter()
            .filter_map(|(name, id)| {
                let value = self.schema(*id).value.clone()?;
                Some((name.clone(), value))
            })
            .collect();
        Value::Object(map)
    }
}

/// Extracts `<name>` from `#/components/schemas/<name>`, undoing JSON pointer escapes
pub fn component_schema_name(reference: &str) -> Option<String> {
    pointer_name(reference, COMPONENT_SCHEMA_PREFIX)
}

fn pointer_name(reference: &str, prefix: &str) -> Option<String> {
    let name = reference.strip_prefix(prefix)?;
    if name.is_empty() || name.contains('/') {
        return None;
    }
    Some(name.replace("~1", "/").replace("~0", "~"))
}

/// Parse an OpenAPI specification from a file, picking the syntax by extension
pub fn parse_openapi_file<P: AsRef<Path>>(path: P) -> Result<Document> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)?;

    parse_openapi_string(&content, SpecFormat::from_path(path))
}

/// Parse an OpenAPI specification from a string
pub fn parse_openapi_string(content: &str, format: SpecFormat) -> Result<Document> {
    let raw: Value = match format {
        SpecFormat::Json => serde_json::from_str(content)?,
        SpecFormat::Yaml => {
            let yaml: serde_yaml::Value = serde_yaml::from_str(content)?;
            yaml_to_json_value(&yaml).map_err(ParserError::InvalidSpec)?
        }
    };

    let version = match (raw.get("openapi"), raw.get("swagger")) {
        (Some(Value::String(v)), _) => v.as_str(),
        (None, Some(Value::String(v))) => return Err(ParserError::UnsupportedVersion(v.clone())),
        _ => return Err(ParserError::InvalidSpec("missing `openapi` version field".into())),
    };
    if !version.starts_with("3.") {
        return Err(ParserError::UnsupportedVersion(version.to_string()));
    }

    // The typed model quietly drops path keys it does not recognise
    if let Some(paths) = raw.get("paths").and_then(Value::as_object) {
        if let Some(path) = paths
            .keys()
            .find(|key| !key.starts_with('/') && !key.starts_with("x-"))
        {
            return Err(ParserError::InvalidSpec(format!(
                "path {:?} must begin with '/'",
                path
            )));
        }
    }

    let api: OpenAPI = serde_json::from_value(raw.clone())
        .map_err(|err| ParserError::InvalidSpec(err.to_string()))?;

    DocumentBuilder::new(&raw, &api).build()
}

/// Walk a chain of object keys through a raw JSON tree
fn lookup<'a>(raw: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().try_fold(raw, |node, key| node.get(*key))
}

/// Where a request body was declared, so inline schemas can be read back verbatim
enum BodyLocation<'a> {
    Operation {
        path: &'a str,
        method: HttpMethod,
    },
    Component(String),
}

struct DocumentBuilder<'a> {
    raw: &'a Value,
    api: &'a OpenAPI,
    arena: Vec<SchemaRef>,
    schemas: IndexMap<String, SchemaId>,
}

impl<'a> DocumentBuilder<'a> {
    fn new(raw: &'a Value, api: &'a OpenAPI) -> Self {
        DocumentBuilder {
            raw,
            api,
            arena: Vec::new(),
            schemas: IndexMap::new(),
        }
    }

    fn alloc(&mut self, schema: SchemaRef) -> SchemaId {
        self.arena.push(schema);
        SchemaId(self.arena.len() - 1)
    }

    fn build(mut self) -> Result<Document> {
        let api = self.api;
        if let Some(components) = &api.components {
            for (name, schema) in &components.schemas {
                let node = match schema {
                    ReferenceOr::Reference { reference } => SchemaRef::pointer(reference),
                    ReferenceOr::Item(item) => {
                        let keys = ["components", "schemas", name.as_str()];
                        SchemaRef::inline(self.raw_or_serialized(&keys, item)?)
                    }
                };
                let id = self.alloc(node);
                self.schemas.insert(name.clone(), id);
            }
        }
        self.resolve_component_aliases();

        let mut paths = IndexMap::new();
        for (path, item) in &api.paths.paths {
            let item = match item {
                ReferenceOr::Item(item) => item,
                // Path items living in other files are not followed
                ReferenceOr::Reference { .. } => continue,
            };

            let mut path_item = PathItem::default();
            for method in HttpMethod::ALL {
                if let Some(op) = method.operation_of(item) {
                    let request_body = match &op.request_body {
                        Some(body) => {
                            let location = BodyLocation::Operation {
                                path: path.as_str(),
                                method,
                            };
                            self.request_body(body, location)?
                        }
                        None => None,
                    };
                    path_item
                        .operations
                        .insert(method, Operation { request_body });
                }
            }
            paths.insert(path.clone(), path_item);
        }

        Ok(Document {
            version: api.openapi.clone(),
            arena: self.arena,
            schemas: self.schemas,
            paths,
        })
    }

    /// Component aliases (`Alias: {$ref: '#/components/schemas/Target'}`) take the
    /// value of the component they point at; cycles and dangling pointers stay unresolved.
    fn resolve_component_aliases(&mut self) {
        let ids: Vec<SchemaId> = self.schemas.values().copied().collect();
        for id in ids {
            let mut seen = HashSet::new();
            let mut current = id;
            let resolved = loop {
                if !seen.insert(current) {
                    break None;
                }
                let node = &self.arena[current.0];
                if let Some(value) = &node.value {
                    break Some(value.clone());
                }
                let next = node
                    .reference
                    .as_deref()
                    .and_then(component_schema_name)
                    .and_then(|name| self.schemas.get(&name).copied());
                match next {
                    Some(next) => current = next,
                    None => break None,
                }
            };
            if let Some(value) = resolved {
                self.arena[id.0].value = Some(value);
            }
        }
    }

    fn request_body(
        &mut self,
        body: &ReferenceOr<openapi::RequestBody>,
        location: BodyLocation<'_>,
    ) -> Result<Option<RequestBody>> {
        let api = self.api;
        let (body, location) = match body {
            ReferenceOr::Item(body) => (body, location),
            ReferenceOr::Reference { reference } => {
                let name = match pointer_name(reference, COMPONENT_REQUEST_BODY_PREFIX) {
                    Some(name) => name,
                    None => return Ok(None),
                };
                let target = api
                    .components
                    .as_ref()
                    .and_then(|components| components.request_bodies.get(&name));
                match target {
                    Some(ReferenceOr::Item(body)) => (body, BodyLocation::Component(name)),
                    _ => return Ok(None),
                }
            }
        };

        let mut content = IndexMap::new();
        for (media, media_type) in &body.content {
            let schema = match &media_type.schema {
                None => self.alloc(SchemaRef::default()),
                Some(ReferenceOr::Reference { reference }) => {
                    let component = component_schema_name(reference)
                        .and_then(|name| self.schemas.get(&name).copied());
                    match component {
                        Some(id) => id,
                        None => self.alloc(SchemaRef::pointer(reference)),
                    }
                }
                Some(ReferenceOr::Item(schema)) => {
                    let value = match &location {
                        BodyLocation::Operation { path, method } => {
                            let verb = method.as_str().to_ascii_lowercase();
                            let keys = [
                                "paths",
                                *path,
                                verb.as_str(),
                                "requestBody",
                                "content",
                                media.as_str(),
                                "schema",
                            ];
                            self.raw_or_serialized(&keys, schema)?
                        }
                        BodyLocation::Component(name) => {
                            let keys = [
                                "components",
                                "requestBodies",
                                name.as_str(),
                                "content",
                                media.as_str(),
                                "schema",
                            ];
                            self.raw_or_serialized(&keys, schema)?
                        }
                    };
                    self.alloc(SchemaRef::inline(value))
                }
            };
            content.insert(media.clone(), MediaType { schema });
        }

        Ok(Some(RequestBody { content }))
    }

    /// Schema bodies are taken verbatim from the source tree so that keywords the
    /// typed model does not know about survive; the typed schema is the fallback.
    fn raw_or_serialized(&self, keys: &[&str], schema: &openapi::Schema) -> Result<Value> {
        match lookup(self.raw, keys) {
            Some(value) => Ok(value.clone()),
            None => serde_json::to_value(schema)
                .map_err(|err| ParserError::InvalidSpec(err.to_string())),
        }
    }
}

/// Convert a `serde_yaml::Value` to a `serde_json::Value`.
///
/// Non-string mapping keys (such as unquoted `200:` response codes) become strings.
fn yaml_to_json_value(yaml: &serde_yaml::Value) -> std::result::Result<Value, String> {
    match yaml {
        serde_yaml::Value::Null => Ok(Value::Null),
        serde_yaml::Value::Bool(b) => Ok(Value::Bool(*b)),
        serde_yaml::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(Value::Number(serde_json::Number::from(i)))
            } else if let Some(u) = n.as_u64() {
                Ok(Value::Number(serde_json::Number::from(u)))
            } else if let Some(f) = n.as_f64() {
                serde_json::Number::from_f64(f)
                    .map(Value::Number)
                    .ok_or_else(|| format!("cannot represent float {} in JSON", f))
            } else {
                Err(format!("unsupported YAML number: {:?}", n))
            }
        }
        serde_yaml::Value::String(s) => Ok(Value::String(s.clone())),
        serde_yaml::Value::Sequence(seq) => seq
            .iter()
            .map(yaml_to_json_value)
            .collect::<std::result::Result<Vec<_>, _>>()
            .map(Value::Array),
        serde_yaml::Value::Mapping(map) => {
            let mut json_map = serde_json::Map::new();
            for (k, v) in map {
                let key = match k {
                    serde_yaml::Value::String(s) => s.clone(),
                    serde_yaml::Value::Number(n) => n.to_string(),
                    serde_yaml::Value::Bool(b) => b.to_string(),
                    other => return Err(format!("unsupported YAML map key: {:?}", other)),
                };
                json_map.insert(key, yaml_to_json_value(v)?);
            }
            Ok(Value::Object(json_map))
        }
        serde_yaml::Value::Tagged(tagged) => yaml_to_json_value(&tagged.value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const PETSTORE: &str = r#"
openapi: 3.0.3
info:
  title: Pets
  version: "1.0"
paths:
  /pets:
    get:
      responses:
        200:
          description: list
    post:
      requestBody:
        content:
          application/json:
            schema:
              $ref: '#/components/schemas/Pet'
      responses:
        201:
          description: created
  /pets/{id}:
    put:
      requestBody:
        $ref: '#/components/requestBodies/PetUpdate'
      responses:
        200:
          description: updated
    patch:
      requestBody:
        content:
          application/json: {}
      responses:
        200:
          description: patched
components:
  schemas:
    Pet:
      type: object
      required: [name]
      properties:
        name:
          type: string
    PetAlias:
      $ref: '#/components/schemas/Pet'
  requestBodies:
    PetUpdate:
      content:
        application/json:
          schema:
            type: object
            properties:
              tag:
                type: string
"#;

    fn petstore() -> Document {
        parse_openapi_string(PETSTORE, SpecFormat::Yaml).unwrap()
    }

    fn json_schema(doc: &Document, path: &str, method: HttpMethod) -> SchemaId {
        doc.path_item(path)
            .and_then(|item| item.operation(method))
            .and_then(|op| op.request_body.as_ref())
            .and_then(|body| body.content.get("application/json"))
            .map(|media| media.schema)
            .unwrap()
    }

    #[test]
    fn test_component_ref_shares_identity() {
        let doc = petstore();
        let pet = doc.schema_id("Pet").unwrap();

        assert_eq!(json_schema(&doc, "/pets", HttpMethod::Post), pet);
        assert_eq!(doc.schema_name_of(pet), Some("Pet"));
    }

    #[test]
    fn test_alias_takes_target_value() {
        let doc = petstore();
        let alias = doc.schema(doc.schema_id("PetAlias").unwrap());

        assert_eq!(alias.reference.as_deref(), Some("#/components/schemas/Pet"));
        assert_eq!(alias.value, doc.schema(doc.schema_id("Pet").unwrap()).value);
    }

    #[test]
    fn test_request_body_ref_is_followed() {
        let doc = petstore();
        let id = json_schema(&doc, "/pets/{id}", HttpMethod::Put);
        let value = doc.schema(id).value.clone().unwrap();

        assert_eq!(value["properties"]["tag"], json!({"type": "string"}));
        assert_eq!(doc.schema_name_of(id), None);
    }

    #[test]
    fn test_media_type_without_schema_is_nil() {
        let doc = petstore();
        let id = json_schema(&doc, "/pets/{id}", HttpMethod::Patch);

        assert!(doc.schema(id).is_nil());
    }

    #[test]
    fn test_methods_in_canonical_order() {
        let doc = petstore();
        let paths: Vec<&str> = doc.paths().map(|(path, _)| path).collect();

        assert_eq!(paths, vec!["/pets", "/pets/{id}"]);
        assert_eq!(
            doc.path_item("/pets/{id}").unwrap().methods(),
            vec![HttpMethod::Put, HttpMethod::Patch]
        );
    }

    #[test]
    fn test_components_keep_declaration_order() {
        let yaml = "openapi: 3.0.3\ninfo: {title: t, version: '1'}\npaths: {}\ncomponents:\n  schemas:\n    Zeta: {type: string}\n    Mid: {type: integer}\n    Alpha: {type: object}\n";
        let json = r#"{"openapi": "3.0.3", "info": {"title": "t", "version": "1"}, "paths": {},
            "components": {"schemas": {"Zeta": {"type": "string"}, "Mid": {"type": "integer"}, "Alpha": {"type": "object"}}}}"#;

        for doc in [
            parse_openapi_string(yaml, SpecFormat::Yaml).unwrap(),
            parse_openapi_string(json, SpecFormat::Json).unwrap(),
        ] {
            let names: Vec<&str> = doc.schemas().map(|(name, _)| name).collect();
            assert_eq!(names, vec!["Zeta", "Mid", "Alpha"]);
        }
    }

    #[test]
    fn test_json_syntax() {
        let spec = json!({
            "openapi": "3.0.0",
            "info": {"title": "t", "version": "1"},
            "paths": {},
            "components": {"schemas": {"Body": {"type": "object"}}}
        });
        let doc = parse_openapi_string(&spec.to_string(), SpecFormat::Json).unwrap();

        assert_eq!(doc.version, "3.0.0");
        assert_eq!(doc.schemas().count(), 1);
    }

    #[test]
    fn test_rejects_swagger_2() {
        let spec = r#"{"swagger": "2.0", "info": {}, "paths": {}}"#;
        let result = parse_openapi_string(spec, SpecFormat::Json);

        assert!(matches!(result, Err(ParserError::UnsupportedVersion(v)) if v == "2.0"));
    }

    #[test]
    fn test_rejects_missing_version() {
        let result = parse_openapi_string("info: {}\npaths: {}\n", SpecFormat::Yaml);

        assert!(matches!(result, Err(ParserError::InvalidSpec(_))));
    }

    #[test]
    fn test_rejects_relative_path() {
        let spec = "openapi: 3.0.0\ninfo: {title: t, version: '1'}\npaths:\n  items: {}\n";
        let result = parse_openapi_string(spec, SpecFormat::Yaml);

        assert!(matches!(result, Err(ParserError::InvalidSpec(msg)) if msg.contains("items")));
    }

    #[test]
    fn test_rejects_malformed_yaml() {
        let result = parse_openapi_string("openapi: [3.0", SpecFormat::Yaml);

        assert!(matches!(result, Err(ParserError::YamlError(_))));
    }

    #[test]
    fn test_component_schema_name() {
        assert_eq!(
            component_schema_name("#/components/schemas/Body").as_deref(),
            Some("Body")
        );
        assert_eq!(
            component_schema_name("#/components/schemas/a~1b~0c").as_deref(),
            Some("a/b~c")
        );
        assert_eq!(component_schema_name("other.yaml#/Body"), None);
        assert_eq!(component_schema_name("#/components/schemas/"), None);
    }

    #[test]
    fn test_http_method_parse() {
        assert_eq!(HttpMethod::parse("post"), Some(HttpMethod::Post));
        assert_eq!(HttpMethod::parse("Trace"), Some(HttpMethod::Trace));
        assert_eq!(HttpMethod::parse("CONNECT"), None);
        assert_eq!(HttpMethod::Delete.to_string(), "DELETE");
    }

    #[test]
    fn test_spec_format_from_path() {
        assert_eq!(SpecFormat::from_path(Path::new("api.JSON")), SpecFormat::Json);
        assert_eq!(SpecFormat::from_path(Path::new("api.yml")), SpecFormat::Yaml);
        assert_eq!(SpecFormat::from_path(Path::new("api")), SpecFormat::Yaml);
    }
}
