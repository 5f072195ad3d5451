// Human-facing output: usage, success summary and suggestions after a failed schema selection.

use std::io::{self, Write};

use crate::cli::args::Options;
use crate::parser::{Document, SchemaId};
use crate::utils::basename;

pub const USAGE: &str =
    "Usage:\n  oas-validator [--schema NAME | --path /path --method VERB] <data.json> <spec.{yaml|yml|json}>";

pub fn print_usage<W: Write + ?Sized>(w: &mut W) -> io::Result<()> {
    writeln!(w, "{}", USAGE)
}

/// `components.schemas.<name>` when the schema is a component, otherwise the request body it came from
pub fn schema_label(doc: &Document, schema: SchemaId) -> String {
    match doc.schema_name_of(schema) {
        Some(name) => format!("components.schemas.{}", name),
        None => "requestBody application/json".to_string(),
    }
}

pub fn print_ok<W: Write + ?Sized>(
    w: &mut W,
    doc: &Document,
    schema: SchemaId,
    options: &Options,
) -> io::Result<()> {
    let label = schema_label(doc, schema);
    let data = options.data_path.to_string_lossy();
    writeln!(w, "OK ({}) → {}", basename(&label), basename(&data))
}

/// Lines listing what could have been selected instead, sorted.
///
/// Paths are only offered when the user did not already pick an endpoint.
pub fn suggestions(doc: &Document, options: &Options) -> Vec<String> {
    let mut sections = Vec::new();

    let mut names: Vec<&str> = doc.schemas().map(|(name, _)| name).collect();
    names.sort_unstable();
    if !names.is_empty() {
        sections.push(format!(
            "Hint: available in components.schemas -> {}",
            names.join(", ")
        ));
    }

    if options.path.is_none() && options.method.is_none() {
        let mut rows: Vec<String> = doc
            .paths()
            .filter_map(|(path, item)| {
                let methods = item.methods();
                if methods.is_empty() {
                    return None;
                }
                let methods: Vec<&str> = methods.iter().map(|m| m.as_str()).collect();
                Some(format!("{} [{}]", path, methods.join(",")))
            })
            .collect();
        rows.sort();
        if !rows.is_empty() {
            sections.push(format!(
                "Or use --path/--method. Available paths:\n- {}",
                rows.join("\n- ")
            ));
        }
    }

    sections
}
