pub mod cli;
pub mod parser;
pub mod schema;
pub mod utils;

// Re-export frequently used items for easier access
pub use cli::{parse_args, Options, UsageError};
pub use parser::{load_json, parse_openapi_file, Document, ParserError, SchemaId};
pub use schema::{select_schema, validate_instance, SelectionError, ValidationError};
pub use utils::FileError;

use std::io::{self, Write};
use thiserror::Error;

/// Process exit code of a successful run
pub const EXIT_OK: i32 = 0;
/// Bad data, bad specification, failed selection or failed validation
pub const EXIT_FAILURE: i32 = 1;
/// Bad arguments or missing input files
pub const EXIT_USAGE: i32 = 2;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Usage(#[from] UsageError),

    #[error(transparent)]
    Files(#[from] FileError),

    #[error("{0}")]
    Parser(#[from] ParserError),

    #[error("Schema selection: {source}")]
    Selection {
        source: SelectionError,
        /// What the user could pick instead, printed after the error
        suggestions: Vec<String>,
    },

    #[error("Validation FAILED:\n{0}")]
    Validation(#[from] ValidationError),

    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
}

impl AppError {
    pub fn exit_code(&self) -> i32 {
        match self {
            AppError::Usage(_) | AppError::Files(_) => EXIT_USAGE,
            // The file vanished between the existence check and the read
            AppError::Parser(ParserError::IoError(err)) if err.kind() == io::ErrorKind::NotFound => {
                EXIT_USAGE
            }
            _ => EXIT_FAILURE,
        }
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

/// Run one validation and report on `out` (summary, suggestions) and `err` (diagnostics).
///
/// Returns the process exit code.
pub fn run<O, E>(options: &Options, out: &mut O, err: &mut E) -> i32
where
    O: Write + ?Sized,
    E: Write + ?Sized,
{
    match validate_files(options, out) {
        Ok(()) => EXIT_OK,
        Err(error) => {
            tracing::error!(error = %utils::single_line(&error.to_string()), "run failed");
            let _ = writeln!(err, "{}", error);
            if let AppError::Selection { suggestions, .. } = &error {
                for line in suggestions {
                    let _ = writeln!(out, "{}", line);
                }
            }
            error.exit_code()
        }
    }
}

/// Load both inputs, pick the schema and validate the data against it
pub fn validate_files<O: Write + ?Sized>(options: &Options, out: &mut O) -> Result<()> {
    tracing::debug!(
        data = %options.data_path.display(),
        spec = %options.spec_path.display(),
        "checking input files"
    );
    utils::ensure_files_exist(&options.data_path, &options.spec_path)?;

    let data = parser::load_json(&options.data_path)?;
    let doc = parser::parse_openapi_file(&options.spec_path)?;
    tracing::debug!(version = %doc.version, "specification loaded");

    let selected = match schema::select_schema(
        &doc,
        options.schema_name.as_deref(),
        options.path.as_deref(),
        options.method.as_deref(),
    ) {
        Ok(selected) => selected,
        Err(source) => {
            return Err(AppError::Selection {
                source,
                suggestions: cli::report::suggestions(&doc, options),
            });
        }
    };
    let label = cli::report::schema_label(&doc, selected);
    tracing::info!(schema = %label, "schema selected");

    schema::validate_instance(&doc, selected, &data)?;
    tracing::info!(schema = %label, data = %options.data_path.display(), "validation succeeded");

    cli::report::print_ok(out, &doc, selected, options)?;
    Ok(())
}
