use clap::Parser;
use std::ffi::OsString;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Parser)]
#[clap(
    name = "oas-validator",
    about = "Validate a JSON document against a schema from an OpenAPI specification",
    version
)]
pub struct Args {
    /// Name of the schema in components.schemas to validate against
    #[clap(long, value_name = "NAME", conflicts_with_all = &["path", "method"])]
    pub schema: Option<String>,

    /// Endpoint path, exactly as declared, whose application/json request body schema is used
    #[clap(long, value_name = "PATH", requires = "method")]
    pub path: Option<String>,

    /// HTTP method of the endpoint given with --path
    #[clap(long, value_name = "VERB", requires = "path")]
    pub method: Option<String>,

    /// Also write a timestamped log file into this directory
    #[clap(long, value_name = "DIRECTORY")]
    pub log_dir: Option<PathBuf>,

    /// JSON document to validate
    #[clap(value_name = "DATA")]
    pub data: PathBuf,

    /// OpenAPI specification (.yaml, .yml or .json)
    #[clap(value_name = "SPEC")]
    pub spec: PathBuf,
}

#[derive(Debug, Error)]
pub enum UsageError {
    #[error("{0}")]
    Clap(#[from] clap::Error),

    #[error("use either --schema or --path/--method, not both")]
    ConflictingSelectors,

    #[error("--path and --method must be used together")]
    IncompleteEndpoint,
}

/// What one validation run was asked to do
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Options {
    pub data_path: PathBuf,
    pub spec_path: PathBuf,
    pub schema_name: Option<String>,
    pub path: Option<String>,
    /// Always uppercase
    pub method: Option<String>,
    pub log_dir: Option<PathBuf>,
}

impl TryFrom<Args> for Options {
    type Error = UsageError;

    fn try_from(args: Args) -> Result<Self, Self::Error> {
        let non_empty = |value: Option<String>| value.filter(|v| !v.is_empty());
        let schema_name = non_empty(args.schema);
        let path = non_empty(args.path);
        let method = non_empty(args.method).map(|m| m.to_uppercase());

        if schema_name.is_some() && (path.is_some() || method.is_some()) {
            return Err(UsageError::ConflictingSelectors);
        }
        if path.is_some() != method.is_some() {
            return Err(UsageError::IncompleteEndpoint);
        }

        Ok(Options {
            data_path: args.data,
            spec_path: args.spec,
            schema_name,
            path,
            method,
            log_dir: args.log_dir,
        })
    }
}

/// Parse command line arguments (program name first) into validated options.
///
/// Help and version requests come back as errors too.
pub fn parse_args<I, T>(args: I) -> Result<Options, UsageError>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let args = Args::try_parse_from(args)?;
    Options::try_from(args)
}
