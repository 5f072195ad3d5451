pub mod args;
pub mod report;

pub use args::{parse_args, Args, Options, UsageError};
