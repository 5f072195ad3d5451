pub mod helpers;
pub mod logging;

pub use helpers::{basename, ensure_files_exist, single_line, FileError};
pub use logging::{init_logging, log_file_name};
