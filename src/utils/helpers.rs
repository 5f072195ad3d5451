// This file contains helper functions for checking input paths and formatting output.

use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FileError {
    #[error("missing files or arguments")]
    MissingArguments,

    #[error("missing files: {} or {}", .data.display(), .spec.display())]
    MissingFiles { data: PathBuf, spec: PathBuf },
}

/// Checks that both input paths were given and point at something on disk
pub fn ensure_files_exist<P: AsRef<Path>, Q: AsRef<Path>>(data: P, spec: Q) -> Result<(), FileError> {
    let data = data.as_ref();
    let spec = spec.as_ref();

    if data.as_os_str().is_empty() || spec.as_os_str().is_empty() {
        return Err(FileError::MissingArguments);
    }
    if !data.exists() || !spec.exists() {
        return Err(FileError::MissingFiles {
            data: data.to_path_buf(),
            spec: spec.to_path_buf(),
        });
    }
    Ok(())
}

/// The part of `path` after its last `/` or `\`
pub fn basename(path: &str) -> &str {
    match path.rfind(|c| c == '/' || c == '\\') {
        Some(idx) => &path[idx + 1..],
        None => path,
    }
}

/// Collapses a multi-line message onto one line
pub fn single_line(message: &str) -> String {
    message.replace("\r\n", " ").replace('\n', " ")
}
