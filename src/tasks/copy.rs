//! Copy-through tasks for HTML pages and the script bundle.

use super::{ensure_dir, file_name_of, TaskError, TaskOutput};
use crate::build::discover_files;
use std::fs;
use std::path::{Path, PathBuf};

fn is_glob(pattern: &str) -> bool {
    pattern.contains(['*', '?', '[', '{'])
}

/// Copy every file matching `pattern` (relative to `root`) into `dest_dir`,
/// keeping file names.
///
/// A literal pattern (no glob metacharacters) must exist; a glob that matches
/// nothing copies nothing.
pub fn copy_files(root: &Path, pattern: &str, dest_dir: &Path) -> Result<TaskOutput, TaskError> {
    let sources = discover_files(root, pattern)?;

    if sources.is_empty() {
        if !is_glob(pattern) {
            return Err(TaskError::MissingSource(PathBuf::from(pattern)));
        }
        tracing::debug!(pattern, "no files to copy");
        return Ok(TaskOutput::default());
    }

    ensure_dir(dest_dir)?;

    let mut outputs = Vec::with_capacity(sources.len());
    for source in sources {
        let dest = dest_dir.join(file_name_of(&source));
        fs::copy(&source, &dest).map_err(TaskError::io(&source))?;
        tracing::debug!(from = %source.display(), to = %dest.display(), "copied");
        outputs.push(dest);
    }

    Ok(TaskOutput::files(outputs))
}
