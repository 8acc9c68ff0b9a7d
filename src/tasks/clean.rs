//! Output directory cleaning.

use super::{TaskError, TaskOutput};
use std::fs;
use std::path::Path;

/// Remove everything under `out_dir`, leaving the directory itself in place.
///
/// A missing directory is created. The task reports no output files.
pub fn clean_output(out_dir: &Path) -> Result<TaskOutput, TaskError> {
    if !out_dir.exists() {
        fs::create_dir_all(out_dir).map_err(TaskError::io(out_dir))?;
        return Ok(TaskOutput::default());
    }

    let mut removed = 0usize;
    for entry in fs::read_dir(out_dir).map_err(TaskError::io(out_dir))? {
        let entry = entry.map_err(TaskError::io(out_dir))?;
        let path = entry.path();
        let file_type = entry.file_type().map_err(TaskError::io(&path))?;

        if file_type.is_dir() {
            fs::remove_dir_all(&path).map_err(TaskError::io(&path))?;
        } else {
            fs::remove_file(&path).map_err(TaskError::io(&path))?;
        }
        removed += 1;
    }

    tracing::debug!(dir = %out_dir.display(), removed, "cleaned output directory");
    Ok(TaskOutput::default())
}
