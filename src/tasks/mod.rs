//! Task implementations executed by the build pipeline.
//!
//! Each task turns one [`BuildTarget`](crate::build::BuildTarget) into files
//! under the output directory and reports what it wrote.

pub mod clean;
pub mod copy;
pub mod images;
pub mod styles;
pub mod svg;

use crate::build::DiscoveryError;
use std::path::{Path, PathBuf};

pub use clean::clean_output;
pub use copy::copy_files;
pub use images::{build_variants, resize_to_width, variant_file_name, EncodeOptions};
pub use styles::{
    browser_targets, build_styles, compile_sass, group_media_queries, process_css, StyleError,
    SOURCE_MAP_PREFIX,
};
pub use svg::{build_vectors, optimize_svg};

/// Files written by a task plus any non-fatal problems.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TaskOutput {
    /// Output files, in the order they were written
    pub outputs: Vec<PathBuf>,
    /// Warnings that did not fail the task
    pub warnings: Vec<String>,
}

impl TaskOutput {
    /// Output consisting of the given files and no warnings.
    pub fn files(outputs: Vec<PathBuf>) -> Self {
        Self { outputs, warnings: vec![] }
    }

    /// Output with no files and a single warning.
    pub fn warning(message: impl Into<String>) -> Self {
        Self { outputs: vec![], warnings: vec![message.into()] }
    }
}

/// Hard task failure.
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    /// Filesystem error on a specific path
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Source discovery failed
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),
    /// Image could not be decoded or encoded
    #[error("{}: {source}", path.display())]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    /// Lossy WebP encoder rejected the image
    #[error("{}: WebP encoding failed ({reason})", path.display())]
    WebPEncode { path: PathBuf, reason: String },
    /// A required literal source path does not exist
    #[error("Source file not found: {}", .0.display())]
    MissingSource(PathBuf),
    /// Raster format that has no optimized re-encoding
    #[error("{}: unsupported image format", .0.display())]
    UnsupportedFormat(PathBuf),
}

impl TaskError {
    /// Closure mapping an I/O error on `path` into a task error.
    pub(crate) fn io(path: &Path) -> impl FnOnce(std::io::Error) -> TaskError + '_ {
        move |source| TaskError::Io { path: path.to_path_buf(), source }
    }
}

/// Create `dir` and its parents.
pub(crate) fn ensure_dir(dir: &Path) -> Result<(), TaskError> {
    std::fs::create_dir_all(dir).map_err(TaskError::io(dir))
}

/// File name of `path` as a string, or an empty string for `..`-style paths.
pub(crate) fn file_name_of(path: &Path) -> String {
    path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default()
}
