//! Source file discovery for the build system.
//!
//! Expands the glob patterns from the configuration (including brace
//! alternatives such as `*.{jpg,jpeg,png}`, which the `glob` crate does not
//! understand) into sorted file lists.

use glob::glob;
use std::collections::BTreeSet;
use std::path::{Component, Path, PathBuf};

/// Error during source discovery.
#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    /// Invalid glob pattern
    #[error("Invalid glob pattern '{0}': {1}")]
    InvalidPattern(String, glob::PatternError),
    /// Unbalanced `{` / `}` in a pattern
    #[error("Unbalanced braces in pattern '{0}'")]
    UnbalancedBraces(String),
}

/// Expand brace alternatives into plain glob patterns.
///
/// `a/*.{jpg,png}` becomes `["a/*.jpg", "a/*.png"]`. Nested and repeated
/// groups are expanded left to right. Patterns without braces are returned
/// unchanged.
pub fn expand_braces(pattern: &str) -> Result<Vec<String>, DiscoveryError> {
    let Some(open) = pattern.find('{') else {
        if pattern.contains('}') {
            return Err(DiscoveryError::UnbalancedBraces(pattern.to_string()));
        }
        return Ok(vec![pattern.to_string()]);
    };

    // Find the matching close brace and top-level commas of this group
    let mut depth = 0usize;
    let mut close = None;
    let mut splits = Vec::new();
    for (i, ch) in pattern[open..].char_indices() {
        let idx = open + i;
        match ch {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    close = Some(idx);
                    break;
                }
            }
            ',' if depth == 1 => splits.push(idx),
            _ => {}
        }
    }

    let close = close.ok_or_else(|| DiscoveryError::UnbalancedBraces(pattern.to_string()))?;
    let prefix = &pattern[..open];
    let suffix = &pattern[close + 1..];

    let mut bounds = vec![open];
    bounds.extend(splits);
    bounds.push(close);

    let mut expanded = Vec::new();
    for pair in bounds.windows(2) {
        let alternative = &pattern[pair[0] + 1..pair[1]];
        let combined = format!("{}{}{}", prefix, alternative, suffix);
        expanded.extend(expand_braces(&combined)?);
    }

    Ok(expanded)
}

/// Discover files matching a glob pattern.
///
/// # Arguments
/// - `base_dir` - Base directory to resolve relative patterns from
/// - `pattern` - Glob pattern to match (braces allowed)
///
/// # Returns
/// Sorted, de-duplicated list of matching regular files. A pattern that
/// matches nothing yields an empty list.
pub fn discover_files(base_dir: &Path, pattern: &str) -> Result<Vec<PathBuf>, DiscoveryError> {
    let mut files = BTreeSet::new();

    for alternative in expand_braces(pattern)? {
        // The base directory is a literal path; only the pattern may glob.
        let pattern_str = if Path::new(&alternative).is_absolute() {
            alternative.clone()
        } else {
            let base = glob::Pattern::escape(&base_dir.to_string_lossy());
            format!("{}/{}", base.trim_end_matches('/'), alternative)
        };

        let paths = glob(&pattern_str)
            .map_err(|e| DiscoveryError::InvalidPattern(pattern.to_string(), e))?;

        for entry in paths {
            match entry {
                Ok(path) => {
                    if path.is_file() {
                        files.insert(path);
                    }
                }
                Err(e) => {
                    tracing::warn!("error reading path: {}", e);
                }
            }
        }
    }

    Ok(files.into_iter().collect())
}

/// Leading directory of a pattern that contains no glob metacharacters.
///
/// `src/styles/**/*.scss` -> `src/styles`, `src/*.html` -> `src`,
/// `src/script.js` -> `src`.
pub fn glob_base(pattern: &str) -> PathBuf {
    let mut base = PathBuf::new();
    let path = Path::new(pattern);
    let components: Vec<Component<'_>> = path.components().collect();

    for (i, component) in components.iter().enumerate() {
        let text = component.as_os_str().to_string_lossy();
        let is_last = i + 1 == components.len();
        if is_last || text.contains(['*', '?', '[', '{']) {
            break;
        }
        base.push(component.as_os_str());
    }

    base
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_expand_braces_plain() {
        assert_eq!(expand_braces("src/*.html").unwrap(), vec!["src/*.html"]);
    }

    #[test]
    fn test_expand_braces_extensions() {
        assert_eq!(
            expand_braces("src/assets/images/*.{jpg,jpeg,png}").unwrap(),
            vec!["src/assets/images/*.jpg", "src/assets/images/*.jpeg", "src/assets/images/*.png"]
        );
    }

    #[test]
    fn test_expand_braces_multiple_groups() {
        assert_eq!(
            expand_braces("{a,b}/*.{x,y}").unwrap(),
            vec!["a/*.x", "a/*.y", "b/*.x", "b/*.y"]
        );
    }

    #[test]
    fn test_expand_braces_nested() {
        assert_eq!(expand_braces("*.{png,j{pg,peg}}").unwrap(), vec!["*.png", "*.jpg", "*.jpeg"]);
    }

    #[test]
    fn test_expand_braces_unbalanced() {
        assert!(matches!(expand_braces("*.{jpg,png"), Err(DiscoveryError::UnbalancedBraces(_))));
        assert!(matches!(expand_braces("*.jpg}"), Err(DiscoveryError::UnbalancedBraces(_))));
    }

    #[test]
    fn test_discover_files_with_braces() {
        let temp = TempDir::new().unwrap();
        let images = temp.path().join("images");
        fs::create_dir_all(&images).unwrap();
        for name in ["b.png", "a.jpg", "c.jpeg", "d.svg", "e.gif"] {
            fs::write(images.join(name), b"x").unwrap();
        }

        let files = discover_files(temp.path(), "images/*.{jpg,jpeg,png}").unwrap();
        let names: Vec<_> =
            files.iter().map(|p| p.file_name().unwrap().to_string_lossy().into_owned()).collect();
        assert_eq!(names, vec!["a.jpg", "b.png", "c.jpeg"]);
    }

    #[test]
    fn test_discover_files_skips_directories() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("src/nested.html")).unwrap();
        fs::write(temp.path().join("src/index.html"), b"<html></html>").unwrap();

        let files = discover_files(temp.path(), "src/*.html").unwrap();
        assert_eq!(files, vec![temp.path().join("src/index.html")]);
    }

    #[test]
    fn test_discover_files_root_with_glob_characters() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("site[1]");
        fs::create_dir_all(root.join("src")).unwrap();
        fs::write(root.join("src/index.html"), b"<html></html>").unwrap();
        fs::write(root.join("src/script.js"), b"1;").unwrap();

        assert_eq!(discover_files(&root, "src/*.html").unwrap(), vec![root.join("src/index.html")]);
        assert_eq!(discover_files(&root, "src/script.js").unwrap(), vec![root.join("src/script.js")]);
    }

    #[test]
    fn test_discover_files_no_match_is_empty() {
        let temp = TempDir::new().unwrap();
        let files = discover_files(temp.path(), "missing/*.png").unwrap();
        assert!(files.is_empty());
    }

    #[test]
    fn test_glob_base() {
        assert_eq!(glob_base("src/styles/**/*.scss"), PathBuf::from("src/styles"));
        assert_eq!(glob_base("src/*.html"), PathBuf::from("src"));
        assert_eq!(glob_base("src/script.js"), PathBuf::from("src"));
        assert_eq!(glob_base("src/assets/{images,logo}/*.png"), PathBuf::from("src/assets"));
        assert_eq!(glob_base("*.svg"), PathBuf::new());
    }
}
