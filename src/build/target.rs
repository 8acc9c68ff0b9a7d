//! Build target definitions.
//!
//! A build target is one task of the asset build: clearing the output
//! directory, compiling styles, producing one image variant set, copying
//! pages or scripts. Targets are plain values so a plan can be inspected and
//! tested before anything runs.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::PathBuf;

/// Id of the target that empties the output directory.
pub const CLEAN_TARGET_ID: &str = "clean";

/// Final encoding of a raster variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VariantEncoding {
    /// Re-encoded in the source format with compression
    Optimized,
    /// Encoded as WebP
    WebP,
}

impl fmt::Display for VariantEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VariantEncoding::Optimized => write!(f, "optimized"),
            VariantEncoding::WebP => write!(f, "webp"),
        }
    }
}

/// Parameters of one responsive image task.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VariantSpec {
    /// Asset group the task belongs to
    pub group: String,
    /// Target width in pixels
    pub width: u32,
    /// Output encoding
    pub encoding: VariantEncoding,
}

/// Type of build target.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TargetKind {
    /// Remove every prior output
    Clean,
    /// Sass compile + media grouping + prefixing (+ minify | source map)
    Styles,
    /// Resized raster variant
    Variant(VariantSpec),
    /// Optimized vector images, no resizing
    Vector,
    /// Copy-through HTML pages
    Html,
    /// Copy-through script
    Script,
}

impl TargetKind {
    /// Short kind name used in ids and filters.
    pub fn name(&self) -> &'static str {
        match self {
            TargetKind::Clean => "clean",
            TargetKind::Styles => "styles",
            TargetKind::Variant(_) => "image",
            TargetKind::Vector => "svg",
            TargetKind::Html => "html",
            TargetKind::Script => "script",
        }
    }

    /// Whether outputs of this kind are pushed to live-reload clients.
    pub fn notifies_reload(&self) -> bool {
        matches!(self, TargetKind::Styles | TargetKind::Html | TargetKind::Script)
    }
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A build target representing work to be done.
#[derive(Debug, Clone)]
pub struct BuildTarget {
    /// Unique identifier for this target (e.g., "image:main-576-webp")
    pub id: String,
    /// What kind of target this is
    pub kind: TargetKind,
    /// Human-readable name
    pub name: String,
    /// Source glob (or literal path) relative to the project root
    pub source: String,
    /// Output file (styles) or directory (everything else)
    pub dest: PathBuf,
    /// Dependencies (other target IDs that must be built first)
    pub dependencies: Vec<String>,
}

impl BuildTarget {
    fn new(kind: TargetKind, name: String, source: String, dest: PathBuf) -> Self {
        let id = if name.is_empty() { kind.name().to_string() } else { format!("{}:{}", kind, name) };
        Self { id, kind, name, source, dest, dependencies: vec![] }
    }

    /// Target that empties `out_dir`.
    pub fn clean(out_dir: PathBuf) -> Self {
        Self::new(TargetKind::Clean, String::new(), String::new(), out_dir)
    }

    /// Stylesheet target compiling `entry` into the file `output`.
    pub fn styles(entry: String, output: PathBuf) -> Self {
        Self::new(TargetKind::Styles, String::new(), entry, output)
    }

    /// Vector image target.
    pub fn vector(source: String, dest: PathBuf) -> Self {
        let name = dest
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "images".to_string());
        Self::new(TargetKind::Vector, name, source, dest)
    }

    /// HTML copy target.
    pub fn html(source: String, dest: PathBuf) -> Self {
        Self::new(TargetKind::Html, String::new(), source, dest)
    }

    /// Script copy target.
    pub fn script(source: String, dest: PathBuf) -> Self {
        Self::new(TargetKind::Script, String::new(), source, dest)
    }

    /// Responsive variant target. Prefer [`crate::build::make_variant_task`].
    pub fn variant(spec: VariantSpec, source: String, dest: PathBuf) -> Self {
        let name = format!("{}-{}-{}", spec.group, spec.width, spec.encoding);
        Self::new(TargetKind::Variant(spec), name, source, dest)
    }

    /// Add a dependency to this target.
    pub fn with_dependency(mut self, dep: impl Into<String>) -> Self {
        self.dependencies.push(dep.into());
        self
    }

    /// Check if this target matches a filter string.
    ///
    /// Supports patterns like:
    /// - Exact match: "image:main-576-webp"
    /// - Kind match: "image:*" or just "image"
    /// - Name match: "*:main-576-webp"
    pub fn matches_filter(&self, filter: &str) -> bool {
        if self.id == filter {
            return true;
        }

        if self.kind.name() == filter {
            return true;
        }

        if let Some((kind_pat, name_pat)) = filter.split_once(':') {
            let kind_matches = kind_pat == "*" || kind_pat == self.kind.name();
            let name_matches = name_pat == "*" || name_pat == self.name;
            return kind_matches && name_matches;
        }

        false
    }
}

/// A collection of build targets with dependency information.
#[derive(Debug, Default, Clone)]
pub struct BuildPlan {
    targets: Vec<BuildTarget>,
}

impl BuildPlan {
    /// Create a new empty build plan.
    pub fn new() -> Self {
        Self { targets: vec![] }
    }

    /// Add a target to the plan.
    pub fn add_target(&mut self, target: BuildTarget) {
        self.targets.push(target);
    }

    /// Get all targets in the plan.
    pub fn targets(&self) -> &[BuildTarget] {
        &self.targets
    }

    /// Look up a target by id.
    pub fn get(&self, id: &str) -> Option<&BuildTarget> {
        self.targets.iter().find(|t| t.id == id)
    }

    /// Get the number of targets in the plan.
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    /// Check if the plan is empty.
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Filter targets to only those matching the given patterns.
    ///
    /// Dependencies on removed targets are ignored when ordering the result.
    pub fn filter(mut self, patterns: &[String]) -> Self {
        if patterns.is_empty() {
            return self;
        }

        self.targets.retain(|t| patterns.iter().any(|p| t.matches_filter(p)));
        self
    }

    /// Keep only the targets for which `keep` returns true.
    pub fn retain(&mut self, keep: impl FnMut(&BuildTarget) -> bool) {
        self.targets.retain(keep);
    }

    /// Group targets into levels that can run concurrently.
    ///
    /// Every target in level `n` depends only on targets in levels `< n`.
    /// Dependencies on ids not present in the plan are ignored. Targets keep
    /// their insertion order within a level.
    pub fn levels(&self) -> Result<Vec<Vec<&BuildTarget>>, BuildOrderError> {
        if self.targets.is_empty() {
            return Ok(vec![]);
        }

        let mut known: HashSet<&str> = HashSet::new();
        for target in &self.targets {
            if !known.insert(target.id.as_str()) {
                return Err(BuildOrderError::DuplicateTarget(target.id.clone()));
            }
        }
        let deps_map: HashMap<&str, Vec<&str>> = self
            .targets
            .iter()
            .map(|t| {
                let deps = t
                    .dependencies
                    .iter()
                    .map(String::as_str)
                    .filter(|d| known.contains(d))
                    .collect();
                (t.id.as_str(), deps)
            })
            .collect();

        let mut level_of: HashMap<&str, usize> = HashMap::new();
        let mut levels: Vec<Vec<&BuildTarget>> = Vec::new();

        while level_of.len() < self.targets.len() {
            let current = levels.len();
            let ready: Vec<&BuildTarget> = self
                .targets
                .iter()
                .filter(|t| !level_of.contains_key(t.id.as_str()))
                .filter(|t| {
                    deps_map[t.id.as_str()]
                        .iter()
                        .all(|d| level_of.get(d).is_some_and(|&l| l < current))
                })
                .collect();

            if ready.is_empty() {
                let stuck = self
                    .targets
                    .iter()
                    .find(|t| !level_of.contains_key(t.id.as_str()))
                    .map(|t| t.id.clone())
                    .unwrap_or_default();
                return Err(BuildOrderError::CyclicDependency(stuck));
            }

            for target in &ready {
                level_of.insert(target.id.as_str(), current);
            }
            levels.push(ready);
        }

        Ok(levels)
    }
}

/// Error during build order calculation.
#[derive(Debug, thiserror::Error)]
pub enum BuildOrderError {
    /// Circular dependency detected
    #[error("Circular dependency detected involving target '{0}'")]
    CyclicDependency(String),
    /// Two targets share an id
    #[error("Duplicate target id '{0}'")]
    DuplicateTarget(String),
}
