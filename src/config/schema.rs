//! Configuration schema types for `siteforge.toml`
//!
//! Every field has a default, so an empty file (or no file at all) yields the
//! standard `src/` -> `dist/` layout.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Project layout section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Root of all source files (watched recursively)
    #[serde(default = "default_src")]
    pub src: PathBuf,
    /// Build output directory, emptied before every full build
    #[serde(default = "default_out")]
    pub out: PathBuf,
}

fn default_src() -> PathBuf {
    PathBuf::from("src")
}

fn default_out() -> PathBuf {
    PathBuf::from("dist")
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self { src: default_src(), out: default_out() }
    }
}

/// Browser versions used for vendor prefixing.
///
/// Values are major versions; a missing browser is not targeted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrowserTargets {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chrome: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edge: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub firefox: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub safari: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ios_saf: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opera: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub samsung: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub android: Option<u32>,
}

impl Default for BrowserTargets {
    fn default() -> Self {
        Self {
            chrome: Some(90),
            edge: Some(90),
            firefox: Some(88),
            safari: Some(13),
            ios_saf: Some(13),
            opera: Some(76),
            samsung: Some(14),
            android: None,
        }
    }
}

/// Stylesheet section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StylesConfig {
    /// Sass entry point
    #[serde(default = "default_styles_entry")]
    pub entry: PathBuf,
    /// Output file name, written to the root of the output directory
    #[serde(default = "default_styles_output")]
    pub output: String,
    /// Prefixing targets
    #[serde(default)]
    pub browsers: BrowserTargets,
}

fn default_styles_entry() -> PathBuf {
    PathBuf::from("src/styles/main.scss")
}

fn default_styles_output() -> String {
    "styles.min.css".to_string()
}

impl Default for StylesConfig {
    fn default() -> Self {
        Self {
            entry: default_styles_entry(),
            output: default_styles_output(),
            browsers: BrowserTargets::default(),
        }
    }
}

/// A named source-glob / destination / width-list triple driving
/// responsive image generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetGroup {
    /// Group name, used in target ids (e.g. "main", "logo")
    pub name: String,
    /// Glob for raster sources, relative to the project root.
    /// Brace alternatives like `*.{jpg,png}` are supported.
    pub source: String,
    /// Destination directory, relative to the output directory
    pub dest: PathBuf,
    /// Target widths in pixels; order is preserved
    pub widths: Vec<u32>,
}

impl AssetGroup {
    /// Create a new asset group.
    pub fn new(
        name: impl Into<String>,
        source: impl Into<String>,
        dest: impl Into<PathBuf>,
        widths: Vec<u32>,
    ) -> Self {
        Self { name: name.into(), source: source.into(), dest: dest.into(), widths }
    }
}

fn default_groups() -> Vec<AssetGroup> {
    vec![
        AssetGroup::new(
            "main",
            "src/assets/images/*.{jpg,jpeg,png}",
            "images",
            vec![576, 768, 992, 1200],
        ),
        AssetGroup::new("logo", "src/assets/logo/*.{jpg,jpeg,png}", "images/logo", vec![100, 200]),
    ]
}

/// Image section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImagesConfig {
    /// Raster asset groups
    #[serde(default = "default_groups")]
    pub groups: Vec<AssetGroup>,
    /// Glob for vector images, optimized without resizing
    #[serde(default = "default_svg_source")]
    pub svg: String,
    /// Destination for optimized vector images, relative to the output directory
    #[serde(default = "default_svg_dest")]
    pub svg_dest: PathBuf,
    /// JPEG re-encoding quality (1-100)
    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,
    /// Lossy WebP quality (1-100)
    #[serde(default = "default_webp_quality")]
    pub webp_quality: u8,
    /// Resample sources narrower than the target width up to it.
    /// When false such sources keep their size but are still renamed.
    #[serde(default = "default_true")]
    pub upscale: bool,
}

fn default_svg_source() -> String {
    "src/assets/images/*.svg".to_string()
}

fn default_svg_dest() -> PathBuf {
    PathBuf::from("images")
}

fn default_jpeg_quality() -> u8 {
    80
}

fn default_webp_quality() -> u8 {
    75
}

fn default_true() -> bool {
    true
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self {
            groups: default_groups(),
            svg: default_svg_source(),
            svg_dest: default_svg_dest(),
            jpeg_quality: default_jpeg_quality(),
            webp_quality: default_webp_quality(),
            upscale: true,
        }
    }
}

/// Copy-through section shared by `[html]` and `[script]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CopyConfig {
    /// Glob (or literal path) relative to the project root
    pub source: String,
    /// Destination directory relative to the output directory
    pub dest: PathBuf,
}

fn default_html() -> CopyConfig {
    CopyConfig { source: "src/*.html".to_string(), dest: PathBuf::new() }
}

fn default_script() -> CopyConfig {
    CopyConfig { source: "src/script.js".to_string(), dest: PathBuf::from("js") }
}

/// Preview server section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServeConfig {
    /// Interface to bind
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to bind (0 picks a free port)
    #[serde(default = "default_port")]
    pub port: u16,
    /// Default document for directory requests
    #[serde(default = "default_index")]
    pub index: String,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_index() -> String {
    "index.html".to_string()
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self { host: default_host(), port: default_port(), index: default_index() }
    }
}

/// Watch mode section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Debounce delay in milliseconds
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u32,
    /// Clear terminal between rebuilds
    #[serde(default)]
    pub clear_screen: bool,
}

fn default_debounce_ms() -> u32 {
    100
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self { debounce_ms: default_debounce_ms(), clear_screen: false }
    }
}

/// Complete siteforge.toml configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    #[serde(default)]
    pub project: ProjectConfig,
    #[serde(default)]
    pub styles: StylesConfig,
    #[serde(default)]
    pub images: ImagesConfig,
    #[serde(default = "default_html")]
    pub html: CopyConfig,
    #[serde(default = "default_script")]
    pub script: CopyConfig,
    #[serde(default)]
    pub serve: ServeConfig,
    #[serde(default)]
    pub watch: WatchConfig,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            project: ProjectConfig::default(),
            styles: StylesConfig::default(),
            images: ImagesConfig::default(),
            html: default_html(),
            script: default_script(),
            serve: ServeConfig::default(),
            watch: WatchConfig::default(),
        }
    }
}

/// Configuration validation error
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    /// Path to the invalid field (e.g., "images.groups[0].widths")
    pub field: String,
    /// Error message
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "siteforge.toml: '{}' {}", self.field, self.message)
    }
}

impl SiteConfig {
    /// Validate the configuration and return any errors
    pub fn validate(&self) -> Vec<ConfigValidationError> {
        let mut errors = Vec::new();

        if self.project.out.as_os_str().is_empty() {
            errors.push(ConfigValidationError {
                field: "project.out".to_string(),
                message: "must be a non-empty path".to_string(),
            });
        }

        if self.styles.output.is_empty() || self.styles.output.contains(['/', '\\']) {
            errors.push(ConfigValidationError {
                field: "styles.output".to_string(),
                message: "must be a plain file name".to_string(),
            });
        }

        let mut seen = std::collections::HashSet::new();
        for (i, group) in self.images.groups.iter().enumerate() {
            if group.name.is_empty() {
                errors.push(ConfigValidationError {
                    field: format!("images.groups[{}].name", i),
                    message: "must be a non-empty string".to_string(),
                });
            } else if !seen.insert(group.name.as_str()) {
                errors.push(ConfigValidationError {
                    field: format!("images.groups[{}].name", i),
                    message: format!("duplicate group name '{}'", group.name),
                });
            }

            if group.source.is_empty() {
                errors.push(ConfigValidationError {
                    field: format!("images.groups[{}].source", i),
                    message: "must be a glob pattern".to_string(),
                });
            }

            if group.widths.is_empty() {
                errors.push(ConfigValidationError {
                    field: format!("images.groups[{}].widths", i),
                    message: "must contain at least one width".to_string(),
                });
            }

            if group.widths.contains(&0) {
                errors.push(ConfigValidationError {
                    field: format!("images.groups[{}].widths", i),
                    message: "widths must be positive".to_string(),
                });
            }

            let mut widths = std::collections::HashSet::new();
            if let Some(width) = group.widths.iter().find(|w| !widths.insert(**w)) {
                errors.push(ConfigValidationError {
                    field: format!("images.groups[{}].widths", i),
                    message: format!("duplicate width {}", width),
                });
            }
        }

        for (field, quality) in
            [("images.jpeg_quality", self.images.jpeg_quality), ("images.webp_quality", self.images.webp_quality)]
        {
            if quality == 0 || quality > 100 {
                errors.push(ConfigValidationError {
                    field: field.to_string(),
                    message: "must be between 1 and 100".to_string(),
                });
            }
        }

        for (field, copy) in [("html.source", &self.html), ("script.source", &self.script)] {
            if copy.source.is_empty() {
                errors.push(ConfigValidationError {
                    field: field.to_string(),
                    message: "must be a path or glob pattern".to_string(),
                });
            }
        }

        if self.serve.index.is_empty() {
            errors.push(ConfigValidationError {
                field: "serve.index".to_string(),
                message: "must be a file name".to_string(),
            });
        }

        errors
    }
}
