//! Stylesheet task.
//!
//! Compiles the Sass entry point with `grass`, groups duplicate `@media`
//! blocks mobile-first, prefixes for the configured browsers with
//! `lightningcss`, then prints either minified CSS (production) or readable
//! CSS with an inline source map (development).
//!
//! `grass` emits no source maps, so the development map relates the printed
//! CSS to the intermediate compiled `main.css`, not to the `.scss` sources.
//!
//! Compilation and processing errors are soft: they are logged and reported
//! as warnings, and no stylesheet is written.

use super::{ensure_dir, TaskError, TaskOutput};
use crate::config::BrowserTargets;
use crate::mode::Mode;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use lightningcss::printer::PrinterOptions;
use lightningcss::rules::media::MediaRule;
use lightningcss::rules::{CssRule, CssRuleList};
use lightningcss::stylesheet::{MinifyOptions, ParserOptions, StyleSheet};
use lightningcss::targets::{Browsers, Targets};
use lightningcss::traits::ToCss;
use parcel_sourcemap::SourceMap;
use regex::Regex;
use std::cmp::Ordering;
use std::fs;
use std::path::Path;
use std::sync::OnceLock;

/// Prefix of the inline source map comment appended in development.
pub const SOURCE_MAP_PREFIX: &str = "/*# sourceMappingURL=data:application/json;charset=utf-8;base64,";

/// Soft stylesheet failure.
#[derive(Debug, thiserror::Error)]
pub enum StyleError {
    #[error("Sass compilation failed: {0}")]
    Sass(String),
    #[error("CSS parse error: {0}")]
    Parse(String),
    #[error("CSS transform error: {0}")]
    Transform(String),
    #[error("CSS print error: {0}")]
    Print(String),
    #[error("Source map error: {0}")]
    SourceMap(String),
}

/// Compile a Sass entry point to plain CSS.
///
/// Imports resolve relative to the entry's directory.
pub fn compile_sass(entry: &Path) -> Result<String, StyleError> {
    let mut options = grass::Options::default().style(grass::OutputStyle::Expanded);
    if let Some(dir) = entry.parent() {
        options = options.load_path(dir);
    }

    grass::from_path(entry, &options).map_err(|e| StyleError::Sass(e.to_string()))
}

/// Convert configured browser majors into prefixer targets.
pub fn browser_targets(browsers: &BrowserTargets) -> Targets {
    // lightningcss encodes versions as major << 16 | minor << 8 | patch
    let version = |major: Option<u32>| major.map(|m| m << 16);

    Targets::from(Browsers {
        android: version(browsers.android),
        chrome: version(browsers.chrome),
        edge: version(browsers.edge),
        firefox: version(browsers.firefox),
        ios_saf: version(browsers.ios_saf),
        opera: version(browsers.opera),
        safari: version(browsers.safari),
        samsung: version(browsers.samsung),
        ..Browsers::default()
    })
}

fn min_width_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?:min-width\s*:|width\s*>=?)\s*([0-9]*\.?[0-9]+)").expect("valid regex")
    })
}

fn max_width_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?:max-width\s*:|width\s*<=?)\s*([0-9]*\.?[0-9]+)").expect("valid regex")
    })
}

fn capture_number(pattern: &Regex, query: &str) -> Option<f64> {
    pattern.captures(query).and_then(|c| c.get(1)).and_then(|m| m.as_str().parse().ok())
}

/// Mobile-first ordering: `min-width` ascending, then `max-width`
/// descending, then everything else.
fn compare_queries(a: &str, b: &str) -> Ordering {
    fn rank(query: &str) -> (u8, f64) {
        if let Some(width) = capture_number(min_width_pattern(), query) {
            (0, width)
        } else if let Some(width) = capture_number(max_width_pattern(), query) {
            (1, -width)
        } else {
            (2, 0.0)
        }
    }

    let (class_a, width_a) = rank(a);
    let (class_b, width_b) = rank(b);
    class_a.cmp(&class_b).then(width_a.total_cmp(&width_b))
}

/// Merge top-level `@media` blocks with identical queries and move them
/// after all other rules, sorted mobile-first.
///
/// Rules inside a merged block keep their original relative order. Queries
/// of the same rank keep first-appearance order.
pub fn group_media_queries(rules: &mut CssRuleList<'_>) {
    let mut plain = Vec::with_capacity(rules.0.len());
    let mut groups: Vec<(String, MediaRule<'_>)> = Vec::new();

    for rule in std::mem::take(&mut rules.0) {
        match rule {
            CssRule::Media(media) => {
                let key = media.query.to_css_string(PrinterOptions::default()).unwrap_or_default();
                match groups.iter_mut().find(|(existing, _)| *existing == key) {
                    Some((_, first)) => first.rules.0.extend(media.rules.0),
                    None => groups.push((key, media)),
                }
            }
            other => plain.push(other),
        }
    }

    groups.sort_by(|(a, _), (b, _)| compare_queries(a, b));
    plain.extend(groups.into_iter().map(|(_, media)| CssRule::Media(media)));
    rules.0 = plain;
}

/// Run compiled CSS through grouping, prefixing and printing.
///
/// `source_name` names the stylesheet inside the source map.
pub fn process_css(
    css: &str,
    source_name: &str,
    mode: Mode,
    targets: Targets,
) -> Result<String, StyleError> {
    let parser_options = ParserOptions { filename: source_name.to_string(), ..ParserOptions::default() };
    let mut sheet =
        StyleSheet::parse(css, parser_options).map_err(|e| StyleError::Parse(e.to_string()))?;

    group_media_queries(&mut sheet.rules);

    // Prefixing runs in both modes so the two outputs carry the same rules.
    sheet
        .minify(MinifyOptions { targets, ..MinifyOptions::default() })
        .map_err(|e| StyleError::Transform(e.to_string()))?;

    if !mode.source_maps() {
        let printed = sheet
            .to_css(PrinterOptions { minify: mode.minify(), targets, ..PrinterOptions::default() })
            .map_err(|e| StyleError::Print(e.to_string()))?;
        return Ok(printed.code);
    }

    let mut source_map = SourceMap::new("/");
    let index = source_map.add_source(source_name);
    source_map
        .set_source_content(index as usize, css)
        .map_err(|e| StyleError::SourceMap(e.to_string()))?;

    let printed = sheet
        .to_css(PrinterOptions {
            minify: mode.minify(),
            source_map: Some(&mut source_map),
            targets,
            ..PrinterOptions::default()
        })
        .map_err(|e| StyleError::Print(e.to_string()))?;

    let json = source_map.to_json(None).map_err(|e| StyleError::SourceMap(e.to_string()))?;

    Ok(format!("{}\n{}{} */\n", printed.code, SOURCE_MAP_PREFIX, STANDARD.encode(json)))
}

/// Full stylesheet task: compile `entry`, process it and write `output`.
///
/// Only writing the result can fail the task.
pub fn build_styles(
    entry: &Path,
    output: &Path,
    mode: Mode,
    browsers: &BrowserTargets,
) -> Result<TaskOutput, TaskError> {
    let source_name = entry
        .file_stem()
        .map(|stem| format!("{}.css", stem.to_string_lossy()))
        .unwrap_or_else(|| "styles.css".to_string());

    let processed = compile_sass(entry)
        .and_then(|css| process_css(&css, &source_name, mode, browser_targets(browsers)));

    let css = match processed {
        Ok(css) => css,
        Err(e) => {
            tracing::error!(entry = %entry.display(), "{}", e);
            return Ok(TaskOutput::warning(e.to_string()));
        }
    };

    if let Some(parent) = output.parent() {
        ensure_dir(parent)?;
    }
    fs::write(output, css).map_err(TaskError::io(output))?;
    tracing::debug!(output = %output.display(), %mode, "wrote stylesheet");

    Ok(TaskOutput::files(vec![output.to_path_buf()]))
}
