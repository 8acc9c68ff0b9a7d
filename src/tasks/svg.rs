//! Vector image optimization.
//!
//! SVG files are copied without resizing after stripping bytes browsers
//! never need: the XML declaration, doctype, comments, `<metadata>`, editor
//! namespaces (Inkscape, Sodipodi, Sketch, Serif) and whitespace between
//! tags. Whitespace inside `<text>` elements is rendered, so it is kept, and
//! documents using `xml:space="preserve"` keep all of their whitespace.
//! Other processing instructions such as `<?xml-stylesheet?>` are kept.

use super::{ensure_dir, file_name_of, TaskError, TaskOutput};
use crate::build::discover_files;
use regex::Regex;
use std::fs;
use std::path::Path;
use std::sync::OnceLock;

const EDITOR_PREFIXES: &str = "sodipodi|inkscape|sketch|serif";

struct Cleaners {
    removals: Vec<Regex>,
    between_tags: Regex,
    text_element: Regex,
    preserve_space: Regex,
}

fn cleaners() -> &'static Cleaners {
    static CLEANERS: OnceLock<Cleaners> = OnceLock::new();
    CLEANERS.get_or_init(|| {
        let patterns = [
            r"<\?xml\s[\s\S]*?\?>".to_string(),
            r"(?i)<!DOCTYPE[^>\[]*(?:\[[\s\S]*?\])?\s*>".to_string(),
            r"<!--[\s\S]*?-->".to_string(),
            r"<metadata[\s\S]*?</metadata>|<metadata[^>]*/>".to_string(),
            format!(r"<(?:{p}):namedview[\s\S]*?</(?:{p}):namedview>", p = EDITOR_PREFIXES),
            format!(r"<(?:{p}):[^>]*/>", p = EDITOR_PREFIXES),
            format!(
                r#"\s+(?:xmlns:(?:{p})|(?:{p}):[\w.-]+)\s*=\s*(?:"[^"]*"|'[^']*')"#,
                p = EDITOR_PREFIXES
            ),
        ];

        Cleaners {
            removals: patterns.iter().map(|p| Regex::new(p).expect("valid regex")).collect(),
            between_tags: Regex::new(r">\s+<").expect("valid regex"),
            text_element: Regex::new(r"<text[\s>][\s\S]*?</text\s*>").expect("valid regex"),
            preserve_space: Regex::new(r#"xml:space\s*=\s*["']preserve["']"#).expect("valid regex"),
        }
    })
}

/// Strip non-rendering content from an SVG document.
pub fn optimize_svg(input: &str) -> String {
    let cleaners = cleaners();

    let mut svg = input.to_string();
    for pattern in &cleaners.removals {
        svg = pattern.replace_all(&svg, "").into_owned();
    }

    let svg = svg.trim();
    if cleaners.preserve_space.is_match(svg) {
        return svg.to_string();
    }

    let text_spans: Vec<(usize, usize)> =
        cleaners.text_element.find_iter(svg).map(|m| (m.start(), m.end())).collect();
    let inside_text = |start: usize, end: usize| text_spans.iter().any(|&(s, e)| start >= s && end <= e);

    // Collapse whitespace between tags everywhere except inside <text>.
    let mut out = String::with_capacity(svg.len());
    let mut last = 0;
    for gap in cleaners.between_tags.find_iter(svg) {
        if inside_text(gap.start(), gap.end()) {
            continue;
        }
        out.push_str(&svg[last..gap.start()]);
        out.push_str("><");
        last = gap.end();
    }
    out.push_str(&svg[last..]);
    out
}

/// Optimize every SVG matching `pattern` into `dest_dir`, keeping names.
pub fn build_vectors(root: &Path, pattern: &str, dest_dir: &Path) -> Result<TaskOutput, TaskError> {
    let sources = discover_files(root, pattern)?;
    if sources.is_empty() {
        return Ok(TaskOutput::default());
    }

    ensure_dir(dest_dir)?;

    let mut outputs = Vec::with_capacity(sources.len());
    for source in sources {
        let original = fs::read_to_string(&source).map_err(TaskError::io(&source))?;
        let optimized = optimize_svg(&original);
        let dest = dest_dir.join(file_name_of(&source));
        fs::write(&dest, &optimized).map_err(TaskError::io(&dest))?;

        tracing::debug!(
            source = %source.display(),
            before = original.len(),
            after = optimized.len(),
            "optimized svg"
        );
        outputs.push(dest);
    }

    Ok(TaskOutput::files(outputs))
}
