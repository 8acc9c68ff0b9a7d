//! Criterion benchmarks for siteforge critical paths
//!
//! Benchmarks the operations that dominate a build:
//! - Styles: media query grouping, prefixing and printing in both modes
//! - SVG: editor cleanup
//! - Images: Lanczos resampling to each default width

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use image::{DynamicImage, Rgb, RgbImage};
use siteforge::config::BrowserTargets;
use siteforge::mode::Mode;
use siteforge::tasks::{browser_targets, optimize_svg, process_css, resize_to_width};

// =============================================================================
// Test Data Generators
// =============================================================================

/// Generate a stylesheet with `n` rules, each followed by a breakpoint block.
fn make_stylesheet(n: usize) -> String {
    let breakpoints = [576, 768, 992, 1200];
    (0..n)
        .map(|i| {
            format!(
                ".c{i} {{ display: flex; user-select: none; margin: {m}px; }}\n\
                 @media (min-width: {bp}px) {{ .c{i} {{ margin: {m2}px; }} }}\n",
                i = i,
                m = i % 16,
                m2 = i % 32,
                bp = breakpoints[i % breakpoints.len()]
            )
        })
        .collect()
}

/// Generate an editor-exported SVG with `n` paths.
fn make_svg(n: usize) -> String {
    let paths: String = (0..n)
        .map(|i| format!("  <path inkscape:label=\"p{}\" d=\"M{} 0h4v4H0z\" />\n", i, i))
        .collect();
    format!(
        "<?xml version=\"1.0\"?>\n<!-- Inkscape -->\n<svg xmlns=\"http://www.w3.org/2000/svg\" \
         xmlns:inkscape=\"http://www.inkscape.org/namespaces/inkscape\">\n\
         <metadata><rdf:RDF /></metadata>\n{}</svg>\n",
        paths
    )
}

fn make_photo(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
    }))
}

// =============================================================================
// Benchmarks
// =============================================================================

fn bench_styles(c: &mut Criterion) {
    let mut group = c.benchmark_group("styles");
    let targets = browser_targets(&BrowserTargets::default());

    for rules in [10, 100, 500] {
        let css = make_stylesheet(rules);
        group.throughput(Throughput::Bytes(css.len() as u64));

        for mode in [Mode::Production, Mode::Development] {
            group.bench_with_input(BenchmarkId::new(mode.to_string(), rules), &css, |b, css| {
                b.iter(|| process_css(black_box(css), "main.css", mode, targets))
            });
        }
    }

    group.finish();
}

fn bench_svg(c: &mut Criterion) {
    let mut group = c.benchmark_group("svg");

    for paths in [10, 1000] {
        let svg = make_svg(paths);
        group.throughput(Throughput::Bytes(svg.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(paths), &svg, |b, svg| {
            b.iter(|| optimize_svg(black_box(svg)))
        });
    }

    group.finish();
}

fn bench_resize(c: &mut Criterion) {
    let mut group = c.benchmark_group("resize");
    group.sample_size(10);
    let photo = make_photo(1600, 900);

    for width in [576u32, 1200] {
        group.bench_with_input(BenchmarkId::from_parameter(width), &width, |b, &width| {
            b.iter(|| resize_to_width(black_box(&photo), width, true))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_styles, bench_svg, bench_resize);
criterion_main!(benches);
