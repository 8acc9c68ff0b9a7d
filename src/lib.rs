//! siteforge - Asset pipeline for small static sites
//!
//! This library provides functionality to:
//! - Compile Sass to prefixed CSS, minified or with an inline source map
//! - Generate responsive image variants in the original format and WebP
//! - Optimize SVG files and copy HTML and scripts into the output directory
//! - Watch sources, rebuild what changed, and live-reload a preview server

pub mod build;
pub mod cli;
pub mod config;
pub mod logging;
pub mod mode;
pub mod reload;
pub mod serve;
pub mod tasks;
pub mod watch;
