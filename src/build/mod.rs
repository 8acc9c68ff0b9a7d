//! Build pipeline module for siteforge
//!
//! Provides the asset build graph: a plan of targets (clean, styles, image
//! variants, vector images, pages, script) with "must complete before"
//! edges, executed level by level.
//!
//! # Overview
//!
//! The build pipeline consists of:
//! - **Planning**: Expand the configuration into targets ([`create_build_plan`])
//! - **Discovery**: Resolve each target's source glob when it runs
//! - **Execution**: Run each dependency level in parallel
//!
//! # Example
//!
//! ```ignore
//! use siteforge::build::{BuildContext, BuildPipeline};
//! use siteforge::config::load_config;
//! use siteforge::mode::resolve_mode;
//!
//! let config = load_config(None)?;
//! let context = BuildContext::new(config, project_root).with_mode(resolve_mode());
//! let pipeline = BuildPipeline::new(context);
//!
//! let result = pipeline.build()?;
//! println!("{}", result.summary());
//! ```

pub mod context;
pub mod discovery;
pub mod pipeline;
pub mod plan;
pub mod result;
pub mod target;

pub use context::*;
pub use discovery::*;
pub use pipeline::*;
pub use plan::*;
pub use result::*;
pub use target::*;
