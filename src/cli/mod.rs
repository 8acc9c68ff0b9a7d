//! Command-line interface implementation
//!
//! This module provides the CLI entry point and dispatches to submodules
//! for specific command implementations.

mod build;

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::config::{find_config, load_config, ConfigError, SiteConfig};

/// Exit codes
pub(crate) const EXIT_SUCCESS: u8 = 0;
pub(crate) const EXIT_ERROR: u8 = 1;
pub(crate) const EXIT_INVALID_CONFIG: u8 = 2;

/// siteforge - Build a static site's assets and preview it with live reload
#[derive(Parser, Debug)]
#[command(name = "siteforge")]
#[command(about = "siteforge - Compile styles, generate responsive images and preview a static site")]
#[command(version)]
pub struct Cli {
    /// Show debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to siteforge.toml (default: search upward from the current directory)
    #[arg(short, long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Commands {
    /// Clean the output directory and build every asset once.
    ///
    /// Set NODE_ENV=development for source maps and unminified styles.
    Build,

    /// Build, serve the output with live reload, and rebuild on change
    Watch,
}

/// Configuration plus the directory its relative paths resolve against.
#[derive(Debug)]
pub(crate) struct Project {
    pub config: SiteConfig,
    pub root: PathBuf,
}

/// Load the project configuration.
///
/// With an explicit path the file must exist. Otherwise siteforge.toml is
/// searched upward from the working directory, falling back to defaults
/// rooted at the working directory.
pub(crate) fn load_project(explicit: Option<&Path>) -> Result<Project, ConfigError> {
    let cwd = std::env::current_dir()?;
    let config_path = match explicit {
        Some(path) => Some(if path.is_absolute() { path.to_path_buf() } else { cwd.join(path) }),
        None => find_config(),
    };

    match config_path {
        Some(path) => {
            tracing::debug!(config = %path.display(), "using config");
            let config = load_config(Some(&path))?;
            let root = path.parent().map(Path::to_path_buf).unwrap_or(cwd);
            Ok(Project { config, root })
        }
        None => {
            tracing::debug!("no siteforge.toml found, using defaults");
            Ok(Project { config: load_config(None)?, root: cwd })
        }
    }
}

/// Run the CLI application
pub fn run() -> ExitCode {
    let cli = Cli::parse();
    crate::logging::init_logging(cli.verbose);

    let project = match load_project(cli.config.as_deref()) {
        Ok(project) => project,
        Err(e) => {
            eprintln!("Error loading config: {}", e);
            return ExitCode::from(EXIT_INVALID_CONFIG);
        }
    };

    match cli.command {
        Commands::Build => build::run_build(project, cli.verbose),
        Commands::Watch => build::run_watch(project, cli.verbose),
    }
}
