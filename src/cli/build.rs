//! Build command implementations (build, watch)

use std::process::ExitCode;

use super::{Project, EXIT_ERROR, EXIT_SUCCESS};
use crate::build::{BuildContext, BuildPipeline};
use crate::mode::resolve_mode;
use crate::watch::{watch_and_serve, WatchOptions};

/// Run the build command
pub(crate) fn run_build(project: Project, verbose: bool) -> ExitCode {
    let mode = resolve_mode();
    let Project { config, root } = project;

    let context = BuildContext::new(config, root).with_mode(mode).with_verbose(verbose);
    let src_dir = context.src_dir();
    if !src_dir.exists() {
        eprintln!("Error: Source directory not found: {}", src_dir.display());
        return ExitCode::from(EXIT_ERROR);
    }

    println!("Building ({})...", mode);

    let pipeline = BuildPipeline::new(context);

    match pipeline.build() {
        Ok(result) => {
            println!("{}", result.summary());
            if result.is_success() {
                ExitCode::from(EXIT_SUCCESS)
            } else {
                ExitCode::from(EXIT_ERROR)
            }
        }
        Err(e) => {
            eprintln!("Build error: {}", e);
            ExitCode::from(EXIT_ERROR)
        }
    }
}

/// Run the watch command
pub(crate) fn run_watch(project: Project, verbose: bool) -> ExitCode {
    let mode = resolve_mode();
    let Project { config, root } = project;

    println!("Starting watch mode ({})...", mode);
    println!("Press Ctrl+C to stop");
    println!();

    let options = WatchOptions { config, project_root: root, mode, verbose };
    match watch_and_serve(options) {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(e) => {
            eprintln!("Watch error: {}", e);
            ExitCode::from(EXIT_ERROR)
        }
    }
}
