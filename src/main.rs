//! siteforge - Command-line asset builder and preview server for static sites

use std::process::ExitCode;

use siteforge::cli;

fn main() -> ExitCode {
    cli::run()
}
