//! Build context containing configuration and state for a build.

use crate::config::SiteConfig;
use crate::mode::Mode;
use crate::reload::{NullSink, ReloadSink};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Build context containing configuration and paths for a build operation.
///
/// The context provides access to all information needed to execute a build:
/// the configuration, project root, build mode and the live-reload sink.
#[derive(Debug, Clone)]
pub struct BuildContext {
    /// The loaded configuration
    config: SiteConfig,
    /// Project root directory (where siteforge.toml is located)
    project_root: PathBuf,
    /// Development or production
    mode: Mode,
    /// Whether to run in verbose mode
    verbose: bool,
    /// Receiver of changed-output notifications
    sink: Arc<dyn ReloadSink>,
}

impl BuildContext {
    /// Create a new build context in production mode with no reload sink.
    ///
    /// # Arguments
    /// - `config` - The loaded configuration
    /// - `project_root` - The project root directory
    pub fn new(config: SiteConfig, project_root: PathBuf) -> Self {
        Self { config, project_root, mode: Mode::Production, verbose: false, sink: Arc::new(NullSink) }
    }

    /// Get the configuration.
    pub fn config(&self) -> &SiteConfig {
        &self.config
    }

    /// Get the project root directory.
    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    /// Get the build mode.
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Get the source directory (resolved to absolute path).
    pub fn src_dir(&self) -> PathBuf {
        self.resolve_path(&self.config.project.src)
    }

    /// Get the output directory (resolved to absolute path).
    pub fn out_dir(&self) -> PathBuf {
        self.resolve_path(&self.config.project.out)
    }

    /// Whether verbose mode is enabled.
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    /// Set the build mode.
    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    /// Set verbose mode.
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Set the live-reload sink.
    pub fn with_reload_sink(mut self, sink: Arc<dyn ReloadSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Report a rewritten output file to the reload sink.
    ///
    /// Only development builds notify.
    pub fn notify_changed(&self, path: &Path) {
        if self.mode.live_reload() {
            self.sink.notify_changed(path);
        }
    }

    /// Resolve a path relative to the project root.
    ///
    /// If the path is absolute, returns it unchanged.
    /// If relative, joins it with the project root.
    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.project_root.join(path)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_config;
    use std::sync::Mutex;

    #[derive(Debug, Default)]
    struct RecordingSink {
        seen: Mutex<Vec<PathBuf>>,
    }

    impl ReloadSink for RecordingSink {
        fn notify_changed(&self, path: &Path) {
            self.seen.lock().unwrap().push(path.to_path_buf());
        }
    }

    #[test]
    fn test_build_context_new() {
        let root = PathBuf::from("/project");
        let ctx = BuildContext::new(default_config(), root.clone());

        assert_eq!(ctx.project_root(), &root);
        assert_eq!(ctx.mode(), Mode::Production);
        assert!(!ctx.is_verbose());
    }

    #[test]
    fn test_build_context_with_mode() {
        let ctx = BuildContext::new(default_config(), PathBuf::from("/project"))
            .with_mode(Mode::Development);

        assert!(ctx.mode().is_development());
    }

    #[test]
    fn test_build_context_with_verbose() {
        let ctx = BuildContext::new(default_config(), PathBuf::from("/project")).with_verbose(true);

        assert!(ctx.is_verbose());
    }

    #[test]
    fn test_build_context_resolve_path_absolute() {
        let ctx = BuildContext::new(default_config(), PathBuf::from("/project"));

        let absolute = Path::new("/other/path");
        assert_eq!(ctx.resolve_path(absolute), PathBuf::from("/other/path"));
    }

    #[test]
    fn test_build_context_resolve_path_relative() {
        let ctx = BuildContext::new(default_config(), PathBuf::from("/project"));

        let relative = Path::new("src/styles");
        assert_eq!(ctx.resolve_path(relative), PathBuf::from("/project/src/styles"));
    }

    #[test]
    fn test_build_context_dirs() {
        let ctx = BuildContext::new(default_config(), PathBuf::from("/project"));

        assert_eq!(ctx.src_dir(), PathBuf::from("/project/src"));
        assert_eq!(ctx.out_dir(), PathBuf::from("/project/dist"));
    }

    #[test]
    fn test_notify_only_in_development() {
        let sink = Arc::new(RecordingSink::default());

        let prod = BuildContext::new(default_config(), PathBuf::from("/project"))
            .with_reload_sink(sink.clone());
        prod.notify_changed(Path::new("/project/dist/index.html"));
        assert!(sink.seen.lock().unwrap().is_empty());

        let dev = prod.with_mode(Mode::Development);
        dev.notify_changed(Path::new("/project/dist/index.html"));
        assert_eq!(*sink.seen.lock().unwrap(), vec![PathBuf::from("/project/dist/index.html")]);
    }
}
