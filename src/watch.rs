//! Watch mode: build once, serve the output, rebuild on change.
//!
//! Provides file system watching with debouncing for `siteforge watch`.
//! Each changed path is classified into a [`WatchCategory`], and only the
//! targets bound to that category are rebuilt. Rebuilds run one at a time on
//! the watching thread; events that pile up during a rebuild are drained and
//! coalesced before the next one starts.

use notify::RecursiveMode;
use notify_debouncer_mini::{new_debouncer, DebounceEventResult, DebouncedEventKind};
use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, Receiver};
use std::sync::Arc;
use std::time::Duration;

use crate::build::{expand_braces, glob_base, BuildContext, BuildError, BuildPipeline, BuildResult, DiscoveryError};
use crate::config::SiteConfig;
use crate::mode::Mode;
use crate::reload::BroadcastSink;
use crate::serve::{PreviewServer, ServeError};

/// Undelivered live-reload events kept per browser.
const RELOAD_CHANNEL_CAPACITY: usize = 64;

/// Error during watch mode
#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    /// Failed to initialize file watcher
    #[error("Failed to initialize file watcher: {0}")]
    WatcherInit(#[source] notify::Error),
    /// Failed to add watch path
    #[error("Failed to watch {}: {source}", path.display())]
    WatchPath {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },
    /// Invalid watch pattern
    #[error(transparent)]
    Pattern(#[from] DiscoveryError),
    /// Channel receive error
    #[error("Watch channel error: {0}")]
    ChannelError(String),
    /// The build before serving failed
    #[error("Initial build failed: {0}")]
    InitialBuild(String),
    /// Build could not be planned
    #[error(transparent)]
    Build(#[from] BuildError),
    /// Preview server could not start
    #[error(transparent)]
    Serve(#[from] ServeError),
}

/// Group of sources that share the same rebuild.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum WatchCategory {
    /// Sass sources -> styles target
    Styles,
    /// HTML pages -> html target
    Html,
    /// Raster and vector images -> every image and svg target
    Images,
    /// The script -> script target
    Script,
}

impl WatchCategory {
    /// Build-plan filters selecting the targets this category rebuilds.
    pub fn filters(self) -> &'static [&'static str] {
        match self {
            WatchCategory::Styles => &["styles"],
            WatchCategory::Html => &["html"],
            WatchCategory::Images => &["image", "svg"],
            WatchCategory::Script => &["script"],
        }
    }
}

impl fmt::Display for WatchCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WatchCategory::Styles => write!(f, "styles"),
            WatchCategory::Html => write!(f, "html"),
            WatchCategory::Images => write!(f, "images"),
            WatchCategory::Script => write!(f, "script"),
        }
    }
}

/// Combined plan filter for a set of categories.
pub fn filters_for(categories: &BTreeSet<WatchCategory>) -> Vec<String> {
    categories.iter().flat_map(|c| c.filters().iter().map(|f| f.to_string())).collect()
}

/// Maps changed paths to watch categories.
#[derive(Debug, Clone)]
pub struct ChangeClassifier {
    root: PathBuf,
    rules: Vec<(WatchCategory, String, glob::Pattern)>,
}

impl ChangeClassifier {
    /// Build the classifier for a configuration rooted at `root`.
    pub fn from_config(config: &SiteConfig, root: &Path) -> Result<Self, WatchError> {
        let styles_dir = config
            .styles
            .entry
            .parent()
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_default();
        let styles_glob = if styles_dir.is_empty() {
            "**/*.scss".to_string()
        } else {
            format!("{}/**/*.scss", styles_dir)
        };

        let mut sources = vec![
            (WatchCategory::Styles, styles_glob),
            (WatchCategory::Html, config.html.source.clone()),
            (WatchCategory::Script, config.script.source.clone()),
        ];
        for group in &config.images.groups {
            sources.push((WatchCategory::Images, group.source.clone()));
        }
        sources.push((WatchCategory::Images, config.images.svg.clone()));

        let mut rules = Vec::new();
        for (category, source) in sources {
            for expanded in expand_braces(&source)? {
                let pattern = glob::Pattern::new(&expanded)
                    .map_err(|e| DiscoveryError::InvalidPattern(expanded.clone(), e))?;
                rules.push((category, expanded, pattern));
            }
        }

        let root = root.canonicalize().unwrap_or_else(|_| root.to_path_buf());
        Ok(Self { root, rules })
    }

    /// Category of a changed path, if any source pattern matches it.
    pub fn classify(&self, path: &Path) -> Option<WatchCategory> {
        let relative = path.strip_prefix(&self.root).unwrap_or(path);
        let options = glob::MatchOptions {
            case_sensitive: true,
            require_literal_separator: true,
            require_literal_leading_dot: false,
        };

        self.rules
            .iter()
            .find(|(_, _, pattern)| pattern.matches_path_with(relative, options))
            .map(|(category, _, _)| *category)
    }

    /// Categories touched by a batch of changed paths.
    pub fn categories<'a>(&self, paths: impl IntoIterator<Item = &'a Path>) -> BTreeSet<WatchCategory> {
        paths.into_iter().filter_map(|p| self.classify(p)).collect()
    }

    /// Directories to watch recursively: the static prefix of every
    /// pattern, without directories nested in another watched one.
    pub fn watch_dirs(&self) -> Vec<PathBuf> {
        let mut dirs: Vec<PathBuf> =
            self.rules.iter().map(|(_, source, _)| self.root.join(glob_base(source))).collect();
        dirs.sort();
        dirs.dedup();

        let mut roots: Vec<PathBuf> = Vec::new();
        for dir in dirs {
            if !roots.iter().any(|r| dir.starts_with(r)) {
                roots.push(dir);
            }
        }
        roots
    }
}

/// Tracks failing targets across rebuilds to report recoveries.
#[derive(Debug, Default)]
pub struct ErrorTracker {
    /// Targets that failed the last time they ran
    failing: HashSet<String>,
}

impl ErrorTracker {
    /// Create a new error tracker
    pub fn new() -> Self {
        Self::default()
    }

    /// Update tracker with new build result, returns the targets that are
    /// now fixed. Targets absent from `result` keep their previous state.
    pub fn update(&mut self, result: &BuildResult) -> Vec<String> {
        let ran: HashSet<&str> = result.targets.iter().map(|t| t.target_id.as_str()).collect();
        let now_failing: HashSet<String> = result.failed_ids().into_iter().collect();

        let mut fixed: Vec<String> = self
            .failing
            .iter()
            .filter(|id| ran.contains(id.as_str()) && !now_failing.contains(*id))
            .cloned()
            .collect();
        fixed.sort();

        self.failing.retain(|id| !ran.contains(id.as_str()));
        self.failing.extend(now_failing);

        fixed
    }

    /// Check if there are any tracked errors
    pub fn has_errors(&self) -> bool {
        !self.failing.is_empty()
    }

    /// Get the number of failing targets
    pub fn error_count(&self) -> usize {
        self.failing.len()
    }
}

/// Lifecycle of a watch session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchState {
    /// Nothing started yet
    Idle,
    /// Initial full build running
    Building,
    /// Server up, watchers registered, rebuilding on change
    Serving,
}

impl fmt::Display for WatchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WatchState::Idle => write!(f, "idle"),
            WatchState::Building => write!(f, "building"),
            WatchState::Serving => write!(f, "serving"),
        }
    }
}

/// Options for watch mode
#[derive(Debug, Clone)]
pub struct WatchOptions {
    /// Loaded configuration
    pub config: SiteConfig,
    /// Project root (directory of siteforge.toml or the working directory)
    pub project_root: PathBuf,
    /// Build mode for every build in the session
    pub mode: Mode,
    /// Verbose output
    pub verbose: bool,
}

/// Clear the terminal screen
fn clear_screen() {
    // ANSI escape code to clear screen and move cursor to top-left
    print!("\x1B[2J\x1B[1;1H");
}

/// Format duration for display
pub fn format_duration(duration: Duration) -> String {
    let millis = duration.as_millis();
    if millis < 1000 {
        format!("{}ms", millis)
    } else {
        format!("{:.2}s", duration.as_secs_f64())
    }
}

/// Get current timestamp for logging
fn timestamp() -> String {
    use std::time::SystemTime;
    let now = SystemTime::now().duration_since(SystemTime::UNIX_EPOCH).unwrap_or_default();
    let secs = now.as_secs() % 86400; // seconds since midnight
    let hours = (secs / 3600) % 24;
    let minutes = (secs / 60) % 60;
    let seconds = secs % 60;
    format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
}

fn enter(state: &mut WatchState, next: WatchState) {
    tracing::debug!(from = %state, to = %next, "watch state");
    *state = next;
}

/// Collect every changed path from one debounced batch plus any batches
/// already queued behind it.
fn drain_changes(first: DebounceEventResult, rx: &Receiver<DebounceEventResult>) -> Vec<PathBuf> {
    let mut paths = Vec::new();

    for batch in std::iter::once(first).chain(rx.try_iter()) {
        match batch {
            Ok(events) => paths.extend(
                events
                    .into_iter()
                    .filter(|e| matches!(e.kind, DebouncedEventKind::Any | DebouncedEventKind::AnyContinuous))
                    .map(|e| e.path),
            ),
            Err(error) => {
                // Watch error (non-fatal) - log but continue watching
                eprintln!("[{}] Watch error: {:?}", timestamp(), error);
            }
        }
    }

    paths
}

/// Build, start the preview server, then watch for changes and rebuild.
///
/// This function blocks and runs until interrupted (Ctrl+C). It only
/// returns early when setup fails or the initial build has failures.
pub fn watch_and_serve(options: WatchOptions) -> Result<(), WatchError> {
    let WatchOptions { config, project_root, mode, verbose } = options;
    let mut state = WatchState::Idle;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(ServeError::Runtime)?;

    let classifier = ChangeClassifier::from_config(&config, &project_root)?;
    let watch_config = config.watch.clone();
    let serve_config = config.serve.clone();

    let context = BuildContext::new(config, project_root).with_mode(mode).with_verbose(verbose);
    let out_dir = context.out_dir();
    let sink = BroadcastSink::new(out_dir.clone(), RELOAD_CHANNEL_CAPACITY);
    let pipeline = BuildPipeline::new(context.with_reload_sink(Arc::new(sink.clone())));

    let mut error_tracker = ErrorTracker::new();

    // Initial build
    enter(&mut state, WatchState::Building);
    if watch_config.clear_screen {
        clear_screen();
    }
    println!("[{}] Building ({})...", timestamp(), mode);
    let result = pipeline.build()?;
    print_build_result(&result, &[]);
    if !result.is_success() {
        return Err(WatchError::InitialBuild(result.failed_ids().join(", ")));
    }
    error_tracker.update(&result);

    // Preview server
    let listener = runtime.block_on(PreviewServer::bind(&serve_config.host, serve_config.port))?;
    let local_addr = listener.local_addr().ok();
    let server = PreviewServer::new(out_dir.clone(), serve_config.index.clone(), sink.sender());
    runtime.spawn(server.run(listener));

    match local_addr {
        Some(addr) => println!("[{}] Serving {} at http://{}", timestamp(), out_dir.display(), addr),
        None => println!("[{}] Serving {}", timestamp(), out_dir.display()),
    }
    if !mode.live_reload() {
        tracing::info!("live reload is off in {} mode; set NODE_ENV=development to enable it", mode);
    }

    // Watchers
    let (tx, rx) = channel();
    let debounce_duration = Duration::from_millis(watch_config.debounce_ms as u64);
    let mut debouncer = new_debouncer(debounce_duration, tx).map_err(WatchError::WatcherInit)?;

    for dir in classifier.watch_dirs() {
        if !dir.is_dir() {
            tracing::warn!(dir = %dir.display(), "watch directory does not exist, skipping");
            continue;
        }
        debouncer
            .watcher()
            .watch(&dir, RecursiveMode::Recursive)
            .map_err(|source| WatchError::WatchPath { path: dir.clone(), source })?;
        tracing::debug!(dir = %dir.display(), "watching");
    }

    enter(&mut state, WatchState::Serving);
    println!("[{}] Watching for changes...", timestamp());

    // Watch loop
    loop {
        let first = rx.recv().map_err(|e| WatchError::ChannelError(e.to_string()))?;
        let paths = drain_changes(first, &rx);
        let categories = classifier.categories(paths.iter().map(PathBuf::as_path));
        if categories.is_empty() {
            continue;
        }

        for path in &paths {
            if classifier.classify(path).is_some() {
                if let Some(name) = path.file_name() {
                    println!("[{}] Changed: {}", timestamp(), name.to_string_lossy());
                }
            }
        }

        if watch_config.clear_screen {
            clear_screen();
        }

        let names: Vec<String> = categories.iter().map(ToString::to_string).collect();
        println!("[{}] Rebuilding {}...", timestamp(), names.join(", "));

        match pipeline.run_targets(&filters_for(&categories)) {
            Ok(result) => {
                let fixed = error_tracker.update(&result);
                print_build_result(&result, &fixed);
                if error_tracker.has_errors() {
                    let count = error_tracker.error_count();
                    println!(
                        "[{}] {} target{} still failing",
                        timestamp(),
                        count,
                        if count == 1 { "" } else { "s" }
                    );
                }
            }
            Err(e) => eprintln!("[{}] Error: {}", timestamp(), e),
        }

        println!("[{}] Watching for changes...", timestamp());
    }
}

/// Print build result to console with fixed target notifications
fn print_build_result(result: &BuildResult, fixed: &[String]) {
    // Report fixed targets first (before showing new errors)
    for id in fixed {
        println!("[{}] Fixed: {}", timestamp(), id);
    }

    if result.is_success() {
        println!(
            "[{}] Build complete ({}) - Targets: {} | Files: {}",
            timestamp(),
            format_duration(result.total_duration),
            result.targets.len(),
            result.all_outputs().len()
        );
    } else {
        let error_count = result.failed_count();
        println!(
            "[{}] Build failed ({}) - {} error{}",
            timestamp(),
            format_duration(result.total_duration),
            error_count,
            if error_count == 1 { "" } else { "s" }
        );

        for target in result.failures() {
            eprintln!("[{}] Error in {}: {}", timestamp(), target.target_id, target.status);
        }
    }

    for warning in result.all_warnings() {
        eprintln!("[{}] Warning: {}", timestamp(), warning);
    }
}
