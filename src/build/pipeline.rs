//! Build pipeline orchestration.
//!
//! The pipeline turns a [`BuildPlan`] into dependency levels and runs each
//! level on the rayon pool. A level starts only after the previous one has
//! finished, so `clean` always completes before anything writes to the
//! output directory.

use crate::build::{
    create_build_plan, BuildContext, BuildOrderError, BuildPlan, BuildResult, BuildTarget,
    TargetKind, TargetResult,
};
use crate::tasks::{self, EncodeOptions, TaskError, TaskOutput};
use rayon::prelude::*;
use std::collections::HashSet;
use std::path::Path;
use std::time::Instant;

/// Error during build execution.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    /// Build order error (circular dependencies)
    #[error("Build order error: {0}")]
    BuildOrder(#[from] BuildOrderError),
}

/// Build pipeline for executing builds.
#[derive(Debug)]
pub struct BuildPipeline {
    /// Build context
    context: BuildContext,
}

impl BuildPipeline {
    /// Create a new build pipeline.
    pub fn new(context: BuildContext) -> Self {
        Self { context }
    }

    /// Run the complete build: clean, then every other target in parallel.
    pub fn build(&self) -> Result<BuildResult, BuildError> {
        let plan = create_build_plan(&self.context);
        self.build_plan(&plan)
    }

    /// Run the targets matching `filter` without cleaning first.
    ///
    /// Used by the watcher for scoped rebuilds. An empty filter runs every
    /// target except `clean`.
    pub fn run_targets(&self, filter: &[String]) -> Result<BuildResult, BuildError> {
        let mut plan = create_build_plan(&self.context).filter(filter);
        plan.retain(|t| t.kind != TargetKind::Clean);
        self.build_plan(&plan)
    }

    /// Run the build with a pre-created plan.
    pub fn build_plan(&self, plan: &BuildPlan) -> Result<BuildResult, BuildError> {
        let start = Instant::now();
        let mut result = self.execute_plan(plan)?;
        result.total_duration = start.elapsed();
        Ok(result)
    }

    /// Execute a build plan level by level.
    fn execute_plan(&self, plan: &BuildPlan) -> Result<BuildResult, BuildError> {
        let levels = plan.levels()?;

        tracing::debug!(
            targets = plan.len(),
            levels = levels.len(),
            mode = %self.context.mode(),
            "executing build plan"
        );
        if self.context.is_verbose() {
            for (i, level) in levels.iter().enumerate() {
                let ids: Vec<_> = level.iter().map(|t| t.id.as_str()).collect();
                tracing::debug!("level {}: {:?}", i, ids);
            }
        }

        let mut result = BuildResult::new();
        let mut failed: HashSet<String> = HashSet::new();

        for level in levels {
            let (blocked, runnable): (Vec<&BuildTarget>, Vec<&BuildTarget>) = level
                .into_iter()
                .partition(|t| t.dependencies.iter().any(|d| failed.contains(d)));

            let mut level_results: Vec<TargetResult> =
                runnable.par_iter().map(|target| self.execute_target(target)).collect();

            for target in blocked {
                let dep = target.dependencies.iter().find(|d| failed.contains(*d)).cloned();
                level_results.push(TargetResult::failed(
                    target.id.clone(),
                    format!("dependency '{}' failed", dep.unwrap_or_default()),
                    Default::default(),
                ));
            }

            for target_result in level_results {
                if target_result.status.is_failure() {
                    failed.insert(target_result.target_id.clone());
                }
                result.add_result(target_result);
            }
        }

        Ok(result)
    }

    /// Execute a single build target.
    fn execute_target(&self, target: &BuildTarget) -> TargetResult {
        let start = Instant::now();
        tracing::debug!(target = %target.id, "building");

        let outcome = self.run_task(target);
        let duration = start.elapsed();

        match outcome {
            Ok(output) => {
                if target.kind.notifies_reload() {
                    for path in &output.outputs {
                        self.context.notify_changed(path);
                    }
                }
                tracing::debug!(target = %target.id, files = output.outputs.len(), ?duration, "done");
                TargetResult::success(target.id.clone(), output.outputs, duration)
                    .with_warnings(output.warnings)
            }
            Err(e) => {
                tracing::error!(target = %target.id, "{}", e);
                TargetResult::failed(target.id.clone(), e.to_string(), duration)
            }
        }
    }

    /// Dispatch a target to its task implementation.
    fn run_task(&self, target: &BuildTarget) -> Result<TaskOutput, TaskError> {
        let root = self.context.project_root();
        let config = self.context.config();

        match &target.kind {
            TargetKind::Clean => tasks::clean_output(&target.dest),
            TargetKind::Styles => tasks::build_styles(
                &self.context.resolve_path(Path::new(&target.source)),
                &target.dest,
                self.context.mode(),
                &config.styles.browsers,
            ),
            TargetKind::Variant(spec) => {
                let options = EncodeOptions {
                    jpeg_quality: config.images.jpeg_quality,
                    webp_quality: config.images.webp_quality,
                    upscale: config.images.upscale,
                };
                tasks::build_variants(root, spec, &target.source, &target.dest, &options)
            }
            TargetKind::Vector => tasks::build_vectors(root, &target.source, &target.dest),
            TargetKind::Html | TargetKind::Script => {
                tasks::copy_files(root, &target.source, &target.dest)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_config;
    use crate::mode::Mode;
    use crate::reload::ReloadSink;
    use std::fs;
    use std::path::PathBuf;
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    #[derive(Debug, Default)]
    struct RecordingSink {
        seen: Mutex<Vec<PathBuf>>,
    }

    impl ReloadSink for RecordingSink {
        fn notify_changed(&self, path: &Path) {
            self.seen.lock().unwrap().push(path.to_path_buf());
        }
    }

    /// Minimal site: one page, one script, one stylesheet, no images.
    fn site() -> TempDir {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        fs::create_dir_all(root.join("src/styles")).unwrap();
        fs::write(root.join("src/index.html"), "<html><body>hi</body></html>").unwrap();
        fs::write(root.join("src/script.js"), "console.log('hi');").unwrap();
        fs::write(root.join("src/styles/main.scss"), "$c: red;\nbody { color: $c; }\n").unwrap();
        temp
    }

    fn pipeline(root: &Path, mode: Mode) -> BuildPipeline {
        BuildPipeline::new(
            BuildContext::new(default_config(), root.to_path_buf()).with_mode(mode),
        )
    }

    #[test]
    fn test_build_minimal_site() {
        let temp = site();
        let result = pipeline(temp.path(), Mode::Production).build().unwrap();

        assert!(result.is_success(), "{}", result.summary());
        let dist = temp.path().join("dist");
        assert!(dist.join("index.html").is_file());
        assert!(dist.join("js/script.js").is_file());
        assert!(dist.join("styles.min.css").is_file());
        assert_eq!(result.targets[0].target_id, "clean");
    }

    #[test]
    fn test_build_missing_script_fails_only_script() {
        let temp = site();
        fs::remove_file(temp.path().join("src/script.js")).unwrap();

        let result = pipeline(temp.path(), Mode::Production).build().unwrap();

        assert!(!result.is_success());
        assert_eq!(result.failed_ids(), vec!["script".to_string()]);
        assert!(temp.path().join("dist/index.html").is_file());
        assert!(temp.path().join("dist/styles.min.css").is_file());
    }

    #[test]
    fn test_failed_dependency_blocks_dependents() {
        let temp = site();
        let ctx = BuildContext::new(default_config(), temp.path().to_path_buf());
        let runner = BuildPipeline::new(ctx);

        let mut plan = BuildPlan::new();
        plan.add_target(BuildTarget::script("src/missing.js".to_string(), temp.path().join("dist/js")));
        plan.add_target(
            BuildTarget::html("src/*.html".to_string(), temp.path().join("dist"))
                .with_dependency("script"),
        );

        let result = runner.build_plan(&plan).unwrap();
        assert_eq!(result.failed_count(), 2);
        let html = result.get("html").unwrap();
        assert_eq!(html.status.to_string(), "failed: dependency 'script' failed");
        assert!(!temp.path().join("dist/index.html").exists());
    }

    #[test]
    fn test_run_targets_skips_clean() {
        let temp = site();
        let dist = temp.path().join("dist");
        fs::create_dir_all(&dist).unwrap();
        fs::write(dist.join("keep.txt"), "x").unwrap();

        let result = pipeline(temp.path(), Mode::Production).run_targets(&["html".to_string()]).unwrap();

        assert_eq!(result.targets.len(), 1);
        assert_eq!(result.targets[0].target_id, "html");
        assert!(dist.join("keep.txt").exists());
        assert!(dist.join("index.html").exists());
        assert!(!dist.join("styles.min.css").exists());
    }

    #[test]
    fn test_development_build_notifies_reload_sink() {
        let temp = site();
        let sink = Arc::new(RecordingSink::default());
        let ctx = BuildContext::new(default_config(), temp.path().to_path_buf())
            .with_mode(Mode::Development)
            .with_reload_sink(sink.clone());

        BuildPipeline::new(ctx).build().unwrap();

        let mut seen = sink.seen.lock().unwrap().clone();
        seen.sort();
        let dist = temp.path().join("dist");
        assert_eq!(
            seen,
            vec![dist.join("index.html"), dist.join("js/script.js"), dist.join("styles.min.css")]
        );
    }

    #[test]
    fn test_production_build_does_not_notify() {
        let temp = site();
        let sink = Arc::new(RecordingSink::default());
        let ctx = BuildContext::new(default_config(), temp.path().to_path_buf())
            .with_reload_sink(sink.clone());

        BuildPipeline::new(ctx).build().unwrap();

        assert!(sink.seen.lock().unwrap().is_empty());
    }

    #[test]
    fn test_style_error_is_warning_not_failure() {
        let temp = site();
        fs::write(temp.path().join("src/styles/main.scss"), "body { color: $nope; }").unwrap();

        let result = pipeline(temp.path(), Mode::Production).build().unwrap();

        assert!(result.is_success());
        let styles = result.get("styles").unwrap();
        assert_eq!(styles.warnings.len(), 1);
        assert!(!temp.path().join("dist/styles.min.css").exists());
    }
}
