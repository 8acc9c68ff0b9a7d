//! Build plan construction.
//!
//! Turns the configuration into the full task graph:
//! `clean` first, then styles, every image variant, vector images, pages and
//! the script, all depending only on `clean`.

use crate::build::{
    BuildContext, BuildPlan, BuildTarget, VariantEncoding, VariantSpec, CLEAN_TARGET_ID,
};
use crate::config::AssetGroup;
use std::path::Path;

/// Create the description of one responsive variant task.
///
/// Pure: the returned target only records its parameters. Source files are
/// resolved when the target executes.
pub fn make_variant_task(
    group: &str,
    width: u32,
    source_glob: &str,
    dest_dir: &Path,
    encoding: VariantEncoding,
) -> BuildTarget {
    BuildTarget::variant(
        VariantSpec { group: group.to_string(), width, encoding },
        source_glob.to_string(),
        dest_dir.to_path_buf(),
    )
    .with_dependency(CLEAN_TARGET_ID)
}

/// Expand an asset group into two independent tasks per width
/// (optimized original format and WebP), in width-list order.
pub fn generate_variants(group: &AssetGroup, out_dir: &Path) -> Vec<BuildTarget> {
    let dest = out_dir.join(&group.dest);

    group
        .widths
        .iter()
        .flat_map(|&width| {
            [VariantEncoding::Optimized, VariantEncoding::WebP].map(|encoding| {
                make_variant_task(&group.name, width, &group.source, &dest, encoding)
            })
        })
        .collect()
}

/// Create the complete build plan for a context.
pub fn create_build_plan(ctx: &BuildContext) -> BuildPlan {
    let config = ctx.config();
    let out_dir = ctx.out_dir();
    let mut plan = BuildPlan::new();

    plan.add_target(BuildTarget::clean(out_dir.clone()));

    plan.add_target(
        BuildTarget::styles(
            config.styles.entry.to_string_lossy().into_owned(),
            out_dir.join(&config.styles.output),
        )
        .with_dependency(CLEAN_TARGET_ID),
    );

    for group in &config.images.groups {
        for target in generate_variants(group, &out_dir) {
            plan.add_target(target);
        }
    }

    plan.add_target(
        BuildTarget::vector(config.images.svg.clone(), out_dir.join(&config.images.svg_dest))
            .with_dependency(CLEAN_TARGET_ID),
    );

    plan.add_target(
        BuildTarget::html(config.html.source.clone(), out_dir.join(&config.html.dest))
            .with_dependency(CLEAN_TARGET_ID),
    );

    plan.add_target(
        BuildTarget::script(config.script.source.clone(), out_dir.join(&config.script.dest))
            .with_dependency(CLEAN_TARGET_ID),
    );

    plan
}
