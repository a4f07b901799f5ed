//! Skeleton canonicalization pipeline.
//!
//! Takes the host's bone hierarchy and weight channels (mapped into
//! [`crate::skeleton`] structures), rewrites them into the canonical humanoid
//! skeleton, and reports what changed plus the final validation outcome.
//! Repair never aborts mid-run; rule preconditions that fail are silent
//! skips, and only the terminal validator surfaces diagnostics.

mod bones;
mod name;
mod repair;
pub mod validation;
mod weights;

use log::{debug, info};
use serde::Serialize;

pub use name::normalize_name;
pub use validation::check_hierarchy;

use crate::skeleton::{Skeleton, WeightChannels};
use repair::{MergeQueue, RepairLog};

/// Fix-run options.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct FixOptions {
    /// Synthesize top-level leg stubs and flip the hips downward for
    /// full-body tracking setups.
    pub full_body_tracking: bool,
    /// Also verify parent links chain by chain after repair.
    pub strict_parenting: bool,
}

/// What a fix run changed, plus the validator's verdict.
#[derive(Debug, Clone, Serialize)]
pub struct FixReport {
    pub source_engine: bool,
    pub mixamo: bool,
    pub bone_count: usize,
    pub renamed_bones: usize,
    pub removed_bones: Vec<String>,
    pub merged_channels: Vec<(String, String)>,
    pub hierarchy_ok: bool,
    pub hierarchy_message: String,
}

/// Normalize an arbitrary humanoid skeleton in place.
///
/// Both structures are mutated directly; the caller maps them back into its
/// scene graph afterwards. Not reentrant: a second fix run against the same
/// structures must not start before the first returns.
pub fn fix_armature(
    skeleton: &mut Skeleton,
    channels: &mut WeightChannels,
    options: &FixOptions,
) -> FixReport {
    let (source_engine, mixamo) = repair::detect_rig(skeleton);
    info!(
        "fixing model: {} bones, {} channels, source_engine={source_engine}, mixamo={mixamo}",
        skeleton.len(),
        channels.len()
    );

    let tables = repair::build_tables();
    let mut log = RepairLog::default();
    let mut queue: MergeQueue = Vec::new();

    repair::normalize_all(skeleton, channels);
    repair::resolve_conflicts(skeleton, channels, &mut log);
    let (spines, spine_parts) = repair::rename_pass(skeleton, channels, &tables, &mut log);
    debug!(
        "deferred spine candidates: {} (+{} childless)",
        spines.len(),
        spine_parts.len()
    );
    repair::rename_unknown_sides(skeleton, channels);

    // Table-driven merges run ahead of the obligations repair accumulates.
    for (target, sources) in &tables.reweight {
        for source in sources {
            queue.push((source.to_string(), target.to_string()));
        }
    }
    repair::queue_reweight_to_parent(skeleton, &mut queue);

    repair::repair_spines(
        skeleton,
        channels,
        spines,
        spine_parts,
        source_engine,
        &mut queue,
        &mut log,
    );
    repair::synthesize_neck(skeleton);
    repair::straighten_head(skeleton);
    repair::fix_hips(skeleton, channels, options.full_body_tracking, mixamo);
    repair::reparent_roots(skeleton);
    repair::remove_cosmetic(skeleton, channels, &mut queue, &mut log);
    repair::queue_eye_children(skeleton, &mut queue);
    repair::nudge_degenerate(skeleton, options.full_body_tracking);

    let merged = weights::apply_merges(skeleton, channels, queue);

    let validation = validation::check_hierarchy(skeleton, options.strict_parenting);
    let (hierarchy_ok, hierarchy_message) = match validation {
        Ok(()) => (true, String::new()),
        Err(error) => (false, error.to_string()),
    };
    if hierarchy_ok {
        info!("model successfully fixed");
    } else {
        info!("hierarchy validation failed: {hierarchy_message}");
    }

    FixReport {
        source_engine,
        mixamo,
        bone_count: skeleton.len(),
        renamed_bones: log.renamed,
        removed_bones: log.removed,
        merged_channels: merged,
        hierarchy_ok,
        hierarchy_message,
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
