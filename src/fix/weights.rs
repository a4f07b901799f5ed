//! Weight-channel merging.
//!
//! Drains the merge queue the repair passes accumulated. For every
//! (source, target) pair the source channel's per-vertex weights are summed
//! into the target channel and the source channel is removed. Parent links
//! must never point at a bone whose channel has been merged away, so each
//! merge first records a reparent obligation for the source bone's children.

use std::collections::HashMap;

use log::{debug, warn};

use super::bones;
use super::repair::MergeQueue;
use crate::skeleton::{Skeleton, WeightChannels};

/// Apply every queued merge, then the accumulated reparent obligations.
/// Returns the (source, target) pairs that actually merged.
pub(super) fn apply_merges(
    skeleton: &mut Skeleton,
    channels: &mut WeightChannels,
    queue: MergeQueue,
) -> Vec<(String, String)> {
    // First obligation per child wins.
    let mut reparent: HashMap<String, String> = HashMap::new();
    let mut merged = Vec::new();

    for (source, target) in queue {
        let Some(source_index) = channels.find(&source) else {
            continue;
        };
        let source_name = channels
            .get(source_index)
            .map(|channel| channel.name.clone())
            .unwrap_or_else(|| source.clone());

        if source_name.eq_ignore_ascii_case(&target) {
            warn!("{target} tried to mix weights with itself");
            continue;
        }

        // Canonical targets get an empty channel created on demand when the
        // bone exists; anything else must already have one.
        if !channels.contains(&target) {
            if is_keep_target(&target) && skeleton.contains(&target) {
                channels.ensure(&target);
            } else {
                continue;
            }
        }

        if let Some(source_bone) = skeleton.find(&source_name) {
            for child in skeleton.children(source_bone) {
                if let Some(child_name) = skeleton.name(child) {
                    reparent
                        .entry(child_name.to_string())
                        .or_insert_with(|| target.clone());
                }
            }
        }

        if channels.merge(&source_name, &target) {
            debug!("merged weights: {source_name} -> {target}");
            merged.push((source_name, target));
        }
    }

    for (child, new_parent) in reparent {
        let (Some(child_id), Some(parent_id)) = (skeleton.find(&child), skeleton.find(&new_parent))
        else {
            continue;
        };
        if child_id != parent_id {
            skeleton.set_parent(child_id, Some(parent_id));
        }
    }

    merged
}

fn is_keep_target(name: &str) -> bool {
    bones::KEEP.iter().any(|entry| {
        entry
            .expand()
            .iter()
            .any(|keep| keep.eq_ignore_ascii_case(name))
    })
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use nalgebra::Vector3;

    use super::*;

    fn v(z: f32) -> Vector3<f32> {
        Vector3::new(0.0, 0.0, z)
    }

    #[test]
    fn given_two_channels_when_merged_then_weights_sum_and_source_disappears() {
        let mut skeleton = Skeleton::default();
        skeleton.add("Spine", None, v(1.2), v(1.4));
        let mut channels = WeightChannels::default();
        channels.set_weight("UpperBody2", 0, 0.4);
        channels.set_weight("Spine", 0, 0.3);

        let merged = apply_merges(
            &mut skeleton,
            &mut channels,
            vec![("UpperBody2".to_string(), "Spine".to_string())],
        );

        assert_eq!(
            merged,
            vec![("UpperBody2".to_string(), "Spine".to_string())]
        );
        assert!(!channels.contains("UpperBody2"));
        let spine = channels.get(channels.find("Spine").unwrap()).unwrap();
        assert!((spine.weights[&0] - 0.7).abs() < 1e-6);
    }

    #[test]
    fn given_self_merge_when_applied_then_it_is_skipped() {
        let mut skeleton = Skeleton::default();
        skeleton.add("Spine", None, v(1.2), v(1.4));
        let mut channels = WeightChannels::default();
        channels.set_weight("Spine", 0, 0.5);

        let merged = apply_merges(
            &mut skeleton,
            &mut channels,
            vec![("spine".to_string(), "Spine".to_string())],
        );

        assert!(merged.is_empty());
        assert_eq!(channels.len(), 1);
    }

    #[test]
    fn given_merged_bone_with_children_then_children_reparent_to_target() {
        let mut skeleton = Skeleton::default();
        let spine = skeleton.add("Spine", None, v(1.2), v(1.4));
        let extra = skeleton.add("Spine_1", Some(spine), v(1.4), v(1.5));
        let ribbon = skeleton.add("Ribbon", Some(extra), v(1.45), v(1.5));
        let mut channels = WeightChannels::default();
        channels.set_weight("Spine", 0, 0.5);
        channels.set_weight("Spine_1", 0, 0.5);

        apply_merges(
            &mut skeleton,
            &mut channels,
            vec![("Spine_1".to_string(), "Spine".to_string())],
        );

        assert_eq!(skeleton.get(ribbon).unwrap().parent, Some(spine));
        assert!(!channels.contains("Spine_1"));
    }

    #[test]
    fn given_missing_target_channel_on_canonical_bone_then_it_is_created() {
        let mut skeleton = Skeleton::default();
        skeleton.add("Spine", None, v(1.2), v(1.4));
        let mut channels = WeightChannels::default();
        channels.set_weight("UpperBody2", 3, 0.9);

        let merged = apply_merges(
            &mut skeleton,
            &mut channels,
            vec![("UpperBody2".to_string(), "Spine".to_string())],
        );

        assert_eq!(merged.len(), 1);
        let spine = channels.get(channels.find("Spine").unwrap()).unwrap();
        assert!((spine.weights[&3] - 0.9).abs() < 1e-6);
    }

    #[test]
    fn given_missing_source_channel_then_merge_is_silently_skipped() {
        let mut skeleton = Skeleton::default();
        skeleton.add("Spine", None, v(1.2), v(1.4));
        let mut channels = WeightChannels::default();
        channels.set_weight("Spine", 0, 1.0);

        let merged = apply_merges(
            &mut skeleton,
            &mut channels,
            vec![("Ghost".to_string(), "Spine".to_string())],
        );

        assert!(merged.is_empty());
        assert_eq!(channels.len(), 1);
    }
}
