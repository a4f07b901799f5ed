//! Structural repair passes over the edit-time bone set.
//!
//! Every pass is best-effort: when the bones a rule names are absent the
//! rule skips silently, since source rigs vary wildly in shape. Only the
//! terminal validator reports failure.

use log::debug;
use nalgebra::Vector3;

use super::bones::{self, SidedName};
use super::name::normalize_name;
use crate::skeleton::{BoneId, Skeleton, WeightChannels};

const NUDGE: f32 = 0.1;
const DEGENERATE_EPSILON: f32 = 1e-5;

/// Pending channel merges: (source bone name, target bone name).
pub(super) type MergeQueue = Vec<(String, String)>;

/// Running tally of what the repair run changed.
#[derive(Debug, Default)]
pub(super) struct RepairLog {
    pub renamed: usize,
    pub removed: Vec<String>,
}

// ─── Table expansion ──────────────────────────────────────────────────────────

/// Working rename/reweight tables after sided expansion, finger overrides,
/// and rename-implied reweight additions.
pub(super) struct Tables {
    pub rename: Vec<(&'static str, Vec<&'static str>)>,
    pub reweight: Vec<(&'static str, Vec<&'static str>)>,
}

pub(super) fn build_tables() -> Tables {
    let mut rename: Vec<(&'static str, Vec<&'static str>)> = Vec::new();
    for (target, sources) in bones::RENAME {
        for rule in expand_rule(target, sources) {
            upsert(&mut rename, rule);
        }
    }
    // Finger overrides win on key collision.
    for (target, sources) in bones::RENAME_FINGERS {
        for rule in expand_rule(target, sources) {
            upsert(&mut rename, rule);
        }
    }

    let mut reweight: Vec<(&'static str, Vec<&'static str>)> = Vec::new();
    for (target, sources) in bones::REWEIGHT {
        for rule in expand_rule(target, sources) {
            upsert(&mut reweight, rule);
        }
    }

    // Renames imply reweights: a source whose target name already exists
    // cannot be renamed, so its channel merges into the target instead.
    for (target, sources) in &rename {
        if *target == "Spine" {
            continue;
        }
        match reweight.iter_mut().find(|(existing, _)| existing == target) {
            Some((_, existing_sources)) => {
                for source in sources {
                    if !existing_sources.contains(source) {
                        existing_sources.push(source);
                    }
                }
            }
            None => reweight.push((target, sources.clone())),
        }
    }

    Tables { rename, reweight }
}

fn expand_rule(
    target: &SidedName,
    sources: &[SidedName],
) -> Vec<(&'static str, Vec<&'static str>)> {
    if target.is_sided() {
        vec![
            (target.left(), sources.iter().map(SidedName::left).collect()),
            (target.right(), sources.iter().map(SidedName::right).collect()),
        ]
    } else {
        vec![(target.left(), sources.iter().map(SidedName::left).collect())]
    }
}

fn upsert(
    table: &mut Vec<(&'static str, Vec<&'static str>)>,
    (target, sources): (&'static str, Vec<&'static str>),
) {
    match table.iter_mut().find(|(existing, _)| *existing == target) {
        Some(entry) => entry.1 = sources,
        None => table.push((target, sources)),
    }
}

// ─── Shared helpers ───────────────────────────────────────────────────────────

/// Rename a bone and its weight channel together, the way a host scene graph
/// keeps deform channels in sync with bone names.
pub(super) fn rename_synced(
    skeleton: &mut Skeleton,
    channels: &mut WeightChannels,
    id: BoneId,
    new_name: &str,
) {
    let Some(old) = skeleton.name(id).map(str::to_string) else {
        return;
    };
    if old == new_name {
        return;
    }
    if let Some(channel) = channels.find(&old) {
        channels.rename(channel, new_name);
    }
    skeleton.rename(id, new_name);
}

// ─── Rig detection ────────────────────────────────────────────────────────────

/// Detect rig conventions from raw (pre-normalization) bone names; the
/// normalizer strips both markers.
pub(super) fn detect_rig(skeleton: &Skeleton) -> (bool, bool) {
    let mut source_engine = false;
    let mut mixamo = false;
    for (_, bone) in skeleton.iter() {
        if bone.name.starts_with(bones::SOURCE_ENGINE_PREFIX) {
            source_engine = true;
        }
        if bone.name.to_lowercase().contains(bones::MIXAMO_MARKER) {
            mixamo = true;
        }
    }
    (source_engine, mixamo)
}

// ─── Name passes ──────────────────────────────────────────────────────────────

pub(super) fn normalize_all(skeleton: &mut Skeleton, channels: &mut WeightChannels) {
    for id in skeleton.ids() {
        let Some(raw) = skeleton.name(id).map(str::to_string) else {
            continue;
        };
        let normalized = normalize_name(&raw);
        if normalized != raw {
            rename_synced(skeleton, channels, id, &normalized);
        }
    }
}

/// Apply the conflicting-name rules: rename the trigger bone only when every
/// bone in the rule's required-present set exists.
pub(super) fn resolve_conflicts(
    skeleton: &mut Skeleton,
    channels: &mut WeightChannels,
    log: &mut RepairLog,
) {
    for (required, trigger, new_name) in bones::CONFLICTS {
        let sides: &[fn(&SidedName) -> &'static str] =
            if trigger.is_sided() || new_name.is_sided() || required.iter().any(SidedName::is_sided)
            {
                &[SidedName::left, SidedName::right]
            } else {
                &[SidedName::left]
            };

        for side in sides {
            let Some(id) = skeleton.find(side(trigger)) else {
                continue;
            };
            if required.iter().all(|name| skeleton.contains(side(name))) {
                rename_synced(skeleton, channels, id, side(new_name));
                log.renamed += 1;
            }
        }
    }
}

/// Rename bones per the working table. Bones mapping to the literal `Spine`
/// are deferred: child-bearing candidates into `spines`, childless ones into
/// `spine_parts`.
pub(super) fn rename_pass(
    skeleton: &mut Skeleton,
    channels: &mut WeightChannels,
    tables: &Tables,
    log: &mut RepairLog,
) -> (Vec<BoneId>, Vec<BoneId>) {
    let mut spines: Vec<BoneId> = Vec::new();
    let mut spine_parts: Vec<BoneId> = Vec::new();

    for (target, sources) in &tables.rename {
        for source in sources {
            let Some(id) = skeleton.find(source) else {
                continue;
            };

            if *target == "Spine" {
                if spines.contains(&id) || spine_parts.contains(&id) {
                    continue;
                }
                if skeleton.children(id).is_empty() {
                    spine_parts.push(id);
                } else {
                    spines.push(id);
                }
                continue;
            }

            match skeleton.find(target) {
                None => {
                    rename_synced(skeleton, channels, id, target);
                    log.renamed += 1;
                }
                // Only a case fixup when the match is the bone itself.
                Some(existing) if existing == id => {
                    rename_synced(skeleton, channels, id, target);
                }
                Some(_) => {}
            }
        }
    }

    (spines, spine_parts)
}

/// Recover the side of ambiguous parents (`Shoulder`, `Arm`, ...) from a
/// left/right-marked child one or two levels below.
pub(super) fn rename_unknown_sides(skeleton: &mut Skeleton, channels: &mut WeightChannels) {
    for (key, base) in bones::UNKNOWN_SIDE {
        'bones: for id in skeleton.ids() {
            let Some(bone) = skeleton.get(id) else {
                continue;
            };
            let child_name = bone.name.to_lowercase();

            let mut ancestor = bone.parent;
            for _ in 0..2 {
                let Some(ancestor_id) = ancestor else {
                    break;
                };
                let Some(ancestor_bone) = skeleton.get(ancestor_id) else {
                    break;
                };
                if ancestor_bone.name.eq_ignore_ascii_case(key) {
                    let side = if child_name.contains("right") {
                        Some("Right")
                    } else if child_name.contains("left") {
                        Some("Left")
                    } else {
                        None
                    };
                    if let Some(side) = side {
                        rename_synced(skeleton, channels, ancestor_id, &format!("{side} {base}"));
                        break 'bones;
                    }
                }
                ancestor = ancestor_bone.parent;
            }
        }
    }
}

/// Queue listed helper bones for merging into their structural parent.
pub(super) fn queue_reweight_to_parent(skeleton: &Skeleton, queue: &mut MergeQueue) {
    for entry in bones::REWEIGHT_TO_PARENT {
        for name in entry.expand() {
            let Some(id) = skeleton.find(name) else {
                continue;
            };
            let parent_name = skeleton
                .get(id)
                .and_then(|bone| bone.parent)
                .and_then(|parent| skeleton.name(parent))
                .map(str::to_string);
            if let (Some(bone_name), Some(parent_name)) =
                (skeleton.name(id).map(str::to_string), parent_name)
            {
                queue.push((bone_name, parent_name));
            }
        }
    }
}

// ─── Spine repair ─────────────────────────────────────────────────────────────

/// Decision table over the deferred spine candidates.
pub(super) fn repair_spines(
    skeleton: &mut Skeleton,
    channels: &mut WeightChannels,
    mut spines: Vec<BoneId>,
    spine_parts: Vec<BoneId>,
    source_engine: bool,
    queue: &mut MergeQueue,
    log: &mut RepairLog,
) {
    // Rigs with no upper body (like skirts) defer one childless candidate.
    if spine_parts.len() == 1 && !skeleton.contains("Neck") {
        if spines.is_empty() {
            rename_synced(skeleton, channels, spine_parts[0], "Spine");
            log.renamed += 1;
            return;
        }
        spines.push(spine_parts[0]);
    }

    match spines.len() {
        0 => {}
        1 => {
            debug!("spine repair: synthesizing chest above single spine");
            let spine = spines[0];
            let Some(spine_bone) = skeleton.get(spine).cloned() else {
                return;
            };

            let chest_top = skeleton
                .find("Neck")
                .and_then(|neck| skeleton.get(neck))
                .map(|neck| neck.head)
                .unwrap_or(spine_bone.tail);

            let mut chest_head = spine_bone.head;
            chest_head.z = spine_bone.head.z + (chest_top.z - spine_bone.head.z) / 2.0;
            chest_head.y = spine_bone.head.y + (chest_top.y - spine_bone.head.y) / 2.0;

            let former_children = skeleton.children(spine);

            rename_synced(skeleton, channels, spine, "Spine");
            log.renamed += 1;
            let chest = skeleton.add("Chest", Some(spine), chest_head, chest_top);
            if let Some(bone) = skeleton.get_mut(spine) {
                bone.tail = chest_head;
            }
            for child in former_children {
                skeleton.set_parent(child, Some(chest));
            }
        }
        2 => {
            debug!("spine repair: renaming spine pair");
            rename_synced(skeleton, channels, spines[0], "Spine");
            rename_synced(skeleton, channels, spines[1], "Chest");
            log.renamed += 2;
        }
        4 if source_engine => {
            debug!("spine repair: source engine four-bone chain");
            let spine = spines[0];
            let chest = spines[2];

            let merge_lower = skeleton.name(spines[1]).map(str::to_string);
            let merge_upper = skeleton.name(spines[3]).map(str::to_string);

            rename_synced(skeleton, channels, chest, "Chest");
            rename_synced(skeleton, channels, spine, "Spine");
            log.renamed += 2;

            let chest_head = skeleton.get(chest).map(|bone| bone.head);
            if let (Some(bone), Some(chest_head)) = (skeleton.get_mut(spine), chest_head) {
                bone.tail = chest_head;
            }

            if let Some(name) = merge_lower {
                queue.push((name, "Spine".to_string()));
            }
            if let Some(name) = merge_upper {
                queue.push((name, "Chest".to_string()));
            }
        }
        count if count > 2 => {
            debug!("spine repair: merging {count} stacked spines");
            let spine = spines[0];
            let chest = spines[count - 1];

            let interior: Vec<String> = spines[1..count - 1]
                .iter()
                .filter_map(|id| skeleton.name(*id).map(str::to_string))
                .collect();

            rename_synced(skeleton, channels, spine, "Spine");
            rename_synced(skeleton, channels, chest, "Chest");
            log.renamed += 2;

            let chest_head = skeleton.get(chest).map(|bone| bone.head);
            if let (Some(bone), Some(chest_head)) = (skeleton.get_mut(spine), chest_head) {
                bone.tail = chest_head;
            }

            for name in interior {
                queue.push((name, "Spine".to_string()));
            }
        }
        _ => {}
    }
}

// ─── Neck / head ──────────────────────────────────────────────────────────────

/// Synthesize a neck spanning chest tail → head head when both exist.
pub(super) fn synthesize_neck(skeleton: &mut Skeleton) {
    if skeleton.contains("Neck") {
        return;
    }
    let (Some(chest), Some(head)) = (skeleton.find("Chest"), skeleton.find("Head")) else {
        return;
    };
    let (Some(chest_bone), Some(head_bone)) = (skeleton.get(chest), skeleton.get(head)) else {
        return;
    };

    let neck_head = chest_bone.tail;
    let mut neck_tail = head_bone.head;
    if neck_head.z == neck_tail.z {
        neck_tail.z += NUDGE;
    }

    let neck = skeleton.add("Neck", Some(chest), neck_head, neck_tail);
    skeleton.set_parent(head, Some(neck));
}

/// Force the head bone upright: tail directly above head.
pub(super) fn straighten_head(skeleton: &mut Skeleton) {
    let Some(head) = skeleton.find("Head") else {
        return;
    };
    if let Some(bone) = skeleton.get_mut(head) {
        bone.tail.x = bone.head.x;
        bone.tail.y = bone.head.y;
        if bone.tail.z < bone.head.z {
            bone.tail.z = bone.head.z + NUDGE;
        }
    }
}

// ─── Hips / legs ──────────────────────────────────────────────────────────────

/// Geometric hip correction. Requires the full leg chain; in
/// full-body-tracking mode the hips flip downward and new top-level leg
/// stubs take over the original legs' place.
pub(super) fn fix_hips(
    skeleton: &mut Skeleton,
    channels: &mut WeightChannels,
    full_body_tracking: bool,
    mixamo: bool,
) {
    if mixamo {
        return;
    }
    let (Some(hips), Some(spine), Some(left_leg), Some(right_leg)) = (
        skeleton.find("Hips"),
        skeleton.find("Spine"),
        skeleton.find("Left leg"),
        skeleton.find("Right leg"),
    ) else {
        return;
    };

    let spine_head = skeleton.get(spine).map(|bone| bone.head);
    let left_head = skeleton.get(left_leg).map(|bone| bone.head);
    let right_head = skeleton.get(right_leg).map(|bone| bone.head);
    let (Some(spine_head), Some(left_head), Some(right_head)) = (spine_head, left_head, right_head)
    else {
        return;
    };

    if !full_body_tracking {
        if let Some(bone) = skeleton.get_mut(hips) {
            // Center the hips between the legs, aligned to the leg depth.
            let middle_x = (right_head.x + left_head.x) / 2.0;
            bone.head.x = middle_x;
            bone.tail.x = middle_x;
            bone.head.y = right_head.y;
            bone.tail.y = right_head.y;
            bone.head.z = right_head.z;
            bone.tail.z = spine_head.z;
            if bone.tail.z < bone.head.z {
                bone.tail.z += NUDGE;
            }
        }
        return;
    }

    let (Some(left_knee), Some(right_knee)) =
        (skeleton.find("Left knee"), skeleton.find("Right knee"))
    else {
        return;
    };

    let mut new_hips_head = None;
    if let Some(bone) = skeleton.get_mut(hips) {
        bone.head.x = 0.0;
        bone.head.z = spine_head.z;
        bone.tail = Vector3::new(0.0, bone.head.y, right_head.z);
        new_hips_head = Some(bone.head);
    }
    if let (Some(bone), Some(head)) = (skeleton.get_mut(spine), new_hips_head) {
        bone.head = head;
    }

    // The original legs become children of fresh top-level stubs.
    rename_synced(skeleton, channels, left_leg, "Left leg 2");
    rename_synced(skeleton, channels, right_leg, "Right leg 2");

    let left_top = skeleton.add(
        "Left leg",
        Some(hips),
        left_head,
        left_head + Vector3::new(0.0, 0.0, NUDGE),
    );
    let right_top = skeleton.add(
        "Right leg",
        Some(hips),
        right_head,
        right_head + Vector3::new(0.0, 0.0, NUDGE),
    );

    skeleton.set_parent(left_leg, Some(left_top));
    skeleton.set_parent(right_leg, Some(right_top));
    skeleton.set_parent(left_knee, Some(left_top));
    skeleton.set_parent(right_knee, Some(right_top));
}

// ─── Structure passes ─────────────────────────────────────────────────────────

/// Make `Hips` the single root and gather every other parentless bone
/// under it.
pub(super) fn reparent_roots(skeleton: &mut Skeleton) {
    let Some(hips) = skeleton.find("Hips") else {
        return;
    };
    skeleton.set_parent(hips, None);
    for id in skeleton.ids() {
        if id != hips && skeleton.get(id).map(|bone| bone.parent.is_none()) == Some(true) {
            skeleton.set_parent(id, Some(hips));
        }
    }
}

/// Remove cosmetic/placeholder bones. A bone that carries its own weight
/// channel alongside its parent's defers to the merge queue instead.
pub(super) fn remove_cosmetic(
    skeleton: &mut Skeleton,
    channels: &WeightChannels,
    queue: &mut MergeQueue,
    log: &mut RepairLog,
) {
    for id in skeleton.ids() {
        let Some(bone) = skeleton.get(id) else {
            continue;
        };
        let name = bone.name.clone();
        let lower = name.to_lowercase();

        let listed = bones::COSMETIC
            .iter()
            .any(|cosmetic| cosmetic.eq_ignore_ascii_case(&name))
            || bones::COSMETIC_PREFIXES
                .iter()
                .any(|prefix| lower.starts_with(&prefix.to_lowercase()));
        if !listed {
            continue;
        }

        let parent_name = bone
            .parent
            .and_then(|parent| skeleton.name(parent))
            .map(str::to_string);
        match parent_name {
            Some(parent_name) if channels.contains(&name) && channels.contains(&parent_name) => {
                queue.push((name, parent_name));
            }
            _ => {
                log.removed.push(name);
                skeleton.remove(id);
            }
        }
    }
}

/// Queue every descendant of the eye bones for merging into the eye.
pub(super) fn queue_eye_children(skeleton: &Skeleton, queue: &mut MergeQueue) {
    for eye_name in ["Eye_L", "Eye_R"] {
        let Some(eye) = skeleton.find(eye_name) else {
            continue;
        };
        let Some(eye_name) = skeleton.name(eye).map(str::to_string) else {
            continue;
        };
        for descendant in skeleton.descendants(eye) {
            if let Some(name) = skeleton.name(descendant) {
                queue.push((name.to_string(), eye_name.clone()));
            }
        }
    }
}

/// No bone may end up with head == tail; nudge the tail along the up-axis.
/// The root hip bone points downward in full-body-tracking mode.
pub(super) fn nudge_degenerate(skeleton: &mut Skeleton, full_body_tracking: bool) {
    for id in skeleton.ids() {
        let Some(bone) = skeleton.get(id) else {
            continue;
        };
        let delta = bone.head - bone.tail;
        let degenerate = delta.x.abs() < DEGENERATE_EPSILON
            && delta.y.abs() < DEGENERATE_EPSILON
            && delta.z.abs() < DEGENERATE_EPSILON;
        if !degenerate {
            continue;
        }

        let is_fbt_hips = full_body_tracking && bone.name == "Hips";
        if let Some(bone) = skeleton.get_mut(id) {
            if is_fbt_hips {
                bone.tail.z -= NUDGE;
            } else {
                bone.tail.z += NUDGE;
            }
        }
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn v(x: f32, y: f32, z: f32) -> Vector3<f32> {
        Vector3::new(x, y, z)
    }

    fn log() -> RepairLog {
        RepairLog::default()
    }

    #[test]
    fn given_single_spine_and_neck_when_repaired_then_chest_is_synthesized() {
        let mut skeleton = Skeleton::default();
        let hips = skeleton.add("Hips", None, v(0.0, 0.0, 1.0), v(0.0, 0.0, 1.2));
        let spine = skeleton.add("UpperBody", Some(hips), v(0.0, 0.0, 1.2), v(0.0, 0.0, 1.6));
        let neck = skeleton.add("Neck", Some(spine), v(0.0, 0.0, 1.6), v(0.0, 0.0, 1.7));
        let arm = skeleton.add("Left arm", Some(spine), v(0.2, 0.0, 1.55), v(0.5, 0.0, 1.55));
        let mut channels = WeightChannels::default();

        repair_spines(
            &mut skeleton,
            &mut channels,
            vec![spine],
            vec![],
            false,
            &mut Vec::new(),
            &mut log(),
        );

        let spine_id = skeleton.find("Spine").expect("spine");
        let chest_id = skeleton.find("Chest").expect("chest");
        assert_eq!(spine_id, spine);
        assert_eq!(skeleton.get(chest_id).unwrap().parent, Some(spine_id));

        // Chest spans halfway up the old spine toward the neck head.
        let chest = skeleton.get(chest_id).unwrap();
        assert!((chest.head.z - 1.4).abs() < 1e-6);
        assert_eq!(chest.tail.z, 1.6);

        // Former children of the old spine now hang off the chest.
        assert_eq!(skeleton.get(neck).unwrap().parent, Some(chest_id));
        assert_eq!(skeleton.get(arm).unwrap().parent, Some(chest_id));
        // The spine's tail meets the chest's head.
        assert_eq!(skeleton.get(spine_id).unwrap().tail, chest.head);
    }

    #[test]
    fn given_two_spines_when_repaired_then_pair_is_renamed_in_place() {
        let mut skeleton = Skeleton::default();
        let lower = skeleton.add("UpperBody", None, v(0.0, 0.0, 1.2), v(0.0, 0.0, 1.4));
        let upper = skeleton.add("UpperBody2", Some(lower), v(0.0, 0.0, 1.4), v(0.0, 0.0, 1.6));
        let mut channels = WeightChannels::default();

        repair_spines(
            &mut skeleton,
            &mut channels,
            vec![lower, upper],
            vec![],
            false,
            &mut Vec::new(),
            &mut log(),
        );

        assert_eq!(skeleton.find("Spine"), Some(lower));
        assert_eq!(skeleton.find("Chest"), Some(upper));
    }

    #[test]
    fn given_four_spines_on_source_rig_when_repaired_then_two_merges_are_queued() {
        let mut skeleton = Skeleton::default();
        let mut ids = Vec::new();
        let mut parent = None;
        for (index, name) in ["Bip_Spine", "Bip_Spine1", "Bip_Spine2", "Bip_Spine4"]
            .iter()
            .enumerate()
        {
            let z = 1.0 + index as f32 * 0.2;
            let id = skeleton.add(*name, parent, v(0.0, 0.0, z), v(0.0, 0.0, z + 0.2));
            parent = Some(id);
            ids.push(id);
        }
        let mut channels = WeightChannels::default();
        let mut queue = Vec::new();

        repair_spines(
            &mut skeleton,
            &mut channels,
            ids.clone(),
            vec![],
            true,
            &mut queue,
            &mut log(),
        );

        assert_eq!(skeleton.find("Spine"), Some(ids[0]));
        assert_eq!(skeleton.find("Chest"), Some(ids[2]));
        assert_eq!(
            queue,
            vec![
                ("Bip_Spine1".to_string(), "Spine".to_string()),
                ("Bip_Spine4".to_string(), "Chest".to_string()),
            ]
        );
    }

    #[test]
    fn given_many_spines_on_generic_rig_when_repaired_then_interior_merges_into_spine() {
        let mut skeleton = Skeleton::default();
        let mut ids = Vec::new();
        let mut parent = None;
        for index in 0..5 {
            let z = 1.0 + index as f32 * 0.2;
            let id = skeleton.add(
                format!("Spine_{index}"),
                parent,
                v(0.0, 0.0, z),
                v(0.0, 0.0, z + 0.2),
            );
            parent = Some(id);
            ids.push(id);
        }
        let mut channels = WeightChannels::default();
        let mut queue = Vec::new();

        repair_spines(
            &mut skeleton,
            &mut channels,
            ids.clone(),
            vec![],
            false,
            &mut queue,
            &mut log(),
        );

        assert_eq!(skeleton.find("Spine"), Some(ids[0]));
        assert_eq!(skeleton.find("Chest"), Some(ids[4]));
        assert_eq!(queue.len(), 3);
        assert!(queue.iter().all(|(_, target)| target == "Spine"));
    }

    #[test]
    fn given_missing_neck_when_synthesized_then_it_spans_chest_to_head() {
        let mut skeleton = Skeleton::default();
        let chest = skeleton.add("Chest", None, v(0.0, 0.0, 1.4), v(0.0, 0.0, 1.6));
        let head = skeleton.add("Head", Some(chest), v(0.0, 0.0, 1.7), v(0.0, 0.0, 1.9));

        synthesize_neck(&mut skeleton);

        let neck = skeleton.find("Neck").expect("neck");
        let neck_bone = skeleton.get(neck).unwrap();
        assert_eq!(neck_bone.head.z, 1.6);
        assert_eq!(neck_bone.tail.z, 1.7);
        assert_eq!(neck_bone.parent, Some(chest));
        assert_eq!(skeleton.get(head).unwrap().parent, Some(neck));
    }

    #[test]
    fn given_tilted_head_when_straightened_then_tail_sits_above_head() {
        let mut skeleton = Skeleton::default();
        let head = skeleton.add("Head", None, v(0.0, 0.0, 1.7), v(0.1, 0.2, 1.6));

        straighten_head(&mut skeleton);

        let bone = skeleton.get(head).unwrap();
        assert_eq!(bone.tail.x, 0.0);
        assert_eq!(bone.tail.y, 0.0);
        assert!((bone.tail.z - 1.8).abs() < 1e-6);
    }

    #[test]
    fn given_parentless_bones_when_roots_reparented_then_hips_is_single_root() {
        let mut skeleton = Skeleton::default();
        let hips = skeleton.add("Hips", None, v(0.0, 0.0, 1.0), v(0.0, 0.0, 1.2));
        let stray = skeleton.add("Skirt", None, v(0.0, 0.0, 0.9), v(0.0, 0.0, 0.7));

        reparent_roots(&mut skeleton);

        assert_eq!(skeleton.roots(), vec![hips]);
        assert_eq!(skeleton.get(stray).unwrap().parent, Some(hips));
    }

    #[test]
    fn given_offset_hips_when_fixed_then_they_recenter_between_the_legs() {
        let mut skeleton = Skeleton::default();
        let hips = skeleton.add("Hips", None, v(0.3, 0.2, 0.9), v(0.3, 0.2, 0.7));
        skeleton.add("Spine", Some(hips), v(0.0, 0.0, 1.2), v(0.0, 0.0, 1.4));
        skeleton.add("Left leg", Some(hips), v(0.1, 0.05, 1.0), v(0.1, 0.05, 0.5));
        skeleton.add(
            "Right leg",
            Some(hips),
            v(-0.1, 0.05, 1.0),
            v(-0.1, 0.05, 0.5),
        );
        let mut channels = WeightChannels::default();

        fix_hips(&mut skeleton, &mut channels, false, false);

        let bone = skeleton.get(hips).unwrap();
        assert_eq!(bone.head.x, 0.0);
        assert_eq!(bone.tail.x, 0.0);
        assert_eq!(bone.head.y, 0.05);
        assert_eq!(bone.head.z, 1.0);
        assert_eq!(bone.tail.z, 1.2);
    }

    #[test]
    fn given_full_body_tracking_when_hips_fixed_then_leg_stubs_take_over() {
        let mut skeleton = Skeleton::default();
        let hips = skeleton.add("Hips", None, v(0.0, 0.0, 1.0), v(0.0, 0.0, 1.2));
        skeleton.add("Spine", Some(hips), v(0.0, 0.0, 1.2), v(0.0, 0.0, 1.4));
        let left_leg = skeleton.add("Left leg", Some(hips), v(0.1, 0.0, 1.0), v(0.1, 0.0, 0.6));
        let right_leg = skeleton.add(
            "Right leg",
            Some(hips),
            v(-0.1, 0.0, 1.0),
            v(-0.1, 0.0, 0.6),
        );
        let left_knee = skeleton.add(
            "Left knee",
            Some(left_leg),
            v(0.1, 0.0, 0.6),
            v(0.1, 0.0, 0.2),
        );
        skeleton.add(
            "Right knee",
            Some(right_leg),
            v(-0.1, 0.0, 0.6),
            v(-0.1, 0.0, 0.2),
        );
        let mut channels = WeightChannels::default();
        channels.set_weight("Left leg", 0, 1.0);

        fix_hips(&mut skeleton, &mut channels, true, false);

        // Originals renamed, stubs took the canonical names and the knees.
        assert_eq!(skeleton.find("Left leg 2"), Some(left_leg));
        let stub = skeleton.find("Left leg").expect("stub");
        assert_ne!(stub, left_leg);
        assert_eq!(skeleton.get(left_leg).unwrap().parent, Some(stub));
        assert_eq!(skeleton.get(left_knee).unwrap().parent, Some(stub));
        assert_eq!(skeleton.get(stub).unwrap().parent, Some(hips));
        // Channel followed the rename.
        assert!(channels.contains("Left leg 2"));
        // Hips point downward toward the legs.
        let hips_bone = skeleton.get(hips).unwrap();
        assert_eq!(hips_bone.head.z, 1.2);
        assert_eq!(hips_bone.tail.z, 1.0);
    }

    #[test]
    fn given_conflicting_hip_bones_when_resolved_then_sided_hips_become_legs() {
        let mut skeleton = Skeleton::default();
        skeleton.add("Hip_L", None, v(0.1, 0.0, 1.0), v(0.1, 0.0, 0.6));
        skeleton.add("Hip_R", None, v(-0.1, 0.0, 1.0), v(-0.1, 0.0, 0.6));
        skeleton.add("Knee_L", None, v(0.1, 0.0, 0.6), v(0.1, 0.0, 0.2));
        skeleton.add("Knee_R", None, v(-0.1, 0.0, 0.6), v(-0.1, 0.0, 0.2));
        let mut channels = WeightChannels::default();

        resolve_conflicts(&mut skeleton, &mut channels, &mut log());

        assert!(skeleton.contains("Leg_L"));
        assert!(skeleton.contains("Leg_R"));
        assert!(!skeleton.contains("Hip_L"));
    }

    #[test]
    fn given_unsided_shoulder_when_child_is_marked_then_side_is_recovered() {
        let mut skeleton = Skeleton::default();
        let shoulder = skeleton.add("Shoulder", None, v(0.2, 0.0, 1.5), v(0.3, 0.0, 1.5));
        skeleton.add(
            "Left_Arm",
            Some(shoulder),
            v(0.3, 0.0, 1.5),
            v(0.6, 0.0, 1.5),
        );
        let mut channels = WeightChannels::default();

        rename_unknown_sides(&mut skeleton, &mut channels);

        assert_eq!(skeleton.name(shoulder), Some("Left shoulder"));
    }

    #[test]
    fn given_degenerate_bones_when_nudged_then_tails_move_along_up_axis() {
        let mut skeleton = Skeleton::default();
        let flat = skeleton.add("Ornament", None, v(0.5, 0.5, 0.5), v(0.5, 0.5, 0.5));
        let hips = skeleton.add("Hips", None, v(0.0, 0.0, 1.0), v(0.0, 0.0, 1.0));

        nudge_degenerate(&mut skeleton, true);

        assert!((skeleton.get(flat).unwrap().tail.z - 0.6).abs() < 1e-6);
        // FBT hips nudge downward instead.
        assert!((skeleton.get(hips).unwrap().tail.z - 0.9).abs() < 1e-6);
    }

    #[test]
    fn given_cosmetic_bones_when_removed_then_weighted_ones_defer_to_merge() {
        let mut skeleton = Skeleton::default();
        let hips = skeleton.add("Hips", None, v(0.0, 0.0, 1.0), v(0.0, 0.0, 1.2));
        skeleton.add("Center", Some(hips), v(0.0, 0.0, 0.8), v(0.0, 0.0, 0.6));
        let eyes = skeleton.add("Eyes", Some(hips), v(0.0, 0.0, 1.6), v(0.0, 0.0, 1.7));
        let mut channels = WeightChannels::default();
        channels.set_weight("Eyes", 0, 0.5);
        channels.set_weight("Hips", 0, 0.5);

        let mut queue = Vec::new();
        let mut repair_log = log();
        remove_cosmetic(&mut skeleton, &channels, &mut queue, &mut repair_log);

        // Center had no channel and is gone; Eyes carries weights and defers.
        assert!(!skeleton.contains("Center"));
        assert!(skeleton.get(eyes).is_some());
        assert_eq!(queue, vec![("Eyes".to_string(), "Hips".to_string())]);
        assert_eq!(repair_log.removed, vec!["Center".to_string()]);
    }

    #[test]
    fn given_childless_spine_part_without_neck_when_repaired_then_it_becomes_spine() {
        let mut skeleton = Skeleton::default();
        let part = skeleton.add("UpperBody", None, v(0.0, 0.0, 1.0), v(0.0, 0.0, 1.2));
        let mut channels = WeightChannels::default();

        repair_spines(
            &mut skeleton,
            &mut channels,
            vec![],
            vec![part],
            false,
            &mut Vec::new(),
            &mut log(),
        );

        assert_eq!(skeleton.find("Spine"), Some(part));
        assert!(!skeleton.contains("Chest"));
    }
}
