//! Final hierarchy validation.
//!
//! Read-only: validation never mutates the skeleton. Missing bones are
//! batched into one combined, chain-grouped diagnostic; the optional
//! parenting check fails fast on the first mismatch instead.

use super::bones::HIERARCHY_CHAINS;
use crate::error::HierarchyError;
use crate::skeleton::Skeleton;

/// Check the skeleton against the required parent→child chains.
///
/// Without `strict_parenting`, every absent bone across all chains is
/// reported in one message. With it, each chain is walked and the first bone
/// whose actual parent differs from the chain's previous bone is fatal;
/// absent bones are skipped in that mode.
pub fn check_hierarchy(skeleton: &Skeleton, strict_parenting: bool) -> Result<(), HierarchyError> {
    if !strict_parenting {
        let mut missing: Vec<&str> = Vec::new();
        let mut lines: Vec<String> = Vec::new();

        for chain in HIERARCHY_CHAINS {
            let chain_missing: Vec<&str> = chain
                .iter()
                .copied()
                .filter(|bone| !missing.contains(bone) && !skeleton.contains(bone))
                .collect();
            if !chain_missing.is_empty() {
                lines.push(format!("\n - {}", chain_missing.join(", ")));
                missing.extend(chain_missing);
            }
        }

        if !missing.is_empty() {
            return Err(HierarchyError::MissingBones(lines.concat()));
        }
        return Ok(());
    }

    for chain in HIERARCHY_CHAINS {
        for (index, bone_name) in chain.iter().enumerate() {
            if index == 0 {
                continue;
            }
            let Some(bone) = skeleton.find(bone_name) else {
                continue;
            };
            let expected = chain[index - 1];

            let actual_parent = skeleton
                .get(bone)
                .and_then(|bone| bone.parent)
                .and_then(|parent| skeleton.name(parent));
            match actual_parent {
                Some(actual) if actual.eq_ignore_ascii_case(expected) => {}
                _ => {
                    return Err(HierarchyError::BadParenting {
                        bone: bone_name.to_string(),
                        expected: expected.to_string(),
                    });
                }
            }
        }
    }

    Ok(())
}

// ─── Tests ────────────────────────────────────────────────────────────────────
