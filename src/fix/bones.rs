//! Canonical bone tables.
//!
//! Targets use the canonical skeleton convention downstream avatar platforms
//! expect (`Hips`, `Spine`, `Chest`, `Neck`, `Head`, `Left arm`, ...).
//! Sources are the legacy names the normalizer produces for MMD, Source
//! engine, Mixamo and VRM rigs (vendor prefixes already stripped, so Source
//! bones appear as `Bip_*`). Matching is case-insensitive throughout.

/// A table name that applies as-is or carries explicit left/right variants.
///
/// Sided entries expand into two concrete rules before matching; a `Single`
/// source under a sided target applies unchanged to both sides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SidedName {
    Single(&'static str),
    Sided(&'static str, &'static str),
}

impl SidedName {
    pub fn left(&self) -> &'static str {
        match self {
            Self::Single(name) => name,
            Self::Sided(left, _) => left,
        }
    }

    pub fn right(&self) -> &'static str {
        match self {
            Self::Single(name) => name,
            Self::Sided(_, right) => right,
        }
    }

    pub fn is_sided(&self) -> bool {
        matches!(self, Self::Sided(..))
    }

    /// Concrete names this entry stands for (one or two).
    pub fn expand(&self) -> Vec<&'static str> {
        match self {
            Self::Single(name) => vec![name],
            Self::Sided(left, right) => vec![left, right],
        }
    }
}

use SidedName::{Sided, Single};

// ─── Rename tables ────────────────────────────────────────────────────────────

/// Canonical target → legacy source names. Bones that would rename to the
/// literal `Spine` are deferred into the spine-repair candidate lists
/// instead of being renamed immediately.
pub const RENAME: &[(SidedName, &[SidedName])] = &[
    (
        Single("Hips"),
        &[
            Single("Pelvis"),
            Single("Bip_Pelvis"),
            Single("Hip"),
            Single("LowerBody"),
            Single("Lower_Body"),
            Single("Hip_Master"),
            Single("Seat"),
        ],
    ),
    (
        Single("Spine"),
        &[
            Single("Spine"),
            Single("Spine_1"),
            Single("Spine1"),
            Single("Spine2"),
            Single("Spine3"),
            Single("Torso"),
            Single("UpperBody"),
            Single("Upper_Body"),
            Single("UpperBody2"),
            Single("Upper_Body_2"),
            Single("UpperBody3"),
            Single("Bip_Spine"),
            Single("Bip_Spine1"),
            Single("Bip_Spine2"),
            Single("Bip_Spine4"),
        ],
    ),
    (
        Single("Chest"),
        &[Single("Chest"), Single("Bust"), Single("Thorax")],
    ),
    (
        Single("Neck"),
        &[
            Single("Neck"),
            Single("Bip_Neck"),
            Single("Bip_Neck1"),
            Single("Neck_1"),
        ],
    ),
    (
        Single("Head"),
        &[
            Single("Head"),
            Single("Bip_Head"),
            Single("Bip_Head1"),
            Single("Head_1"),
        ],
    ),
    (
        Sided("Left shoulder", "Right shoulder"),
        &[
            Sided("Shoulder_L", "Shoulder_R"),
            Sided("L_Shoulder", "R_Shoulder"),
            Sided("LeftShoulder", "RightShoulder"),
            Sided("Left_Shoulder", "Right_Shoulder"),
            Sided("Shoulder_Left", "Shoulder_Right"),
            Sided("Clavicle_L", "Clavicle_R"),
            Sided("Bip_L_Clavicle", "Bip_R_Clavicle"),
            Sided("Left_Collar", "Right_Collar"),
            Sided("LeftCollar", "RightCollar"),
        ],
    ),
    (
        Sided("Left arm", "Right arm"),
        &[
            Sided("Arm_L", "Arm_R"),
            Sided("L_Arm", "R_Arm"),
            Sided("LeftArm", "RightArm"),
            Sided("Left_Arm", "Right_Arm"),
            Sided("UpperArm_L", "UpperArm_R"),
            Sided("Upper_Arm_L", "Upper_Arm_R"),
            Sided("LeftUpperArm", "RightUpperArm"),
            Sided("Bip_L_UpperArm", "Bip_R_UpperArm"),
        ],
    ),
    (
        Sided("Left elbow", "Right elbow"),
        &[
            Sided("Elbow_L", "Elbow_R"),
            Sided("L_Elbow", "R_Elbow"),
            Sided("Left_Elbow", "Right_Elbow"),
            Sided("LowerArm_L", "LowerArm_R"),
            Sided("Forearm_L", "Forearm_R"),
            Sided("LeftForeArm", "RightForeArm"),
            Sided("LeftLowerArm", "RightLowerArm"),
            Sided("Bip_L_Forearm", "Bip_R_Forearm"),
        ],
    ),
    (
        Sided("Left wrist", "Right wrist"),
        &[
            Sided("Wrist_L", "Wrist_R"),
            Sided("L_Wrist", "R_Wrist"),
            Sided("Left_Wrist", "Right_Wrist"),
            Sided("Hand_L", "Hand_R"),
            Sided("LeftHand", "RightHand"),
            Sided("Bip_L_Hand", "Bip_R_Hand"),
            Sided("Hand_Extra_L", "Hand_Extra_R"),
        ],
    ),
    (
        Sided("Left leg", "Right leg"),
        &[
            Sided("Leg_L", "Leg_R"),
            Sided("L_Leg", "R_Leg"),
            Sided("Left_Leg", "Right_Leg"),
            Sided("UpperLeg_L", "UpperLeg_R"),
            Sided("Thigh_L", "Thigh_R"),
            Sided("LeftUpLeg", "RightUpLeg"),
            Sided("LeftUpperLeg", "RightUpperLeg"),
            Sided("Bip_L_Thigh", "Bip_R_Thigh"),
        ],
    ),
    (
        Sided("Left knee", "Right knee"),
        &[
            Sided("Knee_L", "Knee_R"),
            Sided("L_Knee", "R_Knee"),
            Sided("Left_Knee", "Right_Knee"),
            Sided("LowerLeg_L", "LowerLeg_R"),
            Sided("Calf_L", "Calf_R"),
            Sided("Shin_L", "Shin_R"),
            Sided("LeftLeg", "RightLeg"),
            Sided("LeftLowerLeg", "RightLowerLeg"),
            Sided("Bip_L_Calf", "Bip_R_Calf"),
        ],
    ),
    (
        Sided("Left ankle", "Right ankle"),
        &[
            Sided("Ankle_L", "Ankle_R"),
            Sided("L_Ankle", "R_Ankle"),
            Sided("Left_Ankle", "Right_Ankle"),
            Sided("Foot_L", "Foot_R"),
            Sided("LeftFoot", "RightFoot"),
            Sided("Bip_L_Foot", "Bip_R_Foot"),
        ],
    ),
    (
        Sided("Left toe", "Right toe"),
        &[
            Sided("Toe_L", "Toe_R"),
            Sided("L_Toe", "R_Toe"),
            Sided("Left_Toe", "Right_Toe"),
            Sided("ToeBase_L", "ToeBase_R"),
            Sided("LeftToeBase", "RightToeBase"),
            Sided("LeftToes", "RightToes"),
            Sided("Bip_L_Toe0", "Bip_R_Toe0"),
        ],
    ),
    (
        Sided("Eye_L", "Eye_R"),
        &[
            Sided("Left_Eye", "Right_Eye"),
            Sided("LeftEye", "RightEye"),
            Sided("Eye_Left", "Eye_Right"),
        ],
    ),
];

/// Finger overrides, merged over [`RENAME`] with later-wins key collisions.
pub const RENAME_FINGERS: &[(SidedName, &[SidedName])] = &[
    (
        Sided("Thumb0_L", "Thumb0_R"),
        &[
            Sided("LeftThumbProximal", "RightThumbProximal"),
            Sided("Thumb_Proximal_L", "Thumb_Proximal_R"),
            Sided("LeftHandThumb1", "RightHandThumb1"),
            Sided("Bip_L_Finger0", "Bip_R_Finger0"),
        ],
    ),
    (
        Sided("Thumb1_L", "Thumb1_R"),
        &[
            Sided("LeftThumbIntermediate", "RightThumbIntermediate"),
            Sided("Thumb_Intermediate_L", "Thumb_Intermediate_R"),
            Sided("LeftHandThumb2", "RightHandThumb2"),
            Sided("Bip_L_Finger01", "Bip_R_Finger01"),
        ],
    ),
    (
        Sided("Thumb2_L", "Thumb2_R"),
        &[
            Sided("LeftThumbDistal", "RightThumbDistal"),
            Sided("Thumb_Distal_L", "Thumb_Distal_R"),
            Sided("LeftHandThumb3", "RightHandThumb3"),
            Sided("Bip_L_Finger02", "Bip_R_Finger02"),
        ],
    ),
    (
        Sided("IndexFinger1_L", "IndexFinger1_R"),
        &[
            Sided("LeftIndexProximal", "RightIndexProximal"),
            Sided("Index_Proximal_L", "Index_Proximal_R"),
            Sided("LeftHandIndex1", "RightHandIndex1"),
            Sided("Bip_L_Finger1", "Bip_R_Finger1"),
        ],
    ),
    (
        Sided("IndexFinger2_L", "IndexFinger2_R"),
        &[
            Sided("LeftIndexIntermediate", "RightIndexIntermediate"),
            Sided("Index_Intermediate_L", "Index_Intermediate_R"),
            Sided("LeftHandIndex2", "RightHandIndex2"),
            Sided("Bip_L_Finger11", "Bip_R_Finger11"),
        ],
    ),
    (
        Sided("IndexFinger3_L", "IndexFinger3_R"),
        &[
            Sided("LeftIndexDistal", "RightIndexDistal"),
            Sided("Index_Distal_L", "Index_Distal_R"),
            Sided("LeftHandIndex3", "RightHandIndex3"),
            Sided("Bip_L_Finger12", "Bip_R_Finger12"),
        ],
    ),
    (
        Sided("MiddleFinger1_L", "MiddleFinger1_R"),
        &[
            Sided("LeftMiddleProximal", "RightMiddleProximal"),
            Sided("Middle_Proximal_L", "Middle_Proximal_R"),
            Sided("LeftHandMiddle1", "RightHandMiddle1"),
            Sided("Bip_L_Finger2", "Bip_R_Finger2"),
        ],
    ),
    (
        Sided("MiddleFinger2_L", "MiddleFinger2_R"),
        &[
            Sided("LeftMiddleIntermediate", "RightMiddleIntermediate"),
            Sided("Middle_Intermediate_L", "Middle_Intermediate_R"),
            Sided("LeftHandMiddle2", "RightHandMiddle2"),
            Sided("Bip_L_Finger21", "Bip_R_Finger21"),
        ],
    ),
    (
        Sided("MiddleFinger3_L", "MiddleFinger3_R"),
        &[
            Sided("LeftMiddleDistal", "RightMiddleDistal"),
            Sided("Middle_Distal_L", "Middle_Distal_R"),
            Sided("LeftHandMiddle3", "RightHandMiddle3"),
            Sided("Bip_L_Finger22", "Bip_R_Finger22"),
        ],
    ),
    (
        Sided("RingFinger1_L", "RingFinger1_R"),
        &[
            Sided("LeftRingProximal", "RightRingProximal"),
            Sided("Ring_Proximal_L", "Ring_Proximal_R"),
            Sided("LeftHandRing1", "RightHandRing1"),
            Sided("Bip_L_Finger3", "Bip_R_Finger3"),
        ],
    ),
    (
        Sided("RingFinger2_L", "RingFinger2_R"),
        &[
            Sided("LeftRingIntermediate", "RightRingIntermediate"),
            Sided("Ring_Intermediate_L", "Ring_Intermediate_R"),
            Sided("LeftHandRing2", "RightHandRing2"),
            Sided("Bip_L_Finger31", "Bip_R_Finger31"),
        ],
    ),
    (
        Sided("RingFinger3_L", "RingFinger3_R"),
        &[
            Sided("LeftRingDistal", "RightRingDistal"),
            Sided("Ring_Distal_L", "Ring_Distal_R"),
            Sided("LeftHandRing3", "RightHandRing3"),
            Sided("Bip_L_Finger32", "Bip_R_Finger32"),
        ],
    ),
    (
        Sided("LittleFinger1_L", "LittleFinger1_R"),
        &[
            Sided("LeftLittleProximal", "RightLittleProximal"),
            Sided("Little_Proximal_L", "Little_Proximal_R"),
            Sided("LeftHandPinky1", "RightHandPinky1"),
            Sided("Bip_L_Finger4", "Bip_R_Finger4"),
        ],
    ),
    (
        Sided("LittleFinger2_L", "LittleFinger2_R"),
        &[
            Sided("LeftLittleIntermediate", "RightLittleIntermediate"),
            Sided("Little_Intermediate_L", "Little_Intermediate_R"),
            Sided("LeftHandPinky2", "RightHandPinky2"),
            Sided("Bip_L_Finger41", "Bip_R_Finger41"),
        ],
    ),
    (
        Sided("LittleFinger3_L", "LittleFinger3_R"),
        &[
            Sided("LeftLittleDistal", "RightLittleDistal"),
            Sided("Little_Distal_L", "Little_Distal_R"),
            Sided("LeftHandPinky3", "RightHandPinky3"),
            Sided("Bip_L_Finger42", "Bip_R_Finger42"),
        ],
    ),
];

// ─── Reweight tables ──────────────────────────────────────────────────────────

/// Canonical target → legacy channels whose weights merge into the target.
/// Rename sources are auto-appended to this table (except `Spine`) so that
/// duplicate-source rigs consolidate instead of colliding.
pub const REWEIGHT: &[(SidedName, &[SidedName])] = &[
    (
        Sided("Left arm", "Right arm"),
        &[
            Sided("ArmTwist_L", "ArmTwist_R"),
            Sided("ArmTwist1_L", "ArmTwist1_R"),
            Sided("ArmTwist2_L", "ArmTwist2_R"),
            Sided("ArmTwist3_L", "ArmTwist3_R"),
        ],
    ),
    (
        Sided("Left elbow", "Right elbow"),
        &[
            Sided("HandTwist_L", "HandTwist_R"),
            Sided("HandTwist1_L", "HandTwist1_R"),
            Sided("HandTwist2_L", "HandTwist2_R"),
            Sided("HandTwist3_L", "HandTwist3_R"),
        ],
    ),
    (
        Sided("Left wrist", "Right wrist"),
        &[Sided("Hand_Extra_L", "Hand_Extra_R")],
    ),
    (
        Sided("Left leg", "Right leg"),
        &[
            Sided("LegD_L", "LegD_R"),
            Sided("Leg_D_L", "Leg_D_R"),
            Sided("Waist_Cancel_L", "Waist_Cancel_R"),
        ],
    ),
    (
        Sided("Left ankle", "Right ankle"),
        &[Sided("AnkleD_L", "AnkleD_R"), Sided("Ankle_D_L", "Ankle_D_R")],
    ),
    (
        Sided("Left toe", "Right toe"),
        &[Sided("ToeEX_L", "ToeEX_R")],
    ),
];

/// Bones whose channel merges into their structural parent's channel.
pub const REWEIGHT_TO_PARENT: &[SidedName] = &[
    Sided("ShoulderP_L", "ShoulderP_R"),
    Sided("ShoulderC_L", "ShoulderC_R"),
    Sided("ToeTip_L", "ToeTip_R"),
];

// ─── Conflicting-name rules ───────────────────────────────────────────────────

/// (required-present bones, trigger bone, new name). When the trigger and
/// every required bone exist, the trigger is renamed before the main rename
/// pass so an ambiguous legacy name lands on the right canonical target.
pub const CONFLICTS: &[(&[SidedName], SidedName, SidedName)] = &[
    // Sided hip bones next to knees are upper legs, not the pelvis.
    (
        &[Sided("Knee_L", "Knee_R")],
        Sided("Hip_L", "Hip_R"),
        Sided("Leg_L", "Leg_R"),
    ),
    // A waist bone under an upper-body chain is the actual lower body.
    (
        &[Single("Upper_Body")],
        Single("Waist"),
        Single("LowerBody"),
    ),
    // Hand bones beside explicit wrists would double-map to the wrist.
    (
        &[Sided("Wrist_L", "Wrist_R")],
        Sided("Hand_L", "Hand_R"),
        Sided("Hand_Extra_L", "Hand_Extra_R"),
    ),
];

// ─── Removal / keep lists ─────────────────────────────────────────────────────

/// Cosmetic and placeholder bones removed outright, unless they carry their
/// own weight channel alongside their parent's (then they merge instead).
pub const COSMETIC: &[&str] = &[
    "Center",
    "CenterTip",
    "Groove",
    "GrooveTip",
    "Waist",
    "Eyes",
    "EyesTip",
    "EyeLight",
    "EyeReturn",
    "Root",
    "Global",
    "Position",
    "Master",
    "Mother",
    "ControlNode",
    "ParentNode",
    "NeckTip",
    "HeadTip",
];

/// Prefix-matched variant of [`COSMETIC`].
pub const COSMETIC_PREFIXES: &[&str] = &[
    "Dummy_",
    "Shadow_",
    "LegIK",
    "LegTip",
    "ToeTipIK",
    "SleeveIK",
    "HairIK",
    "SkirtIK",
    "Necktie",
];

/// Canonical bones that may have a missing weight channel created for them
/// when a merge targets them.
pub const KEEP: &[SidedName] = &[
    Single("Hips"),
    Single("Spine"),
    Single("Chest"),
    Single("Neck"),
    Single("Head"),
    Sided("Left shoulder", "Right shoulder"),
    Sided("Left arm", "Right arm"),
    Sided("Left elbow", "Right elbow"),
    Sided("Left wrist", "Right wrist"),
    Sided("Left leg", "Right leg"),
    Sided("Left knee", "Right knee"),
    Sided("Left ankle", "Right ankle"),
    Sided("Left toe", "Right toe"),
    Sided("Eye_L", "Eye_R"),
];

/// Parent names whose side can be recovered from a left/right-marked child.
pub const UNKNOWN_SIDE: &[(&str, &str)] = &[
    ("Shoulder", "shoulder"),
    ("Arm", "arm"),
    ("Elbow", "elbow"),
    ("Wrist", "wrist"),
    ("Leg", "leg"),
    ("Knee", "knee"),
    ("Ankle", "ankle"),
];

// ─── Validation chains ────────────────────────────────────────────────────────

/// Required parent→child chains for the final hierarchy check.
pub const HIERARCHY_CHAINS: [&[&str]; 5] = [
    &["Hips", "Spine", "Chest", "Neck", "Head"],
    &["Hips", "Left leg", "Left knee", "Left ankle"],
    &["Hips", "Right leg", "Right knee", "Right ankle"],
    &["Chest", "Left shoulder", "Left arm", "Left elbow", "Left wrist"],
    &["Chest", "Right shoulder", "Right arm", "Right elbow", "Right wrist"],
];

/// Raw-name marker for Source-engine rigs.
pub const SOURCE_ENGINE_PREFIX: &str = "ValveBiped";

/// Raw-name marker for Mixamo rigs.
pub const MIXAMO_MARKER: &str = "mixamo";
