//! Raw bone-name canonicalization.

/// Vendor/tool prefixes stripped after segment capitalization, checked in
/// table order. Replacements chain: `ValveBiped_Bip01_Spine` loses its
/// `ValveBiped_` prefix first, then `Bip01_` collapses to `Bip_`.
const STARTS_WITH: [(&str, &str); 15] = [
    ("_", ""),
    ("ValveBiped_", ""),
    ("Bip1_", "Bip_"),
    ("Bip01_", "Bip_"),
    ("Bip001_", "Bip_"),
    ("Character1_", ""),
    ("HLP_", ""),
    ("JD_", ""),
    ("JU_", ""),
    ("Armature|", ""),
    ("Bone_", ""),
    ("C_", ""),
    ("Cf_S_", ""),
    ("Cf_J_", ""),
    ("G_", ""),
];

/// Rewrite a raw bone name into canonical token form.
pub fn normalize_name(raw: &str) -> String {
    // Make all the underscores.
    let mut name: String = raw
        .chars()
        .map(|c| if matches!(c, ' ' | '-' | '.') { '_' } else { c })
        .collect();
    while name.contains("__") {
        name = name.replace("__", "_");
    }

    // Uppercase at the start and after every underscore.
    name = name
        .split('_')
        .map(capitalize)
        .collect::<Vec<_>>()
        .join("_");

    // Strip known vendor/tool prefixes.
    for (prefix, replacement) in STARTS_WITH {
        if let Some(rest) = name.strip_prefix(prefix) {
            name = format!("{replacement}{rest}");
        }
    }

    // Drop a leading numeric segment.
    if let Some((first, rest)) = name.split_once('_')
        && !first.is_empty()
        && first.chars().all(|c| c.is_ascii_digit())
    {
        name = rest.to_string();
    }

    // Legacy exporters wrap the real name in quotes.
    let quoted: Vec<&str> = name.split('"').collect();
    if quoted.len() > 3 {
        name = quoted[1].to_string();
    }

    // Namespaced names keep only what follows the first colon.
    if name.contains(':') {
        name = name.split(':').skip(1).collect();
    }

    // Trailing S0 marker.
    if let Some(stripped) = name.strip_suffix("S0") {
        name = stripped.to_string();
    }

    name
}

fn capitalize(segment: &str) -> String {
    let mut chars = segment.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_separators_when_normalized_then_underscores_collapse() {
        assert_eq!(normalize_name("lower body"), "Lower_Body");
        assert_eq!(normalize_name("upper-body..2"), "Upper_Body_2");
        assert_eq!(normalize_name("left   arm"), "Left_Arm");
    }

    #[test]
    fn given_segments_when_normalized_then_each_is_capitalized() {
        assert_eq!(normalize_name("shoulder_l"), "Shoulder_L");
        assert_eq!(normalize_name("arm twist_l"), "Arm_Twist_L");
    }

    #[test]
    fn given_source_engine_name_when_normalized_then_prefixes_chain() {
        assert_eq!(normalize_name("ValveBiped.Bip01_Spine"), "Bip_Spine");
        assert_eq!(
            normalize_name("ValveBiped.Bip01_L_UpperArm"),
            "Bip_L_UpperArm"
        );
    }

    #[test]
    fn given_leading_digits_when_normalized_then_numeric_segment_is_dropped() {
        assert_eq!(normalize_name("01_Hips"), "Hips");
        assert_eq!(normalize_name("7_left_arm"), "Left_Arm");
        // A purely numeric name stays put.
        assert_eq!(normalize_name("42"), "42");
    }

    #[test]
    fn given_quoted_name_when_normalized_then_quoted_segment_is_extracted() {
        assert_eq!(normalize_name("\"Head\" bone \"x\""), "Head");
    }

    #[test]
    fn given_namespaced_name_when_normalized_then_prefix_before_colon_drops() {
        assert_eq!(normalize_name("mixamorig:Hips"), "Hips");
        assert_eq!(normalize_name("mixamorig:LeftUpLeg"), "LeftUpLeg");
    }

    #[test]
    fn given_s0_suffix_when_normalized_then_it_is_stripped() {
        assert_eq!(normalize_name("WaistS0"), "Waist");
    }
}
