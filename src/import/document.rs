use serde_json::Value;

use crate::error::ImportError;

/// Supported scene-description version (major, minor).
const GLTF_VERSION: (u32, u32) = (2, 0);

/// Extensions this importer understands. A document requiring anything else
/// is rejected before any resource resolution happens.
const EXTENSIONS: [&str; 6] = [
    "KHR_lights_punctual",
    "KHR_materials_pbrSpecularGlossiness",
    "KHR_materials_unlit",
    "KHR_texture_transform",
    "MSFT_texture_dds",
    "VRM",
];

/// Parsed scene description with version/extension checks already applied.
#[derive(Debug, Clone)]
pub struct Document {
    root: Value,
    vrm: bool,
}

impl Document {
    /// Parse JSON text into a validated document.
    pub fn parse(json: &str) -> Result<Self, ImportError> {
        let root: Value = serde_json::from_str(json)?;

        check_version(&root)?;
        check_required_extensions(&root)?;

        let vrm = root
            .get("extensions")
            .and_then(Value::as_object)
            .map(|ext| ext.contains_key("VRM") || ext.contains_key("VRMC_vrm"))
            .unwrap_or(false);

        Ok(Self { root, vrm })
    }

    /// Whether the document carries the avatar-metadata (VRM) extension.
    pub fn is_vrm(&self) -> bool {
        self.vrm
    }

    /// Raw document root for callers that navigate the tree directly.
    pub fn root(&self) -> &Value {
        &self.root
    }

    /// Entry of a top-level collection (`"accessors"`, `"nodes"`, ...) by id.
    pub fn entry(&self, collection: &'static str, index: usize) -> Result<&Value, ImportError> {
        self.root
            .get(collection)
            .and_then(Value::as_array)
            .and_then(|entries| entries.get(index))
            .ok_or(ImportError::Index {
                kind: collection,
                index,
            })
    }

    /// Number of entries in a top-level collection.
    pub fn count(&self, collection: &str) -> usize {
        self.root
            .get(collection)
            .and_then(Value::as_array)
            .map(|entries| entries.len())
            .unwrap_or(0)
    }
}

// ─── Version / extension checks ───────────────────────────────────────────────

/// Parse a version string like `"2.1"` into its integer components.
///
/// Dot-separated integers with at least two components are accepted.
fn parse_version(text: &str) -> Result<Vec<u32>, ImportError> {
    let parts: Vec<u32> = text
        .split('.')
        .map(|part| part.parse::<u32>())
        .collect::<Result<_, _>>()
        .map_err(|_| ImportError::Version(text.to_string()))?;

    if parts.len() < 2 {
        return Err(ImportError::Version(text.to_string()));
    }
    Ok(parts)
}

fn check_version(root: &Value) -> Result<(), ImportError> {
    let asset = root.get("asset").and_then(Value::as_object);

    if let Some(min_version) = asset
        .and_then(|asset| asset.get("minVersion"))
        .and_then(Value::as_str)
    {
        // The importer must support at least the minimum declared version.
        let min = parse_version(min_version)?;
        let supported = [GLTF_VERSION.0, GLTF_VERSION.1];
        if supported.as_slice() < min.as_slice() {
            return Err(ImportError::Version(min_version.to_string()));
        }
        return Ok(());
    }

    let version = asset
        .and_then(|asset| asset.get("version"))
        .and_then(Value::as_str)
        .ok_or_else(|| ImportError::Version("missing asset.version".to_string()))?;

    // Major version only; minor differences are forwards/backwards compatible.
    let parsed = parse_version(version)?;
    if parsed[0] != GLTF_VERSION.0 {
        return Err(ImportError::Version(version.to_string()));
    }
    Ok(())
}

fn check_required_extensions(root: &Value) -> Result<(), ImportError> {
    let Some(required) = root.get("extensionsRequired").and_then(Value::as_array) else {
        return Ok(());
    };

    for entry in required {
        let name = entry.as_str().unwrap_or_default();
        if !EXTENSIONS.contains(&name) {
            return Err(ImportError::UnsupportedExtension(name.to_string()));
        }
    }
    Ok(())
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_minor_version_mismatch_when_parsed_then_document_is_accepted() {
        let document = Document::parse(r#"{"asset":{"version":"2.1"}}"#);
        assert!(document.is_ok());
    }

    #[test]
    fn given_major_version_mismatch_when_parsed_then_version_error_names_it() {
        let err = Document::parse(r#"{"asset":{"version":"3.0"}}"#).expect_err("must fail");
        assert!(matches!(err, ImportError::Version(version) if version == "3.0"));
    }

    #[test]
    fn given_supported_min_version_when_parsed_then_document_is_accepted() {
        let document = Document::parse(r#"{"asset":{"version":"2.0","minVersion":"2.0"}}"#);
        assert!(document.is_ok());
    }

    #[test]
    fn given_higher_min_version_when_parsed_then_version_error_is_raised() {
        let err = Document::parse(r#"{"asset":{"version":"2.0","minVersion":"2.1"}}"#)
            .expect_err("must fail");
        assert!(matches!(err, ImportError::Version(version) if version == "2.1"));
    }

    #[test]
    fn given_garbage_version_when_parsed_then_version_error_is_raised() {
        let err = Document::parse(r#"{"asset":{"version":"two-point-oh"}}"#).expect_err("fails");
        assert!(matches!(err, ImportError::Version(_)));

        let err = Document::parse(r#"{"asset":{"version":"2"}}"#).expect_err("fails");
        assert!(matches!(err, ImportError::Version(version) if version == "2"));
    }

    #[test]
    fn given_unknown_required_extension_when_parsed_then_it_is_named_in_the_error() {
        let err = Document::parse(
            r#"{"asset":{"version":"2.0"},
                "extensionsRequired":["KHR_materials_unlit","EXT_meshopt_compression"]}"#,
        )
        .expect_err("must fail");
        assert!(
            matches!(err, ImportError::UnsupportedExtension(name) if name == "EXT_meshopt_compression")
        );
    }

    #[test]
    fn given_vrm_extension_when_parsed_then_vrm_flag_is_set() {
        let document =
            Document::parse(r#"{"asset":{"version":"2.0"},"extensions":{"VRM":{}}}"#).expect("ok");
        assert!(document.is_vrm());

        let document = Document::parse(r#"{"asset":{"version":"2.0"}}"#).expect("ok");
        assert!(!document.is_vrm());
    }
}
