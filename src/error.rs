use thiserror::Error;

/// Errors raised while parsing a container or resolving document resources.
///
/// Parsing and format errors abort the whole import; they are never
/// recovered locally.
#[derive(Error, Debug)]
pub enum ImportError {
    /// Malformed container: bad magic/version, wrong first-chunk type,
    /// duplicate JSON/BIN chunks, truncated chunk data.
    #[error("malformed container: {0}")]
    Format(String),

    /// Unparsable or unsupported `asset.version`/`asset.minVersion`.
    #[error("unsupported glTF version: {0}")]
    Version(String),

    /// A required extension is absent from the supported allow-list.
    #[error("unsupported extension was required: {0}")]
    UnsupportedExtension(String),

    /// A reference to a buffer/view/accessor/... that does not exist.
    #[error("invalid {kind} index: {index}")]
    Index { kind: &'static str, index: usize },

    #[error("filesystem error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid scene JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Post-repair skeleton validation failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HierarchyError {
    /// Bones required by the canonical template are absent. Batched: one
    /// message lists every missing bone, grouped per chain. Non-fatal.
    #[error("the following bones were not found:{0}")]
    MissingBones(String),

    /// A bone is present but parented to the wrong bone. Fatal, reported
    /// for the first mismatch found.
    #[error("'{bone}' is not parented to '{expected}', this will cause problems")]
    BadParenting { bone: String, expected: String },
}
