use crate::error::ImportError;

// ─── Chunk layout constants ───────────────────────────────────────────────────

const MAGIC: &[u8; 4] = b"glTF";
const CHUNK_JSON: [u8; 4] = *b"JSON";
const CHUNK_BIN: [u8; 4] = *b"BIN\0";
const HEADER_LEN: usize = 12;
const SUPPORTED_CONTAINER_VERSION: u32 = 2;

/// Result of splitting a raw input into its container parts: the scene JSON
/// text and, for binary containers, at most one binary payload.
#[derive(Debug, Clone)]
pub struct RawDocument {
    pub json: String,
    pub binary: Option<Vec<u8>>,
}

// ─── Reading ──────────────────────────────────────────────────────────────────

/// Split raw bytes into JSON text and an optional binary blob.
///
/// The `glTF` magic signature marks a binary container; anything else is
/// treated as a raw JSON document with no binary payload.
pub fn split_container(bytes: &[u8]) -> Result<RawDocument, ImportError> {
    if bytes.len() >= 4 && &bytes[..4] == MAGIC {
        return split_binary(bytes);
    }

    let json = String::from_utf8(bytes.to_vec())
        .map_err(|_| ImportError::Format("document text is not valid UTF-8".into()))?;
    Ok(RawDocument { json, binary: None })
}

fn split_binary(bytes: &[u8]) -> Result<RawDocument, ImportError> {
    if bytes.len() < HEADER_LEN {
        return Err(ImportError::Format("GLB: truncated header".into()));
    }

    let version = read_u32(bytes, 4);
    if version != SUPPORTED_CONTAINER_VERSION {
        return Err(ImportError::Format(format!(
            "GLB: version not supported: {version}"
        )));
    }

    let mut offset = HEADER_LEN;
    let mut json: Option<Vec<u8>> = None;
    let mut binary: Option<Vec<u8>> = None;

    while offset < bytes.len() {
        let (tag, payload, next) = read_chunk(bytes, offset)?;

        match tag {
            CHUNK_JSON => {
                if json.is_some() {
                    return Err(ImportError::Format(
                        "GLB: too many JSON chunks, should be 1".into(),
                    ));
                }
                if offset != HEADER_LEN {
                    return Err(ImportError::Format("GLB: JSON chunk must be first".into()));
                }
                json = Some(payload.to_vec());
            }
            CHUNK_BIN => {
                if binary.is_some() {
                    return Err(ImportError::Format(
                        "GLB: too many BIN chunks, should be 0 or 1".into(),
                    ));
                }
                binary = Some(payload.to_vec());
            }
            // Chunks of unrecognized type are skipped.
            _ => {}
        }

        offset = next;
    }

    let Some(json) = json else {
        return Err(ImportError::Format("GLB: JSON chunk must be first".into()));
    };

    let json = String::from_utf8(json)
        .map_err(|_| ImportError::Format("GLB: JSON chunk is not valid UTF-8".into()))?;

    Ok(RawDocument { json, binary })
}

fn read_chunk(bytes: &[u8], offset: usize) -> Result<([u8; 4], &[u8], usize), ImportError> {
    if offset + 8 > bytes.len() {
        return Err(ImportError::Format("GLB: truncated chunk header".into()));
    }

    let length = read_u32(bytes, offset) as usize;
    let tag: [u8; 4] = bytes[offset + 4..offset + 8].try_into().unwrap_or([0; 4]);

    let start = offset + 8;
    let end = start
        .checked_add(length)
        .filter(|end| *end <= bytes.len())
        .ok_or_else(|| ImportError::Format("GLB: chunk length exceeds container".into()))?;

    Ok((tag, &bytes[start..end], end))
}

fn read_u32(bytes: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ])
}

// ─── Writing ──────────────────────────────────────────────────────────────────

/// Rebuild a binary container from JSON text and an optional blob.
///
/// Chunk payloads are 4-byte aligned per the container layout: the JSON
/// chunk is padded with spaces, the BIN chunk with zeros. The header's total
/// length covers the whole byte stream.
pub fn write_container(json: &[u8], binary: Option<&[u8]>) -> Vec<u8> {
    let json_padding = padding_for(json.len());
    let mut total = HEADER_LEN + 8 + json.len() + json_padding;

    let bin_padding = binary.map(|bin| padding_for(bin.len())).unwrap_or(0);
    if let Some(bin) = binary {
        total += 8 + bin.len() + bin_padding;
    }

    let mut out = Vec::with_capacity(total);
    out.extend_from_slice(MAGIC);
    out.extend_from_slice(&SUPPORTED_CONTAINER_VERSION.to_le_bytes());
    out.extend_from_slice(&(total as u32).to_le_bytes());

    out.extend_from_slice(&((json.len() + json_padding) as u32).to_le_bytes());
    out.extend_from_slice(&CHUNK_JSON);
    out.extend_from_slice(json);
    out.resize(out.len() + json_padding, b' ');

    if let Some(bin) = binary {
        out.extend_from_slice(&((bin.len() + bin_padding) as u32).to_le_bytes());
        out.extend_from_slice(&CHUNK_BIN);
        out.extend_from_slice(bin);
        out.resize(out.len() + bin_padding, 0);
    }

    out
}

fn padding_for(len: usize) -> usize {
    (4 - len % 4) % 4
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_json_only_input_when_split_then_no_binary_blob_is_produced() {
        let raw = split_container(b"{\"asset\":{\"version\":\"2.0\"}}").expect("split");
        assert!(raw.binary.is_none());
        assert_eq!(raw.json, "{\"asset\":{\"version\":\"2.0\"}}");
    }

    #[test]
    fn given_binary_container_when_split_and_rewritten_then_bytes_round_trip() {
        let json = br#"{"asset":{"version":"2.0"}}"#;
        let bin = [1u8, 2, 3, 4, 5];
        let container = write_container(json, Some(&bin));

        let raw = split_container(&container).expect("split");
        assert_eq!(raw.json.trim_end(), String::from_utf8_lossy(json));
        // Blob keeps its alignment padding; the payload prefix matches.
        assert_eq!(&raw.binary.as_ref().expect("blob")[..bin.len()], &bin);

        let rebuilt = write_container(raw.json.as_bytes(), raw.binary.as_deref());
        assert_eq!(rebuilt.len(), container.len());
        assert_eq!(rebuilt, container);
    }

    #[test]
    fn given_unsupported_version_when_split_then_format_error_is_raised() {
        let mut container = write_container(b"{}", None);
        container[4..8].copy_from_slice(&3u32.to_le_bytes());

        let err = split_container(&container).expect_err("must fail");
        assert!(err.to_string().contains("version not supported: 3"));
    }

    #[test]
    fn given_bin_chunk_first_when_split_then_format_error_is_raised() {
        let mut out = Vec::new();
        out.extend_from_slice(b"glTF");
        out.extend_from_slice(&2u32.to_le_bytes());
        out.extend_from_slice(&24u32.to_le_bytes());
        out.extend_from_slice(&4u32.to_le_bytes());
        out.extend_from_slice(b"BIN\0");
        out.extend_from_slice(&[0, 0, 0, 0]);

        let err = split_container(&out).expect_err("must fail");
        assert!(err.to_string().contains("JSON chunk must be first"));
    }

    #[test]
    fn given_duplicate_bin_chunks_when_split_then_format_error_is_raised() {
        let mut container = write_container(b"{}  ", Some(&[7, 7, 7, 7]));
        // Append a second BIN chunk by hand.
        container.extend_from_slice(&4u32.to_le_bytes());
        container.extend_from_slice(b"BIN\0");
        container.extend_from_slice(&[8, 8, 8, 8]);

        let err = split_container(&container).expect_err("must fail");
        assert!(err.to_string().contains("too many BIN chunks"));
    }

    #[test]
    fn given_unknown_chunk_type_when_split_then_chunk_is_skipped() {
        let mut container = write_container(b"{}  ", None);
        container.extend_from_slice(&4u32.to_le_bytes());
        container.extend_from_slice(b"XTRA");
        container.extend_from_slice(&[9, 9, 9, 9]);

        let raw = split_container(&container).expect("split");
        assert!(raw.binary.is_none());
    }

    #[test]
    fn given_truncated_chunk_when_split_then_format_error_is_raised() {
        let mut container = write_container(b"{}  ", None);
        container.extend_from_slice(&64u32.to_le_bytes());
        container.extend_from_slice(b"BIN\0");
        container.extend_from_slice(&[1, 2]);

        let err = split_container(&container).expect_err("must fail");
        assert!(err.to_string().contains("chunk length exceeds container"));
    }
}
