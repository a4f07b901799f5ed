use std::{fs, path::Path, rc::Rc};

use base64::{Engine, engine::general_purpose::STANDARD};
use serde_json::Value;

use crate::error::ImportError;

// ─── Component types ──────────────────────────────────────────────────────────

/// Scalar component encodings an accessor may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentType {
    I8,
    U8,
    I16,
    U16,
    U32,
    F32,
}

impl ComponentType {
    pub fn from_code(code: u64) -> Option<Self> {
        match code {
            5120 => Some(Self::I8),
            5121 => Some(Self::U8),
            5122 => Some(Self::I16),
            5123 => Some(Self::U16),
            5125 => Some(Self::U32),
            5126 => Some(Self::F32),
            _ => None,
        }
    }

    pub fn size(self) -> usize {
        match self {
            Self::I8 | Self::U8 => 1,
            Self::I16 | Self::U16 => 2,
            Self::U32 | Self::F32 => 4,
        }
    }

    fn normalization_max(self) -> f32 {
        match self {
            Self::I8 => i8::MAX as f32,
            Self::U8 => u8::MAX as f32,
            Self::I16 => i16::MAX as f32,
            Self::U16 => u16::MAX as f32,
            Self::U32 => u32::MAX as f32,
            Self::F32 => 1.0,
        }
    }
}

fn element_dims(accessor_type: &str) -> Option<usize> {
    match accessor_type {
        "SCALAR" => Some(1),
        "VEC2" => Some(2),
        "VEC3" => Some(3),
        "VEC4" => Some(4),
        "MAT2" => Some(4),
        "MAT3" => Some(9),
        "MAT4" => Some(16),
        _ => None,
    }
}

// ─── Resolved shapes ──────────────────────────────────────────────────────────

/// A byte window into a buffer with the view's declared element stride.
#[derive(Debug, Clone)]
pub struct ViewWindow {
    pub bytes: Vec<u8>,
    pub stride: Option<usize>,
}

/// Decoded element payload. Unsigned integer components stay exact; float
/// and normalized components decode to `f32`.
#[derive(Debug, Clone, PartialEq)]
pub enum AccessorValues {
    Float(Vec<f32>),
    Uint(Vec<u32>),
}

/// A fully decoded accessor: `count` elements of `dims` components each.
/// `values` always holds exactly `count * dims` entries.
#[derive(Debug, Clone, PartialEq)]
pub struct AccessorData {
    pub count: usize,
    pub dims: usize,
    pub values: AccessorValues,
}

impl AccessorData {
    /// Element as f32 components, regardless of storage class.
    pub fn element(&self, index: usize) -> Option<Vec<f32>> {
        if index >= self.count {
            return None;
        }
        let start = index * self.dims;
        Some(match &self.values {
            AccessorValues::Float(values) => values[start..start + self.dims].to_vec(),
            AccessorValues::Uint(values) => values[start..start + self.dims]
                .iter()
                .map(|value| *value as f32)
                .collect(),
        })
    }

    /// Scalar unsigned view, used for index buffers and joint ids.
    pub fn scalars_u32(&self) -> Vec<u32> {
        match &self.values {
            AccessorValues::Uint(values) => values.clone(),
            AccessorValues::Float(values) => values.iter().map(|value| *value as u32).collect(),
        }
    }
}

// ─── Buffer bytes ─────────────────────────────────────────────────────────────

/// Resolve a buffer entry to its bytes: embedded data URI, external file
/// relative to the container's base directory, or the container's binary
/// blob for the implicit uri-less buffer.
pub fn resolve_buffer_bytes(
    buffer: &Value,
    base_dir: Option<&Path>,
    blob: Option<&Rc<Vec<u8>>>,
) -> Result<Rc<Vec<u8>>, ImportError> {
    let Some(uri) = buffer.get("uri").and_then(Value::as_str) else {
        return blob.cloned().ok_or_else(|| {
            ImportError::Format("buffer has no uri and container has no binary chunk".into())
        });
    };

    if let Some(encoded) = data_uri_payload(uri) {
        let bytes = STANDARD
            .decode(encoded)
            .map_err(|_| ImportError::Format("buffer data URI is not valid base64".into()))?;
        return Ok(Rc::new(bytes));
    }

    let path = match base_dir {
        Some(dir) => dir.join(uri),
        None => Path::new(uri).to_path_buf(),
    };
    Ok(Rc::new(fs::read(path)?))
}

fn data_uri_payload(uri: &str) -> Option<&str> {
    let rest = uri.strip_prefix("data:")?;
    let (params, payload) = rest.split_once(',')?;
    params.ends_with(";base64").then_some(payload)
}

// ─── Buffer views ─────────────────────────────────────────────────────────────

/// Slice a buffer-view window (offset, length, optional stride) out of its
/// buffer's bytes.
pub fn resolve_view_window(view: &Value, buffer: &[u8]) -> Result<ViewWindow, ImportError> {
    let offset = view.get("byteOffset").and_then(Value::as_u64).unwrap_or(0) as usize;
    let length = view
        .get("byteLength")
        .and_then(Value::as_u64)
        .ok_or_else(|| ImportError::Format("buffer view is missing byteLength".into()))?
        as usize;

    let end = offset
        .checked_add(length)
        .filter(|end| *end <= buffer.len())
        .ok_or_else(|| ImportError::Format("buffer view exceeds buffer length".into()))?;

    let stride = view
        .get("byteStride")
        .and_then(Value::as_u64)
        .map(|stride| stride as usize)
        .filter(|stride| *stride > 0);

    Ok(ViewWindow {
        bytes: buffer[offset..end].to_vec(),
        stride,
    })
}

// ─── Accessor decoding ────────────────────────────────────────────────────────

/// Sparse override data already sliced out of its index/value views.
pub struct SparseOverride<'a> {
    pub count: usize,
    pub indices: &'a [u8],
    pub index_type: ComponentType,
    pub values: &'a [u8],
}

/// Decode an accessor into typed elements.
///
/// `base` is the accessor's buffer-view window; when absent the base
/// sequence is zero-filled (sparse-only accessors). Sparse overrides are
/// applied in listed order, so a duplicate index keeps its last value.
pub fn decode_accessor(
    accessor: &Value,
    base: Option<&ViewWindow>,
    sparse: Option<SparseOverride<'_>>,
) -> Result<AccessorData, ImportError> {
    let count = accessor
        .get("count")
        .and_then(Value::as_u64)
        .ok_or_else(|| ImportError::Format("accessor is missing count".into()))?
        as usize;

    let accessor_type = accessor.get("type").and_then(Value::as_str).unwrap_or("");
    let dims = element_dims(accessor_type)
        .ok_or_else(|| ImportError::Format(format!("unknown accessor type: {accessor_type}")))?;

    let component = accessor
        .get("componentType")
        .and_then(Value::as_u64)
        .and_then(ComponentType::from_code)
        .ok_or_else(|| ImportError::Format("unknown accessor component type".into()))?;

    let normalized = accessor
        .get("normalized")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    let byte_offset = accessor
        .get("byteOffset")
        .and_then(Value::as_u64)
        .unwrap_or(0) as usize;

    // Unsigned, un-normalized components stay exact integers; everything
    // else decodes to f32 (normalization scales by 1/maxOfType).
    let exact = !normalized
        && matches!(
            component,
            ComponentType::U8 | ComponentType::U16 | ComponentType::U32
        );

    let mut values = match exact {
        true => AccessorValues::Uint(vec![0; count * dims]),
        false => AccessorValues::Float(vec![0.0; count * dims]),
    };

    if let Some(window) = base {
        let packed = dims * component.size();
        let stride = window.stride.unwrap_or(packed).max(packed);
        read_elements(
            &window.bytes[..],
            byte_offset,
            stride,
            count,
            dims,
            component,
            normalized,
            0,
            &mut values,
        )?;
    }

    if let Some(sparse) = sparse {
        if sparse.count > count {
            return Err(ImportError::Format(
                "sparse override count exceeds accessor count".into(),
            ));
        }

        let indices = read_scalars(sparse.indices, sparse.count, sparse.index_type)?;
        for (slot, target) in indices.into_iter().enumerate() {
            let target = target as usize;
            if target >= count {
                return Err(ImportError::Format(
                    "sparse override index exceeds accessor count".into(),
                ));
            }
            // Values are tightly packed in the base accessor's element layout.
            read_elements(
                sparse.values,
                slot * dims * component.size(),
                dims * component.size(),
                1,
                dims,
                component,
                normalized,
                target * dims,
                &mut values,
            )?;
        }
    }

    Ok(AccessorData {
        count,
        dims,
        values,
    })
}

/// Decode `count` strided elements starting at `offset`, writing components
/// into `out` beginning at component slot `out_start`.
#[allow(clippy::too_many_arguments)]
fn read_elements(
    bytes: &[u8],
    offset: usize,
    stride: usize,
    count: usize,
    dims: usize,
    component: ComponentType,
    normalized: bool,
    out_start: usize,
    out: &mut AccessorValues,
) -> Result<(), ImportError> {
    for element in 0..count {
        let element_offset = offset + element * stride;
        for lane in 0..dims {
            let at = element_offset + lane * component.size();
            let slot = out_start + element * dims + lane;
            match out {
                AccessorValues::Uint(values) => {
                    values[slot] = read_component(bytes, at, component)? as u32;
                }
                AccessorValues::Float(values) => {
                    let raw = read_component_f32(bytes, at, component)?;
                    values[slot] = if normalized {
                        (raw / component.normalization_max()).max(-1.0)
                    } else {
                        raw
                    };
                }
            }
        }
    }
    Ok(())
}

fn read_scalars(
    bytes: &[u8],
    count: usize,
    component: ComponentType,
) -> Result<Vec<u64>, ImportError> {
    (0..count)
        .map(|index| read_component(bytes, index * component.size(), component))
        .collect()
}

fn component_slice(bytes: &[u8], offset: usize, len: usize) -> Result<&[u8], ImportError> {
    bytes
        .get(offset..offset + len)
        .ok_or_else(|| ImportError::Format("accessor reads past end of buffer view".into()))
}

fn read_component(bytes: &[u8], offset: usize, component: ComponentType) -> Result<u64, ImportError> {
    let slice = component_slice(bytes, offset, component.size())?;
    Ok(match component {
        ComponentType::I8 => slice[0] as i8 as i64 as u64,
        ComponentType::U8 => slice[0] as u64,
        ComponentType::I16 => i16::from_le_bytes([slice[0], slice[1]]) as i64 as u64,
        ComponentType::U16 => u16::from_le_bytes([slice[0], slice[1]]) as u64,
        ComponentType::U32 => u32::from_le_bytes([slice[0], slice[1], slice[2], slice[3]]) as u64,
        ComponentType::F32 => {
            f32::from_le_bytes([slice[0], slice[1], slice[2], slice[3]]) as u64
        }
    })
}

fn read_component_f32(
    bytes: &[u8],
    offset: usize,
    component: ComponentType,
) -> Result<f32, ImportError> {
    let slice = component_slice(bytes, offset, component.size())?;
    Ok(match component {
        ComponentType::I8 => slice[0] as i8 as f32,
        ComponentType::U8 => slice[0] as f32,
        ComponentType::I16 => i16::from_le_bytes([slice[0], slice[1]]) as f32,
        ComponentType::U16 => u16::from_le_bytes([slice[0], slice[1]]) as f32,
        ComponentType::U32 => u32::from_le_bytes([slice[0], slice[1], slice[2], slice[3]]) as f32,
        ComponentType::F32 => f32::from_le_bytes([slice[0], slice[1], slice[2], slice[3]]),
    })
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn float_values(data: &AccessorData) -> &[f32] {
        match &data.values {
            AccessorValues::Float(values) => values,
            AccessorValues::Uint(_) => panic!("expected float storage"),
        }
    }

    #[test]
    fn given_tightly_packed_floats_when_decoded_then_all_elements_are_read() {
        let mut bytes = Vec::new();
        for value in [1.0f32, 2.0, 3.0, 4.0, 5.0, 6.0] {
            bytes.extend_from_slice(&value.to_le_bytes());
        }
        let window = ViewWindow {
            bytes,
            stride: None,
        };
        let accessor = json!({"count": 2, "type": "VEC3", "componentType": 5126});

        let data = decode_accessor(&accessor, Some(&window), None).expect("decode");
        assert_eq!(data.count, 2);
        assert_eq!(data.dims, 3);
        assert_eq!(float_values(&data), &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn given_strided_view_when_decoded_then_interleaved_lanes_are_skipped() {
        // Two VEC2 float elements interleaved with 8 bytes of padding each.
        let mut bytes = Vec::new();
        for pair in [[1.0f32, 2.0], [3.0, 4.0]] {
            bytes.extend_from_slice(&pair[0].to_le_bytes());
            bytes.extend_from_slice(&pair[1].to_le_bytes());
            bytes.extend_from_slice(&[0xAA; 8]);
        }
        let window = ViewWindow {
            bytes,
            stride: Some(16),
        };
        let accessor = json!({"count": 2, "type": "VEC2", "componentType": 5126});

        let data = decode_accessor(&accessor, Some(&window), None).expect("decode");
        assert_eq!(float_values(&data), &[1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn given_normalized_u8_when_decoded_then_linear_scaling_is_applied() {
        let window = ViewWindow {
            bytes: vec![0, 127, 255],
            stride: None,
        };
        let accessor =
            json!({"count": 3, "type": "SCALAR", "componentType": 5121, "normalized": true});

        let data = decode_accessor(&accessor, Some(&window), None).expect("decode");
        let values = float_values(&data);
        assert_eq!(values[0], 0.0);
        assert!((values[1] - 127.0 / 255.0).abs() < 1e-6);
        assert_eq!(values[2], 1.0);
    }

    #[test]
    fn given_unnormalized_u16_when_decoded_then_integers_stay_exact() {
        let mut bytes = Vec::new();
        for value in [0u16, 40000, 65535] {
            bytes.extend_from_slice(&value.to_le_bytes());
        }
        let window = ViewWindow {
            bytes,
            stride: None,
        };
        let accessor = json!({"count": 3, "type": "SCALAR", "componentType": 5123});

        let data = decode_accessor(&accessor, Some(&window), None).expect("decode");
        assert_eq!(data.scalars_u32(), vec![0, 40000, 65535]);
    }

    #[test]
    fn given_sparse_with_duplicate_indices_when_decoded_then_last_write_wins() {
        // Base [0,0,0] (no buffer view), overrides at index 0 twice.
        let accessor = json!({"count": 3, "type": "SCALAR", "componentType": 5126});
        let mut indices = Vec::new();
        indices.extend_from_slice(&0u16.to_le_bytes());
        indices.extend_from_slice(&0u16.to_le_bytes());
        let mut values = Vec::new();
        values.extend_from_slice(&5.0f32.to_le_bytes());
        values.extend_from_slice(&9.0f32.to_le_bytes());

        let sparse = SparseOverride {
            count: 2,
            indices: &indices,
            index_type: ComponentType::U16,
            values: &values,
        };

        let data = decode_accessor(&accessor, None, Some(sparse)).expect("decode");
        assert_eq!(float_values(&data), &[9.0, 0.0, 0.0]);
    }

    #[test]
    fn given_sparse_index_out_of_range_when_decoded_then_format_error_is_raised() {
        let accessor = json!({"count": 2, "type": "SCALAR", "componentType": 5126});
        let indices = 7u16.to_le_bytes().to_vec();
        let values = 1.0f32.to_le_bytes().to_vec();

        let sparse = SparseOverride {
            count: 1,
            indices: &indices,
            index_type: ComponentType::U16,
            values: &values,
        };

        let err = decode_accessor(&accessor, None, Some(sparse)).expect_err("must fail");
        assert!(err.to_string().contains("sparse override index"));
    }

    #[test]
    fn given_short_view_when_decoded_then_format_error_is_raised() {
        let window = ViewWindow {
            bytes: vec![0u8; 10],
            stride: None,
        };
        let accessor = json!({"count": 2, "type": "VEC3", "componentType": 5126});

        let err = decode_accessor(&accessor, Some(&window), None).expect_err("must fail");
        assert!(err.to_string().contains("past end of buffer view"));
    }

    #[test]
    fn given_data_uri_buffer_when_resolved_then_payload_is_decoded() {
        // "AAECAw==" is [0, 1, 2, 3].
        let buffer = json!({"uri": "data:application/octet-stream;base64,AAECAw=="});
        let bytes = resolve_buffer_bytes(&buffer, None, None).expect("resolve");
        assert_eq!(**bytes, vec![0, 1, 2, 3]);
    }

    #[test]
    fn given_uriless_buffer_without_blob_when_resolved_then_format_error_is_raised() {
        let buffer = json!({"byteLength": 16});
        let err = resolve_buffer_bytes(&buffer, None, None).expect_err("must fail");
        assert!(err.to_string().contains("no binary chunk"));
    }
}
