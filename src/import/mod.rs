//! Container & accessor pipeline.
//!
//! Orchestrates chunk splitting, document validation, and resource
//! resolution. Every resolved entity is memoized by (kind, id) in a cache
//! that lives for exactly one [`Importer`]; resolution is synchronous and
//! single-threaded.

pub mod buffer;
pub mod cache;
pub mod container;
pub mod document;

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    rc::Rc,
};

use log::debug;
use nalgebra::{Matrix4, Quaternion, Translation3, UnitQuaternion, Vector3};
use serde_json::Value;

pub use buffer::{AccessorData, AccessorValues, ComponentType, ViewWindow};
pub use cache::{CacheOutcome, Memo};
pub use container::{RawDocument, split_container, write_container};
pub use document::Document;

use crate::{
    error::ImportError,
    skeleton::{BoneId, Skeleton, WeightChannels},
};
use buffer::{SparseOverride, decode_accessor, resolve_buffer_bytes, resolve_view_window};

// ─── Resolved entity shapes ───────────────────────────────────────────────────

/// Decoded image pixels (RGBA8).
#[derive(Debug, Clone)]
pub struct ImageData {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

/// Material parameters, reduced to what downstream consumers read.
#[derive(Debug, Clone)]
pub struct MaterialData {
    pub name: Option<String>,
    pub base_color: [f32; 4],
    pub base_color_image: Option<usize>,
    pub metallic: f32,
    pub roughness: f32,
    pub unlit: bool,
    pub double_sided: bool,
}

/// One decoded mesh primitive.
#[derive(Debug, Clone, Default)]
pub struct Primitive {
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub uvs: Vec<[f32; 2]>,
    pub indices: Vec<u32>,
    pub joints: Vec<[u16; 4]>,
    pub weights: Vec<[f32; 4]>,
    pub material: Option<usize>,
}

#[derive(Debug, Clone, Default)]
pub struct MeshData {
    pub name: Option<String>,
    pub primitives: Vec<Primitive>,
    pub skinned: bool,
}

/// Sparse index/value view windows, kept alive while their slices are read.
struct SparseWindows {
    count: usize,
    index_type: ComponentType,
    indices: Rc<ViewWindow>,
    index_offset: usize,
    values: Rc<ViewWindow>,
    value_offset: usize,
}

// ─── Importer ─────────────────────────────────────────────────────────────────

/// One import run: a validated document, the container blob, and the
/// per-kind resource caches.
pub struct Importer {
    base_dir: Option<PathBuf>,
    document: Document,
    blob: Option<Rc<Vec<u8>>>,
    buffers: Memo<Rc<Vec<u8>>>,
    views: Memo<Rc<ViewWindow>>,
    accessors: Memo<Rc<AccessorData>>,
    images: Memo<Rc<ImageData>>,
    materials: Memo<Rc<MaterialData>>,
    meshes: Memo<Rc<MeshData>>,
}

impl Importer {
    /// Open a `.gltf`/`.glb`/`.vrm` file. The file's directory becomes the
    /// base for resolving relative buffer/image URIs.
    pub fn open(path: &Path) -> Result<Self, ImportError> {
        let bytes = std::fs::read(path)?;
        Self::from_bytes(&bytes, path.parent())
    }

    pub fn from_bytes(bytes: &[u8], base_dir: Option<&Path>) -> Result<Self, ImportError> {
        let raw = split_container(bytes)?;
        let document = Document::parse(&raw.json)?;
        debug!(
            "loaded document: {} nodes, {} meshes, vrm={}",
            document.count("nodes"),
            document.count("meshes"),
            document.is_vrm()
        );

        Ok(Self {
            base_dir: base_dir.map(Path::to_path_buf),
            document,
            blob: raw.binary.map(Rc::new),
            buffers: Memo::default(),
            views: Memo::default(),
            accessors: Memo::default(),
            images: Memo::default(),
            materials: Memo::default(),
            meshes: Memo::default(),
        })
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    // ─── Leaf resources ───────────────────────────────────────────────────

    pub fn buffer(&mut self, index: usize) -> Result<Rc<Vec<u8>>, ImportError> {
        if let Some(hit) = self.buffers.hit(index) {
            return Ok(hit);
        }
        let entry = self.document.entry("buffers", index)?;
        let bytes = resolve_buffer_bytes(entry, self.base_dir.as_deref(), self.blob.as_ref())?;
        Ok(self.buffers.store(index, CacheOutcome::Cached(bytes)))
    }

    pub fn view(&mut self, index: usize) -> Result<Rc<ViewWindow>, ImportError> {
        if let Some(hit) = self.views.hit(index) {
            return Ok(hit);
        }
        let entry = self.document.entry("bufferViews", index)?.clone();
        let buffer_index = entry
            .get("buffer")
            .and_then(Value::as_u64)
            .ok_or_else(|| ImportError::Format("buffer view is missing buffer".into()))?
            as usize;
        let buffer = self.buffer(buffer_index)?;
        let window = resolve_view_window(&entry, &buffer)?;
        Ok(self.views.store(index, CacheOutcome::Cached(Rc::new(window))))
    }

    pub fn accessor(&mut self, index: usize) -> Result<Rc<AccessorData>, ImportError> {
        if let Some(hit) = self.accessors.hit(index) {
            return Ok(hit);
        }
        let entry = self.document.entry("accessors", index)?.clone();

        let base = match entry.get("bufferView").and_then(Value::as_u64) {
            Some(view_index) => Some(self.view(view_index as usize)?),
            None => None,
        };

        // Sparse index/value windows have to be resolved before decoding so
        // the borrowed slices outlive the decode call.
        let windows = match entry.get("sparse") {
            Some(sparse) => Some(self.resolve_sparse_windows(sparse)?),
            None => None,
        };
        let sparse = match &windows {
            Some(windows) => Some(SparseOverride {
                count: windows.count,
                indices: windows
                    .indices
                    .bytes
                    .get(windows.index_offset..)
                    .ok_or_else(|| {
                        ImportError::Format("sparse index offset exceeds view".into())
                    })?,
                index_type: windows.index_type,
                values: windows
                    .values
                    .bytes
                    .get(windows.value_offset..)
                    .ok_or_else(|| {
                        ImportError::Format("sparse value offset exceeds view".into())
                    })?,
            }),
            None => None,
        };

        let data = decode_accessor(&entry, base.as_deref(), sparse)?;
        Ok(self
            .accessors
            .store(index, CacheOutcome::Cached(Rc::new(data))))
    }

    fn resolve_sparse_windows(&mut self, sparse: &Value) -> Result<SparseWindows, ImportError> {
        let count = sparse.get("count").and_then(Value::as_u64).unwrap_or(0) as usize;

        let indices = sparse
            .get("indices")
            .ok_or_else(|| ImportError::Format("sparse accessor is missing indices".into()))?;
        let index_type = indices
            .get("componentType")
            .and_then(Value::as_u64)
            .and_then(ComponentType::from_code)
            .ok_or_else(|| ImportError::Format("unknown sparse index component type".into()))?;
        let index_view = self.view(
            indices
                .get("bufferView")
                .and_then(Value::as_u64)
                .ok_or_else(|| ImportError::Format("sparse indices missing bufferView".into()))?
                as usize,
        )?;
        let index_offset = indices
            .get("byteOffset")
            .and_then(Value::as_u64)
            .unwrap_or(0) as usize;

        let values = sparse
            .get("values")
            .ok_or_else(|| ImportError::Format("sparse accessor is missing values".into()))?;
        let value_view = self.view(
            values
                .get("bufferView")
                .and_then(Value::as_u64)
                .ok_or_else(|| ImportError::Format("sparse values missing bufferView".into()))?
                as usize,
        )?;
        let value_offset = values
            .get("byteOffset")
            .and_then(Value::as_u64)
            .unwrap_or(0) as usize;

        Ok(SparseWindows {
            count,
            index_type,
            indices: index_view,
            index_offset,
            values: value_view,
            value_offset,
        })
    }

    // ─── Composite resources ──────────────────────────────────────────────

    pub fn image(&mut self, index: usize) -> Result<Rc<ImageData>, ImportError> {
        if let Some(hit) = self.images.hit(index) {
            return Ok(hit);
        }
        let entry = self.document.entry("images", index)?.clone();

        let bytes: Vec<u8> = if let Some(view_index) = entry.get("bufferView").and_then(Value::as_u64)
        {
            self.view(view_index as usize)?.bytes.clone()
        } else {
            resolve_buffer_bytes(&entry, self.base_dir.as_deref(), None)?
                .as_ref()
                .clone()
        };

        let decoded = image::load_from_memory(&bytes)
            .map_err(|err| ImportError::Format(format!("failed to decode image {index}: {err}")))?
            .to_rgba8();

        let data = ImageData {
            width: decoded.width(),
            height: decoded.height(),
            pixels: decoded.into_raw(),
        };
        Ok(self.images.store(index, CacheOutcome::Cached(Rc::new(data))))
    }

    pub fn material(&mut self, index: usize) -> Result<Rc<MaterialData>, ImportError> {
        if let Some(hit) = self.materials.hit(index) {
            return Ok(hit);
        }
        let entry = self.document.entry("materials", index)?.clone();

        let extensions = entry.get("extensions").and_then(Value::as_object);
        let unlit = extensions
            .map(|ext| ext.contains_key("KHR_materials_unlit"))
            .unwrap_or(false);

        // Specular-glossiness documents carry the diffuse factor in the
        // extension block instead of pbrMetallicRoughness.
        let pbr = entry.get("pbrMetallicRoughness");
        let spec_gloss = extensions.and_then(|ext| ext.get("KHR_materials_pbrSpecularGlossiness"));

        let base_color = spec_gloss
            .and_then(|sg| sg.get("diffuseFactor"))
            .or_else(|| pbr.and_then(|pbr| pbr.get("baseColorFactor")))
            .and_then(Value::as_array)
            .filter(|values| values.len() == 4)
            .map(|values| {
                let mut color = [1.0f32; 4];
                for (slot, value) in values.iter().enumerate() {
                    color[slot] = value.as_f64().unwrap_or(1.0) as f32;
                }
                color
            })
            .unwrap_or([1.0; 4]);

        let base_color_image = spec_gloss
            .and_then(|sg| sg.pointer("/diffuseTexture/index"))
            .or_else(|| pbr.and_then(|pbr| pbr.pointer("/baseColorTexture/index")))
            .and_then(Value::as_u64)
            .and_then(|texture| self.texture_image_source(texture as usize));

        let data = MaterialData {
            name: entry
                .get("name")
                .and_then(Value::as_str)
                .map(ToOwned::to_owned),
            base_color,
            base_color_image,
            metallic: pbr
                .and_then(|pbr| pbr.get("metallicFactor"))
                .and_then(Value::as_f64)
                .unwrap_or(1.0) as f32,
            roughness: pbr
                .and_then(|pbr| pbr.get("roughnessFactor"))
                .and_then(Value::as_f64)
                .unwrap_or(1.0) as f32,
            unlit,
            double_sided: entry
                .get("doubleSided")
                .and_then(Value::as_bool)
                .unwrap_or(false),
        };
        Ok(self
            .materials
            .store(index, CacheOutcome::Cached(Rc::new(data))))
    }

    fn texture_image_source(&self, texture: usize) -> Option<usize> {
        let entry = self.document.entry("textures", texture).ok()?;
        // DDS textures park the image reference inside the extension block.
        entry
            .pointer("/extensions/MSFT_texture_dds/source")
            .or_else(|| entry.get("source"))
            .and_then(Value::as_u64)
            .map(|source| source as usize)
    }

    /// Resolve a mesh. Skinned meshes are transient: their joint/weight
    /// channel binding depends on the instantiating node's skin, so each
    /// instantiation re-resolves instead of sharing one cached object.
    pub fn mesh(&mut self, index: usize) -> Result<Rc<MeshData>, ImportError> {
        if let Some(hit) = self.meshes.hit(index) {
            return Ok(hit);
        }
        let entry = self.document.entry("meshes", index)?.clone();

        let mut data = MeshData {
            name: entry
                .get("name")
                .and_then(Value::as_str)
                .map(ToOwned::to_owned),
            ..MeshData::default()
        };

        let primitives = entry
            .get("primitives")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        for primitive in &primitives {
            data.primitives.push(self.decode_primitive(primitive)?);
        }
        data.skinned = data
            .primitives
            .iter()
            .any(|primitive| !primitive.joints.is_empty() && !primitive.weights.is_empty());

        let outcome = if data.skinned {
            CacheOutcome::Transient(Rc::new(data))
        } else {
            CacheOutcome::Cached(Rc::new(data))
        };
        Ok(self.meshes.store(index, outcome))
    }

    fn decode_primitive(&mut self, primitive: &Value) -> Result<Primitive, ImportError> {
        let mut out = Primitive {
            material: primitive
                .get("material")
                .and_then(Value::as_u64)
                .map(|material| material as usize),
            ..Primitive::default()
        };

        let attribute = |name: &str| -> Option<usize> {
            primitive
                .pointer(&format!("/attributes/{name}"))
                .and_then(Value::as_u64)
                .map(|index| index as usize)
        };

        if let Some(index) = attribute("POSITION") {
            out.positions = group::<3>(&*self.accessor(index)?);
        }
        if let Some(index) = attribute("NORMAL") {
            out.normals = group::<3>(&*self.accessor(index)?);
        }
        if let Some(index) = attribute("TEXCOORD_0") {
            out.uvs = group::<2>(&*self.accessor(index)?);
        }
        if let Some(index) = attribute("JOINTS_0") {
            out.joints = self
                .accessor(index)?
                .scalars_u32()
                .chunks_exact(4)
                .map(|lane| [lane[0] as u16, lane[1] as u16, lane[2] as u16, lane[3] as u16])
                .collect();
        }
        if let Some(index) = attribute("WEIGHTS_0") {
            out.weights = group::<4>(&*self.accessor(index)?);
        }
        if let Some(index) = primitive.get("indices").and_then(Value::as_u64) {
            out.indices = self.accessor(index as usize)?.scalars_u32();
        }

        Ok(out)
    }

    // ─── Armature bridge ──────────────────────────────────────────────────

    /// Build the collaborator-boundary skeleton and weight channels from the
    /// document's skins and skinned primitives.
    ///
    /// Skin joints become bones: head at the node's world translation, tail
    /// at the mean of joint-children heads (or a small upward stub for leaf
    /// joints). JOINTS_0/WEIGHTS_0 pairs become per-bone-name channels.
    pub fn build_armature(&mut self) -> Result<(Skeleton, WeightChannels), ImportError> {
        let root = self.document.root().clone();
        let nodes = root
            .get("nodes")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        let locals: Vec<Matrix4<f32>> = nodes.iter().map(node_local_matrix).collect();
        let parent_map = node_parent_map(&nodes);
        let worlds = node_world_matrices(&locals, &parent_map);

        // Union of all skins' joint nodes.
        let skins = root
            .get("skins")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        let mut joint_nodes: Vec<usize> = Vec::new();
        for skin in &skins {
            for joint in node_index_list(skin.get("joints")) {
                if !joint_nodes.contains(&joint) {
                    joint_nodes.push(joint);
                }
            }
        }

        let mut skeleton = Skeleton::default();
        let mut bone_of_node: HashMap<usize, BoneId> = HashMap::new();

        for &node_index in &joint_nodes {
            let name = nodes
                .get(node_index)
                .and_then(|node| node.get("name"))
                .and_then(Value::as_str)
                .map(ToOwned::to_owned)
                .unwrap_or_else(|| format!("Node_{node_index}"));
            let head = worlds
                .get(node_index)
                .map(translation_of)
                .unwrap_or_else(Vector3::zeros);
            let id = skeleton.add(name, None, head, head);
            bone_of_node.insert(node_index, id);
        }

        // Parent each bone to its nearest ancestor that is also a joint.
        for &node_index in &joint_nodes {
            let mut cursor = parent_map.get(&node_index).copied();
            while let Some(ancestor) = cursor {
                if let Some(&parent_bone) = bone_of_node.get(&ancestor) {
                    let bone = bone_of_node[&node_index];
                    skeleton.set_parent(bone, Some(parent_bone));
                    break;
                }
                cursor = parent_map.get(&ancestor).copied();
            }
        }

        // Tails: mean of child heads, or a short upward stub for leaves.
        for id in skeleton.ids() {
            let children = skeleton.children(id);
            let tail = if children.is_empty() {
                skeleton
                    .get(id)
                    .map(|bone| bone.head)
                    .unwrap_or_else(Vector3::zeros)
                    + Vector3::new(0.0, 0.0, 0.1)
            } else {
                let sum: Vector3<f32> = children
                    .iter()
                    .filter_map(|child| skeleton.get(*child))
                    .map(|bone| bone.head)
                    .sum();
                sum / children.len() as f32
            };
            if let Some(bone) = skeleton.get_mut(id) {
                bone.tail = tail;
                if (bone.tail - bone.head).norm() < 1e-5 {
                    bone.tail.z += 0.1;
                }
            }
        }

        // Weight channels from every skinned mesh instantiation.
        let mut channels = WeightChannels::default();
        let mut vertex_base: u32 = 0;
        for node in &nodes {
            let (Some(mesh_index), Some(skin_index)) = (
                node.get("mesh").and_then(Value::as_u64),
                node.get("skin").and_then(Value::as_u64),
            ) else {
                continue;
            };
            let joints = node_index_list(
                skins
                    .get(skin_index as usize)
                    .and_then(|skin| skin.get("joints")),
            );
            let mesh = self.mesh(mesh_index as usize)?;

            for primitive in &mesh.primitives {
                let count = primitive.joints.len().min(primitive.weights.len());
                for vertex in 0..count {
                    for lane in 0..4 {
                        let weight = primitive.weights[vertex][lane];
                        if weight <= 0.0 {
                            continue;
                        }
                        let slot = primitive.joints[vertex][lane] as usize;
                        let Some(&joint_node) = joints.get(slot) else {
                            continue;
                        };
                        let Some(&bone) = bone_of_node.get(&joint_node) else {
                            continue;
                        };
                        if let Some(name) = skeleton.name(bone) {
                            let name = name.to_string();
                            channels.add_weight(&name, vertex_base + vertex as u32, weight);
                        }
                    }
                }
                vertex_base += count as u32;
            }
        }

        debug!(
            "armature bridge: {} bones, {} weight channels",
            skeleton.len(),
            channels.len()
        );
        Ok((skeleton, channels))
    }
}

// ─── Node transform helpers ───────────────────────────────────────────────────

fn node_index_list(value: Option<&Value>) -> Vec<usize> {
    value
        .and_then(Value::as_array)
        .map(|entries| {
            entries
                .iter()
                .filter_map(|entry| entry.as_u64().map(|index| index as usize))
                .collect()
        })
        .unwrap_or_default()
}

fn node_parent_map(nodes: &[Value]) -> HashMap<usize, usize> {
    let mut parent_map = HashMap::new();
    for (parent_index, node) in nodes.iter().enumerate() {
        for child in node_index_list(node.get("children")) {
            parent_map.insert(child, parent_index);
        }
    }
    parent_map
}

/// Local transform from a node's `matrix` (column-major) or TRS fields.
fn node_local_matrix(node: &Value) -> Matrix4<f32> {
    if let Some(matrix) = node.get("matrix").and_then(Value::as_array)
        && matrix.len() == 16
    {
        let mut values = [0.0f32; 16];
        for (index, value) in matrix.iter().enumerate() {
            values[index] = value.as_f64().unwrap_or(0.0) as f32;
        }
        return Matrix4::from_column_slice(&values);
    }

    let translation = node
        .get("translation")
        .and_then(Value::as_array)
        .filter(|values| values.len() == 3)
        .map(|values| {
            Vector3::new(
                values[0].as_f64().unwrap_or(0.0) as f32,
                values[1].as_f64().unwrap_or(0.0) as f32,
                values[2].as_f64().unwrap_or(0.0) as f32,
            )
        })
        .unwrap_or_else(Vector3::zeros);

    let rotation = node
        .get("rotation")
        .and_then(Value::as_array)
        .filter(|values| values.len() == 4)
        .map(|values| {
            UnitQuaternion::from_quaternion(Quaternion::new(
                values[3].as_f64().unwrap_or(1.0) as f32,
                values[0].as_f64().unwrap_or(0.0) as f32,
                values[1].as_f64().unwrap_or(0.0) as f32,
                values[2].as_f64().unwrap_or(0.0) as f32,
            ))
        })
        .unwrap_or_else(UnitQuaternion::identity);

    let scale = node
        .get("scale")
        .and_then(Value::as_array)
        .filter(|values| values.len() == 3)
        .map(|values| {
            Vector3::new(
                values[0].as_f64().unwrap_or(1.0) as f32,
                values[1].as_f64().unwrap_or(1.0) as f32,
                values[2].as_f64().unwrap_or(1.0) as f32,
            )
        })
        .unwrap_or_else(|| Vector3::new(1.0, 1.0, 1.0));

    Translation3::from(translation).to_homogeneous()
        * rotation.to_homogeneous()
        * Matrix4::new_nonuniform_scaling(&scale)
}

/// World matrices from locals and parent links.
fn node_world_matrices(
    locals: &[Matrix4<f32>],
    parent_map: &HashMap<usize, usize>,
) -> Vec<Matrix4<f32>> {
    let mut worlds = vec![Matrix4::<f32>::identity(); locals.len()];
    let mut resolved = vec![false; locals.len()];
    for index in 0..locals.len() {
        resolve_world(index, locals, parent_map, &mut worlds, &mut resolved);
    }
    worlds
}

fn resolve_world(
    index: usize,
    locals: &[Matrix4<f32>],
    parent_map: &HashMap<usize, usize>,
    worlds: &mut [Matrix4<f32>],
    resolved: &mut [bool],
) {
    if resolved[index] {
        return;
    }
    let world = if let Some(parent) = parent_map.get(&index).copied() {
        resolve_world(parent, locals, parent_map, worlds, resolved);
        worlds[parent] * locals[index]
    } else {
        locals[index]
    };
    worlds[index] = world;
    resolved[index] = true;
}

fn translation_of(matrix: &Matrix4<f32>) -> Vector3<f32> {
    Vector3::new(matrix[(0, 3)], matrix[(1, 3)], matrix[(2, 3)])
}

fn group<const N: usize>(data: &AccessorData) -> Vec<[f32; N]> {
    (0..data.count)
        .filter_map(|index| data.element(index))
        .map(|element| {
            let mut lanes = [0.0f32; N];
            for (slot, lane) in lanes.iter_mut().enumerate() {
                *lane = element.get(slot).copied().unwrap_or(0.0);
            }
            lanes
        })
        .collect()
}

// ─── Tests ────────────────────────────────────────────────────────────────────
