//! Source-scene ingestion. Produces raw per-primitive geometry, materials and
//! the node forest; LOD generation happens later in [`crate::processor`].

pub mod gltf_loader;
pub mod obj_loader;

use anyhow::{Result, bail};
use std::path::Path;

use crate::VertexData;
use crate::processor::{MaterialData, SceneNode};

/// One triangle-list primitive as handed over by a loader.
#[derive(Clone, Debug, Default)]
pub struct RawPrimitive {
    pub name: String,
    pub positions: Vec<[f32; 3]>,
    pub uvs: Option<Vec<[f32; 2]>>,
    pub normals: Option<Vec<[f32; 3]>>,
    pub tangents: Option<Vec<[f32; 4]>>,
    pub indices: Vec<u32>,
    pub material_index: u32,
}

impl RawPrimitive {
    /// Interleaves the attribute streams, default-filling missing ones.
    pub fn to_vertices(&self) -> Vec<VertexData> {
        self.positions
            .iter()
            .enumerate()
            .map(|(i, &position)| VertexData {
                position,
                uv: attribute(&self.uvs, i).unwrap_or(VertexData::DEFAULT_UV),
                normal: attribute(&self.normals, i).unwrap_or(VertexData::DEFAULT_NORMAL),
                tangent: attribute(&self.tangents, i).unwrap_or(VertexData::DEFAULT_TANGENT),
            })
            .collect()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Reason this primitive cannot be processed, if any.
    pub(crate) fn rejection(&self) -> Option<String> {
        if self.positions.is_empty() {
            return Some("no positions".to_string());
        }
        if self.indices.is_empty() {
            return Some("no indices".to_string());
        }
        if self.indices.len() % 3 != 0 {
            return Some(format!("{} indices is not a triangle list", self.indices.len()));
        }
        let vertex_count = self.positions.len();
        if let Some(&bad) = self.indices.iter().find(|&&i| i as usize >= vertex_count) {
            return Some(format!("index {bad} out of range for {vertex_count} vertices"));
        }
        None
    }
}

fn attribute<T: Copy>(stream: &Option<Vec<T>>, i: usize) -> Option<T> {
    stream.as_ref().and_then(|s| s.get(i).copied())
}

/// Everything ingestion hands to the LOD stage. Node mesh indices point into
/// `primitives`.
#[derive(Clone, Debug, Default)]
pub struct ImportedScene {
    pub name: String,
    pub primitives: Vec<RawPrimitive>,
    pub materials: Vec<MaterialData>,
    pub root_nodes: Vec<SceneNode>,
}

impl ImportedScene {
    /// Index of the shared fallback material, appended on first use.
    pub(crate) fn default_material(slot: &mut Option<u32>, materials: &mut Vec<MaterialData>) -> u32 {
        *slot.get_or_insert_with(|| {
            materials.push(MaterialData::default());
            (materials.len() - 1) as u32
        })
    }
}

/// Loads `.gltf`, `.glb` or `.obj` files.
pub fn import_scene<P: AsRef<Path>>(path: P) -> Result<ImportedScene> {
    let path = path.as_ref();
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    match extension.as_deref() {
        Some("gltf") | Some("glb") => gltf_loader::load_gltf(path),
        Some("obj") => obj_loader::load_obj(path),
        _ => bail!("Unsupported input format: {}", path.display()),
    }
}

pub(crate) fn scene_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "scene".to_string())
}
