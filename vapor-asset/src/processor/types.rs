use glam::{Mat4, Vec4};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::VertexData;
use crate::geometry::{Aabb, BoundingSphere};
use crate::processor::simplifier::SimplifyStrategy;

/// One simplification tier. Owns its own copy of the vertex buffer; only the
/// indices decide which vertices are live.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LodLevel {
    pub vertices: Vec<VertexData>,
    pub indices: Vec<u32>,
    pub error: f32,
    pub screen_size_threshold: f32,
}

impl LodLevel {
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}

/// Full LOD chain of a single source primitive. `lod_levels[0]` is the most
/// detailed level.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LodMesh {
    pub name: String,
    pub lod_levels: Vec<LodLevel>,
    pub aabb: Aabb,
    pub bounding_sphere: BoundingSphere,
    pub material_index: u32,
}

impl LodMesh {
    pub fn total_triangles(&self) -> usize {
        self.lod_levels.iter().map(LodLevel::triangle_count).sum()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MaterialData {
    pub name: String,
    pub base_color_factor: Vec4,
    pub metallic_factor: f32,
    pub roughness_factor: f32,
    pub base_color_texture: Option<String>,
    pub metallic_roughness_texture: Option<String>,
    pub normal_texture: Option<String>,
}

impl Default for MaterialData {
    fn default() -> Self {
        // glTF defaults for an unset pbrMetallicRoughness block
        Self {
            name: "default".to_string(),
            base_color_factor: Vec4::ONE,
            metallic_factor: 1.0,
            roughness_factor: 1.0,
            base_color_texture: None,
            metallic_roughness_texture: None,
            normal_texture: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SceneNode {
    pub name: String,
    pub transform: Mat4,
    /// Indices into `SceneData::meshes` (one entry per kept primitive).
    pub mesh_indices: Vec<u32>,
    pub children: Vec<SceneNode>,
}

impl SceneNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            transform: Mat4::IDENTITY,
            mesh_indices: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Number of nodes in this subtree, counted without recursion.
    pub fn subtree_len(&self) -> usize {
        let mut count = 0;
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            count += 1;
            stack.extend(node.children.iter());
        }
        count
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SceneData {
    pub name: String,
    pub meshes: Vec<LodMesh>,
    pub materials: Vec<MaterialData>,
    pub root_nodes: Vec<SceneNode>,
    pub total_original_triangles: u64,
    pub total_triangles_with_lods: u64,
}

impl SceneData {
    pub fn node_count(&self) -> usize {
        self.root_nodes.iter().map(SceneNode::subtree_len).sum()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct LevelStats {
    pub triangle_count: usize,
    /// Index count requested from the simplifier (the source count for LOD0).
    pub target_index_count: usize,
    /// `triangle_count / original_triangles`
    pub reduction_ratio: f32,
    pub error: f32,
    /// `None` for LOD0, which is never simplified.
    pub strategy: Option<SimplifyStrategy>,
}

/// Statistics of one `LodBuilder::build` call.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LodStats {
    pub original_triangles: usize,
    pub levels: Vec<LevelStats>,
    pub total_triangles: usize,
    pub processing_time: Duration,
}

impl LodStats {
    pub(crate) fn record_level(
        &mut self,
        triangle_count: usize,
        target_index_count: usize,
        error: f32,
        strategy: Option<SimplifyStrategy>,
    ) {
        self.levels.push(LevelStats {
            triangle_count,
            target_index_count,
            reduction_ratio: triangle_count as f32 / self.original_triangles as f32,
            error,
            strategy,
        });
    }

    pub fn triangle_counts(&self) -> Vec<usize> {
        self.levels.iter().map(|l| l.triangle_count).collect()
    }

    pub fn reduction_ratios(&self) -> Vec<f32> {
        self.levels.iter().map(|l| l.reduction_ratio).collect()
    }
}

pub struct LodBuildOutput {
    pub mesh: LodMesh,
    pub stats: LodStats,
}

/// Result of processing a whole imported scene.
pub struct SceneReport {
    pub scene: SceneData,
    /// Per-mesh stats, parallel to `scene.meshes`.
    pub mesh_stats: Vec<LodStats>,
    pub processing_time: Duration,
}
