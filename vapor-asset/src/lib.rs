use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

pub mod archive;
pub mod geometry;
pub mod ingest;
pub mod processor;

pub use archive::{ArchiveError, read_scene, write_scene};
pub use geometry::{Aabb, BoundingSphere, compute_bounds};
pub use ingest::{ImportedScene, RawPrimitive, import_scene};
pub use processor::{
    LodBuildOutput, LodBuilder, LodConfig, LodLevel, LodMesh, LodStats, MaterialData, SceneData,
    SceneNode, SceneReport, generate_lods, generate_scene,
};

#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
pub struct VertexData {
    pub position: [f32; 3], // 12 bytes
    pub uv: [f32; 2],       // 8 bytes
    pub normal: [f32; 3],   // 12 bytes
    pub tangent: [f32; 4],  // 16 bytes, w = handedness; 48 total
}

impl VertexData {
    pub const DEFAULT_UV: [f32; 2] = [0.0, 0.0];
    pub const DEFAULT_NORMAL: [f32; 3] = [0.0, 1.0, 0.0];
    pub const DEFAULT_TANGENT: [f32; 4] = [1.0, 0.0, 0.0, 1.0];

    /// A vertex at `position` with every other attribute default-filled.
    pub fn from_position(position: [f32; 3]) -> Self {
        Self {
            position,
            uv: Self::DEFAULT_UV,
            normal: Self::DEFAULT_NORMAL,
            tangent: Self::DEFAULT_TANGENT,
        }
    }
}
