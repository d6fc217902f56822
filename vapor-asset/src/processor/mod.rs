pub mod builder;
pub mod optimizer;
pub mod simplifier;
pub mod types;

pub use builder::LodBuilder;
pub use types::*;

use anyhow::{Context, Result, ensure};
use rayon::prelude::*;
use std::time::Instant;

use crate::VertexData;
use crate::ingest::ImportedScene;

/// Screen-size threshold of LOD0 in the derived series.
pub const BASE_SCREEN_SIZE_THRESHOLD: f32 = 0.15;

#[derive(Clone, Debug, PartialEq)]
pub struct LodConfig {
    pub max_lod_levels: usize,
    /// Fraction of the previous level's indices each new level aims for.
    pub target_reduction_per_level: f32,
    /// Error budget of LOD1; level `n` gets `n` times this.
    pub error_threshold: f32,
    pub lock_borders: bool,
    pub screen_size_thresholds: Vec<f32>,
}

impl LodConfig {
    /// `0.15 * 0.5^i` for each of the `count` levels.
    pub fn derived_thresholds(count: usize) -> Vec<f32> {
        (0..count)
            .map(|i| BASE_SCREEN_SIZE_THRESHOLD * 0.5f32.powi(i as i32))
            .collect()
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(self.max_lod_levels >= 1, "max LOD levels must be at least 1");
        ensure!(
            self.target_reduction_per_level > 0.0 && self.target_reduction_per_level < 1.0,
            "reduction per level must be in (0, 1), got {}",
            self.target_reduction_per_level
        );
        ensure!(
            self.error_threshold >= 0.0,
            "error threshold must not be negative, got {}",
            self.error_threshold
        );
        Ok(())
    }
}

impl Default for LodConfig {
    fn default() -> Self {
        let max_lod_levels = 5;
        Self {
            max_lod_levels,
            target_reduction_per_level: 0.5,
            error_threshold: 0.01,
            lock_borders: true,
            screen_size_thresholds: Self::derived_thresholds(max_lod_levels),
        }
    }
}

pub fn generate_lods(
    vertices: &[VertexData],
    indices: &[u32],
    config: &LodConfig,
) -> Result<LodBuildOutput> {
    LodBuilder::new(vertices, config).build(indices)
}

/// Builds the LOD chain of every imported primitive and assembles the scene.
///
/// Chains are generated in parallel but collected and summed in primitive
/// order, so totals match a sequential run.
pub fn generate_scene(imported: ImportedScene, config: &LodConfig) -> Result<SceneReport> {
    config.validate()?;
    let start = Instant::now();

    let outputs: Vec<LodBuildOutput> = imported
        .primitives
        .par_iter()
        .map(|primitive| -> Result<LodBuildOutput> {
            let vertices = primitive.to_vertices();
            let mut output = generate_lods(&vertices, &primitive.indices, config)
                .with_context(|| format!("Failed to generate LODs for {}", primitive.name))?;
            output.mesh.name = primitive.name.clone();
            output.mesh.material_index = primitive.material_index;
            Ok(output)
        })
        .collect::<Result<_>>()?;

    let mut scene = SceneData {
        name: imported.name,
        materials: imported.materials,
        root_nodes: imported.root_nodes,
        ..Default::default()
    };
    let mut mesh_stats = Vec::with_capacity(outputs.len());

    for LodBuildOutput { mesh, stats } in outputs {
        scene.total_original_triangles += stats.original_triangles as u64;
        scene.total_triangles_with_lods += stats.total_triangles as u64;

        log::info!(
            "{}: {} LODs, tris {:?} in {:.2}ms",
            mesh.name,
            mesh.lod_levels.len(),
            stats.triangle_counts(),
            stats.processing_time.as_secs_f32() * 1000.0
        );

        scene.meshes.push(mesh);
        mesh_stats.push(stats);
    }

    Ok(SceneReport {
        scene,
        mesh_stats,
        processing_time: start.elapsed(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_thresholds_halve() {
        let t = LodConfig::derived_thresholds(4);
        assert_eq!(t, vec![0.15, 0.075, 0.0375, 0.01875]);
    }

    #[test]
    fn default_config_is_valid() {
        let config = LodConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.screen_size_thresholds.len(), config.max_lod_levels);
    }

    #[test]
    fn rejects_bad_reduction() {
        for r in [0.0, 1.0, 1.5, -0.2] {
            let config = LodConfig {
                target_reduction_per_level: r,
                ..Default::default()
            };
            assert!(config.validate().is_err(), "{r} accepted");
        }
    }

    #[test]
    fn rejects_zero_levels() {
        let config = LodConfig {
            max_lod_levels: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
