use anyhow::{Result, bail};
use std::time::Instant;

use crate::VertexData;
use crate::geometry::compute_bounds;
use crate::processor::LodConfig;
use crate::processor::optimizer::{average_cache_miss_ratio, optimize_vertex_cache};
use crate::processor::simplifier::simplify;
use crate::processor::types::*;

/// Levels whose target drops below this many indices (12 triangles) are not
/// generated.
pub const MIN_LOD_INDEX_COUNT: usize = 36;

/// Screen-size threshold of LOD0 when the config carries none.
const FALLBACK_LOD0_THRESHOLD: f32 = 0.1;

pub struct LodBuilder<'a> {
    vertices: &'a [VertexData],
    config: &'a LodConfig,
}

impl<'a> LodBuilder<'a> {
    pub fn new(vertices: &'a [VertexData], config: &'a LodConfig) -> Self {
        Self { vertices, config }
    }

    pub fn build(&self, indices: &[u32]) -> Result<LodBuildOutput> {
        let start = Instant::now();
        self.validate(indices)?;

        let (aabb, bounding_sphere) = compute_bounds(self.vertices);
        let mut mesh = LodMesh {
            aabb,
            bounding_sphere,
            ..Default::default()
        };
        let original_triangles = indices.len() / 3;
        let mut stats = LodStats {
            original_triangles,
            ..Default::default()
        };

        if self.vertices.is_empty() || indices.is_empty() {
            stats.processing_time = start.elapsed();
            return Ok(LodBuildOutput { mesh, stats });
        }

        let mut current = self.push_level(&mut mesh, indices, 0, 0.0);
        stats.record_level(current.len() / 3, indices.len(), 0.0, None);

        for level in 1..self.config.max_lod_levels {
            let target_index_count =
                (current.len() as f32 * self.config.target_reduction_per_level).floor() as usize;
            if target_index_count < MIN_LOD_INDEX_COUNT {
                log::debug!(
                    "LOD {}: target {} indices is below the floor, stopping",
                    level,
                    target_index_count
                );
                break;
            }

            let target_error = self.config.error_threshold * level as f32;
            let outcome = simplify(
                self.vertices,
                &current,
                target_index_count,
                target_error,
                self.config.lock_borders,
            )?;

            if !outcome.made_progress(current.len()) {
                log::debug!(
                    "LOD {}: no progress ({} -> {} indices), stopping",
                    level,
                    current.len(),
                    outcome.indices.len()
                );
                break;
            }

            current = self.push_level(&mut mesh, &outcome.indices, level, outcome.error);
            stats.record_level(
                current.len() / 3,
                target_index_count,
                outcome.error,
                Some(outcome.strategy),
            );
        }

        stats.total_triangles = mesh.total_triangles();
        stats.processing_time = start.elapsed();
        Ok(LodBuildOutput { mesh, stats })
    }

    fn validate(&self, indices: &[u32]) -> Result<()> {
        if indices.len() % 3 != 0 {
            bail!("Index count {} is not a multiple of 3", indices.len());
        }
        if let Some(&bad) = indices.iter().find(|&&i| i as usize >= self.vertices.len()) {
            bail!(
                "Index {} out of range for {} vertices",
                bad,
                self.vertices.len()
            );
        }
        Ok(())
    }

    /// Cache-optimizes `indices`, appends the level and returns the optimized
    /// index buffer the next level is simplified from.
    fn push_level(&self, mesh: &mut LodMesh, indices: &[u32], level: usize, error: f32) -> Vec<u32> {
        let optimized = optimize_vertex_cache(indices, self.vertices.len());
        let screen_size_threshold = self.screen_size_threshold(level);
        let triangle_count = optimized.len() / 3;

        log::debug!(
            "LOD {}: {} tris, error {:.5}, ACMR {:.3}",
            level,
            triangle_count,
            error,
            average_cache_miss_ratio(&optimized, self.vertices.len())
        );

        mesh.lod_levels.push(LodLevel {
            vertices: self.vertices.to_vec(),
            indices: optimized.clone(),
            error,
            screen_size_threshold,
        });
        optimized
    }

    fn screen_size_threshold(&self, level: usize) -> f32 {
        let thresholds = &self.config.screen_size_thresholds;
        match thresholds.get(level) {
            Some(&t) => t,
            None if level == 0 && thresholds.is_empty() => FALLBACK_LOD0_THRESHOLD,
            None => 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad() -> (Vec<VertexData>, Vec<u32>) {
        let vertices = [
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0],
            [1.0, 0.0, 1.0],
        ]
        .into_iter()
        .map(VertexData::from_position)
        .collect();
        (vertices, vec![0, 1, 2, 2, 1, 3])
    }

    #[test]
    fn threshold_lookup() {
        let (vertices, _) = quad();
        let config = LodConfig {
            screen_size_thresholds: vec![0.3, 0.2],
            ..Default::default()
        };
        let builder = LodBuilder::new(&vertices, &config);
        assert_eq!(builder.screen_size_threshold(0), 0.3);
        assert_eq!(builder.screen_size_threshold(1), 0.2);
        assert_eq!(builder.screen_size_threshold(2), 0.0);

        let empty = LodConfig {
            screen_size_thresholds: Vec::new(),
            ..Default::default()
        };
        let builder = LodBuilder::new(&vertices, &empty);
        assert_eq!(builder.screen_size_threshold(0), FALLBACK_LOD0_THRESHOLD);
        assert_eq!(builder.screen_size_threshold(1), 0.0);
    }

    #[test]
    fn rejects_out_of_range_index() {
        let (vertices, _) = quad();
        let config = LodConfig::default();
        let err = LodBuilder::new(&vertices, &config)
            .build(&[0, 1, 4])
            .err()
            .unwrap();
        assert!(err.to_string().contains("out of range"));
    }

    #[test]
    fn rejects_partial_triangle() {
        let (vertices, _) = quad();
        let config = LodConfig::default();
        assert!(LodBuilder::new(&vertices, &config).build(&[0, 1]).is_err());
    }

    #[test]
    fn lod0_stats() {
        let (vertices, indices) = quad();
        let config = LodConfig::default();
        let out = LodBuilder::new(&vertices, &config).build(&indices).unwrap();

        assert_eq!(out.mesh.lod_levels.len(), 1);
        assert_eq!(out.stats.original_triangles, 2);
        assert_eq!(out.stats.triangle_counts(), vec![2]);
        assert_eq!(out.stats.reduction_ratios(), vec![1.0]);
        assert_eq!(out.stats.total_triangles, 2);
        assert_eq!(out.stats.levels[0].strategy, None);
    }
}
