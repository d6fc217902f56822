//! Local-space bounds shared by every LOD level of a mesh.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::VertexData;

#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn extent(&self) -> Vec3 {
        self.max - self.min
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BoundingSphere {
    pub center: Vec3,
    pub radius: f32,
}

/// Component-wise AABB plus a sphere centred on the AABB midpoint whose
/// radius reaches the furthest vertex.
///
/// Not the minimal enclosing sphere. An empty buffer gives all-zero bounds.
pub fn compute_bounds(vertices: &[VertexData]) -> (Aabb, BoundingSphere) {
    if vertices.is_empty() {
        return (Aabb::default(), BoundingSphere::default());
    }

    let mut min = Vec3::splat(f32::MAX);
    let mut max = Vec3::splat(f32::MIN);
    for v in vertices {
        let p = Vec3::from_array(v.position);
        min = min.min(p);
        max = max.max(p);
    }
    let aabb = Aabb { min, max };

    let center = aabb.center();
    let mut radius: f32 = 0.0;
    for v in vertices {
        radius = radius.max(center.distance(Vec3::from_array(v.position)));
    }

    (aabb, BoundingSphere { center, radius })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn verts(points: &[[f32; 3]]) -> Vec<VertexData> {
        points.iter().copied().map(VertexData::from_position).collect()
    }

    #[test]
    fn triangle_bounds() {
        let (aabb, sphere) = compute_bounds(&verts(&[
            [-1.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [0.0, 1.0, 0.0],
        ]));

        assert_eq!(aabb.min, Vec3::new(-1.0, 0.0, 0.0));
        assert_eq!(aabb.max, Vec3::new(1.0, 1.0, 0.0));
        assert_eq!(sphere.center, Vec3::new(0.0, 0.5, 0.0));
        assert!((sphere.radius - 1.25f32.sqrt()).abs() < 1e-6);
    }

    #[test]
    fn empty_is_all_zero() {
        let (aabb, sphere) = compute_bounds(&[]);
        assert_eq!(aabb.min, Vec3::ZERO);
        assert_eq!(aabb.max, Vec3::ZERO);
        assert_eq!(sphere.center, Vec3::ZERO);
        assert_eq!(sphere.radius, 0.0);
    }

    #[test]
    fn radius_is_looser_than_minimal_sphere() {
        // Minimal sphere of this set has radius 1 around the origin; the
        // AABB-centred one is shifted and must grow to cover (-1, 0, 0).
        let (_, sphere) = compute_bounds(&verts(&[
            [-1.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [0.0, 0.9, 0.0],
        ]));
        assert_eq!(sphere.center, Vec3::new(0.0, 0.45, 0.0));
        assert!(sphere.radius > 1.0);
    }
}
