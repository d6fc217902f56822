use anyhow::{Context, Result};
use glam::Vec4;
use meshopt::{generate_vertex_remap, remap_index_buffer, remap_vertex_buffer};
use std::path::Path;

use super::{ImportedScene, RawPrimitive, scene_name};
use crate::processor::{MaterialData, SceneNode};

/// Loads a Wavefront OBJ. Every model becomes one primitive under its own
/// root node; identical vertices are welded.
pub fn load_obj(path: &Path) -> Result<ImportedScene> {
    let (models, obj_materials) = tobj::load_obj(path, &tobj::GPU_LOAD_OPTIONS)
        .with_context(|| format!("Failed to load OBJ file: {}", path.display()))?;

    let mut materials: Vec<MaterialData> = match obj_materials {
        Ok(materials) => materials.into_iter().map(convert_material).collect(),
        Err(e) => {
            log::warn!("{}: material library not loaded: {}", path.display(), e);
            Vec::new()
        }
    };
    let mut default_material = None;

    let mut primitives = Vec::new();
    let mut root_nodes = Vec::new();

    for (model_index, model) in models.into_iter().enumerate() {
        let mesh = model.mesh;
        let name = if model.name.is_empty() {
            format!("model_{model_index}")
        } else {
            model.name
        };

        let material_index = match mesh.material_id.filter(|&id| id < materials.len()) {
            Some(id) => id as u32,
            None => ImportedScene::default_material(&mut default_material, &mut materials),
        };

        let raw = weld(RawPrimitive {
            name,
            positions: mesh.positions.chunks_exact(3).map(|p| [p[0], p[1], p[2]]).collect(),
            uvs: (!mesh.texcoords.is_empty())
                .then(|| mesh.texcoords.chunks_exact(2).map(|t| [t[0], t[1]]).collect()),
            normals: (!mesh.normals.is_empty())
                .then(|| mesh.normals.chunks_exact(3).map(|n| [n[0], n[1], n[2]]).collect()),
            tangents: None,
            indices: mesh.indices,
            material_index,
        });

        if let Some(reason) = raw.rejection() {
            log::warn!("Skipping {}: {}", raw.name, reason);
            continue;
        }
        if raw.normals.is_none() {
            log::warn!("{}: no normals, using defaults", raw.name);
        }

        let mut node = SceneNode::new(raw.name.clone());
        node.mesh_indices.push(primitives.len() as u32);
        root_nodes.push(node);
        primitives.push(raw);
    }

    log::info!(
        "Loaded {}: {} primitives, {} materials",
        path.display(),
        primitives.len(),
        materials.len()
    );

    Ok(ImportedScene {
        name: scene_name(path),
        primitives,
        materials,
        root_nodes,
    })
}

/// Merges bit-identical vertices so the simplifier sees a connected mesh.
fn weld(primitive: RawPrimitive) -> RawPrimitive {
    if primitive.rejection().is_some() {
        return primitive;
    }

    let vertices = primitive.to_vertices();
    let source_indices = primitive.indices.as_slice();
    let (vertex_count, remap) = generate_vertex_remap(&vertices, Some(source_indices));
    let welded = remap_vertex_buffer(&vertices, vertex_count, &remap);
    let indices = remap_index_buffer(Some(source_indices), vertex_count, &remap);

    let keep_uvs = primitive.uvs.is_some();
    let keep_normals = primitive.normals.is_some();
    RawPrimitive {
        positions: welded.iter().map(|v| v.position).collect(),
        uvs: keep_uvs.then(|| welded.iter().map(|v| v.uv).collect()),
        normals: keep_normals.then(|| welded.iter().map(|v| v.normal).collect()),
        tangents: None,
        indices,
        ..primitive
    }
}

fn convert_material(material: tobj::Material) -> MaterialData {
    let [r, g, b] = material.diffuse.unwrap_or([1.0, 1.0, 1.0]);
    MaterialData {
        name: material.name,
        base_color_factor: Vec4::new(r, g, b, material.dissolve.unwrap_or(1.0)),
        metallic_factor: 0.0,
        roughness_factor: 1.0,
        base_color_texture: material.diffuse_texture,
        metallic_roughness_texture: None,
        normal_texture: material.normal_texture,
    }
}
