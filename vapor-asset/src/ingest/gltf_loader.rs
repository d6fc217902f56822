use anyhow::{Context, Result};
use glam::{Mat4, Vec4};
use gltf::mesh::Mode;
use std::path::Path;

use super::{ImportedScene, RawPrimitive, scene_name};
use crate::processor::{MaterialData, SceneNode};

/// Loads a `.gltf` or `.glb` file. Textures are referenced by URI only, image
/// data is never decoded.
pub fn load_gltf(path: &Path) -> Result<ImportedScene> {
    let gltf::Gltf { document, blob } = gltf::Gltf::open(path)
        .with_context(|| format!("Failed to parse glTF file: {}", path.display()))?;
    let buffers = gltf::import_buffers(&document, path.parent(), blob)
        .with_context(|| format!("Failed to load glTF buffers for {}", path.display()))?;

    let mut materials: Vec<MaterialData> = document.materials().map(convert_material).collect();
    let mut default_material = None;

    let mut primitives = Vec::new();
    // glTF mesh index -> indices of its kept primitives in `primitives`
    let mut mesh_primitives: Vec<Vec<u32>> = vec![Vec::new(); document.meshes().count()];

    for mesh in document.meshes() {
        let mesh_name = mesh
            .name()
            .map(str::to_string)
            .unwrap_or_else(|| format!("mesh_{}", mesh.index()));
        let primitive_count = mesh.primitives().count();

        for primitive in mesh.primitives() {
            let name = if primitive_count == 1 {
                mesh_name.clone()
            } else {
                format!("{}_{}", mesh_name, primitive.index())
            };

            if !matches!(primitive.mode(), Mode::Triangles) {
                log::warn!("Skipping {}: unsupported topology {:?}", name, primitive.mode());
                continue;
            }

            let reader =
                primitive.reader(|buffer| buffers.get(buffer.index()).map(|d| d.0.as_slice()));

            let positions: Vec<[f32; 3]> = reader
                .read_positions()
                .map(|iter| iter.collect())
                .unwrap_or_default();
            let indices: Vec<u32> = reader
                .read_indices()
                .map(|iter| iter.into_u32().collect())
                .unwrap_or_default();
            let uvs: Option<Vec<[f32; 2]>> =
                reader.read_tex_coords(0).map(|iter| iter.into_f32().collect());
            let normals: Option<Vec<[f32; 3]>> = reader.read_normals().map(|iter| iter.collect());
            let tangents: Option<Vec<[f32; 4]>> = reader.read_tangents().map(|iter| iter.collect());

            for (attribute, missing) in [
                ("TEXCOORD_0", uvs.is_none()),
                ("NORMAL", normals.is_none()),
                ("TANGENT", tangents.is_none()),
            ] {
                if missing {
                    log::warn!("{}: no {} attribute, using defaults", name, attribute);
                }
            }

            let material_index = match primitive.material().index() {
                Some(index) => index as u32,
                None => ImportedScene::default_material(&mut default_material, &mut materials),
            };

            let raw = RawPrimitive {
                name,
                positions,
                uvs,
                normals,
                tangents,
                indices,
                material_index,
            };
            if let Some(reason) = raw.rejection() {
                log::warn!("Skipping {}: {}", raw.name, reason);
                continue;
            }

            mesh_primitives[mesh.index()].push(primitives.len() as u32);
            primitives.push(raw);
        }
    }

    let root_nodes = build_node_forest(&document, &mesh_primitives);

    log::info!(
        "Loaded {}: {} primitives, {} materials, {} root nodes",
        path.display(),
        primitives.len(),
        materials.len(),
        root_nodes.len()
    );

    Ok(ImportedScene {
        name: scene_name(path),
        primitives,
        materials,
        root_nodes,
    })
}

fn convert_material(material: gltf::Material<'_>) -> MaterialData {
    let pbr = material.pbr_metallic_roughness();
    MaterialData {
        name: material
            .name()
            .map(str::to_string)
            .unwrap_or_else(|| format!("material_{}", material.index().unwrap_or_default())),
        base_color_factor: Vec4::from_array(pbr.base_color_factor()),
        metallic_factor: pbr.metallic_factor(),
        roughness_factor: pbr.roughness_factor(),
        base_color_texture: pbr.base_color_texture().and_then(|info| texture_uri(info.texture())),
        metallic_roughness_texture: pbr
            .metallic_roughness_texture()
            .and_then(|info| texture_uri(info.texture())),
        normal_texture: material
            .normal_texture()
            .and_then(|normal| texture_uri(normal.texture())),
    }
}

/// Embedded (buffer view) images have no path.
fn texture_uri(texture: gltf::Texture<'_>) -> Option<String> {
    match texture.source().source() {
        gltf::image::Source::Uri { uri, .. } => Some(uri.to_string()),
        gltf::image::Source::View { .. } => None,
    }
}

/// Roots of the default scene, else the first scene, else every node without
/// a parent.
fn root_node_indices(document: &gltf::Document) -> Vec<usize> {
    if let Some(scene) = document.default_scene().or_else(|| document.scenes().next()) {
        return scene.nodes().map(|n| n.index()).collect();
    }

    let mut has_parent = vec![false; document.nodes().count()];
    for node in document.nodes() {
        for child in node.children() {
            has_parent[child.index()] = true;
        }
    }
    (0..has_parent.len()).filter(|&i| !has_parent[i]).collect()
}

/// Builds the owned node tree with an explicit stack.
///
/// Nodes are first laid out in depth-first pre-order together with their
/// parent slot; walking that list backwards guarantees every child is
/// complete before it is moved into its parent.
fn build_node_forest(document: &gltf::Document, mesh_primitives: &[Vec<u32>]) -> Vec<SceneNode> {
    let nodes: Vec<gltf::Node<'_>> = document.nodes().collect();
    let mut visited = vec![false; nodes.len()];
    let mut ordered: Vec<(Option<SceneNode>, Option<usize>)> = Vec::with_capacity(nodes.len());

    let mut stack: Vec<(usize, Option<usize>)> = root_node_indices(document)
        .into_iter()
        .rev()
        .map(|i| (i, None))
        .collect();

    while let Some((index, parent)) = stack.pop() {
        if visited[index] {
            log::warn!("Node {} is referenced more than once, ignoring repeat", index);
            continue;
        }
        visited[index] = true;

        let node = &nodes[index];
        let slot = ordered.len();
        ordered.push((Some(convert_node(node, mesh_primitives)), parent));

        let children: Vec<usize> = node.children().map(|c| c.index()).collect();
        stack.extend(children.into_iter().rev().map(|c| (c, Some(slot))));
    }

    let mut roots = Vec::new();
    for slot in (0..ordered.len()).rev() {
        let (node, parent) = &mut ordered[slot];
        let Some(mut node) = node.take() else {
            continue;
        };
        let parent = *parent;
        // Children were attached last-first.
        node.children.reverse();
        match parent {
            Some(p) => {
                if let Some(parent_node) = ordered[p].0.as_mut() {
                    parent_node.children.push(node);
                }
            }
            None => roots.push(node),
        }
    }
    roots.reverse();
    roots
}

fn convert_node(node: &gltf::Node<'_>, mesh_primitives: &[Vec<u32>]) -> SceneNode {
    let mut scene_node = SceneNode::new(
        node.name()
            .map(str::to_string)
            .unwrap_or_else(|| format!("node_{}", node.index())),
    );
    scene_node.transform = Mat4::from_cols_array_2d(&node.transform().matrix());
    if let Some(mesh) = node.mesh() {
        scene_node.mesh_indices = mesh_primitives[mesh.index()].clone();
    }
    scene_node
}
