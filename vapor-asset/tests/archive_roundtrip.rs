use anyhow::Result;
use glam::{Mat4, Quat, Vec3, Vec4};
use std::fs;
use tempfile::tempdir;
use vapor_asset::archive::{ARCHIVE_VERSION, HEADER_SIZE};
use vapor_asset::{
    ArchiveError, LodConfig, LodLevel, LodMesh, MaterialData, SceneData, SceneNode, VertexData,
    generate_lods, read_scene, write_scene,
};

fn terrain(n: u32) -> (Vec<VertexData>, Vec<u32>) {
    let mut vertices = Vec::new();
    for z in 0..=n {
        for x in 0..=n {
            let (fx, fz) = (x as f32, z as f32);
            vertices.push(VertexData {
                position: [fx * 0.1, (fx * 0.7).sin() * (fz * 0.3).cos() * 0.1, fz * 0.1],
                uv: [fx / n as f32, fz / n as f32],
                normal: [0.0, 1.0, 0.0],
                tangent: [1.0, 0.0, 0.0, -1.0],
            });
        }
    }
    let row = n + 1;
    let mut indices = Vec::new();
    for z in 0..n {
        for x in 0..n {
            let i = z * row + x;
            indices.extend_from_slice(&[i, i + row, i + 1, i + 1, i + row, i + row + 1]);
        }
    }
    (vertices, indices)
}

fn sample_scene() -> Result<SceneData> {
    let config = LodConfig::default();
    let (vertices, indices) = terrain(24);
    let mut ground = generate_lods(&vertices, &indices, &config)?.mesh;
    ground.name = "ground".to_string();
    ground.material_index = 1;

    let (vertices, indices) = terrain(4);
    let mut rock = generate_lods(&vertices, &indices, &config)?.mesh;
    rock.name = "rock".to_string();

    let mut leaf = SceneNode::new("leaf");
    leaf.transform = Mat4::from_scale_rotation_translation(
        Vec3::splat(0.3),
        Quat::from_rotation_y(0.7),
        Vec3::new(1.0, -2.5, 0.1),
    );
    leaf.mesh_indices = vec![1];

    let mut branch = SceneNode::new("branch");
    branch.mesh_indices = vec![0, 1];
    branch.children = vec![leaf, SceneNode::new("empty leaf")];

    let mut root = SceneNode::new("root");
    root.transform = Mat4::from_translation(Vec3::new(0.1, 0.2, 0.3));
    root.children = vec![branch];

    let mut second_root = SceneNode::new("second");
    second_root.mesh_indices = vec![0];

    let total_original = ground.lod_levels[0].triangle_count() + rock.lod_levels[0].triangle_count();
    let total_with_lods = ground.total_triangles() + rock.total_triangles();

    Ok(SceneData {
        name: "sample".to_string(),
        meshes: vec![ground, rock],
        materials: vec![
            MaterialData::default(),
            MaterialData {
                name: "moss".to_string(),
                base_color_factor: Vec4::new(0.1, 0.6, 0.2, 1.0),
                metallic_factor: 0.0,
                roughness_factor: 0.85,
                base_color_texture: Some("textures/moss_albedo.png".to_string()),
                metallic_roughness_texture: None,
                normal_texture: Some("textures/moss_normal.png".to_string()),
            },
        ],
        root_nodes: vec![root, second_root],
        total_original_triangles: total_original as u64,
        total_triangles_with_lods: total_with_lods as u64,
    })
}

#[test]
fn write_then_read_reproduces_scene() -> Result<()> {
    let scene = sample_scene()?;
    assert!(scene.meshes[0].lod_levels.len() > 1);

    let dir = tempdir()?;
    let path = dir.path().join("sample.vscene_lod");
    write_scene(&path, &scene)?;
    let loaded = read_scene(&path)?;

    assert_eq!(loaded, scene);
    assert_eq!(loaded.node_count(), 5);

    // Float fields must survive bit-for-bit.
    let bits = |s: &SceneData| -> Vec<u32> {
        s.meshes
            .iter()
            .flat_map(|m| {
                m.lod_levels
                    .iter()
                    .flat_map(|l| {
                        l.vertices
                            .iter()
                            .flat_map(|v| v.position)
                            .chain([l.error, l.screen_size_threshold])
                    })
                    .chain([m.bounding_sphere.radius])
            })
            .map(f32::to_bits)
            .collect()
    };
    assert_eq!(bits(&loaded), bits(&scene));
    let leaf = &loaded.root_nodes[0].children[0].children[0];
    assert_eq!(leaf.name, "leaf");
    assert_eq!(
        leaf.transform.to_cols_array().map(f32::to_bits),
        scene.root_nodes[0].children[0].children[0]
            .transform
            .to_cols_array()
            .map(f32::to_bits)
    );
    Ok(())
}

#[test]
fn rewrite_truncates_previous_file() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("scene.vscene_lod");

    write_scene(&path, &sample_scene()?)?;
    let small = SceneData {
        name: "small".to_string(),
        ..Default::default()
    };
    write_scene(&path, &small)?;

    assert_eq!(read_scene(&path)?, small);
    Ok(())
}

#[test]
fn corrupted_magic_is_rejected() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("bad_magic.vscene_lod");
    write_scene(&path, &sample_scene()?)?;

    let mut bytes = fs::read(&path)?;
    bytes[0] ^= 0xff;
    fs::write(&path, &bytes)?;

    match read_scene(&path) {
        Err(ArchiveError::BadMagic { found }) => assert_eq!(found[1..], *b"LOD"),
        other => panic!("expected BadMagic, got {other:?}"),
    }
    Ok(())
}

#[test]
fn other_version_is_rejected() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("v2.vscene_lod");
    write_scene(&path, &sample_scene()?)?;

    let mut bytes = fs::read(&path)?;
    bytes[4..HEADER_SIZE].copy_from_slice(&(ARCHIVE_VERSION + 1).to_le_bytes());
    fs::write(&path, &bytes)?;

    match read_scene(&path) {
        Err(ArchiveError::UnsupportedVersion { found, expected }) => {
            assert_eq!(found, ARCHIVE_VERSION + 1);
            assert_eq!(expected, ARCHIVE_VERSION);
        }
        other => panic!("expected UnsupportedVersion, got {other:?}"),
    }
    Ok(())
}

#[test]
fn empty_file_is_truncated() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("empty.vscene_lod");
    fs::write(&path, b"")?;

    assert!(matches!(
        read_scene(&path),
        Err(ArchiveError::Truncated { len: 0 })
    ));
    Ok(())
}

#[test]
fn io_errors_carry_the_path() -> Result<()> {
    let dir = tempdir()?;
    let missing = dir.path().join("missing.vscene_lod");
    let err = read_scene(&missing).unwrap_err();
    assert!(matches!(err, ArchiveError::Io { .. }));
    assert!(err.to_string().contains("missing.vscene_lod"));

    let unwritable = dir.path().join("no_such_dir").join("out.vscene_lod");
    let err = write_scene(&unwritable, &SceneData::default()).unwrap_err();
    assert!(matches!(err, ArchiveError::Io { .. }));
    Ok(())
}

#[cfg(target_os = "linux")]
#[test]
fn write_failure_past_buffer_is_io_error() {
    // 100k vertices is well past the 1 MiB write buffer, so the failing write
    // happens during serialization rather than on the final flush.
    let scene = SceneData {
        meshes: vec![LodMesh {
            lod_levels: vec![LodLevel {
                vertices: vec![VertexData::default(); 100_000],
                ..Default::default()
            }],
            ..Default::default()
        }],
        ..Default::default()
    };

    for scene in [scene, SceneData::default()] {
        let err = write_scene("/dev/full", &scene).unwrap_err();
        assert!(matches!(err, ArchiveError::Io { .. }), "got {err:?}");
        assert!(err.to_string().contains("/dev/full"));
    }
}
