use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;
use vapor_asset::archive::ARCHIVE_EXTENSION;
use vapor_asset::{LodConfig, SceneData, SceneNode, SceneReport};

#[derive(Parser)]
#[command(name = "vapor-processor", version, about = "Mesh LOD generation for Vapor scenes")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Import a scene, generate LOD chains and write a .vscene_lod archive
    Process(ProcessArgs),
    /// Print statistics of an existing .vscene_lod archive
    Info(InfoArgs),
}

#[derive(Args)]
struct ProcessArgs {
    /// Source scene (.gltf, .glb or .obj)
    input: PathBuf,
    /// Output archive [default: input with .vscene_lod extension]
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// Maximum number of LOD levels, LOD0 included
    #[arg(short = 'l', long, default_value_t = 5)]
    max_lods: usize,
    /// Target index-count ratio of each level relative to the previous one
    #[arg(short = 'r', long, default_value_t = 0.5)]
    reduction: f32,
    /// Simplification error budget of LOD1, scaled linearly per level
    #[arg(short = 'e', long, default_value_t = 0.01)]
    error_threshold: f32,
    /// Allow simplification to move open-boundary vertices
    #[arg(long)]
    no_lock_borders: bool,
    /// Explicit screen-size thresholds per level [default: 0.15 * 0.5^i]
    #[arg(short = 't', long, value_delimiter = ',')]
    thresholds: Option<Vec<f32>>,
}

impl ProcessArgs {
    fn lod_config(&self) -> LodConfig {
        LodConfig {
            max_lod_levels: self.max_lods,
            target_reduction_per_level: self.reduction,
            error_threshold: self.error_threshold,
            lock_borders: !self.no_lock_borders,
            screen_size_thresholds: self
                .thresholds
                .clone()
                .unwrap_or_else(|| LodConfig::derived_thresholds(self.max_lods)),
        }
    }

    fn output_path(&self) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| self.input.with_extension(ARCHIVE_EXTENSION))
    }
}

#[derive(Args)]
struct InfoArgs {
    /// Archive to inspect
    file: PathBuf,
    /// Also print the node hierarchy
    #[arg(long)]
    tree: bool,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let status = usage_exit_status(&e);
            let _ = e.print();
            return ExitCode::from(status);
        }
    };

    let result = match &cli.command {
        Command::Process(args) => process(args),
        Command::Info(args) => info(args),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::from(1)
        }
    }
}

/// `--help` and `--version` succeed; every other parse failure exits with 1.
fn usage_exit_status(e: &clap::Error) -> u8 {
    if e.use_stderr() {
        1
    } else {
        0
    }
}

fn process(args: &ProcessArgs) -> Result<()> {
    let config = args.lod_config();
    config.validate()?;

    let input = &args.input;
    if !input.exists() {
        anyhow::bail!("Input file not found: {}", input.display());
    }
    let output = args.output_path();

    println!("Processing {}...", input.display());
    let start_total = Instant::now();

    let imported = vapor_asset::import_scene(input)?;
    println!(
        "Scene loaded in {:.2}s: {} primitives, {} materials",
        start_total.elapsed().as_secs_f32(),
        imported.primitives.len(),
        imported.materials.len()
    );

    let report = vapor_asset::generate_scene(imported, &config)?;
    print_report(&report);

    let save_start = Instant::now();
    vapor_asset::write_scene(&output, &report.scene)
        .with_context(|| format!("Failed to write {}", output.display()))?;
    println!(
        "Saved to {} in {:.2}s",
        output.display(),
        save_start.elapsed().as_secs_f32()
    );
    println!(
        "Total execution time: {:.2}s",
        start_total.elapsed().as_secs_f32()
    );

    Ok(())
}

fn print_report(report: &SceneReport) {
    let scene = &report.scene;
    for (mesh, stats) in scene.meshes.iter().zip(&report.mesh_stats) {
        println!(
            "  {} ({} LODs, {:.2}ms)",
            mesh.name,
            mesh.lod_levels.len(),
            stats.processing_time.as_secs_f32() * 1000.0
        );
        for (i, level) in stats.levels.iter().enumerate() {
            println!(
                "    LOD{}: {:>8} tris ({:>5.1}%)  error {:.5}",
                i,
                level.triangle_count,
                level.reduction_ratio * 100.0,
                level.error
            );
        }
    }
    println!(
        "LOD build complete in {:.2}s: {} original tris, {} tris with LODs",
        report.processing_time.as_secs_f32(),
        scene.total_original_triangles,
        scene.total_triangles_with_lods
    );
}

fn info(args: &InfoArgs) -> Result<()> {
    let scene = vapor_asset::read_scene(&args.file)
        .with_context(|| format!("Failed to read {}", args.file.display()))?;
    print_scene_info(&args.file, &scene);
    if args.tree {
        print_tree(&scene.root_nodes);
    }
    Ok(())
}

fn print_scene_info(path: &Path, scene: &SceneData) {
    println!("{}: scene '{}'", path.display(), scene.name);
    println!(
        "  {} meshes, {} materials, {} root nodes, {} nodes",
        scene.meshes.len(),
        scene.materials.len(),
        scene.root_nodes.len(),
        scene.node_count()
    );

    for (i, mesh) in scene.meshes.iter().enumerate() {
        let tris: Vec<usize> = mesh.lod_levels.iter().map(|l| l.triangle_count()).collect();
        println!(
            "  [{}] {} material={} tris={:?}",
            i, mesh.name, mesh.material_index, tris
        );
        println!(
            "      aabb {:?} .. {:?} (size {:?}), sphere {:?} r={:.4}",
            mesh.aabb.min.to_array(),
            mesh.aabb.max.to_array(),
            mesh.aabb.extent().to_array(),
            mesh.bounding_sphere.center.to_array(),
            mesh.bounding_sphere.radius
        );
        for (level, lod) in mesh.lod_levels.iter().enumerate() {
            println!(
                "      LOD{}: error {:.5}, screen size {:.4}",
                level, lod.error, lod.screen_size_threshold
            );
        }
    }

    for (i, material) in scene.materials.iter().enumerate() {
        println!(
            "  material [{}] {} base {:?} metallic {:.2} roughness {:.2}",
            i,
            material.name,
            material.base_color_factor.to_array(),
            material.metallic_factor,
            material.roughness_factor
        );
    }

    println!(
        "  Total: {} original tris, {} tris with LODs",
        scene.total_original_triangles, scene.total_triangles_with_lods
    );
}

fn print_tree(roots: &[SceneNode]) {
    let mut stack: Vec<(&SceneNode, usize)> = roots.iter().rev().map(|n| (n, 0)).collect();
    while let Some((node, depth)) = stack.pop() {
        println!("  {}{} meshes={:?}", "  ".repeat(depth), node.name, node.mesh_indices);
        stack.extend(node.children.iter().rev().map(|c| (c, depth + 1)));
    }
}
