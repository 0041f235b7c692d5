//! Preview generator: renders a square of chunks to disk for inspecting settings.
//!
//! Usage: cargo run --release --bin generate_preview -- [OPTIONS]
//!
//! Options:
//!   --config <PATH>   Terrain config JSON (default: built-in defaults)
//!   --mode <MODE>     noise | colour | falloff | mesh | all (default: all)
//!   --radius <N>      Chunks rendered around the origin (default: 1)
//!   --lod <LOD>       Editor LOD used for mesh statistics (default: 0)
//!   --seed <SEED>     Override the noise seed
//!   --out <DIR>       Output directory (default: "preview")
//!   --jobs <N>        Max parallel chunk renders (default: 4)
//!
//! Output structure:
//!   <out>/
//!     manifest.json         # Settings, mesh statistics and image list
//!     noise_0_0.png
//!     colour_0_0.png
//!     falloff.png
//!     ...

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use rayon::prelude::*;
use serde_json::json;

use terrastream::core::{IVec2, Result, logging};
use terrastream::generation::preview::{self, Preview};
use terrastream::generation::{GenerationPipeline, MeshStats, PreviewMode, TerrainConfig};
use terrastream::mesh::MAX_LOD;

fn main() -> Result<()> {
    logging::init();

    let args: Vec<String> = std::env::args().collect();
    let config_path = parse_str_arg(&args, "--config");
    let mode = parse_str_arg(&args, "--mode").unwrap_or_else(|| "all".to_string());
    let radius = parse_i32_arg(&args, "--radius").unwrap_or(1).max(0);
    let lod = parse_usize_arg(&args, "--lod").unwrap_or(0).min(MAX_LOD - 1);
    let seed = parse_i32_arg(&args, "--seed");
    let output_dir = PathBuf::from(parse_str_arg(&args, "--out").unwrap_or_else(|| "preview".to_string()));
    let jobs = parse_usize_arg(&args, "--jobs").unwrap_or(4).max(1);

    if let Err(e) = rayon::ThreadPoolBuilder::new().num_threads(jobs).build_global() {
        log::warn!("Could not configure thread pool: {}", e);
    }

    let mut config = match &config_path {
        Some(path) => TerrainConfig::load(path)?,
        None => TerrainConfig::default(),
    };
    if let Some(seed) = seed {
        config.elevation.noise.seed = seed;
    }

    let modes: Vec<PreviewMode> = if mode == "all" {
        vec![PreviewMode::NoiseMap, PreviewMode::ColourMap, PreviewMode::Mesh]
    } else {
        vec![mode.parse()?]
    };

    let pipeline = GenerationPipeline::from_config(&config);
    std::fs::create_dir_all(&output_dir)?;

    println!("=== Terrain Preview ===");
    println!("Seed:   {}", config.elevation.noise.seed);
    println!("Chunk:  {} vertices per line, {}m", pipeline.mesh_settings().vertices_per_line(), pipeline.chunk_world_size());
    println!("Radius: {} chunks", radius);
    println!("Modes:  {}", modes.iter().map(|m| m.to_string()).collect::<Vec<_>>().join(", "));
    println!("Output: {}", output_dir.display());
    println!();

    let mut coords = Vec::new();
    for y in -radius..=radius {
        for x in -radius..=radius {
            coords.push(IVec2::new(x, y));
        }
    }

    let mut jobs_list = Vec::new();
    for &mode in &modes {
        if mode == PreviewMode::FalloffMap {
            jobs_list.push((mode, IVec2::ZERO));
        } else {
            jobs_list.extend(coords.iter().map(|&coord| (mode, coord)));
        }
    }

    let total = jobs_list.len();
    let start = Instant::now();
    let done = AtomicUsize::new(0);

    let outputs: Vec<Result<(Option<String>, Option<MeshStats>)>> = jobs_list
        .par_iter()
        .map(|&(mode, coord)| {
            let rendered = preview::render(&pipeline, &config.texture, mode, coord, lod);
            let finished = done.fetch_add(1, Ordering::Relaxed) + 1;
            if finished % 16 == 0 || finished == total {
                eprintln!("  [{}/{}] {:.1}s", finished, total, start.elapsed().as_secs_f64());
            }

            match rendered {
                Preview::Image(image) => {
                    let file = if mode == PreviewMode::FalloffMap {
                        format!("{}.png", mode)
                    } else {
                        format!("{}_{}_{}.png", mode, coord.x, coord.y)
                    };
                    preview::save_image(&image, output_dir.join(&file))?;
                    Ok((Some(file), None))
                }
                Preview::Mesh(stats) => Ok((None, Some(stats))),
            }
        })
        .collect();

    let mut images = Vec::new();
    let mut meshes = Vec::new();
    for output in outputs {
        let (image, stats) = output?;
        images.extend(image);
        meshes.extend(stats);
    }

    let elapsed = start.elapsed();
    let total_vertices: usize = meshes.iter().map(|m| m.vertices).sum();
    let total_triangles: usize = meshes.iter().map(|m| m.triangles).sum();

    println!();
    println!("Rendered {} previews in {:.2}s", total, elapsed.as_secs_f64());
    if !meshes.is_empty() {
        println!("Meshes:   {} chunks at lod {}, {} vertices, {} triangles",
            meshes.len(), lod, total_vertices, total_triangles);
    }

    let manifest = json!({
        "seed": config.elevation.noise.seed,
        "radius": radius,
        "editor_lod": lod,
        "chunk_world_size": pipeline.chunk_world_size(),
        "vertices_per_line": pipeline.mesh_settings().vertices_per_line(),
        "min_height": pipeline.elevation().min_height(),
        "max_height": pipeline.elevation().max_height(),
        "images": images,
        "meshes": meshes,
        "totals": {
            "vertices": total_vertices,
            "triangles": total_triangles,
        },
    });

    let manifest_path = output_dir.join("manifest.json");
    std::fs::write(&manifest_path, serde_json::to_string_pretty(&manifest)?)?;

    println!("Manifest: {}", manifest_path.display());
    Ok(())
}

fn parse_i32_arg(args: &[String], flag: &str) -> Option<i32> {
    args.iter().position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .and_then(|s| s.parse().ok())
}

fn parse_usize_arg(args: &[String], flag: &str) -> Option<usize> {
    args.iter().position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .and_then(|s| s.parse().ok())
}

fn parse_str_arg(args: &[String], flag: &str) -> Option<String> {
    args.iter().position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .cloned()
}
