//! Terrastream - headless fly-through.
//!
//! Drives the chunk streamer along a straight line and logs what a renderer
//! would receive each frame.
//!
//! Usage: cargo run --release -- [OPTIONS]
//!
//! Options:
//!   --config <PATH>   Terrain config JSON (default: built-in defaults)
//!   --frames <N>      Frames to simulate (default: 600)
//!   --speed <UNITS>   Viewer speed in world units per frame (default: 4.0)
//!   --heading <DEG>   Direction of travel on the XZ plane (default: 30)
//!   --fps <N>         Frame rate to pace the simulation at (default: 60)

use std::time::{Duration, Instant};

use terrastream::core::{Result, Vec2, logging};
use terrastream::generation::TerrainConfig;
use terrastream::streaming::{ChunkEvent, ChunkStreamer};

fn main() -> Result<()> {
    logging::init();

    let args: Vec<String> = std::env::args().collect();
    let frames = parse_arg::<u64>(&args, "--frames").unwrap_or(600);
    let speed = parse_arg::<f32>(&args, "--speed").unwrap_or(4.0);
    let heading = parse_arg::<f32>(&args, "--heading").unwrap_or(30.0).to_radians();
    let fps = parse_arg::<u32>(&args, "--fps").unwrap_or(60).max(1);

    let config = match args.iter().position(|a| a == "--config").and_then(|i| args.get(i + 1)) {
        Some(path) => TerrainConfig::load(path)?,
        None => {
            log::info!("No config given, using defaults");
            TerrainConfig::default()
        }
    };

    let mut streamer = ChunkStreamer::with_async_queue(&config)?;
    let direction = Vec2::new(heading.cos(), heading.sin());
    let frame_time = Duration::from_secs_f64(1.0 / fps as f64);

    log::info!("Flying {} frames at {:.1} units/frame", frames, speed);

    let start = Instant::now();
    let mut shown = 0usize;
    let mut hidden = 0usize;
    let mut lod_changes = 0usize;
    let mut colliders = 0usize;

    for frame in 0..frames {
        let frame_start = Instant::now();
        let viewer = direction * speed * frame as f32;

        for event in streamer.tick(viewer) {
            match event {
                ChunkEvent::VisibilityChanged { visible: true, .. } => shown += 1,
                ChunkEvent::VisibilityChanged { visible: false, .. } => hidden += 1,
                ChunkEvent::LodChanged { coord, lod, mesh, .. } => {
                    lod_changes += 1;
                    log::trace!("Chunk {} -> lod {} ({} triangles)", coord, lod, mesh.triangle_count());
                }
                ChunkEvent::ColliderReady { coord, mesh } => {
                    colliders += 1;
                    log::debug!("Collider for {} ({} vertices)", coord, mesh.vertex_count());
                }
            }
        }

        if frame % fps as u64 == 0 {
            let stats = streamer.stats();
            log::info!(
                "Frame {}: viewer ({:.0}, {:.0}) chunk {:?}, {} tracked, {} visible, {} pending, {} meshes built",
                frame,
                viewer.x,
                viewer.y,
                streamer.viewer_chunk(),
                stats.tracked,
                stats.visible,
                stats.pending_builds,
                stats.meshes_built
            );
        }

        if let Some(remaining) = frame_time.checked_sub(frame_start.elapsed()) {
            std::thread::sleep(remaining);
        }
    }

    let stats = streamer.stats();
    log::info!(
        "Done in {:.1}s: {} shown, {} hidden, {} LOD changes, {} colliders, {} chunks tracked, {} meshes built",
        start.elapsed().as_secs_f64(),
        shown,
        hidden,
        lod_changes,
        colliders,
        stats.tracked,
        stats.meshes_built
    );
    Ok(())
}

fn parse_arg<T: std::str::FromStr>(args: &[String], flag: &str) -> Option<T> {
    args.iter().position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .and_then(|s| s.parse().ok())
}
