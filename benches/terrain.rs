use criterion::{criterion_group, criterion_main, Criterion, black_box};

use terrastream::core::{IVec2, Vec2};
use terrastream::generation::{GenerationPipeline, TerrainConfig};
use terrastream::mesh::{MeshBuilder, MeshSettings};
use terrastream::streaming::{ChunkStreamer, InlineBuildQueue, LevelOfDetail};
use terrastream::terrain::{noise_field, ElevationSettings, NoiseSettings, NormalizeMode};

fn bench_noise_241(c: &mut Criterion) {
    let settings = NoiseSettings::default();

    c.bench_function("noise_generate_241", |b| {
        b.iter(|| noise_field::generate(241, 241, black_box(&settings), black_box(Vec2::new(120.0, -40.0))));
    });
}

fn bench_noise_241_local(c: &mut Criterion) {
    let settings = NoiseSettings {
        normalize_mode: NormalizeMode::Local,
        ..Default::default()
    };

    c.bench_function("noise_generate_241_local", |b| {
        b.iter(|| noise_field::generate(241, 241, black_box(&settings), black_box(Vec2::ZERO)));
    });
}

fn bench_mesh_build(c: &mut Criterion) {
    let pipeline = GenerationPipeline::new(ElevationSettings::default(), MeshSettings::default());
    let height_map = pipeline.height_map(IVec2::ZERO);

    for lod in [0, 2, 4] {
        c.bench_function(&format!("mesh_build_240_lod{}", lod), |b| {
            b.iter(|| MeshBuilder::build(black_box(&height_map), pipeline.mesh_settings(), lod));
        });
    }
}

fn bench_streamer_tick(c: &mut Criterion) {
    // Small chunks so one pass over the ring stays cheap
    let config = TerrainConfig {
        mesh: MeshSettings::new(0, 1.0).unwrap(),
        lods: vec![LevelOfDetail::new(0, 60.0), LevelOfDetail::new(2, 150.0)],
        ..Default::default()
    };

    c.bench_function("streamer_tick_moving", |b| {
        let mut streamer = ChunkStreamer::new(&config, InlineBuildQueue::new()).unwrap();
        let mut frame = 0u32;
        b.iter(|| {
            frame += 1;
            let viewer = Vec2::new(frame as f32 * 3.0, (frame as f32 * 0.01).sin() * 40.0);
            black_box(streamer.tick(black_box(viewer)));
        });
    });

    c.bench_function("streamer_tick_stationary", |b| {
        let mut streamer = ChunkStreamer::new(&config, InlineBuildQueue::new()).unwrap();
        streamer.tick(Vec2::ZERO);
        streamer.tick(Vec2::ZERO);
        b.iter(|| black_box(streamer.tick(black_box(Vec2::ZERO))));
    });
}

criterion_group!(
    benches,
    bench_noise_241,
    bench_noise_241_local,
    bench_mesh_build,
    bench_streamer_tick,
);
criterion_main!(benches);
