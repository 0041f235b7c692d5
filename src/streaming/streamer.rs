//! Chunk streaming around a moving viewer.
//!
//! [`ChunkStreamer::tick`] is driven once per frame with the viewer's XZ
//! position. It drains finished builds, creates chunks that came into range,
//! updates every tracked chunk when the viewer changes chunk (or has moved
//! far enough), and returns the resulting [`ChunkEvent`]s. All chunk state is
//! owned here and only touched from the thread calling `tick`.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use super::build_queue::{AsyncBuildQueue, BuildBackend, BuildResult};
use super::chunk::{ChunkEvent, TerrainChunk, UpdateContext};
use super::lod::LodTable;
use crate::core::{ChunkCoord, Result, Vec2};
use crate::generation::{GenerationPipeline, TerrainConfig};

/// Counters for logging and tooling
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StreamerStats {
    pub tracked: usize,
    pub visible: usize,
    pub pending_builds: usize,
    pub meshes_built: usize,
}

/// Owns every [`TerrainChunk`] and decides which ones exist and show
pub struct ChunkStreamer<B: BuildBackend = AsyncBuildQueue> {
    pipeline: Arc<GenerationPipeline>,
    lods: LodTable,
    collider_level: usize,
    sqr_collider_distance: f32,
    view_radius_override: Option<i32>,
    view_radius: i32,
    sqr_move_threshold: f32,
    rebuild_after_ticks: u64,
    backend: B,
    chunks: HashMap<ChunkCoord, TerrainChunk>,
    visible: HashSet<ChunkCoord>,
    /// Chunks with failed or outstanding builds to revisit each tick
    retry: HashSet<ChunkCoord>,
    viewer: Option<Vec2>,
    viewer_at_last_update: Option<Vec2>,
    viewer_chunk: Option<ChunkCoord>,
    tick: u64,
    epoch: u64,
    meshes_built: usize,
}

/// Mutable views of the streamer's chunk collections
struct ChunkSets<'a> {
    chunks: &'a mut HashMap<ChunkCoord, TerrainChunk>,
    visible: &'a mut HashSet<ChunkCoord>,
    retry: &'a mut HashSet<ChunkCoord>,
}

impl ChunkSets<'_> {
    /// Mirror `chunk`'s visibility and retry needs into the coordinate sets
    fn sync(
        visible: &mut HashSet<ChunkCoord>,
        retry: &mut HashSet<ChunkCoord>,
        chunk: &TerrainChunk,
        rebuild_after_ticks: u64,
    ) {
        if chunk.is_visible() {
            visible.insert(chunk.coord());
        } else {
            visible.remove(&chunk.coord());
        }
        if chunk.needs_retry(rebuild_after_ticks) {
            retry.insert(chunk.coord());
        }
    }
}

impl ChunkStreamer<AsyncBuildQueue> {
    /// Streamer building on a tokio-backed queue sized by `config.build_workers`
    pub fn with_async_queue(config: &TerrainConfig) -> Result<Self> {
        let queue = AsyncBuildQueue::new(config.build_workers())?;
        Self::new(config, queue)
    }
}

impl<B: BuildBackend> ChunkStreamer<B> {
    /// Validate `config` and set up an empty streamer.
    ///
    /// Fails with [`Error::Config`](crate::core::Error::Config) on an invalid
    /// LOD table or collider level.
    pub fn new(config: &TerrainConfig, backend: B) -> Result<Self> {
        config.validate()?;
        let lods = config.lod_table()?;
        let pipeline = Arc::new(GenerationPipeline::from_config(config));
        let view_radius = Self::view_radius_for(config.view_radius_chunks, &lods, &pipeline);

        log::info!(
            "Chunk streamer: world size {:.1}, {} LOD levels, max view {:.0}, radius {} chunks",
            pipeline.chunk_world_size(),
            lods.len(),
            lods.max_view_distance(),
            view_radius
        );

        Ok(Self {
            pipeline,
            lods,
            collider_level: config.collider_lod_index,
            sqr_collider_distance: config.collider_generation_distance * config.collider_generation_distance,
            view_radius_override: config.view_radius_chunks,
            view_radius,
            sqr_move_threshold: config.viewer_move_threshold * config.viewer_move_threshold,
            rebuild_after_ticks: config.rebuild_after_ticks,
            backend,
            chunks: HashMap::new(),
            visible: HashSet::new(),
            retry: HashSet::new(),
            viewer: None,
            viewer_at_last_update: None,
            viewer_chunk: None,
            tick: 0,
            epoch: 0,
            meshes_built: 0,
        })
    }

    fn view_radius_for(override_radius: Option<i32>, lods: &LodTable, pipeline: &GenerationPipeline) -> i32 {
        override_radius
            .unwrap_or_else(|| (lods.max_view_distance() / pipeline.chunk_world_size()).round() as i32)
            .max(0)
    }

    /// Advance one frame with the viewer at `viewer` (world XZ).
    pub fn tick(&mut self, viewer: Vec2) -> Vec<ChunkEvent> {
        self.tick += 1;
        let mut events = Vec::new();

        self.drain_results(&mut events);

        if self.viewer != Some(viewer) {
            self.viewer = Some(viewer);
            self.update_colliders(viewer, &mut events);
        }

        let viewer_chunk = (viewer / self.pipeline.chunk_world_size()).round().as_ivec2();
        let chunk_changed = self.viewer_chunk != Some(viewer_chunk);
        let moved_far = self
            .viewer_at_last_update
            .is_none_or(|last| last.distance_squared(viewer) > self.sqr_move_threshold);

        if chunk_changed || moved_far {
            self.viewer_chunk = Some(viewer_chunk);
            self.viewer_at_last_update = Some(viewer);
            self.update_all(viewer, viewer_chunk, &mut events);
        }

        self.retry_stalled(viewer, &mut events);

        log::trace!(
            "tick {}: {} tracked, {} visible, {} pending, {} events",
            self.tick,
            self.chunks.len(),
            self.visible.len(),
            self.backend.pending_count(),
            events.len()
        );
        events
    }

    /// Swap in new generation settings.
    ///
    /// Every tracked chunk is dropped and rebuilt under the new settings on
    /// the next tick. Builds already in flight finish against their old
    /// snapshot and their results are discarded.
    pub fn replace_settings(&mut self, pipeline: Arc<GenerationPipeline>) -> Vec<ChunkEvent> {
        self.epoch += 1;

        for chunk in self.chunks.values() {
            for key in chunk.outstanding() {
                self.backend.cancel(key);
            }
        }

        let mut hidden: Vec<ChunkCoord> = self.visible.drain().collect();
        hidden.sort_by_key(|c| (c.y, c.x));
        let events = hidden
            .into_iter()
            .map(|coord| ChunkEvent::VisibilityChanged { coord, visible: false })
            .collect();

        self.chunks.clear();
        self.retry.clear();
        self.pipeline = pipeline;
        self.view_radius = Self::view_radius_for(self.view_radius_override, &self.lods, &self.pipeline);
        self.viewer_chunk = None;
        self.viewer_at_last_update = None;

        log::info!("Generation settings replaced (epoch {})", self.epoch);
        events
    }

    /// Split borrows: chunk storage on one side, the update context on the other
    fn parts<'a>(&'a mut self, viewer: Vec2, events: &'a mut Vec<ChunkEvent>) -> (ChunkSets<'a>, UpdateContext<'a>) {
        let Self {
            pipeline,
            lods,
            collider_level,
            sqr_collider_distance,
            rebuild_after_ticks,
            backend,
            chunks,
            visible,
            retry,
            tick,
            epoch,
            ..
        } = self;

        let ctx = UpdateContext {
            viewer,
            tick: *tick,
            epoch: *epoch,
            lods,
            collider_level: *collider_level,
            sqr_collider_distance: *sqr_collider_distance,
            rebuild_after_ticks: *rebuild_after_ticks,
            pipeline,
            backend,
            events,
        };
        (ChunkSets { chunks, visible, retry }, ctx)
    }

    /// Apply every finished build, repeating until the backend has nothing left
    fn drain_results(&mut self, events: &mut Vec<ChunkEvent>) {
        let viewer = self.viewer.unwrap_or(Vec2::ZERO);
        loop {
            let results = self.backend.poll_results();
            if results.is_empty() {
                break;
            }

            let epoch = self.epoch;
            let mut built = 0;
            let (mut sets, mut ctx) = self.parts(viewer, events);

            for result in results {
                if result.epoch() != epoch {
                    log::trace!("Dropping stale result {:?}", result.key());
                    continue;
                }

                let key = result.key();
                let Some(chunk) = sets.chunks.get_mut(&key.coord) else {
                    continue;
                };

                match result {
                    BuildResult::HeightMap { height_map, .. } => {
                        chunk.on_height_map(height_map, &mut ctx);
                    }
                    BuildResult::Mesh { level, mesh, .. } => {
                        if chunk.on_mesh(level, mesh, &mut ctx) {
                            built += 1;
                        }
                    }
                    BuildResult::Failed { reason, .. } => {
                        log::warn!("Build {:?} failed: {}", key, reason);
                        chunk.on_failed(key.kind);
                    }
                }
                ChunkSets::sync(sets.visible, sets.retry, chunk, ctx.rebuild_after_ticks);
            }

            self.meshes_built += built;
        }
    }

    fn update_colliders(&mut self, viewer: Vec2, events: &mut Vec<ChunkEvent>) {
        let (mut sets, mut ctx) = self.parts(viewer, events);
        for coord in sets.visible.iter() {
            if let Some(chunk) = sets.chunks.get_mut(coord) {
                chunk.update_collision(&mut ctx);
                if chunk.needs_retry(ctx.rebuild_after_ticks) {
                    sets.retry.insert(*coord);
                }
            }
        }
    }

    /// Update every tracked chunk, then create the missing ones in range
    fn update_all(&mut self, viewer: Vec2, viewer_chunk: ChunkCoord, events: &mut Vec<ChunkEvent>) {
        let radius = self.view_radius;
        let world_size = self.pipeline.chunk_world_size();
        let levels = self.lods.len();
        let (ChunkSets { chunks, visible, retry }, mut ctx) = self.parts(viewer, events);

        let mut coords: Vec<ChunkCoord> = chunks.keys().copied().collect();
        coords.sort_by_key(|c| (c.y, c.x));
        for coord in coords {
            if let Some(chunk) = chunks.get_mut(&coord) {
                chunk.update(&mut ctx);
                ChunkSets::sync(visible, retry, chunk, ctx.rebuild_after_ticks);
            }
        }

        let mut created = 0;
        for y in -radius..=radius {
            for x in -radius..=radius {
                let coord = viewer_chunk + ChunkCoord::new(x, y);
                if chunks.contains_key(&coord) {
                    continue;
                }
                let mut chunk = TerrainChunk::new(coord, world_size, levels);
                chunk.load(&mut ctx);
                if chunk.needs_retry(ctx.rebuild_after_ticks) {
                    retry.insert(coord);
                }
                chunks.insert(coord, chunk);
                created += 1;
            }
        }

        if created > 0 {
            log::debug!("Viewer in chunk {}: created {} chunks ({} tracked)", viewer_chunk, created, chunks.len());
        }
    }

    /// Revisit only chunks with failed or outstanding builds
    fn retry_stalled(&mut self, viewer: Vec2, events: &mut Vec<ChunkEvent>) {
        if self.retry.is_empty() {
            return;
        }
        let (mut sets, mut ctx) = self.parts(viewer, events);

        let mut coords: Vec<ChunkCoord> = sets.retry.iter().copied().collect();
        coords.sort_by_key(|c| (c.y, c.x));
        for coord in coords {
            let keep = sets
                .chunks
                .get_mut(&coord)
                .is_some_and(|chunk| chunk.retry_stalled(&mut ctx));
            if !keep {
                sets.retry.remove(&coord);
            }
        }
    }

    /// Chunks awaiting a retry pass
    pub fn retry_count(&self) -> usize {
        self.retry.len()
    }

    pub fn chunk(&self, coord: ChunkCoord) -> Option<&TerrainChunk> {
        self.chunks.get(&coord)
    }

    pub fn chunks(&self) -> impl Iterator<Item = &TerrainChunk> {
        self.chunks.values()
    }

    /// Coordinates of currently visible chunks, sorted row by row
    pub fn visible_chunks(&self) -> Vec<ChunkCoord> {
        let mut coords: Vec<ChunkCoord> = self.visible.iter().copied().collect();
        coords.sort_by_key(|c| (c.y, c.x));
        coords
    }

    pub fn is_visible(&self, coord: ChunkCoord) -> bool {
        self.visible.contains(&coord)
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// Chunk the viewer was in at the last full update
    pub fn viewer_chunk(&self) -> Option<ChunkCoord> {
        self.viewer_chunk
    }

    pub fn view_radius(&self) -> i32 {
        self.view_radius
    }

    pub fn lods(&self) -> &LodTable {
        &self.lods
    }

    pub fn pipeline(&self) -> &Arc<GenerationPipeline> {
        &self.pipeline
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn stats(&self) -> StreamerStats {
        StreamerStats {
            tracked: self.chunks.len(),
            visible: self.visible.len(),
            pending_builds: self.backend.pending_count(),
            meshes_built: self.meshes_built,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Error, IVec2};
    use crate::mesh::MeshSettings;
    use crate::streaming::build_queue::{BuildKey, BuildKind, BuildRequest, InlineBuildQueue};
    use crate::streaming::chunk::ChunkState;
    use crate::streaming::lod::LevelOfDetail;

    /// 50-unit chunks, levels at 40 (lod 0) and 90 (lod 2): radius 2
    fn config() -> TerrainConfig {
        TerrainConfig {
            mesh: MeshSettings::new(0, 1.0).unwrap(),
            lods: vec![LevelOfDetail::new(0, 40.0), LevelOfDetail::new(2, 90.0)],
            ..Default::default()
        }
    }

    fn streamer() -> ChunkStreamer<InlineBuildQueue> {
        ChunkStreamer::new(&config(), InlineBuildQueue::new()).unwrap()
    }

    fn count<F: Fn(&ChunkEvent) -> bool>(events: &[ChunkEvent], f: F) -> usize {
        events.iter().filter(|e| f(e)).count()
    }

    #[test]
    fn test_creates_square_around_viewer() {
        let mut s = streamer();
        assert_eq!(s.view_radius(), 2);

        let events = s.tick(Vec2::ZERO);
        assert!(events.is_empty());
        assert_eq!(s.chunk_count(), 25);
        assert_eq!(s.viewer_chunk(), Some(IVec2::ZERO));
        assert_eq!(s.backend().pending_count(), 25);
        assert!(s.chunks().all(|c| c.state() == ChunkState::Loading));
    }

    #[test]
    fn test_chunks_become_ready() {
        let mut s = streamer();
        s.tick(Vec2::ZERO);
        let events = s.tick(Vec2::ZERO);

        // Every chunk except the four corners is within 90
        assert_eq!(s.visible_chunks().len(), 21);
        assert_eq!(count(&events, |e| matches!(e, ChunkEvent::VisibilityChanged { visible: true, .. })), 21);
        assert_eq!(count(&events, |e| matches!(e, ChunkEvent::LodChanged { .. })), 21);

        assert_eq!(s.chunk(IVec2::new(0, 0)).unwrap().state(), ChunkState::Ready { level: 0 });
        assert_eq!(s.chunk(IVec2::new(1, 1)).unwrap().state(), ChunkState::Ready { level: 0 });
        assert_eq!(s.chunk(IVec2::new(2, 0)).unwrap().state(), ChunkState::Ready { level: 1 });
        assert_eq!(s.chunk(IVec2::new(2, 2)).unwrap().state(), ChunkState::Dormant);
        assert_eq!(s.chunk(IVec2::new(2, 0)).unwrap().current_mesh().unwrap().lod, 2);

        let stats = s.stats();
        assert_eq!(stats.tracked, 25);
        assert_eq!(stats.visible, 21);
        assert_eq!(stats.meshes_built, 21);
        assert_eq!(stats.pending_builds, 0);
    }

    #[test]
    fn test_collider_for_viewer_chunk_only() {
        let mut s = streamer();
        s.tick(Vec2::ZERO);
        let events = s.tick(Vec2::ZERO);

        let colliders: Vec<ChunkCoord> = events
            .iter()
            .filter_map(|e| match e {
                ChunkEvent::ColliderReady { coord, .. } => Some(*coord),
                _ => None,
            })
            .collect();
        assert_eq!(colliders, vec![IVec2::ZERO]);
    }

    #[test]
    fn test_moving_away_leaves_dormant_chunks() {
        let mut s = streamer();
        s.tick(Vec2::ZERO);
        s.tick(Vec2::ZERO);

        let events = s.tick(Vec2::new(300.0, 0.0));
        assert_eq!(s.viewer_chunk(), Some(IVec2::new(6, 0)));
        assert_eq!(count(&events, |e| matches!(e, ChunkEvent::VisibilityChanged { visible: false, .. })), 21);
        assert!(s.visible_chunks().is_empty());

        // Old records are kept, new ones are added around the viewer
        assert_eq!(s.chunk_count(), 50);
        assert_eq!(s.chunk(IVec2::ZERO).unwrap().state(), ChunkState::Dormant);
        assert!(s.chunk(IVec2::ZERO).unwrap().mesh(0).is_some());
    }

    #[test]
    fn test_returning_reuses_cached_meshes() {
        let mut s = streamer();
        s.tick(Vec2::ZERO);
        s.tick(Vec2::ZERO);
        s.tick(Vec2::new(300.0, 0.0));
        s.tick(Vec2::new(300.0, 0.0));

        let submitted_before = s.backend().submitted().len();
        let events = s.tick(Vec2::ZERO);
        assert_eq!(count(&events, |e| matches!(e, ChunkEvent::VisibilityChanged { visible: true, .. })), 21);
        assert_eq!(count(&events, |e| matches!(e, ChunkEvent::LodChanged { .. })), 0);
        // Everything around the origin is already tracked and cached
        assert_eq!(s.backend().submitted().len(), submitted_before);
        assert_eq!(s.visible_chunks().len(), 21);
    }

    #[test]
    fn test_lod_switch_requests_each_level_once() {
        let mut s = streamer();
        s.tick(Vec2::ZERO);
        s.tick(Vec2::ZERO);

        // Chunk (2, 0) spans x 75..125: at x = 100 it needs level 0, built
        // during the first tick and shown on the next
        let coord = IVec2::new(2, 0);
        s.tick(Vec2::new(100.0, 0.0));
        let events = s.tick(Vec2::new(100.0, 0.0));
        assert!(events.iter().any(|e| matches!(e, ChunkEvent::LodChanged { coord: c, level: 0, .. } if *c == coord)));

        let events = s.tick(Vec2::ZERO);
        assert!(events.iter().any(|e| matches!(e, ChunkEvent::LodChanged { coord: c, level: 1, .. } if *c == coord)));

        let requests = s
            .backend()
            .submitted()
            .iter()
            .filter(|k| k.coord == coord && matches!(k.kind, BuildKind::Mesh { .. }))
            .count();
        assert_eq!(requests, 2);
        assert_eq!(s.chunk(coord).unwrap().cached_mesh_count(), 2);
    }

    #[test]
    fn test_small_moves_within_chunk_skip_full_update() {
        let mut s = streamer();
        s.tick(Vec2::ZERO);
        s.tick(Vec2::ZERO);

        let before = s.backend().submitted().len();
        // 10 units: same chunk, under the move threshold
        let events = s.tick(Vec2::new(10.0, 0.0));
        assert!(events.iter().all(|e| !matches!(e, ChunkEvent::LodChanged { .. })));
        assert_eq!(s.backend().submitted().len(), before);
    }

    #[test]
    fn test_move_threshold_triggers_update_inside_chunk() {
        let mut s = streamer();
        s.tick(Vec2::ZERO);
        s.tick(Vec2::ZERO);
        assert!(s.is_visible(IVec2::new(-2, 1)));

        // 24 units is under the threshold, nothing updates
        s.tick(Vec2::new(24.0, 0.0));
        assert!(s.is_visible(IVec2::new(-2, 1)));

        // Same chunk, but 33.9 from the last full update
        s.tick(Vec2::new(24.0, 24.0));
        assert_eq!(s.viewer_chunk(), Some(IVec2::ZERO));
        // Chunk (-2, 1) spans x -125..-75, z 25..75: 99 away now
        assert!(!s.is_visible(IVec2::new(-2, 1)));
    }

    #[test]
    fn test_stalled_builds_are_reissued() {
        let mut cfg = config();
        cfg.rebuild_after_ticks = 2;
        let mut s = ChunkStreamer::new(&cfg, InlineBuildQueue::paused()).unwrap();

        s.tick(Vec2::ZERO);
        s.tick(Vec2::ZERO);
        s.tick(Vec2::ZERO);
        assert_eq!(s.backend().submitted().len(), 25);

        s.tick(Vec2::ZERO);
        assert_eq!(s.backend().submitted().len(), 50);
        assert_eq!(s.backend().held_count(), 25);

        s.backend_mut().set_paused(false);
        s.tick(Vec2::ZERO);
        assert_eq!(s.visible_chunks().len(), 21);
    }

    /// Inline queue that fails the first submission of one key
    struct FailOnce {
        inner: InlineBuildQueue,
        key: BuildKey,
        failed: Vec<BuildResult>,
        submissions: usize,
    }

    impl FailOnce {
        fn new(key: BuildKey) -> Self {
            Self { inner: InlineBuildQueue::new(), key, failed: Vec::new(), submissions: 0 }
        }
    }

    impl BuildBackend for FailOnce {
        fn submit(&mut self, request: BuildRequest) -> bool {
            if request.key() == self.key {
                self.submissions += 1;
                if self.submissions == 1 {
                    self.failed.push(BuildResult::Failed {
                        key: request.key(),
                        epoch: request.epoch(),
                        reason: "worker panicked".into(),
                    });
                    return true;
                }
            }
            self.inner.submit(request)
        }

        fn cancel(&mut self, key: BuildKey) {
            self.inner.cancel(key);
        }

        fn poll_results(&mut self) -> Vec<BuildResult> {
            let mut results = std::mem::take(&mut self.failed);
            results.extend(self.inner.poll_results());
            results
        }

        fn pending_count(&self) -> usize {
            self.inner.pending_count()
        }

        fn is_pending(&self, key: BuildKey) -> bool {
            self.inner.is_pending(key)
        }
    }

    #[test]
    fn test_failed_mesh_retried_for_stationary_viewer() {
        let mut cfg = config();
        cfg.rebuild_after_ticks = 2;
        let mut s = ChunkStreamer::new(&cfg, FailOnce::new(BuildKey::mesh(IVec2::ZERO, 0))).unwrap();

        for _ in 0..5 {
            s.tick(Vec2::ZERO);
        }

        let chunk = s.chunk(IVec2::ZERO).unwrap();
        assert!(chunk.mesh(0).is_some());
        assert_eq!(chunk.state(), ChunkState::Ready { level: 0 });
        assert_eq!(s.backend().submissions, 2);
        assert_eq!(s.stats().visible, 21);
    }

    #[test]
    fn test_retry_set_empties_once_builds_land() {
        let mut cfg = config();
        cfg.rebuild_after_ticks = 2;
        let mut s = ChunkStreamer::new(&cfg, InlineBuildQueue::new()).unwrap();
        s.tick(Vec2::ZERO);
        assert_eq!(s.retry_count(), 25);

        for _ in 0..3 {
            s.tick(Vec2::ZERO);
        }
        assert_eq!(s.retry_count(), 0);
        assert_eq!(s.visible_chunks().len(), 21);

        let mut s = streamer();
        s.tick(Vec2::ZERO);
        assert_eq!(s.retry_count(), 0);
    }

    #[test]
    fn test_no_retry_when_disabled() {
        let mut s = ChunkStreamer::new(&config(), InlineBuildQueue::paused()).unwrap();
        for _ in 0..10 {
            s.tick(Vec2::ZERO);
        }
        assert_eq!(s.backend().submitted().len(), 25);
        assert!(s.visible_chunks().is_empty());
    }

    #[test]
    fn test_replace_settings_discards_stale_results() {
        let mut s = streamer();
        s.tick(Vec2::ZERO);
        s.tick(Vec2::ZERO);
        // Queue a round of results, then swap settings before they are drained
        s.tick(Vec2::new(300.0, 0.0));

        let pipeline = Arc::new(GenerationPipeline::from_config(&config()));
        let events = s.replace_settings(pipeline);
        assert!(events.iter().all(|e| matches!(e, ChunkEvent::VisibilityChanged { visible: false, .. })));
        assert_eq!(s.chunk_count(), 0);

        let events = s.tick(Vec2::new(300.0, 0.0));
        assert!(events.is_empty());
        assert_eq!(s.chunk_count(), 25);
        assert!(s.chunks().all(|c| c.height_map().is_none()));

        s.tick(Vec2::new(300.0, 0.0));
        assert_eq!(s.visible_chunks().len(), 21);
    }

    #[test]
    fn test_rejects_bad_collider_level() {
        let cfg = TerrainConfig {
            collider_lod_index: 2,
            ..config()
        };
        assert!(matches!(
            ChunkStreamer::new(&cfg, InlineBuildQueue::new()),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_collider_key_requested_for_collider_level() {
        let cfg = TerrainConfig {
            collider_lod_index: 1,
            ..config()
        };
        let mut s = ChunkStreamer::new(&cfg, InlineBuildQueue::new()).unwrap();
        s.tick(Vec2::ZERO);
        let events = s.tick(Vec2::ZERO);

        // The viewer's chunk shows level 0 but also builds level 1 for collision
        let chunk = s.chunk(IVec2::ZERO).unwrap();
        assert!(chunk.mesh(1).is_some());
        assert!(s.backend().submitted().contains(&BuildKey::mesh(IVec2::ZERO, 1)));
        assert!(events.iter().any(|e| matches!(e, ChunkEvent::ColliderReady { mesh, .. } if mesh.lod == 2)));
    }
}
