//! Per-coordinate terrain chunk record and its LOD state machine.

use std::sync::Arc;

use super::build_queue::{BuildBackend, BuildKey, BuildKind, BuildRequest};
use super::lod::LodTable;
use crate::core::{ChunkCoord, Vec2};
use crate::generation::GenerationPipeline;
use crate::math::Rect;
use crate::mesh::TerrainMesh;
use crate::terrain::HeightMap;

/// Progress of one asynchronous build
#[derive(Clone, Debug)]
pub enum BuildState<T> {
    NotRequested,
    /// Submitted on `tick`
    Requested { tick: u64 },
    Ready(Arc<T>),
    /// The last build failed; requested again when next needed
    Failed,
}

impl<T> BuildState<T> {
    pub fn ready(&self) -> Option<&Arc<T>> {
        match self {
            BuildState::Ready(value) => Some(value),
            _ => None,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, BuildState::Ready(_))
    }

    /// Nothing in flight and nothing cached
    fn needs_request(&self) -> bool {
        matches!(self, BuildState::NotRequested | BuildState::Failed)
    }

    /// Requested before `now - after` ticks
    fn is_stalled(&self, now: u64, after: u64) -> bool {
        matches!(self, BuildState::Requested { tick } if now.saturating_sub(*tick) > after)
    }
}

/// Externally visible lifecycle stage
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChunkState {
    /// Waiting for a height map or for the mesh of its current level
    Loading,
    /// Showing the mesh of LOD table index `level`
    Ready { level: usize },
    /// Out of view; kept so returning costs nothing
    Dormant,
}

/// Notification for the renderer and physics collaborators
#[derive(Clone, Debug)]
pub enum ChunkEvent {
    VisibilityChanged {
        coord: ChunkCoord,
        visible: bool,
    },
    /// The chunk now shows the mesh of table index `level` (mesh LOD `lod`)
    LodChanged {
        coord: ChunkCoord,
        level: usize,
        lod: usize,
        mesh: Arc<TerrainMesh>,
    },
    /// Collision geometry is available for this chunk
    ColliderReady {
        coord: ChunkCoord,
        mesh: Arc<TerrainMesh>,
    },
}

/// Everything a chunk needs from its streamer during one update
pub(crate) struct UpdateContext<'a> {
    pub viewer: Vec2,
    pub tick: u64,
    pub epoch: u64,
    pub lods: &'a LodTable,
    pub collider_level: usize,
    pub sqr_collider_distance: f32,
    pub rebuild_after_ticks: u64,
    pub pipeline: &'a Arc<GenerationPipeline>,
    pub backend: &'a mut dyn BuildBackend,
    pub events: &'a mut Vec<ChunkEvent>,
}

impl UpdateContext<'_> {
    fn priority(&self, bounds: &Rect) -> f32 {
        1.0 / (bounds.sqr_distance(self.viewer).sqrt() + 1.0)
    }
}

/// One terrain tile tracked by the streamer
#[derive(Debug)]
pub struct TerrainChunk {
    coord: ChunkCoord,
    world_position: Vec2,
    bounds: Rect,
    height_map: BuildState<HeightMap>,
    /// Indexed by LOD table level
    meshes: Vec<BuildState<TerrainMesh>>,
    current_level: Option<usize>,
    visible: bool,
    has_set_collider: bool,
}

impl TerrainChunk {
    pub fn new(coord: ChunkCoord, world_size: f32, levels: usize) -> Self {
        let world_position = coord.as_vec2() * world_size;
        Self {
            coord,
            world_position,
            bounds: Rect::from_center_size(world_position, Vec2::splat(world_size)),
            height_map: BuildState::NotRequested,
            meshes: vec![BuildState::NotRequested; levels],
            current_level: None,
            visible: false,
            has_set_collider: false,
        }
    }

    pub fn coord(&self) -> ChunkCoord {
        self.coord
    }

    /// Centre of the chunk on the XZ plane
    pub fn world_position(&self) -> Vec2 {
        self.world_position
    }

    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn height_map(&self) -> Option<&Arc<HeightMap>> {
        self.height_map.ready()
    }

    pub fn current_level(&self) -> Option<usize> {
        self.current_level
    }

    pub fn current_mesh(&self) -> Option<&Arc<TerrainMesh>> {
        self.current_level.and_then(|level| self.meshes[level].ready())
    }

    /// Mesh cached for table index `level`
    pub fn mesh(&self, level: usize) -> Option<&Arc<TerrainMesh>> {
        self.meshes.get(level).and_then(BuildState::ready)
    }

    pub fn cached_mesh_count(&self) -> usize {
        self.meshes.iter().filter(|m| m.is_ready()).count()
    }

    pub fn has_collider(&self) -> bool {
        self.has_set_collider
    }

    pub fn state(&self) -> ChunkState {
        match (self.height_map.is_ready(), self.visible, self.current_level) {
            (true, false, _) => ChunkState::Dormant,
            (true, true, Some(level)) => ChunkState::Ready { level },
            _ => ChunkState::Loading,
        }
    }

    /// Request the height map
    pub(crate) fn load(&mut self, ctx: &mut UpdateContext<'_>) {
        if matches!(self.height_map, BuildState::NotRequested) {
            self.request_height_map(ctx);
        }
    }

    fn request_height_map(&mut self, ctx: &mut UpdateContext<'_>) {
        let request = BuildRequest::height_map(self.coord, ctx.epoch, ctx.priority(&self.bounds), ctx.pipeline.clone());
        ctx.backend.submit(request);
        self.height_map = BuildState::Requested { tick: ctx.tick };
    }

    fn request_mesh(&mut self, level: usize, ctx: &mut UpdateContext<'_>) {
        let Some(height_map) = self.height_map.ready().cloned() else {
            return;
        };
        let request = BuildRequest::mesh(
            self.coord,
            level,
            ctx.lods.lod(level),
            height_map,
            ctx.epoch,
            ctx.priority(&self.bounds),
            ctx.pipeline.clone(),
        );
        ctx.backend.submit(request);
        self.meshes[level] = BuildState::Requested { tick: ctx.tick };
        log::debug!("Chunk {} requested mesh level {} (lod {})", self.coord, level, ctx.lods.lod(level));
    }

    /// Recompute the required level and visibility for the current viewer.
    ///
    /// Switching to a cached level is immediate; an uncached level is
    /// requested once and the chunk keeps its old mesh meanwhile. Returns
    /// whether the chunk is visible afterwards.
    pub(crate) fn update(&mut self, ctx: &mut UpdateContext<'_>) -> bool {
        if !self.height_map.is_ready() {
            return self.visible;
        }

        let was_visible = self.visible;
        let sqr_distance = self.bounds.sqr_distance(ctx.viewer);
        let required = ctx.lods.required_level(sqr_distance);
        let visible = required.is_some();

        if let Some(level) = required {
            if self.current_level != Some(level) {
                match &self.meshes[level] {
                    BuildState::Ready(mesh) => {
                        let mesh = mesh.clone();
                        log::debug!("Chunk {} switched to level {}", self.coord, level);
                        self.current_level = Some(level);
                        ctx.events.push(ChunkEvent::LodChanged {
                            coord: self.coord,
                            level,
                            lod: mesh.lod,
                            mesh,
                        });
                    }
                    BuildState::NotRequested | BuildState::Failed => self.request_mesh(level, ctx),
                    BuildState::Requested { .. } => {}
                }
            }
        }

        if visible != was_visible {
            self.visible = visible;
            ctx.events.push(ChunkEvent::VisibilityChanged { coord: self.coord, visible });
        }
        visible
    }

    /// Request and hand off the collider mesh once the viewer is close enough
    pub(crate) fn update_collision(&mut self, ctx: &mut UpdateContext<'_>) {
        if self.has_set_collider || !self.height_map.is_ready() {
            return;
        }

        let level = ctx.collider_level;
        let sqr_distance = self.bounds.sqr_distance(ctx.viewer);

        if sqr_distance < ctx.lods.sqr_threshold(level) && self.meshes[level].needs_request() {
            self.request_mesh(level, ctx);
        }

        if sqr_distance < ctx.sqr_collider_distance {
            if let Some(mesh) = self.meshes[level].ready() {
                ctx.events.push(ChunkEvent::ColliderReady {
                    coord: self.coord,
                    mesh: mesh.clone(),
                });
                self.has_set_collider = true;
                log::debug!("Chunk {} collider ready", self.coord);
            }
        }
    }

    /// Store a finished height map; duplicates are ignored
    pub(crate) fn on_height_map(&mut self, height_map: Arc<HeightMap>, ctx: &mut UpdateContext<'_>) {
        if self.height_map.is_ready() {
            return;
        }
        self.height_map = BuildState::Ready(height_map);
        self.update(ctx);
        self.update_collision(ctx);
    }

    /// Store a finished mesh. Returns `false` if the level was already cached.
    pub(crate) fn on_mesh(&mut self, level: usize, mesh: Arc<TerrainMesh>, ctx: &mut UpdateContext<'_>) -> bool {
        let Some(slot) = self.meshes.get_mut(level) else {
            return false;
        };
        if slot.is_ready() {
            return false;
        }
        *slot = BuildState::Ready(mesh);
        self.update(ctx);
        self.update_collision(ctx);
        true
    }

    /// Mark a failed request so it is issued again
    pub(crate) fn on_failed(&mut self, kind: BuildKind) {
        match kind {
            BuildKind::HeightMap if !self.height_map.is_ready() => self.height_map = BuildState::Failed,
            BuildKind::Mesh { level } => {
                if let Some(slot) = self.meshes.get_mut(level) {
                    if !slot.is_ready() {
                        *slot = BuildState::Failed;
                    }
                }
            }
            _ => {}
        }
    }

    /// Mesh levels the viewer currently needs: the required level and,
    /// until the collider is handed off, the collider level
    fn wanted_levels(&self, ctx: &UpdateContext<'_>) -> [Option<usize>; 2] {
        let sqr_distance = self.bounds.sqr_distance(ctx.viewer);
        let collider = (!self.has_set_collider && sqr_distance < ctx.lods.sqr_threshold(ctx.collider_level))
            .then_some(ctx.collider_level);
        [ctx.lods.required_level(sqr_distance), collider]
    }

    /// Whether [`TerrainChunk::retry_stalled`] has anything to do
    pub(crate) fn needs_retry(&self, rebuild_after_ticks: u64) -> bool {
        self.height_map.needs_request()
            || self.meshes.iter().any(|m| matches!(m, BuildState::Failed))
            || (rebuild_after_ticks > 0 && !self.outstanding().is_empty())
    }

    /// Re-issue failed builds the viewer still needs, and requests
    /// outstanding for more than `rebuild_after_ticks`.
    ///
    /// Returns whether the chunk should be checked again on later ticks.
    pub(crate) fn retry_stalled(&mut self, ctx: &mut UpdateContext<'_>) -> bool {
        if self.height_map.needs_request() {
            self.request_height_map(ctx);
        }

        if self.height_map.is_ready() {
            for level in self.wanted_levels(ctx).into_iter().flatten() {
                if matches!(self.meshes[level], BuildState::Failed) {
                    log::debug!("Chunk {} re-requesting failed mesh level {}", self.coord, level);
                    self.request_mesh(level, ctx);
                }
            }
        }

        if ctx.rebuild_after_ticks == 0 {
            return false;
        }

        if self.height_map.is_stalled(ctx.tick, ctx.rebuild_after_ticks) {
            log::warn!("Chunk {} height map stalled, re-issuing", self.coord);
            ctx.backend.cancel(BuildKey::height_map(self.coord));
            self.request_height_map(ctx);
        }

        for level in 0..self.meshes.len() {
            if self.meshes[level].is_stalled(ctx.tick, ctx.rebuild_after_ticks) {
                log::warn!("Chunk {} mesh level {} stalled, re-issuing", self.coord, level);
                ctx.backend.cancel(BuildKey::mesh(self.coord, level));
                self.request_mesh(level, ctx);
            }
        }

        !self.outstanding().is_empty()
    }

    /// Keys this chunk is still waiting on
    pub(crate) fn outstanding(&self) -> Vec<BuildKey> {
        let mut keys = Vec::new();
        if matches!(self.height_map, BuildState::Requested { .. }) {
            keys.push(BuildKey::height_map(self.coord));
        }
        for (level, mesh) in self.meshes.iter().enumerate() {
            if matches!(mesh, BuildState::Requested { .. }) {
                keys.push(BuildKey::mesh(self.coord, level));
            }
        }
        keys
    }
}
