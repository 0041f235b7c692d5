//! Chunk build backends.
//!
//! Height maps and meshes are pure functions of `(coord, settings, lod)`, so
//! they can run anywhere. Backends accept [`BuildRequest`]s and hand back
//! [`BuildResult`]s that the streamer drains on its own thread.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use tokio::runtime::Runtime;
use tokio::sync::mpsc;
use tokio::task::JoinSet;

use crate::core::{ChunkCoord, Result};
use crate::generation::GenerationPipeline;
use crate::mesh::TerrainMesh;
use crate::terrain::HeightMap;

/// What a request builds
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BuildKind {
    HeightMap,
    /// Mesh for LOD table index `level`
    Mesh { level: usize },
}

/// Identity of one outstanding build
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BuildKey {
    pub coord: ChunkCoord,
    pub kind: BuildKind,
}

impl BuildKey {
    pub fn height_map(coord: ChunkCoord) -> Self {
        Self { coord, kind: BuildKind::HeightMap }
    }

    pub fn mesh(coord: ChunkCoord, level: usize) -> Self {
        Self { coord, kind: BuildKind::Mesh { level } }
    }
}

#[derive(Clone, Debug)]
enum BuildJob {
    HeightMap,
    Mesh { height_map: Arc<HeightMap>, lod: usize },
}

/// Self-contained unit of work: the settings snapshot travels with it
#[derive(Clone, Debug)]
pub struct BuildRequest {
    key: BuildKey,
    epoch: u64,
    /// Higher runs sooner
    priority: f32,
    pipeline: Arc<GenerationPipeline>,
    job: BuildJob,
}

impl BuildRequest {
    pub fn height_map(coord: ChunkCoord, epoch: u64, priority: f32, pipeline: Arc<GenerationPipeline>) -> Self {
        Self {
            key: BuildKey::height_map(coord),
            epoch,
            priority,
            pipeline,
            job: BuildJob::HeightMap,
        }
    }

    /// Mesh for table index `level`, built at mesh LOD `lod`
    pub fn mesh(
        coord: ChunkCoord,
        level: usize,
        lod: usize,
        height_map: Arc<HeightMap>,
        epoch: u64,
        priority: f32,
        pipeline: Arc<GenerationPipeline>,
    ) -> Self {
        Self {
            key: BuildKey::mesh(coord, level),
            epoch,
            priority,
            pipeline,
            job: BuildJob::Mesh { height_map, lod },
        }
    }

    pub fn key(&self) -> BuildKey {
        self.key
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn priority(&self) -> f32 {
        self.priority
    }

    /// Execute on the calling thread
    pub fn run(self) -> BuildResult {
        let coord = self.key.coord;
        let epoch = self.epoch;
        match (self.job, self.key.kind) {
            (BuildJob::HeightMap, _) => BuildResult::HeightMap {
                coord,
                epoch,
                height_map: Arc::new(self.pipeline.height_map(coord)),
            },
            (BuildJob::Mesh { height_map, lod }, BuildKind::Mesh { level }) => BuildResult::Mesh {
                coord,
                epoch,
                level,
                mesh: Arc::new(self.pipeline.mesh(&height_map, lod)),
            },
            (BuildJob::Mesh { .. }, BuildKind::HeightMap) => BuildResult::Failed {
                key: self.key,
                epoch,
                reason: "mesh job keyed as height map".into(),
            },
        }
    }
}

/// Outcome of a build
#[derive(Clone, Debug)]
pub enum BuildResult {
    HeightMap {
        coord: ChunkCoord,
        epoch: u64,
        height_map: Arc<HeightMap>,
    },
    Mesh {
        coord: ChunkCoord,
        epoch: u64,
        level: usize,
        mesh: Arc<TerrainMesh>,
    },
    /// The worker died; the request may be retried
    Failed { key: BuildKey, epoch: u64, reason: String },
}

impl BuildResult {
    pub fn key(&self) -> BuildKey {
        match self {
            BuildResult::HeightMap { coord, .. } => BuildKey::height_map(*coord),
            BuildResult::Mesh { coord, level, .. } => BuildKey::mesh(*coord, *level),
            BuildResult::Failed { key, .. } => *key,
        }
    }

    pub fn epoch(&self) -> u64 {
        match self {
            BuildResult::HeightMap { epoch, .. }
            | BuildResult::Mesh { epoch, .. }
            | BuildResult::Failed { epoch, .. } => *epoch,
        }
    }
}

/// Something that executes build requests and reports back when polled
pub trait BuildBackend {
    /// Queue a request. Returns `false` if the key is already pending.
    fn submit(&mut self, request: BuildRequest) -> bool;

    /// Forget a pending key (best effort).
    ///
    /// A build that already started still reports its result; callers
    /// ignore results they no longer expect.
    fn cancel(&mut self, key: BuildKey);

    /// Drain completed results without blocking
    fn poll_results(&mut self) -> Vec<BuildResult>;

    fn pending_count(&self) -> usize;

    fn is_pending(&self, key: BuildKey) -> bool;
}

/// Pending keys and the epoch they were submitted under
#[derive(Debug, Default)]
struct PendingSet {
    keys: HashMap<BuildKey, u64>,
}

impl PendingSet {
    fn insert(&mut self, key: BuildKey, epoch: u64) -> bool {
        if self.keys.contains_key(&key) {
            return false;
        }
        self.keys.insert(key, epoch);
        true
    }

    /// Clear `key` if `result` answers the submission currently pending
    fn complete(&mut self, result: &BuildResult) {
        let key = result.key();
        if self.keys.get(&key) == Some(&result.epoch()) {
            self.keys.remove(&key);
        }
    }
}

/// Builds on a dedicated tokio runtime, at most `max_concurrent` at a time.
///
/// Each build runs under `spawn_blocking`; queued requests start in priority
/// order. A panicking build is reported as [`BuildResult::Failed`].
pub struct AsyncBuildQueue {
    /// Dropped first so the worker loop drains and exits before the runtime
    request_tx: mpsc::UnboundedSender<BuildRequest>,
    result_rx: mpsc::UnboundedReceiver<BuildResult>,
    pending: PendingSet,
    max_concurrent: usize,
    #[allow(dead_code)]
    runtime: Runtime,
}

impl AsyncBuildQueue {
    /// Start a queue with its own runtime.
    ///
    /// `max_concurrent` of 0 is treated as 1.
    pub fn new(max_concurrent: usize) -> Result<Self> {
        let max_concurrent = max_concurrent.max(1);
        let (request_tx, request_rx) = mpsc::unbounded_channel::<BuildRequest>();
        let (result_tx, result_rx) = mpsc::unbounded_channel::<BuildResult>();

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(Self::scheduler_threads(max_concurrent))
            .max_blocking_threads(max_concurrent)
            .thread_name("terrain-build")
            .enable_all()
            .build()?;

        runtime.spawn(Self::worker_loop(max_concurrent, request_rx, result_tx));

        log::info!("Build queue started with {} concurrent builds", max_concurrent);

        Ok(Self {
            request_tx,
            result_rx,
            pending: PendingSet::default(),
            max_concurrent,
            runtime,
        })
    }

    /// Async worker count. Builds run on the blocking pool (sized by
    /// `max_concurrent`); async workers only queue and join them.
    fn scheduler_threads(max_concurrent: usize) -> usize {
        max_concurrent.clamp(1, 2)
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    async fn worker_loop(
        max_concurrent: usize,
        mut request_rx: mpsc::UnboundedReceiver<BuildRequest>,
        result_tx: mpsc::UnboundedSender<BuildResult>,
    ) {
        let mut active: JoinSet<BuildResult> = JoinSet::new();
        let mut queued: Vec<BuildRequest> = Vec::new();
        let mut closed = false;

        loop {
            // Highest priority last so pop() takes it
            if active.len() < max_concurrent && !queued.is_empty() {
                queued.sort_by(|a, b| a.priority.total_cmp(&b.priority));
            }
            while active.len() < max_concurrent {
                let Some(request) = queued.pop() else {
                    break;
                };
                let key = request.key;
                let epoch = request.epoch;
                active.spawn(async move {
                    match tokio::task::spawn_blocking(move || request.run()).await {
                        Ok(result) => result,
                        Err(e) => BuildResult::Failed { key, epoch, reason: e.to_string() },
                    }
                });
            }

            if closed && queued.is_empty() && active.is_empty() {
                break;
            }

            tokio::select! {
                request = request_rx.recv(), if !closed => match request {
                    Some(request) => queued.push(request),
                    None => closed = true,
                },

                Some(joined) = active.join_next(), if !active.is_empty() => match joined {
                    Ok(result) => {
                        let _ = result_tx.send(result);
                    }
                    Err(e) => log::error!("Build task failed to join: {}", e),
                },

                else => break,
            }
        }

        log::debug!("Build queue worker stopped");
    }
}

impl BuildBackend for AsyncBuildQueue {
    fn submit(&mut self, request: BuildRequest) -> bool {
        if !self.pending.insert(request.key, request.epoch) {
            return false;
        }
        let key = request.key;
        if self.request_tx.send(request).is_err() {
            log::error!("Build queue worker is gone, dropping {:?}", key);
            self.pending.keys.remove(&key);
            return false;
        }
        true
    }

    fn cancel(&mut self, key: BuildKey) {
        self.pending.keys.remove(&key);
    }

    fn poll_results(&mut self) -> Vec<BuildResult> {
        let mut results = Vec::new();
        while let Ok(result) = self.result_rx.try_recv() {
            self.pending.complete(&result);
            results.push(result);
        }
        results
    }

    fn pending_count(&self) -> usize {
        self.pending.keys.len()
    }

    fn is_pending(&self, key: BuildKey) -> bool {
        self.pending.keys.contains_key(&key)
    }
}

/// Runs every request on the submitting thread.
///
/// Results are held until the next [`BuildBackend::poll_results`], so the
/// streamer sees the same hand-off as with [`AsyncBuildQueue`] but in a fully
/// deterministic order. While paused, requests are held unexecuted.
#[derive(Debug, Default)]
pub struct InlineBuildQueue {
    results: VecDeque<BuildResult>,
    held: Vec<BuildRequest>,
    pending: PendingSet,
    paused: bool,
    submitted: Vec<BuildKey>,
}

impl InlineBuildQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue that holds requests until [`InlineBuildQueue::set_paused`]`(false)`
    pub fn paused() -> Self {
        Self { paused: true, ..Self::default() }
    }

    /// Pause or resume; resuming runs every held request in submission order
    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
        if !paused {
            for request in std::mem::take(&mut self.held) {
                self.results.push_back(request.run());
            }
        }
    }

    /// Every key ever accepted, in submission order
    pub fn submitted(&self) -> &[BuildKey] {
        &self.submitted
    }

    pub fn held_count(&self) -> usize {
        self.held.len()
    }
}

impl BuildBackend for InlineBuildQueue {
    fn submit(&mut self, request: BuildRequest) -> bool {
        if !self.pending.insert(request.key, request.epoch) {
            return false;
        }
        self.submitted.push(request.key);
        if self.paused {
            self.held.push(request);
        } else {
            self.results.push_back(request.run());
        }
        true
    }

    fn cancel(&mut self, key: BuildKey) {
        self.pending.keys.remove(&key);
        self.held.retain(|r| r.key != key);
    }

    fn poll_results(&mut self) -> Vec<BuildResult> {
        let results: Vec<BuildResult> = self.results.drain(..).collect();
        for result in &results {
            self.pending.complete(result);
        }
        results
    }

    fn pending_count(&self) -> usize {
        self.pending.keys.len()
    }

    fn is_pending(&self, key: BuildKey) -> bool {
        self.pending.keys.contains_key(&key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::IVec2;
    use crate::mesh::MeshSettings;
    use crate::terrain::ElevationSettings;
    use std::time::{Duration, Instant};

    fn pipeline() -> Arc<GenerationPipeline> {
        Arc::new(GenerationPipeline::new(
            ElevationSettings::default(),
            MeshSettings::new(0, 1.0).unwrap(),
        ))
    }

    fn wait_for(queue: &mut AsyncBuildQueue, count: usize) -> Vec<BuildResult> {
        let start = Instant::now();
        let mut results = Vec::new();
        while results.len() < count && start.elapsed() < Duration::from_secs(30) {
            results.extend(queue.poll_results());
            std::thread::sleep(Duration::from_millis(5));
        }
        results
    }

    #[test]
    fn test_inline_runs_on_submit() {
        let mut queue = InlineBuildQueue::new();
        let coord = IVec2::new(1, -2);
        assert!(queue.submit(BuildRequest::height_map(coord, 0, 1.0, pipeline())));
        assert!(queue.is_pending(BuildKey::height_map(coord)));

        let results = queue.poll_results();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].key(), BuildKey::height_map(coord));
        assert_eq!(queue.pending_count(), 0);

        match &results[0] {
            BuildResult::HeightMap { height_map, .. } => assert_eq!(height_map.width(), 53),
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn test_duplicate_pending_rejected() {
        let mut queue = InlineBuildQueue::paused();
        let coord = IVec2::ZERO;
        assert!(queue.submit(BuildRequest::height_map(coord, 0, 1.0, pipeline())));
        assert!(!queue.submit(BuildRequest::height_map(coord, 0, 2.0, pipeline())));
        assert_eq!(queue.pending_count(), 1);
        assert_eq!(queue.held_count(), 1);
    }

    #[test]
    fn test_paused_cancel_and_resume() {
        let mut queue = InlineBuildQueue::paused();
        let a = IVec2::new(0, 0);
        let b = IVec2::new(1, 0);
        queue.submit(BuildRequest::height_map(a, 0, 1.0, pipeline()));
        queue.submit(BuildRequest::height_map(b, 0, 1.0, pipeline()));
        assert!(queue.poll_results().is_empty());

        queue.cancel(BuildKey::height_map(a));
        assert!(!queue.is_pending(BuildKey::height_map(a)));

        queue.set_paused(false);
        let results = queue.poll_results();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].key(), BuildKey::height_map(b));
        assert_eq!(queue.submitted().len(), 2);
    }

    #[test]
    fn test_mesh_request_uses_given_lod() {
        let pipeline = pipeline();
        let coord = IVec2::new(2, 3);
        let height_map = Arc::new(pipeline.height_map(coord));
        let request = BuildRequest::mesh(coord, 1, 4, height_map, 7, 0.5, pipeline);
        assert_eq!(request.key(), BuildKey::mesh(coord, 1));

        match request.run() {
            BuildResult::Mesh { level, epoch, mesh, .. } => {
                assert_eq!(level, 1);
                assert_eq!(epoch, 7);
                assert_eq!(mesh.lod, 4);
            }
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn test_scheduler_threads_follow_concurrency() {
        assert_eq!(AsyncBuildQueue::scheduler_threads(1), 1);
        assert_eq!(AsyncBuildQueue::scheduler_threads(2), 2);
        assert_eq!(AsyncBuildQueue::scheduler_threads(16), 2);

        let queue = AsyncBuildQueue::new(0).unwrap();
        assert_eq!(queue.max_concurrent(), 1);
    }

    #[test]
    fn test_async_queue_completes_requests() {
        let mut queue = AsyncBuildQueue::new(2).unwrap();
        let pipeline = pipeline();
        for x in 0..4 {
            assert!(queue.submit(BuildRequest::height_map(IVec2::new(x, 0), 0, x as f32, pipeline.clone())));
        }
        assert_eq!(queue.pending_count(), 4);

        let results = wait_for(&mut queue, 4);
        assert_eq!(results.len(), 4);
        assert_eq!(queue.pending_count(), 0);
        assert!(results.iter().all(|r| matches!(r, BuildResult::HeightMap { .. })));
    }

    #[test]
    fn test_async_cancelled_result_still_arrives() {
        let mut queue = AsyncBuildQueue::new(1).unwrap();
        let coord = IVec2::new(5, 5);
        queue.submit(BuildRequest::height_map(coord, 0, 1.0, pipeline()));
        queue.cancel(BuildKey::height_map(coord));
        assert!(!queue.is_pending(BuildKey::height_map(coord)));

        let results = wait_for(&mut queue, 1);
        assert_eq!(results.len(), 1);
        assert_eq!(queue.pending_count(), 0);
    }
}
