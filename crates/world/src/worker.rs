//! Off-thread chunk generation.
//!
//! Generation is a pure function of `(chunk position, world seed)` (see
//! [`crate::generator`]), so a small pool of worker threads can run it
//! without any synchronization beyond the job/result channels themselves:
//! ownership of each [`crate::chunk::Chunk`] transfers from worker to main
//! thread over a channel rather than living behind a shared lock. `submit`
//! and `retrieve_finished` are both non-blocking; the caller decides how
//! many results to drain per tick.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam_channel::{unbounded, Receiver, Sender};
use tracing::{debug, warn};

use crate::block::{BlockRegistry, StandardBlocks};
use crate::chunk::ChunkPos;
use crate::generator::{generate_chunk, GeneratedChunk, TerrainFields};

struct ChunkGenerationJob {
    position: ChunkPos,
}

/// A finished generation job, ready to be inserted into the
/// [`crate::chunk::ChunkArena`] by the caller.
pub struct ChunkGenerationResult {
    pub position: ChunkPos,
    pub generated: GeneratedChunk,
}

/// Fixed-size pool of generation workers plus the channels connecting them
/// to the main thread.
pub struct WorkerPool {
    job_tx: Option<Sender<ChunkGenerationJob>>,
    job_rx: Receiver<ChunkGenerationJob>,
    result_rx: Receiver<ChunkGenerationResult>,
    handles: Vec<JoinHandle<()>>,
    shutdown: Arc<AtomicBool>,
    inflight: Arc<AtomicUsize>,
}

impl WorkerPool {
    /// Spawn `worker_count` threads sharing one generation seed, registry,
    /// and block-catalog. `worker_count == 0` is treated as `1`.
    pub fn new(worker_count: usize, world_seed: u64, registry: Arc<BlockRegistry>, blocks: StandardBlocks) -> Self {
        let worker_count = worker_count.max(1);
        let fields = Arc::new(TerrainFields::new(world_seed));
        let (job_tx, job_rx) = unbounded::<ChunkGenerationJob>();
        let (result_tx, result_rx) = unbounded::<ChunkGenerationResult>();
        let shutdown = Arc::new(AtomicBool::new(false));
        let inflight = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::with_capacity(worker_count);
        for worker_id in 0..worker_count {
            let job_rx = job_rx.clone();
            let result_tx = result_tx.clone();
            let registry = Arc::clone(&registry);
            let fields = Arc::clone(&fields);
            let shutdown = Arc::clone(&shutdown);
            let inflight = Arc::clone(&inflight);

            handles.push(
                std::thread::Builder::new()
                    .name(format!("voxen-worldgen-{worker_id}"))
                    .spawn(move || {
                        while let Ok(job) = job_rx.recv() {
                            inflight.fetch_sub(1, Ordering::AcqRel);
                            if shutdown.load(Ordering::Acquire) {
                                continue;
                            }
                            let generated = generate_chunk(job.position, world_seed, &fields, &registry, &blocks);
                            if result_tx
                                .send(ChunkGenerationResult {
                                    position: job.position,
                                    generated,
                                })
                                .is_err()
                            {
                                break;
                            }
                        }
                    })
                    .expect("failed to spawn worldgen worker thread"),
            );
        }

        Self {
            job_tx: Some(job_tx),
            job_rx,
            result_rx,
            handles,
            shutdown,
            inflight,
        }
    }

    /// Enqueue a chunk for generation. Non-blocking.
    pub fn submit(&self, position: ChunkPos) {
        self.inflight.fetch_add(1, Ordering::AcqRel);
        let sent = self
            .job_tx
            .as_ref()
            .map(|tx| tx.send(ChunkGenerationJob { position }).is_ok())
            .unwrap_or(false);
        if !sent {
            warn!(?position, "submitted a generation job after worker pool shutdown");
        }
    }

    /// Drain every result that has finished since the last call.
    /// Non-blocking; returns an empty `Vec` if nothing is ready.
    pub fn retrieve_finished(&self) -> Vec<ChunkGenerationResult> {
        self.result_rx.try_iter().collect()
    }

    /// Number of jobs submitted but not yet drained via
    /// [`WorkerPool::retrieve_finished`].
    pub fn pending_count(&self) -> usize {
        self.inflight.load(Ordering::Acquire)
    }

    /// Discard every job that hasn't started running yet, and suppress the
    /// output of any job already in flight. Jobs a worker has already
    /// picked up still run to completion (there's no safe way to preempt a
    /// thread mid-generation) but their results are dropped on arrival.
    pub fn cancel_all(&self) {
        self.shutdown.store(true, Ordering::Release);
        let mut discarded = 0usize;
        while self.job_rx.try_recv().is_ok() {
            self.inflight.fetch_sub(1, Ordering::AcqRel);
            discarded += 1;
        }
        while self.result_rx.try_recv().is_ok() {}
        debug!(discarded, "cancelled pending generation jobs");
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Release);
        // Dropping the sender closes the channel, which is what unblocks
        // every worker thread's `job_rx.recv()` so `join` below returns.
        self.job_tx.take();
        for handle in self.handles.drain(..) {
            let _ = handle.join();
        }
    }
}
