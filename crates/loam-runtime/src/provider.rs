//! Where generated chunks come from: the calling thread or a worker pool.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use crossbeam_channel::{Sender, unbounded};
use loam_chunk::{ChunkGenerateResult, GenerationError, GenerationPipeline, generate_chunk_buffer};
use loam_world::{ChunkCoord, NoiseSource, World};
use rayon::{ThreadPool, ThreadPoolBuildError, ThreadPoolBuilder};

use crate::noise_pool::NoiseSourcePool;

/// One finished generation request.
pub struct GenOut {
    pub coord: ChunkCoord,
    pub job_id: u64,
    pub result: Result<ChunkGenerateResult, GenerationError>,
    pub t_gen_ms: u32,
}

/// Fire-and-forget chunk generation. The result is sent on `reply` whenever
/// it is ready; the streamer picks it up on its next admission pass.
pub trait ChunkProvider {
    fn request(&self, coord: ChunkCoord, job_id: u64, reply: Sender<GenOut>);
}

impl<P: ChunkProvider + ?Sized> ChunkProvider for Box<P> {
    fn request(&self, coord: ChunkCoord, job_id: u64, reply: Sender<GenOut>) {
        (**self).request(coord, job_id, reply)
    }
}

fn elapsed_ms(t0: Instant) -> u32 {
    t0.elapsed().as_millis().min(u128::from(u32::MAX)) as u32
}

fn run_job(
    world: &World,
    pipeline: &GenerationPipeline,
    noise: &NoiseSource,
    coord: ChunkCoord,
    job_id: u64,
) -> GenOut {
    let t0 = Instant::now();
    let result = generate_chunk_buffer(world, coord, noise, pipeline);
    GenOut {
        coord,
        job_id,
        result,
        t_gen_ms: elapsed_ms(t0),
    }
}

/// Generates on the caller's thread, inside `request`.
pub struct LocalProvider {
    world: Arc<World>,
    pipeline: Arc<GenerationPipeline>,
    noise: NoiseSource,
}

impl LocalProvider {
    pub fn new(world: Arc<World>, pipeline: Arc<GenerationPipeline>) -> Self {
        let noise = world.make_noise_source();
        Self {
            world,
            pipeline,
            noise,
        }
    }
}

impl ChunkProvider for LocalProvider {
    fn request(&self, coord: ChunkCoord, job_id: u64, reply: Sender<GenOut>) {
        let out = run_job(&self.world, &self.pipeline, &self.noise, coord, job_id);
        let _ = reply.send(out);
    }
}

struct GenJob {
    coord: ChunkCoord,
    job_id: u64,
    reply: Sender<GenOut>,
}

/// Generates on a dedicated rayon pool. Workers share a pool of noise sources
/// and exit once the provider is dropped.
pub struct WorkerProvider {
    job_tx: Sender<GenJob>,
    _pool: ThreadPool,
    queued: Arc<AtomicUsize>,
    inflight: Arc<AtomicUsize>,
    pub workers: usize,
}

impl WorkerProvider {
    pub fn new(
        world: Arc<World>,
        pipeline: Arc<GenerationPipeline>,
        workers: usize,
    ) -> Result<Self, ThreadPoolBuildError> {
        let workers = workers.max(1);
        let (job_tx, job_rx) = unbounded::<GenJob>();
        let pool = ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("loam-gen-{i}"))
            .build()?;
        let noise_pool = Arc::new(NoiseSourcePool::with_capacity_from_workers(workers));
        let queued = Arc::new(AtomicUsize::new(0));
        let inflight = Arc::new(AtomicUsize::new(0));

        for _ in 0..workers {
            let rx = job_rx.clone();
            let world = world.clone();
            let pipeline = pipeline.clone();
            let noise_pool = noise_pool.clone();
            let queued = queued.clone();
            let inflight = inflight.clone();
            pool.spawn(move || {
                while let Ok(job) = rx.recv() {
                    queued.fetch_sub(1, Ordering::Relaxed);
                    inflight.fetch_add(1, Ordering::Relaxed);
                    let out = noise_pool.with_source(&world, |noise| {
                        run_job(&world, &pipeline, noise, job.coord, job.job_id)
                    });
                    let _ = job.reply.send(out);
                    inflight.fetch_sub(1, Ordering::Relaxed);
                }
            });
        }
        log::info!(target: "stream", "generation pool started with {} workers", workers);

        Ok(Self {
            job_tx,
            _pool: pool,
            queued,
            inflight,
            workers,
        })
    }

    /// `(queued, inflight)` job counts.
    pub fn queue_debug_counts(&self) -> (usize, usize) {
        (
            self.queued.load(Ordering::Relaxed),
            self.inflight.load(Ordering::Relaxed),
        )
    }
}

impl ChunkProvider for WorkerProvider {
    fn request(&self, coord: ChunkCoord, job_id: u64, reply: Sender<GenOut>) {
        self.queued.fetch_add(1, Ordering::Relaxed);
        if self
            .job_tx
            .send(GenJob {
                coord,
                job_id,
                reply,
            })
            .is_err()
        {
            self.queued.fetch_sub(1, Ordering::Relaxed);
            log::warn!(target: "stream", "generation pool is gone; dropped request for {}", coord);
        }
    }
}
