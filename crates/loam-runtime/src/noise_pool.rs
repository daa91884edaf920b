use std::sync::atomic::{AtomicUsize, Ordering};

use crossbeam_channel::{Receiver, Sender, bounded};
use loam_world::{NoiseSource, World};

/// Lock-free pool that keeps built `NoiseSource`s around between jobs.
pub(crate) struct NoiseSourcePool {
    available_tx: Sender<NoiseSource>,
    available_rx: Receiver<NoiseSource>,
    allocated: AtomicUsize,
    max_sources: usize,
}

impl NoiseSourcePool {
    pub fn new(max_sources: usize) -> Self {
        let max_sources = max_sources.max(1);
        let (tx, rx) = bounded(max_sources);
        Self {
            available_tx: tx,
            available_rx: rx,
            allocated: AtomicUsize::new(0),
            max_sources,
        }
    }

    pub fn with_capacity_from_workers(worker_count: usize) -> Self {
        Self::new(worker_count.max(1) * 2)
    }

    /// Run `f` with a source from the pool, building one if under capacity
    /// and otherwise waiting for another job to hand one back.
    pub fn with_source<R>(&self, world: &World, f: impl FnOnce(&NoiseSource) -> R) -> R {
        let source = self.acquire(world);
        let out = f(&source);
        let _ = self.available_tx.send(source);
        out
    }

    fn acquire(&self, world: &World) -> NoiseSource {
        if let Ok(source) = self.available_rx.try_recv() {
            return source;
        }
        loop {
            let current = self.allocated.load(Ordering::Acquire);
            if current < self.max_sources {
                let prev = self.allocated.fetch_add(1, Ordering::AcqRel);
                if prev < self.max_sources {
                    return world.make_noise_source();
                }
                self.allocated.fetch_sub(1, Ordering::AcqRel);
            }
            // We hold both ends, so recv only fails if the pool is torn down mid-call.
            if let Ok(source) = self.available_rx.recv() {
                return source;
            }
        }
    }

    pub fn allocated(&self) -> usize {
        self.allocated.load(Ordering::Relaxed)
    }
}
