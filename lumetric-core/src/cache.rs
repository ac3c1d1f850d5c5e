//! Bounded, thread-safe frame cache with background prefetch.
//!
//! One internal lock guards the LRU bookkeeping, the in-flight decode table,
//! and the hit/miss counters. Pixel data is immutable once inserted and is
//! shared by `Arc`, so readers never hold the lock while touching pixels.
//!
//! Concurrent `get` calls for the same uncached index are single-flighted:
//! the second caller waits on the first decode instead of spawning its own.

use std::collections::{HashMap, HashSet};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;

use crate::error::{source_read_error, CoreError, CoreResult};
use crate::external::{Frame, FrameSource};

/// Hit/miss counters and current occupancy, for observability.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

struct CacheEntry {
    frame: Arc<Frame>,
    last_access_tick: u64,
}

#[derive(Default)]
struct CacheState {
    entries: HashMap<u64, CacheEntry>,
    /// Indices currently being decoded by some `get` or prefetch worker.
    in_flight: HashSet<u64>,
    /// Indices with a `get` call currently in progress; never evicted.
    pinned: HashMap<u64, u32>,
    /// Indices queued for prefetch but not yet picked up by a worker.
    queued: HashSet<u64>,
    /// Failure messages from completed flights, delivered to their waiters.
    failed: HashMap<u64, String>,
    tick: u64,
    hits: u64,
    misses: u64,
}

impl CacheState {
    fn next_tick(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }
}

struct Shared {
    state: Mutex<CacheState>,
    /// Signalled whenever an in-flight decode lands (success or failure).
    landed: Condvar,
    capacity: usize,
    source: Arc<dyn FrameSource>,
}

enum Job {
    Fetch(u64),
}

/// Bounded LRU cache of decoded frames with asynchronous prefetch.
pub struct FrameCache {
    shared: Arc<Shared>,
    job_tx: Option<Sender<Job>>,
    workers: Vec<JoinHandle<()>>,
}

impl FrameCache {
    /// Creates a cache over `source` with the given entry capacity and
    /// decode worker pool size.
    ///
    /// Zero capacity or zero workers is rejected up front.
    pub fn new(
        source: Arc<dyn FrameSource>,
        capacity: usize,
        workers: usize,
    ) -> CoreResult<Self> {
        if capacity == 0 {
            return Err(CoreError::InvalidConfig(
                "cache capacity must be at least 1".to_string(),
            ));
        }
        if workers == 0 {
            return Err(CoreError::InvalidConfig(
                "cache worker count must be at least 1".to_string(),
            ));
        }

        let shared = Arc::new(Shared {
            state: Mutex::new(CacheState::default()),
            landed: Condvar::new(),
            capacity,
            source,
        });

        let (job_tx, job_rx) = channel::<Job>();
        let job_rx = Arc::new(Mutex::new(job_rx));
        let mut handles = Vec::with_capacity(workers);
        for worker_id in 0..workers {
            let shared = Arc::clone(&shared);
            let job_rx = Arc::clone(&job_rx);
            let handle = std::thread::Builder::new()
                .name(format!("frame-prefetch-{worker_id}"))
                .spawn(move || prefetch_worker(shared, job_rx))
                .map_err(CoreError::Io)?;
            handles.push(handle);
        }

        Ok(Self {
            shared,
            job_tx: Some(job_tx),
            workers: handles,
        })
    }

    /// Returns the frame at `index`, decoding on a miss.
    ///
    /// Blocks only when the frame is neither cached nor already being
    /// decoded by another caller; in the latter case it waits for that
    /// decode rather than duplicating it. A failed decode is reported to
    /// every waiter of that flight and is not cached, so the next access
    /// retries.
    pub fn get(&self, index: u64) -> CoreResult<Arc<Frame>> {
        Self::get_shared(&self.shared, index)
    }

    fn get_shared(shared: &Shared, index: u64) -> CoreResult<Arc<Frame>> {
        let mut state = shared.state.lock().expect("cache lock poisoned");
        *state.pinned.entry(index).or_insert(0) += 1;

        let mut was_waiting = false;
        loop {
            let tick = state.next_tick();
            if let Some(entry) = state.entries.get_mut(&index) {
                entry.last_access_tick = tick;
                let frame = Arc::clone(&entry.frame);
                state.hits += 1;
                Self::unpin(&mut state, index);
                return Ok(frame);
            }
            if was_waiting {
                if let Some(msg) = state.failed.get(&index) {
                    let msg = msg.clone();
                    Self::unpin(&mut state, index);
                    return Err(source_read_error(index, msg));
                }
            }
            if state.in_flight.contains(&index) {
                was_waiting = true;
                state = shared
                    .landed
                    .wait(state)
                    .expect("cache lock poisoned");
                continue;
            }
            break;
        }

        // This caller owns the flight.
        state.misses += 1;
        state.failed.remove(&index);
        state.in_flight.insert(index);
        drop(state);

        let result = shared.source.read_frame(index);

        let mut state = shared.state.lock().expect("cache lock poisoned");
        state.in_flight.remove(&index);
        let outcome = match result {
            Ok(frame) => {
                let frame = Arc::new(frame);
                Self::insert_locked(shared, &mut state, index, Arc::clone(&frame));
                Ok(frame)
            }
            Err(err) => {
                state.failed.insert(index, err.to_string());
                Err(err)
            }
        };
        Self::unpin(&mut state, index);
        shared.landed.notify_all();
        outcome
    }

    /// Inserts an externally decoded frame, evicting if needed.
    pub fn put(&self, index: u64, frame: Frame) {
        let mut state = self.shared.state.lock().expect("cache lock poisoned");
        Self::insert_locked(&self.shared, &mut state, index, Arc::new(frame));
    }

    /// Schedules asynchronous decode of `indices` without blocking.
    ///
    /// Indices already cached, in flight, or queued are skipped.
    pub fn prefetch(&self, indices: impl IntoIterator<Item = u64>) {
        let Some(tx) = &self.job_tx else { return };
        let mut state = self.shared.state.lock().expect("cache lock poisoned");
        for index in indices {
            if state.entries.contains_key(&index)
                || state.in_flight.contains(&index)
                || state.queued.contains(&index)
            {
                continue;
            }
            state.queued.insert(index);
            if tx.send(Job::Fetch(index)).is_err() {
                state.queued.remove(&index);
                return;
            }
        }
    }

    /// Drops every cached frame and pending failure record, e.g. when the
    /// video source changes. Counters are preserved.
    pub fn invalidate_all(&self) {
        let mut state = self.shared.state.lock().expect("cache lock poisoned");
        state.entries.clear();
        state.queued.clear();
        state.failed.clear();
    }

    pub fn stats(&self) -> CacheStats {
        let state = self.shared.state.lock().expect("cache lock poisoned");
        CacheStats {
            hits: state.hits,
            misses: state.misses,
            entries: state.entries.len(),
        }
    }

    /// Whether `index` currently resides in the cache. Does not bump recency.
    pub fn contains(&self, index: u64) -> bool {
        let state = self.shared.state.lock().expect("cache lock poisoned");
        state.entries.contains_key(&index)
    }

    fn unpin(state: &mut CacheState, index: u64) {
        if let Some(count) = state.pinned.get_mut(&index) {
            *count -= 1;
            if *count == 0 {
                state.pinned.remove(&index);
            }
        }
    }

    fn insert_locked(shared: &Shared, state: &mut CacheState, index: u64, frame: Arc<Frame>) {
        let tick = state.next_tick();
        if let Some(entry) = state.entries.get_mut(&index) {
            entry.frame = frame;
            entry.last_access_tick = tick;
            return;
        }

        while state.entries.len() >= shared.capacity {
            let victim = state
                .entries
                .iter()
                .filter(|(idx, _)| !state.pinned.contains_key(idx))
                .min_by_key(|(_, entry)| entry.last_access_tick)
                .map(|(idx, _)| *idx);
            match victim {
                Some(idx) => {
                    state.entries.remove(&idx);
                }
                // Every resident entry is pinned; run transiently over
                // capacity rather than evicting a pinned frame.
                None => break,
            }
        }

        state.entries.insert(
            index,
            CacheEntry {
                frame,
                last_access_tick: tick,
            },
        );
    }
}

impl Drop for FrameCache {
    fn drop(&mut self) {
        // Closing the channel stops the workers once the queue drains.
        self.job_tx.take();
        for handle in self.workers.drain(..) {
            let _ = handle.join();
        }
    }
}

fn prefetch_worker(shared: Arc<Shared>, job_rx: Arc<Mutex<Receiver<Job>>>) {
    loop {
        let job = {
            let rx = job_rx.lock().expect("prefetch queue lock poisoned");
            rx.recv()
        };
        match job {
            Ok(Job::Fetch(index)) => {
                {
                    let mut state = shared.state.lock().expect("cache lock poisoned");
                    state.queued.remove(&index);
                    if state.entries.contains_key(&index) || state.in_flight.contains(&index) {
                        continue;
                    }
                }
                if let Err(err) = FrameCache::get_shared(&shared, index) {
                    log::debug!("prefetch of frame {index} failed: {err}");
                }
            }
            Err(_) => break,
        }
    }
}
