//! Execution-thread pool manager: three fixed-width worker pools hosting
//! query execution, with FIFO admission control and pause/resume.

use std::cell::Cell;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};

use tracing::{debug, error, info};

use crate::config::Config;
use crate::error::{acquire_lock, GraphError, Result};

/// A unit of work submitted to a pool.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

thread_local! {
    static THREAD_ID: Cell<usize> = const { Cell::new(0) };
}

/// The calling thread's stable numeric id: `0` for the host's main thread
/// (or any thread outside a pool), `1..R` for readers, `R+1..R+W` for
/// writers.
pub fn current_thread_id() -> usize {
    THREAD_ID.with(Cell::get)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunState {
    Running,
    Paused,
    Shutdown,
}

struct Pool {
    name: &'static str,
    sender: Sender<Job>,
    queue_depth: Arc<AtomicUsize>,
    max_queued: Option<u64>,
    state: Arc<(Mutex<RunState>, Condvar)>,
    workers: Vec<JoinHandle<()>>,
}

impl Pool {
    fn spawn(name: &'static str, width: usize, first_id: Option<usize>, max_queued: Option<u64>) -> Self {
        let (sender, receiver) = mpsc::channel::<Job>();
        let receiver = Arc::new(Mutex::new(receiver));
        let queue_depth = Arc::new(AtomicUsize::new(0));
        let state = Arc::new((Mutex::new(RunState::Running), Condvar::new()));

        let workers = (0..width)
            .map(|i| {
                let receiver = Arc::clone(&receiver);
                let queue_depth = Arc::clone(&queue_depth);
                let state = Arc::clone(&state);
                let id = first_id.map(|base| base + i);
                thread::Builder::new()
                    .name(format!("{name}-{i}"))
                    .spawn(move || worker_loop(id, receiver, queue_depth, state))
                    .expect("failed to spawn pool worker thread")
            })
            .collect();

        Self {
            name,
            sender,
            queue_depth,
            max_queued,
            state,
            workers,
        }
    }

    fn queue_full(&self) -> bool {
        match self.max_queued {
            Some(max) => self.queue_depth.load(Ordering::SeqCst) as u64 >= max,
            None => false,
        }
    }

    fn run_state(&self) -> Result<RunState> {
        Ok(*acquire_lock(&self.state.0)?)
    }

    fn set_run_state(&self, new_state: RunState) -> Result<()> {
        let (lock, condvar) = &*self.state;
        let mut guard = acquire_lock(lock)?;
        *guard = new_state;
        condvar.notify_all();
        Ok(())
    }

    /// Enqueues `job`, honoring admission control when `admission_checked`.
    fn submit(&self, job: Job, admission_checked: bool) -> Result<()> {
        if self.run_state()? != RunState::Running {
            return Err(GraphError::PoolNotRunning(self.name));
        }
        if admission_checked && self.queue_full() {
            debug!(pool = self.name, "submission rejected: queue full");
            return Err(GraphError::QueueFull(self.name));
        }
        self.queue_depth.fetch_add(1, Ordering::SeqCst);
        self.sender.send(job).expect("pool worker threads unexpectedly gone");
        Ok(())
    }
}

impl Drop for Pool {
    fn drop(&mut self) {
        if let Err(err) = self.set_run_state(RunState::Shutdown) {
            error!(pool = self.name, %err, "failed to signal shutdown to pool workers");
        }
        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
    }
}

fn worker_loop(
    id: Option<usize>,
    receiver: Arc<Mutex<Receiver<Job>>>,
    queue_depth: Arc<AtomicUsize>,
    state: Arc<(Mutex<RunState>, Condvar)>,
) {
    if let Some(id) = id {
        THREAD_ID.with(|cell| cell.set(id));
    }

    loop {
        {
            let (lock, condvar) = &*state;
            let mut guard = match acquire_lock(lock) {
                Ok(guard) => guard,
                Err(err) => {
                    error!(%err, "pool worker exiting: state lock poisoned");
                    return;
                }
            };
            while *guard == RunState::Paused {
                guard = match condvar.wait(guard) {
                    Ok(guard) => guard,
                    Err(_) => {
                        error!("pool worker exiting: state lock poisoned while paused");
                        return;
                    }
                };
            }
            if *guard == RunState::Shutdown {
                return;
            }
        }

        let job = {
            let recv = match acquire_lock(&receiver) {
                Ok(recv) => recv,
                Err(err) => {
                    error!(%err, "pool worker exiting: receiver lock poisoned");
                    return;
                }
            };
            recv.recv()
        };

        match job {
            Ok(job) => {
                queue_depth.fetch_sub(1, Ordering::SeqCst);
                job();
            }
            Err(_) => return,
        }
    }
}

/// Owns the three named worker pools and admits work to them.
pub struct ThreadPoolManager {
    pools: Mutex<Option<Pools>>,
}

struct Pools {
    readers: Pool,
    writers: Pool,
    bulk_loaders: Pool,
}

impl Default for ThreadPoolManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ThreadPoolManager {
    /// Creates a manager with no pools yet initialized.
    pub fn new() -> Self {
        Self {
            pools: Mutex::new(None),
        }
    }

    /// Allocates all three pools per `config`. Fails with
    /// `PoolAlreadyInitialized` if called more than once.
    pub fn create_pools(&self, config: &Config) -> Result<()> {
        let mut guard = acquire_lock(&self.pools)?;
        if guard.is_some() {
            return Err(GraphError::PoolAlreadyInitialized);
        }

        let readers = Pool::spawn("readers", config.reader_threads, Some(1), config.max_queued_queries);
        let writers = Pool::spawn(
            "writers",
            config.writer_threads,
            Some(1 + config.reader_threads),
            config.max_queued_queries,
        );
        let bulk_loaders = Pool::spawn("bulk_loaders", config.bulk_loader_threads, None, None);

        info!(
            readers = config.reader_threads,
            writers = config.writer_threads,
            bulk_loaders = config.bulk_loader_threads,
            "thread pools initialized"
        );

        *guard = Some(Pools {
            readers,
            writers,
            bulk_loaders,
        });
        Ok(())
    }

    /// Locks the pool set and runs `f` against it, if it has been
    /// initialized. Propagates poisoning from the manager's own lock; a
    /// closure's own `Result` is flattened into the outer one.
    fn with_pools<R>(&self, f: impl FnOnce(&Pools) -> Result<R>) -> Result<Option<R>> {
        let guard = acquire_lock(&self.pools)?;
        guard.as_ref().map(f).transpose()
    }

    /// Sum of reader and writer widths. Bulk loaders are excluded by
    /// design — they are not query workers.
    pub fn thread_count(&self) -> Result<usize> {
        let count = self.with_pools(|p| Ok(p.readers.workers.len() + p.writers.workers.len()))?;
        Ok(count.unwrap_or(0))
    }

    /// Pauses all three pools together.
    pub fn pause(&self) -> Result<()> {
        let paused = self.with_pools(|p| {
            p.readers.set_run_state(RunState::Paused)?;
            p.writers.set_run_state(RunState::Paused)?;
            p.bulk_loaders.set_run_state(RunState::Paused)?;
            Ok(())
        })?;
        if paused.is_some() {
            info!("thread pools paused");
        }
        Ok(())
    }

    /// Resumes all three pools together.
    pub fn resume(&self) -> Result<()> {
        let resumed = self.with_pools(|p| {
            p.readers.set_run_state(RunState::Running)?;
            p.writers.set_run_state(RunState::Running)?;
            p.bulk_loaders.set_run_state(RunState::Running)?;
            Ok(())
        })?;
        if resumed.is_some() {
            info!("thread pools resumed");
        }
        Ok(())
    }

    /// Submits `job` to the reader pool, subject to `MAX_QUEUED_QUERIES`.
    pub fn submit_reader(&self, job: Job) -> Result<()> {
        self.with_pools(|p| p.readers.submit(job, true))?
            .unwrap_or(Err(GraphError::PoolNotRunning("readers")))
    }

    /// Submits `job` to the writer pool, subject to `MAX_QUEUED_QUERIES`.
    pub fn submit_writer(&self, job: Job) -> Result<()> {
        self.with_pools(|p| p.writers.submit(job, true))?
            .unwrap_or(Err(GraphError::PoolNotRunning("writers")))
    }

    /// Submits `job` to the bulk-loader pool. Never rejected by queue
    /// pressure — bulk loading must not be throttled by admission control.
    pub fn submit_bulk(&self, job: Job) -> Result<()> {
        self.with_pools(|p| p.bulk_loaders.submit(job, false))?
            .unwrap_or(Err(GraphError::PoolNotRunning("bulk_loaders")))
    }
}
