use super::Thumbnail;
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{Semaphore, mpsc};
use tokio_util::sync::CancellationToken;

/// Whether [`WorkerPool::submit`] started new work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submission {
    Accepted,
    /// A unit for the same identifier was already queued or running; the
    /// reply channel now waits on that unit instead.
    Joined,
}

struct Job {
    generation: u64,
    token: CancellationToken,
    started: bool,
    waiters: Vec<mpsc::UnboundedSender<Thumbnail>>,
}

struct Inner {
    permits: Arc<Semaphore>,
    jobs: Mutex<HashMap<String, Job>>,
    generations: AtomicU64,
}
impl Inner {
    fn jobs(&self) -> std::sync::MutexGuard<'_, HashMap<String, Job>> {
        self.jobs.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Bounded executor for thumbnail fetches, deduplicated by item identifier.
///
/// At most one unit per identifier is queued or running at a time, and at
/// most `workers` units run at once. A reply channel can leave a unit that
/// has not started yet; when the last one leaves, the unit finishes without
/// running its work. A unit that already started always runs to completion.
///
/// Cloning the pool clones a handle to the same queue.
#[derive(Clone)]
pub struct WorkerPool {
    inner: Arc<Inner>,
    workers: usize,
}

impl WorkerPool {
    pub fn new(workers: usize) -> Self {
        let workers = workers.max(1);
        let inner = Inner {
            permits: Arc::new(Semaphore::new(workers)),
            jobs: Mutex::default(),
            generations: AtomicU64::new(0),
        };
        Self { inner: Arc::new(inner), workers }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Queues `work` for `id`, sending its result to `reply`.
    ///
    /// If a unit for `id` is already queued or running, `work` is dropped
    /// without being polled and `reply` receives that unit's result instead.
    /// Must be called from within a tokio runtime.
    pub fn submit<F>(&self, id: &str, reply: mpsc::UnboundedSender<Thumbnail>, work: F) -> Submission
    where
        F: Future<Output = Thumbnail> + Send + 'static,
    {
        let mut jobs = self.inner.jobs();
        if let Some(job) = jobs.get_mut(id) {
            job.waiters.push(reply);
            tracing::trace!(id, "Joined in-flight thumbnail fetch");
            return Submission::Joined;
        }
        let generation = self.inner.generations.fetch_add(1, Ordering::Relaxed);
        let token = CancellationToken::new();
        let job = Job { generation, token: token.clone(), started: false, waiters: vec![reply] };
        jobs.insert(id.to_string(), job);
        drop(jobs);

        let unit = Unit { inner: Arc::clone(&self.inner), id: id.to_string(), generation };
        tokio::spawn(unit.run(token, work));
        Submission::Accepted
    }

    /// Detaches `reply` from the unit for `id` if that unit has not started.
    /// The unit itself is cancelled once no reply channel waits on it.
    /// Returns `true` if `reply` was detached.
    pub fn cancel(&self, id: &str, reply: &mpsc::UnboundedSender<Thumbnail>) -> bool {
        let mut jobs = self.inner.jobs();
        let Some(job) = jobs.get_mut(id) else {
            return false;
        };
        if job.started {
            return false;
        }
        let before = job.waiters.len();
        job.waiters.retain(|waiter| !waiter.same_channel(reply));
        if job.waiters.len() == before {
            return false;
        }
        if job.waiters.is_empty() {
            job.token.cancel();
            jobs.remove(id);
            tracing::trace!(id, "Cancelled queued thumbnail fetch");
        } else {
            tracing::trace!(id, waiters = job.waiters.len(), "Left shared thumbnail fetch");
        }
        true
    }

    /// Cancels every unit that has not started; returns how many.
    pub fn cancel_all(&self) -> usize {
        let mut jobs = self.inner.jobs();
        let before = jobs.len();
        jobs.retain(|_, job| {
            if !job.started {
                job.token.cancel();
            }
            job.started
        });
        before - jobs.len()
    }

    /// Units queued or running.
    pub fn in_flight(&self) -> usize {
        self.inner.jobs().len()
    }

    pub fn is_pending(&self, id: &str) -> bool {
        self.inner.jobs().contains_key(id)
    }
}

/// One spawned unit of work. Dropping it without completing (cancellation or
/// a panicking fetch) forgets the job, which closes its reply channels.
struct Unit {
    inner: Arc<Inner>,
    id: String,
    generation: u64,
}
impl Unit {
    async fn run<F>(self, token: CancellationToken, work: F)
    where
        F: Future<Output = Thumbnail>,
    {
        let permit = tokio::select! {
            biased;
            () = token.cancelled() => return,
            permit = Arc::clone(&self.inner.permits).acquire_owned() => match permit {
                Ok(permit) => permit,
                Err(_) => return,
            },
        };
        if !self.start() {
            return;
        }
        let thumbnail = work.await;
        drop(permit);
        self.complete(thumbnail);
    }

    /// Marks the job as started unless it was cancelled in the meantime.
    fn start(&self) -> bool {
        let mut jobs = self.inner.jobs();
        match jobs.get_mut(&self.id) {
            Some(job) if job.generation == self.generation && !job.token.is_cancelled() => {
                job.started = true;
                true
            },
            _ => false,
        }
    }

    fn complete(&self, thumbnail: Thumbnail) {
        let Some(job) = self.take() else {
            return;
        };
        for waiter in job.waiters {
            // The row may have been replaced in the meantime.
            _ = waiter.send(thumbnail.clone());
        }
    }

    fn take(&self) -> Option<Job> {
        let mut jobs = self.inner.jobs();
        match jobs.get(&self.id) {
            Some(job) if job.generation == self.generation => jobs.remove(&self.id),
            _ => None,
        }
    }
}
impl Drop for Unit {
    fn drop(&mut self) {
        self.take();
    }
}
