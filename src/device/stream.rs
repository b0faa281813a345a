use crate::config::ShuffleConfig;
use crate::error::{Result, ShuffleError};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use tokio::sync::{mpsc, oneshot};

type Job = Box<dyn FnOnce(&rayon::ThreadPool) + Send + 'static>;

/// An in-order execution queue with its own data-parallel workers.
///
/// Jobs run one at a time, in submission order, on a dedicated thread.
/// Inside a job, parallel-for passes fan out across the stream's rayon pool.
/// Submission never blocks: it returns a [`StreamHandle`] the caller waits on.
pub struct DeviceStream {
    tx: Option<mpsc::UnboundedSender<Job>>,
    worker: Option<JoinHandle<()>>,
    threads: usize,
}

impl DeviceStream {
    /// Create a stream backed by `threads` workers (0 = one per core).
    pub fn new(threads: usize) -> Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("rangeshuffle-device-{i}"))
            .build()
            .map_err(|e| ShuffleError::device(format!("thread pool: {e}")))?;
        let threads = pool.current_num_threads();

        let (tx, mut rx) = mpsc::unbounded_channel::<Job>();
        let worker = std::thread::Builder::new()
            .name("rangeshuffle-stream".into())
            .spawn(move || {
                while let Some(job) = rx.blocking_recv() {
                    job(&pool);
                }
            })
            .map_err(|e| ShuffleError::device(format!("stream thread: {e}")))?;

        tracing::debug!(threads, "device stream created");
        Ok(Self {
            tx: Some(tx),
            worker: Some(worker),
            threads,
        })
    }

    /// Create a stream sized by `config.device_threads`.
    pub fn from_config(config: &ShuffleConfig) -> Result<Self> {
        Self::new(config.device_threads)
    }

    /// Number of data-parallel workers.
    pub fn num_threads(&self) -> usize {
        self.threads
    }

    /// Enqueue `job` behind everything already submitted.
    pub(crate) fn submit<T, F>(&self, job: F) -> Result<StreamHandle<T>>
    where
        T: Send + 'static,
        F: FnOnce(&rayon::ThreadPool) -> Result<T> + Send + 'static,
    {
        let (done_tx, done_rx) = oneshot::channel();
        let finished = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&finished);

        let wrapped: Job = Box::new(move |pool| {
            let result = job(pool);
            flag.store(true, Ordering::Release);
            // The handle may have been dropped; the result is then discarded.
            let _ = done_tx.send(result);
        });

        self.tx
            .as_ref()
            .ok_or(ShuffleError::StreamClosed)?
            .send(wrapped)
            .map_err(|_| ShuffleError::StreamClosed)?;

        Ok(StreamHandle {
            rx: done_rx,
            finished,
        })
    }

    /// Block until every job submitted so far has completed.
    ///
    /// Must not be called from inside an async runtime; await a
    /// [`StreamHandle`] there instead.
    pub fn synchronize(&self) -> Result<()> {
        self.submit(|_| Ok(()))?.wait_blocking()
    }
}

impl Drop for DeviceStream {
    fn drop(&mut self) {
        // Closing the channel lets the worker drain queued jobs and exit.
        self.tx.take();
        if let Some(worker) = self.worker.take()
            && worker.join().is_err()
        {
            tracing::error!("device stream worker panicked");
        }
    }
}

impl std::fmt::Debug for DeviceStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceStream")
            .field("threads", &self.threads)
            .finish()
    }
}

/// Completion handle for one job on a [`DeviceStream`].
///
/// There is no cancellation: dropping the handle does not stop the job, it
/// only discards the result.
pub struct StreamHandle<T> {
    rx: oneshot::Receiver<Result<T>>,
    finished: Arc<AtomicBool>,
}

impl<T> StreamHandle<T> {
    /// Wait for the job to complete and return its result.
    pub async fn wait(self) -> Result<T> {
        self.rx.await.map_err(|_| ShuffleError::StreamClosed)?
    }

    /// Blocking variant of [`wait`](Self::wait) for synchronous callers.
    ///
    /// Panics if called from within an async runtime.
    pub fn wait_blocking(self) -> Result<T> {
        self.rx
            .blocking_recv()
            .map_err(|_| ShuffleError::StreamClosed)?
    }

    /// Check if the job has finished (non-blocking).
    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Acquire)
    }
}

impl<T> std::fmt::Debug for StreamHandle<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamHandle")
            .field("finished", &self.is_finished())
            .finish()
    }
}
