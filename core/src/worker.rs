//! Bounded pool of background workers owned by the service process.

use futures::FutureExt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

type Job = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PoolError {
    #[error("worker queue is full")]
    Full,

    #[error("worker pool is shut down")]
    ShutDown,

    #[error("job was cancelled before producing a result")]
    Cancelled,
}

/// Result handle of a submitted job.
#[derive(Debug)]
pub struct JobHandle<T> {
    rx: oneshot::Receiver<T>,
}

impl<T> JobHandle<T> {
    /// Wait for the job's output. Fails with [`PoolError::Cancelled`] if the job
    /// panicked or was dropped during shutdown.
    pub async fn join(self) -> Result<T, PoolError> {
        self.rx.await.map_err(|_| PoolError::Cancelled)
    }
}

/// A fixed number of worker tasks draining a bounded job queue.
///
/// Must be created inside a tokio runtime.
pub struct WorkerPool {
    name: String,
    sender: Mutex<Option<mpsc::Sender<Job>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl WorkerPool {
    #[must_use]
    pub fn new(name: &str, size: usize, queue_capacity: usize) -> Self {
        let size = size.max(1);
        let (tx, rx) = mpsc::channel::<Job>(queue_capacity.max(1));
        let rx = Arc::new(tokio::sync::Mutex::new(rx));

        let workers = (0..size)
            .map(|worker| {
                let rx = rx.clone();
                let pool = name.to_string();
                tokio::spawn(async move {
                    loop {
                        let job = rx.lock().await.recv().await;
                        let Some(job) = job else { break };
                        if AssertUnwindSafe(job).catch_unwind().await.is_err() {
                            tracing::error!(pool = %pool, worker = worker, "Background job panicked");
                        }
                    }
                    tracing::debug!(pool = %pool, worker = worker, "Worker stopped");
                })
            })
            .collect();

        tracing::info!(pool = %name, size = size, queue_capacity = queue_capacity, "Started worker pool");

        Self {
            name: name.to_string(),
            sender: Mutex::new(Some(tx)),
            workers: Mutex::new(workers),
        }
    }

    /// Queue a job without waiting for queue space.
    pub fn submit<F, T>(&self, job: F) -> Result<JobHandle<T>, PoolError>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let job: Job = Box::pin(async move {
            let output = job.await;
            let _ = tx.send(output);
        });

        let sender = self.sender.lock().unwrap_or_else(|e| e.into_inner());
        let sender = sender.as_ref().ok_or(PoolError::ShutDown)?;
        sender.try_send(job).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => PoolError::Full,
            mpsc::error::TrySendError::Closed(_) => PoolError::ShutDown,
        })?;

        Ok(JobHandle { rx })
    }

    #[must_use]
    pub fn is_shut_down(&self) -> bool {
        self.sender
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .is_none()
    }

    /// Stop accepting jobs, let queued jobs finish and join every worker.
    pub async fn shutdown(&self) {
        let sender = self.sender.lock().unwrap_or_else(|e| e.into_inner()).take();
        if sender.is_none() {
            return;
        }
        drop(sender);

        let workers = std::mem::take(&mut *self.workers.lock().unwrap_or_else(|e| e.into_inner()));
        for worker in workers {
            if let Err(e) = worker.await {
                tracing::warn!(pool = %self.name, error = %e, "Worker exited abnormally");
            }
        }
        tracing::info!(pool = %self.name, "Worker pool shut down");
    }
}
