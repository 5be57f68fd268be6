use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

/// How per-image tasks are scheduled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum PoolKind {
    /// Dedicated rayon pool of OS threads, for inference-bound work
    #[default]
    Parallel,
    /// Bounded window of tokio blocking tasks, for I/O-bound work
    Concurrent,
}

/// Bounded worker pool returning results in submission order
#[derive(Debug, Clone, Copy)]
pub struct WorkerPool {
    pub kind: PoolKind,
    pub workers: usize,
}

/// A task that panicked instead of returning
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskPanic(pub String);

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "task panicked".to_string()
    }
}

impl WorkerPool {
    pub fn new(kind: PoolKind, workers: Option<usize>) -> Self {
        let workers = workers
            .filter(|w| *w > 0)
            .unwrap_or_else(|| std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1));
        Self { kind, workers }
    }

    /// Run `f` over `items`, blocking until all tasks finish.
    ///
    /// Must not be called from inside a tokio runtime when `kind` is
    /// `Concurrent`; use [`WorkerPool::map_async`] there.
    pub fn map<T, R, F>(&self, items: Vec<T>, f: F) -> anyhow::Result<Vec<Result<R, TaskPanic>>>
    where
        T: Send + 'static,
        R: Send + 'static,
        F: Fn(T) -> R + Send + Sync + 'static,
    {
        match self.kind {
            PoolKind::Parallel => self.map_parallel(items, f),
            PoolKind::Concurrent => {
                let runtime = tokio::runtime::Builder::new_multi_thread()
                    .worker_threads(self.workers)
                    .enable_all()
                    .build()?;
                Ok(runtime.block_on(self.map_concurrent(items, f)))
            }
        }
    }

    /// Like [`WorkerPool::map`] but for callers already inside a tokio runtime.
    pub async fn map_async<T, R, F>(&self, items: Vec<T>, f: F) -> anyhow::Result<Vec<Result<R, TaskPanic>>>
    where
        T: Send + 'static,
        R: Send + 'static,
        F: Fn(T) -> R + Send + Sync + 'static,
    {
        match self.kind {
            PoolKind::Parallel => {
                let pool = *self;
                tokio::task::spawn_blocking(move || pool.map_parallel(items, f)).await?
            }
            PoolKind::Concurrent => Ok(self.map_concurrent(items, f).await),
        }
    }

    fn map_parallel<T, R, F>(&self, items: Vec<T>, f: F) -> anyhow::Result<Vec<Result<R, TaskPanic>>>
    where
        T: Send,
        R: Send,
        F: Fn(T) -> R + Send + Sync,
    {
        use rayon::prelude::*;

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.workers)
            .thread_name(|i| format!("textzones-worker-{}", i))
            .build()?;

        // Indexed parallel iterators collect in input order
        Ok(pool.install(|| {
            items
                .into_par_iter()
                .map(|item| catch_unwind(AssertUnwindSafe(|| f(item))).map_err(|p| TaskPanic(panic_message(p))))
                .collect()
        }))
    }

    async fn map_concurrent<T, R, F>(&self, items: Vec<T>, f: F) -> Vec<Result<R, TaskPanic>>
    where
        T: Send + 'static,
        R: Send + 'static,
        F: Fn(T) -> R + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        // `buffered` yields in submission order while keeping `workers` tasks in flight
        futures::stream::iter(items)
            .map(|item| {
                let f = Arc::clone(&f);
                tokio::task::spawn_blocking(move || f(item))
            })
            .buffered(self.workers)
            .map(|joined| joined.map_err(|e| {
                if e.is_panic() {
                    TaskPanic(panic_message(e.into_panic()))
                } else {
                    TaskPanic(e.to_string())
                }
            }))
            .collect()
            .await
    }
}
