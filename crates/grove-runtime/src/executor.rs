//! The shared worker pool behind all pipelines.
//!
//! Pipelines do not own threads. When a pipeline becomes executing it
//! submits its drain loop to an [`Executor`]; the loop holds a worker
//! until the queue is empty and gives it back. Handlers are ordinary
//! blocking code, so workers come from the tokio blocking pool, which
//! grows on demand and parks idle threads.
//!
//! A process-wide default pool is created lazily; embedders that
//! already run tokio can hand their own handle to
//! [`Runtime::builder`](crate::Runtime::builder).

use std::sync::OnceLock;

/// Handle to a worker pool accepting blocking jobs.
#[derive(Clone)]
pub struct Executor {
    handle: tokio::runtime::Handle,
}

impl Executor {
    /// The process-wide default pool.
    #[must_use]
    pub fn shared() -> Self {
        Self {
            handle: shared_runtime().handle().clone(),
        }
    }

    /// Wraps an existing tokio runtime handle.
    #[must_use]
    pub fn from_handle(handle: tokio::runtime::Handle) -> Self {
        Self { handle }
    }

    /// Submits a blocking job. The job owns its worker until it
    /// returns.
    pub(crate) fn execute(&self, job: impl FnOnce() + Send + 'static) {
        drop(self.handle.spawn_blocking(job));
    }
}

fn shared_runtime() -> &'static tokio::runtime::Runtime {
    static POOL: OnceLock<tokio::runtime::Runtime> = OnceLock::new();
    POOL.get_or_init(|| {
        tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("grove-pool")
            .build()
            .expect("grove worker pool")
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn shared_pool_runs_jobs() {
        let counter = Arc::new(AtomicUsize::new(0));
        let executor = Executor::shared();
        for _ in 0..4 {
            let counter = Arc::clone(&counter);
            executor.execute(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            });
        }
        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        while counter.load(Ordering::SeqCst) < 4 {
            assert!(std::time::Instant::now() < deadline, "jobs did not run");
            std::thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn jobs_may_block() {
        let executor = Executor::shared();
        let (tx, rx) = std::sync::mpsc::channel();
        executor.execute(move || {
            std::thread::sleep(Duration::from_millis(20));
            tx.send(()).ok();
        });
        rx.recv_timeout(Duration::from_secs(5))
            .expect("blocking job finished");
    }
}
