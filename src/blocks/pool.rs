use super::BlockStream;
use crate::{Error, Result};
use futures::future::BoxFuture;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// A block fetch submitted as an independent unit of work
pub type BlockTask = BoxFuture<'static, Result<BlockStream>>;

/// Capability to run block fetches concurrently.
///
/// The client only borrows a submitter; creating, sizing and shutting it down
/// belong to the caller.
pub trait Submitter: Send + Sync {
    /// Schedule `task` for the block at manifest position `index`.
    fn submit(&self, index: usize, task: BlockTask) -> JoinHandle<Result<BlockStream>>;
}

/// Fixed-size pool of block fetch workers on a tokio runtime.
///
/// At most `size` submitted tasks run at once; the rest wait for a slot in
/// submission order. Clones share the same slots and shutdown state.
#[derive(Clone)]
pub struct WorkerPool {
    runtime: Handle,
    slots: Arc<Semaphore>,
    size: usize,
    shutdown: CancellationToken,
}

impl WorkerPool {
    /// Create a pool on the current tokio runtime.
    pub fn new(size: usize) -> Result<Self> {
        let runtime = Handle::try_current()
            .map_err(|e| Error::Configuration(format!("worker pool needs a tokio runtime: {}", e)))?;
        Self::with_runtime(runtime, size)
    }

    pub fn with_runtime(runtime: Handle, size: usize) -> Result<Self> {
        if size == 0 {
            return Err(Error::Configuration(
                "worker pool size must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            runtime,
            slots: Arc::new(Semaphore::new(size)),
            size,
            shutdown: CancellationToken::new(),
        })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Interrupt running tasks and refuse queued ones.
    pub fn shutdown(&self) {
        tracing::debug!(size = self.size, "shutting down worker pool");
        self.slots.close();
        self.shutdown.cancel();
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.is_cancelled()
    }
}

impl Submitter for WorkerPool {
    fn submit(&self, index: usize, task: BlockTask) -> JoinHandle<Result<BlockStream>> {
        let slots = Arc::clone(&self.slots);
        let shutdown = self.shutdown.clone();

        self.runtime.spawn(async move {
            let _slot = tokio::select! {
                slot = slots.acquire_owned() => match slot {
                    Ok(slot) => slot,
                    Err(_) => return Err(Error::block_transport(index, "worker pool was shut down")),
                },
                _ = shutdown.cancelled() => {
                    return Err(Error::block_transport(index, "worker pool was shut down"));
                }
            };

            tokio::select! {
                result = task => result,
                _ = shutdown.cancelled() => Err(Error::block_transport(
                    index,
                    "block fetch interrupted by worker pool shutdown",
                )),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::{FutureExt, StreamExt};
    use std::time::Duration;

    fn ready_task() -> BlockTask {
        let stream: BlockStream = futures::stream::empty().boxed();
        async move { Ok(stream) }.boxed()
    }

    #[tokio::test]
    async fn test_zero_size_rejected() {
        assert!(matches!(WorkerPool::new(0), Err(Error::Configuration(_))));
    }

    #[test]
    fn test_new_outside_runtime_rejected() {
        assert!(matches!(WorkerPool::new(2), Err(Error::Configuration(_))));
    }

    #[tokio::test]
    async fn test_submitted_task_runs() {
        let pool = WorkerPool::new(1).unwrap();
        let result = pool.submit(0, ready_task()).await.unwrap();
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_shutdown_interrupts_running_task() {
        let pool = WorkerPool::new(1).unwrap();
        let handle = pool.submit(
            4,
            async {
                tokio::time::sleep(Duration::from_secs(30)).await;
                let stream: BlockStream = futures::stream::empty().boxed();
                Ok(stream)
            }
            .boxed(),
        );

        tokio::time::sleep(Duration::from_millis(20)).await;
        pool.shutdown();

        let err = match handle.await.unwrap() {
            Ok(_) => panic!("expected interrupted task"),
            Err(e) => e,
        };
        assert_eq!(err.block_index(), Some(4));
        assert!(pool.is_shutdown());
    }

    #[tokio::test]
    async fn test_shutdown_refuses_queued_task() {
        let pool = WorkerPool::new(1).unwrap();
        pool.shutdown();
        let err = match pool.submit(1, ready_task()).await.unwrap() {
            Ok(_) => panic!("expected refused task"),
            Err(e) => e,
        };
        assert_eq!(err.block_index(), Some(1));
    }
}
