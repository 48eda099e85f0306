use super::{Block, BlockStream, Submitter};
use crate::{Error, Result};
use futures::FutureExt;
use std::sync::Arc;

/// Resolves manifest blocks into opened streams, in manifest order.
pub struct BlockFetcher {
    client: reqwest::Client,
    pool: Option<Arc<dyn Submitter>>,
}

impl BlockFetcher {
    /// Without a pool, blocks are opened serially on the calling task.
    pub fn new(client: reqwest::Client, pool: Option<Arc<dyn Submitter>>) -> Self {
        Self { client, pool }
    }

    pub fn is_parallel(&self) -> bool {
        self.pool.is_some()
    }

    pub async fn resolve_all(&self, blocks: Vec<Block>) -> Result<Vec<BlockStream>> {
        match &self.pool {
            Some(pool) => self.resolve_parallel(pool.as_ref(), blocks).await,
            None => self.resolve_serial(blocks).await,
        }
    }

    async fn resolve_serial(&self, blocks: Vec<Block>) -> Result<Vec<BlockStream>> {
        let mut streams = Vec::with_capacity(blocks.len());
        for (index, block) in blocks.iter().enumerate() {
            let stream = block.open(&self.client, index).await.inspect_err(|e| {
                tracing::warn!(block = index, error = %e, "failed to open block");
            })?;
            streams.push(stream);
        }
        Ok(streams)
    }

    /// Submit every block before awaiting any, then wait on each task in
    /// manifest order. The first failure in that order is returned; tasks for
    /// later blocks are left to finish on the pool and their results dropped.
    async fn resolve_parallel(
        &self,
        pool: &dyn Submitter,
        blocks: Vec<Block>,
    ) -> Result<Vec<BlockStream>> {
        let handles: Vec<_> = blocks
            .into_iter()
            .enumerate()
            .map(|(index, block)| {
                let client = self.client.clone();
                let task = async move { block.open(&client, index).await }.boxed();
                pool.submit(index, task)
            })
            .collect();

        let mut streams = Vec::with_capacity(handles.len());
        for (index, handle) in handles.into_iter().enumerate() {
            let result = match handle.await {
                Ok(result) => result,
                Err(e) => Err(Error::block_transport(
                    index,
                    format!("error while waiting to download block: {}", e),
                )),
            };
            match result {
                Ok(stream) => streams.push(stream),
                Err(e) => {
                    tracing::warn!(block = index, error = %e, "failed to open block");
                    return Err(e);
                }
            }
        }
        Ok(streams)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blocks::BlockTask;
    use bytes::Bytes;
    use futures::TryStreamExt;
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::task::JoinHandle;

    /// Finishes later blocks first and can fail one position.
    struct ReversingSubmitter {
        count: usize,
        fail_at: Option<usize>,
        submitted: Mutex<Vec<usize>>,
    }

    impl Submitter for ReversingSubmitter {
        fn submit(&self, index: usize, task: BlockTask) -> JoinHandle<Result<BlockStream>> {
            self.submitted.lock().unwrap().push(index);
            let delay = Duration::from_millis(10 * (self.count - index) as u64);
            let fail = self.fail_at == Some(index);
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                if fail {
                    return Err(Error::block_transport(index, "simulated failure"));
                }
                task.await
            })
        }
    }

    fn inline_blocks() -> Vec<Block> {
        ["alpha", "beta", "gamma", "delta"]
            .iter()
            .map(|s| Block::Inline(Bytes::from_static(s.as_bytes())))
            .collect()
    }

    async fn drain(streams: Vec<BlockStream>) -> Vec<String> {
        let mut out = Vec::new();
        for stream in streams {
            let chunks: Vec<Bytes> = stream.try_collect().await.unwrap();
            out.push(String::from_utf8(chunks.concat()).unwrap());
        }
        out
    }

    #[tokio::test]
    async fn test_serial_keeps_order() {
        let fetcher = BlockFetcher::new(reqwest::Client::new(), None);
        assert!(!fetcher.is_parallel());
        let streams = fetcher.resolve_all(inline_blocks()).await.unwrap();
        assert_eq!(drain(streams).await, ["alpha", "beta", "gamma", "delta"]);
    }

    #[tokio::test]
    async fn test_parallel_keeps_manifest_order() {
        let submitter = Arc::new(ReversingSubmitter {
            count: 4,
            fail_at: None,
            submitted: Mutex::new(Vec::new()),
        });
        let fetcher = BlockFetcher::new(reqwest::Client::new(), Some(submitter.clone()));
        let streams = fetcher.resolve_all(inline_blocks()).await.unwrap();

        assert_eq!(drain(streams).await, ["alpha", "beta", "gamma", "delta"]);
        assert_eq!(*submitter.submitted.lock().unwrap(), [0, 1, 2, 3]);
    }

    #[tokio::test]
    async fn test_parallel_fails_at_first_manifest_failure() {
        let submitter = Arc::new(ReversingSubmitter {
            count: 4,
            fail_at: Some(1),
            submitted: Mutex::new(Vec::new()),
        });
        let fetcher = BlockFetcher::new(reqwest::Client::new(), Some(submitter.clone()));
        let err = match fetcher.resolve_all(inline_blocks()).await {
            Ok(_) => panic!("expected failure"),
            Err(e) => e,
        };

        assert_eq!(err.block_index(), Some(1));
        // every block was submitted before any result was awaited
        assert_eq!(submitter.submitted.lock().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_empty_manifest_resolves_to_nothing() {
        let fetcher = BlockFetcher::new(reqwest::Client::new(), None);
        assert!(fetcher.resolve_all(Vec::new()).await.unwrap().is_empty());
    }
}
