use crate::{Result, blocks::BlockStream};
use bytes::{Bytes, BytesMut};
use futures::{Stream, StreamExt, stream};
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::io::{AsyncWrite, AsyncWriteExt};

/// Single sequential byte stream over every block of a ticket.
///
/// Each block is read to exhaustion before the next one starts, so the bytes
/// are the literal concatenation of the blocks in manifest order. The stream
/// can be consumed once.
pub struct AssembledStream {
    inner: BlockStream,
    md5: Option<String>,
}

impl AssembledStream {
    pub fn concat(streams: Vec<BlockStream>) -> Self {
        Self {
            inner: stream::iter(streams).flatten().boxed(),
            md5: None,
        }
    }

    pub(crate) fn with_md5(mut self, md5: Option<String>) -> Self {
        self.md5 = md5;
        self
    }

    /// Checksum reported by the server. Advisory only; never checked here.
    pub fn md5(&self) -> Option<&str> {
        self.md5.as_deref()
    }

    /// Drain the stream into `writer`, returning the number of bytes written.
    pub async fn copy_to<W>(mut self, writer: &mut W) -> Result<u64>
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        let mut written = 0u64;
        while let Some(chunk) = self.inner.next().await {
            let chunk = chunk?;
            writer.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        writer.flush().await?;
        Ok(written)
    }

    /// Drain the stream into memory.
    pub async fn into_bytes(mut self) -> Result<Bytes> {
        let mut buf = BytesMut::new();
        while let Some(chunk) = self.inner.next().await {
            buf.extend_from_slice(&chunk?);
        }
        Ok(buf.freeze())
    }
}

impl Stream for AssembledStream {
    type Item = Result<Bytes>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().inner.poll_next_unpin(cx)
    }
}

impl std::fmt::Debug for AssembledStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssembledStream")
            .field("md5", &self.md5)
            .finish_non_exhaustive()
    }
}
