//! Manifest blocks and their resolution into byte streams.
//!
//! A ticket names its payload as an ordered list of blocks. Each block is
//! either carried inline in the ticket or fetched from a secondary URL; both
//! kinds expose the same capability, [`Block::open`], which yields a stream
//! of bytes.
//!
//! # Fetch modes
//!
//! - [`BlockFetcher`] without a pool opens blocks one at a time, in order
//! - [`BlockFetcher`] with a [`Submitter`] (such as [`WorkerPool`]) submits
//!   every block up front and collects results in manifest order

mod fetch;
mod pool;

pub use fetch::BlockFetcher;
pub use pool::{BlockTask, Submitter, WorkerPool};

use crate::{Error, Result, types::{BlockEntry, TicketBody}};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use bytes::Bytes;
use futures::{StreamExt, TryStreamExt, stream::{self, BoxStream}};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use url::Url;

/// Byte stream produced by opening a block
pub type BlockStream = BoxStream<'static, Result<Bytes>>;

/// One unit of the payload
#[derive(Debug, Clone)]
pub enum Block {
    /// Bytes carried in the ticket itself
    Inline(Bytes),
    /// Bytes served at a secondary URL, with headers required to fetch them
    Remote { url: Url, headers: HeaderMap },
}

impl Block {
    /// Open a byte stream over this block's content.
    ///
    /// Inline blocks need no I/O and can be opened repeatedly. Remote blocks
    /// issue one GET; failures are tagged with `index`, the block's position
    /// in the manifest.
    pub async fn open(&self, client: &reqwest::Client, index: usize) -> Result<BlockStream> {
        match self {
            Block::Inline(data) => {
                let data = data.clone();
                Ok(stream::iter((!data.is_empty()).then_some(Ok(data))).boxed())
            }
            Block::Remote { url, headers } => {
                tracing::debug!(block = index, %url, "fetching block");

                let response = client
                    .get(url.clone())
                    .headers(headers.clone())
                    .send()
                    .await
                    .map_err(|e| {
                        Error::block_transport(index, format!("GET {} failed: {}", url, e))
                    })?;

                let status = response.status();
                if !status.is_success() {
                    return Err(Error::block_transport(
                        index,
                        format!("GET {} returned status {}", url, status.as_u16()),
                    ));
                }

                Ok(response
                    .bytes_stream()
                    .map_err(move |e| {
                        Error::block_transport(index, format!("failed to read block body: {}", e))
                    })
                    .boxed())
            }
        }
    }

    pub fn is_inline(&self) -> bool {
        matches!(self, Block::Inline(_))
    }

    fn from_entry(index: usize, entry: BlockEntry) -> Result<Self> {
        if let Some(data) = entry.data {
            return decode_base64(index, &data).map(Block::Inline);
        }

        let url = entry.url.ok_or_else(|| {
            Error::Protocol(format!("block {} has neither url nor data", index))
        })?;

        if let Some(rest) = url.strip_prefix("data:") {
            return decode_data_uri(index, rest).map(Block::Inline);
        }

        let url = Url::parse(&url)
            .map_err(|e| Error::Protocol(format!("block {} has invalid url {}: {}", index, url, e)))?;

        let mut headers = HeaderMap::new();
        for (name, value) in entry.headers.unwrap_or_default() {
            let name = HeaderName::from_bytes(name.as_bytes()).map_err(|_| {
                Error::Protocol(format!("block {} has invalid header name {}", index, name))
            })?;
            let value = HeaderValue::from_str(&value).map_err(|_| {
                Error::Protocol(format!("block {} has invalid value for header {}", index, name))
            })?;
            headers.insert(name, value);
        }

        Ok(Block::Remote { url, headers })
    }
}

fn decode_base64(index: usize, data: &str) -> Result<Bytes> {
    STANDARD
        .decode(data.trim())
        .map(Bytes::from)
        .map_err(|e| Error::Protocol(format!("block {} has invalid base64 data: {}", index, e)))
}

/// Decode the part of a `data:` URI after the scheme.
fn decode_data_uri(index: usize, rest: &str) -> Result<Bytes> {
    let (meta, payload) = rest
        .split_once(',')
        .ok_or_else(|| Error::Protocol(format!("block {} has malformed data uri", index)))?;
    if !meta.split(';').any(|p| p.eq_ignore_ascii_case("base64")) {
        return Err(Error::Protocol(format!(
            "block {} data uri is not base64 encoded",
            index
        )));
    }
    decode_base64(index, payload)
}

/// Parsed ticket: ordered blocks plus the advisory checksum
#[derive(Debug)]
pub struct Manifest {
    pub format: Option<String>,
    pub blocks: Vec<Block>,
    pub md5: Option<String>,
}

impl Manifest {
    pub fn from_body(body: TicketBody) -> Result<Self> {
        let blocks = body
            .urls
            .into_iter()
            .enumerate()
            .map(|(index, entry)| {
                if let Some(class) = &entry.class {
                    tracing::debug!(block = index, class = %class, "manifest block");
                }
                Block::from_entry(index, entry)
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            format: body.format,
            blocks,
            md5: body.md5,
        })
    }
}
