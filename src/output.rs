//! Writing an assembled stream to a local file.
//!
//! The library never validates the server's checksum; [`verify_md5`] is the
//! opt-in, caller-side check run after the file is written.

use crate::{Error, Result, RequestDescription, TicketClient};
use md5::{Digest, Md5};
use std::path::Path;
use tokio::io::AsyncReadExt;

/// Bytes written and the md5 the server reported, if any
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Download {
    pub written: u64,
    pub md5: Option<String>,
}

/// Execute `request` and copy the assembled stream into a new file at `path`.
pub async fn download_to_path(
    client: &TicketClient,
    request: &RequestDescription,
    path: &Path,
) -> Result<Download> {
    let stream = client.execute(request).await?;
    let md5 = stream.md5().map(str::to_string);

    let mut file = tokio::fs::File::create(path).await?;
    let written = stream.copy_to(&mut file).await?;
    tracing::info!("Wrote {} bytes to {:?}", written, path);

    Ok(Download { written, md5 })
}

/// Hex md5 digest of the file at `path`.
pub async fn file_md5(path: &Path) -> Result<String> {
    let mut file = tokio::fs::File::open(path).await?;
    let mut hasher = Md5::new();
    let mut buf = vec![0u8; 64 * 1024];
    loop {
        let n = file.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

/// Compare the file at `path` with the server's checksum.
///
/// Returns `Ok(false)` without reading the file when the server sent none.
pub async fn verify_md5(path: &Path, expected: Option<&str>) -> Result<bool> {
    let Some(expected) = expected else {
        tracing::warn!("md5 check requested but the server did not report a checksum");
        return Ok(false);
    };

    let actual = file_md5(path).await?;
    if !actual.eq_ignore_ascii_case(expected) {
        return Err(Error::ChecksumMismatch {
            expected: expected.to_string(),
            actual,
        });
    }
    tracing::info!("md5 checksum verified: {}", actual);
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    // md5("hello world")
    const HELLO_MD5: &str = "5eb63bbbe01eeed093cb22bb8f5acdc3";

    fn hello_file() -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"hello world").unwrap();
        file.flush().unwrap();
        file
    }

    #[tokio::test]
    async fn test_file_md5() {
        let file = hello_file();
        assert_eq!(file_md5(file.path()).await.unwrap(), HELLO_MD5);
    }

    #[tokio::test]
    async fn test_verify_md5_match_ignores_case() {
        let file = hello_file();
        assert!(verify_md5(file.path(), Some(HELLO_MD5)).await.unwrap());
        assert!(
            verify_md5(file.path(), Some(&HELLO_MD5.to_uppercase()))
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn test_verify_md5_mismatch() {
        let file = hello_file();
        let err = verify_md5(file.path(), Some("00000000000000000000000000000000"))
            .await
            .unwrap_err();
        match err {
            Error::ChecksumMismatch { expected, actual } => {
                assert_eq!(expected, "00000000000000000000000000000000");
                assert_eq!(actual, HELLO_MD5);
            }
            other => panic!("expected checksum mismatch, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_verify_md5_without_server_checksum() {
        let dir = tempfile::tempdir().unwrap();
        // never opened, so a missing file is fine
        let path = dir.path().join("absent.bam");
        assert!(!verify_md5(&path, None).await.unwrap());
    }
}
