pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Malformed request description, detected before any network call.
    #[error("invalid request: {0}")]
    Configuration(String),

    /// Connection or I/O failure. `block` is the manifest position of the
    /// block being fetched, if any.
    #[error("{}", transport_message(.block, .message))]
    Transport {
        block: Option<usize>,
        message: String,
    },

    /// Unexpected status code or undecodable body.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Well-formed 4xx error body returned by the server.
    #[error("invalid request, received error code: {status}, error type: {error}, message: {message}")]
    ClientRequest {
        status: u16,
        error: String,
        message: String,
    },

    /// Caller-side checksum of a written file differs from the server's md5.
    #[error("md5 mismatch: server reported {expected}, downloaded file has {actual}")]
    ChecksumMismatch { expected: String, actual: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

fn transport_message(block: &Option<usize>, message: &str) -> String {
    match block {
        Some(index) => format!("transport error in block {}: {}", index, message),
        None => format!("transport error: {}", message),
    }
}

impl Error {
    pub(crate) fn transport(message: impl Into<String>) -> Self {
        Error::Transport {
            block: None,
            message: message.into(),
        }
    }

    pub(crate) fn block_transport(index: usize, message: impl Into<String>) -> Self {
        Error::Transport {
            block: Some(index),
            message: message.into(),
        }
    }

    /// HTTP status code reported by the server, for client request errors.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::ClientRequest { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Manifest position of the block whose fetch failed.
    pub fn block_index(&self) -> Option<usize> {
        match self {
            Error::Transport { block, .. } => *block,
            _ => None,
        }
    }

    /// htsget error type token (e.g. `NotFound`), for client request errors.
    pub fn error_type(&self) -> Option<&str> {
        match self {
            Error::ClientRequest { error, .. } => Some(error),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_request_display_keeps_server_text() {
        let err = Error::ClientRequest {
            status: 404,
            error: "NotFound".to_string(),
            message: "no such id".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "invalid request, received error code: 404, error type: NotFound, message: no such id"
        );
        assert_eq!(err.status(), Some(404));
        assert_eq!(err.error_type(), Some("NotFound"));
    }

    #[test]
    fn test_transport_display_names_block() {
        let err = Error::block_transport(3, "connection reset");
        assert_eq!(err.to_string(), "transport error in block 3: connection reset");
        assert_eq!(err.block_index(), Some(3));

        let err = Error::transport("connection refused");
        assert_eq!(err.to_string(), "transport error: connection refused");
        assert_eq!(err.block_index(), None);
    }
}
