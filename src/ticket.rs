//! Ticket request and response handling.
//!
//! [`TicketClient::execute`] is the whole protocol: one GET for the ticket,
//! then one fetch per remote block, then ordered assembly.

use crate::{
    Error, Result,
    blocks::{BlockFetcher, Manifest, Submitter},
    request::RequestDescription,
    stream::AssembledStream,
    types::{ErrorBody, ErrorEnvelope, TicketEnvelope},
};
use serde_json::Value;
use std::sync::Arc;

/// htsget client. Holds no state between calls besides the shared transport.
#[derive(Clone)]
pub struct TicketClient {
    http: reqwest::Client,
    pool: Option<Arc<dyn Submitter>>,
}

impl TicketClient {
    /// Client with a default transport that does not follow redirects.
    pub fn new() -> Result<Self> {
        let http = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| Error::transport(format!("failed to create HTTP client: {}", e)))?;
        Ok(Self::with_client(http))
    }

    pub fn with_client(http: reqwest::Client) -> Self {
        Self { http, pool: None }
    }

    /// Fetch blocks concurrently on a caller-owned pool.
    pub fn with_pool(mut self, pool: Arc<dyn Submitter>) -> Self {
        self.pool = Some(pool);
        self
    }

    /// Request a ticket, resolve its blocks and return their concatenation.
    pub async fn execute(&self, request: &RequestDescription) -> Result<AssembledStream> {
        let url = request.to_url()?;
        tracing::debug!(%url, "requesting htsget ticket");

        let response = self
            .http
            .get(url.clone())
            .send()
            .await
            .map_err(|e| Error::transport(format!("GET {} failed: {}", url, e)))?;

        let status = response.status().as_u16();
        // decoded with the charset declared in Content-Type, UTF-8 otherwise
        let body = response
            .text()
            .await
            .map_err(|e| Error::transport(format!("failed to read ticket body: {}", e)))?;

        let manifest = match status {
            200 => parse_ticket(&body)?,
            400..=499 => {
                let err = parse_error_body(&body)?;
                return Err(Error::ClientRequest {
                    status,
                    error: err.error,
                    message: err.message,
                });
            }
            _ => {
                return Err(Error::Protocol(format!(
                    "unrecognized status code: {}",
                    status
                )));
            }
        };

        match &manifest.md5 {
            Some(md5) => tracing::info!("received md5 checksum: {}", md5),
            None => tracing::info!("no md5 checksum received"),
        }
        tracing::info!(
            blocks = manifest.blocks.len(),
            format = manifest.format.as_deref().unwrap_or("unspecified"),
            parallel = self.pool.is_some(),
            "resolving ticket blocks"
        );

        let fetcher = BlockFetcher::new(self.http.clone(), self.pool.clone());
        let streams = fetcher.resolve_all(manifest.blocks).await?;

        Ok(AssembledStream::concat(streams).with_md5(manifest.md5))
    }
}

/// Parse a 200 body: a JSON object wrapped under the `htsget` key, with
/// field names matched regardless of case.
pub fn parse_ticket(body: &str) -> Result<Manifest> {
    let value = parse_json(body)?;
    let envelope: TicketEnvelope = serde_json::from_value(value)
        .map_err(|e| Error::Protocol(format!("invalid htsget ticket: {}", e)))?;
    Manifest::from_body(envelope.htsget)
}

/// Parse a 4xx body, wrapped under the `htsget` key or bare.
pub fn parse_error_body(body: &str) -> Result<ErrorBody> {
    let value = parse_json(body)?;
    let wrapped = value.as_object().is_some_and(|o| o.contains_key("htsget"));

    let parsed = if wrapped {
        serde_json::from_value::<ErrorEnvelope>(value).map(|e| e.htsget)
    } else {
        serde_json::from_value::<ErrorBody>(value)
    };
    parsed.map_err(|e| Error::Protocol(format!("invalid htsget error body: {}", e)))
}

fn parse_json(body: &str) -> Result<Value> {
    serde_json::from_str(body)
        .map(lowercase_keys)
        .map_err(|e| Error::Protocol(format!("response body is not valid JSON: {}", e)))
}

fn lowercase_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (k.to_lowercase(), lowercase_keys(v)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(lowercase_keys).collect()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blocks::Block;

    #[test]
    fn test_parse_ticket_mixed_case() {
        let body = r#"{
            "HTSget": {
                "Format": "BAM",
                "URLS": [
                    {"url": "data:application/vnd.ga4gh.bam;base64,aGVhZGVy", "Class": "header"},
                    {"URL": "https://data.example.org/b1", "Headers": {"Authorization": "Bearer t"}}
                ],
                "MD5": "8a6049ef4b4ed7d3c2b1e6b2c7b7b7b7"
            }
        }"#;
        let manifest = parse_ticket(body).unwrap();
        assert_eq!(manifest.format.as_deref(), Some("BAM"));
        assert_eq!(manifest.md5.as_deref(), Some("8a6049ef4b4ed7d3c2b1e6b2c7b7b7b7"));
        assert_eq!(manifest.blocks.len(), 2);
        assert!(manifest.blocks[0].is_inline());
        match &manifest.blocks[1] {
            Block::Remote { headers, .. } => assert_eq!(headers["authorization"], "Bearer t"),
            other => panic!("expected remote block, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_ticket_blocks_key() {
        let body = r#"{"htsget": {"blocks": [{"data": "YWJj"}, {"data": "ZGVm"}]}}"#;
        let manifest = parse_ticket(body).unwrap();
        assert_eq!(manifest.blocks.len(), 2);
        assert!(manifest.md5.is_none());
    }

    #[test]
    fn test_parse_ticket_requires_root_key() {
        let body = r#"{"urls": [{"data": "YWJj"}]}"#;
        assert!(matches!(parse_ticket(body), Err(Error::Protocol(_))));
    }

    #[test]
    fn test_parse_ticket_rejects_non_json() {
        assert!(matches!(parse_ticket("<html>oops</html>"), Err(Error::Protocol(_))));
    }

    #[test]
    fn test_parse_error_body_bare_and_wrapped() {
        let bare = parse_error_body(r#"{"error": "NotFound", "message": "no such id"}"#).unwrap();
        assert_eq!(bare.error, "NotFound");
        assert_eq!(bare.message, "no such id");

        let wrapped = parse_error_body(
            r#"{"htsget": {"Error": "InvalidRange", "Message": "end before start"}}"#,
        )
        .unwrap();
        assert_eq!(wrapped.error, "InvalidRange");
        assert_eq!(wrapped.message, "end before start");
    }

    #[test]
    fn test_parse_error_body_missing_fields() {
        assert!(matches!(
            parse_error_body(r#"{"htsget": {}}"#),
            Err(Error::Protocol(_))
        ));
    }
}
