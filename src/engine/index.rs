//! Search index client
//!
//! Thin blocking HTTP client for the index's bulk endpoint. Documents are
//! submitted as newline-delimited JSON; a response that reports per-item
//! errors surfaces the first failing document.

use crate::engine::Document;
use crate::error::{IndexError, IndexResult};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, trace};

/// Request timeout for bulk submissions
const BULK_TIMEOUT: Duration = Duration::from_secs(60);

/// Client for one search index
pub struct SearchClient {
    http: reqwest::blocking::Client,
    base_url: String,
    index: String,
}

impl SearchClient {
    /// Create a client for `index` hosted at `base_url`
    pub fn new(base_url: &str, index: &str) -> IndexResult<Self> {
        let http = reqwest::blocking::Client::builder()
            .timeout(BULK_TIMEOUT)
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            index: index.to_string(),
        })
    }

    /// Index name this client writes to
    pub fn index(&self) -> &str {
        &self.index
    }

    /// Submit documents as one bulk request, returning the accepted count
    pub fn bulk(&self, documents: &[Document]) -> IndexResult<usize> {
        if documents.is_empty() {
            return Ok(0);
        }

        let url = format!("{}/{}/_bulk", self.base_url, self.index);
        trace!(url = %url, documents = documents.len(), "Submitting bulk request");

        let response = self
            .http
            .post(&url)
            .header(reqwest::header::CONTENT_TYPE, "application/x-ndjson")
            .body(bulk_body(documents))
            .send()?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(IndexError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let payload: Value = response.json()?;
        if payload
            .get("errors")
            .and_then(Value::as_bool)
            .unwrap_or(false)
        {
            return Err(first_item_failure(&payload));
        }

        debug!(index = %self.index, documents = documents.len(), "Bulk request accepted");
        Ok(documents.len())
    }
}

/// Render the NDJSON bulk payload: one action line, one source line per doc
fn bulk_body(documents: &[Document]) -> String {
    let mut body = String::new();
    for doc in documents {
        body.push_str(&json!({ "index": { "_id": doc.id } }).to_string());
        body.push('\n');
        body.push_str(&doc.body.to_string());
        body.push('\n');
    }
    body
}

/// Pull the first per-item error out of a bulk response
fn first_item_failure(payload: &Value) -> IndexError {
    if let Some(items) = payload.get("items").and_then(Value::as_array) {
        for item in items {
            let Some(op) = item.get("index") else { continue };
            if let Some(error) = op.get("error") {
                return IndexError::ItemFailed {
                    id: op
                        .get("_id")
                        .and_then(Value::as_str)
                        .unwrap_or("?")
                        .to_string(),
                    reason: error.to_string(),
                };
            }
        }
    }

    IndexError::ItemFailed {
        id: "?".into(),
        reason: "bulk response reported errors".into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(id: &str) -> Document {
        Document {
            id: id.to_string(),
            body: json!({ "title": "t" }),
        }
    }

    #[test]
    fn test_bulk_body_format() {
        let body = bulk_body(&[doc("1"), doc("2")]);
        let lines: Vec<&str> = body.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], r#"{"index":{"_id":"1"}}"#);
        assert_eq!(lines[1], r#"{"title":"t"}"#);
        assert_eq!(lines[2], r#"{"index":{"_id":"2"}}"#);
        // payload must end with a newline or the last action is dropped
        assert!(body.ends_with('\n'));
    }

    #[test]
    fn test_empty_bulk_is_a_noop() {
        let client = SearchClient::new("http://localhost:9200/", "book").unwrap();
        assert_eq!(client.bulk(&[]).unwrap(), 0);
    }

    #[test]
    fn test_base_url_trailing_slash_stripped() {
        let client = SearchClient::new("http://localhost:9200///", "book").unwrap();
        assert_eq!(client.base_url, "http://localhost:9200");
    }

    #[test]
    fn test_first_item_failure_extraction() {
        let payload = json!({
            "errors": true,
            "items": [
                { "index": { "_id": "1", "status": 201 } },
                { "index": { "_id": "2", "status": 400, "error": { "type": "mapper_parsing_exception" } } }
            ]
        });

        match first_item_failure(&payload) {
            IndexError::ItemFailed { id, reason } => {
                assert_eq!(id, "2");
                assert!(reason.contains("mapper_parsing_exception"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
