//! OpenSearch client implementation.
//!
//! This module provides the concrete implementation of `BulkIndexProvider`
//! using the OpenSearch Rust client. The bulk and index APIs it uses are
//! wire compatible with Elasticsearch.

use async_trait::async_trait;
use opensearch::{
    auth::Credentials,
    cluster::ClusterHealthParts,
    http::request::JsonBody,
    http::transport::{SingleNodeConnectionPool, TransportBuilder},
    indices::{IndicesCreateParts, IndicesExistsParts},
    BulkParts, OpenSearch,
};
use serde_json::{json, Value};
use tracing::{debug, error, info, instrument, warn};

use crate::config::IndexConnection;
use crate::errors::SearchIndexError;
use crate::interfaces::BulkIndexProvider;
use crate::opensearch::index_config::get_index_settings;
use crate::types::{BulkIndexSummary, BulkItemFailure, IndexStatus};
use dicom2elk_shared::Document;

/// OpenSearch client implementation.
///
/// # Example
///
/// ```ignore
/// let connection = IndexConnection::from_file("config.json")?;
/// let client = OpenSearchClient::new(&connection)?;
///
/// client.ensure_index().await?;
/// let summary = client.bulk_index(&documents).await?;
/// ```
pub struct OpenSearchClient {
    client: OpenSearch,
    index_name: String,
}

impl OpenSearchClient {
    /// Create a new OpenSearch client from a connection configuration.
    ///
    /// Authentication uses HTTP basic auth with the configured user and
    /// password. No request is sent until the first operation.
    ///
    /// # Returns
    ///
    /// * `Ok(OpenSearchClient)` - A new client instance
    /// * `Err(SearchIndexError)` - If the endpoint is invalid or transport setup fails
    pub fn new(connection: &IndexConnection) -> Result<Self, SearchIndexError> {
        let endpoint = connection.endpoint()?;

        let conn_pool = SingleNodeConnectionPool::new(endpoint.clone());
        let transport = TransportBuilder::new(conn_pool)
            .auth(Credentials::Basic(
                connection.user.clone(),
                connection.pwd.clone(),
            ))
            .disable_proxy()
            .build()
            .map_err(|e| SearchIndexError::connection(e.to_string()))?;

        let client = OpenSearch::new(transport);

        info!(
            url = %endpoint,
            index = %connection.index,
            "Created OpenSearch client"
        );

        Ok(Self {
            client,
            index_name: connection.index.clone(),
        })
    }

    /// Build the NDJSON body of a bulk request.
    ///
    /// Each document gets an `index` action whose `_id` is its position in
    /// the batch.
    fn bulk_body(index_name: &str, documents: &[Document]) -> Vec<JsonBody<Value>> {
        Self::bulk_lines(index_name, documents)
            .into_iter()
            .map(JsonBody::from)
            .collect()
    }

    /// Action and source lines of a bulk request, in order.
    fn bulk_lines(index_name: &str, documents: &[Document]) -> Vec<Value> {
        let mut lines = Vec::with_capacity(documents.len() * 2);
        for (i, doc) in documents.iter().enumerate() {
            lines.push(json!({"index": {"_index": index_name, "_id": i.to_string()}}));
            lines.push(doc.clone().into_value());
        }
        lines
    }

    /// Turn a bulk response body into a summary of per-document results.
    fn parse_bulk_response(total: usize, response_body: &Value) -> BulkIndexSummary {
        let has_errors = response_body
            .get("errors")
            .and_then(|e| e.as_bool())
            .unwrap_or(false);
        if !has_errors {
            return BulkIndexSummary::all_succeeded(total);
        }

        let empty_vec = Vec::<Value>::new();
        let items = response_body
            .get("items")
            .and_then(|i| i.as_array())
            .unwrap_or(&empty_vec);

        let failures: Vec<BulkItemFailure> = items
            .iter()
            .filter_map(|item| item.get("index"))
            .filter(|action| action.get("error").is_some())
            .map(|action| BulkItemFailure {
                id: action
                    .get("_id")
                    .and_then(|id| id.as_str())
                    .unwrap_or_default()
                    .to_string(),
                status: action
                    .get("status")
                    .and_then(|s| s.as_u64())
                    .and_then(|s| u16::try_from(s).ok())
                    .unwrap_or(0),
                reason: action
                    .get("error")
                    .and_then(|e| e.get("reason"))
                    .and_then(|r| r.as_str())
                    .unwrap_or("unknown")
                    .to_string(),
            })
            .collect();

        let failed = failures.len().min(total);
        BulkIndexSummary {
            total,
            succeeded: total - failed,
            failed,
            failures,
        }
    }
}

#[async_trait]
impl BulkIndexProvider for OpenSearchClient {
    fn index_name(&self) -> &str {
        &self.index_name
    }

    /// Create the index if it does not exist yet.
    ///
    /// An existing index is reused without checking its settings.
    #[instrument(skip(self), fields(index = %self.index_name))]
    async fn ensure_index(&self) -> Result<IndexStatus, SearchIndexError> {
        let exists = self
            .client
            .indices()
            .exists(IndicesExistsParts::Index(&[&self.index_name]))
            .send()
            .await
            .map_err(|e| SearchIndexError::connection(e.to_string()))?;

        match exists.status_code().as_u16() {
            200 => return Ok(IndexStatus::AlreadyExists),
            404 => {}
            other => {
                return Err(SearchIndexError::index_creation(format!(
                    "Index existence check returned status {}",
                    other
                )))
            }
        }

        let response = self
            .client
            .indices()
            .create(IndicesCreateParts::Index(&self.index_name))
            .body(get_index_settings())
            .send()
            .await
            .map_err(|e| SearchIndexError::index_creation(e.to_string()))?;

        let status = response.status_code();
        if status.is_success() {
            info!("Created index");
            return Ok(IndexStatus::Created);
        }

        let error_body = response.text().await.unwrap_or_default();
        // Another writer created the index between the two calls.
        if status.as_u16() == 400 && error_body.contains("resource_already_exists_exception") {
            return Ok(IndexStatus::AlreadyExists);
        }

        error!(status = %status, body = %error_body, "Index creation failed");
        Err(SearchIndexError::index_creation(format!(
            "Index creation failed with status {}: {}",
            status, error_body
        )))
    }

    /// Submit `documents` as one bulk request.
    ///
    /// # Returns
    ///
    /// * `Ok(BulkIndexSummary)` - The request was accepted; per-document
    ///   rejections are listed in the summary
    /// * `Err(SearchIndexError)` - The request failed as a whole
    #[instrument(skip(self, documents), fields(index = %self.index_name, count = documents.len()))]
    async fn bulk_index(
        &self,
        documents: &[Document],
    ) -> Result<BulkIndexSummary, SearchIndexError> {
        if documents.is_empty() {
            return Ok(BulkIndexSummary::default());
        }

        let body = Self::bulk_body(&self.index_name, documents);

        let response = self
            .client
            .bulk(BulkParts::Index(&self.index_name))
            .body(body)
            .send()
            .await
            .map_err(|e| SearchIndexError::bulk_operation(e.to_string()))?;

        let status = response.status_code();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            error!(status = %status, body = %error_body, "Bulk request failed");
            return Err(SearchIndexError::bulk_operation(format!(
                "Bulk request failed with status {}: {}",
                status, error_body
            )));
        }

        let response_body: Value = response
            .json()
            .await
            .map_err(|e| SearchIndexError::parse(e.to_string()))?;

        let summary = Self::parse_bulk_response(documents.len(), &response_body);
        if summary.has_failures() {
            warn!(
                failed = summary.failed,
                succeeded = summary.succeeded,
                "Bulk request had rejected documents"
            );
        } else {
            debug!(succeeded = summary.succeeded, "Bulk request completed");
        }

        Ok(summary)
    }

    async fn health_check(&self) -> Result<bool, SearchIndexError> {
        let response = self
            .client
            .cluster()
            .health(ClusterHealthParts::None)
            .send()
            .await
            .map_err(|e| SearchIndexError::connection(e.to_string()))?;

        let health: Value = response
            .json()
            .await
            .map_err(|e| SearchIndexError::parse(e.to_string()))?;
        let status = health
            .get("status")
            .and_then(|s| s.as_str())
            .unwrap_or("unknown");

        debug!(status = %status, "Cluster health");
        Ok(status == "green" || status == "yellow")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Map;
    use std::path::Path;

    fn document(uid: &str) -> Document {
        let mut fields = Map::new();
        fields.insert("00080018".into(), json!({"vr": "UI", "Value": [uid]}));
        Document::new(fields, Path::new(&format!("/data/{}.dcm", uid)))
    }

    #[test]
    fn test_bulk_body_uses_positional_ids() {
        let docs = vec![document("1.2.3"), document("1.2.4")];
        let lines = OpenSearchClient::bulk_lines("pacs", &docs);

        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], json!({"index": {"_index": "pacs", "_id": "0"}}));
        assert_eq!(lines[1], docs[0].clone().into_value());
        assert_eq!(lines[2], json!({"index": {"_index": "pacs", "_id": "1"}}));
        assert_eq!(lines[3]["00080018"]["Value"][0], "1.2.4");
        assert_eq!(OpenSearchClient::bulk_body("pacs", &docs).len(), 4);
    }

    #[test]
    fn test_parse_bulk_response_all_ok() {
        let response = json!({"took": 3, "errors": false, "items": []});
        let summary = OpenSearchClient::parse_bulk_response(5, &response);

        assert_eq!(summary, BulkIndexSummary::all_succeeded(5));
    }

    #[test]
    fn test_parse_bulk_response_with_rejections() {
        let response = json!({
            "errors": true,
            "items": [
                {"index": {"_id": "0", "status": 201}},
                {"index": {"_id": "1", "status": 400, "error": {
                    "type": "mapper_parsing_exception",
                    "reason": "failed to parse field"
                }}},
                {"index": {"_id": "2", "status": 201}}
            ]
        });
        let summary = OpenSearchClient::parse_bulk_response(3, &response);

        assert_eq!(summary.total, 3);
        assert_eq!(summary.succeeded, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.failures[0].id, "1");
        assert_eq!(summary.failures[0].status, 400);
        assert_eq!(summary.failures[0].reason, "failed to parse field");
    }

    #[test]
    fn test_new_rejects_bad_url() {
        let conn = IndexConnection::from_json(
            r#"{"url": "http://", "port": 9200, "user": "u", "pwd": "p", "index": "i"}"#,
        )
        .unwrap();

        assert!(OpenSearchClient::new(&conn).is_err());
    }
}
