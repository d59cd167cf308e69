//! Elasticsearch REST calls shared by the flat index and the document store

use crate::adapters::http::{check_status, connection_error, read_json, HttpClient};
use crate::domain::{EtlError, ProjectId, Result, StoreError, StoreKind};
use reqwest::Method;
use serde::Deserialize;
use serde_json::{json, Value};

/// Largest page a single search returns
pub const MAX_RESULT_WINDOW: usize = 10_000;

const SCROLL_KEEP_ALIVE: &str = "1m";

const BULK_CHUNK_SIZE: usize = 500;

#[derive(Debug, Deserialize)]
struct DeleteByQueryResponse {
    #[serde(default)]
    deleted: u64,
}

#[derive(Debug, Deserialize)]
struct CountResponse {
    count: u64,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(rename = "_scroll_id", default)]
    scroll_id: Option<String>,
    hits: SearchHits,
}

#[derive(Debug, Deserialize)]
struct SearchHits {
    hits: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    #[serde(rename = "_id")]
    id: String,
    #[serde(rename = "_source", default)]
    source: Value,
}

/// Term query selecting the documents of one project
pub fn project_query(project_id: &ProjectId) -> Value {
    json!({ "term": { "project_id": project_id.to_string() } })
}

/// Document `_id` of a record: record ids are only unique within a project, and
/// every project shares the same physical indices
pub fn document_id(project_id: &ProjectId, id: &str) -> String {
    format!("{project_id}/{id}")
}

/// Query selecting the given record ids of one project
pub fn project_ids_query(project_id: &ProjectId, ids: &[String]) -> Value {
    let ids: Vec<String> = ids.iter().map(|id| document_id(project_id, id)).collect();
    json!({
        "bool": {
            "filter": [
                project_query(project_id),
                { "ids": { "values": ids } }
            ]
        }
    })
}

/// Thin Elasticsearch client; every call is tagged with the store it serves
pub struct ElasticClient {
    http: HttpClient,
    store: StoreKind,
    page_size: usize,
}

impl ElasticClient {
    /// Creates a client reporting errors as `store`
    pub fn new(http: HttpClient, store: StoreKind) -> Self {
        Self {
            http,
            store,
            page_size: MAX_RESULT_WINDOW,
        }
    }

    /// Reads searches in pages of `page_size` documents
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.clamp(1, MAX_RESULT_WINDOW);
        self
    }

    async fn send(&self, method: Method, path: &str, body: Option<&Value>) -> Result<reqwest::Response> {
        self.http
            .retry_request(|| async {
                let mut request = self.http.request(method.clone(), path);
                if let Some(body) = body {
                    request = request.json(body);
                }
                let response = request
                    .send()
                    .await
                    .map_err(|e| connection_error(self.store, e))?;
                check_status(self.store, response).await
            })
            .await
    }

    /// Creates `index` with a keyword `project_id`, if it does not exist yet
    ///
    /// # Errors
    ///
    /// Returns a store error for any failure other than the index already existing.
    pub async fn ensure_index(&self, index: &str) -> Result<()> {
        let mappings = json!({
            "mappings": { "properties": { "project_id": { "type": "keyword" } } }
        });
        match self.send(Method::PUT, index, Some(&mappings)).await {
            Ok(_) => Ok(()),
            Err(EtlError::Store(StoreError::UnexpectedStatus {
                status: 400,
                message,
                ..
            })) if message.contains("resource_already_exists_exception") => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Indexes `(id, document)` pairs with `_bulk`
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::WriteFailed`] with the first item error if any item is
    /// rejected.
    pub async fn bulk_index(&self, index: &str, documents: &[(String, Value)]) -> Result<usize> {
        for chunk in documents.chunks(BULK_CHUNK_SIZE) {
            let mut body = String::new();
            for (id, document) in chunk {
                body.push_str(&json!({ "index": { "_index": index, "_id": id } }).to_string());
                body.push('\n');
                body.push_str(&serde_json::to_string(document)?);
                body.push('\n');
            }

            let outcome: Value = self
                .http
                .retry_request(|| async {
                    let response = self
                        .http
                        .request(Method::POST, "/_bulk")
                        .header("Content-Type", "application/x-ndjson")
                        .body(body.clone())
                        .send()
                        .await
                        .map_err(|e| connection_error(self.store, e))?;
                    let response = check_status(self.store, response).await?;
                    read_json(self.store, response).await
                })
                .await?;

            if outcome["errors"].as_bool().unwrap_or(false) {
                let reason = outcome["items"]
                    .as_array()
                    .and_then(|items| {
                        items
                            .iter()
                            .find_map(|item| item["index"]["error"]["reason"].as_str())
                    })
                    .unwrap_or("bulk request reported errors");
                return Err(StoreError::write(self.store, format!("{index}: {reason}")).into());
            }
        }
        Ok(documents.len())
    }

    /// Deletes matching documents; a missing index counts as nothing deleted
    ///
    /// # Errors
    ///
    /// Returns a store error if the request fails.
    pub async fn delete_by_query(&self, index: &str, query: Value) -> Result<u64> {
        let path = format!("{index}/_delete_by_query?refresh=true&conflicts=proceed");
        let body = json!({ "query": query });
        match self.send(Method::POST, &path, Some(&body)).await {
            Ok(response) => {
                let outcome: DeleteByQueryResponse = read_json(self.store, response).await?;
                Ok(outcome.deleted)
            }
            Err(EtlError::Store(StoreError::UnexpectedStatus { status: 404, .. })) => Ok(0),
            Err(e) => Err(e),
        }
    }

    /// Ids and sources of every document of `project_id` in `index`
    ///
    /// Pages through the whole result set with the scroll API, so projects larger
    /// than one result window are read completely. Ids come back without the
    /// project prefix. A missing index yields nothing.
    ///
    /// # Errors
    ///
    /// Returns a store error if any page fails.
    pub async fn search(
        &self,
        index: &str,
        project_id: &ProjectId,
        with_source: bool,
    ) -> Result<Vec<(String, Value)>> {
        let path = format!("{index}/_search?scroll={SCROLL_KEEP_ALIVE}");
        let body = json!({
            "query": project_query(project_id),
            "size": self.page_size,
            "sort": ["_doc"],
            "_source": with_source,
        });
        let mut page: SearchResponse = match self.send(Method::POST, &path, Some(&body)).await {
            Ok(response) => read_json(self.store, response).await?,
            Err(EtlError::Store(StoreError::UnexpectedStatus { status: 404, .. })) => {
                return Ok(Vec::new())
            }
            Err(e) => return Err(e),
        };

        let prefix = format!("{project_id}/");
        let mut found = Vec::new();
        loop {
            let SearchResponse { scroll_id, hits } = page;
            let last = hits.hits.len() < self.page_size;
            found.extend(hits.hits.into_iter().map(|hit| {
                let id = hit.id.strip_prefix(&prefix).map(str::to_string).unwrap_or(hit.id);
                (id, hit.source)
            }));

            let scroll_id = match (last, scroll_id) {
                (true, scroll_id) => {
                    if let Some(scroll_id) = scroll_id {
                        self.clear_scroll(&scroll_id).await;
                    }
                    break;
                }
                (false, Some(scroll_id)) => scroll_id,
                (false, None) => {
                    return Err(StoreError::read(
                        self.store,
                        format!("{index}: full page returned without a scroll id"),
                    )
                    .into())
                }
            };

            let body = json!({ "scroll": SCROLL_KEEP_ALIVE, "scroll_id": scroll_id });
            let response = self.send(Method::POST, "/_search/scroll", Some(&body)).await?;
            page = read_json(self.store, response).await?;
        }

        tracing::debug!(index = %index, project_id = %project_id, documents = found.len(), "Read project documents");
        Ok(found)
    }

    async fn clear_scroll(&self, scroll_id: &str) {
        let body = json!({ "scroll_id": scroll_id });
        if let Err(e) = self.send(Method::DELETE, "/_search/scroll", Some(&body)).await {
            tracing::debug!(error = %e, "Failed to clear scroll context");
        }
    }

    /// Ids of every document of `project_id` in `index`
    ///
    /// # Errors
    ///
    /// Returns a store error if the request fails.
    pub async fn search_ids(&self, index: &str, project_id: &ProjectId) -> Result<Vec<String>> {
        Ok(self
            .search(index, project_id, false)
            .await?
            .into_iter()
            .map(|(id, _)| id)
            .collect())
    }

    /// Number of matching documents; a missing index counts as zero
    ///
    /// # Errors
    ///
    /// Returns a store error if the request fails.
    pub async fn count(&self, index: &str, query: Value) -> Result<u64> {
        let path = format!("{index}/_count");
        let body = json!({ "query": query });
        match self.send(Method::POST, &path, Some(&body)).await {
            Ok(response) => {
                let outcome: CountResponse = read_json(self.store, response).await?;
                Ok(outcome.count)
            }
            Err(EtlError::Store(StoreError::UnexpectedStatus { status: 404, .. })) => Ok(0),
            Err(e) => Err(e),
        }
    }

    /// Refreshes `indices` so recent writes become searchable
    ///
    /// # Errors
    ///
    /// Returns a store error if the request fails.
    pub async fn refresh(&self, indices: &[String]) -> Result<()> {
        let path = format!("{}/_refresh?ignore_unavailable=true", indices.join(","));
        self.send(Method::POST, &path, None).await?;
        Ok(())
    }
}
