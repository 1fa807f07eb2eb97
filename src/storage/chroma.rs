//! Chroma vector store over the v2 REST API.
//!
//! Collections are created with cosine distance so query distances line up
//! with the in-memory store. All requests are scoped to the configured tenant
//! and database.

use super::collection::{VectorCollection, VectorStore};
use crate::config::VectorConfig;
use crate::llm::{LlmHttpConfig, build_http_client, request_error, status_error};
use crate::models::{Metadata, QueryInclude, QueryMatch, QueryResult};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

const BACKEND: &str = "chroma";

/// HTTP plumbing shared by the store and its collections.
#[derive(Debug)]
struct ChromaClient {
    base_url: String,
    tenant: String,
    database: String,
    client: reqwest::blocking::Client,
}

impl ChromaClient {
    fn collections_url(&self) -> String {
        format!(
            "{}/api/v2/tenants/{}/databases/{}/collections",
            self.base_url, self.tenant, self.database
        )
    }

    fn collection_url(&self, id: &str, action: &str) -> String {
        format!("{}/{id}/{action}", self.collections_url())
    }

    fn send(
        &self,
        operation: &'static str,
        request: reqwest::blocking::RequestBuilder,
    ) -> Result<reqwest::blocking::Response> {
        let start = Instant::now();
        let result = request.send();
        metrics::histogram!("vector_request_duration_ms", "backend" => BACKEND, "operation" => operation)
            .record(start.elapsed().as_secs_f64() * 1000.0);

        let response = result.map_err(|e| request_error(BACKEND, operation, &e))?;
        if !response.status().is_success() {
            return Err(status_error(BACKEND, operation, response));
        }
        Ok(response)
    }

    fn parse<T: serde::de::DeserializeOwned>(
        operation: &'static str,
        response: reqwest::blocking::Response,
    ) -> Result<T> {
        response
            .json()
            .map_err(|e| Error::operation(format!("chroma_{operation}"), e.to_string()))
    }

    fn heartbeat(&self) -> Result<()> {
        let url = format!("{}/api/v2/heartbeat", self.base_url);
        self.send("heartbeat", self.client.get(url))?;
        Ok(())
    }

    /// Returns the id of the named collection, creating it when missing.
    fn get_or_create(&self, name: &str) -> Result<String> {
        let body = json!({
            "name": name,
            "get_or_create": true,
            "metadata": { "hnsw:space": "cosine" },
        });
        let response = self.send(
            "get_or_create",
            self.client.post(self.collections_url()).json(&body),
        )?;
        let collection: CollectionResponse = Self::parse("get_or_create", response)?;
        Ok(collection.id)
    }

    fn delete(&self, name: &str) -> Result<()> {
        let url = format!("{}/{name}", self.collections_url());
        self.send("delete", self.client.delete(url))?;
        Ok(())
    }

    fn count(&self, id: &str) -> Result<usize> {
        let response = self.send("count", self.client.get(self.collection_url(id, "count")))?;
        Self::parse("count", response)
    }
}

/// Vector store backed by a Chroma server.
///
/// Collections are resolved once per name and cached; a reset refreshes the
/// cached collection's server id in place.
#[derive(Debug)]
pub struct ChromaVectorStore {
    client: Arc<ChromaClient>,
    collections: Mutex<HashMap<String, Arc<ChromaCollection>>>,
}

impl ChromaVectorStore {
    /// Creates a store for the configured host.
    ///
    /// No request is made; call [`Self::heartbeat`] to check reachability.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if no Chroma host is configured.
    pub fn new(config: &VectorConfig) -> Result<Self> {
        let base_url = config
            .base_url()
            .ok_or_else(|| Error::configuration(BACKEND, "CHROMA_HOST not set"))?;
        let client = build_http_client(LlmHttpConfig::default().with_timeout_ms(config.timeout_ms));

        Ok(Self {
            client: Arc::new(ChromaClient {
                base_url,
                tenant: config.tenant.clone(),
                database: config.database.clone(),
                client,
            }),
            collections: Mutex::new(HashMap::new()),
        })
    }

    /// Returns the server base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.client.base_url
    }

    /// Checks that the server answers its heartbeat endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BackendUnavailable`] if the server cannot be reached.
    pub fn heartbeat(&self) -> Result<()> {
        self.client.heartbeat()
    }
}

impl VectorStore for ChromaVectorStore {
    fn backend(&self) -> &'static str {
        BACKEND
    }

    fn collection(&self, name: &str) -> Result<Arc<dyn VectorCollection>> {
        let cached = self
            .collections
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned();
        if let Some(collection) = cached {
            return Ok(collection);
        }

        let id = self.client.get_or_create(name)?;
        tracing::debug!(collection = name, id = %id, "Opened Chroma collection");
        let opened = Arc::new(ChromaCollection {
            client: Arc::clone(&self.client),
            name: name.to_string(),
            id: Mutex::new(id),
        });

        // A concurrent caller may have opened it first; keep that one.
        let collection = self
            .collections
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(name.to_string())
            .or_insert(opened)
            .clone();
        Ok(collection)
    }
}

/// A collection on a Chroma server.
///
/// The server id changes when the collection is reset, so it is kept behind
/// a lock.
#[derive(Debug)]
pub struct ChromaCollection {
    client: Arc<ChromaClient>,
    name: String,
    id: Mutex<String>,
}

impl ChromaCollection {
    fn id(&self) -> String {
        self.id.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl VectorCollection for ChromaCollection {
    fn name(&self) -> &str {
        &self.name
    }

    fn upsert(
        &self,
        ids: &[String],
        documents: &[String],
        metadatas: &[Metadata],
        embeddings: &[Vec<f32>],
    ) -> Result<usize> {
        let len = ids
            .len()
            .min(documents.len())
            .min(metadatas.len())
            .min(embeddings.len());
        if len == 0 {
            return Ok(0);
        }

        let request = UpsertRequest {
            ids: &ids[..len],
            embeddings: &embeddings[..len],
            documents: &documents[..len],
            metadatas: metadatas[..len]
                .iter()
                .map(|m| if m.is_empty() { None } else { Some(m) })
                .collect(),
        };
        let url = self.client.collection_url(&self.id(), "upsert");
        self.client
            .send("upsert", self.client.client.post(url).json(&request))?;

        metrics::counter!("vector_upserts_total", "backend" => BACKEND).increment(len as u64);
        Ok(len)
    }

    fn query(
        &self,
        query_embedding: &[f32],
        top_k: usize,
        include: QueryInclude,
    ) -> Result<QueryResult> {
        metrics::counter!("vector_queries_total", "backend" => BACKEND).increment(1);
        if top_k == 0 {
            return Ok(QueryResult::default());
        }

        let body = json!({
            "query_embeddings": [query_embedding],
            "n_results": top_k,
            "include": include.field_names(),
        });
        let url = self.client.collection_url(&self.id(), "query");
        let response = self
            .client
            .send("query", self.client.client.post(url).json(&body))?;
        let response: QueryResponse = ChromaClient::parse("query", response)?;

        Ok(response.into_result(include))
    }

    fn count(&self) -> Result<usize> {
        self.client.count(&self.id())
    }

    fn reset(&self) -> Result<usize> {
        let before = self.count()?;
        self.client.delete(&self.name)?;
        let id = self.client.get_or_create(&self.name)?;
        *self.id.lock().unwrap_or_else(PoisonError::into_inner) = id;

        tracing::info!(collection = %self.name, removed = before, "Reset Chroma collection");
        Ok(before)
    }
}

#[derive(Debug, Serialize)]
struct UpsertRequest<'a> {
    ids: &'a [String],
    embeddings: &'a [Vec<f32>],
    documents: &'a [String],
    metadatas: Vec<Option<&'a Metadata>>,
}

#[derive(Debug, Deserialize)]
struct CollectionResponse {
    id: String,
}

/// Query response; every field holds one inner list per query embedding.
#[derive(Debug, Default, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    ids: Vec<Vec<String>>,
    #[serde(default)]
    documents: Option<Vec<Vec<Option<String>>>>,
    #[serde(default)]
    metadatas: Option<Vec<Vec<Option<Metadata>>>>,
    #[serde(default)]
    distances: Option<Vec<Vec<Option<f32>>>>,
}

impl QueryResponse {
    /// Flattens the first query's results into matches.
    fn into_result(self, include: QueryInclude) -> QueryResult {
        fn first<T>(lists: Option<Vec<Vec<T>>>) -> Vec<T> {
            lists.and_then(|l| l.into_iter().next()).unwrap_or_default()
        }

        let ids = self.ids.into_iter().next().unwrap_or_default();
        let mut documents = first(self.documents).into_iter();
        let mut metadatas = first(self.metadatas).into_iter();
        let mut distances = first(self.distances).into_iter();

        let matches = ids
            .into_iter()
            .map(|id| {
                let document = documents.next().flatten();
                let metadata = metadatas.next().flatten();
                let distance = distances.next().flatten();
                QueryMatch {
                    id,
                    document: if include.documents {
                        Some(document.unwrap_or_default())
                    } else {
                        None
                    },
                    metadata: if include.metadatas {
                        Some(metadata.unwrap_or_default())
                    } else {
                        None
                    },
                    distance: distance.filter(|_| include.distances),
                }
            })
            .collect();

        QueryResult { matches }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn config(host: Option<&str>) -> VectorConfig {
        VectorConfig {
            host: host.map(str::to_string),
            port: 1,
            timeout_ms: 1_000,
            ..VectorConfig::default()
        }
    }

    #[test]
    fn test_requires_host() {
        let err = ChromaVectorStore::new(&config(None)).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_urls() {
        let store = ChromaVectorStore::new(&config(Some("127.0.0.1"))).unwrap();
        assert_eq!(store.base_url(), "http://127.0.0.1:1");
        assert_eq!(
            store.client.collection_url("abc", "query"),
            "http://127.0.0.1:1/api/v2/tenants/default_tenant/databases/default_database/collections/abc/query"
        );
    }

    #[test]
    fn test_unreachable_server_is_retryable() {
        let store = ChromaVectorStore::new(&config(Some("127.0.0.1"))).unwrap();
        let err = store.heartbeat().unwrap_err();
        assert!(err.is_retryable(), "unexpected error: {err}");
        assert!(store.collection("documents").is_err());
    }

    /// Minimal Chroma stand-in: hands out a fresh id per create, answers
    /// `count` with 0 and records each request line.
    fn serve_chroma() -> (u16, Arc<Mutex<Vec<String>>>) {
        use std::io::{BufRead, BufReader, Read, Write};
        use std::net::TcpListener;

        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&requests);

        std::thread::spawn(move || {
            let mut created = 0;
            for stream in listener.incoming() {
                let Ok(stream) = stream else { break };
                let mut reader = BufReader::new(stream);
                let mut request_line = String::new();
                reader.read_line(&mut request_line).unwrap();
                let mut length = 0;
                loop {
                    let mut header = String::new();
                    reader.read_line(&mut header).unwrap();
                    if header.trim().is_empty() {
                        break;
                    }
                    if let Some(v) = header.to_lowercase().strip_prefix("content-length:") {
                        length = v.trim().parse().unwrap();
                    }
                }
                let mut body = vec![0u8; length];
                reader.read_exact(&mut body).unwrap();

                let request_line = request_line.trim().to_string();
                let is_create =
                    request_line.starts_with("POST") && request_line.contains("/collections ");
                let body = if is_create {
                    created += 1;
                    format!(r#"{{"id":"c{created}"}}"#)
                } else if request_line.contains("/count") {
                    "0".to_string()
                } else {
                    "{}".to_string()
                };
                log.lock().unwrap().push(request_line);

                let response = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                reader.get_mut().write_all(response.as_bytes()).unwrap();
            }
        });

        (port, requests)
    }

    #[test]
    fn test_collections_are_resolved_once() {
        let (port, requests) = serve_chroma();
        let config = VectorConfig {
            port,
            ..config(Some("127.0.0.1"))
        };
        let store = ChromaVectorStore::new(&config).unwrap();
        let creates = || {
            requests
                .lock()
                .unwrap()
                .iter()
                .filter(|line| line.starts_with("POST") && line.contains("/collections "))
                .count()
        };

        store.collection("documents").unwrap();
        assert_eq!(store.collection("documents").unwrap().count().unwrap(), 0);
        assert_eq!(creates(), 1);

        // Reset recreates the collection and the cached handle follows the new id.
        assert_eq!(store.reset_collection("documents").unwrap(), 0);
        assert_eq!(creates(), 2);
        store.collection("documents").unwrap().count().unwrap();
        assert_eq!(creates(), 2);
        let last = requests.lock().unwrap().last().cloned().unwrap();
        assert!(last.contains("/collections/c2/count"), "unexpected request: {last}");

        store.collection("other").unwrap();
        assert_eq!(creates(), 3);
    }

    #[test]
    fn test_query_response_flattening() {
        let response: QueryResponse = serde_json::from_value(json!({
            "ids": [["a", "b"]],
            "documents": [["first", null]],
            "metadatas": [[{"source": "r.txt"}, null]],
            "distances": [[0.1, 0.4]],
        }))
        .unwrap();

        let result = response.into_result(QueryInclude::all());
        assert_eq!(result.ids(), vec!["a", "b"]);
        assert_eq!(result.documents(), vec!["first", ""]);
        assert_eq!(result.distances(), vec![0.1, 0.4]);
        assert_eq!(
            result.matches[0].metadata.as_ref().and_then(|m| m.get("source")),
            Some(&Value::from("r.txt"))
        );
        assert!(result.matches[1].metadata.as_ref().is_some_and(Metadata::is_empty));
    }

    #[test]
    fn test_query_response_respects_include() {
        let response: QueryResponse = serde_json::from_value(json!({
            "ids": [["a"]],
            "documents": null,
            "metadatas": null,
            "distances": [[0.2]],
        }))
        .unwrap();

        let result = response.into_result(QueryInclude::ids_only());
        let m = &result.matches[0];
        assert!(m.document.is_none());
        assert!(m.metadata.is_none());
        assert!(m.distance.is_none());
    }

    #[test]
    fn test_upsert_request_sends_null_for_empty_metadata() {
        let ids = vec!["a".to_string()];
        let docs = vec!["d".to_string()];
        let embeddings = vec![vec![1.0f32]];
        let request = UpsertRequest {
            ids: &ids,
            embeddings: &embeddings,
            documents: &docs,
            metadatas: vec![None],
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["metadatas"], json!([null]));
    }
}
