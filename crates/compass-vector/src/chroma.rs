//! Chroma-compatible vector store backend.
//!
//! Speaks the columnar REST dialect: queries return parallel arrays of
//! ids/distances/metadatas/documents, one row per query embedding. Scores
//! come back as cosine distances; normalization to similarities is the
//! retriever's job, so matches are reported with [`StoreScore::Distance`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use tracing::{debug, info, warn};

use compass_core::{
    defaults, CompiledPredicate, Error, Result, StoreMatch, StoreScore, VectorStore,
};

/// Default collection name.
pub const DEFAULT_COLLECTION: &str = "activities";

/// Chroma REST backend.
pub struct ChromaBackend {
    client: Client,
    base_url: String,
    collection: String,
    timeout_secs: u64,
}

impl ChromaBackend {
    /// Create a backend for the given endpoint and collection.
    pub fn new(base_url: impl Into<String>, collection: impl Into<String>) -> Self {
        let base_url = base_url.into();
        let collection = collection.into();
        info!(
            "Initializing Chroma backend: url={}, collection={}",
            base_url, collection
        );
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            collection,
            timeout_secs: defaults::QUERY_TIMEOUT_SECS,
        }
    }

    /// Create from environment variables.
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `CHROMA_URL` | `http://localhost:8000` |
    /// | `CHROMA_COLLECTION` | `activities` |
    pub fn from_env() -> Self {
        let base_url =
            std::env::var("CHROMA_URL").unwrap_or_else(|_| defaults::CHROMA_URL.to_string());
        let collection =
            std::env::var("CHROMA_COLLECTION").unwrap_or_else(|_| DEFAULT_COLLECTION.to_string());
        Self::new(base_url, collection)
    }

    /// Use a different collection with the same connection settings.
    pub fn with_collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = collection.into();
        self
    }

    fn collection_url(&self, op: &str) -> String {
        format!(
            "{}/api/v1/collections/{}/{}",
            self.base_url, self.collection, op
        )
    }
}

#[derive(Debug, Serialize)]
struct QueryRequest<'a> {
    query_embeddings: Vec<&'a [f32]>,
    n_results: usize,
    #[serde(skip_serializing_if = "Option::is_none", rename = "where")]
    where_clause: Option<JsonValue>,
    include: Vec<&'static str>,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    ids: Vec<Vec<String>>,
    #[serde(default)]
    distances: Option<Vec<Vec<f32>>>,
    #[serde(default)]
    metadatas: Option<Vec<Vec<Option<Map<String, JsonValue>>>>>,
    #[serde(default)]
    documents: Option<Vec<Vec<Option<String>>>>,
}

#[derive(Debug, Serialize)]
struct UpsertRequest<'a> {
    ids: Vec<&'a str>,
    embeddings: Vec<Vec<f32>>,
    metadatas: Vec<Map<String, JsonValue>>,
    documents: Vec<String>,
}

/// Flatten the columnar response into row-shaped matches.
///
/// The response carries one row per query embedding; we always send exactly
/// one. A response missing columns (or with mismatched lengths) degrades to
/// whatever rows line up; "no matches" is a valid outcome, not an error.
fn matches_from_response(response: QueryResponse) -> Vec<StoreMatch> {
    let Some(ids) = response.ids.into_iter().next() else {
        return Vec::new();
    };
    let distances = response
        .distances
        .and_then(|d| d.into_iter().next())
        .unwrap_or_default();
    let metadatas = response
        .metadatas
        .and_then(|m| m.into_iter().next())
        .unwrap_or_default();
    let documents = response
        .documents
        .and_then(|d| d.into_iter().next())
        .unwrap_or_default();

    ids.into_iter()
        .enumerate()
        .map(|(i, id)| StoreMatch {
            id,
            score: StoreScore::Distance(distances.get(i).copied().unwrap_or(1.0)),
            metadata: metadatas.get(i).cloned().flatten().unwrap_or_default(),
            document: documents.get(i).cloned().flatten().unwrap_or_default(),
        })
        .collect()
}

#[async_trait]
impl VectorStore for ChromaBackend {
    async fn query(
        &self,
        embedding: &[f32],
        predicate: &CompiledPredicate,
        limit: usize,
    ) -> Result<Vec<StoreMatch>> {
        let request = QueryRequest {
            query_embeddings: vec![embedding],
            n_results: limit,
            where_clause: predicate.to_query_json(),
            include: vec!["documents", "metadatas", "distances"],
        };

        let response = self
            .client
            .post(self.collection_url("query"))
            .timeout(Duration::from_secs(self.timeout_secs))
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Transient(format!("chroma query: {}", e)))?;

        if !response.status().is_success() {
            return Err(Error::Transient(format!(
                "chroma query returned {}",
                response.status()
            )));
        }

        match response.json::<QueryResponse>().await {
            Ok(body) => {
                let matches = matches_from_response(body);
                debug!(result_count = matches.len(), "Chroma query complete");
                Ok(matches)
            }
            Err(e) => {
                // Malformed body: report no matches rather than failing the task.
                warn!(error = %e, "Malformed chroma query response");
                Ok(Vec::new())
            }
        }
    }

    async fn upsert(
        &self,
        id: &str,
        embedding: Vec<f32>,
        metadata: Map<String, JsonValue>,
        document: String,
    ) -> Result<()> {
        let request = UpsertRequest {
            ids: vec![id],
            embeddings: vec![embedding],
            metadatas: vec![metadata],
            documents: vec![document],
        };

        let response = self
            .client
            .post(self.collection_url("upsert"))
            .timeout(Duration::from_secs(self.timeout_secs))
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Transient(format!("chroma upsert: {}", e)))?;

        if !response.status().is_success() {
            return Err(Error::Transient(format!(
                "chroma upsert returned {}",
                response.status()
            )));
        }
        Ok(())
    }
}
