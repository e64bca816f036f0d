//! In-memory vector store for tests and single-process deployments.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use serde_json::{Map, Value as JsonValue};

use compass_core::{
    CompiledPredicate, Error, Result, StoreMatch, StoreScore, VectorStore,
};

#[derive(Debug, Clone)]
struct StoredRecord {
    embedding: Vec<f32>,
    metadata: Map<String, JsonValue>,
    document: String,
}

/// Cosine-similarity store over a guarded map.
///
/// Records are keyed by id, so re-inserting an id overwrites the previous
/// record in place; that is the idempotency the pipeline relies on when an
/// embedding task is redelivered.
#[derive(Clone, Default)]
pub struct InMemoryVectorStore {
    records: Arc<RwLock<HashMap<String, StoredRecord>>>,
}

impl InMemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.records.read().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn query(
        &self,
        embedding: &[f32],
        predicate: &CompiledPredicate,
        limit: usize,
    ) -> Result<Vec<StoreMatch>> {
        let records = self
            .records
            .read()
            .map_err(|_| Error::Internal("vector store lock poisoned".into()))?;

        let mut matches: Vec<StoreMatch> = records
            .iter()
            .filter(|(_, record)| predicate.matches(&record.metadata))
            .map(|(id, record)| StoreMatch {
                id: id.clone(),
                score: StoreScore::Similarity(cosine_similarity(embedding, &record.embedding)),
                metadata: record.metadata.clone(),
                document: record.document.clone(),
            })
            .collect();

        matches.sort_by(|a, b| {
            let sa = match a.score {
                StoreScore::Similarity(s) | StoreScore::Distance(s) => s,
            };
            let sb = match b.score {
                StoreScore::Similarity(s) | StoreScore::Distance(s) => s,
            };
            sb.partial_cmp(&sa)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });
        matches.truncate(limit);
        Ok(matches)
    }

    async fn upsert(
        &self,
        id: &str,
        embedding: Vec<f32>,
        metadata: Map<String, JsonValue>,
        document: String,
    ) -> Result<()> {
        let mut records = self
            .records
            .write()
            .map_err(|_| Error::Internal("vector store lock poisoned".into()))?;
        records.insert(
            id.to_string(),
            StoredRecord {
                embedding,
                metadata,
                document,
            },
        );
        Ok(())
    }
}
