//! Similarity retrieval with score normalization and deterministic ranking.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, warn};

use compass_core::{
    CompiledPredicate, Error, Result, RetrievedItem, StoreMatch, StoreScore, VectorStore,
};

/// Retriever over a [`VectorStore`].
///
/// The store does the nearest-neighbor work; this component constructs the
/// query, applies the compiled predicate, and normalizes whatever shape the
/// store reports into a ranked [`RetrievedItem`] list where 1.0 always
/// means identical and 0.0 unrelated.
pub struct Retriever {
    store: Arc<dyn VectorStore>,
}

impl Retriever {
    pub fn new(store: Arc<dyn VectorStore>) -> Self {
        Self { store }
    }

    /// Run a similarity query scoped by `predicate`.
    ///
    /// Returns at most `limit` items, descending by similarity with
    /// ascending-id tie break. Fewer matches than `limit`, or none at
    /// all, is a valid outcome, not an error. A store failure surfaces as
    /// [`Error::Transient`] so the dispatcher can retry.
    pub async fn retrieve(
        &self,
        embedding: &[f32],
        predicate: &CompiledPredicate,
        limit: usize,
    ) -> Result<Vec<RetrievedItem>> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let start = Instant::now();
        let matches = self
            .store
            .query(embedding, predicate, limit)
            .await
            .map_err(|e| Error::Transient(format!("vector store query failed: {}", e)))?;

        let mut items: Vec<RetrievedItem> = matches.into_iter().map(normalize).collect();
        items.sort_by(RetrievedItem::ranking_cmp);
        items.truncate(limit);

        debug!(
            result_count = items.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Retrieval complete"
        );
        Ok(items)
    }
}

/// Normalize a raw store match into the uniform result shape.
///
/// Distance-reporting stores (cosine distance) convert as `1 - d`; both
/// forms clamp into [0, 1].
fn normalize(m: StoreMatch) -> RetrievedItem {
    let similarity = match m.score {
        StoreScore::Similarity(s) => s,
        StoreScore::Distance(d) => 1.0 - d,
    };
    let similarity = if similarity.is_finite() {
        similarity.clamp(0.0, 1.0)
    } else {
        warn!(id = %m.id, "Non-finite store score, treating as unrelated");
        0.0
    };

    RetrievedItem {
        id: m.id,
        similarity_score: similarity,
        metadata: m.metadata,
        source_text: m.document,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::Map;

    /// Stub store handing back a fixed response (or error) per call.
    struct FixedStore {
        matches: Vec<StoreMatch>,
        fail: bool,
    }

    #[async_trait]
    impl VectorStore for FixedStore {
        async fn query(
            &self,
            _embedding: &[f32],
            _predicate: &CompiledPredicate,
            _limit: usize,
        ) -> Result<Vec<StoreMatch>> {
            if self.fail {
                Err(Error::Transient("connection refused".into()))
            } else {
                Ok(self.matches.clone())
            }
        }

        async fn upsert(
            &self,
            _id: &str,
            _embedding: Vec<f32>,
            _metadata: Map<String, serde_json::Value>,
            _document: String,
        ) -> Result<()> {
            Ok(())
        }
    }

    fn store_match(id: &str, score: StoreScore) -> StoreMatch {
        StoreMatch {
            id: id.to_string(),
            score,
            metadata: Map::new(),
            document: format!("doc {}", id),
        }
    }

    fn retriever(matches: Vec<StoreMatch>) -> Retriever {
        Retriever::new(Arc::new(FixedStore {
            matches,
            fail: false,
        }))
    }

    #[tokio::test]
    async fn test_distances_convert_to_similarities() {
        let r = retriever(vec![
            store_match("a", StoreScore::Distance(0.1)),
            store_match("b", StoreScore::Distance(0.4)),
        ]);

        let items = r
            .retrieve(&[0.0; 4], &CompiledPredicate::match_all(), 10)
            .await
            .unwrap();

        assert_eq!(items[0].id, "a");
        assert!((items[0].similarity_score - 0.9).abs() < 1e-6);
        assert!((items[1].similarity_score - 0.6).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_similarity_clamped_to_unit_interval() {
        let r = retriever(vec![
            store_match("a", StoreScore::Distance(1.8)),
            store_match("b", StoreScore::Similarity(1.3)),
        ]);

        let items = r
            .retrieve(&[0.0; 4], &CompiledPredicate::match_all(), 10)
            .await
            .unwrap();

        assert_eq!(items[0].similarity_score, 1.0);
        assert_eq!(items[1].similarity_score, 0.0);
    }

    #[tokio::test]
    async fn test_ordering_desc_score_ties_by_id() {
        let r = retriever(vec![
            store_match("c", StoreScore::Similarity(0.8)),
            store_match("a", StoreScore::Similarity(0.8)),
            store_match("b", StoreScore::Similarity(0.95)),
        ]);

        let items = r
            .retrieve(&[0.0; 4], &CompiledPredicate::match_all(), 10)
            .await
            .unwrap();

        let ids: Vec<&str> = items.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a", "c"]);
    }

    #[tokio::test]
    async fn test_limit_zero_returns_empty() {
        let r = retriever(vec![store_match("a", StoreScore::Similarity(0.9))]);
        let items = r
            .retrieve(&[0.0; 4], &CompiledPredicate::match_all(), 0)
            .await
            .unwrap();
        assert!(items.is_empty());
    }

    #[tokio::test]
    async fn test_truncates_to_limit() {
        let r = retriever(vec![
            store_match("a", StoreScore::Similarity(0.9)),
            store_match("b", StoreScore::Similarity(0.8)),
            store_match("c", StoreScore::Similarity(0.7)),
        ]);

        let items = r
            .retrieve(&[0.0; 4], &CompiledPredicate::match_all(), 2)
            .await
            .unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].id, "a");
    }

    #[tokio::test]
    async fn test_no_matches_is_success() {
        let r = retriever(Vec::new());
        let items = r
            .retrieve(&[0.0; 4], &CompiledPredicate::match_all(), 5)
            .await
            .unwrap();
        assert!(items.is_empty());
    }

    #[tokio::test]
    async fn test_store_failure_is_transient() {
        let r = Retriever::new(Arc::new(FixedStore {
            matches: Vec::new(),
            fail: true,
        }));

        let err = r
            .retrieve(&[0.0; 4], &CompiledPredicate::match_all(), 5)
            .await
            .unwrap_err();
        assert!(err.is_retryable());
    }
}
