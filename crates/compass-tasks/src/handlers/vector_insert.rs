//! Vector insert: index a precomputed embedding with its metadata.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Map, Value as JsonValue};
use tracing::info;

use compass_core::{Error, Result, TaskType, VectorStore};

use crate::outcome::TaskOutcome;
use crate::registry::{TaskContext, TaskHandler};

pub struct VectorInsertHandler {
    store: Arc<dyn VectorStore>,
}

impl VectorInsertHandler {
    pub fn new(store: Arc<dyn VectorStore>) -> Self {
        Self { store }
    }

    async fn insert(&self, ctx: &TaskContext) -> Result<Option<JsonValue>> {
        let document_id = ctx.require_str("document_id")?;

        let embedding: Vec<f32> = serde_json::from_value(ctx.require("embedding")?.clone())
            .map_err(|e| Error::Validation(format!("embedding must be a number array: {}", e)))?;
        if embedding.is_empty() {
            return Err(Error::Validation("embedding must not be empty".into()));
        }

        let metadata: Map<String, JsonValue> = ctx
            .require("metadata")?
            .as_object()
            .cloned()
            .ok_or_else(|| Error::Validation("metadata must be an object".into()))?;

        let document = ctx
            .payload()
            .get("document")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();

        self.store
            .upsert(document_id, embedding, metadata, document)
            .await?;

        info!(document_id, "Vector record upserted");
        Ok(Some(json!({"document_id": document_id})))
    }
}

#[async_trait]
impl TaskHandler for VectorInsertHandler {
    fn task_type(&self) -> TaskType {
        TaskType::VectorInsert
    }

    async fn execute(&self, ctx: TaskContext) -> TaskOutcome {
        TaskOutcome::from_result(self.insert(&ctx).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use compass_core::TaskMessage;
    use compass_vector::InMemoryVectorStore;

    fn ctx(payload: JsonValue) -> TaskContext {
        TaskContext::new(TaskMessage::new(TaskType::VectorInsert, payload))
    }

    #[tokio::test]
    async fn test_upserts_record() {
        let store = Arc::new(InMemoryVectorStore::new());
        let handler = VectorInsertHandler::new(store.clone());

        let outcome = handler
            .execute(ctx(json!({
                "document_id": "d1",
                "embedding": [0.1, 0.2, 0.3],
                "metadata": {"category": "공모전"}
            })))
            .await;

        assert!(matches!(outcome, TaskOutcome::Success(Some(_))));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_insert_leaves_one_record() {
        let store = Arc::new(InMemoryVectorStore::new());
        let handler = VectorInsertHandler::new(store.clone());

        for _ in 0..2 {
            let outcome = handler
                .execute(ctx(json!({
                    "document_id": "d1",
                    "embedding": [0.5, 0.5],
                    "metadata": {}
                })))
                .await;
            assert!(matches!(outcome, TaskOutcome::Success(_)));
        }
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_malformed_embedding_is_fatal() {
        let store = Arc::new(InMemoryVectorStore::new());
        let handler = VectorInsertHandler::new(store);

        let outcome = handler
            .execute(ctx(json!({
                "document_id": "d1",
                "embedding": ["not", "numbers"],
                "metadata": {}
            })))
            .await;
        assert!(matches!(outcome, TaskOutcome::Fatal(_)));

        let handler2 = VectorInsertHandler::new(Arc::new(InMemoryVectorStore::new()));
        let outcome = handler2
            .execute(ctx(json!({
                "document_id": "d1",
                "embedding": [],
                "metadata": {}
            })))
            .await;
        assert!(matches!(outcome, TaskOutcome::Fatal(_)));
    }
}
