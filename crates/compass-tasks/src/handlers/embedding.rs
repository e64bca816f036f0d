//! Embedding generation: embed extracted text and index it in the vector
//! store keyed by document id. Re-delivery of the same document id is an
//! overwrite, so the task is safe to retry.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Map, Value as JsonValue};
use tracing::info;

use compass_core::{EmbeddingBackend, Result, TaskType, VectorStore};

use crate::outcome::TaskOutcome;
use crate::registry::{TaskContext, TaskHandler};

pub struct EmbeddingGenerationHandler {
    embedder: Arc<dyn EmbeddingBackend>,
    store: Arc<dyn VectorStore>,
}

impl EmbeddingGenerationHandler {
    pub fn new(embedder: Arc<dyn EmbeddingBackend>, store: Arc<dyn VectorStore>) -> Self {
        Self { embedder, store }
    }

    async fn generate(&self, ctx: &TaskContext) -> Result<Option<JsonValue>> {
        let document_id = ctx.require_str("document_id")?;
        let text = ctx.require_str("text")?;

        // Optional metadata travels with the record for later filtering.
        let metadata: Map<String, JsonValue> = ctx
            .payload()
            .get("metadata")
            .and_then(|v| v.as_object())
            .cloned()
            .unwrap_or_default();

        let embedding = self.embedder.embed(text).await?;
        let embedding_size = embedding.len();
        self.store
            .upsert(document_id, embedding, metadata, text.to_string())
            .await?;

        info!(document_id, embedding_size, "Embedding generated and indexed");
        Ok(Some(json!({
            "document_id": document_id,
            "embedding_size": embedding_size,
        })))
    }
}

#[async_trait]
impl TaskHandler for EmbeddingGenerationHandler {
    fn task_type(&self) -> TaskType {
        TaskType::EmbeddingGeneration
    }

    async fn execute(&self, ctx: TaskContext) -> TaskOutcome {
        TaskOutcome::from_result(self.generate(&ctx).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use compass_core::{CompiledPredicate, TaskMessage};
    use compass_inference::MockEmbedder;
    use compass_vector::InMemoryVectorStore;

    fn handler_with_store() -> (EmbeddingGenerationHandler, Arc<InMemoryVectorStore>) {
        let store = Arc::new(InMemoryVectorStore::new());
        let handler = EmbeddingGenerationHandler::new(
            Arc::new(MockEmbedder::new().with_dimension(16)),
            store.clone(),
        );
        (handler, store)
    }

    fn ctx(document_id: &str, text: &str) -> TaskContext {
        TaskContext::new(TaskMessage::new(
            TaskType::EmbeddingGeneration,
            json!({"document_id": document_id, "text": text}),
        ))
    }

    #[tokio::test]
    async fn test_embeds_and_indexes() {
        let (handler, store) = handler_with_store();
        let outcome = handler.execute(ctx("d1", "portfolio text")).await;

        match outcome {
            TaskOutcome::Success(Some(value)) => {
                assert_eq!(value["document_id"], "d1");
                assert_eq!(value["embedding_size"], 16);
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_reinsert_same_document_id_is_idempotent() {
        let (handler, store) = handler_with_store();

        let first = handler.execute(ctx("d1", "original text")).await;
        assert!(matches!(first, TaskOutcome::Success(_)));
        let second = handler.execute(ctx("d1", "revised text")).await;
        assert!(matches!(second, TaskOutcome::Success(_)));

        assert_eq!(store.len(), 1);
        let matches = store
            .query(&[0.0; 16], &CompiledPredicate::match_all(), 10)
            .await
            .unwrap();
        assert_eq!(matches[0].document, "revised text");
    }
}
