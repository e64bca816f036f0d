//! Document processing: read an uploaded file and report its extracted
//! length. Rich extraction (PDF, OCR) is a collaborator concern; this
//! handler consumes already-readable text.

use async_trait::async_trait;
use serde_json::json;
use tracing::info;

use compass_core::{Result, TaskType};

use crate::outcome::TaskOutcome;
use crate::registry::{TaskContext, TaskHandler};

pub struct DocumentProcessingHandler;

impl DocumentProcessingHandler {
    pub fn new() -> Self {
        Self
    }

    async fn process(&self, ctx: &TaskContext) -> Result<Option<serde_json::Value>> {
        let document_id = ctx.require_str("document_id")?;
        let file_path = ctx.require_str("file_path")?;

        let content = tokio::fs::read_to_string(file_path).await?;
        info!(
            document_id,
            content_length = content.len(),
            "Document processed"
        );

        Ok(Some(json!({
            "document_id": document_id,
            "content_length": content.len(),
        })))
    }
}

impl Default for DocumentProcessingHandler {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TaskHandler for DocumentProcessingHandler {
    fn task_type(&self) -> TaskType {
        TaskType::DocumentProcessing
    }

    async fn execute(&self, ctx: TaskContext) -> TaskOutcome {
        TaskOutcome::from_result(self.process(&ctx).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use compass_core::TaskMessage;
    use serde_json::json;

    #[tokio::test]
    async fn test_reads_file_and_reports_length() {
        let dir = std::env::temp_dir();
        let path = dir.join("compass_doc_handler_test.txt");
        tokio::fs::write(&path, "hello document").await.unwrap();

        let handler = DocumentProcessingHandler::new();
        let ctx = TaskContext::new(TaskMessage::new(
            TaskType::DocumentProcessing,
            json!({"document_id": "d1", "file_path": path.to_str().unwrap()}),
        ));

        let outcome = handler.execute(ctx).await;
        match outcome {
            TaskOutcome::Success(Some(value)) => {
                assert_eq!(value["document_id"], "d1");
                assert_eq!(value["content_length"], 14);
            }
            other => panic!("unexpected outcome: {:?}", other),
        }

        tokio::fs::remove_file(&path).await.unwrap();
    }

    #[tokio::test]
    async fn test_missing_file_is_retryable() {
        let handler = DocumentProcessingHandler::new();
        let ctx = TaskContext::new(TaskMessage::new(
            TaskType::DocumentProcessing,
            json!({"document_id": "d1", "file_path": "/nonexistent/compass/file.txt"}),
        ));

        let outcome = handler.execute(ctx).await;
        assert!(matches!(outcome, TaskOutcome::Retryable(_)));
    }
}
