//! File upload: delegate a local file to the blob store collaborator.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value as JsonValue};
use tracing::info;

use compass_core::{ObjectStore, Result, TaskType};

use crate::outcome::TaskOutcome;
use crate::registry::{TaskContext, TaskHandler};

pub struct FileUploadHandler {
    store: Arc<dyn ObjectStore>,
}

impl FileUploadHandler {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    async fn upload(&self, ctx: &TaskContext) -> Result<Option<JsonValue>> {
        let local_path = ctx.require_str("local_path")?;
        let bucket_name = ctx.require_str("bucket_name")?;
        let object_name = ctx.require_str("object_name")?;

        self.store.put(local_path, bucket_name, object_name).await?;
        info!(bucket_name, object_name, "File uploaded");

        Ok(Some(json!({"object_name": object_name})))
    }
}

#[async_trait]
impl TaskHandler for FileUploadHandler {
    fn task_type(&self) -> TaskType {
        TaskType::FileUpload
    }

    async fn execute(&self, ctx: TaskContext) -> TaskOutcome {
        TaskOutcome::from_result(self.upload(&ctx).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use compass_core::{Error, TaskMessage};
    use std::sync::Mutex;

    /// Records puts; optionally fails.
    struct RecordingStore {
        puts: Mutex<Vec<(String, String, String)>>,
        fail: bool,
    }

    #[async_trait]
    impl ObjectStore for RecordingStore {
        async fn put(&self, local_path: &str, bucket: &str, object: &str) -> Result<()> {
            if self.fail {
                return Err(Error::Transient("blob store unreachable".into()));
            }
            self.puts.lock().unwrap().push((
                local_path.to_string(),
                bucket.to_string(),
                object.to_string(),
            ));
            Ok(())
        }
    }

    fn ctx() -> TaskContext {
        TaskContext::new(TaskMessage::new(
            TaskType::FileUpload,
            json!({"local_path": "/tmp/f.pdf", "bucket_name": "uploads", "object_name": "f.pdf"}),
        ))
    }

    #[tokio::test]
    async fn test_delegates_to_object_store() {
        let store = Arc::new(RecordingStore {
            puts: Mutex::new(Vec::new()),
            fail: false,
        });
        let handler = FileUploadHandler::new(store.clone());

        let outcome = handler.execute(ctx()).await;
        assert!(matches!(outcome, TaskOutcome::Success(Some(_))));

        let puts = store.puts.lock().unwrap();
        assert_eq!(
            puts[0],
            (
                "/tmp/f.pdf".to_string(),
                "uploads".to_string(),
                "f.pdf".to_string()
            )
        );
    }

    #[tokio::test]
    async fn test_store_failure_is_retryable() {
        let store = Arc::new(RecordingStore {
            puts: Mutex::new(Vec::new()),
            fail: true,
        });
        let handler = FileUploadHandler::new(store);

        let outcome = handler.execute(ctx()).await;
        assert!(matches!(outcome, TaskOutcome::Retryable(_)));
    }
}
