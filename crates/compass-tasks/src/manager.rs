//! Producer-side task manager: fire-and-forget publishing plus
//! health/stats reporting.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde_json::Value as JsonValue;
use tracing::{debug, info};

use compass_core::{QueueStats, Result, TaskMessage, TaskQueue, TaskType};

/// Thin façade over the work queue for producers.
pub struct TaskManager {
    queue: Arc<dyn TaskQueue>,
    result_sink: Option<Arc<dyn TaskQueue>>,
    submitted: AtomicU64,
}

impl TaskManager {
    pub fn new(queue: Arc<dyn TaskQueue>) -> Self {
        Self {
            queue,
            result_sink: None,
            submitted: AtomicU64::new(0),
        }
    }

    /// Attach a result sink; completed handler results are forwarded there
    /// via [`TaskManager::publish_result`].
    pub fn with_result_sink(mut self, sink: Arc<dyn TaskQueue>) -> Self {
        self.result_sink = Some(sink);
        self
    }

    /// Publish a task (fire-and-forget). Returns the generated task id.
    pub async fn submit(&self, task_type: TaskType, payload: JsonValue) -> Result<String> {
        self.submit_message(TaskMessage::new(task_type, payload))
            .await
    }

    /// Publish a prebuilt message. Returns its task id.
    pub async fn submit_message(&self, message: TaskMessage) -> Result<String> {
        let task_id = message.task_id.clone();
        let task_type = message.task_type.clone();
        self.queue.publish(message).await?;
        self.submitted.fetch_add(1, Ordering::Relaxed);
        info!(%task_id, %task_type, "Task submitted");
        Ok(task_id)
    }

    /// Publish a handler result to the result sink, keyed by the
    /// originating task. Without a sink the result is dropped; consumers
    /// can still read it off the dispatcher's event stream.
    pub async fn publish_result(
        &self,
        task_id: &str,
        task_type: TaskType,
        result: JsonValue,
    ) -> Result<()> {
        let Some(sink) = &self.result_sink else {
            debug!(%task_id, "No result sink configured, dropping result");
            return Ok(());
        };
        sink.publish(TaskMessage::new(task_type, result).with_task_id(task_id))
            .await
    }

    /// Number of tasks submitted through this manager.
    pub fn submitted_count(&self) -> u64 {
        self.submitted.load(Ordering::Relaxed)
    }

    /// Queue statistics, as reported by the queue itself.
    pub async fn stats(&self) -> Result<QueueStats> {
        self.queue.stats().await
    }

    /// Health check: the manager is healthy while the queue accepts stats
    /// queries.
    pub async fn healthy(&self) -> bool {
        self.queue.stats().await.is_ok()
    }
}
