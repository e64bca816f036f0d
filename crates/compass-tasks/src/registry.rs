//! Task handlers and the type-to-handler registry.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use tracing::debug;

use compass_core::{Error, Result, TaskMessage, TaskType};

use crate::outcome::TaskOutcome;

/// Context provided to task handlers.
pub struct TaskContext {
    /// The message being processed.
    pub message: TaskMessage,
}

impl TaskContext {
    pub fn new(message: TaskMessage) -> Self {
        Self { message }
    }

    /// The task payload.
    pub fn payload(&self) -> &JsonValue {
        &self.message.payload
    }

    /// Required payload field, as any JSON value.
    pub fn require(&self, field: &str) -> Result<&JsonValue> {
        self.message.payload.get(field).ok_or_else(|| {
            Error::Validation(format!(
                "{}: missing required field '{}'",
                self.message.task_type, field
            ))
        })
    }

    /// Required payload field that must be a string.
    pub fn require_str(&self, field: &str) -> Result<&str> {
        self.require(field)?.as_str().ok_or_else(|| {
            Error::Validation(format!(
                "{}: field '{}' must be a string",
                self.message.task_type, field
            ))
        })
    }
}

/// Trait for task handlers.
///
/// `execute` must cover every exit with a [`TaskOutcome`]; the dispatcher
/// additionally guards against panics and timeouts, but a handler should
/// never rely on that.
#[async_trait]
pub trait TaskHandler: Send + Sync {
    /// The task type this handler processes.
    fn task_type(&self) -> TaskType;

    /// Execute the task.
    async fn execute(&self, ctx: TaskContext) -> TaskOutcome;
}

/// Static mapping from task type to handler, built at startup.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: HashMap<TaskType, Arc<dyn TaskHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for its task type. A repeated type replaces the
    /// earlier handler.
    pub fn register<H: TaskHandler + 'static>(mut self, handler: H) -> Self {
        let task_type = handler.task_type();
        debug!(task_type = %task_type, "Registered task handler");
        self.handlers.insert(task_type, Arc::new(handler));
        self
    }

    /// Register an already-shared handler.
    pub fn register_arc(mut self, handler: Arc<dyn TaskHandler>) -> Self {
        let task_type = handler.task_type();
        debug!(task_type = %task_type, "Registered task handler");
        self.handlers.insert(task_type, handler);
        self
    }

    /// Look up the handler for a task type.
    pub fn get(&self, task_type: &TaskType) -> Option<Arc<dyn TaskHandler>> {
        self.handlers.get(task_type).cloned()
    }

    /// Registered task types.
    pub fn registered_types(&self) -> Vec<TaskType> {
        self.handlers.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

/// No-op handler for tests.
pub struct NoOpHandler {
    task_type: TaskType,
}

impl NoOpHandler {
    pub fn new(task_type: TaskType) -> Self {
        Self { task_type }
    }
}

#[async_trait]
impl TaskHandler for NoOpHandler {
    fn task_type(&self) -> TaskType {
        self.task_type.clone()
    }

    async fn execute(&self, _ctx: TaskContext) -> TaskOutcome {
        TaskOutcome::Success(None)
    }
}
