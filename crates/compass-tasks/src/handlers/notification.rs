//! Notification delivery stub around the (external) notification channel.

use async_trait::async_trait;
use serde_json::{json, Value as JsonValue};
use tracing::info;

use compass_core::{Result, TaskType};

use crate::outcome::TaskOutcome;
use crate::registry::{TaskContext, TaskHandler};

pub struct NotificationHandler;

impl NotificationHandler {
    pub fn new() -> Self {
        Self
    }

    async fn notify(&self, ctx: &TaskContext) -> Result<Option<JsonValue>> {
        let message = ctx.require_str("message")?;
        let recipient = ctx.require_str("recipient")?;
        let kind = ctx
            .payload()
            .get("type")
            .and_then(|v| v.as_str())
            .unwrap_or("info");

        info!(recipient, kind, message, "Notification delivered");
        Ok(Some(json!({"recipient": recipient})))
    }
}

impl Default for NotificationHandler {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TaskHandler for NotificationHandler {
    fn task_type(&self) -> TaskType {
        TaskType::Notification
    }

    async fn execute(&self, ctx: TaskContext) -> TaskOutcome {
        TaskOutcome::from_result(self.notify(&ctx).await)
    }
}
