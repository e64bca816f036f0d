//! In-memory task queue with at-least-once delivery semantics.
//!
//! Mirrors the contract the dispatcher expects of a real broker: consumed
//! deliveries stay unacknowledged until settled, `reject(requeue)` puts the
//! message back with its attempt counter incremented, and dead-lettered
//! messages land in an inspectable buffer instead of vanishing.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex as StdMutex;

use async_trait::async_trait;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, warn};

use compass_core::{
    defaults, AckHandle, Delivery, Error, QueueStats, Result, TaskMessage, TaskQueue,
};

/// mpsc-backed [`TaskQueue`] for tests and single-process deployments.
pub struct InMemoryQueue {
    name: String,
    tx: StdMutex<Option<mpsc::Sender<TaskMessage>>>,
    rx: Mutex<mpsc::Receiver<TaskMessage>>,
    unacked: StdMutex<HashMap<u64, TaskMessage>>,
    dead_letters: StdMutex<Vec<TaskMessage>>,
    next_handle: AtomicU64,
    published: AtomicU64,
}

impl InMemoryQueue {
    /// Create the work queue with the default buffered capacity.
    pub fn new() -> Self {
        Self::named(defaults::WORK_QUEUE)
    }

    /// Create a queue under a specific name (e.g. the result queue).
    pub fn named(name: impl Into<String>) -> Self {
        Self::with_options(name, defaults::QUEUE_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_options(defaults::WORK_QUEUE, capacity)
    }

    fn with_options(name: impl Into<String>, capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity);
        Self {
            name: name.into(),
            tx: StdMutex::new(Some(tx)),
            rx: Mutex::new(rx),
            unacked: StdMutex::new(HashMap::new()),
            dead_letters: StdMutex::new(Vec::new()),
            next_handle: AtomicU64::new(1),
            published: AtomicU64::new(0),
        }
    }

    /// Queue name, as a broker deployment would declare it.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Close the queue. Consumers drain buffered messages, then `consume`
    /// returns `None`. Publishing after close fails.
    pub fn close(&self) {
        self.tx.lock().unwrap().take();
    }

    /// Snapshot of the dead-letter buffer.
    pub fn dead_letters(&self) -> Vec<TaskMessage> {
        self.dead_letters.lock().unwrap().clone()
    }

    /// Number of consumed-but-unsettled deliveries.
    pub fn in_flight(&self) -> usize {
        self.unacked.lock().unwrap().len()
    }

    fn sender(&self) -> Result<mpsc::Sender<TaskMessage>> {
        self.tx
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| Error::Queue("queue is closed".into()))
    }

    fn take_unacked(&self, handle: AckHandle) -> Result<TaskMessage> {
        self.unacked
            .lock()
            .unwrap()
            .remove(&handle.0)
            .ok_or_else(|| Error::Queue(format!("unknown delivery handle {}", handle.0)))
    }
}

impl Default for InMemoryQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TaskQueue for InMemoryQueue {
    async fn publish(&self, message: TaskMessage) -> Result<()> {
        let sender = self.sender()?;
        sender
            .send(message)
            .await
            .map_err(|_| Error::Queue("queue is closed".into()))?;
        self.published.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    async fn consume(&self) -> Result<Option<Delivery>> {
        let mut rx = self.rx.lock().await;
        match rx.recv().await {
            Some(message) => {
                let handle = AckHandle(self.next_handle.fetch_add(1, Ordering::Relaxed));
                self.unacked
                    .lock()
                    .unwrap()
                    .insert(handle.0, message.clone());
                Ok(Some(Delivery { message, handle }))
            }
            None => Ok(None),
        }
    }

    async fn ack(&self, handle: AckHandle) -> Result<()> {
        let message = self.take_unacked(handle)?;
        debug!(queue = %self.name, task_id = %message.task_id, "Delivery acknowledged");
        Ok(())
    }

    async fn reject(&self, handle: AckHandle, requeue: bool) -> Result<()> {
        let mut message = self.take_unacked(handle)?;
        if requeue {
            message.attempt += 1;
            debug!(
                queue = %self.name,
                task_id = %message.task_id,
                attempt = message.attempt,
                "Delivery requeued"
            );
            let sender = self.sender()?;
            sender
                .send(message)
                .await
                .map_err(|_| Error::Queue("queue is closed".into()))?;
        } else {
            warn!(
                queue = %self.name,
                task_id = %message.task_id,
                task_type = %message.task_type,
                attempt = message.attempt,
                "Delivery dead-lettered"
            );
            self.dead_letters.lock().unwrap().push(message);
        }
        Ok(())
    }

    async fn stats(&self) -> Result<QueueStats> {
        Ok(QueueStats {
            published: self.published.load(Ordering::Relaxed),
            in_flight: self.in_flight() as u64,
            dead_lettered: self.dead_letters.lock().unwrap().len() as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use compass_core::TaskType;
    use serde_json::json;

    fn message() -> TaskMessage {
        TaskMessage::new(TaskType::Notification, json!({"message": "hi", "recipient": "r"}))
    }

    #[tokio::test]
    async fn test_publish_consume_ack() {
        let queue = InMemoryQueue::new();
        queue.publish(message()).await.unwrap();

        let delivery = queue.consume().await.unwrap().unwrap();
        assert_eq!(queue.in_flight(), 1);

        queue.ack(delivery.handle).await.unwrap();
        assert_eq!(queue.in_flight(), 0);

        let stats = queue.stats().await.unwrap();
        assert_eq!(stats.published, 1);
        assert_eq!(stats.dead_lettered, 0);
    }

    #[tokio::test]
    async fn test_reject_requeue_increments_attempt() {
        let queue = InMemoryQueue::new();
        queue.publish(message()).await.unwrap();

        let first = queue.consume().await.unwrap().unwrap();
        assert_eq!(first.message.attempt, 0);
        queue.reject(first.handle, true).await.unwrap();

        let second = queue.consume().await.unwrap().unwrap();
        assert_eq!(second.message.task_id, first.message.task_id);
        assert_eq!(second.message.attempt, 1);
    }

    #[tokio::test]
    async fn test_reject_without_requeue_dead_letters() {
        let queue = InMemoryQueue::new();
        queue.publish(message()).await.unwrap();

        let delivery = queue.consume().await.unwrap().unwrap();
        queue.reject(delivery.handle, false).await.unwrap();

        let dead = queue.dead_letters();
        assert_eq!(dead.len(), 1);
        assert_eq!(dead[0].task_id, delivery.message.task_id);
        assert_eq!(queue.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_double_settle_is_an_error() {
        let queue = InMemoryQueue::new();
        queue.publish(message()).await.unwrap();

        let delivery = queue.consume().await.unwrap().unwrap();
        queue.ack(delivery.handle).await.unwrap();
        assert!(queue.ack(delivery.handle).await.is_err());
        assert!(queue.reject(delivery.handle, true).await.is_err());
    }

    #[test]
    fn test_default_queue_name_matches_producer_side() {
        assert_eq!(InMemoryQueue::new().name(), "ai.work.queue");
        assert_eq!(InMemoryQueue::named("ai.result.queue").name(), "ai.result.queue");
    }

    #[tokio::test]
    async fn test_close_drains_then_ends() {
        let queue = InMemoryQueue::new();
        queue.publish(message()).await.unwrap();
        queue.close();

        // Buffered message still delivered.
        let delivery = queue.consume().await.unwrap();
        assert!(delivery.is_some());

        // Then the stream ends.
        assert!(queue.consume().await.unwrap().is_none());

        // And publishing fails.
        assert!(queue.publish(message()).await.is_err());
    }
}
