//! Task dispatcher: the consumer loop routing queue deliveries to handlers
//! under a bounded concurrency ceiling, with retry/dead-letter semantics.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{broadcast, mpsc, Semaphore};
use tokio::task::JoinSet;
use tokio::time::sleep;
use tracing::{error, info, instrument, warn};

use compass_core::{defaults, Delivery, Error, TaskMessage, TaskQueue, TaskType};

use crate::outcome::{ack_action, AckAction, TaskOutcome};
use crate::registry::{HandlerRegistry, TaskContext};
use crate::validate::validate_payload;

/// Configuration for the dispatcher.
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Maximum number of tasks executing concurrently.
    pub max_concurrent_tasks: usize,
    /// Total delivery attempts before a retryable failure dead-letters.
    pub max_attempts: u32,
    /// Per-task execution timeout in seconds.
    pub task_timeout_secs: u64,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            max_concurrent_tasks: defaults::MAX_CONCURRENT_TASKS,
            max_attempts: defaults::MAX_ATTEMPTS,
            task_timeout_secs: defaults::TASK_TIMEOUT_SECS,
        }
    }
}

impl DispatcherConfig {
    /// Create config from environment variables (with defaults).
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `COMPASS_MAX_CONCURRENT` | `4` | Max concurrent tasks |
    /// | `COMPASS_MAX_ATTEMPTS` | `3` | Delivery attempts before dead-letter |
    /// | `COMPASS_TASK_TIMEOUT_SECS` | `120` | Per-task timeout |
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let max_concurrent_tasks = std::env::var("COMPASS_MAX_CONCURRENT")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(defaults.max_concurrent_tasks)
            .max(1);

        let max_attempts = std::env::var("COMPASS_MAX_ATTEMPTS")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(defaults.max_attempts)
            .max(1);

        let task_timeout_secs = std::env::var("COMPASS_TASK_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(defaults.task_timeout_secs);

        Self {
            max_concurrent_tasks,
            max_attempts,
            task_timeout_secs,
        }
    }

    /// Set maximum concurrent tasks.
    pub fn with_max_concurrent(mut self, max: usize) -> Self {
        self.max_concurrent_tasks = max.max(1);
        self
    }

    /// Set the delivery attempt ceiling.
    pub fn with_max_attempts(mut self, max: u32) -> Self {
        self.max_attempts = max.max(1);
        self
    }

    /// Set the per-task timeout.
    pub fn with_task_timeout(mut self, secs: u64) -> Self {
        self.task_timeout_secs = secs;
        self
    }
}

/// Event emitted by the dispatcher.
#[derive(Debug, Clone)]
pub enum DispatcherEvent {
    /// Dispatcher started consuming.
    Started,
    /// Dispatcher stopped after draining in-flight tasks.
    Stopped,
    /// A task began executing.
    TaskStarted {
        task_id: String,
        task_type: TaskType,
        attempt: u32,
    },
    /// A task completed and was acknowledged. Carries the handler's result
    /// value for forwarding to the result queue or other sinks.
    TaskCompleted {
        task_id: String,
        task_type: TaskType,
        result: Option<serde_json::Value>,
    },
    /// A task failed retryably and was requeued.
    TaskRetrying {
        task_id: String,
        task_type: TaskType,
        attempt: u32,
        reason: String,
    },
    /// A task was dead-lettered.
    TaskDeadLettered {
        task_id: String,
        task_type: TaskType,
        attempt: u32,
        reason: String,
    },
}

/// Handle for controlling a running dispatcher.
pub struct DispatcherHandle {
    shutdown_tx: mpsc::Sender<()>,
    event_rx: broadcast::Receiver<DispatcherEvent>,
    join: tokio::task::JoinHandle<()>,
}

impl DispatcherHandle {
    /// Signal a graceful shutdown and wait for in-flight tasks to drain.
    pub async fn shutdown(self) -> compass_core::Result<()> {
        // The loop may already have exited (queue closed); that is fine.
        let _ = self.shutdown_tx.send(()).await;
        self.join
            .await
            .map_err(|e| Error::Internal(format!("dispatcher task failed: {}", e)))
    }

    /// Get a receiver for dispatcher events.
    pub fn events(&self) -> broadcast::Receiver<DispatcherEvent> {
        self.event_rx.resubscribe()
    }
}

/// Task dispatcher consuming from the work queue.
pub struct Dispatcher {
    queue: Arc<dyn TaskQueue>,
    registry: Arc<HandlerRegistry>,
    config: DispatcherConfig,
    event_tx: broadcast::Sender<DispatcherEvent>,
}

impl Dispatcher {
    pub fn new(
        queue: Arc<dyn TaskQueue>,
        registry: HandlerRegistry,
        config: DispatcherConfig,
    ) -> Self {
        let (event_tx, _) = broadcast::channel(defaults::EVENT_BUS_CAPACITY);
        Self {
            queue,
            registry: Arc::new(registry),
            config,
            event_tx,
        }
    }

    /// Get a receiver for dispatcher events.
    pub fn events(&self) -> broadcast::Receiver<DispatcherEvent> {
        self.event_tx.subscribe()
    }

    /// Start the consumer loop and return a handle for control.
    pub fn start(self) -> DispatcherHandle {
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        let event_rx = self.event_tx.subscribe();

        let join = tokio::spawn(async move {
            self.run(shutdown_rx).await;
        });

        DispatcherHandle {
            shutdown_tx,
            event_rx,
            join,
        }
    }

    /// The consumer loop.
    ///
    /// A worker slot (semaphore permit) is acquired *before* pulling a
    /// message, so when all slots are busy the message stays in the queue:
    /// backpressure, not buffering. Shutdown stops consumption and drains
    /// in-flight tasks to completion (or their timeout); nothing is
    /// abandoned unsettled.
    #[instrument(skip(self, shutdown_rx))]
    async fn run(&self, mut shutdown_rx: mpsc::Receiver<()>) {
        info!(
            max_concurrent = self.config.max_concurrent_tasks,
            max_attempts = self.config.max_attempts,
            timeout_secs = self.config.task_timeout_secs,
            "Dispatcher started"
        );
        let _ = self.event_tx.send(DispatcherEvent::Started);

        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent_tasks));
        let mut tasks: JoinSet<()> = JoinSet::new();

        loop {
            // Reap finished tasks so the set does not grow unbounded.
            while tasks.try_join_next().is_some() {}

            let permit = tokio::select! {
                _ = shutdown_rx.recv() => {
                    info!("Dispatcher received shutdown signal");
                    break;
                }
                permit = semaphore.clone().acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };

            let delivery = tokio::select! {
                _ = shutdown_rx.recv() => {
                    info!("Dispatcher received shutdown signal");
                    drop(permit);
                    break;
                }
                delivery = self.queue.consume() => match delivery {
                    Ok(Some(delivery)) => delivery,
                    Ok(None) => {
                        info!("Work queue closed, stopping dispatcher");
                        drop(permit);
                        break;
                    }
                    Err(e) => {
                        error!(error = %e, "Failed to consume from queue");
                        drop(permit);
                        sleep(Duration::from_millis(200)).await;
                        continue;
                    }
                },
            };

            let worker = self.clone_refs();
            tasks.spawn(async move {
                worker.execute(delivery).await;
                drop(permit);
            });
        }

        // Graceful drain: every in-flight task finishes (or hits its
        // timeout) and settles its delivery before we stop.
        while let Some(result) = tasks.join_next().await {
            if let Err(e) = result {
                error!(error = ?e, "Dispatched task panicked outside the handler guard");
            }
        }

        let _ = self.event_tx.send(DispatcherEvent::Stopped);
        info!("Dispatcher stopped");
    }

    /// Clone references needed for a spawned task execution.
    fn clone_refs(&self) -> DispatcherRef {
        DispatcherRef {
            queue: self.queue.clone(),
            registry: self.registry.clone(),
            config: self.config.clone(),
            event_tx: self.event_tx.clone(),
        }
    }
}

/// Lightweight reference bundle for executing one delivery in a spawned
/// task.
struct DispatcherRef {
    queue: Arc<dyn TaskQueue>,
    registry: Arc<HandlerRegistry>,
    config: DispatcherConfig,
    event_tx: broadcast::Sender<DispatcherEvent>,
}

impl DispatcherRef {
    /// Execute one delivery and settle it with the queue.
    async fn execute(&self, delivery: Delivery) {
        let start = Instant::now();
        let Delivery { message, handle } = delivery;
        let task_id = message.task_id.clone();
        let task_type = message.task_type.clone();
        let attempt = message.attempt;

        info!(%task_id, %task_type, attempt, "Processing task");
        let _ = self.event_tx.send(DispatcherEvent::TaskStarted {
            task_id: task_id.clone(),
            task_type: task_type.clone(),
            attempt,
        });

        let outcome = self.run_handler(message).await;
        let action = ack_action(&outcome, attempt, self.config.max_attempts);
        let duration_ms = start.elapsed().as_millis() as u64;

        let settle = match action {
            AckAction::Ack => {
                info!(%task_id, %task_type, duration_ms, "Task completed");
                let result = match &outcome {
                    TaskOutcome::Success(value) => value.clone(),
                    _ => None,
                };
                let _ = self.event_tx.send(DispatcherEvent::TaskCompleted {
                    task_id: task_id.clone(),
                    task_type: task_type.clone(),
                    result,
                });
                self.queue.ack(handle).await
            }
            AckAction::Requeue => {
                let reason = outcome.reason().unwrap_or_default().to_string();
                warn!(%task_id, %task_type, attempt, duration_ms, %reason, "Task failed, requeueing");
                let _ = self.event_tx.send(DispatcherEvent::TaskRetrying {
                    task_id: task_id.clone(),
                    task_type: task_type.clone(),
                    attempt,
                    reason,
                });
                self.queue.reject(handle, true).await
            }
            AckAction::DeadLetter => {
                let reason = outcome.reason().unwrap_or_default().to_string();
                error!(
                    %task_id,
                    %task_type,
                    attempt,
                    duration_ms,
                    %reason,
                    "Task dead-lettered; operator resubmission required"
                );
                let _ = self.event_tx.send(DispatcherEvent::TaskDeadLettered {
                    task_id: task_id.clone(),
                    task_type: task_type.clone(),
                    attempt,
                    reason,
                });
                self.queue.reject(handle, false).await
            }
        };

        if let Err(e) = settle {
            error!(%task_id, error = %e, "Failed to settle delivery with queue");
        }
    }

    /// Run the handler for a message, guarding the dispatch loop against
    /// unknown types, invalid payloads, timeouts, and panics.
    async fn run_handler(&self, message: TaskMessage) -> TaskOutcome {
        // Unknown task type: dead-letter immediately, retrying cannot
        // conjure a handler.
        let Some(handler) = self.registry.get(&message.task_type) else {
            warn!(task_type = %message.task_type, "No handler registered for task type");
            return Error::UnknownTaskType(message.task_type.to_string()).into();
        };

        // Validation runs before the handler touches any collaborator.
        if let Err(e) = validate_payload(&message.task_type, &message.payload) {
            return e.into();
        }

        let timeout = Duration::from_secs(self.config.task_timeout_secs);
        let ctx = TaskContext::new(message);

        // The handler runs in its own task so a panic is contained to this
        // delivery rather than tearing down a worker slot.
        let mut execution = tokio::spawn(async move { handler.execute(ctx).await });

        match tokio::time::timeout(timeout, &mut execution).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(join_err)) if join_err.is_panic() => {
                warn!("Handler panicked; treating as transient");
                TaskOutcome::Retryable("handler panicked".to_string())
            }
            Ok(Err(_)) => TaskOutcome::Retryable("handler task cancelled".to_string()),
            Err(_) => {
                execution.abort();
                warn!(timeout_secs = self.config.task_timeout_secs, "Handler timed out");
                TaskOutcome::Retryable(format!(
                    "task exceeded timeout of {}s",
                    self.config.task_timeout_secs
                ))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = DispatcherConfig::default();
        assert_eq!(config.max_concurrent_tasks, defaults::MAX_CONCURRENT_TASKS);
        assert_eq!(config.max_attempts, defaults::MAX_ATTEMPTS);
        assert_eq!(config.task_timeout_secs, defaults::TASK_TIMEOUT_SECS);
    }

    #[test]
    fn test_config_builders() {
        let config = DispatcherConfig::default()
            .with_max_concurrent(8)
            .with_max_attempts(5)
            .with_task_timeout(30);

        assert_eq!(config.max_concurrent_tasks, 8);
        assert_eq!(config.max_attempts, 5);
        assert_eq!(config.task_timeout_secs, 30);
    }

    #[test]
    fn test_config_floors_at_one() {
        let config = DispatcherConfig::default()
            .with_max_concurrent(0)
            .with_max_attempts(0);
        assert_eq!(config.max_concurrent_tasks, 1);
        assert_eq!(config.max_attempts, 1);
    }
}
