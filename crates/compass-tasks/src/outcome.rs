//! Task outcomes and the outcome-to-acknowledgment mapping.

use compass_core::Error;
use serde_json::Value as JsonValue;

/// Result of a handler execution. Every handler exit is one of these;
/// nothing escapes a handler boundary uncaught.
#[derive(Debug)]
pub enum TaskOutcome {
    /// Task completed; optional result data for the result queue.
    Success(Option<JsonValue>),
    /// Task failed but may succeed on redelivery.
    Retryable(String),
    /// Task failed and redelivery cannot help.
    Fatal(String),
}

impl TaskOutcome {
    /// Short reason string for failed outcomes.
    pub fn reason(&self) -> Option<&str> {
        match self {
            TaskOutcome::Success(_) => None,
            TaskOutcome::Retryable(reason) | TaskOutcome::Fatal(reason) => Some(reason),
        }
    }

    /// Convert a handler body's `Result` into an outcome using the error
    /// taxonomy's retryability classification.
    pub fn from_result(result: compass_core::Result<Option<JsonValue>>) -> Self {
        match result {
            Ok(value) => TaskOutcome::Success(value),
            Err(e) => e.into(),
        }
    }
}

impl From<Error> for TaskOutcome {
    fn from(e: Error) -> Self {
        if e.is_retryable() {
            TaskOutcome::Retryable(e.to_string())
        } else {
            TaskOutcome::Fatal(e.to_string())
        }
    }
}

/// What the dispatcher tells the queue about a settled delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckAction {
    /// Acknowledge and discard.
    Ack,
    /// Reject with requeue for another attempt.
    Requeue,
    /// Reject without requeue; route to the dead-letter destination.
    DeadLetter,
}

/// The total mapping from outcome and attempt count to acknowledgment
/// action. `attempt` is the zero-based index of the execution that just
/// finished, so a task is executed exactly `max_attempts` times before a
/// retryable failure dead-letters.
pub fn ack_action(outcome: &TaskOutcome, attempt: u32, max_attempts: u32) -> AckAction {
    match outcome {
        TaskOutcome::Success(_) => AckAction::Ack,
        TaskOutcome::Retryable(_) if attempt + 1 < max_attempts => AckAction::Requeue,
        TaskOutcome::Retryable(_) => AckAction::DeadLetter,
        TaskOutcome::Fatal(_) => AckAction::DeadLetter,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_success_always_acks() {
        for attempt in 0..5 {
            let action = ack_action(&TaskOutcome::Success(None), attempt, 3);
            assert_eq!(action, AckAction::Ack);
        }
        let action = ack_action(&TaskOutcome::Success(Some(json!({"ok": true}))), 0, 3);
        assert_eq!(action, AckAction::Ack);
    }

    #[test]
    fn test_retryable_requeues_until_ceiling() {
        let outcome = TaskOutcome::Retryable("store unreachable".into());
        assert_eq!(ack_action(&outcome, 0, 3), AckAction::Requeue);
        assert_eq!(ack_action(&outcome, 1, 3), AckAction::Requeue);
        assert_eq!(ack_action(&outcome, 2, 3), AckAction::DeadLetter);
        assert_eq!(ack_action(&outcome, 7, 3), AckAction::DeadLetter);
    }

    #[test]
    fn test_fatal_dead_letters_on_first_attempt() {
        let outcome = TaskOutcome::Fatal("bad payload".into());
        assert_eq!(ack_action(&outcome, 0, 3), AckAction::DeadLetter);
        assert_eq!(ack_action(&outcome, 1, 3), AckAction::DeadLetter);
    }

    #[test]
    fn test_single_attempt_ceiling() {
        let outcome = TaskOutcome::Retryable("x".into());
        assert_eq!(ack_action(&outcome, 0, 1), AckAction::DeadLetter);
    }

    #[test]
    fn test_error_conversion_follows_taxonomy() {
        let retryable: TaskOutcome = Error::Transient("timeout".into()).into();
        assert!(matches!(retryable, TaskOutcome::Retryable(_)));

        let fatal: TaskOutcome = Error::Validation("missing field".into()).into();
        assert!(matches!(fatal, TaskOutcome::Fatal(_)));

        let fatal: TaskOutcome = Error::Schema("missing 'title'".into()).into();
        assert!(matches!(fatal, TaskOutcome::Fatal(_)));
    }

    #[test]
    fn test_from_result() {
        let ok = TaskOutcome::from_result(Ok(Some(json!(1))));
        assert!(matches!(ok, TaskOutcome::Success(Some(_))));

        let err = TaskOutcome::from_result(Err(Error::Transient("x".into())));
        assert_eq!(err.reason(), Some("Transient error: x"));
    }
}
