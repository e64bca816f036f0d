//! Structured logging schema and field name constants for compass.
//!
//! All crates use these constants for consistent structured logging fields,
//! so log aggregation tools can query by standardized field names across
//! every subsystem.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Degraded service, requires operator attention |
//! | WARN  | Recoverable issue, automatic fallback applied |
//! | INFO  | Lifecycle events (startup, shutdown), operation completions |
//! | DEBUG | Decision points, intermediate values, config choices |
//! | TRACE | Per-item iteration, high-volume data (search hits) |

// ─── Identity fields ───────────────────────────────────────────────────────

/// Subsystem originating the log event.
/// Values: "tasks", "vector", "inference", "recommend"
pub const SUBSYSTEM: &str = "subsystem";

/// Logical operation name.
/// Examples: "dispatch", "retrieve", "synthesize", "publish"
pub const OPERATION: &str = "op";

// ─── Entity fields ─────────────────────────────────────────────────────────

/// Task id being processed.
pub const TASK_ID: &str = "task_id";

/// Task type string.
pub const TASK_TYPE: &str = "task_type";

/// Zero-based delivery attempt for the current execution.
pub const ATTEMPT: &str = "attempt";

/// Document id in embedding/vector tasks.
pub const DOCUMENT_ID: &str = "document_id";

// ─── Measurement fields ────────────────────────────────────────────────────

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Number of results returned by a retrieval.
pub const RESULT_COUNT: &str = "result_count";

/// Byte length of a prompt sent to the generation backend.
pub const PROMPT_LEN: &str = "prompt_len";

/// Byte length of a generation response.
pub const RESPONSE_LEN: &str = "response_len";
