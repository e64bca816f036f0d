//! Centralized default constants for the compass system.
//!
//! **This module is the single source of truth** for all shared default
//! values. All crates reference these constants instead of defining their
//! own magic numbers.
//!
//! Organized by domain area. When adding new constants, place them in the
//! appropriate section and document the rationale for the chosen value.

// =============================================================================
// DISPATCH
// =============================================================================

/// Maximum delivery attempts before a retryable task is dead-lettered.
pub const MAX_ATTEMPTS: u32 = 3;

/// Maximum number of tasks executing concurrently.
pub const MAX_CONCURRENT_TASKS: usize = 4;

/// Per-task execution timeout (seconds). A timeout counts as a retryable
/// failure, not a fatal one.
pub const TASK_TIMEOUT_SECS: u64 = 120;

/// Capacity of the dispatcher event broadcast channel.
pub const EVENT_BUS_CAPACITY: usize = 256;

/// Buffered capacity of the in-memory work queue.
pub const QUEUE_CAPACITY: usize = 1024;

/// Default work queue name (matches the producer side).
pub const WORK_QUEUE: &str = "ai.work.queue";

/// Default result queue name.
pub const RESULT_QUEUE: &str = "ai.result.queue";

// =============================================================================
// RETRIEVAL
// =============================================================================

/// Default embedding vector dimension.
pub const EMBED_DIMENSION: usize = 384;

/// Default Chroma-compatible vector store endpoint.
pub const CHROMA_URL: &str = "http://localhost:8000";

/// Timeout for vector store queries (seconds).
pub const QUERY_TIMEOUT_SECS: u64 = 30;

// =============================================================================
// SYNTHESIS
// =============================================================================

/// Maximum retrieved items included in the synthesis context. Retrieval may
/// return more; the context keeps the highest-similarity prefix.
pub const CONTEXT_ITEM_CAP: usize = 5;

/// Characters of source text quoted per context item.
pub const CONTEXT_EXCERPT_CHARS: usize = 200;

/// Default generation endpoint (OpenAI-compatible).
pub const OPENAI_URL: &str = "https://api.openai.com/v1";

/// Default generation model.
pub const GEN_MODEL: &str = "gpt-4o-mini";

/// Default embedding model (OpenAI-compatible).
pub const OPENAI_EMBED_MODEL: &str = "text-embedding-3-small";

/// Embedding dimension produced by the default embedding model.
pub const OPENAI_EMBED_DIMENSION: usize = 1536;

/// Timeout for generation requests (seconds).
pub const GEN_TIMEOUT_SECS: u64 = 60;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dispatch_defaults_sane() {
        assert!(MAX_ATTEMPTS >= 1);
        assert!(MAX_CONCURRENT_TASKS >= 1);
        assert!(TASK_TIMEOUT_SECS > 0);
    }

    #[test]
    fn test_context_bounds_sane() {
        assert!(CONTEXT_ITEM_CAP >= 1);
        assert!(CONTEXT_EXCERPT_CHARS >= 1);
    }
}
