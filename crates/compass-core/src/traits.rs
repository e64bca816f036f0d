//! Collaborator traits for compass abstractions.
//!
//! These traits define the seams to the external services the pipeline
//! consumes (queue, vector store, generation, embedding, blob store),
//! enabling pluggable backends and testability. The wire protocols behind
//! them are collaborator-owned.

use async_trait::async_trait;
use serde_json::{Map, Value as JsonValue};

use crate::error::Result;
use crate::filter::CompiledPredicate;
use crate::models::{SynthesisKind, TaskMessage};

// =============================================================================
// TASK QUEUE
// =============================================================================

/// Opaque per-delivery acknowledgment token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AckHandle(pub u64);

/// One delivered message plus the handle needed to settle it.
#[derive(Debug)]
pub struct Delivery {
    pub message: TaskMessage,
    pub handle: AckHandle,
}

/// Work queue with at-least-once delivery semantics.
///
/// Every consumed delivery must be settled exactly once: `ack` discards it,
/// `reject(requeue=true)` redelivers with the attempt counter incremented,
/// `reject(requeue=false)` routes it to the dead-letter destination.
#[async_trait]
pub trait TaskQueue: Send + Sync {
    /// Publish a message (fire-and-forget).
    async fn publish(&self, message: TaskMessage) -> Result<()>;

    /// Pull the next delivery. Returns `None` once the queue is closed and
    /// drained; blocks while the queue is empty but open.
    async fn consume(&self) -> Result<Option<Delivery>>;

    /// Acknowledge: the task is done, discard the message.
    async fn ack(&self, handle: AckHandle) -> Result<()>;

    /// Reject: requeue for another attempt, or dead-letter.
    async fn reject(&self, handle: AckHandle, requeue: bool) -> Result<()>;

    /// Queue statistics (published, in-flight, dead-lettered).
    async fn stats(&self) -> Result<crate::models::QueueStats>;
}

// =============================================================================
// VECTOR STORE
// =============================================================================

/// Raw relevance score as reported by a vector store.
///
/// Stores disagree on shape: some report similarities (higher is closer),
/// some distances (lower is closer). The retriever normalizes to a
/// similarity in [0, 1] before anything downstream sees the value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StoreScore {
    Similarity(f32),
    Distance(f32),
}

/// One raw match from a vector store query.
#[derive(Debug, Clone)]
pub struct StoreMatch {
    pub id: String,
    pub score: StoreScore,
    pub metadata: Map<String, JsonValue>,
    pub document: String,
}

/// Similarity-search service with metadata filtering.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Nearest-neighbor query scoped by the compiled predicate. May return
    /// fewer than `limit` matches; never errors on an empty result.
    async fn query(
        &self,
        embedding: &[f32],
        predicate: &CompiledPredicate,
        limit: usize,
    ) -> Result<Vec<StoreMatch>>;

    /// Insert or overwrite the record for `id`. Re-inserting the same id is
    /// an overwrite, not a duplicate.
    async fn upsert(
        &self,
        id: &str,
        embedding: Vec<f32>,
        metadata: Map<String, JsonValue>,
        document: String,
    ) -> Result<()>;
}

// =============================================================================
// GENERATION
// =============================================================================

/// Structured request to the generative service.
///
/// The synthesizer owns the prompt wording; the backend owns transport.
/// `kind` travels with the request so offline backends can answer with the
/// matching schema.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub kind: SynthesisKind,
    pub system: String,
    pub prompt: String,
}

/// Text-completion service returning a raw (expected-JSON) response body.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<String>;
}

// =============================================================================
// EMBEDDING
// =============================================================================

/// Embedding service mapping text to a fixed-dimension vector.
#[async_trait]
pub trait EmbeddingBackend: Send + Sync {
    /// Embedding dimension this backend produces.
    fn dimension(&self) -> usize;

    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

// =============================================================================
// BLOB STORE
// =============================================================================

/// Object storage collaborator for the file-upload task.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put(&self, local_path: &str, bucket: &str, object: &str) -> Result<()>;
}
