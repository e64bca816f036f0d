//! # compass-core
//!
//! Core types, traits, and abstractions for the compass pipeline.
//!
//! This crate provides the foundational data structures and trait
//! definitions that other compass crates depend on: the task message
//! model, the metadata filter compiler, the error taxonomy, and the
//! collaborator seams (queue, vector store, generation, embedding).

pub mod defaults;
pub mod error;
pub mod filter;
pub mod logging;
pub mod models;
pub mod traits;

// Re-export commonly used types at crate root
pub use error::{Error, Result};
pub use filter::{CompiledClause, CompiledPredicate, FilterConstraint, MetadataFilter};
pub use models::{
    QueueStats, RecommendationItem, RecommendationResult, RetrievedItem, SynthesisKind,
    TaskMessage, TaskType, UserProfile,
};
pub use traits::{
    AckHandle, CompletionRequest, Delivery, EmbeddingBackend, GenerationBackend, ObjectStore,
    StoreMatch, StoreScore, TaskQueue, VectorStore,
};
