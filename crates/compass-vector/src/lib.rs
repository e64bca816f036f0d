//! # compass-vector
//!
//! Vector retrieval for compass: the [`Retriever`] normalizes heterogeneous
//! store responses into ranked, similarity-scored results, backed by either
//! the in-memory store or a Chroma-compatible HTTP service.

pub mod chroma;
pub mod memory;
pub mod retriever;

pub use chroma::ChromaBackend;
pub use memory::InMemoryVectorStore;
pub use retriever::Retriever;
