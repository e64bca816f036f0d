//! # compass-inference
//!
//! Generation and embedding backends for compass: a live OpenAI-compatible
//! HTTP backend and deterministic mocks for offline mode. Both sides of
//! each pair implement the same `compass-core` traits, so downstream code
//! never branches on mode.

pub mod config;
pub mod mock;
pub mod openai;

pub use config::InferenceConfig;
pub use mock::{MockBackend, MockCall, MockEmbedder};
pub use openai::OpenAiBackend;
