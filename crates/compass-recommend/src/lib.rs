//! # compass-recommend
//!
//! The recommendation synthesis stage: turns a user profile plus ranked
//! retrieval context into a schema-validated [`RecommendationResult`] via
//! an injected generation backend.
//!
//! [`RecommendationResult`]: compass_core::RecommendationResult

pub mod context;
pub mod query;
pub mod synthesizer;

pub use context::{context_window, render_context};
pub use query::{build_portfolio_text, build_profile_query};
pub use synthesizer::RecommendationSynthesizer;
