//! # compass-tasks
//!
//! Task dispatch engine for compass.
//!
//! This crate provides:
//! - Typed task messages with per-type payload validation
//! - A handler registry resolving task types to handlers at startup
//! - A dispatcher consuming the work queue under a bounded concurrency
//!   ceiling with retry/dead-letter semantics
//! - The producer-side task manager façade
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use compass_tasks::{
//!     Dispatcher, DispatcherConfig, HandlerRegistry, InMemoryQueue, NotificationHandler,
//! };
//!
//! let queue = Arc::new(InMemoryQueue::new());
//! let registry = HandlerRegistry::new().register(NotificationHandler::new());
//!
//! let dispatcher = Dispatcher::new(queue.clone(), registry, DispatcherConfig::from_env());
//! let handle = dispatcher.start();
//!
//! // ... publish work, then:
//! handle.shutdown().await?;
//! ```

pub mod dispatcher;
pub mod handlers;
pub mod manager;
pub mod outcome;
pub mod queue;
pub mod registry;
pub mod validate;

pub use dispatcher::{Dispatcher, DispatcherConfig, DispatcherEvent, DispatcherHandle};
pub use handlers::{
    DocumentProcessingHandler, EmbeddingGenerationHandler, FileUploadHandler, NotificationHandler,
    PortfolioAnalysisHandler, RecommendHandler, VectorInsertHandler,
};
pub use manager::TaskManager;
pub use outcome::{ack_action, AckAction, TaskOutcome};
pub use queue::InMemoryQueue;
pub use registry::{HandlerRegistry, NoOpHandler, TaskContext, TaskHandler};
pub use validate::{required_fields, validate_payload};
