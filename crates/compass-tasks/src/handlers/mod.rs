//! Handlers for each recognized task type.

mod document;
mod embedding;
mod notification;
mod portfolio;
mod recommend;
mod upload;
mod vector_insert;

pub use document::DocumentProcessingHandler;
pub use embedding::EmbeddingGenerationHandler;
pub use notification::NotificationHandler;
pub use portfolio::PortfolioAnalysisHandler;
pub use recommend::RecommendHandler;
pub use upload::FileUploadHandler;
pub use vector_insert::VectorInsertHandler;
