//! compass-worker - consumer process running the task dispatcher.
//!
//! Wires the queue, vector store, and inference backends (live or offline
//! per configuration), registers every task handler, and runs the
//! dispatcher until a shutdown signal drains it.

mod object_store;

use std::sync::Arc;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use compass_core::{defaults, EmbeddingBackend, GenerationBackend, VectorStore};
use compass_inference::{InferenceConfig, MockBackend, MockEmbedder, OpenAiBackend};
use compass_tasks::{
    Dispatcher, DispatcherConfig, DispatcherEvent, DocumentProcessingHandler,
    EmbeddingGenerationHandler, FileUploadHandler, HandlerRegistry, InMemoryQueue,
    NotificationHandler, PortfolioAnalysisHandler, RecommendHandler, TaskManager,
    VectorInsertHandler,
};
use compass_vector::{ChromaBackend, InMemoryVectorStore};

use object_store::FsObjectStore;

struct Backends {
    embedder: Arc<dyn EmbeddingBackend>,
    generation: Arc<dyn GenerationBackend>,
    activity_store: Arc<dyn VectorStore>,
    recruitment_store: Arc<dyn VectorStore>,
}

fn build_backends(config: &InferenceConfig) -> anyhow::Result<Backends> {
    if config.offline {
        info!("Offline mode: using mock inference and in-memory vector store");
        let store: Arc<dyn VectorStore> = Arc::new(InMemoryVectorStore::new());
        return Ok(Backends {
            embedder: Arc::new(MockEmbedder::new()),
            generation: Arc::new(MockBackend::new()),
            activity_store: store.clone(),
            recruitment_store: store,
        });
    }

    let openai = Arc::new(OpenAiBackend::from_config(config)?);
    Ok(Backends {
        embedder: openai.clone(),
        generation: openai,
        activity_store: Arc::new(ChromaBackend::from_env()),
        recruitment_store: Arc::new(ChromaBackend::from_env().with_collection("recruitments")),
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let inference_config = InferenceConfig::from_env();
    let backends = build_backends(&inference_config)?;

    let queue = Arc::new(InMemoryQueue::new());
    let result_queue = Arc::new(InMemoryQueue::named(defaults::RESULT_QUEUE));
    let manager = Arc::new(TaskManager::new(queue.clone()).with_result_sink(result_queue));

    let registry = HandlerRegistry::new()
        .register(DocumentProcessingHandler::new())
        .register(EmbeddingGenerationHandler::new(
            backends.embedder.clone(),
            backends.activity_store.clone(),
        ))
        .register(FileUploadHandler::new(Arc::new(FsObjectStore::from_env())))
        .register(VectorInsertHandler::new(backends.activity_store.clone()))
        .register(NotificationHandler::new())
        .register(RecommendHandler::activities(
            backends.embedder.clone(),
            backends.activity_store.clone(),
            backends.generation.clone(),
        ))
        .register(RecommendHandler::jobs(
            backends.embedder.clone(),
            backends.recruitment_store.clone(),
            backends.generation.clone(),
        ))
        .register(PortfolioAnalysisHandler::new(backends.generation.clone()));

    info!(
        handlers = registry.len(),
        offline = inference_config.offline,
        "Starting compass worker"
    );

    let dispatcher = Dispatcher::new(queue.clone(), registry, DispatcherConfig::from_env());
    let handle = dispatcher.start();

    // Forward completed-task results to the result queue.
    let mut events = handle.events();
    let forwarder = manager.clone();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            if let DispatcherEvent::TaskCompleted {
                task_id,
                task_type,
                result: Some(result),
            } = event
            {
                if let Err(e) = forwarder.publish_result(&task_id, task_type, result).await {
                    warn!(%task_id, error = %e, "Failed to publish task result");
                }
            }
        }
    });

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received, draining in-flight tasks");

    let stats = manager.stats().await?;
    info!(
        published = stats.published,
        in_flight = stats.in_flight,
        dead_lettered = stats.dead_lettered,
        "Queue stats at shutdown"
    );

    queue.close();
    handle.shutdown().await?;
    info!("Worker stopped");
    Ok(())
}
