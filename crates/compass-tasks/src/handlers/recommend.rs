//! Metadata-filtered recommendation: compile filters, embed the profile
//! query, retrieve scoped context, and synthesize a structured result.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use tracing::{debug, info};

use compass_core::{
    EmbeddingBackend, Error, GenerationBackend, MetadataFilter, Result, SynthesisKind, TaskType,
    UserProfile, VectorStore,
};
use compass_recommend::{build_profile_query, RecommendationSynthesizer};
use compass_vector::Retriever;

use crate::outcome::TaskOutcome;
use crate::registry::{TaskContext, TaskHandler};

/// Handler for both recommendation task types; the kind decides the query
/// builder and the response schema.
pub struct RecommendHandler {
    task_type: TaskType,
    kind: SynthesisKind,
    embedder: Arc<dyn EmbeddingBackend>,
    retriever: Retriever,
    synthesizer: RecommendationSynthesizer,
}

impl RecommendHandler {
    /// Activity recommendations over the given store and backends.
    pub fn activities(
        embedder: Arc<dyn EmbeddingBackend>,
        store: Arc<dyn VectorStore>,
        backend: Arc<dyn GenerationBackend>,
    ) -> Self {
        Self {
            task_type: TaskType::RecommendActivities,
            kind: SynthesisKind::Activities,
            embedder,
            retriever: Retriever::new(store),
            synthesizer: RecommendationSynthesizer::new(backend),
        }
    }

    /// Job recommendations over the given store and backends.
    pub fn jobs(
        embedder: Arc<dyn EmbeddingBackend>,
        store: Arc<dyn VectorStore>,
        backend: Arc<dyn GenerationBackend>,
    ) -> Self {
        Self {
            task_type: TaskType::RecommendJobs,
            kind: SynthesisKind::Jobs,
            embedder,
            retriever: Retriever::new(store),
            synthesizer: RecommendationSynthesizer::new(backend),
        }
    }

    async fn recommend(&self, ctx: &TaskContext) -> Result<Option<JsonValue>> {
        let profile = UserProfile::from_value(ctx.require("user_profile")?.clone())?;
        let predicate = MetadataFilter::from_value(ctx.require("metadata_filters")?)?.compile()?;
        let n_results = parse_n_results(ctx.require("n_results")?)?;

        let query_text = build_profile_query(&profile, self.kind);
        debug!(user_id = %profile.user_id, %query_text, "Built profile query");

        let embedding = self.embedder.embed(&query_text).await?;
        let items = self
            .retriever
            .retrieve(&embedding, &predicate, n_results)
            .await?;
        info!(
            user_id = %profile.user_id,
            result_count = items.len(),
            "Retrieval complete, synthesizing"
        );

        let result = self.synthesizer.synthesize(&profile, &items, self.kind).await?;
        Ok(Some(serde_json::to_value(&result)?))
    }
}

fn parse_n_results(value: &JsonValue) -> Result<usize> {
    value
        .as_u64()
        .map(|n| n as usize)
        .ok_or_else(|| Error::Validation("n_results must be a non-negative integer".into()))
}

#[async_trait]
impl TaskHandler for RecommendHandler {
    fn task_type(&self) -> TaskType {
        self.task_type.clone()
    }

    async fn execute(&self, ctx: TaskContext) -> TaskOutcome {
        TaskOutcome::from_result(self.recommend(&ctx).await)
    }
}
