//! Portfolio analysis: render the submitted activity/education records
//! into portfolio text and synthesize a strength/weakness analysis.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value as JsonValue};
use tracing::info;

use compass_core::{Error, GenerationBackend, Result, SynthesisKind, TaskType, UserProfile};
use compass_recommend::{build_portfolio_text, RecommendationSynthesizer};

use crate::outcome::TaskOutcome;
use crate::registry::{TaskContext, TaskHandler};

pub struct PortfolioAnalysisHandler {
    synthesizer: RecommendationSynthesizer,
}

impl PortfolioAnalysisHandler {
    pub fn new(backend: Arc<dyn GenerationBackend>) -> Self {
        Self {
            synthesizer: RecommendationSynthesizer::new(backend),
        }
    }

    async fn analyze(&self, ctx: &TaskContext) -> Result<Option<JsonValue>> {
        let user_id = user_id_field(ctx)?;
        let activities = array_field(ctx, "activities")?;
        let educations = array_field(ctx, "educations")?;

        let portfolio_text = build_portfolio_text(&activities, &educations);
        let profile =
            UserProfile::new(user_id.clone()).with_attr("portfolio_text", json!(portfolio_text));

        let result = self
            .synthesizer
            .synthesize(&profile, &[], SynthesisKind::PortfolioAnalysis)
            .await?;

        info!(user_id = %user_id, "Portfolio analysis complete");
        Ok(Some(json!({
            "user_id": user_id,
            "analysis": serde_json::to_value(&result)?,
        })))
    }
}

/// The analysis producer spells the user id "userId"; direct submissions
/// use "user_id". Either is accepted, neither is optional.
fn user_id_field(ctx: &TaskContext) -> Result<String> {
    let value = ctx
        .payload()
        .get("user_id")
        .or_else(|| ctx.payload().get("userId"))
        .ok_or_else(|| Error::Validation("analyze_portfolio: missing user id".into()))?;
    match value {
        JsonValue::String(s) => Ok(s.clone()),
        JsonValue::Number(n) => Ok(n.to_string()),
        _ => Err(Error::Validation(
            "user_id must be a string or integer".into(),
        )),
    }
}

fn array_field(ctx: &TaskContext, field: &str) -> Result<Vec<JsonValue>> {
    ctx.require(field)?
        .as_array()
        .cloned()
        .ok_or_else(|| Error::Validation(format!("'{}' must be an array", field)))
}

#[async_trait]
impl TaskHandler for PortfolioAnalysisHandler {
    fn task_type(&self) -> TaskType {
        TaskType::AnalyzePortfolio
    }

    async fn execute(&self, ctx: TaskContext) -> TaskOutcome {
        TaskOutcome::from_result(self.analyze(&ctx).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use compass_core::TaskMessage;
    use compass_inference::MockBackend;

    fn ctx(payload: JsonValue) -> TaskContext {
        TaskContext::new(TaskMessage::new(TaskType::AnalyzePortfolio, payload))
    }

    #[tokio::test]
    async fn test_mock_mode_returns_exactly_three_analysis_keys() {
        let backend = Arc::new(MockBackend::new());
        let handler = PortfolioAnalysisHandler::new(backend.clone());

        let outcome = handler
            .execute(ctx(json!({
                "user_id": 42,
                "activities": [{"title": "hackathon", "description": "48h build"}],
                "educations": [{"school": "KAIST", "major": "CS", "grade": "3.9"}]
            })))
            .await;

        let TaskOutcome::Success(Some(value)) = outcome else {
            panic!("expected success");
        };
        assert_eq!(value["user_id"], "42");
        assert_eq!(value["analysis"]["success"], true);

        let analysis = value["analysis"]["recommendations"][0].as_object().unwrap();
        assert_eq!(analysis.len(), 3);
        assert!(analysis.contains_key("strength"));
        assert!(analysis.contains_key("weakness"));
        assert!(analysis.contains_key("recommend_position"));

        // One generative call, no retrieval involved.
        assert_eq!(backend.call_count(), 1);
    }

    #[tokio::test]
    async fn test_prompt_carries_portfolio_text() {
        let backend = Arc::new(MockBackend::new());
        let handler = PortfolioAnalysisHandler::new(backend.clone());

        handler
            .execute(ctx(json!({
                "user_id": "u1",
                "activities": [{"title": "Open source sprint"}],
                "educations": []
            })))
            .await;

        let calls = backend.calls();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].prompt.contains("Open source sprint"));
    }

    #[tokio::test]
    async fn test_accepts_camel_case_producer_keys() {
        let backend = Arc::new(MockBackend::new());
        let handler = PortfolioAnalysisHandler::new(backend);

        let outcome = handler
            .execute(ctx(json!({
                "userId": 7,
                "activities": [],
                "educations": []
            })))
            .await;

        let TaskOutcome::Success(Some(value)) = outcome else {
            panic!("expected success");
        };
        assert_eq!(value["user_id"], "7");
    }

    #[tokio::test]
    async fn test_missing_user_id_is_fatal() {
        let backend = Arc::new(MockBackend::new());
        let handler = PortfolioAnalysisHandler::new(backend.clone());

        let outcome = handler
            .execute(ctx(json!({"activities": [], "educations": []})))
            .await;
        assert!(matches!(outcome, TaskOutcome::Fatal(_)));
        assert_eq!(backend.call_count(), 0);
    }

    #[tokio::test]
    async fn test_missing_educations_fails_before_any_backend_call() {
        let backend = Arc::new(MockBackend::new());
        let handler = PortfolioAnalysisHandler::new(backend.clone());

        let outcome = handler
            .execute(ctx(json!({"user_id": "u1", "activities": []})))
            .await;
        assert!(matches!(outcome, TaskOutcome::Fatal(_)));
        assert_eq!(backend.call_count(), 0);
    }

    #[tokio::test]
    async fn test_non_array_records_are_fatal() {
        let handler = PortfolioAnalysisHandler::new(Arc::new(MockBackend::new()));

        let outcome = handler
            .execute(ctx(json!({
                "user_id": "u1",
                "activities": "not an array",
                "educations": []
            })))
            .await;
        assert!(matches!(outcome, TaskOutcome::Fatal(_)));
    }
}
