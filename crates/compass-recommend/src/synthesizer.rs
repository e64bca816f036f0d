//! Recommendation synthesis: structured prompt construction, generative
//! call, and response schema validation.

use std::sync::Arc;
use std::time::Instant;

use serde_json::Value as JsonValue;
use tracing::{debug, info, warn};

use compass_core::{
    CompletionRequest, Error, GenerationBackend, RecommendationItem, RecommendationResult, Result,
    RetrievedItem, SynthesisKind, UserProfile,
};

use crate::context::render_context;

/// Synthesizer combining a user profile and retrieved context into a
/// schema-validated recommendation via the generation backend.
///
/// The backend is injected, so the offline/mock path and the live path run
/// through identical code and cannot diverge in output shape. Retry of the
/// generative call is deliberately not done here: retrying a
/// non-idempotent generation is the dispatcher's counted decision.
pub struct RecommendationSynthesizer {
    backend: Arc<dyn GenerationBackend>,
}

impl RecommendationSynthesizer {
    pub fn new(backend: Arc<dyn GenerationBackend>) -> Self {
        Self { backend }
    }

    /// Produce a recommendation result for the given profile and retrieved
    /// context.
    ///
    /// For activity/job kinds an empty context short-circuits to a
    /// successful empty result without a generative call: there is
    /// nothing to ground recommendations on, and "no matches" is an
    /// answer, not an error. A response that violates the kind's
    /// required-field contract is [`Error::Schema`].
    pub async fn synthesize(
        &self,
        profile: &UserProfile,
        items: &[RetrievedItem],
        kind: SynthesisKind,
    ) -> Result<RecommendationResult> {
        if items.is_empty() && kind != SynthesisKind::PortfolioAnalysis {
            info!(kind = %kind, user_id = %profile.user_id, "No retrieval matches, returning empty result");
            return Ok(RecommendationResult::ok(Vec::new()));
        }

        let request = build_request(profile, items, kind);
        let start = Instant::now();
        let response = self.backend.complete(&request).await?;

        debug!(
            kind = %kind,
            response_len = response.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Generation complete"
        );

        let mut result = parse_and_validate(&response, kind)?;
        if kind != SynthesisKind::PortfolioAnalysis {
            // A recommendation must be grounded in a retrieved record; the
            // model cannot recommend more items than it was shown.
            result.recommendations.truncate(items.len());
        }
        Ok(result)
    }
}

/// Build the deterministic structured request for a synthesis.
///
/// Identical profile/context input produces an identical request, byte for
/// byte.
pub fn build_request(
    profile: &UserProfile,
    items: &[RetrievedItem],
    kind: SynthesisKind,
) -> CompletionRequest {
    let profile_json =
        serde_json::to_string_pretty(profile).unwrap_or_else(|_| "{}".to_string());

    let (system, instructions) = match kind {
        SynthesisKind::Activities => (
            "You are a career advisor for university students. Recommend \
             suitable extracurricular activities based on the user's profile \
             and the retrieved candidates, with concrete reasons.",
            "Select the best-matching activities from the candidates above. \
             Respond with a JSON object of the form:\n\
             {\"recommendations\": [{\"title\": \"...\", \"rationale\": \"...\", \
             \"expected_benefits\": [\"...\"]}]}\n\
             Every item must include title, rationale, and expected_benefits. \
             Only recommend candidates that appear in the list.",
        ),
        SynthesisKind::Jobs => (
            "You are a recruitment consultant. Recommend suitable job \
             postings based on the candidate's background and the retrieved \
             postings, with an application strategy in mind.",
            "Select the best-matching postings from the candidates above. \
             Respond with a JSON object of the form:\n\
             {\"recommendations\": [{\"position\": \"...\", \"match_score\": 0.0, \
             \"why_suitable\": \"...\"}]}\n\
             Every item must include position, match_score, and why_suitable. \
             Only recommend postings that appear in the list.",
        ),
        SynthesisKind::PortfolioAnalysis => (
            "You are a professional portfolio analyst. Give objective, \
             constructive feedback.",
            "Analyze the portfolio above. Respond with a JSON object \
             containing exactly these three fields and nothing else:\n\
             {\"strength\": \"...\", \"weakness\": \"...\", \
             \"recommend_position\": \"...\"}",
        ),
    };

    let mut prompt = String::new();
    prompt.push_str("User profile:\n");
    prompt.push_str(&profile_json);
    prompt.push('\n');

    match kind {
        SynthesisKind::PortfolioAnalysis => {
            if let Some(portfolio) = profile.str_attr("portfolio_text") {
                prompt.push_str("\nPortfolio:\n");
                prompt.push_str(portfolio);
                prompt.push('\n');
            }
        }
        _ => {
            prompt.push_str("\nRetrieved candidates:\n");
            prompt.push_str(&render_context(items));
        }
    }

    prompt.push('\n');
    prompt.push_str(instructions);

    CompletionRequest {
        kind,
        system: system.to_string(),
        prompt,
    }
}

/// Parse the generative response and validate it against the kind's
/// required-field contract. A miss is a schema violation for this attempt,
/// never silently patched with defaults.
pub fn parse_and_validate(response: &str, kind: SynthesisKind) -> Result<RecommendationResult> {
    let value: JsonValue = serde_json::from_str(response)
        .map_err(|e| Error::Schema(format!("response is not valid JSON: {}", e)))?;
    let Some(object) = value.as_object() else {
        return Err(Error::Schema("response is not a JSON object".into()));
    };

    if kind == SynthesisKind::PortfolioAnalysis {
        for field in kind.required_fields() {
            if !object.contains_key(*field) {
                return Err(Error::Schema(format!(
                    "portfolio analysis missing required field '{}'",
                    field
                )));
            }
        }
        if let Some(extra) = object.keys().find(|k| !kind.required_fields().contains(&k.as_str())) {
            return Err(Error::Schema(format!(
                "portfolio analysis has unexpected field '{}'",
                extra
            )));
        }
        return Ok(RecommendationResult::ok(vec![RecommendationItem(
            object.clone(),
        )]));
    }

    let Some(items) = object.get("recommendations").and_then(|v| v.as_array()) else {
        return Err(Error::Schema(
            "response missing 'recommendations' array".into(),
        ));
    };

    let mut recommendations = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        let Some(fields) = item.as_object() else {
            return Err(Error::Schema(format!(
                "recommendation {} is not an object",
                i
            )));
        };
        for field in kind.required_fields() {
            if !fields.contains_key(*field) {
                warn!(kind = %kind, index = i, field, "Recommendation missing required field");
                return Err(Error::Schema(format!(
                    "recommendation {} missing required field '{}'",
                    i, field
                )));
            }
        }
        recommendations.push(RecommendationItem(fields.clone()));
    }

    Ok(RecommendationResult::ok(recommendations))
}
