//! Deterministic mock backends for offline mode and tests.
//!
//! The mock generation backend answers every completion request with a
//! fixed, schema-valid response for the request's kind, so the offline
//! path is structurally indistinguishable from the live one. Calls are
//! logged for assertions.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::json;

use compass_core::{
    CompletionRequest, EmbeddingBackend, Error, GenerationBackend, Result, SynthesisKind,
};

/// One logged completion call.
#[derive(Debug, Clone)]
pub struct MockCall {
    pub kind: SynthesisKind,
    pub prompt: String,
}

/// Mock generation backend with canned per-kind responses.
#[derive(Clone)]
pub struct MockBackend {
    responses: Arc<HashMap<SynthesisKind, String>>,
    call_log: Arc<Mutex<Vec<MockCall>>>,
    failure_rate: f64,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBackend {
    /// Create a mock backend with the default canned responses.
    pub fn new() -> Self {
        let mut responses = HashMap::new();
        responses.insert(
            SynthesisKind::Activities,
            json!({
                "recommendations": [
                    {
                        "title": "Open Source Contribution Sprint",
                        "rationale": "Matches the listed development skills and builds a public track record",
                        "expected_benefits": ["portfolio visibility", "collaboration experience"],
                        "activity_type": "community_program",
                        "time_commitment": "4 weeks"
                    },
                    {
                        "title": "AI Fundamentals Course",
                        "rationale": "Strengthens the foundations behind the stated interests",
                        "expected_benefits": ["broader technical base"],
                        "activity_type": "online_course",
                        "time_commitment": "5 hours"
                    }
                ]
            })
            .to_string(),
        );
        responses.insert(
            SynthesisKind::Jobs,
            json!({
                "recommendations": [
                    {
                        "position": "Junior AI Engineer",
                        "match_score": 0.82,
                        "why_suitable": "Skill stack and experience level fit an entry ML role",
                        "required_skills": ["Python", "machine learning"],
                        "company_type": "startup"
                    }
                ]
            })
            .to_string(),
        );
        responses.insert(
            SynthesisKind::PortfolioAnalysis,
            json!({
                "strength": "Broad practical frontend coverage with strong implementation ability",
                "weakness": "Little visible team project or collaboration tooling experience",
                "recommend_position": "Frontend Developer"
            })
            .to_string(),
        );

        Self {
            responses: Arc::new(responses),
            call_log: Arc::new(Mutex::new(Vec::new())),
            failure_rate: 0.0,
        }
    }

    /// Override the canned response for a kind.
    pub fn with_response(mut self, kind: SynthesisKind, response: impl Into<String>) -> Self {
        let mut responses = (*self.responses).clone();
        responses.insert(kind, response.into());
        self.responses = Arc::new(responses);
        self
    }

    /// Set failure rate (0.0 - 1.0) for testing error handling. 1.0 fails
    /// every call with a transient error.
    pub fn with_failure_rate(mut self, rate: f64) -> Self {
        self.failure_rate = rate.clamp(0.0, 1.0);
        self
    }

    /// All logged calls, in order.
    pub fn calls(&self) -> Vec<MockCall> {
        self.call_log.lock().unwrap().clone()
    }

    /// Number of completion calls made.
    pub fn call_count(&self) -> usize {
        self.call_log.lock().unwrap().len()
    }

    fn should_fail(&self) -> bool {
        if self.failure_rate >= 1.0 {
            return true;
        }
        if self.failure_rate <= 0.0 {
            return false;
        }
        use rand::Rng;
        rand::thread_rng().gen::<f64>() < self.failure_rate
    }
}

#[async_trait]
impl GenerationBackend for MockBackend {
    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        self.call_log.lock().unwrap().push(MockCall {
            kind: request.kind,
            prompt: request.prompt.clone(),
        });

        if self.should_fail() {
            return Err(Error::Transient("mock backend failure injected".into()));
        }

        self.responses
            .get(&request.kind)
            .cloned()
            .ok_or_else(|| Error::Inference(format!("no mock response for kind {}", request.kind)))
    }
}

/// Deterministic embedder: the vector is derived from a hash of the input
/// text, so the same text always embeds identically and different texts
/// (almost always) differ.
#[derive(Debug, Clone)]
pub struct MockEmbedder {
    dimension: usize,
}

impl Default for MockEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

impl MockEmbedder {
    pub fn new() -> Self {
        Self {
            dimension: compass_core::defaults::EMBED_DIMENSION,
        }
    }

    pub fn with_dimension(mut self, dimension: usize) -> Self {
        self.dimension = dimension;
        self
    }
}

#[async_trait]
impl EmbeddingBackend for MockEmbedder {
    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        // FNV-1a seed, then a splitmix-style sequence per component.
        let mut seed: u64 = 0xcbf2_9ce4_8422_2325;
        for byte in text.bytes() {
            seed ^= byte as u64;
            seed = seed.wrapping_mul(0x100_0000_01b3);
        }

        let mut state = seed;
        let values: Vec<f32> = (0..self.dimension)
            .map(|_| {
                state = state.wrapping_add(0x9e37_79b9_7f4a_7c15);
                let mut z = state;
                z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
                z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
                z ^= z >> 31;
                (z as f64 / u64::MAX as f64) as f32 * 2.0 - 1.0
            })
            .collect();

        // Unit-normalize so cosine comparisons behave.
        let norm: f32 = values.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm == 0.0 {
            return Ok(values);
        }
        Ok(values.into_iter().map(|v| v / norm).collect())
    }
}
