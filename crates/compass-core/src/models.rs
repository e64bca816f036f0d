//! Core data model: task messages, profiles, retrieval and recommendation
//! results.

use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value as JsonValue};
use uuid::Uuid;

// =============================================================================
// TASK TYPE
// =============================================================================

/// Type of task delivered through the work queue.
///
/// A closed set of known kinds plus an explicit `Unrecognized` variant:
/// routing resolves against a static registry built at startup, and an
/// unrecognized type is a reportable dead-letter, never a crash.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TaskType {
    /// Extract text from an uploaded document
    DocumentProcessing,
    /// Generate an embedding for extracted text and index it
    EmbeddingGeneration,
    /// Upload a local file to the blob store
    FileUpload,
    /// Insert a precomputed embedding into the vector store
    VectorInsert,
    /// Deliver a notification to a recipient
    Notification,
    /// Metadata-filtered activity recommendation with AI synthesis
    RecommendActivities,
    /// Metadata-filtered job recommendation with AI synthesis
    RecommendJobs,
    /// Portfolio strength/weakness analysis
    AnalyzePortfolio,
    /// Any task type string with no registered handler
    Unrecognized(String),
}

impl TaskType {
    /// All recognized task types, in routing-table order.
    pub fn known() -> [TaskType; 8] {
        [
            TaskType::DocumentProcessing,
            TaskType::EmbeddingGeneration,
            TaskType::FileUpload,
            TaskType::VectorInsert,
            TaskType::Notification,
            TaskType::RecommendActivities,
            TaskType::RecommendJobs,
            TaskType::AnalyzePortfolio,
        ]
    }

    /// Wire string for this task type.
    pub fn as_str(&self) -> &str {
        match self {
            TaskType::DocumentProcessing => "document_processing",
            TaskType::EmbeddingGeneration => "embedding_generation",
            TaskType::FileUpload => "file_upload",
            TaskType::VectorInsert => "vector_insert",
            TaskType::Notification => "notification",
            TaskType::RecommendActivities => "recommend_activities_with_metadata",
            TaskType::RecommendJobs => "recommend_jobs_with_metadata",
            TaskType::AnalyzePortfolio => "analyze_portfolio",
            TaskType::Unrecognized(s) => s.as_str(),
        }
    }
}

impl From<&str> for TaskType {
    fn from(s: &str) -> Self {
        match s {
            "document_processing" => TaskType::DocumentProcessing,
            "embedding_generation" => TaskType::EmbeddingGeneration,
            "file_upload" => TaskType::FileUpload,
            "vector_insert" => TaskType::VectorInsert,
            "notification" => TaskType::Notification,
            "recommend_activities_with_metadata" => TaskType::RecommendActivities,
            "recommend_jobs_with_metadata" => TaskType::RecommendJobs,
            // The analysis producer tags its messages "ANALYZE".
            "analyze_portfolio" | "ANALYZE" => TaskType::AnalyzePortfolio,
            other => TaskType::Unrecognized(other.to_string()),
        }
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for TaskType {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for TaskType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(TaskType::from(s.as_str()))
    }
}

// =============================================================================
// TASK MESSAGE
// =============================================================================

fn new_task_id() -> String {
    Uuid::new_v4().to_string()
}

fn now_utc() -> DateTime<Utc> {
    Utc::now()
}

/// Accept a task/user id serialized as either a string or a number.
///
/// Producers are inconsistent here: the analysis queue sends integer ids,
/// everything else sends strings.
fn de_id_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    struct IdVisitor;

    impl serde::de::Visitor<'_> for IdVisitor {
        type Value = String;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a string or integer id")
        }

        fn visit_str<E: serde::de::Error>(self, v: &str) -> Result<String, E> {
            Ok(v.to_string())
        }

        fn visit_u64<E: serde::de::Error>(self, v: u64) -> Result<String, E> {
            Ok(v.to_string())
        }

        fn visit_i64<E: serde::de::Error>(self, v: i64) -> Result<String, E> {
            Ok(v.to_string())
        }
    }

    deserializer.deserialize_any(IdVisitor)
}

/// A unit of work delivered through the queue.
///
/// Immutable once enqueued; `attempt` is incremented by the queue on
/// redelivery, never by handlers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskMessage {
    /// Unique task id. Generated if the producer did not supply one.
    #[serde(
        default = "new_task_id",
        alias = "analysisId",
        deserialize_with = "de_id_string"
    )]
    pub task_id: String,

    /// Routing key for the handler registry.
    #[serde(alias = "taskType")]
    pub task_type: TaskType,

    /// Structured, task-type-specific payload.
    #[serde(default, alias = "data", alias = "parameters")]
    pub payload: JsonValue,

    /// When the producer enqueued the message.
    #[serde(default = "now_utc")]
    pub enqueued_at: DateTime<Utc>,

    /// Zero-based delivery attempt.
    #[serde(default)]
    pub attempt: u32,
}

impl TaskMessage {
    /// Create a new message with a generated task id.
    pub fn new(task_type: TaskType, payload: JsonValue) -> Self {
        Self {
            task_id: new_task_id(),
            task_type,
            payload,
            enqueued_at: Utc::now(),
            attempt: 0,
        }
    }

    /// Override the generated task id.
    pub fn with_task_id(mut self, task_id: impl Into<String>) -> Self {
        self.task_id = task_id.into();
        self
    }
}

// =============================================================================
// USER PROFILE
// =============================================================================

/// Free-form identity/preference attributes for a user.
///
/// Only `user_id` is required; downstream consumers treat absent optional
/// attributes as "unspecified".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(deserialize_with = "de_id_string")]
    pub user_id: String,

    #[serde(flatten)]
    pub attrs: Map<String, JsonValue>,
}

impl UserProfile {
    /// Create a profile with no optional attributes.
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            attrs: Map::new(),
        }
    }

    /// Builder-style attribute setter.
    pub fn with_attr(mut self, key: impl Into<String>, value: JsonValue) -> Self {
        self.attrs.insert(key.into(), value);
        self
    }

    /// Parse a profile out of a task payload field.
    pub fn from_value(value: JsonValue) -> crate::Result<Self> {
        serde_json::from_value(value)
            .map_err(|e| crate::Error::Validation(format!("user_profile: {}", e)))
    }

    /// String attribute, if present and a string.
    pub fn str_attr(&self, key: &str) -> Option<&str> {
        self.attrs.get(key).and_then(|v| v.as_str())
    }

    /// List attribute. Accepts an array of strings or a single string.
    pub fn list_attr(&self, key: &str) -> Vec<String> {
        match self.attrs.get(key) {
            Some(JsonValue::Array(items)) => items
                .iter()
                .filter_map(|v| v.as_str().map(String::from))
                .collect(),
            Some(JsonValue::String(s)) => vec![s.clone()],
            _ => Vec::new(),
        }
    }
}

// =============================================================================
// RETRIEVAL
// =============================================================================

/// One ranked hit from a metadata-filtered similarity search.
///
/// `similarity_score` is normalized: 1.0 means identical, 0.0 unrelated,
/// regardless of what shape the backing store reports.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievedItem {
    pub id: String,
    pub similarity_score: f32,
    #[serde(default)]
    pub metadata: Map<String, JsonValue>,
    #[serde(default)]
    pub source_text: String,
}

impl RetrievedItem {
    /// Ranking order for result lists: descending similarity, ties broken
    /// by ascending id so identical inputs produce identical output.
    pub fn ranking_cmp(a: &Self, b: &Self) -> Ordering {
        b.similarity_score
            .partial_cmp(&a.similarity_score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.id.cmp(&b.id))
    }
}

// =============================================================================
// SYNTHESIS
// =============================================================================

/// Which recommendation contract a synthesis request targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SynthesisKind {
    Activities,
    Jobs,
    PortfolioAnalysis,
}

impl SynthesisKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SynthesisKind::Activities => "activities",
            SynthesisKind::Jobs => "jobs",
            SynthesisKind::PortfolioAnalysis => "portfolio_analysis",
        }
    }

    /// Fields every recommendation item of this kind must carry.
    pub fn required_fields(&self) -> &'static [&'static str] {
        match self {
            SynthesisKind::Activities => &["title", "rationale", "expected_benefits"],
            SynthesisKind::Jobs => &["position", "match_score", "why_suitable"],
            SynthesisKind::PortfolioAnalysis => &["strength", "weakness", "recommend_position"],
        }
    }
}

impl fmt::Display for SynthesisKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One structured recommendation entry.
///
/// Field sets differ per task kind, so the item is an open map validated
/// against [`SynthesisKind::required_fields`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecommendationItem(pub Map<String, JsonValue>);

impl RecommendationItem {
    pub fn get(&self, key: &str) -> Option<&JsonValue> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Outcome of a recommendation synthesis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationResult {
    pub success: bool,
    pub recommendations: Vec<RecommendationItem>,
    pub generated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RecommendationResult {
    /// A successful result. An empty recommendation list is a valid success:
    /// "no matches" is an answer, not an error.
    pub fn ok(recommendations: Vec<RecommendationItem>) -> Self {
        Self {
            success: true,
            recommendations,
            generated_at: Utc::now(),
            error: None,
        }
    }

    /// A failed result with the cause recorded.
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            recommendations: Vec::new(),
            generated_at: Utc::now(),
            error: Some(error.into()),
        }
    }
}

// =============================================================================
// QUEUE STATS
// =============================================================================

/// Producer-side queue statistics exposed by the task manager.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueueStats {
    pub published: u64,
    pub in_flight: u64,
    pub dead_lettered: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_task_type_round_trip() {
        for task_type in TaskType::known() {
            let s = task_type.as_str().to_string();
            assert_eq!(TaskType::from(s.as_str()), task_type);
        }
    }

    #[test]
    fn test_task_type_unrecognized() {
        let t = TaskType::from("bogus");
        assert_eq!(t, TaskType::Unrecognized("bogus".to_string()));
        assert_eq!(t.as_str(), "bogus");
    }

    #[test]
    fn test_task_type_serde() {
        let json = serde_json::to_string(&TaskType::RecommendActivities).unwrap();
        assert_eq!(json, "\"recommend_activities_with_metadata\"");

        let parsed: TaskType = serde_json::from_str("\"notification\"").unwrap();
        assert_eq!(parsed, TaskType::Notification);
    }

    #[test]
    fn test_task_message_generates_id() {
        let msg = TaskMessage::new(TaskType::Notification, json!({}));
        assert!(!msg.task_id.is_empty());
        assert_eq!(msg.attempt, 0);
    }

    #[test]
    fn test_task_message_wire_format_with_data_alias() {
        let msg: TaskMessage = serde_json::from_value(json!({
            "task_type": "recommend_activities_with_metadata",
            "data": {"n_results": 3}
        }))
        .unwrap();

        assert_eq!(msg.task_type, TaskType::RecommendActivities);
        assert_eq!(msg.payload["n_results"], 3);
        assert!(!msg.task_id.is_empty());
        assert_eq!(msg.attempt, 0);
    }

    #[test]
    fn test_task_message_analysis_queue_format() {
        // The analysis producer sends camelCase keys, an "ANALYZE" type
        // tag, and an integer id.
        let msg: TaskMessage = serde_json::from_value(json!({
            "analysisId": 42,
            "taskType": "ANALYZE",
            "parameters": {"activities": [], "educations": []}
        }))
        .unwrap();

        assert_eq!(msg.task_id, "42");
        assert_eq!(msg.task_type, TaskType::AnalyzePortfolio);
        assert!(msg.payload.get("activities").is_some());
    }

    #[test]
    fn test_user_profile_requires_user_id() {
        let err = UserProfile::from_value(json!({"skills": ["rust"]}));
        assert!(err.is_err());

        let ok = UserProfile::from_value(json!({"user_id": "u1"})).unwrap();
        assert_eq!(ok.user_id, "u1");
    }

    #[test]
    fn test_user_profile_numeric_user_id() {
        let profile = UserProfile::from_value(json!({"user_id": 7})).unwrap();
        assert_eq!(profile.user_id, "7");
    }

    #[test]
    fn test_user_profile_list_attr() {
        let profile = UserProfile::new("u1")
            .with_attr("skills", json!(["Python", "Rust"]))
            .with_attr("major", json!("CS"));

        assert_eq!(profile.list_attr("skills"), vec!["Python", "Rust"]);
        assert_eq!(profile.list_attr("major"), vec!["CS"]);
        assert!(profile.list_attr("missing").is_empty());
        assert_eq!(profile.str_attr("major"), Some("CS"));
    }

    #[test]
    fn test_retrieved_item_ranking() {
        let a = RetrievedItem {
            id: "a".into(),
            similarity_score: 0.9,
            metadata: Map::new(),
            source_text: String::new(),
        };
        let b = RetrievedItem {
            id: "b".into(),
            similarity_score: 0.9,
            metadata: Map::new(),
            source_text: String::new(),
        };
        let c = RetrievedItem {
            id: "c".into(),
            similarity_score: 0.5,
            metadata: Map::new(),
            source_text: String::new(),
        };

        let mut items = vec![c.clone(), b.clone(), a.clone()];
        items.sort_by(RetrievedItem::ranking_cmp);

        let ids: Vec<&str> = items.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_required_fields_per_kind() {
        assert_eq!(
            SynthesisKind::Activities.required_fields(),
            &["title", "rationale", "expected_benefits"]
        );
        assert_eq!(
            SynthesisKind::Jobs.required_fields(),
            &["position", "match_score", "why_suitable"]
        );
        assert_eq!(
            SynthesisKind::PortfolioAnalysis.required_fields(),
            &["strength", "weakness", "recommend_position"]
        );
    }

    #[test]
    fn test_recommendation_result_failed_has_no_items() {
        let result = RecommendationResult::failed("store unreachable");
        assert!(!result.success);
        assert!(result.recommendations.is_empty());
        assert_eq!(result.error.as_deref(), Some("store unreachable"));
    }

    #[test]
    fn test_recommendation_result_serde_omits_absent_error() {
        let json = serde_json::to_value(RecommendationResult::ok(Vec::new())).unwrap();
        assert_eq!(json["success"], true);
        assert!(json.get("error").is_none());
    }
}
