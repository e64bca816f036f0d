//! Payload validation: per-type required fields, checked before any
//! external call is attempted.

use compass_core::{Error, Result, TaskType};
use serde_json::Value as JsonValue;

/// Required payload fields per task type.
pub fn required_fields(task_type: &TaskType) -> &'static [&'static str] {
    match task_type {
        TaskType::DocumentProcessing => &["document_id", "file_path"],
        TaskType::EmbeddingGeneration => &["document_id", "text"],
        TaskType::FileUpload => &["local_path", "bucket_name", "object_name"],
        TaskType::VectorInsert => &["document_id", "embedding", "metadata"],
        TaskType::Notification => &["message", "recipient"],
        TaskType::RecommendActivities | TaskType::RecommendJobs => {
            &["user_profile", "metadata_filters", "n_results"]
        }
        // The analysis producer sends the user id under either "user_id"
        // or "userId"; the handler resolves that, so only the record
        // arrays are table-checked here.
        TaskType::AnalyzePortfolio => &["activities", "educations"],
        TaskType::Unrecognized(_) => &[],
    }
}

/// Check that the payload carries every required field for its declared
/// task type. A miss is a fatal validation error.
pub fn validate_payload(task_type: &TaskType, payload: &JsonValue) -> Result<()> {
    let fields = required_fields(task_type);
    if fields.is_empty() {
        return Ok(());
    }

    let Some(object) = payload.as_object() else {
        return Err(Error::Validation(format!(
            "{}: payload must be an object",
            task_type
        )));
    };

    for field in fields {
        if !object.contains_key(*field) {
            return Err(Error::Validation(format!(
                "{}: missing required field '{}'",
                task_type, field
            )));
        }
    }
    Ok(())
}
