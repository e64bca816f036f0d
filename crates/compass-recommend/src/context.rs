//! Bounded context assembly from retrieval results.

use compass_core::{defaults, RetrievedItem};
use serde_json::Value as JsonValue;

/// Select the context window: the highest-similarity prefix of at most
/// `cap` items. Input is expected in ranking order (descending similarity,
/// ties by ascending id), so a prefix is exactly the right selection.
pub fn context_window(items: &[RetrievedItem], cap: usize) -> &[RetrievedItem] {
    &items[..items.len().min(cap)]
}

/// Render the context window into prompt text.
///
/// Each entry carries the record id, a metadata line, the similarity, and
/// a truncated excerpt of the source text.
pub fn render_context(items: &[RetrievedItem]) -> String {
    let window = context_window(items, defaults::CONTEXT_ITEM_CAP);
    let mut out = String::new();

    for (i, item) in window.iter().enumerate() {
        out.push_str(&format!(
            "{}. id: {} (similarity: {:.2})\n",
            i + 1,
            item.id,
            item.similarity_score
        ));
        let metadata = render_metadata(item);
        if !metadata.is_empty() {
            out.push_str(&format!("   {}\n", metadata));
        }
        let excerpt = excerpt(&item.source_text, defaults::CONTEXT_EXCERPT_CHARS);
        if !excerpt.is_empty() {
            out.push_str(&format!("   excerpt: {}\n", excerpt));
        }
    }

    out
}

fn render_metadata(item: &RetrievedItem) -> String {
    item.metadata
        .iter()
        .map(|(key, value)| format!("{}: {}", key, render_value(value)))
        .collect::<Vec<_>>()
        .join(", ")
}

fn render_value(value: &JsonValue) -> String {
    match value {
        JsonValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Char-boundary-safe prefix of at most `max_chars` characters.
fn excerpt(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let truncated: String = text.chars().take(max_chars).collect();
    format!("{}...", truncated)
}
