//! Profile-to-query-text translation.
//!
//! The retrieval stage searches with an embedding of a textual rendering
//! of the user profile. Rendering is deterministic: attributes appear in a
//! fixed order, so identical profiles always produce identical queries.

use compass_core::{SynthesisKind, UserProfile};
use serde_json::Value as JsonValue;

/// Build the search query text for a profile and task kind.
///
/// Unset attributes are skipped; a profile with nothing relevant falls
/// back to a generic query so retrieval still has something to embed.
pub fn build_profile_query(profile: &UserProfile, kind: SynthesisKind) -> String {
    let mut parts: Vec<String> = Vec::new();

    match kind {
        SynthesisKind::Activities => {
            push_list(&mut parts, "Interests", profile.list_attr("interests"));
            push_str(&mut parts, "Major", profile.str_attr("major"));
            push_list(&mut parts, "Skills", profile.list_attr("skills"));
            push_str(
                &mut parts,
                "Experience level",
                profile.str_attr("experience_level"),
            );
            push_str(
                &mut parts,
                "Preferred location",
                profile.str_attr("preferred_location"),
            );
            if parts.is_empty() {
                return "extracurricular activity recommendation".to_string();
            }
        }
        SynthesisKind::Jobs => {
            push_str(&mut parts, "Desired role", profile.str_attr("desired_role"));
            push_str(&mut parts, "Major", profile.str_attr("major"));
            push_list(&mut parts, "Skills", profile.list_attr("skills"));
            if let Some(years) = profile.attrs.get("experience_years").and_then(numeric) {
                parts.push(format!("Experience: {} years", years));
            }
            push_str(
                &mut parts,
                "Preferred company size",
                profile.str_attr("company_size_preference"),
            );
            if parts.is_empty() {
                return "job posting recommendation".to_string();
            }
        }
        SynthesisKind::PortfolioAnalysis => {
            // Portfolio analysis grounds on the payload's portfolio text,
            // not on retrieval; the query is only used if a caller insists.
            return format!("portfolio analysis for user {}", profile.user_id);
        }
    }

    parts.join(" ")
}

fn numeric(value: &JsonValue) -> Option<f64> {
    value.as_f64()
}

fn push_str(parts: &mut Vec<String>, label: &str, value: Option<&str>) {
    if let Some(v) = value {
        if !v.is_empty() {
            parts.push(format!("{}: {}", label, v));
        }
    }
}

fn push_list(parts: &mut Vec<String>, label: &str, values: Vec<String>) {
    if !values.is_empty() {
        parts.push(format!("{}: {}", label, values.join(", ")));
    }
}

/// Render activity and education records into portfolio text for analysis.
///
/// Mirrors the shape the analysis producer sends: arrays of objects with
/// school/major/grade and title/description/content/tags keys.
pub fn build_portfolio_text(activities: &[JsonValue], educations: &[JsonValue]) -> String {
    let mut sections: Vec<String> = Vec::new();

    if !educations.is_empty() {
        sections.push("=== Education ===".to_string());
        for edu in educations {
            let school = edu.get("school").and_then(|v| v.as_str()).unwrap_or("unknown school");
            let major = edu.get("major").and_then(|v| v.as_str()).unwrap_or("unknown major");
            let grade = edu.get("grade").and_then(|v| v.as_str()).unwrap_or("n/a");
            sections.push(format!("- {} {} (GPA: {})", school, major, grade));
        }
    }

    if !activities.is_empty() {
        sections.push("=== Activities and Experience ===".to_string());
        for activity in activities {
            let title = activity.get("title").and_then(|v| v.as_str()).unwrap_or("untitled");
            sections.push(format!("* {}", title));
            if let Some(description) = activity.get("description").and_then(|v| v.as_str()) {
                sections.push(format!("  description: {}", description));
            }
            if let Some(content) = activity.get("content").and_then(|v| v.as_str()) {
                if !content.is_empty() {
                    sections.push(format!("  detail: {}", content));
                }
            }
            if let Some(tags) = activity.get("tags").and_then(|v| v.as_array()) {
                let tags: Vec<&str> = tags.iter().filter_map(|t| t.as_str()).collect();
                if !tags.is_empty() {
                    sections.push(format!("  tags: {}", tags.join(", ")));
                }
            }
        }
    }

    if sections.is_empty() {
        "No portfolio information available.".to_string()
    } else {
        sections.join("\n")
    }
}
