//! Tolerant JSON extraction from model replies.
//!
//! Models wrap JSON in markdown fences or prose more often than not; the
//! planner needs the object either way.

use flotilla_common::{FlotillaError, Result};

/// Extract and parse the first JSON object in a model reply. Handles fenced
/// ```` ```json ```` blocks, plain fences, and bare `{...}` spans.
pub fn extract_json_object(response: &str) -> Result<serde_json::Value> {
    let candidate = fenced_block(response)
        .or_else(|| braced_span(response))
        .unwrap_or(response)
        .trim();

    serde_json::from_str(candidate).map_err(|e| {
        let preview: String = candidate.chars().take(120).collect();
        FlotillaError::Execution(format!(
            "invalid JSON in model response: {e} (candidate: {preview})"
        ))
    })
}

fn fenced_block(response: &str) -> Option<&str> {
    let after_open = if let Some(idx) = response.find("```json") {
        &response[idx + 7..]
    } else if let Some(idx) = response.find("```") {
        &response[idx + 3..]
    } else {
        return None;
    };
    let end = after_open.find("```")?;
    Some(&after_open[..end])
}

fn braced_span(response: &str) -> Option<&str> {
    let start = response.find('{')?;
    let end = response.rfind('}')?;
    (end > start).then(|| &response[start..=end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_fenced_json() {
        let reply = "Here you go:\n```json\n{\"task_complete\": true}\n```\nDone.";
        let value = extract_json_object(reply).unwrap();
        assert_eq!(value["task_complete"], serde_json::json!(true));
    }

    #[test]
    fn parses_plain_fence() {
        let reply = "```\n{\"tool\": \"search\"}\n```";
        let value = extract_json_object(reply).unwrap();
        assert_eq!(value["tool"], "search");
    }

    #[test]
    fn parses_bare_braces_amid_prose() {
        let reply = "The next step is {\"tool\": \"fetch\", \"requires_llm\": false} as discussed.";
        let value = extract_json_object(reply).unwrap();
        assert_eq!(value["tool"], "fetch");
    }

    #[test]
    fn rejects_non_json() {
        assert!(extract_json_object("no structured content here").is_err());
    }
}
