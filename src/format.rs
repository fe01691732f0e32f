//! Text rendering shared by the command line tools.

use std::fmt::Write as _;

use serde::Serialize;

use crate::chat::ChatResult;
use crate::index::SearchResult;

/// Characters of chunk content shown per search hit.
pub const PREVIEW_CHARS: usize = 200;

/// Sources listed under an interactive answer.
pub const INTERACTIVE_SOURCES: usize = 3;

/// Pretty-printed JSON, falling back to the serializer error text.
pub fn pretty_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value)
        .unwrap_or_else(|err| format!("{{\"error\": \"failed to serialize result: {err}\"}}"))
}

/// Numbered search hits with scores, sources and a content preview.
pub fn search_results(results: &[SearchResult]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Found {} results:", results.len());
    for (position, result) in results.iter().enumerate() {
        let _ = writeln!(out, "{}. Score: {:.4}", position + 1, result.score);
        let _ = writeln!(out, "   Source: {}", result.source());
        let _ = writeln!(out, "   Content: {}...", preview(&result.content, PREVIEW_CHARS));
        out.push('\n');
    }
    out
}

/// Failed command as a JSON object carrying `success: false` and the error chain.
pub fn error_result(err: &anyhow::Error) -> String {
    pretty_json(&serde_json::json!({
        "success": false,
        "error": format!("{err:#}"),
    }))
}

/// Outcome line for a delete request.
pub fn delete_outcome(success: bool) -> &'static str {
    if success {
        "Delete successful"
    } else {
        "Delete failed"
    }
}

/// Single-shot answer with every cited source.
pub fn chat_answer(result: &ChatResult) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Question: {}", result.query);
    let _ = writeln!(out, "Answer: {}", result.response);
    out.push_str("\nSources used:\n");
    for source in &result.sources {
        let _ = writeln!(out, "- {} (Score: {:.3})", source.source, source.score);
    }
    out
}

/// Interactive answer with the strongest few sources.
pub fn interactive_answer(result: &ChatResult) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "\nBot: {}", result.response);
    if !result.sources.is_empty() {
        out.push_str("\nSources:\n");
        for source in result.sources.iter().take(INTERACTIVE_SOURCES) {
            let _ = writeln!(out, "  • {} (relevance: {:.2})", source.source, source.score);
        }
    }
    out
}

fn preview(content: &str, limit: usize) -> &str {
    match content.char_indices().nth(limit) {
        Some((offset, _)) => &content[..offset],
        None => content,
    }
}
