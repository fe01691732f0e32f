//! Prompt assembly for retrieval-augmented answers.

use crate::index::SearchResult;

/// Instruction sent as the system turn of every completion.
pub const SYSTEM_PROMPT: &str = "You are a helpful assistant that answers questions using the \
provided context documents.

Guidelines:
- Answer based only on the information in the context documents.
- Cite the source document when you use information from it.
- If the context does not contain enough information to answer, say so clearly.
- Be concise and accurate.";

/// Answer returned when the index holds nothing relevant to the question.
pub const NO_RESULTS_RESPONSE: &str = "I couldn't find any relevant documents to answer your \
question. Please try rephrasing or asking about a different topic.";

/// Context text used when no documents are supplied.
pub const EMPTY_CONTEXT: &str = "No relevant documents found.";

const DOCUMENT_SEPARATOR: &str = "\n\n---\n\n";

/// Concatenate results in the order given, highest similarity first.
pub fn build_context(results: &[SearchResult]) -> String {
    if results.is_empty() {
        return EMPTY_CONTEXT.to_string();
    }

    results
        .iter()
        .enumerate()
        .map(|(index, result)| {
            format!(
                "Document {} (Score: {:.3}, Source: {}):\n{}",
                index + 1,
                result.score,
                result.source(),
                result.content
            )
        })
        .collect::<Vec<_>>()
        .join(DOCUMENT_SEPARATOR)
}

/// User turn embedding the assembled context and the raw question.
pub fn build_user_message(context: &str, query: &str) -> String {
    format!(
        "Context documents:\n{context}\n\n---\n\nQuestion: {query}\n\nPlease answer based on the context provided above."
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Map, Value};

    fn result(source: &str, score: f32, content: &str) -> SearchResult {
        let mut metadata = Map::new();
        metadata.insert("source".into(), Value::String(source.into()));
        SearchResult {
            id: format!("{source}_0_00000000"),
            score,
            content: content.into(),
            metadata,
        }
    }

    #[test]
    fn documents_are_numbered_in_order_with_three_decimal_scores() {
        let context = build_context(&[
            result("a.txt", 0.91234, "first body"),
            result("b.txt", 0.5, "second body"),
        ]);
        assert_eq!(
            context,
            "Document 1 (Score: 0.912, Source: a.txt):\nfirst body\n\n---\n\nDocument 2 (Score: 0.500, Source: b.txt):\nsecond body"
        );
    }

    #[test]
    fn empty_results_produce_placeholder() {
        assert_eq!(build_context(&[]), "No relevant documents found.");
    }

    #[test]
    fn user_message_places_context_before_question() {
        let message = build_user_message("CTX", "What now?");
        assert_eq!(
            message,
            "Context documents:\nCTX\n\n---\n\nQuestion: What now?\n\nPlease answer based on the context provided above."
        );
    }
}
