//! Deterministic vector identifiers and stored metadata.

use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use crate::parser::Chunk;

/// Hex characters of the content hash kept in vector ids.
const HASH_PREFIX_LEN: usize = 8;

/// Compute a deterministic SHA-256 hash for the chunk text.
pub fn compute_content_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}

/// Identifier for a chunk: `{source}_{chunk_id}_{hash prefix}`.
///
/// Unchanged chunks map to the same id so re-ingestion overwrites instead of duplicating.
/// A document that shrinks leaves its trailing ids orphaned until deleted by source.
pub fn vector_id(source: &str, chunk_id: usize, content: &str) -> String {
    let hash = compute_content_hash(content);
    format!("{source}_{chunk_id}_{}", &hash[..HASH_PREFIX_LEN])
}

/// Metadata stored with a vector: the chunk metadata plus its first `content_limit` characters.
pub fn build_metadata(chunk: &Chunk, content_limit: usize) -> Map<String, Value> {
    let mut metadata = match serde_json::to_value(&chunk.metadata) {
        Ok(Value::Object(map)) => map,
        _ => Map::new(),
    };
    metadata.insert(
        "content".into(),
        Value::String(truncate_chars(&chunk.content, content_limit).to_string()),
    );
    metadata
}

fn truncate_chars(text: &str, limit: usize) -> &str {
    match text.char_indices().nth(limit) {
        Some((byte_index, _)) => &text[..byte_index],
        None => text,
    }
}
