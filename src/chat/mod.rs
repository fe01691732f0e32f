//! Retrieval-augmented answering: search, context assembly, and generation.

mod bot;
pub mod context;
pub mod types;

pub use bot::RagChatbot;
pub use context::{
    EMPTY_CONTEXT, NO_RESULTS_RESPONSE, SYSTEM_PROMPT, build_context, build_user_message,
};
pub use types::{ChatResult, SourceCitation};
