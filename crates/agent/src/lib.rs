//! Agent runtime for the TechPro assistant.
//!
//! Each chat message goes through the same loop:
//! 1. **Memory** (`memory`) - the message is appended to the session history
//! 2. **Intent** (`intent`) - the model labels the message, keyword rules back it up
//! 3. **Handlers** (`orchestrator`) - retrieval, graph comparison, or a `tools` call
//! 4. **Reply** (`llm`) - tool messages go out verbatim, everything else is written by the model
//!
//! The model never touches order, refund or complaint records directly; those go
//! through the tool registry against the data store.

pub mod intent;
pub mod llm;
pub mod memory;
pub mod orchestrator;
pub mod tools;

pub use intent::{
    extract_entities, extract_order_id, extract_product_ids, keyword_intent, ExtractedEntities,
    IntentClassifier,
};
pub use llm::{CompletionOptions, LlmClient, LlmService, OfflineLlm, OpenAiChatClient};
pub use memory::ConversationMemory;
pub use orchestrator::{Orchestrator, OrchestratorSettings};
pub use tools::{Tool, ToolRegistry, ToolReply};
