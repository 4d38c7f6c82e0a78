use std::sync::Arc;

use anyhow::Result;
use serde_json::{json, Map, Value};
use tracing::{error, info};
use uuid::Uuid;

use techpro_core::config::AgentConfig;
use techpro_core::{ChatMessage, ChatResponse, Intent};
use techpro_db::{DataStore, GraphService, ProductComparison};
use techpro_rag::RagPipeline;

use crate::intent::{extract_order_id, extract_product_ids, IntentClassifier};
use crate::llm::LlmService;
use crate::memory::ConversationMemory;
use crate::tools::{ToolRegistry, ToolReply};

pub const ASSISTANT_SYSTEM_PROMPT: &str = "You are a helpful AI assistant for TechPro Electronics, \
an electronics e-commerce company. Provide accurate, friendly, and concise responses. \
Use the provided context to answer questions. \
If you don't have enough information, ask for clarification.";

pub const ERROR_RESPONSE: &str = "I apologize, but I encountered an error processing your request. \
Please try again or rephrase your question.";

pub const NO_PRODUCT_INFORMATION: &str = "No specific information found.";

const PRODUCT_INFO_TOP_K: usize = 3;
const GENERAL_TOP_K: usize = 2;
const REFUND_REQUEST_WORDS: [&str; 4] = ["want", "request", "initiate", "return"];
const REFUND_REASON: &str = "Customer request";
const COMPLAINT_ISSUE: &str = "Product issue";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OrchestratorSettings {
    pub max_history: usize,
    pub history_window: usize,
    pub max_response_tokens: u32,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self { max_history: 10, history_window: 6, max_response_tokens: 500 }
    }
}

impl From<&AgentConfig> for OrchestratorSettings {
    fn from(config: &AgentConfig) -> Self {
        Self {
            max_history: config.max_history,
            history_window: config.history_window,
            max_response_tokens: config.max_response_tokens,
        }
    }
}

/// What a handler produced for one message, before the reply is written.
#[derive(Debug, Default)]
struct HandlerOutcome {
    /// Finished customer-facing text; skips the model entirely.
    message: Option<String>,
    context: Option<String>,
    comparison: Option<ProductComparison>,
    sources: Option<Vec<String>>,
    metadata: Map<String, Value>,
}

impl HandlerOutcome {
    fn reply(message: impl Into<String>) -> Self {
        Self { message: Some(message.into()), sources: Some(Vec::new()), ..Self::default() }
    }

    fn from_tool(reply: ToolReply) -> Self {
        Self::reply(reply.message)
    }
}

/// Routes each message to a handler by intent and writes the reply.
pub struct Orchestrator {
    llm: Arc<LlmService>,
    classifier: IntentClassifier,
    memory: ConversationMemory,
    tools: ToolRegistry,
    rag: Arc<RagPipeline>,
    graph: Arc<GraphService>,
    settings: OrchestratorSettings,
}

impl Orchestrator {
    pub fn new(
        llm: Arc<LlmService>,
        store: Arc<DataStore>,
        rag: Arc<RagPipeline>,
        graph: Arc<GraphService>,
        settings: OrchestratorSettings,
    ) -> Self {
        Self {
            classifier: IntentClassifier::new(llm.clone()),
            memory: ConversationMemory::new(settings.max_history),
            tools: ToolRegistry::with_store(store),
            llm,
            rag,
            graph,
            settings,
        }
    }

    pub fn memory(&self) -> &ConversationMemory {
        &self.memory
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub async fn process_message(&self, message: &str, session_id: &str) -> ChatResponse {
        let correlation_id = Uuid::new_v4().to_string();
        info!(
            event_name = "agent.message.received",
            correlation_id = %correlation_id,
            session_id = %session_id,
            "processing message"
        );

        match self.respond(message, session_id, &correlation_id).await {
            Ok(response) => response,
            Err(err) => {
                error!(
                    event_name = "agent.message.failed",
                    correlation_id = %correlation_id,
                    session_id = %session_id,
                    error = %err,
                    "message processing failed"
                );
                let mut metadata = Map::new();
                metadata.insert("error".to_string(), Value::String(err.to_string()));
                ChatResponse {
                    response: ERROR_RESPONSE.to_string(),
                    intent: Intent::Error,
                    sources: Some(Vec::new()),
                    metadata: Some(metadata),
                }
            }
        }
    }

    async fn respond(
        &self,
        message: &str,
        session_id: &str,
        correlation_id: &str,
    ) -> Result<ChatResponse> {
        self.memory.append(session_id, ChatMessage::user(message)).await;

        let intent = self.classifier.classify(message).await;
        info!(
            event_name = "agent.intent.routed",
            correlation_id = %correlation_id,
            intent = %intent,
            "routing message"
        );

        let outcome = self.route(intent, message).await?;
        let response = self.compose(message, session_id, &outcome).await;
        self.memory.append(session_id, ChatMessage::assistant(response.clone())).await;

        info!(
            event_name = "agent.message.answered",
            correlation_id = %correlation_id,
            session_id = %session_id,
            intent = %intent,
            "response generated"
        );
        Ok(ChatResponse {
            response,
            intent,
            sources: outcome.sources,
            metadata: Some(outcome.metadata),
        })
    }

    async fn route(&self, intent: Intent, message: &str) -> Result<HandlerOutcome> {
        match intent {
            Intent::ProductInfo => Ok(self.product_info(message).await),
            Intent::OrderStatus => {
                self.order_tool(message, "order_status", "check status", |order_id| {
                    json!({ "order_id": order_id })
                })
                .await
            }
            Intent::Complaint => {
                self.order_tool(message, "create_complaint", "file a complaint", |order_id| {
                    json!({ "order_id": order_id, "issue": COMPLAINT_ISSUE, "description": message })
                })
                .await
            }
            Intent::Refund => {
                let lowered = message.to_lowercase();
                if REFUND_REQUEST_WORDS.iter().any(|word| lowered.contains(word)) {
                    self.order_tool(message, "initiate_refund", "check refund status", |order_id| {
                        json!({ "order_id": order_id, "reason": REFUND_REASON })
                    })
                    .await
                } else {
                    self.order_tool(message, "refund_status", "check refund status", |order_id| {
                        json!({ "order_id": order_id })
                    })
                    .await
                }
            }
            Intent::Delivery => {
                self.order_tool(message, "delivery_status", "track delivery", |order_id| {
                    json!({ "order_id": order_id })
                })
                .await
            }
            Intent::Comparison => Ok(self.comparison(message).await),
            Intent::General | Intent::Error => Ok(self.general(message).await),
        }
    }

    async fn order_tool(
        &self,
        message: &str,
        tool: &str,
        purpose: &str,
        input: impl FnOnce(&str) -> Value,
    ) -> Result<HandlerOutcome> {
        let Some(order_id) = extract_order_id(message) else {
            return Ok(HandlerOutcome::reply(format!(
                "Please provide your order ID (format: ORD-XXXX) to {purpose}."
            )));
        };

        let reply = self.tools.execute(tool, input(&order_id.0)).await?;
        Ok(HandlerOutcome::from_tool(reply))
    }

    async fn product_info(&self, message: &str) -> HandlerOutcome {
        let hits = self.rag.retrieve(message, Some(PRODUCT_INFO_TOP_K)).await;
        let context = if hits.is_empty() {
            NO_PRODUCT_INFORMATION.to_string()
        } else {
            hits.iter().map(|hit| hit.text.as_str()).collect::<Vec<_>>().join("\n\n")
        };
        let sources = hits.iter().map(|hit| source_title(&hit.metadata.title, "Product Information")).collect();

        let mut metadata = Map::new();
        metadata.insert("num_results".to_string(), json!(hits.len()));
        HandlerOutcome { context: Some(context), sources: Some(sources), metadata, ..HandlerOutcome::default() }
    }

    async fn comparison(&self, message: &str) -> HandlerOutcome {
        let product_ids = extract_product_ids(message);
        if product_ids.len() < 2 {
            return self.product_info(message).await;
        }

        let comparison = self.graph.compare_products(&product_ids).await;
        let mut metadata = Map::new();
        metadata.insert(
            "product_ids".to_string(),
            json!(product_ids.iter().map(|id| id.0).collect::<Vec<_>>()),
        );
        HandlerOutcome {
            comparison: Some(comparison),
            sources: Some(Vec::new()),
            metadata,
            ..HandlerOutcome::default()
        }
    }

    async fn general(&self, message: &str) -> HandlerOutcome {
        let hits = self.rag.retrieve(message, Some(GENERAL_TOP_K)).await;
        let context: String = hits.iter().map(|hit| format!("{}\n\n", hit.text)).collect();
        let sources: Vec<String> =
            hits.iter().map(|hit| source_title(&hit.metadata.title, "Information")).collect();

        HandlerOutcome {
            context: Some(context),
            sources: if sources.is_empty() { None } else { Some(sources) },
            ..HandlerOutcome::default()
        }
    }

    async fn compose(&self, message: &str, session_id: &str, outcome: &HandlerOutcome) -> String {
        if let Some(reply) = &outcome.message {
            return reply.clone();
        }

        let mut messages = vec![ChatMessage::system(ASSISTANT_SYSTEM_PROMPT)];
        messages.extend(self.memory.recent(session_id, self.settings.history_window).await);
        if let Some(context) = build_context(outcome) {
            messages.push(ChatMessage::system(format!("Context for answering:\n{context}")));
        }
        messages.push(ChatMessage::user(message));

        self.llm.generate_with_history(&messages, self.settings.max_response_tokens).await
    }
}

fn source_title(title: &str, fallback: &str) -> String {
    if title.trim().is_empty() {
        fallback.to_string()
    } else {
        title.to_string()
    }
}

fn build_context(outcome: &HandlerOutcome) -> Option<String> {
    let mut parts = Vec::new();
    if let Some(context) = outcome.context.as_deref().filter(|context| !context.is_empty()) {
        parts.push(format!("Relevant Information:\n{context}"));
    }
    if let Some(comparison) = outcome.comparison.as_ref().filter(|comparison| !comparison.products.is_empty()) {
        parts.push(format!("Comparing products: {}", comparison.product_names().join(", ")));
        parts.push(format!("Recommendation: {}", comparison.recommendation));
    }

    if parts.is_empty() {
        None
    } else {
        Some(parts.join("\n\n"))
    }
}
