use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use techpro_core::config::AppConfig;
use techpro_core::ChatMessage;

pub const LIMITED_MODE_RESPONSE: &str = "I'm currently operating in limited mode. \
I can help you with product information, orders, and more. \
Please provide your order ID or ask about specific products.";

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful AI assistant for an electronics \
e-commerce platform. Provide accurate, concise, and friendly responses.";

pub const CLASSIFICATION_PROMPT: &str = "You are an intent classifier for an e-commerce chatbot.
Classify the user's message into one of these intents:
- product_info: Questions about products, features, specifications
- order_status: Tracking orders, order information
- complaint: Issues, problems, complaints about products or service
- refund: Return requests, refund inquiries
- delivery: Shipping, delivery tracking, delivery issues
- comparison: Comparing multiple products
- general: General questions, greetings, other

Respond with ONLY the intent name, nothing else.";

pub const CLASSIFICATION_MAX_TOKENS: u32 = 50;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CompletionOptions {
    pub max_tokens: u32,
    pub temperature: f32,
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    fn name(&self) -> &'static str;

    /// Whether answers come from a real model rather than canned text.
    fn is_remote(&self) -> bool {
        true
    }

    async fn complete(&self, messages: &[ChatMessage], options: CompletionOptions)
        -> Result<String>;
}

/// Client for any OpenAI-compatible `/chat/completions` endpoint (OpenAI, Ollama).
pub struct OpenAiChatClient {
    client: Client,
    endpoint: String,
    api_key: Option<SecretString>,
    model: String,
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Debug, Deserialize)]
struct CompletionMessage {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAiChatClient {
    pub fn new(
        base_url: &str,
        api_key: Option<SecretString>,
        model: &str,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build chat completion http client")?;
        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            api_key,
            model: model.to_string(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl LlmClient for OpenAiChatClient {
    fn name(&self) -> &'static str {
        "openai-compatible"
    }

    async fn complete(
        &self,
        messages: &[ChatMessage],
        options: CompletionOptions,
    ) -> Result<String> {
        debug!(
            event_name = "llm.request",
            endpoint = %self.endpoint,
            model = %self.model,
            messages = messages.len(),
            max_tokens = options.max_tokens,
            "requesting chat completion"
        );

        let mut request = self.client.post(&self.endpoint).json(&CompletionRequest {
            model: &self.model,
            messages,
            temperature: options.temperature,
            max_tokens: options.max_tokens,
        });
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key.expose_secret());
        }

        let response = request.send().await.context("chat completion request failed")?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("chat completion returned {status}: {body}"));
        }

        let payload: CompletionResponse =
            response.json().await.context("chat completion response was not valid json")?;
        extract_content(payload)
    }
}

fn extract_content(payload: CompletionResponse) -> Result<String> {
    payload
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .map(|content| content.trim().to_string())
        .ok_or_else(|| anyhow!("chat completion returned no content"))
}

/// Stand-in used when no model is configured.
#[derive(Clone, Copy, Debug, Default)]
pub struct OfflineLlm;

#[async_trait]
impl LlmClient for OfflineLlm {
    fn name(&self) -> &'static str {
        "offline"
    }

    fn is_remote(&self) -> bool {
        false
    }

    async fn complete(&self, _: &[ChatMessage], _: CompletionOptions) -> Result<String> {
        Ok(LIMITED_MODE_RESPONSE.to_string())
    }
}

/// Completion calls with the assistant's defaults; failures degrade to canned text.
#[derive(Clone)]
pub struct LlmService {
    client: Arc<dyn LlmClient>,
    temperature: f32,
}

impl LlmService {
    pub fn new(client: Arc<dyn LlmClient>, temperature: f32) -> Self {
        Self { client, temperature }
    }

    pub fn offline() -> Self {
        Self::new(Arc::new(OfflineLlm), 0.0)
    }

    pub fn from_config(config: &AppConfig) -> Result<Self> {
        if !config.llm.is_remote_available() {
            info!(
                event_name = "llm.selected",
                client = "offline",
                provider = ?config.llm.provider,
                "no language model available, running in limited mode"
            );
            return Ok(Self::offline());
        }

        let base_url = config
            .llm
            .base_url
            .as_deref()
            .ok_or_else(|| anyhow!("llm.base_url is required for {:?}", config.llm.provider))?;
        let client = OpenAiChatClient::new(
            base_url,
            config.llm.api_key.clone(),
            &config.llm.model,
            Duration::from_secs(config.llm.timeout_secs),
        )?;
        info!(
            event_name = "llm.selected",
            client = client.name(),
            endpoint = client.endpoint(),
            model = %config.llm.model,
            "language model configured"
        );
        Ok(Self::new(Arc::new(client), config.llm.temperature))
    }

    pub fn client_name(&self) -> &'static str {
        self.client.name()
    }

    pub fn is_remote(&self) -> bool {
        self.client.is_remote()
    }

    /// Completes a full message list, answering with the limited-mode text on failure.
    pub async fn generate_with_history(&self, messages: &[ChatMessage], max_tokens: u32) -> String {
        match self.client.complete(messages, self.options(max_tokens)).await {
            Ok(content) => content,
            Err(err) => {
                error!(
                    event_name = "llm.completion_failed",
                    client = self.client.name(),
                    error = %err,
                    "completion failed, answering in limited mode"
                );
                LIMITED_MODE_RESPONSE.to_string()
            }
        }
    }

    pub async fn generate_response(
        &self,
        prompt: &str,
        context: Option<&str>,
        system_prompt: Option<&str>,
        max_tokens: u32,
    ) -> String {
        let mut messages = vec![ChatMessage::system(system_prompt.unwrap_or(DEFAULT_SYSTEM_PROMPT))];
        if let Some(context) = context.filter(|context| !context.is_empty()) {
            messages.push(ChatMessage::system(format!("Context information:\n{context}")));
        }
        messages.push(ChatMessage::user(prompt));

        self.generate_with_history(&messages, max_tokens).await
    }

    /// Raw classifier answer; errors are returned so the caller can fall back.
    pub async fn classify(&self, message: &str) -> Result<String> {
        let messages = [ChatMessage::system(CLASSIFICATION_PROMPT), ChatMessage::user(message)];
        self.client.complete(&messages, self.options(CLASSIFICATION_MAX_TOKENS)).await
    }

    fn options(&self, max_tokens: u32) -> CompletionOptions {
        CompletionOptions { max_tokens, temperature: self.temperature }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use anyhow::{anyhow, Result};
    use async_trait::async_trait;

    use techpro_core::ChatMessage;

    use super::{CompletionOptions, LlmClient};

    /// Replays queued answers and records every request it receives.
    #[derive(Default)]
    pub struct ScriptedLlm {
        answers: Mutex<VecDeque<Result<String, String>>>,
        pub requests: Mutex<Vec<(Vec<ChatMessage>, CompletionOptions)>>,
    }

    impl ScriptedLlm {
        pub fn with_answers(answers: &[&str]) -> Self {
            let llm = Self::default();
            for answer in answers {
                llm.push_ok(answer);
            }
            llm
        }

        pub fn push_ok(&self, answer: &str) {
            self.answers.lock().expect("answers lock").push_back(Ok(answer.to_string()));
        }

        pub fn push_err(&self, message: &str) {
            self.answers.lock().expect("answers lock").push_back(Err(message.to_string()));
        }

        pub fn request(&self, index: usize) -> (Vec<ChatMessage>, CompletionOptions) {
            self.requests.lock().expect("requests lock")[index].clone()
        }
    }

    #[async_trait]
    impl LlmClient for ScriptedLlm {
        fn name(&self) -> &'static str {
            "scripted"
        }

        async fn complete(
            &self,
            messages: &[ChatMessage],
            options: CompletionOptions,
        ) -> Result<String> {
            self.requests.lock().expect("requests lock").push((messages.to_vec(), options));
            match self.answers.lock().expect("answers lock").pop_front() {
                Some(Ok(answer)) => Ok(answer),
                Some(Err(message)) => Err(anyhow!(message)),
                None => Err(anyhow!("no scripted answer left")),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use techpro_core::config::{AppConfig, LlmProvider};
    use techpro_core::Role;

    use super::testing::ScriptedLlm;
    use super::{
        extract_content, CompletionResponse, LlmService, CLASSIFICATION_MAX_TOKENS,
        DEFAULT_SYSTEM_PROMPT, LIMITED_MODE_RESPONSE,
    };

    #[tokio::test]
    async fn generate_response_builds_system_context_and_user_messages() {
        let llm = Arc::new(ScriptedLlm::with_answers(&["Sure thing."]));
        let service = LlmService::new(llm.clone(), 0.7);

        let answer = service.generate_response("Hi", Some("Store hours 9-5"), None, 200).await;
        assert_eq!(answer, "Sure thing.");

        let (messages, options) = llm.request(0);
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0].content, DEFAULT_SYSTEM_PROMPT);
        assert_eq!(messages[1].role, Role::System);
        assert_eq!(messages[1].content, "Context information:\nStore hours 9-5");
        assert_eq!(messages[2].role, Role::User);
        assert_eq!(options.max_tokens, 200);
        assert!((options.temperature - 0.7).abs() < f32::EPSILON);
    }

    #[tokio::test]
    async fn completion_failure_degrades_to_limited_mode() {
        let llm = Arc::new(ScriptedLlm::default());
        llm.push_err("rate limited");
        let service = LlmService::new(llm, 0.7);

        assert_eq!(service.generate_response("Hi", None, None, 100).await, LIMITED_MODE_RESPONSE);
    }

    #[tokio::test]
    async fn classify_uses_small_token_budget_and_surfaces_errors() {
        let llm = Arc::new(ScriptedLlm::with_answers(&["refund"]));
        let service = LlmService::new(llm.clone(), 0.2);

        assert_eq!(service.classify("money back please").await.expect("classify"), "refund");
        assert_eq!(llm.request(0).1.max_tokens, CLASSIFICATION_MAX_TOKENS);
        assert!(service.classify("again").await.is_err());
    }

    #[tokio::test]
    async fn offline_service_answers_with_limited_mode_text() {
        let service = LlmService::offline();
        assert!(!service.is_remote());
        assert_eq!(service.generate_response("Hi", None, None, 100).await, LIMITED_MODE_RESPONSE);
    }

    #[test]
    fn from_config_without_key_is_offline() {
        let mut config = AppConfig::default();
        config.llm.provider = LlmProvider::OpenAi;
        config.llm.api_key = None;
        let service = LlmService::from_config(&config).expect("service");
        assert_eq!(service.client_name(), "offline");

        config.llm.api_key = Some("sk-test".to_string().into());
        let service = LlmService::from_config(&config).expect("service");
        assert_eq!(service.client_name(), "openai-compatible");
        assert!(service.is_remote());
    }

    #[test]
    fn first_choice_content_is_trimmed() {
        let payload: CompletionResponse = serde_json::from_value(json!({
            "choices": [{"message": {"content": "  order_status\n"}}]
        }))
        .expect("payload");
        assert_eq!(extract_content(payload).expect("content"), "order_status");

        let empty: CompletionResponse =
            serde_json::from_value(json!({"choices": []})).expect("payload");
        assert!(extract_content(empty).is_err());
    }
}
