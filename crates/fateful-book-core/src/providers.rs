//! Chat-completions providers — Groq, OpenAI, OpenRouter and Gemini all speak the
//! OpenAI-compatible `/chat/completions` shape. Selected once at startup.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::{GatewayConfig, LlmProvider};
use crate::conversation::{Role, Turn};
use crate::generator::{GenerateError, MockGenerator, TextGenerator};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Static description of one OpenAI-compatible backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProviderSpec {
    pub name: &'static str,
    pub base_url: &'static str,
    pub default_model: &'static str,
    pub key_var: &'static str,
}

pub const GROQ: ProviderSpec = ProviderSpec {
    name: "groq",
    base_url: "https://api.groq.com/openai/v1",
    default_model: "llama-3.3-70b-versatile",
    key_var: "GROQ_API_KEY",
};

pub const OPENAI: ProviderSpec = ProviderSpec {
    name: "openai",
    base_url: "https://api.openai.com/v1",
    default_model: "gpt-4o-mini",
    key_var: "OPENAI_API_KEY",
};

pub const OPENROUTER: ProviderSpec = ProviderSpec {
    name: "openrouter",
    base_url: "https://openrouter.ai/api/v1",
    default_model: "meta-llama/llama-3.3-70b-instruct",
    key_var: "OPENROUTER_API_KEY",
};

pub const GEMINI: ProviderSpec = ProviderSpec {
    name: "gemini",
    base_url: "https://generativelanguage.googleapis.com/v1beta/openai",
    default_model: "gemini-2.0-flash",
    key_var: "GEMINI_API_KEY",
};

/// Order used by `auto` selection.
pub const AUTO_ORDER: [ProviderSpec; 4] = [GROQ, OPENAI, OPENROUTER, GEMINI];

#[derive(Debug, Serialize, PartialEq)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Option<Vec<Choice>>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<ResponseMessage>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

fn wire_role(role: Role) -> &'static str {
    match role {
        Role::User => "user",
        Role::Counselor => "assistant",
    }
}

/// System prompt, then history in order, then the live message.
fn build_messages<'a>(
    system_prompt: Option<&'a str>,
    history: &'a [Turn],
    live_message: &'a str,
) -> Vec<ChatMessage<'a>> {
    let mut messages = Vec::with_capacity(history.len() + 2);
    if let Some(system) = system_prompt {
        messages.push(ChatMessage {
            role: "system",
            content: system,
        });
    }
    messages.extend(history.iter().map(|t| ChatMessage {
        role: wire_role(t.role),
        content: &t.text,
    }));
    messages.push(ChatMessage {
        role: "user",
        content: live_message,
    });
    messages
}

fn first_content(body: &str) -> Result<String, GenerateError> {
    let parsed: ChatCompletionResponse =
        serde_json::from_str(body).map_err(|e| GenerateError::Decode(e.to_string()))?;
    parsed
        .choices
        .and_then(|c| c.into_iter().next())
        .and_then(|c| c.message)
        .and_then(|m| m.content)
        .filter(|c| !c.trim().is_empty())
        .ok_or(GenerateError::EmptyResponse)
}

pub struct ChatCompletionsGenerator {
    spec: ProviderSpec,
    model: String,
    api_key: String,
    base_url: String,
    client: reqwest::Client,
}

impl ChatCompletionsGenerator {
    pub fn new(spec: ProviderSpec, api_key: impl Into<String>, model: Option<String>) -> Result<Self, GenerateError> {
        let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            spec,
            model: model.unwrap_or_else(|| spec.default_model.to_string()),
            api_key: api_key.into(),
            base_url: spec.base_url.to_string(),
            client,
        })
    }

    /// Points the client at another OpenAI-compatible server.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, messages: Vec<ChatMessage<'_>>) -> Result<String, GenerateError> {
        let body = ChatCompletionRequest {
            model: &self.model,
            messages,
            stream: false,
        };
        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));

        let res = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = res.status();
        let text = res.text().await?;
        if !status.is_success() {
            return Err(GenerateError::Status {
                provider: self.spec.name,
                status: status.as_u16(),
                body: text,
            });
        }
        first_content(&text)
    }
}

#[async_trait]
impl TextGenerator for ChatCompletionsGenerator {
    fn name(&self) -> &str {
        self.spec.name
    }

    async fn generate_reply(
        &self,
        system_prompt: Option<&str>,
        history: &[Turn],
        live_message: &str,
    ) -> Result<String, GenerateError> {
        tracing::debug!(provider = self.spec.name, history = history.len(), "chat turn");
        self.complete(build_messages(system_prompt, history, live_message)).await
    }

    async fn generate_structured(&self, prompt: &str) -> Result<String, GenerateError> {
        self.complete(build_messages(None, &[], prompt)).await
    }
}

/// API keys found in the environment, keyed by provider.
#[derive(Debug, Clone, Default)]
pub struct ProviderKeys {
    keys: Vec<(&'static str, String)>,
}

impl ProviderKeys {
    pub fn from_env() -> Self {
        let keys = AUTO_ORDER
            .iter()
            .filter_map(|spec| {
                std::env::var(spec.key_var)
                    .ok()
                    .filter(|k| !k.trim().is_empty())
                    .map(|k| (spec.key_var, k))
            })
            .collect();
        Self { keys }
    }

    pub fn with(mut self, key_var: &'static str, key: impl Into<String>) -> Self {
        self.keys.push((key_var, key.into()));
        self
    }

    pub fn get(&self, spec: &ProviderSpec) -> Option<&str> {
        self.keys
            .iter()
            .find(|(var, _)| *var == spec.key_var)
            .map(|(_, k)| k.as_str())
    }
}

fn spec_for(provider: LlmProvider) -> Option<ProviderSpec> {
    match provider {
        LlmProvider::Groq => Some(GROQ),
        LlmProvider::OpenAi => Some(OPENAI),
        LlmProvider::OpenRouter => Some(OPENROUTER),
        LlmProvider::Gemini => Some(GEMINI),
        LlmProvider::Auto | LlmProvider::Mock => None,
    }
}

/// Picks the generator once. An explicit provider without its key falls back to the mock.
pub fn select_generator(config: &GatewayConfig, keys: &ProviderKeys) -> Result<Arc<dyn TextGenerator>, GenerateError> {
    let chosen = match config.llm_provider {
        LlmProvider::Mock => None,
        LlmProvider::Auto => AUTO_ORDER
            .iter()
            .find_map(|spec| keys.get(spec).map(|k| (*spec, k))),
        explicit => spec_for(explicit).and_then(|spec| match keys.get(&spec) {
            Some(k) => Some((spec, k)),
            None => {
                tracing::warn!("{} selected but {} is not set", spec.name, spec.key_var);
                None
            }
        }),
    };

    match chosen {
        Some((spec, key)) => {
            let generator = ChatCompletionsGenerator::new(spec, key, config.llm_model.clone())?;
            tracing::info!("[SYSTEM] Text generation via {} ({})", spec.name, generator.model());
            Ok(Arc::new(generator))
        }
        None => {
            tracing::info!("[SYSTEM] Text generation via mock (no provider key)");
            Ok(Arc::new(MockGenerator))
        }
    }
}
