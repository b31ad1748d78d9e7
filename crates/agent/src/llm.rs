//! LLM transport and the reasoner built on top of it.
//!
//! `LlmClient` is the pluggable one-method completion seam; `OllamaClient`
//! implements it against an Ollama-compatible HTTP endpoint. `LlmReasoner`
//! turns completions into the structured decisions the engine consumes,
//! tolerating the pre/post-text and code fences models wrap JSON in.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;

use specwatch_core::config::LlmConfig;

use crate::prompts;
use crate::reasoner::{
    PlannerContext, PlannerDecision, QueryAnalysis, Reasoner, ReasonerError, ResponderContext,
};
use crate::state::{Intent, IntentRecord};

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("llm request failed: {0}")]
    Transport(String),
    #[error("llm endpoint returned status {0}")]
    Status(u16),
    #[error("llm returned an empty completion")]
    EmptyCompletion,
}

impl From<LlmError> for ReasonerError {
    fn from(error: LlmError) -> Self {
        match error {
            LlmError::EmptyCompletion => Self::Malformed(error.to_string()),
            LlmError::Transport(_) | LlmError::Status(_) => Self::Unavailable(error.to_string()),
        }
    }
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, LlmError>;
}

pub struct OllamaClient {
    http: reqwest::Client,
    base_url: String,
    model: String,
    temperature: f32,
    api_key: Option<SecretString>,
}

impl OllamaClient {
    pub fn new(config: &LlmConfig) -> Result<Self, LlmError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|error| LlmError::Transport(error.to_string()))?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            temperature: config.temperature,
            api_key: config.api_key.clone(),
        })
    }
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

#[async_trait]
impl LlmClient for OllamaClient {
    async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        let body = json!({
            "model": self.model,
            "prompt": prompt,
            "stream": false,
            "options": { "temperature": self.temperature },
        });

        let mut request = self.http.post(format!("{}/api/generate", self.base_url)).json(&body);
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key.expose_secret());
        }

        let response =
            request.send().await.map_err(|error| LlmError::Transport(error.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(LlmError::Status(status.as_u16()));
        }

        let payload: GenerateResponse =
            response.json().await.map_err(|error| LlmError::Transport(error.to_string()))?;
        if payload.response.trim().is_empty() {
            return Err(LlmError::EmptyCompletion);
        }
        Ok(payload.response)
    }
}

/// Reasoner that prompts an `LlmClient` per role and parses the structured
/// replies.
pub struct LlmReasoner<C> {
    client: C,
}

impl<C> LlmReasoner<C>
where
    C: LlmClient,
{
    pub fn new(client: C) -> Self {
        Self { client }
    }
}

#[derive(Deserialize)]
struct AnalysisWire {
    #[serde(default)]
    requires_schema_knowledge: bool,
    #[serde(default)]
    requires_rf_knowledge: bool,
    #[serde(default)]
    requires_database_queries: bool,
    #[serde(default)]
    detected_entities: Value,
}

#[derive(Deserialize)]
struct ClassificationWire {
    #[serde(default)]
    intent: String,
    #[serde(default)]
    confidence: f64,
    #[serde(default)]
    reasoning: String,
    #[serde(default)]
    extracted_info: Value,
}

#[derive(Deserialize)]
struct PlanWire {
    #[serde(default)]
    next_action: String,
    #[serde(default)]
    reasoning: String,
    #[serde(default)]
    selected_tool: Option<String>,
    #[serde(default)]
    tool_parameters: Value,
}

#[async_trait]
impl<C> Reasoner for LlmReasoner<C>
where
    C: LlmClient,
{
    async fn analyze(&self, query: &str) -> Result<QueryAnalysis, ReasonerError> {
        let completion = self.client.complete(&prompts::analysis_prompt(query)).await?;
        let wire: AnalysisWire = parse_structured(&completion)?;
        Ok(QueryAnalysis {
            requires_schema_knowledge: wire.requires_schema_knowledge,
            requires_rf_knowledge: wire.requires_rf_knowledge,
            requires_store_access: wire.requires_database_queries,
            entities: wire.detected_entities,
        })
    }

    async fn classify(
        &self,
        query: &str,
        analysis: &QueryAnalysis,
    ) -> Result<IntentRecord, ReasonerError> {
        let completion =
            self.client.complete(&prompts::classification_prompt(query, analysis)).await?;
        let wire: ClassificationWire = parse_structured(&completion)?;
        Ok(IntentRecord {
            intent: Intent::from_label(&wire.intent),
            confidence: wire.confidence.clamp(0.0, 1.0),
            reasoning: wire.reasoning,
            entities: wire.extracted_info,
        })
    }

    async fn plan(&self, context: &PlannerContext<'_>) -> Result<PlannerDecision, ReasonerError> {
        let completion = self.client.complete(&prompts::planner_prompt(context)).await?;
        let wire: PlanWire = parse_structured(&completion)?;
        if wire.next_action == "call_tool" {
            Ok(PlannerDecision::CallTool {
                // A missing name fails registry resolution downstream, which
                // feeds the self-correction loop instead of ending the run.
                tool: wire.selected_tool.unwrap_or_default(),
                parameters: wire.tool_parameters,
                reasoning: wire.reasoning,
            })
        } else {
            Ok(PlannerDecision::Respond { reasoning: wire.reasoning })
        }
    }

    async fn respond_generic(&self, query: &str) -> Result<String, ReasonerError> {
        let completion = self.client.complete(&prompts::generic_prompt(query)).await?;
        Ok(completion.trim().to_string())
    }

    async fn summarize(&self, context: &ResponderContext<'_>) -> Result<String, ReasonerError> {
        let completion = self.client.complete(&prompts::responder_prompt(context)).await?;
        Ok(completion.trim().to_string())
    }
}

/// Parses a structured reply, stripping code fences and surrounding prose
/// when the raw text is not already clean JSON.
fn parse_structured<T: serde::de::DeserializeOwned>(raw: &str) -> Result<T, ReasonerError> {
    if let Ok(parsed) = serde_json::from_str::<T>(raw.trim()) {
        return Ok(parsed);
    }
    let extracted = extract_json(raw)
        .ok_or_else(|| ReasonerError::Malformed("no JSON object in completion".to_string()))?;
    serde_json::from_str(extracted).map_err(|error| ReasonerError::Malformed(error.to_string()))
}

/// Extracts the JSON object embedded in a completion: a fenced block when
/// present, otherwise the span from the first `{` to the last `}`.
fn extract_json(raw: &str) -> Option<&str> {
    let fenced = raw.find("```").and_then(|start| {
        let after_fence = &raw[start + 3..];
        let body_start = after_fence.find('\n').map(|index| index + 1).unwrap_or(0);
        let body = &after_fence[body_start..];
        body.find("```").map(|end| &body[..end])
    });

    let candidate = fenced.unwrap_or(raw);
    let first = candidate.find('{')?;
    let last = candidate.rfind('}')?;
    if last <= first {
        return None;
    }
    Some(candidate[first..=last].trim())
}
