//! Gemini API client
//!
//! Every model call in a turn (classification, role agent tool loops, direct
//! replies) goes through the `LanguageModel` trait. `GeminiClient` is the
//! production implementation and holds a long-lived reqwest::Client for
//! connection pooling.

use crate::config::ModelConfig;
use crate::error::RouterError;
use crate::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, error, info};

//
// ================= Conversation model =================
//

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Content {
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub parts: Vec<Part>,
}

impl Content {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            parts: vec![Part::text(text)],
        }
    }

    /// Function responses travel back to the model in a user turn.
    pub fn function_responses(responses: Vec<FunctionResponse>) -> Self {
        Self {
            role: "user".to_string(),
            parts: responses
                .into_iter()
                .map(|function_response| Part {
                    function_response: Some(function_response),
                    ..Part::default()
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function_call: Option<FunctionCall>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function_response: Option<FunctionResponse>,
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    #[serde(default)]
    pub args: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionResponse {
    pub name: String,
    pub response: Value,
}

/// Tool schema advertised to the model for function calling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDeclaration {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

//
// ================= Request / Reply =================
//

#[derive(Debug, Clone)]
pub struct ModelRequest {
    pub system_instruction: Option<String>,
    pub contents: Vec<Content>,
    pub functions: Vec<FunctionDeclaration>,
    pub temperature: f32,
}

impl ModelRequest {
    /// Single user prompt, no tools.
    pub fn prompt(text: impl Into<String>) -> Self {
        Self {
            system_instruction: None,
            contents: vec![Content::user(text)],
            functions: Vec::new(),
            temperature: 0.3,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ModelReply {
    /// Concatenated text parts of the first candidate.
    pub text: String,
    pub function_calls: Vec<FunctionCall>,
    pub finish_reason: Option<String>,
    /// Raw model turn, appended to the conversation when tools were called.
    pub content: Content,
}

impl ModelReply {
    pub fn wants_tools(&self) -> bool {
        !self.function_calls.is_empty()
    }
}

/// A language model able to answer prompts and request function calls.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn generate(&self, request: &ModelRequest) -> Result<ModelReply>;

    /// Plain prompt in, text out.
    async fn complete(&self, prompt: &str) -> Result<String> {
        let reply = self.generate(&ModelRequest::prompt(prompt)).await?;
        Ok(reply.text)
    }
}

//
// ================= Gemini client =================
//

/// Reusable Gemini client (connection-pooled)
pub struct GeminiClient {
    client: Client,
    api_key: String,
    endpoint: String,
}

impl GeminiClient {
    pub fn new(config: &ModelConfig) -> Result<Self> {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(8)
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            endpoint: format!("{}/{}:generateContent", config.base_url, config.model),
        })
    }
}

#[async_trait]
impl LanguageModel for GeminiClient {
    async fn generate(&self, request: &ModelRequest) -> Result<ModelReply> {
        if self.api_key.is_empty() {
            return Err(RouterError::Llm("GEMINI_API_KEY not configured".to_string()));
        }

        let body = GeminiRequest::from(request);

        debug!(
            turns = request.contents.len(),
            functions = request.functions.len(),
            "Calling Gemini API"
        );

        let response = self
            .client
            .post(&self.endpoint)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                let e = e.without_url();
                error!("Gemini API request failed: {}", e);
                RouterError::Llm(format!("Gemini API error: {}", e))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            error!(%status, "Gemini API error response: {}", error_text);
            return Err(RouterError::Llm(format!(
                "Gemini API returned {}: {}",
                status, error_text
            )));
        }

        let gemini_response: GeminiResponse = response.json().await.map_err(|e| {
            let e = e.without_url();
            error!("Failed to parse Gemini response: {}", e);
            RouterError::Llm(format!("Gemini parse error: {}", e))
        })?;

        let reply = gemini_response.into_reply()?;

        info!(
            finish_reason = ?reply.finish_reason,
            function_calls = reply.function_calls.len(),
            "Gemini response received"
        );

        Ok(reply)
    }
}

//
// ================= Wire format =================
//

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<SystemInstruction>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<GeminiTool>,
    generation_config: GenerationConfig,
}

impl From<&ModelRequest> for GeminiRequest {
    fn from(request: &ModelRequest) -> Self {
        let tools = if request.functions.is_empty() {
            Vec::new()
        } else {
            vec![GeminiTool {
                function_declarations: request.functions.clone(),
            }]
        };

        Self {
            contents: request.contents.clone(),
            system_instruction: request.system_instruction.as_ref().map(|text| {
                SystemInstruction {
                    parts: vec![Part::text(text.clone())],
                }
            }),
            tools,
            generation_config: GenerationConfig {
                temperature: request.temperature,
                top_p: 0.9,
                top_k: 40,
                max_output_tokens: 2048,
            },
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiTool {
    function_declarations: Vec<FunctionDeclaration>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    top_p: f32,
    top_k: i32,
    max_output_tokens: i32,
}

#[derive(Debug, Serialize)]
struct SystemInstruction {
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Content,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: i64,
    #[serde(default)]
    candidates_token_count: i64,
}

impl GeminiResponse {
    fn into_reply(self) -> Result<ModelReply> {
        if let Some(usage) = &self.usage_metadata {
            debug!(
                prompt_tokens = usage.prompt_token_count,
                completion_tokens = usage.candidates_token_count,
                "Gemini token usage"
            );
        }

        let candidate = self
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| RouterError::Llm("No response from Gemini API".to_string()))?;

        let text = candidate
            .content
            .parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect::<Vec<_>>()
            .join("");

        let function_calls: Vec<FunctionCall> = candidate
            .content
            .parts
            .iter()
            .filter_map(|p| p.function_call.clone())
            .collect();

        if text.trim().is_empty() && function_calls.is_empty() {
            return Err(RouterError::Llm(format!(
                "Empty response from Gemini (finish reason: {})",
                candidate.finish_reason.as_deref().unwrap_or("unknown")
            )));
        }

        let mut content = candidate.content;
        if content.role.is_empty() {
            content.role = "model".to_string();
        }

        Ok(ModelReply {
            text,
            function_calls,
            finish_reason: candidate.finish_reason,
            content,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn model_config(base_url: &str, api_key: &str) -> ModelConfig {
        ModelConfig {
            api_key: api_key.to_string(),
            model: "gemini-2.0-flash".to_string(),
            base_url: base_url.to_string(),
            timeout: Duration::from_secs(5),
        }
    }

    #[test]
    fn test_request_serialization() {
        let mut request = ModelRequest::prompt("What is RSI?");
        request.system_instruction = Some("You are a stock analyst".to_string());
        request.functions = vec![FunctionDeclaration {
            name: "get_weather".to_string(),
            description: "Fetch weather".to_string(),
            parameters: json!({"type": "object"}),
        }];

        let json = serde_json::to_value(GeminiRequest::from(&request)).unwrap();
        assert_eq!(json["contents"][0]["parts"][0]["text"], "What is RSI?");
        assert_eq!(
            json["systemInstruction"]["parts"][0]["text"],
            "You are a stock analyst"
        );
        assert_eq!(
            json["tools"][0]["functionDeclarations"][0]["name"],
            "get_weather"
        );
        assert!(json["generationConfig"]["maxOutputTokens"].is_number());
    }

    #[test]
    fn test_plain_request_omits_tools() {
        let json = serde_json::to_value(GeminiRequest::from(&ModelRequest::prompt("hi"))).unwrap();
        assert!(json.get("tools").is_none());
        assert!(json.get("systemInstruction").is_none());
    }

    #[test]
    fn test_response_extracts_function_calls() {
        let response: GeminiResponse = serde_json::from_value(json!({
            "candidates": [{
                "content": {
                    "role": "model",
                    "parts": [{
                        "functionCall": {"name": "get_weather", "args": {"city": "Paris"}}
                    }]
                },
                "finishReason": "STOP"
            }]
        }))
        .unwrap();

        let reply = response.into_reply().unwrap();
        assert!(reply.wants_tools());
        assert_eq!(reply.function_calls[0].args["city"], "Paris");
        assert_eq!(reply.content.role, "model");
    }

    #[test]
    fn test_empty_candidates_is_llm_error() {
        let response: GeminiResponse = serde_json::from_value(json!({"candidates": []})).unwrap();
        assert!(matches!(response.into_reply(), Err(RouterError::Llm(_))));
    }

    #[tokio::test]
    async fn test_generate_against_mock_server() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/gemini-2.0-flash:generateContent"))
            .and(header("x-goog-api-key", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{
                    "content": {"role": "model", "parts": [{"text": "Sunny in Paris."}]},
                    "finishReason": "STOP"
                }],
                "usageMetadata": {"promptTokenCount": 10, "candidatesTokenCount": 4}
            })))
            .mount(&server)
            .await;

        let client = GeminiClient::new(&model_config(&server.uri(), "test-key")).unwrap();
        let text = client.complete("weather?").await.unwrap();
        assert_eq!(text, "Sunny in Paris.");
    }

    #[tokio::test]
    async fn test_generate_surfaces_http_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
            .mount(&server)
            .await;

        let client = GeminiClient::new(&model_config(&server.uri(), "test-key")).unwrap();
        let err = client.complete("hello").await.unwrap_err();
        assert!(matches!(err, RouterError::Llm(msg) if msg.contains("overloaded")));
    }

    #[tokio::test]
    async fn test_missing_api_key_fails_without_request() {
        let client = GeminiClient::new(&model_config("http://127.0.0.1:1", "")).unwrap();
        let err = client.complete("hello").await.unwrap_err();
        assert!(matches!(err, RouterError::Llm(_)));
    }

    #[tokio::test]
    async fn test_api_key_never_appears_in_errors() {
        let secret = "SUPER-SECRET-KEY";

        let unreachable = GeminiClient::new(&model_config("http://127.0.0.1:1", secret)).unwrap();
        let err = unreachable.complete("hello").await.unwrap_err();
        assert!(matches!(err, RouterError::Llm(_)));
        assert!(!err.to_string().contains(secret), "{}", err);

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;
        let client = GeminiClient::new(&model_config(&server.uri(), secret)).unwrap();
        let err = client.complete("hello").await.unwrap_err();
        assert!(!err.to_string().contains(secret), "{}", err);

        let requests = server.received_requests().await.unwrap();
        assert!(requests.iter().all(|r| !r.url.as_str().contains(secret)));
    }
}
