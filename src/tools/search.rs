//! Serper web search

use super::{require_str, required_key, ProviderHttp, Tool};
use crate::config::ProviderConfig;
use crate::models::{ToolInput, ToolOutput};
use crate::Result;
use serde_json::{json, Value};
use tracing::{debug, warn};

pub struct SerperSearchTool {
    http: ProviderHttp,
    base_url: String,
    api_key: Option<String>,
}

impl SerperSearchTool {
    pub(crate) fn new(http: ProviderHttp, config: &ProviderConfig) -> Self {
        Self {
            http,
            base_url: config.serper_base_url.clone(),
            api_key: config.serper_api_key.clone(),
        }
    }

    async fn fetch(&self, query: &str) -> Result<Value> {
        let api_key = required_key(&self.api_key, "SERPER_API_KEY")?;
        let url = format!("{}/search", self.base_url);

        let body = self
            .http
            .post_json(&url, &[("X-API-KEY", api_key.as_str())], &json!({ "q": query }))
            .await?;

        let mut results = Vec::new();

        if let Some(answer) = body.get("answerBox") {
            results.push(json!({
                "title": answer.get("title"),
                "snippet": answer.get("answer").or_else(|| answer.get("snippet")),
                "link": answer.get("link"),
            }));
        }

        if let Some(organic) = body.get("organic").and_then(Value::as_array) {
            results.extend(organic.iter().map(|item| {
                json!({
                    "title": item.get("title"),
                    "link": item.get("link"),
                    "snippet": item.get("snippet"),
                })
            }));
        }

        debug!(results = results.len(), "Serper search completed");
        Ok(Value::Array(results))
    }
}

#[async_trait::async_trait]
impl Tool for SerperSearchTool {
    fn name(&self) -> &'static str {
        "search_query"
    }

    fn description(&self) -> &'static str {
        "Search the web and return relevant links with snippets"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {"type": "string", "description": "The query to search on the web"}
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, input: &ToolInput) -> ToolOutput {
        let query = match require_str(input, "query") {
            Ok(q) => q,
            Err(e) => return ToolOutput::failure(e.to_string()),
        };

        match self.fetch(&query).await {
            Ok(results) => ToolOutput::ok(results),
            Err(e) => {
                warn!(error = %e, "Serper search failed");
                ToolOutput::failure(format!("Error fetching search links: {}", e))
            }
        }
    }
}
