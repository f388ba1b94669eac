//! Tool trait and registry
//!
//! Tools are the capability providers role agents may call through the
//! model: stateless, idempotent, one HTTP round trip each. A tool never
//! raises; failures come back as an error-shaped `ToolOutput` the model
//! reasons about.

use crate::config::ProviderConfig;
use crate::error::RouterError;
use crate::gemini::FunctionDeclaration;
use crate::models::{ToolInput, ToolOutput};
use crate::Result;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

pub mod finance;
pub mod news;
pub mod search;
pub mod weather;

pub use finance::{YahooFinanceComparisonTool, YahooFinanceTool};
pub use news::PolygonNewsTool;
pub use search::SerperSearchTool;
pub use weather::WeatherTool;

/// Trait for a single capability provider
#[async_trait::async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &'static str;
    fn description(&self) -> &'static str;
    /// JSON schema of the parameters object
    fn parameters(&self) -> Value;
    async fn execute(&self, input: &ToolInput) -> ToolOutput;

    fn declaration(&self) -> FunctionDeclaration {
        FunctionDeclaration {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters(),
        }
    }
}

/// Tool registry for looking up and executing tools
#[derive(Clone)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// Registered tool names, sorted
    pub fn list(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tools.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Function declarations for every registered tool, sorted by name
    pub fn declarations(&self) -> Vec<FunctionDeclaration> {
        self.list()
            .into_iter()
            .filter_map(|name| self.tools.get(name))
            .map(|tool| tool.declaration())
            .collect()
    }

    /// Registry restricted to the named tools; every name must exist.
    pub fn bind(&self, names: &[&str]) -> Result<ToolRegistry> {
        let mut bound = ToolRegistry::new();
        for name in names {
            let tool = self.get(name).ok_or_else(|| {
                RouterError::Config(format!("tool '{}' is not registered", name))
            })?;
            bound.register(tool);
        }
        Ok(bound)
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared HTTP plumbing for the providers
///
/// Query strings carry provider keys, so transport errors are reported
/// without their URL.
#[derive(Clone)]
pub(crate) struct ProviderHttp {
    client: Client,
}

impl ProviderHttp {
    pub(crate) fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(60))
            .pool_max_idle_per_host(8)
            .timeout(timeout)
            .build()?;

        Ok(Self { client })
    }

    /// GET returning status and JSON body without judging the status
    pub(crate) async fn get(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<(StatusCode, Value)> {
        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| {
                RouterError::Tool(format!("request to {} failed: {}", url, e.without_url()))
            })?;

        let status = response.status();
        let body = response
            .json::<Value>()
            .await
            .map_err(|e| {
                RouterError::Tool(format!("Invalid JSON response: {}", e.without_url()))
            })?;

        Ok((status, body))
    }

    pub(crate) async fn get_json(&self, url: &str, query: &[(&str, String)]) -> Result<Value> {
        let (status, body) = self.get(url, query).await?;
        ensure_success(status, url, body)
    }

    pub(crate) async fn post_json(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        body: &Value,
    ) -> Result<Value> {
        let mut request = self
            .client
            .post(url)
            .header("Content-Type", "application/json")
            .json(body);
        for (name, value) in headers {
            request = request.header(*name, *value);
        }

        let response = request
            .send()
            .await
            .map_err(|e| {
                RouterError::Tool(format!("request to {} failed: {}", url, e.without_url()))
            })?;

        let status = response.status();
        let body = response
            .json::<Value>()
            .await
            .map_err(|e| {
                RouterError::Tool(format!("Invalid JSON response: {}", e.without_url()))
            })?;

        ensure_success(status, url, body)
    }
}

fn ensure_success(status: StatusCode, url: &str, body: Value) -> Result<Value> {
    if !status.is_success() {
        return Err(RouterError::Tool(format!(
            "{} returned {}: {}",
            url, status, body
        )));
    }
    Ok(body)
}

fn ensure_object_parameters(input: &ToolInput) -> Result<()> {
    if input.parameters.is_object() {
        Ok(())
    } else {
        Err(RouterError::Tool("tool_input must be a JSON object".to_string()))
    }
}

/// Required non-blank string parameter
pub(crate) fn require_str(input: &ToolInput, key: &str) -> Result<String> {
    ensure_object_parameters(input)?;
    input
        .parameters
        .get(key)
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .ok_or_else(|| RouterError::Tool(format!("Expected '{}' in tool input", key)))
}

pub(crate) fn optional_str(input: &ToolInput, key: &str, default: &str) -> String {
    input
        .parameters
        .get(key)
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(default)
        .to_string()
}

pub(crate) fn required_key(key: &Option<String>, var: &str) -> Result<String> {
    key.clone()
        .ok_or_else(|| RouterError::Config(format!("{} is not configured", var)))
}

/// Create the registry of all capability providers.
pub fn create_default_registry(config: &ProviderConfig) -> Result<ToolRegistry> {
    let http = ProviderHttp::new(config.tool_timeout)?;
    let mut registry = ToolRegistry::new();

    registry.register(Arc::new(YahooFinanceTool::new(http.clone(), config)));
    registry.register(Arc::new(YahooFinanceComparisonTool::new(http.clone(), config)));
    registry.register(Arc::new(PolygonNewsTool::new(http.clone(), config)));
    registry.register(Arc::new(SerperSearchTool::new(http.clone(), config)));
    registry.register(Arc::new(WeatherTool::new(http, config)));

    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn input(parameters: Value) -> ToolInput {
        ToolInput {
            tool_name: "test".to_string(),
            parameters,
        }
    }

    #[test]
    fn test_default_registry_lists_all_providers() {
        let registry =
            create_default_registry(&ProviderConfig::with_base_url("http://127.0.0.1:1")).unwrap();
        assert_eq!(
            registry.list(),
            vec![
                "get_polygon_news",
                "get_weather",
                "get_yahoo_finance_data",
                "get_yahoo_finance_data_comparison",
                "search_query",
            ]
        );
        assert_eq!(registry.declarations().len(), 5);
    }

    #[test]
    fn test_bind_restricts_and_rejects_unknown() {
        let registry =
            create_default_registry(&ProviderConfig::with_base_url("http://127.0.0.1:1")).unwrap();

        let bound = registry.bind(&["get_weather"]).unwrap();
        assert_eq!(bound.list(), vec!["get_weather"]);
        assert!(bound.get("search_query").is_none());

        assert!(registry.bind(&["launch_rockets"]).is_err());
    }

    #[test]
    fn test_require_str_trims_and_rejects_blank() {
        assert_eq!(
            require_str(&input(json!({"city": " Paris "})), "city").unwrap(),
            "Paris"
        );
        assert!(require_str(&input(json!({"city": "  "})), "city").is_err());
        assert!(require_str(&input(json!("Paris")), "city").is_err());
        assert_eq!(optional_str(&input(json!({})), "period", "1d"), "1d");
    }
}
