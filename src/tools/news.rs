//! Polygon.io news lookup for a ticker

use super::{require_str, required_key, ProviderHttp, Tool};
use crate::config::ProviderConfig;
use crate::models::{ToolInput, ToolOutput};
use crate::Result;
use serde_json::{json, Value};
use tracing::warn;

const DEFAULT_LIMIT: u64 = 1;
const MAX_LIMIT: u64 = 50;
/// Articles handed back to the model
const TOP_ARTICLES: usize = 3;

pub struct PolygonNewsTool {
    http: ProviderHttp,
    base_url: String,
    api_key: Option<String>,
}

impl PolygonNewsTool {
    pub(crate) fn new(http: ProviderHttp, config: &ProviderConfig) -> Self {
        Self {
            http,
            base_url: config.polygon_base_url.clone(),
            api_key: config.polygon_api_key.clone(),
        }
    }

    async fn fetch(&self, ticker: &str, limit: u64) -> Result<Value> {
        let api_key = required_key(&self.api_key, "POLYGON_API_KEY")?;
        let url = format!("{}/v2/reference/news", self.base_url);

        let body = self
            .http
            .get_json(
                &url,
                &[
                    ("ticker", ticker.to_string()),
                    ("limit", limit.to_string()),
                    ("apiKey", api_key),
                ],
            )
            .await?;

        let articles: Vec<Value> = body
            .get("results")
            .and_then(Value::as_array)
            .map(|results| results.iter().take(TOP_ARTICLES).map(summarize_article).collect())
            .unwrap_or_default();

        Ok(Value::Array(articles))
    }
}

fn summarize_article(article: &Value) -> Value {
    json!({
        "title": article.get("title"),
        "published_utc": article.get("published_utc"),
        "publisher": article.pointer("/publisher/name"),
        "description": article.get("description"),
        "article_url": article.get("article_url"),
        "tickers": article.get("tickers"),
    })
}

#[async_trait::async_trait]
impl Tool for PolygonNewsTool {
    fn name(&self) -> &'static str {
        "get_polygon_news"
    }

    fn description(&self) -> &'static str {
        "Fetch recent news articles about a stock ticker from Polygon.io"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "ticker": {"type": "string", "description": "Stock ticker symbol, e.g. AMZN"},
                "limit": {"type": "integer", "description": "Number of articles to request (default 1)"}
            },
            "required": ["ticker"]
        })
    }

    async fn execute(&self, input: &ToolInput) -> ToolOutput {
        let ticker = match require_str(input, "ticker") {
            Ok(t) => t.to_uppercase(),
            Err(e) => return ToolOutput::failure(e.to_string()),
        };
        let limit = input
            .parameters
            .get("limit")
            .and_then(Value::as_u64)
            .unwrap_or(DEFAULT_LIMIT)
            .clamp(1, MAX_LIMIT);

        match self.fetch(&ticker, limit).await {
            Ok(articles) => ToolOutput::ok(articles),
            Err(e) => {
                warn!(ticker = %ticker, error = %e, "Polygon news lookup failed");
                ToolOutput::failure(format!(
                    "Error fetching Polygon.io news for {}: {}",
                    ticker, e
                ))
            }
        }
    }
}
