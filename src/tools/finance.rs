//! Yahoo Finance lookups: single ticker and ticker comparison
//!
//! Uses the public chart endpoint, which carries both the quote metadata
//! (used as the company/market profile) and the OHLCV history.

use super::{optional_str, require_str, ProviderHttp, Tool};
use crate::config::ProviderConfig;
use crate::error::RouterError;
use crate::models::{ToolInput, ToolOutput};
use crate::Result;
use chrono::{TimeZone, Utc};
use serde_json::{json, Map, Value};
use tracing::{debug, warn};

const DEFAULT_PERIOD: &str = "1d";
const DEFAULT_INTERVAL: &str = "1m";
/// Bars kept from the tail of the history
const RECENT_BARS: usize = 5;
const MAX_TICKER_LEN: usize = 16;

const PROFILE_FIELDS: &[&str] = &[
    "symbol",
    "longName",
    "shortName",
    "currency",
    "exchangeName",
    "instrumentType",
    "regularMarketPrice",
    "regularMarketDayHigh",
    "regularMarketDayLow",
    "regularMarketVolume",
    "chartPreviousClose",
    "previousClose",
    "fiftyTwoWeekHigh",
    "fiftyTwoWeekLow",
];

#[derive(Clone)]
struct YahooFinanceApi {
    http: ProviderHttp,
    base_url: String,
}

impl YahooFinanceApi {
    async fn snapshot(&self, ticker: &str, period: &str, interval: &str) -> Result<Value> {
        validate_ticker(ticker)?;
        let url = format!("{}/v8/finance/chart/{}", self.base_url, ticker);
        let body = self
            .http
            .get_json(
                &url,
                &[("range", period.to_string()), ("interval", interval.to_string())],
            )
            .await?;

        debug!(ticker, "Yahoo Finance chart received");
        parse_chart(ticker, &body)
    }
}

/// The ticker becomes a URL path segment, so only symbol characters pass.
fn validate_ticker(ticker: &str) -> Result<()> {
    let valid = !ticker.is_empty()
        && ticker.len() <= MAX_TICKER_LEN
        && ticker
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || ".-^=".contains(c));

    if valid {
        Ok(())
    } else {
        Err(RouterError::Tool(format!("invalid ticker symbol '{}'", ticker)))
    }
}

fn parse_chart(ticker: &str, body: &Value) -> Result<Value> {
    let chart = body
        .get("chart")
        .ok_or_else(|| RouterError::Tool("missing 'chart' in response".to_string()))?;

    if let Some(err) = chart.get("error").filter(|e| !e.is_null()) {
        let description = err
            .get("description")
            .and_then(Value::as_str)
            .unwrap_or("unknown error");
        return Err(RouterError::Tool(description.to_string()));
    }

    let result = chart
        .get("result")
        .and_then(Value::as_array)
        .and_then(|r| r.first())
        .ok_or_else(|| RouterError::Tool(format!("no chart data for {}", ticker)))?;

    let meta = result.get("meta").cloned().unwrap_or(Value::Null);
    let profile: Map<String, Value> = PROFILE_FIELDS
        .iter()
        .filter_map(|field| meta.get(*field).map(|v| (field.to_string(), v.clone())))
        .collect();

    Ok(json!({
        "ticker": ticker,
        "profile": profile,
        "recent_history": recent_history(result),
    }))
}

fn recent_history(result: &Value) -> Value {
    let timestamps: Vec<i64> = result
        .get("timestamp")
        .and_then(Value::as_array)
        .map(|ts| ts.iter().filter_map(Value::as_i64).collect())
        .unwrap_or_default();

    if timestamps.is_empty() {
        return Value::String("Data unavailable".to_string());
    }

    let quote = result
        .pointer("/indicators/quote/0")
        .cloned()
        .unwrap_or(Value::Null);
    let column = |name: &str, i: usize| {
        quote
            .get(name)
            .and_then(|c| c.get(i))
            .cloned()
            .unwrap_or(Value::Null)
    };

    let start = timestamps.len().saturating_sub(RECENT_BARS);
    let bars: Vec<Value> = timestamps[start..]
        .iter()
        .enumerate()
        .map(|(offset, ts)| {
            let i = start + offset;
            let time = Utc
                .timestamp_opt(*ts, 0)
                .single()
                .map(|t| t.to_rfc3339())
                .unwrap_or_else(|| ts.to_string());
            json!({
                "time": time,
                "open": column("open", i),
                "high": column("high", i),
                "low": column("low", i),
                "close": column("close", i),
                "volume": column("volume", i),
            })
        })
        .collect();

    Value::Array(bars)
}

/// Tickers as a JSON array, or a comma separated string
fn require_tickers(input: &ToolInput) -> Result<Vec<String>> {
    let raw = input.parameters.get("tickers");
    let tickers: Vec<String> = match raw {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(|t| t.trim().to_uppercase())
            .filter(|t| !t.is_empty())
            .collect(),
        Some(Value::String(s)) => s
            .split(',')
            .map(|t| t.trim().to_uppercase())
            .filter(|t| !t.is_empty())
            .collect(),
        _ => Vec::new(),
    };

    if tickers.is_empty() {
        return Err(RouterError::Tool("Expected a non-empty 'tickers' list".to_string()));
    }
    Ok(tickers)
}

fn period_schema() -> Value {
    json!({
        "type": "string",
        "description": "History range, e.g. 1d, 5d, 1mo, 6mo, 1y (default 1d)"
    })
}

fn interval_schema() -> Value {
    json!({
        "type": "string",
        "description": "Bar interval, e.g. 1m, 5m, 1h, 1d (default 1m)"
    })
}

pub struct YahooFinanceTool {
    api: YahooFinanceApi,
}

impl YahooFinanceTool {
    pub(crate) fn new(http: ProviderHttp, config: &ProviderConfig) -> Self {
        Self {
            api: YahooFinanceApi {
                http,
                base_url: config.yahoo_finance_base_url.clone(),
            },
        }
    }
}

#[async_trait::async_trait]
impl Tool for YahooFinanceTool {
    fn name(&self) -> &'static str {
        "get_yahoo_finance_data"
    }

    fn description(&self) -> &'static str {
        "Fetch real-time stock data and recent price history from Yahoo Finance for one ticker"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "ticker": {"type": "string", "description": "Stock ticker symbol, e.g. AAPL"},
                "period": period_schema(),
                "interval": interval_schema(),
            },
            "required": ["ticker"]
        })
    }

    async fn execute(&self, input: &ToolInput) -> ToolOutput {
        let ticker = match require_str(input, "ticker") {
            Ok(t) => t.to_uppercase(),
            Err(e) => return ToolOutput::failure(e.to_string()),
        };
        let period = optional_str(input, "period", DEFAULT_PERIOD);
        let interval = optional_str(input, "interval", DEFAULT_INTERVAL);

        match self.api.snapshot(&ticker, &period, &interval).await {
            Ok(data) => ToolOutput::ok(data),
            Err(e) => {
                warn!(ticker = %ticker, error = %e, "Yahoo Finance lookup failed");
                ToolOutput::failure(format!(
                    "Error fetching Yahoo Finance data for {}: {}",
                    ticker, e
                ))
            }
        }
    }
}

pub struct YahooFinanceComparisonTool {
    api: YahooFinanceApi,
}

impl YahooFinanceComparisonTool {
    pub(crate) fn new(http: ProviderHttp, config: &ProviderConfig) -> Self {
        Self {
            api: YahooFinanceApi {
                http,
                base_url: config.yahoo_finance_base_url.clone(),
            },
        }
    }
}

#[async_trait::async_trait]
impl Tool for YahooFinanceComparisonTool {
    fn name(&self) -> &'static str {
        "get_yahoo_finance_data_comparison"
    }

    fn description(&self) -> &'static str {
        "Fetch real-time stock data and recent price history from Yahoo Finance for several tickers to compare"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "tickers": {
                    "type": "array",
                    "items": {"type": "string"},
                    "description": "Stock ticker symbols, e.g. [\"AAPL\", \"MSFT\"]"
                },
                "period": period_schema(),
                "interval": interval_schema(),
            },
            "required": ["tickers"]
        })
    }

    async fn execute(&self, input: &ToolInput) -> ToolOutput {
        let tickers = match require_tickers(input) {
            Ok(t) => t,
            Err(e) => return ToolOutput::failure(e.to_string()),
        };
        let period = optional_str(input, "period", DEFAULT_PERIOD);
        let interval = optional_str(input, "interval", DEFAULT_INTERVAL);

        // One failing ticker fails the whole comparison.
        let mut results = Map::new();
        for ticker in &tickers {
            match self.api.snapshot(ticker, &period, &interval).await {
                Ok(data) => {
                    results.insert(ticker.clone(), data);
                }
                Err(e) => {
                    warn!(ticker = %ticker, error = %e, "Yahoo Finance comparison failed");
                    return ToolOutput::failure(format!(
                        "Error fetching Yahoo Finance data for {:?}: {}",
                        tickers, e
                    ));
                }
            }
        }

        ToolOutput::ok(Value::Object(results))
    }
}
