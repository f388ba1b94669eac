//! Core data models for the intent router

use crate::error::RouterError;
use crate::Result;
use serde::{Deserialize, Serialize};
use std::fmt;

//
// ================= Category =================
//

/// Five-way label assigned to a user query by the classifier.
///
/// Labels outside the fixed set are kept verbatim so routing stays total.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Category {
    StockAnalysis,
    StockNews,
    StockComparison,
    CityWeather,
    Other,
    Unrecognized(String),
}

impl Category {
    pub const KNOWN: [Category; 5] = [
        Category::StockAnalysis,
        Category::StockNews,
        Category::StockComparison,
        Category::CityWeather,
        Category::Other,
    ];

    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "stock_analysis" => Category::StockAnalysis,
            "stock_news" => Category::StockNews,
            "stock_comparison" => Category::StockComparison,
            "city_weather" => Category::CityWeather,
            "other" => Category::Other,
            _ => Category::Unrecognized(label.trim().to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Category::StockAnalysis => "stock_analysis",
            Category::StockNews => "stock_news",
            Category::StockComparison => "stock_comparison",
            Category::CityWeather => "city_weather",
            Category::Other => "other",
            Category::Unrecognized(label) => label,
        }
    }

    pub fn is_stock(&self) -> bool {
        matches!(
            self,
            Category::StockAnalysis | Category::StockNews | Category::StockComparison
        )
    }
}

impl From<String> for Category {
    fn from(label: String) -> Self {
        Category::from_label(&label)
    }
}

impl From<Category> for String {
    fn from(category: Category) -> Self {
        category.as_str().to_string()
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

//
// ================= Destination =================
//

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Destination {
    Stock,
    City,
    Search,
    Reply,
}

impl Destination {
    pub fn as_str(&self) -> &'static str {
        match self {
            Destination::Stock => "stock",
            Destination::City => "city",
            Destination::Search => "search",
            Destination::Reply => "reply",
        }
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

//
// ================= Intent =================
//

/// Stock sub-request, picked in priority order: analysis, news, comparison.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StockRequest {
    Analysis { ticker: String },
    News { ticker: String },
    Comparison { tickers: Vec<String> },
}

/// The payload a classified query carries, one variant per destination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Intent {
    Stock(StockRequest),
    Weather { city: String },
    Search { query: String },
    Reply { query: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub category: Category,
    pub intent: Intent,
}

//
// ================= Session State =================
//

/// Record threaded through one graph invocation.
///
/// Created fresh per turn; `messages` only grows and the classification
/// can be set exactly once.
#[derive(Debug, Clone, Serialize)]
pub struct SessionState {
    pub query: String,
    messages: Vec<String>,
    classification: Option<Classification>,
    trace: Vec<String>,
}

impl SessionState {
    /// Initial state for a user turn: `{query, messages: [query]}`.
    pub fn new(query: impl Into<String>) -> Self {
        let query = query.into();
        Self {
            messages: vec![query.clone()],
            query,
            classification: None,
            trace: Vec::new(),
        }
    }

    pub fn with_messages(query: impl Into<String>, messages: Vec<String>) -> Self {
        Self {
            query: query.into(),
            messages,
            classification: None,
            trace: Vec::new(),
        }
    }

    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    pub fn last_message(&self) -> Option<&str> {
        self.messages.last().map(String::as_str)
    }

    pub fn push_message(&mut self, message: impl Into<String>) {
        self.messages.push(message.into());
    }

    pub fn classification(&self) -> Option<&Classification> {
        self.classification.as_ref()
    }

    pub fn category(&self) -> Option<&Category> {
        self.classification.as_ref().map(|c| &c.category)
    }

    pub fn set_classification(&mut self, classification: Classification) -> Result<()> {
        if self.classification.is_some() {
            return Err(RouterError::InvalidInput(
                "category already set for this turn".to_string(),
            ));
        }
        self.classification = Some(classification);
        Ok(())
    }

    pub fn trace(&self) -> &[String] {
        &self.trace
    }

    pub(crate) fn record(&mut self, step: impl Into<String>) {
        self.trace.push(step.into());
    }

    pub fn into_messages(self) -> Vec<String> {
        self.messages
    }
}

//
// ================= Tool I/O =================
//

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInput {
    pub tool_name: String,
    pub parameters: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolOutput {
    pub success: bool,
    pub data: serde_json::Value,
    pub error: Option<String>,
}

impl ToolOutput {
    pub fn ok(data: serde_json::Value) -> Self {
        Self {
            success: true,
            data,
            error: None,
        }
    }

    /// Error-shaped value handed back to the model instead of raising.
    pub fn failure(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            success: false,
            data: serde_json::json!({ "error": message }),
            error: Some(message),
        }
    }

    /// Payload sent back to the model as a function response.
    pub fn as_response(&self) -> serde_json::Value {
        if self.success {
            serde_json::json!({ "result": self.data })
        } else {
            self.data.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_labels_round_trip() {
        for category in Category::KNOWN {
            assert_eq!(Category::from_label(category.as_str()), category);
        }
        assert_eq!(
            Category::from_label("crypto_prices"),
            Category::Unrecognized("crypto_prices".to_string())
        );
        assert_eq!(Category::from_label(" City_Weather "), Category::CityWeather);
    }

    #[test]
    fn test_category_serializes_as_label() {
        let json = serde_json::to_string(&Category::StockNews).unwrap();
        assert_eq!(json, "\"stock_news\"");
        let parsed: Category = serde_json::from_str("\"other\"").unwrap();
        assert_eq!(parsed, Category::Other);
    }

    #[test]
    fn test_session_state_starts_with_query() {
        let state = SessionState::new("What's the weather in Paris?");
        assert_eq!(state.messages(), ["What's the weather in Paris?"]);
        assert!(state.category().is_none());
    }

    #[test]
    fn test_classification_is_set_once() {
        let mut state = SessionState::new("hello");
        let classification = Classification {
            category: Category::Other,
            intent: Intent::Search {
                query: "hello".to_string(),
            },
        };

        state.set_classification(classification.clone()).unwrap();
        assert!(state.set_classification(classification).is_err());
        assert_eq!(state.category(), Some(&Category::Other));
    }

    #[test]
    fn test_failed_tool_output_is_error_shaped() {
        let output = ToolOutput::failure("Weather data not found");
        assert!(!output.success);
        assert_eq!(
            output.as_response(),
            serde_json::json!({ "error": "Weather data not found" })
        );
    }
}
