//! Intent Classifier
//!
//! Entry step of every turn. One model call maps the user query to one of
//! five categories and extracts the slot values:
//! - stock_analysis / stock_news: a ticker
//! - stock_comparison: a list of tickers
//! - city_weather: a city name
//! - other: the query itself
//!
//! Model output is untrusted text, so extraction is an explicit, fallible
//! step: locate the JSON object, check the schema, then build the typed
//! `Classification`.

use crate::error::RouterError;
use crate::gemini::LanguageModel;
use crate::models::{Category, Classification, Intent, StockRequest};
use crate::Result;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Raw classifier record, exactly as the model is asked to produce it.
///
/// Every key must be present; unused ones are blank.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifierOutput {
    #[serde(deserialize_with = "blank_if_null")]
    pub category: String,
    #[serde(deserialize_with = "blank_if_null")]
    pub stock: String,
    #[serde(deserialize_with = "blank_if_null")]
    pub news: String,
    #[serde(deserialize_with = "blank_if_null")]
    pub city: String,
    #[serde(deserialize_with = "ticker_list")]
    pub stock_list: Vec<String>,
    #[serde(deserialize_with = "blank_if_null")]
    pub query: String,
}

fn blank_if_null<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?
        .map(|s| s.trim().to_string())
        .unwrap_or_default())
}

/// Accepts an array, a blank or comma separated string, or null.
fn ticker_list<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let raw: Vec<String> = match value {
        Value::Null => Vec::new(),
        Value::String(s) => s.split(',').map(str::to_string).collect(),
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s),
                _ => None,
            })
            .collect(),
        other => {
            return Err(serde::de::Error::custom(format!(
                "stock_list must be a list of tickers, got {}",
                other
            )))
        }
    };

    Ok(raw
        .iter()
        .map(|t| normalize_ticker(t))
        .filter(|t| !t.is_empty())
        .collect())
}

fn normalize_ticker(raw: &str) -> String {
    raw.trim().trim_start_matches('$').trim().to_uppercase()
}

impl ClassifierOutput {
    fn populated_slots(&self) -> usize {
        [
            !self.stock.is_empty(),
            !self.news.is_empty(),
            !self.stock_list.is_empty(),
            !self.city.is_empty(),
        ]
        .iter()
        .filter(|p| **p)
        .count()
    }

    /// Validate the record and build the typed classification.
    ///
    /// `user_query` is the raw turn text, used when the record's own
    /// `query` is blank.
    pub fn into_classification(self, user_query: &str) -> Result<Classification> {
        let category = Category::from_label(&self.category);

        if self.category.is_empty() {
            return Err(RouterError::Classification(
                "classifier returned a blank category".to_string(),
            ));
        }

        if self.populated_slots() > 1 {
            warn!(
                category = %category,
                stock = %self.stock,
                news = %self.news,
                stock_list = ?self.stock_list,
                city = %self.city,
                "Classifier populated more than one slot; applying priority order"
            );
        }

        let intent = match &category {
            Category::StockAnalysis | Category::StockNews | Category::StockComparison => {
                Intent::Stock(self.stock_request(&category)?)
            }
            Category::CityWeather => {
                if self.city.is_empty() {
                    return Err(RouterError::Classification(
                        "city_weather classification without a city".to_string(),
                    ));
                }
                Intent::Weather { city: self.city }
            }
            Category::Other => {
                let query = if self.query.is_empty() {
                    user_query.trim().to_string()
                } else {
                    self.query
                };
                Intent::Search { query }
            }
            Category::Unrecognized(_) => Intent::Reply {
                query: user_query.trim().to_string(),
            },
        };

        Ok(Classification { category, intent })
    }

    /// Stock sub-case in priority order: analysis, news, comparison.
    fn stock_request(&self, category: &Category) -> Result<StockRequest> {
        let stock = normalize_ticker(&self.stock);
        let news = normalize_ticker(&self.news);

        if !stock.is_empty() {
            Ok(StockRequest::Analysis { ticker: stock })
        } else if !news.is_empty() {
            Ok(StockRequest::News { ticker: news })
        } else if !self.stock_list.is_empty() {
            Ok(StockRequest::Comparison {
                tickers: self.stock_list.clone(),
            })
        } else {
            Err(RouterError::Classification(format!(
                "{} classification without a ticker",
                category
            )))
        }
    }
}

/// Parse the classifier's raw reply into the wire record.
pub fn parse_classifier_output(response: &str) -> Result<ClassifierOutput> {
    let json = extract_json_object(response).ok_or_else(|| {
        RouterError::Classification(format!("no JSON object in classifier reply | raw={}", response))
    })?;

    serde_json::from_str::<ClassifierOutput>(json).map_err(|e| {
        RouterError::Classification(format!(
            "classifier reply does not match schema: {} | raw={}",
            e, response
        ))
    })
}

/// The reply may be fenced (```json) or wrapped in prose; take the outermost object.
fn extract_json_object(response: &str) -> Option<&str> {
    let cleaned = response
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim();

    let start = cleaned.find('{')?;
    let end = cleaned.rfind('}')?;
    (start < end).then(|| &cleaned[start..=end])
}

fn build_prompt(query: &str) -> String {
    format!(
        r#"User input
---
{}
---
You are given one user input and you have to perform actions on it based on the instructions below.

Categorize the user input into one of these categories:
stock_analysis: the user wants a stock market analysis for a specific stock
stock_news: the user wants to know what is in the news about a specific stock
stock_comparison: the user wants a comparative analysis of more than one stock
city_weather: the user is asking something related to the weather of a city
other: any other query

Your final RESPONSE must be JSON only, with nothing before or after it, with these properties:
category: the category of the user input
stock: if category is 'stock_analysis', the stock ticker symbol of the company or stock mentioned, else blank. Only the ticker.
news: if category is 'stock_news', the stock ticker symbol of the company or stock mentioned, else blank. Only the ticker.
stock_list: if category is 'stock_comparison', the list of stock tickers to analyse, else an empty list. Only the tickers.
city: if category is 'city_weather', the name of the city, else blank. Only the city name.
query: if category is 'other', the user's query, else blank.
"#,
        query
    )
}

/// Model-backed classifier
pub struct Classifier {
    model: Arc<dyn LanguageModel>,
}

impl Classifier {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }

    /// Classify a non-empty query. Model failures come back unchanged;
    /// malformed replies become `RouterError::Classification`.
    pub async fn classify(&self, query: &str) -> Result<Classification> {
        if query.trim().is_empty() {
            return Err(RouterError::InvalidInput("query must not be empty".to_string()));
        }

        let response = self.model.complete(&build_prompt(query)).await?;
        debug!(raw = %response, "Classifier reply");

        let output = parse_classifier_output(&response)?;
        let classification = output.into_classification(query)?;

        info!(
            category = %classification.category,
            intent = ?classification.intent,
            "Query classified"
        );

        Ok(classification)
    }
}
