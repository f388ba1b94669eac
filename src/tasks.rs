//! Task formatting
//!
//! A task is the instruction bundle handed to a role agent: what to do with
//! the request value, and what the final answer should look like.

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Task {
    pub name: &'static str,
    pub description: String,
    pub expected_output: &'static str,
}

impl Task {
    pub fn stock_analysis(ticker: &str) -> Self {
        Self {
            name: "stock_analysis",
            description: format!(
                "Analyze real-time stock data and provide insights.\n\
                 Consider price movements, trading volume, and any available company information.\n\
                 Provide a concise summary of the stock's current status and any notable trends or events.\n\
                 Stock ticker: {}",
                ticker
            ),
            expected_output:
                "Concise summary of the stock's current status and any notable trends or events.",
        }
    }

    pub fn news_analysis(ticker: &str) -> Self {
        Self {
            name: "news_analysis",
            description: format!(
                "Analyze recent news articles related to specific stocks or the overall market.\n\
                 Consider the potential impact of news events on stock prices or market trends.\n\
                 Provide a concise summary of key news items and their potential market implications.\n\
                 Stock ticker: {}",
                ticker
            ),
            expected_output:
                "Concise summary of key news items and their potential market implications.",
        }
    }

    pub fn stock_comparison(tickers: &[String]) -> Self {
        Self {
            name: "stock_comparison",
            description: format!(
                "Compare the following stocks based on the provided information:\n\
                 {}\n\
                 Highlight key differences and similarities.",
                tickers.join(", ")
            ),
            expected_output: "Concise summary of the comparative analysis.",
        }
    }

    pub fn web_search(query: &str) -> Self {
        Self {
            name: "web_search",
            description: format!(
                "Compile the search output. Consider information relevant to the user query.\n\
                 Provide a concise answer to the user query from the search results.\n\
                 If nothing in the search results is relevant to the user query, don't invent new things.\n\
                 User query: {}",
                query
            ),
            expected_output: "Answer to the user query.",
        }
    }

    pub fn weather_check(city: &str) -> Self {
        Self {
            name: "weather_check",
            description: format!(
                "Analyze weather information. Consider all information.\n\
                 Answer the question using the weather information.\n\
                 City: {}",
                city
            ),
            expected_output: "Answer to the question using the weather information.",
        }
    }

    /// Prompt text sent as the user turn of the agent conversation
    pub fn prompt(&self) -> String {
        format!(
            "{}\n\nExpected output: {}",
            self.description, self.expected_output
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tasks_embed_request_value() {
        assert!(Task::stock_analysis("TSLA").description.ends_with("TSLA"));
        assert!(Task::news_analysis("AMZN").prompt().contains("AMZN"));
        assert!(Task::weather_check("Paris").prompt().contains("City: Paris"));
        assert!(Task::web_search("what is a large language model?")
            .description
            .contains("what is a large language model?"));
    }

    #[test]
    fn test_comparison_lists_all_tickers_in_order() {
        let task = Task::stock_comparison(&["AAPL".to_string(), "MSFT".to_string()]);
        assert!(task.description.contains("AAPL, MSFT"));
        assert!(task.prompt().contains("Expected output:"));
    }
}
