//! WeatherAPI current conditions lookup

use super::{require_str, required_key, ProviderHttp, Tool};
use crate::config::ProviderConfig;
use crate::error::RouterError;
use crate::models::{ToolInput, ToolOutput};
use crate::Result;
use serde_json::{json, Value};
use tracing::warn;

pub struct WeatherTool {
    http: ProviderHttp,
    base_url: String,
    api_key: Option<String>,
}

impl WeatherTool {
    pub(crate) fn new(http: ProviderHttp, config: &ProviderConfig) -> Self {
        Self {
            http,
            base_url: config.weather_base_url.clone(),
            api_key: config.weather_api_key.clone(),
        }
    }

    async fn fetch(&self, city: &str) -> Result<Value> {
        let api_key = required_key(&self.api_key, "WEATHER_API_KEY")?;
        let url = format!("{}/v1/current.json", self.base_url);

        // The service answers unknown places with a 4xx JSON body, so the
        // status is not checked; the presence of `location` decides.
        let (_status, body) = self
            .http
            .get(&url, &[("key", api_key), ("q", city.to_string())])
            .await?;

        match body.get("location") {
            Some(location) if !location.is_null() => Ok(json!({
                "location": location,
                "current": body.get("current"),
            })),
            _ => Err(RouterError::Tool("Weather data not found".to_string())),
        }
    }
}

#[async_trait::async_trait]
impl Tool for WeatherTool {
    fn name(&self) -> &'static str {
        "get_weather"
    }

    fn description(&self) -> &'static str {
        "Fetch current weather conditions (temperature, humidity, wind, condition) for a city"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "city": {"type": "string", "description": "City name, e.g. Paris"}
            },
            "required": ["city"]
        })
    }

    async fn execute(&self, input: &ToolInput) -> ToolOutput {
        let city = match require_str(input, "city") {
            Ok(c) => c,
            Err(e) => return ToolOutput::failure(e.to_string()),
        };

        match self.fetch(&city).await {
            Ok(data) => ToolOutput::ok(data),
            Err(RouterError::Tool(msg)) if msg == "Weather data not found" => {
                ToolOutput::failure(msg)
            }
            Err(e) => {
                warn!(city = %city, error = %e, "Weather lookup failed");
                ToolOutput::failure(format!("Error fetching weather data: {}", e))
            }
        }
    }
}
