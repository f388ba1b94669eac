//! Execution engine for role agent tasks
//!
//! Runs one task as a function-calling conversation: the model sees the
//! agent persona and its bound tools, may call tools for a bounded number of
//! rounds, and finishes with plain text. Tool calls run sequentially, each
//! under a timeout, and never fail the task; their errors are fed back to
//! the model as data.

use crate::agent::RoleAgent;
use crate::error::RouterError;
use crate::gemini::{Content, FunctionCall, FunctionResponse, LanguageModel, ModelRequest};
use crate::models::{ToolInput, ToolOutput};
use crate::tasks::Task;
use crate::Result;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Maximum model round trips that may request tools within one task
pub const MAX_TOOL_ROUNDS: usize = 8;

const AGENT_TEMPERATURE: f32 = 0.3;

/// One tool invocation made during a task
#[derive(Debug, Clone, Serialize)]
pub struct ToolCallRecord {
    pub tool_name: String,
    pub success: bool,
    pub execution_time_ms: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct AgentRun {
    pub answer: String,
    pub tool_calls: Vec<ToolCallRecord>,
}

/// Executes tasks for role agents
pub struct ExecutionEngine {
    model: Arc<dyn LanguageModel>,
    tool_timeout: Duration,
    max_rounds: usize,
}

impl ExecutionEngine {
    pub fn new(model: Arc<dyn LanguageModel>, tool_timeout: Duration) -> Self {
        Self {
            model,
            tool_timeout,
            max_rounds: MAX_TOOL_ROUNDS,
        }
    }

    pub fn with_max_rounds(mut self, max_rounds: usize) -> Self {
        self.max_rounds = max_rounds;
        self
    }

    /// Run a task to completion and return the model's final text.
    pub async fn execute(&self, agent: &RoleAgent, task: &Task) -> Result<AgentRun> {
        let mut contents = vec![Content::user(task.prompt())];
        let mut tool_calls = Vec::new();
        let functions = agent.tools().declarations();
        let system_instruction = agent.system_instruction();

        debug!(agent = %agent.role(), task = task.name, "Starting task");

        for round in 0..=self.max_rounds {
            let request = ModelRequest {
                system_instruction: Some(system_instruction.clone()),
                contents: contents.clone(),
                functions: functions.clone(),
                temperature: AGENT_TEMPERATURE,
            };

            let reply = self.model.generate(&request).await?;

            if !reply.wants_tools() {
                if reply.text.trim().is_empty() {
                    return Err(RouterError::Llm(format!(
                        "{} returned an empty answer",
                        agent.role()
                    )));
                }

                info!(
                    agent = %agent.role(),
                    task = task.name,
                    rounds = round,
                    tool_calls = tool_calls.len(),
                    "Task completed"
                );

                return Ok(AgentRun {
                    answer: reply.text,
                    tool_calls,
                });
            }

            if round == self.max_rounds {
                break;
            }

            let mut responses = Vec::with_capacity(reply.function_calls.len());
            for call in &reply.function_calls {
                let (output, record) = self.invoke(agent, call).await;
                tool_calls.push(record);
                responses.push(FunctionResponse {
                    name: call.name.clone(),
                    response: output.as_response(),
                });
            }

            contents.push(reply.content);
            contents.push(Content::function_responses(responses));
        }

        Err(RouterError::Llm(format!(
            "{} exceeded {} tool rounds without a final answer",
            agent.role(),
            self.max_rounds
        )))
    }

    /// Run one tool call; unknown tools and timeouts come back error-shaped.
    async fn invoke(&self, agent: &RoleAgent, call: &FunctionCall) -> (ToolOutput, ToolCallRecord) {
        let start = Instant::now();

        let output = match agent.tools().get(&call.name) {
            Some(tool) => {
                let input = ToolInput {
                    tool_name: call.name.clone(),
                    parameters: call.args.clone(),
                };
                match tokio::time::timeout(self.tool_timeout, tool.execute(&input)).await {
                    Ok(output) => output,
                    Err(_) => ToolOutput::failure(format!(
                        "Tool '{}' timed out after {} ms",
                        call.name,
                        self.tool_timeout.as_millis()
                    )),
                }
            }
            None => {
                warn!(
                    agent = %agent.role(),
                    tool_name = %call.name,
                    "Model requested a tool outside the agent's bound set"
                );
                ToolOutput::failure(format!(
                    "Tool '{}' is not available to {}",
                    call.name,
                    agent.role()
                ))
            }
        };

        let execution_time_ms = start.elapsed().as_millis() as u64;

        if output.success {
            debug!(tool_name = %call.name, execution_time_ms, "Tool call succeeded");
        } else {
            warn!(
                tool_name = %call.name,
                execution_time_ms,
                error = ?output.error,
                "Tool call failed; handing error back to the model"
            );
        }

        let record = ToolCallRecord {
            tool_name: call.name.clone(),
            success: output.success,
            execution_time_ms,
        };

        (output, record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ScriptedModel, StaticTool};
    use crate::tools::ToolRegistry;
    use serde_json::json;

    fn weather_agent(tool: Arc<StaticTool>) -> RoleAgent {
        let mut registry = ToolRegistry::new();
        registry.register(tool);
        RoleAgent::weather(&registry).unwrap()
    }

    #[tokio::test]
    async fn test_direct_answer_without_tools() {
        let model = Arc::new(ScriptedModel::new().text("Paris is sunny, 18°C."));
        let tool = Arc::new(StaticTool::new("get_weather", ToolOutput::ok(json!({}))));
        let engine = ExecutionEngine::new(model.clone(), Duration::from_secs(1));

        let run = engine
            .execute(&weather_agent(tool.clone()), &Task::weather_check("Paris"))
            .await
            .unwrap();

        assert_eq!(run.answer, "Paris is sunny, 18°C.");
        assert!(run.tool_calls.is_empty());
        assert_eq!(tool.calls(), 0);

        let requests = model.requests();
        assert_eq!(requests[0].functions.len(), 1);
        assert_eq!(requests[0].functions[0].name, "get_weather");
    }

    #[tokio::test]
    async fn test_tool_result_is_fed_back_to_model() {
        let model = Arc::new(
            ScriptedModel::new()
                .call("get_weather", json!({"city": "Paris"}))
                .text("It is 18°C and sunny in Paris."),
        );
        let tool = Arc::new(StaticTool::new(
            "get_weather",
            ToolOutput::ok(json!({"current": {"temp_c": 18.0}})),
        ));
        let engine = ExecutionEngine::new(model.clone(), Duration::from_secs(1));

        let run = engine
            .execute(&weather_agent(tool.clone()), &Task::weather_check("Paris"))
            .await
            .unwrap();

        assert_eq!(run.answer, "It is 18°C and sunny in Paris.");
        assert_eq!(tool.calls(), 1);
        assert!(run.tool_calls[0].success);

        let second = &model.requests()[1];
        assert_eq!(second.contents.len(), 3);
        let response = second.contents[2].parts[0]
            .function_response
            .as_ref()
            .unwrap();
        assert_eq!(response.name, "get_weather");
        assert_eq!(response.response["result"]["current"]["temp_c"], 18.0);
    }

    #[tokio::test]
    async fn test_tool_failure_is_absorbed() {
        let model = Arc::new(
            ScriptedModel::new()
                .call("get_weather", json!({"city": "Atlantis"}))
                .text("Weather data for Atlantis is unavailable."),
        );
        let tool = Arc::new(StaticTool::new(
            "get_weather",
            ToolOutput::failure("Weather data not found"),
        ));
        let engine = ExecutionEngine::new(model.clone(), Duration::from_secs(1));

        let run = engine
            .execute(&weather_agent(tool), &Task::weather_check("Atlantis"))
            .await
            .unwrap();

        assert!(run.answer.contains("unavailable"));
        assert!(!run.tool_calls[0].success);
        let response = &model.requests()[1].contents[2].parts[0].function_response;
        assert_eq!(
            response.as_ref().unwrap().response,
            json!({"error": "Weather data not found"})
        );
    }

    #[tokio::test]
    async fn test_unbound_tool_is_refused() {
        let model = Arc::new(
            ScriptedModel::new()
                .call("search_query", json!({"query": "paris"}))
                .text("I could not search."),
        );
        let tool = Arc::new(StaticTool::new("get_weather", ToolOutput::ok(json!({}))));
        let engine = ExecutionEngine::new(model.clone(), Duration::from_secs(1));

        let run = engine
            .execute(&weather_agent(tool.clone()), &Task::weather_check("Paris"))
            .await
            .unwrap();

        assert_eq!(tool.calls(), 0);
        assert!(!run.tool_calls[0].success);
    }

    #[tokio::test]
    async fn test_slow_tool_times_out() {
        let model = Arc::new(
            ScriptedModel::new()
                .call("get_weather", json!({"city": "Paris"}))
                .text("Weather service did not answer."),
        );
        let tool = Arc::new(StaticTool::slow("get_weather", Duration::from_secs(5)));
        let engine = ExecutionEngine::new(model.clone(), Duration::from_millis(20));

        let run = engine
            .execute(&weather_agent(tool), &Task::weather_check("Paris"))
            .await
            .unwrap();

        assert!(!run.tool_calls[0].success);
        let response = &model.requests()[1].contents[2].parts[0].function_response;
        assert!(response.as_ref().unwrap().response["error"]
            .as_str()
            .unwrap()
            .contains("timed out"));
    }

    #[tokio::test]
    async fn test_round_limit_is_an_error() {
        let model = Arc::new(
            ScriptedModel::new()
                .call("get_weather", json!({"city": "Paris"}))
                .call("get_weather", json!({"city": "Paris"}))
                .call("get_weather", json!({"city": "Paris"})),
        );
        let tool = Arc::new(StaticTool::new("get_weather", ToolOutput::ok(json!({}))));
        let engine =
            ExecutionEngine::new(model.clone(), Duration::from_secs(1)).with_max_rounds(2);

        let err = engine
            .execute(&weather_agent(tool.clone()), &Task::weather_check("Paris"))
            .await
            .unwrap_err();

        assert!(matches!(err, RouterError::Llm(msg) if msg.contains("tool rounds")));
        assert_eq!(tool.calls(), 2);
        assert_eq!(model.requests().len(), 3);
    }

    #[tokio::test]
    async fn test_model_failure_propagates() {
        let model = Arc::new(ScriptedModel::new().error("unreachable"));
        let tool = Arc::new(StaticTool::new("get_weather", ToolOutput::ok(json!({}))));
        let engine = ExecutionEngine::new(model, Duration::from_secs(1));

        let result = engine
            .execute(&weather_agent(tool), &Task::weather_check("Paris"))
            .await;

        tokio_test::assert_err!(result);
    }
}
