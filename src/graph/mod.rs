//! Dispatch graph
//!
//! ENTRY → classify → route → {STOCK | SEARCH | WEATHER | REPLY} → TERMINAL
//!
//! One invocation handles one user turn. The classifier runs once, the
//! router picks exactly one branch, the branch appends exactly one message.
//! No node is revisited and nothing is retried. The caller's state is never
//! touched: the graph works on its own copy and hands it back only when the
//! turn succeeds.

use crate::agent::{RoleAgent, RoleAgents};
use crate::classifier::Classifier;
use crate::config::Config;
use crate::error::RouterError;
use crate::execution::{ExecutionEngine, ToolCallRecord};
use crate::gemini::{GeminiClient, LanguageModel};
use crate::models::{Classification, Destination, Intent, SessionState, StockRequest};
use crate::router::route;
use crate::tasks::Task;
use crate::tools::{create_default_registry, ToolRegistry};
use crate::Result;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GraphNode {
    Entry,
    StockBranch,
    SearchBranch,
    WeatherBranch,
    ReplyBranch,
    Terminal,
}

impl GraphNode {
    pub fn for_destination(destination: Destination) -> Self {
        match destination {
            Destination::Stock => GraphNode::StockBranch,
            Destination::City => GraphNode::WeatherBranch,
            Destination::Search => GraphNode::SearchBranch,
            Destination::Reply => GraphNode::ReplyBranch,
        }
    }

    /// Name used in logs, traces and execution errors
    pub fn name(&self) -> &'static str {
        match self {
            GraphNode::Entry => "entry",
            GraphNode::StockBranch => "stock",
            GraphNode::SearchBranch => "search",
            GraphNode::WeatherBranch => "weather",
            GraphNode::ReplyBranch => "reply",
            GraphNode::Terminal => "terminal",
        }
    }
}

impl fmt::Display for GraphNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

struct BranchOutput {
    text: String,
    tool_calls: Vec<ToolCallRecord>,
}

pub struct DispatchGraph {
    classifier: Classifier,
    engine: ExecutionEngine,
    agents: RoleAgents,
    model: Arc<dyn LanguageModel>,
}

impl DispatchGraph {
    pub fn new(
        model: Arc<dyn LanguageModel>,
        registry: &ToolRegistry,
        tool_timeout: Duration,
    ) -> Result<Self> {
        Ok(Self {
            classifier: Classifier::new(model.clone()),
            engine: ExecutionEngine::new(model.clone(), tool_timeout),
            agents: RoleAgents::from_registry(registry)?,
            model,
        })
    }

    /// Wire the production model client and providers from configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        let model: Arc<dyn LanguageModel> = Arc::new(GeminiClient::new(&config.model)?);
        let registry = create_default_registry(&config.providers)?;
        Self::new(model, &registry, config.providers.tool_timeout)
    }

    /// Run one turn for a raw user query.
    pub async fn run_query(&self, query: &str) -> Result<SessionState> {
        self.invoke(&SessionState::new(query)).await
    }

    /// Run one turn. On success the returned state has exactly one more
    /// message than `input`; on failure `input` is left as it was.
    ///
    /// `input` must not carry a classification yet: a state returned by an
    /// earlier turn is rejected before the classifier runs.
    pub async fn invoke(&self, input: &SessionState) -> Result<SessionState> {
        if let Some(category) = input.category() {
            return Err(RouterError::InvalidInput(format!(
                "session state already classified as {}; start a new turn from a fresh state",
                category
            )));
        }

        let turn_id = Uuid::new_v4();
        let span = info_span!("turn", %turn_id);
        self.run_turn(input.clone()).instrument(span).await
    }

    async fn run_turn(&self, mut state: SessionState) -> Result<SessionState> {
        let start = Instant::now();
        state.record(GraphNode::Entry.name());

        let classification = self
            .classifier
            .classify(&state.query)
            .await
            .map_err(|e| match e {
                RouterError::Classification(_) | RouterError::InvalidInput(_) => e,
                other => RouterError::execution(GraphNode::Entry.name(), other.to_string()),
            })?;

        let destination = route(&classification.category);
        let node = GraphNode::for_destination(destination);
        info!(
            category = %classification.category,
            destination = %destination,
            "Routing query"
        );

        state.set_classification(classification.clone())?;
        state.record(node.name());

        let output = self
            .run_branch(node, &classification, &state.query)
            .await
            .map_err(|e| {
                warn!(branch = %node, error = %e, "Branch failed");
                RouterError::execution(node.name(), e.to_string())
            })?;

        for call in &output.tool_calls {
            state.record(format!(
                "tool:{} {}",
                call.tool_name,
                if call.success { "ok" } else { "failed" }
            ));
        }

        state.push_message(output.text);
        state.record(GraphNode::Terminal.name());

        info!(
            branch = %node,
            execution_time_ms = start.elapsed().as_millis() as u64,
            messages = state.messages().len(),
            "Turn completed"
        );

        Ok(state)
    }

    async fn run_branch(
        &self,
        node: GraphNode,
        classification: &Classification,
        query: &str,
    ) -> Result<BranchOutput> {
        match (node, &classification.intent) {
            (GraphNode::StockBranch, Intent::Stock(request)) => {
                let task = match request {
                    StockRequest::Analysis { ticker } => Task::stock_analysis(ticker),
                    StockRequest::News { ticker } => Task::news_analysis(ticker),
                    StockRequest::Comparison { tickers } => Task::stock_comparison(tickers),
                };
                self.run_agent(&self.agents.stock, &task).await
            }
            (GraphNode::WeatherBranch, Intent::Weather { city }) => {
                self.run_agent(&self.agents.weather, &Task::weather_check(city))
                    .await
            }
            (GraphNode::SearchBranch, Intent::Search { query }) => {
                self.run_agent(&self.agents.search, &Task::web_search(query))
                    .await
            }
            (GraphNode::ReplyBranch, Intent::Reply { .. }) => {
                let text = self.model.complete(query).await?;
                Ok(BranchOutput {
                    text,
                    tool_calls: Vec::new(),
                })
            }
            (node, intent) => Err(RouterError::InvalidInput(format!(
                "{:?} payload cannot run on the {} branch",
                intent, node
            ))),
        }
    }

    async fn run_agent(&self, agent: &RoleAgent, task: &Task) -> Result<BranchOutput> {
        let run = self.engine.execute(agent, task).await?;
        Ok(BranchOutput {
            text: run.answer,
            tool_calls: run.tool_calls,
        })
    }
}
