//! Role agents
//!
//! A role agent is a persona (role, backstory, goal) bound to a fixed,
//! non-overlapping subset of the capability providers. The execution
//! engine runs tasks on behalf of an agent; the agent itself holds no state.

use crate::tools::ToolRegistry;
use crate::Result;
use serde::Serialize;
use std::fmt;

pub const STOCK_TOOLS: &[&str] = &[
    "get_yahoo_finance_data",
    "get_polygon_news",
    "get_yahoo_finance_data_comparison",
];
pub const SEARCH_TOOLS: &[&str] = &["search_query"];
pub const WEATHER_TOOLS: &[&str] = &["get_weather"];

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AgentRole {
    Stock,
    Search,
    Weather,
}

impl fmt::Display for AgentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AgentRole::Stock => "StockAgent",
            AgentRole::Search => "SearchAgent",
            AgentRole::Weather => "WeatherAgent",
        };
        write!(f, "{}", s)
    }
}

pub struct RoleAgent {
    role: AgentRole,
    backstory: &'static str,
    goal: &'static str,
    tools: ToolRegistry,
}

impl RoleAgent {
    pub fn stock(registry: &ToolRegistry) -> Result<Self> {
        Ok(Self {
            role: AgentRole::Stock,
            backstory: "You are an expert stock analyst. Your task is to analyze real-time stock data, \
                        news, or compare stocks and give a summary. Consider any available stock information. \
                        Provide a concise summary with a small elaboration.",
            goal: "Analyze the provided stock insights and give a concise summary.",
            tools: registry.bind(STOCK_TOOLS)?,
        })
    }

    pub fn search(registry: &ToolRegistry) -> Result<Self> {
        Ok(Self {
            role: AgentRole::Search,
            backstory: "You are a search assistant. Your task is to analyze the results of a web search \
                        and compile them into one answer.",
            goal: "Compile a web search output for a specific query into one concise answer.",
            tools: registry.bind(SEARCH_TOOLS)?,
        })
    }

    pub fn weather(registry: &ToolRegistry) -> Result<Self> {
        Ok(Self {
            role: AgentRole::Weather,
            backstory: "You are a weather specialist. Your task is to analyze weather data for a specific \
                        location and give a summary.",
            goal: "Look into weather data and answer queries.",
            tools: registry.bind(WEATHER_TOOLS)?,
        })
    }

    pub fn role(&self) -> AgentRole {
        self.role
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// System instruction carrying the persona
    pub fn system_instruction(&self) -> String {
        format!(
            "You are {}.\n\n{}\n\nYour goal: {}\n\n\
             Use the available tools to gather data before answering. \
             If a tool returns an error, treat that data as unavailable and say so briefly; \
             do not invent figures.",
            self.role, self.backstory, self.goal
        )
    }
}

/// The three role agents, built once from the provider registry.
pub struct RoleAgents {
    pub stock: RoleAgent,
    pub search: RoleAgent,
    pub weather: RoleAgent,
}

impl RoleAgents {
    pub fn from_registry(registry: &ToolRegistry) -> Result<Self> {
        Ok(Self {
            stock: RoleAgent::stock(registry)?,
            search: RoleAgent::search(registry)?,
            weather: RoleAgent::weather(registry)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProviderConfig;
    use crate::tools::create_default_registry;
    use std::collections::HashSet;

    fn agents() -> RoleAgents {
        let registry =
            create_default_registry(&ProviderConfig::with_base_url("http://127.0.0.1:1")).unwrap();
        RoleAgents::from_registry(&registry).unwrap()
    }

    #[test]
    fn test_agents_bind_their_own_tools() {
        let agents = agents();
        assert_eq!(
            agents.stock.tools().list(),
            vec![
                "get_polygon_news",
                "get_yahoo_finance_data",
                "get_yahoo_finance_data_comparison"
            ]
        );
        assert_eq!(agents.search.tools().list(), vec!["search_query"]);
        assert_eq!(agents.weather.tools().list(), vec!["get_weather"]);
    }

    #[test]
    fn test_tool_sets_do_not_overlap() {
        let agents = agents();
        let mut seen = HashSet::new();
        for agent in [&agents.stock, &agents.search, &agents.weather] {
            for name in agent.tools().list() {
                assert!(seen.insert(name.to_string()), "{} bound twice", name);
            }
        }
    }

    #[test]
    fn test_system_instruction_names_persona() {
        let agents = agents();
        let instruction = agents.weather.system_instruction();
        assert!(instruction.starts_with("You are WeatherAgent."));
        assert!(instruction.contains("weather specialist"));
    }
}
