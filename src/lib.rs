//! Market Intent Router
//!
//! A conversational assistant that classifies each user query and dispatches
//! it to exactly one handler:
//! - stock analysis, news and comparison through a stock agent
//! - city weather through a weather agent
//! - general questions through a web search agent
//! - anything unrecognized straight to the language model
//!
//! TURN:
//! ENTRY → CLASSIFY → ROUTE → BRANCH → TERMINAL

pub mod agent;
pub mod api;
pub mod classifier;
pub mod config;
pub mod error;
pub mod execution;
pub mod gemini;
pub mod graph;
pub mod models;
pub mod router;
pub mod tasks;
pub mod tools;

#[cfg(test)]
mod testing;

pub use error::{Result, RouterError};

// Re-export common types
pub use classifier::Classifier;
pub use graph::DispatchGraph;
pub use models::*;
pub use router::route;
