//! Error types for the intent router

use thiserror::Error;

/// Result type alias for router operations
pub type Result<T> = std::result::Result<T, RouterError>;

#[derive(Error, Debug)]
pub enum RouterError {

    // =============================
    // Turn-level Errors
    // =============================

    /// The classifier reply could not be turned into a valid classification.
    #[error("Classification error: {0}")]
    Classification(String),

    /// A graph branch failed while running its role agent or model call.
    #[error("Execution error in {branch} branch: {message}")]
    Execution { branch: String, message: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // =============================
    // Collaborator Errors
    // =============================

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Tool error: {0}")]
    Tool(String),

    #[error("Configuration error: {0}")]
    Config(String),

    // =============================
    // External Library Conversions
    // =============================

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}

impl RouterError {
    pub fn execution(branch: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Execution {
            branch: branch.into(),
            message: message.into(),
        }
    }

    /// True for failures a user can fix by rephrasing the query.
    pub fn is_classification(&self) -> bool {
        matches!(self, Self::Classification(_))
    }
}
