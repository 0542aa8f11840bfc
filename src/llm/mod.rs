pub mod gemini;

use thiserror::Error;

/// Faults a completion backend can report. The composer only distinguishes
/// these kinds, never wire-level details.
#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("{0}")]
    Init(String),
    #[error("{0}")]
    Generation(String),
    /// The call succeeded but carried no candidate, e.g. a blocked prompt.
    #[error("{0}")]
    NoText(String),
    #[error("{0}")]
    UnexpectedResponse(String),
}

pub trait CompletionClient {
    fn complete(&self, prompt: &str) -> Result<String, CompletionError>;
}
