use thiserror::Error;
use tracing::{debug, warn};

use crate::llm::{CompletionClient, CompletionError};
use crate::transcript::{Role, Transcript, TranscriptError};

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("User input cannot be empty.")]
    InvalidInput,
    #[error("Conversation history cannot be empty.")]
    EmptyTranscript,
    #[error("{}", remote_message(.cause))]
    RemoteService { cause: CompletionError },
    #[error("Empty response from Gemini API.")]
    EmptyReply,
}

fn remote_message(cause: &CompletionError) -> String {
    match cause {
        CompletionError::Init(e) => format!("Failed to initialize Gemini model: {e}"),
        CompletionError::Generation(e) => format!("Failed to generate content with Gemini API: {e}"),
        CompletionError::NoText(e) | CompletionError::UnexpectedResponse(e) => e.clone(),
    }
}

impl From<TranscriptError> for ChatError {
    fn from(err: TranscriptError) -> Self {
        match err {
            TranscriptError::InvalidInput => ChatError::InvalidInput,
            TranscriptError::EmptyTranscript => ChatError::EmptyTranscript,
        }
    }
}

impl ChatError {
    /// Text shown to the user in place of a reply.
    pub fn user_message(&self) -> String {
        match self {
            ChatError::RemoteService {
                cause: CompletionError::UnexpectedResponse(_),
            } => format!("Unexpected error occurred: {self}"),
            _ => format!("Error: {self}"),
        }
    }
}

/// Owns the transcript and the completion backend for one chat session.
pub struct Conversation {
    transcript: Transcript,
    client: Box<dyn CompletionClient>,
    rollback_on_failure: bool,
}

impl Conversation {
    pub fn new(client: Box<dyn CompletionClient>) -> Self {
        Self {
            transcript: Transcript::new(),
            client,
            rollback_on_failure: false,
        }
    }

    /// When set, a failed exchange removes the user turn it appended, so the
    /// next request does not carry an unanswered question.
    pub fn with_rollback_on_failure(mut self, rollback: bool) -> Self {
        self.rollback_on_failure = rollback;
        self
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn compose_and_send(&mut self, user_text: &str) -> Result<String, ChatError> {
        if user_text.trim().is_empty() {
            return Err(ChatError::InvalidInput);
        }
        self.transcript.append(Role::User, user_text)?;

        let result = self.exchange();
        if result.is_err() && self.rollback_on_failure {
            self.transcript.pop_last_user();
        }
        result
    }

    fn exchange(&mut self) -> Result<String, ChatError> {
        let prompt = self.transcript.render()?;
        debug!(turns = self.transcript.turns().len(), "sending transcript");

        let reply = self.client.complete(&prompt).map_err(|cause| {
            warn!(error = %cause, "completion failed");
            ChatError::RemoteService { cause }
        })?;

        if reply.is_empty() {
            warn!("completion returned empty text");
            return Err(ChatError::EmptyReply);
        }

        self.transcript.append(Role::Assistant, reply.clone())?;
        Ok(reply)
    }
}
