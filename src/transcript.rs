use thiserror::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// One message in the conversation. Fields are private so a turn cannot be
/// edited after it lands in a transcript.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Turn {
    role: Role,
    text: String,
}

#[cfg(test)]
impl Turn {
    pub fn role(&self) -> Role {
        self.role
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TranscriptError {
    #[error("User input cannot be empty.")]
    InvalidInput,
    #[error("Conversation history cannot be empty.")]
    EmptyTranscript,
}

/// Append-only history of turns for the current session.
#[derive(Debug, Default)]
pub struct Transcript {
    turns: Vec<Turn>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, role: Role, text: impl Into<String>) -> Result<(), TranscriptError> {
        let text = text.into();
        if role == Role::User && text.trim().is_empty() {
            return Err(TranscriptError::InvalidInput);
        }
        self.turns.push(Turn { role, text });
        Ok(())
    }

    /// Flattens every turn into `"<role>: <text>\n"` lines, oldest first.
    pub fn render(&self) -> Result<String, TranscriptError> {
        let mut out = String::new();
        for turn in &self.turns {
            out.push_str(turn.role.as_str());
            out.push_str(": ");
            out.push_str(&turn.text);
            out.push('\n');
        }
        if out.trim().is_empty() {
            return Err(TranscriptError::EmptyTranscript);
        }
        Ok(out)
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    // Only the composer's rollback path removes turns.
    pub(crate) fn pop_last_user(&mut self) -> Option<Turn> {
        match self.turns.last() {
            Some(turn) if turn.role == Role::User => self.turns.pop(),
            _ => None,
        }
    }
}
