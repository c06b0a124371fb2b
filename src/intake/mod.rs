//! Conversational intake: turns free-text chat into a structured service
//! request.
//!
//! One turn runs strictly in sequence:
//!
//! 1. [`classifier::Classifier`] tags the latest message.
//! 2. [`validator::FieldValidator`] geocodes it when the tag is `location`.
//! 3. [`collector::IntakeForm`] absorbs the result.
//! 4. [`generator::ResponseGenerator`] phrases the next reply.
//!
//! [`submitter::RequestSubmitter`] persists the form once it is complete and
//! the client confirms. [`session::IntakeSession`] owns the transcript and the
//! form and drives all of the above.

pub mod classifier;
pub mod collector;
pub mod generator;
pub mod session;
pub mod submitter;
pub mod validator;

pub use classifier::{Classification, Classifier};
pub use collector::{IntakeForm, Stage};
pub use generator::ResponseGenerator;
pub use session::{IntakeSession, TurnReply};
pub use submitter::{RequestSubmitter, SubmitError};
pub use validator::{FieldValidator, LocationResolution};

use serde::{Deserialize, Serialize};

use crate::providers::Message;

// ---------------------------------------------------------------------------
// Transcript
// ---------------------------------------------------------------------------

/// Who said a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    /// The client.
    User,
    /// The intake assistant.
    Assistant,
}

/// One line of the conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    /// Author.
    pub speaker: Speaker,
    /// Raw text.
    pub text: String,
}

/// Append-only conversation log for one session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transcript {
    turns: Vec<Turn>,
}

impl Transcript {
    /// Empty transcript.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a client turn.
    pub fn push_user(&mut self, text: impl Into<String>) {
        self.turns.push(Turn {
            speaker: Speaker::User,
            text: text.into(),
        });
    }

    /// Append an assistant turn.
    pub fn push_assistant(&mut self, text: impl Into<String>) {
        self.turns.push(Turn {
            speaker: Speaker::Assistant,
            text: text.into(),
        });
    }

    /// All turns, oldest first.
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    /// Number of turns.
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    /// Whether nothing has been said yet.
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Drop every turn.
    pub fn clear(&mut self) {
        self.turns.clear();
    }

    /// The transcript as chat-completion messages.
    pub fn to_messages(&self) -> Vec<Message> {
        self.turns
            .iter()
            .map(|turn| match turn.speaker {
                Speaker::User => Message::user(turn.text.clone()),
                Speaker::Assistant => Message::assistant(turn.text.clone()),
            })
            .collect()
    }

    /// Plain-text rendering embedded in the classification prompt.
    pub fn render(&self) -> String {
        self.turns
            .iter()
            .map(|turn| match turn.speaker {
                Speaker::User => format!("Client : {}", turn.text),
                Speaker::Assistant => format!("Assistant : {}", turn.text),
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}
