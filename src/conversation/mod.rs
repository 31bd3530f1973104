//! Conversation types and session state

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub sender: Sender,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Bot,
}

impl Message {
    /// Create a message stamped with the current time. Text is trimmed;
    /// callers guarantee it is non-empty after trimming.
    pub fn new(sender: Sender, text: impl AsRef<str>) -> Self {
        Self {
            sender,
            text: text.as_ref().trim().to_string(),
            created_at: Utc::now(),
        }
    }

    pub fn user(text: impl AsRef<str>) -> Self {
        Self::new(Sender::User, text)
    }

    pub fn bot(text: impl AsRef<str>) -> Self {
        Self::new(Sender::Bot, text)
    }
}

/// The single mutable aggregate behind one chat session: the transcript,
/// the in-flight flag, and the current surfaced error.
///
/// The store only performs direct field transitions; the dispatch protocol
/// in [`crate::dispatch`] is responsible for sequencing them.
#[derive(Debug, Clone)]
pub struct SessionState {
    id: Uuid,
    transcript: Vec<Message>,
    pending: bool,
    last_error: Option<String>,
    generation: u64,
}

impl SessionState {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            transcript: Vec::new(),
            pending: false,
            last_error: None,
            generation: 0,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn transcript(&self) -> &[Message] {
        &self.transcript
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Bumped by every [`reset`](Self::reset); a dispatch that outlives a
    /// reset detects the mismatch and discards its outcome.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Append a message to the end of the transcript. Append-only: nothing
    /// short of [`reset`](Self::reset) removes an entry.
    pub fn append(&mut self, message: Message) {
        self.transcript.push(message);
    }

    pub fn set_pending(&mut self, pending: bool) {
        self.pending = pending;
    }

    /// Set or clear the surfaced error. Clearing with `None` is how the
    /// error-toast dismissal is expressed.
    pub fn set_error(&mut self, error: Option<String>) {
        self.last_error = error;
    }

    /// Return the session to its empty state. Does not touch `pending`: a
    /// dispatch already in flight runs to completion and settles the flag
    /// itself.
    pub fn reset(&mut self) {
        self.transcript.clear();
        self.last_error = None;
        self.generation += 1;
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}
