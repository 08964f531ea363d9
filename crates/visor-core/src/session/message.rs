//! Conversation message types.

use serde::{Deserialize, Serialize};

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    /// Message from the user.
    User,
    /// Message from the service's assistant.
    Bot,
}

/// A single message in a session's conversation.
///
/// Ids are client-generated: optimistic entries get one at send time, and
/// messages loaded from the service (which carries none) get one at load
/// time. A pending optimistic message has no permanent identity guarantee
/// and may be removed entirely if its send fails.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub sender: Sender,
    pub text: String,
    /// ISO 8601, set when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    /// The owning session, carried so a resend can be issued without
    /// re-deriving context.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

impl Message {
    /// Creates a message with a fresh client-generated id and the current
    /// timestamp.
    pub fn new(sender: Sender, text: impl Into<String>, session_id: Option<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            sender,
            text: text.into(),
            timestamp: Some(chrono::Utc::now().to_rfc3339()),
            session_id,
        }
    }

    pub fn is_user(&self) -> bool {
        self.sender == Sender::User
    }

    pub fn is_bot(&self) -> bool {
        self.sender == Sender::Bot
    }
}
