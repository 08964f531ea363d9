//! Session domain model.
//!
//! A session is one persisted conversation together with the product
//! information it was created from.

use super::message::Message;
use crate::product::ProductInfo;
use serde::{Deserialize, Serialize};

/// Placeholder name the service assigns at creation, before a generated
/// name has been applied.
pub const PLACEHOLDER_NAME: &str = "New Chat";

/// A persisted conversation plus its associated product information.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Remote identifier; absent until the creation call has succeeded.
    pub id: Option<String>,
    /// Human-readable name. May still be the service placeholder until a
    /// generated name is applied.
    pub name: String,
    /// Conversation history in insertion order.
    pub messages: Vec<Message>,
    /// The product this conversation is about. Immutable once the session
    /// exists.
    pub product: ProductInfo,
    /// Creation timestamp reported by the service (ISO 8601).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

impl Session {
    pub fn summary(&self) -> Option<SessionSummary> {
        self.id.as_ref().map(|id| SessionSummary {
            id: id.clone(),
            name: self.name.clone(),
        })
    }
}

/// The (id, name) pair the registry's list cache holds per session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub id: String,
    pub name: String,
}
