//! Wire DTOs for the remote service.
//!
//! Every endpoint wraps its payload in `{status, data?, message?}`. The
//! session store is Mongo-backed, so documents carry a string `_id` and
//! camelCase field names; conversions into the domain model live here so the
//! rest of the client never sees wire shapes.

use serde::{Deserialize, Serialize};
use visor_core::error::{Result, VisorError};
use visor_core::product::{ProductFields, ProductInfo};
use visor_core::session::{Message, Sender, Session};

/// The service's response envelope.
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    pub status: String,
    #[serde(default = "Option::default")]
    pub data: Option<T>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Error body the service emits for rejected requests (`{"detail": ...}`).
#[derive(Debug, Deserialize)]
pub struct ErrorDetail {
    pub detail: String,
}

/// A session document as stored by the service.
#[derive(Debug, Deserialize)]
pub struct ChatDto {
    #[serde(rename = "_id", default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub messages: Vec<MessageDto>,
    #[serde(rename = "productInformation", default)]
    pub product_information: ProductInfo,
    #[serde(rename = "createdAt", default)]
    pub created_at: Option<String>,
}

impl ChatDto {
    /// Converts into the domain model. Stored messages carry no ids, so
    /// client ids are synthesized here.
    pub fn into_session(self) -> Session {
        let session_id = self.id.clone();
        let messages = self
            .messages
            .into_iter()
            .map(|dto| dto.into_message(session_id.clone()))
            .collect();
        Session {
            id: self.id,
            name: self.name,
            messages,
            product: self.product_information,
            created_at: self.created_at,
        }
    }

    /// Conversion for responses where a missing id means the service broke
    /// its contract (create and single-session fetch).
    pub fn into_identified_session(self, operation: &'static str) -> Result<Session> {
        if self.id.is_none() {
            return Err(VisorError::contract(operation, "response has no _id"));
        }
        Ok(self.into_session())
    }
}

/// A stored message: sender, text, timestamp. No id on the wire.
#[derive(Debug, Deserialize)]
pub struct MessageDto {
    pub sender: Sender,
    pub text: String,
    #[serde(default)]
    pub timestamp: Option<String>,
}

impl MessageDto {
    pub fn into_message(self, session_id: Option<String>) -> Message {
        Message {
            id: uuid::Uuid::new_v4().to_string(),
            sender: self.sender,
            text: self.text,
            timestamp: self.timestamp,
            session_id,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CreateChatRequest<'a> {
    #[serde(rename = "productInformation")]
    pub product_information: &'a ProductInfo,
}

#[derive(Debug, Serialize)]
pub struct RenameChatRequest<'a> {
    pub name: &'a str,
}

#[derive(Debug, Serialize)]
pub struct SendMessageRequest<'a> {
    pub chat_id: &'a str,
    pub content: &'a str,
}

#[derive(Debug, Serialize)]
pub struct TranslateRequest<'a> {
    pub info: &'a ProductFields,
    pub language: &'a str,
}

/// `data` payload of send/resend responses.
#[derive(Debug, Deserialize)]
pub struct MessageContentData {
    pub content: String,
}

/// `data` payload of the generate-name endpoint.
#[derive(Debug, Deserialize)]
pub struct ChatNameData {
    #[serde(rename = "chatName")]
    pub chat_name: String,
}
