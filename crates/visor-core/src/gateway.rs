//! Remote service capability traits.
//!
//! The orchestration services depend on these injected interfaces rather
//! than on a concrete HTTP client, so each can be tested against in-memory
//! implementations. The `visor-interaction` crate provides the production
//! implementation over the service's JSON envelopes.

use crate::error::Result;
use crate::image::ImageSource;
use crate::product::{ProductFields, ProductInfo};
use crate::session::Session;
use async_trait::async_trait;

/// Which extraction pass to run on an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InfoKind {
    /// The ingredient declaration (names, amounts, source language).
    Ingredients,
    /// Everything else on the packaging (brand, net content, dates, ...).
    OtherInfo,
}

impl InfoKind {
    /// Wire value of the service's `info_type` parameter.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ingredients => "ingredients",
            Self::OtherInfo => "other_info",
        }
    }
}

/// Session store operations.
#[async_trait]
pub trait SessionGateway: Send + Sync {
    /// Lists all persisted sessions.
    async fn list_chats(&self) -> Result<Vec<Session>>;

    /// Fetches one session with its full message history.
    async fn fetch_chat(&self, chat_id: &str) -> Result<Session>;

    /// Creates a session from finalized product information.
    ///
    /// # Errors
    ///
    /// A success envelope without a session id is a `Contract` error.
    async fn create_chat(&self, product: &ProductInfo) -> Result<Session>;

    /// Renames a session.
    async fn rename_chat(&self, chat_id: &str, name: &str) -> Result<()>;

    /// Deletes a session.
    async fn delete_chat(&self, chat_id: &str) -> Result<()>;

    /// Asks the service to derive a name from the session's first exchange.
    async fn generate_chat_name(&self, chat_id: &str) -> Result<String>;
}

/// Conversation endpoints. Both calls return the bot reply text.
#[async_trait]
pub trait ConversationGateway: Send + Sync {
    async fn send_message(&self, chat_id: &str, content: &str) -> Result<String>;

    async fn resend_message(&self, chat_id: &str, content: &str) -> Result<String>;
}

/// Extraction, translation and image publication.
#[async_trait]
pub trait ExtractorGateway: Send + Sync {
    /// Runs one extraction pass over the image.
    async fn extract(&self, image: &ImageSource, kind: InfoKind) -> Result<ProductFields>;

    /// Translates extracted fields into the target language.
    async fn translate(&self, fields: &ProductFields, language: &str) -> Result<ProductFields>;

    /// Publishes a captured image and returns its durable reference.
    async fn publish_image(&self, image: &ImageSource) -> Result<String>;
}
