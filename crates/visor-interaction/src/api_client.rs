//! HTTP client for the remote Visor service.
//!
//! Implements the core gateway traits over the service's JSON envelopes.
//! The client enforces no timeout and performs no retries; it relies on the
//! transport's defaults, and every failure is mapped into the
//! `Transport` / `Service` / `Contract` taxonomy at this boundary.

use crate::dto::{
    ChatDto, ChatNameData, CreateChatRequest, Envelope, ErrorDetail, MessageContentData,
    RenameChatRequest, SendMessageRequest, TranslateRequest,
};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use visor_core::config::ClientConfig;
use visor_core::error::{Result, VisorError};
use visor_core::gateway::{ConversationGateway, ExtractorGateway, InfoKind, SessionGateway};
use visor_core::image::ImageSource;
use visor_core::product::{ProductFields, ProductInfo};
use visor_core::session::Session;

/// Client for the remote service's REST API.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    /// Creates a client against the given base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Creates a client from the shared configuration.
    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(config.base_url.clone())
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Sends the request and decodes the envelope, mapping every failure
    /// class at this boundary.
    async fn read_envelope<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        request: RequestBuilder,
    ) -> Result<Envelope<T>> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(service_error(status, &body));
        }

        let envelope = decode_envelope::<T>(operation, &body)?;
        if envelope.status != "success" {
            let message = envelope
                .message
                .unwrap_or_else(|| format!("{} reported status {:?}", operation, envelope.status));
            return Err(VisorError::service(message));
        }
        Ok(envelope)
    }

    /// Runs a request whose envelope must carry a `data` payload.
    async fn request_data<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        request: RequestBuilder,
    ) -> Result<T> {
        let envelope = self.read_envelope::<T>(operation, request).await?;
        envelope
            .data
            .ok_or_else(|| VisorError::contract(operation, "success envelope without data"))
    }

    /// Runs a request where a success envelope alone is the confirmation.
    async fn request_ack(&self, operation: &'static str, request: RequestBuilder) -> Result<()> {
        self.read_envelope::<serde_json::Value>(operation, request)
            .await
            .map(|_| ())
    }

    async fn image_form(&self, image: &ImageSource) -> Result<Form> {
        let data = match image {
            ImageSource::Path(path) => tokio::fs::read(path).await.map_err(|err| {
                VisorError::transport(format!(
                    "failed to read image {}: {}",
                    path.display(),
                    err
                ))
            })?,
            ImageSource::Bytes { data, .. } => data.clone(),
        };
        let part = Part::bytes(data)
            .file_name(image.file_name())
            .mime_str(&image.mime_type())
            .map_err(VisorError::from)?;
        Ok(Form::new().part("file", part))
    }
}

#[async_trait]
impl SessionGateway for ApiClient {
    async fn list_chats(&self) -> Result<Vec<Session>> {
        let chats: Vec<ChatDto> = self
            .request_data("list chats", self.client.get(self.url("/api/chats")))
            .await?;
        Ok(chats.into_iter().map(ChatDto::into_session).collect())
    }

    async fn fetch_chat(&self, chat_id: &str) -> Result<Session> {
        let chat: ChatDto = self
            .request_data(
                "fetch chat",
                self.client.get(self.url(&format!("/api/chats/{}", chat_id))),
            )
            .await?;
        chat.into_identified_session("fetch chat")
    }

    async fn create_chat(&self, product: &ProductInfo) -> Result<Session> {
        let body = CreateChatRequest {
            product_information: product,
        };
        let chat: ChatDto = self
            .request_data(
                "create chat",
                self.client.post(self.url("/api/chat")).json(&body),
            )
            .await?;
        chat.into_identified_session("create chat")
    }

    async fn rename_chat(&self, chat_id: &str, name: &str) -> Result<()> {
        let body = RenameChatRequest { name };
        self.request_ack(
            "rename chat",
            self.client
                .patch(self.url(&format!("/api/chats/{}/rename", chat_id)))
                .json(&body),
        )
        .await
    }

    async fn delete_chat(&self, chat_id: &str) -> Result<()> {
        self.request_ack(
            "delete chat",
            self.client
                .delete(self.url(&format!("/api/chats/{}", chat_id))),
        )
        .await
    }

    async fn generate_chat_name(&self, chat_id: &str) -> Result<String> {
        let data: ChatNameData = self
            .request_data(
                "generate chat name",
                self.client
                    .get(self.url(&format!("/api/chats/{}/get-name", chat_id))),
            )
            .await?;
        Ok(data.chat_name)
    }
}

#[async_trait]
impl ConversationGateway for ApiClient {
    async fn send_message(&self, chat_id: &str, content: &str) -> Result<String> {
        let body = SendMessageRequest { chat_id, content };
        let data: MessageContentData = self
            .request_data(
                "send message",
                self.client.post(self.url("/api/messages/send")).json(&body),
            )
            .await?;
        Ok(data.content)
    }

    async fn resend_message(&self, chat_id: &str, content: &str) -> Result<String> {
        let body = SendMessageRequest { chat_id, content };
        let data: MessageContentData = self
            .request_data(
                "resend message",
                self.client
                    .post(self.url("/api/messages/resend"))
                    .json(&body),
            )
            .await?;
        Ok(data.content)
    }
}

#[async_trait]
impl ExtractorGateway for ApiClient {
    async fn extract(&self, image: &ImageSource, kind: InfoKind) -> Result<ProductFields> {
        let form = self.image_form(image).await?;
        self.request_data(
            "extract fields",
            self.client
                .post(self.url("/api/extractor/extract"))
                .query(&[("info_type", kind.as_str())])
                .multipart(form),
        )
        .await
    }

    async fn translate(&self, fields: &ProductFields, language: &str) -> Result<ProductFields> {
        let body = TranslateRequest {
            info: fields,
            language,
        };
        self.request_data(
            "translate fields",
            self.client
                .post(self.url("/api/extractor/translate"))
                .json(&body),
        )
        .await
    }

    async fn publish_image(&self, image: &ImageSource) -> Result<String> {
        let form = self.image_form(image).await?;
        self.request_data(
            "publish image",
            self.client
                .post(self.url("/api/extractor/upload"))
                .multipart(form),
        )
        .await
    }
}

/// Decodes a success-status body, mapping parse failures to `Contract`.
fn decode_envelope<T: DeserializeOwned>(
    operation: &'static str,
    body: &str,
) -> Result<Envelope<T>> {
    serde_json::from_str(body)
        .map_err(|err| VisorError::contract(operation, format!("undecodable envelope: {}", err)))
}

/// Maps a non-2xx response body to a `Service` error, preferring the
/// envelope `message`, then the service's `detail` body, then the raw text.
fn service_error(status: StatusCode, body: &str) -> VisorError {
    let message = serde_json::from_str::<Envelope<serde_json::Value>>(body)
        .ok()
        .and_then(|envelope| envelope.message)
        .or_else(|| {
            serde_json::from_str::<ErrorDetail>(body)
                .ok()
                .map(|e| e.detail)
        })
        .unwrap_or_else(|| body.to_string());
    VisorError::service(format!("{}: {}", status.as_u16(), message))
}
