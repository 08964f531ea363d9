//! Scriptable in-memory gateway implementations for tests.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use visor_core::error::{Result, VisorError};
use visor_core::gateway::{ConversationGateway, ExtractorGateway, InfoKind, SessionGateway};
use visor_core::image::ImageSource;
use visor_core::product::{ProductFields, ProductInfo};
use visor_core::session::{PLACEHOLDER_NAME, Session};

/// In-memory session store with one-shot failure injection.
pub struct MockSessionGateway {
    chats: Mutex<Vec<Session>>,
    next_id: AtomicUsize,
    fail_next_list: Mutex<Option<VisorError>>,
    fail_next_create: Mutex<Option<VisorError>>,
    fail_next_rename: Mutex<Option<VisorError>>,
    fail_next_delete: Mutex<Option<VisorError>>,
    generated_name: Mutex<String>,
    fail_next_generate: Mutex<Option<VisorError>>,
    generate_calls: AtomicUsize,
}

impl MockSessionGateway {
    pub fn new() -> Self {
        Self {
            chats: Mutex::new(Vec::new()),
            next_id: AtomicUsize::new(1),
            fail_next_list: Mutex::new(None),
            fail_next_create: Mutex::new(None),
            fail_next_rename: Mutex::new(None),
            fail_next_delete: Mutex::new(None),
            generated_name: Mutex::new("Sensitive Skin Check".to_string()),
            fail_next_generate: Mutex::new(None),
            generate_calls: AtomicUsize::new(0),
        }
    }

    pub fn generate_calls(&self) -> usize {
        self.generate_calls.load(Ordering::SeqCst)
    }

    pub fn fail_next_list(&self, err: VisorError) {
        *self.fail_next_list.lock().unwrap() = Some(err);
    }

    pub fn fail_next_create(&self, err: VisorError) {
        *self.fail_next_create.lock().unwrap() = Some(err);
    }

    pub fn fail_next_rename(&self, err: VisorError) {
        *self.fail_next_rename.lock().unwrap() = Some(err);
    }

    pub fn fail_next_delete(&self, err: VisorError) {
        *self.fail_next_delete.lock().unwrap() = Some(err);
    }

    pub fn fail_next_generate(&self, err: VisorError) {
        *self.fail_next_generate.lock().unwrap() = Some(err);
    }

    pub fn set_generated_name(&self, name: impl Into<String>) {
        *self.generated_name.lock().unwrap() = name.into();
    }

    /// Seeds a stored session directly.
    pub fn seed(&self, session: Session) {
        self.chats.lock().unwrap().push(session);
    }

    /// Server-side truth, for reconciliation assertions.
    pub fn server_names(&self) -> Vec<(String, String)> {
        self.chats
            .lock()
            .unwrap()
            .iter()
            .filter_map(|c| c.id.clone().map(|id| (id, c.name.clone())))
            .collect()
    }
}

#[async_trait]
impl SessionGateway for MockSessionGateway {
    async fn list_chats(&self) -> Result<Vec<Session>> {
        if let Some(err) = self.fail_next_list.lock().unwrap().take() {
            return Err(err);
        }
        Ok(self.chats.lock().unwrap().clone())
    }

    async fn fetch_chat(&self, chat_id: &str) -> Result<Session> {
        self.chats
            .lock()
            .unwrap()
            .iter()
            .find(|c| c.id.as_deref() == Some(chat_id))
            .cloned()
            .ok_or_else(|| VisorError::service(format!("404: Chat not found: {}", chat_id)))
    }

    async fn create_chat(&self, product: &ProductInfo) -> Result<Session> {
        if let Some(err) = self.fail_next_create.lock().unwrap().take() {
            return Err(err);
        }
        let id = format!("chat-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
        let session = Session {
            id: Some(id),
            name: PLACEHOLDER_NAME.to_string(),
            messages: Vec::new(),
            product: product.clone(),
            created_at: Some("2025-05-01T00:00:00".to_string()),
        };
        self.chats.lock().unwrap().push(session.clone());
        Ok(session)
    }

    async fn rename_chat(&self, chat_id: &str, name: &str) -> Result<()> {
        if let Some(err) = self.fail_next_rename.lock().unwrap().take() {
            return Err(err);
        }
        let mut chats = self.chats.lock().unwrap();
        let chat = chats
            .iter_mut()
            .find(|c| c.id.as_deref() == Some(chat_id))
            .ok_or_else(|| VisorError::service("404: Chat not found"))?;
        chat.name = name.to_string();
        Ok(())
    }

    async fn delete_chat(&self, chat_id: &str) -> Result<()> {
        if let Some(err) = self.fail_next_delete.lock().unwrap().take() {
            return Err(err);
        }
        let mut chats = self.chats.lock().unwrap();
        let before = chats.len();
        chats.retain(|c| c.id.as_deref() != Some(chat_id));
        if chats.len() == before {
            return Err(VisorError::service("404: Chat not found"));
        }
        Ok(())
    }

    async fn generate_chat_name(&self, _chat_id: &str) -> Result<String> {
        self.generate_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.fail_next_generate.lock().unwrap().take() {
            return Err(err);
        }
        Ok(self.generated_name.lock().unwrap().clone())
    }
}

/// Conversation gateway with queued replies; unqueued calls answer "ok".
pub struct MockConversationGateway {
    send_replies: Mutex<VecDeque<Result<String>>>,
    resend_replies: Mutex<VecDeque<Result<String>>>,
    calls: Mutex<Vec<(String, String)>>,
}

impl MockConversationGateway {
    pub fn new() -> Self {
        Self {
            send_replies: Mutex::new(VecDeque::new()),
            resend_replies: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn queue_send(&self, reply: Result<String>) {
        self.send_replies.lock().unwrap().push_back(reply);
    }

    pub fn queue_resend(&self, reply: Result<String>) {
        self.resend_replies.lock().unwrap().push_back(reply);
    }

    /// (chat_id, content) pairs in call order, send and resend combined.
    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ConversationGateway for MockConversationGateway {
    async fn send_message(&self, chat_id: &str, content: &str) -> Result<String> {
        self.calls
            .lock()
            .unwrap()
            .push((chat_id.to_string(), content.to_string()));
        self.send_replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok("ok".to_string()))
    }

    async fn resend_message(&self, chat_id: &str, content: &str) -> Result<String> {
        self.calls
            .lock()
            .unwrap()
            .push((chat_id.to_string(), content.to_string()));
        self.resend_replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok("ok".to_string()))
    }
}

/// Extractor gateway with per-pass scripted results.
pub struct MockExtractorGateway {
    ingredients: Mutex<Result<ProductFields>>,
    other_info: Mutex<Result<ProductFields>>,
    translate: Mutex<Result<ProductFields>>,
    publish: Mutex<Result<String>>,
    translate_inputs: Mutex<Vec<ProductFields>>,
    publish_calls: AtomicUsize,
}

impl MockExtractorGateway {
    pub fn new() -> Self {
        Self {
            ingredients: Mutex::new(Ok(ProductFields::new())),
            other_info: Mutex::new(Ok(ProductFields::new())),
            translate: Mutex::new(Ok(ProductFields::new())),
            publish: Mutex::new(Ok("img/published-1.jpg".to_string())),
            translate_inputs: Mutex::new(Vec::new()),
            publish_calls: AtomicUsize::new(0),
        }
    }

    pub fn set_extract(&self, kind: InfoKind, result: Result<ProductFields>) {
        match kind {
            InfoKind::Ingredients => *self.ingredients.lock().unwrap() = result,
            InfoKind::OtherInfo => *self.other_info.lock().unwrap() = result,
        }
    }

    pub fn set_translate(&self, result: Result<ProductFields>) {
        *self.translate.lock().unwrap() = result;
    }

    pub fn set_publish(&self, result: Result<String>) {
        *self.publish.lock().unwrap() = result;
    }

    pub fn last_translate_input(&self) -> Option<ProductFields> {
        self.translate_inputs.lock().unwrap().last().cloned()
    }

    pub fn translate_calls(&self) -> usize {
        self.translate_inputs.lock().unwrap().len()
    }

    pub fn publish_calls(&self) -> usize {
        self.publish_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ExtractorGateway for MockExtractorGateway {
    async fn extract(&self, _image: &ImageSource, kind: InfoKind) -> Result<ProductFields> {
        match kind {
            InfoKind::Ingredients => self.ingredients.lock().unwrap().clone(),
            InfoKind::OtherInfo => self.other_info.lock().unwrap().clone(),
        }
    }

    async fn translate(&self, fields: &ProductFields, _language: &str) -> Result<ProductFields> {
        self.translate_inputs.lock().unwrap().push(fields.clone());
        self.translate.lock().unwrap().clone()
    }

    async fn publish_image(&self, _image: &ImageSource) -> Result<String> {
        self.publish_calls.fetch_add(1, Ordering::SeqCst);
        self.publish.lock().unwrap().clone()
    }
}
