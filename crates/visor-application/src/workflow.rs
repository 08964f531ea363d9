//! Top-level workflow state machine.
//!
//! Sequences capture → extraction → review → conversation over the injected
//! services, and owns the active-session context. Selecting an existing
//! session jumps straight to the conversation stage; starting a new one
//! resets to the intro. The controller is never left in an intermediate
//! state: a failed extraction returns to Upload, a failed session creation
//! stays in Review.

use crate::chat_engine::ChatEngine;
use crate::extraction::{Extraction, ExtractionPipeline};
use crate::session_registry::SessionRegistry;
use std::sync::Arc;
use tokio::sync::RwLock;
use visor_core::config::{ClientConfig, UiContext};
use visor_core::error::{Result, VisorError};
use visor_core::image::ImageSource;
use visor_core::outcome::MutationOutcome;
use visor_core::product::ProductInfo;
use visor_core::session::{Message, Session, SessionSummary, WorkflowStage};

/// The session currently bound to the conversation stage.
struct ActiveSession {
    id: String,
    name: String,
    /// True for sessions created through this workflow run; only those get
    /// an auto-generated name after their first exchange.
    freshly_created: bool,
    /// Set once the naming task has been spawned, so it runs at most once.
    naming_requested: bool,
}

/// Drives the capture → extract → review → converse workflow.
pub struct WorkflowController {
    stage: RwLock<WorkflowStage>,
    pipeline: ExtractionPipeline,
    registry: Arc<SessionRegistry>,
    engine: Arc<ChatEngine>,
    config: ClientConfig,
    ui: RwLock<UiContext>,
    captured: RwLock<Option<ImageSource>>,
    review: RwLock<Option<ProductInfo>>,
    /// Shared with the background naming task, which re-checks it before
    /// touching the bound context.
    active: Arc<RwLock<Option<ActiveSession>>>,
}

impl WorkflowController {
    pub fn new(
        pipeline: ExtractionPipeline,
        registry: Arc<SessionRegistry>,
        engine: Arc<ChatEngine>,
        config: ClientConfig,
    ) -> Self {
        Self {
            stage: RwLock::new(WorkflowStage::Intro),
            pipeline,
            registry,
            engine,
            config,
            ui: RwLock::new(UiContext::default()),
            captured: RwLock::new(None),
            review: RwLock::new(None),
            active: Arc::new(RwLock::new(None)),
        }
    }

    pub async fn stage(&self) -> WorkflowStage {
        *self.stage.read().await
    }

    /// Presentation state carried for the host UI, never interpreted here.
    pub async fn ui_context(&self) -> UiContext {
        self.ui.read().await.clone()
    }

    pub async fn set_ui_context(&self, context: UiContext) {
        *self.ui.write().await = context;
    }

    /// The (id, name) of the bound session, if any.
    pub async fn active_session(&self) -> Option<SessionSummary> {
        self.active.read().await.as_ref().map(|a| SessionSummary {
            id: a.id.clone(),
            name: a.name.clone(),
        })
    }

    /// Snapshot of the active session's message sequence.
    pub async fn messages(&self) -> Result<Arc<Vec<Message>>> {
        let id = self.active_id().await?;
        self.engine
            .messages(&id)
            .await
            .ok_or_else(|| VisorError::not_found("session log", id))
    }

    async fn active_id(&self) -> Result<String> {
        self.active
            .read()
            .await
            .as_ref()
            .map(|a| a.id.clone())
            .ok_or(VisorError::NoActiveSession)
    }

    /// Moves from `from` to `to`, rejecting the call if another stage is
    /// active.
    async fn transition(&self, from: WorkflowStage, to: WorkflowStage) -> Result<()> {
        let mut stage = self.stage.write().await;
        if *stage != from {
            return Err(VisorError::WrongStage {
                expected: from.name(),
                actual: stage.name(),
            });
        }
        *stage = to;
        Ok(())
    }

    async fn ensure_stage(&self, expected: WorkflowStage) -> Result<()> {
        let stage = *self.stage.read().await;
        if stage != expected {
            return Err(VisorError::WrongStage {
                expected: expected.name(),
                actual: stage.name(),
            });
        }
        Ok(())
    }

    /// Intro → Upload.
    pub async fn start(&self) -> Result<()> {
        self.transition(WorkflowStage::Intro, WorkflowStage::Upload)
            .await
    }

    /// Upload → Extracting → Review.
    ///
    /// Runs the extraction pipeline on the captured image. On settle
    /// (translated or fallback) the workflow is in Review with the
    /// resulting product information. On extraction failure the workflow
    /// returns to Upload so the capture can be retried.
    pub async fn capture(&self, image: ImageSource) -> Result<Extraction> {
        self.transition(WorkflowStage::Upload, WorkflowStage::Extracting)
            .await?;

        match self
            .pipeline
            .run(&image, &self.config.target_language)
            .await
        {
            Ok(extraction) => {
                *self.captured.write().await = Some(image);
                *self.review.write().await = Some(extraction.product.clone());
                *self.stage.write().await = WorkflowStage::Review;
                Ok(extraction)
            }
            Err(err) => {
                *self.stage.write().await = WorkflowStage::Upload;
                Err(err)
            }
        }
    }

    /// Edits the product information while it is under review.
    pub async fn update_review<F>(&self, edit: F) -> Result<()>
    where
        F: FnOnce(&mut ProductInfo),
    {
        self.ensure_stage(WorkflowStage::Review).await?;
        let mut review = self.review.write().await;
        let product = review
            .as_mut()
            .ok_or_else(|| VisorError::not_found("product under review", "workflow"))?;
        edit(product);
        Ok(())
    }

    /// The product information currently under review.
    pub async fn review_product(&self) -> Option<ProductInfo> {
        self.review.read().await.clone()
    }

    /// Review → Converse, materializing the session.
    ///
    /// # Errors
    ///
    /// On any creation failure the workflow stays in Review and nothing is
    /// bound; the call can be retried.
    pub async fn confirm(&self) -> Result<Session> {
        self.ensure_stage(WorkflowStage::Review).await?;
        let product = self
            .review
            .read()
            .await
            .clone()
            .ok_or_else(|| VisorError::not_found("product under review", "workflow"))?;
        let image = self
            .captured
            .read()
            .await
            .clone()
            .ok_or_else(|| VisorError::not_found("captured image", "workflow"))?;

        let session = self.registry.create(product, &image).await?;
        let id = session
            .id
            .clone()
            .ok_or_else(|| VisorError::contract("create chat", "session id missing"))?;

        self.engine.open(&id).await;
        *self.active.write().await = Some(ActiveSession {
            id,
            name: session.name.clone(),
            freshly_created: true,
            naming_requested: false,
        });
        *self.captured.write().await = None;
        *self.review.write().await = None;
        *self.stage.write().await = WorkflowStage::Converse;
        Ok(session)
    }

    /// Sends a message in the active session.
    ///
    /// After the first confirmed exchange of a freshly created session a
    /// naming task is spawned fire-and-forget; its failure never reaches
    /// the conversation.
    pub async fn send(&self, text: &str) -> Result<MutationOutcome<Message>> {
        self.ensure_stage(WorkflowStage::Converse).await?;
        let id = self.active_id().await?;
        let outcome = self.engine.send(&id, text).await?;
        if outcome.is_applied() {
            self.maybe_spawn_naming(&id).await;
        }
        Ok(outcome)
    }

    /// Replays a user message against the bot reply at `index`.
    pub async fn resend(&self, index: usize, original_text: &str) -> Result<MutationOutcome<Message>> {
        self.ensure_stage(WorkflowStage::Converse).await?;
        let id = self.active_id().await?;
        self.engine.resend(&id, index, original_text).await
    }

    /// Any stage → Converse, loading an existing session whole.
    pub async fn open_session(&self, session_id: &str) -> Result<Session> {
        let session = self.registry.select(session_id).await?;
        self.engine.load(&session).await?;
        *self.active.write().await = Some(ActiveSession {
            id: session_id.to_string(),
            name: session.name.clone(),
            freshly_created: false,
            naming_requested: true,
        });
        *self.captured.write().await = None;
        *self.review.write().await = None;
        *self.stage.write().await = WorkflowStage::Converse;
        Ok(session)
    }

    /// Any stage → Intro, clearing the workflow context.
    ///
    /// Outstanding network calls are not cancelled; their late responses
    /// are discarded by the engine's per-session guards.
    pub async fn new_session(&self) {
        *self.active.write().await = None;
        *self.captured.write().await = None;
        *self.review.write().await = None;
        *self.stage.write().await = WorkflowStage::Intro;
    }

    async fn maybe_spawn_naming(&self, session_id: &str) {
        {
            let mut active = self.active.write().await;
            let Some(active) = active.as_mut() else {
                return;
            };
            if active.id != session_id || !active.freshly_created || active.naming_requested {
                return;
            }
            active.naming_requested = true;
        }

        let registry = Arc::clone(&self.registry);
        let active = Arc::clone(&self.active);
        let session_id = session_id.to_string();
        tokio::spawn(async move {
            if let Err(err) = apply_generated_name(&registry, &active, &session_id).await {
                tracing::warn!(session_id, error = %err, "session naming failed");
            }
        });
    }

    /// Runs the naming step synchronously. Exposed for hosts that prefer to
    /// schedule it themselves; [`send`](Self::send) spawns it automatically.
    pub async fn generate_session_name(&self, session_id: &str) -> Result<()> {
        apply_generated_name(&self.registry, &self.active, session_id).await
    }
}

/// Requests a generated name and applies it via rename. Only updates the
/// bound context if the session is still the active one.
async fn apply_generated_name(
    registry: &SessionRegistry,
    active: &RwLock<Option<ActiveSession>>,
    session_id: &str,
) -> Result<()> {
    let name = registry.generate_name(session_id).await?;
    match registry.rename(session_id, &name).await? {
        MutationOutcome::Applied(()) => {
            let mut active = active.write().await;
            if let Some(active) = active.as_mut() {
                if active.id == session_id {
                    active.name = name;
                }
            }
            Ok(())
        }
        MutationOutcome::RolledBack(err) => Err(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockConversationGateway, MockExtractorGateway, MockSessionGateway};
    use std::time::Duration;
    use visor_core::gateway::InfoKind;
    use visor_core::product::ProductFields;
    use visor_core::session::{PLACEHOLDER_NAME, Sender};

    struct Harness {
        controller: Arc<WorkflowController>,
        registry: Arc<SessionRegistry>,
        sessions: Arc<MockSessionGateway>,
        conversation: Arc<MockConversationGateway>,
        extractor: Arc<MockExtractorGateway>,
    }

    fn harness() -> Harness {
        let sessions = Arc::new(MockSessionGateway::new());
        let conversation = Arc::new(MockConversationGateway::new());
        let extractor = Arc::new(MockExtractorGateway::new());

        let mut fields = ProductFields::new();
        fields.ingredients = vec!["Water".to_string(), "Glycerin".to_string()];
        extractor.set_extract(InfoKind::Ingredients, Ok(fields.clone()));
        extractor.set_translate(Ok(fields));

        let registry = Arc::new(SessionRegistry::new(sessions.clone(), extractor.clone()));
        let controller = Arc::new(WorkflowController::new(
            ExtractionPipeline::new(extractor.clone()),
            registry.clone(),
            Arc::new(ChatEngine::new(conversation.clone())),
            ClientConfig::default(),
        ));
        Harness {
            controller,
            registry,
            sessions,
            conversation,
            extractor,
        }
    }

    fn image() -> ImageSource {
        ImageSource::Bytes {
            data: vec![0xFF, 0xD8],
            file_name: "label.jpg".to_string(),
        }
    }

    async fn advance_to_converse(h: &Harness) -> Session {
        h.controller.start().await.unwrap();
        h.controller.capture(image()).await.unwrap();
        h.controller.confirm().await.unwrap()
    }

    #[tokio::test]
    async fn happy_path_reaches_converse_with_an_empty_session() {
        let h = harness();
        assert_eq!(h.controller.stage().await, WorkflowStage::Intro);

        h.controller.start().await.unwrap();
        assert_eq!(h.controller.stage().await, WorkflowStage::Upload);

        let extraction = h.controller.capture(image()).await.unwrap();
        assert!(extraction.localized);
        assert_eq!(h.controller.stage().await, WorkflowStage::Review);

        h.controller
            .update_review(|product| product.fields.set_extra("usage", "Apply twice daily"))
            .await
            .unwrap();

        let session = h.controller.confirm().await.unwrap();
        assert_eq!(h.controller.stage().await, WorkflowStage::Converse);
        assert!(session.messages.is_empty());
        assert_eq!(session.name, PLACEHOLDER_NAME);
        assert_eq!(session.product.image, "img/published-1.jpg");
        assert_eq!(session.product.fields.get("usage"), Some("Apply twice daily"));

        let id = session.id.unwrap();
        let listed = h.registry.list().await.unwrap();
        assert!(listed.iter().any(|s| s.id == id));
        assert!(h.controller.messages().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn failed_extraction_returns_to_upload() {
        let h = harness();
        h.extractor.set_extract(
            InfoKind::Ingredients,
            Err(VisorError::transport("connection refused")),
        );
        h.controller.start().await.unwrap();

        let err = h.controller.capture(image()).await.unwrap_err();
        assert!(err.is_transport());
        assert_eq!(h.controller.stage().await, WorkflowStage::Upload);
        assert!(h.controller.review_product().await.is_none());
    }

    #[tokio::test]
    async fn translation_fallback_still_reaches_review() {
        let h = harness();
        h.extractor
            .set_translate(Err(VisorError::service("500: translator down")));
        h.controller.start().await.unwrap();

        let extraction = h.controller.capture(image()).await.unwrap();
        assert!(!extraction.localized);
        assert_eq!(h.controller.stage().await, WorkflowStage::Review);
        assert_eq!(
            h.controller.review_product().await.unwrap().fields.ingredients,
            vec!["Water", "Glycerin"]
        );
    }

    #[tokio::test]
    async fn failed_creation_stays_in_review_and_can_retry() {
        let h = harness();
        h.controller.start().await.unwrap();
        h.controller.capture(image()).await.unwrap();

        h.sessions
            .fail_next_create(VisorError::transport("connection reset"));
        let err = h.controller.confirm().await.unwrap_err();
        assert!(err.is_transport());
        assert_eq!(h.controller.stage().await, WorkflowStage::Review);
        assert!(h.controller.active_session().await.is_none());

        // the failure left the review intact, so confirming again works
        let session = h.controller.confirm().await.unwrap();
        assert!(session.id.is_some());
        assert_eq!(h.controller.stage().await, WorkflowStage::Converse);
    }

    #[tokio::test]
    async fn open_session_short_circuits_to_converse() {
        let h = harness();
        let seeded = Session {
            id: Some("chat-7".to_string()),
            name: "Sunscreen questions".to_string(),
            messages: vec![
                Message::new(Sender::User, "Does it leave a cast?", None),
                Message::new(Sender::Bot, "A slight one on deep skin tones.", None),
            ],
            product: ProductInfo::default(),
            created_at: None,
        };
        h.sessions.seed(seeded);

        let session = h.controller.open_session("chat-7").await.unwrap();
        assert_eq!(h.controller.stage().await, WorkflowStage::Converse);
        assert_eq!(session.name, "Sunscreen questions");

        let messages = h.controller.messages().await.unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].text, "Does it leave a cast?");
        assert_eq!(
            h.controller.active_session().await.unwrap().name,
            "Sunscreen questions"
        );
    }

    #[tokio::test]
    async fn send_requires_the_converse_stage() {
        let h = harness();
        let err = h.controller.send("hello").await.unwrap_err();
        assert!(matches!(err, VisorError::WrongStage { .. }));

        h.controller.start().await.unwrap();
        let err = h.controller.start().await.unwrap_err();
        assert!(matches!(err, VisorError::WrongStage { .. }));
    }

    #[tokio::test]
    async fn first_exchange_triggers_the_naming_task_once() {
        let h = harness();
        let session = advance_to_converse(&h).await;
        let id = session.id.unwrap();
        h.sessions.set_generated_name("Moisturizer check");
        h.conversation.queue_send(Ok("Looks gentle.".to_string()));
        h.conversation.queue_send(Ok("Yes.".to_string()));

        let outcome = h.controller.send("Is this gentle?").await.unwrap();
        assert!(outcome.is_applied());
        let outcome = h.controller.send("Fragrance free?").await.unwrap();
        assert!(outcome.is_applied());

        // the naming task is fire-and-forget; wait for it to land
        tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                let named = h
                    .sessions
                    .server_names()
                    .iter()
                    .any(|(sid, name)| sid == &id && name == "Moisturizer check");
                if named {
                    break;
                }
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("naming task never applied the generated name");

        assert_eq!(h.sessions.generate_calls(), 1);
        assert_eq!(
            h.controller.active_session().await.unwrap().name,
            "Moisturizer check"
        );
        // the conversation was untouched by the background naming
        assert_eq!(h.controller.messages().await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn naming_failure_is_swallowed_and_changes_nothing() {
        let h = harness();
        let session = advance_to_converse(&h).await;
        let id = session.id.unwrap();
        h.sessions
            .fail_next_generate(VisorError::service("400: need a full exchange"));

        let err = h.controller.generate_session_name(&id).await.unwrap_err();
        assert!(err.is_service());
        assert_eq!(
            h.controller.active_session().await.unwrap().name,
            PLACEHOLDER_NAME
        );
    }

    #[tokio::test]
    async fn ui_context_is_carried_verbatim() {
        let h = harness();
        let context = UiContext {
            theme: visor_core::config::Theme::Dark,
            sidebar_open: true,
        };
        h.controller.set_ui_context(context.clone()).await;
        assert_eq!(h.controller.ui_context().await, context);
        // presentation state never gates the workflow
        h.controller.start().await.unwrap();
        assert_eq!(h.controller.stage().await, WorkflowStage::Upload);
    }

    #[tokio::test]
    async fn new_session_resets_to_intro() {
        let h = harness();
        advance_to_converse(&h).await;

        h.controller.new_session().await;
        assert_eq!(h.controller.stage().await, WorkflowStage::Intro);
        assert!(h.controller.active_session().await.is_none());
        assert!(h.controller.review_product().await.is_none());
    }
}
