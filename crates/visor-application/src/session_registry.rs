//! Session collection management.
//!
//! Keeps a copy-on-write cache of (id, name) summaries and reconciles it
//! against the remote store after every mutating operation. Rename and
//! delete are optimistic with deliberately different failure policies:
//! a failed rename reverts the local name itself, a failed delete never
//! reverts manually and relies on the re-fetch alone.

use std::sync::Arc;
use tokio::sync::RwLock;
use visor_core::error::{Result, VisorError};
use visor_core::gateway::{ExtractorGateway, SessionGateway};
use visor_core::image::ImageSource;
use visor_core::outcome::MutationOutcome;
use visor_core::product::ProductInfo;
use visor_core::session::{Session, SessionSummary};

/// Manages the persisted session collection.
pub struct SessionRegistry {
    gateway: Arc<dyn SessionGateway>,
    extractor: Arc<dyn ExtractorGateway>,
    /// Copy-on-write list cache; readers hold snapshots.
    summaries: RwLock<Arc<Vec<SessionSummary>>>,
}

impl SessionRegistry {
    pub fn new(gateway: Arc<dyn SessionGateway>, extractor: Arc<dyn ExtractorGateway>) -> Self {
        Self {
            gateway,
            extractor,
            summaries: RwLock::new(Arc::new(Vec::new())),
        }
    }

    /// Fetches the session list from the store, replacing the local cache.
    pub async fn list(&self) -> Result<Arc<Vec<SessionSummary>>> {
        let sessions = self.gateway.list_chats().await?;
        let snapshot: Arc<Vec<SessionSummary>> =
            Arc::new(sessions.iter().filter_map(Session::summary).collect());
        *self.summaries.write().await = snapshot.clone();
        Ok(snapshot)
    }

    /// Current local snapshot, without touching the network.
    pub async fn summaries(&self) -> Arc<Vec<SessionSummary>> {
        self.summaries.read().await.clone()
    }

    /// Reconciliation fetch after a mutation. Its own failure is logged and
    /// swallowed; the caller's outcome is already decided.
    async fn reconcile(&self) {
        if let Err(err) = self.list().await {
            tracing::warn!(error = %err, "session list reconciliation failed");
        }
    }

    /// Publishes the captured image and creates a session from the
    /// finalized product information.
    ///
    /// # Errors
    ///
    /// Any failure aborts before anything is committed locally; the caller
    /// must not advance past the review stage.
    pub async fn create(&self, mut product: ProductInfo, image: &ImageSource) -> Result<Session> {
        let reference = self.extractor.publish_image(image).await?;
        product.image = reference;

        let session = self.gateway.create_chat(&product).await?;

        if let Some(summary) = session.summary() {
            let mut cache = self.summaries.write().await;
            let mut next = cache.as_ref().clone();
            next.push(summary);
            *cache = Arc::new(next);
        }
        self.reconcile().await;
        Ok(session)
    }

    /// Renames a session optimistically.
    ///
    /// The local name changes before the remote call; a remote failure
    /// restores the exact pre-call name. The list is re-fetched afterwards
    /// on both outcomes.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when the id is not in the local cache.
    pub async fn rename(&self, session_id: &str, new_name: &str) -> Result<MutationOutcome<()>> {
        let previous = {
            let mut cache = self.summaries.write().await;
            let Some(pos) = cache.iter().position(|s| s.id == session_id) else {
                return Err(VisorError::not_found("session", session_id));
            };
            let mut next = cache.as_ref().clone();
            let previous = std::mem::replace(&mut next[pos].name, new_name.to_string());
            *cache = Arc::new(next);
            previous
        };

        let outcome = match self.gateway.rename_chat(session_id, new_name).await {
            Ok(()) => MutationOutcome::Applied(()),
            Err(err) => {
                tracing::warn!(session_id, error = %err, "rename failed, reverting local name");
                let mut cache = self.summaries.write().await;
                if let Some(pos) = cache.iter().position(|s| s.id == session_id) {
                    let mut next = cache.as_ref().clone();
                    next[pos].name = previous;
                    *cache = Arc::new(next);
                }
                MutationOutcome::RolledBack(err)
            }
        };

        self.reconcile().await;
        Ok(outcome)
    }

    /// Deletes a session optimistically.
    ///
    /// The entry is removed locally before the remote call. On failure
    /// nothing is put back by hand; the unconditional re-fetch restores the
    /// store's truth.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when the id is not in the local cache.
    pub async fn delete(&self, session_id: &str) -> Result<MutationOutcome<()>> {
        {
            let mut cache = self.summaries.write().await;
            let Some(pos) = cache.iter().position(|s| s.id == session_id) else {
                return Err(VisorError::not_found("session", session_id));
            };
            let mut next = cache.as_ref().clone();
            next.remove(pos);
            *cache = Arc::new(next);
        }

        let outcome = match self.gateway.delete_chat(session_id).await {
            Ok(()) => MutationOutcome::Applied(()),
            Err(err) => {
                tracing::warn!(session_id, error = %err, "delete failed, reconciling from the store");
                MutationOutcome::RolledBack(err)
            }
        };

        self.reconcile().await;
        Ok(outcome)
    }

    /// Loads the full session (messages and product information) for
    /// direct entry into the conversation stage.
    pub async fn select(&self, session_id: &str) -> Result<Session> {
        self.gateway.fetch_chat(session_id).await
    }

    /// Asks the store to derive a name from the session's first exchange.
    pub async fn generate_name(&self, session_id: &str) -> Result<String> {
        self.gateway.generate_chat_name(session_id).await
    }
}
