//! Conversation engine with optimistic sends.
//!
//! Keeps one message log per session, keyed by session id. Every mutation
//! replaces the whole sequence behind an `Arc` (copy-on-write), so a
//! snapshot handed to a reader is never torn and each append, rollback or
//! positional replace is a single atomic step relative to the observable
//! sequence. Responses may race; half-applied state is never visible.
//!
//! There is no cancellation: a response that lands after its session's log
//! was closed, or after its optimistic entry was cleared, is discarded.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;
use visor_core::error::{Result, VisorError};
use visor_core::gateway::ConversationGateway;
use visor_core::outcome::MutationOutcome;
use visor_core::session::{Message, Sender, Session};

/// Per-session message state.
struct SessionLog {
    /// The observable sequence. Replaced wholesale, never edited in place.
    messages: Arc<Vec<Message>>,
    /// Ids of optimistic user messages still awaiting confirmation.
    pending: HashSet<String>,
}

impl SessionLog {
    fn new(messages: Vec<Message>) -> Self {
        Self {
            messages: Arc::new(messages),
            pending: HashSet::new(),
        }
    }
}

/// Manages ordered message sequences with optimistic send and rollback.
pub struct ChatEngine {
    conversation: Arc<dyn ConversationGateway>,
    logs: RwLock<HashMap<String, SessionLog>>,
}

impl ChatEngine {
    pub fn new(conversation: Arc<dyn ConversationGateway>) -> Self {
        Self {
            conversation,
            logs: RwLock::new(HashMap::new()),
        }
    }

    /// Opens an empty log for a freshly created session. Existing logs are
    /// left untouched.
    pub async fn open(&self, session_id: &str) {
        let mut logs = self.logs.write().await;
        logs.entry(session_id.to_string())
            .or_insert_with(|| SessionLog::new(Vec::new()));
    }

    /// Loads a persisted session's messages, replacing any prior log for
    /// that id.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when the session has no id yet.
    pub async fn load(&self, session: &Session) -> Result<()> {
        let id = session
            .id
            .clone()
            .ok_or_else(|| VisorError::not_found("session id", "<draft>"))?;
        let mut logs = self.logs.write().await;
        logs.insert(id, SessionLog::new(session.messages.clone()));
        Ok(())
    }

    /// Drops a session's log. In-flight responses for it will be discarded.
    pub async fn close(&self, session_id: &str) {
        let mut logs = self.logs.write().await;
        logs.remove(session_id);
    }

    /// Snapshot of a session's message sequence.
    pub async fn messages(&self, session_id: &str) -> Option<Arc<Vec<Message>>> {
        let logs = self.logs.read().await;
        logs.get(session_id).map(|log| log.messages.clone())
    }

    /// Sends a user message optimistically.
    ///
    /// The user message is appended (and visible) before the remote call is
    /// issued. On success the bot reply is appended and the user message
    /// keeps its optimistic id. On failure exactly that user message is
    /// removed again and the failure is reported as `RolledBack`; no other
    /// message is touched.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when no log is open for the session.
    pub async fn send(&self, session_id: &str, text: &str) -> Result<MutationOutcome<Message>> {
        let text = text.trim();
        let user = Message::new(Sender::User, text, Some(session_id.to_string()));
        let user_id = user.id.clone();

        {
            let mut logs = self.logs.write().await;
            let log = logs
                .get_mut(session_id)
                .ok_or_else(|| VisorError::not_found("session log", session_id))?;
            let mut next = log.messages.as_ref().clone();
            next.push(user);
            log.messages = Arc::new(next);
            log.pending.insert(user_id.clone());
        }

        match self.conversation.send_message(session_id, text).await {
            Ok(reply) => {
                let mut logs = self.logs.write().await;
                let Some(log) = logs.get_mut(session_id) else {
                    tracing::warn!(session_id, "discarding reply for a closed session");
                    return Ok(MutationOutcome::RolledBack(VisorError::not_found(
                        "session log",
                        session_id,
                    )));
                };
                if !log.pending.remove(&user_id) {
                    tracing::warn!(session_id, "discarding reply for a cleared send");
                    return Ok(MutationOutcome::RolledBack(VisorError::not_found(
                        "pending message",
                        user_id,
                    )));
                }
                let bot = Message::new(Sender::Bot, reply, Some(session_id.to_string()));
                let mut next = log.messages.as_ref().clone();
                next.push(bot.clone());
                log.messages = Arc::new(next);
                Ok(MutationOutcome::Applied(bot))
            }
            Err(err) => {
                let mut logs = self.logs.write().await;
                if let Some(log) = logs.get_mut(session_id) {
                    if log.pending.remove(&user_id) {
                        let mut next = log.messages.as_ref().clone();
                        next.retain(|message| message.id != user_id);
                        log.messages = Arc::new(next);
                    }
                }
                Ok(MutationOutcome::RolledBack(err))
            }
        }
    }

    /// Replays a user message and replaces the bot reply at `index`.
    ///
    /// The target must be a bot message whose directly preceding message is
    /// the user message being replayed; anything else is a local
    /// precondition error, raised before any network traffic. On success
    /// only index `index` changes; on failure nothing does. Repeated
    /// resends only ever affect the one targeted slot.
    pub async fn resend(
        &self,
        session_id: &str,
        index: usize,
        original_text: &str,
    ) -> Result<MutationOutcome<Message>> {
        {
            let logs = self.logs.read().await;
            let log = logs
                .get(session_id)
                .ok_or_else(|| VisorError::not_found("session log", session_id))?;
            validate_resend_target(&log.messages, index)?;
        }

        match self
            .conversation
            .resend_message(session_id, original_text)
            .await
        {
            Ok(reply) => {
                let mut logs = self.logs.write().await;
                let Some(log) = logs.get_mut(session_id) else {
                    tracing::warn!(session_id, "discarding resend reply for a closed session");
                    return Ok(MutationOutcome::RolledBack(VisorError::not_found(
                        "session log",
                        session_id,
                    )));
                };
                if validate_resend_target(&log.messages, index).is_err() {
                    // The sequence changed underneath the call; applying the
                    // replacement would corrupt an unrelated slot.
                    tracing::warn!(session_id, index, "discarding resend reply for a moved slot");
                    return Ok(MutationOutcome::RolledBack(
                        VisorError::InvalidResendTarget {
                            index,
                            reason: "target changed while the resend was in flight",
                        },
                    ));
                }
                let bot = Message::new(Sender::Bot, reply, Some(session_id.to_string()));
                let mut next = log.messages.as_ref().clone();
                next[index] = bot.clone();
                log.messages = Arc::new(next);
                Ok(MutationOutcome::Applied(bot))
            }
            Err(err) => Ok(MutationOutcome::RolledBack(err)),
        }
    }
}

fn validate_resend_target(messages: &[Message], index: usize) -> Result<()> {
    let target = messages
        .get(index)
        .ok_or(VisorError::InvalidResendTarget {
            index,
            reason: "index out of range",
        })?;
    if !target.is_bot() {
        return Err(VisorError::InvalidResendTarget {
            index,
            reason: "target is not a bot message",
        });
    }
    let preceding = index
        .checked_sub(1)
        .and_then(|i| messages.get(i))
        .ok_or(VisorError::InvalidResendTarget {
            index,
            reason: "no preceding message",
        })?;
    if !preceding.is_user() {
        return Err(VisorError::InvalidResendTarget {
            index,
            reason: "preceding message is not from the user",
        });
    }
    Ok(())
}
