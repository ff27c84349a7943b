use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::api::Backend;
use crate::models::{BotType, ChatMessage};
use crate::registry::DocumentRegistry;
use crate::session::{derive_title, ConversationSession};

/// Shown in place of an answer when the request never reached a usable
/// server response.
pub const TRANSPORT_FAILURE_MESSAGE: &str = "Failed to get response. Please try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TurnError {
    #[error("Message is empty")]
    EmptyInput,
    #[error("A turn is already in flight")]
    TurnInFlight,
    #[error("No documents uploaded")]
    NoDocuments,
}

/// The turn-submission contract both chat variants share.
///
/// A submitted turn either gets rejected up front (empty input, a turn
/// already in flight) or appends exactly one user message and exactly one
/// assistant message (real answer or synthetic error) and returns the
/// surface to idle. Nothing else is shared between the variants: their
/// payloads and cost models are deliberately different.
#[async_trait]
pub trait ChatSurface {
    fn transcript(&self) -> Vec<ChatMessage>;

    fn is_sending(&self) -> bool;

    async fn submit_turn(&self, input: &str) -> Result<(), TurnError>;
}

/// Chat over server-side retrieval, optionally scoped to one document.
///
/// The conversation is created lazily on the first turn and every message is
/// persisted best-effort; a missing conversation degrades to "answer shown,
/// not persisted", never to "answer blocked".
pub struct ScopedRetrievalChat<B> {
    backend: Arc<B>,
    session: ConversationSession<B>,
    bot_type: BotType,
    transcript: Mutex<Vec<ChatMessage>>,
    selected: Mutex<Option<String>>,
    sending: AtomicBool,
}

impl<B: Backend> ScopedRetrievalChat<B> {
    pub fn new(backend: Arc<B>, bot_type: BotType) -> Self {
        Self {
            session: ConversationSession::new(backend.clone()),
            backend,
            bot_type,
            transcript: Mutex::new(Vec::new()),
            selected: Mutex::new(None),
            sending: AtomicBool::new(false),
        }
    }

    pub fn transcript(&self) -> Vec<ChatMessage> {
        self.transcript.lock().unwrap().clone()
    }

    pub fn is_sending(&self) -> bool {
        self.sending.load(Ordering::SeqCst)
    }

    pub fn selected_document(&self) -> Option<String> {
        self.selected.lock().unwrap().clone()
    }

    /// Restrict subsequent turns to one document. Already-displayed messages
    /// are unaffected.
    pub fn set_scope(&self, document_id: Option<String>) {
        *self.selected.lock().unwrap() = document_id;
    }

    pub fn session(&self) -> &ConversationSession<B> {
        &self.session
    }

    /// Replace the visible transcript, used when resuming a past
    /// conversation.
    pub fn replace_transcript(&self, messages: Vec<ChatMessage>) {
        *self.transcript.lock().unwrap() = messages;
    }

    /// Run one chat turn against the registry's current view of the world.
    pub async fn submit(
        &self,
        registry: &DocumentRegistry<B>,
        input: &str,
    ) -> Result<(), TurnError> {
        let message = input.trim().to_string();
        if message.is_empty() {
            return Err(TurnError::EmptyInput);
        }
        if self.sending.swap(true, Ordering::SeqCst) {
            return Err(TurnError::TurnInFlight);
        }

        // A selected document that is gone (or no longer ready) silently
        // widens the scope back to all documents.
        let scope = {
            let mut selected = self.selected.lock().unwrap();
            if let Some(id) = selected.as_deref() {
                if !registry.is_ready(id) {
                    tracing::debug!(id, "selected document unavailable, scoping to all documents");
                    *selected = None;
                }
            }
            selected.clone()
        };

        // Conversation creation may fail without blocking the answer.
        let conversation_id = match self
            .session
            .ensure(self.bot_type, scope.as_deref(), Some(&derive_title(&message)))
            .await
        {
            Ok(id) => Some(id),
            Err(e) => {
                tracing::warn!(error = %e, "conversation unavailable, turn will not be persisted");
                None
            }
        };

        let user_message = ChatMessage::user(&message);
        self.transcript.lock().unwrap().push(user_message.clone());
        if let Some(id) = &conversation_id {
            self.session.append(id, &user_message);
        }

        let assistant = match self.backend.chat(&message, scope.as_deref()).await {
            Ok(reply) => ChatMessage::assistant(reply.response, reply.sources),
            Err(e) if e.is_transport() => {
                ChatMessage::assistant(TRANSPORT_FAILURE_MESSAGE, Vec::new())
            }
            Err(e) => ChatMessage::assistant(format!("Error: {}", e.user_message()), Vec::new()),
        };
        self.transcript.lock().unwrap().push(assistant.clone());
        if let Some(id) = &conversation_id {
            self.session.append(id, &assistant);
        }

        self.sending.store(false, Ordering::SeqCst);
        Ok(())
    }
}
