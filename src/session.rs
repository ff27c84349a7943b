use std::sync::{Arc, Mutex};

use crate::api::{ApiError, Backend};
use crate::models::{BotType, ChatMessage};

/// Conversation title from the user's first message, cut at 50 characters.
pub fn derive_title(first_message: &str) -> String {
    const MAX_CHARS: usize = 50;
    let trimmed = first_message.trim();
    if trimmed.is_empty() {
        return "New conversation".to_string();
    }
    match trimmed.char_indices().nth(MAX_CHARS) {
        Some((cut, _)) => format!("{}...", &trimmed[..cut]),
        None => trimmed.to_string(),
    }
}

#[derive(Default)]
struct SessionState {
    scope: Option<(BotType, Option<String>)>,
    conversation_id: Option<String>,
}

/// Lazily created, scope-keyed conversation identity.
///
/// A conversation does not exist until the first turn needs it; once created
/// its id is reused for the rest of the session. Changing the scope starts a
/// new conversation; a conversation's scope is fixed at creation.
///
/// Message persistence is best-effort and decoupled from display: `append`
/// returns immediately and failures are only logged.
pub struct ConversationSession<B> {
    backend: Arc<B>,
    state: Mutex<SessionState>,
}

impl<B: Backend> ConversationSession<B> {
    pub fn new(backend: Arc<B>) -> Self {
        Self {
            backend,
            state: Mutex::new(SessionState::default()),
        }
    }

    pub fn conversation_id(&self) -> Option<String> {
        self.state.lock().unwrap().conversation_id.clone()
    }

    /// Return the active conversation id for this scope, creating the
    /// conversation first if none exists yet.
    pub async fn ensure(
        &self,
        bot_type: BotType,
        document_id: Option<&str>,
        title: Option<&str>,
    ) -> Result<String, ApiError> {
        let scope = (bot_type, document_id.map(str::to_string));
        {
            let state = self.state.lock().unwrap();
            if state.scope.as_ref() == Some(&scope) {
                if let Some(id) = &state.conversation_id {
                    return Ok(id.clone());
                }
            }
        }

        let id = self
            .backend
            .create_conversation(bot_type, document_id, title)
            .await?;
        let mut state = self.state.lock().unwrap();
        state.scope = Some(scope);
        state.conversation_id = Some(id.clone());
        Ok(id)
    }

    /// Persist one message without blocking the caller. The visible
    /// transcript is already updated by the time this runs; a persistence
    /// failure must never take the message back.
    pub fn append(&self, conversation_id: &str, message: &ChatMessage) {
        let backend = self.backend.clone();
        let conversation_id = conversation_id.to_string();
        let message = message.clone();
        tokio::spawn(async move {
            if let Err(e) = backend.append_message(&conversation_id, &message).await {
                tracing::warn!(error = %e, conversation_id, "failed to persist chat message");
            }
        });
    }

    /// Load a past conversation's messages and adopt its id for subsequent
    /// turns. Returns `None` on any failure; hydration never interrupts the
    /// flow the user is in.
    pub async fn resume(
        &self,
        bot_type: BotType,
        document_id: Option<&str>,
        conversation_id: &str,
    ) -> Option<Vec<ChatMessage>> {
        match self.backend.conversation_messages(conversation_id).await {
            Ok(messages) => {
                let mut state = self.state.lock().unwrap();
                state.scope = Some((bot_type, document_id.map(str::to_string)));
                state.conversation_id = Some(conversation_id.to_string());
                Some(messages)
            }
            Err(e) => {
                tracing::warn!(error = %e, conversation_id, "failed to load conversation history");
                None
            }
        }
    }
}
