use std::sync::Arc;

use async_trait::async_trait;

use crate::api::{ApiError, Backend, ProcessedDocument};
use crate::chat::{ChatSurface, ScopedRetrievalChat, TurnError};
use crate::models::{BotType, ChatMessage, Document};
use crate::processing::{ProcessError, ProcessingCoordinator};
use crate::registry::DocumentRegistry;

/// One persisted chat surface: the document registry, the processing
/// coordinator, and a scoped-retrieval chat wired together over a shared
/// backend.
///
/// The authenticated document workspace and the professional-assistant
/// personalization surface are the same machinery under different bot types.
pub struct DocumentWorkspace<B> {
    backend: Arc<B>,
    bot_type: BotType,
    registry: DocumentRegistry<B>,
    coordinator: ProcessingCoordinator<B>,
    chat: ScopedRetrievalChat<B>,
}

impl<B: Backend> DocumentWorkspace<B> {
    pub fn new(backend: Arc<B>, bot_type: BotType) -> Self {
        Self {
            registry: DocumentRegistry::new(backend.clone()),
            coordinator: ProcessingCoordinator::new(backend.clone()),
            chat: ScopedRetrievalChat::new(backend.clone(), bot_type),
            backend,
            bot_type,
        }
    }

    /// The "chat with your documents" workspace.
    pub fn documents(backend: Arc<B>) -> Self {
        Self::new(backend, BotType::Documents)
    }

    /// The personalization surface backing the assistant products.
    pub fn personalization(backend: Arc<B>) -> Self {
        Self::new(backend, BotType::CustomBot)
    }

    pub fn registry(&self) -> &DocumentRegistry<B> {
        &self.registry
    }

    pub fn coordinator(&self) -> &ProcessingCoordinator<B> {
        &self.coordinator
    }

    pub fn chat(&self) -> &ScopedRetrievalChat<B> {
        &self.chat
    }

    /// Initial load of the document list.
    pub async fn load(&self) -> Result<Vec<Document>, ApiError> {
        self.registry.refresh().await
    }

    /// Upload a file and insert the new document into the cache. The server
    /// does the storage; this only mirrors the result.
    pub async fn upload(&self, file_name: &str, bytes: Vec<u8>) -> Result<Document, ApiError> {
        let document = self.backend.upload_document(file_name, bytes).await?;
        self.registry.add(document.clone());
        Ok(document)
    }

    pub async fn process(&self, id: &str) -> Result<ProcessedDocument, ProcessError> {
        self.coordinator.process(&self.registry, id).await
    }

    pub async fn process_many(
        &self,
        ids: &[String],
    ) -> Vec<Result<ProcessedDocument, ProcessError>> {
        self.coordinator.process_many(&self.registry, ids).await
    }

    /// Delete a document. Deleting the active chat scope widens the scope
    /// back to all documents; the chat session stays usable.
    pub async fn delete(&self, id: &str) -> Result<(), ApiError> {
        self.registry.delete(id).await?;
        if self.chat.selected_document().as_deref() == Some(id) {
            self.chat.set_scope(None);
        }
        Ok(())
    }

    /// Scope subsequent turns to one document. Only `ready` documents are
    /// selectable; returns whether the selection took effect.
    pub fn select_document(&self, id: &str) -> bool {
        if !self.registry.is_ready(id) {
            return false;
        }
        self.chat.set_scope(Some(id.to_string()));
        true
    }

    pub fn clear_selection(&self) {
        self.chat.set_scope(None);
    }

    pub fn selected_document(&self) -> Option<String> {
        self.chat.selected_document()
    }

    /// Resume a past conversation: hydrate the transcript and reuse its id
    /// for subsequent turns. Failures are logged and leave the surface as it
    /// was.
    pub async fn resume(&self, conversation_id: &str) -> bool {
        let scope = self.chat.selected_document();
        match self
            .chat
            .session()
            .resume(self.bot_type, scope.as_deref(), conversation_id)
            .await
        {
            Some(messages) => {
                self.chat.replace_transcript(messages);
                true
            }
            None => false,
        }
    }
}

#[async_trait]
impl<B: Backend> ChatSurface for DocumentWorkspace<B> {
    fn transcript(&self) -> Vec<ChatMessage> {
        self.chat.transcript()
    }

    fn is_sending(&self) -> bool {
        self.chat.is_sending()
    }

    async fn submit_turn(&self, input: &str) -> Result<(), TurnError> {
        self.chat.submit(&self.registry, input).await
    }
}
