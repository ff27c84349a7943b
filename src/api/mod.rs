pub mod http;

#[cfg(test)]
pub(crate) mod fake;

use async_trait::async_trait;

use crate::models::{BotType, ChatMessage, Document, InlineDocument, MessageSource};

pub use http::HttpBackend;

/// An answer from the chat endpoint, with whatever grounded it.
#[derive(Debug, Clone, Default)]
pub struct ChatReply {
    pub response: String,
    pub sources: Vec<MessageSource>,
}

/// Result of processing a document into searchable chunks.
#[derive(Debug, Clone)]
pub struct ProcessedDocument {
    pub document: Document,
    pub chunks_created: u32,
}

/// The backend surface this crate orchestrates against.
///
/// One method per endpoint. `HttpBackend` is the real implementation; tests
/// drive the orchestration layer through an in-memory fake.
#[async_trait]
pub trait Backend: Send + Sync + 'static {
    async fn list_documents(&self) -> Result<Vec<Document>, ApiError>;

    async fn upload_document(&self, file_name: &str, bytes: Vec<u8>) -> Result<Document, ApiError>;

    async fn delete_document(&self, id: &str) -> Result<(), ApiError>;

    async fn process_document(&self, id: &str) -> Result<ProcessedDocument, ApiError>;

    async fn create_conversation(
        &self,
        bot_type: BotType,
        document_id: Option<&str>,
        title: Option<&str>,
    ) -> Result<String, ApiError>;

    async fn conversation_messages(&self, id: &str) -> Result<Vec<ChatMessage>, ApiError>;

    /// Persist one message. Callers treat this as fire-and-forget; the
    /// response body is ignored.
    async fn append_message(
        &self,
        conversation_id: &str,
        message: &ChatMessage,
    ) -> Result<(), ApiError>;

    async fn chat(&self, message: &str, document_id: Option<&str>) -> Result<ChatReply, ApiError>;

    async fn demo_chat(
        &self,
        message: &str,
        documents: &[InlineDocument],
    ) -> Result<ChatReply, ApiError>;
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },
    #[error("Parse error: {0}")]
    Parse(String),
}

impl ApiError {
    /// True when the request never produced a usable server answer (as
    /// opposed to the server answering with a rejection).
    pub fn is_transport(&self) -> bool {
        matches!(self, ApiError::Http(_) | ApiError::Parse(_))
    }

    /// The message to show for this failure. API rejections surface the
    /// server's own error string.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Api { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}
