use serde::{Deserialize, Serialize};

/// Processing lifecycle of an uploaded document.
///
/// A document only ever moves forward: `pending → processing → {ready, error}`.
/// Retrying a failed document re-enters `processing`; nothing goes back to
/// `pending` short of deleting and re-uploading.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    Pending,
    Processing,
    Ready,
    Error,
}

impl DocumentStatus {
    /// Whether `next` is a legal forward transition from this status.
    pub fn can_advance_to(self, next: DocumentStatus) -> bool {
        matches!(
            (self, next),
            (DocumentStatus::Pending, DocumentStatus::Processing)
                | (DocumentStatus::Processing, DocumentStatus::Ready)
                | (DocumentStatus::Processing, DocumentStatus::Error)
                | (DocumentStatus::Error, DocumentStatus::Processing)
        )
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Document {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub size_bytes: u64,
    pub status: DocumentStatus,
    #[serde(default)]
    pub chunk_count: Option<u32>,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl Document {
    /// Only `ready` documents may be used as a chat scope.
    pub fn is_ready(&self) -> bool {
        self.status == DocumentStatus::Ready
    }
}

/// Which chat product a conversation belongs to.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BotType {
    Documents,
    CustomBot,
    Demo,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Conversation {
    pub id: String,
    pub bot_type: BotType,
    pub document_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// A `(document, excerpt)` pair identifying what grounded an answer.
/// Presentation-only; it carries no chunk identifier.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct MessageSource {
    pub document_name: String,
    #[serde(default)]
    pub preview: String,
}

/// One entry in a chat transcript.
///
/// `id` is `None` while the message only exists locally (displayed before the
/// server has acknowledged it); persisted messages come back with an id.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ChatMessage {
    #[serde(default)]
    pub id: Option<String>,
    pub role: Role,
    pub content: String,
    #[serde(default)]
    pub sources: Vec<MessageSource>,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            id: None,
            role: Role::User,
            content: content.into(),
            sources: Vec::new(),
        }
    }

    pub fn assistant(content: impl Into<String>, sources: Vec<MessageSource>) -> Self {
        Self {
            id: None,
            role: Role::Assistant,
            content: content.into(),
            sources,
        }
    }
}

/// Document payload sent inline with every guest-mode question.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct InlineDocument {
    pub name: String,
    pub content: String,
}

/// Human-readable file size, as shown next to each document.
pub fn format_file_size(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
