//! Client-side orchestration for document-grounded chat: upload documents,
//! drive them to a searchable state, and hold retrieval-grounded
//! conversations scoped to one or all of them. The backend is consumed
//! through the [`api::Backend`] trait; [`api::HttpBackend`] talks to the
//! real REST API.

pub mod api;
pub mod chat;
pub mod config;
pub mod guest;
pub mod models;
pub mod processing;
pub mod registry;
pub mod session;
pub mod workspace;

pub use api::{ApiError, Backend, ChatReply, HttpBackend, ProcessedDocument};
pub use chat::{ChatSurface, ScopedRetrievalChat, TurnError};
pub use config::ApiConfig;
pub use guest::{GuestDocument, GuestUpload, InlineContentChat, UploadError, UploadReport};
pub use models::{
    BotType, ChatMessage, Conversation, Document, DocumentStatus, InlineDocument, MessageSource,
    Role,
};
pub use processing::{ProcessError, ProcessingCoordinator};
pub use registry::{DocumentPatch, DocumentRegistry};
pub use session::ConversationSession;
pub use workspace::DocumentWorkspace;
