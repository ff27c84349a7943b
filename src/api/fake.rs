//! Programmable in-memory backend for exercising the orchestration layer.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Notify;

use super::{ApiError, Backend, ChatReply, ProcessedDocument};
use crate::models::{BotType, ChatMessage, Document, DocumentStatus, InlineDocument};

/// A scripted failure. Transport failures are modeled with `ApiError::Parse`
/// since `reqwest::Error` cannot be constructed outside reqwest.
#[derive(Debug, Clone)]
pub enum FakeFailure {
    Api(String),
    Transport,
}

impl FakeFailure {
    fn to_error(&self) -> ApiError {
        match self {
            FakeFailure::Api(message) => ApiError::Api {
                status: 400,
                message: message.clone(),
            },
            FakeFailure::Transport => ApiError::Parse("connection reset".to_string()),
        }
    }
}

#[derive(Default)]
pub struct FakeBackend {
    // list_documents
    pub documents: Mutex<Vec<Document>>,
    pub list_failure: Mutex<Option<FakeFailure>>,
    pub list_calls: AtomicUsize,

    // upload_document
    pub upload_response: Mutex<Option<Result<Document, FakeFailure>>>,

    // delete_document
    pub delete_failure: Mutex<Option<FakeFailure>>,
    pub delete_calls: Mutex<Vec<String>>,

    // process_document, keyed by document id
    pub process_responses: Mutex<HashMap<String, Result<(Document, u32), FakeFailure>>>,
    pub process_calls: Mutex<Vec<String>>,
    pub process_gate: Mutex<Option<Arc<Notify>>>,

    // create_conversation
    pub conversation_failure: Mutex<Option<FakeFailure>>,
    pub created_conversations: Mutex<Vec<(BotType, Option<String>, Option<String>)>>,

    // conversation_messages
    pub stored_messages: Mutex<HashMap<String, Vec<ChatMessage>>>,
    pub load_failure: Mutex<Option<FakeFailure>>,

    // append_message
    pub append_failure: Mutex<Option<FakeFailure>>,
    pub appended: Mutex<Vec<(String, ChatMessage)>>,

    // chat / demo_chat
    pub chat_reply: Mutex<ChatReply>,
    pub chat_failure: Mutex<Option<FakeFailure>>,
    pub chat_calls: Mutex<Vec<(String, Option<String>)>>,
    pub chat_gate: Mutex<Option<Arc<Notify>>>,
    pub demo_failure: Mutex<Option<FakeFailure>>,
    pub demo_calls: Mutex<Vec<(String, Vec<InlineDocument>)>>,
}

impl FakeBackend {
    pub fn new() -> Arc<Self> {
        let fake = Self {
            chat_reply: Mutex::new(ChatReply {
                response: "ok".to_string(),
                sources: Vec::new(),
            }),
            ..Self::default()
        };
        Arc::new(fake)
    }

    pub fn document(id: &str, name: &str, status: DocumentStatus) -> Document {
        Document {
            id: id.to_string(),
            name: name.to_string(),
            size_bytes: 1024,
            status,
            chunk_count: None,
            error_message: None,
            created_at: None,
        }
    }

    pub fn seed_documents(&self, docs: Vec<Document>) {
        *self.documents.lock().unwrap() = docs;
    }

    pub fn set_chat_reply(&self, reply: ChatReply) {
        *self.chat_reply.lock().unwrap() = reply;
    }

    pub fn set_process_success(&self, id: &str, chunks: u32) {
        let mut document = Self::document(id, id, DocumentStatus::Ready);
        document.chunk_count = Some(chunks);
        self.process_responses
            .lock()
            .unwrap()
            .insert(id.to_string(), Ok((document, chunks)));
    }

    pub fn set_process_failure(&self, id: &str, failure: FakeFailure) {
        self.process_responses
            .lock()
            .unwrap()
            .insert(id.to_string(), Err(failure));
    }

    /// Make the next chat call block until the returned handle is notified.
    pub fn gate_chat(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.chat_gate.lock().unwrap() = Some(gate.clone());
        gate
    }
}

#[async_trait]
impl Backend for FakeBackend {
    async fn list_documents(&self) -> Result<Vec<Document>, ApiError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(failure) = self.list_failure.lock().unwrap().as_ref() {
            return Err(failure.to_error());
        }
        Ok(self.documents.lock().unwrap().clone())
    }

    async fn upload_document(&self, file_name: &str, _bytes: Vec<u8>) -> Result<Document, ApiError> {
        match self.upload_response.lock().unwrap().take() {
            Some(Ok(document)) => Ok(document),
            Some(Err(failure)) => Err(failure.to_error()),
            None => Ok(Self::document(
                &format!("uploaded-{file_name}"),
                file_name,
                DocumentStatus::Pending,
            )),
        }
    }

    async fn delete_document(&self, id: &str) -> Result<(), ApiError> {
        self.delete_calls.lock().unwrap().push(id.to_string());
        if let Some(failure) = self.delete_failure.lock().unwrap().as_ref() {
            return Err(failure.to_error());
        }
        Ok(())
    }

    async fn process_document(&self, id: &str) -> Result<ProcessedDocument, ApiError> {
        self.process_calls.lock().unwrap().push(id.to_string());
        let gate = self.process_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        let response = self.process_responses.lock().unwrap().remove(id);
        match response {
            Some(Ok((document, chunks_created))) => Ok(ProcessedDocument {
                document,
                chunks_created,
            }),
            Some(Err(failure)) => Err(failure.to_error()),
            None => Err(ApiError::Api {
                status: 404,
                message: format!("no scripted process response for {id}"),
            }),
        }
    }

    async fn create_conversation(
        &self,
        bot_type: BotType,
        document_id: Option<&str>,
        title: Option<&str>,
    ) -> Result<String, ApiError> {
        if let Some(failure) = self.conversation_failure.lock().unwrap().as_ref() {
            return Err(failure.to_error());
        }
        let mut created = self.created_conversations.lock().unwrap();
        created.push((
            bot_type,
            document_id.map(str::to_string),
            title.map(str::to_string),
        ));
        Ok(format!("conv-{}", created.len()))
    }

    async fn conversation_messages(&self, id: &str) -> Result<Vec<ChatMessage>, ApiError> {
        if let Some(failure) = self.load_failure.lock().unwrap().as_ref() {
            return Err(failure.to_error());
        }
        Ok(self
            .stored_messages
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .unwrap_or_default())
    }

    async fn append_message(
        &self,
        conversation_id: &str,
        message: &ChatMessage,
    ) -> Result<(), ApiError> {
        if let Some(failure) = self.append_failure.lock().unwrap().as_ref() {
            return Err(failure.to_error());
        }
        self.appended
            .lock()
            .unwrap()
            .push((conversation_id.to_string(), message.clone()));
        Ok(())
    }

    async fn chat(&self, message: &str, document_id: Option<&str>) -> Result<ChatReply, ApiError> {
        self.chat_calls
            .lock()
            .unwrap()
            .push((message.to_string(), document_id.map(str::to_string)));
        let gate = self.chat_gate.lock().unwrap().take();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        if let Some(failure) = self.chat_failure.lock().unwrap().as_ref() {
            return Err(failure.to_error());
        }
        Ok(self.chat_reply.lock().unwrap().clone())
    }

    async fn demo_chat(
        &self,
        message: &str,
        documents: &[InlineDocument],
    ) -> Result<ChatReply, ApiError> {
        self.demo_calls
            .lock()
            .unwrap()
            .push((message.to_string(), documents.to_vec()));
        if let Some(failure) = self.demo_failure.lock().unwrap().as_ref() {
            return Err(failure.to_error());
        }
        Ok(self.chat_reply.lock().unwrap().clone())
    }
}
