use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::api::Backend;
use crate::chat::{ChatSurface, TurnError, TRANSPORT_FAILURE_MESSAGE};
use crate::models::{ChatMessage, InlineDocument};

/// Maximum accepted file size in guest mode.
pub const MAX_FILE_BYTES: u64 = 5 * 1024 * 1024;

/// Starter questions offered on an empty guest transcript.
pub fn suggested_prompts() -> [&'static str; 2] {
    [
        "What is this document about?",
        "Summarize the key points",
    ]
}

/// A file handed to guest mode, before validation.
#[derive(Debug, Clone)]
pub struct GuestUpload {
    pub name: String,
    /// Declared media type, when the caller knows one.
    pub mime: Option<String>,
    pub bytes: Vec<u8>,
}

/// A document held entirely in memory for the lifetime of the surface.
#[derive(Debug, Clone)]
pub struct GuestDocument {
    pub id: String,
    pub name: String,
    pub content: String,
    pub size_bytes: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UploadError {
    #[error("Invalid file type: {name}. Please upload TXT, MD, or PDF files.")]
    InvalidType { name: String },
    #[error("File too large: {name}. Maximum size is 5MB.")]
    TooLarge { name: String },
    // PDF passes the type gate but is not handled yet; the message is a
    // deliberate user-visible capability gap.
    #[error("PDF support coming soon. Please upload TXT or MD files for now.")]
    PdfNotSupported { name: String },
    #[error("Failed to read file: {name}")]
    Unreadable { name: String },
    #[error("File is empty: {name}")]
    Empty { name: String },
}

/// Outcome of one upload batch. Invalid files are skipped with an error;
/// valid files in the same batch still land.
#[derive(Debug, Default)]
pub struct UploadReport {
    pub added: Vec<GuestDocument>,
    pub errors: Vec<UploadError>,
}

fn is_pdf(name_lower: &str, mime: Option<&str>) -> bool {
    mime == Some("application/pdf") || name_lower.ends_with(".pdf")
}

fn validate(upload: GuestUpload) -> Result<GuestDocument, UploadError> {
    let name = upload.name;
    let name_lower = name.to_lowercase();
    let mime = upload.mime.as_deref();

    let valid_mime = matches!(
        mime,
        Some("text/plain") | Some("text/markdown") | Some("application/pdf")
    );
    let valid_extension = [".txt", ".md", ".pdf"]
        .iter()
        .any(|ext| name_lower.ends_with(ext));
    if !valid_mime && !valid_extension {
        return Err(UploadError::InvalidType { name });
    }

    if upload.bytes.len() as u64 > MAX_FILE_BYTES {
        return Err(UploadError::TooLarge { name });
    }

    if is_pdf(&name_lower, mime) {
        return Err(UploadError::PdfNotSupported { name });
    }

    let content = match String::from_utf8(upload.bytes) {
        Ok(content) => content,
        Err(_) => return Err(UploadError::Unreadable { name }),
    };
    if content.trim().is_empty() {
        return Err(UploadError::Empty { name });
    }

    let size_bytes = content.len() as u64;
    Ok(GuestDocument {
        id: uuid::Uuid::new_v4().to_string(),
        name,
        content,
        size_bytes,
    })
}

/// The zero-persistence chat variant.
///
/// Nothing is stored server-side: every turn carries the full text of every
/// uploaded document, and the transcript dies with this value. This cost
/// model is deliberately different from the scoped-retrieval surface and the
/// two share nothing beyond the turn contract.
pub struct InlineContentChat<B> {
    backend: Arc<B>,
    documents: Mutex<Vec<GuestDocument>>,
    transcript: Mutex<Vec<ChatMessage>>,
    sending: AtomicBool,
}

impl<B: Backend> InlineContentChat<B> {
    pub fn new(backend: Arc<B>) -> Self {
        Self {
            backend,
            documents: Mutex::new(Vec::new()),
            transcript: Mutex::new(Vec::new()),
            sending: AtomicBool::new(false),
        }
    }

    pub fn documents(&self) -> Vec<GuestDocument> {
        self.documents.lock().unwrap().clone()
    }

    /// Validate and add a batch of files. Failures are per-file.
    pub fn add_files(&self, uploads: Vec<GuestUpload>) -> UploadReport {
        let mut report = UploadReport::default();
        for upload in uploads {
            match validate(upload) {
                Ok(document) => report.added.push(document),
                Err(e) => report.errors.push(e),
            }
        }
        self.documents
            .lock()
            .unwrap()
            .extend(report.added.iter().cloned());
        report
    }

    pub fn remove_document(&self, id: &str) {
        self.documents.lock().unwrap().retain(|d| d.id != id);
    }
}

#[async_trait]
impl<B: Backend> ChatSurface for InlineContentChat<B> {
    fn transcript(&self) -> Vec<ChatMessage> {
        self.transcript.lock().unwrap().clone()
    }

    fn is_sending(&self) -> bool {
        self.sending.load(Ordering::SeqCst)
    }

    async fn submit_turn(&self, input: &str) -> Result<(), TurnError> {
        let message = input.trim().to_string();
        if message.is_empty() {
            return Err(TurnError::EmptyInput);
        }
        let payload: Vec<InlineDocument> = self
            .documents
            .lock()
            .unwrap()
            .iter()
            .map(|d| InlineDocument {
                name: d.name.clone(),
                content: d.content.clone(),
            })
            .collect();
        if payload.is_empty() {
            return Err(TurnError::NoDocuments);
        }
        if self.sending.swap(true, Ordering::SeqCst) {
            return Err(TurnError::TurnInFlight);
        }

        self.transcript
            .lock()
            .unwrap()
            .push(ChatMessage::user(&message));

        let assistant = match self.backend.demo_chat(&message, &payload).await {
            Ok(reply) => ChatMessage::assistant(reply.response, reply.sources),
            Err(e) if e.is_transport() => {
                ChatMessage::assistant(TRANSPORT_FAILURE_MESSAGE, Vec::new())
            }
            Err(e) => ChatMessage::assistant(format!("Error: {}", e.user_message()), Vec::new()),
        };
        self.transcript.lock().unwrap().push(assistant);

        self.sending.store(false, Ordering::SeqCst);
        Ok(())
    }
}
