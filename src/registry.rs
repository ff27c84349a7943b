use std::sync::{Arc, Mutex};

use crate::api::{ApiError, Backend};
use crate::models::{Document, DocumentStatus};

/// An optimistic local change to one document, applied after a mutating call
/// succeeds so the happy path skips a full refetch.
#[derive(Debug, Clone)]
pub struct DocumentPatch {
    pub status: DocumentStatus,
    pub chunk_count: Option<u32>,
    pub error_message: Option<String>,
}

impl DocumentPatch {
    pub fn processing() -> Self {
        Self {
            status: DocumentStatus::Processing,
            chunk_count: None,
            error_message: None,
        }
    }

    pub fn ready(chunk_count: u32) -> Self {
        Self {
            status: DocumentStatus::Ready,
            chunk_count: Some(chunk_count),
            error_message: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: DocumentStatus::Error,
            chunk_count: None,
            error_message: Some(message.into()),
        }
    }
}

/// In-memory mirror of the user's documents.
///
/// The backend stays the source of truth: optimistic patches cover the happy
/// path, and any ambiguous outcome is resolved by refetching the whole list.
pub struct DocumentRegistry<B> {
    backend: Arc<B>,
    documents: Mutex<Vec<Document>>,
}

impl<B: Backend> DocumentRegistry<B> {
    pub fn new(backend: Arc<B>) -> Self {
        Self {
            backend,
            documents: Mutex::new(Vec::new()),
        }
    }

    /// Full refresh: replaces the cache wholesale, no merging.
    pub async fn refresh(&self) -> Result<Vec<Document>, ApiError> {
        let documents = self.backend.list_documents().await?;
        *self.documents.lock().unwrap() = documents.clone();
        Ok(documents)
    }

    pub fn documents(&self) -> Vec<Document> {
        self.documents.lock().unwrap().clone()
    }

    pub fn ready_documents(&self) -> Vec<Document> {
        self.documents
            .lock()
            .unwrap()
            .iter()
            .filter(|d| d.is_ready())
            .cloned()
            .collect()
    }

    pub fn get(&self, id: &str) -> Option<Document> {
        self.documents
            .lock()
            .unwrap()
            .iter()
            .find(|d| d.id == id)
            .cloned()
    }

    pub fn is_ready(&self, id: &str) -> bool {
        self.get(id).map(|d| d.is_ready()).unwrap_or(false)
    }

    /// Cache insertion for a freshly uploaded document. Newest first, the
    /// same order the server lists them in.
    pub fn add(&self, document: Document) {
        self.documents.lock().unwrap().insert(0, document);
    }

    pub fn remove(&self, id: &str) {
        self.documents.lock().unwrap().retain(|d| d.id != id);
    }

    /// Apply an optimistic patch. Illegal lifecycle transitions are refused,
    /// returning `false` and leaving the document untouched.
    pub fn update_status(&self, id: &str, patch: DocumentPatch) -> bool {
        let mut documents = self.documents.lock().unwrap();
        let Some(document) = documents.iter_mut().find(|d| d.id == id) else {
            return false;
        };
        if !document.status.can_advance_to(patch.status) {
            tracing::debug!(
                id,
                from = ?document.status,
                to = ?patch.status,
                "refusing illegal status patch"
            );
            return false;
        }
        document.status = patch.status;
        if patch.chunk_count.is_some() {
            document.chunk_count = patch.chunk_count;
        }
        document.error_message = patch.error_message;
        true
    }

    /// Delete a document. On success the document leaves the cache; on any
    /// failure the outcome is ambiguous and the cache is resynchronized from
    /// the server before the error is returned.
    pub async fn delete(&self, id: &str) -> Result<(), ApiError> {
        match self.backend.delete_document(id).await {
            Ok(()) => {
                self.remove(id);
                Ok(())
            }
            Err(e) => {
                if let Err(refresh_err) = self.refresh().await {
                    tracing::warn!(error = %refresh_err, "resync after failed delete also failed");
                }
                Err(e)
            }
        }
    }
}
