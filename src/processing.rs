use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use crate::api::{ApiError, Backend, ProcessedDocument};
use crate::models::DocumentStatus;
use crate::registry::{DocumentPatch, DocumentRegistry};

#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    #[error("Unknown document: {0}")]
    UnknownDocument(String),
    #[error("Document is not awaiting processing")]
    NotPending,
    #[error("Document is already being processed")]
    AlreadyProcessing,
    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Drives documents through the process transition.
///
/// Each in-flight document is tracked by its own id; processing several
/// documents at once is fine and their outcomes stay independent.
pub struct ProcessingCoordinator<B> {
    backend: Arc<B>,
    in_flight: Mutex<HashSet<String>>,
}

impl<B: Backend> ProcessingCoordinator<B> {
    pub fn new(backend: Arc<B>) -> Self {
        Self {
            backend,
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    /// Ids currently being processed.
    pub fn in_flight(&self) -> Vec<String> {
        self.in_flight.lock().unwrap().iter().cloned().collect()
    }

    pub fn is_processing(&self, id: &str) -> bool {
        self.in_flight.lock().unwrap().contains(id)
    }

    /// Process one document. Accepts documents in `pending` (first attempt)
    /// or `error` (retry); anything else is rejected up front.
    ///
    /// On success the registry is patched to `ready` with the chunk count.
    /// On failure the registry is patched to `error` and then resynchronized
    /// from the server, which stays authoritative after an ambiguous outcome.
    pub async fn process(
        &self,
        registry: &DocumentRegistry<B>,
        id: &str,
    ) -> Result<ProcessedDocument, ProcessError> {
        let document = registry
            .get(id)
            .ok_or_else(|| ProcessError::UnknownDocument(id.to_string()))?;
        match document.status {
            DocumentStatus::Pending | DocumentStatus::Error => {}
            DocumentStatus::Processing => return Err(ProcessError::AlreadyProcessing),
            DocumentStatus::Ready => return Err(ProcessError::NotPending),
        }
        if !self.in_flight.lock().unwrap().insert(id.to_string()) {
            return Err(ProcessError::AlreadyProcessing);
        }

        registry.update_status(id, DocumentPatch::processing());
        let result = self.backend.process_document(id).await;
        self.in_flight.lock().unwrap().remove(id);

        match result {
            Ok(processed) => {
                registry.update_status(id, DocumentPatch::ready(processed.chunks_created));
                Ok(processed)
            }
            Err(e) => {
                let message = if e.is_transport() {
                    "Failed to process document".to_string()
                } else {
                    e.user_message()
                };
                registry.update_status(id, DocumentPatch::error(message));
                // The optimistic patch is untrustworthy after a failure.
                if let Err(refresh_err) = registry.refresh().await {
                    tracing::warn!(error = %refresh_err, "resync after failed processing also failed");
                }
                Err(ProcessError::Api(e))
            }
        }
    }

    /// Process several documents concurrently, one outcome per input id.
    pub async fn process_many(
        &self,
        registry: &DocumentRegistry<B>,
        ids: &[String],
    ) -> Vec<Result<ProcessedDocument, ProcessError>> {
        futures::future::join_all(ids.iter().map(|id| self.process(registry, id))).await
    }
}
