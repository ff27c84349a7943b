use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::{ApiError, Backend, ChatReply, ProcessedDocument};
use crate::config::ApiConfig;
use crate::models::{BotType, ChatMessage, Document, InlineDocument, MessageSource};

/// Backend implementation over the REST API.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    config: ApiConfig,
}

impl HttpBackend {
    pub fn new(config: ApiConfig) -> Result<Self, ApiError> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url, path)
    }

    fn authorize(&self, req: RequestBuilder) -> RequestBuilder {
        match &self.config.auth_token {
            Some(token) => req.header("Authorization", format!("Bearer {}", token)),
            None => req,
        }
    }
}

/// Decode a response body, folding non-2xx statuses with unreadable bodies
/// into `ApiError::Api` so callers only deal with typed envelopes.
async fn read_json<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, ApiError> {
    let status = resp.status();
    let text = resp.text().await?;
    match serde_json::from_str::<T>(&text) {
        Ok(value) => Ok(value),
        Err(_) if !status.is_success() => Err(ApiError::Api {
            status: status.as_u16(),
            message: text,
        }),
        Err(e) => Err(ApiError::Parse(e.to_string())),
    }
}

fn rejection(status: StatusCode, error: Option<String>) -> ApiError {
    ApiError::Api {
        status: status.as_u16(),
        message: error.unwrap_or_else(|| "Request failed".to_string()),
    }
}

fn part_mime(file_name: &str) -> &'static str {
    let lower = file_name.to_lowercase();
    if lower.ends_with(".md") || lower.ends_with(".markdown") {
        "text/markdown"
    } else if lower.ends_with(".pdf") {
        "application/pdf"
    } else if lower.ends_with(".txt") {
        "text/plain"
    } else {
        "application/octet-stream"
    }
}

// ── Wire shapes ──

#[derive(Deserialize)]
struct ListDocumentsResponse {
    success: bool,
    #[serde(default)]
    documents: Vec<Document>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Deserialize)]
struct UploadDocumentResponse {
    success: bool,
    #[serde(default)]
    document: Option<Document>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Deserialize)]
struct DeleteDocumentResponse {
    success: bool,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Serialize)]
struct ProcessRequest<'a> {
    #[serde(rename = "documentId")]
    document_id: &'a str,
}

#[derive(Deserialize)]
struct ProcessResponse {
    success: bool,
    #[serde(default)]
    document: Option<Document>,
    #[serde(default)]
    chunks_created: Option<u32>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Serialize)]
struct CreateConversationRequest<'a> {
    bot_type: BotType,
    document_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    title: Option<&'a str>,
}

#[derive(Deserialize)]
struct ConversationIdEnvelope {
    success: bool,
    #[serde(default)]
    data: Option<ConversationIdData>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Deserialize)]
struct ConversationIdData {
    conversation: ConversationId,
}

#[derive(Deserialize)]
struct ConversationId {
    id: String,
}

#[derive(Deserialize)]
struct ConversationMessagesEnvelope {
    success: bool,
    #[serde(default)]
    data: Option<ConversationMessagesData>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Deserialize)]
struct ConversationMessagesData {
    conversation: ConversationMessages,
}

#[derive(Deserialize)]
struct ConversationMessages {
    #[serde(default)]
    messages: Vec<ChatMessage>,
}

#[derive(Serialize)]
struct AppendMessageRequest<'a> {
    role: crate::models::Role,
    content: &'a str,
    sources: &'a [MessageSource],
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    message: &'a str,
    #[serde(rename = "documentId", skip_serializing_if = "Option::is_none")]
    document_id: Option<&'a str>,
}

#[derive(Deserialize)]
struct ChatResponse {
    success: bool,
    #[serde(default)]
    response: Option<String>,
    #[serde(default)]
    sources: Vec<MessageSource>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Serialize)]
struct DemoChatRequest<'a> {
    message: &'a str,
    documents: &'a [InlineDocument],
}

#[derive(Deserialize)]
struct DemoChatEnvelope {
    success: bool,
    #[serde(default)]
    data: Option<DemoChatData>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Deserialize)]
struct DemoChatData {
    response: String,
    #[serde(default)]
    sources: Vec<MessageSource>,
}

// ── Endpoints ──

#[async_trait]
impl Backend for HttpBackend {
    async fn list_documents(&self) -> Result<Vec<Document>, ApiError> {
        let resp = self
            .authorize(self.client.get(self.url("/api/documents")))
            .send()
            .await?;
        let status = resp.status();
        let data: ListDocumentsResponse = read_json(resp).await?;
        if !data.success {
            return Err(rejection(status, data.error));
        }
        Ok(data.documents)
    }

    async fn upload_document(&self, file_name: &str, bytes: Vec<u8>) -> Result<Document, ApiError> {
        let part = Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str(part_mime(file_name))
            .map_err(|e| ApiError::Parse(e.to_string()))?;
        let form = Form::new().part("file", part);

        let resp = self
            .authorize(self.client.post(self.url("/api/documents")))
            .multipart(form)
            .send()
            .await?;
        let status = resp.status();
        let data: UploadDocumentResponse = read_json(resp).await?;
        if !data.success {
            return Err(rejection(status, data.error));
        }
        data.document
            .ok_or_else(|| ApiError::Parse("upload response missing document".to_string()))
    }

    async fn delete_document(&self, id: &str) -> Result<(), ApiError> {
        let resp = self
            .authorize(self.client.delete(self.url("/api/documents")))
            .query(&[("id", id)])
            .send()
            .await?;
        let status = resp.status();
        let data: DeleteDocumentResponse = read_json(resp).await?;
        if !data.success {
            return Err(rejection(status, data.error));
        }
        Ok(())
    }

    async fn process_document(&self, id: &str) -> Result<ProcessedDocument, ApiError> {
        let resp = self
            .authorize(self.client.post(self.url("/api/documents/process")))
            .json(&ProcessRequest { document_id: id })
            .send()
            .await?;
        let status = resp.status();
        let data: ProcessResponse = read_json(resp).await?;
        if !data.success {
            return Err(rejection(status, data.error));
        }
        let document = data
            .document
            .ok_or_else(|| ApiError::Parse("process response missing document".to_string()))?;
        Ok(ProcessedDocument {
            document,
            chunks_created: data.chunks_created.unwrap_or(0),
        })
    }

    async fn create_conversation(
        &self,
        bot_type: BotType,
        document_id: Option<&str>,
        title: Option<&str>,
    ) -> Result<String, ApiError> {
        let resp = self
            .authorize(self.client.post(self.url("/api/conversations")))
            .json(&CreateConversationRequest {
                bot_type,
                document_id,
                title,
            })
            .send()
            .await?;
        let status = resp.status();
        let data: ConversationIdEnvelope = read_json(resp).await?;
        if !data.success {
            return Err(rejection(status, data.error));
        }
        data.data
            .map(|d| d.conversation.id)
            .ok_or_else(|| ApiError::Parse("conversation response missing id".to_string()))
    }

    async fn conversation_messages(&self, id: &str) -> Result<Vec<ChatMessage>, ApiError> {
        let resp = self
            .authorize(
                self.client
                    .get(self.url(&format!("/api/conversations/{}", id))),
            )
            .send()
            .await?;
        let status = resp.status();
        let data: ConversationMessagesEnvelope = read_json(resp).await?;
        if !data.success {
            return Err(rejection(status, data.error));
        }
        Ok(data
            .data
            .map(|d| d.conversation.messages)
            .unwrap_or_default())
    }

    async fn append_message(
        &self,
        conversation_id: &str,
        message: &ChatMessage,
    ) -> Result<(), ApiError> {
        let resp = self
            .authorize(
                self.client
                    .post(self.url(&format!("/api/conversations/{}/messages", conversation_id))),
            )
            .json(&AppendMessageRequest {
                role: message.role,
                content: &message.content,
                sources: &message.sources,
            })
            .send()
            .await?;
        // The caller only needs to know the message landed.
        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(ApiError::Api {
                status: status.as_u16(),
                message: text,
            });
        }
        Ok(())
    }

    async fn chat(&self, message: &str, document_id: Option<&str>) -> Result<ChatReply, ApiError> {
        let resp = self
            .authorize(self.client.post(self.url("/api/chat")))
            .json(&ChatRequest {
                message,
                document_id,
            })
            .send()
            .await?;
        let status = resp.status();
        let data: ChatResponse = read_json(resp).await?;
        if !data.success {
            return Err(rejection(status, data.error));
        }
        Ok(ChatReply {
            response: data.response.unwrap_or_default(),
            sources: data.sources,
        })
    }

    async fn demo_chat(
        &self,
        message: &str,
        documents: &[InlineDocument],
    ) -> Result<ChatReply, ApiError> {
        let resp = self
            .client
            .post(self.url("/api/demo/document-chat"))
            .json(&DemoChatRequest { message, documents })
            .send()
            .await?;
        let status = resp.status();
        let data: DemoChatEnvelope = read_json(resp).await?;
        if !data.success {
            return Err(rejection(status, data.error));
        }
        let body = data
            .data
            .ok_or_else(|| ApiError::Parse("demo chat response missing data".to_string()))?;
        Ok(ChatReply {
            response: body.response,
            sources: body.sources,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_request_omits_unscoped_document() {
        let body = serde_json::to_value(ChatRequest {
            message: "hi",
            document_id: None,
        })
        .unwrap();
        assert_eq!(body, serde_json::json!({ "message": "hi" }));

        let body = serde_json::to_value(ChatRequest {
            message: "hi",
            document_id: Some("doc-1"),
        })
        .unwrap();
        assert_eq!(
            body,
            serde_json::json!({ "message": "hi", "documentId": "doc-1" })
        );
    }

    #[test]
    fn create_conversation_body_uses_snake_case() {
        let body = serde_json::to_value(CreateConversationRequest {
            bot_type: BotType::Documents,
            document_id: Some("doc-1"),
            title: None,
        })
        .unwrap();
        assert_eq!(
            body,
            serde_json::json!({ "bot_type": "documents", "document_id": "doc-1" })
        );
    }

    #[test]
    fn mime_from_extension() {
        assert_eq!(part_mime("notes.txt"), "text/plain");
        assert_eq!(part_mime("README.md"), "text/markdown");
        assert_eq!(part_mime("paper.PDF"), "application/pdf");
        assert_eq!(part_mime("blob.bin"), "application/octet-stream");
    }

    #[test]
    fn envelopes_decode_error_shape() {
        let data: ChatResponse =
            serde_json::from_str(r#"{"success":false,"error":"no documents"}"#).unwrap();
        assert!(!data.success);
        assert_eq!(data.error.as_deref(), Some("no documents"));
        assert!(data.response.is_none());
    }

    #[test]
    fn demo_envelope_decodes_nested_data() {
        let data: DemoChatEnvelope = serde_json::from_str(
            r#"{"success":true,"data":{"response":"hello","sources":[{"document_name":"a.txt","preview":"…"}]}}"#,
        )
        .unwrap();
        assert!(data.success);
        let body = data.data.unwrap();
        assert_eq!(body.response, "hello");
        assert_eq!(body.sources[0].document_name, "a.txt");
    }
}
