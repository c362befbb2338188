use super::client::{Completion, CompletionBackend, CompletionError, CompletionResult};
use super::transport::{HttpRequest, ReqwestTransport, Transport, TransportError};
use crate::config::Settings;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";

const API_KEY_HEADER: &str = "x-goog-api-key";

// Generative-language response types
#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    // Non-text parts (inline data, function calls) carry no `text`
    text: Option<String>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

/// Client for the `generateContent` endpoint.
pub struct GeminiClient {
    transport: Arc<dyn Transport>,
    base_url: String,
    model: String,
}

impl GeminiClient {
    pub fn new(
        transport: Arc<dyn Transport>,
        base_url: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            base_url: base_url.into(),
            model: model.into(),
        }
    }

    /// Build a client over a real HTTP transport.
    pub fn from_settings(settings: &Settings) -> Result<Self, TransportError> {
        let transport = ReqwestTransport::new(settings.request_timeout)?;
        Ok(Self::new(
            Arc::new(transport),
            settings.gemini_base_url.clone(),
            settings.gemini_model.clone(),
        ))
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }

    /// Send one prompt and normalize the answer.
    pub async fn generate(&self, prompt: &str, credential: &str) -> CompletionResult {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(CompletionError::EmptyPrompt);
        }
        let credential = credential.trim();
        if credential.is_empty() {
            return Err(CompletionError::MissingCredential);
        }

        let request = HttpRequest {
            url: self.endpoint(),
            headers: vec![(API_KEY_HEADER, credential.to_string())],
            body: json!({
                "contents": [
                    { "role": "user", "parts": [ { "text": prompt } ] }
                ]
            }),
        };

        tracing::debug!(model = %self.model, "dispatching completion request");
        let response = self.transport.post_json(request).await.map_err(|err| {
            tracing::warn!(model = %self.model, error = %err, "completion transport failed");
            CompletionError::from(err)
        })?;

        if !response.status.is_success() {
            let err = service_error(response.status, &response.body);
            tracing::warn!(model = %self.model, status = %response.status, "completion rejected by service");
            return Err(err);
        }

        parse_success_body(&response.body)
    }
}

#[async_trait]
impl CompletionBackend for GeminiClient {
    async fn complete(&self, prompt: &str, credential: &str) -> CompletionResult {
        self.generate(prompt, credential).await
    }
}

/// Concatenate the first candidate's text parts, in order, without separators.
fn parse_success_body(body: &str) -> CompletionResult {
    let parsed = match serde_json::from_str::<GenerateResponse>(body) {
        Ok(parsed) => parsed,
        Err(err) => {
            tracing::warn!(error = %err, "unparsable completion body");
            return Err(CompletionError::EmptyResponse);
        }
    };

    let content: String = parsed
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|part| part.text)
                .collect()
        })
        .unwrap_or_default();

    if content.trim().is_empty() {
        return Err(CompletionError::EmptyResponse);
    }
    Ok(Completion { content })
}

fn service_error(status: StatusCode, body: &str) -> CompletionError {
    if let Ok(envelope) = serde_json::from_str::<ErrorEnvelope>(body)
        && let Some(message) = envelope.error.message
        && !message.trim().is_empty()
    {
        return CompletionError::Service(message);
    }

    let reason = status.canonical_reason().unwrap_or("Unknown Status");
    CompletionError::Service(format!("{} {}", status.as_u16(), reason))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::HttpResponse;
    use std::sync::Mutex;

    struct RecordingTransport {
        reply: Result<HttpResponse, TransportError>,
        calls: Mutex<Vec<HttpRequest>>,
    }

    impl RecordingTransport {
        fn replying(status: StatusCode, body: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Ok(HttpResponse {
                    status,
                    body: body.to_string(),
                }),
                calls: Mutex::new(Vec::new()),
            })
        }

        fn failing(cause: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Err(TransportError::new(cause)),
                calls: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> Vec<HttpRequest> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Transport for RecordingTransport {
        async fn post_json(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
            self.calls.lock().unwrap().push(request);
            self.reply.clone()
        }
    }

    fn client(transport: Arc<RecordingTransport>) -> GeminiClient {
        GeminiClient::new(transport, "https://example.test/v1beta/", "gemini-test")
    }

    #[tokio::test]
    async fn concatenates_segments_without_separator() {
        let transport = RecordingTransport::replying(
            StatusCode::OK,
            r#"{"candidates":[{"content":{"parts":[{"text":"Hello! "},{"text":"How can I help?"}]}}]}"#,
        );
        let result = client(transport).generate("hi", "key").await;
        assert_eq!(result.unwrap().content, "Hello! How can I help?");
    }

    #[tokio::test]
    async fn only_the_first_candidate_is_used() {
        let transport = RecordingTransport::replying(
            StatusCode::OK,
            r#"{"candidates":[{"content":{"parts":[{"text":"first"}]}},{"content":{"parts":[{"text":"second"}]}}]}"#,
        );
        let result = client(transport).generate("hi", "key").await;
        assert_eq!(result.unwrap().content, "first");
    }

    #[tokio::test]
    async fn request_carries_trimmed_prompt_and_header_key() {
        let transport = RecordingTransport::replying(
            StatusCode::OK,
            r#"{"candidates":[{"content":{"parts":[{"text":"ok"}]}}]}"#,
        );
        client(transport.clone())
            .generate("  what is rust?  ", " secret ")
            .await
            .unwrap();

        let calls = transport.calls();
        assert_eq!(calls.len(), 1);
        let request = &calls[0];
        assert_eq!(
            request.url,
            "https://example.test/v1beta/models/gemini-test:generateContent"
        );
        assert!(!request.url.contains("secret"));
        assert_eq!(
            request.headers,
            vec![(API_KEY_HEADER, "secret".to_string())]
        );
        assert_eq!(
            request.body["contents"][0]["parts"][0]["text"],
            "what is rust?"
        );
        assert_eq!(request.body["contents"][0]["role"], "user");
    }

    #[tokio::test]
    async fn zero_candidates_is_empty_response() {
        let transport = RecordingTransport::replying(StatusCode::OK, r#"{"candidates":[]}"#);
        let result = client(transport).generate("hi", "key").await;
        assert_eq!(result, Err(CompletionError::EmptyResponse));
    }

    #[tokio::test]
    async fn blocked_prompt_without_candidates_is_empty_response() {
        let transport = RecordingTransport::replying(
            StatusCode::OK,
            r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#,
        );
        let result = client(transport).generate("hi", "key").await;
        assert_eq!(result, Err(CompletionError::EmptyResponse));
    }

    #[tokio::test]
    async fn empty_text_parts_are_empty_response() {
        let transport = RecordingTransport::replying(
            StatusCode::OK,
            r#"{"candidates":[{"content":{"parts":[{"text":""},{"text":""}]}}]}"#,
        );
        let result = client(transport).generate("hi", "key").await;
        assert_eq!(result, Err(CompletionError::EmptyResponse));
    }

    #[tokio::test]
    async fn whitespace_only_text_is_empty_response() {
        let transport = RecordingTransport::replying(
            StatusCode::OK,
            r#"{"candidates":[{"content":{"parts":[{"text":"  \n "},{"text":"\t"}]}}]}"#,
        );
        let result = client(transport).generate("hi", "key").await;
        assert_eq!(result, Err(CompletionError::EmptyResponse));
    }

    #[tokio::test]
    async fn empty_prompt_never_reaches_transport() {
        let transport = RecordingTransport::replying(StatusCode::OK, "{}");
        let result = client(transport.clone()).generate("   \n", "key").await;
        assert_eq!(result, Err(CompletionError::EmptyPrompt));
        assert!(transport.calls().is_empty());
    }

    #[tokio::test]
    async fn missing_credential_never_reaches_transport() {
        let transport = RecordingTransport::replying(StatusCode::OK, "{}");
        let c = client(transport.clone());
        assert_eq!(
            c.generate("hi", "").await,
            Err(CompletionError::MissingCredential)
        );
        assert_eq!(
            c.generate("hi", "   ").await,
            Err(CompletionError::MissingCredential)
        );
        assert!(transport.calls().is_empty());
    }

    #[tokio::test]
    async fn structured_service_error_message_is_surfaced() {
        let transport = RecordingTransport::replying(
            StatusCode::BAD_REQUEST,
            r#"{"error": {"code": 400, "message": "Invalid API key", "status": "INVALID_ARGUMENT"}}"#,
        );
        let result = client(transport).generate("hi", "key").await;
        assert_eq!(
            result,
            Err(CompletionError::Service("Invalid API key".to_string()))
        );
    }

    #[tokio::test]
    async fn unparsable_error_body_falls_back_to_status_line() {
        let transport = RecordingTransport::replying(
            StatusCode::INTERNAL_SERVER_ERROR,
            "<html>upstream exploded</html>",
        );
        let result = client(transport).generate("hi", "key").await;
        assert_eq!(
            result,
            Err(CompletionError::Service(
                "500 Internal Server Error".to_string()
            ))
        );
    }

    #[tokio::test]
    async fn blank_error_message_falls_back_to_status_line() {
        let transport = RecordingTransport::replying(
            StatusCode::FORBIDDEN,
            r#"{"error": {"message": ""}}"#,
        );
        let result = client(transport).generate("hi", "key").await;
        assert_eq!(
            result,
            Err(CompletionError::Service("403 Forbidden".to_string()))
        );
    }

    #[tokio::test]
    async fn transport_failure_carries_cause() {
        let transport = RecordingTransport::failing("connection refused");
        let result = client(transport).generate("hi", "key").await;
        assert_eq!(
            result,
            Err(CompletionError::Transport("connection refused".to_string()))
        );
    }
}
