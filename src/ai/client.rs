use async_trait::async_trait;

use super::transport::TransportError;

// ============================================
// Error Types
// ============================================

/// Every expected way a completion exchange can fail.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CompletionError {
    #[error("prompt is empty")]
    EmptyPrompt,

    #[error("no API key configured")]
    MissingCredential,

    #[error("network error: {0}")]
    Transport(String),

    #[error("{0}")]
    Service(String),

    #[error("the model returned an empty response")]
    EmptyResponse,
}

impl From<TransportError> for CompletionError {
    fn from(err: TransportError) -> Self {
        CompletionError::Transport(err.to_string())
    }
}

/// Normalized text produced by a successful exchange.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Completion {
    pub content: String,
}

pub type CompletionResult = Result<Completion, CompletionError>;

/// A backend able to answer a single prompt.
///
/// Implementations validate their inputs before touching the network and return
/// every expected failure as a `CompletionError`.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    async fn complete(&self, prompt: &str, credential: &str) -> CompletionResult;
}
