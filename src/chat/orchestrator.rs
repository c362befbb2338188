use super::models::{ModelChoice, ModelInfo, available_models};
use super::state::Conversation;
use crate::ai::{
    Completion, CompletionBackend, CompletionError, CompletionResult, GeminiClient, TransportError,
};
use crate::config::Settings;
use crate::credentials::{CredentialError, CredentialProvider};
use crate::types::ChatMessage;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

const ABANDONED_REASON: &str = "request was cancelled before a reply arrived";

/// What happened to one submission.
#[derive(Clone, Debug, PartialEq)]
pub enum SubmitOutcome {
    /// Input was blank; nothing was appended.
    Ignored,
    /// Another exchange is still pending; the input was rejected.
    Busy,
    /// The assistant reply that was appended.
    Replied(ChatMessage),
    /// The exchange failed; an error message was appended.
    Failed(CompletionError),
    /// The conversation was cleared while this exchange was in flight.
    Discarded,
}

/// Coordinates one round trip per user submission.
///
/// At most one exchange is pending at a time: a submission made while another is
/// outstanding returns [`SubmitOutcome::Busy`], so replies always land in
/// submission order. Failures are appended to the log as assistant messages
/// flagged with [`ChatMessage::is_error`].
pub struct ExchangeOrchestrator {
    backend: Arc<dyn CompletionBackend>,
    credentials: Arc<dyn CredentialProvider>,
    conversation: Mutex<Conversation>,
    model: RwLock<ModelChoice>,
    settings: Settings,
}

impl ExchangeOrchestrator {
    pub fn new(
        backend: Arc<dyn CompletionBackend>,
        credentials: Arc<dyn CredentialProvider>,
        settings: Settings,
    ) -> Self {
        let model = ModelChoice::from_id(&settings.default_model, &settings.gemini_model)
            .unwrap_or(ModelChoice::Gemini);
        Self {
            backend,
            credentials,
            conversation: Mutex::new(Conversation::new()),
            model: RwLock::new(model),
            settings,
        }
    }

    /// Orchestrator backed by the live generative-language client.
    pub fn with_gemini(
        credentials: Arc<dyn CredentialProvider>,
        settings: Settings,
    ) -> Result<Self, TransportError> {
        let backend = GeminiClient::from_settings(&settings)?;
        Ok(Self::new(Arc::new(backend), credentials, settings))
    }

    fn conversation(&self) -> MutexGuard<'_, Conversation> {
        self.conversation
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Submit raw user input and wait for its reply.
    ///
    /// If the returned future is dropped before the reply arrives, the user
    /// message is still answered with an error message and pending is cleared.
    pub async fn submit(&self, text: &str) -> SubmitOutcome {
        let text = text.trim();
        if text.is_empty() {
            return SubmitOutcome::Ignored;
        }

        let model = self.active_model();
        let generation = {
            let mut conversation = self.conversation();
            if conversation.is_pending() {
                tracing::debug!("submission rejected, exchange already pending");
                return SubmitOutcome::Busy;
            }
            conversation.append(ChatMessage::user(text));
            conversation.set_pending(true);
            conversation.generation()
        };
        let mut pending = PendingGuard {
            conversation: &self.conversation,
            generation,
            armed: true,
        };

        let result = self.dispatch(&model, text).await;

        let (reply, outcome) = match result {
            Ok(completion) => {
                let reply = ChatMessage::assistant(completion.content);
                (reply.clone(), SubmitOutcome::Replied(reply))
            }
            Err(err) => {
                tracing::warn!(model = model.id(), error = %err, "exchange failed");
                (ChatMessage::error(&err), SubmitOutcome::Failed(err))
            }
        };

        pending.armed = false;
        let mut conversation = self.conversation();
        if conversation.generation() != generation {
            tracing::debug!(model = model.id(), "conversation cleared, dropping reply");
            return SubmitOutcome::Discarded;
        }
        conversation.append(reply);
        conversation.set_pending(false);
        outcome
    }

    async fn dispatch(&self, model: &ModelChoice, text: &str) -> CompletionResult {
        match model {
            ModelChoice::Gemini => {
                let credential = self.credentials.get().unwrap_or_default();
                self.backend.complete(text, &credential).await
            }
            ModelChoice::Placeholder(id) => {
                tokio::time::sleep(self.settings.echo_delay).await;
                Ok(Completion {
                    content: format!("Response from {id}: {text}"),
                })
            }
        }
    }

    /// Snapshot of the message log in display order.
    pub fn messages(&self) -> Vec<ChatMessage> {
        self.conversation().messages().to_vec()
    }

    pub fn is_pending(&self) -> bool {
        self.conversation().is_pending()
    }

    /// Empty the log. A reply still in flight is discarded when it arrives.
    pub fn clear(&self) {
        self.conversation().clear();
        tracing::info!("conversation cleared");
    }

    pub fn active_model(&self) -> ModelChoice {
        self.model
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Switch the model used by later submissions. Returns `None` for a blank id.
    pub fn select_model(&self, id: &str) -> Option<ModelChoice> {
        let choice = ModelChoice::from_id(id, &self.settings.gemini_model)?;
        *self.model.write().unwrap_or_else(PoisonError::into_inner) = choice.clone();
        tracing::info!(model = choice.id(), "model selected");
        Some(choice)
    }

    pub fn available_models(&self) -> Vec<ModelInfo> {
        available_models(&self.settings)
    }

    pub fn save_credential(&self, value: &str) -> Result<(), CredentialError> {
        self.credentials.set(value)
    }

    pub fn clear_credential(&self) -> Result<(), CredentialError> {
        self.credentials.clear()
    }

    pub fn has_credential(&self) -> bool {
        self.credentials.get().is_some()
    }
}

/// Closes out a submission abandoned mid-flight: answers it with an error
/// message and clears the pending flag.
struct PendingGuard<'a> {
    conversation: &'a Mutex<Conversation>,
    generation: u64,
    // Cleared once `submit` takes over the final append itself
    armed: bool,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut conversation = self
            .conversation
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if conversation.generation() == self.generation {
            tracing::debug!("submission abandoned before its reply");
            conversation.append(ChatMessage::error(ABANDONED_REASON));
            conversation.set_pending(false);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::MemoryCredentialStore;
    use crate::types::Role;
    use async_trait::async_trait;
    use std::time::Duration;

    struct FixedBackend(CompletionResult);

    #[async_trait]
    impl CompletionBackend for FixedBackend {
        async fn complete(&self, _prompt: &str, _credential: &str) -> CompletionResult {
            self.0.clone()
        }
    }

    fn orchestrator(result: CompletionResult, default_model: &str) -> ExchangeOrchestrator {
        let settings = Settings {
            default_model: default_model.to_string(),
            echo_delay: Duration::from_millis(1),
            ..Settings::default()
        };
        ExchangeOrchestrator::new(
            Arc::new(FixedBackend(result)),
            Arc::new(MemoryCredentialStore::new()),
            settings,
        )
    }

    #[tokio::test]
    async fn blank_input_is_ignored() {
        let orch = orchestrator(Err(CompletionError::EmptyResponse), "gemini");
        assert_eq!(orch.submit("  \n\t ").await, SubmitOutcome::Ignored);
        assert!(orch.messages().is_empty());
        assert!(!orch.is_pending());
    }

    #[tokio::test]
    async fn placeholder_model_echoes() {
        let orch = orchestrator(Err(CompletionError::EmptyResponse), "gpt-4");
        let outcome = orch.submit(" hello ").await;

        let messages = orch.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].content(), "hello");
        assert_eq!(messages[1].role(), Role::Assistant);
        assert_eq!(messages[1].content(), "Response from gpt-4: hello");
        assert_eq!(outcome, SubmitOutcome::Replied(messages[1].clone()));
    }

    #[tokio::test]
    async fn failure_is_appended_as_error_message() {
        let orch = orchestrator(Err(CompletionError::MissingCredential), "gemini");
        let outcome = orch.submit("hi").await;

        assert_eq!(outcome, SubmitOutcome::Failed(CompletionError::MissingCredential));
        let messages = orch.messages();
        assert_eq!(messages.len(), 2);
        assert!(messages[1].is_error());
        assert_eq!(messages[1].content(), "Error: no API key configured");
        assert!(!orch.is_pending());
    }

    #[test]
    fn unknown_default_model_falls_back_to_placeholder() {
        let orch = orchestrator(Err(CompletionError::EmptyResponse), "mistral");
        assert_eq!(
            orch.active_model(),
            ModelChoice::Placeholder("mistral".to_string())
        );
        assert_eq!(orch.select_model(""), None);
        assert_eq!(orch.select_model("GEMINI"), Some(ModelChoice::Gemini));
        assert_eq!(orch.active_model(), ModelChoice::Gemini);
    }

    #[test]
    fn selecting_the_configured_model_name_uses_gemini() {
        let orch = orchestrator(Err(CompletionError::EmptyResponse), "gpt-4");
        let configured = Settings::default().gemini_model;
        assert_eq!(orch.select_model(&configured), Some(ModelChoice::Gemini));
        assert_eq!(orch.active_model(), ModelChoice::Gemini);
    }

    #[test]
    fn credential_actions_go_through_provider() {
        let orch = orchestrator(Err(CompletionError::EmptyResponse), "gemini");
        assert!(!orch.has_credential());
        assert!(matches!(orch.save_credential("  "), Err(CredentialError::Empty)));
        orch.save_credential("key").unwrap();
        assert!(orch.has_credential());
        orch.clear_credential().unwrap();
        assert!(!orch.has_credential());
    }
}
