/// Chat module for Chatline
///
/// - `state` - The append-only message log and the pending flag
/// - `models` - The model picker catalog
/// - `orchestrator` - One round trip per user submission
mod models;
mod orchestrator;
mod state;

pub use models::{ModelChoice, ModelInfo, PLACEHOLDER_MODELS, available_models};
pub use orchestrator::{ExchangeOrchestrator, SubmitOutcome};
pub use state::Conversation;
