/// Completion module for Chatline
///
/// This module turns one prompt plus one credential into exactly one request/response
/// exchange with a generative-language service and normalizes the outcome.
///
/// # Architecture
///
/// - `client` - The `CompletionBackend` seam and the classified error taxonomy
/// - `transport` - The HTTP seam (`Transport`) and its reqwest implementation
/// - `gemini` - The generative-language backend built on top of a `Transport`
///
/// # Usage
///
/// ```rust,no_run
/// use chatline::ai::{CompletionBackend, GeminiClient};
/// use chatline::config::Settings;
///
/// # async fn example() -> anyhow::Result<()> {
/// let client = GeminiClient::from_settings(&Settings::default())?;
/// let completion = client.complete("Hello!", "my-api-key").await?;
/// println!("{}", completion.content);
/// # Ok(())
/// # }
/// ```
mod client;
mod gemini;
mod transport;

// Re-export main types
pub use client::{Completion, CompletionBackend, CompletionError, CompletionResult};
pub use gemini::{DEFAULT_BASE_URL, DEFAULT_MODEL, GeminiClient};
pub use transport::{HttpRequest, HttpResponse, ReqwestTransport, Transport, TransportError};
