//! Chatline: a single-conversation chat core.
//!
//! The rendering layer talks to [`chat::ExchangeOrchestrator`], which owns the
//! message log and drives one completion exchange per submission.

pub mod ai;
pub mod chat;
pub mod config;
pub mod credentials;
pub mod logging;
pub mod types;
