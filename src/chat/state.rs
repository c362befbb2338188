use crate::types::ChatMessage;

/// Ordered, append-only message log plus the "awaiting response" flag.
#[derive(Debug, Default)]
pub struct Conversation {
    messages: Vec<ChatMessage>,
    pending: bool,
    // Bumped by `clear` so late replies can tell their conversation is gone
    generation: u64,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    /// Drop every message and reset the pending flag.
    pub fn clear(&mut self) {
        self.messages.clear();
        self.pending = false;
        self.generation = self.generation.wrapping_add(1);
    }

    pub fn set_pending(&mut self, pending: bool) {
        self.pending = pending;
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}
