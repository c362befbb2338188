use crate::config::{GEMINI_MODEL_ID, Settings};

/// Placeholder models answered by a local echo. `(id, label)`
pub const PLACEHOLDER_MODELS: &[(&str, &str)] = &[
    ("gpt-4", "GPT-4"),
    ("claude-3", "Claude 3"),
    ("llama-3", "Llama 3"),
];

/// Where a submission is routed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ModelChoice {
    Gemini,
    Placeholder(String),
}

impl ModelChoice {
    /// `gemini` or the configured Gemini model name route to the live integration;
    /// any other non-blank id is treated as a placeholder.
    pub fn from_id(id: &str, gemini_model: &str) -> Option<Self> {
        let id = id.trim();
        if id.is_empty() {
            return None;
        }
        if id.eq_ignore_ascii_case(GEMINI_MODEL_ID) || id.eq_ignore_ascii_case(gemini_model.trim()) {
            return Some(Self::Gemini);
        }
        Some(Self::Placeholder(id.to_string()))
    }

    pub fn id(&self) -> &str {
        match self {
            Self::Gemini => GEMINI_MODEL_ID,
            Self::Placeholder(id) => id,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModelInfo {
    pub id: String,
    pub label: String,
}

/// Picker entries: the live integration first, then the placeholders.
pub fn available_models(settings: &Settings) -> Vec<ModelInfo> {
    let mut models = vec![ModelInfo {
        id: GEMINI_MODEL_ID.to_string(),
        label: format!("Gemini ({})", settings.gemini_model),
    }];
    models.extend(PLACEHOLDER_MODELS.iter().map(|(id, label)| ModelInfo {
        id: id.to_string(),
        label: label.to_string(),
    }));
    models
}
