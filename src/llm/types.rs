//! Shared wire types for model dispatch

use serde::{Deserialize, Serialize};

/// Role of one turn on the wire
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    System,
    User,
    Assistant,
}

/// One turn in the history window sent to a model endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: TurnRole,
    pub content: String,
}

impl ChatTurn {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: TurnRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: TurnRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: TurnRole::Assistant,
            content: content.into(),
        }
    }
}

/// Pass-through tuning knobs for a dispatch
///
/// The engines forward these unchanged; only the endpoint adapter
/// interprets them.
#[derive(Debug, Clone)]
pub struct DispatchOptions {
    pub max_tokens: usize,
    pub temperature: Option<f32>,
}

impl Default for DispatchOptions {
    fn default() -> Self {
        Self {
            max_tokens: 4096,
            temperature: None,
        }
    }
}
