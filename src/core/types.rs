//! Domain records: sessions, messages, comparison threads

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::llm::{ChatTurn, ModelCatalog};

/// Role of a stored conversation message
///
/// Deliberately a closed two-variant union: system/context input exists
/// only on the wire (`TurnRole`), never in a session's message list.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

/// A message in a conversation
///
/// Immutable once constructed; removed only when its session is deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionMessage {
    /// Unique message ID
    pub id: String,
    pub role: MessageRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    /// File names attached to this turn, if any
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<String>,
    /// Model that produced this turn (assistant messages)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Set when this assistant message carries an error classification
    /// instead of a model reply
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_error: bool,
}

impl SessionMessage {
    fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            id: format!("msg_{}", uuid::Uuid::new_v4()),
            role,
            content: content.into(),
            timestamp: Utc::now(),
            attachments: Vec::new(),
            model: None,
            is_error: false,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }

    pub fn user_with_attachments(content: impl Into<String>, attachments: Vec<String>) -> Self {
        let mut msg = Self::new(MessageRole::User, content);
        msg.attachments = attachments;
        msg
    }

    pub fn assistant(content: impl Into<String>, model: impl Into<String>) -> Self {
        let mut msg = Self::new(MessageRole::Assistant, content);
        msg.model = Some(model.into());
        msg
    }

    /// Assistant-role placeholder carrying the human-readable text of a
    /// failed dispatch
    pub fn assistant_error(content: impl Into<String>, model: impl Into<String>) -> Self {
        let mut msg = Self::assistant(content, model);
        msg.is_error = true;
        msg
    }

    pub(crate) fn to_turn(&self) -> ChatTurn {
        match self.role {
            MessageRole::User => ChatTurn::user(self.content.clone()),
            MessageRole::Assistant => ChatTurn::assistant(self.content.clone()),
        }
    }
}

/// The two logical threads of a comparison session
///
/// Both lists share the owning session's id but stay separate so the
/// rendering layer can draw two columns. Joint sends append to both;
/// single-side sends touch one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompareThreads {
    pub left_model: String,
    pub right_model: String,
    pub left: Vec<SessionMessage>,
    pub right: Vec<SessionMessage>,
}

impl CompareThreads {
    pub fn new(left_model: impl Into<String>, right_model: impl Into<String>) -> Self {
        Self {
            left_model: left_model.into(),
            right_model: right_model.into(),
            left: Vec::new(),
            right: Vec::new(),
        }
    }
}

/// Which comparison thread an operation targets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareSide {
    Left,
    Right,
}

/// A conversation session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatSession {
    /// Unique session ID
    pub id: String,
    /// Display name (derived from the first prompt when not renamed)
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Selected model (non-comparison mode)
    pub model: String,
    /// Whether this session drives two comparison threads
    #[serde(default)]
    pub is_comparison: bool,
    /// Free text prepended to every dispatch, independent of history
    #[serde(default)]
    pub context_prompt: String,
    /// Conversation messages, in insertion order
    pub messages: Vec<SessionMessage>,
    /// Present iff `is_comparison`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threads: Option<CompareThreads>,
}

impl ChatSession {
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            id: format!("session_{}", uuid::Uuid::new_v4()),
            name: String::new(),
            created_at: now,
            updated_at: now,
            model: ModelCatalog::default_model().id.to_string(),
            is_comparison: false,
            context_prompt: String::new(),
            messages: Vec::new(),
            threads: None,
        }
    }

    /// A fresh session flagged for comparison mode with its two threads
    pub fn new_comparison(left_model: impl Into<String>, right_model: impl Into<String>) -> Self {
        let mut session = Self::new();
        session.is_comparison = true;
        session.threads = Some(CompareThreads::new(left_model, right_model));
        session
    }

    pub(crate) fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Derive a display name from the first prompt if none was set
    pub(crate) fn maybe_title_from(&mut self, text: &str) {
        if self.name.is_empty() {
            self.name = truncate_title(text);
        }
    }
}

impl Default for ChatSession {
    fn default() -> Self {
        Self::new()
    }
}

const TITLE_MAX_CHARS: usize = 48;

fn truncate_title(text: &str) -> String {
    let line = text.lines().next().unwrap_or("").trim();
    if line.chars().count() <= TITLE_MAX_CHARS {
        line.to_string()
    } else {
        let cut: String = line.chars().take(TITLE_MAX_CHARS).collect();
        format!("{}…", cut.trim_end())
    }
}

/// Session metadata for sidebar listings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionMeta {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub model: String,
    pub is_comparison: bool,
    pub message_count: usize,
    /// Is this the current session
    pub is_current: bool,
}

impl From<&ChatSession> for SessionMeta {
    fn from(session: &ChatSession) -> Self {
        let message_count = match &session.threads {
            Some(threads) => threads.left.len() + threads.right.len(),
            None => session.messages.len(),
        };
        Self {
            id: session.id.clone(),
            name: session.name.clone(),
            created_at: session.created_at,
            updated_at: session.updated_at,
            model: session.model.clone(),
            is_comparison: session.is_comparison,
            message_count,
            is_current: false, // Set by the engine
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session_defaults() {
        let session = ChatSession::new();
        assert!(session.id.starts_with("session_"));
        assert!(session.name.is_empty());
        assert!(!session.is_comparison);
        assert!(session.threads.is_none());
        assert!(session.messages.is_empty());
    }

    #[test]
    fn test_comparison_session_has_threads() {
        let session = ChatSession::new_comparison("gpt-4o", "claude-sonnet-4-20250514");
        assert!(session.is_comparison);
        let threads = session.threads.unwrap();
        assert_eq!(threads.left_model, "gpt-4o");
        assert_eq!(threads.right_model, "claude-sonnet-4-20250514");
    }

    #[test]
    fn test_title_from_first_prompt() {
        let mut session = ChatSession::new();
        session.maybe_title_from("How do I request leave?");
        assert_eq!(session.name, "How do I request leave?");

        // A second prompt never overwrites the title
        session.maybe_title_from("Something else");
        assert_eq!(session.name, "How do I request leave?");
    }

    #[test]
    fn test_title_truncation() {
        let mut session = ChatSession::new();
        session.maybe_title_from(&"x".repeat(100));
        assert!(session.name.chars().count() <= TITLE_MAX_CHARS + 1);
        assert!(session.name.ends_with('…'));
    }

    #[test]
    fn test_error_message_marker() {
        let msg = SessionMessage::assistant_error("could not reach the model", "gpt-4o");
        assert_eq!(msg.role, MessageRole::Assistant);
        assert!(msg.is_error);
    }

    #[test]
    fn test_message_serde_roundtrip() {
        let msg = SessionMessage::user_with_attachments("see attached", vec!["a.pdf".into()]);
        let json = serde_json::to_string(&msg).unwrap();
        let back: SessionMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(back.role, MessageRole::User);
        assert_eq!(back.attachments, vec!["a.pdf".to_string()]);
        assert!(!back.is_error);
    }

    #[test]
    fn test_meta_counts_thread_messages() {
        let mut session = ChatSession::new_comparison("gpt-4o", "gpt-4o-mini");
        let threads = session.threads.as_mut().unwrap();
        threads.left.push(SessionMessage::user("hi"));
        threads.right.push(SessionMessage::user("hi"));
        let meta = SessionMeta::from(&session);
        assert_eq!(meta.message_count, 2);
    }
}
