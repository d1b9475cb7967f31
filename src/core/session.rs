//! Session engine - conversation lifecycle and the message-send path
//!
//! Handles:
//! - Session creation, selection, renaming, deletion
//! - The optimistic send path (user append, dispatch, assistant append)
//! - Context prompts and extracted-content plumbing
//! - Write-through persistence under a caller-chosen policy

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use super::errors::SessionError;
use super::extract::{ExtractedContent, ExtractedContentStore};
use super::types::{ChatSession, CompareSide, SessionMessage, SessionMeta};
use crate::config::Config;
use crate::llm::{ChatTurn, DispatchError, DispatchOptions, ModelCatalog, ModelDispatcher};
use crate::storage::SessionStore;

/// What to do when a write to the storage port fails
///
/// In-memory state is optimistic either way; the policy only decides
/// whether the failure is logged or also returned to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistPolicy {
    LogAndContinue,
    Surface,
}

struct EngineState {
    sessions: HashMap<String, ChatSession>,
    /// At most one session is current at a time
    current: Option<String>,
}

/// Owns all conversation sessions for one application instance
///
/// One engine per top-level app instance, passed down to the views; there
/// is no ambient singleton.
pub struct SessionEngine {
    state: RwLock<EngineState>,
    extract: ExtractedContentStore,
    store: Arc<dyn SessionStore>,
    dispatcher: Arc<dyn ModelDispatcher>,
    options: DispatchOptions,
    history_window: usize,
    persist_policy: PersistPolicy,
}

impl SessionEngine {
    /// Create an engine with no sessions
    pub fn new(
        store: Arc<dyn SessionStore>,
        dispatcher: Arc<dyn ModelDispatcher>,
        config: &Config,
    ) -> Self {
        Self {
            state: RwLock::new(EngineState {
                sessions: HashMap::new(),
                current: None,
            }),
            extract: ExtractedContentStore::new(),
            store,
            dispatcher,
            options: DispatchOptions {
                max_tokens: config.dispatch.max_tokens,
                temperature: config.dispatch.temperature,
            },
            history_window: config.history.window,
            persist_policy: PersistPolicy::LogAndContinue,
        }
    }

    /// Create an engine hydrated from the storage port
    ///
    /// Storage failures here degrade to an empty engine rather than
    /// blocking startup.
    pub fn open(
        store: Arc<dyn SessionStore>,
        dispatcher: Arc<dyn ModelDispatcher>,
        config: &Config,
    ) -> Self {
        let mut sessions = HashMap::new();
        match store.load_all() {
            Ok(loaded) => {
                for session in loaded {
                    sessions.insert(session.id.clone(), session);
                }
            }
            Err(err) => {
                tracing::warn!(error = %err, "failed to load sessions from storage");
            }
        }
        let current = store
            .current_session_id()
            .filter(|id| sessions.contains_key(id));

        let mut engine = Self::new(store, dispatcher, config);
        engine.state = RwLock::new(EngineState { sessions, current });
        engine
    }

    pub fn with_persist_policy(mut self, policy: PersistPolicy) -> Self {
        self.persist_policy = policy;
        self
    }

    /// Handle to the extracted-content store, shared with the ingestion
    /// pipeline
    pub fn extract_store(&self) -> ExtractedContentStore {
        self.extract.clone()
    }

    // ========== Lifecycle ==========

    /// Allocate a new empty session and make it current
    pub async fn create_session(&self) -> String {
        let mut state = self.state.write().await;
        self.insert_new_session(&mut state, ChatSession::new())
    }

    /// Make `id` the current session; unknown ids are a silent no-op
    pub async fn select_session(&self, id: &str) {
        let mut state = self.state.write().await;
        if !state.sessions.contains_key(id) {
            tracing::debug!(session_id = %id, "select ignored for unknown session");
            return;
        }
        state.current = Some(id.to_string());
        if let Err(err) = self.store.set_current_session(id) {
            tracing::warn!(error = %err, "failed to persist current-session pointer");
        }
    }

    pub async fn current_session_id(&self) -> Option<String> {
        self.state.read().await.current.clone()
    }

    pub async fn rename_session(&self, id: &str, name: &str) -> Result<(), SessionError> {
        let mut state = self.state.write().await;
        let session = state
            .sessions
            .get_mut(id)
            .ok_or_else(|| SessionError::NotFound(id.to_string()))?;
        session.name = name.trim().to_string();
        session.touch();
        self.persist_checked(session)
    }

    /// Switch the selected model for a session
    ///
    /// Unknown model ids keep the previous selection.
    pub async fn set_session_model(&self, id: &str, model: &str) -> Result<(), SessionError> {
        if !ModelCatalog::contains(model) {
            tracing::warn!(model = %model, "ignoring unknown model id");
            return Ok(());
        }
        let mut state = self.state.write().await;
        let session = state
            .sessions
            .get_mut(id)
            .ok_or_else(|| SessionError::NotFound(id.to_string()))?;
        session.model = model.to_string();
        session.touch();
        self.persist_checked(session)
    }

    /// Remove a session outright, along with its extracted content
    pub async fn delete_session(&self, id: &str) -> Result<(), SessionError> {
        let mut state = self.state.write().await;
        if state.sessions.remove(id).is_none() {
            return Err(SessionError::NotFound(id.to_string()));
        }
        if state.current.as_deref() == Some(id) {
            state.current = None;
            if let Err(err) = self.store.clear_current_session() {
                tracing::warn!(error = %err, "failed to clear current-session pointer");
            }
        }
        self.extract.remove(id);
        match self.store.delete_session(id) {
            Ok(()) => Ok(()),
            Err(err) => self.handle_persist_error(err),
        }
    }

    // ========== Send path ==========

    /// Send one user turn on the current session
    ///
    /// Appends the user message immediately, then dispatches and appends
    /// exactly one assistant message - the reply, or the human-readable
    /// classification of the failure. A dispatch failure is never returned
    /// to the caller.
    pub async fn send_message(&self, text: &str, context_prompt: &str) -> Result<(), SessionError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(SessionError::EmptyMessage);
        }

        // Capture the origin session id before suspending: a late result
        // must land in this session even if the user navigates away.
        let (session_id, model, turns) = {
            let mut state = self.state.write().await;
            let session_id = match state.current.clone() {
                Some(id) if state.sessions.contains_key(&id) => id,
                _ => self.insert_new_session(&mut state, ChatSession::new()),
            };
            let extract = self.extract.get(&session_id);
            let session = state
                .sessions
                .get_mut(&session_id)
                .ok_or_else(|| SessionError::NotFound(session_id.clone()))?;
            session.maybe_title_from(trimmed);
            session.messages.push(SessionMessage::user(trimmed));
            session.touch();
            let turns = build_turns(
                &session.messages,
                context_prompt,
                extract.as_ref(),
                self.history_window,
            );
            let model = session.model.clone();
            self.persist_best_effort(session);
            (session_id, model, turns)
        };

        let outcome = self.dispatcher.dispatch(&model, &turns, &self.options).await;

        let mut state = self.state.write().await;
        let Some(session) = state.sessions.get_mut(&session_id) else {
            tracing::debug!(session_id = %session_id, "dropping dispatch result for deleted session");
            return Ok(());
        };
        match outcome {
            Ok(content) => {
                session.messages.push(SessionMessage::assistant(content, &model));
            }
            Err(err) => {
                tracing::warn!(error = %err, model = %model, "model dispatch failed");
                session
                    .messages
                    .push(SessionMessage::assistant_error(err.user_message(), &model));
            }
        }
        session.touch();
        self.persist_best_effort(session);
        Ok(())
    }

    // ========== Context prompt ==========

    pub async fn update_context_prompt(&self, id: &str, text: &str) -> Result<(), SessionError> {
        let mut state = self.state.write().await;
        let session = state
            .sessions
            .get_mut(id)
            .ok_or_else(|| SessionError::NotFound(id.to_string()))?;
        session.context_prompt = text.to_string();
        session.touch();
        self.persist_checked(session)
    }

    pub async fn context_prompt(&self, id: &str) -> Option<String> {
        let state = self.state.read().await;
        state.sessions.get(id).map(|s| s.context_prompt.clone())
    }

    // ========== Extracted content ==========

    /// Overwrite the extracted content for a session
    pub fn update_extract_content(&self, id: &str, text: &str) {
        self.extract.set(id, text);
    }

    /// Explicitly append to the extracted content for a session
    pub fn append_extract_content(&self, id: &str, text: &str) {
        self.extract.append(id, text);
    }

    pub fn extract_content(&self, id: &str) -> Option<String> {
        self.extract.get(id).map(|e| e.text)
    }

    // ========== Projections ==========

    /// Messages of a session, in insertion order; empty for unknown ids
    pub async fn messages(&self, id: &str) -> Vec<SessionMessage> {
        let state = self.state.read().await;
        state
            .sessions
            .get(id)
            .map(|s| s.messages.clone())
            .unwrap_or_default()
    }

    /// Snapshot of one session
    pub async fn session(&self, id: &str) -> Option<ChatSession> {
        self.state.read().await.sessions.get(id).cloned()
    }

    /// All sessions, most recently updated first
    pub async fn list_sessions(&self) -> Vec<SessionMeta> {
        let state = self.state.read().await;
        let mut metas: Vec<SessionMeta> = state.sessions.values().map(SessionMeta::from).collect();
        for meta in &mut metas {
            meta.is_current = state.current.as_deref() == Some(meta.id.as_str());
        }
        metas.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        metas
    }

    // ========== Export / import ==========

    pub async fn export_json(&self, id: &str) -> Result<String, SessionError> {
        let state = self.state.read().await;
        let session = state
            .sessions
            .get(id)
            .ok_or_else(|| SessionError::NotFound(id.to_string()))?;
        serde_json::to_string_pretty(session)
            .map_err(|e| SessionError::InvalidPayload(e.to_string()))
    }

    /// Import a session from JSON, make it current, and return its id
    pub async fn import_json(&self, json: &str) -> Result<String, SessionError> {
        let session: ChatSession =
            serde_json::from_str(json).map_err(|e| SessionError::InvalidPayload(e.to_string()))?;
        let mut state = self.state.write().await;
        let id = self.insert_new_session(&mut state, session);
        Ok(id)
    }

    // ========== Comparison support (crate-internal) ==========

    /// Allocate a fresh comparison-flagged session and make it current
    ///
    /// Compare mode never converts an existing session in place.
    pub(crate) async fn create_comparison_session(&self, left: &str, right: &str) -> String {
        let mut state = self.state.write().await;
        self.insert_new_session(&mut state, ChatSession::new_comparison(left, right))
    }

    /// Append the user turn to the active side(s) and prepare their
    /// dispatch windows
    pub(crate) async fn begin_comparison_turn(
        &self,
        session_id: &str,
        text: &str,
        attachments: &[String],
        context_prompt: &str,
        left_model: Option<&str>,
        right_model: Option<&str>,
    ) -> Result<(Option<SidePlan>, Option<SidePlan>), SessionError> {
        let mut state = self.state.write().await;
        let extract = self.extract.get(session_id);
        let session = state
            .sessions
            .get_mut(session_id)
            .ok_or_else(|| SessionError::NotFound(session_id.to_string()))?;
        if !session.is_comparison {
            return Err(SessionError::NotComparison(session_id.to_string()));
        }
        session.maybe_title_from(text);

        let mut left_plan = None;
        let mut right_plan = None;
        {
            let threads = session
                .threads
                .as_mut()
                .ok_or_else(|| SessionError::NotComparison(session_id.to_string()))?;
            let user_message = |attachments: &[String]| {
                if attachments.is_empty() {
                    SessionMessage::user(text.trim())
                } else {
                    SessionMessage::user_with_attachments(text.trim(), attachments.to_vec())
                }
            };
            if let Some(model) = left_model {
                threads.left_model = model.to_string();
                threads.left.push(user_message(attachments));
                left_plan = Some(SidePlan {
                    model: model.to_string(),
                    turns: build_turns(
                        &threads.left,
                        context_prompt,
                        extract.as_ref(),
                        self.history_window,
                    ),
                });
            }
            if let Some(model) = right_model {
                threads.right_model = model.to_string();
                threads.right.push(user_message(attachments));
                right_plan = Some(SidePlan {
                    model: model.to_string(),
                    turns: build_turns(
                        &threads.right,
                        context_prompt,
                        extract.as_ref(),
                        self.history_window,
                    ),
                });
            }
        }
        session.touch();
        self.persist_best_effort(session);
        Ok((left_plan, right_plan))
    }

    /// Land one side's dispatch outcome in its origin session
    pub(crate) async fn complete_comparison_turn(
        &self,
        session_id: &str,
        side: CompareSide,
        outcome: Result<String, DispatchError>,
        model: &str,
    ) {
        let mut state = self.state.write().await;
        let Some(session) = state.sessions.get_mut(session_id) else {
            tracing::debug!(session_id = %session_id, "dropping comparison result for deleted session");
            return;
        };
        let Some(threads) = session.threads.as_mut() else {
            return;
        };
        let list = match side {
            CompareSide::Left => &mut threads.left,
            CompareSide::Right => &mut threads.right,
        };
        match outcome {
            Ok(content) => list.push(SessionMessage::assistant(content, model)),
            Err(err) => {
                tracing::warn!(error = %err, model = %model, "comparison dispatch failed");
                list.push(SessionMessage::assistant_error(err.user_message(), model));
            }
        }
        session.touch();
        self.persist_best_effort(session);
    }

    pub(crate) fn dispatcher(&self) -> Arc<dyn ModelDispatcher> {
        self.dispatcher.clone()
    }

    pub(crate) fn options(&self) -> &DispatchOptions {
        &self.options
    }

    // ========== Persistence helpers ==========

    fn insert_new_session(&self, state: &mut EngineState, session: ChatSession) -> String {
        let id = session.id.clone();
        self.persist_best_effort(&session);
        state.sessions.insert(id.clone(), session);
        state.current = Some(id.clone());
        if let Err(err) = self.store.set_current_session(&id) {
            tracing::warn!(error = %err, "failed to persist current-session pointer");
        }
        id
    }

    fn persist_best_effort(&self, session: &ChatSession) {
        if let Err(err) = self.store.save_session(session) {
            tracing::warn!(session_id = %session.id, error = %err, "failed to persist session");
        }
    }

    fn persist_checked(&self, session: &ChatSession) -> Result<(), SessionError> {
        match self.store.save_session(session) {
            Ok(()) => Ok(()),
            Err(err) => self.handle_persist_error(err),
        }
    }

    fn handle_persist_error(
        &self,
        err: crate::storage::StorageError,
    ) -> Result<(), SessionError> {
        match self.persist_policy {
            PersistPolicy::LogAndContinue => {
                tracing::warn!(error = %err, "storage write failed; keeping in-memory state");
                Ok(())
            }
            PersistPolicy::Surface => Err(SessionError::Storage(err.to_string())),
        }
    }
}

/// Prepared dispatch for one comparison side
pub(crate) struct SidePlan {
    pub model: String,
    pub turns: Vec<ChatTurn>,
}

/// Assemble the wire window: optional system turn (context prompt +
/// extracted content), then the tail of the message list.
///
/// Error placeholders never go back on the wire.
fn build_turns(
    messages: &[SessionMessage],
    context_prompt: &str,
    extract: Option<&ExtractedContent>,
    window: usize,
) -> Vec<ChatTurn> {
    let mut turns = Vec::new();

    let mut system = String::new();
    if !context_prompt.trim().is_empty() {
        system.push_str(context_prompt.trim());
    }
    if let Some(entry) = extract {
        if !entry.text.is_empty() {
            if !system.is_empty() {
                system.push_str("\n\n");
            }
            system.push_str("Reference documents:\n");
            system.push_str(&entry.text);
        }
    }
    if !system.is_empty() {
        turns.push(ChatTurn::system(system));
    }

    let start = messages.len().saturating_sub(window);
    for message in &messages[start..] {
        if message.is_error {
            continue;
        }
        turns.push(message.to_turn());
    }
    turns
}
