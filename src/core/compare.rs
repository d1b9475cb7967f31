//! Comparison engine - two model threads side by side
//!
//! Orchestrates the left/right threads of a comparison session: mode
//! toggling, model selection, and joint or single-side sends. Builds on
//! the session engine's primitives; the threads themselves live in the
//! owning session record.

use std::sync::Arc;

use tokio::sync::RwLock;

use super::errors::SessionError;
use super::session::{SessionEngine, SidePlan};
use super::types::{CompareSide, SessionMessage};
use crate::llm::ModelCatalog;

/// Read-only projection of a comparison session's two threads
///
/// Both lists are empty for a non-comparison session.
#[derive(Debug, Clone, Default)]
pub struct ComparisonMessages {
    pub left: Vec<SessionMessage>,
    pub right: Vec<SessionMessage>,
}

struct CompareState {
    enabled: bool,
    /// Session the pairing currently lives in, while mode is on
    active_session: Option<String>,
    left_model: String,
    right_model: String,
}

/// Drives side-by-side comparison of two models
pub struct ComparisonEngine {
    engine: Arc<SessionEngine>,
    state: RwLock<CompareState>,
}

impl ComparisonEngine {
    pub fn new(engine: Arc<SessionEngine>) -> Self {
        let default = ModelCatalog::default_model().id.to_string();
        Self {
            engine,
            state: RwLock::new(CompareState {
                enabled: false,
                active_session: None,
                left_model: default.clone(),
                right_model: default,
            }),
        }
    }

    pub async fn is_compare_mode(&self) -> bool {
        self.state.read().await.enabled
    }

    /// Flip comparison mode
    ///
    /// Turning the mode on always spawns a fresh comparison session (the
    /// previous session is left untouched) and returns its id; turning it
    /// off returns `None`.
    pub async fn toggle_compare_mode(&self) -> Option<String> {
        let mut state = self.state.write().await;
        if state.enabled {
            state.enabled = false;
            state.active_session = None;
            return None;
        }
        let session_id = self
            .engine
            .create_comparison_session(&state.left_model, &state.right_model)
            .await;
        state.enabled = true;
        state.active_session = Some(session_id.clone());
        Some(session_id)
    }

    /// Select the left-thread model; unknown ids keep the previous value
    pub async fn set_left_model(&self, id: &str) {
        if !ModelCatalog::contains(id) {
            tracing::warn!(model = %id, "ignoring unknown left model id");
            return;
        }
        self.state.write().await.left_model = id.to_string();
    }

    /// Select the right-thread model; unknown ids keep the previous value
    pub async fn set_right_model(&self, id: &str) {
        if !ModelCatalog::contains(id) {
            tracing::warn!(model = %id, "ignoring unknown right model id");
            return;
        }
        self.state.write().await.right_model = id.to_string();
    }

    pub async fn selected_models(&self) -> (String, String) {
        let state = self.state.read().await;
        (state.left_model.clone(), state.right_model.clone())
    }

    /// Send one user turn into the comparison session
    ///
    /// Joint when both model ids are given: the same user message is
    /// appended to both threads and two dispatches run concurrently, each
    /// side appending its own assistant message as its dispatch resolves -
    /// a slow side never blocks the other. With exactly one id, only that
    /// side is touched.
    pub async fn send_comparison_message(
        &self,
        text: &str,
        left_model: Option<&str>,
        right_model: Option<&str>,
        context_prompt: &str,
        attachments: &[String],
    ) -> Result<(), SessionError> {
        if text.trim().is_empty() && attachments.is_empty() {
            return Err(SessionError::EmptyMessage);
        }
        if left_model.is_none() && right_model.is_none() {
            return Err(SessionError::NoModelSelected);
        }

        let session_id = self.ensure_active_session().await;

        let (left_plan, right_plan) = self
            .engine
            .begin_comparison_turn(
                &session_id,
                text,
                attachments,
                context_prompt,
                left_model,
                right_model,
            )
            .await?;

        let left_fut = self.run_side(&session_id, CompareSide::Left, left_plan);
        let right_fut = self.run_side(&session_id, CompareSide::Right, right_plan);
        futures::join!(left_fut, right_fut);
        Ok(())
    }

    /// Thread projections for the rendering layer
    pub async fn comparison_messages(&self, session_id: &str) -> ComparisonMessages {
        match self.engine.session(session_id).await {
            Some(session) => match session.threads {
                Some(threads) => ComparisonMessages {
                    left: threads.left,
                    right: threads.right,
                },
                None => ComparisonMessages::default(),
            },
            None => ComparisonMessages::default(),
        }
    }

    async fn ensure_active_session(&self) -> String {
        let mut state = self.state.write().await;
        if let Some(id) = &state.active_session {
            return id.clone();
        }
        // Sending without toggling first implicitly starts a pairing,
        // mirroring the session engine's auto-create on first message.
        let session_id = self
            .engine
            .create_comparison_session(&state.left_model, &state.right_model)
            .await;
        state.enabled = true;
        state.active_session = Some(session_id.clone());
        session_id
    }

    async fn run_side(&self, session_id: &str, side: CompareSide, plan: Option<SidePlan>) {
        let Some(plan) = plan else {
            return;
        };
        let outcome = self
            .engine
            .dispatcher()
            .dispatch(&plan.model, &plan.turns, self.engine.options())
            .await;
        self.engine
            .complete_comparison_turn(session_id, side, outcome, &plan.model)
            .await;
    }
}
