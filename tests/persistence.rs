//! Integration tests for the storage port and engine reload behavior

use std::sync::Arc;

use async_trait::async_trait;
use tempfile::TempDir;

use labchat::core::{ChatSession, MessageRole, PersistPolicy, SessionEngine, SessionError};
use labchat::llm::{ChatTurn, DispatchError, DispatchOptions, ModelDispatcher};
use labchat::storage::{JsonStorage, SessionStore, StorageError};
use labchat::Config;

struct EchoDispatcher;

#[async_trait]
impl ModelDispatcher for EchoDispatcher {
    async fn dispatch(
        &self,
        _model_id: &str,
        turns: &[ChatTurn],
        _options: &DispatchOptions,
    ) -> Result<String, DispatchError> {
        let last = turns.last().map(|t| t.content.clone()).unwrap_or_default();
        Ok(format!("echo: {last}"))
    }
}

#[tokio::test]
async fn three_turns_survive_a_reload() {
    let temp = TempDir::new().unwrap();

    let session_id = {
        let store = Arc::new(JsonStorage::new(temp.path()).unwrap());
        let engine = SessionEngine::new(store, Arc::new(EchoDispatcher), &Config::default());

        let id = engine.create_session().await;
        engine.send_message("first", "").await.unwrap();
        engine.send_message("second", "").await.unwrap();
        engine.send_message("third", "").await.unwrap();
        id
    };

    // Fresh engine over the same root, as after an app reload.
    let store = Arc::new(JsonStorage::new(temp.path()).unwrap());
    let engine = SessionEngine::open(store, Arc::new(EchoDispatcher), &Config::default());

    assert_eq!(
        engine.current_session_id().await.as_deref(),
        Some(session_id.as_str())
    );

    let messages = engine.messages(&session_id).await;
    assert_eq!(messages.len(), 6);
    for pair in messages.chunks(2) {
        assert_eq!(pair[0].role, MessageRole::User);
        assert_eq!(pair[1].role, MessageRole::Assistant);
    }
    assert_eq!(messages[0].content, "first");
    assert_eq!(messages[2].content, "second");
    assert_eq!(messages[4].content, "third");
    assert!(messages.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
}

#[tokio::test]
async fn rename_and_context_prompt_persist() {
    let temp = TempDir::new().unwrap();

    let id = {
        let store = Arc::new(JsonStorage::new(temp.path()).unwrap());
        let engine = SessionEngine::new(store, Arc::new(EchoDispatcher), &Config::default());
        let id = engine.create_session().await;
        engine.rename_session(&id, "Benefits Q&A").await.unwrap();
        engine
            .update_context_prompt(&id, "Answer as an HR assistant")
            .await
            .unwrap();
        id
    };

    let store = Arc::new(JsonStorage::new(temp.path()).unwrap());
    let engine = SessionEngine::open(store, Arc::new(EchoDispatcher), &Config::default());

    let metas = engine.list_sessions().await;
    assert_eq!(metas.len(), 1);
    assert_eq!(metas[0].name, "Benefits Q&A");
    assert_eq!(
        engine.context_prompt(&id).await.as_deref(),
        Some("Answer as an HR assistant")
    );
}

#[tokio::test]
async fn deleted_sessions_stay_deleted_after_reload() {
    let temp = TempDir::new().unwrap();

    {
        let store = Arc::new(JsonStorage::new(temp.path()).unwrap());
        let engine = SessionEngine::new(store, Arc::new(EchoDispatcher), &Config::default());
        let keep = engine.create_session().await;
        let drop_id = engine.create_session().await;
        engine.rename_session(&keep, "keeper").await.unwrap();
        engine.delete_session(&drop_id).await.unwrap();
    }

    let store = Arc::new(JsonStorage::new(temp.path()).unwrap());
    let engine = SessionEngine::open(store, Arc::new(EchoDispatcher), &Config::default());

    let metas = engine.list_sessions().await;
    assert_eq!(metas.len(), 1);
    assert_eq!(metas[0].name, "keeper");
}

#[tokio::test]
async fn export_import_roundtrip() {
    let temp = TempDir::new().unwrap();
    let store = Arc::new(JsonStorage::new(temp.path()).unwrap());
    let engine = SessionEngine::new(store, Arc::new(EchoDispatcher), &Config::default());

    let id = engine.create_session().await;
    engine.send_message("hello", "").await.unwrap();
    let json = engine.export_json(&id).await.unwrap();

    let imported = engine.import_json(&json).await.unwrap();
    let messages = engine.messages(&imported).await;
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].content, "hello");

    assert!(engine.import_json("{not json").await.is_err());
}

/// Store whose writes always fail, for persist-policy behavior
struct BrokenStore;

fn io_broken() -> StorageError {
    StorageError::Io(std::io::Error::new(std::io::ErrorKind::Other, "disk on fire"))
}

impl SessionStore for BrokenStore {
    fn save_session(&self, _session: &ChatSession) -> Result<(), StorageError> {
        Err(io_broken())
    }
    fn load_session(&self, id: &str) -> Result<ChatSession, StorageError> {
        Err(StorageError::NotFound(id.to_string()))
    }
    fn load_all(&self) -> Result<Vec<ChatSession>, StorageError> {
        Err(io_broken())
    }
    fn list_sessions(&self) -> Result<Vec<labchat::core::SessionMeta>, StorageError> {
        Err(io_broken())
    }
    fn delete_session(&self, _id: &str) -> Result<(), StorageError> {
        Err(io_broken())
    }
    fn current_session_id(&self) -> Option<String> {
        None
    }
    fn set_current_session(&self, _id: &str) -> Result<(), StorageError> {
        Err(io_broken())
    }
    fn clear_current_session(&self) -> Result<(), StorageError> {
        Err(io_broken())
    }
}

#[tokio::test]
async fn log_and_continue_keeps_optimistic_state() {
    let engine = SessionEngine::new(
        Arc::new(BrokenStore),
        Arc::new(EchoDispatcher),
        &Config::default(),
    );

    let id = engine.create_session().await;
    engine.rename_session(&id, "still works").await.unwrap();
    engine.send_message("hi", "").await.unwrap();

    // Storage failed throughout, but the in-memory state moved on.
    assert_eq!(engine.messages(&id).await.len(), 2);
    assert_eq!(engine.list_sessions().await[0].name, "still works");
}

#[tokio::test]
async fn surface_policy_reports_storage_errors() {
    let engine = SessionEngine::new(
        Arc::new(BrokenStore),
        Arc::new(EchoDispatcher),
        &Config::default(),
    )
    .with_persist_policy(PersistPolicy::Surface);

    let id = engine.create_session().await;
    let result = engine.rename_session(&id, "doomed").await;
    assert!(matches!(result, Err(SessionError::Storage(_))));

    // The in-memory rename still happened; nothing rolls back.
    assert_eq!(engine.list_sessions().await[0].name, "doomed");

    // The send path never surfaces persistence failures.
    engine.send_message("hi", "").await.unwrap();
    assert_eq!(engine.messages(&id).await.len(), 2);
}

#[tokio::test]
async fn open_degrades_to_empty_on_storage_failure() {
    let engine = SessionEngine::open(
        Arc::new(BrokenStore),
        Arc::new(EchoDispatcher),
        &Config::default(),
    );
    assert!(engine.list_sessions().await.is_empty());
    assert!(engine.current_session_id().await.is_none());
}
