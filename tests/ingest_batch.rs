//! Integration tests for the ingestion pipeline wired into the engine

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tempfile::TempDir;

use labchat::core::SessionEngine;
use labchat::ingest::{
    FileIngestPipeline, FileUploader, IngestError, LocalTextExtractor, PendingFile, UploadedFile,
};
use labchat::llm::{ChatTurn, DispatchError, DispatchOptions, ModelDispatcher, TurnRole};
use labchat::storage::JsonStorage;
use labchat::Config;

struct MemoryUploader;

#[async_trait]
impl FileUploader for MemoryUploader {
    async fn upload(&self, file: &PendingFile) -> Result<UploadedFile, IngestError> {
        Ok(UploadedFile {
            url: format!("mem://uploads/{}", file.name),
            file_name: file.name.clone(),
        })
    }
}

/// Records every window it is asked to dispatch
struct CapturingDispatcher {
    seen: Mutex<Vec<Vec<ChatTurn>>>,
}

#[async_trait]
impl ModelDispatcher for CapturingDispatcher {
    async fn dispatch(
        &self,
        _model_id: &str,
        turns: &[ChatTurn],
        _options: &DispatchOptions,
    ) -> Result<String, DispatchError> {
        self.seen.lock().unwrap().push(turns.to_vec());
        Ok("noted".to_string())
    }
}

#[tokio::test]
async fn oversize_file_fails_alone_not_the_batch() {
    let temp = TempDir::new().unwrap();
    let store = Arc::new(JsonStorage::new(temp.path()).unwrap());
    let engine = SessionEngine::new(
        store,
        Arc::new(CapturingDispatcher {
            seen: Mutex::new(Vec::new()),
        }),
        &Config::default(),
    );

    let mut pipeline = FileIngestPipeline::new(
        Arc::new(MemoryUploader),
        Arc::new(LocalTextExtractor),
        engine.extract_store(),
    );

    let rejections = pipeline.add_files(vec![
        PendingFile::from_bytes("big-deck.pdf", vec![0u8; 15 * 1024 * 1024]),
        PendingFile::from_bytes("notes.txt", vec![b'n'; 2 * 1024 * 1024]),
    ]);

    assert_eq!(rejections.len(), 1);
    assert_eq!(rejections[0].file_name, "big-deck.pdf");
    // The reason renders human-readable for the UI toast.
    assert!(rejections[0].reason.to_string().contains("File too large"));

    let session_id = engine.create_session().await;
    let outcome = pipeline.upload_files(&session_id).await;

    assert_eq!(outcome.files.len(), 1);
    assert_eq!(outcome.files[0].file_name, "notes.txt");
    assert!(outcome.failures.is_empty());
}

#[tokio::test]
async fn extracted_text_reaches_the_next_dispatch() {
    let temp = TempDir::new().unwrap();
    let store = Arc::new(JsonStorage::new(temp.path()).unwrap());
    let dispatcher = Arc::new(CapturingDispatcher {
        seen: Mutex::new(Vec::new()),
    });
    let engine = SessionEngine::new(store, dispatcher.clone(), &Config::default());

    let session_id = engine.create_session().await;
    let mut pipeline = FileIngestPipeline::new(
        Arc::new(MemoryUploader),
        Arc::new(LocalTextExtractor),
        engine.extract_store(),
    );

    pipeline.add_files(vec![PendingFile::from_bytes(
        "policy.md",
        b"# Leave policy\nEmployees accrue 2 days per month.".to_vec(),
    )]);

    // The upload is awaited, so the extract entry is visible before the
    // send below builds its window.
    let outcome = pipeline.upload_files(&session_id).await;
    assert!(outcome.extracted_chars > 0);
    assert!(engine
        .extract_content(&session_id)
        .unwrap()
        .contains("Leave policy"));

    engine
        .send_message("How fast do I accrue leave?", "Answer from the handbook")
        .await
        .unwrap();

    let seen = dispatcher.seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    let system = &seen[0][0];
    assert_eq!(system.role, TurnRole::System);
    assert!(system.content.contains("Answer from the handbook"));
    assert!(system.content.contains("Employees accrue 2 days per month."));
}

#[tokio::test]
async fn second_upload_overwrites_the_extract_entry() {
    let temp = TempDir::new().unwrap();
    let store = Arc::new(JsonStorage::new(temp.path()).unwrap());
    let engine = SessionEngine::new(
        store,
        Arc::new(CapturingDispatcher {
            seen: Mutex::new(Vec::new()),
        }),
        &Config::default(),
    );

    let session_id = engine.create_session().await;
    let mut pipeline = FileIngestPipeline::new(
        Arc::new(MemoryUploader),
        Arc::new(LocalTextExtractor),
        engine.extract_store(),
    );

    pipeline.add_files(vec![PendingFile::from_bytes("a.txt", b"first doc".to_vec())]);
    pipeline.upload_files(&session_id).await;
    assert_eq!(engine.extract_content(&session_id).as_deref(), Some("first doc"));

    pipeline.add_files(vec![PendingFile::from_bytes("b.txt", b"second doc".to_vec())]);
    pipeline.upload_files(&session_id).await;
    assert_eq!(engine.extract_content(&session_id).as_deref(), Some("second doc"));
}
