//! File ingestion pipeline
//!
//! Validates user-selected files, uploads the accepted ones to the remote
//! object store, and extracts text from extractable types (notably PDF)
//! into the session's extracted-content entry. Batch semantics are
//! best-effort throughout: a rejected or failed file never takes the rest
//! of the batch down with it.

use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::core::ExtractedContentStore;

/// Limits applied while building a batch
#[derive(Debug, Clone)]
pub struct IngestConfig {
    /// Maximum file size in bytes (default: 10MB)
    pub max_file_size: u64,
    /// Maximum number of pending files (default: 10)
    pub max_files: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            max_file_size: 10 * 1024 * 1024, // 10MB
            max_files: 10,
        }
    }
}

impl IngestConfig {
    /// Limits taken from the application config
    pub fn from_config(config: &crate::config::Config) -> Self {
        Self {
            max_file_size: config.upload.max_file_size,
            ..Self::default()
        }
    }
}

/// File categories the pipeline cares about
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Pdf,
    PlainText,
    Markdown,
    /// Uploaded as-is, no text extraction
    Other,
}

impl FileKind {
    /// Detect from the file name extension
    pub fn from_name(name: &str) -> Self {
        let extension = Path::new(name)
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        match extension.as_str() {
            "pdf" => FileKind::Pdf,
            "txt" => FileKind::PlainText,
            "md" | "markdown" => FileKind::Markdown,
            _ => FileKind::Other,
        }
    }

    pub fn is_extractable(&self) -> bool {
        !matches!(self, FileKind::Other)
    }
}

/// A file selected by the user, not yet uploaded
#[derive(Debug, Clone)]
pub struct PendingFile {
    pub name: String,
    pub kind: FileKind,
    pub bytes: Vec<u8>,
}

impl PendingFile {
    pub fn from_bytes(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let name = name.into();
        let kind = FileKind::from_name(&name);
        Self { name, kind, bytes }
    }

    pub fn from_path(path: &Path) -> Result<Self, IngestError> {
        let bytes =
            std::fs::read(path).map_err(|e| IngestError::Unreadable(e.to_string()))?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "unknown".to_string());
        Ok(Self::from_bytes(name, bytes))
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// Per-file ingestion failures; reported individually, never batch-fatal
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("File too large: {} (max: {})", format_size(*size), format_size(*max))]
    FileTooLarge { size: u64, max: u64 },

    #[error("Too many files: {count} (max: {max})")]
    TooManyFiles { count: usize, max: usize },

    #[error("Could not read file: {0}")]
    Unreadable(String),

    #[error("Upload failed: {0}")]
    UploadFailed(String),
}

/// One rejected or failed file with its user-visible reason
#[derive(Debug)]
pub struct Rejection {
    pub file_name: String,
    pub reason: IngestError,
}

/// Result of uploading one file to the object store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub url: String,
    pub file_name: String,
}

/// What a batch upload produced
#[derive(Debug, Default)]
pub struct UploadOutcome {
    /// Files that made it to the object store
    pub files: Vec<UploadedFile>,
    /// Files that did not, each with its reason
    pub failures: Vec<Rejection>,
    /// Characters written to the session's extracted-content entry
    pub extracted_chars: usize,
}

/// Port to the remote object store
#[async_trait]
pub trait FileUploader: Send + Sync {
    async fn upload(&self, file: &PendingFile) -> Result<UploadedFile, IngestError>;
}

/// Port for pulling plain text out of an extractable file
pub trait TextExtractor: Send + Sync {
    fn extract(&self, file: &PendingFile) -> Result<Option<String>, IngestError>;
}

/// Uploader that PUTs file bytes against an HTTP object-store endpoint
pub struct HttpFileUploader {
    client: reqwest::Client,
    base_url: String,
}

impl HttpFileUploader {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(config: &crate::config::Config) -> Self {
        Self::new(&config.upload.base_url)
    }
}

#[async_trait]
impl FileUploader for HttpFileUploader {
    async fn upload(&self, file: &PendingFile) -> Result<UploadedFile, IngestError> {
        let url = format!("{}/{}/{}", self.base_url, uuid::Uuid::new_v4(), file.name);
        let response = self
            .client
            .put(&url)
            .body(file.bytes.clone())
            .send()
            .await
            .map_err(|e| IngestError::UploadFailed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(IngestError::UploadFailed(format!(
                "object store returned {}",
                response.status()
            )));
        }

        Ok(UploadedFile {
            url,
            file_name: file.name.clone(),
        })
    }
}

/// Extractor handling text/markdown directly and PDF through `pdftotext`
pub struct LocalTextExtractor;

impl TextExtractor for LocalTextExtractor {
    fn extract(&self, file: &PendingFile) -> Result<Option<String>, IngestError> {
        match file.kind {
            FileKind::PlainText | FileKind::Markdown => {
                let text = String::from_utf8(file.bytes.clone())
                    .map_err(|e| IngestError::Unreadable(e.to_string()))?;
                Ok(Some(text))
            }
            FileKind::Pdf => Ok(extract_pdf_text(&file.bytes)),
            FileKind::Other => Ok(None),
        }
    }
}

/// Extract text from PDF bytes with pdftotext (poppler-utils), if present
fn extract_pdf_text(bytes: &[u8]) -> Option<String> {
    let child = Command::new("pdftotext")
        .args(["-layout", "-", "-"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn();

    let mut child = match child {
        Ok(child) => child,
        Err(err) => {
            tracing::warn!(error = %err, "pdftotext unavailable; skipping PDF extraction");
            return None;
        }
    };

    if let Some(stdin) = child.stdin.as_mut() {
        if stdin.write_all(bytes).is_err() {
            return None;
        }
    }

    match child.wait_with_output() {
        Ok(output) if output.status.success() => {
            let text = String::from_utf8_lossy(&output.stdout).to_string();
            if text.trim().is_empty() {
                None
            } else {
                Some(text)
            }
        }
        _ => None,
    }
}

/// Builds and ships one batch of files for a session
pub struct FileIngestPipeline {
    pending: Vec<PendingFile>,
    config: IngestConfig,
    uploader: Arc<dyn FileUploader>,
    extractor: Arc<dyn TextExtractor>,
    extract_store: ExtractedContentStore,
}

impl FileIngestPipeline {
    pub fn new(
        uploader: Arc<dyn FileUploader>,
        extractor: Arc<dyn TextExtractor>,
        extract_store: ExtractedContentStore,
    ) -> Self {
        Self {
            pending: Vec::new(),
            config: IngestConfig::default(),
            uploader,
            extractor,
            extract_store,
        }
    }

    pub fn with_config(mut self, config: IngestConfig) -> Self {
        self.config = config;
        self
    }

    pub fn pending(&self) -> &[PendingFile] {
        &self.pending
    }

    pub fn count(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Validate a batch into the pending list
    ///
    /// Partial acceptance: each rejection names the file and the reason;
    /// the rest of the batch is kept.
    pub fn add_files(&mut self, files: Vec<PendingFile>) -> Vec<Rejection> {
        let mut rejections = Vec::new();
        for file in files {
            if self.pending.len() >= self.config.max_files {
                rejections.push(Rejection {
                    file_name: file.name,
                    reason: IngestError::TooManyFiles {
                        count: self.pending.len() + 1,
                        max: self.config.max_files,
                    },
                });
                continue;
            }
            if file.size() > self.config.max_file_size {
                rejections.push(Rejection {
                    file_name: file.name.clone(),
                    reason: IngestError::FileTooLarge {
                        size: file.size(),
                        max: self.config.max_file_size,
                    },
                });
                continue;
            }
            self.pending.push(file);
        }
        rejections
    }

    /// Drop one pending file; no network effect
    pub fn remove_file(&mut self, index: usize) -> Option<PendingFile> {
        if index < self.pending.len() {
            Some(self.pending.remove(index))
        } else {
            None
        }
    }

    /// Drop the whole pending list; no network effect
    pub fn clear_files(&mut self) {
        self.pending.clear();
    }

    /// Upload the pending batch and attribute extracted text to `session_id`
    ///
    /// Best-effort: failed uploads land in the failure list while the rest
    /// proceed. The extracted-content write completes before this returns,
    /// so a send issued afterwards sees the new text.
    pub async fn upload_files(&mut self, session_id: &str) -> UploadOutcome {
        let batch = std::mem::take(&mut self.pending);
        let mut outcome = UploadOutcome::default();
        let mut extracted = Vec::new();

        for file in &batch {
            match self.uploader.upload(file).await {
                Ok(uploaded) => {
                    outcome.files.push(uploaded);
                    if file.kind.is_extractable() {
                        match self.extractor.extract(file) {
                            Ok(Some(text)) => extracted.push(text),
                            Ok(None) => {}
                            Err(err) => {
                                tracing::warn!(file = %file.name, error = %err, "text extraction failed");
                            }
                        }
                    }
                }
                Err(err) => {
                    tracing::warn!(file = %file.name, error = %err, "file upload failed");
                    outcome.failures.push(Rejection {
                        file_name: file.name.clone(),
                        reason: err,
                    });
                }
            }
        }

        if !extracted.is_empty() {
            let combined = extracted.join("\n\n");
            outcome.extracted_chars = combined.chars().count();
            self.extract_store.set(session_id, combined);
        }

        outcome
    }
}

/// Format a size in bytes to a human-readable string
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1}GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1}MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1}KB", bytes as f64 / KB as f64)
    } else {
        format!("{bytes}B")
    }
}
