//! Extracted-content store
//!
//! Per-session cache of the text pulled out of uploaded documents, used to
//! augment dispatch context without re-uploading. One entry per session,
//! overwritten by default; append is an explicit, separate operation. The
//! cache is in-memory only: deleting the session clears it, re-uploading
//! rebuilds it.

use std::sync::Arc;

use dashmap::DashMap;

/// One session's extracted document text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedContent {
    pub text: String,
    /// Cumulative character count across everything contributing to `text`
    pub char_count: usize,
}

impl ExtractedContent {
    fn new(text: String) -> Self {
        let char_count = text.chars().count();
        Self { text, char_count }
    }
}

/// Keyed store mapping session id to its extracted content
///
/// Cheap to clone; clones share the same map so the session engine and the
/// ingestion pipeline observe each other's writes.
#[derive(Debug, Clone, Default)]
pub struct ExtractedContentStore {
    entries: Arc<DashMap<String, ExtractedContent>>,
}

impl ExtractedContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite the entry for `session_id`
    ///
    /// The write is visible to any `get` issued after this returns.
    pub fn set(&self, session_id: &str, text: impl Into<String>) {
        self.entries
            .insert(session_id.to_string(), ExtractedContent::new(text.into()));
    }

    /// Append to the entry for `session_id`, creating it if absent
    pub fn append(&self, session_id: &str, text: &str) {
        let mut entry = self
            .entries
            .entry(session_id.to_string())
            .or_insert_with(|| ExtractedContent::new(String::new()));
        if !entry.text.is_empty() {
            entry.text.push_str("\n\n");
        }
        entry.text.push_str(text);
        entry.char_count += text.chars().count();
    }

    pub fn get(&self, session_id: &str) -> Option<ExtractedContent> {
        self.entries.get(session_id).map(|e| e.value().clone())
    }

    /// Drop the entry for `session_id` (session deletion)
    pub fn remove(&self, session_id: &str) {
        self.entries.remove(session_id);
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
