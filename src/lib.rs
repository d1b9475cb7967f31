//! labchat: the conversation-session engine behind the training-lab portal
//!
//! This library provides:
//! - Session engine: conversation lifecycle, optimistic message sends,
//!   context prompts and extracted document content
//! - Comparison engine: two model threads side by side with joint or
//!   single-side dispatch
//! - Model dispatch port with an OpenAI-compatible HTTP adapter and a
//!   closed failure taxonomy
//! - File ingestion pipeline: validated, best-effort batch upload with
//!   text extraction
//! - JSON-file persistence behind a storage port
//!
//! The rendering layer is out of scope; this crate is the state the views
//! project from.

pub mod config;
pub mod core;
pub mod ingest;
pub mod llm;
pub mod storage;

pub use self::config::Config;
pub use self::core::{ComparisonEngine, PersistPolicy, SessionEngine, SessionError};
pub use self::llm::{DispatchError, HttpDispatcher, ModelCatalog, ModelDispatcher};
pub use self::storage::{JsonStorage, SessionStore};
