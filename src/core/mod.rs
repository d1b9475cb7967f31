//! Conversation core: sessions, comparison threads, extracted content

mod compare;
mod errors;
mod extract;
mod session;
mod types;

pub use compare::{ComparisonEngine, ComparisonMessages};
pub use errors::SessionError;
pub use extract::{ExtractedContent, ExtractedContentStore};
pub use session::{PersistPolicy, SessionEngine};
pub use types::{ChatSession, CompareSide, CompareThreads, MessageRole, SessionMessage, SessionMeta};
