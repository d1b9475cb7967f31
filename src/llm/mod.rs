//! Model dispatch: the registry, the wire types, and the endpoint adapter

mod catalog;
mod error;
mod openai_compat;
mod types;

pub use catalog::{ModelCatalog, ModelInfo};
pub use error::DispatchError;
pub use openai_compat::HttpDispatcher;
pub use types::{ChatTurn, DispatchOptions, TurnRole};

use async_trait::async_trait;

/// Port for one assistant turn against an external model endpoint
///
/// `turns` is the bounded recent-history window plus the new user turn;
/// `options` carries pass-through tuning knobs. Implementations never
/// retry; retry, if any, is a caller decision (and the engines choose
/// not to: a failure becomes an error-classified assistant message).
#[async_trait]
pub trait ModelDispatcher: Send + Sync {
    async fn dispatch(
        &self,
        model_id: &str,
        turns: &[ChatTurn],
        options: &DispatchOptions,
    ) -> Result<String, DispatchError>;
}
