use blox_core::{BlockError, ConnectError, ModelError};
use blox_render::RenderError;
use thiserror::Error;

/// Anything a [`SyncEngine`](crate::sync::SyncEngine) call can fail with.
///
/// A `Connect` error is a refused connection: the workspace is left exactly
/// as it was and callers may treat it as a snap-back.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error(transparent)]
    Block(#[from] BlockError),

    #[error("connection refused: {0}")]
    Connect(#[from] ConnectError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    Model(#[from] ModelError),
}
