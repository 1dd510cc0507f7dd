use blox_core::{BlockId, RegistryError};
use thiserror::Error;

/// Failures of the render pipeline. These indicate a broken renderer or
/// constants table, never a user mistake, and are propagated as-is.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RenderError {
    #[error("cannot render unknown block {0}")]
    UnknownBlock(BlockId),

    #[error("constant `{name}` has invalid value {value}")]
    InvalidConstant { name: &'static str, value: f64 },

    #[error("block {block}: statement input drawn with a non-notch shape")]
    ShapeMismatch { block: BlockId },

    #[error("block {block}: row {row} has no spacer to absorb alignment padding")]
    MissingSpacer { block: BlockId, row: usize },

    #[error("block {block}: measurement produced no top or bottom row")]
    MalformedRows { block: BlockId },

    #[error("no renderer named `{0}`")]
    UnknownRenderer(String),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}
