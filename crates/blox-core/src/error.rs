//! Error types for the block model, connections, and registries.

use crate::connection::{ConnectionRef, ConnectionType};
use crate::id::{BlockId, ModelId};
use crate::model::Icon;
use thiserror::Error;

/// Errors raised while building or mutating blocks.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BlockError {
    /// A block already carries an icon of this type. The rejected icon is
    /// handed back so the caller can decide what to do with it.
    #[error("block {block} already has an icon of type `{}`", icon.kind)]
    DuplicateIconType { block: BlockId, icon: Icon },

    #[error("block {block} already has an input named `{name}`")]
    DuplicateInputName { block: BlockId, name: String },

    #[error("a block with id {0} already exists")]
    DuplicateBlockId(BlockId),

    #[error("unknown block {0}")]
    UnknownBlock(BlockId),

    #[error("block {block} has no input named `{name}`")]
    UnknownInput { block: BlockId, name: String },

    #[error("block {block} has no field named `{name}`")]
    UnknownField { block: BlockId, name: String },

    #[error("invalid value `{value}` for field `{field}`: {reason}")]
    InvalidFieldValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Why two connections may not be joined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ConnectError {
    #[error("a block cannot connect to itself")]
    SelfConnection,

    #[error("{a:?} cannot connect to {b:?}")]
    WrongType { a: ConnectionType, b: ConnectionType },

    #[error("connection checks do not intersect")]
    ChecksFailed,

    #[error("a shadow block cannot have a non-shadow child")]
    ShadowParent,

    #[error("connecting would create a cycle")]
    Cycle,

    #[error("no connection at {0:?}")]
    MissingConnection(ConnectionRef),

    #[error("unknown block {0}")]
    UnknownBlock(BlockId),
}

/// Errors raised by [`crate::registry::Registry`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("{kind} `{name}` is already registered")]
    DuplicateName { kind: &'static str, name: String },

    #[error("{kind} `{name}` is already registered as `{existing}`")]
    InconsistentCase {
        kind: &'static str,
        name: String,
        existing: String,
    },

    #[error("{kind} name must not be empty")]
    EmptyName { kind: &'static str },
}

/// Errors raised when creating variables or procedures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    #[error("`{name}` is already in use with id {existing}")]
    NameConflict { name: String, existing: ModelId },

    #[error("id {0} is already in use")]
    IdInUse(ModelId),
}
