//! Typed connection points and the compatibility checker.
//!
//! A connection lives at a [`Slot`] on its block. Two connections can join
//! when their types are opposite (output ↔ input value, previous ↔ next
//! statement) and their check lists intersect.

use crate::error::ConnectError;
use crate::id::BlockId;
use crate::model::Block;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConnectionType {
    InputValue,
    OutputValue,
    NextStatement,
    PreviousStatement,
}

impl ConnectionType {
    pub const ALL: [ConnectionType; 4] = [
        ConnectionType::InputValue,
        ConnectionType::OutputValue,
        ConnectionType::NextStatement,
        ConnectionType::PreviousStatement,
    ];

    /// The only type this one may join with.
    pub fn opposite(self) -> Self {
        match self {
            Self::InputValue => Self::OutputValue,
            Self::OutputValue => Self::InputValue,
            Self::NextStatement => Self::PreviousStatement,
            Self::PreviousStatement => Self::NextStatement,
        }
    }

    pub fn is_statement(self) -> bool {
        matches!(self, Self::NextStatement | Self::PreviousStatement)
    }

    /// True for the side that owns the link (input value, next statement).
    pub fn is_parent_side(self) -> bool {
        matches!(self, Self::InputValue | Self::NextStatement)
    }
}

/// A typed connection with an optional list of accepted type names.
/// `None` accepts anything.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Connection {
    pub kind: ConnectionType,
    pub check: Option<SmallVec<[String; 2]>>,
}

impl Connection {
    pub fn new(kind: ConnectionType) -> Self {
        Self { kind, check: None }
    }

    pub fn with_check<I, S>(kind: ConnectionType, check: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            kind,
            check: Some(check.into_iter().map(Into::into).collect()),
        }
    }

    pub fn check(&self) -> Option<&[String]> {
        self.check.as_deref()
    }
}

/// Where a connection sits on its block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Slot {
    Output,
    Previous,
    Next,
    Input(usize),
}

/// A connection addressed by block and slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnectionRef {
    pub block: BlockId,
    pub slot: Slot,
}

impl ConnectionRef {
    pub fn new(block: BlockId, slot: Slot) -> Self {
        Self { block, slot }
    }
}

/// One side of a prospective link.
#[derive(Debug, Clone, Copy)]
pub struct Endpoint<'a> {
    pub block: &'a Block,
    pub connection: &'a Connection,
}

/// Decides whether two connections may join.
///
/// Every rule is order-independent, so `can_connect(a, b)` and
/// `can_connect(b, a)` always agree.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConnectionChecker;

impl ConnectionChecker {
    pub fn can_connect(&self, a: Endpoint<'_>, b: Endpoint<'_>) -> Result<(), ConnectError> {
        if a.block.id == b.block.id {
            return Err(ConnectError::SelfConnection);
        }
        if a.connection.kind.opposite() != b.connection.kind {
            return Err(ConnectError::WrongType {
                a: a.connection.kind,
                b: b.connection.kind,
            });
        }
        if !self.check_types(a.connection, b.connection) {
            return Err(ConnectError::ChecksFailed);
        }
        let (parent, child) = if a.connection.kind.is_parent_side() {
            (a.block, b.block)
        } else {
            (b.block, a.block)
        };
        if parent.shadow && !child.shadow {
            return Err(ConnectError::ShadowParent);
        }
        Ok(())
    }

    pub fn is_compatible(&self, a: Endpoint<'_>, b: Endpoint<'_>) -> bool {
        self.can_connect(a, b).is_ok()
    }

    /// Check lists intersect, or either side is unrestricted.
    pub fn check_types(&self, a: &Connection, b: &Connection) -> bool {
        match (a.check(), b.check()) {
            (Some(xs), Some(ys)) => xs.iter().any(|x| ys.contains(x)),
            _ => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::BlockId;

    fn block_with(id: &str, conn: Connection) -> (Block, Connection) {
        (Block::new(BlockId::intern(id), "test"), conn)
    }

    #[test]
    fn opposite_is_an_involution() {
        for kind in ConnectionType::ALL {
            assert_eq!(kind.opposite().opposite(), kind);
            assert_ne!(kind.opposite(), kind);
        }
    }

    #[test]
    fn checks_intersect_or_unrestricted() {
        let checker = ConnectionChecker;
        let num = Connection::with_check(ConnectionType::InputValue, ["Number"]);
        let str_out = Connection::with_check(ConnectionType::OutputValue, ["String"]);
        let any_out = Connection::new(ConnectionType::OutputValue);
        let multi = Connection::with_check(ConnectionType::OutputValue, ["String", "Number"]);
        assert!(!checker.check_types(&num, &str_out));
        assert!(checker.check_types(&num, &any_out));
        assert!(checker.check_types(&num, &multi));
    }

    #[test]
    fn self_connection_rejected() {
        let checker = ConnectionChecker;
        let block = Block::new(BlockId::intern("self_conn"), "test");
        let next = Connection::new(ConnectionType::NextStatement);
        let prev = Connection::new(ConnectionType::PreviousStatement);
        let err = checker
            .can_connect(
                Endpoint { block: &block, connection: &next },
                Endpoint { block: &block, connection: &prev },
            )
            .unwrap_err();
        assert_eq!(err, ConnectError::SelfConnection);
    }

    #[test]
    fn shadow_parent_rejects_real_child() {
        let checker = ConnectionChecker;
        let (mut parent, input) =
            block_with("shadow_p", Connection::new(ConnectionType::InputValue));
        parent.shadow = true;
        let (child, output) = block_with("real_c", Connection::new(ConnectionType::OutputValue));
        let a = Endpoint { block: &parent, connection: &input };
        let b = Endpoint { block: &child, connection: &output };
        assert_eq!(checker.can_connect(a, b), Err(ConnectError::ShadowParent));
        assert_eq!(checker.can_connect(b, a), Err(ConnectError::ShadowParent));
    }
}
