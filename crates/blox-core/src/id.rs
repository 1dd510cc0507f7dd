use lasso::{Spur, ThreadedRodeo};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::sync::LazyLock;
use std::sync::atomic::{AtomicU64, Ordering};

/// Global string interner shared by block and model ids.
static INTERNER: LazyLock<ThreadedRodeo> = LazyLock::new(ThreadedRodeo::default);

static COUNTER: AtomicU64 = AtomicU64::new(0);

fn next_with_prefix(prefix: &str) -> Spur {
    let n = COUNTER.fetch_add(1, Ordering::Relaxed);
    INTERNER.get_or_intern(format!("{prefix}_{n}"))
}

/// Declares a `Copy` interned id type with string serde.
macro_rules! interned_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal, $sigil:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash)]
        pub struct $name(Spur);

        impl $name {
            /// Intern a string as an id, or return the existing one.
            pub fn intern(s: &str) -> Self {
                $name(INTERNER.get_or_intern(s))
            }

            /// Resolve back to a string slice.
            pub fn as_str(&self) -> &str {
                INTERNER.resolve(&self.0)
            }

            /// Generate a fresh unique id (e.g. `block_7`).
            pub fn generate() -> Self {
                $name(next_with_prefix($prefix))
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($sigil, "{}"), self.as_str())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                Ok($name::intern(&s))
            }
        }
    };
}

interned_id!(
    /// Identifies a block inside a workspace.
    /// Internally a `Spur` index: 4 bytes, Copy, O(1) Eq and Hash.
    BlockId,
    "block",
    "#"
);

interned_id!(
    /// Identifies a procedure or variable model.
    ModelId,
    "model",
    "$"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_roundtrip() {
        let a = BlockId::intern("controls_repeat_1");
        let b = BlockId::intern("controls_repeat_1");
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "controls_repeat_1");
    }

    #[test]
    fn generated_ids_are_unique() {
        let a = BlockId::generate();
        let b = BlockId::generate();
        assert_ne!(a, b);
        assert!(a.as_str().starts_with("block_"));
        assert!(ModelId::generate().as_str().starts_with("model_"));
    }

    #[test]
    fn debug_uses_sigil() {
        assert_eq!(format!("{:?}", BlockId::intern("b")), "#b");
        assert_eq!(format!("{:?}", ModelId::intern("v")), "$v");
        assert_eq!(ModelId::intern("v").to_string(), "v");
    }
}
