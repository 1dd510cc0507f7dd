pub mod error;
pub mod sync;

pub use error::EngineError;
pub use sync::{BlockMutation, SyncEngine};
