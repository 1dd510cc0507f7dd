pub mod connection;
pub mod error;
pub mod id;
pub mod model;
pub mod observable;
pub mod registry;
pub mod workspace;

pub use connection::{Connection, ConnectionChecker, ConnectionRef, ConnectionType, Slot};
pub use error::{BlockError, ConnectError, ModelError, RegistryError};
pub use id::{BlockId, ModelId};
pub use model::*;
pub use observable::{
    MapEvent, ObservableMap, ObservableModel, ParameterModel, ProcedureMap, ProcedureModel,
    Subscription, VariableMap, VariableModel,
};
pub use registry::Registry;
pub use workspace::Workspace;
