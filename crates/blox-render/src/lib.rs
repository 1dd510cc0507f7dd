pub mod constants;
pub mod debug;
pub mod drawer;
pub mod error;
pub mod info;
pub mod measurables;
pub mod path_object;
pub mod renderer;
pub mod svg_paths;

pub use constants::{ConstantProvider, DynamicShape, NotchStyle, ShapeKind, SpacingPolicy};
pub use debug::{Debug, DebugConfig, DebugShape};
pub use drawer::{ConnectionHighlight, Drawing, Placement, PlacementTarget, draw};
pub use error::RenderError;
pub use info::{BlockSize, ConnectionPoint, OutputMeasure, RenderInfo, StackSizes};
pub use measurables::{Element, ElementKind, InputMeasure, Row, RowKind};
pub use path_object::{BlockState, ElementId, PathObject};
pub use renderer::{Rendered, Renderer, RendererFactory, RendererRegistry};
