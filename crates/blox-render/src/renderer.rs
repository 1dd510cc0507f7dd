//! Renderers and the renderer registry.
//!
//! A renderer is a constants table plus the four stages that use it. The
//! built-in styles share every stage and differ only in their constants;
//! a custom renderer may swap any stage.

use crate::constants::ConstantProvider;
use crate::debug::{Debug, DebugConfig};
use crate::drawer::{self, Drawing};
use crate::error::RenderError;
use crate::info::{RenderInfo, StackSizes};
use crate::path_object::PathObject;
use blox_core::{BlockId, Registry, Workspace};
use std::sync::Arc;

pub type MeasureFn =
    fn(&Workspace, BlockId, &Renderer, &mut StackSizes) -> Result<RenderInfo, RenderError>;
pub type DrawFn = fn(&RenderInfo, &ConstantProvider) -> Result<Drawing, RenderError>;
pub type PathObjectFn = fn(BlockId, &Renderer) -> PathObject;
pub type DebugFn = fn(DebugConfig) -> Debug;
pub type RendererFactory = fn() -> Result<Renderer, RenderError>;

/// Output of one render: the measurement and the drawing made from it.
#[derive(Debug, Clone, PartialEq)]
pub struct Rendered {
    pub info: RenderInfo,
    pub drawing: Drawing,
}

#[derive(Debug, Clone)]
pub struct Renderer {
    name: String,
    constants: Arc<ConstantProvider>,
    measure: MeasureFn,
    draw: DrawFn,
    path_object: PathObjectFn,
    debug: DebugFn,
}

fn default_path_object(block: BlockId, renderer: &Renderer) -> PathObject {
    PathObject::new(block, &renderer.style_class())
}

impl Renderer {
    /// A renderer using the shared stages. Fails if `constants` holds a
    /// non-finite or negative dimension.
    pub fn new(name: &str, constants: ConstantProvider) -> Result<Self, RenderError> {
        constants.validate()?;
        Ok(Self {
            name: name.to_string(),
            constants: Arc::new(constants),
            measure: RenderInfo::measure,
            draw: drawer::draw,
            path_object: default_path_object,
            debug: Debug::new,
        })
    }

    pub fn geras() -> Result<Self, RenderError> {
        Self::new("geras", ConstantProvider::geras())
    }

    pub fn zelos() -> Result<Self, RenderError> {
        Self::new("zelos", ConstantProvider::zelos())
    }

    #[must_use]
    pub fn with_measure(mut self, measure: MeasureFn) -> Self {
        self.measure = measure;
        self
    }

    #[must_use]
    pub fn with_draw(mut self, draw: DrawFn) -> Self {
        self.draw = draw;
        self
    }

    #[must_use]
    pub fn with_path_object(mut self, path_object: PathObjectFn) -> Self {
        self.path_object = path_object;
        self
    }

    #[must_use]
    pub fn with_debug(mut self, debug: DebugFn) -> Self {
        self.debug = debug;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn constants(&self) -> &ConstantProvider {
        &self.constants
    }

    /// Class added to every path object this renderer creates.
    pub fn style_class(&self) -> String {
        format!("blox-{}-renderer", self.name.to_lowercase())
    }

    pub fn measure(
        &self,
        ws: &Workspace,
        id: BlockId,
        sizes: &mut StackSizes,
    ) -> Result<RenderInfo, RenderError> {
        (self.measure)(ws, id, self, sizes)
    }

    pub fn draw(&self, info: &RenderInfo) -> Result<Drawing, RenderError> {
        (self.draw)(info, &self.constants)
    }

    pub fn make_path_object(&self, block: BlockId) -> PathObject {
        (self.path_object)(block, self)
    }

    pub fn make_debugger(&self, config: DebugConfig) -> Debug {
        (self.debug)(config)
    }

    /// Measure and draw one block, recording its size in `sizes` so
    /// parents rendered later in the same pass reuse it.
    pub fn render(
        &self,
        ws: &Workspace,
        id: BlockId,
        sizes: &mut StackSizes,
    ) -> Result<Rendered, RenderError> {
        let info = self.measure(ws, id, sizes)?;
        sizes.record(id, info.size());
        let drawing = self.draw(&info)?;
        Ok(Rendered { info, drawing })
    }
}

// ─── Registry ────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct RendererRegistry {
    factories: Registry<RendererFactory>,
}

impl Default for RendererRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl RendererRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self {
            factories: Registry::new("renderer"),
        }
    }

    /// A registry holding `geras` and `zelos`.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for (name, factory) in [
            ("geras", Renderer::geras as RendererFactory),
            ("zelos", Renderer::zelos as RendererFactory),
        ] {
            if let Err(e) = registry.register(name, factory) {
                log::error!("failed to register built-in renderer: {e}");
            }
        }
        registry
    }

    pub fn register(&mut self, name: &str, factory: RendererFactory) -> Result<(), RenderError> {
        self.factories.register(name, factory, false)?;
        Ok(())
    }

    pub fn unregister(&mut self, name: &str) -> bool {
        self.factories.unregister(name).is_some()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains(name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.factories.names()
    }

    /// Build a fresh renderer by name.
    pub fn get(&self, name: &str) -> Result<Arc<Renderer>, RenderError> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| RenderError::UnknownRenderer(name.to_string()))?;
        Ok(Arc::new(factory()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blox_core::RegistryError;
    use pretty_assertions::assert_eq;

    fn roomy() -> Result<Renderer, RenderError> {
        let mut c = ConstantProvider::geras();
        c.between_row_spacing = 12.0;
        c.init();
        Renderer::new("roomy", c)
    }

    fn broken() -> Result<Renderer, RenderError> {
        let mut c = ConstantProvider::geras();
        c.corner_radius = f64::NAN;
        Renderer::new("broken", c)
    }

    #[test]
    fn builtins_are_registered() {
        let registry = RendererRegistry::with_builtins();
        assert_eq!(registry.names(), vec!["geras", "zelos"]);
        assert_eq!(registry.get("Zelos").unwrap().name(), "zelos");
    }

    #[test]
    fn unknown_and_duplicate_names_fail() {
        let mut registry = RendererRegistry::with_builtins();
        assert_eq!(
            registry.get("thrasos").unwrap_err(),
            RenderError::UnknownRenderer("thrasos".to_string())
        );
        assert!(matches!(
            registry.register("geras", roomy),
            Err(RenderError::Registry(RegistryError::DuplicateName { .. }))
        ));
        assert!(registry.unregister("geras"));
        assert!(!registry.contains("geras"));
    }

    #[test]
    fn custom_renderer_carries_its_constants() {
        let mut registry = RendererRegistry::new();
        registry.register("roomy", roomy).unwrap();
        let renderer = registry.get("roomy").unwrap();
        assert_eq!(renderer.constants().between_row_spacing, 12.0);
        assert_eq!(renderer.style_class(), "blox-roomy-renderer");
    }

    #[test]
    fn invalid_constants_are_rejected_at_construction() {
        let mut registry = RendererRegistry::new();
        registry.register("broken", broken).unwrap();
        assert!(matches!(
            registry.get("broken"),
            Err(RenderError::InvalidConstant {
                name: "corner_radius",
                ..
            })
        ));
    }
}
