//! Capture backends and their ordered registry.
//!
//! A backend owns one family of artifact objects. Detection is an explicit
//! capability (`detect`), not runtime type probing: the registry walks its
//! list in registration order and the first backend whose `detect` returns
//! true owns the capture. Built-in backends register before user backends
//! unless a caller explicitly reorders them.

use std::any::Any;
use std::collections::BTreeMap;

use figrev_model::{DataItem, FigrevError, ImageFormat, Result};
use tracing::debug;

/// A live artifact object flowing through the pipeline.
///
/// Backends downcast through `as_any` inside their own `detect`/`render`;
/// nothing outside a backend inspects the concrete type.
pub trait Artifact: Any + std::fmt::Debug {
    fn as_any(&self) -> &dyn Any;

    /// Whether the object sits inside a detectable parent container (e.g. a
    /// figure with axes). Bare objects with no container publish under the
    /// anonymous figure name.
    fn has_parent_container(&self) -> bool {
        true
    }
}

/// Backend-specific render parameters.
///
/// `render` may be called more than once per object with different options,
/// each call producing distinct image items.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderOptions {
    pub width: u32,
    pub height: u32,
    /// Free-form backend parameters (dpi, transparency, ...).
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            extra: BTreeMap::new(),
        }
    }
}

impl RenderOptions {
    pub fn sized(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ..Self::default()
        }
    }
}

/// One rendered output: encoded bytes plus declared pixel dimensions.
#[derive(Debug, Clone)]
pub struct Rendered {
    pub data: Vec<u8>,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

/// Pluggable capture/render implementation for one artifact family.
pub trait CaptureBackend: Send + Sync + std::fmt::Debug {
    /// Stable backend identifier, also the snapshot key.
    fn name(&self) -> &'static str;

    /// Whether this backend owns the given object.
    fn detect(&self, artifact: &dyn Artifact) -> bool;

    /// Render the artifact into every format this backend supports from the
    /// requested set.
    fn render(
        &self,
        artifact: &dyn Artifact,
        formats: &[ImageFormat],
        options: &RenderOptions,
    ) -> Result<BTreeMap<ImageFormat, Rendered>>;

    /// Whether this backend can produce a re-renderable interactive variant.
    fn supports_interactive(&self) -> bool {
        false
    }

    /// Interactive (HTML) rendering, when supported.
    fn render_interactive(&self, _artifact: &dyn Artifact) -> Option<String> {
        None
    }

    /// Title of the artifact, when one is set.
    fn title(&self, _artifact: &dyn Artifact) -> Option<String> {
        None
    }

    /// Structured items this backend contributes beyond the rendered
    /// images (e.g. the underlying table data).
    fn data_items(&self, _artifact: &dyn Artifact) -> Vec<DataItem> {
        Vec::new()
    }

    /// Serialize the live artifact for later restoration.
    fn snapshot(&self, artifact: &dyn Artifact) -> Result<Vec<u8>>;

    /// Reconstruct a live artifact from a snapshot payload.
    fn restore(&self, payload: &[u8]) -> Result<Box<dyn Artifact>>;
}

/// Ordered list of capture backends; first `detect` match wins.
pub struct BackendRegistry {
    backends: Vec<Box<dyn CaptureBackend>>,
}

impl Default for BackendRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl BackendRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            backends: Vec::new(),
        }
    }

    /// Append a backend at the end of the detection order.
    pub fn register(&mut self, backend: Box<dyn CaptureBackend>) {
        self.backends.push(backend);
    }

    /// Insert a backend ahead of all currently registered ones.
    pub fn register_front(&mut self, backend: Box<dyn CaptureBackend>) {
        self.backends.insert(0, backend);
    }

    /// First backend whose `detect` matches, in registration order.
    pub fn detect(&self, artifact: &dyn Artifact) -> Option<&dyn CaptureBackend> {
        let found = self
            .backends
            .iter()
            .find(|backend| backend.detect(artifact))
            .map(AsRef::as_ref);
        if let Some(backend) = found {
            debug!(backend = backend.name(), "backend detected artifact");
        }
        found
    }

    /// Like [`BackendRegistry::detect`], but a missing match is a capture failure.
    pub fn require(&self, artifact: &dyn Artifact) -> Result<&dyn CaptureBackend> {
        self.detect(artifact).ok_or_else(|| {
            FigrevError::capture("no registered backend detected the artifact")
        })
    }

    /// Lookup by backend name (used by snapshot restoration).
    pub fn by_name(&self, name: &str) -> Option<&dyn CaptureBackend> {
        self.backends
            .iter()
            .find(|backend| backend.name() == name)
            .map(AsRef::as_ref)
    }

    /// Backend names in detection order.
    pub fn names(&self) -> Vec<&'static str> {
        self.backends.iter().map(|backend| backend.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.backends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }
}

/// Registry pre-loaded with the built-in backends, in their standard order.
pub fn build_default_registry() -> BackendRegistry {
    let mut registry = BackendRegistry::new();
    registry.register(Box::new(crate::artifacts::ChartBackend));
    registry.register(Box::new(crate::artifacts::TableBackend));
    registry.register(Box::new(crate::artifacts::SceneBackend));
    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::{ChartArtifact, SceneArtifact};

    #[test]
    fn default_registry_order() {
        let registry = build_default_registry();
        assert_eq!(registry.names(), vec!["chart", "table", "scene"]);
    }

    #[test]
    fn first_matching_backend_wins() {
        let registry = build_default_registry();
        let chart = ChartArtifact::figure(vec![(0.0, 0.0)]);
        let backend = registry.require(&chart).expect("chart backend");
        assert_eq!(backend.name(), "chart");
    }

    #[test]
    fn user_backend_registers_after_builtins() {
        #[derive(Debug)]
        struct NeverBackend;
        impl CaptureBackend for NeverBackend {
            fn name(&self) -> &'static str {
                "never"
            }
            fn detect(&self, _artifact: &dyn Artifact) -> bool {
                false
            }
            fn render(
                &self,
                _artifact: &dyn Artifact,
                _formats: &[ImageFormat],
                _options: &RenderOptions,
            ) -> Result<BTreeMap<ImageFormat, Rendered>> {
                Ok(BTreeMap::new())
            }
            fn snapshot(&self, _artifact: &dyn Artifact) -> Result<Vec<u8>> {
                Ok(Vec::new())
            }
            fn restore(&self, _payload: &[u8]) -> Result<Box<dyn Artifact>> {
                Err(FigrevError::snapshot_restore("never"))
            }
        }

        let mut registry = build_default_registry();
        registry.register(Box::new(NeverBackend));
        assert_eq!(registry.names().last(), Some(&"never"));

        registry.register_front(Box::new(NeverBackend));
        assert_eq!(registry.names().first(), Some(&"never"));
    }

    #[test]
    fn undetected_artifact_is_capture_failure() {
        let registry = BackendRegistry::new();
        let scene = SceneArtifact::new(vec![[0.0, 0.0, 0.0]]);
        let err = registry.require(&scene).unwrap_err();
        assert!(err.to_string().contains("capture failure"));
    }
}
